//! Argument binding
//!
//! Maps caller-supplied positional values and dependency-declared
//! overrides onto a task's declared parameter list.

use std::collections::BTreeMap;

use crate::error::{ExecutionError, ExecutionResult, Result};
use crate::manifest::model::{DependencyArg, Task, TaskDependency};
use crate::runner::template::render;

/// Bind positional values to `task`'s declared arguments.
///
/// The value at position i binds the i-th declared argument; absent
/// values fall back to the argument's default. Supplied values beyond
/// the declared count are ignored, matching CLI pass-through semantics.
pub fn bind_arguments(
    task: &Task,
    positional: &[String],
) -> ExecutionResult<BTreeMap<String, String>> {
    let mut bound = BTreeMap::new();

    for (i, arg) in task.args.iter().enumerate() {
        if let Some(value) = positional.get(i) {
            bound.insert(arg.name.clone(), value.clone());
        } else if let Some(default) = &arg.default {
            bound.insert(arg.name.clone(), default.clone());
        } else {
            return Err(ExecutionError::MissingArgument {
                task: task.name.clone(),
                arg: arg.name.clone(),
            });
        }
    }

    Ok(bound)
}

/// Bind the arguments a dependency runs with.
///
/// Positional override entries are aligned against `dep_task`'s declared
/// arguments first: the i-th positional entry (counting positional
/// entries only) binds the i-th declared argument, rendered against the
/// caller's bound arguments. Mapping entries are then merged by name in
/// list order. Declared arguments still uncovered fall back to their
/// defaults.
pub fn bind_dependency_arguments(
    dep: &TaskDependency,
    dep_task: &Task,
    caller_vars: &BTreeMap<String, String>,
) -> Result<BTreeMap<String, String>> {
    let mut bound = BTreeMap::new();
    let mut position = 0;
    let mut named: Vec<&BTreeMap<String, String>> = Vec::new();

    for entry in &dep.args {
        match entry {
            DependencyArg::Positional(template) => {
                if let Some(arg) = dep_task.args.get(position) {
                    bound.insert(arg.name.clone(), render(template, caller_vars)?);
                }
                position += 1;
            }
            DependencyArg::Named(map) => named.push(map),
        }
    }

    for map in named {
        for (name, value) in map {
            bound.insert(name.clone(), value.clone());
        }
    }

    for arg in &dep_task.args {
        if !bound.contains_key(&arg.name) {
            match &arg.default {
                Some(default) => {
                    bound.insert(arg.name.clone(), default.clone());
                }
                None => {
                    return Err(ExecutionError::MissingArgument {
                        task: dep_task.name.clone(),
                        arg: arg.name.clone(),
                    }
                    .into())
                }
            }
        }
    }

    Ok(bound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::model::TaskArg;

    fn task_with_args(args: &[(&str, Option<&str>)]) -> Task {
        let mut task = Task::new("greet");
        task.args = args
            .iter()
            .map(|(name, default)| TaskArg {
                name: name.to_string(),
                default: default.map(str::to_string),
            })
            .collect();
        task
    }

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_positional_then_default() {
        let task = task_with_args(&[("a", None), ("b", Some("1"))]);
        let bound = bind_arguments(&task, &strings(&["x"])).unwrap();
        assert_eq!(bound["a"], "x");
        assert_eq!(bound["b"], "1");
    }

    #[test]
    fn test_missing_required_argument() {
        let task = task_with_args(&[("a", None)]);
        let err = bind_arguments(&task, &[]).unwrap_err();
        match err {
            ExecutionError::MissingArgument { task, arg } => {
                assert_eq!(task, "greet");
                assert_eq!(arg, "a");
            }
            other => panic!("expected MissingArgument, got {other:?}"),
        }
    }

    #[test]
    fn test_supplied_value_beats_default() {
        let task = task_with_args(&[("a", Some("default"))]);
        let bound = bind_arguments(&task, &strings(&["given"])).unwrap();
        assert_eq!(bound["a"], "given");
    }

    #[test]
    fn test_extra_positionals_ignored() {
        let task = task_with_args(&[("a", None)]);
        let bound = bind_arguments(&task, &strings(&["x", "y", "z"])).unwrap();
        assert_eq!(bound.len(), 1);
        assert_eq!(bound["a"], "x");
    }

    #[test]
    fn test_no_declared_args() {
        let task = task_with_args(&[]);
        let bound = bind_arguments(&task, &strings(&["ignored"])).unwrap();
        assert!(bound.is_empty());
    }

    fn dep_with_args(entries: Vec<DependencyArg>) -> TaskDependency {
        TaskDependency {
            task: "build".to_string(),
            args: entries,
            environment: None,
        }
    }

    #[test]
    fn test_dependency_positional_rendered_against_caller() {
        let mut dep_task = task_with_args(&[("mode", None)]);
        dep_task.name = "build".to_string();

        let dep = dep_with_args(vec![DependencyArg::Positional("${profile}".to_string())]);
        let caller: BTreeMap<String, String> =
            [("profile".to_string(), "release".to_string())].into();

        let bound = bind_dependency_arguments(&dep, &dep_task, &caller).unwrap();
        assert_eq!(bound["mode"], "release");
    }

    #[test]
    fn test_dependency_named_merge() {
        let mut dep_task = task_with_args(&[("mode", Some("debug"))]);
        dep_task.name = "build".to_string();

        let dep = dep_with_args(vec![DependencyArg::Named(
            [("mode".to_string(), "fast".to_string())].into(),
        )]);

        let bound = bind_dependency_arguments(&dep, &dep_task, &BTreeMap::new()).unwrap();
        assert_eq!(bound["mode"], "fast");
    }

    #[test]
    fn test_mixed_list_positions_count_positional_entries_only() {
        // Entries: [{x: "1"}, "y"]: the positional "y" binds the FIRST
        // declared argument; the map then merges by name.
        let mut dep_task = task_with_args(&[("first", None), ("x", Some("0"))]);
        dep_task.name = "build".to_string();

        let dep = dep_with_args(vec![
            DependencyArg::Named([("x".to_string(), "1".to_string())].into()),
            DependencyArg::Positional("y".to_string()),
        ]);

        let bound = bind_dependency_arguments(&dep, &dep_task, &BTreeMap::new()).unwrap();
        assert_eq!(bound["first"], "y");
        assert_eq!(bound["x"], "1");
    }

    #[test]
    fn test_named_merge_applied_after_positional_alignment() {
        // A map entry naming the same argument a positional entry bound
        // wins, because merges happen after alignment.
        let mut dep_task = task_with_args(&[("mode", None)]);
        dep_task.name = "build".to_string();

        let dep = dep_with_args(vec![
            DependencyArg::Positional("from-positional".to_string()),
            DependencyArg::Named([("mode".to_string(), "from-map".to_string())].into()),
        ]);

        let bound = bind_dependency_arguments(&dep, &dep_task, &BTreeMap::new()).unwrap();
        assert_eq!(bound["mode"], "from-map");
    }

    #[test]
    fn test_dependency_defaults_fill_uncovered() {
        let mut dep_task = task_with_args(&[("a", None), ("b", Some("fallback"))]);
        dep_task.name = "build".to_string();

        let dep = dep_with_args(vec![DependencyArg::Positional("v".to_string())]);
        let bound = bind_dependency_arguments(&dep, &dep_task, &BTreeMap::new()).unwrap();
        assert_eq!(bound["a"], "v");
        assert_eq!(bound["b"], "fallback");
    }

    #[test]
    fn test_dependency_missing_required_errors() {
        let mut dep_task = task_with_args(&[("a", None)]);
        dep_task.name = "build".to_string();

        let dep = dep_with_args(vec![]);
        let result = bind_dependency_arguments(&dep, &dep_task, &BTreeMap::new());
        assert!(result.is_err());
    }

    #[test]
    fn test_dependency_extra_positionals_ignored() {
        let mut dep_task = task_with_args(&[("a", None)]);
        dep_task.name = "build".to_string();

        let dep = dep_with_args(vec![
            DependencyArg::Positional("one".to_string()),
            DependencyArg::Positional("two".to_string()),
        ]);
        let bound = bind_dependency_arguments(&dep, &dep_task, &BTreeMap::new()).unwrap();
        assert_eq!(bound.len(), 1);
        assert_eq!(bound["a"], "one");
    }
}
