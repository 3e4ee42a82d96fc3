//! Dependency graph resolution
//!
//! Computes the transitive dependency closure of a target task and a
//! deterministic execution order, or reports a cycle witness. All of
//! this is pure graph analysis; it runs before any process is spawned.

use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};

use crate::error::{GraphError, GraphResult};
use crate::manifest::model::Task;

/// Return task names in the order they should execute to run `target`.
///
/// With `skip_deps` the caller asserts dependencies are already
/// satisfied and only `[target]` is returned. Otherwise the order is the
/// topological sort of the transitive closure of `target`'s
/// dependencies, with lexical tie-breaking for reproducible output.
pub fn resolve_execution_order(
    target: &str,
    tasks: &BTreeMap<String, Task>,
    skip_deps: bool,
) -> GraphResult<Vec<String>> {
    if !tasks.contains_key(target) {
        return Err(task_not_found(target, tasks));
    }

    if skip_deps {
        return Ok(vec![target.to_string()]);
    }

    let reachable = collect_reachable(target, tasks)?;
    topological_order(&reachable, tasks)
}

/// Breadth-first traversal gathering every task reachable from `target`
/// along dependency edges.
pub fn collect_reachable(
    target: &str,
    tasks: &BTreeMap<String, Task>,
) -> GraphResult<BTreeSet<String>> {
    let mut visited = BTreeSet::new();
    let mut queue = VecDeque::from([target.to_string()]);

    while let Some(name) = queue.pop_front() {
        if visited.contains(&name) {
            continue;
        }
        let task = tasks.get(&name).ok_or_else(|| task_not_found(&name, tasks))?;
        visited.insert(name);
        for dep in &task.depends_on {
            if !visited.contains(&dep.task) {
                queue.push_back(dep.task.clone());
            }
        }
    }

    Ok(visited)
}

/// Kahn's algorithm restricted to `names`, breaking ties by ascending
/// lexical task name. Only edges with both endpoints in `names` count.
pub fn topological_order(
    names: &BTreeSet<String>,
    tasks: &BTreeMap<String, Task>,
) -> GraphResult<Vec<String>> {
    let mut in_degree: BTreeMap<&str, usize> =
        names.iter().map(|n| (n.as_str(), 0)).collect();
    let mut adjacency: BTreeMap<&str, Vec<&str>> =
        names.iter().map(|n| (n.as_str(), Vec::new())).collect();

    for name in names {
        for dep in &tasks[name].depends_on {
            if names.contains(&dep.task) {
                adjacency
                    .get_mut(dep.task.as_str())
                    .expect("dep in names")
                    .push(name.as_str());
                *in_degree.get_mut(name.as_str()).expect("name in names") += 1;
            }
        }
    }

    let mut ready: BTreeSet<&str> = in_degree
        .iter()
        .filter(|(_, deg)| **deg == 0)
        .map(|(name, _)| *name)
        .collect();
    let mut order = Vec::with_capacity(names.len());

    while let Some(node) = ready.pop_first() {
        order.push(node.to_string());
        for &successor in &adjacency[node] {
            let deg = in_degree.get_mut(successor).expect("successor in names");
            *deg -= 1;
            if *deg == 0 {
                ready.insert(successor);
            }
        }
    }

    if order.len() != names.len() {
        let remaining: BTreeSet<String> = names
            .iter()
            .filter(|n| !order.contains(*n))
            .cloned()
            .collect();
        return Err(GraphError::CyclicDependency {
            path: find_cycle(&remaining, tasks),
        });
    }

    Ok(order)
}

/// Find one cycle among `names` and return it as a path whose first and
/// last elements are the same task.
///
/// Iterative depth-first search with an explicit frame stack, so very
/// deep graphs cannot overflow the call stack.
pub fn find_cycle(names: &BTreeSet<String>, tasks: &BTreeMap<String, Task>) -> Vec<String> {
    let mut visited: HashSet<String> = HashSet::new();

    for start in names {
        if visited.contains(start) {
            continue;
        }

        // (task name, index of the next dependency to examine)
        let mut frames: Vec<(String, usize)> = vec![(start.clone(), 0)];
        let mut path: Vec<String> = vec![start.clone()];
        let mut on_stack: HashSet<String> = HashSet::from([start.clone()]);
        visited.insert(start.clone());

        while let Some(frame) = frames.last_mut() {
            let deps = &tasks[&frame.0].depends_on;
            let mut descend: Option<String> = None;

            while frame.1 < deps.len() {
                let dep = deps[frame.1].task.clone();
                frame.1 += 1;
                if !names.contains(&dep) {
                    continue;
                }
                if on_stack.contains(&dep) {
                    // Back edge: the cycle is the path slice from the
                    // first occurrence of `dep`, closed by `dep` itself.
                    let pos = path.iter().position(|n| *n == dep).expect("dep on path");
                    let mut cycle = path[pos..].to_vec();
                    cycle.push(dep);
                    return cycle;
                }
                if !visited.contains(&dep) {
                    descend = Some(dep);
                    break;
                }
            }

            match descend {
                Some(dep) => {
                    visited.insert(dep.clone());
                    on_stack.insert(dep.clone());
                    path.push(dep.clone());
                    frames.push((dep, 0));
                }
                None => {
                    let (done, _) = frames.pop().expect("frame exists");
                    path.pop();
                    on_stack.remove(&done);
                }
            }
        }
    }

    // Unreachable when callers pass the unresolved remainder of a failed
    // Kahn pass, but return something diagnosable regardless.
    names.iter().cloned().collect()
}

fn task_not_found(name: &str, tasks: &BTreeMap<String, Task>) -> GraphError {
    GraphError::TaskNotFound {
        name: name.to_string(),
        known: tasks.keys().cloned().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::model::TaskDependency;

    fn task_set(edges: &[(&str, &[&str])]) -> BTreeMap<String, Task> {
        let mut tasks = BTreeMap::new();
        for (name, deps) in edges {
            let mut task = Task::new(*name);
            task.depends_on = deps.iter().map(|d| TaskDependency::new(*d)).collect();
            tasks.insert(name.to_string(), task);
        }
        tasks
    }

    #[test]
    fn test_single_task_no_deps() {
        let tasks = task_set(&[("build", &[])]);
        let order = resolve_execution_order("build", &tasks, false).unwrap();
        assert_eq!(order, vec!["build"]);
    }

    #[test]
    fn test_linear_chain() {
        let tasks = task_set(&[
            ("deploy", &["test"]),
            ("test", &["build"]),
            ("build", &[]),
        ]);
        let order = resolve_execution_order("deploy", &tasks, false).unwrap();
        assert_eq!(order, vec!["build", "test", "deploy"]);
    }

    #[test]
    fn test_only_transitive_closure_included() {
        let tasks = task_set(&[
            ("test", &["build"]),
            ("build", &[]),
            ("unrelated", &[]),
        ]);
        let order = resolve_execution_order("test", &tasks, false).unwrap();
        assert_eq!(order, vec!["build", "test"]);
    }

    #[test]
    fn test_diamond_each_task_once() {
        let tasks = task_set(&[
            ("release", &["lint", "test"]),
            ("lint", &["build"]),
            ("test", &["build"]),
            ("build", &[]),
        ]);
        let order = resolve_execution_order("release", &tasks, false).unwrap();
        assert_eq!(order, vec!["build", "lint", "test", "release"]);
    }

    #[test]
    fn test_lexical_tie_break_is_deterministic() {
        let tasks = task_set(&[
            ("all", &["zeta", "alpha", "mid"]),
            ("zeta", &[]),
            ("alpha", &[]),
            ("mid", &[]),
        ]);
        for _ in 0..5 {
            let order = resolve_execution_order("all", &tasks, false).unwrap();
            assert_eq!(order, vec!["alpha", "mid", "zeta", "all"]);
        }
    }

    #[test]
    fn test_skip_deps_returns_target_alone() {
        let tasks = task_set(&[("test", &["build"]), ("build", &[])]);
        let order = resolve_execution_order("test", &tasks, true).unwrap();
        assert_eq!(order, vec!["test"]);
    }

    #[test]
    fn test_target_not_found() {
        let tasks = task_set(&[("build", &[])]);
        let err = resolve_execution_order("nope", &tasks, false).unwrap_err();
        match err {
            GraphError::TaskNotFound { name, known } => {
                assert_eq!(name, "nope");
                assert_eq!(known, vec!["build".to_string()]);
            }
            other => panic!("expected TaskNotFound, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_dependency_named() {
        let tasks = task_set(&[("test", &["ghost"])]);
        let err = resolve_execution_order("test", &tasks, false).unwrap_err();
        match err {
            GraphError::TaskNotFound { name, .. } => assert_eq!(name, "ghost"),
            other => panic!("expected TaskNotFound, got {other:?}"),
        }
    }

    #[test]
    fn test_self_dependency_is_a_cycle() {
        let tasks = task_set(&[("loop", &["loop"])]);
        let err = resolve_execution_order("loop", &tasks, false).unwrap_err();
        match err {
            GraphError::CyclicDependency { path } => {
                assert_eq!(path, vec!["loop", "loop"]);
            }
            other => panic!("expected CyclicDependency, got {other:?}"),
        }
    }

    #[test]
    fn test_cycle_path_starts_and_ends_at_same_task() {
        let tasks = task_set(&[("a", &["b"]), ("b", &["c"]), ("c", &["a"])]);
        let err = resolve_execution_order("a", &tasks, false).unwrap_err();
        match err {
            GraphError::CyclicDependency { path } => {
                assert_eq!(path.first(), path.last());
                assert_eq!(path.len(), 4);
                // No interior repeats
                let interior = &path[..path.len() - 1];
                let unique: BTreeSet<_> = interior.iter().collect();
                assert_eq!(unique.len(), interior.len());
            }
            other => panic!("expected CyclicDependency, got {other:?}"),
        }
    }

    #[test]
    fn test_cycle_behind_acyclic_prefix() {
        // "entry" itself is not on the cycle
        let tasks = task_set(&[("entry", &["x"]), ("x", &["y"]), ("y", &["x"])]);
        let err = resolve_execution_order("entry", &tasks, false).unwrap_err();
        match err {
            GraphError::CyclicDependency { path } => {
                assert_eq!(path.first(), path.last());
                assert!(!path.contains(&"entry".to_string()));
            }
            other => panic!("expected CyclicDependency, got {other:?}"),
        }
    }

    #[test]
    fn test_every_dependency_precedes_dependent() {
        let tasks = task_set(&[
            ("e", &["c", "d"]),
            ("d", &["b"]),
            ("c", &["a", "b"]),
            ("b", &["a"]),
            ("a", &[]),
        ]);
        let order = resolve_execution_order("e", &tasks, false).unwrap();
        let idx = |n: &str| order.iter().position(|o| o == n).unwrap();
        for name in &order {
            for dep in &tasks[name].depends_on {
                assert!(idx(&dep.task) < idx(name), "{} before {}", dep.task, name);
            }
        }
        assert_eq!(order.len(), 5);
    }
}
