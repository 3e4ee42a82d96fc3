//! Run orchestration
//!
//! Resolves the execution order for a target task, binds arguments along
//! dependency edges, consults the fingerprint cache and spawns each
//! command in sequence. The first non-zero exit aborts the run.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::{ExecutionError, Result};
use crate::manifest::model::Task;
use crate::runner::args::{bind_arguments, bind_dependency_arguments};
use crate::runner::cache;
use crate::runner::context::{AmbientContext, Printer, Verbosity};
use crate::runner::envs::{DirsEnvResolver, EnvResolver};
use crate::runner::graph::resolve_execution_order;
use crate::runner::shell::{ShellExecutor, ShellRequest, SubprocessShell};
use crate::runner::template;

/// Outcome of one task within a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    /// Fingerprint cache hit, command not spawned
    Skipped,
    /// Would have run; suppressed by `--dry-run`
    DryRun,
    /// Command exited zero, or the task was an alias
    Succeeded,
}

/// Caller-controlled knobs for one invocation
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Run only the target, ignoring its dependencies
    pub skip_deps: bool,

    /// Print commands without spawning anything
    pub dry_run: bool,

    pub verbosity: Verbosity,

    /// Working directory override for every task
    pub cwd: Option<PathBuf>,

    /// Named environment to run every task under
    pub environment: Option<String>,

    /// Explicit prefix directory; wins over any environment name
    pub prefix: Option<PathBuf>,

    /// Force a clean environment for every task
    pub clean_env: bool,
}

/// Per-task outcomes of a completed run, in execution order
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub states: Vec<(String, TaskState)>,
}

impl RunSummary {
    pub fn state_of(&self, task: &str) -> Option<TaskState> {
        self.states
            .iter()
            .find(|(name, _)| name == task)
            .map(|(_, state)| *state)
    }
}

/// Drives one run through injected shell and environment seams
pub struct Orchestrator<'a> {
    shell: &'a dyn ShellExecutor,
    envs: &'a dyn EnvResolver,
}

/// Run `target` with the default subprocess shell and on-disk
/// environment resolver.
pub fn run_target(
    manifest_path: &Path,
    tasks: &BTreeMap<String, Task>,
    target: &str,
    positional: &[String],
    options: &RunOptions,
) -> Result<RunSummary> {
    let root = project_root(manifest_path);
    let shell = SubprocessShell::default();
    let envs = DirsEnvResolver::for_project(&root);
    Orchestrator::new(&shell, &envs).run(manifest_path, tasks, target, positional, options)
}

impl<'a> Orchestrator<'a> {
    pub fn new(shell: &'a dyn ShellExecutor, envs: &'a dyn EnvResolver) -> Self {
        Orchestrator { shell, envs }
    }

    pub fn run(
        &self,
        manifest_path: &Path,
        tasks: &BTreeMap<String, Task>,
        target: &str,
        positional: &[String],
        options: &RunOptions,
    ) -> Result<RunSummary> {
        let root = project_root(manifest_path);
        let printer = Printer::new(options.verbosity);
        let ambient = AmbientContext::current(manifest_path.to_path_buf())
            .with_active_env(options.environment.clone());

        // Platform overrides apply before any graph or cache decision
        let resolved: BTreeMap<String, Task> = tasks
            .iter()
            .map(|(name, task)| (name.clone(), task.resolve_for_platform(&ambient.platform)))
            .collect();

        let order = resolve_execution_order(target, &resolved, options.skip_deps)?;
        let bindings = bind_along_edges(target, positional, &resolved, &order)?;
        let base_env = dotenv_base(&root);

        let mut states = Vec::with_capacity(order.len());
        for name in &order {
            let task = &resolved[name];
            let state = self.run_one(
                task,
                &bindings[name],
                &base_env,
                &root,
                &ambient,
                options,
                &printer,
            )?;
            states.push((name.clone(), state));
        }

        Ok(RunSummary { states })
    }

    #[allow(clippy::too_many_arguments)]
    fn run_one(
        &self,
        task: &Task,
        binding: &TaskBinding,
        base_env: &BTreeMap<String, String>,
        root: &Path,
        ambient: &AmbientContext,
        options: &RunOptions,
        printer: &Printer,
    ) -> Result<TaskState> {
        let Some(cmd) = &task.cmd else {
            // Alias: its dependencies already ran
            printer.detail(&format!("{}: alias, nothing to spawn", task.name));
            return Ok(TaskState::Succeeded);
        };

        // Bound arguments shadow ambient builtins of the same name
        let mut vars = ambient.template_vars();
        for (key, value) in &binding.args {
            vars.insert(key.clone(), value.clone());
        }

        let command = template::render(&cmd.as_line(), &vars)?;
        let task_env = template::render_map(&task.env, &vars)?;
        let inputs = template::render_list(&task.inputs, &vars)?;
        let outputs = template::render_list(&task.outputs, &vars)?;

        let cwd = match (&options.cwd, &task.cwd) {
            (Some(dir), _) => dir.clone(),
            (None, Some(dir)) => root.join(dir),
            (None, None) => root.to_path_buf(),
        };

        let mut env = base_env.clone();
        env.extend(task_env);

        // The cache consult comes before the dry-run gate so a dry run
        // forecasts the same skip decisions a real run would make
        let has_artifacts = !inputs.is_empty() || !outputs.is_empty();
        if has_artifacts
            && cache::is_cached(root, &task.name, &command, &env, &inputs, &outputs, &cwd)
        {
            printer.cached(&task.name);
            return Ok(TaskState::Skipped);
        }

        if options.dry_run {
            printer.dry_run(&task.name, &command);
            return Ok(TaskState::DryRun);
        }

        let prefix = self.resolve_prefix(task, binding, options)?;

        printer.running(&task.name, &command);
        let request = ShellRequest {
            command: command.clone(),
            cwd: cwd.clone(),
            env: env.clone(),
            prefix,
            clean_env: options.clean_env || task.clean_env,
        };
        let code = self.shell.run(&task.name, &request)?;
        if code != 0 {
            return Err(ExecutionError::TaskFailed {
                task: task.name.clone(),
                code,
            }
            .into());
        }

        if has_artifacts {
            cache::save_cache(root, &task.name, &command, &env, &inputs, &outputs, &cwd)?;
        }
        Ok(TaskState::Succeeded)
    }

    /// Prefix precedence: explicit `--prefix`, then `--env`, then the
    /// environment named on the dependency edge, then the task's
    /// `default-environment`.
    fn resolve_prefix(
        &self,
        task: &Task,
        binding: &TaskBinding,
        options: &RunOptions,
    ) -> Result<Option<PathBuf>> {
        if let Some(prefix) = &options.prefix {
            return Ok(Some(prefix.clone()));
        }
        let name = options
            .environment
            .as_ref()
            .or(binding.environment.as_ref())
            .or(task.default_environment.as_ref());
        match name {
            Some(name) => Ok(Some(self.envs.resolve(name)?)),
            None => Ok(None),
        }
    }
}

/// Arguments and edge environment a task runs with
#[derive(Debug, Clone, Default)]
struct TaskBinding {
    args: BTreeMap<String, String>,
    environment: Option<String>,
}

/// Bind arguments for every task in the run.
///
/// The target binds from CLI positionals; every dependency binds from
/// the edge that first reaches it, walking outward from the target, with
/// the caller's bound arguments available to edge templates. On a
/// diamond the first declared edge wins, which keeps the single
/// execution of a shared dependency deterministic.
fn bind_along_edges(
    target: &str,
    positional: &[String],
    tasks: &BTreeMap<String, Task>,
    order: &[String],
) -> Result<BTreeMap<String, TaskBinding>> {
    let mut bindings: BTreeMap<String, TaskBinding> = BTreeMap::new();
    bindings.insert(
        target.to_string(),
        TaskBinding {
            args: bind_arguments(&tasks[target], positional)?,
            environment: None,
        },
    );

    let mut queue = std::collections::VecDeque::from([target.to_string()]);
    while let Some(caller) = queue.pop_front() {
        let caller_args = bindings[&caller].args.clone();
        for dep in &tasks[&caller].depends_on {
            if bindings.contains_key(&dep.task) || !order.contains(&dep.task) {
                continue;
            }
            let dep_task = &tasks[&dep.task];
            bindings.insert(
                dep.task.clone(),
                TaskBinding {
                    args: bind_dependency_arguments(dep, dep_task, &caller_args)?,
                    environment: dep.environment.clone(),
                },
            );
            queue.push_back(dep.task.clone());
        }
    }

    Ok(bindings)
}

/// The directory containing the manifest is the project root
pub fn project_root(manifest_path: &Path) -> PathBuf {
    manifest_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// `.env` at the project root seeds the environment of every task
fn dotenv_base(root: &Path) -> BTreeMap<String, String> {
    let mut env = BTreeMap::new();
    if let Ok(entries) = dotenvy::from_path_iter(root.join(".env")) {
        for (key, value) in entries.flatten() {
            env.insert(key, value);
        }
    }
    env
}
