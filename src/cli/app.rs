//! Main CLI application

use std::io;
use std::path::{Path, PathBuf};

use clap::{Arg, ArgAction, ArgMatches, Command};
use clap_complete::{generate, Shell};
use colored::Colorize;

use crate::error::{ManifestError, Result};
use crate::manifest::model::{Command as TaskCommand, Task};
use crate::manifest::{detect_and_parse, find_manifest, get_parser};
use crate::runner::{run_target, RunOptions, Verbosity};

/// Build the clap command tree
pub fn build_command() -> Command {
    Command::new("taskrun")
        .version(env!("CARGO_PKG_VERSION"))
        .about("A TOML/YAML project task runner with dependency graphs and incremental caching")
        .arg(
            Arg::new("file")
                .short('f')
                .long("file")
                .value_name("FILE")
                .help("Path to the task manifest")
                .global(true),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .help("Only print command output and errors")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .arg(
            Arg::new("silent")
                .short('s')
                .long("silent")
                .help("Print no output")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Print verbose output")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .subcommand(
            Command::new("run")
                .about("Run a task and its dependencies")
                .arg(Arg::new("task").required(true).help("Task to run"))
                .arg(
                    Arg::new("args")
                        .value_name("ARGS")
                        .num_args(0..)
                        .help("Positional values for the task's declared arguments"),
                )
                .arg(
                    Arg::new("skip-deps")
                        .long("skip-deps")
                        .action(ArgAction::SetTrue)
                        .help("Run only the named task, ignoring dependencies"),
                )
                .arg(
                    Arg::new("dry-run")
                        .long("dry-run")
                        .action(ArgAction::SetTrue)
                        .help("Print commands without executing them"),
                )
                .arg(
                    Arg::new("cwd")
                        .long("cwd")
                        .value_name("DIR")
                        .help("Working directory override for every task"),
                )
                .arg(
                    Arg::new("env")
                        .long("env")
                        .value_name("NAME")
                        .help("Named environment to run under"),
                )
                .arg(
                    Arg::new("prefix")
                        .long("prefix")
                        .value_name("DIR")
                        .conflicts_with("env")
                        .help("Environment prefix directory"),
                )
                .arg(
                    Arg::new("clean-env")
                        .long("clean-env")
                        .action(ArgAction::SetTrue)
                        .help("Run with a clean, minimal environment"),
                ),
        )
        .subcommand(
            Command::new("list")
                .about("List tasks defined in the manifest")
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Emit the task list as JSON"),
                ),
        )
        .subcommand(
            Command::new("export")
                .about("Convert the manifest to TOML")
                .arg(
                    Arg::new("output")
                        .short('o')
                        .long("output")
                        .value_name("FILE")
                        .help("Write to a file instead of stdout"),
                ),
        )
        .subcommand(
            Command::new("add")
                .about("Add a task to a YAML manifest")
                .arg(Arg::new("name").required(true).help("Task name"))
                .arg(Arg::new("cmd").required(true).help("Command to run"))
                .arg(
                    Arg::new("description")
                        .long("description")
                        .value_name("TEXT")
                        .help("Human-readable description"),
                ),
        )
        .subcommand(
            Command::new("remove")
                .about("Remove a task from a YAML manifest")
                .arg(Arg::new("name").required(true).help("Task name"))
                .arg(
                    Arg::new("dry-run")
                        .long("dry-run")
                        .action(ArgAction::SetTrue)
                        .help("Show what would be removed without writing"),
                ),
        )
        .subcommand(
            Command::new("completions")
                .about("Generate shell completions")
                .arg(
                    Arg::new("shell")
                        .required(true)
                        .value_parser(clap::value_parser!(Shell))
                        .help("Shell to generate completions for"),
                ),
        )
}

/// Parse process arguments and dispatch
pub fn run() -> Result<()> {
    let mut command = build_command();
    let matches = command.clone().get_matches();

    let verbosity = get_verbosity(&matches);
    let file = matches.get_one::<String>("file").map(PathBuf::from);

    match matches.subcommand() {
        Some(("run", sub)) => cmd_run(sub, file.as_deref(), verbosity),
        Some(("list", sub)) => cmd_list(sub, file.as_deref()),
        Some(("export", sub)) => cmd_export(sub, file.as_deref()),
        Some(("add", sub)) => cmd_add(sub, file.as_deref()),
        Some(("remove", sub)) => cmd_remove(sub, file.as_deref()),
        Some(("completions", sub)) => {
            let shell = *sub
                .get_one::<Shell>("shell")
                .ok_or_else(|| ManifestError::Invalid("shell is required".to_string()))?;
            generate(shell, &mut build_command(), "taskrun", &mut io::stdout());
            Ok(())
        }
        _ => {
            command.print_help()?;
            println!();
            Ok(())
        }
    }
}

fn cmd_run(matches: &ArgMatches, file: Option<&Path>, verbosity: Verbosity) -> Result<()> {
    let (manifest_path, tasks) = detect_and_parse(file)?;

    let target = matches
        .get_one::<String>("task")
        .cloned()
        .unwrap_or_default();
    let positional: Vec<String> = matches
        .get_many::<String>("args")
        .map(|values| values.cloned().collect())
        .unwrap_or_default();

    let options = RunOptions {
        skip_deps: matches.get_flag("skip-deps"),
        dry_run: matches.get_flag("dry-run"),
        verbosity,
        cwd: matches.get_one::<String>("cwd").map(PathBuf::from),
        environment: matches.get_one::<String>("env").cloned(),
        prefix: matches.get_one::<String>("prefix").map(PathBuf::from),
        clean_env: matches.get_flag("clean-env"),
    };

    run_target(&manifest_path, &tasks, &target, &positional, &options)?;
    Ok(())
}

fn cmd_list(matches: &ArgMatches, file: Option<&Path>) -> Result<()> {
    let (manifest_path, tasks) = detect_and_parse(file)?;
    let visible: Vec<&Task> = tasks.values().filter(|t| !t.is_hidden()).collect();

    if matches.get_flag("json") {
        let entries: Vec<serde_json::Value> = visible
            .iter()
            .map(|task| {
                serde_json::json!({
                    "name": task.name,
                    "description": task.description,
                    "cmd": task.cmd.as_ref().map(TaskCommand::as_line),
                    "depends_on": task
                        .depends_on
                        .iter()
                        .map(|d| d.task.clone())
                        .collect::<Vec<_>>(),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    println!("Tasks in {}:", manifest_path.display());
    for task in visible {
        let mut line = format!("  {}", task.name.cyan().bold());
        if let Some(description) = &task.description {
            line.push_str(&format!("  {description}"));
        } else if let Some(cmd) = &task.cmd {
            line.push_str(&format!("  {}", cmd.as_line().dimmed()));
        }
        if !task.depends_on.is_empty() {
            let deps: Vec<&str> = task.depends_on.iter().map(|d| d.task.as_str()).collect();
            line.push_str(&format!(" [depends: {}]", deps.join(", ")));
        }
        println!("{line}");
    }
    Ok(())
}

fn cmd_export(matches: &ArgMatches, file: Option<&Path>) -> Result<()> {
    let (_, tasks) = detect_and_parse(file)?;
    let exported = crate::manifest::toml::export_manifest(&tasks)?;

    match matches.get_one::<String>("output") {
        Some(output) => std::fs::write(output, exported)?,
        None => print!("{exported}"),
    }
    Ok(())
}

fn cmd_add(matches: &ArgMatches, file: Option<&Path>) -> Result<()> {
    let path = manifest_path(file)?;
    let parser = get_parser(&path).ok_or_else(|| {
        ManifestError::Invalid(format!("no parser for manifest '{}'", path.display()))
    })?;

    let name = matches
        .get_one::<String>("name")
        .cloned()
        .unwrap_or_default();
    let mut task = Task::new(name.clone());
    task.cmd = matches
        .get_one::<String>("cmd")
        .map(|c| TaskCommand::Line(c.clone()));
    task.description = matches.get_one::<String>("description").cloned();

    parser.add_task(&path, &name, &task)?;
    println!("Added task '{}' to {}", name, path.display());
    Ok(())
}

fn cmd_remove(matches: &ArgMatches, file: Option<&Path>) -> Result<()> {
    let path = manifest_path(file)?;
    let parser = get_parser(&path).ok_or_else(|| {
        ManifestError::Invalid(format!("no parser for manifest '{}'", path.display()))
    })?;

    let name = matches
        .get_one::<String>("name")
        .cloned()
        .unwrap_or_default();

    if matches.get_flag("dry-run") {
        let tasks = parser.parse(&path)?;
        if !tasks.contains_key(&name) {
            return Err(ManifestError::NoSuchTask(name).into());
        }
        println!("Would remove task '{}' from {}", name, path.display());
        return Ok(());
    }

    parser.remove_task(&path, &name)?;
    println!("Removed task '{}' from {}", name, path.display());
    Ok(())
}

fn manifest_path(file: Option<&Path>) -> Result<PathBuf> {
    match file {
        Some(path) => Ok(path.to_path_buf()),
        None => Ok(find_manifest()?),
    }
}

/// Map the global flags to a verbosity level
fn get_verbosity(matches: &ArgMatches) -> Verbosity {
    if matches.get_flag("silent") {
        Verbosity::Silent
    } else if matches.get_flag("quiet") {
        Verbosity::Quiet
    } else if matches.get_flag("verbose") {
        Verbosity::Verbose
    } else {
        Verbosity::Normal
    }
}
