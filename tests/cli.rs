//! CLI tests against the compiled binary

mod common;

use assert_cmd::Command;
use common::{toml_project, yaml_project};
use predicates::prelude::*;
use std::fs;

fn taskrun() -> Command {
    Command::cargo_bin("taskrun").unwrap()
}

#[test]
fn test_run_executes_a_task() {
    let (dir, _) = toml_project("[tasks]\nhello = \"echo done > marker\"\n");

    taskrun()
        .current_dir(dir.path())
        .args(["run", "hello", "-q"])
        .assert()
        .success();

    assert_eq!(
        fs::read_to_string(dir.path().join("marker")).unwrap(),
        "done\n"
    );
}

#[test]
fn test_failing_task_exits_nonzero() {
    let (dir, _) = toml_project("[tasks]\nboom = \"exit 3\"\n");

    taskrun()
        .current_dir(dir.path())
        .args(["run", "boom", "-q"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed with exit code 3"));
}

#[test]
fn test_unknown_task_names_known_tasks() {
    let (dir, _) = toml_project("[tasks]\nbuild = \"true\"\ntest = \"true\"\n");

    taskrun()
        .current_dir(dir.path())
        .args(["run", "deploy"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("'deploy' not found"))
        .stderr(predicate::str::contains("build"));
}

#[test]
fn test_missing_manifest_is_an_error() {
    let dir = tempfile::TempDir::new().unwrap();

    taskrun()
        .current_dir(dir.path())
        .args(["run", "build"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No task file found"));
}

#[test]
fn test_list_shows_tasks_and_hides_underscored() {
    let (dir, _) = toml_project(
        r#"
[tasks]
build = "make"
_internal = "true"

[tasks.test]
cmd = "make test"
description = "Run the test suite"
"#,
    );

    taskrun()
        .current_dir(dir.path())
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("build"))
        .stdout(predicate::str::contains("Run the test suite"))
        .stdout(predicate::str::contains("_internal").not());
}

#[test]
fn test_list_json_is_parseable() {
    let (dir, _) = toml_project(
        r#"
[tasks]
fmt = "cargo fmt"

[tasks.build]
cmd = "make"
depends-on = ["fmt"]
"#,
    );

    let output = taskrun()
        .current_dir(dir.path())
        .args(["list", "--json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let entries: serde_json::Value = serde_json::from_slice(&output).unwrap();
    let names: Vec<&str> = entries
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, ["build", "fmt"]);
    assert_eq!(entries[0]["depends_on"][0], "fmt");
}

#[test]
fn test_export_prints_toml_to_stdout() {
    let (dir, _) = yaml_project(
        r#"
tasks:
  build: make build
  test:
    cmd: pytest
    depends-on: [build]
"#,
    );

    taskrun()
        .current_dir(dir.path())
        .arg("export")
        .assert()
        .success()
        .stdout(predicate::str::contains("[tasks]"))
        .stdout(predicate::str::contains("build = \"make build\""));
}

#[test]
fn test_export_to_file_round_trips() {
    let (dir, _) = yaml_project(
        r#"
tasks:
  build: make build
  test:
    cmd: pytest
    depends-on: [build]
"#,
    );
    let out = dir.path().join("exported").join("tasks.toml");
    fs::create_dir_all(out.parent().unwrap()).unwrap();

    taskrun()
        .current_dir(dir.path())
        .args(["export", "--output"])
        .arg(&out)
        .assert()
        .success();

    let (_, tasks) = taskrun::manifest::detect_and_parse(Some(&out)).unwrap();
    assert_eq!(tasks["test"].depends_on[0].task, "build");
    assert_eq!(tasks["build"].cmd.as_ref().unwrap().as_line(), "make build");
}

#[test]
fn test_run_from_pyproject_manifest() {
    let (dir, _) = common::project_with_manifest(
        "pyproject.toml",
        "[tool.taskrun.tasks]\nhello = \"echo hi > marker\"\n",
    );

    taskrun()
        .current_dir(dir.path())
        .args(["run", "hello", "-q"])
        .assert()
        .success();

    assert!(dir.path().join("marker").exists());
}

#[test]
fn test_add_and_remove_on_yaml_manifest() {
    let (dir, path) = yaml_project("tasks:\n  fmt: cargo fmt\n");

    taskrun()
        .current_dir(dir.path())
        .args(["add", "lint", "cargo clippy", "--description", "Lint it"])
        .assert()
        .success();

    let contents = fs::read_to_string(&path).unwrap();
    assert!(contents.contains("lint"));
    assert!(contents.contains("cargo clippy"));

    taskrun()
        .current_dir(dir.path())
        .args(["remove", "lint"])
        .assert()
        .success();

    let contents = fs::read_to_string(&path).unwrap();
    assert!(!contents.contains("clippy"));
    assert!(contents.contains("fmt"));
}

#[test]
fn test_add_refuses_toml_manifest() {
    let (dir, _) = toml_project("[tasks]\nfmt = \"cargo fmt\"\n");

    taskrun()
        .current_dir(dir.path())
        .args(["add", "lint", "cargo clippy"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("read-only format"));
}

#[test]
fn test_remove_dry_run_leaves_the_manifest_alone() {
    let (dir, path) = yaml_project("tasks:\n  fmt: cargo fmt\n");
    let before = fs::read_to_string(&path).unwrap();

    taskrun()
        .current_dir(dir.path())
        .args(["remove", "fmt", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Would remove"));

    assert_eq!(fs::read_to_string(&path).unwrap(), before);
}

#[test]
fn test_explicit_file_flag() {
    let (dir, path) = toml_project("[tasks]\nhello = \"echo hi > marker\"\n");
    let elsewhere = tempfile::TempDir::new().unwrap();

    taskrun()
        .current_dir(elsewhere.path())
        .args(["run", "hello", "-q", "--file"])
        .arg(&path)
        .assert()
        .success();

    assert!(dir.path().join("marker").exists());
}

#[test]
fn test_dry_run_prints_without_executing() {
    let (dir, _) = toml_project("[tasks]\nhello = \"echo done > marker\"\n");

    taskrun()
        .current_dir(dir.path())
        .args(["run", "hello", "--dry-run"])
        .assert()
        .success()
        .stderr(predicate::str::contains("dry-run"));

    assert!(!dir.path().join("marker").exists());
}

#[test]
fn test_completions_emit_a_script() {
    taskrun()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("taskrun"));
}

#[test]
fn test_no_subcommand_prints_help() {
    taskrun()
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage"));
}
