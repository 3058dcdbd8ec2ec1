//! Smoke tests for the vg CLI.

mod common;

use assert_cmd::Command;
use common::TestEnv;
use predicates::prelude::*;

/// Get a Command for the vg binary.
fn vg() -> Command {
    Command::new(env!("CARGO_BIN_EXE_vg"))
}

#[test]
fn test_version_flag() {
    vg().arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("vg"))
        .stdout(predicate::str::contains("0.1.0"));
}

#[test]
fn test_help_flag() {
    vg().arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage:"))
        .stdout(predicate::str::contains("Commands:"))
        .stdout(predicate::str::contains("Options:"));
}

#[test]
fn test_no_args_shows_usage() {
    vg().assert()
        .failure()
        .stderr(predicate::str::contains("Usage:"));
}

#[test]
fn test_version_subcommand_help() {
    vg().args(["version", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("publish"))
        .stdout(predicate::str::contains("rollback"));
}

#[test]
fn test_uninitialized_project_reports_json_error() {
    let env = TestEnv::new();
    env.vg()
        .args(["project", "info"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("\"error\""))
        .stderr(predicate::str::contains("\"kind\":\"io\""))
        .stderr(predicate::str::contains("vg project init"));
}

#[test]
fn test_uninitialized_project_human_error() {
    let env = TestEnv::new();
    env.vg()
        .args(["project", "info", "-H"])
        .assert()
        .failure()
        .stderr(predicate::str::starts_with("Error: Not initialized"));
}
