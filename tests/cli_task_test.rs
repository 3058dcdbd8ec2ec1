//! Integration tests for task commands and the dependency graph via CLI.

mod common;

use common::TestEnv;
use predicates::prelude::*;

/// Initialized project with one asset; returns the env and the asset id.
fn setup() -> (TestEnv, String) {
    let env = TestEnv::init();
    let asset = env.create(&["asset", "create", "Hero"]);
    (env, asset)
}

fn ids(list: &serde_json::Value) -> Vec<String> {
    list["tasks"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["id"].as_str().unwrap().to_string())
        .collect()
}

// === Create / List ===

#[test]
fn test_task_create_json() {
    let (env, asset) = setup();
    let task = env.json(&[
        "task", "create", &asset, "Model", "--type", "modeling", "-p", "2", "--due", "2026-03-01",
    ]);
    assert!(task["id"].as_str().unwrap().starts_with("tsk-"));
    assert_eq!(task["name"], "Model");
    assert_eq!(task["task_type"], "modeling");
    assert_eq!(task["priority"], 2);
    assert_eq!(task["status"], "not_started");
    assert_eq!(task["due_date"], "2026-03-01");
}

#[test]
fn test_task_create_human() {
    let (env, asset) = setup();
    env.vg()
        .args(["task", "create", &asset, "Model", "-H"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created task"))
        .stdout(predicate::str::contains("[P3] Model (not_started)"));
}

#[test]
fn test_task_create_rejects_bad_input() {
    let (env, asset) = setup();
    env.vg()
        .args(["task", "create", &asset, "Model", "-p", "9"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Priority must be 1-5"));
    env.vg()
        .args(["task", "create", &asset, "Model", "--due", "tomorrow"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("YYYY-MM-DD"));
    env.vg()
        .args(["task", "create", "fld-missing0", "Model"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("\"kind\":\"not_found\""));
}

#[test]
fn test_task_list_filters() {
    let (env, asset) = setup();
    let other = env.create(&["asset", "create", "Villain"]);
    let a = env.create(&["task", "create", &asset, "Model", "-a", "alice", "-p", "1"]);
    let b = env.create(&["task", "create", &asset, "Rig", "-p", "2"]);
    env.create(&["task", "create", &other, "Model"]);

    let mine = env.json(&["task", "list", "--assignee", "alice"]);
    assert_eq!(ids(&mine), vec![a.clone()]);

    let hero = env.json(&["task", "list", "--folder", &asset]);
    assert_eq!(ids(&hero), vec![a.clone(), b.clone()]);

    env.vg().args(["task", "status", &b, "wip"]).assert().success();
    let wip = env.json(&["task", "list", "--status", "in_progress"]);
    assert_eq!(ids(&wip), vec![b]);

    env.vg()
        .args(["task", "list", "--status", "sleeping"])
        .assert()
        .failure();
}

#[test]
fn test_task_assign_and_unassign() {
    let (env, asset) = setup();
    let task = env.create(&["task", "create", &asset, "Model"]);

    let assigned = env.json(&["task", "assign", &task, "bob"]);
    assert_eq!(assigned["assignee"], "bob");

    let cleared = env.json(&["task", "assign", &task]);
    assert!(cleared.get("assignee").is_none());
}

// === Dependencies ===

#[test]
fn test_dependency_blocks_done() {
    let (env, asset) = setup();
    let model = env.create(&["task", "create", &asset, "Model"]);
    let rig = env.create(&["task", "create", &asset, "Rig", "--depends-on", &model]);

    let blocked = env.json(&["task", "blocked"]);
    assert_eq!(ids(&blocked), vec![rig.clone()]);
    let ready = env.json(&["task", "ready"]);
    assert_eq!(ids(&ready), vec![model.clone()]);

    env.vg()
        .args(["task", "status", &rig, "done"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("blocked by"));

    env.vg().args(["task", "status", &model, "done"]).assert().success();
    env.json(&["task", "status", &rig, "done"]);

    assert_eq!(env.json(&["task", "blocked"])["count"], 0);
}

#[test]
fn test_dependency_cycle_rejected() {
    let (env, asset) = setup();
    let a = env.create(&["task", "create", &asset, "A"]);
    let b = env.create(&["task", "create", &asset, "B"]);
    let c = env.create(&["task", "create", &asset, "C"]);

    env.vg().args(["task", "dep", "add", &b, &a]).assert().success();
    env.vg().args(["task", "dep", "add", &c, &b]).assert().success();
    env.vg()
        .args(["task", "dep", "add", &a, &c])
        .assert()
        .failure()
        .stderr(predicate::str::contains("\"kind\":\"dependency_cycle\""));

    // Rejected edge leaves the graph unchanged
    let shown = env.json(&["show", &a]);
    assert!(shown.get("dependencies").is_none());
}

#[test]
fn test_self_dependency_rejected() {
    let (env, asset) = setup();
    let a = env.create(&["task", "create", &asset, "A"]);
    env.vg()
        .args(["task", "dep", "add", &a, &a])
        .assert()
        .failure()
        .stderr(predicate::str::contains("\"kind\":\"dependency_cycle\""));
}

#[test]
fn test_dependency_remove_unblocks() {
    let (env, asset) = setup();
    let a = env.create(&["task", "create", &asset, "A"]);
    let b = env.create(&["task", "create", &asset, "B"]);
    env.vg().args(["task", "dep", "add", &b, &a]).assert().success();

    env.vg()
        .args(["task", "dep", "rm", &b, &a, "-H"])
        .assert()
        .success()
        .stdout(predicate::str::contains("no longer depends on"));
    assert_eq!(env.json(&["task", "blocked"])["count"], 0);

    env.vg()
        .args(["task", "dep", "rm", &b, &a])
        .assert()
        .failure()
        .stderr(predicate::str::contains("\"kind\":\"not_found\""));
}

#[test]
fn test_deleted_dependency_does_not_block() {
    let (env, asset) = setup();
    let a = env.create(&["task", "create", &asset, "A"]);
    let b = env.create(&["task", "create", &asset, "B", "--depends-on", &a]);

    env.vg().args(["task", "delete", &a]).assert().success();
    let ready = env.json(&["task", "ready"]);
    assert_eq!(ids(&ready), vec![b.clone()]);
    env.vg().args(["task", "status", &b, "done"]).assert().success();
}
