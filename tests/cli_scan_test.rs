//! Integration tests for filesystem reconciliation and verification via CLI.

mod common;

use common::TestEnv;
use predicates::prelude::*;

const WORKFILE: &str = "06_Scenes/Hero/Hero_Model_v001.ma";

/// Project with asset Hero, product Model and Draft version v001.
fn setup() -> (TestEnv, String) {
    let env = TestEnv::init();
    let asset = env.create(&["asset", "create", "Hero"]);
    let product = env.create(&["product", "create", &asset, "Model", "--type", "model"]);
    let version = env.create(&["version", "create", &product]);
    (env, version)
}

fn count(report: &serde_json::Value, key: &str) -> usize {
    report["delta"][key].as_array().unwrap().len()
}

#[test]
fn test_scan_empty_project() {
    let env = TestEnv::init();
    let report = env.json(&["scan"]);
    assert_eq!(report["files_scanned"], 0);
    assert_eq!(count(&report, "new_files"), 0);
}

#[test]
fn test_scan_registers_workfile() {
    let (env, version) = setup();
    env.write_file(WORKFILE, b"//Maya ASCII");

    let report = env.json(&["scan"]);
    assert_eq!(report["files_scanned"], 1);
    assert_eq!(count(&report, "new_files"), 1);
    assert_eq!(count(&report, "new_representations"), 1);

    let shown = env.json(&["show", &version]);
    assert_eq!(shown["status"], "draft");
    let file_id = report["delta"]["new_files"][0].as_str().unwrap();
    let file = env.json(&["show", file_id]);
    assert_eq!(file["path"], WORKFILE);
    assert_eq!(file["hash_type"], "sha256");
}

#[test]
fn test_scan_is_idempotent() {
    let (env, _) = setup();
    env.write_file(WORKFILE, b"//Maya ASCII");
    env.json(&["scan"]);

    let snapshot = env.path().join("00_Pipeline/pipeline.json");
    let before = std::fs::read(&snapshot).unwrap();
    let second = env.json(&["scan"]);
    for key in ["new_files", "new_representations", "modified", "missing", "restored"] {
        assert_eq!(count(&second, key), 0, "{} not empty", key);
    }
    assert_eq!(std::fs::read(&snapshot).unwrap(), before);
}

#[test]
fn test_scan_flags_modified_and_missing() {
    let (env, _) = setup();
    env.write_file(WORKFILE, b"//Maya ASCII");
    let first = env.json(&["scan"]);
    let file_id = first["delta"]["new_files"][0].as_str().unwrap().to_string();

    env.write_file(WORKFILE, b"//Maya ASCII edited");
    let modified = env.json(&["scan"]);
    assert_eq!(modified["delta"]["modified"][0], file_id.as_str());
    let shown = env.json(&["show", &file_id]);
    assert_eq!(shown["sync"]["state"], "modified");

    env.vg()
        .args(["verify", &file_id])
        .assert()
        .failure()
        .stderr(predicate::str::contains("\"kind\":\"integrity\""));

    std::fs::remove_file(env.path().join(WORKFILE)).unwrap();
    let missing = env.json(&["scan"]);
    assert_eq!(missing["delta"]["missing"][0], file_id.as_str());

    env.write_file(WORKFILE, b"//Maya ASCII");
    let restored = env.json(&["scan"]);
    assert_eq!(restored["delta"]["restored"][0], file_id.as_str());
    assert!(env.json(&["show", &file_id]).get("sync").is_none());

    let verified = env.json(&["verify", &file_id]);
    assert_eq!(verified["verified"], true);
}

#[test]
fn test_scan_reports_unmatched_files() {
    let (env, _) = setup();
    env.write_file("06_Scenes/Hero/notes.txt", b"todo");
    env.write_file("06_Scenes/Hero/Villain_Model_v001.ma", b"x");
    env.write_file("06_Scenes/Hero/Hero_Model_v004.ma", b"x");

    let report = env.json(&["scan"]);
    assert_eq!(count(&report, "new_files"), 0);
    let unmatched = report["unmatched"].as_array().unwrap();
    assert_eq!(unmatched.len(), 3);
}

#[test]
fn test_scan_skips_reserved_directories() {
    let (env, _) = setup();
    env.write_file("05_Publish/Hero/Model/v001/ma/Hero_Model_v001.ma", b"published");
    env.write_file("06_Scenes/.cache/Hero_Model_v001.ma", b"hidden");

    let report = env.json(&["scan", "-j", "2"]);
    assert_eq!(report["files_scanned"], 0);
}

#[test]
fn test_scan_human_summary() {
    let (env, _) = setup();
    env.write_file(WORKFILE, b"//Maya ASCII");
    env.vg()
        .args(["scan", "-H"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Scanned 1 file(s)"))
        .stdout(predicate::str::contains("new files: 1"));
}

#[test]
fn test_published_version_files_are_not_adopted() {
    let (env, version) = setup();
    env.write_file("06_Scenes/Hero/Hero_Model_v001.abc", b"cache");
    env.write_file(WORKFILE, b"//Maya ASCII");
    env.vg()
        .args(["version", "add-file", &version, WORKFILE])
        .assert()
        .success();
    env.vg().args(["version", "publish", &version]).assert().success();

    let report = env.json(&["scan"]);
    assert_eq!(count(&report, "new_files"), 0);
    let reasons: Vec<&str> = report["unmatched"]
        .as_array()
        .unwrap()
        .iter()
        .map(|u| u["reason"].as_str().unwrap())
        .collect();
    assert_eq!(reasons.len(), 1);
    assert!(reasons[0].contains("published"));
}

#[test]
fn test_verify_unknown_file() {
    let env = TestEnv::init();
    env.vg()
        .args(["verify", "fil-00000000"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("\"kind\":\"not_found\""));
}
