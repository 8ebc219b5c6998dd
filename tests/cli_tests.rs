//! End-to-end CLI behavior
#![allow(deprecated)] // suppress assert_cmd::Command::cargo_bin deprecation in tests

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;

const PASSING_CAPTURE: &str = r#"{
    "page_table": [
        {"start": 4096, "length": 4096, "attributes": "READ_ONLY | EXEC_PROTECT"}
    ],
    "memory_map": [
        {"physical_start": 0, "page_count": 16, "kind": "boot-services-data"}
    ],
    "resources": [
        {"base": 0, "length": 65536, "kind": "system-memory"}
    ],
    "special_regions": [],
    "non_protected_images": [],
    "attribute_enforcement": true
}"#;

fn capture_file(contents: &str) -> tempfile::NamedTempFile {
    let file = tempfile::NamedTempFile::new().unwrap();
    fs::write(file.path(), contents).unwrap();
    file
}

#[test]
fn test_cli_help() {
    let mut cmd = Command::cargo_bin("vigia").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage"));
}

#[test]
fn test_cli_requires_capture_argument() {
    let mut cmd = Command::cargo_bin("vigia").unwrap();
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("--capture"));
}

#[test]
fn test_cli_rejects_combined_mode_flags() {
    let capture = capture_file(PASSING_CAPTURE);
    let mut cmd = Command::cargo_bin("vigia").unwrap();
    cmd.arg("-r")
        .arg("-d")
        .arg("-c")
        .arg(capture.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be used with"));
}

#[test]
fn test_cli_reports_missing_capture_file() {
    let mut cmd = Command::cargo_bin("vigia").unwrap();
    cmd.arg("-c")
        .arg("/nonexistent/state.json")
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to load capture"));
}

#[test]
fn test_audit_of_compliant_capture_succeeds() {
    let capture = capture_file(PASSING_CAPTURE);
    let mut cmd = Command::cargo_bin("vigia").unwrap();
    cmd.arg("-r")
        .arg("-c")
        .arg(capture.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("[PASS] no-read-write-execute"))
        .stdout(predicate::str::contains("8 of 8 rules passed"));
}

#[test]
fn test_audit_failure_sets_exit_code() {
    let failing = PASSING_CAPTURE.replace(
        "\"attribute_enforcement\": true",
        "\"attribute_enforcement\": false",
    );
    let capture = capture_file(&failing);
    let mut cmd = Command::cargo_bin("vigia").unwrap();
    cmd.arg("-c")
        .arg(capture.path())
        .assert()
        .code(1)
        .stdout(predicate::str::contains("[FAIL] attribute-enforcement-present"));
}

#[test]
fn test_json_report_format() {
    let capture = capture_file(PASSING_CAPTURE);
    let mut cmd = Command::cargo_bin("vigia").unwrap();
    let output = cmd
        .arg("-c")
        .arg(capture.path())
        .arg("--format")
        .arg("json")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let parsed: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(parsed["rules"].as_array().unwrap().len(), 8);
}

#[test]
fn test_report_export_to_file() {
    let capture = capture_file(PASSING_CAPTURE);
    let out = tempfile::NamedTempFile::new().unwrap();
    let mut cmd = Command::cargo_bin("vigia").unwrap();
    cmd.arg("-c")
        .arg(capture.path())
        .arg("-o")
        .arg(out.path())
        .assert()
        .success();

    let report = fs::read_to_string(out.path()).unwrap();
    assert!(report.contains("8 of 8 rules passed"));
}

#[test]
fn test_dump_writes_snapshot_files() {
    let capture = capture_file(PASSING_CAPTURE);
    let dir = tempfile::tempdir().unwrap();
    let mut cmd = Command::cargo_bin("vigia").unwrap();
    cmd.arg("-d")
        .arg("-c")
        .arg(capture.path())
        .arg("--dump-dir")
        .arg(dir.path())
        .assert()
        .success();

    for name in ["PageTable.dat", "MemoryMap.dat", "Resources.dat", "LoadedImages.dat"] {
        assert!(dir.path().join(name).exists(), "{name} missing");
    }
    let page_table = fs::read_to_string(dir.path().join("PageTable.dat")).unwrap();
    assert!(page_table.contains("0x1000,0x2000"));
}
