//! CLI behavior tests: exit codes, output formats, history commands, init.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("test-fixtures/events")
        .join(name)
}

fn runreport_cmd(dir: &TempDir) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_runreport"));
    cmd.current_dir(dir.path()).env_remove("RUST_LOG");
    cmd
}

fn ingest(dir: &TempDir, name: &str) -> Command {
    let mut cmd = runreport_cmd(dir);
    cmd.arg("ingest").arg(fixture(name)).arg("--output-dir").arg(dir.path().join("reports"));
    cmd
}

#[test]
fn no_args_returns_usage_error() {
    let dir = TempDir::new().unwrap();
    runreport_cmd(&dir)
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn ingest_passing_run_exit_0() {
    let dir = TempDir::new().unwrap();
    ingest(&dir, "passing.jsonl")
        .arg("--no-color")
        .arg("--fail-on-blocking")
        .assert()
        .success()
        .stdout(predicate::str::contains("Run "))
        .stdout(predicate::str::contains("[PASS]"))
        .stdout(predicate::str::contains("index.html"));

    let reports = dir.path().join("reports");
    assert!(reports.join("runs-manifest.json").exists());
    assert!(reports.join("latest-run.json").exists());
}

#[test]
fn blocking_findings_exit_1_with_flag() {
    let dir = TempDir::new().unwrap();
    ingest(&dir, "failing.jsonl").arg("--fail-on-blocking").assert().failure().code(1);
}

#[test]
fn blocking_findings_exit_0_without_flag() {
    let dir = TempDir::new().unwrap();
    ingest(&dir, "failing.jsonl").assert().success();
}

#[test]
fn json_output_valid() {
    let dir = TempDir::new().unwrap();
    let output = ingest(&dir, "failing.jsonl").arg("--json").output().unwrap();
    assert!(output.status.success());
    let s = String::from_utf8_lossy(&output.stdout);
    let v: serde_json::Value = serde_json::from_str(s.trim()).expect("valid JSON");
    assert_eq!(v["overallStatus"], "fail");
    assert_eq!(v["topics"][0]["baseName"], "wcag");
    assert_eq!(v["topics"][0]["metrics"]["blocking"], 3);
    assert_eq!(v["counts"]["flaky"], 1);
    assert!(v["reportPath"].as_str().unwrap().ends_with("index.html"));
}

#[test]
fn missing_event_file_exit_2() {
    let dir = TempDir::new().unwrap();
    runreport_cmd(&dir)
        .args(["ingest", "does-not-exist.jsonl"])
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("Failed to open event stream"));
}

#[test]
fn show_prints_latest_report_path() {
    let dir = TempDir::new().unwrap();
    ingest(&dir, "passing.jsonl").arg("--run-id").arg("links-1").assert().success();
    runreport_cmd(&dir)
        .args(["show", "--output-dir"])
        .arg(dir.path().join("reports"))
        .assert()
        .success()
        .stdout(predicate::str::contains("links-1").and(predicate::str::contains("index.html")));
}

#[test]
fn show_unknown_run_exit_2() {
    let dir = TempDir::new().unwrap();
    ingest(&dir, "passing.jsonl").assert().success();
    runreport_cmd(&dir)
        .args(["show", "nope", "--output-dir"])
        .arg(dir.path().join("reports"))
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("No run matching"));
}

#[test]
fn list_shows_runs_newest_first() {
    let dir = TempDir::new().unwrap();
    ingest(&dir, "passing.jsonl").arg("--run-id").arg("older").assert().success();
    ingest(&dir, "failing.jsonl").arg("--run-id").arg("newer").assert().success();
    let output = runreport_cmd(&dir)
        .args(["list", "--json", "--output-dir"])
        .arg(dir.path().join("reports"))
        .output()
        .unwrap();
    assert!(output.status.success());
    let v: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let ids: Vec<&str> = v.as_array().unwrap().iter().map(|e| e["runId"].as_str().unwrap()).collect();
    assert_eq!(ids, vec!["newer", "older"]);
}

#[test]
fn reindex_recovers_deleted_manifest() {
    let dir = TempDir::new().unwrap();
    ingest(&dir, "passing.jsonl").arg("--run-id").arg("r1").assert().success();
    let reports = dir.path().join("reports");
    fs::remove_file(reports.join("runs-manifest.json")).unwrap();
    fs::remove_file(reports.join("latest-run.json")).unwrap();

    runreport_cmd(&dir)
        .args(["reindex", "--output-dir"])
        .arg(&reports)
        .assert()
        .success()
        .stdout(predicate::str::contains("Indexed 1 run"));
    assert!(reports.join("runs-manifest.json").exists());
    assert!(reports.join("latest-run.json").exists());
}

#[test]
fn init_creates_config_and_refuses_overwrite() {
    let dir = TempDir::new().unwrap();
    runreport_cmd(&dir).arg("init").assert().success();
    let config = dir.path().join(".runreportrc.json");
    let v: serde_json::Value = serde_json::from_str(&fs::read_to_string(&config).unwrap()).unwrap();
    assert_eq!(v["outputDir"], "test-results/run-reports");

    runreport_cmd(&dir)
        .arg("init")
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("already exists"));
    runreport_cmd(&dir).args(["init", "--force"]).assert().success();
}

#[test]
fn config_output_dir_is_used() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join(".runreportrc.json"),
        r#"{ "outputDir": "from-config", "title": "Configured" }"#,
    )
    .unwrap();
    runreport_cmd(&dir)
        .arg("ingest")
        .arg(fixture("rejected.jsonl"))
        .assert()
        .success();
    assert!(dir.path().join("from-config/runs-manifest.json").exists());
}
