//! End-to-end tests for the `smriti` binary, run against a throwaway
//! home directory per test (spec.md §8 seed scenarios).

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn harness() -> (Command, TempDir) {
    let home = TempDir::new().expect("tempdir");
    let mut cmd = Command::cargo_bin("smriti").expect("smriti binary");
    cmd.arg("--home").arg(home.path());
    (cmd, home)
}

fn write_manifest(home: &TempDir, title: &str, project: &str) -> std::path::PathBuf {
    let path = home.path().join("manifest.json");
    let manifest = serde_json::json!({
        "title": title,
        "project": project,
        "turns": [
            {"role": "user", "content": "how do I reset the staging database?"},
            {"role": "assistant", "content": "run scripts/reset_staging.sh from the repo root"},
        ]
    });
    std::fs::write(&path, serde_json::to_vec(&manifest).unwrap()).unwrap();
    path
}

#[test]
fn config_prints_defaults() {
    let (mut cmd, _home) = harness();
    cmd.arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("embedding_dimension"));
}

#[test]
fn config_json_is_well_formed() {
    let (mut cmd, _home) = harness();
    let output = cmd.args(["--format", "json", "config"]).output().unwrap();
    assert!(output.status.success());
    let parsed: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert!(parsed.get("embedding_dimension").is_some());
}

#[test]
fn ingest_then_search_finds_the_turn() {
    let (mut cmd, home) = harness();
    let manifest = write_manifest(&home, "staging reset", "acme");
    cmd.args(["ingest"]).arg(&manifest).assert().success().stdout(predicate::str::contains("ingested session"));

    let (mut search_cmd, _kept) = (Command::cargo_bin("smriti").unwrap(), &home);
    search_cmd
        .arg("--home")
        .arg(home.path())
        .arg("--project")
        .arg("acme")
        .args(["search", "reset staging database"])
        .assert()
        .success();
}

#[test]
fn recall_on_empty_home_reports_nothing() {
    let (mut cmd, _home) = harness();
    cmd.args(["recall", "anything at all"])
        .assert()
        .success()
        .stdout(predicate::str::contains("nothing recalled"));
}

#[test]
fn vasana_list_on_fresh_home_is_empty() {
    let (mut cmd, _home) = harness();
    cmd.args(["vasana", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("0 tendency"));
}

#[test]
fn svapna_runs_a_full_cycle_on_empty_home() {
    let (mut cmd, _home) = harness();
    cmd.arg("svapna").assert().success().stdout(predicate::str::contains("cycle"));
}

#[test]
fn ingest_rejects_unknown_turn_role() {
    let (mut cmd, home) = harness();
    let path = home.path().join("bad.json");
    let manifest = serde_json::json!({
        "title": "bad manifest",
        "turns": [{"role": "narrator", "content": "whoops"}],
    });
    std::fs::write(&path, serde_json::to_vec(&manifest).unwrap()).unwrap();

    cmd.arg("ingest")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown turn role"));
}
