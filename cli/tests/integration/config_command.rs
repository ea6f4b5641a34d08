//! Integration tests for `flow config`.
//!
//! Every test points `FLOW_CONFIG` at a temp path so they never read or
//! write `~/.flow/config.yaml`.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn flow() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("flow"));
    cmd.env("NO_COLOR", "1").env_remove("FLOW_TOKEN");
    cmd
}

/// Returns a `TempDir` and the path string for a config file inside it.
fn temp_config_path() -> (TempDir, String) {
    let dir = TempDir::new().expect("temp dir");
    let path = dir
        .path()
        .join("config.yaml")
        .to_string_lossy()
        .into_owned();
    (dir, path)
}

// ---------------------------------------------------------------------------
// Subcommand registration
// ---------------------------------------------------------------------------

#[test]
fn test_config_help_shows_show_and_set_subcommands() {
    flow()
        .args(["config", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("show"))
        .stdout(predicate::str::contains("set"));
}

// ---------------------------------------------------------------------------
// `flow config show`
// ---------------------------------------------------------------------------

#[test]
fn test_config_show_without_file_uses_defaults() {
    let (_dir, path) = temp_config_path();
    flow()
        .args(["config", "show"])
        .env("FLOW_CONFIG", &path)
        .assert()
        .success()
        .stdout(predicate::str::contains("redis://127.0.0.1:6379"))
        .stdout(predicate::str::contains("10053"))
        .stdout(predicate::str::contains("FLOW_CONFIG"));
}

#[test]
fn test_config_show_does_not_create_file() {
    let (_dir, path) = temp_config_path();
    flow()
        .args(["config", "show"])
        .env("FLOW_CONFIG", &path)
        .assert()
        .success();
    assert!(!std::path::Path::new(&path).exists());
}

#[test]
fn test_config_show_json_has_path_and_config() {
    let (_dir, path) = temp_config_path();
    let output = flow()
        .args(["config", "show", "--json"])
        .env("FLOW_CONFIG", &path)
        .output()
        .unwrap();
    assert!(output.status.success());
    let doc: serde_json::Value = serde_json::from_slice(&output.stdout).expect("valid JSON");
    assert_eq!(doc["path"], path.as_str());
    assert_eq!(doc["config"]["fleet"]["port"], 10053);
}

#[test]
fn test_config_show_masks_token() {
    let (_dir, path) = temp_config_path();
    std::fs::write(&path, "auth:\n  token: s3cr3t-token\n").unwrap();
    flow()
        .args(["config", "show"])
        .env("FLOW_CONFIG", &path)
        .assert()
        .success()
        .stdout(predicate::str::contains("(set)"))
        .stdout(predicate::str::contains("s3cr3t-token").not());
}

// ---------------------------------------------------------------------------
// `flow config set`
// ---------------------------------------------------------------------------

#[test]
fn test_config_set_persists_value() {
    let (_dir, path) = temp_config_path();
    flow()
        .args(["config", "set", "fleet.port", "9000"])
        .env("FLOW_CONFIG", &path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Set fleet.port = 9000"));

    let written = std::fs::read_to_string(&path).unwrap();
    assert!(written.contains("port: 9000"), "{written}");

    flow()
        .args(["config", "show"])
        .env("FLOW_CONFIG", &path)
        .assert()
        .success()
        .stdout(predicate::str::contains("9000"));
}

#[test]
fn test_config_set_token_is_not_echoed() {
    let (_dir, path) = temp_config_path();
    flow()
        .args(["config", "set", "auth.token", "hunter2"])
        .env("FLOW_CONFIG", &path)
        .assert()
        .success()
        .stdout(predicate::str::contains("hunter2").not());
}

#[test]
fn test_config_set_unknown_key_fails() {
    let (_dir, path) = temp_config_path();
    flow()
        .args(["config", "set", "security.level", "strict"])
        .env("FLOW_CONFIG", &path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown setting"));
    assert!(!std::path::Path::new(&path).exists());
}

#[test]
fn test_config_set_invalid_value_fails() {
    let (_dir, path) = temp_config_path();
    flow()
        .args(["config", "set", "fleet.concurrency", "0"])
        .env("FLOW_CONFIG", &path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid value for fleet.concurrency"));
}

#[test]
fn test_config_set_unknown_key_json_error() {
    let (_dir, path) = temp_config_path();
    let output = flow()
        .args(["config", "set", "nope.key", "1", "--json"])
        .env("FLOW_CONFIG", &path)
        .output()
        .unwrap();
    assert!(!output.status.success());
    let doc: serde_json::Value = serde_json::from_slice(&output.stdout).expect("valid JSON");
    assert_eq!(doc["error"]["code"], "unknown_setting");
    assert!(doc["error"]["message"].as_str().unwrap().contains("Unknown setting"));
}

#[test]
fn test_unparsable_config_file_is_reported() {
    let (_dir, path) = temp_config_path();
    std::fs::write(&path, "fleet: [not, a, mapping\n").unwrap();
    flow()
        .args(["version"])
        .env("FLOW_CONFIG", &path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot parse"));
}
