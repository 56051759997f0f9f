//! Integration tests for the `nexa-mqtt` binary.
//!
//! Covers argument parsing, configuration checks and startup errors. None of
//! these reach the Growatt cloud or an MQTT broker.
#![allow(clippy::unwrap_used)]

use std::path::{Path, PathBuf};

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::TempDir;

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the binary with env isolation.
///
/// Clears the `NEXA_*` variables the tests touch and points the config
/// directories at a nonexistent path.
fn nexa_cmd() -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("nexa-mqtt");
    cmd.env("HOME", "/tmp/nexa-mqtt-test-nonexistent")
        .env("XDG_CONFIG_HOME", "/tmp/nexa-mqtt-test-nonexistent")
        .env_remove("NEXA_CONFIG")
        .env_remove("NEXA_LOG_LEVEL")
        .env_remove("NEXA_MQTT__HOST")
        .env_remove("NEXA_MQTT__PASSWORD")
        .env_remove("NEXA_GROWATT__USERNAME")
        .env_remove("NEXA_GROWATT__PASSWORD")
        .env_remove("NEXA_GROWATT__API_MODE")
        .env_remove("RUST_LOG");
    cmd
}

fn write_config(dir: &Path, contents: &str) -> PathBuf {
    let path = dir.join("nexa.toml");
    std::fs::write(&path, contents).unwrap();
    path
}

fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

const VALID: &str = r#"
log_level = "warn"

[growatt]
username = "alice"
password = "hunter2"

[mqtt]
host = "broker.local"
username = "bridge"
password = "mqtt-secret"
"#;

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_help_flag() {
    nexa_cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("MQTT")
            .and(predicate::str::contains("--config"))
            .and(predicate::str::contains("--check")),
    );
}

#[test]
fn test_version_flag() {
    nexa_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("nexa-mqtt"));
}

#[test]
fn test_unknown_log_level_is_usage_error() {
    let output = nexa_cmd().args(["--log-level", "loud"]).output().unwrap();
    assert_eq!(output.status.code(), Some(2));
}

// ── Configuration ───────────────────────────────────────────────────

#[test]
fn test_missing_config_file() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("absent.toml");
    let output = nexa_cmd().arg("--config").arg(&missing).output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    let text = combined_output(&output);
    assert!(text.contains("not found"), "Expected 'not found' in output:\n{text}");
}

#[test]
fn test_check_accepts_valid_config() {
    let dir = TempDir::new().unwrap();
    let path = write_config(dir.path(), VALID);
    nexa_cmd()
        .arg("--config")
        .arg(&path)
        .arg("--check")
        .assert()
        .success()
        .stdout(predicate::str::contains("configuration ok"));
}

#[test]
fn test_check_reports_missing_mqtt_host() {
    let dir = TempDir::new().unwrap();
    let path = write_config(dir.path(), "[growatt]\nusername = \"a\"\npassword = \"b\"\n");
    let output = nexa_cmd().arg("--config").arg(&path).arg("--check").output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    let text = combined_output(&output);
    assert!(text.contains("mqtt.host"), "Expected 'mqtt.host' in output:\n{text}");
}

#[test]
fn test_env_fills_missing_host() {
    let dir = TempDir::new().unwrap();
    let path = write_config(dir.path(), "[growatt]\nusername = \"a\"\npassword = \"b\"\n");
    nexa_cmd()
        .arg("--config")
        .arg(&path)
        .arg("--check")
        .env("NEXA_MQTT__HOST", "broker.env")
        .assert()
        .success();
}

#[test]
fn test_print_config_masks_passwords() {
    let dir = TempDir::new().unwrap();
    let path = write_config(dir.path(), VALID);
    nexa_cmd()
        .arg("--config")
        .arg(&path)
        .arg("--print-config")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("broker.local")
                .and(predicate::str::contains("********"))
                .and(predicate::str::contains("hunter2").not())
                .and(predicate::str::contains("mqtt-secret").not()),
        );
}

#[test]
fn test_check_rejects_wildcard_discovery_prefix() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        dir.path(),
        &format!("{VALID}\n[homeassistant]\ntopic_prefix = \"ha/#\"\n"),
    );
    let output = nexa_cmd().arg("--config").arg(&path).arg("--check").output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    let text = combined_output(&output);
    assert!(
        text.contains("homeassistant.topic_prefix"),
        "Expected 'homeassistant.topic_prefix' in output:\n{text}"
    );
}
