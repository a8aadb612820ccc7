//! Integration tests for the `camlink` CLI binary.
//!
//! These tests validate argument parsing, help output, shell completions,
//! and the failures that are caught before any packet leaves the host.
#![allow(clippy::unwrap_used)]

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `camlink` binary with env isolation.
///
/// Clears all `CAMLINK_*` env vars and points config directories at a
/// nonexistent path so tests never touch the user's real configuration.
fn camlink_cmd() -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("camlink");
    cmd.env("HOME", "/tmp/camlink-cli-test-nonexistent")
        .env("XDG_CONFIG_HOME", "/tmp/camlink-cli-test-nonexistent")
        .env_remove("CAMLINK_CAMERA")
        .env_remove("CAMLINK_ADDRESS")
        .env_remove("CAMLINK_USERNAME")
        .env_remove("CAMLINK_PASSWORD")
        .env_remove("CAMLINK_OUTPUT")
        .env_remove("CAMLINK_INSECURE")
        .env_remove("CAMLINK_TIMEOUT")
        .env_remove("RUST_LOG");
    cmd
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let output = camlink_cmd().output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_flag() {
    camlink_cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("ONVIF")
            .and(predicate::str::contains("discover"))
            .and(predicate::str::contains("devices"))
            .and(predicate::str::contains("ptz")),
    );
}

#[test]
fn test_version_flag() {
    camlink_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("camlink"));
}

// ── Shell completions ───────────────────────────────────────────────

#[test]
fn test_completions_bash() {
    camlink_cmd()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

#[test]
fn test_completions_zsh() {
    camlink_cmd()
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#compdef"));
}

// ── Config ──────────────────────────────────────────────────────────

#[test]
fn test_config_show_no_config() {
    // A missing config file renders the defaults.
    camlink_cmd()
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[defaults]").and(predicate::str::contains("[retry]")));
}

#[test]
fn test_config_path() {
    camlink_cmd()
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
}

#[test]
fn test_set_password_unknown_camera() {
    let output = camlink_cmd()
        .args(["config", "set-password", "garage", "--password", "pw"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(4));
    assert!(combined_output(&output).contains("garage"));
}

// ── Error cases ─────────────────────────────────────────────────────

#[test]
fn test_invalid_subcommand() {
    let output = camlink_cmd().arg("foobar").output().unwrap();
    assert!(
        !output.status.success(),
        "Expected failure for invalid subcommand"
    );
    let text = combined_output(&output);
    assert!(
        text.contains("invalid") || text.contains("unrecognized") || text.contains("foobar"),
        "Expected error mentioning invalid subcommand:\n{text}"
    );
}

#[test]
fn test_invalid_output_format() {
    let output = camlink_cmd()
        .args(["--output", "invalid", "devices", "probe"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    let text = combined_output(&output);
    assert!(
        text.contains("invalid") || text.contains("possible values"),
        "Expected error about output format:\n{text}"
    );
}

#[test]
fn test_devices_probe_without_camera() {
    let output = camlink_cmd().args(["devices", "probe"]).output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    let text = combined_output(&output);
    assert!(text.contains("No camera selected"), "Unexpected output:\n{text}");
}

#[test]
fn test_address_without_password_needs_credentials() {
    let output = camlink_cmd()
        .args(["-a", "192.0.2.10", "-u", "admin", "devices", "probe"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(3));
    assert!(combined_output(&output).contains("No credentials"));
}

#[test]
fn test_zero_timeout_is_rejected_before_connecting() {
    camlink_cmd()
        .args([
            "-a",
            "192.0.2.10",
            "-u",
            "admin",
            "--password",
            "pw",
            "--timeout",
            "0",
            "devices",
            "probe",
        ])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("timeout"));
}

#[test]
fn test_ptz_velocity_out_of_range() {
    // Validation happens before any camera is contacted.
    camlink_cmd()
        .args(["ptz", "move", "--pan", "2.5"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Invalid value"));
}

#[test]
fn test_ptz_stop_flags_conflict() {
    camlink_cmd()
        .args(["ptz", "stop", "--pan-tilt-only", "--zoom-only"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be used with"));
}

#[test]
fn test_imaging_set_requires_a_value() {
    camlink_cmd()
        .args(["imaging", "set"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("--brightness"));
}

#[test]
fn test_discover_zero_timeout() {
    camlink_cmd()
        .args(["discover", "--timeout-ms", "0"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("timeout-ms"));
}

#[test]
fn test_watch_zero_interval() {
    camlink_cmd()
        .args(["watch", "--interval", "0"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("interval"));
}
