//! Integration tests for the `homeguard` CLI binary.
//!
//! These tests cover argument parsing, help output, shell completions,
//! local configuration and error exit codes, all without a live service.
#![allow(clippy::unwrap_used)]

use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `homeguard` binary with env isolation.
///
/// Clears all `HOMEGUARD_*` env vars and points config directories at
/// `home` so tests never touch the user's real configuration.
fn homeguard_cmd_in(home: &Path) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("homeguard");
    cmd.env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join(".config"))
        .env_remove("HOMEGUARD_PROFILE")
        .env_remove("HOMEGUARD_BASE_URL")
        .env_remove("HOMEGUARD_INSTALLATION")
        .env_remove("HOMEGUARD_USERNAME")
        .env_remove("HOMEGUARD_PASSWORD")
        .env_remove("HOMEGUARD_PIN")
        .env_remove("HOMEGUARD_OUTPUT")
        .env_remove("HOMEGUARD_INSECURE")
        .env_remove("HOMEGUARD_TIMEOUT")
        .env_remove("RUST_LOG");
    cmd
}

fn homeguard_cmd() -> assert_cmd::Command {
    homeguard_cmd_in(Path::new("/tmp/homeguard-cli-test-nonexistent"))
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
    let output = homeguard_cmd().output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_flag() {
    homeguard_cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("installation")
            .and(predicate::str::contains("watch"))
            .and(predicate::str::contains("status"))
            .and(predicate::str::contains("arm"))
            .and(predicate::str::contains("plug")),
    );
}

#[test]
fn test_version_flag() {
    homeguard_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("homeguard"));
}

// ── Shell completions ───────────────────────────────────────────────

#[test]
fn test_completions_bash() {
    homeguard_cmd()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

#[test]
fn test_completions_zsh() {
    homeguard_cmd()
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#compdef"));
}

#[test]
fn test_completions_fish() {
    homeguard_cmd()
        .args(["completions", "fish"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

// ── Error cases ─────────────────────────────────────────────────────

#[test]
fn test_invalid_subcommand() {
    let output = homeguard_cmd().arg("foobar").output().unwrap();
    assert!(!output.status.success(), "Expected failure for invalid subcommand");
    let text = combined_output(&output);
    assert!(
        text.contains("invalid") || text.contains("unrecognized") || text.contains("foobar"),
        "Expected error mentioning invalid subcommand:\n{text}"
    );
}

#[test]
fn test_invalid_arm_state() {
    let output = homeguard_cmd().args(["arm", "sideways"]).output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    let text = combined_output(&output);
    assert!(
        text.contains("possible values"),
        "Expected the valid arm states to be listed:\n{text}"
    );
}

#[test]
fn test_status_without_config() {
    homeguard_cmd()
        .arg("status")
        .assert()
        .code(4)
        .stderr(predicate::str::contains("No installation configured"));
}

#[test]
fn test_missing_profile() {
    homeguard_cmd()
        .args(["--profile", "cabin", "status"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("Profile 'cabin' not found"));
}

#[test]
fn test_unreachable_service() {
    homeguard_cmd()
        .env("HOMEGUARD_PASSWORD", "hunter2")
        .args([
            "--base-url",
            "http://127.0.0.1:9/xbn/2",
            "--installation",
            "112233",
            "--username",
            "someone@example.com",
            "--timeout",
            "2",
            "status",
        ])
        .assert()
        .code(7)
        .stderr(predicate::str::contains("Could not reach"));
}

// ── Configuration ───────────────────────────────────────────────────

#[test]
fn test_config_path() {
    homeguard_cmd()
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
}

#[test]
fn test_config_show_no_config() {
    // A missing file renders the default config.
    homeguard_cmd()
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[defaults]"));
}

#[test]
fn test_set_profile_then_list() {
    let home = tempfile::tempdir().unwrap();

    homeguard_cmd_in(home.path())
        .args([
            "config",
            "set-profile",
            "home",
            "--url",
            "https://e-api01.example.com/xbn/2",
            "--giid",
            "112233",
            "--user",
            "someone@example.com",
        ])
        .assert()
        .success();
    homeguard_cmd_in(home.path())
        .args([
            "config",
            "set-profile",
            "cabin",
            "--url",
            "https://e-api01.example.com/xbn/2",
            "--giid",
            "445566",
        ])
        .assert()
        .success();

    homeguard_cmd_in(home.path())
        .args(["config", "profiles"])
        .assert()
        .success()
        .stdout(predicate::str::contains("  cabin").and(predicate::str::contains("* home")));

    homeguard_cmd_in(home.path())
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("445566"));
}

// ── Subcommand help discovery ───────────────────────────────────────

#[test]
fn test_config_subcommands_exist() {
    homeguard_cmd()
        .args(["config", "--help"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("set-profile")
                .and(predicate::str::contains("set-secret"))
                .and(predicate::str::contains("show"))
                .and(predicate::str::contains("profiles")),
        );
}
