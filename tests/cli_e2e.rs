//! End-to-end CLI tests for the sitemirror binary.

use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

mod support;
use support::{snapshot, write_local_site};

/// Binary with the mirror environment variables cleared.
fn sitemirror() -> Command {
    let mut cmd = Command::cargo_bin("sitemirror").unwrap();
    for var in [
        "FTP_HOST",
        "FTP_PORT",
        "FTP_USER",
        "FTP_PASSWORD",
        "FTP_REMOTE",
        "MIRROR_BACKEND",
        "MIRROR_SOURCE",
        "MIRROR_NAME",
        "MIRROR_WORKING_DIR",
        "MIRROR_FOLDERS",
        "MIRROR_RETRIES",
        "MIRROR_BATCH_SIZE",
        "MIRROR_WORKERS",
        "MIRROR_TIMEOUT",
        "RUST_LOG",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

/// Test that --help displays usage information and exits with code 0.
#[test]
fn test_binary_help_displays_usage() {
    sitemirror()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Mirror a remote site tree"))
        .stdout(predicate::str::contains("FTP_HOST"));
}

/// Test that --version displays version and exits with code 0.
#[test]
fn test_binary_version_displays_version() {
    sitemirror()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("sitemirror"));
}

/// Test that invalid flags cause non-zero exit.
#[test]
fn test_binary_invalid_flag_returns_error() {
    sitemirror()
        .arg("--invalid-flag")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}

#[test]
fn test_binary_missing_ftp_settings_lists_every_problem() {
    let work = TempDir::new().unwrap();
    sitemirror()
        .args(["-w", work.path().to_str().unwrap()])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("FTP host is missing"))
        .stderr(predicate::str::contains("FTP user is missing"))
        .stderr(predicate::str::contains("FTP password is missing"));
}

#[test]
fn test_binary_settings_from_environment() {
    let work = TempDir::new().unwrap();
    sitemirror()
        .env("FTP_HOST", "ftp.example.invalid")
        .env("FTP_USER", "deploy")
        .args(["-w", work.path().to_str().unwrap()])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("FTP password is missing"))
        .stderr(predicate::str::contains("FTP host is missing").not());
}

#[test]
fn test_binary_local_backend_mirrors_tree_and_writes_report() {
    let source = TempDir::new().unwrap();
    write_local_site(source.path());
    let work = TempDir::new().unwrap();
    let report = work.path().join("report.json");

    sitemirror()
        .args(["--backend", "local", "--remote", "/"])
        .args(["--source", source.path().to_str().unwrap()])
        .args(["-w", work.path().to_str().unwrap(), "-n", "nightly"])
        .args(["--report", report.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("done in"));

    let mirror_root = work.path().join("nightly").join("root");
    assert_eq!(snapshot(&mirror_root), snapshot(source.path()));

    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(report).unwrap()).unwrap();
    assert_eq!(json["files_downloaded"], 5);
    assert!(json["failed_batches"].as_array().unwrap().is_empty());
}

#[test]
fn test_binary_sequential_mode_with_folder_ceiling() {
    let source = TempDir::new().unwrap();
    write_local_site(source.path());
    let work = TempDir::new().unwrap();

    sitemirror()
        .args(["--backend", "local", "--remote", "/wp-content"])
        .args(["--source", source.path().to_str().unwrap()])
        .args(["-w", work.path().to_str().unwrap()])
        .args(["--sequential", "-f", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("testing mode"));

    // Only the root was listed; its subdirectories were never popped.
    let mirror_root = work.path().join("backup").join("wp-content");
    assert!(mirror_root.is_dir());
    assert!(!mirror_root.join("themes").exists());
}

#[test]
fn test_binary_quiet_mode_suppresses_info_logs() {
    let source = TempDir::new().unwrap();
    write_local_site(source.path());
    let work = TempDir::new().unwrap();

    sitemirror()
        .args(["-q", "--backend", "local", "--remote", "/"])
        .args(["--source", source.path().to_str().unwrap()])
        .args(["-w", work.path().to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

#[test]
fn test_binary_missing_remote_directory_exits_failure() {
    let source = TempDir::new().unwrap();
    let work = TempDir::new().unwrap();

    sitemirror()
        .args(["--backend", "local", "--remote", "/nope", "-r", "0"])
        .args(["--source", source.path().to_str().unwrap()])
        .args(["-w", work.path().to_str().unwrap()])
        .assert()
        .code(1);
}
