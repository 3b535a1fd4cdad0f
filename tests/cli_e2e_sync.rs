//! End-to-end tests for the `sync` command
//!
//! These tests invoke the actual CLI binary and validate its behavior
//! from a user's perspective.

use assert_cmd::cargo::cargo_bin_cmd;
use assert_fs::prelude::*;
use predicates::prelude::*;

/// Test that --help flag shows help information
#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_sync_help() {
    let mut cmd = cargo_bin_cmd!("pkg-mirror");

    cmd.arg("sync")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Synchronize every configured module",
        ));
}

/// Test that a missing module list file produces an error
#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_sync_missing_config() {
    let mut cmd = cargo_bin_cmd!("pkg-mirror");

    cmd.arg("sync")
        .arg("--config")
        .arg("/nonexistent/modules.ini")
        .arg("--no-remote")
        .arg("--tool-version")
        .arg("v0.1-0-g0000000")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Module list file not found"));
}

/// Test that an unknown git mode is rejected before any work happens
#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_sync_unknown_git_mode() {
    let temp = assert_fs::TempDir::new().unwrap();
    let config = temp.child("modules.ini");
    config
        .write_str("org = o\nprefix = p\nnamespace = n\n")
        .unwrap();

    let mut cmd = cargo_bin_cmd!("pkg-mirror");

    cmd.arg("sync")
        .arg("--config")
        .arg(config.path())
        .arg("--no-remote")
        .arg("--git-mode")
        .arg("svn")
        .arg("--tool-version")
        .arg("v0.1-0-g0000000")
        .assert()
        .failure()
        .stderr(predicate::str::contains("git mode"));
}

/// Test that an empty module list synchronizes nothing and succeeds
#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_sync_empty_module_list() {
    let temp = assert_fs::TempDir::new().unwrap();
    let config = temp.child("modules.ini");
    config
        .write_str("org = o\nprefix = p\nnamespace = n\n")
        .unwrap();

    let mut cmd = cargo_bin_cmd!("pkg-mirror");

    cmd.current_dir(temp.path())
        .arg("sync")
        .arg("--config")
        .arg(config.path())
        .arg("--no-remote")
        .arg("--tool-version")
        .arg("v0.1-0-g0000000")
        .assert()
        .success()
        .stdout(predicate::str::contains("Synchronized 0 module(s)"));
}

/// Test that a module section missing required keys fails with the key name
#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_sync_invalid_module_section() {
    let temp = assert_fs::TempDir::new().unwrap();
    let config = temp.child("modules.ini");
    config
        .write_str(
            "org = o\nprefix = p\nnamespace = n\n\n[broken]\ntype = fpga\ncontents = v\nsrc = https://example.com/r.git\n",
        )
        .unwrap();

    let mut cmd = cargo_bin_cmd!("pkg-mirror");

    cmd.arg("sync")
        .arg("--config")
        .arg(config.path())
        .arg("--no-remote")
        .arg("--tool-version")
        .arg("v0.1-0-g0000000")
        .assert()
        .failure()
        .stderr(predicate::str::contains("human_name"));
}
