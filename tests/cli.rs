//! Command-line behavior of the `twrun` binary.

use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;

fn twrun() -> Command {
    Command::cargo_bin("twrun").unwrap()
}

#[test]
fn test_validate_accepts_valid_config() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("twrun.toml"),
        r#"
[server]
url = "http://tw.local:8888/"

[target]
type = "test_case"
file_path = "Scripts/Login.twizx"
test_case = "Login_ValidCredentials"

[report]
root = "reports"
"#,
    )
    .unwrap();

    twrun()
        .current_dir(dir.path())
        .arg("validate")
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration is valid!"))
        .stdout(predicate::str::contains("Test case: Login_ValidCredentials"));
}

#[test]
fn test_validate_rejects_bad_url() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.toml");
    fs::write(
        &path,
        r#"
[server]
url = "tw.local:8888"

[target]
type = "file_path"
file_path = "Scripts/Login.twizx"

[report]
root = "reports"
"#,
    )
    .unwrap();

    twrun()
        .arg("--config")
        .arg(&path)
        .arg("validate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Configuration error"));
}

#[test]
fn test_init_writes_config_once() {
    let dir = tempfile::tempdir().unwrap();

    twrun()
        .current_dir(dir.path())
        .args(["init", "--target", "folder"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created twrun.toml"));

    let written = fs::read_to_string(dir.path().join("twrun.toml")).unwrap();
    assert!(written.contains(r#"type = "folder_path""#));

    twrun()
        .current_dir(dir.path())
        .arg("validate")
        .assert()
        .success();

    twrun()
        .current_dir(dir.path())
        .args(["init", "--target", "folder"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn test_run_fails_without_config() {
    let dir = tempfile::tempdir().unwrap();

    twrun()
        .current_dir(dir.path())
        .arg("run")
        .assert()
        .failure();
}
