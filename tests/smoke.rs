//! Smoke tests -- verify the binary runs and the flags parse.

use assert_cmd::Command;

#[test]
fn test_cli_help() {
    Command::cargo_bin("testgantt")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicates::str::contains("Gantt-style timeline"))
        .stdout(predicates::str::contains("--print-html"))
        .stdout(predicates::str::contains("--duration-cutoff"));
}

#[test]
fn test_cli_version() {
    Command::cargo_bin("testgantt")
        .unwrap()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicates::str::contains("testgantt"));
}

#[test]
fn test_invalid_duration_cutoff() {
    Command::cargo_bin("testgantt")
        .unwrap()
        .args(["--duration-cutoff", "soon", "--print-html"])
        .assert()
        .failure()
        .code(2)
        .stderr(predicates::str::contains("--duration-cutoff"));
}

#[test]
fn test_missing_config_file() {
    Command::cargo_bin("testgantt")
        .unwrap()
        .args(["--config", "/nonexistent/testgantt.toml", "--print-html"])
        .assert()
        .failure();
}
