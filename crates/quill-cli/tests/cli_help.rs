use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

#[test]
fn test_help_shows_all_commands() {
    cargo_bin_cmd!("quill")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("exec"))
        .stdout(predicate::str::contains("document"))
        .stdout(predicate::str::contains("render"))
        .stdout(predicate::str::contains("--document"));
}

#[test]
fn test_document_help_shows_subcommands() {
    cargo_bin_cmd!("quill")
        .args(["document", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("path"))
        .stdout(predicate::str::contains("show"))
        .stdout(predicate::str::contains("reset"))
        .stdout(predicate::str::contains("use"));
}

#[test]
fn test_exec_requires_prompt() {
    cargo_bin_cmd!("quill")
        .arg("exec")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--prompt"));
}

#[test]
fn test_version_flag() {
    cargo_bin_cmd!("quill")
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("0.1"));
}
