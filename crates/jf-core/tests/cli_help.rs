//! CLI help output tests for jf-core.

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;

fn jf_core() -> Command {
    cargo_bin_cmd!("jf-core")
}

#[test]
fn help_flag_works() {
    jf_core()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("defect prediction"));
}

#[test]
fn help_shows_all_commands() {
    jf_core()
        .arg("--help")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("run")
                .and(predicate::str::contains("evaluate"))
                .and(predicate::str::contains("calibrate"))
                .and(predicate::str::contains("check"))
                .and(predicate::str::contains("version")),
        );
}

#[test]
fn version_flag_works() {
    jf_core()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("jf-core"));
}

#[test]
fn run_help_lists_overrides() {
    jf_core()
        .args(["run", "--help"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("--stream")
                .and(predicate::str::contains("--step"))
                .and(predicate::str::contains("--mode"))
                .and(predicate::str::contains("--artifacts-dir")),
        );
}

#[test]
fn calibrate_help_mentions_quantile() {
    jf_core()
        .args(["calibrate", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--quantile"));
}

#[test]
fn missing_subcommand_is_an_error() {
    jf_core().assert().failure();
}

#[test]
fn unknown_format_is_rejected() {
    jf_core()
        .args(["version", "--format", "yaml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("yaml"));
}
