//! End-to-end specs for running a command in standalone (offline) mode,
//! i.e. without an `--api-base-url`.

use crate::prelude::*;

#[test]
fn passes_through_child_stdout_and_succeeds() {
    cli()
        .args(&["--task-name", "greet", "--no-status-listener", "--", "echo", "hello-from-child"])
        .passes()
        .stdout_has("hello-from-child")
        .stdout_has("taskwrapper: execution");
}

#[test]
fn propagates_nonzero_exit_code() {
    cli()
        .args(&[
            "--task-name",
            "failer",
            "--no-status-listener",
            "--",
            "sh",
            "-c",
            "exit 9",
        ])
        .fails()
        .code_is(9);
}

#[test]
fn explicit_env_flag_reaches_the_child() {
    cli()
        .args(&[
            "--task-name",
            "env-check",
            "--no-status-listener",
            "-e",
            "GREETING=hi",
            "--",
            "sh",
            "-c",
            "test \"$GREETING\" = hi",
        ])
        .passes();
}

#[test]
fn enforces_process_timeout() {
    cli()
        .args(&[
            "--task-name",
            "slow",
            "--no-status-listener",
            "--timeout-secs",
            "1",
            "--",
            "sleep",
            "30",
        ])
        .fails()
        .code_is(124);
}

#[test]
fn retries_failing_child_then_reports_its_exit_code() {
    cli()
        .args(&[
            "--task-name",
            "always-fails",
            "--no-status-listener",
            "--max-retries",
            "2",
            "--retry-delay-secs",
            "0",
            "--",
            "sh",
            "-c",
            "exit 7",
        ])
        .fails()
        .code_is(7);
}
