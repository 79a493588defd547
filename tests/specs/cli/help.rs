//! CLI help/version output specs.

use crate::prelude::*;

#[test]
fn help_shows_usage() {
    cli().args(&["--help"]).passes().stdout_has("Usage:");
}

#[test]
fn version_shows_version() {
    cli().args(&["--version"]).passes().stdout_has("taskwrapper");
}

#[test]
fn missing_command_fails_with_usage_error() {
    cli().args(&["--task-name", "t"]).fails().stderr_has("Usage:");
}
