//! Workspace-level integration tests, driven against the built `taskwrapper`
//! binary rather than any crate's internals.

mod prelude;

#[path = "specs/cli/help.rs"]
mod cli_help;
#[path = "specs/cli/run.rs"]
mod cli_run;
#[path = "specs/cli/config.rs"]
mod cli_config;
