// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `taskwrapper` wraps a command, mediates its lifecycle, and reports it
//! to a Task Management service.

mod cli;
mod config_build;
mod exit_error;
mod logging;
mod report;

use clap::Parser;
use cli::Cli;
use exit_error::ExitError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let _logging_guard = logging::init(cli.log.verbose, cli.log.log_file.as_deref());

    match run(cli).await {
        Ok(exit_code) => std::process::exit(exit_code),
        Err(e) => {
            eprintln!("taskwrapper: {e}");
            std::process::exit(e.code);
        }
    }
}

async fn run(cli: Cli) -> Result<i32, ExitError> {
    let log_format = cli.log.log_format;
    let config = config_build::build(&cli)?;
    let outcome = tw_supervisor::run(config).await?;
    report::print(&outcome, log_format);
    Ok(outcome.exit_code)
}
