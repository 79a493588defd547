// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Prints the terminal summary of a supervised run.

use crate::cli::LogFormat;
use serde::Serialize;
use tw_supervisor::RunOutcome;

#[derive(Serialize)]
struct Report<'a> {
    status: String,
    exit_code: i32,
    execution_uuid: Option<String>,
    process_id: Option<u32>,
    tail_stdout: &'a [String],
    tail_stderr: &'a [String],
}

pub fn print(outcome: &RunOutcome, format: LogFormat) {
    match format {
        LogFormat::Json => {
            let report = Report {
                status: outcome.execution.status.to_string(),
                exit_code: outcome.exit_code,
                execution_uuid: outcome.execution.uuid.as_ref().map(|u| u.to_string()),
                process_id: outcome.execution.process_id,
                tail_stdout: &outcome.execution.tail_stdout,
                tail_stderr: &outcome.execution.tail_stderr,
            };
            println!("{}", serde_json::to_string_pretty(&report).unwrap_or_default());
        }
        LogFormat::Text => {
            println!(
                "taskwrapper: execution {} exited {} (status: {})",
                outcome.execution.uuid.as_ref().map(|u| u.to_string()).unwrap_or_else(|| "-".to_string()),
                outcome.exit_code,
                outcome.execution.status
            );
        }
    }
}
