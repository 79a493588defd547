// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;
use tw_api::ApiError;
use tw_config::ConfigResolutionError;
use tw_core::StatusTransitionError;
use tw_process::ProcessError;
use tw_runtimemeta::RuntimeMetadataError;
use tw_valuefmt::ParseError;

/// Aggregates the sub-crate error types into the error-kind taxonomy used
/// for exit-code reporting: `Config` covers both the *Configuration* and
/// *Resolution* kinds, `Process` covers *Process spawn failure*, `Api`
/// covers *Registration conflict/error* and any *Transient API error* that
/// exhausted its retry budget, and `StateMachine` covers *Internal
/// invariant violation*. *Process timeout* and *Signal-initiated stop* are
/// not represented here: they are reached through ordinary state-machine
/// transitions in `run()`, not as an `Err`, and carry their own exit codes
/// (124 and 143 respectively) from `exit_code_for`.
#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("config resolution failed: {0}")]
    Config(#[from] ConfigResolutionError),
    #[error("process execution failed: {0}")]
    Process(#[from] ProcessError),
    #[error("Task Management API request failed: {0}")]
    Api(#[from] ApiError),
    #[error("internal state machine error: {0}")]
    StateMachine(#[from] StatusTransitionError),
    #[error("runtime metadata probe failed: {0}")]
    RuntimeMetadata(#[from] RuntimeMetadataError),
    #[error("failed to read {what}: {source}")]
    Io { what: &'static str, #[source] source: std::io::Error },
    #[error("failed to parse {what}: {source}")]
    ValueFormat { what: &'static str, #[source] source: ParseError },
}

impl SupervisorError {
    /// Reserved process exit code for this failure category, used when
    /// the wrapped command never got a chance to produce its own exit
    /// code (e.g. it failed to spawn, or config resolution failed first).
    /// Distinct from the child's own exit codes and from the 124/143
    /// reserved for timeout/stop (see the type-level doc comment).
    pub fn exit_code(&self) -> i32 {
        match self {
            SupervisorError::Config(_) => 2,
            SupervisorError::Process(_) => 3,
            SupervisorError::Api(_) => 4,
            SupervisorError::StateMachine(_) => 5,
            SupervisorError::RuntimeMetadata(_) => 6,
            SupervisorError::Io { .. } => 2,
            SupervisorError::ValueFormat { .. } => 2,
        }
    }
}
