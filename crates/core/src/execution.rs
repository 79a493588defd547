// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task Execution state machine.

use crate::value::Value;
use crate::ExecutionId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Status of a Task Execution.
///
/// `New` and `Registering` precede any status ever reported to the Task
/// Management service — they model the supervisor's own pre-registration
/// bookkeeping and are never sent as the execution's remote `status`
/// field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionStatus {
    New,
    Registering,
    ManuallyStarted,
    Running,
    Succeeded,
    Failed,
    TerminatedAfterTimeOut,
    MarkedDone,
    Stopping,
    Stopped,
    ExitedAfterMarkedDone,
    Abandoned,
}

crate::simple_display! {
    ExecutionStatus {
        New => "new",
        Registering => "registering",
        ManuallyStarted => "manually_started",
        Running => "running",
        Succeeded => "succeeded",
        Failed => "failed",
        TerminatedAfterTimeOut => "terminated_after_time_out",
        MarkedDone => "marked_done",
        Stopping => "stopping",
        Stopped => "stopped",
        ExitedAfterMarkedDone => "exited_after_marked_done",
        Abandoned => "abandoned",
    }
}

impl ExecutionStatus {
    /// Every Task Execution has exactly one terminal status. Heartbeats
    /// never advance status past a terminal one.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ExecutionStatus::Succeeded
                | ExecutionStatus::Failed
                | ExecutionStatus::TerminatedAfterTimeOut
                | ExecutionStatus::Stopped
                | ExecutionStatus::ExitedAfterMarkedDone
                | ExecutionStatus::Abandoned
        )
    }

    /// Validate a transition against the state diagram.
    ///
    /// `ManuallyStarted` is treated as an alternate entry point with the
    /// same outgoing edges as `Running` (see DESIGN.md's Open Questions).
    fn allowed_successors(self) -> &'static [ExecutionStatus] {
        use ExecutionStatus::*;
        match self {
            New => &[Registering],
            Registering => &[Running, ManuallyStarted, Failed, Abandoned],
            Running | ManuallyStarted => {
                &[Succeeded, Failed, TerminatedAfterTimeOut, Stopping, MarkedDone]
            }
            Stopping => &[Stopped],
            MarkedDone => &[ExitedAfterMarkedDone],
            Succeeded | Failed | TerminatedAfterTimeOut | Stopped | ExitedAfterMarkedDone
            | Abandoned => &[],
        }
    }

    pub fn can_transition_to(self, to: ExecutionStatus) -> bool {
        self.allowed_successors().contains(&to)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid status transition: {from} -> {to}")]
pub struct StatusTransitionError {
    pub from: ExecutionStatus,
    pub to: ExecutionStatus,
}

/// Monotone progress counters, merged in from the Status Listener and
/// reported on heartbeats/updates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Counters {
    pub success_count: u64,
    pub error_count: u64,
    pub skipped_count: u64,
    pub expected_count: u64,
}

impl Counters {
    /// Merge another snapshot in: max for each counter (monotone).
    pub fn merge_monotone(&mut self, other: Counters) {
        self.success_count = self.success_count.max(other.success_count);
        self.error_count = self.error_count.max(other.error_count);
        self.skipped_count = self.skipped_count.max(other.skipped_count);
        self.expected_count = self.expected_count.max(other.expected_count);
    }
}

/// A single run of a Task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskExecution {
    /// Assigned by the server on `create_execution`; absent in offline mode.
    pub uuid: Option<ExecutionId>,
    pub status: ExecutionStatus,
    pub started_at_ms: Option<u64>,
    pub stopped_at_ms: Option<u64>,
    pub exit_code: Option<i32>,
    pub process_id: Option<u32>,
    pub hostname: String,
    pub last_heartbeat_at_ms: Option<u64>,
    pub last_app_heartbeat_at_ms: Option<u64>,
    pub counters: Counters,
    pub last_status_message: Option<String>,
    pub input_value: Option<Value>,
    pub result_value: Option<Value>,
    pub runtime_metadata: BTreeMap<String, Value>,
    pub tail_stdout: Vec<String>,
    pub tail_stderr: Vec<String>,
}

impl TaskExecution {
    pub fn new(hostname: impl Into<String>) -> Self {
        Self {
            uuid: None,
            status: ExecutionStatus::New,
            started_at_ms: None,
            stopped_at_ms: None,
            exit_code: None,
            process_id: None,
            hostname: hostname.into(),
            last_heartbeat_at_ms: None,
            last_app_heartbeat_at_ms: None,
            counters: Counters::default(),
            last_status_message: None,
            input_value: None,
            result_value: None,
            runtime_metadata: BTreeMap::new(),
            tail_stdout: Vec::new(),
            tail_stderr: Vec::new(),
        }
    }

    /// Apply a validated status transition, recording timestamps for the
    /// `Running`/terminal boundary.
    pub fn transition(
        &mut self,
        to: ExecutionStatus,
        now_ms: u64,
    ) -> Result<(), StatusTransitionError> {
        if !self.status.can_transition_to(to) {
            return Err(StatusTransitionError { from: self.status, to });
        }
        if matches!(to, ExecutionStatus::Running | ExecutionStatus::ManuallyStarted)
            && self.started_at_ms.is_none()
        {
            self.started_at_ms = Some(now_ms);
        }
        if to.is_terminal() {
            self.stopped_at_ms = Some(now_ms);
        }
        self.status = to;
        Ok(())
    }

    /// Heartbeats never advance status; they only update the heartbeat
    /// timestamp and merge counters.
    pub fn record_heartbeat(&mut self, now_ms: u64, counters: Counters, message: Option<String>) {
        self.last_heartbeat_at_ms = Some(now_ms);
        self.counters.merge_monotone(counters);
        if let Some(m) = message {
            self.last_status_message = Some(m);
        }
    }
}

crate::builder! {
    pub struct TaskExecutionBuilder => TaskExecution {
        into {
            hostname: String = "test-host",
        }
        set {
            status: ExecutionStatus = ExecutionStatus::New,
        }
        option {
            uuid: ExecutionId = None,
            started_at_ms: u64 = None,
            stopped_at_ms: u64 = None,
            exit_code: i32 = None,
            process_id: u32 = None,
            last_heartbeat_at_ms: u64 = None,
            last_app_heartbeat_at_ms: u64 = None,
            last_status_message: String = None,
            input_value: Value = None,
            result_value: Value = None,
        }
        computed {
            counters: Counters = Counters::default(),
            runtime_metadata: BTreeMap<String, Value> = BTreeMap::new(),
            tail_stdout: Vec<String> = Vec::new(),
            tail_stderr: Vec<String> = Vec::new(),
        }
    }
}

#[cfg(test)]
#[path = "execution_tests.rs"]
mod tests;
