// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn new_execution_starts_in_new_status() {
    let exec = TaskExecution::new("host-a");
    assert_eq!(exec.status, ExecutionStatus::New);
    assert!(exec.started_at_ms.is_none());
    assert!(exec.stopped_at_ms.is_none());
}

#[test]
fn happy_path_transition_sequence_succeeds() {
    let mut exec = TaskExecution::new("host-a");
    exec.transition(ExecutionStatus::Registering, 1).unwrap();
    exec.transition(ExecutionStatus::Running, 2).unwrap();
    assert_eq!(exec.started_at_ms, Some(2));
    exec.transition(ExecutionStatus::Succeeded, 3).unwrap();
    assert_eq!(exec.status, ExecutionStatus::Succeeded);
    assert_eq!(exec.stopped_at_ms, Some(3));
}

#[test]
fn every_execution_reaches_exactly_one_terminal_status() {
    for terminal in [
        ExecutionStatus::Succeeded,
        ExecutionStatus::Failed,
        ExecutionStatus::TerminatedAfterTimeOut,
    ] {
        let mut exec = TaskExecution::new("host-a");
        exec.transition(ExecutionStatus::Registering, 1).unwrap();
        exec.transition(ExecutionStatus::Running, 2).unwrap();
        exec.transition(terminal, 3).unwrap();
        assert!(exec.status.is_terminal());
        // Terminal statuses have no further valid transitions.
        assert!(!exec.status.can_transition_to(ExecutionStatus::Running));
    }
}

#[test]
fn stopping_must_resolve_to_stopped() {
    let mut exec = TaskExecution::new("host-a");
    exec.transition(ExecutionStatus::Registering, 1).unwrap();
    exec.transition(ExecutionStatus::Running, 2).unwrap();
    exec.transition(ExecutionStatus::Stopping, 3).unwrap();
    assert!(!exec.status.is_terminal());
    exec.transition(ExecutionStatus::Stopped, 4).unwrap();
    assert!(exec.status.is_terminal());
}

#[test]
fn marked_done_resolves_to_exited_after_marked_done() {
    let mut exec = TaskExecution::new("host-a");
    exec.transition(ExecutionStatus::Registering, 1).unwrap();
    exec.transition(ExecutionStatus::Running, 2).unwrap();
    exec.transition(ExecutionStatus::MarkedDone, 3).unwrap();
    exec.transition(ExecutionStatus::ExitedAfterMarkedDone, 4).unwrap();
    assert!(exec.status.is_terminal());
}

#[test]
fn registering_can_fail_or_be_abandoned_without_ever_running() {
    let mut exec = TaskExecution::new("host-a");
    exec.transition(ExecutionStatus::Registering, 1).unwrap();
    exec.transition(ExecutionStatus::Abandoned, 2).unwrap();
    assert!(exec.status.is_terminal());
    assert!(exec.started_at_ms.is_none());
}

#[test]
fn manually_started_shares_running_successors() {
    let mut exec = TaskExecution::new("host-a");
    exec.transition(ExecutionStatus::Registering, 1).unwrap();
    exec.transition(ExecutionStatus::ManuallyStarted, 2).unwrap();
    assert_eq!(exec.started_at_ms, Some(2));
    exec.transition(ExecutionStatus::Succeeded, 3).unwrap();
    assert!(exec.status.is_terminal());
}

#[test]
fn invalid_transition_is_rejected() {
    let mut exec = TaskExecution::new("host-a");
    let err = exec.transition(ExecutionStatus::Succeeded, 1).unwrap_err();
    assert_eq!(err.from, ExecutionStatus::New);
    assert_eq!(err.to, ExecutionStatus::Succeeded);
    // Rejected transition leaves status unchanged.
    assert_eq!(exec.status, ExecutionStatus::New);
}

#[test]
fn terminal_status_rejects_any_further_transition() {
    let mut exec = TaskExecution::new("host-a");
    exec.transition(ExecutionStatus::Registering, 1).unwrap();
    exec.transition(ExecutionStatus::Running, 2).unwrap();
    exec.transition(ExecutionStatus::Failed, 3).unwrap();
    assert!(exec.transition(ExecutionStatus::Running, 4).is_err());
    assert!(exec.transition(ExecutionStatus::Stopping, 4).is_err());
}

#[test]
fn heartbeat_never_advances_status() {
    let mut exec = TaskExecution::new("host-a");
    exec.transition(ExecutionStatus::Registering, 1).unwrap();
    exec.transition(ExecutionStatus::Running, 2).unwrap();
    let before = exec.status;
    exec.record_heartbeat(
        10,
        Counters { success_count: 5, ..Default::default() },
        Some("halfway".to_string()),
    );
    assert_eq!(exec.status, before);
    assert_eq!(exec.last_heartbeat_at_ms, Some(10));
    assert_eq!(exec.counters.success_count, 5);
    assert_eq!(exec.last_status_message.as_deref(), Some("halfway"));
}

#[test]
fn heartbeat_counters_merge_monotonically() {
    let mut exec = TaskExecution::new("host-a");
    exec.transition(ExecutionStatus::Registering, 1).unwrap();
    exec.transition(ExecutionStatus::Running, 2).unwrap();
    exec.record_heartbeat(10, Counters { success_count: 5, ..Default::default() }, None);
    exec.record_heartbeat(20, Counters { success_count: 3, error_count: 1, ..Default::default() }, None);
    assert_eq!(exec.counters.success_count, 5);
    assert_eq!(exec.counters.error_count, 1);
}

#[test]
fn builder_produces_new_status_by_default() {
    let exec = TaskExecution::builder().hostname("builder-host").build();
    assert_eq!(exec.hostname, "builder-host");
    assert_eq!(exec.status, ExecutionStatus::New);
    assert!(exec.runtime_metadata.is_empty());
}

#[test]
fn builder_can_seed_a_running_execution_with_counters() {
    let exec = TaskExecution::builder()
        .hostname("builder-host")
        .status(ExecutionStatus::Running)
        .process_id(4242u32)
        .build();
    assert_eq!(exec.status, ExecutionStatus::Running);
    assert_eq!(exec.process_id, Some(4242));
}

#[test]
fn display_matches_lowercase_snake_case() {
    assert_eq!(ExecutionStatus::TerminatedAfterTimeOut.to_string(), "terminated_after_time_out");
    assert_eq!(ExecutionStatus::Running.to_string(), "running");
}

#[test]
fn status_serializes_as_screaming_snake_case() {
    let json = serde_json::to_string(&ExecutionStatus::TerminatedAfterTimeOut).unwrap();
    assert_eq!(json, "\"TERMINATED_AFTER_TIME_OUT\"");
}
