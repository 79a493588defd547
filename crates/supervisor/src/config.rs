// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fully resolved configuration for one supervised run, built by the CLI
//! from flags, environment variables, and `.env` files before `run` is
//! called.

use std::collections::BTreeMap;
use std::time::Duration;
use tw_config::ConfigSource;
use tw_core::TaskVersion;
use tw_process::ShellMode;
use tw_valuefmt::Format;

#[derive(Debug, Clone)]
pub struct ApiSettings {
    pub base_url: String,
    pub api_key: String,
    pub request_deadline: Duration,
    /// Deadline for the `create_execution` conflict-retry window, distinct
    /// from `request_deadline` which bounds an individual call's
    /// transient-error retries.
    pub creation_conflict_timeout: Duration,
    /// Fixed delay between `create_execution` conflict retries when the
    /// server didn't send a `Retry-After` header, in place of the
    /// exponential backoff curve used for ordinary transient errors.
    pub creation_conflict_retry_delay: Duration,
    /// Deadline for the terminal `finalize` call.
    pub final_update_timeout: Duration,
    /// Probability `create_execution` is attempted at all, drawn once per
    /// invocation (see DESIGN.md). `1.0` always registers.
    pub managed_probability: f64,
    /// If the invocation was sampled out of initial registration and the
    /// child ultimately fails, resample against this probability before
    /// performing a late registration + finalize.
    pub failure_report_probability: f64,
    /// As `failure_report_probability`, for a process-timeout outcome.
    pub timeout_report_probability: f64,
    /// Pause duration once a call's retry budget is exhausted, after
    /// which the client opens a fresh attempt window instead of
    /// surfacing the failure. `None` surfaces the failure immediately.
    pub resume_delay: Option<Duration>,
}

/// Where the input value handed to `create_execution` comes from. At most
/// one of these is expected to be set by the CLI layer; `run` reads
/// whichever is present in this priority order.
#[derive(Debug, Clone, Default)]
pub struct InputSettings {
    pub literal_value: Option<String>,
    pub env_var_name: Option<String>,
    pub filename: Option<String>,
    pub value_format: Format,
    /// Delete the input file after it has been read.
    pub cleanup_file: bool,
}

/// Where the child's result value is read from after a successful exit,
/// to attach to `finalize`.
#[derive(Debug, Clone, Default)]
pub struct ResultSettings {
    pub filename: Option<String>,
    pub value_format: Format,
    /// Delete the result file after it has been read.
    pub cleanup_file: bool,
}

#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    pub task_name: String,
    pub task_uuid: Option<String>,
    pub task_version: TaskVersion,
    pub is_service: bool,
    pub is_passive: bool,
    pub max_concurrency: Option<u32>,
    /// Evict a conflicting execution older than this many seconds instead
    /// of waiting out the full conflict-retry window.
    pub max_conflicting_age: Option<Duration>,
    pub schedule: Option<String>,
    /// Create the Task record at the service if it doesn't already exist,
    /// rather than requiring it to be pre-registered out of band.
    pub auto_create_task: bool,
    pub instance_metadata: BTreeMap<String, String>,
    pub command: Vec<String>,
    pub shell_mode: ShellMode,
    pub working_dir: Option<String>,
    pub passthrough_env: BTreeMap<String, String>,
    /// Sources merged into a nested config object, walked for resolvable
    /// secret markers up to `max_config_resolution_depth`.
    pub config_locations: Vec<ConfigSource>,
    /// Sources merged directly into the flat environment map; resolvable
    /// markers are only ever walked at depth 1.
    pub env_locations: Vec<ConfigSource>,
    /// `None` means run standalone without a Task Management service: the
    /// execution still runs the state machine and reports to stdout, but
    /// nothing is sent over the network.
    pub api: Option<ApiSettings>,
    pub heartbeat_interval: Duration,
    /// Interval for a lightweight liveness log distinct from the
    /// heartbeat cadence.
    pub check_interval: Duration,
    pub process_timeout: Option<Duration>,
    pub termination_grace_period: Duration,
    /// Number of attempts to retry the child after a nonzero exit before
    /// giving up and reporting `FAILED`. `0` means a single attempt, no
    /// retries.
    pub process_max_retries: u32,
    /// Delay between a failed attempt's exit and the next spawn.
    pub process_retry_delay: Duration,
    pub input: InputSettings,
    pub result: ResultSettings,
    /// Ring-buffer capacity per stream; the per-outcome fields below may
    /// request fewer lines than this when attaching the tail to
    /// `finalize`.
    pub tail_lines: usize,
    /// Lines of captured tail attached to `finalize` on each outcome.
    pub tail_lines_on_success: usize,
    pub tail_lines_on_failure: usize,
    pub tail_lines_on_timeout: usize,
    pub enable_status_listener: bool,
    pub status_listener_port: u16,
    pub status_listener_max_bytes: usize,
    /// Abort before spawning the child if registration never succeeds,
    /// instead of degrading to offline/standalone execution.
    pub prevent_offline_execution: bool,
    /// Treat a config source's resolution failure as fatal instead of
    /// logging it and continuing with whatever resolved so far.
    pub fail_fast_config_resolution: bool,
    /// Allow resolved config/secret values to appear in log output.
    pub log_secrets: bool,
    /// Prefix/suffix marking a config key as a secret location to resolve
    /// (nested, walked up to `max_config_resolution_depth`).
    pub resolved_config_property_prefix: String,
    pub resolved_config_property_suffix: String,
    /// As above, for the flat environment map (walked at depth 1 only).
    pub resolved_env_var_prefix: String,
    pub resolved_env_var_suffix: String,
    pub max_config_resolution_depth: usize,
    pub max_config_resolution_iterations: usize,
    /// Resolve env/config and print the result to stdout instead of
    /// spawning the child.
    pub exit_after_writing_variables: bool,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            task_name: String::new(),
            task_uuid: None,
            task_version: TaskVersion::default(),
            is_service: false,
            is_passive: false,
            max_concurrency: None,
            max_conflicting_age: None,
            schedule: None,
            auto_create_task: false,
            instance_metadata: BTreeMap::new(),
            command: Vec::new(),
            shell_mode: ShellMode::Auto,
            working_dir: None,
            passthrough_env: BTreeMap::new(),
            config_locations: Vec::new(),
            env_locations: Vec::new(),
            api: None,
            heartbeat_interval: Duration::from_secs(30),
            check_interval: Duration::from_secs(30),
            process_timeout: None,
            termination_grace_period: Duration::from_secs(10),
            process_max_retries: 0,
            process_retry_delay: Duration::from_secs(0),
            input: InputSettings::default(),
            result: ResultSettings::default(),
            tail_lines: 100,
            tail_lines_on_success: 0,
            tail_lines_on_failure: 100,
            tail_lines_on_timeout: 100,
            enable_status_listener: true,
            status_listener_port: tw_process::DEFAULT_PORT,
            status_listener_max_bytes: tw_process::DEFAULT_MAX_DATAGRAM_BYTES,
            prevent_offline_execution: false,
            fail_fast_config_resolution: false,
            log_secrets: false,
            resolved_config_property_prefix: String::new(),
            resolved_config_property_suffix: "__to_resolve".to_string(),
            resolved_env_var_prefix: String::new(),
            resolved_env_var_suffix: "_FOR_PROC_WRAPPER_TO_RESOLVE".to_string(),
            max_config_resolution_depth: 5,
            max_config_resolution_iterations: 5,
            exit_after_writing_variables: false,
        }
    }
}
