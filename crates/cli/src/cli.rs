// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Command-line surface: flags are grouped into one [`clap::Args`] struct per
//! option namespace, mirroring the namespaces a resolved
//! [`tw_supervisor::SupervisorConfig`] is built from. Every flag has a
//! `PROC_WRAPPER_*`-prefixed environment variable fallback; the wrapped
//! command itself is everything after a `--`.

use clap::{Args, Parser, ValueEnum};
use tw_process::ShellMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ShellModeArg {
    Enable,
    Disable,
    Auto,
}

impl From<ShellModeArg> for ShellMode {
    fn from(v: ShellModeArg) -> Self {
        match v {
            ShellModeArg::Enable => ShellMode::Enable,
            ShellModeArg::Disable => ShellMode::Disable,
            ShellModeArg::Auto => ShellMode::Auto,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "taskwrapper", version, about = "Wraps a command and reports its lifecycle to a Task Management service")]
pub struct Cli {
    #[command(flatten)]
    pub task: TaskArgs,

    #[command(flatten)]
    pub api: ApiArgs,

    #[command(flatten)]
    pub process: ProcessArgs,

    #[command(flatten)]
    pub io: IoArgs,

    #[command(flatten)]
    pub configuration: ConfigurationArgs,

    #[command(flatten)]
    pub updates: UpdatesArgs,

    #[command(flatten)]
    pub log: LogArgs,

    /// The command to run, and its arguments. Pass `--` before it to
    /// disambiguate from taskwrapper's own flags.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, required = true)]
    pub command: Vec<String>,
}

/// `task` namespace: identity reported to the Task Management service.
#[derive(Args, Debug)]
pub struct TaskArgs {
    /// Logical task name, used for registration and as the default display name.
    #[arg(long, env = "PROC_WRAPPER_TASK_NAME")]
    pub task_name: String,

    /// Task UUID, for services that address a task by UUID instead of name.
    #[arg(long, env = "PROC_WRAPPER_TASK_UUID")]
    pub uuid: Option<String>,

    /// Task version number reported alongside the task identity.
    #[arg(long, env = "PROC_WRAPPER_TASK_VERSION_NUMBER")]
    pub task_version_number: Option<i64>,

    /// Task version text label (e.g. a release tag).
    #[arg(long, env = "PROC_WRAPPER_TASK_VERSION_TEXT")]
    pub task_version_text: Option<String>,

    /// Opaque version signature (e.g. a build or content hash).
    #[arg(long, env = "PROC_WRAPPER_TASK_VERSION_SIGNATURE")]
    pub task_version_signature: Option<String>,

    /// Mark the task as a long-running service rather than a one-shot job.
    #[arg(long, env = "PROC_WRAPPER_IS_SERVICE")]
    pub service: bool,

    /// Mark this execution as passive: it doesn't count toward
    /// `--max-concurrency` and can't be stopped by the service.
    #[arg(long, env = "PROC_WRAPPER_IS_PASSIVE")]
    pub is_passive: bool,

    /// Maximum number of concurrent executions the service will admit for
    /// this task. Omit for unbounded concurrency.
    #[arg(long, env = "PROC_WRAPPER_MAX_CONCURRENCY")]
    pub max_concurrency: Option<u32>,

    /// Evict a conflicting execution older than this many seconds instead
    /// of waiting out the full conflict-retry window.
    #[arg(long, env = "PROC_WRAPPER_MAX_CONFLICTING_AGE")]
    pub max_conflicting_age_secs: Option<u64>,

    /// Cron-like schedule string reported alongside the task identity, for
    /// services that track expected run cadence.
    #[arg(long, env = "PROC_WRAPPER_SCHEDULE")]
    pub schedule: Option<String>,

    /// Create the Task record at the service if it doesn't already exist.
    #[arg(long, env = "PROC_WRAPPER_AUTO_CREATE_TASK")]
    pub auto_create_task: bool,

    /// Attach a piece of instance metadata to the task identity:
    /// `KEY=VALUE` (repeatable).
    #[arg(long = "instance-metadata", value_name = "KEY=VALUE")]
    pub instance_metadata: Vec<String>,
}

/// `api` namespace: the Task Management service endpoint and retry posture.
#[derive(Args, Debug)]
pub struct ApiArgs {
    /// Task Management service base URL. Omit to run in standalone/offline mode.
    #[arg(long, env = "PROC_WRAPPER_API_BASE_URL")]
    pub api_base_url: Option<String>,

    /// Task Management service API key.
    #[arg(long, env = "PROC_WRAPPER_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Timeout, in seconds, for each request to the Task Management service.
    #[arg(long, env = "PROC_WRAPPER_API_REQUEST_TIMEOUT", default_value_t = 30)]
    pub api_request_timeout_secs: u64,

    /// Heartbeat interval in seconds.
    #[arg(long, env = "PROC_WRAPPER_API_HEARTBEAT_INTERVAL", default_value_t = 30)]
    pub heartbeat_interval_secs: u64,

    /// Abort without starting the child if registration never succeeds.
    #[arg(long, env = "PROC_WRAPPER_PREVENT_OFFLINE_EXECUTION")]
    pub prevent_offline_execution: bool,

    /// How long to keep retrying `create_execution` on a `409 Conflict`
    /// (the server declining due to `max-concurrency`) before giving up.
    #[arg(long, env = "PROC_WRAPPER_CREATION_CONFLICT_TIMEOUT", default_value_t = 300)]
    pub creation_conflict_timeout_secs: u64,

    /// Deadline for the terminal `finalize` call.
    #[arg(long, env = "PROC_WRAPPER_API_FINAL_UPDATE_TIMEOUT", default_value_t = 30)]
    pub final_update_timeout_secs: u64,

    /// Probability (0.0-1.0) that this invocation registers with and
    /// reports to the Task Management service at all. Drawn once per
    /// invocation.
    #[arg(long, env = "PROC_WRAPPER_API_MANAGED_PROBABILITY", default_value_t = 1.0)]
    pub api_managed_probability: f64,

    /// If an unreported invocation (see `--api-managed-probability`)
    /// ends in failure, resample against this probability before doing a
    /// late registration and reporting the failure.
    #[arg(long, env = "PROC_WRAPPER_API_FAILURE_REPORT_PROBABILITY", default_value_t = 1.0)]
    pub api_failure_report_probability: f64,

    /// As `--api-failure-report-probability`, for a process-timeout outcome.
    #[arg(long, env = "PROC_WRAPPER_API_TIMEOUT_REPORT_PROBABILITY", default_value_t = 1.0)]
    pub api_timeout_report_probability: f64,

    /// After a call's retry budget is exhausted (attempts or deadline),
    /// pause for this many seconds and open a fresh attempt window instead
    /// of surfacing the failure. Omit to surface the failure immediately.
    #[arg(long, env = "PROC_WRAPPER_RESUME_DELAY")]
    pub resume_delay_secs: Option<u64>,

    /// Fixed delay between `create_execution` conflict retries when the
    /// server doesn't send a `Retry-After` header.
    #[arg(long, env = "PROC_WRAPPER_CREATION_CONFLICT_RETRY_DELAY", default_value_t = 5)]
    pub creation_conflict_retry_delay_secs: u64,
}

/// `process` namespace: how the wrapped command is run and mediated.
#[derive(Args, Debug)]
pub struct ProcessArgs {
    /// How to decide whether the command runs through a shell.
    #[arg(long, env = "PROC_WRAPPER_SHELL_MODE", value_enum, default_value = "auto")]
    pub shell_mode: ShellModeArg,

    /// Working directory for the wrapped command; defaults to the current directory.
    #[arg(long, env = "PROC_WRAPPER_WORK_DIR")]
    pub working_dir: Option<String>,

    /// Pass an explicit environment variable to the wrapped command (repeatable).
    /// Config/env sources resolved via `--config-location`/`--env-location`
    /// never override these.
    #[arg(short = 'e', long = "env", value_name = "KEY=VALUE")]
    pub env: Vec<String>,

    /// Kill the wrapped command if it runs longer than this many seconds.
    #[arg(long, env = "PROC_WRAPPER_PROCESS_TIMEOUT")]
    pub timeout_secs: Option<u64>,

    /// Grace period between SIGTERM and SIGKILL on a stop request.
    #[arg(long, env = "PROC_WRAPPER_TERMINATION_GRACE_PERIOD", default_value_t = 10)]
    pub termination_grace_period_secs: u64,

    /// Retry the wrapped command up to this many times after a nonzero
    /// exit before reporting `FAILED`. `0` means a single attempt.
    #[arg(long, env = "PROC_WRAPPER_PROCESS_MAX_RETRIES", default_value_t = 0)]
    pub max_retries: u32,

    /// Delay between a failed attempt's exit and the next spawn.
    #[arg(long, env = "PROC_WRAPPER_PROCESS_RETRY_DELAY", default_value_t = 60)]
    pub retry_delay_secs: u64,

    /// Interval, in seconds, for the child-still-alive liveness log.
    #[arg(long, env = "PROC_WRAPPER_CHECK_INTERVAL", default_value_t = 30)]
    pub check_interval_secs: u64,
}

/// `io` namespace: the value passed into the child at registration, and
/// the value read back from it after exit.
#[derive(Args, Debug)]
pub struct IoArgs {
    /// Literal input value, used verbatim (subject to `--input-value-format`).
    #[arg(long, env = "PROC_WRAPPER_TASK_INPUT_VALUE")]
    pub input_value: Option<String>,

    /// Name of an environment variable holding the input value.
    #[arg(long, env = "PROC_WRAPPER_TASK_INPUT_ENV_VAR_NAME")]
    pub input_env_var_name: Option<String>,

    /// Path to a file holding the input value.
    #[arg(long, env = "PROC_WRAPPER_TASK_INPUT_FILENAME")]
    pub input_filename: Option<String>,

    /// Format the input value is parsed as.
    #[arg(long, env = "PROC_WRAPPER_TASK_INPUT_VALUE_FORMAT", value_enum, default_value = "text")]
    pub input_value_format: ValueFormatArg,

    /// Delete `--input-filename` after it's read.
    #[arg(long, env = "PROC_WRAPPER_CLEANUP_INPUT_FILE")]
    pub cleanup_input_file: bool,

    /// Path to a file the child writes its result value to; read back
    /// after the child exits and attached to the final report.
    #[arg(long, env = "PROC_WRAPPER_TASK_RESULT_FILENAME")]
    pub result_filename: Option<String>,

    /// Format the result value is parsed as.
    #[arg(long, env = "PROC_WRAPPER_TASK_RESULT_VALUE_FORMAT", value_enum, default_value = "text")]
    pub result_value_format: ValueFormatArg,

    /// Keep `--result-filename` after it's read instead of deleting it.
    #[arg(long, env = "PROC_WRAPPER_NO_CLEANUP_RESULT_FILE")]
    pub no_cleanup_result_file: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum ValueFormatArg {
    #[default]
    Text,
    Json,
    Yaml,
}

impl From<ValueFormatArg> for tw_valuefmt::Format {
    fn from(v: ValueFormatArg) -> Self {
        match v {
            ValueFormatArg::Text => tw_valuefmt::Format::Text,
            ValueFormatArg::Json => tw_valuefmt::Format::Json,
            ValueFormatArg::Yaml => tw_valuefmt::Format::Yaml,
        }
    }
}

/// `configuration` namespace: config/secret sources merged into the child's env.
#[derive(Args, Debug)]
pub struct ConfigurationArgs {
    /// Add a nested config source: `STRATEGY=LOCATION`, e.g.
    /// `deep=FILE:/etc/app.json!JSON` (repeatable; later sources merge on
    /// top of earlier ones). Resolved into a nested tree, then flattened.
    #[arg(long = "config-location", value_name = "STRATEGY=LOCATION")]
    pub config_locations: Vec<String>,

    /// Add a flat env-var source: `STRATEGY=LOCATION` (repeatable). Merged
    /// directly into the child's environment, not nested.
    #[arg(long = "env-location", value_name = "STRATEGY=LOCATION")]
    pub env_locations: Vec<String>,

    /// Treat any single source's resolution failure as fatal instead of
    /// logging and leaving the key unresolved.
    #[arg(long, env = "PROC_WRAPPER_FAIL_FAST_CONFIG_RESOLUTION")]
    pub fail_fast_config_resolution: bool,

    /// Prefix marking a resolved config property name as one to resolve further.
    #[arg(long, env = "PROC_WRAPPER_RESOLVABLE_CONFIG_PROPERTY_PREFIX", default_value = "")]
    pub resolved_config_property_name_prefix: String,

    /// Suffix marking a resolved config property name as one to resolve further.
    #[arg(
        long,
        env = "PROC_WRAPPER_RESOLVABLE_CONFIG_PROPERTY_SUFFIX",
        default_value = "__to_resolve"
    )]
    pub resolved_config_property_name_suffix: String,

    /// Prefix marking a resolved environment variable name as one to resolve further.
    #[arg(long, env = "PROC_WRAPPER_RESOLVABLE_ENV_VAR_NAME_PREFIX", default_value = "")]
    pub resolved_env_var_name_prefix: String,

    /// Suffix marking a resolved environment variable name as one to resolve further.
    #[arg(
        long,
        env = "PROC_WRAPPER_RESOLVABLE_ENV_VAR_NAME_SUFFIX",
        default_value = "_FOR_PROC_WRAPPER_TO_RESOLVE"
    )]
    pub resolved_env_var_name_suffix: String,

    /// Maximum depth walked when resolving nested config-property markers.
    #[arg(long, env = "PROC_WRAPPER_MAX_CONFIG_RESOLUTION_DEPTH", default_value_t = 5)]
    pub max_config_resolution_depth: usize,

    /// Maximum number of resolution passes over the merged config tree.
    #[arg(long, env = "PROC_WRAPPER_MAX_CONFIG_RESOLUTION_ITERATIONS", default_value_t = 5)]
    pub max_config_resolution_iterations: usize,

    /// Resolve config/env sources, print the result as `KEY=VALUE` lines,
    /// and exit without running the wrapped command.
    #[arg(long, env = "PROC_WRAPPER_EXIT_AFTER_WRITING_VARIABLES")]
    pub exit_after_writing_variables: bool,
}

/// `updates` namespace: the local UDP status-update listener.
#[derive(Args, Debug)]
pub struct UpdatesArgs {
    /// Disable the local UDP status listener the child can report progress to.
    #[arg(long, env = "PROC_WRAPPER_NO_ENABLE_STATUS_UPDATE_LISTENER")]
    pub no_status_listener: bool,

    /// Port the UDP status listener binds on.
    #[arg(long, env = "PROC_WRAPPER_STATUS_UPDATE_SOCKET_PORT", default_value_t = tw_process::DEFAULT_PORT)]
    pub status_update_socket_port: u16,

    /// Maximum size, in bytes, of a single status-update datagram; larger
    /// datagrams are dropped.
    #[arg(long, env = "PROC_WRAPPER_STATUS_UPDATE_MESSAGE_MAX_BYTES", default_value_t = tw_process::DEFAULT_MAX_DATAGRAM_BYTES)]
    pub status_update_message_max_bytes: usize,

    /// Ring-buffer capacity per stream for captured stdout/stderr.
    #[arg(long, env = "PROC_WRAPPER_TAIL_LINES", default_value_t = 100)]
    pub tail_lines: usize,

    /// Lines of captured tail attached to the final report on success.
    #[arg(long, env = "PROC_WRAPPER_NUM_LOG_LINES_SENT_ON_SUCCESS", default_value_t = 0)]
    pub num_log_lines_sent_on_success: usize,

    /// Lines of captured tail attached to the final report on failure.
    #[arg(long, env = "PROC_WRAPPER_NUM_LOG_LINES_SENT_ON_FAILURE", default_value_t = 100)]
    pub num_log_lines_sent_on_failure: usize,

    /// Lines of captured tail attached to the final report on timeout.
    #[arg(long, env = "PROC_WRAPPER_NUM_LOG_LINES_SENT_ON_TIMEOUT", default_value_t = 100)]
    pub num_log_lines_sent_on_timeout: usize,
}

/// `log` namespace: verbosity, destination, and secret redaction.
#[derive(Args, Debug)]
pub struct LogArgs {
    /// Output format for the final execution report.
    #[arg(long, env = "PROC_WRAPPER_LOG_FORMAT", value_enum, default_value = "text")]
    pub log_format: LogFormat,

    /// Increase log verbosity (-v, -vv). Equivalent to RUST_LOG=debug/trace
    /// when RUST_LOG is unset.
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Write logs to this file instead of stderr.
    #[arg(long, env = "PROC_WRAPPER_LOG_FILE")]
    pub log_file: Option<String>,

    /// Allow resolved secret values to appear in trace-level log output.
    /// Off by default: resolved config values are redacted from logs.
    #[arg(long, env = "PROC_WRAPPER_LOG_SECRETS")]
    pub log_secrets: bool,
}
