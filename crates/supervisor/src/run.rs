// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The supervisor's main loop: register with the Task Management
//! service (if configured), resolve config into the child's environment,
//! spawn and mediate the child process through its retry budget, and
//! report the terminal outcome exactly once.

use crate::config::SupervisorConfig;
use crate::error::SupervisorError;
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};
use tw_api::{ApiClient, ApiClientConfig};
use tw_config::{project, to_dotenv, ConfigResolver, ResolutionSettings};
use tw_core::{ExecutionId, ExecutionStatus, Random, SystemRandom, TaskExecution, TaskIdentity};
use tw_process::{ExecutorConfig, ProcessExecutor, StatusListener, StatusUpdate};
use tw_runtimemeta::RuntimeMetadataProbe;
use tw_secrets::{ProviderRegistry, SecretFetcher};

pub struct RunOutcome {
    pub exit_code: i32,
    pub execution: TaskExecution,
}

/// Outcome of a single spawn-through-reap attempt, before the outer
/// retry loop decides what to do next.
enum AttemptOutcome {
    /// `marked_done` is set once a heartbeat reply has carried
    /// `marked_done=true` during this attempt; the terminal status is
    /// `ExitedAfterMarkedDone` instead of the exit-code-driven
    /// succeeded/failed branch.
    Exited { code: i32, marked_done: bool },
    TimedOut,
    StoppedBySignal,
    StoppedByServer,
}

#[instrument(skip(config), fields(task = %config.task_name))]
pub async fn run(config: SupervisorConfig) -> Result<RunOutcome, SupervisorError> {
    let hostname = hostname();
    let mut execution = TaskExecution::new(hostname);
    execution.transition(ExecutionStatus::Registering, now_ms())?;

    let resolved_env = resolve_env(&config).await?;

    if config.exit_after_writing_variables {
        print!("{}", to_dotenv(&resolved_env.iter().map(|(k, v)| (k.clone(), v.clone())).collect::<Vec<_>>()));
        return Ok(RunOutcome { exit_code: 0, execution });
    }

    let random = SystemRandom;
    // Drawn once per invocation, not once per remote call (see DESIGN.md).
    let sampled_in = config.api.as_ref().is_some_and(|s| random.uniform() <= s.managed_probability);

    let mut identity = TaskIdentity::new(config.task_name.clone());
    identity.uuid = config.task_uuid.clone();
    identity.version = config.task_version.clone();
    identity.is_service = config.is_service;
    identity.is_passive = config.is_passive;
    identity.max_concurrency = config.max_concurrency;
    identity.schedule = config.schedule.clone();
    identity.instance_metadata = config.instance_metadata.clone();
    identity.max_conflicting_age_seconds = config.max_conflicting_age.map(|d| d.as_secs());
    identity.auto_create_task = config.auto_create_task;

    let runtime_probe = RuntimeMetadataProbe::new();
    let mut runtime_metadata = runtime_probe.detect();
    execution.runtime_metadata.insert("runtime".to_string(), runtime_metadata.to_value());
    let runtime_metadata_json = runtime_metadata.to_value().to_json();

    let input_value = read_input(&config.input)?;

    let mut api = if sampled_in { config.api.as_ref().map(build_api_client) } else { None };
    let execution_id = if let Some(client) = &api {
        match register_and_create(client, &identity, &config.task_name, input_value.as_ref(), &runtime_metadata_json)
            .await
        {
            Ok(id) => id,
            Err(e) if config.prevent_offline_execution => return Err(e),
            Err(e) => {
                warn!(error = %e, "registration failed, continuing in offline mode");
                api = None;
                None
            }
        }
    } else {
        None
    };
    execution.uuid = execution_id.clone();

    execution.transition(ExecutionStatus::Running, now_ms())?;
    if let (Some(api), Some(id)) = (&api, &execution_id) {
        let _ = api.update_status(id, "RUNNING", None, None).await;
    }

    let mut sigterm = signal(SignalKind::terminate()).map_err(tw_process::ProcessError::Spawn)?;
    let mut sigint = signal(SignalKind::interrupt()).map_err(tw_process::ProcessError::Spawn)?;

    let max_attempts = config.process_max_retries + 1;
    let mut attempt_no = 0u32;
    let mut last_exit_code: Option<i32> = None;
    let mut last_stdout: Vec<String> = Vec::new();
    let mut last_stderr: Vec<String> = Vec::new();
    let final_status;

    loop {
        attempt_no += 1;
        let outcome = run_one_attempt(
            &config,
            &resolved_env,
            &mut execution,
            &api,
            &execution_id,
            &runtime_probe,
            &mut runtime_metadata,
            &mut sigterm,
            &mut sigint,
            &mut last_stdout,
            &mut last_stderr,
        )
        .await?;

        match outcome {
            AttemptOutcome::Exited { code, marked_done: true } => {
                last_exit_code = Some(code);
                execution.transition(ExecutionStatus::ExitedAfterMarkedDone, now_ms())?;
                final_status = ExecutionStatus::ExitedAfterMarkedDone;
                break;
            }
            AttemptOutcome::Exited { code, marked_done: false } => {
                last_exit_code = Some(code);
                if code == 0 {
                    execution.transition(ExecutionStatus::Succeeded, now_ms())?;
                    final_status = ExecutionStatus::Succeeded;
                    break;
                }
                if attempt_no < max_attempts {
                    info!(attempt = attempt_no, exit_code = code, "child failed, retrying after delay");
                    tokio::time::sleep(config.process_retry_delay).await;
                    continue;
                }
                execution.transition(ExecutionStatus::Failed, now_ms())?;
                final_status = ExecutionStatus::Failed;
                break;
            }
            AttemptOutcome::TimedOut => {
                execution.transition(ExecutionStatus::TerminatedAfterTimeOut, now_ms())?;
                final_status = ExecutionStatus::TerminatedAfterTimeOut;
                break;
            }
            AttemptOutcome::StoppedBySignal => {
                execution.transition(ExecutionStatus::Stopping, now_ms())?;
                execution.transition(ExecutionStatus::Stopped, now_ms())?;
                final_status = ExecutionStatus::Stopped;
                break;
            }
            AttemptOutcome::StoppedByServer => {
                execution.transition(ExecutionStatus::Stopping, now_ms())?;
                execution.transition(ExecutionStatus::Stopped, now_ms())?;
                final_status = ExecutionStatus::Stopped;
                break;
            }
        }
    }

    execution.exit_code = last_exit_code;
    execution.tail_stdout = last_stdout;
    execution.tail_stderr = last_stderr;

    let result_value = read_result(&config.result)?;

    report_terminal_outcome(
        &config,
        &mut api,
        &execution_id,
        &identity,
        &execution,
        final_status,
        result_value.as_ref(),
    )
    .await;

    let exit_code = exit_code_for(&execution, final_status);
    Ok(RunOutcome { exit_code, execution })
}

/// Spawns and mediates exactly one attempt of the child command: starts
/// the Status Listener and heartbeat ticker bound to this attempt (spec
/// §4.7 listener lifecycle), blocks until child exit, an OS stop signal,
/// or the process timeout, then tears both down before returning.
#[allow(clippy::too_many_arguments)]
async fn run_one_attempt(
    config: &SupervisorConfig,
    resolved_env: &BTreeMap<String, String>,
    execution: &mut TaskExecution,
    api: &Option<ApiClient>,
    execution_id: &Option<ExecutionId>,
    runtime_probe: &RuntimeMetadataProbe,
    runtime_metadata: &mut tw_runtimemeta::RuntimeMetadata,
    sigterm: &mut tokio::signal::unix::Signal,
    sigint: &mut tokio::signal::unix::Signal,
    last_stdout: &mut Vec<String>,
    last_stderr: &mut Vec<String>,
) -> Result<AttemptOutcome, SupervisorError> {
    let executor = ProcessExecutor::new(ExecutorConfig {
        command: config.command.clone(),
        shell_mode: config.shell_mode,
        working_dir: config.working_dir.clone(),
        env: resolved_env.clone(),
        tail_lines: config.tail_lines,
        term_grace_period: config.termination_grace_period,
        ..ExecutorConfig::default()
    });
    let mut proc = executor.spawn()?;
    execution.process_id = Some(proc.pid());

    let (status_tx, mut status_rx) = mpsc::channel::<StatusUpdate>(64);
    if config.enable_status_listener {
        match StatusListener::bind_on(config.status_listener_port, config.status_listener_max_bytes).await {
            Ok(listener) => {
                tokio::spawn(listener.run(status_tx));
            }
            Err(e) => warn!(error = %e, "failed to start status listener, continuing without it"),
        }
    }

    let mut heartbeat = tokio::time::interval(config.heartbeat_interval);
    heartbeat.tick().await; // first tick fires immediately; skip it

    let mut liveness = tokio::time::interval(config.check_interval);
    liveness.tick().await; // first tick fires immediately; skip it

    // A century stands in for "no timeout" so the same select! arm works
    // whether or not a deadline was configured, without risking overflow
    // from sleeping on `Duration::MAX`.
    const NO_TIMEOUT: Duration = Duration::from_secs(60 * 60 * 24 * 365 * 100);
    let timeout_sleep = tokio::time::sleep(config.process_timeout.unwrap_or(NO_TIMEOUT));
    tokio::pin!(timeout_sleep);

    let mut marked_done = false;

    let outcome = loop {
        tokio::select! {
            biased;

            _ = sigterm.recv() => {
                info!("received SIGTERM, stopping child");
                proc.stop(config.termination_grace_period).await?;
                break AttemptOutcome::StoppedBySignal;
            }

            _ = sigint.recv() => {
                info!("received SIGINT, stopping child");
                proc.stop(config.termination_grace_period).await?;
                break AttemptOutcome::StoppedBySignal;
            }

            () = &mut timeout_sleep => {
                warn!("process timeout exceeded, terminating child");
                proc.stop(config.termination_grace_period).await?;
                break AttemptOutcome::TimedOut;
            }

            result = proc.wait() => {
                let result = result?;
                break AttemptOutcome::Exited { code: result.exit_code.unwrap_or(1), marked_done };
            }

            Some(update) = status_rx.recv() => {
                execution.record_heartbeat(now_ms(), update.counters(), update.last_status_message);
            }

            _ = liveness.tick() => {
                debug!(pid = proc.pid(), "still alive");
            }

            _ = heartbeat.tick() => {
                match runtime_probe.refresh(runtime_metadata).await {
                    Ok(refreshed) => {
                        *runtime_metadata = refreshed;
                        execution.runtime_metadata.insert("runtime".to_string(), runtime_metadata.to_value());
                    }
                    Err(e) => warn!(error = %e, "runtime metadata refresh failed, keeping last known value"),
                }
                if let (Some(api), Some(id)) = (api, execution_id) {
                    match api.send_heartbeat(id, &execution.counters, execution.last_status_message.as_deref()).await {
                        Ok(reply) => {
                            if reply.stop_requested {
                                info!("server requested stop via heartbeat reply, stopping child");
                                proc.stop(config.termination_grace_period).await?;
                                break AttemptOutcome::StoppedByServer;
                            }
                            if reply.marked_done && !marked_done {
                                marked_done = true;
                                execution.transition(ExecutionStatus::MarkedDone, now_ms())?;
                            }
                        }
                        Err(e) => warn!(error = %e, "heartbeat failed"),
                    }
                }
            }
        }
    };

    *last_stdout = proc.stdout_tail.lines();
    *last_stderr = proc.stderr_tail.lines();
    Ok(outcome)
}

/// Sends the single terminal `finalize` report for this invocation. If
/// the invocation was sampled out of initial registration
/// (`api_managed_probability`) but ended in failure or timeout, resamples
/// against the matching report probability and, if it passes, performs a
/// late registration before finalizing.
#[allow(clippy::too_many_arguments)]
async fn report_terminal_outcome(
    config: &SupervisorConfig,
    api: &mut Option<ApiClient>,
    execution_id: &Option<ExecutionId>,
    identity: &TaskIdentity,
    execution: &TaskExecution,
    final_status: ExecutionStatus,
    result_value: Option<&JsonValue>,
) {
    let mut execution_id = execution_id.clone();
    if api.is_none() && execution_id.is_none() {
        if let Some(settings) = &config.api {
            let report_probability = match final_status {
                ExecutionStatus::Failed => Some(settings.failure_report_probability),
                ExecutionStatus::TerminatedAfterTimeOut => Some(settings.timeout_report_probability),
                _ => None,
            };
            if let Some(p) = report_probability {
                if SystemRandom.uniform() <= p {
                    let client = build_api_client(settings);
                    let runtime_metadata_json = execution.runtime_metadata.get("runtime").map(|v| v.to_json());
                    match register_and_create(
                        &client,
                        identity,
                        &config.task_name,
                        None,
                        runtime_metadata_json.as_ref().unwrap_or(&JsonValue::Null),
                    )
                    .await
                    {
                        Ok(id) => {
                            execution_id = id;
                            *api = Some(client);
                        }
                        Err(e) => warn!(error = %e, "late registration for unreported failure/timeout did not succeed"),
                    }
                }
            }
        }
    }

    let Some(client) = api.as_ref() else { return };
    let Some(id) = execution_id.as_ref() else { return };
    let tail_n = match final_status {
        ExecutionStatus::Succeeded => config.tail_lines_on_success,
        ExecutionStatus::TerminatedAfterTimeOut => config.tail_lines_on_timeout,
        _ => config.tail_lines_on_failure,
    };
    let stdout_tail = tail_suffix(&execution.tail_stdout, tail_n);
    let stderr_tail = tail_suffix(&execution.tail_stderr, tail_n);
    let status_str = final_status.to_string().to_uppercase();
    if let Err(e) =
        client.finalize(id, &status_str, execution.exit_code, result_value, &stdout_tail, &stderr_tail).await
    {
        warn!(error = %e, "final update to Task Management service failed");
    }
}

fn tail_suffix(lines: &[String], n: usize) -> Vec<String> {
    if lines.len() <= n {
        lines.to_vec()
    } else {
        lines[lines.len() - n..].to_vec()
    }
}

fn build_api_client(settings: &crate::config::ApiSettings) -> ApiClient {
    let mut client_config = ApiClientConfig::new(settings.base_url.clone(), settings.api_key.clone());
    client_config.request_deadline = Some(settings.request_deadline);
    client_config.creation_conflict_timeout = settings.creation_conflict_timeout;
    client_config.creation_conflict_retry_delay = settings.creation_conflict_retry_delay;
    client_config.final_update_timeout = settings.final_update_timeout;
    client_config.resume_delay = settings.resume_delay;
    ApiClient::new(client_config)
}

async fn register_and_create(
    client: &ApiClient,
    identity: &TaskIdentity,
    task_name: &str,
    input_value: Option<&JsonValue>,
    runtime_metadata: &JsonValue,
) -> Result<Option<ExecutionId>, SupervisorError> {
    let registered = client.register_task(identity).await?;
    info!(task_uuid = ?registered.uuid, "registered task");
    let created = client
        .create_execution(
            task_name,
            input_value,
            Some(runtime_metadata),
            identity.is_passive,
            identity.auto_create_task,
        )
        .await?;
    Ok(created.uuid)
}

/// Reads the child's input value from whichever source is configured
/// (literal, named environment variable, or file, in that priority
/// order), parses it per `value_format`, and converts it to the JSON the
/// Task Management service expects.
fn read_input(input: &crate::config::InputSettings) -> Result<Option<JsonValue>, SupervisorError> {
    let raw = if let Some(v) = &input.literal_value {
        Some(v.clone())
    } else if let Some(name) = &input.env_var_name {
        std::env::var(name).ok()
    } else if let Some(path) = &input.filename {
        let text = std::fs::read_to_string(path)
            .map_err(|source| SupervisorError::Io { what: "input file", source })?;
        if input.cleanup_file {
            let _ = std::fs::remove_file(path);
        }
        Some(text)
    } else {
        None
    };
    match raw {
        Some(text) => {
            let value = tw_valuefmt::parse(&text, input.value_format)
                .map_err(|source| SupervisorError::ValueFormat { what: "input value", source })?;
            Ok(Some(value.to_json()))
        }
        None => Ok(None),
    }
}

/// Reads the child's result value from the configured result file, if
/// any, after the child has exited. A missing file is not an error: most
/// attempts never write one.
fn read_result(result: &crate::config::ResultSettings) -> Result<Option<JsonValue>, SupervisorError> {
    let Some(path) = &result.filename else { return Ok(None) };
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => return Err(SupervisorError::Io { what: "result file", source }),
    };
    if result.cleanup_file {
        let _ = std::fs::remove_file(path);
    }
    let value = tw_valuefmt::parse(&text, result.value_format)
        .map_err(|source| SupervisorError::ValueFormat { what: "result value", source })?;
    Ok(Some(value.to_json()))
}

/// Resolves `config_locations` into a nested config object (walked for
/// resolvable markers up to `max_config_resolution_depth`) and
/// `env_locations` into the flat environment map (resolvable markers only
/// ever walked at depth 1), then projects both onto `passthrough_env`.
/// `env_locations` entries win over `config_locations` entries with the
/// same key, matching the precedence explicit `--env` passthrough already
/// has over both.
async fn resolve_env(config: &SupervisorConfig) -> Result<BTreeMap<String, String>, SupervisorError> {
    let mut env = config.passthrough_env.clone();
    if config.config_locations.is_empty() && config.env_locations.is_empty() {
        return Ok(env);
    }

    let fetcher = SecretFetcher::new(ProviderRegistry::with_builtins(), Duration::from_secs(60));
    let resolver = ConfigResolver::new(fetcher);
    let config_settings = ResolutionSettings {
        resolvable_prefix: config.resolved_config_property_prefix.clone(),
        resolvable_suffix: config.resolved_config_property_suffix.clone(),
        max_depth: config.max_config_resolution_depth,
        max_iterations: config.max_config_resolution_iterations,
    };
    let env_settings = ResolutionSettings {
        resolvable_prefix: config.resolved_env_var_prefix.clone(),
        resolvable_suffix: config.resolved_env_var_suffix.clone(),
        max_depth: 1,
        max_iterations: config.max_config_resolution_iterations,
    };

    let mut overlay = BTreeMap::new();
    let result = async {
        if !config.config_locations.is_empty() {
            let resolved = resolve_config_and_env_markers(
                &resolver,
                &config.config_locations,
                &config_settings,
                &env_settings,
            )
            .await?;
            for (k, v) in project(&resolved) {
                overlay.insert(k, v);
            }
        }
        if !config.env_locations.is_empty() {
            let resolved =
                resolve_config_and_env_markers(&resolver, &config.env_locations, &env_settings, &env_settings)
                    .await?;
            for (k, v) in project(&resolved) {
                overlay.insert(k, v);
            }
        }
        Ok::<_, tw_config::ConfigResolutionError>(())
    }
    .await;

    match result {
        Ok(()) => {
            for (k, v) in overlay {
                if config.log_secrets {
                    tracing::trace!(key = %k, value = %v, "resolved config value");
                } else {
                    tracing::trace!(key = %k, "resolved config value (redacted)");
                }
                env.entry(k).or_insert(v);
            }
        }
        Err(e) if config.fail_fast_config_resolution => return Err(e.into()),
        Err(e) => warn!(error = %e, "config resolution failed, leaving unresolved keys as-is"),
    }
    Ok(env)
}

/// Runs both resolution passes over one set of config sources: the
/// nested config-property marker (`__to_resolve` by default) first, then
/// the flat, depth-1 env-var marker (`_FOR_PROC_WRAPPER_TO_RESOLVE` by
/// default) over the same resulting tree, matching steps 3-5 of the
/// config resolver algorithm.
async fn resolve_config_and_env_markers(
    resolver: &ConfigResolver,
    sources: &[tw_config::ConfigSource],
    config_settings: &ResolutionSettings,
    env_settings: &ResolutionSettings,
) -> Result<tw_core::Value, tw_config::ConfigResolutionError> {
    let mut resolved = resolver.resolve_with_settings(sources, config_settings).await?;
    resolver.resolve_tree(&mut resolved, env_settings).await?;
    Ok(resolved)
}

/// `Succeeded`/`Failed` propagate the child's own exit code (falling
/// back to 1 when the child died to a signal with no code). Timeouts and
/// stop requests use conventional shell exit codes (128+signal) so
/// scripts invoking the supervisor can distinguish a deliberate stop
/// from the child's own failure.
fn exit_code_for(execution: &TaskExecution, status: ExecutionStatus) -> i32 {
    match status {
        ExecutionStatus::Succeeded => 0,
        ExecutionStatus::Failed => execution.exit_code.unwrap_or(1),
        ExecutionStatus::TerminatedAfterTimeOut => 124,
        ExecutionStatus::Stopped => 143,
        _ => 1,
    }
}

fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

fn hostname() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "unknown-host".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_code_for_succeeded_is_zero() {
        let exec = TaskExecution::new("h");
        assert_eq!(exit_code_for(&exec, ExecutionStatus::Succeeded), 0);
    }

    #[test]
    fn exit_code_for_failed_propagates_child_code() {
        let mut exec = TaskExecution::new("h");
        exec.exit_code = Some(17);
        assert_eq!(exit_code_for(&exec, ExecutionStatus::Failed), 17);
    }

    #[test]
    fn exit_code_for_timeout_is_124() {
        let exec = TaskExecution::new("h");
        assert_eq!(exit_code_for(&exec, ExecutionStatus::TerminatedAfterTimeOut), 124);
    }

    #[test]
    fn tail_suffix_keeps_last_n_lines() {
        let lines = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        assert_eq!(tail_suffix(&lines, 2), vec!["b".to_string(), "c".to_string()]);
        assert_eq!(tail_suffix(&lines, 10), lines);
    }

    #[tokio::test]
    async fn runs_a_trivial_command_to_completion() {
        let config = SupervisorConfig {
            task_name: "trivial".to_string(),
            command: vec!["true".to_string()],
            enable_status_listener: false,
            status_listener_port: 0,
            ..SupervisorConfig::default()
        };
        let outcome = run(config).await.unwrap();
        assert_eq!(outcome.exit_code, 0);
        assert_eq!(outcome.execution.status, ExecutionStatus::Succeeded);
    }

    #[tokio::test]
    async fn propagates_nonzero_exit_code() {
        let config = SupervisorConfig {
            task_name: "failing".to_string(),
            command: vec!["sh".to_string(), "-c".to_string(), "exit 9".to_string()],
            enable_status_listener: false,
            status_listener_port: 0,
            ..SupervisorConfig::default()
        };
        let outcome = run(config).await.unwrap();
        assert_eq!(outcome.exit_code, 9);
        assert_eq!(outcome.execution.status, ExecutionStatus::Failed);
    }

    #[tokio::test]
    async fn enforces_process_timeout() {
        let config = SupervisorConfig {
            task_name: "slow".to_string(),
            command: vec!["sleep".to_string(), "30".to_string()],
            process_timeout: Some(Duration::from_millis(100)),
            enable_status_listener: false,
            status_listener_port: 0,
            ..SupervisorConfig::default()
        };
        let outcome = run(config).await.unwrap();
        assert_eq!(outcome.exit_code, 124);
        assert_eq!(outcome.execution.status, ExecutionStatus::TerminatedAfterTimeOut);
    }

    #[tokio::test]
    async fn collects_env_from_passthrough_without_config_locations() {
        let mut env = BTreeMap::new();
        env.insert("GREETING".to_string(), "hi".to_string());
        let config = SupervisorConfig {
            task_name: "env-check".to_string(),
            command: vec!["sh".to_string(), "-c".to_string(), "test \"$GREETING\" = hi".to_string()],
            passthrough_env: env,
            enable_status_listener: false,
            status_listener_port: 0,
            ..SupervisorConfig::default()
        };
        let outcome = run(config).await.unwrap();
        assert_eq!(outcome.exit_code, 0);
    }

    #[tokio::test]
    async fn retries_failing_child_up_to_max_retries_then_reports_failed() {
        let config = SupervisorConfig {
            task_name: "retry-me".to_string(),
            command: vec!["sh".to_string(), "-c".to_string(), "exit 7".to_string()],
            process_max_retries: 2,
            process_retry_delay: Duration::from_millis(10),
            enable_status_listener: false,
            status_listener_port: 0,
            ..SupervisorConfig::default()
        };
        let outcome = run(config).await.unwrap();
        assert_eq!(outcome.exit_code, 7);
        assert_eq!(outcome.execution.status, ExecutionStatus::Failed);
    }

    #[tokio::test]
    async fn retry_delay_elapses_between_attempts() {
        let config = SupervisorConfig {
            task_name: "retry-timed".to_string(),
            command: vec!["sh".to_string(), "-c".to_string(), "exit 1".to_string()],
            process_max_retries: 1,
            process_retry_delay: Duration::from_millis(150),
            enable_status_listener: false,
            status_listener_port: 0,
            ..SupervisorConfig::default()
        };
        let start = std::time::Instant::now();
        let outcome = run(config).await.unwrap();
        assert_eq!(outcome.execution.status, ExecutionStatus::Failed);
        assert!(start.elapsed() >= Duration::from_millis(150));
    }

    #[test]
    fn read_input_prefers_literal_over_env_and_file() {
        let input = crate::config::InputSettings {
            literal_value: Some("hello".to_string()),
            env_var_name: Some("NONEXISTENT_TASKWRAPPER_TEST_VAR".to_string()),
            ..Default::default()
        };
        let value = read_input(&input).unwrap().unwrap();
        assert_eq!(value, serde_json::json!("hello"));
    }

    #[test]
    fn read_input_parses_json_format() {
        let input = crate::config::InputSettings {
            literal_value: Some(r#"{"a": 1}"#.to_string()),
            value_format: tw_valuefmt::Format::Json,
            ..Default::default()
        };
        let value = read_input(&input).unwrap().unwrap();
        assert_eq!(value, serde_json::json!({"a": 1}));
    }

    #[test]
    fn read_input_with_no_source_is_none() {
        let input = crate::config::InputSettings::default();
        assert!(read_input(&input).unwrap().is_none());
    }

    #[test]
    fn read_result_with_no_filename_is_none() {
        let result = crate::config::ResultSettings::default();
        assert!(read_result(&result).unwrap().is_none());
    }

    #[test]
    fn read_result_with_missing_file_is_none_not_error() {
        let result = crate::config::ResultSettings {
            filename: Some("/nonexistent/taskwrapper-test-result.json".to_string()),
            ..Default::default()
        };
        assert!(read_result(&result).unwrap().is_none());
    }

    #[test]
    fn read_result_reads_and_cleans_up_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), "done").unwrap();
        let result = crate::config::ResultSettings {
            filename: Some(file.path().to_str().unwrap().to_string()),
            cleanup_file: true,
            ..Default::default()
        };
        let value = read_result(&result).unwrap().unwrap();
        assert_eq!(value, serde_json::json!("done"));
        assert!(!file.path().exists());
    }

    #[tokio::test]
    async fn env_locations_override_config_locations_with_the_same_key() {
        let mut nested_file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut nested_file, br#"{"DB_HOST": "from-config"}"#).unwrap();
        let mut flat_file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut flat_file, b"DB_HOST=from-env-location\n").unwrap();

        let config = SupervisorConfig {
            task_name: "merge-check".to_string(),
            config_locations: vec![tw_config::ConfigSource::new(
                format!("FILE:{}!JSON", nested_file.path().display()),
                tw_config::MergeStrategy::Deep,
            )],
            env_locations: vec![tw_config::ConfigSource::new(
                format!("FILE:{}!DOTENV", flat_file.path().display()),
                tw_config::MergeStrategy::Deep,
            )],
            command: vec!["sh".to_string(), "-c".to_string(), "test \"$DB_HOST\" = from-env-location".to_string()],
            enable_status_listener: false,
            status_listener_port: 0,
            ..SupervisorConfig::default()
        };
        let outcome = run(config).await.unwrap();
        assert_eq!(outcome.exit_code, 0, "status: {:?}", outcome.execution.status);
    }

    #[tokio::test]
    async fn exit_after_writing_variables_skips_the_child_and_prints_dotenv() {
        let mut env = BTreeMap::new();
        env.insert("GREETING".to_string(), "hi".to_string());
        let config = SupervisorConfig {
            task_name: "dry-run".to_string(),
            passthrough_env: env,
            exit_after_writing_variables: true,
            ..SupervisorConfig::default()
        };
        let outcome = run(config).await.unwrap();
        assert_eq!(outcome.exit_code, 0);
    }
}
