// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Translates parsed CLI flags into a [`tw_supervisor::SupervisorConfig`].

use crate::cli::Cli;
use crate::exit_error::ExitError;
use std::collections::BTreeMap;
use std::time::Duration;
use tw_config::{ConfigSource, MergeStrategy};
use tw_core::TaskVersion;
use tw_supervisor::{ApiSettings, InputSettings, ResultSettings, SupervisorConfig};

pub fn build(cli: &Cli) -> Result<SupervisorConfig, ExitError> {
    let passthrough_env =
        cli.process.env.iter().map(|s| parse_env_kv(s)).collect::<Result<BTreeMap<_, _>, _>>()?;

    let instance_metadata = cli
        .task
        .instance_metadata
        .iter()
        .map(|s| parse_env_kv(s))
        .collect::<Result<BTreeMap<_, _>, _>>()?;

    let config_locations = cli
        .configuration
        .config_locations
        .iter()
        .map(|s| parse_config_source(s, "--config-location"))
        .collect::<Result<Vec<_>, _>>()?;

    let env_locations = cli
        .configuration
        .env_locations
        .iter()
        .map(|s| parse_config_source(s, "--env-location"))
        .collect::<Result<Vec<_>, _>>()?;

    let api = cli.api.api_base_url.clone().map(|base_url| ApiSettings {
        base_url,
        api_key: cli.api.api_key.clone().unwrap_or_default(),
        request_deadline: Duration::from_secs(cli.api.api_request_timeout_secs),
        creation_conflict_timeout: Duration::from_secs(cli.api.creation_conflict_timeout_secs),
        creation_conflict_retry_delay: Duration::from_secs(cli.api.creation_conflict_retry_delay_secs),
        final_update_timeout: Duration::from_secs(cli.api.final_update_timeout_secs),
        managed_probability: cli.api.api_managed_probability,
        failure_report_probability: cli.api.api_failure_report_probability,
        timeout_report_probability: cli.api.api_timeout_report_probability,
        resume_delay: cli.api.resume_delay_secs.map(Duration::from_secs),
    });

    let input = InputSettings {
        literal_value: cli.io.input_value.clone(),
        env_var_name: cli.io.input_env_var_name.clone(),
        filename: cli.io.input_filename.clone(),
        value_format: cli.io.input_value_format.into(),
        cleanup_file: cli.io.cleanup_input_file,
    };

    let result = ResultSettings {
        filename: cli.io.result_filename.clone(),
        value_format: cli.io.result_value_format.into(),
        cleanup_file: !cli.io.no_cleanup_result_file,
    };

    Ok(SupervisorConfig {
        task_name: cli.task.task_name.clone(),
        task_uuid: cli.task.uuid.clone(),
        task_version: TaskVersion {
            number: cli.task.task_version_number,
            text: cli.task.task_version_text.clone(),
            signature: cli.task.task_version_signature.clone(),
        },
        is_service: cli.task.service,
        is_passive: cli.task.is_passive,
        max_concurrency: cli.task.max_concurrency,
        max_conflicting_age: cli.task.max_conflicting_age_secs.map(Duration::from_secs),
        schedule: cli.task.schedule.clone(),
        auto_create_task: cli.task.auto_create_task,
        instance_metadata,
        command: cli.command.clone(),
        shell_mode: cli.process.shell_mode.into(),
        working_dir: cli.process.working_dir.clone(),
        passthrough_env,
        config_locations,
        env_locations,
        api,
        heartbeat_interval: Duration::from_secs(cli.api.heartbeat_interval_secs),
        check_interval: Duration::from_secs(cli.process.check_interval_secs),
        process_timeout: cli.process.timeout_secs.map(Duration::from_secs),
        termination_grace_period: Duration::from_secs(cli.process.termination_grace_period_secs),
        process_max_retries: cli.process.max_retries,
        process_retry_delay: Duration::from_secs(cli.process.retry_delay_secs),
        input,
        result,
        tail_lines: cli.updates.tail_lines,
        tail_lines_on_success: cli.updates.num_log_lines_sent_on_success,
        tail_lines_on_failure: cli.updates.num_log_lines_sent_on_failure,
        tail_lines_on_timeout: cli.updates.num_log_lines_sent_on_timeout,
        enable_status_listener: !cli.updates.no_status_listener,
        status_listener_port: cli.updates.status_update_socket_port,
        status_listener_max_bytes: cli.updates.status_update_message_max_bytes,
        prevent_offline_execution: cli.api.prevent_offline_execution,
        fail_fast_config_resolution: cli.configuration.fail_fast_config_resolution,
        log_secrets: cli.log.log_secrets,
        resolved_config_property_prefix: cli.configuration.resolved_config_property_name_prefix.clone(),
        resolved_config_property_suffix: cli.configuration.resolved_config_property_name_suffix.clone(),
        resolved_env_var_prefix: cli.configuration.resolved_env_var_name_prefix.clone(),
        resolved_env_var_suffix: cli.configuration.resolved_env_var_name_suffix.clone(),
        max_config_resolution_depth: cli.configuration.max_config_resolution_depth,
        max_config_resolution_iterations: cli.configuration.max_config_resolution_iterations,
        exit_after_writing_variables: cli.configuration.exit_after_writing_variables,
    })
}

fn parse_env_kv(raw: &str) -> Result<(String, String), ExitError> {
    match raw.split_once('=') {
        Some((k, v)) => Ok((k.to_string(), v.to_string())),
        None => Err(ExitError::new(2, format!("invalid --env value {raw:?}, expected KEY=VALUE"))),
    }
}

fn parse_config_source(raw: &str, flag: &str) -> Result<ConfigSource, ExitError> {
    let (strategy, location) = raw
        .split_once('=')
        .ok_or_else(|| ExitError::new(2, format!("invalid {flag} value {raw:?}, expected STRATEGY=LOCATION")))?;
    let strategy = parse_merge_strategy(strategy)?;
    Ok(ConfigSource::new(location, strategy))
}

fn parse_merge_strategy(raw: &str) -> Result<MergeStrategy, ExitError> {
    match raw.to_ascii_lowercase().replace('-', "_").as_str() {
        "shallow" => Ok(MergeStrategy::Shallow),
        "deep" => Ok(MergeStrategy::Deep),
        "replace" => Ok(MergeStrategy::Replace),
        "additive" => Ok(MergeStrategy::Additive),
        "typesafe_replace" => Ok(MergeStrategy::TypesafeReplace),
        "typesafe_additive" => Ok(MergeStrategy::TypesafeAdditive),
        other => Err(ExitError::new(2, format!("unknown merge strategy {other:?}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_env_kv() {
        assert_eq!(parse_env_kv("FOO=bar").unwrap(), ("FOO".to_string(), "bar".to_string()));
    }

    #[test]
    fn rejects_env_kv_without_equals() {
        assert!(parse_env_kv("FOO").is_err());
    }

    #[test]
    fn parses_config_source_with_strategy() {
        let source = parse_config_source("deep=FILE:/tmp/a.json!JSON", "--config-location").unwrap();
        assert_eq!(source.strategy, MergeStrategy::Deep);
        assert_eq!(source.location, "FILE:/tmp/a.json!JSON");
    }

    #[test]
    fn rejects_unknown_merge_strategy() {
        assert!(parse_config_source("bogus=FILE:/tmp/a.json", "--config-location").is_err());
    }
}
