// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP+JSON client for the Task Management service: registration,
//! execution creation, heartbeats, and status updates, each wrapped in
//! the retry/backoff/deadline engine.

use crate::error::{classify_status, ApiError, Classification};
use crate::retry::{run_with_retry, AttemptOutcome, BackoffPolicy, DeadlinePolicy, ResumePolicy};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::time::Duration;
use tracing::instrument;
use tw_core::{Clock, Counters, ExecutionId, Random, SystemClock, SystemRandom, TaskExecution, TaskIdentity};

#[derive(Debug, Clone)]
pub struct ApiClientConfig {
    pub base_url: String,
    pub api_key: String,
    pub backoff: BackoffPolicy,
    pub request_deadline: Option<Duration>,
    /// Deadline for the `create_execution` conflict-retry window (e.g. a
    /// server enforcing `max_concurrency=1` keeps returning 409 until a
    /// concurrent execution finishes). Distinct from `request_deadline`,
    /// which bounds an individual call's transient-error retries.
    pub creation_conflict_timeout: Duration,
    /// Deadline for the terminal `finalize` call; kept short relative to
    /// registration since it runs on the shutdown path.
    pub final_update_timeout: Duration,
    /// Fixed delay between `create_execution` conflict retries when the
    /// server didn't send a `Retry-After` header, in place of the
    /// exponential backoff curve used for ordinary transient errors.
    pub creation_conflict_retry_delay: Duration,
    /// When set, a call whose retry budget (`backoff.max_attempts` or
    /// `request_deadline`) is exhausted pauses for this long and opens a
    /// fresh attempt window instead of surfacing the failure. Applies to
    /// registration, heartbeats, status updates, and `finalize`; the
    /// `create_execution` conflict-retry loop has its own unbounded
    /// attempt count and is governed by `creation_conflict_timeout`
    /// instead.
    pub resume_delay: Option<Duration>,
}

impl ApiClientConfig {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            backoff: BackoffPolicy::default(),
            request_deadline: Some(Duration::from_secs(30)),
            creation_conflict_timeout: Duration::from_secs(300),
            final_update_timeout: Duration::from_secs(30),
            creation_conflict_retry_delay: Duration::from_secs(5),
            resume_delay: None,
        }
    }
}

#[derive(Serialize)]
struct HeartbeatBody<'a> {
    counters: &'a Counters,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_status_message: Option<&'a str>,
}

/// What the server asks of the supervisor via a heartbeat reply: stop the
/// child (user cancellation, `max_conflicting_age` eviction, ...) or
/// treat the execution as already done while letting the child keep
/// running in the background (the `MARKED_DONE` branch of the state
/// machine).
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct HeartbeatResponse {
    #[serde(default)]
    pub stop_requested: bool,
    #[serde(default)]
    pub marked_done: bool,
}

#[derive(Serialize)]
struct CreateExecutionBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    input_value: Option<&'a JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    runtime_metadata: Option<&'a JsonValue>,
    is_passive: bool,
    auto_create_task: bool,
}

#[derive(Serialize)]
struct StatusUpdateBody<'a> {
    status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    exit_code: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    result_value: Option<&'a JsonValue>,
}

#[derive(Serialize)]
struct FinalizeBody<'a> {
    status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    exit_code: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    result_value: Option<&'a JsonValue>,
    #[serde(skip_serializing_if = "<[String]>::is_empty")]
    stdout_tail: &'a [String],
    #[serde(skip_serializing_if = "<[String]>::is_empty")]
    stderr_tail: &'a [String],
}

pub struct ApiClient<C: Clock = SystemClock, R: Random = SystemRandom> {
    http: reqwest::Client,
    config: ApiClientConfig,
    clock: C,
    random: R,
}

impl ApiClient<SystemClock, SystemRandom> {
    pub fn new(config: ApiClientConfig) -> Self {
        let http = build_http_client(&config);
        Self { http, config, clock: SystemClock, random: SystemRandom }
    }
}

impl<C: Clock, R: Random> ApiClient<C, R> {
    pub fn with_deps(config: ApiClientConfig, clock: C, random: R) -> Self {
        let http = build_http_client(&config);
        Self { http, config, clock, random }
    }

    fn deadline(&self) -> DeadlinePolicy {
        match self.config.request_deadline {
            Some(d) => DeadlinePolicy::of(d),
            None => DeadlinePolicy::none(),
        }
    }

    fn resume(&self) -> ResumePolicy {
        match self.config.resume_delay {
            Some(d) => ResumePolicy::after(d),
            None => ResumePolicy::none(),
        }
    }

    #[instrument(skip(self, identity), fields(task = %identity.name))]
    pub async fn register_task(&self, identity: &TaskIdentity) -> Result<TaskIdentity, ApiError> {
        let url = format!("{}/api/v1/tasks/", self.config.base_url);
        run_with_retry(self.config.backoff, self.deadline(), self.resume(), &self.clock, &self.random, |_attempt| {
            let url = url.clone();
            async move {
                match self
                    .http
                    .post(&url)
                    .bearer_auth(&self.config.api_key)
                    .json(identity)
                    .send()
                    .await
                {
                    Ok(resp) => self.handle_json_response::<TaskIdentity>(resp).await,
                    Err(e) => AttemptOutcome::Retryable { cause: ApiError::Transport(e), retry_after: None },
                }
            }
        })
        .await
    }

    /// Registers a Task Execution. A `409 Conflict` (the server declining
    /// due to `max_concurrency`) is retried — unlike every other API
    /// call, where it would be terminal — until
    /// `creation_conflict_timeout` elapses, honouring any `Retry-After`
    /// the server sends.
    #[instrument(skip(self, input, runtime_metadata), fields(task = %task_name))]
    pub async fn create_execution(
        &self,
        task_name: &str,
        input: Option<&JsonValue>,
        runtime_metadata: Option<&JsonValue>,
        is_passive: bool,
        auto_create_task: bool,
    ) -> Result<TaskExecution, ApiError> {
        let url = format!(
            "{}/api/v1/tasks/{}/executions/",
            self.config.base_url,
            urlencoding_encode(task_name)
        );
        let conflict_backoff =
            BackoffPolicy { max_attempts: u32::MAX, ..self.config.backoff };
        let deadline = DeadlinePolicy::of(self.config.creation_conflict_timeout);
        run_with_retry(conflict_backoff, deadline, ResumePolicy::none(), &self.clock, &self.random, |_attempt| {
            let url = url.clone();
            let body = CreateExecutionBody { input_value: input, runtime_metadata, is_passive, auto_create_task };
            async move {
                let req = self.http.post(&url).bearer_auth(&self.config.api_key).json(&body);
                match req.send().await {
                    Ok(resp) if resp.status().as_u16() == 409 => {
                        let retry_after = resp
                            .headers()
                            .get(reqwest::header::RETRY_AFTER)
                            .and_then(|v| v.to_str().ok())
                            .and_then(|v| v.parse::<u64>().ok())
                            .map(Duration::from_secs)
                            .unwrap_or(self.config.creation_conflict_retry_delay);
                        let body = resp.text().await.unwrap_or_default();
                        AttemptOutcome::Retryable {
                            cause: ApiError::Status { status: 409, body },
                            retry_after: Some(retry_after),
                        }
                    }
                    Ok(resp) => self.handle_json_response::<TaskExecution>(resp).await,
                    Err(e) => AttemptOutcome::Retryable { cause: ApiError::Transport(e), retry_after: None },
                }
            }
        })
        .await
    }

    /// The single terminal call for an execution: reports the outcome,
    /// exit code, result value, and captured log tail. Idempotent from
    /// the caller's perspective — a duplicate send
    /// (e.g. after a network-level timeout whose response was lost) just
    /// overwrites the same terminal fields server-side.
    #[instrument(skip(self, result_value, stdout_tail, stderr_tail), fields(execution = %execution_id, status = %status))]
    pub async fn finalize(
        &self,
        execution_id: &ExecutionId,
        status: &str,
        exit_code: Option<i32>,
        result_value: Option<&JsonValue>,
        stdout_tail: &[String],
        stderr_tail: &[String],
    ) -> Result<(), ApiError> {
        let url = format!("{}/api/v1/executions/{}/finalize/", self.config.base_url, execution_id.suffix());
        let deadline = DeadlinePolicy::of(self.config.final_update_timeout);
        run_with_retry(self.config.backoff, deadline, self.resume(), &self.clock, &self.random, |_attempt| {
            let url = url.clone();
            let body = FinalizeBody { status: status.to_string(), exit_code, result_value, stdout_tail, stderr_tail };
            async move {
                match self.http.post(&url).bearer_auth(&self.config.api_key).json(&body).send().await {
                    Ok(resp) => self.handle_empty_response(resp).await,
                    Err(e) => AttemptOutcome::Retryable { cause: ApiError::Transport(e), retry_after: None },
                }
            }
        })
        .await
    }

    #[instrument(skip(self, counters, message), fields(execution = %execution_id))]
    pub async fn send_heartbeat(
        &self,
        execution_id: &ExecutionId,
        counters: &Counters,
        message: Option<&str>,
    ) -> Result<HeartbeatResponse, ApiError> {
        let url =
            format!("{}/api/v1/executions/{}/heartbeat/", self.config.base_url, execution_id.suffix());
        run_with_retry(self.config.backoff, self.deadline(), self.resume(), &self.clock, &self.random, |_attempt| {
            let url = url.clone();
            let body = HeartbeatBody { counters, last_status_message: message };
            async move {
                match self.http.put(&url).bearer_auth(&self.config.api_key).json(&body).send().await {
                    Ok(resp) => self.handle_heartbeat_response(resp).await,
                    Err(e) => AttemptOutcome::Retryable { cause: ApiError::Transport(e), retry_after: None },
                }
            }
        })
        .await
    }

    #[instrument(skip(self, result_value), fields(execution = %execution_id, status = %status))]
    pub async fn update_status(
        &self,
        execution_id: &ExecutionId,
        status: &str,
        exit_code: Option<i32>,
        result_value: Option<&JsonValue>,
    ) -> Result<(), ApiError> {
        let url = format!("{}/api/v1/executions/{}/", self.config.base_url, execution_id.suffix());
        run_with_retry(self.config.backoff, self.deadline(), self.resume(), &self.clock, &self.random, |_attempt| {
            let url = url.clone();
            let body = StatusUpdateBody { status: status.to_string(), exit_code, result_value };
            async move {
                match self.http.patch(&url).bearer_auth(&self.config.api_key).json(&body).send().await {
                    Ok(resp) => self.handle_empty_response(resp).await,
                    Err(e) => AttemptOutcome::Retryable { cause: ApiError::Transport(e), retry_after: None },
                }
            }
        })
        .await
    }

    async fn handle_json_response<T: for<'de> Deserialize<'de>>(
        &self,
        resp: reqwest::Response,
    ) -> AttemptOutcome<T> {
        let status = resp.status();
        if status.is_success() {
            let text = match resp.text().await {
                Ok(t) => t,
                Err(e) => return AttemptOutcome::Retryable { cause: ApiError::Transport(e), retry_after: None },
            };
            return match serde_json::from_str(&text) {
                Ok(v) => AttemptOutcome::Ok(v),
                Err(e) => AttemptOutcome::Terminal(ApiError::Decode(e)),
            };
        }
        self.classify_error_response(resp).await
    }

    async fn handle_empty_response(&self, resp: reqwest::Response) -> AttemptOutcome<()> {
        if resp.status().is_success() {
            return AttemptOutcome::Ok(());
        }
        self.classify_error_response(resp).await
    }

    /// As [`Self::handle_empty_response`], but a successful heartbeat may
    /// carry a `{stop_requested, marked_done}` body; a blank body is
    /// treated as neither flag set, for servers that don't implement it.
    async fn handle_heartbeat_response(&self, resp: reqwest::Response) -> AttemptOutcome<HeartbeatResponse> {
        let status = resp.status();
        if status.is_success() {
            let text = match resp.text().await {
                Ok(t) => t,
                Err(e) => return AttemptOutcome::Retryable { cause: ApiError::Transport(e), retry_after: None },
            };
            if text.trim().is_empty() {
                return AttemptOutcome::Ok(HeartbeatResponse::default());
            }
            return match serde_json::from_str(&text) {
                Ok(v) => AttemptOutcome::Ok(v),
                Err(e) => AttemptOutcome::Terminal(ApiError::Decode(e)),
            };
        }
        self.classify_error_response(resp).await
    }

    async fn classify_error_response<T>(&self, resp: reqwest::Response) -> AttemptOutcome<T> {
        let status = resp.status().as_u16();
        let retry_after = resp
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_secs);
        let body = resp.text().await.unwrap_or_default();
        let cause = ApiError::Status { status, body };
        match classify_status(status) {
            Classification::Retryable => AttemptOutcome::Retryable { cause, retry_after },
            Classification::Terminal => AttemptOutcome::Terminal(cause),
        }
    }
}

fn build_http_client(_config: &ApiClientConfig) -> reqwest::Client {
    reqwest::Client::new()
}

fn urlencoding_encode(s: &str) -> String {
    s.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '~') {
                c.to_string()
            } else {
                c.to_string().bytes().map(|b| format!("%{b:02X}")).collect()
            }
        })
        .collect()
}
