// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Retry/backoff/deadline engine shared by every API Client call.
//!
//! Each attempt returns a tagged outcome rather than a bare `Result`, so
//! callers can distinguish "succeeded", "failed but worth retrying
//! (optionally after a server-given delay)", and "failed, stop now".

use crate::error::ApiError;
use std::time::{Duration, Instant};
use tw_core::{Clock, Random};

pub enum AttemptOutcome<T> {
    Ok(T),
    Retryable { cause: ApiError, retry_after: Option<Duration> },
    Terminal(ApiError),
}

#[derive(Debug, Clone, Copy)]
pub struct BackoffPolicy {
    pub initial: Duration,
    pub max: Duration,
    pub multiplier: f64,
    pub max_attempts: u32,
    /// Full-jitter fraction in `[0.0, 1.0]` applied to each computed delay.
    pub jitter: f64,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            initial: Duration::from_millis(500),
            max: Duration::from_secs(30),
            multiplier: 2.0,
            max_attempts: 5,
            jitter: 0.2,
        }
    }
}

impl BackoffPolicy {
    fn base_delay(&self, attempt: u32) -> Duration {
        let scaled = self.initial.as_secs_f64() * self.multiplier.powi(attempt as i32);
        Duration::from_secs_f64(scaled.min(self.max.as_secs_f64()))
    }

    fn delay_for(&self, attempt: u32, random: &impl Random) -> Duration {
        let base = self.base_delay(attempt);
        if self.jitter <= 0.0 {
            return base;
        }
        let jitter_span = base.as_secs_f64() * self.jitter;
        let offset = jitter_span * (random.uniform() * 2.0 - 1.0);
        Duration::from_secs_f64((base.as_secs_f64() + offset).max(0.0))
    }
}

pub struct DeadlinePolicy {
    pub overall: Option<Duration>,
}

impl DeadlinePolicy {
    pub fn none() -> Self {
        Self { overall: None }
    }

    pub fn of(duration: Duration) -> Self {
        Self { overall: Some(duration) }
    }

    fn remaining(&self, elapsed: Duration) -> Option<Duration> {
        self.overall.map(|d| d.saturating_sub(elapsed))
    }

    fn is_exceeded(&self, elapsed: Duration) -> bool {
        self.overall.is_some_and(|d| elapsed >= d)
    }
}

/// What happens once a call's retry budget (backoff attempts or the
/// overall deadline) is exhausted: surface the failure, or enter a
/// paused state for `resume_delay` and start a fresh attempt window.
/// `None` surfaces the failure immediately, matching the pre-pause
/// behaviour.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResumePolicy {
    pub resume_delay: Option<Duration>,
}

impl ResumePolicy {
    pub fn none() -> Self {
        Self { resume_delay: None }
    }

    pub fn after(delay: Duration) -> Self {
        Self { resume_delay: Some(delay) }
    }
}

enum Exhaustion<T> {
    Ok(T),
    Terminal(ApiError),
    Exhausted(ApiError),
}

/// Drive `attempt` to completion, retrying on [`AttemptOutcome::Retryable`]
/// until `backoff.max_attempts` is hit or `deadline` elapses. If `resume`
/// carries a delay, exhaustion of that retry budget pauses for the delay
/// and opens a fresh attempt window instead of returning an error; a
/// [`AttemptOutcome::Terminal`] outcome is never paused, since it means
/// the server rejected the request outright rather than the budget
/// running out.
pub async fn run_with_retry<T, C, R, F, Fut>(
    backoff: BackoffPolicy,
    deadline: DeadlinePolicy,
    resume: ResumePolicy,
    clock: &C,
    random: &R,
    mut attempt: F,
) -> Result<T, ApiError>
where
    C: Clock,
    R: Random,
    F: FnMut(u32) -> Fut,
    Fut: std::future::Future<Output = AttemptOutcome<T>>,
{
    loop {
        let start = Instant::now();
        let mut attempt_no = 0u32;
        let outcome = loop {
            if deadline.is_exceeded(start.elapsed()) {
                let _ = clock.epoch_ms();
                break Exhaustion::Exhausted(ApiError::DeadlineExceeded(
                    deadline.overall.unwrap_or_default(),
                ));
            }
            match attempt(attempt_no).await {
                AttemptOutcome::Ok(v) => break Exhaustion::Ok(v),
                AttemptOutcome::Terminal(e) => break Exhaustion::Terminal(e),
                AttemptOutcome::Retryable { cause, retry_after } => {
                    attempt_no += 1;
                    if attempt_no >= backoff.max_attempts {
                        break Exhaustion::Exhausted(cause);
                    }
                    let mut delay = retry_after.unwrap_or_else(|| backoff.delay_for(attempt_no - 1, random));
                    if let Some(remaining) = deadline.remaining(start.elapsed()) {
                        if remaining.is_zero() {
                            break Exhaustion::Exhausted(ApiError::DeadlineExceeded(
                                deadline.overall.unwrap_or_default(),
                            ));
                        }
                        delay = delay.min(remaining);
                    }
                    tokio::time::sleep(delay).await;
                }
            }
        };
        match outcome {
            Exhaustion::Ok(v) => return Ok(v),
            Exhaustion::Terminal(e) => return Err(e),
            Exhaustion::Exhausted(e) => match resume.resume_delay {
                Some(delay) => {
                    tracing::warn!(error = %e, resume_delay = ?delay, "retry budget exhausted, pausing before resuming");
                    tokio::time::sleep(delay).await;
                }
                None => return Err(e),
            },
        }
    }
}
