// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("API returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("failed to decode API response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("deadline of {0:?} exceeded before the request succeeded")]
    DeadlineExceeded(std::time::Duration),
    #[error("exhausted {0} retry attempts")]
    RetriesExhausted(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Retryable,
    Terminal,
}

/// Classifies an HTTP status code for the retry engine.
///
/// Per an explicit decision preserved from the source this supervisor
/// is modeled on: a bare `500` is treated as non-retryable (it typically
/// indicates an application bug that a retry will not fix), while
/// `502`/`503`/`504` (and `429`) indicate transient upstream trouble and
/// are retried. Other 4xx/5xx codes are terminal.
pub fn classify_status(status: u16) -> Classification {
    match status {
        429 | 502 | 503 | 504 => Classification::Retryable,
        _ => Classification::Terminal,
    }
}
