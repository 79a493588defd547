// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error type that carries a process exit code, so `main()` can convert
//! any failure in building or running the supervised command into the
//! right `std::process::exit()` call.

use std::fmt;

#[derive(Debug)]
pub struct ExitError {
    pub code: i32,
    pub message: String,
}

impl ExitError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self { code, message: message.into() }
    }
}

impl fmt::Display for ExitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ExitError {}

impl From<tw_supervisor::SupervisorError> for ExitError {
    fn from(e: tw_supervisor::SupervisorError) -> Self {
        Self::new(e.exit_code(), e.to_string())
    }
}
