// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Logging bootstrap: a `tracing-subscriber` `fmt` layer filtered by
//! `RUST_LOG` (or `-v`/`-vv` when unset), optionally redirected to a file
//! via `tracing-appender` so a supervised service's own log lines don't
//! interleave with the child's tailed stdout/stderr.

use std::path::Path;
use tracing_subscriber::EnvFilter;

/// Guard that must be kept alive for the life of the process when logging
/// to a file; dropping it stops the background writer thread.
pub struct LoggingGuard(#[allow(dead_code)] Option<tracing_appender::non_blocking::WorkerGuard>);

pub fn init(verbosity: u8, log_file: Option<&str>) -> LoggingGuard {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = match verbosity {
            0 => "info",
            1 => "debug",
            _ => "trace",
        };
        EnvFilter::new(format!("taskwrapper={level},tw_supervisor={level},tw_process={level}"))
    });

    match log_file {
        Some(path) => {
            let path = Path::new(path);
            let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
            let file_name = path.file_name().unwrap_or_else(|| path.as_os_str());
            let appender = tracing_appender::rolling::never(dir, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::fmt().with_env_filter(filter).with_writer(writer).with_ansi(false).init();
            LoggingGuard(Some(guard))
        }
        None => {
            tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
            LoggingGuard(None)
        }
    }
}
