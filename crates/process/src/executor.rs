// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Spawns the wrapped command in its own process group, pipes and tails
//! its stdout/stderr, and mediates graceful-then-forceful termination.

use crate::log_tail::{pump, TailBuffer};
use crate::shell_detect::{needs_shell, ShellMode};
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use std::collections::BTreeMap;
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::process::{Child, Command};
use tracing::instrument;

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("failed to spawn child process: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("failed to wait for child process: {0}")]
    Wait(#[source] std::io::Error),
    #[error("child process has no process group id; cannot signal it")]
    NoProcessGroup,
    #[error("signal delivery failed: {0}")]
    Signal(#[source] nix::Error),
}

#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    pub command: Vec<String>,
    pub shell_mode: ShellMode,
    pub shell_path: String,
    pub working_dir: Option<String>,
    pub env: BTreeMap<String, String>,
    pub tail_lines: usize,
    /// Grace period between SIGTERM and SIGKILL on a stop request.
    pub term_grace_period: Duration,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            command: Vec::new(),
            shell_mode: ShellMode::Auto,
            shell_path: "/bin/sh".to_string(),
            working_dir: None,
            env: BTreeMap::new(),
            tail_lines: 50,
            term_grace_period: Duration::from_secs(10),
        }
    }
}

pub struct RunningProcess {
    child: Child,
    pgid: Pid,
    pub stdout_tail: TailBuffer,
    pub stderr_tail: TailBuffer,
}

pub struct ExitOutcome {
    pub exit_code: Option<i32>,
    pub signal: Option<i32>,
}

pub struct ProcessExecutor {
    config: ExecutorConfig,
}

impl ProcessExecutor {
    pub fn new(config: ExecutorConfig) -> Self {
        Self { config }
    }

    #[instrument(skip(self), fields(argc = self.config.command.len()))]
    pub fn spawn(&self) -> Result<RunningProcess, ProcessError> {
        let mut cmd = self.build_command()?;
        cmd.stdin(Stdio::null()).stdout(Stdio::piped()).stderr(Stdio::piped());
        // New process group so a stop request can signal descendants too,
        // not just the direct child.
        cmd.process_group(0);

        let mut child = cmd.spawn().map_err(ProcessError::Spawn)?;
        let pid = child.id().ok_or(ProcessError::NoProcessGroup)?;
        let pgid = Pid::from_raw(pid as i32);

        let stdout_tail = TailBuffer::new(self.config.tail_lines);
        let stderr_tail = TailBuffer::new(self.config.tail_lines);

        if let Some(stdout) = child.stdout.take() {
            let tail = stdout_tail.clone();
            tokio::spawn(async move {
                pump(stdout, tail, tokio::io::stdout()).await;
            });
        }
        if let Some(stderr) = child.stderr.take() {
            let tail = stderr_tail.clone();
            tokio::spawn(async move {
                pump(stderr, tail, tokio::io::stderr()).await;
            });
        }

        Ok(RunningProcess { child, pgid, stdout_tail, stderr_tail })
    }

    fn build_command(&self) -> Result<Command, ProcessError> {
        let use_shell = needs_shell(&self.config.command, self.config.shell_mode);
        let mut cmd = if use_shell {
            let mut c = Command::new(&self.config.shell_path);
            c.arg("-c").arg(self.config.command.join(" "));
            c
        } else {
            let mut iter = self.config.command.iter();
            let program = iter.next().cloned().unwrap_or_default();
            let mut c = Command::new(program);
            c.args(iter);
            c
        };
        if let Some(dir) = &self.config.working_dir {
            cmd.current_dir(dir);
        }
        cmd.env_clear();
        cmd.envs(&self.config.env);
        Ok(cmd)
    }
}

impl RunningProcess {
    pub fn pid(&self) -> u32 {
        self.pgid.as_raw() as u32
    }

    pub async fn wait(&mut self) -> Result<ExitOutcome, ProcessError> {
        let status = self.child.wait().await.map_err(ProcessError::Wait)?;
        Ok(ExitOutcome {
            exit_code: status.code(),
            signal: std::os::unix::process::ExitStatusExt::signal(&status),
        })
    }

    /// Send SIGTERM to the whole process group, wait up to `grace`, then
    /// SIGKILL if it hasn't exited.
    pub async fn stop(&mut self, grace: Duration) -> Result<ExitOutcome, ProcessError> {
        self.signal_group(Signal::SIGTERM)?;
        match tokio::time::timeout(grace, self.wait()).await {
            Ok(outcome) => outcome,
            Err(_) => {
                self.signal_group(Signal::SIGKILL)?;
                self.wait().await
            }
        }
    }

    fn signal_group(&self, signal: Signal) -> Result<(), ProcessError> {
        // Negative pid targets the whole process group (man 2 kill).
        kill(Pid::from_raw(-self.pgid.as_raw()), signal).map_err(ProcessError::Signal)
    }
}
