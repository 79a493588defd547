// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Local UDP listener the child process can report progress to without
//! needing network access or credentials of its own: it sends small JSON
//! datagrams containing counters and/or a status message, which are
//! merged into the Task Execution's heartbeat state.

use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tw_core::Counters;

/// Default port the listener binds.
pub const DEFAULT_PORT: u16 = 2373;
/// Default cap on a single datagram's size.
pub const DEFAULT_MAX_DATAGRAM_BYTES: usize = 64 * 1024;

#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct StatusUpdate {
    #[serde(default)]
    pub success_count: Option<u64>,
    #[serde(default)]
    pub error_count: Option<u64>,
    #[serde(default)]
    pub skipped_count: Option<u64>,
    #[serde(default)]
    pub expected_count: Option<u64>,
    #[serde(default)]
    pub last_status_message: Option<String>,
}

impl StatusUpdate {
    pub fn counters(&self) -> Counters {
        Counters {
            success_count: self.success_count.unwrap_or(0),
            error_count: self.error_count.unwrap_or(0),
            skipped_count: self.skipped_count.unwrap_or(0),
            expected_count: self.expected_count.unwrap_or(0),
        }
    }
}

#[derive(Debug, Error)]
pub enum StatusListenerError {
    #[error("failed to bind status listener socket: {0}")]
    Bind(#[source] std::io::Error),
}

pub struct StatusListener {
    socket: UdpSocket,
    max_bytes: usize,
    dropped: Arc<AtomicU64>,
}

impl StatusListener {
    /// Bind to `127.0.0.1:port` with at-most-one listener per supervisor.
    /// Pass `port: 0` for an ephemeral port, useful in tests that need to
    /// run several listeners concurrently without colliding.
    pub async fn bind_on(port: u16, max_bytes: usize) -> Result<Self, StatusListenerError> {
        let socket = UdpSocket::bind(("127.0.0.1", port)).await.map_err(StatusListenerError::Bind)?;
        Ok(Self { socket, max_bytes, dropped: Arc::new(AtomicU64::new(0)) })
    }

    /// Bind using the default port and size cap.
    pub async fn bind() -> Result<Self, StatusListenerError> {
        Self::bind_on(DEFAULT_PORT, DEFAULT_MAX_DATAGRAM_BYTES).await
    }

    pub fn local_addr(&self) -> Result<SocketAddr, std::io::Error> {
        self.socket.local_addr()
    }

    /// Count of datagrams dropped (malformed, or larger than `max_bytes`)
    /// since this listener was created.
    pub fn dropped_count(&self) -> Arc<AtomicU64> {
        self.dropped.clone()
    }

    /// Run the receive loop, forwarding well-formed updates to `tx`.
    /// Malformed or oversized datagrams increment the dropped counter and
    /// are otherwise ignored; never fatal to the supervised run.
    pub async fn run(self, tx: mpsc::Sender<StatusUpdate>) {
        // One byte larger than the cap: if it fills completely, the
        // sender's datagram was at least `max_bytes + 1` and must be
        // rejected rather than silently truncated and parsed.
        let mut buf = vec![0u8; self.max_bytes + 1];
        loop {
            match self.socket.recv(&mut buf).await {
                Ok(n) if n > self.max_bytes => {
                    self.dropped.fetch_add(1, Ordering::Relaxed);
                    tracing::debug!(size = n, cap = self.max_bytes, "dropped oversized status datagram");
                }
                Ok(n) => {
                    if let Ok(update) = serde_json::from_slice::<StatusUpdate>(&buf[..n]) {
                        if tx.send(update).await.is_err() {
                            break;
                        }
                    } else {
                        self.dropped.fetch_add(1, Ordering::Relaxed);
                        tracing::debug!("dropped malformed status datagram");
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "status listener socket read failed");
                    break;
                }
            }
        }
    }
}
