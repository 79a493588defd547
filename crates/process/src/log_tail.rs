// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Captures the last N lines of a child's stdout/stderr for inclusion in
//! the terminal status report, while passing every line through to the
//! supervisor's own stdout/stderr unmodified.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWriteExt, BufReader};

/// Bounded ring buffer of the most recent lines seen on a stream.
#[derive(Clone, Default)]
pub struct TailBuffer {
    inner: Arc<Mutex<VecDeque<String>>>,
    capacity: usize,
}

impl TailBuffer {
    pub fn new(capacity: usize) -> Self {
        Self { inner: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))), capacity }
    }

    fn push(&self, line: String) {
        if self.capacity == 0 {
            return;
        }
        let mut buf = self.inner.lock();
        if buf.len() == self.capacity {
            buf.pop_front();
        }
        buf.push_back(line);
    }

    pub fn lines(&self) -> Vec<String> {
        self.inner.lock().iter().cloned().collect()
    }
}

/// Read `reader` line by line, appending each line to `tail` and mirroring
/// it to `passthrough` (the supervisor's own stdout or stderr), until EOF.
pub async fn pump<R, W>(reader: R, tail: TailBuffer, mut passthrough: W)
where
    R: AsyncRead + Unpin,
    W: AsyncWriteExt + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                tail.push(line.clone());
                if passthrough.write_all(line.as_bytes()).await.is_err() {
                    break;
                }
                if passthrough.write_all(b"\n").await.is_err() {
                    break;
                }
            }
            Ok(None) => break,
            Err(_) => break,
        }
    }
    let _ = passthrough.flush().await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn buffer_keeps_only_the_most_recent_n_lines() {
        let tail = TailBuffer::new(2);
        tail.push("a".to_string());
        tail.push("b".to_string());
        tail.push("c".to_string());
        assert_eq!(tail.lines(), vec!["b".to_string(), "c".to_string()]);
    }

    #[test]
    fn zero_capacity_buffer_retains_nothing() {
        let tail = TailBuffer::new(0);
        tail.push("a".to_string());
        assert!(tail.lines().is_empty());
    }

    #[tokio::test]
    async fn pump_mirrors_lines_and_fills_tail_buffer() {
        let input = Cursor::new(b"line1\nline2\nline3\n".to_vec());
        let tail = TailBuffer::new(10);
        let mut output = Vec::new();
        pump(input, tail.clone(), &mut output).await;
        assert_eq!(tail.lines(), vec!["line1", "line2", "line3"]);
        assert_eq!(String::from_utf8(output).unwrap(), "line1\nline2\nline3\n");
    }

    #[tokio::test]
    async fn pump_truncates_to_buffer_capacity() {
        let input = Cursor::new(b"a\nb\nc\nd\n".to_vec());
        let tail = TailBuffer::new(2);
        let mut output = Vec::new();
        pump(input, tail.clone(), &mut output).await;
        assert_eq!(tail.lines(), vec!["c".to_string(), "d".to_string()]);
    }
}
