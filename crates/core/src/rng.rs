// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Random-number abstraction for testable sampling decisions.
//!
//! Mirrors [`crate::clock::Clock`]: a trait with a real implementation
//! backed by the `rand` crate and a fake implementation that returns a
//! fixed, settable sequence of values for deterministic tests.

use parking_lot::Mutex;
use std::sync::Arc;

/// A source of uniform random numbers in `[0.0, 1.0)`.
pub trait Random: Clone + Send + Sync {
    /// Draw a uniform sample in `[0.0, 1.0)`.
    fn uniform(&self) -> f64;
}

/// Real RNG backed by `rand::thread_rng`.
#[derive(Clone, Default)]
pub struct SystemRandom;

impl Random for SystemRandom {
    fn uniform(&self) -> f64 {
        rand::random::<f64>()
    }
}

/// Fake RNG that returns a fixed value, or a queue of values consumed in
/// order (falling back to the fixed value once the queue is exhausted).
#[derive(Clone)]
pub struct FakeRandom {
    fixed: Arc<Mutex<f64>>,
    queue: Arc<Mutex<Vec<f64>>>,
}

impl FakeRandom {
    pub fn new(fixed: f64) -> Self {
        Self {
            fixed: Arc::new(Mutex::new(fixed)),
            queue: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn set(&self, value: f64) {
        *self.fixed.lock() = value;
    }

    /// Queue a sequence of values to be returned by successive `uniform()`
    /// calls, in order.
    pub fn push(&self, value: f64) {
        self.queue.lock().push(value);
    }
}

impl Default for FakeRandom {
    fn default() -> Self {
        Self::new(0.0)
    }
}

impl Random for FakeRandom {
    fn uniform(&self) -> f64 {
        let mut queue = self.queue.lock();
        if queue.is_empty() {
            *self.fixed.lock()
        } else {
            queue.remove(0)
        }
    }
}
