// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! TTL-based cache for resolved secret values, keyed by the raw location
//! string so identical locations across multiple env var declarations
//! share one fetch.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;
use tw_core::{Clock, Value};

struct Entry {
    value: Value,
    expires_at_ms: u64,
}

pub struct SecretCache<C: Clock> {
    clock: C,
    ttl: Duration,
    entries: Mutex<HashMap<String, Entry>>,
}

impl<C: Clock> SecretCache<C> {
    pub fn new(clock: C, ttl: Duration) -> Self {
        Self { clock, ttl, entries: Mutex::new(HashMap::new()) }
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        let entries = self.entries.lock();
        let entry = entries.get(key)?;
        if entry.expires_at_ms > self.clock.epoch_ms() {
            Some(entry.value.clone())
        } else {
            None
        }
    }

    pub fn put(&self, key: String, value: Value) {
        if self.ttl.is_zero() {
            return;
        }
        let expires_at_ms = self.clock.epoch_ms() + self.ttl.as_millis() as u64;
        self.entries.lock().insert(key, Entry { value, expires_at_ms });
    }

    pub fn invalidate(&self, key: &str) {
        self.entries.lock().remove(key);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
