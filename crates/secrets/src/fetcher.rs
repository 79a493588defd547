// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Ties location parsing, the provider registry, format parsing, JSON-Path
//! extraction, and the TTL cache together into one `fetch` call.

use crate::cache::SecretCache;
use crate::location::{SecretLocation, SecretLocationError};
use crate::provider::{ProviderRegistry, SecretFetchError};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::time::Duration;
use thiserror::Error;
use tracing::instrument;
use tw_core::{Clock, SystemClock, Value};
use tw_valuefmt::{format, jsonpath, Format};

#[derive(Debug, Error)]
pub enum SecretResolutionError {
    #[error("invalid secret location: {0}")]
    Location(#[from] SecretLocationError),
    #[error(transparent)]
    Fetch(#[from] SecretFetchError),
    #[error("failed to parse fetched secret content: {0}")]
    Parse(#[from] format::ParseError),
    #[error(transparent)]
    JsonPath(#[from] jsonpath::JsonPathError),
}

pub struct SecretFetcher<C: Clock = SystemClock> {
    registry: ProviderRegistry,
    cache: SecretCache<C>,
}

impl SecretFetcher<SystemClock> {
    pub fn new(registry: ProviderRegistry, ttl: Duration) -> Self {
        Self { registry, cache: SecretCache::new(SystemClock, ttl) }
    }
}

impl<C: Clock> SecretFetcher<C> {
    pub fn with_clock(registry: ProviderRegistry, ttl: Duration, clock: C) -> Self {
        Self { registry, cache: SecretCache::new(clock, ttl) }
    }

    #[instrument(skip(self), fields(location = %raw))]
    pub async fn fetch(&self, raw: &str) -> Result<Value, SecretResolutionError> {
        if let Some(cached) = self.cache.get(raw) {
            return Ok(cached);
        }

        let location = SecretLocation::parse(raw)?;
        let provider = self.registry.get_or_default(location.provider.as_deref())?;
        let raw_bytes = provider.fetch(&location.address).await?;

        // Binary content that isn't valid UTF-8 can't be parsed as any of
        // the declared text formats; fall back to the base64 encoding of
        // the raw bytes rather than failing the fetch.
        let mut value = match std::str::from_utf8(&raw_bytes) {
            Ok(text) => {
                let fmt = location.format.unwrap_or_else(|| Format::sniff(text));
                format::parse(text, fmt)?
            }
            Err(_) => Value::String(STANDARD.encode(&raw_bytes)),
        };

        if let Some(path) = &location.json_path {
            value = jsonpath::extract(&value, path)?;
        }

        self.cache.put(raw.to_string(), value.clone());
        Ok(value)
    }

    pub fn invalidate(&self, raw: &str) {
        self.cache.invalidate(raw);
    }
}
