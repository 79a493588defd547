// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The config resolver: fetches an ordered list of sources (each
//! addressed with the same location grammar the secret fetcher uses) and
//! folds them together with their declared merge strategy.

use crate::merge::{merge, MergeStrategy, TypeMismatchError};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::instrument;
use tw_core::{Clock, SystemClock, Value};
use tw_secrets::{SecretFetcher, SecretResolutionError};

#[derive(Debug, Clone)]
pub struct ConfigSource {
    pub location: String,
    pub strategy: MergeStrategy,
}

impl ConfigSource {
    pub fn new(location: impl Into<String>, strategy: MergeStrategy) -> Self {
        Self { location: location.into(), strategy }
    }
}

/// Bounds and naming for the resolution pass: which keys mark a value as
/// a secret location to resolve, how deep into nested maps to look, and
/// how many passes to run before giving up on reaching a fixed point
/// (resolved values that are themselves resolvable locations).
#[derive(Debug, Clone)]
pub struct ResolutionSettings {
    pub resolvable_prefix: String,
    pub resolvable_suffix: String,
    pub max_depth: usize,
    pub max_iterations: usize,
}

impl Default for ResolutionSettings {
    fn default() -> Self {
        Self {
            resolvable_prefix: String::new(),
            resolvable_suffix: "__to_resolve".to_string(),
            max_depth: 5,
            max_iterations: 5,
        }
    }
}

impl ResolutionSettings {
    /// The settings matching the flat environment-projection side of the
    /// config resolver, whose default marker is the supervisor's own
    /// resolvable-env-var suffix rather than the config one.
    pub fn for_env() -> Self {
        Self { resolvable_suffix: "_FOR_PROC_WRAPPER_TO_RESOLVE".to_string(), max_depth: 1, ..Self::default() }
    }

    fn strip(&self, key: &str) -> Option<String> {
        if !self.resolvable_suffix.is_empty() {
            if let Some(stripped) = key.strip_suffix(self.resolvable_suffix.as_str()) {
                return Some(stripped.to_string());
            }
        }
        if !self.resolvable_prefix.is_empty() {
            if let Some(stripped) = key.strip_prefix(self.resolvable_prefix.as_str()) {
                return Some(stripped.to_string());
            }
        }
        None
    }
}

#[derive(Debug, Error)]
pub enum ConfigResolutionError {
    #[error("failed to resolve config source {location:?}: {source}")]
    Source { location: String, #[source] source: SecretResolutionError },
    #[error("failed to merge config source {location:?}: {source}")]
    Merge { location: String, #[source] source: TypeMismatchError },
    #[error("failed to resolve key {key:?}: {source}")]
    Resolution { key: String, #[source] source: SecretResolutionError },
}

/// One resolvable entry found during a tree walk: the path of map keys
/// down to (but not including) the marker key, the marker key itself, the
/// key it resolves to once stripped, and the location string to fetch.
struct ResolvableEntry {
    path: Vec<String>,
    marker_key: String,
    stripped_key: String,
    location: String,
}

fn find_resolvable(
    value: &Value,
    settings: &ResolutionSettings,
    depth: usize,
    path: &mut Vec<String>,
    out: &mut Vec<ResolvableEntry>,
) {
    if depth > settings.max_depth {
        return;
    }
    let Some(map) = value.as_map() else { return };
    for (key, v) in map {
        if let (Some(stripped_key), Some(location)) = (settings.strip(key), v.as_str()) {
            out.push(ResolvableEntry {
                path: path.clone(),
                marker_key: key.clone(),
                stripped_key,
                location: location.to_string(),
            });
            continue;
        }
        path.push(key.clone());
        find_resolvable(v, settings, depth + 1, path, out);
        path.pop();
    }
}

fn apply_resolution(root: &mut Value, entry: &ResolvableEntry, resolved: Value) {
    let mut cur = root;
    for segment in &entry.path {
        let Some(next) = cur.as_map_mut().and_then(|m| m.get_mut(segment)) else { return };
        cur = next;
    }
    if let Some(map) = cur.as_map_mut() {
        map.remove(&entry.marker_key);
        map.insert(entry.stripped_key.clone(), resolved);
    }
}

pub struct ConfigResolver<C: Clock = SystemClock> {
    fetcher: SecretFetcher<C>,
}

impl<C: Clock> ConfigResolver<C> {
    pub fn new(fetcher: SecretFetcher<C>) -> Self {
        Self { fetcher }
    }

    pub async fn resolve(&self, sources: &[ConfigSource]) -> Result<Value, ConfigResolutionError> {
        self.resolve_with_settings(sources, &ResolutionSettings::default()).await
    }

    /// Fetches and merges `sources` (step 1-2), then runs the resolution
    /// pass (step 3-4) over the merged tree.
    #[instrument(skip(self, sources, settings), fields(n = sources.len()))]
    pub async fn resolve_with_settings(
        &self,
        sources: &[ConfigSource],
        settings: &ResolutionSettings,
    ) -> Result<Value, ConfigResolutionError> {
        let mut acc = Value::Map(BTreeMap::new());
        for source in sources {
            let fetched =
                self.fetcher.fetch(&source.location).await.map_err(|e| ConfigResolutionError::Source {
                    location: source.location.clone(),
                    source: e,
                })?;
            acc = merge(&acc, &fetched, source.strategy).map_err(|e| ConfigResolutionError::Merge {
                location: source.location.clone(),
                source: e,
            })?;
        }
        self.resolve_tree(&mut acc, settings).await?;
        Ok(acc)
    }

    /// Runs the resolution pass in place over an already-merged tree:
    /// repeatedly walks it for resolvable keys, fetches each as a secret
    /// location, strips the marker and inserts the resolved value under
    /// the bare key, until a pass finds nothing left to resolve or
    /// `max_iterations` is exhausted. Exposed separately from
    /// `resolve_with_settings` so a second pass with different settings
    /// (e.g. the flat, depth-1 env-var marker) can run over the same
    /// tree without re-fetching the original sources.
    pub async fn resolve_tree(
        &self,
        value: &mut Value,
        settings: &ResolutionSettings,
    ) -> Result<(), ConfigResolutionError> {
        for _ in 0..settings.max_iterations.max(1) {
            let mut entries = Vec::new();
            find_resolvable(value, settings, 0, &mut Vec::new(), &mut entries);
            if entries.is_empty() {
                break;
            }
            for entry in entries {
                let resolved = self.fetcher.fetch(&entry.location).await.map_err(|e| {
                    ConfigResolutionError::Resolution { key: entry.marker_key.clone(), source: e }
                })?;
                apply_resolution(value, &entry, resolved);
            }
        }
        Ok(())
    }
}
