// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The provider registry: an explicit map from provider tag to
//! implementation, populated once at bootstrap rather than discovered by
//! reflection.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SecretFetchError {
    #[error("unknown secret provider {0:?}")]
    UnknownProvider(String),
    #[error("environment variable {0:?} is not set")]
    EnvVarNotSet(String),
    #[error("failed to read secret file {path:?}: {source}")]
    FileRead { path: String, source: std::io::Error },
    #[error("provider {provider:?} failed to fetch {address:?}: {message}")]
    ProviderError { provider: String, address: String, message: String },
}

/// A backend capable of fetching raw secret bytes for an address.
///
/// Returns raw bytes rather than a `String` so that binary content (a
/// secret store value that isn't valid UTF-8) can still be carried through
/// the fetch path; the caller falls back to base64-encoding bytes that
/// don't decode as text instead of failing the fetch outright.
#[async_trait]
pub trait SecretProvider: Send + Sync {
    fn tag(&self) -> &str;
    async fn fetch(&self, address: &str) -> Result<Vec<u8>, SecretFetchError>;
}

/// Looks the address up as an environment variable (the default provider
/// when a location has no explicit `PROVIDER:` prefix).
pub struct EnvProvider;

#[async_trait]
impl SecretProvider for EnvProvider {
    fn tag(&self) -> &str {
        "ENV"
    }

    async fn fetch(&self, address: &str) -> Result<Vec<u8>, SecretFetchError> {
        std::env::var(address)
            .map(String::into_bytes)
            .map_err(|_| SecretFetchError::EnvVarNotSet(address.to_string()))
    }
}

/// Reads the address as a filesystem path.
pub struct FileProvider;

#[async_trait]
impl SecretProvider for FileProvider {
    fn tag(&self) -> &str {
        "FILE"
    }

    async fn fetch(&self, address: &str) -> Result<Vec<u8>, SecretFetchError> {
        tokio::fs::read(address)
            .await
            .map_err(|source| SecretFetchError::FileRead { path: address.to_string(), source })
    }
}

/// Treats the address itself as the secret value, no lookup performed.
/// Used when a location has no provider prefix and isn't resolved via
/// `ENV` (e.g. inline literals embedded in config files).
pub struct PlainProvider;

#[async_trait]
impl SecretProvider for PlainProvider {
    fn tag(&self) -> &str {
        "PLAIN"
    }

    async fn fetch(&self, address: &str) -> Result<Vec<u8>, SecretFetchError> {
        Ok(address.as_bytes().to_vec())
    }
}

#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: BTreeMap<String, Arc<dyn SecretProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with the built-in `ENV`, `FILE`, and `PLAIN` providers
    /// registered. Adapter crates register additional cloud providers on
    /// top of this at bootstrap.
    pub fn with_builtins() -> Self {
        let mut reg = Self::new();
        reg.register(EnvProvider);
        reg.register(FileProvider);
        reg.register(PlainProvider);
        reg
    }

    pub fn register(&mut self, provider: impl SecretProvider + 'static) {
        self.providers.insert(provider.tag().to_string(), Arc::new(provider));
    }

    pub fn get(&self, tag: &str) -> Option<Arc<dyn SecretProvider>> {
        self.providers.get(tag).cloned()
    }

    /// Resolve a possibly-absent provider tag to the default (`ENV`).
    pub fn get_or_default(&self, tag: Option<&str>) -> Result<Arc<dyn SecretProvider>, SecretFetchError> {
        match tag {
            Some(t) => self.get(t).ok_or_else(|| SecretFetchError::UnknownProvider(t.to_string())),
            None => self
                .get("ENV")
                .ok_or_else(|| SecretFetchError::UnknownProvider("ENV".to_string())),
        }
    }
}
