// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Parses the secret location grammar:
//! `[PROVIDER:]<address>[!FORMAT][|JP:<json-path>]`

use thiserror::Error;
use tw_valuefmt::Format;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SecretLocationError {
    #[error("empty secret location")]
    Empty,
    #[error("unknown format tag {0:?}")]
    UnknownFormat(String),
    #[error("JP suffix missing a path: {0:?}")]
    MissingJsonPath(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SecretLocation {
    /// `None` means the default provider (environment variable lookup).
    pub provider: Option<String>,
    pub address: String,
    pub format: Option<Format>,
    pub json_path: Option<String>,
}

impl SecretLocation {
    pub fn parse(raw: &str) -> Result<Self, SecretLocationError> {
        if raw.trim().is_empty() {
            return Err(SecretLocationError::Empty);
        }

        let (body, json_path) = match raw.split_once("|JP:") {
            Some((b, p)) => {
                if p.is_empty() {
                    return Err(SecretLocationError::MissingJsonPath(raw.to_string()));
                }
                (b, Some(p.to_string()))
            }
            None => (raw, None),
        };

        let (body, format) = match body.rsplit_once('!') {
            Some((b, f)) if !f.is_empty() && looks_like_format_tag(f) => {
                let parsed = Format::parse_tag(f)
                    .ok_or_else(|| SecretLocationError::UnknownFormat(f.to_string()))?;
                (b, Some(parsed))
            }
            _ => (body, None),
        };

        let (provider, address) = match body.split_once(':') {
            // A provider tag is a short bare word; anything containing a
            // path separator or scheme-like `://` is treated as a plain
            // address (e.g. a file path or URL is never mistaken for a
            // provider prefix).
            Some((p, a)) if is_provider_tag(p) => (Some(p.to_string()), a.to_string()),
            _ => (None, body.to_string()),
        };

        if address.is_empty() {
            return Err(SecretLocationError::Empty);
        }

        Ok(SecretLocation { provider, address, format, json_path })
    }
}

fn looks_like_format_tag(s: &str) -> bool {
    s.chars().all(|c| c.is_ascii_alphabetic()) && s.len() <= 8
}

fn is_provider_tag(s: &str) -> bool {
    !s.is_empty()
        && s.len() <= 32
        && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        && s.chars().next().is_some_and(|c| c.is_ascii_alphabetic())
}
