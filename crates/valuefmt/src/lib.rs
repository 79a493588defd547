// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Value parser and JSON-Path extractor shared by the secret fetcher and
//! config resolver.
//!
//! A fetched secret or config source is raw bytes plus a declared or
//! inferred format. This crate turns those bytes into a [`tw_core::Value`]
//! and, optionally, projects a single field out of it with a JSON-Path.

pub mod format;
pub mod jsonpath;

pub use format::{parse, Format, ParseError};
pub use jsonpath::{extract, JsonPathError};
