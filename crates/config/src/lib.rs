// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Config resolution: merge-strategy folding of an ordered list of config
//! sources, plus environment projection for materializing the child's
//! process environment.

pub mod env_projection;
pub mod merge;
pub mod resolver;

pub use env_projection::{project, to_dotenv};
pub use merge::{merge, MergeStrategy, TypeMismatchError};
pub use resolver::{ConfigResolutionError, ConfigResolver, ConfigSource, ResolutionSettings};
