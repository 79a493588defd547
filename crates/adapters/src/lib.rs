// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cloud-platform adapters: the sidecar-container main-process watcher.

pub mod sidecar;

pub use sidecar::{MainContainerExit, SidecarError, SidecarWatcher};
