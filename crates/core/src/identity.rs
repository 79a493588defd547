// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task identity — the logical Task that a Task Execution belongs to.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Version triple reported to the Task Management service: a monotonic
/// number, a human-readable text label, and an opaque signature (e.g. a
/// build or content hash) used to detect drift between deployments.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskVersion {
    pub number: Option<i64>,
    pub text: Option<String>,
    pub signature: Option<String>,
}

/// Identity of a logical Task, created once per invocation from
/// configuration and immutable after registration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskIdentity {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    #[serde(default)]
    pub version: TaskVersion,
    #[serde(default)]
    pub instance_metadata: BTreeMap<String, String>,
    #[serde(default)]
    pub is_service: bool,
    #[serde(default)]
    pub is_passive: bool,
    /// `None` means unbounded concurrency.
    #[serde(default)]
    pub max_concurrency: Option<u32>,
    #[serde(default)]
    pub schedule: Option<String>,
    /// Evict a conflicting execution older than this many seconds instead
    /// of waiting out the full conflict-retry window. `None` disables
    /// eviction.
    #[serde(default)]
    pub max_conflicting_age_seconds: Option<u64>,
    /// Create the Task record at the service if it doesn't already exist.
    #[serde(default)]
    pub auto_create_task: bool,
}

impl TaskIdentity {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            uuid: None,
            version: TaskVersion::default(),
            instance_metadata: BTreeMap::new(),
            is_service: false,
            is_passive: false,
            max_concurrency: None,
            schedule: None,
            max_conflicting_age_seconds: None,
            auto_create_task: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_has_no_uuid_and_default_version() {
        let t = TaskIdentity::new("t1");
        assert_eq!(t.name, "t1");
        assert!(t.uuid.is_none());
        assert_eq!(t.version, TaskVersion::default());
        assert!(!t.is_passive);
    }

    #[test]
    fn serializes_without_uuid_field_when_absent() {
        let t = TaskIdentity::new("t1");
        let json = serde_json::to_value(&t).unwrap();
        assert!(json.get("uuid").is_none());
    }
}
