// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Detects the compute environment a Task Execution is running in and
//! attaches a best-effort description to the execution record (spec
//! `runtime_metadata`).
//!
//! Detection reads environment variables and `/proc`/`/.dockerenv`
//! markers (all static for the life of a process) except for ECS, where
//! task metadata is served from a local HTTP endpoint and can change
//! mid-run (e.g. spot interruption notices) — that source is re-queried
//! on [`RuntimeMetadataProbe::refresh`].

use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;
use tw_core::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeEnvironment {
    Kubernetes,
    Ci,
    Lambda,
    Ecs,
    Container,
    BareMetal,
}

tw_core::simple_display! {
    RuntimeEnvironment {
        Kubernetes => "kubernetes",
        Ci => "ci",
        Lambda => "lambda",
        Ecs => "ecs",
        Container => "container",
        BareMetal => "bare_metal",
    }
}

#[derive(Debug, Clone)]
pub struct RuntimeMetadata {
    pub environment: RuntimeEnvironment,
    pub fields: BTreeMap<String, Value>,
}

impl RuntimeMetadata {
    pub fn to_value(&self) -> Value {
        let mut m = self.fields.clone();
        m.insert("environment".to_string(), Value::String(self.environment.to_string()));
        Value::Map(m)
    }
}

#[derive(Debug, Error)]
pub enum RuntimeMetadataError {
    #[error("failed to query ECS task metadata endpoint: {0}")]
    EcsMetadataRequest(#[from] reqwest::Error),
    #[error("failed to parse ECS task metadata response: {0}")]
    EcsMetadataParse(#[from] serde_json::Error),
}

/// Detection environment, parameterized so tests can fake env vars and
/// filesystem markers without touching the real process environment.
pub trait DetectionEnv {
    fn var(&self, key: &str) -> Option<String>;
    fn path_exists(&self, path: &str) -> bool;
    fn cgroup_contents(&self) -> Option<String>;
}

pub struct ProcessEnv;

impl DetectionEnv for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }

    fn path_exists(&self, path: &str) -> bool {
        Path::new(path).exists()
    }

    fn cgroup_contents(&self) -> Option<String> {
        std::fs::read_to_string("/proc/1/cgroup").ok()
    }
}

pub struct RuntimeMetadataProbe<E: DetectionEnv = ProcessEnv> {
    env: E,
    http: reqwest::Client,
}

impl RuntimeMetadataProbe<ProcessEnv> {
    pub fn new() -> Self {
        Self { env: ProcessEnv, http: reqwest::Client::new() }
    }
}

impl Default for RuntimeMetadataProbe<ProcessEnv> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: DetectionEnv> RuntimeMetadataProbe<E> {
    pub fn with_env(env: E) -> Self {
        Self { env, http: reqwest::Client::new() }
    }

    pub fn detect(&self) -> RuntimeMetadata {
        let mut fields = BTreeMap::new();

        if let Some(host) = self.env.var("KUBERNETES_SERVICE_HOST") {
            fields.insert("kubernetes_service_host".to_string(), Value::String(host));
            if let Some(ns) = self.env.var("TASK_NAMESPACE") {
                fields.insert("namespace".to_string(), Value::String(ns));
            }
            return RuntimeMetadata { environment: RuntimeEnvironment::Kubernetes, fields };
        }

        if let Some(func) = self.env.var("AWS_LAMBDA_FUNCTION_NAME") {
            fields.insert("function_name".to_string(), Value::String(func));
            if let Some(v) = self.env.var("AWS_LAMBDA_FUNCTION_VERSION") {
                fields.insert("function_version".to_string(), Value::String(v));
            }
            return RuntimeMetadata { environment: RuntimeEnvironment::Lambda, fields };
        }

        if let Some(uri) = self
            .env
            .var("ECS_CONTAINER_METADATA_URI_V4")
            .or_else(|| self.env.var("ECS_CONTAINER_METADATA_URI"))
        {
            fields.insert("metadata_uri".to_string(), Value::String(uri));
            return RuntimeMetadata { environment: RuntimeEnvironment::Ecs, fields };
        }

        if self.env.var("CI").as_deref() == Some("true") || self.env.var("GITHUB_ACTIONS").is_some() {
            if let Some(job) = self.env.var("GITHUB_RUN_ID") {
                fields.insert("ci_run_id".to_string(), Value::String(job));
            }
            return RuntimeMetadata { environment: RuntimeEnvironment::Ci, fields };
        }

        let in_container = self.env.path_exists("/.dockerenv")
            || self
                .env
                .cgroup_contents()
                .is_some_and(|c| c.contains("docker") || c.contains("containerd") || c.contains("kubepods"));
        if in_container {
            return RuntimeMetadata { environment: RuntimeEnvironment::Container, fields };
        }

        RuntimeMetadata { environment: RuntimeEnvironment::BareMetal, fields }
    }

    /// Re-query dynamic metadata sources. Only ECS task metadata changes
    /// mid-run; other environments return their cached detection as-is.
    pub async fn refresh(&self, current: &RuntimeMetadata) -> Result<RuntimeMetadata, RuntimeMetadataError> {
        if current.environment != RuntimeEnvironment::Ecs {
            return Ok(current.clone());
        }
        let Some(Value::String(uri)) = current.fields.get("metadata_uri") else {
            return Ok(current.clone());
        };
        let body: serde_json::Value = self.http.get(format!("{uri}/task")).send().await?.json().await?;
        let mut fields = current.fields.clone();
        fields.insert("task_metadata".to_string(), Value::from_json(body));
        Ok(RuntimeMetadata { environment: RuntimeEnvironment::Ecs, fields })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct FakeEnv {
        vars: Mutex<HashMap<String, String>>,
        paths: Vec<String>,
        cgroup: Option<String>,
    }

    impl FakeEnv {
        fn new() -> Self {
            Self { vars: Mutex::new(HashMap::new()), paths: Vec::new(), cgroup: None }
        }

        fn with_var(mut self, k: &str, v: &str) -> Self {
            self.vars.lock().unwrap_or_else(|e| e.into_inner()).insert(k.to_string(), v.to_string());
            self
        }

        fn with_cgroup(mut self, c: &str) -> Self {
            self.cgroup = Some(c.to_string());
            self
        }
    }

    impl DetectionEnv for FakeEnv {
        fn var(&self, key: &str) -> Option<String> {
            self.vars.lock().unwrap_or_else(|e| e.into_inner()).get(key).cloned()
        }

        fn path_exists(&self, path: &str) -> bool {
            self.paths.iter().any(|p| p == path)
        }

        fn cgroup_contents(&self) -> Option<String> {
            self.cgroup.clone()
        }
    }

    #[test]
    fn detects_kubernetes_from_service_host() {
        let env = FakeEnv::new().with_var("KUBERNETES_SERVICE_HOST", "10.0.0.1");
        let probe = RuntimeMetadataProbe::with_env(env);
        assert_eq!(probe.detect().environment, RuntimeEnvironment::Kubernetes);
    }

    #[test]
    fn detects_lambda_from_function_name() {
        let env = FakeEnv::new().with_var("AWS_LAMBDA_FUNCTION_NAME", "my-fn");
        let probe = RuntimeMetadataProbe::with_env(env);
        let meta = probe.detect();
        assert_eq!(meta.environment, RuntimeEnvironment::Lambda);
        assert_eq!(meta.fields.get("function_name").unwrap().as_str(), Some("my-fn"));
    }

    #[test]
    fn detects_ecs_from_metadata_uri() {
        let env = FakeEnv::new().with_var("ECS_CONTAINER_METADATA_URI_V4", "http://169.254.170.2/v4/abc");
        let probe = RuntimeMetadataProbe::with_env(env);
        assert_eq!(probe.detect().environment, RuntimeEnvironment::Ecs);
    }

    #[test]
    fn detects_ci_from_github_actions() {
        let env = FakeEnv::new().with_var("CI", "true").with_var("GITHUB_ACTIONS", "true");
        let probe = RuntimeMetadataProbe::with_env(env);
        assert_eq!(probe.detect().environment, RuntimeEnvironment::Ci);
    }

    #[test]
    fn detects_container_from_cgroup_contents() {
        let env = FakeEnv::new().with_cgroup("1:name=systemd:/docker/abcdef");
        let probe = RuntimeMetadataProbe::with_env(env);
        assert_eq!(probe.detect().environment, RuntimeEnvironment::Container);
    }

    #[test]
    fn falls_back_to_bare_metal() {
        let probe = RuntimeMetadataProbe::with_env(FakeEnv::new());
        assert_eq!(probe.detect().environment, RuntimeEnvironment::BareMetal);
    }

    #[test]
    fn kubernetes_detection_takes_priority_over_container_markers() {
        let env = FakeEnv::new().with_var("KUBERNETES_SERVICE_HOST", "10.0.0.1").with_cgroup("kubepods");
        let probe = RuntimeMetadataProbe::with_env(env);
        assert_eq!(probe.detect().environment, RuntimeEnvironment::Kubernetes);
    }

    #[tokio::test]
    async fn refresh_is_a_no_op_for_non_ecs_environments() {
        let probe = RuntimeMetadataProbe::with_env(FakeEnv::new());
        let meta = probe.detect();
        let refreshed = probe.refresh(&meta).await.unwrap();
        assert_eq!(refreshed.environment, RuntimeEnvironment::BareMetal);
    }
}
