// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Sidecar-container mode: when the supervisor runs as a sidecar rather
//! than wrapping the main command directly, it instead polls the
//! Kubernetes API for the main container's termination so it can report
//! a Task Execution outcome once the main container exits.

use k8s_openapi::api::core::v1::Pod;
use kube::api::Api;
use kube::Client;
use std::time::Duration;
use thiserror::Error;
use tracing::instrument;

#[derive(Debug, Error)]
pub enum SidecarError {
    #[error("failed to query pod {namespace}/{pod}: {source}")]
    PodQuery { namespace: String, pod: String, source: kube::Error },
    #[error("container {0:?} not found in pod status")]
    ContainerNotFound(String),
}

#[derive(Debug, Clone)]
pub struct MainContainerExit {
    pub exit_code: i32,
    pub reason: Option<String>,
}

pub struct SidecarWatcher {
    client: Client,
    namespace: String,
    pod_name: String,
    container_name: String,
    poll_interval: Duration,
}

impl SidecarWatcher {
    pub fn new(client: Client, namespace: impl Into<String>, pod_name: impl Into<String>, container_name: impl Into<String>) -> Self {
        Self {
            client,
            namespace: namespace.into(),
            pod_name: pod_name.into(),
            container_name: container_name.into(),
            poll_interval: Duration::from_secs(2),
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Poll until the named container reports a `terminated` state,
    /// returning its exit code.
    #[instrument(skip(self), fields(namespace = %self.namespace, pod = %self.pod_name))]
    pub async fn wait_for_main_container_exit(&self) -> Result<MainContainerExit, SidecarError> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), &self.namespace);
        loop {
            let pod = api.get(&self.pod_name).await.map_err(|e| SidecarError::PodQuery {
                namespace: self.namespace.clone(),
                pod: self.pod_name.clone(),
                source: e,
            })?;

            if let Some(exit) = find_termination(&pod, &self.container_name)? {
                return Ok(exit);
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

fn find_termination(pod: &Pod, container_name: &str) -> Result<Option<MainContainerExit>, SidecarError> {
    let statuses = pod
        .status
        .as_ref()
        .and_then(|s| s.container_statuses.as_ref())
        .ok_or_else(|| SidecarError::ContainerNotFound(container_name.to_string()))?;

    let status = statuses
        .iter()
        .find(|s| s.name == container_name)
        .ok_or_else(|| SidecarError::ContainerNotFound(container_name.to_string()))?;

    Ok(status.state.as_ref().and_then(|s| s.terminated.as_ref()).map(|t| MainContainerExit {
        exit_code: t.exit_code,
        reason: t.reason.clone(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::core::v1::{ContainerState, ContainerStateTerminated, ContainerStatus, PodStatus};

    fn pod_with_status(statuses: Vec<ContainerStatus>) -> Pod {
        Pod {
            status: Some(PodStatus { container_statuses: Some(statuses), ..Default::default() }),
            ..Default::default()
        }
    }

    fn container_status(name: &str, terminated: Option<ContainerStateTerminated>) -> ContainerStatus {
        ContainerStatus {
            name: name.to_string(),
            state: terminated.map(|t| ContainerState { terminated: Some(t), ..Default::default() }),
            ready: false,
            restart_count: 0,
            image: String::new(),
            image_id: String::new(),
            ..Default::default()
        }
    }

    #[test]
    fn returns_none_while_container_still_running() {
        let pod = pod_with_status(vec![container_status("main", None)]);
        assert!(find_termination(&pod, "main").unwrap().is_none());
    }

    #[test]
    fn returns_exit_code_once_terminated() {
        let terminated = ContainerStateTerminated {
            exit_code: 3,
            reason: Some("Completed".to_string()),
            ..Default::default()
        };
        let pod = pod_with_status(vec![container_status("main", Some(terminated))]);
        let exit = find_termination(&pod, "main").unwrap().unwrap();
        assert_eq!(exit.exit_code, 3);
        assert_eq!(exit.reason.as_deref(), Some("Completed"));
    }

    #[test]
    fn errors_when_container_name_is_absent() {
        let pod = pod_with_status(vec![container_status("sidecar", None)]);
        assert!(matches!(find_termination(&pod, "main"), Err(SidecarError::ContainerNotFound(_))));
    }
}
