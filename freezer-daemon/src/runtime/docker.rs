//! Docker backend (dockershim-style nodes).
//!
//! Docker has no sandbox object the daemon can query, so pod membership is
//! resolved purely through the kubelet's container labels.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use bollard::container::ListContainersOptions;
use bollard::errors::Error as BollardError;
use bollard::models::ContainerSummary;
use bollard::{API_DEFAULT_VERSION, ClientVersion, Docker};
use tracing::{debug, info};

use super::{CONTAINER_NAME_LABEL, POD_UID_LABEL, RuntimeClient};
use crate::error::{Result, RuntimeError};
use crate::types::{Action, ContainerInfo, ContainerRef, PodIdentity};

/// Name the kubelet gives the sandbox placeholder container.
pub const SANDBOX_PLACEHOLDER: &str = "POD";

/// Runtime client for the Docker engine.
pub struct DockerClient {
    docker: Docker,
}

impl DockerClient {
    /// Connect to the engine socket and ping it within `dial_timeout`.
    ///
    /// `request_timeout` bounds every later engine call.
    pub async fn connect(
        socket: &Path,
        dial_timeout: Duration,
        request_timeout: Duration,
        api_version: Option<(usize, usize)>,
    ) -> Result<Self> {
        let endpoint = socket.display().to_string();
        let connect_err = |reason: String| RuntimeError::Connect {
            endpoint: endpoint.clone(),
            reason,
        };

        let (major_version, minor_version) = api_version.unwrap_or((
            API_DEFAULT_VERSION.major_version,
            API_DEFAULT_VERSION.minor_version,
        ));
        let version = ClientVersion {
            major_version,
            minor_version,
        };
        let path = socket
            .to_str()
            .ok_or_else(|| connect_err("socket path is not valid UTF-8".to_string()))?;

        let docker = Docker::connect_with_unix(path, request_timeout.as_secs(), &version)
            .map_err(|e| connect_err(e.to_string()))?;

        tokio::time::timeout(dial_timeout, docker.ping())
            .await
            .map_err(|_| connect_err(format!("timed out after {:?}", dial_timeout)))?
            .map_err(|e| connect_err(e.to_string()))?;

        info!(
            socket = %endpoint,
            api_version = %format!("{}.{}", version.major_version, version.minor_version),
            "Connected to Docker engine"
        );
        Ok(Self { docker })
    }

    fn engine_error(action: Action, container: &ContainerRef, err: BollardError) -> RuntimeError {
        match err {
            // 404: no such container, 409: not running / already paused
            BollardError::DockerResponseServerError {
                status_code: 404 | 409,
                message,
            } => RuntimeError::refused(action, container, message),
            other => RuntimeError::Transport(format!("{} {}: {}", action.verb(), container, other)),
        }
    }
}

/// Engine listing query for the containers the kubelet labelled with the pod UID.
fn list_options(pod: &PodIdentity) -> ListContainersOptions<String> {
    ListContainersOptions {
        filters: HashMap::from([(
            "label".to_string(),
            vec![format!("{}={}", POD_UID_LABEL, pod)],
        )]),
        ..Default::default()
    }
}

/// Containers of the pod, or `PodNotFound` when the label matched nothing.
fn pod_containers(
    pod: &PodIdentity,
    summaries: Vec<ContainerSummary>,
) -> Result<Vec<ContainerInfo>> {
    let containers = container_infos(summaries);
    if containers.is_empty() {
        return Err(RuntimeError::PodNotFound(pod.clone()));
    }
    Ok(containers)
}

/// Map engine container summaries onto pod containers, keeping engine order.
fn container_infos(summaries: Vec<ContainerSummary>) -> Vec<ContainerInfo> {
    summaries
        .into_iter()
        .filter_map(|summary| {
            let id = summary.id?;
            let name = summary
                .labels
                .and_then(|mut labels| labels.remove(CONTAINER_NAME_LABEL))
                .unwrap_or_default();
            Some(ContainerInfo::new(id, name))
        })
        .collect()
}

#[async_trait]
impl RuntimeClient for DockerClient {
    async fn list(&self, pod: &PodIdentity) -> Result<Vec<ContainerInfo>> {
        let summaries = self
            .docker
            .list_containers(Some(list_options(pod)))
            .await
            .map_err(|e| RuntimeError::Transport(format!("listing containers: {}", e)))?;
        debug!(pod = %pod, count = summaries.len(), "Listed Docker containers");

        pod_containers(pod, summaries)
    }

    async fn pause(&self, container: &ContainerRef) -> Result<()> {
        self.docker
            .pause_container(container.as_str())
            .await
            .map_err(|e| Self::engine_error(Action::Freeze, container, e))
    }

    async fn resume(&self, container: &ContainerRef) -> Result<()> {
        self.docker
            .unpause_container(container.as_str())
            .await
            .map_err(|e| Self::engine_error(Action::Thaw, container, e))
    }

    fn sandbox_placeholder(&self) -> Option<&str> {
        Some(SANDBOX_PLACEHOLDER)
    }
}
