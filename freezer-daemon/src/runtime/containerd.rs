//! containerd backend.
//!
//! Listing goes through containerd's CRI plugin; pause and resume are issued
//! against the container's task in the kubelet's `k8s.io` namespace.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use tonic::Code;
use tonic::metadata::MetadataValue;
use tonic::transport::Channel;
use tracing::debug;

use super::RuntimeClient;
use super::channel::{MAX_RECV_MESSAGE_SIZE, connect_unix};
use super::cri::CriLister;
use crate::error::{Result, RuntimeError};
use crate::proto::tasks::tasks_client::TasksClient;
use crate::proto::tasks::{PauseTaskRequest, ResumeTaskRequest};
use crate::types::{Action, ContainerInfo, ContainerRef, PodIdentity};

/// gRPC metadata key selecting the containerd namespace.
pub const NAMESPACE_HEADER: &str = "containerd-namespace";

/// Namespace the kubelet's containers live in.
pub const K8S_NAMESPACE: &str = "k8s.io";

/// Runtime client for containerd.
pub struct ContainerdClient {
    cri: CriLister,
    tasks: TasksClient<Channel>,
}

impl ContainerdClient {
    /// Dial the containerd socket.
    pub async fn connect(socket: &Path, dial_timeout: Duration) -> Result<Self> {
        let channel = connect_unix(socket, dial_timeout).await?;
        Ok(Self::new(channel))
    }

    /// Build a client on an existing channel.
    pub fn new(channel: Channel) -> Self {
        Self {
            cri: CriLister::new(channel.clone()),
            tasks: TasksClient::new(channel).max_decoding_message_size(MAX_RECV_MESSAGE_SIZE),
        }
    }

    fn namespaced<T>(message: T) -> tonic::Request<T> {
        let mut request = tonic::Request::new(message);
        request
            .metadata_mut()
            .insert(NAMESPACE_HEADER, MetadataValue::from_static(K8S_NAMESPACE));
        request
    }
}

/// Split task errors into refusals (the runtime rejected the state change)
/// and transport failures.
fn task_error(action: Action, container: &ContainerRef, status: tonic::Status) -> RuntimeError {
    match status.code() {
        Code::FailedPrecondition | Code::NotFound | Code::InvalidArgument | Code::Unknown => {
            RuntimeError::refused(action, container, status.message())
        }
        code => RuntimeError::Transport(format!(
            "{} {}: {:?}: {}",
            action.verb(),
            container,
            code,
            status.message()
        )),
    }
}

#[async_trait]
impl RuntimeClient for ContainerdClient {
    async fn list(&self, pod: &PodIdentity) -> Result<Vec<ContainerInfo>> {
        self.cri.list(pod).await
    }

    async fn pause(&self, container: &ContainerRef) -> Result<()> {
        debug!(container = %container, "Pausing containerd task");
        let mut tasks = self.tasks.clone();
        tasks
            .pause(Self::namespaced(PauseTaskRequest {
                container_id: container.as_str().to_string(),
            }))
            .await
            .map_err(|s| task_error(Action::Freeze, container, s))?;
        Ok(())
    }

    async fn resume(&self, container: &ContainerRef) -> Result<()> {
        debug!(container = %container, "Resuming containerd task");
        let mut tasks = self.tasks.clone();
        tasks
            .resume(Self::namespaced(ResumeTaskRequest {
                container_id: container.as_str().to_string(),
            }))
            .await
            .map_err(|s| task_error(Action::Thaw, container, s))?;
        Ok(())
    }
}
