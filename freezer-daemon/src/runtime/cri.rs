//! Pod container listing over the Kubernetes CRI.
//!
//! Shared by the containerd and CRI-O backends.

use std::collections::HashMap;

use tonic::transport::Channel;
use tracing::debug;

use super::POD_UID_LABEL;
use super::channel::{MAX_RECV_MESSAGE_SIZE, transport};
use crate::error::{Result, RuntimeError};
use crate::proto::cri::runtime_service_client::RuntimeServiceClient;
use crate::proto::cri::{
    ContainerFilter, ContainerState, ListContainersRequest, ListContainersResponse,
    ListPodSandboxRequest, PodSandboxFilter, PodSandboxState, PodSandboxStateValue,
};
use crate::types::{ContainerInfo, PodIdentity};

/// Lists pod containers through a CRI runtime service.
#[derive(Clone)]
pub struct CriLister {
    client: RuntimeServiceClient<Channel>,
}

impl CriLister {
    pub fn new(channel: Channel) -> Self {
        Self {
            client: RuntimeServiceClient::new(channel)
                .max_decoding_message_size(MAX_RECV_MESSAGE_SIZE),
        }
    }

    /// List the live containers in the pod's sandbox, in runtime order.
    ///
    /// Only ready sandboxes are considered; when several carry the pod UID the
    /// first one the runtime reports is used. Exited containers left over from
    /// restarts are skipped.
    pub async fn list(&self, pod: &PodIdentity) -> Result<Vec<ContainerInfo>> {
        let mut client = self.client.clone();

        let sandboxes = client
            .list_pod_sandbox(ListPodSandboxRequest {
                filter: Some(PodSandboxFilter {
                    state: Some(PodSandboxStateValue {
                        state: PodSandboxState::SandboxReady as i32,
                    }),
                    label_selector: HashMap::from([(
                        POD_UID_LABEL.to_string(),
                        pod.as_str().to_string(),
                    )]),
                    ..Default::default()
                }),
            })
            .await
            .map_err(transport)?
            .into_inner();

        let sandbox = sandboxes
            .items
            .into_iter()
            .find(|s| s.state == PodSandboxState::SandboxReady as i32)
            .ok_or_else(|| RuntimeError::PodNotFound(pod.clone()))?;
        debug!(pod = %pod, sandbox = %sandbox.id, "Found pod sandbox");

        let containers = client
            .list_containers(ListContainersRequest {
                filter: Some(ContainerFilter {
                    pod_sandbox_id: sandbox.id,
                    ..Default::default()
                }),
            })
            .await
            .map_err(transport)?
            .into_inner();

        Ok(container_infos(containers))
    }
}

fn container_infos(response: ListContainersResponse) -> Vec<ContainerInfo> {
    response
        .containers
        .into_iter()
        .filter(|c| c.state != ContainerState::ContainerExited as i32)
        .map(|c| {
            let name = c.metadata.map(|m| m.name).unwrap_or_default();
            ContainerInfo::new(c.id, name)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proto::cri::{Container, ContainerMetadata};

    #[test]
    fn test_container_infos_keeps_order_and_skips_exited() {
        let response = ListContainersResponse {
            containers: vec![
                Container {
                    id: "c2".to_string(),
                    metadata: Some(ContainerMetadata {
                        name: "queue-proxy".to_string(),
                        attempt: 0,
                    }),
                    ..Default::default()
                },
                Container {
                    id: "c1".to_string(),
                    metadata: Some(ContainerMetadata {
                        name: "user-container".to_string(),
                        attempt: 0,
                    }),
                    ..Default::default()
                },
                Container {
                    id: "c3".to_string(),
                    metadata: None,
                    state: ContainerState::ContainerRunning as i32,
                    ..Default::default()
                },
                Container {
                    id: "c0".to_string(),
                    metadata: Some(ContainerMetadata {
                        name: "user-container".to_string(),
                        attempt: 0,
                    }),
                    state: ContainerState::ContainerExited as i32,
                    ..Default::default()
                },
            ],
        };

        let infos = container_infos(response);
        assert_eq!(
            infos,
            vec![
                ContainerInfo::new("c2", "queue-proxy"),
                ContainerInfo::new("c1", "user-container"),
                ContainerInfo::new("c3", ""),
            ]
        );
    }
}
