//! Container discovery: which containers of a pod may be frozen.

use std::sync::Arc;

use tracing::debug;

use crate::error::{Result, RuntimeError};
use crate::runtime::RuntimeClient;
use crate::types::{ContainerRef, PodIdentity};

/// Name of the request-proxying sidecar injected into every serving pod.
/// It has to keep running to buffer and forward the request that wakes the
/// pod, so it is never frozen.
pub const INFRA_SIDECAR_NAME: &str = "queue-proxy";

/// Resolves a pod to its freeze targets.
#[derive(Clone)]
pub struct Discovery {
    runtime: Arc<dyn RuntimeClient>,
}

impl Discovery {
    pub fn new(runtime: Arc<dyn RuntimeClient>) -> Self {
        Self { runtime }
    }

    /// List the pod's eligible containers in runtime order.
    ///
    /// Queries the runtime on every call. Fails with `NoEligibleContainers`
    /// when only infrastructure containers remain after filtering.
    pub async fn list(&self, pod: &PodIdentity) -> Result<Vec<ContainerRef>> {
        let containers = self.runtime.list(pod).await?;
        let placeholder = self.runtime.sandbox_placeholder();

        let eligible: Vec<ContainerRef> = containers
            .into_iter()
            .filter(|c| c.name != INFRA_SIDECAR_NAME && Some(c.name.as_str()) != placeholder)
            .map(|c| c.id)
            .collect();

        debug!(pod = %pod, count = eligible.len(), "Discovered eligible containers");
        if eligible.is_empty() {
            return Err(RuntimeError::NoEligibleContainers(pod.clone()));
        }
        Ok(eligible)
    }
}
