//! Freeze/thaw orchestration.
//!
//! A freeze or thaw is a best-effort sequential apply: containers are
//! handled one at a time in discovery order and the first failure stops the
//! run. Nothing is rolled back, so a failed freeze can leave a pod partially
//! frozen; callers recover by issuing a thaw. Operations on the same pod are
//! serialised, operations on different pods run independently.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::{debug, info, warn};

use crate::discovery::Discovery;
use crate::error::{EngineError, RuntimeError};
use crate::runtime::RuntimeClient;
use crate::types::{Action, ContainerRef, PodIdentity};

/// Runtime-agnostic freeze/thaw engine.
pub struct Engine {
    runtime: Arc<dyn RuntimeClient>,
    discovery: Discovery,
    locks: PodLocks,
}

impl Engine {
    pub fn new(runtime: Arc<dyn RuntimeClient>) -> Self {
        Self {
            discovery: Discovery::new(runtime.clone()),
            runtime,
            locks: PodLocks::default(),
        }
    }

    /// Pause every eligible container of the pod. Returns the containers paused.
    pub async fn freeze(&self, pod: &PodIdentity) -> Result<Vec<ContainerRef>, EngineError> {
        self.apply(Action::Freeze, pod).await
    }

    /// Resume every eligible container of the pod. Returns the containers resumed.
    pub async fn thaw(&self, pod: &PodIdentity) -> Result<Vec<ContainerRef>, EngineError> {
        self.apply(Action::Thaw, pod).await
    }

    /// Run `action` against the pod.
    pub async fn apply(
        &self,
        action: Action,
        pod: &PodIdentity,
    ) -> Result<Vec<ContainerRef>, EngineError> {
        let _guard = self.locks.acquire(pod).await;

        let containers = match self.discovery.list(pod).await {
            Ok(containers) => containers,
            Err(RuntimeError::NoEligibleContainers(_)) => {
                info!(pod = %pod, action = %action, "No eligible containers, nothing to do");
                return Ok(Vec::new());
            }
            Err(e) => return Err(EngineError::Discovery(e)),
        };

        apply_sequential(self.runtime.as_ref(), action, pod, &containers).await
    }
}

/// Apply `action` to each container in order, stopping at the first failure.
///
/// On failure the error names the failing container and lists the
/// containers that were already changed; containers after the failing one
/// receive no call.
pub async fn apply_sequential(
    runtime: &dyn RuntimeClient,
    action: Action,
    pod: &PodIdentity,
    containers: &[ContainerRef],
) -> Result<Vec<ContainerRef>, EngineError> {
    let mut completed = Vec::with_capacity(containers.len());

    for container in containers {
        let result = match action {
            Action::Freeze => runtime.pause(container).await,
            Action::Thaw => runtime.resume(container).await,
        };

        if let Err(source) = result {
            warn!(
                pod = %pod,
                container = %container,
                action = %action,
                completed = completed.len(),
                error = %source,
                "Container {} failed",
                action.verb()
            );
            return Err(EngineError::Interrupted {
                action,
                pod: pod.clone(),
                container: container.clone(),
                completed,
                source,
            });
        }

        debug!(pod = %pod, container = %container, action = %action, "Container done");
        completed.push(container.clone());
    }

    info!(pod = %pod, action = %action, containers = completed.len(), "Pod {} complete", action);
    Ok(completed)
}

/// Per-pod async locks, dropped once no request holds them.
#[derive(Default)]
struct PodLocks {
    locks: Mutex<HashMap<PodIdentity, Weak<AsyncMutex<()>>>>,
}

impl PodLocks {
    async fn acquire(&self, pod: &PodIdentity) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
            locks.retain(|_, lock| lock.strong_count() > 0);
            match locks.get(pod).and_then(Weak::upgrade) {
                Some(lock) => lock,
                None => {
                    let lock = Arc::new(AsyncMutex::new(()));
                    locks.insert(pod.clone(), Arc::downgrade(&lock));
                    lock
                }
            }
        };
        lock.lock_owned().await
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        locks.retain(|_, lock| lock.strong_count() > 0);
        locks.len()
    }
}
