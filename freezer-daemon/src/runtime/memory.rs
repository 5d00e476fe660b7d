//! In-memory runtime.
//!
//! Implements the runtime contract against a table of pods held in memory,
//! with a journal of every call and per-container failure injection. Each
//! test builds its own instance.

use std::collections::HashSet;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::RuntimeClient;
use crate::error::{Result, RuntimeError};
use crate::types::{Action, ContainerInfo, ContainerRef, PodIdentity};

/// Execution state of an in-memory container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerState {
    Running,
    Paused,
}

/// A call received by the runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    List(PodIdentity),
    Pause(ContainerRef),
    Resume(ContainerRef),
}

#[derive(Debug, Clone)]
struct Container {
    info: ContainerInfo,
    state: ContainerState,
}

#[derive(Default)]
struct Inner {
    pods: Vec<(PodIdentity, Vec<Container>)>,
    calls: Vec<Call>,
    broken: HashSet<ContainerRef>,
}

impl Inner {
    fn container_mut(&mut self, id: &ContainerRef) -> Option<&mut Container> {
        self.pods
            .iter_mut()
            .flat_map(|(_, containers)| containers.iter_mut())
            .find(|c| &c.info.id == id)
    }
}

/// Runtime backed by an in-memory pod table.
#[derive(Default)]
pub struct InMemoryRuntime {
    inner: Mutex<Inner>,
    placeholder: Option<String>,
    latency: Option<Duration>,
}

impl InMemoryRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a pod whose containers, given as `(id, name)`, all start running.
    pub fn with_pod(self, pod: &str, containers: &[(&str, &str)]) -> Self {
        let containers = containers
            .iter()
            .map(|(id, name)| Container {
                info: ContainerInfo::new(*id, *name),
                state: ContainerState::Running,
            })
            .collect();
        self.lock().pods.push((PodIdentity::new(pod), containers));
        self
    }

    /// Report `name` as the runtime's sandbox placeholder container.
    pub fn with_sandbox_placeholder(mut self, name: &str) -> Self {
        self.placeholder = Some(name.to_string());
        self
    }

    /// Delay every pause/resume call by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Make every call touching `container` fail as if the socket dropped.
    pub fn break_container(&self, container: &str) {
        self.lock().broken.insert(ContainerRef::from(container));
    }

    /// Current state of a container, if it exists.
    pub fn state(&self, container: &str) -> Option<ContainerState> {
        let id = ContainerRef::from(container);
        self.lock()
            .pods
            .iter()
            .flat_map(|(_, containers)| containers.iter())
            .find(|c| c.info.id == id)
            .map(|c| c.state)
    }

    /// Every call received so far, in order.
    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    /// Pause and resume calls only, in order.
    pub fn state_changes(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| !matches!(c, Call::List(_)))
            .collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    async fn transition(&self, action: Action, id: &ContainerRef) -> Result<()> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let (from, to, call) = match action {
            Action::Freeze => (
                ContainerState::Running,
                ContainerState::Paused,
                Call::Pause(id.clone()),
            ),
            Action::Thaw => (
                ContainerState::Paused,
                ContainerState::Running,
                Call::Resume(id.clone()),
            ),
        };

        let mut inner = self.lock();
        inner.calls.push(call);

        if inner.broken.contains(id) {
            return Err(RuntimeError::Transport(format!(
                "{} {}: connection reset",
                action.verb(),
                id
            )));
        }

        let container = inner
            .container_mut(id)
            .ok_or_else(|| RuntimeError::refused(action, id, "container not found"))?;
        if container.state != from {
            let detail = match from {
                ContainerState::Running => "not in running state",
                ContainerState::Paused => "not in paused state",
            };
            return Err(RuntimeError::refused(action, id, detail));
        }
        container.state = to;
        Ok(())
    }
}

#[async_trait]
impl RuntimeClient for InMemoryRuntime {
    async fn list(&self, pod: &PodIdentity) -> Result<Vec<ContainerInfo>> {
        let mut inner = self.lock();
        inner.calls.push(Call::List(pod.clone()));
        inner
            .pods
            .iter()
            .find(|(uid, _)| uid == pod)
            .map(|(_, containers)| containers.iter().map(|c| c.info.clone()).collect())
            .ok_or_else(|| RuntimeError::PodNotFound(pod.clone()))
    }

    async fn pause(&self, container: &ContainerRef) -> Result<()> {
        self.transition(Action::Freeze, container).await
    }

    async fn resume(&self, container: &ContainerRef) -> Result<()> {
        self.transition(Action::Thaw, container).await
    }

    fn sandbox_placeholder(&self) -> Option<&str> {
        self.placeholder.as_deref()
    }
}
