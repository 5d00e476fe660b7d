//! Error types.

use thiserror::Error;

use crate::types::{Action, ContainerRef, PodIdentity};

/// Errors raised by a runtime client or by container discovery.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// The runtime has no sandbox (or labelled container) for the pod.
    #[error("pod {0} not found")]
    PodNotFound(PodIdentity),

    /// The pod exists but only holds infrastructure containers.
    #[error("no non queue-proxy containers found in pod {0}")]
    NoEligibleContainers(PodIdentity),

    /// The runtime answered but refused to pause the container.
    #[error("{container} not paused: {detail}")]
    PauseRefused {
        container: ContainerRef,
        detail: String,
    },

    /// The runtime answered but refused to resume the container.
    #[error("{container} not resumed: {detail}")]
    ResumeRefused {
        container: ContainerRef,
        detail: String,
    },

    /// The call never got a runtime answer.
    #[error("runtime transport: {0}")]
    Transport(String),

    /// Startup could not reach the runtime socket.
    #[error("failed to connect to {endpoint}: {reason}")]
    Connect { endpoint: String, reason: String },
}

impl RuntimeError {
    /// Refusal for `action` on `container`.
    pub fn refused(action: Action, container: &ContainerRef, detail: impl Into<String>) -> Self {
        let container = container.clone();
        let detail = detail.into();
        match action {
            Action::Freeze => RuntimeError::PauseRefused { container, detail },
            Action::Thaw => RuntimeError::ResumeRefused { container, detail },
        }
    }

    /// Whether the runtime itself rejected the operation (as opposed to the
    /// call not reaching it).
    pub fn is_refusal(&self) -> bool {
        matches!(
            self,
            RuntimeError::PauseRefused { .. } | RuntimeError::ResumeRefused { .. }
        )
    }
}

/// Errors returned by [`crate::Engine`].
#[derive(Debug, Error)]
pub enum EngineError {
    /// Listing the pod's containers failed.
    #[error(transparent)]
    Discovery(RuntimeError),

    /// A per-container call failed. Containers in `completed` stay in their
    /// new state; nothing after `container` was touched.
    #[error("{action} of pod {pod} stopped at {container} after {} container(s): {source}", .completed.len())]
    Interrupted {
        action: Action,
        pod: PodIdentity,
        container: ContainerRef,
        completed: Vec<ContainerRef>,
        #[source]
        source: RuntimeError,
    },
}

/// Errors from the external authenticator.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The TokenReview call itself failed.
    #[error("token review failed: {0}")]
    Unavailable(String),
}

/// Result type for runtime operations.
pub type Result<T> = std::result::Result<T, RuntimeError>;
