//! freezer-daemon - node agent that freezes and thaws pod containers.
//!
//! Runs privileged on every node. An external controller calls it with a
//! projected service-account token; the daemon authenticates the token,
//! resolves the calling pod, and pauses or resumes that pod's user
//! containers through the node's container runtime.
//!
//! ## Architecture
//!
//! - **Runtime clients**: containerd, CRI-O and Docker transports behind
//!   one [`runtime::RuntimeClient`] trait
//! - **Discovery**: filters a pod's containers down to freeze targets
//! - **Engine**: ordered, non-transactional pause/resume of those targets
//! - **Server**: token-gated HTTP surface mapping actions onto the engine

pub mod auth;
pub mod config;
pub mod discovery;
pub mod engine;
pub mod error;
pub mod proto;
pub mod runtime;
pub mod server;
pub mod types;

pub use auth::{AuthenticationResult, Authenticator, StaticAuthenticator, TokenReviewAuthenticator};
pub use config::Config;
pub use discovery::Discovery;
pub use engine::Engine;
pub use error::{AuthError, EngineError, RuntimeError};
pub use runtime::{RuntimeBackend, RuntimeClient};
pub use types::{Action, ContainerInfo, ContainerRef, PodIdentity};
