//! Container runtime clients.
//!
//! Each backend translates list/pause/resume into its runtime's wire calls:
//! - containerd: CRI listing, pause/resume on tasks in the `k8s.io` namespace
//! - CRI-O: CRI listing, pause/resume over the CRI-O HTTP endpoint
//! - Docker: label-filtered listing, engine pause/unpause

pub mod channel;
pub mod containerd;
pub mod cri;
pub mod crio;
pub mod docker;
pub mod memory;

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use clap::ValueEnum;
use tracing::info;

use crate::error::Result;
use crate::types::{ContainerInfo, ContainerRef, PodIdentity};

pub use containerd::ContainerdClient;
pub use crio::CrioClient;
pub use docker::DockerClient;
pub use memory::InMemoryRuntime;

/// Label the kubelet puts on every sandbox and container of a pod.
pub const POD_UID_LABEL: &str = "io.kubernetes.pod.uid";

/// Label holding the Kubernetes container name on Docker containers.
pub const CONTAINER_NAME_LABEL: &str = "io.kubernetes.container.name";

/// Capability every runtime backend provides.
///
/// `list` returns the raw containers of a pod in runtime order; filtering
/// for eligibility is done by [`crate::Discovery`].
#[async_trait]
pub trait RuntimeClient: Send + Sync {
    /// List all containers belonging to the pod.
    async fn list(&self, pod: &PodIdentity) -> Result<Vec<ContainerInfo>>;

    /// Freeze one running container.
    async fn pause(&self, container: &ContainerRef) -> Result<()>;

    /// Thaw one paused container.
    async fn resume(&self, container: &ContainerRef) -> Result<()>;

    /// Name of the runtime's own sandbox placeholder container, if it lists one.
    fn sandbox_placeholder(&self) -> Option<&str> {
        None
    }
}

/// Container runtime the daemon drives. Fixed for the process lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RuntimeBackend {
    Containerd,
    Docker,
    #[value(name = "crio")]
    CrioLike,
}

impl RuntimeBackend {
    /// Well-known socket path of the runtime.
    pub fn default_socket(&self) -> PathBuf {
        match self {
            RuntimeBackend::Containerd => PathBuf::from("/var/run/containerd/containerd.sock"),
            RuntimeBackend::Docker => PathBuf::from("/var/run/docker.sock"),
            RuntimeBackend::CrioLike => PathBuf::from("/var/run/crio/crio.sock"),
        }
    }
}

impl fmt::Display for RuntimeBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeBackend::Containerd => write!(f, "containerd"),
            RuntimeBackend::Docker => write!(f, "docker"),
            RuntimeBackend::CrioLike => write!(f, "crio"),
        }
    }
}

/// Connection settings for [`connect`].
#[derive(Debug, Clone)]
pub struct RuntimeOptions {
    pub socket: PathBuf,
    pub dial_timeout: Duration,
    /// Per-call timeout for Docker engine requests.
    pub docker_request_timeout: Duration,
    /// Docker engine API version as `(major, minor)`.
    pub docker_api_version: Option<(usize, usize)>,
}

/// Establish the process-wide runtime connection.
///
/// Any failure here is meant to be fatal; there is no retry.
pub async fn connect(
    backend: RuntimeBackend,
    options: &RuntimeOptions,
) -> Result<Arc<dyn RuntimeClient>> {
    info!(
        backend = %backend,
        socket = %options.socket.display(),
        "Connecting to container runtime"
    );

    let client: Arc<dyn RuntimeClient> = match backend {
        RuntimeBackend::Containerd => {
            Arc::new(ContainerdClient::connect(&options.socket, options.dial_timeout).await?)
        }
        RuntimeBackend::CrioLike => {
            Arc::new(CrioClient::connect(&options.socket, options.dial_timeout).await?)
        }
        RuntimeBackend::Docker => Arc::new(
            DockerClient::connect(
                &options.socket,
                options.dial_timeout,
                options.docker_request_timeout,
                options.docker_api_version,
            )
            .await?,
        ),
    };
    Ok(client)
}
