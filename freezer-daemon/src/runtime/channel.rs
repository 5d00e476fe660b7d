//! gRPC channels over Unix domain sockets.

use std::path::{Path, PathBuf};
use std::time::Duration;

use hyper_util::rt::TokioIo;
use tokio::net::UnixStream;
use tonic::transport::{Channel, Endpoint, Uri};
use tower::service_fn;
use tracing::{debug, info};

use crate::error::{Result, RuntimeError};

/// Maximum gRPC message size accepted from the runtime (16 MiB).
pub const MAX_RECV_MESSAGE_SIZE: usize = 16 * 1024 * 1024;

/// Create a tonic channel to a runtime socket.
///
/// The connection is established eagerly, bounded by `dial_timeout`.
pub async fn connect_unix(socket: &Path, dial_timeout: Duration) -> Result<Channel> {
    let endpoint = socket.display().to_string();
    let connect_err = |reason: String| RuntimeError::Connect {
        endpoint: endpoint.clone(),
        reason,
    };

    // Use a dummy URI - the actual connection is made via the Unix socket
    let channel_endpoint = Endpoint::try_from("http://[::]:50051")
        .map_err(|e| connect_err(e.to_string()))?
        .connect_timeout(dial_timeout);

    let path: PathBuf = socket.to_path_buf();
    let connecting = channel_endpoint.connect_with_connector(service_fn(move |_: Uri| {
        let path = path.clone();
        async move {
            debug!(socket = %path.display(), "Creating unix socket connection");
            let stream = UnixStream::connect(&path).await?;
            // Wrap with TokioIo to implement hyper's Read/Write traits
            Ok::<_, std::io::Error>(TokioIo::new(stream))
        }
    }));

    let channel = tokio::time::timeout(dial_timeout, connecting)
        .await
        .map_err(|_| connect_err(format!("timed out after {:?}", dial_timeout)))?
        .map_err(|e| connect_err(e.to_string()))?;

    info!(socket = %socket.display(), "Connected to runtime socket");
    Ok(channel)
}

/// Convert a tonic status from a list call into a transport error.
pub(crate) fn transport(status: tonic::Status) -> RuntimeError {
    RuntimeError::Transport(format!("{:?}: {}", status.code(), status.message()))
}
