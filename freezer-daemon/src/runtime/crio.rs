//! CRI-O backend.
//!
//! CRI-O has no pause call in the CRI, but serves `/pause/{id}` and
//! `/unpause/{id}` on its socket's HTTP endpoint. Listing uses the CRI on
//! the same socket.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use http_body_util::{BodyExt, Empty};
use hyper::body::Bytes;
use hyper::{Method, Request, StatusCode};
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use hyperlocal::UnixConnector;
use tracing::debug;

use super::RuntimeClient;
use super::channel::connect_unix;
use super::cri::CriLister;
use crate::error::{Result, RuntimeError};
use crate::types::{Action, ContainerInfo, ContainerRef, PodIdentity};

/// Runtime client for CRI-O.
pub struct CrioClient {
    cri: CriLister,
    http: Client<UnixConnector, Empty<Bytes>>,
    socket: PathBuf,
}

impl CrioClient {
    /// Dial the CRI-O socket.
    pub async fn connect(socket: &Path, dial_timeout: Duration) -> Result<Self> {
        let channel = connect_unix(socket, dial_timeout).await?;
        Ok(Self::new(CriLister::new(channel), socket))
    }

    /// Build a client from a CRI lister and the socket serving the HTTP endpoint.
    pub fn new(cri: CriLister, socket: &Path) -> Self {
        let http = Client::builder(TokioExecutor::new()).build(UnixConnector);
        Self {
            cri,
            http,
            socket: socket.to_path_buf(),
        }
    }

    async fn call(&self, action: Action, container: &ContainerRef) -> Result<()> {
        let path = match action {
            Action::Freeze => format!("/pause/{}", container),
            Action::Thaw => format!("/unpause/{}", container),
        };
        debug!(container = %container, path = %path, "Calling CRI-O");

        let uri = hyperlocal::Uri::new(&self.socket, &path);
        let req = Request::builder()
            .method(Method::GET)
            .uri(uri)
            .body(Empty::new())
            .map_err(|e| RuntimeError::Transport(e.to_string()))?;

        let resp = self.http.request(req).await.map_err(|e| {
            RuntimeError::Transport(format!("{} {}: {}", action.verb(), container, e))
        })?;

        let status = resp.status();
        if status == StatusCode::OK {
            return Ok(());
        }

        let body = resp
            .into_body()
            .collect()
            .await
            .map_err(|e| RuntimeError::Transport(format!("reading CRI-O response: {}", e)))?
            .to_bytes();
        Err(RuntimeError::refused(
            action,
            container,
            String::from_utf8_lossy(&body).into_owned(),
        ))
    }
}

#[async_trait]
impl RuntimeClient for CrioClient {
    async fn list(&self, pod: &PodIdentity) -> Result<Vec<ContainerInfo>> {
        self.cri.list(pod).await
    }

    async fn pause(&self, container: &ContainerRef) -> Result<()> {
        self.call(Action::Freeze, container).await
    }

    async fn resume(&self, container: &ContainerRef) -> Result<()> {
        self.call(Action::Thaw, container).await
    }
}
