//! Shared test utilities for freezer-daemon integration tests.

#![allow(dead_code)]

use freezer_daemon::runtime::InMemoryRuntime;
use freezer_daemon::server::{AppState, TOKEN_HEADER, create_router};
use freezer_daemon::{AuthenticationResult, Engine, StaticAuthenticator};
use reqwest::{Client, Response as ReqwestResponse};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Token accepted for pod `pod-a`.
pub const POD_A_TOKEN: &str = "THE_TOKEN";

/// Token accepted but missing the pod UID claim.
pub const CLAIMLESS_TOKEN: &str = "CLAIMLESS_TOKEN";

/// Authenticator used by most tests.
pub fn authenticator() -> StaticAuthenticator {
    StaticAuthenticator::new()
        .with_token(POD_A_TOKEN, AuthenticationResult::for_pod("pod-a"))
        .with_token(
            CLAIMLESS_TOKEN,
            AuthenticationResult {
                authenticated: true,
                ..Default::default()
            },
        )
}

/// Runtime with pod `pod-a` holding a user container and the queue-proxy.
pub fn runtime() -> Arc<InMemoryRuntime> {
    Arc::new(InMemoryRuntime::new().with_pod(
        "pod-a",
        &[("user-1", "user-container"), ("qp-1", "queue-proxy")],
    ))
}

/// Test server wrapper running the HTTP API on an ephemeral port.
pub struct TestServer {
    pub addr: SocketAddr,
    pub client: Client,
    pub runtime: Arc<InMemoryRuntime>,
    shutdown_tx: tokio::sync::oneshot::Sender<()>,
}

impl TestServer {
    /// Spawn a server over the default authenticator and runtime.
    pub async fn spawn() -> Self {
        Self::spawn_with(authenticator(), runtime()).await
    }

    /// Spawn a server over the given authenticator and runtime.
    pub async fn spawn_with(
        authenticator: StaticAuthenticator,
        runtime: Arc<InMemoryRuntime>,
    ) -> Self {
        let app_state = Arc::new(AppState {
            engine: Arc::new(Engine::new(runtime.clone())),
            authenticator: Arc::new(authenticator),
        });

        let router = create_router(app_state);

        // Bind to port 0 to let the OS choose an available port
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind");
        let addr = listener.local_addr().unwrap();

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
                .expect("Server error");
        });

        Self {
            addr,
            client: Client::new(),
            runtime,
            shutdown_tx,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// POST a JSON body, optionally with a token.
    pub async fn post_json<T: Serialize>(
        &self,
        path: &str,
        token: Option<&str>,
        body: &T,
    ) -> ReqwestResponse {
        let mut request = self.client.post(self.url(path)).json(body);
        if let Some(token) = token {
            request = request.header(TOKEN_HEADER, token);
        }
        request.send().await.expect("Request failed")
    }

    /// POST an empty body, optionally with a token.
    pub async fn post(&self, path: &str, token: Option<&str>) -> ReqwestResponse {
        let mut request = self.client.post(self.url(path));
        if let Some(token) = token {
            request = request.header(TOKEN_HEADER, token);
        }
        request.send().await.expect("Request failed")
    }

    /// POST a raw body with a token.
    pub async fn post_raw(&self, path: &str, token: &str, body: &'static str) -> ReqwestResponse {
        self.client
            .post(self.url(path))
            .header(TOKEN_HEADER, token)
            .body(body)
            .send()
            .await
            .expect("Request failed")
    }

    /// Shutdown the server.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(());
    }
}
