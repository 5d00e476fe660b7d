use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::auth::Authenticator;
use crate::engine::Engine;
use crate::error::{AuthError, EngineError};
use crate::types::{Action, PodIdentity};

/// Header carrying the caller's service-account token.
pub const TOKEN_HEADER: &str = "Token";

/// Shared application state
pub struct AppState {
    pub engine: Arc<Engine>,
    pub authenticator: Arc<dyn Authenticator>,
}

/// Request failure. Only the status code reaches the caller; details are
/// logged.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("no token in header")]
    MissingToken,

    #[error("authenticating via token failed")]
    Unauthenticated,

    #[error(transparent)]
    AuthenticatorUnavailable(#[from] AuthError),

    /// The token issuer broke its contract: authenticated tokens always
    /// carry the pod UID.
    #[error("authenticated token has no pod UID claim")]
    MissingPodIdentity,

    #[error("unable to decode message body: {0}")]
    MalformedBody(String),

    #[error("invalid action specified: {0:?}")]
    BadAction(String),

    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl HandlerError {
    pub fn status(&self) -> StatusCode {
        match self {
            HandlerError::MissingToken | HandlerError::MalformedBody(_) => StatusCode::BAD_REQUEST,
            HandlerError::Unauthenticated => StatusCode::FORBIDDEN,
            HandlerError::BadAction(_) => StatusCode::NOT_FOUND,
            HandlerError::AuthenticatorUnavailable(_)
            | HandlerError::MissingPodIdentity
            | HandlerError::Engine(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for HandlerError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        if status.is_server_error() {
            error!(status = status.as_u16(), error = %self, "Request failed");
        } else {
            warn!(status = status.as_u16(), error = %self, "Request rejected");
        }
        status.into_response()
    }
}

#[derive(Deserialize)]
struct MessageBody {
    action: Option<String>,
}

/// `POST /` with `{"action": "pause" | "resume"}`.
pub async fn body_action(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, HandlerError> {
    let pod = authorize(&state, &headers).await?;
    let action = decode_body_action(&body)?;
    dispatch(&state, action, &pod).await
}

/// `POST /{action}` with the action in the path.
pub async fn path_action(
    State(state): State<Arc<AppState>>,
    Path(action): Path<String>,
    headers: HeaderMap,
) -> Result<StatusCode, HandlerError> {
    let pod = authorize(&state, &headers).await?;
    let action = action
        .parse::<Action>()
        .map_err(|e| HandlerError::BadAction(e.0))?;
    dispatch(&state, action, &pod).await
}

/// Authenticate the caller and resolve the pod its token was issued to.
async fn authorize(state: &AppState, headers: &HeaderMap) -> Result<PodIdentity, HandlerError> {
    let token = headers
        .get(TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|t| !t.is_empty())
        .ok_or(HandlerError::MissingToken)?;

    let review = state.authenticator.authenticate(token).await?;
    if !review.authenticated {
        return Err(HandlerError::Unauthenticated);
    }

    let pod = review
        .pod_identity()
        .ok_or(HandlerError::MissingPodIdentity)?;
    info!(pod = %pod, "Authenticated request");
    Ok(pod)
}

fn decode_body_action(body: &[u8]) -> Result<Action, HandlerError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(HandlerError::BadAction(String::new()));
    }

    let message: MessageBody =
        serde_json::from_slice(body).map_err(|e| HandlerError::MalformedBody(e.to_string()))?;
    let action = message.action.unwrap_or_default();
    action
        .parse::<Action>()
        .map_err(|e| HandlerError::BadAction(e.0))
}

async fn dispatch(
    state: &AppState,
    action: Action,
    pod: &PodIdentity,
) -> Result<StatusCode, HandlerError> {
    info!(pod = %pod, action = %action, "{} request received", action.verb());
    let containers = state.engine.apply(action, pod).await?;
    info!(pod = %pod, action = %action, containers = containers.len(), "Request complete");
    Ok(StatusCode::OK)
}
