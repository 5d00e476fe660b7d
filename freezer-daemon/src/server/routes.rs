use axum::{Router, routing::post};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::handlers::{self, AppState};

/// Create the API router.
///
/// The action is accepted either in the JSON body of `POST /`
/// (`{"action": "pause"}`) or as the path of `POST /{action}`
/// (`/pause`, `/resume`, `/freeze`, `/thaw`).
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", post(handlers::body_action))
        .route("/{action}", post(handlers::path_action))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
