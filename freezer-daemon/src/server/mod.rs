//! HTTP API called by the concurrency controller.

pub mod handlers;
pub mod routes;

pub use handlers::{AppState, HandlerError, TOKEN_HEADER};
pub use routes::create_router;
