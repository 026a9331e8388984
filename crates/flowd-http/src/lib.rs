//! REST + SSE control-plane daemon for flowd (C11, HTTP/SSE front end).

pub mod auth;
pub mod broadcast_sink;
pub mod error;
pub mod registry;
pub mod routes;
pub mod sources;
pub mod state;

use std::sync::Arc;

use axum::middleware;
use axum::Router;

pub use error::ApiError;
pub use registry::{RunRegistry, RunStatus, RunSummary};
pub use sources::{InMemorySourceManager, Source, SourceManager};
pub use state::{AppState, SharedState};

/// Wires routes and the auth middleware into a single [`Router`].
pub fn build_app(state: Arc<AppState>) -> Router {
    routes::build_app(state.clone()).layer(middleware::from_fn_with_state(state, auth::require_token))
}
