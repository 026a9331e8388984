//! Bearer-token auth middleware, grounded in `abp-daemon`'s middleware
//! stack (request-id/logging layers wrapping every route uniformly).

use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;

use crate::error::ApiError;
use crate::state::SharedState;

const UNAUTHENTICATED_PATHS: &[&str] = &["/healthz"];

pub async fn require_token(
    State(state): State<SharedState>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let path = req.uri().path();
    if UNAUTHENTICATED_PATHS.contains(&path) {
        return Ok(next.run(req).await);
    }
    if path == "/metrics" && state.dev_mode {
        return Ok(next.run(req).await);
    }

    let Some(expected) = state.token.as_deref() else {
        return Ok(next.run(req).await);
    };

    let presented = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    match presented {
        Some(token) if token == expected => Ok(next.run(req).await),
        _ => Err(ApiError::unauthorized()),
    }
}
