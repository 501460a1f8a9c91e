//! Request watchdog.
//!
//! Races the rest of the stack against the configured request timeout and answers
//! 504 Gateway Timeout when the timer wins. Store operations carry their own shorter
//! timeout, so a request normally fails there first with a 503.

use super::{AppState, error::error_response};
use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use tracing::warn;

/// Middleware enforcing `AppState::request_timeout` on every request.
pub async fn request_watchdog(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let limit = state.request_timeout;

    match tokio::time::timeout(limit, next.run(request)).await {
        Ok(response) => response,
        Err(_) => {
            let timeout_ms = u64::try_from(limit.as_millis()).unwrap_or(u64::MAX);
            warn!(%method, %path, timeout_ms, "Request exceeded watchdog limit");
            error_response(
                StatusCode::GATEWAY_TIMEOUT,
                "request_timeout",
                format!("Request exceeded {timeout_ms} ms"),
                true,
            )
        }
    }
}
