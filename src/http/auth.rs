//! Bearer token guard for the API routes.

use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;

use crate::http::error::ApiError;
use crate::http::server::AppState;
use crate::observability::metrics;

/// Reject requests whose bearer token does not match the configured secret.
pub async fn require_api_token(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(request.headers());

    if token != Some(state.api_token.as_ref()) {
        match token {
            Some(token) => tracing::error!("Unauthorized attempt (token={token})"),
            None => tracing::error!("Unauthorized attempt (no token provided)"),
        }
        metrics::record_auth_failure();
        return Err(ApiError::Unauthorized);
    }

    Ok(next.run(request).await)
}

/// Token carried in the `Authorization` header, `Bearer ` prefix removed.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ").unwrap_or(value).trim();
    (!token.is_empty()).then_some(token)
}
