//! Shared-secret authentication.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use subtle::ConstantTimeEq;

use super::error::ApiError;
use super::state::AppState;

pub const ADMIN_TOKEN_HEADER: &str = "x-admin-token";

/// Constant-time comparison of the provided token against the configured
/// one. No configured token means nothing matches.
pub fn token_matches(expected: Option<&str>, provided: Option<&str>) -> bool {
    match (expected, provided) {
        (Some(expected), Some(provided)) if !expected.is_empty() => {
            provided.as_bytes().ct_eq(expected.as_bytes()).into()
        }
        _ => false,
    }
}

pub(crate) fn is_authorized(state: &AppState, headers: &HeaderMap) -> bool {
    let provided = headers
        .get(ADMIN_TOKEN_HEADER)
        .and_then(|h| h.to_str().ok());
    token_matches(state.admin_token.as_deref(), provided)
}

/// Middleware rejecting requests without a valid `x-admin-token` header.
pub(crate) async fn require_admin_token(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if !is_authorized(&state, req.headers()) {
        tracing::debug!(path = %req.uri().path(), "Rejected unauthorized request");
        return Err(ApiError::Unauthorized);
    }
    Ok(next.run(req).await)
}
