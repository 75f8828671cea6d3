//! Bearer token authentication middleware.
//!
//! This middleware intercepts every protected request to:
//! 1. Extract the bearer token from the Authorization header
//! 2. Verify it with the configured `TokenVerifier`
//! 3. Inject the caller's `AuthContext` into the request
//! 4. Reject the request with 401 (no token) or 403 (bad token)

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};

use crate::{app::AppState, error::AppError};

/// Bearer authentication middleware function.
///
/// # Headers
///
/// Expected header format:
/// ```text
/// Authorization: Bearer eyJhbGciOi...
/// ```
///
/// # Returns
///
/// - `Ok(Response)` from the next handler when the token verifies
/// - `Err(AppError::MissingToken)` when no bearer token was sent (401)
/// - `Err(AppError::InvalidToken)` when verification fails (403)
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(AppError::MissingToken)?;

    let auth_context = state.verifier.verify(token).await.map_err(|err| {
        tracing::warn!(error = %err, "bearer token rejected");
        AppError::InvalidToken
    })?;

    // Handlers extract this with Extension<AuthContext>
    request.extensions_mut().insert(auth_context);

    Ok(next.run(request).await)
}
