//! Authentication middleware for protected endpoints.
//!
//! This module provides Axum middleware for JWT-based authentication.
//! The middleware extracts and validates JWT access tokens from the Authorization header,
//! then injects the authenticated claims into request extensions for downstream handlers.
//!
//! # Extracting the caller
//!
//! In handler functions, extract the claims from request extensions:
//!
//! ```rust,no_run
//! use axum::extract::Extension;
//! use game_portal::auth::AccessTokenClaims;
//!
//! async fn protected_handler(Extension(claims): Extension<AccessTokenClaims>) -> String {
//!     format!("Authenticated as user {}", claims.sub)
//! }
//! # let _ = protected_handler;
//! ```

use axum::{
    extract::{Request, State},
    http::{StatusCode, header::AUTHORIZATION},
    middleware::Next,
    response::Response,
};
use game_portal::auth::AccessTokenClaims;

use super::AppState;

/// Authentication middleware that validates JWT tokens and injects claims.
///
/// Extracts the JWT access token from the `Authorization: Bearer <token>` header,
/// validates it using the AuthManager, and injects the decoded claims into
/// request extensions.
///
/// # Behavior
///
/// - **Success**: Token valid → Injects [`AccessTokenClaims`] → Calls next handler
/// - **Missing header**: Returns `401 Unauthorized`
/// - **Invalid format**: Returns `401 Unauthorized`
/// - **Invalid/expired token**: Returns `401 Unauthorized`
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let auth_header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));

    let token = match auth_header {
        Some(t) => t,
        None => return Err(StatusCode::UNAUTHORIZED),
    };

    match state.auth_manager.verify_access_token(token) {
        Ok(claims) => {
            request.extensions_mut().insert(claims);
            Ok(next.run(request).await)
        }
        Err(_) => Err(StatusCode::UNAUTHORIZED),
    }
}

/// Reject callers without the admin flag. Run inside a handler after
/// [`auth_middleware`] has populated the claims.
pub fn require_admin(claims: &AccessTokenClaims) -> Result<(), StatusCode> {
    if claims.is_admin {
        Ok(())
    } else {
        Err(StatusCode::FORBIDDEN)
    }
}
