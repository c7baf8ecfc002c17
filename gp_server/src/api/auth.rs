//! Authentication API handlers.
//!
//! This module provides HTTP REST endpoints for account management:
//! - Registration with username, email, and password
//! - Login with username/password
//! - Logout and refresh-token rotation
//! - Email verification codes
//! - Password reset flow
//!
//! All endpoints return JSON responses with either authentication tokens or
//! sanitized error messages.
//!
//! # Examples
//!
//! Register a new user:
//! ```bash
//! curl -X POST http://localhost:3000/api/v1/auth/register \
//!   -H "Content-Type: application/json" \
//!   -d '{"username": "player1", "email": "p1@example.com", "password": "Pass1234"}'
//! ```

use axum::{
    Json,
    extract::{Extension, State},
    http::StatusCode,
};
use game_portal::auth::{AccessTokenClaims, AuthError, LoginRequest, RegisterRequest};
use serde::{Deserialize, Serialize};

use super::{AppState, ErrorResponse};
use crate::{logging, metrics};

#[derive(Debug, Deserialize)]
pub struct RegisterPayload {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginPayload {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyEmailPayload {
    pub code: String,
}

#[derive(Debug, Deserialize)]
pub struct PasswordResetRequestPayload {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct PasswordResetConfirmPayload {
    pub token: String,
    pub new_password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub user_id: i64,
    pub username: String,
}

type AuthHandlerError = (StatusCode, Json<ErrorResponse>);

fn auth_error(status: StatusCode, e: &AuthError) -> AuthHandlerError {
    (status, ErrorResponse::new(e.client_message()))
}

/// Register a new user account and automatically log them in.
///
/// Creates the account and its player profile, sends a verification code,
/// and immediately issues authentication tokens.
///
/// # Errors
///
/// - `400 Bad Request`: Username/email taken, weak password, or invalid input
/// - `500 Internal Server Error`: Server error during registration or login
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterPayload>,
) -> Result<Json<AuthResponse>, AuthHandlerError> {
    let request = RegisterRequest {
        username: payload.username.clone(),
        email: payload.email,
        password: payload.password.clone(),
    };

    match state.auth_manager.register(request).await {
        Ok(_user) => {
            // Login to generate tokens
            let login_request = LoginRequest {
                username: payload.username,
                password: payload.password,
            };

            match state.auth_manager.login(login_request, "web".to_string()).await {
                Ok((user, tokens)) => Ok(Json(AuthResponse {
                    access_token: tokens.access_token,
                    refresh_token: tokens.refresh_token,
                    user_id: user.id,
                    username: user.username,
                })),
                Err(e) => Err(auth_error(StatusCode::INTERNAL_SERVER_ERROR, &e)),
            }
        }
        Err(e) => Err(auth_error(StatusCode::BAD_REQUEST, &e)),
    }
}

/// Authenticate a user and generate session tokens.
///
/// Validates user credentials and returns JWT access and refresh tokens.
/// Access tokens are short-lived (15 minutes) while refresh tokens last
/// 7 days and rotate on use.
///
/// # Errors
///
/// - `401 Unauthorized`: Invalid credentials
/// - `403 Forbidden`: Account is banned
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginPayload>,
) -> Result<Json<AuthResponse>, AuthHandlerError> {
    let request = LoginRequest {
        username: payload.username.clone(),
        password: payload.password,
    };

    match state.auth_manager.login(request, "web".to_string()).await {
        Ok((user, tokens)) => {
            metrics::login_attempts_total(true);
            Ok(Json(AuthResponse {
                access_token: tokens.access_token,
                refresh_token: tokens.refresh_token,
                user_id: user.id,
                username: user.username,
            }))
        }
        Err(e) => {
            metrics::login_attempts_total(false);
            let status = match e {
                AuthError::AccountBanned => {
                    logging::log_security_event(
                        "banned_login",
                        None,
                        &format!("Login attempt on banned account {}", payload.username),
                    );
                    StatusCode::FORBIDDEN
                }
                _ => StatusCode::UNAUTHORIZED,
            };
            Err(auth_error(status, &e))
        }
    }
}

/// Logout and invalidate the current refresh token.
///
/// The access token will continue to work until it expires naturally
/// (15 minutes). Other sessions and devices remain active.
pub async fn logout(
    State(state): State<AppState>,
    Json(refresh_token): Json<String>,
) -> Result<StatusCode, AuthHandlerError> {
    match state.auth_manager.logout(refresh_token).await {
        Ok(_) => Ok(StatusCode::NO_CONTENT),
        Err(e) => Err(auth_error(StatusCode::BAD_REQUEST, &e)),
    }
}

/// Refresh an expired access token using a valid refresh token.
///
/// The old refresh token is invalidated and replaced with a new one;
/// rotation helps detect token theft.
///
/// # Errors
///
/// - `401 Unauthorized`: Invalid, expired, or revoked refresh token
pub async fn refresh_token(
    State(state): State<AppState>,
    Json(old_refresh_token): Json<String>,
) -> Result<Json<AuthResponse>, AuthHandlerError> {
    match state
        .auth_manager
        .refresh_token(old_refresh_token, "web".to_string())
        .await
    {
        Ok(tokens) => match state.auth_manager.verify_access_token(&tokens.access_token) {
            Ok(claims) => Ok(Json(AuthResponse {
                access_token: tokens.access_token,
                refresh_token: tokens.refresh_token,
                user_id: claims.sub,
                username: claims.username,
            })),
            Err(e) => Err(auth_error(StatusCode::INTERNAL_SERVER_ERROR, &e)),
        },
        Err(e) => Err(auth_error(StatusCode::UNAUTHORIZED, &e)),
    }
}

/// Confirm a 6-digit email verification code for the authenticated user.
pub async fn verify_email(
    State(state): State<AppState>,
    Extension(claims): Extension<AccessTokenClaims>,
    Json(payload): Json<VerifyEmailPayload>,
) -> Result<StatusCode, AuthHandlerError> {
    match state.auth_manager.verify_email(claims.sub, &payload.code).await {
        Ok(()) => Ok(StatusCode::NO_CONTENT),
        Err(e) => Err(auth_error(StatusCode::BAD_REQUEST, &e)),
    }
}

/// Send a fresh verification code to the authenticated user's email.
pub async fn resend_verification(
    State(state): State<AppState>,
    Extension(claims): Extension<AccessTokenClaims>,
) -> Result<StatusCode, AuthHandlerError> {
    match state.auth_manager.request_email_verification(claims.sub).await {
        Ok(()) => Ok(StatusCode::NO_CONTENT),
        Err(e) => Err(auth_error(StatusCode::BAD_REQUEST, &e)),
    }
}

/// Start a password reset.
///
/// Always returns `204 No Content` for a well-formed request so that
/// account existence is not leaked.
pub async fn request_password_reset(
    State(state): State<AppState>,
    Json(payload): Json<PasswordResetRequestPayload>,
) -> Result<StatusCode, AuthHandlerError> {
    match state.auth_manager.request_password_reset(&payload.email).await {
        Ok(()) => Ok(StatusCode::NO_CONTENT),
        Err(e) => Err(auth_error(StatusCode::INTERNAL_SERVER_ERROR, &e)),
    }
}

/// Complete a password reset with the emailed token.
///
/// # Errors
///
/// - `400 Bad Request`: Invalid or expired token, or weak new password
pub async fn confirm_password_reset(
    State(state): State<AppState>,
    Json(payload): Json<PasswordResetConfirmPayload>,
) -> Result<StatusCode, AuthHandlerError> {
    match state
        .auth_manager
        .reset_password(&payload.token, &payload.new_password)
        .await
    {
        Ok(()) => Ok(StatusCode::NO_CONTENT),
        Err(e) => Err(auth_error(StatusCode::BAD_REQUEST, &e)),
    }
}
