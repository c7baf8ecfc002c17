//! Authentication module providing user registration, login, and session management.
//!
//! This module implements secure authentication with:
//! - Argon2id password hashing with server-side pepper
//! - JWT access tokens (15-minute expiry)
//! - Rotating refresh tokens (7-day expiry)
//! - Email verification via 6-digit codes
//! - Password reset tokens stored as SHA-256 digests
//! - Device fingerprinting for session security

pub mod errors;
pub mod mailer;
pub mod manager;
pub mod models;

pub use errors::{AuthError, AuthResult};
pub use mailer::{LogMailer, MailError, Mailer};
pub use manager::AuthManager;
pub use models::{
    AccessTokenClaims, LoginRequest, PasswordResetConfirm, PasswordResetRequest, RegisterRequest,
    SessionTokens, User, UserId,
};
