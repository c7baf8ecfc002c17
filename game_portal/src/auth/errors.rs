//! Authentication error types.

use thiserror::Error;

/// Authentication errors
#[derive(Debug, Error)]
pub enum AuthError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Password hashing failed
    #[error("Password hashing failed")]
    HashingFailed,

    /// Password verification failed
    #[error("Invalid username or password")]
    InvalidCredentials,

    /// User not found
    #[error("User not found")]
    UserNotFound,

    /// Username already exists
    #[error("Username already exists")]
    UsernameTaken,

    /// Email already exists
    #[error("Email already exists")]
    EmailTaken,

    /// Invalid username format
    #[error("Invalid username: {0}")]
    InvalidUsername(String),

    /// Invalid email format
    #[error("Invalid email address")]
    InvalidEmail,

    /// Password too weak
    #[error("Password too weak: {0}")]
    WeakPassword(String),

    /// Account banned
    #[error("Account is banned")]
    AccountBanned,

    /// JWT token error
    #[error("JWT error: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),

    /// Session expired
    #[error("Session expired")]
    SessionExpired,

    /// Invalid refresh token
    #[error("Invalid refresh token")]
    InvalidRefreshToken,

    /// Email already verified
    #[error("Email is already verified")]
    AlreadyVerified,

    /// Invalid or expired verification code
    #[error("Invalid or expired verification code")]
    InvalidVerificationCode,

    /// Invalid or expired password reset token
    #[error("Invalid or expired reset token")]
    InvalidResetToken,
}

impl AuthError {
    /// Get a client-safe error message that doesn't leak sensitive information
    ///
    /// Database and JWT errors are sanitized to prevent information disclosure
    /// about the internal system structure.
    pub fn client_message(&self) -> String {
        match self {
            // Sanitize database errors - don't expose SQL details
            AuthError::Database(_) => "Internal server error".to_string(),
            // Sanitize JWT errors - don't expose token structure
            AuthError::JwtError(_) => "Authentication failed".to_string(),
            // All other errors are safe to expose
            _ => self.to_string(),
        }
    }
}

/// Result type for authentication operations
pub type AuthResult<T> = Result<T, AuthError>;
