//! Stat propagation error types.

use crate::tournament::models::UserId;
use thiserror::Error;

/// Stats errors
#[derive(Debug, Error)]
pub enum StatsError {
    /// Profile not found
    #[error("Profile not found for user {0}")]
    ProfileNotFound(UserId),

    /// Profile already exists
    #[error("Profile already exists for user {0}")]
    ProfileExists(UserId),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Document (de)serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for stats operations
pub type StatsResult<T> = Result<T, StatsError>;
