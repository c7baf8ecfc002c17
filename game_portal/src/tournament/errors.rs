//! Tournament error types.

use super::models::{TournamentFormat, TournamentId, TournamentStatus, UserId};
use thiserror::Error;

/// Tournament errors
#[derive(Debug, Error)]
pub enum TournamentError {
    /// Tournament not found
    #[error("Tournament not found: {0}")]
    NotFound(TournamentId),

    /// Tournament is at max capacity
    #[error("Tournament is full")]
    Full,

    /// User is already registered
    #[error("Already registered")]
    AlreadyRegistered,

    /// User is not registered
    #[error("Not registered for this tournament")]
    NotRegistered,

    /// Operation attempted in the wrong lifecycle phase
    #[error("Operation not valid while tournament is {status:?}")]
    InvalidState { status: TournamentStatus },

    /// Not enough participants to start
    #[error("Insufficient participants: need {needed}, have {current}")]
    InsufficientParticipants { needed: usize, current: usize },

    /// Bracket generation requires at least two participants
    #[error("Cannot build a bracket for {0} participants")]
    InvalidParticipantCount(usize),

    /// Bracket generation exists only for single elimination
    #[error("Bracket generation is not implemented for {0:?} format")]
    UnsupportedFormat(TournamentFormat),

    /// Match id not present in any round
    #[error("Unknown match: {0}")]
    UnknownMatch(String),

    /// Duplicate result report; rejected rather than silently reapplied
    #[error("Match {0} is already completed")]
    MatchAlreadyCompleted(String),

    /// Both player slots must be occupied before a result can be reported
    #[error("Match {0} does not have both players assigned")]
    MatchNotReady(String),

    /// Match already has a game session attached
    #[error("Match {0} already has a game in progress")]
    MatchInProgress(String),

    /// Reported winner is not one of the match's assigned players
    #[error("User {user_id} is not a player of match {match_id}")]
    InvalidWinner { match_id: String, user_id: UserId },

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Document (de)serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for tournament operations
pub type TournamentResult<T> = Result<T, TournamentError>;
