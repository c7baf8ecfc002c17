//! Game room error types.

use super::models::RoomStatus;
use crate::tournament::models::{GameType, UserId};
use thiserror::Error;
use uuid::Uuid;

/// Room errors
#[derive(Debug, Error)]
pub enum RoomError {
    /// Room not found
    #[error("Room {0} not found")]
    NotFound(Uuid),

    /// Room is full
    #[error("Room is full")]
    Full,

    /// Player already seated
    #[error("Already joined this room")]
    AlreadyJoined,

    /// Player is not in the room
    #[error("User {0} is not in this room")]
    NotInRoom(UserId),

    /// Operation not valid in the room's current phase
    #[error("Operation not allowed while room is {status:?}")]
    InvalidState { status: RoomStatus },

    /// Not enough players to start
    #[error("Need at least {needed} players to start, have {current}")]
    NotEnoughPlayers { needed: usize, current: usize },

    /// Some players have not readied up
    #[error("Not all players are ready")]
    PlayersNotReady,

    /// Reported winner is not seated in the room
    #[error("User {0} is not a player in this room")]
    InvalidWinner(UserId),

    /// Result already reported
    #[error("Room result was already reported")]
    AlreadyCompleted,

    /// Bracket matches must produce a winner
    #[error("A tournament match cannot end in a draw")]
    DrawNotAllowed,

    /// Game type has no fixed room size
    #[error("Game type {0:?} cannot host rooms")]
    UnsupportedGameType(GameType),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Document (de)serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for room operations
pub type RoomResult<T> = Result<T, RoomError>;
