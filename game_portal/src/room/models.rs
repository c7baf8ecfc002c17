//! Game room aggregate: lobby state for one game session.

use super::errors::{RoomError, RoomResult};
use crate::tournament::models::{GameType, TournamentId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Room lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomStatus {
    Waiting,
    InProgress,
    Completed,
    Cancelled,
}

impl RoomStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoomStatus::Waiting => "waiting",
            RoomStatus::InProgress => "in_progress",
            RoomStatus::Completed => "completed",
            RoomStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "waiting" => Some(RoomStatus::Waiting),
            "in_progress" => Some(RoomStatus::InProgress),
            "completed" => Some(RoomStatus::Completed),
            "cancelled" => Some(RoomStatus::Cancelled),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RoomStatus::Completed | RoomStatus::Cancelled)
    }
}

/// A player seated in a room
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomPlayer {
    pub user_id: UserId,
    pub username: String,
    pub is_host: bool,
    pub is_ready: bool,
    pub joined_at: DateTime<Utc>,
}

impl RoomPlayer {
    pub fn new(user_id: UserId, username: &str, is_host: bool) -> Self {
        Self {
            user_id,
            username: username.to_string(),
            is_host,
            // The host created the room, they are ready by definition
            is_ready: is_host,
            joined_at: Utc::now(),
        }
    }
}

/// Link back to the bracket match a room was spawned for
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TournamentMatchRef {
    pub tournament_id: TournamentId,
    pub match_id: String,
}

/// One game session lobby.
///
/// The room does not understand the game being played: `game_data` is an
/// opaque blob owned by the client, and the room only tracks seating,
/// readiness, the stake, and the final result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameRoom {
    pub room_id: Uuid,
    pub game_type: GameType,
    pub status: RoomStatus,
    pub capacity: usize,
    pub players: Vec<RoomPlayer>,
    /// Coins each player puts up; the winner is paid double their stake
    pub stake: i64,
    pub winner: Option<UserId>,
    pub game_data: serde_json::Value,
    pub tournament_match: Option<TournamentMatchRef>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl GameRoom {
    /// Create a room hosted by `host`. Fails for game types without a
    /// fixed table size.
    pub fn new(game_type: GameType, host_id: UserId, host_name: &str, stake: i64) -> RoomResult<Self> {
        let capacity = game_type
            .room_capacity()
            .ok_or(RoomError::UnsupportedGameType(game_type))?;
        let now = Utc::now();
        Ok(Self {
            room_id: Uuid::new_v4(),
            game_type,
            status: RoomStatus::Waiting,
            capacity,
            players: vec![RoomPlayer::new(host_id, host_name, true)],
            stake,
            winner: None,
            game_data: serde_json::Value::Null,
            tournament_match: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Create a room for a bracket match, pre-seating both players ready
    /// to start. The match link makes the room's result feed the bracket.
    pub fn for_match(
        game_type: GameType,
        tournament_id: TournamentId,
        match_id: &str,
        player1: (UserId, &str),
        player2: (UserId, &str),
    ) -> RoomResult<Self> {
        let mut room = Self::new(game_type, player1.0, player1.1, 0)?;
        room.join(player2.0, player2.1)?;
        room.set_ready(player2.0, true)?;
        room.tournament_match = Some(TournamentMatchRef {
            tournament_id,
            match_id: match_id.to_string(),
        });
        Ok(room)
    }

    pub fn is_full(&self) -> bool {
        self.players.len() >= self.capacity
    }

    pub fn contains(&self, user_id: UserId) -> bool {
        self.players.iter().any(|p| p.user_id == user_id)
    }

    pub fn host(&self) -> Option<&RoomPlayer> {
        self.players.iter().find(|p| p.is_host)
    }

    pub fn all_ready(&self) -> bool {
        self.players.iter().all(|p| p.is_ready)
    }

    /// Seat a player
    pub fn join(&mut self, user_id: UserId, username: &str) -> RoomResult<()> {
        if self.status != RoomStatus::Waiting {
            return Err(RoomError::InvalidState { status: self.status });
        }
        if self.contains(user_id) {
            return Err(RoomError::AlreadyJoined);
        }
        if self.is_full() {
            return Err(RoomError::Full);
        }
        self.players.push(RoomPlayer::new(user_id, username, false));
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Remove a player. An emptied room is cancelled; if the host leaves,
    /// the earliest-joined remaining player becomes host.
    pub fn leave(&mut self, user_id: UserId) -> RoomResult<()> {
        if self.status.is_terminal() {
            return Err(RoomError::InvalidState { status: self.status });
        }
        let idx = self
            .players
            .iter()
            .position(|p| p.user_id == user_id)
            .ok_or(RoomError::NotInRoom(user_id))?;

        let was_host = self.players[idx].is_host;
        self.players.remove(idx);

        if self.players.is_empty() {
            self.status = RoomStatus::Cancelled;
        } else if was_host {
            if let Some(next) = self
                .players
                .iter_mut()
                .min_by_key(|p| p.joined_at)
            {
                next.is_host = true;
            }
        }
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Flip a player's ready flag
    pub fn set_ready(&mut self, user_id: UserId, ready: bool) -> RoomResult<()> {
        if self.status != RoomStatus::Waiting {
            return Err(RoomError::InvalidState { status: self.status });
        }
        let player = self
            .players
            .iter_mut()
            .find(|p| p.user_id == user_id)
            .ok_or(RoomError::NotInRoom(user_id))?;
        player.is_ready = ready;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Begin the game. Needs at least two seated players, all ready.
    pub fn start(&mut self) -> RoomResult<()> {
        if self.status != RoomStatus::Waiting {
            return Err(RoomError::InvalidState { status: self.status });
        }
        if self.players.len() < 2 {
            return Err(RoomError::NotEnoughPlayers {
                needed: 2,
                current: self.players.len(),
            });
        }
        if !self.all_ready() {
            return Err(RoomError::PlayersNotReady);
        }
        self.status = RoomStatus::InProgress;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Record the final result. `winner` of `None` means a draw, which a
    /// bracket-linked room rejects: the match needs someone to advance.
    ///
    /// A completed room rejects further reports, which is what makes the
    /// downstream stat propagation exactly-once.
    pub fn complete(&mut self, winner: Option<UserId>, game_data: serde_json::Value) -> RoomResult<()> {
        match self.status {
            RoomStatus::InProgress => {}
            RoomStatus::Completed => return Err(RoomError::AlreadyCompleted),
            status => return Err(RoomError::InvalidState { status }),
        }
        if winner.is_none() && self.tournament_match.is_some() {
            return Err(RoomError::DrawNotAllowed);
        }
        if let Some(winner_id) = winner {
            if !self.contains(winner_id) {
                return Err(RoomError::InvalidWinner(winner_id));
            }
        }
        self.winner = winner;
        self.game_data = game_data;
        self.status = RoomStatus::Completed;
        self.updated_at = Utc::now();
        Ok(())
    }
}
