//! Room manager: persistence and stat propagation for game sessions.
//!
//! Rooms are stored as JSONB documents keyed by UUID and mutated under a
//! row lock, so concurrent joins or duplicate result reports for the same
//! room serialize. Stat propagation for a completed game runs after the
//! room state commits: the `complete` transition is what guarantees each
//! game is applied to profiles exactly once.

use super::{
    errors::{RoomError, RoomResult},
    models::{GameRoom, RoomStatus},
};
use crate::{
    notify::{Notifier, PortalEvent},
    stats::{GameOutcome, StatsManager},
    tournament::models::{GameType, TournamentId, UserId},
};
use sqlx::{PgPool, Row};
use std::sync::Arc;
use uuid::Uuid;

/// Room manager
#[derive(Clone)]
pub struct RoomManager {
    pool: Arc<PgPool>,
    stats: Arc<StatsManager>,
    notifier: Notifier,
}

impl RoomManager {
    pub fn new(pool: Arc<PgPool>, stats: Arc<StatsManager>, notifier: Notifier) -> Self {
        Self {
            pool,
            stats,
            notifier,
        }
    }

    /// Create a room hosted by `host_id`
    pub async fn create_room(
        &self,
        game_type: GameType,
        host_id: UserId,
        host_name: &str,
        stake: i64,
    ) -> RoomResult<GameRoom> {
        let room = GameRoom::new(game_type, host_id, host_name, stake)?;
        self.insert(&room).await?;

        self.notifier.publish(PortalEvent::RoomCreated {
            room_id: room.room_id,
            game_type: room.game_type,
        });
        log::info!("Created {} room {}", game_type.as_str(), room.room_id);
        Ok(room)
    }

    /// Create a room for a bracket match, pre-seating both players
    pub async fn create_match_room(
        &self,
        game_type: GameType,
        tournament_id: TournamentId,
        match_id: &str,
        player1: (UserId, &str),
        player2: (UserId, &str),
    ) -> RoomResult<GameRoom> {
        let room = GameRoom::for_match(game_type, tournament_id, match_id, player1, player2)?;
        self.insert(&room).await?;

        self.notifier.publish(PortalEvent::RoomCreated {
            room_id: room.room_id,
            game_type: room.game_type,
        });
        Ok(room)
    }

    /// Fetch a room
    pub async fn get_room(&self, room_id: Uuid) -> RoomResult<GameRoom> {
        let row = sqlx::query("SELECT document FROM game_rooms WHERE room_id = $1")
            .bind(room_id)
            .fetch_optional(self.pool.as_ref())
            .await?
            .ok_or(RoomError::NotFound(room_id))?;

        Ok(serde_json::from_value(row.get("document"))?)
    }

    /// List rooms, newest first, optionally filtered
    pub async fn list_rooms(
        &self,
        status: Option<RoomStatus>,
        game_type: Option<GameType>,
    ) -> RoomResult<Vec<GameRoom>> {
        let rows = sqlx::query(
            r#"
            SELECT document FROM game_rooms
            WHERE ($1::TEXT IS NULL OR status = $1)
              AND ($2::TEXT IS NULL OR game_type = $2)
            ORDER BY created_at DESC
            "#,
        )
        .bind(status.map(|s| s.as_str()))
        .bind(game_type.map(|g| g.as_str()))
        .fetch_all(self.pool.as_ref())
        .await?;

        rows.into_iter()
            .map(|row| Ok(serde_json::from_value(row.get("document"))?))
            .collect()
    }

    /// Seat a player in a waiting room
    pub async fn join_room(&self, room_id: Uuid, user_id: UserId, username: &str) -> RoomResult<GameRoom> {
        let room = self
            .mutate(room_id, |room| room.join(user_id, username))
            .await?;

        self.notifier.publish(PortalEvent::PlayerJoinedRoom {
            room_id,
            user_id,
            username: username.to_string(),
        });
        Ok(room)
    }

    /// Remove a player from a room
    pub async fn leave_room(&self, room_id: Uuid, user_id: UserId) -> RoomResult<GameRoom> {
        let room = self.mutate(room_id, |room| room.leave(user_id)).await?;

        self.notifier
            .publish(PortalEvent::PlayerLeftRoom { room_id, user_id });
        if room.status == RoomStatus::Cancelled {
            log::info!("Room {room_id} emptied out, cancelled");
        }
        Ok(room)
    }

    /// Flip a player's ready flag
    pub async fn set_ready(&self, room_id: Uuid, user_id: UserId, ready: bool) -> RoomResult<GameRoom> {
        self.mutate(room_id, |room| room.set_ready(user_id, ready)).await
    }

    /// Begin the game
    pub async fn start_room(&self, room_id: Uuid) -> RoomResult<GameRoom> {
        self.mutate(room_id, |room| room.start()).await
    }

    /// Record a finished game and propagate stats to every player.
    ///
    /// `winner` of `None` means a draw. Stat updates run after the room
    /// commits; a failed profile update is logged and does not undo the
    /// completed room.
    pub async fn report_result(
        &self,
        room_id: Uuid,
        winner: Option<UserId>,
        game_data: serde_json::Value,
    ) -> RoomResult<GameRoom> {
        let room = self
            .mutate(room_id, |room| room.complete(winner, game_data))
            .await?;

        for player in &room.players {
            let outcome = match room.winner {
                Some(winner_id) if winner_id == player.user_id => GameOutcome::Win,
                Some(_) => GameOutcome::Lose,
                None => GameOutcome::Draw,
            };
            if let Err(e) = self
                .stats
                .apply_game_result(player.user_id, room.game_type, outcome, room.stake)
                .await
            {
                log::error!(
                    "Failed to apply result of room {room_id} to user {}: {e}",
                    player.user_id
                );
            }
        }

        self.notifier.publish(PortalEvent::GameCompleted {
            room_id,
            winner: room.winner,
        });
        Ok(room)
    }

    async fn insert(&self, room: &GameRoom) -> RoomResult<()> {
        let document = serde_json::to_value(room)?;
        sqlx::query(
            r#"
            INSERT INTO game_rooms (room_id, game_type, status, document, created_at, updated_at)
            VALUES ($1, $2, $3, $4, NOW(), NOW())
            "#,
        )
        .bind(room.room_id)
        .bind(room.game_type.as_str())
        .bind(room.status.as_str())
        .bind(document)
        .execute(self.pool.as_ref())
        .await?;
        Ok(())
    }

    /// Read-modify-write a room document under a row lock
    async fn mutate<F>(&self, room_id: Uuid, f: F) -> RoomResult<GameRoom>
    where
        F: FnOnce(&mut GameRoom) -> RoomResult<()>,
    {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query("SELECT document FROM game_rooms WHERE room_id = $1 FOR UPDATE")
            .bind(room_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(RoomError::NotFound(room_id))?;

        let mut room: GameRoom = serde_json::from_value(row.get("document"))?;
        f(&mut room)?;

        let document = serde_json::to_value(&room)?;
        sqlx::query(
            "UPDATE game_rooms SET document = $1, status = $2, updated_at = NOW() WHERE room_id = $3",
        )
        .bind(document)
        .bind(room.status.as_str())
        .bind(room_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(room)
    }
}
