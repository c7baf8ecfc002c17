//! Stats manager: persistence and leaderboards for player profiles.
//!
//! Each profile is stored as one JSONB document with the score mirrored
//! into a column for leaderboard ordering. Mutations take a row lock so
//! that concurrent reports for the same player serialize, while reports
//! for different players proceed in parallel.

use super::{
    errors::{StatsError, StatsResult},
    models::{GameOutcome, PlayerProfile},
};
use crate::tournament::models::{GameType, UserId};
use serde::Serialize;
use sqlx::{PgPool, Row};
use std::sync::Arc;

/// One leaderboard row
#[derive(Debug, Clone, Serialize)]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub user_id: UserId,
    pub username: String,
    pub score: i64,
    pub level: i64,
    pub games_won: u32,
}

/// Stats manager
#[derive(Clone)]
pub struct StatsManager {
    pool: Arc<PgPool>,
}

impl StatsManager {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    /// Create a fresh profile for a new user
    pub async fn create_profile(&self, user_id: UserId, username: &str) -> StatsResult<PlayerProfile> {
        let existing = sqlx::query("SELECT user_id FROM player_profiles WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(self.pool.as_ref())
            .await?;
        if existing.is_some() {
            return Err(StatsError::ProfileExists(user_id));
        }

        let profile = PlayerProfile::new(user_id, username.to_string());
        let document = serde_json::to_value(&profile)?;
        sqlx::query(
            r#"
            INSERT INTO player_profiles (user_id, username, score, document, updated_at)
            VALUES ($1, $2, $3, $4, NOW())
            "#,
        )
        .bind(user_id)
        .bind(username)
        .bind(profile.score)
        .bind(document)
        .execute(self.pool.as_ref())
        .await?;

        Ok(profile)
    }

    /// Fetch a profile
    pub async fn get_profile(&self, user_id: UserId) -> StatsResult<PlayerProfile> {
        let row = sqlx::query("SELECT document FROM player_profiles WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(self.pool.as_ref())
            .await?
            .ok_or(StatsError::ProfileNotFound(user_id))?;

        Ok(serde_json::from_value(row.get("document"))?)
    }

    /// Apply one game outcome to a player's profile.
    ///
    /// Runs in a transaction with a row lock: exactly one application per
    /// completed game, serialized per player.
    pub async fn apply_game_result(
        &self,
        user_id: UserId,
        game_type: GameType,
        outcome: GameOutcome,
        stake: i64,
    ) -> StatsResult<PlayerProfile> {
        self.mutate(user_id, |profile| {
            profile.apply_outcome(game_type, outcome, stake);
        })
        .await
    }

    /// Credit a tournament payout to a player's profile
    pub async fn award_prize(
        &self,
        user_id: UserId,
        coins: i64,
        points: i64,
        badge: Option<String>,
    ) -> StatsResult<PlayerProfile> {
        self.mutate(user_id, |profile| {
            profile.award_prize(coins, points, badge);
        })
        .await
    }

    /// Read-modify-write a profile document under a row lock
    async fn mutate<F>(&self, user_id: UserId, f: F) -> StatsResult<PlayerProfile>
    where
        F: FnOnce(&mut PlayerProfile),
    {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query("SELECT document FROM player_profiles WHERE user_id = $1 FOR UPDATE")
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(StatsError::ProfileNotFound(user_id))?;

        let mut profile: PlayerProfile = serde_json::from_value(row.get("document"))?;
        f(&mut profile);

        let document = serde_json::to_value(&profile)?;
        sqlx::query(
            "UPDATE player_profiles SET document = $1, score = $2, updated_at = NOW() WHERE user_id = $3",
        )
        .bind(document)
        .bind(profile.score)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(profile)
    }

    /// Leaderboard: global score order, or per-game wins when a game type
    /// is given. Banned users are excluded.
    pub async fn leaderboard(
        &self,
        game_type: Option<GameType>,
        limit: i64,
    ) -> StatsResult<Vec<LeaderboardEntry>> {
        // game_type.as_str() comes from a fixed enum, never from user input
        let query = match game_type {
            Some(gt) => format!(
                r#"
                SELECT p.document
                FROM player_profiles p
                JOIN users u ON u.id = p.user_id
                WHERE NOT u.is_banned
                ORDER BY COALESCE((p.document #>> '{{game_stats,{},won}}')::BIGINT, 0) DESC
                LIMIT $1
                "#,
                gt.as_str()
            ),
            None => r#"
                SELECT p.document
                FROM player_profiles p
                JOIN users u ON u.id = p.user_id
                WHERE NOT u.is_banned
                ORDER BY p.score DESC
                LIMIT $1
                "#
            .to_string(),
        };

        let rows = sqlx::query(&query)
            .bind(limit)
            .fetch_all(self.pool.as_ref())
            .await?;

        let mut entries = Vec::with_capacity(rows.len());
        for (i, row) in rows.into_iter().enumerate() {
            let profile: PlayerProfile = serde_json::from_value(row.get("document"))?;
            let games_won = match game_type {
                Some(gt) => profile.record_for(gt).won,
                None => profile.games_won,
            };
            entries.push(LeaderboardEntry {
                rank: i + 1,
                user_id: profile.user_id,
                username: profile.username,
                score: profile.score,
                level: profile.level,
                games_won,
            });
        }

        Ok(entries)
    }
}
