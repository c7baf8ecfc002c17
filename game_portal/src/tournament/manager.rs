//! Tournament manager: persistence, per-aggregate serialization, and
//! effect dispatch.
//!
//! Each tournament is stored as a single JSONB document and mutated with
//! read-modify-write. All mutating operations on one tournament id are
//! serialized behind a per-aggregate async lock (lazy bracket population
//! is not commutative under concurrent writers), while different
//! tournaments proceed fully in parallel. Effects are dispatched after
//! the save; a failed notification or stat update is logged and never
//! rolls the transition back.

use super::{
    engine::{self, Effect, Transition},
    errors::{TournamentError, TournamentResult},
    models::{Standing, Tournament, TournamentId, TournamentStatus, UserId},
};
use crate::{notify::{Notifier, PortalEvent}, stats::StatsManager};
use sqlx::{PgPool, Row};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Tournament manager
#[derive(Clone)]
pub struct TournamentManager {
    pool: Arc<PgPool>,
    stats: Arc<StatsManager>,
    notifier: Notifier,
    locks: Arc<Mutex<HashMap<TournamentId, Arc<Mutex<()>>>>>,
}

impl TournamentManager {
    pub fn new(pool: Arc<PgPool>, stats: Arc<StatsManager>, notifier: Notifier) -> Self {
        Self {
            pool,
            stats,
            notifier,
            locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Persist a new tournament and return it with its assigned id
    pub async fn create_tournament(&self, mut tournament: Tournament) -> TournamentResult<Tournament> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(
            r#"
            INSERT INTO tournaments (name, game_type, status, document)
            VALUES ($1, $2, $3, '{}'::jsonb)
            RETURNING id
            "#,
        )
        .bind(&tournament.name)
        .bind(tournament.game_type.as_str())
        .bind(tournament.status.as_str())
        .fetch_one(&mut *tx)
        .await?;

        tournament.id = row.get("id");
        let document = serde_json::to_value(&tournament)?;
        sqlx::query("UPDATE tournaments SET document = $1 WHERE id = $2")
            .bind(document)
            .bind(tournament.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        log::info!("Created tournament {} '{}'", tournament.id, tournament.name);
        Ok(tournament)
    }

    /// Fetch a tournament aggregate
    pub async fn get_tournament(&self, id: TournamentId) -> TournamentResult<Tournament> {
        let row = sqlx::query("SELECT document FROM tournaments WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool.as_ref())
            .await?
            .ok_or(TournamentError::NotFound(id))?;

        Ok(serde_json::from_value(row.get("document"))?)
    }

    /// List tournaments, newest first, optionally filtered by status
    pub async fn list_tournaments(
        &self,
        status: Option<TournamentStatus>,
    ) -> TournamentResult<Vec<Tournament>> {
        let rows = match status {
            Some(status) => {
                sqlx::query(
                    "SELECT document FROM tournaments WHERE status = $1 ORDER BY created_at DESC",
                )
                .bind(status.as_str())
                .fetch_all(self.pool.as_ref())
                .await?
            }
            None => {
                sqlx::query("SELECT document FROM tournaments ORDER BY created_at DESC")
                    .fetch_all(self.pool.as_ref())
                    .await?
            }
        };

        rows.into_iter()
            .map(|row| Ok(serde_json::from_value(row.get("document"))?))
            .collect()
    }

    /// Register a participant
    pub async fn register(
        &self,
        id: TournamentId,
        user_id: UserId,
        username: &str,
    ) -> TournamentResult<Tournament> {
        self.mutate(id, |t| engine::register(t, user_id, username)).await
    }

    /// Remove a participant before the tournament starts
    pub async fn leave(&self, id: TournamentId, user_id: UserId) -> TournamentResult<Tournament> {
        self.mutate(id, |t| engine::leave(t, user_id)).await
    }

    /// Open registration for an upcoming tournament
    pub async fn open_registration(&self, id: TournamentId) -> TournamentResult<Tournament> {
        self.mutate(id, engine::open_registration).await
    }

    /// Generate brackets and start the tournament
    pub async fn start(&self, id: TournamentId) -> TournamentResult<Tournament> {
        self.mutate(id, engine::start).await
    }

    /// Attach a game session to a bracket match
    pub async fn begin_match(
        &self,
        id: TournamentId,
        match_id: &str,
        game_id: Uuid,
    ) -> TournamentResult<Tournament> {
        self.mutate(id, |t| engine::begin_match(t, match_id, game_id)).await
    }

    /// Report a match result and propagate the winner
    pub async fn report_match_result(
        &self,
        id: TournamentId,
        match_id: &str,
        winner_id: UserId,
    ) -> TournamentResult<Tournament> {
        self.mutate(id, |t| engine::report_match_result(t, match_id, winner_id))
            .await
    }

    /// Cancel a tournament
    pub async fn cancel(&self, id: TournamentId) -> TournamentResult<Tournament> {
        self.mutate(id, engine::cancel).await
    }

    /// Final standings of a completed tournament
    pub async fn standings(&self, id: TournamentId) -> TournamentResult<Vec<Standing>> {
        let tournament = self.get_tournament(id).await?;
        Ok(tournament.standings)
    }

    /// Load-apply-save under the per-tournament lock, then dispatch the
    /// transition's effects
    async fn mutate<F>(&self, id: TournamentId, f: F) -> TournamentResult<Tournament>
    where
        F: FnOnce(&Tournament) -> TournamentResult<Transition>,
    {
        let lock = self.lock_for(id).await;
        let _guard = lock.lock().await;

        let current = self.get_tournament(id).await?;
        let Transition { tournament, effects } = f(&current)?;
        self.save(&tournament).await?;
        self.dispatch(tournament.id, &effects).await;

        // Terminal tournaments never mutate again; keep the lock map from
        // growing without bound
        if tournament.status.is_terminal() {
            self.release_lock(id).await;
        }

        Ok(tournament)
    }

    /// Drop the lock entry of a tournament that can no longer change. A
    /// straggler holding the Arc keeps its clone; a later mutation simply
    /// recreates the entry.
    async fn release_lock(&self, id: TournamentId) {
        self.locks.lock().await.remove(&id);
    }

    async fn save(&self, tournament: &Tournament) -> TournamentResult<()> {
        let document = serde_json::to_value(tournament)?;
        sqlx::query(
            "UPDATE tournaments SET document = $1, status = $2, updated_at = NOW() WHERE id = $3",
        )
        .bind(document)
        .bind(tournament.status.as_str())
        .bind(tournament.id)
        .execute(self.pool.as_ref())
        .await?;
        Ok(())
    }

    async fn lock_for(&self, id: TournamentId) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks.entry(id).or_insert_with(|| Arc::new(Mutex::new(()))).clone()
    }

    /// Dispatch effects best-effort. Committed state is never rolled back
    /// on a dispatch failure.
    async fn dispatch(&self, tournament_id: TournamentId, effects: &[Effect]) {
        for effect in effects {
            match effect {
                Effect::RoundStarted { round } => self.notifier.publish(PortalEvent::RoundStarted {
                    tournament_id,
                    round: *round,
                }),
                Effect::MatchReady {
                    match_id,
                    player1,
                    player2,
                } => self.notifier.publish(PortalEvent::MatchReady {
                    tournament_id,
                    match_id: match_id.clone(),
                    player1: *player1,
                    player2: *player2,
                }),
                Effect::MatchCompleted { match_id, winner } => {
                    self.notifier.publish(PortalEvent::MatchCompleted {
                        tournament_id,
                        match_id: match_id.clone(),
                        winner: *winner,
                    })
                }
                Effect::TournamentCompleted { standings } => {
                    log::info!("Tournament {tournament_id} completed");
                    self.notifier.publish(PortalEvent::TournamentCompleted {
                        tournament_id,
                        standings: standings.clone(),
                    })
                }
                Effect::AwardPrize {
                    user_id,
                    place,
                    coins,
                    points,
                    badge,
                } => {
                    if let Err(e) = self
                        .stats
                        .award_prize(*user_id, *coins, *points, badge.clone())
                        .await
                    {
                        log::error!(
                            "Failed to award place-{place} prize for tournament {tournament_id} to user {user_id}: {e}"
                        );
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> TournamentManager {
        // connect_lazy never touches the network; these tests only exercise
        // the lock map
        let pool = Arc::new(PgPool::connect_lazy("postgres://localhost/unused").unwrap());
        TournamentManager::new(
            pool.clone(),
            Arc::new(StatsManager::new(pool)),
            Notifier::default(),
        )
    }

    #[tokio::test]
    async fn test_lock_map_is_shared_per_tournament() {
        let m = manager();
        let a = m.lock_for(1).await;
        let b = m.lock_for(1).await;
        assert!(Arc::ptr_eq(&a, &b));

        let other = m.lock_for(2).await;
        assert!(!Arc::ptr_eq(&a, &other));
        assert_eq!(m.locks.lock().await.len(), 2);
    }

    #[tokio::test]
    async fn test_terminal_tournaments_release_their_lock() {
        let m = manager();
        let lock = m.lock_for(7).await;
        let guard = lock.lock().await;
        assert_eq!(m.locks.lock().await.len(), 1);

        drop(guard);
        m.release_lock(7).await;
        assert!(m.locks.lock().await.is_empty());

        // A later mutation simply recreates the entry
        let _ = m.lock_for(7).await;
        assert_eq!(m.locks.lock().await.len(), 1);
    }
}
