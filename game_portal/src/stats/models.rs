//! Player profile aggregate and the stat-propagation rules.

use crate::tournament::models::{GameType, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Experience needed per level
pub const EXPERIENCE_PER_LEVEL: i64 = 1000;

/// Coins a fresh profile starts with
pub const STARTING_COINS: i64 = 100;

/// Outcome of a completed game from one player's perspective
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameOutcome {
    Win,
    Lose,
    Draw,
}

/// Per-game-type counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameRecord {
    pub played: u32,
    pub won: u32,
    pub lost: u32,
    pub draw: u32,
}

/// Player profile aggregate. Mutated exactly once per completed game by
/// the result-propagation step, never retroactively.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerProfile {
    pub user_id: UserId,
    pub username: String,
    pub score: i64,
    pub coins: i64,
    pub experience: i64,
    pub level: i64,
    pub games_played: u32,
    pub games_won: u32,
    pub games_lost: u32,
    pub games_draw: u32,
    pub win_streak: u32,
    pub best_win_streak: u32,
    /// Counters keyed by the stable game-type string
    pub game_stats: BTreeMap<String, GameRecord>,
    /// Badges earned from tournament placings
    pub badges: Vec<String>,
    pub updated_at: DateTime<Utc>,
}

impl PlayerProfile {
    pub fn new(user_id: UserId, username: String) -> Self {
        Self {
            user_id,
            username,
            score: 0,
            coins: STARTING_COINS,
            experience: 0,
            level: 1,
            games_played: 0,
            games_won: 0,
            games_lost: 0,
            games_draw: 0,
            win_streak: 0,
            best_win_streak: 0,
            game_stats: BTreeMap::new(),
            badges: Vec::new(),
            updated_at: Utc::now(),
        }
    }

    /// Apply a single game outcome.
    ///
    /// - win: +100 score, stake pays out double, streak extended
    /// - lose: +10 score, streak reset
    /// - draw: draw counters only
    ///
    /// Experience always increases (100/50/25 for win/draw/lose) and level
    /// is a pure function of cumulative experience, so it never drops.
    pub fn apply_outcome(&mut self, game_type: GameType, outcome: GameOutcome, stake: i64) {
        self.games_played += 1;
        let record = self.game_stats.entry(game_type.as_str().to_string()).or_default();
        record.played += 1;

        match outcome {
            GameOutcome::Win => {
                record.won += 1;
                self.games_won += 1;
                self.score += 100;
                self.coins += stake * 2;
                self.win_streak += 1;
                if self.win_streak > self.best_win_streak {
                    self.best_win_streak = self.win_streak;
                }
                self.experience += 100;
            }
            GameOutcome::Lose => {
                record.lost += 1;
                self.games_lost += 1;
                self.score += 10;
                self.win_streak = 0;
                self.experience += 25;
            }
            GameOutcome::Draw => {
                record.draw += 1;
                self.games_draw += 1;
                self.experience += 50;
            }
        }

        self.level = self.experience / EXPERIENCE_PER_LEVEL + 1;
        self.updated_at = Utc::now();
    }

    /// Credit a tournament payout
    pub fn award_prize(&mut self, coins: i64, points: i64, badge: Option<String>) {
        self.coins += coins;
        self.score += points;
        if let Some(badge) = badge {
            if !self.badges.contains(&badge) {
                self.badges.push(badge);
            }
        }
        self.updated_at = Utc::now();
    }

    /// Win percentage, rounded down
    pub fn win_rate(&self) -> u32 {
        if self.games_played == 0 {
            0
        } else {
            self.games_won * 100 / self.games_played
        }
    }

    /// Counters for one game type, zeroed if never played
    pub fn record_for(&self, game_type: GameType) -> GameRecord {
        self.game_stats
            .get(game_type.as_str())
            .copied()
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> PlayerProfile {
        PlayerProfile::new(1, "alice".to_string())
    }

    #[test]
    fn test_win_updates_all_counters() {
        let mut p = profile();
        p.apply_outcome(GameType::Ludo, GameOutcome::Win, 50);

        assert_eq!(p.score, 100);
        assert_eq!(p.coins, STARTING_COINS + 100);
        assert_eq!(p.experience, 100);
        assert_eq!(p.win_streak, 1);
        assert_eq!(p.best_win_streak, 1);
        assert_eq!(p.games_played, 1);
        assert_eq!(p.games_won, 1);
        assert_eq!(p.record_for(GameType::Ludo).won, 1);
    }

    #[test]
    fn test_lose_resets_streak() {
        let mut p = profile();
        p.apply_outcome(GameType::Uno, GameOutcome::Win, 0);
        p.apply_outcome(GameType::Uno, GameOutcome::Win, 0);
        assert_eq!(p.win_streak, 2);

        p.apply_outcome(GameType::Uno, GameOutcome::Lose, 0);
        assert_eq!(p.win_streak, 0);
        assert_eq!(p.best_win_streak, 2);
        assert_eq!(p.score, 210);
        assert_eq!(p.games_lost, 1);
    }

    #[test]
    fn test_draw_changes_no_score_or_coins() {
        let mut p = profile();
        p.apply_outcome(GameType::Bingo, GameOutcome::Draw, 25);

        assert_eq!(p.score, 0);
        assert_eq!(p.coins, STARTING_COINS);
        assert_eq!(p.experience, 50);
        assert_eq!(p.games_draw, 1);
        assert_eq!(p.record_for(GameType::Bingo).draw, 1);
    }

    #[test]
    fn test_level_is_pure_function_of_experience() {
        let mut p = profile();
        assert_eq!(p.level, 1);

        // 10 wins = 1000 experience
        for _ in 0..10 {
            p.apply_outcome(GameType::TicTacToe, GameOutcome::Win, 0);
        }
        assert_eq!(p.experience, 1000);
        assert_eq!(p.level, 2);

        // Losses still raise experience; level never drops
        p.apply_outcome(GameType::TicTacToe, GameOutcome::Lose, 0);
        assert_eq!(p.experience, 1025);
        assert_eq!(p.level, 2);
    }

    #[test]
    fn test_award_prize() {
        let mut p = profile();
        p.award_prize(500, 100, Some("champion".to_string()));
        p.award_prize(0, 0, Some("champion".to_string()));

        assert_eq!(p.coins, STARTING_COINS + 500);
        assert_eq!(p.score, 100);
        assert_eq!(p.badges, vec!["champion".to_string()]);
    }

    #[test]
    fn test_win_rate() {
        let mut p = profile();
        assert_eq!(p.win_rate(), 0);
        p.apply_outcome(GameType::Ludo, GameOutcome::Win, 0);
        p.apply_outcome(GameType::Ludo, GameOutcome::Lose, 0);
        p.apply_outcome(GameType::Ludo, GameOutcome::Win, 0);
        assert_eq!(p.win_rate(), 66);
    }
}
