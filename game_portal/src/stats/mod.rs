//! Player statistics: profile aggregate, game-result propagation, and
//! leaderboards.
//!
//! Every completed game applies exactly one deterministic update to each
//! participant's profile; tournament payouts arrive through the same
//! manager as prize awards.

pub mod errors;
pub mod manager;
pub mod models;

pub use errors::{StatsError, StatsResult};
pub use manager::{LeaderboardEntry, StatsManager};
pub use models::{GameOutcome, GameRecord, PlayerProfile};
