//! Single-elimination tournaments.
//!
//! The bracket lifecycle is implemented as pure functions over an
//! immutable [`Tournament`] snapshot ([`engine`]): each operation either
//! fails with a [`TournamentError`] or returns a [`engine::Transition`]
//! holding the next snapshot plus the side-effect intents it produced.
//! [`TournamentManager`] owns persistence, per-aggregate locking, and
//! effect dispatch.

pub mod engine;
pub mod errors;
pub mod manager;
pub mod models;

pub use engine::{Effect, Transition};
pub use errors::{TournamentError, TournamentResult};
pub use manager::TournamentManager;
pub use models::{
    BracketMatch, GameType, MatchStatus, Participant, Prize, PrizeTable, Round, Standing,
    Tournament, TournamentFormat, TournamentId, TournamentStatus, UserId,
};
