//! # Game Portal
//!
//! A multiplayer casual-gaming portal backend: single-elimination
//! tournaments, game session rooms, player stats, and accounts.
//!
//! ## Architecture
//!
//! The heart of the library is the tournament bracket engine, written as
//! pure functions over immutable snapshots. Every operation on a
//! tournament either fails or produces a [`tournament::Transition`]: the
//! next snapshot plus the side-effect intents (notifications, prize
//! awards) it implies. Managers own everything impure — persistence,
//! per-aggregate locking, and effect dispatch.
//!
//! A tournament moves through `upcoming → registration → in_progress →
//! completed | cancelled`. Seeds are assigned in registration order and
//! never change; brackets pair consecutive seeds; byes resolve as
//! walkovers and later rounds fill lazily as results arrive.
//!
//! ## Core Modules
//!
//! - [`tournament`]: bracket engine, lifecycle, and result propagation
//! - [`room`]: game session lobbies and result reporting
//! - [`stats`]: player profiles, stat propagation, leaderboards
//! - [`auth`]: accounts, sessions, email verification, password reset
//! - [`notify`]: fire-and-forget portal event broadcast
//! - [`db`]: PostgreSQL pool management
//!
//! ## Example
//!
//! ```
//! use game_portal::tournament::{engine, GameType, PrizeTable, Tournament, TournamentFormat};
//!
//! let t = Tournament::new(
//!     "Friday Night Cup".to_string(),
//!     GameType::TicTacToe,
//!     TournamentFormat::SingleElimination,
//!     2,
//!     8,
//!     PrizeTable::default(),
//! );
//! let t = engine::open_registration(&t).unwrap().tournament;
//! let t = engine::register(&t, 1, "alice").unwrap().tournament;
//! assert_eq!(t.participants[0].seed, 1);
//! ```

/// Accounts, sessions, and tokens.
pub mod auth;
pub use auth::{AuthError, AuthManager};

/// PostgreSQL pool management.
pub mod db;
pub use db::{Database, DatabaseConfig};

/// Portal event broadcast.
pub mod notify;
pub use notify::{Notifier, PortalEvent};

/// Game session rooms.
pub mod room;
pub use room::{GameRoom, RoomError, RoomManager};

/// Player profiles and leaderboards.
pub mod stats;
pub use stats::{GameOutcome, PlayerProfile, StatsError, StatsManager};

/// Tournament brackets and lifecycle.
pub mod tournament;
pub use tournament::{
    GameType, Tournament, TournamentError, TournamentFormat, TournamentManager, TournamentStatus,
};
