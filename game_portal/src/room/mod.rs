//! Game session rooms.
//!
//! A room is the lobby and bookkeeping around one game: who is seated,
//! who is ready, the stake, and the final result. The game itself is
//! played client-side; the portal only validates the lifecycle and
//! propagates the reported result into player stats. Rooms spawned for a
//! bracket match carry a link back to it so the result also feeds the
//! tournament.

pub mod errors;
pub mod manager;
pub mod models;

pub use errors::{RoomError, RoomResult};
pub use manager::RoomManager;
pub use models::{GameRoom, RoomPlayer, RoomStatus, TournamentMatchRef};
