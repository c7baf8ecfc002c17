//! Game room, leaderboard, and profile API handlers.
//!
//! Rooms carry the lobby state for one game session; results reported here
//! flow into player stats exactly once. The games themselves are played
//! client-side.

use axum::{
    Json,
    extract::{Extension, Path, Query, State},
    http::StatusCode,
};
use game_portal::auth::AccessTokenClaims;
use game_portal::room::{GameRoom, RoomError, RoomStatus};
use game_portal::stats::{LeaderboardEntry, PlayerProfile, StatsError};
use game_portal::tournament::{GameType, TournamentStatus};
use serde::Deserialize;
use uuid::Uuid;

use super::{AppState, ErrorResponse};
use crate::metrics;

type HandlerError = (StatusCode, Json<ErrorResponse>);

/// Map a room error onto an HTTP status and a client-safe body
pub(super) fn room_error(e: RoomError) -> HandlerError {
    let status = match &e {
        RoomError::NotFound(_) => StatusCode::NOT_FOUND,
        RoomError::AlreadyJoined | RoomError::AlreadyCompleted | RoomError::Full => {
            StatusCode::CONFLICT
        }
        RoomError::Database(_) | RoomError::Serialization(_) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse::new("Internal server error"),
            );
        }
        _ => StatusCode::BAD_REQUEST,
    };
    (status, ErrorResponse::new(e.to_string()))
}

fn stats_error(e: StatsError) -> HandlerError {
    match &e {
        StatsError::ProfileNotFound(_) => (StatusCode::NOT_FOUND, ErrorResponse::new(e.to_string())),
        StatsError::ProfileExists(_) => (StatusCode::CONFLICT, ErrorResponse::new(e.to_string())),
        StatsError::Database(_) | StatsError::Serialization(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorResponse::new("Internal server error"),
        ),
    }
}

fn parse_game_type(s: &str) -> Result<GameType, HandlerError> {
    GameType::parse(s).ok_or_else(|| {
        (
            StatusCode::BAD_REQUEST,
            ErrorResponse::new(format!("Unknown game type: {s}")),
        )
    })
}

#[derive(Debug, Deserialize)]
pub struct CreateRoomPayload {
    pub game_type: String,
    #[serde(default)]
    pub stake: i64,
}

#[derive(Debug, Deserialize)]
pub struct ListRoomsQuery {
    pub status: Option<String>,
    pub game_type: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ReadyPayload {
    pub ready: bool,
}

#[derive(Debug, Deserialize)]
pub struct RoomResultPayload {
    /// Absent for a draw
    pub winner_id: Option<i64>,
    #[serde(default)]
    pub game_data: serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub struct LeaderboardQuery {
    pub game_type: Option<String>,
    pub limit: Option<i64>,
}

/// Create a room hosted by the authenticated user.
pub async fn create_room(
    State(state): State<AppState>,
    Extension(claims): Extension<AccessTokenClaims>,
    Json(payload): Json<CreateRoomPayload>,
) -> Result<(StatusCode, Json<GameRoom>), HandlerError> {
    let game_type = parse_game_type(&payload.game_type)?;

    state
        .room_manager
        .create_room(game_type, claims.sub, &claims.username, payload.stake)
        .await
        .map(|room| (StatusCode::CREATED, Json(room)))
        .map_err(room_error)
}

/// List rooms, newest first.
///
/// # Query Parameters
///
/// - `status`: Optional filter (`waiting`, `in_progress`, `completed`, `cancelled`)
/// - `game_type`: Optional filter (`tictactoe`, `ludo`, ...)
pub async fn list_rooms(
    State(state): State<AppState>,
    Query(query): Query<ListRoomsQuery>,
) -> Result<Json<Vec<GameRoom>>, HandlerError> {
    let status = match query.status.as_deref() {
        Some(s) => Some(RoomStatus::parse(s).ok_or_else(|| {
            (
                StatusCode::BAD_REQUEST,
                ErrorResponse::new(format!("Unknown status filter: {s}")),
            )
        })?),
        None => None,
    };
    let game_type = match query.game_type.as_deref() {
        Some(s) => Some(parse_game_type(s)?),
        None => None,
    };

    state
        .room_manager
        .list_rooms(status, game_type)
        .await
        .map(Json)
        .map_err(room_error)
}

/// Room details.
pub async fn get_room(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<GameRoom>, HandlerError> {
    state.room_manager.get_room(id).await.map(Json).map_err(room_error)
}

/// Seat the authenticated user in a waiting room.
pub async fn join_room(
    State(state): State<AppState>,
    Extension(claims): Extension<AccessTokenClaims>,
    Path(id): Path<Uuid>,
) -> Result<Json<GameRoom>, HandlerError> {
    state
        .room_manager
        .join_room(id, claims.sub, &claims.username)
        .await
        .map(Json)
        .map_err(room_error)
}

/// Remove the authenticated user from a room.
///
/// An emptied room is cancelled; a departing host hands the room to the
/// earliest-joined remaining player.
pub async fn leave_room(
    State(state): State<AppState>,
    Extension(claims): Extension<AccessTokenClaims>,
    Path(id): Path<Uuid>,
) -> Result<Json<GameRoom>, HandlerError> {
    state
        .room_manager
        .leave_room(id, claims.sub)
        .await
        .map(Json)
        .map_err(room_error)
}

/// Flip the authenticated user's ready flag.
pub async fn set_ready(
    State(state): State<AppState>,
    Extension(claims): Extension<AccessTokenClaims>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ReadyPayload>,
) -> Result<Json<GameRoom>, HandlerError> {
    state
        .room_manager
        .set_ready(id, claims.sub, payload.ready)
        .await
        .map(Json)
        .map_err(room_error)
}

/// Begin the game. Needs at least two seated players, all ready.
pub async fn start_room(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<GameRoom>, HandlerError> {
    state.room_manager.start_room(id).await.map(Json).map_err(room_error)
}

/// Report a finished game.
///
/// `winner_id` of `null` records a draw. Stats are propagated to every
/// player exactly once; duplicate reports return `409 Conflict`. A room
/// spawned for a bracket match forwards its winner into the tournament.
pub async fn report_result(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<RoomResultPayload>,
) -> Result<Json<GameRoom>, HandlerError> {
    let room = state
        .room_manager
        .report_result(id, payload.winner_id, payload.game_data)
        .await
        .map_err(room_error)?;

    metrics::games_completed_total(room.game_type.as_str());

    // Linked rooms never complete as a draw, so the winner is present here
    if let (Some(link), Some(winner)) = (&room.tournament_match, room.winner) {
        match state
            .tournament_manager
            .report_match_result(link.tournament_id, &link.match_id, winner)
            .await
        {
            Ok(tournament) => {
                metrics::match_results_total(tournament.game_type.as_str());
                if tournament.status == TournamentStatus::Completed {
                    metrics::tournaments_completed_total();
                }
            }
            Err(e) => tracing::error!(
                "Room {id} completed but match {} of tournament {} rejected the result: {e}",
                link.match_id,
                link.tournament_id
            ),
        }
    }

    Ok(Json(room))
}

/// Leaderboard, ordered by total score, or by per-game wins when a game
/// type is given. Banned users are excluded.
pub async fn leaderboard(
    State(state): State<AppState>,
    Query(query): Query<LeaderboardQuery>,
) -> Result<Json<Vec<LeaderboardEntry>>, HandlerError> {
    let game_type = match query.game_type.as_deref() {
        Some(s) => Some(parse_game_type(s)?),
        None => None,
    };
    let limit = query
        .limit
        .unwrap_or(state.leaderboard_limit)
        .clamp(1, state.leaderboard_limit);

    state
        .stats_manager
        .leaderboard(game_type, limit)
        .await
        .map(Json)
        .map_err(stats_error)
}

/// A player's public profile.
pub async fn get_profile(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<Json<PlayerProfile>, HandlerError> {
    state
        .stats_manager
        .get_profile(user_id)
        .await
        .map(Json)
        .map_err(stats_error)
}
