//! Tournament API handlers.
//!
//! Endpoints covering the whole bracket lifecycle: listing and details,
//! registration, admin-driven state transitions, and match result
//! reporting. Mutations are delegated to the tournament manager, which
//! serializes them per tournament.

use axum::{
    Json,
    extract::{Extension, Path, Query, State},
    http::StatusCode,
};
use game_portal::auth::AccessTokenClaims;
use game_portal::room::GameRoom;
use game_portal::tournament::{
    GameType, MatchStatus, PrizeTable, Standing, Tournament, TournamentError, TournamentFormat,
    TournamentStatus,
};
use serde::Deserialize;

use super::{AppState, ErrorResponse, middleware::require_admin};
use crate::metrics;

type HandlerError = (StatusCode, Json<ErrorResponse>);

/// Map a tournament error onto an HTTP status and a client-safe body
fn tournament_error(e: TournamentError) -> HandlerError {
    let status = match &e {
        TournamentError::NotFound(_) | TournamentError::UnknownMatch(_) => StatusCode::NOT_FOUND,
        TournamentError::AlreadyRegistered
        | TournamentError::MatchAlreadyCompleted(_)
        | TournamentError::MatchInProgress(_) => StatusCode::CONFLICT,
        TournamentError::Database(_) | TournamentError::Serialization(_) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse::new("Internal server error"),
            );
        }
        _ => StatusCode::BAD_REQUEST,
    };
    (status, ErrorResponse::new(e.to_string()))
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateTournamentPayload {
    pub name: String,
    pub description: Option<String>,
    pub game_type: String,
    #[serde(default = "default_format")]
    pub format: TournamentFormat,
    pub min_participants: usize,
    pub max_participants: usize,
    #[serde(default)]
    pub prizes: PrizeTable,
}

fn default_format() -> TournamentFormat {
    TournamentFormat::SingleElimination
}

#[derive(Debug, Deserialize)]
pub struct MatchResultPayload {
    pub winner_id: i64,
}

/// List tournaments, newest first.
///
/// # Query Parameters
///
/// - `status`: Optional lifecycle filter (`upcoming`, `registration`,
///   `in_progress`, `completed`, `cancelled`)
pub async fn list_tournaments(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Tournament>>, HandlerError> {
    let status = match query.status.as_deref() {
        Some(s) => Some(TournamentStatus::parse(s).ok_or_else(|| {
            (
                StatusCode::BAD_REQUEST,
                ErrorResponse::new(format!("Unknown status filter: {s}")),
            )
        })?),
        None => None,
    };

    state
        .tournament_manager
        .list_tournaments(status)
        .await
        .map(Json)
        .map_err(tournament_error)
}

/// Tournament details, including the full bracket.
pub async fn get_tournament(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Tournament>, HandlerError> {
    state
        .tournament_manager
        .get_tournament(id)
        .await
        .map(Json)
        .map_err(tournament_error)
}

/// Final standings of a tournament. Empty until completion.
pub async fn standings(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<Standing>>, HandlerError> {
    state
        .tournament_manager
        .standings(id)
        .await
        .map(Json)
        .map_err(tournament_error)
}

/// Create a tournament (admin only).
pub async fn create_tournament(
    State(state): State<AppState>,
    Extension(claims): Extension<AccessTokenClaims>,
    Json(payload): Json<CreateTournamentPayload>,
) -> Result<(StatusCode, Json<Tournament>), HandlerError> {
    require_admin(&claims).map_err(|s| (s, ErrorResponse::new("Admin access required")))?;

    let game_type = GameType::parse(&payload.game_type).ok_or_else(|| {
        (
            StatusCode::BAD_REQUEST,
            ErrorResponse::new(format!("Unknown game type: {}", payload.game_type)),
        )
    })?;

    let mut tournament = Tournament::new(
        payload.name,
        game_type,
        payload.format,
        payload.min_participants,
        payload.max_participants,
        payload.prizes,
    );
    tournament.description = payload.description;

    state
        .tournament_manager
        .create_tournament(tournament)
        .await
        .map(|t| (StatusCode::CREATED, Json(t)))
        .map_err(tournament_error)
}

/// Open registration (admin only).
pub async fn open_registration(
    State(state): State<AppState>,
    Extension(claims): Extension<AccessTokenClaims>,
    Path(id): Path<i64>,
) -> Result<Json<Tournament>, HandlerError> {
    require_admin(&claims).map_err(|s| (s, ErrorResponse::new("Admin access required")))?;

    state
        .tournament_manager
        .open_registration(id)
        .await
        .map(Json)
        .map_err(tournament_error)
}

/// Generate brackets and start (admin only).
pub async fn start_tournament(
    State(state): State<AppState>,
    Extension(claims): Extension<AccessTokenClaims>,
    Path(id): Path<i64>,
) -> Result<Json<Tournament>, HandlerError> {
    require_admin(&claims).map_err(|s| (s, ErrorResponse::new("Admin access required")))?;

    state
        .tournament_manager
        .start(id)
        .await
        .map(Json)
        .map_err(tournament_error)
}

/// Cancel a tournament (admin only).
pub async fn cancel_tournament(
    State(state): State<AppState>,
    Extension(claims): Extension<AccessTokenClaims>,
    Path(id): Path<i64>,
) -> Result<Json<Tournament>, HandlerError> {
    require_admin(&claims).map_err(|s| (s, ErrorResponse::new("Admin access required")))?;

    state
        .tournament_manager
        .cancel(id)
        .await
        .map(Json)
        .map_err(tournament_error)
}

/// Register the authenticated user as a participant.
///
/// Seeds follow registration order; the seat is kept until the bracket is
/// generated.
pub async fn register(
    State(state): State<AppState>,
    Extension(claims): Extension<AccessTokenClaims>,
    Path(id): Path<i64>,
) -> Result<Json<Tournament>, HandlerError> {
    state
        .tournament_manager
        .register(id, claims.sub, &claims.username)
        .await
        .map(Json)
        .map_err(tournament_error)
}

/// Withdraw the authenticated user before the tournament starts.
pub async fn leave(
    State(state): State<AppState>,
    Extension(claims): Extension<AccessTokenClaims>,
    Path(id): Path<i64>,
) -> Result<Json<Tournament>, HandlerError> {
    state
        .tournament_manager
        .leave(id, claims.sub)
        .await
        .map(Json)
        .map_err(tournament_error)
}

/// Spawn the game room for a ready bracket match.
///
/// Pre-seats both players, attaches the room to the match, and marks the
/// match in progress; the room's result then feeds the bracket. Callable
/// by either player or an admin, once per match.
pub async fn create_match_room(
    State(state): State<AppState>,
    Extension(claims): Extension<AccessTokenClaims>,
    Path((id, match_id)): Path<(i64, String)>,
) -> Result<(StatusCode, Json<GameRoom>), HandlerError> {
    let tournament = state
        .tournament_manager
        .get_tournament(id)
        .await
        .map_err(tournament_error)?;

    let (ri, mi) = tournament
        .find_match(&match_id)
        .ok_or_else(|| tournament_error(TournamentError::UnknownMatch(match_id.clone())))?;
    let m = &tournament.brackets[ri].matches[mi];

    if m.status == MatchStatus::Completed {
        return Err(tournament_error(TournamentError::MatchAlreadyCompleted(match_id)));
    }
    if m.status == MatchStatus::InProgress || m.game_id.is_some() {
        return Err(tournament_error(TournamentError::MatchInProgress(match_id)));
    }
    let (Some(p1), Some(p2)) = (m.player1, m.player2) else {
        return Err(tournament_error(TournamentError::MatchNotReady(match_id)));
    };

    if !claims.is_admin && claims.sub != p1 && claims.sub != p2 {
        return Err((
            StatusCode::FORBIDDEN,
            ErrorResponse::new("Only the match players can open its room"),
        ));
    }

    let username = |user_id| {
        tournament
            .participant(user_id)
            .map(|p| p.username.clone())
            .unwrap_or_default()
    };
    let (name1, name2) = (username(p1), username(p2));

    let room = state
        .room_manager
        .create_match_room(tournament.game_type, id, &match_id, (p1, &name1), (p2, &name2))
        .await
        .map_err(super::games::room_error)?;

    state
        .tournament_manager
        .begin_match(id, &match_id, room.room_id)
        .await
        .map_err(tournament_error)?;

    Ok((StatusCode::CREATED, Json(room)))
}

/// Report the result of a bracket match.
///
/// The winner advances into the next round; completed matches reject
/// further reports. Completing the final match finalizes the tournament
/// and pays out prizes.
pub async fn report_match_result(
    State(state): State<AppState>,
    Path((id, match_id)): Path<(i64, String)>,
    Json(payload): Json<MatchResultPayload>,
) -> Result<Json<Tournament>, HandlerError> {
    let tournament = state
        .tournament_manager
        .report_match_result(id, &match_id, payload.winner_id)
        .await
        .map_err(tournament_error)?;

    metrics::match_results_total(tournament.game_type.as_str());
    if tournament.status == TournamentStatus::Completed {
        metrics::tournaments_completed_total();
    }

    Ok(Json(tournament))
}
