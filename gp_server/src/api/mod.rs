//! HTTP/WebSocket API for the gaming portal.
//!
//! This module provides the complete REST and WebSocket API for the portal:
//! accounts, tournaments, game rooms, leaderboards, and a live event stream.
//!
//! # Architecture
//!
//! The API is built with:
//! - **Axum**: Async web framework for HTTP/WebSocket
//! - **Tower**: Middleware for CORS, authentication
//! - **JWT**: Token-based authentication with access/refresh tokens
//! - **Broadcast events**: Portal events fan out to every `/ws/events` client
//!
//! # Modules
//!
//! - [`auth`]: Accounts (register, login, logout, refresh, verification, reset)
//! - [`tournaments`]: Tournament lifecycle and match results
//! - [`games`]: Game rooms, results, leaderboards, profiles
//! - [`websocket`]: Live portal event stream
//! - [`middleware`]: Authentication middleware for protected endpoints
//!
//! # Endpoints Overview
//!
//! ## Authentication
//! - `POST /api/v1/auth/register` - Register new user (public)
//! - `POST /api/v1/auth/login` - Login with credentials (public)
//! - `POST /api/v1/auth/password-reset/request` - Start password reset (public)
//! - `POST /api/v1/auth/password-reset/confirm` - Complete password reset (public)
//! - `POST /api/v1/auth/logout` - Invalidate refresh token
//! - `POST /api/v1/auth/refresh` - Get new token pair
//! - `POST /api/v1/auth/verify-email` - Confirm a verification code
//! - `POST /api/v1/auth/verify-email/resend` - Send a fresh code
//!
//! ## Tournaments
//! - `GET /api/v1/tournaments` - List tournaments (public)
//! - `GET /api/v1/tournaments/{id}` - Tournament details
//! - `GET /api/v1/tournaments/{id}/standings` - Final standings
//! - `POST /api/v1/tournaments` - Create tournament (admin)
//! - `POST /api/v1/tournaments/{id}/open` - Open registration (admin)
//! - `POST /api/v1/tournaments/{id}/start` - Generate brackets and start (admin)
//! - `POST /api/v1/tournaments/{id}/cancel` - Cancel (admin)
//! - `POST /api/v1/tournaments/{id}/register` - Join
//! - `POST /api/v1/tournaments/{id}/leave` - Leave before start
//! - `POST /api/v1/tournaments/{id}/matches/{match_id}/room` - Open the room for a match
//! - `POST /api/v1/tournaments/{id}/matches/{match_id}/result` - Report result
//!
//! ## Games
//! - `GET /api/v1/leaderboard?game_type=ludo` - Leaderboard (public)
//! - `GET /api/v1/rooms` - List rooms
//! - `POST /api/v1/rooms` - Create room
//! - `POST /api/v1/rooms/{id}/join|leave|ready|start|result` - Room lifecycle
//! - `GET /api/v1/profiles/{user_id}` - Player profile
//!
//! ## WebSocket
//! - `GET /ws/events?token=<jwt>` - Live portal event stream
//!
//! ## Health Check
//! - `GET /health` - Server health status
//!
//! # CORS
//!
//! CORS is configured permissively for development. In production, configure
//! appropriate origins, methods, and headers.

pub mod auth;
pub mod games;
pub mod middleware;
pub mod request_id;
pub mod tournaments;
pub mod websocket;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
};
use game_portal::{
    auth::AuthManager, notify::Notifier, room::RoomManager, stats::StatsManager,
    tournament::TournamentManager,
};
use serde::Serialize;
use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

/// Application state shared across all HTTP handlers and WebSocket connections.
///
/// This state is cloned for each request (cheap due to Arc wrappers) and provides
/// access to the core system managers.
#[derive(Clone)]
pub struct AppState {
    pub auth_manager: Arc<AuthManager>,
    pub tournament_manager: Arc<TournamentManager>,
    pub room_manager: Arc<RoomManager>,
    pub stats_manager: Arc<StatsManager>,
    pub notifier: Notifier,
    pub pool: Arc<PgPool>,
    /// Default leaderboard page size
    pub leaderboard_limit: i64,
}

/// JSON error body shared by every handler
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Json<Self> {
        Json(Self {
            error: error.into(),
        })
    }
}

/// Create the complete API router with all endpoints and middleware.
///
/// Constructs an Axum router with authentication, tournament, room, and
/// WebSocket endpoints configured. Applies request-id and CORS middleware
/// to all routes.
pub fn create_router(state: AppState) -> Router {
    let v1_routes = create_v1_router(state.clone());

    // Root routes (health check, WebSocket - not versioned)
    let root_routes = Router::new()
        .route("/health", get(health_check))
        // WebSocket route handles its own auth via query parameter
        .route("/ws/events", get(websocket::events_handler));

    Router::new()
        .merge(root_routes)
        .nest("/api/v1", v1_routes)
        .layer(axum::middleware::from_fn(request_id::request_id_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Create API v1 router with all versioned endpoints.
///
/// This allows for future API evolution (v2, v3, etc.) while maintaining
/// backward compatibility with existing clients.
fn create_v1_router(state: AppState) -> Router<AppState> {
    // Public routes (no authentication middleware)
    let public_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/password-reset/request", post(auth::request_password_reset))
        .route("/auth/password-reset/confirm", post(auth::confirm_password_reset))
        .route("/tournaments", get(tournaments::list_tournaments))
        .route("/leaderboard", get(games::leaderboard));

    // Protected routes (require authentication middleware)
    let protected_routes = Router::new()
        .route("/auth/logout", post(auth::logout))
        .route("/auth/refresh", post(auth::refresh_token))
        .route("/auth/verify-email", post(auth::verify_email))
        .route("/auth/verify-email/resend", post(auth::resend_verification))
        .route("/tournaments", post(tournaments::create_tournament))
        .route("/tournaments/{id}", get(tournaments::get_tournament))
        .route("/tournaments/{id}/standings", get(tournaments::standings))
        .route("/tournaments/{id}/open", post(tournaments::open_registration))
        .route("/tournaments/{id}/start", post(tournaments::start_tournament))
        .route("/tournaments/{id}/cancel", post(tournaments::cancel_tournament))
        .route("/tournaments/{id}/register", post(tournaments::register))
        .route("/tournaments/{id}/leave", post(tournaments::leave))
        .route(
            "/tournaments/{id}/matches/{match_id}/room",
            post(tournaments::create_match_room),
        )
        .route(
            "/tournaments/{id}/matches/{match_id}/result",
            post(tournaments::report_match_result),
        )
        .route("/rooms", get(games::list_rooms).post(games::create_room))
        .route("/rooms/{id}", get(games::get_room))
        .route("/rooms/{id}/join", post(games::join_room))
        .route("/rooms/{id}/leave", post(games::leave_room))
        .route("/rooms/{id}/ready", post(games::set_ready))
        .route("/rooms/{id}/start", post(games::start_room))
        .route("/rooms/{id}/result", post(games::report_result))
        .route("/profiles/{user_id}", get(games::get_profile))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth_middleware,
        ));

    Router::new().merge(public_routes).merge(protected_routes)
}

/// Health check endpoint for monitoring and load balancers.
///
/// Checks database connectivity and reports the live event-stream
/// subscriber count. Returns `200 OK` when healthy, `503 Service
/// Unavailable` otherwise.
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let db_healthy = sqlx::query("SELECT 1")
        .fetch_one(&*state.pool)
        .await
        .is_ok();

    let status_code = if db_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = json!({
        "status": if db_healthy { "healthy" } else { "unhealthy" },
        "version": env!("CARGO_PKG_VERSION"),
        "database": db_healthy,
        "event_subscribers": state.notifier.subscriber_count(),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    (status_code, Json(response))
}
