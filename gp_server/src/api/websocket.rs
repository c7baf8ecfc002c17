//! WebSocket handler for the live portal event stream.
//!
//! Clients connect once and receive every portal event as JSON: round
//! transitions, match results, room activity, and tournament completions.
//! The stream is read-mostly; the only client messages handled are pings.
//!
//! # Connection Flow
//!
//! 1. Client connects via `GET /ws/events?token=<jwt_token>`
//! 2. Server validates the JWT and upgrades to WebSocket
//! 3. Server subscribes to the portal notifier and relays each event
//! 4. On disconnect or a lagging receiver, the connection is closed
//!
//! # Server Messages
//!
//! Each message is one serialized [`PortalEvent`] with a `type` tag:
//!
//! ```json
//! {"type":"match_completed","tournament_id":7,"match_id":"R1M2","winner":42}
//! ```
//!
//! # Example
//!
//! ```javascript
//! const ws = new WebSocket('ws://localhost:3000/ws/events?token=eyJhbGc...');
//! ws.onmessage = (event) => handlePortalEvent(JSON.parse(event.data));
//! ```

use axum::{
    extract::{
        Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use futures_util::{SinkExt, StreamExt};
use log::{info, warn};
use serde::Deserialize;
use tokio::sync::broadcast::error::RecvError;

use super::AppState;
use crate::metrics;

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    token: String,
}

/// Upgrade HTTP connection to WebSocket for the live event stream.
///
/// Validates the JWT access token passed as a query parameter. On success,
/// upgrades the connection (101 Switching Protocols); on authentication
/// failure returns `401 Unauthorized`.
pub async fn events_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
    State(state): State<AppState>,
) -> Response {
    let claims = match state.auth_manager.verify_access_token(&query.token) {
        Ok(claims) => claims,
        Err(_) => {
            return (StatusCode::UNAUTHORIZED, "Invalid token").into_response();
        }
    };

    let username = claims.username.clone();
    ws.on_upgrade(move |socket| handle_socket(socket, state, claims.sub, username))
}

async fn handle_socket(socket: WebSocket, state: AppState, user_id: i64, username: String) {
    info!("Event stream opened for user {user_id} ({username})");
    metrics::websocket_connections_total();

    let mut events = state.notifier.subscribe();
    metrics::websocket_connections_active(state.notifier.subscriber_count());
    let (mut sender, mut receiver) = socket.split();

    // Relay task: notifier broadcast -> client
    let mut relay = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => {
                    let payload = match serde_json::to_string(&event) {
                        Ok(payload) => payload,
                        Err(e) => {
                            warn!("Could not serialize portal event: {e}");
                            continue;
                        }
                    };
                    if sender.send(Message::Text(payload.into())).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    // The client fell behind the broadcast buffer. Drop the
                    // connection; it should resync over the HTTP API.
                    warn!("Event stream for user {user_id} lagged, skipped {skipped} events");
                    break;
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    // Drain task: keep the socket alive (axum answers pings for us) and
    // notice when the client goes away
    let mut drain = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            match msg {
                Ok(Message::Close(_)) | Err(_) => break,
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = &mut relay => drain.abort(),
        _ = &mut drain => relay.abort(),
    }

    metrics::websocket_connections_active(state.notifier.subscriber_count());
    info!("Event stream closed for user {user_id}");
}
