//! Fire-and-forget portal event broadcast.
//!
//! The engine announces round transitions, match completions, and room
//! activity through a [`Notifier`]. Delivery is best-effort: publishing
//! never fails, never blocks, and never influences engine state. The
//! server relays the stream to connected WebSocket clients.

use crate::tournament::models::{GameType, Standing, TournamentId, UserId};
use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Default broadcast channel capacity
pub const DEFAULT_CAPACITY: usize = 256;

/// Events emitted by the portal
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PortalEvent {
    RoundStarted {
        tournament_id: TournamentId,
        round: u32,
    },
    MatchReady {
        tournament_id: TournamentId,
        match_id: String,
        player1: UserId,
        player2: UserId,
    },
    MatchCompleted {
        tournament_id: TournamentId,
        match_id: String,
        winner: UserId,
    },
    TournamentCompleted {
        tournament_id: TournamentId,
        standings: Vec<Standing>,
    },
    RoomCreated {
        room_id: Uuid,
        game_type: GameType,
    },
    PlayerJoinedRoom {
        room_id: Uuid,
        user_id: UserId,
        username: String,
    },
    PlayerLeftRoom {
        room_id: Uuid,
        user_id: UserId,
    },
    GameCompleted {
        room_id: Uuid,
        winner: Option<UserId>,
    },
}

/// Broadcast handle. Cheap to clone; all clones share one channel.
#[derive(Clone)]
pub struct Notifier {
    tx: broadcast::Sender<PortalEvent>,
}

impl Notifier {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Publish an event to all current subscribers. An empty subscriber
    /// list is not an error.
    pub fn publish(&self, event: PortalEvent) {
        if let Err(e) = self.tx.send(event) {
            log::debug!("portal event dropped (no subscribers): {e}");
        }
    }

    /// Subscribe to the event stream. Slow receivers may observe
    /// `RecvError::Lagged` and should resync from the HTTP API.
    pub fn subscribe(&self) -> broadcast::Receiver<PortalEvent> {
        self.tx.subscribe()
    }

    /// Number of live subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_without_subscribers_is_noop() {
        let notifier = Notifier::default();
        notifier.publish(PortalEvent::RoundStarted {
            tournament_id: 1,
            round: 1,
        });
        assert_eq!(notifier.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_subscriber_receives_events() {
        let notifier = Notifier::default();
        let mut rx = notifier.subscribe();

        notifier.publish(PortalEvent::MatchCompleted {
            tournament_id: 7,
            match_id: "R1M1".to_string(),
            winner: 42,
        });

        match rx.recv().await.unwrap() {
            PortalEvent::MatchCompleted {
                tournament_id,
                match_id,
                winner,
            } => {
                assert_eq!(tournament_id, 7);
                assert_eq!(match_id, "R1M1");
                assert_eq!(winner, 42);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_events_serialize_with_type_tag() {
        let event = PortalEvent::RoundStarted {
            tournament_id: 3,
            round: 2,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "round_started");
        assert_eq!(json["round"], 2);
    }
}
