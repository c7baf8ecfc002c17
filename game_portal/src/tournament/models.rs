//! Tournament data models.
//!
//! A [`Tournament`] is an aggregate root: participants, brackets, and prizes
//! are always loaded and saved together as one document.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Tournament ID type
pub type TournamentId = i64;

/// User ID type (shared with the auth module)
pub type UserId = i64;

/// Lower bound on tournament capacity
pub const MIN_CAPACITY: usize = 2;

/// Upper bound on tournament capacity
pub const MAX_CAPACITY: usize = 128;

/// Game types offered by the portal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameType {
    TicTacToe,
    Ludo,
    Uno,
    Battleship,
    Bingo,
    /// Tournament-only marker: each match may be a different game
    Mixed,
}

impl GameType {
    /// Stable string form, used as a database key and in API paths
    pub fn as_str(&self) -> &'static str {
        match self {
            GameType::TicTacToe => "tictactoe",
            GameType::Ludo => "ludo",
            GameType::Uno => "uno",
            GameType::Battleship => "battleship",
            GameType::Bingo => "bingo",
            GameType::Mixed => "mixed",
        }
    }

    /// Parse from the stable string form
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "tictactoe" => Some(GameType::TicTacToe),
            "ludo" => Some(GameType::Ludo),
            "uno" => Some(GameType::Uno),
            "battleship" => Some(GameType::Battleship),
            "bingo" => Some(GameType::Bingo),
            "mixed" => Some(GameType::Mixed),
            _ => None,
        }
    }

    /// Room capacity for this game type. `None` for [`GameType::Mixed`],
    /// which cannot be played in a single room.
    pub fn room_capacity(&self) -> Option<usize> {
        match self {
            GameType::TicTacToe | GameType::Battleship => Some(2),
            GameType::Ludo | GameType::Uno => Some(4),
            GameType::Bingo => Some(10),
            GameType::Mixed => None,
        }
    }
}

/// Tournament format. Only single elimination has a bracket generator;
/// the other formats are accepted at the schema boundary but `start`
/// rejects them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TournamentFormat {
    SingleElimination,
    DoubleElimination,
    RoundRobin,
    Swiss,
}

/// Tournament lifecycle status. Transitions are monotonic; there is no
/// path backwards from any state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TournamentStatus {
    Upcoming,
    Registration,
    InProgress,
    Completed,
    Cancelled,
}

impl TournamentStatus {
    /// Stable string form, mirrored into a database column for filtering
    pub fn as_str(&self) -> &'static str {
        match self {
            TournamentStatus::Upcoming => "upcoming",
            TournamentStatus::Registration => "registration",
            TournamentStatus::InProgress => "in_progress",
            TournamentStatus::Completed => "completed",
            TournamentStatus::Cancelled => "cancelled",
        }
    }

    /// Parse from the stable string form
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "upcoming" => Some(TournamentStatus::Upcoming),
            "registration" => Some(TournamentStatus::Registration),
            "in_progress" => Some(TournamentStatus::InProgress),
            "completed" => Some(TournamentStatus::Completed),
            "cancelled" => Some(TournamentStatus::Cancelled),
            _ => None,
        }
    }

    /// Whether no further transitions are possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, TournamentStatus::Completed | TournamentStatus::Cancelled)
    }

    /// Forward-only transition check
    pub fn can_transition_to(&self, next: TournamentStatus) -> bool {
        use TournamentStatus::*;
        match (self, next) {
            (Upcoming, Registration) => true,
            (Registration, InProgress) => true,
            (InProgress, Completed) => true,
            (Upcoming | Registration | InProgress, Cancelled) => true,
            _ => false,
        }
    }
}

/// Bracket match status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    Pending,
    InProgress,
    Completed,
}

/// A registered tournament participant.
///
/// The seed is assigned at registration time (registration order, 1-based)
/// and never changes, even if earlier registrants leave.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub user_id: UserId,
    pub username: String,
    pub seed: u32,
    pub wins: u32,
    pub losses: u32,
    pub draws: u32,
    pub points: u32,
    pub is_eliminated: bool,
    pub registered_at: DateTime<Utc>,
}

impl Participant {
    pub fn new(user_id: UserId, username: String, seed: u32) -> Self {
        Self {
            user_id,
            username,
            seed,
            wins: 0,
            losses: 0,
            draws: 0,
            points: 0,
            is_eliminated: false,
            registered_at: Utc::now(),
        }
    }
}

/// A single bracket match.
///
/// Player slots may be empty: round 1 byes have a single occupied slot, and
/// matches in later rounds are populated lazily as their feeder matches
/// complete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BracketMatch {
    /// Deterministic identifier `R{round}M{index}`, 1-based, stable for the
    /// lifetime of the tournament
    pub match_id: String,
    pub player1: Option<UserId>,
    pub player2: Option<UserId>,
    pub winner: Option<UserId>,
    /// Link to the game session playing this match, if one has been created
    pub game_id: Option<Uuid>,
    pub status: MatchStatus,
}

impl BracketMatch {
    pub fn new(round: u32, index: usize) -> Self {
        Self {
            match_id: format!("R{round}M{index}"),
            player1: None,
            player2: None,
            winner: None,
            game_id: None,
            status: MatchStatus::Pending,
        }
    }

    /// Whether `user_id` occupies one of the two player slots
    pub fn has_player(&self, user_id: UserId) -> bool {
        self.player1 == Some(user_id) || self.player2 == Some(user_id)
    }

    /// Whether both player slots are occupied
    pub fn is_ready(&self) -> bool {
        self.player1.is_some() && self.player2.is_some()
    }
}

/// One round of the bracket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Round {
    pub round: u32,
    pub matches: Vec<BracketMatch>,
}

/// Payout for a single placing
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prize {
    pub coins: i64,
    pub points: i64,
    pub badge: Option<String>,
}

impl Prize {
    /// Whether this placing pays out anything
    pub fn is_empty(&self) -> bool {
        self.coins == 0 && self.points == 0 && self.badge.is_none()
    }
}

/// Static payout descriptors for the top three placings. Never mutated by
/// the engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrizeTable {
    pub first: Prize,
    pub second: Prize,
    pub third: Prize,
}

/// Final placing of a participant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Standing {
    /// 1-based place
    pub place: u32,
    pub user_id: UserId,
    pub username: String,
}

/// Tournament aggregate root
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tournament {
    pub id: TournamentId,
    pub name: String,
    pub description: Option<String>,
    pub game_type: GameType,
    pub format: TournamentFormat,
    pub status: TournamentStatus,
    pub min_participants: usize,
    pub max_participants: usize,
    pub participants: Vec<Participant>,
    pub brackets: Vec<Round>,
    pub prizes: PrizeTable,
    pub standings: Vec<Standing>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl Tournament {
    /// Create a new tournament in the `Upcoming` state.
    ///
    /// The id is assigned by the store on first save; until then it is 0.
    pub fn new(
        name: String,
        game_type: GameType,
        format: TournamentFormat,
        min_participants: usize,
        max_participants: usize,
        prizes: PrizeTable,
    ) -> Self {
        Self {
            id: 0,
            name,
            description: None,
            game_type,
            format,
            status: TournamentStatus::Upcoming,
            min_participants: min_participants.max(MIN_CAPACITY),
            max_participants: max_participants.min(MAX_CAPACITY),
            participants: Vec::new(),
            brackets: Vec::new(),
            prizes,
            standings: Vec::new(),
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
        }
    }

    /// Look up a participant by user id
    pub fn participant(&self, user_id: UserId) -> Option<&Participant> {
        self.participants.iter().find(|p| p.user_id == user_id)
    }

    pub fn is_registered(&self, user_id: UserId) -> bool {
        self.participant(user_id).is_some()
    }

    /// Locate a match by id, returning `(round index, match index)` into
    /// `brackets`
    pub fn find_match(&self, match_id: &str) -> Option<(usize, usize)> {
        for (ri, round) in self.brackets.iter().enumerate() {
            if let Some(mi) = round.matches.iter().position(|m| m.match_id == match_id) {
                return Some((ri, mi));
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_game_type_round_trip() {
        for gt in [
            GameType::TicTacToe,
            GameType::Ludo,
            GameType::Uno,
            GameType::Battleship,
            GameType::Bingo,
            GameType::Mixed,
        ] {
            assert_eq!(GameType::parse(gt.as_str()), Some(gt));
        }
        assert_eq!(GameType::parse("chess"), None);
    }

    #[test]
    fn test_room_capacities() {
        assert_eq!(GameType::TicTacToe.room_capacity(), Some(2));
        assert_eq!(GameType::Battleship.room_capacity(), Some(2));
        assert_eq!(GameType::Ludo.room_capacity(), Some(4));
        assert_eq!(GameType::Uno.room_capacity(), Some(4));
        assert_eq!(GameType::Bingo.room_capacity(), Some(10));
        assert_eq!(GameType::Mixed.room_capacity(), None);
    }

    #[test]
    fn test_status_transitions_are_forward_only() {
        use TournamentStatus::*;

        assert!(Upcoming.can_transition_to(Registration));
        assert!(Registration.can_transition_to(InProgress));
        assert!(InProgress.can_transition_to(Completed));

        // No backward transitions
        assert!(!Registration.can_transition_to(Upcoming));
        assert!(!InProgress.can_transition_to(Registration));
        assert!(!Completed.can_transition_to(InProgress));

        // Cancellation is reachable from any non-terminal state only
        assert!(Upcoming.can_transition_to(Cancelled));
        assert!(Registration.can_transition_to(Cancelled));
        assert!(InProgress.can_transition_to(Cancelled));
        assert!(!Completed.can_transition_to(Cancelled));
        assert!(!Cancelled.can_transition_to(Cancelled));
    }

    #[test]
    fn test_terminal_states() {
        assert!(TournamentStatus::Completed.is_terminal());
        assert!(TournamentStatus::Cancelled.is_terminal());
        assert!(!TournamentStatus::InProgress.is_terminal());
    }

    #[test]
    fn test_match_id_format() {
        let m = BracketMatch::new(2, 3);
        assert_eq!(m.match_id, "R2M3");
        assert_eq!(m.status, MatchStatus::Pending);
        assert!(!m.is_ready());
    }

    #[test]
    fn test_capacity_clamping() {
        let t = Tournament::new(
            "Test".to_string(),
            GameType::TicTacToe,
            TournamentFormat::SingleElimination,
            0,
            1000,
            PrizeTable::default(),
        );
        assert_eq!(t.min_participants, MIN_CAPACITY);
        assert_eq!(t.max_participants, MAX_CAPACITY);
    }

    #[test]
    fn test_find_match() {
        let mut t = Tournament::new(
            "Test".to_string(),
            GameType::Uno,
            TournamentFormat::SingleElimination,
            2,
            8,
            PrizeTable::default(),
        );
        t.brackets = vec![
            Round {
                round: 1,
                matches: vec![BracketMatch::new(1, 1), BracketMatch::new(1, 2)],
            },
            Round {
                round: 2,
                matches: vec![BracketMatch::new(2, 1)],
            },
        ];

        assert_eq!(t.find_match("R1M2"), Some((0, 1)));
        assert_eq!(t.find_match("R2M1"), Some((1, 0)));
        assert_eq!(t.find_match("R9M9"), None);
    }
}
