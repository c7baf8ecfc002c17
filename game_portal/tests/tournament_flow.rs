//! Integration tests for the tournament lifecycle.
//!
//! These tests drive the bracket engine through complete tournaments,
//! registration through standings, the way the server does: each operation
//! consumes the previous snapshot and yields the next one plus its effects.

use game_portal::tournament::{
    engine::{self, Effect, Transition},
    GameType, MatchStatus, Prize, PrizeTable, Tournament, TournamentError, TournamentFormat,
    TournamentStatus, UserId,
};

fn new_tournament(max: usize) -> Tournament {
    Tournament::new(
        "Weekend Cup".to_string(),
        GameType::TicTacToe,
        TournamentFormat::SingleElimination,
        2,
        max,
        PrizeTable {
            first: Prize {
                coins: 500,
                points: 100,
                badge: Some("champion".to_string()),
            },
            second: Prize {
                coins: 250,
                points: 50,
                badge: None,
            },
            third: Prize {
                coins: 100,
                points: 25,
                badge: None,
            },
        },
    )
}

fn with_players(max: usize, count: usize) -> Tournament {
    let mut t = engine::open_registration(&new_tournament(max)).unwrap().tournament;
    for i in 1..=count {
        t = engine::register(&t, i as UserId, &format!("player{i}"))
            .unwrap()
            .tournament;
    }
    t
}

/// Report every ready match in round order, lowest user id winning, until
/// the tournament completes. Returns the final snapshot and all effects.
fn play_out(mut t: Tournament) -> (Tournament, Vec<Effect>) {
    let mut all_effects = Vec::new();
    while t.status == TournamentStatus::InProgress {
        let next = t
            .brackets
            .iter()
            .flat_map(|r| r.matches.iter())
            .find(|m| m.is_ready() && m.status != MatchStatus::Completed)
            .map(|m| (m.match_id.clone(), m.player1.unwrap().min(m.player2.unwrap())));
        let (match_id, winner) = next.expect("in-progress tournament with no playable match");

        let Transition { tournament, effects } =
            engine::report_match_result(&t, &match_id, winner).unwrap();
        t = tournament;
        all_effects.extend(effects);
    }
    (t, all_effects)
}

#[test]
fn test_five_player_lifecycle() {
    let t = with_players(8, 5);
    assert_eq!(t.status, TournamentStatus::Registration);

    // Seeds follow registration order and survive serialization
    let seeds: Vec<u32> = t.participants.iter().map(|p| p.seed).collect();
    assert_eq!(seeds, vec![1, 2, 3, 4, 5]);

    let Transition { tournament: t, effects } = engine::start(&t).unwrap();
    assert_eq!(t.status, TournamentStatus::InProgress);
    assert!(matches!(effects.first(), Some(Effect::RoundStarted { round: 1 })));

    // 5 players: 3 rounds, round 1 has ceil(5/2) = 3 matches with seed 5
    // receiving a bye
    assert_eq!(t.brackets.len(), 3);
    assert_eq!(t.brackets[0].matches.len(), 3);
    let bye = &t.brackets[0].matches[2];
    assert_eq!(bye.match_id, "R1M3");
    assert_eq!(bye.status, MatchStatus::Completed);
    assert_eq!(bye.winner, Some(5));

    // Walkovers touch no counters
    let p5 = t.participant(5).unwrap();
    assert_eq!(p5.wins, 0);
    assert_eq!(p5.points, 0);

    let (t, effects) = play_out(t);
    assert_eq!(t.status, TournamentStatus::Completed);
    assert!(t.finished_at.is_some());

    // Lowest id always wins: final is 1 vs the bye survivor's side
    assert_eq!(t.standings[0].place, 1);
    assert_eq!(t.standings[0].user_id, 1);

    // Completion fires exactly once, with prize intents for each funded place
    let completions = effects
        .iter()
        .filter(|e| matches!(e, Effect::TournamentCompleted { .. }))
        .count();
    assert_eq!(completions, 1);
    let prize_places: Vec<u32> = effects
        .iter()
        .filter_map(|e| match e {
            Effect::AwardPrize { place, .. } => Some(*place),
            _ => None,
        })
        .collect();
    assert_eq!(prize_places, vec![1, 2, 3]);
}

#[test]
fn test_eight_player_bracket_is_fully_paired() {
    let t = with_players(8, 8);
    let t = engine::start(&t).unwrap().tournament;

    assert_eq!(t.brackets.len(), 3);
    assert_eq!(t.brackets[0].matches.len(), 4);
    // Consecutive-seed pairing: R1M1 is seed 1 vs seed 2
    assert_eq!(t.brackets[0].matches[0].player1, Some(1));
    assert_eq!(t.brackets[0].matches[0].player2, Some(2));
    // No byes at a full power of two
    assert!(t.brackets[0].matches.iter().all(|m| m.is_ready()));

    let (t, _) = play_out(t);
    assert_eq!(t.status, TournamentStatus::Completed);
    assert_eq!(t.standings[0].user_id, 1);
}

#[test]
fn test_nine_player_bracket_plays_to_completion() {
    let t = with_players(16, 9);
    let t = engine::start(&t).unwrap().tournament;

    // Widths shrink by ceiling halves: 5, 3, 2, 1. Every later-round
    // match has at least one feeder, so no match can be stranded.
    let widths: Vec<usize> = t.brackets.iter().map(|r| r.matches.len()).collect();
    assert_eq!(widths, vec![5, 3, 2, 1]);

    let (t, _) = play_out(t);
    assert_eq!(t.status, TournamentStatus::Completed);
    assert_eq!(t.standings[0].user_id, 1);
    assert!(t
        .brackets
        .iter()
        .flat_map(|r| r.matches.iter())
        .all(|m| m.status == MatchStatus::Completed));
}

#[test]
fn test_two_player_tournament_is_a_single_final() {
    let t = with_players(2, 2);
    let t = engine::start(&t).unwrap().tournament;
    assert_eq!(t.brackets.len(), 1);
    assert_eq!(t.brackets[0].matches.len(), 1);

    let Transition { tournament: t, effects } =
        engine::report_match_result(&t, "R1M1", 2).unwrap();
    assert_eq!(t.status, TournamentStatus::Completed);
    assert_eq!(t.standings[0].user_id, 2);
    assert_eq!(t.standings[1].user_id, 1);
    // Only two placings exist; no third-place prize intent
    assert!(effects
        .iter()
        .all(|e| !matches!(e, Effect::AwardPrize { place: 3, .. })));
}

#[test]
fn test_result_reporting_is_idempotent_per_match() {
    let t = with_players(4, 4);
    let t = engine::start(&t).unwrap().tournament;

    let t = engine::report_match_result(&t, "R1M1", 1).unwrap().tournament;

    // Same match again, any winner: rejected without mutation
    let before = serde_json::to_value(&t).unwrap();
    assert!(matches!(
        engine::report_match_result(&t, "R1M1", 1),
        Err(TournamentError::MatchAlreadyCompleted(_))
    ));
    assert!(matches!(
        engine::report_match_result(&t, "R1M1", 2),
        Err(TournamentError::MatchAlreadyCompleted(_))
    ));
    assert_eq!(serde_json::to_value(&t).unwrap(), before);
}

#[test]
fn test_unknown_match_and_invalid_winner() {
    let t = with_players(4, 4);
    let t = engine::start(&t).unwrap().tournament;

    assert!(matches!(
        engine::report_match_result(&t, "R9M9", 1),
        Err(TournamentError::UnknownMatch(_))
    ));
    // User 3 plays in R1M2, not R1M1
    assert!(matches!(
        engine::report_match_result(&t, "R1M1", 3),
        Err(TournamentError::InvalidWinner { .. })
    ));
}

#[test]
fn test_downstream_slots_fill_in_completion_order() {
    let t = with_players(4, 4);
    let t = engine::start(&t).unwrap().tournament;

    // Complete R1M2 first: its winner takes the first empty slot of R2M1
    let t = engine::report_match_result(&t, "R1M2", 4).unwrap().tournament;
    let final_match = &t.brackets[1].matches[0];
    assert_eq!(final_match.player1, Some(4));
    assert_eq!(final_match.player2, None);

    let t = engine::report_match_result(&t, "R1M1", 2).unwrap().tournament;
    let final_match = &t.brackets[1].matches[0];
    assert_eq!(final_match.player2, Some(2));
    assert!(final_match.is_ready());
}

#[test]
fn test_registration_window_is_enforced() {
    let t = new_tournament(4);

    // Upcoming: not yet open
    assert!(matches!(
        engine::register(&t, 1, "early"),
        Err(TournamentError::InvalidState { .. })
    ));

    let t = with_players(4, 4);
    assert!(matches!(
        engine::register(&t, 99, "late"),
        Err(TournamentError::Full)
    ));
    assert!(matches!(
        engine::register(&t, 2, "player2"),
        Err(TournamentError::AlreadyRegistered)
    ));

    let t = engine::start(&t).unwrap().tournament;
    assert!(matches!(
        engine::register(&t, 99, "late"),
        Err(TournamentError::InvalidState { .. })
    ));
}

#[test]
fn test_leaving_keeps_remaining_seeds() {
    let t = with_players(8, 4);
    let t = engine::leave(&t, 2).unwrap().tournament;

    let seeds: Vec<(UserId, u32)> = t.participants.iter().map(|p| (p.user_id, p.seed)).collect();
    assert_eq!(seeds, vec![(1, 1), (3, 3), (4, 4)]);

    // Next registrant gets a fresh seed, not the vacated one
    let t = engine::register(&t, 9, "player9").unwrap().tournament;
    assert_eq!(t.participant(9).unwrap().seed, 5);
}

#[test]
fn test_start_needs_enough_players_and_a_supported_format() {
    let t = with_players(8, 1);
    assert!(matches!(
        engine::start(&t),
        Err(TournamentError::InsufficientParticipants { needed: 2, current: 1 })
    ));

    let mut t = with_players(8, 4);
    t.format = TournamentFormat::RoundRobin;
    assert!(matches!(
        engine::start(&t),
        Err(TournamentError::UnsupportedFormat(TournamentFormat::RoundRobin))
    ));
}

#[test]
fn test_cancelled_tournament_rejects_everything() {
    let t = with_players(8, 3);
    let t = engine::cancel(&t).unwrap().tournament;
    assert_eq!(t.status, TournamentStatus::Cancelled);

    assert!(engine::register(&t, 9, "late").is_err());
    assert!(engine::start(&t).is_err());
    assert!(engine::cancel(&t).is_err());
}

#[test]
fn test_stat_counters_track_played_matches_only() {
    let t = with_players(8, 5);
    let t = engine::start(&t).unwrap().tournament;
    let (t, _) = play_out(t);

    // User 1 won every match they played; nobody has draw counters
    let p1 = t.participant(1).unwrap();
    assert_eq!(p1.losses, 0);
    assert!(p1.wins > 0);
    assert_eq!(p1.points, p1.wins);
    assert!(!p1.is_eliminated);

    // Everyone else lost exactly one played match
    for p in t.participants.iter().filter(|p| p.user_id != 1) {
        assert_eq!(p.losses, 1);
        assert!(p.is_eliminated);
    }
}
