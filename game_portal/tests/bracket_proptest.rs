//! Property-based tests for bracket generation.
//!
//! For every legal participant count the generated bracket must have the
//! right shape, seat every participant exactly once, and stay winnable:
//! playing it to the end always produces a champion.

use game_portal::tournament::{
    engine, GameType, MatchStatus, PrizeTable, Tournament, TournamentFormat, TournamentStatus,
    UserId,
};
use proptest::prelude::*;
use std::collections::HashSet;

fn started_tournament(n: usize) -> Tournament {
    let t = Tournament::new(
        "Prop Cup".to_string(),
        GameType::Uno,
        TournamentFormat::SingleElimination,
        2,
        128,
        PrizeTable::default(),
    );
    let mut t = engine::open_registration(&t).unwrap().tournament;
    for i in 1..=n {
        t = engine::register(&t, i as UserId, &format!("p{i}"))
            .unwrap()
            .tournament;
    }
    engine::start(&t).unwrap().tournament
}

proptest! {
    #[test]
    fn bracket_shape_matches_participant_count(n in 2usize..=128) {
        let t = started_tournament(n);

        let expected_rounds = (n as f64).log2().ceil() as usize;
        prop_assert_eq!(t.brackets.len(), expected_rounds);

        // Round 1 seats the whole field; every later round holds the
        // ceiling half of the round before, so each match has a feeder
        let mut expected_width = n.div_ceil(2);
        prop_assert_eq!(t.brackets[0].matches.len(), expected_width);
        for round in t.brackets.iter().skip(1) {
            expected_width = expected_width.div_ceil(2);
            prop_assert_eq!(round.matches.len(), expected_width);
        }
        prop_assert_eq!(t.brackets.last().unwrap().matches.len(), 1);
    }

    #[test]
    fn round_one_seats_everyone_exactly_once(n in 2usize..=128) {
        let t = started_tournament(n);

        let mut seated = HashSet::new();
        for m in &t.brackets[0].matches {
            for player in [m.player1, m.player2].into_iter().flatten() {
                prop_assert!(seated.insert(player), "player {} seated twice", player);
            }
        }
        prop_assert_eq!(seated.len(), n);

        // Byes are already resolved, never playable
        for m in &t.brackets[0].matches {
            if !m.is_ready() {
                prop_assert_eq!(m.status, MatchStatus::Completed);
                prop_assert!(m.winner.is_some());
            }
        }
    }

    #[test]
    fn every_bracket_is_winnable(n in 2usize..=64) {
        let mut t = started_tournament(n);

        let mut reports = 0;
        while t.status == TournamentStatus::InProgress {
            let next = t
                .brackets
                .iter()
                .flat_map(|r| r.matches.iter())
                .find(|m| m.is_ready() && m.status != MatchStatus::Completed)
                .map(|m| (m.match_id.clone(), m.player2.unwrap()));
            prop_assert!(
                next.is_some(),
                "bracket for {} players stalled after {} reports",
                n,
                reports
            );
            let (match_id, winner) = next.unwrap();
            t = engine::report_match_result(&t, &match_id, winner)
                .unwrap()
                .tournament;
            reports += 1;
        }

        prop_assert_eq!(t.status, TournamentStatus::Completed);
        prop_assert_eq!(t.standings[0].place, 1);
        // A tournament never plays more matches than participants minus one
        prop_assert!(reports <= n - 1);
    }
}
