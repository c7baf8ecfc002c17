//! Pure tournament state transitions.
//!
//! Every operation takes the current aggregate snapshot and returns a new
//! snapshot plus the side-effect intents (notifications, prize awards) the
//! caller should dispatch after the snapshot has been persisted. Nothing in
//! this module touches a store or a network, which keeps every transition
//! deterministic and testable in isolation.

use super::{
    errors::{TournamentError, TournamentResult},
    models::{
        BracketMatch, MatchStatus, Participant, Prize, Round, Standing, Tournament,
        TournamentFormat, TournamentStatus, UserId,
    },
};
use chrono::Utc;
use uuid::Uuid;

/// Side-effect intent produced by a transition.
///
/// Effects are dispatched best-effort after the new snapshot is saved;
/// a failed dispatch never rolls back the transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// A new round has its first playable match
    RoundStarted { round: u32 },
    /// A match has both players assigned and can be played
    MatchReady {
        match_id: String,
        player1: UserId,
        player2: UserId,
    },
    /// A match finished, by play or by walkover
    MatchCompleted { match_id: String, winner: UserId },
    /// The final match finished and standings are fixed
    TournamentCompleted { standings: Vec<Standing> },
    /// Payout owed to a placed participant
    AwardPrize {
        user_id: UserId,
        place: u32,
        coins: i64,
        points: i64,
        badge: Option<String>,
    },
}

/// A new snapshot plus the effects to dispatch for it
#[derive(Debug, Clone)]
pub struct Transition {
    pub tournament: Tournament,
    pub effects: Vec<Effect>,
}

impl Transition {
    fn new(tournament: Tournament) -> Self {
        Self {
            tournament,
            effects: Vec::new(),
        }
    }
}

/// Register a participant. Only legal while registration is open; the
/// assigned seed never changes afterwards.
pub fn register(current: &Tournament, user_id: UserId, username: &str) -> TournamentResult<Transition> {
    require_phase(current, &[TournamentStatus::Registration])?;

    if current.participants.len() >= current.max_participants {
        return Err(TournamentError::Full);
    }
    if current.is_registered(user_id) {
        return Err(TournamentError::AlreadyRegistered);
    }

    let mut next = current.clone();
    // Seeds are never reused: after a leave, the count would collide with
    // a surviving participant's seed
    let seed = next.participants.iter().map(|p| p.seed).max().unwrap_or(0) + 1;
    next.participants
        .push(Participant::new(user_id, username.to_string(), seed));
    Ok(Transition::new(next))
}

/// Remove a participant before the tournament starts. Remaining seeds are
/// left untouched so that seed values stay immutable once assigned.
pub fn leave(current: &Tournament, user_id: UserId) -> TournamentResult<Transition> {
    require_phase(
        current,
        &[TournamentStatus::Upcoming, TournamentStatus::Registration],
    )?;

    if !current.is_registered(user_id) {
        return Err(TournamentError::NotRegistered);
    }

    let mut next = current.clone();
    next.participants.retain(|p| p.user_id != user_id);
    Ok(Transition::new(next))
}

/// Open registration for an upcoming tournament
pub fn open_registration(current: &Tournament) -> TournamentResult<Transition> {
    require_phase(current, &[TournamentStatus::Upcoming])?;

    let mut next = current.clone();
    next.status = TournamentStatus::Registration;
    Ok(Transition::new(next))
}

/// Start the tournament: generate brackets and move to `InProgress`.
///
/// Registration is frozen from this point on; the participant list at call
/// time fully determines the bracket layout.
pub fn start(current: &Tournament) -> TournamentResult<Transition> {
    require_phase(current, &[TournamentStatus::Registration])?;

    if current.participants.len() < current.min_participants {
        return Err(TournamentError::InsufficientParticipants {
            needed: current.min_participants,
            current: current.participants.len(),
        });
    }

    let mut next = current.clone();
    let mut effects = generate_brackets(&mut next)?;
    next.status = TournamentStatus::InProgress;
    next.started_at = Some(Utc::now());

    effects.insert(0, Effect::RoundStarted { round: 1 });
    Ok(Transition {
        tournament: next,
        effects,
    })
}

/// Attach a game session to a pending match and mark it in progress
pub fn begin_match(
    current: &Tournament,
    match_id: &str,
    game_id: Uuid,
) -> TournamentResult<Transition> {
    require_phase(current, &[TournamentStatus::InProgress])?;

    let (ri, mi) = current
        .find_match(match_id)
        .ok_or_else(|| TournamentError::UnknownMatch(match_id.to_string()))?;

    let m = &current.brackets[ri].matches[mi];
    if m.status == MatchStatus::Completed {
        return Err(TournamentError::MatchAlreadyCompleted(match_id.to_string()));
    }
    if m.status == MatchStatus::InProgress || m.game_id.is_some() {
        return Err(TournamentError::MatchInProgress(match_id.to_string()));
    }
    if !m.is_ready() {
        return Err(TournamentError::MatchNotReady(match_id.to_string()));
    }

    let mut next = current.clone();
    let m = &mut next.brackets[ri].matches[mi];
    m.game_id = Some(game_id);
    m.status = MatchStatus::InProgress;
    Ok(Transition::new(next))
}

/// Report the result of a match.
///
/// The winner's wins and the loser's losses are incremented exactly once;
/// a duplicate report is rejected with `MatchAlreadyCompleted`. The loser
/// is eliminated, and the winner advances into the downstream match of the
/// next round. Completing the final match completes the tournament.
pub fn report_match_result(
    current: &Tournament,
    match_id: &str,
    winner_id: UserId,
) -> TournamentResult<Transition> {
    require_phase(current, &[TournamentStatus::InProgress])?;

    let (ri, mi) = current
        .find_match(match_id)
        .ok_or_else(|| TournamentError::UnknownMatch(match_id.to_string()))?;

    let m = &current.brackets[ri].matches[mi];
    if m.status == MatchStatus::Completed {
        return Err(TournamentError::MatchAlreadyCompleted(match_id.to_string()));
    }
    if !m.is_ready() {
        return Err(TournamentError::MatchNotReady(match_id.to_string()));
    }
    if !m.has_player(winner_id) {
        return Err(TournamentError::InvalidWinner {
            match_id: match_id.to_string(),
            user_id: winner_id,
        });
    }
    let loser_id = match (m.player1, m.player2) {
        (Some(p1), Some(p2)) if p1 == winner_id => p2,
        (Some(p1), Some(_)) => p1,
        _ => return Err(TournamentError::MatchNotReady(match_id.to_string())),
    };

    let mut next = current.clone();
    let mut effects = Vec::new();

    {
        let m = &mut next.brackets[ri].matches[mi];
        m.winner = Some(winner_id);
        m.status = MatchStatus::Completed;
    }

    if let Some(p) = next.participants.iter_mut().find(|p| p.user_id == winner_id) {
        p.wins += 1;
        p.points += 1;
    }
    if let Some(p) = next.participants.iter_mut().find(|p| p.user_id == loser_id) {
        p.losses += 1;
        p.is_eliminated = true;
    }

    effects.push(Effect::MatchCompleted {
        match_id: match_id.to_string(),
        winner: winner_id,
    });

    advance_winner(&mut next, ri, mi, winner_id, &mut effects);
    finalize_if_complete(&mut next, &mut effects);

    Ok(Transition {
        tournament: next,
        effects,
    })
}

/// Cancel a tournament from any non-terminal state
pub fn cancel(current: &Tournament) -> TournamentResult<Transition> {
    if current.status.is_terminal() {
        return Err(TournamentError::InvalidState {
            status: current.status,
        });
    }

    let mut next = current.clone();
    next.status = TournamentStatus::Cancelled;
    next.finished_at = Some(Utc::now());
    Ok(Transition::new(next))
}

/// Generate the single-elimination bracket tree from the seeded
/// participant list.
///
/// Round 1 pairs consecutive seeds; an unpaired trailing seed gets a bye
/// and is resolved as a walkover with no counter change. Later rounds are
/// pre-created empty and populated lazily as feeder matches complete.
fn generate_brackets(t: &mut Tournament) -> TournamentResult<Vec<Effect>> {
    if t.format != TournamentFormat::SingleElimination {
        return Err(TournamentError::UnsupportedFormat(t.format));
    }

    let n = t.participants.len();
    if n < 2 {
        return Err(TournamentError::InvalidParticipantCount(n));
    }

    let rounds = n.next_power_of_two().trailing_zeros();

    t.brackets = Vec::with_capacity(rounds as usize);

    let mut first_round = Vec::with_capacity(n.div_ceil(2));
    for i in (0..n).step_by(2) {
        let mut m = BracketMatch::new(1, i / 2 + 1);
        m.player1 = Some(t.participants[i].user_id);
        m.player2 = t.participants.get(i + 1).map(|p| p.user_id);
        first_round.push(m);
    }
    let mut width = first_round.len();
    t.brackets.push(Round {
        round: 1,
        matches: first_round,
    });

    // Each later round halves (ceiling) the width of the one before, so
    // every match has at least one feeder. Sizing rounds off the bracket
    // depth instead would leave feederless matches for fields like 9-12.
    let mut round = 2;
    while width > 1 {
        width = width.div_ceil(2);
        let matches = (0..width)
            .map(|i| BracketMatch::new(round, i + 1))
            .collect();
        t.brackets.push(Round { round, matches });
        round += 1;
    }

    let mut effects = Vec::new();

    // Resolve round-1 byes as walkovers and emit ready notices for the rest
    for mi in 0..t.brackets[0].matches.len() {
        let m = &t.brackets[0].matches[mi];
        match (m.player1, m.player2) {
            (Some(p1), Some(p2)) => effects.push(Effect::MatchReady {
                match_id: m.match_id.clone(),
                player1: p1,
                player2: p2,
            }),
            (Some(p1), None) => resolve_walkover(t, 0, mi, p1, &mut effects),
            _ => unreachable!("round-1 matches always have a first player"),
        }
    }

    Ok(effects)
}

/// Complete a match as a walkover: the lone participant is recorded as the
/// winner without any win/loss counter change, then advanced as usual.
fn resolve_walkover(
    t: &mut Tournament,
    round_idx: usize,
    match_idx: usize,
    winner: UserId,
    effects: &mut Vec<Effect>,
) {
    let m = &mut t.brackets[round_idx].matches[match_idx];
    m.winner = Some(winner);
    m.status = MatchStatus::Completed;
    let match_id = m.match_id.clone();

    effects.push(Effect::MatchCompleted {
        match_id,
        winner,
    });
    advance_winner(t, round_idx, match_idx, winner, effects);
}

/// Propagate a match winner into the downstream match of the next round.
///
/// Match `i` of round `r` feeds match `i / 2` of round `r + 1`; within that
/// match the winner takes the first empty slot in left-to-right order, so
/// completion order decides slot assignment. A downstream match with only
/// one feeder (non-power-of-two field) can never receive a second player
/// and is itself resolved as a walkover, cascading if necessary.
fn advance_winner(
    t: &mut Tournament,
    round_idx: usize,
    match_idx: usize,
    winner: UserId,
    effects: &mut Vec<Effect>,
) {
    let next_round = round_idx + 1;
    if next_round >= t.brackets.len() {
        return;
    }

    let feeder_count = t.brackets[round_idx].matches.len();
    let target_idx = match_idx / 2;

    let target = &mut t.brackets[next_round].matches[target_idx];
    if target.player1.is_none() {
        target.player1 = Some(winner);
    } else if target.player2.is_none() {
        target.player2 = Some(winner);
    } else {
        // Both feeders already delivered a winner; a third is impossible
        // under serialized per-tournament mutation.
        log::error!(
            "bracket corruption: match {} already has both players",
            target.match_id
        );
        return;
    }

    if let (Some(p1), Some(p2)) = (target.player1, target.player2) {
        effects.push(Effect::MatchReady {
            match_id: target.match_id.clone(),
            player1: p1,
            player2: p2,
        });
        return;
    }

    // The second feeder of the target is match 2*target_idx + 1 of this
    // round; when it does not exist, the target is a structural bye.
    if 2 * target_idx + 1 >= feeder_count {
        resolve_walkover(t, next_round, target_idx, winner, effects);
    }
}

/// Emit a round-started notice when a round fully completes, and finish the
/// tournament once the final match is done. Completion is detected exactly
/// once: the status transition guards against re-entry.
fn finalize_if_complete(t: &mut Tournament, effects: &mut Vec<Effect>) {
    for ri in 0..t.brackets.len() {
        let done = t.brackets[ri]
            .matches
            .iter()
            .all(|m| m.status == MatchStatus::Completed);
        if done && ri + 1 < t.brackets.len() {
            let next = &t.brackets[ri + 1];
            let next_pending = next.matches.iter().any(|m| m.status != MatchStatus::Completed);
            let just_finished = t.brackets[ri]
                .matches
                .iter()
                .any(|m| effects.iter().any(|e| matches!(e, Effect::MatchCompleted { match_id, .. } if *match_id == m.match_id)));
            if next_pending && just_finished {
                effects.push(Effect::RoundStarted { round: next.round });
            }
        }
    }

    let final_round = match t.brackets.last() {
        Some(r) => r,
        None => return,
    };
    let all_done = final_round
        .matches
        .iter()
        .all(|m| m.status == MatchStatus::Completed);
    if !all_done || t.status != TournamentStatus::InProgress {
        return;
    }

    t.status = TournamentStatus::Completed;
    t.finished_at = Some(Utc::now());
    t.standings = compute_standings(t);

    effects.push(Effect::TournamentCompleted {
        standings: t.standings.clone(),
    });
    for standing in &t.standings {
        let prize = match standing.place {
            1 => &t.prizes.first,
            2 => &t.prizes.second,
            3 => &t.prizes.third,
            _ => continue,
        };
        if !prize.is_empty() {
            effects.push(award(standing, prize));
        }
    }
}

fn award(standing: &Standing, prize: &Prize) -> Effect {
    Effect::AwardPrize {
        user_id: standing.user_id,
        place: standing.place,
        coins: prize.coins,
        points: prize.points,
        badge: prize.badge.clone(),
    }
}

/// Final standings for a completed bracket.
///
/// 1st and 2nd are the final match's winner and loser. 3rd place is the
/// semifinal loser with more points, then more wins, then the lower seed;
/// a bracket without a played semifinal has no 3rd place.
fn compute_standings(t: &Tournament) -> Vec<Standing> {
    let mut standings = Vec::new();

    let final_match = match t.brackets.last().and_then(|r| r.matches.first()) {
        Some(m) => m,
        None => return standings,
    };
    let winner = match final_match.winner {
        Some(w) => w,
        None => return standings,
    };

    if let Some(p) = t.participant(winner) {
        standings.push(Standing {
            place: 1,
            user_id: p.user_id,
            username: p.username.clone(),
        });
    }

    let runner_up = [final_match.player1, final_match.player2]
        .into_iter()
        .flatten()
        .find(|&id| id != winner);
    if let Some(id) = runner_up {
        if let Some(p) = t.participant(id) {
            standings.push(Standing {
                place: 2,
                user_id: p.user_id,
                username: p.username.clone(),
            });
        }
    }

    if t.brackets.len() >= 2 {
        let semifinal = &t.brackets[t.brackets.len() - 2];
        let mut losers: Vec<&Participant> = semifinal
            .matches
            .iter()
            .filter_map(|m| {
                let w = m.winner?;
                [m.player1, m.player2]
                    .into_iter()
                    .flatten()
                    .find(|&id| id != w)
            })
            .filter_map(|id| t.participant(id))
            .collect();
        losers.sort_by(|a, b| {
            b.points
                .cmp(&a.points)
                .then(b.wins.cmp(&a.wins))
                .then(a.seed.cmp(&b.seed))
        });
        if let Some(third) = losers.first() {
            standings.push(Standing {
                place: 3,
                user_id: third.user_id,
                username: third.username.clone(),
            });
        }
    }

    standings
}

fn require_phase(t: &Tournament, allowed: &[TournamentStatus]) -> TournamentResult<()> {
    if allowed.contains(&t.status) {
        Ok(())
    } else {
        Err(TournamentError::InvalidState { status: t.status })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tournament::models::{GameType, PrizeTable};

    fn fresh(max: usize) -> Tournament {
        let mut t = Tournament::new(
            "Weekly Cup".to_string(),
            GameType::TicTacToe,
            TournamentFormat::SingleElimination,
            2,
            max,
            PrizeTable::default(),
        );
        t.id = 1;
        t.status = TournamentStatus::Registration;
        t
    }

    fn with_players(n: usize) -> Tournament {
        let mut t = fresh(128);
        for i in 0..n {
            t = register(&t, i as UserId + 1, &format!("player{}", i + 1))
                .unwrap()
                .tournament;
        }
        t
    }

    fn report(t: &Tournament, match_id: &str, winner: UserId) -> Transition {
        report_match_result(t, match_id, winner).unwrap()
    }

    #[test]
    fn test_register_assigns_sequential_seeds() {
        let t = with_players(3);
        let seeds: Vec<u32> = t.participants.iter().map(|p| p.seed).collect();
        assert_eq!(seeds, vec![1, 2, 3]);
    }

    #[test]
    fn test_register_rejects_duplicate_user() {
        let t = with_players(2);
        let err = register(&t, 1, "someone_else").unwrap_err();
        assert!(matches!(err, TournamentError::AlreadyRegistered));
    }

    #[test]
    fn test_register_rejects_when_full() {
        let mut t = fresh(2);
        t = register(&t, 1, "a").unwrap().tournament;
        t = register(&t, 2, "b").unwrap().tournament;
        let err = register(&t, 3, "c").unwrap_err();
        assert!(matches!(err, TournamentError::Full));
    }

    #[test]
    fn test_leave_preserves_remaining_seeds() {
        let mut t = with_players(3);
        t = leave(&t, 2).unwrap().tournament;
        let seeds: Vec<(UserId, u32)> = t.participants.iter().map(|p| (p.user_id, p.seed)).collect();
        assert_eq!(seeds, vec![(1, 1), (3, 3)]);
    }

    #[test]
    fn test_vacated_seeds_are_never_reissued() {
        let mut t = with_players(3);
        t = leave(&t, 2).unwrap().tournament;
        t = register(&t, 9, "latecomer").unwrap().tournament;

        let seeds: Vec<(UserId, u32)> = t.participants.iter().map(|p| (p.user_id, p.seed)).collect();
        assert_eq!(seeds, vec![(1, 1), (3, 3), (9, 4)]);
    }

    #[test]
    fn test_register_requires_open_registration() {
        let mut t = fresh(8);
        t.status = TournamentStatus::Upcoming;
        assert!(matches!(
            register(&t, 1, "early"),
            Err(TournamentError::InvalidState { .. })
        ));

        let t = open_registration(&t).unwrap().tournament;
        assert!(register(&t, 1, "early").is_ok());
    }

    #[test]
    fn test_leave_rejected_after_start() {
        let t = start(&with_players(4)).unwrap().tournament;
        let err = leave(&t, 1).unwrap_err();
        assert!(matches!(err, TournamentError::InvalidState { .. }));
    }

    #[test]
    fn test_start_requires_min_participants() {
        let mut t = fresh(8);
        t.min_participants = 4;
        t = register(&t, 1, "a").unwrap().tournament;
        t = register(&t, 2, "b").unwrap().tournament;
        let err = start(&t).unwrap_err();
        assert!(matches!(
            err,
            TournamentError::InsufficientParticipants { needed: 4, current: 2 }
        ));
    }

    #[test]
    fn test_start_rejects_non_single_elimination() {
        let mut t = with_players(4);
        t.format = TournamentFormat::RoundRobin;
        let err = start(&t).unwrap_err();
        assert!(matches!(
            err,
            TournamentError::UnsupportedFormat(TournamentFormat::RoundRobin)
        ));
    }

    #[test]
    fn test_bracket_shape_power_of_two() {
        let t = start(&with_players(8)).unwrap().tournament;
        assert_eq!(t.brackets.len(), 3);
        assert_eq!(t.brackets[0].matches.len(), 4);
        assert_eq!(t.brackets[1].matches.len(), 2);
        assert_eq!(t.brackets[2].matches.len(), 1);
        assert_eq!(t.status, TournamentStatus::InProgress);
        assert!(t.brackets[0].matches.iter().all(|m| m.is_ready()));
    }

    #[test]
    fn test_bracket_rounds_shrink_by_ceiling_halves() {
        // 9 players: widths 5, 3, 2, 1. Sizing later rounds off the
        // bracket depth instead would give round 2 four matches, one of
        // them with no feeder at all.
        let t = start(&with_players(9)).unwrap().tournament;
        let widths: Vec<usize> = t.brackets.iter().map(|r| r.matches.len()).collect();
        assert_eq!(widths, vec![5, 3, 2, 1]);

        let t = start(&with_players(12)).unwrap().tournament;
        let widths: Vec<usize> = t.brackets.iter().map(|r| r.matches.len()).collect();
        assert_eq!(widths, vec![6, 3, 2, 1]);
    }

    #[test]
    fn test_round_one_pairs_consecutive_seeds() {
        let t = start(&with_players(4)).unwrap().tournament;
        let r1 = &t.brackets[0].matches;
        assert_eq!((r1[0].player1, r1[0].player2), (Some(1), Some(2)));
        assert_eq!((r1[1].player1, r1[1].player2), (Some(3), Some(4)));
        assert_eq!(r1[0].match_id, "R1M1");
        assert_eq!(r1[1].match_id, "R1M2");
    }

    #[test]
    fn test_odd_field_gets_bye_walkover() {
        // Five entrants give 3 rounds; the unpaired seed 5 advances
        // automatically with no counter change.
        let transition = start(&with_players(5)).unwrap();
        let t = &transition.tournament;

        assert_eq!(t.brackets.len(), 3);
        assert_eq!(t.brackets[0].matches.len(), 3);

        let bye = &t.brackets[0].matches[2];
        assert_eq!(bye.player1, Some(5));
        assert_eq!(bye.player2, None);
        assert_eq!(bye.winner, Some(5));
        assert_eq!(bye.status, MatchStatus::Completed);

        let e = t.participant(5).unwrap();
        assert_eq!((e.wins, e.losses), (0, 0));

        // Seed 5 lands in the first slot of the downstream round-2 match
        assert_eq!(t.brackets[1].matches[1].player1, Some(5));
    }

    #[test]
    fn test_report_updates_counters_and_eliminates_loser() {
        let mut t = start(&with_players(4)).unwrap().tournament;
        t = report(&t, "R1M1", 1).tournament;

        let winner = t.participant(1).unwrap();
        let loser = t.participant(2).unwrap();
        assert_eq!(winner.wins, 1);
        assert_eq!(winner.points, 1);
        assert!(!winner.is_eliminated);
        assert_eq!(loser.losses, 1);
        assert!(loser.is_eliminated);

        // Winner fills the first empty slot of the downstream match
        assert_eq!(t.brackets[1].matches[0].player1, Some(1));
        assert_eq!(t.brackets[1].matches[0].player2, None);
    }

    #[test]
    fn test_duplicate_report_rejected_and_counters_unchanged() {
        let mut t = start(&with_players(4)).unwrap().tournament;
        t = report(&t, "R1M1", 1).tournament;

        let err = report_match_result(&t, "R1M1", 1).unwrap_err();
        assert!(matches!(err, TournamentError::MatchAlreadyCompleted(_)));
        assert_eq!(t.participant(1).unwrap().wins, 1);
    }

    #[test]
    fn test_report_unknown_match() {
        let t = start(&with_players(4)).unwrap().tournament;
        let err = report_match_result(&t, "R9M9", 1).unwrap_err();
        assert!(matches!(err, TournamentError::UnknownMatch(_)));
    }

    #[test]
    fn test_report_invalid_winner_leaves_state_untouched() {
        let t = start(&with_players(4)).unwrap().tournament;
        let err = report_match_result(&t, "R1M1", 3).unwrap_err();
        assert!(matches!(err, TournamentError::InvalidWinner { .. }));
        assert_eq!(t.brackets[0].matches[0].status, MatchStatus::Pending);
        assert!(t.participants.iter().all(|p| p.wins == 0 && p.losses == 0));
    }

    #[test]
    fn test_report_on_unfilled_match_rejected() {
        let t = start(&with_players(4)).unwrap().tournament;
        let err = report_match_result(&t, "R2M1", 1).unwrap_err();
        assert!(matches!(err, TournamentError::MatchNotReady(_)));
    }

    #[test]
    fn test_completion_order_decides_downstream_slots() {
        let mut t = start(&with_players(4)).unwrap().tournament;
        // Report the second match first: its winner takes the first slot.
        t = report(&t, "R1M2", 4).tournament;
        t = report(&t, "R1M1", 1).tournament;

        assert_eq!(t.brackets[1].matches[0].player1, Some(4));
        assert_eq!(t.brackets[1].matches[0].player2, Some(1));
    }

    #[test]
    fn test_full_four_player_tournament() {
        let mut t = start(&with_players(4)).unwrap().tournament;
        t = report(&t, "R1M1", 1).tournament;
        t = report(&t, "R1M2", 3).tournament;

        let transition = report(&t, "R2M1", 1);
        let t = transition.tournament;

        assert_eq!(t.status, TournamentStatus::Completed);
        assert!(t.finished_at.is_some());
        assert_eq!(t.standings.len(), 3);
        assert_eq!(t.standings[0].user_id, 1);
        assert_eq!(t.standings[1].user_id, 3);
        // Semifinal losers are 2 and 4, tied on points and wins; the
        // lower seed places third.
        assert_eq!(t.standings[2].user_id, 2);
        assert!(transition
            .effects
            .iter()
            .any(|e| matches!(e, Effect::TournamentCompleted { .. })));
    }

    #[test]
    fn test_completion_is_detected_once() {
        let mut t = start(&with_players(2)).unwrap().tournament;
        assert_eq!(t.brackets.len(), 1);

        t = report(&t, "R1M1", 2).tournament;
        assert_eq!(t.status, TournamentStatus::Completed);
        assert_eq!(t.standings.len(), 2);

        let err = report_match_result(&t, "R1M1", 2).unwrap_err();
        assert!(matches!(err, TournamentError::InvalidState { .. }));
    }

    #[test]
    fn test_six_player_bracket_completes() {
        // Non-power-of-two field where the structural bye appears in
        // round 2 rather than round 1.
        let mut t = start(&with_players(6)).unwrap().tournament;
        assert_eq!(t.brackets.len(), 3);
        assert_eq!(t.brackets[0].matches.len(), 3);

        t = report(&t, "R1M1", 1).tournament;
        t = report(&t, "R1M2", 3).tournament;
        t = report(&t, "R1M3", 5).tournament;

        // Seed 5's winner had no possible round-2 opponent and advanced
        // by walkover into the final.
        let r2 = &t.brackets[1].matches;
        assert_eq!(r2[1].winner, Some(5));
        assert_eq!(t.brackets[2].matches[0].player1, Some(5));

        t = report(&t, "R2M1", 1).tournament;
        t = report(&t, "R3M1", 5).tournament;
        assert_eq!(t.status, TournamentStatus::Completed);
        assert_eq!(t.standings[0].user_id, 5);
    }

    #[test]
    fn test_walkover_chain_keeps_counters_at_zero() {
        let t = start(&with_players(5)).unwrap().tournament;
        // Seed 5 advanced through the round-1 bye and the round-2
        // structural bye without a single played match.
        assert_eq!(t.brackets[1].matches[1].winner, Some(5));
        assert_eq!(t.brackets[2].matches[0].player1, Some(5));
        let e = t.participant(5).unwrap();
        assert_eq!((e.wins, e.losses, e.points), (0, 0, 0));
    }

    #[test]
    fn test_begin_match_links_game_session() {
        let t = start(&with_players(4)).unwrap().tournament;
        let game_id = Uuid::new_v4();
        let t = begin_match(&t, "R1M1", game_id).unwrap().tournament;
        let m = &t.brackets[0].matches[0];
        assert_eq!(m.game_id, Some(game_id));
        assert_eq!(m.status, MatchStatus::InProgress);

        // Reporting on an in-progress match is still allowed once
        let t = report(&t, "R1M1", 1).tournament;
        assert_eq!(t.brackets[0].matches[0].status, MatchStatus::Completed);
    }

    #[test]
    fn test_begin_match_attaches_one_game_only() {
        let t = start(&with_players(4)).unwrap().tournament;
        let t = begin_match(&t, "R1M1", Uuid::new_v4()).unwrap().tournament;

        let err = begin_match(&t, "R1M1", Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, TournamentError::MatchInProgress(_)));
    }

    #[test]
    fn test_cancel_from_any_active_state() {
        let t = fresh(8);
        let cancelled = cancel(&t).unwrap().tournament;
        assert_eq!(cancelled.status, TournamentStatus::Cancelled);

        let err = cancel(&cancelled).unwrap_err();
        assert!(matches!(err, TournamentError::InvalidState { .. }));
    }

    #[test]
    fn test_prize_effects_on_completion() {
        let mut t = with_players(4);
        t.prizes = PrizeTable {
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
            third: Prize::default(),
        };

        let mut t = start(&t).unwrap().tournament;
        t = report(&t, "R1M1", 1).tournament;
        t = report(&t, "R1M2", 3).tournament;
        let transition = report(&t, "R2M1", 3);

        let awards: Vec<_> = transition
            .effects
            .iter()
            .filter(|e| matches!(e, Effect::AwardPrize { .. }))
            .collect();
        // Third place prize is empty, so only two awards
        assert_eq!(awards.len(), 2);
        assert!(matches!(
            awards[0],
            Effect::AwardPrize {
                user_id: 3,
                place: 1,
                coins: 500,
                ..
            }
        ));
    }

    #[test]
    fn test_round_started_effect_on_round_completion() {
        let mut t = start(&with_players(4)).unwrap().tournament;
        t = report(&t, "R1M1", 1).tournament;
        let transition = report(&t, "R1M2", 3);
        assert!(transition
            .effects
            .iter()
            .any(|e| matches!(e, Effect::RoundStarted { round: 2 })));
    }
}
