//! Win-condition evaluation. After every move the engine walks the win
//! conditions in declared order; the first one whose trigger fires names the
//! winner. Ties go to the lowest player id.

use crate::genome::schema::{Genome, TriggerMode, WinComparison, WinCondition, WinKind};
use crate::simulation::hand_eval::{evaluate_hand, HandStrength};
use crate::simulation::state::GameState;

/// Outcome of a termination check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ruling {
    /// Game over; this player won.
    Winner(u8),
    /// The hand is over (hands empty, deck exhausted, showdown due) but
    /// end-of-hand scoring has not been applied yet. The engine finalizes
    /// the hand and re-checks.
    HandEnd,
}

/// Evaluate all win conditions against the state.
pub fn check(state: &GameState, genome: &Genome) -> Option<Ruling> {
    // A fold leaves one player contesting the pot; the hand is over.
    if state.fold_win.is_some() && !state.hand_finalized {
        return Some(Ruling::HandEnd);
    }
    if let (Some(winner), true) = (state.fold_win, state.hand_finalized) {
        return Some(Ruling::Winner(winner));
    }

    let all_hands_empty = state.players.iter().all(|p| p.hand.is_empty());
    let deck_empty = state.deck.is_empty();
    let showdown_due = showdown_due(state, genome);

    let hand_over = all_hands_empty || state.deck_exhausted || showdown_due;
    if hand_over && !state.hand_finalized && needs_finalization(genome) {
        return Some(Ruling::HandEnd);
    }

    for wc in &genome.win_conditions {
        if !trigger_fires(wc, state, all_hands_empty, deck_empty) {
            continue;
        }
        if let Some(winner) = evaluate_condition(wc, state, genome, all_hands_empty, showdown_due)
        {
            return Some(Ruling::Winner(winner));
        }
    }
    None
}

/// Whether showdown-style evaluation is due: the betting round has settled,
/// or every player has stood pat for a full round.
fn showdown_due(state: &GameState, genome: &Genome) -> bool {
    if genome
        .win_conditions
        .iter()
        .all(|wc| wc.kind != WinKind::BestHand)
    {
        return false;
    }
    if genome.has_betting_phase() {
        state.betting_round_complete
    } else {
        state.consecutive_pass_rounds >= 1
    }
}

/// Hand-end scoring, contract settlement and pot awards only need to run if
/// the genome has any of those mechanisms.
fn needs_finalization(genome: &Genome) -> bool {
    genome.setup.starting_chips > 0
        || genome.contract_scoring.is_some()
        || genome
            .card_scoring
            .iter()
            .any(|r| r.trigger == crate::genome::schema::ScoringTrigger::HandEnd)
}

fn trigger_fires(
    wc: &WinCondition,
    state: &GameState,
    all_hands_empty: bool,
    deck_empty: bool,
) -> bool {
    match wc.trigger {
        TriggerMode::Immediate => true,
        // The gate opens once anyone reaches the threshold; which player
        // then wins is the comparison's business, not the trigger's.
        TriggerMode::ThresholdGate => match wc.threshold {
            Some(threshold) => state.players.iter().any(|p| p.score >= threshold),
            None => true,
        },
        TriggerMode::AllHandsEmpty => all_hands_empty,
        TriggerMode::DeckEmpty => deck_empty || state.deck_exhausted,
    }
}

fn evaluate_condition(
    wc: &WinCondition,
    state: &GameState,
    genome: &Genome,
    all_hands_empty: bool,
    showdown_due: bool,
) -> Option<u8> {
    match wc.kind {
        WinKind::EmptyHand => state
            .players
            .iter()
            .find(|p| {
                // An empty hand with an unresolved claim outstanding does
                // not win yet; the challenge may hand the cards back.
                let claim_pending = state
                    .current_claim
                    .as_ref()
                    .map_or(false, |c| c.claimer == p.id);
                p.hand.is_empty() && !claim_pending
            })
            .map(|p| p.id),
        WinKind::CaptureAll => {
            // The winner must hold the entire deck in hand plus captures.
            // Cards sitting in a half-played battle pile, the trick in
            // flight, or a pending claim keep the count below 52, so the
            // game cannot end while a shared zone is still contested.
            state
                .players
                .iter()
                .find(|p| p.hand.len() + state.captured[p.id as usize].len() == 52)
                .map(|p| p.id)
        }
        WinKind::HighScore => {
            let fires = match wc.trigger {
                TriggerMode::Immediate => all_hands_empty,
                _ => true,
            };
            fires.then(|| best_by(state, |p| p.score, true))?
        }
        WinKind::LowScore => {
            let fires = match wc.trigger {
                TriggerMode::Immediate => all_hands_empty,
                _ => true,
            };
            fires.then(|| best_by(state, |p| p.score, false))?
        }
        WinKind::FirstToScore => {
            let threshold = wc.threshold?;
            state
                .players
                .iter()
                .find(|p| p.score >= threshold)
                .map(|p| p.id)
        }
        WinKind::MostCaptured => {
            if !all_hands_empty && !state.deck.is_empty() {
                return None;
            }
            best_by(state, |p| state.captured[p.id as usize].len() as i32, true)
        }
        WinKind::MostTricks => {
            if !all_hands_empty {
                return None;
            }
            best_by(state, |p| state.tricks_won[p.id as usize] as i32, true)
        }
        WinKind::FewestTricks => {
            if !all_hands_empty {
                return None;
            }
            best_by(state, |p| state.tricks_won[p.id as usize] as i32, false)
        }
        WinKind::BestHand => {
            if !showdown_due && !all_hands_empty && !state.deck_exhausted {
                return None;
            }
            let eval = genome.hand_evaluation.as_ref()?;
            let mut best: Option<(HandStrength, u8)> = None;
            for player in state.players.iter().filter(|p| !p.has_folded) {
                if let Some(required) = wc.required_hand_size {
                    if player.hand.len() != required as usize {
                        continue;
                    }
                }
                let strength = evaluate_hand(eval, &player.hand);
                match &best {
                    Some((current, _)) if *current >= strength => {}
                    _ => best = Some((strength, player.id)),
                }
            }
            best.map(|(_, id)| id)
        }
        WinKind::AllHandsEmpty => {
            if !all_hands_empty {
                return None;
            }
            // Winner derived from the declared comparison over scores.
            match wc.comparison {
                WinComparison::Lowest => best_by(state, |p| p.score, false),
                _ => best_by(state, |p| p.score, true),
            }
        }
        WinKind::DeckEmpty => {
            if !state.deck.is_empty() && !state.deck_exhausted {
                return None;
            }
            match wc.comparison {
                WinComparison::Lowest => best_by(state, |p| p.score, false),
                _ => best_by(state, |p| p.score, true),
            }
        }
        WinKind::MostChips => {
            let over = all_hands_empty
                || state.deck_exhausted
                || state.players.iter().filter(|p| p.chips > 0).count() <= 1;
            if !over {
                return None;
            }
            best_by(state, |p| p.chips, true)
        }
    }
}

/// Best player by a metric; ties break to the lowest id because iteration
/// is in id order and only strict improvements replace the leader.
fn best_by<F: Fn(&crate::simulation::state::PlayerState) -> i32>(
    state: &GameState,
    metric: F,
    highest: bool,
) -> Option<u8> {
    let mut best: Option<(i32, u8)> = None;
    for player in &state.players {
        let value = metric(player);
        let better = match best {
            None => true,
            Some((current, _)) => {
                if highest {
                    value > current
                } else {
                    value < current
                }
            }
        };
        if better {
            best = Some((value, player.id));
        }
    }
    best.map(|(_, id)| id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::{Card, Rank, Suit};
    use crate::genome::examples;
    use crate::simulation::state::initial_state;

    #[test]
    fn test_empty_hand_wins_lowest_id_on_tie() {
        let genome = examples::crazy_eights();
        let mut state = initial_state(&genome, 5).unwrap();
        state.players[1].hand.clear();
        state.players[2].hand.clear();
        assert_eq!(check(&state, &genome), Some(Ruling::Winner(1)));
    }

    #[test]
    fn test_capture_all_fires_when_one_player_holds_everything() {
        let genome = examples::war();
        let mut state = initial_state(&genome, 5).unwrap();
        let cards: Vec<Card> = state.players[1].hand.drain(..).collect();
        state.players[0].hand.extend(cards);
        assert_eq!(check(&state, &genome), Some(Ruling::Winner(0)));
    }

    #[test]
    fn test_capture_all_waits_for_battle_in_flight() {
        // The loser's last card sits alone in the battle pile: the
        // opponent has 51 cards and the battle is unresolved, so the game
        // must continue until the pile is won.
        let genome = examples::war();
        let mut state = initial_state(&genome, 5).unwrap();
        let cards: Vec<Card> = state.players[1].hand.drain(..).collect();
        state.players[0].hand.extend(cards);
        let staked = state.players[0].hand.pop().unwrap();
        state.tableau[0].push(staked);
        assert_eq!(check(&state, &genome), None);

        // Pile resolved back to the holder: now the win fires.
        let pile: Vec<Card> = state.tableau[0].drain(..).collect();
        state.players[0].hand.extend(pile);
        assert_eq!(check(&state, &genome), Some(Ruling::Winner(0)));
    }

    #[test]
    fn test_first_to_score_fires_immediately() {
        let genome = examples::spades();
        let mut state = initial_state(&genome, 5).unwrap();
        assert_eq!(check(&state, &genome), None);
        state.players[2].score = 260;
        assert_eq!(check(&state, &genome), Some(Ruling::Winner(2)));
    }

    #[test]
    fn test_all_hands_empty_lowest_score_wins() {
        let genome = examples::hearts();
        let mut state = initial_state(&genome, 5).unwrap();
        for p in state.players.iter_mut() {
            p.hand.clear();
        }
        state.players[0].score = 5;
        state.players[1].score = 0;
        state.players[2].score = 13;
        state.players[3].score = 8;
        assert_eq!(check(&state, &genome), Some(Ruling::Winner(1)));
    }

    #[test]
    fn test_best_hand_waits_for_showdown() {
        let genome = examples::simple_poker();
        let mut state = initial_state(&genome, 5).unwrap();
        assert_eq!(check(&state, &genome), None);
        state.betting_round_complete = true;
        state.hand_finalized = true;
        let ruling = check(&state, &genome);
        assert!(matches!(ruling, Some(Ruling::Winner(_))));
    }

    #[test]
    fn test_fold_win_requests_finalization_then_wins() {
        let genome = examples::simple_poker();
        let mut state = initial_state(&genome, 5).unwrap();
        state.players[0].has_folded = true;
        state.fold_win = Some(1);
        assert_eq!(check(&state, &genome), Some(Ruling::HandEnd));
        state.hand_finalized = true;
        assert_eq!(check(&state, &genome), Some(Ruling::Winner(1)));
    }

    #[test]
    fn test_blackjack_showdown_after_all_stand() {
        let genome = examples::blackjack();
        let mut state = initial_state(&genome, 5).unwrap();
        state.players[0].hand = vec![
            Card::new(Rank::King, Suit::Hearts),
            Card::new(Rank::Nine, Suit::Clubs),
        ];
        state.players[1].hand = vec![
            Card::new(Rank::Ten, Suit::Spades),
            Card::new(Rank::Five, Suit::Diamonds),
        ];
        assert_eq!(check(&state, &genome), None);
        state.consecutive_pass_rounds = 1;
        assert_eq!(check(&state, &genome), Some(Ruling::Winner(0)));
    }
}
