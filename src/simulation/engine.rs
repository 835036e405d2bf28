//! Deterministic single-game interpreter loop.
//!
//! The engine drives a game from a seeded initial state to termination:
//! advancing through empty phases, asking the configured AI for one of the
//! legal moves at each decision point, applying it, and re-checking the win
//! conditions. All randomness flows through one per-game `ChaCha8Rng`, so a
//! `(genome, seed, ai)` triple always replays identically.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use thiserror::Error;

use crate::ai::AiKind;
use crate::genome::schema::{Genome, Phase, ScoringTrigger, WinKind};
use crate::simulation::apply::{advance_turn, apply_move};
use crate::simulation::instrument::GameCounters;
use crate::simulation::movegen::{legal_moves, Move};
use crate::simulation::state::{initial_state, GameState, InitError};
use crate::simulation::termination::{self, Ruling};

/// Simulation failures. Turn-limit timeouts are draws, not errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimError {
    #[error(transparent)]
    Init(#[from] InitError),
    #[error("stuck at turn {turn}: no legal moves and no pass allowed")]
    Stuck { turn: u32 },
}

/// Result of advancing to the next decision point.
#[derive(Debug)]
pub enum StepResult {
    /// The active player must choose one of these moves.
    Decision(GameState, Vec<Move>),
    /// Game over with an optional winner (`None` = draw by turn limit).
    Finished(GameState, Option<u8>),
    /// Dead position: a mandatory, unpassable phase with no legal move.
    Stuck(GameState),
}

/// Final record of one simulated game.
#[derive(Debug, Clone)]
pub struct GameOutcome {
    pub winner: Option<u8>,
    pub winning_team: Option<u8>,
    pub turns: u32,
    pub counters: GameCounters,
}

/// Walk forward until someone has a decision to make, the game ends, or the
/// position is dead. Skipped phases and turn boundaries are resolved here.
pub fn next_decision(
    state: GameState,
    genome: &Genome,
    counters: &mut GameCounters,
) -> StepResult {
    let mut state = state;
    let sweep_limit =
        (genome.max_turns as u64 + 2) * genome.player_count as u64 * (genome.turn_structure.phases.len() as u64 + 1);
    let mut sweeps: u64 = 0;
    loop {
        match termination::check(&state, genome) {
            Some(Ruling::HandEnd) => {
                state = finalize_hand(state, genome, counters);
                continue;
            }
            Some(Ruling::Winner(winner)) => return StepResult::Finished(state, Some(winner)),
            None => {}
        }
        if state.turn > genome.max_turns {
            return StepResult::Finished(state, None);
        }
        // Rounds upon rounds in which nothing can move is a dead position.
        if state.consecutive_pass_rounds >= 3 {
            return StepResult::Stuck(state);
        }

        let moves = legal_moves(&state, genome);
        if !moves.is_empty() {
            return StepResult::Decision(state, moves);
        }
        if hard_stuck(&state, genome) {
            return StepResult::Stuck(state);
        }
        if state.phase_index + 1 < genome.turn_structure.phases.len() {
            let mut next = state.clone();
            next.phase_index += 1;
            state = next;
        } else {
            state = advance_turn(&state);
        }
        sweeps += 1;
        if sweeps > sweep_limit {
            return StepResult::Stuck(state);
        }
    }
}

/// Mandatory play phase, cards in hand, nothing legal, no pass allowed:
/// the game cannot continue.
fn hard_stuck(state: &GameState, genome: &Genome) -> bool {
    match genome.turn_structure.phases.get(state.phase_index) {
        Some(Phase::Play(play)) => {
            play.mandatory && !play.pass_if_unable && !state.active().hand.is_empty()
        }
        _ => false,
    }
}

/// Apply end-of-hand settlement once: hand-end card scoring, contract
/// scoring for bid games, and the pot award.
pub fn finalize_hand(
    state: GameState,
    genome: &Genome,
    counters: &mut GameCounters,
) -> GameState {
    let mut state = state;

    let has_hand_end_rules = genome
        .card_scoring
        .iter()
        .any(|r| r.trigger == ScoringTrigger::HandEnd);
    if has_hand_end_rules {
        for idx in 0..state.players.len() {
            let hand = state.players[idx].hand.clone();
            for card in hand {
                for rule in &genome.card_scoring {
                    if rule.trigger == ScoringTrigger::HandEnd && rule.condition.matches(card) {
                        state.players[idx].score += rule.points;
                    }
                }
            }
        }
    }

    if let Some(contract) = &genome.contract_scoring {
        for idx in 0..state.players.len() {
            let Some(bid) = state.bids[idx] else { continue };
            let taken = state.tricks_won[idx] as i32;
            let bid = bid as i32;
            let delta = if bid == 0 {
                if taken == 0 {
                    contract.nil_bonus
                } else {
                    -contract.nil_bonus
                }
            } else if taken >= bid {
                bid * contract.points_per_bid_trick
                    + (taken - bid) * contract.overtrick_points
            } else {
                -bid * contract.undertrick_penalty
            };
            state.players[idx].score += delta;
        }
    }

    if state.pot > 0 {
        let winner = state.fold_win.or_else(|| pot_winner(&state, genome));
        if let Some(winner) = winner {
            state.players[winner as usize].chips += state.pot;
            state.pot = 0;
            if state.fold_win.is_some() {
                counters.fold_wins += 1;
            } else {
                counters.showdown_wins += 1;
            }
        }
    }

    state.hand_finalized = true;
    state
}

/// Showdown: best evaluated hand among the unfolded players.
fn pot_winner(state: &GameState, genome: &Genome) -> Option<u8> {
    let eval = genome.hand_evaluation.as_ref()?;
    let mut best: Option<(crate::simulation::hand_eval::HandStrength, u8)> = None;
    for player in state.players.iter().filter(|p| !p.has_folded) {
        let strength = crate::simulation::hand_eval::evaluate_hand(eval, &player.hand);
        match &best {
            Some((current, _)) if *current >= strength => {}
            _ => best = Some((strength, player.id)),
        }
    }
    best.map(|(_, id)| id)
}

/// Per-player standings where larger is always better; used for lead
/// tracking only, never for the actual win decision.
fn standings(state: &GameState, genome: &Genome) -> Vec<i64> {
    let lowest_wins = genome.win_conditions.first().map_or(false, |wc| {
        matches!(
            wc.comparison,
            crate::genome::schema::WinComparison::Lowest
        ) || wc.kind == WinKind::LowScore
            || wc.kind == WinKind::FewestTricks
    });
    let uses_chips = genome.setup.starting_chips > 0;
    let uses_score = !genome.card_scoring.is_empty() || genome.contract_scoring.is_some();
    let uses_tricks = genome.has_trick_phase();

    state
        .players
        .iter()
        .map(|p| {
            let raw: i64 = if uses_chips {
                (p.chips + p.current_bet) as i64
            } else if uses_score {
                p.score as i64
            } else if uses_tricks {
                state.tricks_won[p.id as usize] as i64
            } else {
                // Shedding games: fewer cards in hand is better; captures
                // count for capture games.
                state.captured[p.id as usize].len() as i64 - p.hand.len() as i64
            };
            if lowest_wins {
                -raw
            } else {
                raw
            }
        })
        .collect()
}

fn current_leader(standings: &[i64]) -> Option<u8> {
    let max = *standings.iter().max()?;
    let leaders: Vec<u8> = standings
        .iter()
        .enumerate()
        .filter(|(_, &s)| s == max)
        .map(|(i, _)| i as u8)
        .collect();
    match leaders.as_slice() {
        [only] => Some(*only),
        _ => None,
    }
}

/// Run one full game. Returns the outcome with instrumentation, or an error
/// for dead positions and invalid genomes.
pub fn simulate_game(genome: &Genome, seed: u64, ais: &[AiKind]) -> Result<GameOutcome, SimError> {
    let (outcome, _, _) = simulate_game_inner(genome, seed, ais, false)?;
    Ok(outcome)
}

/// `playtest` hook: run one game and keep the terminal state plus the full
/// move log.
pub fn simulate_one_game(
    genome: &Genome,
    seed: u64,
    ais: &[AiKind],
) -> Result<(GameOutcome, GameState, Vec<Move>), SimError> {
    let (outcome, state, log) = simulate_game_inner(genome, seed, ais, true)?;
    Ok((outcome, state.expect("terminal state recorded"), log))
}

fn simulate_game_inner(
    genome: &Genome,
    seed: u64,
    ais: &[AiKind],
    keep_log: bool,
) -> Result<(GameOutcome, Option<GameState>, Vec<Move>), SimError> {
    let mut counters = GameCounters::new();
    let mut rng = ChaCha8Rng::seed_from_u64(seed ^ 0x9e37_79b9_7f4a_7c15);
    let mut state = initial_state(genome, seed)?;
    let mut move_log = Vec::new();

    // Lead tracking, sampled at round boundaries.
    let mut leaders: Vec<Option<u8>> = Vec::new();
    let mut last_round_seen: u32 = 0;

    let (final_state, winner) = loop {
        match next_decision(state, genome, &mut counters) {
            StepResult::Finished(final_state, winner) => break (final_state, winner),
            StepResult::Stuck(stuck_state) => {
                return Err(SimError::Stuck {
                    turn: stuck_state.turn,
                })
            }
            StepResult::Decision(current, moves) => {
                if current.turn > last_round_seen {
                    last_round_seen = current.turn;
                    leaders.push(current_leader(&standings(&current, genome)));
                }
                let actor = current.active_player;
                if actor != 0 {
                    counters.opponent_turn_count += 1;
                }
                counters.record_decision(moves.len(), current.active().hand.len());

                let choice = ais
                    .get(actor as usize)
                    .copied()
                    .unwrap_or(AiKind::Random)
                    .decide(&current, genome, &moves, &mut rng);
                let mv = moves[choice];
                if keep_log {
                    move_log.push(mv);
                }
                state = apply_move(&current, &mv, genome, &mut rng, &mut counters);
            }
        }
    };

    // Tension metrics from the sampled leader history.
    let mut previous: Option<u8> = None;
    for leader in leaders.iter().flatten() {
        if let Some(prev) = previous {
            if prev != *leader {
                counters.lead_changes += 1;
            }
        }
        previous = Some(*leader);
    }
    if let Some(winner) = winner {
        counters.tracked_turns = leaders.len() as u64;
        counters.winner_led_turns = leaders
            .iter()
            .filter(|l| **l == Some(winner))
            .count() as u64;
        if !leaders.is_empty() {
            let midpoint = leaders.len() / 2;
            counters.trailing_winner = leaders[midpoint.min(leaders.len() - 1)]
                .map_or(false, |mid_leader| mid_leader != winner);
        }
        let final_standings = standings(&final_state, genome);
        let mut sorted = final_standings.clone();
        sorted.sort_unstable_by(|a, b| b.cmp(a));
        if sorted.len() >= 2 {
            let spread = (sorted[0] - sorted[1]).unsigned_abs() as f64;
            let scale = sorted[0].unsigned_abs().max(1) as f64;
            counters.closest_margin = (spread / scale).min(1.0);
        }
    }

    let winning_team = winner.and_then(|w| {
        genome
            .teams
            .iter()
            .position(|team| team.contains(&w))
            .map(|idx| idx as u8)
    });

    let outcome = GameOutcome {
        winner,
        winning_team,
        turns: final_state.turn.min(genome.max_turns),
        counters,
    };
    Ok((outcome, keep_log.then_some(final_state), move_log))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genome::examples;

    #[test]
    fn test_war_game_completes_without_errors() {
        let genome = examples::war();
        let outcome = simulate_game(&genome, 42, &[AiKind::Random, AiKind::Random]).unwrap();
        assert!(outcome.turns > 0);
        assert!(outcome.counters.total_actions > 0);
    }

    #[test]
    fn test_simulation_is_deterministic() {
        let genome = examples::crazy_eights();
        let ais = vec![AiKind::Random; 4];
        let a = simulate_game(&genome, 7, &ais).unwrap();
        let b = simulate_game(&genome, 7, &ais).unwrap();
        assert_eq!(a.winner, b.winner);
        assert_eq!(a.turns, b.turns);
        assert_eq!(a.counters, b.counters);
    }

    #[test]
    fn test_hearts_distributes_26_points() {
        let genome = examples::hearts();
        let ais = vec![AiKind::Random; 4];
        let (outcome, state, _) = simulate_one_game(&genome, 3, &ais).unwrap();
        if outcome.winner.is_some() {
            let total: i32 = state.players.iter().map(|p| p.score).sum();
            assert_eq!(total, 26);
        }
    }

    #[test]
    fn test_poker_conserves_chips() {
        let genome = examples::simple_poker();
        let ais = vec![AiKind::Random; 2];
        let (outcome, state, _) = simulate_one_game(&genome, 11, &ais).unwrap();
        assert_eq!(state.players.iter().map(|p| p.chips).sum::<i32>() + state.pot, 1000);
        assert!(outcome.winner.is_some());
    }

    #[test]
    fn test_move_log_recorded() {
        let genome = examples::war();
        let ais = vec![AiKind::Random; 2];
        let (outcome, _, log) = simulate_one_game(&genome, 1, &ais).unwrap();
        assert_eq!(log.len() as u64, outcome.counters.total_actions);
    }
}
