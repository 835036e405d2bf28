//! Two-tier skill evaluation: Greedy vs Random measures whether basic
//! strategy helps at all, MCTS vs Random measures the skill ceiling. Both
//! tiers run in both seat orders to cancel first-player bias.

use std::time::Instant;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::ai::AiKind;
use crate::genome::Genome;
use crate::simulation::batch::{run_batch_sequential, BatchConfig};

/// Result of skill evaluation for one genome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillEvalResult {
    pub genome_id: String,
    pub greedy_wins_as_p0: u32,
    pub greedy_wins_as_p1: u32,
    pub greedy_win_rate: f64,
    pub mcts_wins_as_p0: u32,
    pub mcts_wins_as_p1: u32,
    pub mcts_win_rate: f64,
    pub total_games: u32,
    /// 0.5 = strategy does not help, 1.0 = the smarter AI always wins.
    pub skill_score: f64,
    /// Positive favors seat 0, negative seat 1; 0 is balanced.
    pub first_player_advantage: f64,
    pub timed_out: bool,
}

/// Knobs for a skill evaluation pass.
#[derive(Debug, Clone, Copy)]
pub struct SkillEvalConfig {
    /// Games per tier, split between the two seat orders.
    pub num_games: u32,
    pub mcts_iterations: u32,
    pub timeout_secs: f64,
    pub base_seed: u64,
}

impl Default for SkillEvalConfig {
    fn default() -> Self {
        SkillEvalConfig {
            num_games: 10,
            mcts_iterations: 100,
            timeout_secs: 30.0,
            base_seed: 0,
        }
    }
}

/// A smart seat against a field of Random opponents; `seat` picks where
/// the smart AI sits.
fn asymmetric_ais(genome: &Genome, smart: AiKind, seat: usize) -> Vec<AiKind> {
    let mut ais = vec![AiKind::Random; genome.player_count as usize];
    if seat < ais.len() {
        ais[seat] = smart;
    }
    ais
}

/// Run the full two-tier evaluation for one genome. Partial results with
/// `timed_out` set are returned when the wall clock runs out.
pub fn evaluate_skill(genome: &Genome, config: &SkillEvalConfig) -> SkillEvalResult {
    let start = Instant::now();
    let per_direction = (config.num_games / 2).max(1);
    let last_seat = genome.player_count as usize - 1;

    let run = |smart: AiKind, seat: usize, seed_salt: u64| {
        let batch = BatchConfig {
            num_games: per_direction,
            base_seed: config.base_seed ^ seed_salt,
            ais: asymmetric_ais(genome, smart, seat),
        };
        run_batch_sequential(genome, &batch)
    };
    let timed_out = |start: &Instant| start.elapsed().as_secs_f64() > config.timeout_secs;

    let mut stages: Vec<(u32, u32)> = Vec::new(); // (smart wins, games)
    let mut cut_short = false;

    let plan = [
        (AiKind::Greedy, 0usize, 0x51u64),
        (AiKind::Greedy, last_seat, 0x52),
        (AiKind::Mcts(config.mcts_iterations), 0, 0x53),
        (AiKind::Mcts(config.mcts_iterations), last_seat, 0x54),
    ];
    for (smart, seat, salt) in plan {
        if timed_out(&start) {
            cut_short = true;
            break;
        }
        let results = run(smart, seat, salt);
        stages.push((results.wins[seat], per_direction));
    }

    let stage = |idx: usize| stages.get(idx).copied().unwrap_or((0, 0));
    let (greedy_p0, greedy_p0_games) = stage(0);
    let (greedy_p1, greedy_p1_games) = stage(1);
    let (mcts_p0, mcts_p0_games) = stage(2);
    let (mcts_p1, mcts_p1_games) = stage(3);

    let rate = |wins: u32, games: u32| {
        if games == 0 {
            0.5
        } else {
            wins as f64 / games as f64
        }
    };
    let greedy_games = greedy_p0_games + greedy_p1_games;
    let mcts_games = mcts_p0_games + mcts_p1_games;
    let greedy_win_rate = rate(greedy_p0 + greedy_p1, greedy_games);
    let mcts_win_rate = rate(mcts_p0 + mcts_p1, mcts_games);
    let skill_score = greedy_win_rate * 0.5 + mcts_win_rate * 0.5;

    let p0_rate = rate(greedy_p0 + mcts_p0, greedy_p0_games + mcts_p0_games);
    let p1_rate = rate(greedy_p1 + mcts_p1, greedy_p1_games + mcts_p1_games);

    SkillEvalResult {
        genome_id: genome.id.clone(),
        greedy_wins_as_p0: greedy_p0,
        greedy_wins_as_p1: greedy_p1,
        greedy_win_rate,
        mcts_wins_as_p0: mcts_p0,
        mcts_wins_as_p1: mcts_p1,
        mcts_win_rate,
        total_games: greedy_games + mcts_games,
        skill_score,
        first_player_advantage: p0_rate - p1_rate,
        timed_out: cut_short,
    }
}

/// Evaluate many genomes in parallel; results come back in input order.
pub fn evaluate_batch_skill(genomes: &[Genome], config: &SkillEvalConfig) -> Vec<SkillEvalResult> {
    genomes
        .par_iter()
        .map(|genome| evaluate_skill(genome, config))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genome::examples;

    #[test]
    fn test_war_has_no_skill_gap() {
        // War offers no meaningful decisions, so greedy play cannot help
        // much: the skill score should sit near a coin flip.
        let config = SkillEvalConfig {
            num_games: 4,
            mcts_iterations: 5,
            timeout_secs: 120.0,
            base_seed: 42,
        };
        let result = evaluate_skill(&examples::war(), &config);
        assert_eq!(result.genome_id, "war-baseline");
        assert!(!result.timed_out);
        assert!(result.total_games > 0);
        assert!((0.0..=1.0).contains(&result.skill_score));
        assert!((-1.0..=1.0).contains(&result.first_player_advantage));
    }

    #[test]
    fn test_skill_eval_is_deterministic() {
        let config = SkillEvalConfig {
            num_games: 6,
            mcts_iterations: 10,
            timeout_secs: 120.0,
            base_seed: 7,
        };
        let genome = examples::blackjack();
        let a = evaluate_skill(&genome, &config);
        let b = evaluate_skill(&genome, &config);
        assert_eq!(a, b);
    }

    #[test]
    fn test_batch_skill_preserves_order() {
        let config = SkillEvalConfig {
            num_games: 4,
            mcts_iterations: 5,
            timeout_secs: 120.0,
            base_seed: 1,
        };
        let genomes = vec![examples::war(), examples::blackjack()];
        let results = evaluate_batch_skill(&genomes, &config);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].genome_id, "war-baseline");
        assert_eq!(results[1].genome_id, "blackjack-duel");
    }
}
