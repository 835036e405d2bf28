//! Batch simulation: N seeded games in parallel, merged into aggregate
//! statistics.
//!
//! Every game gets its own RNG seeded from `fork_seed(base_seed, index)`,
//! so aggregates are bit-identical for a fixed `(genome, base_seed, N, ai)`
//! no matter how rayon schedules the work. Workers accumulate into local
//! partial results that are reduced at the end; nothing is shared during
//! execution.

use rayon::prelude::*;

use crate::ai::AiKind;
use crate::genome::schema::Genome;
use crate::simulation::engine::{simulate_game, GameOutcome};
use crate::simulation::instrument::GameCounters;

/// Mix a base seed with a game index into an independent per-game seed
/// (splitmix64 finalizer; consecutive indices give uncorrelated streams).
pub fn fork_seed(base_seed: u64, index: u64) -> u64 {
    let mut z = base_seed
        .wrapping_add(0x9e37_79b9_7f4a_7c15_u64.wrapping_mul(index.wrapping_add(1)));
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

/// Batch configuration.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    pub num_games: u32,
    pub base_seed: u64,
    /// One AI per seat; seats beyond the list fall back to Random.
    pub ais: Vec<AiKind>,
}

impl BatchConfig {
    pub fn new(num_games: u32, base_seed: u64, ai: AiKind, player_count: u8) -> Self {
        BatchConfig {
            num_games,
            base_seed,
            ais: vec![ai; player_count as usize],
        }
    }
}

/// Aggregated statistics over a batch of games.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimulationResults {
    pub total_games: u32,
    pub player_count: u8,
    pub wins: Vec<u32>,
    pub team_wins: Vec<u32>,
    pub draws: u32,
    pub errors: u32,
    pub total_turns: u64,

    pub total_decisions: u64,
    pub total_valid_moves: u64,
    pub forced_decisions: u64,
    pub total_hand_size: u64,
    pub total_interactions: u64,
    pub total_actions: u64,

    pub total_claims: u64,
    pub total_bluffs: u64,
    pub total_challenges: u64,
    pub successful_bluffs: u64,
    pub successful_catches: u64,

    pub total_bets: u64,
    pub betting_bluffs: u64,
    pub fold_wins: u64,
    pub showdown_wins: u64,
    pub all_in_count: u64,

    pub lead_changes: u64,
    pub winner_led_turns: u64,
    pub tracked_turns: u64,
    pub closest_margin_sum: f64,
    pub margin_samples: u32,
    pub trailing_winners: u32,

    pub opponent_turn_count: u64,
    pub move_disruption_events: u64,
    pub contention_events: u64,
    pub forced_response_events: u64,
}

impl SimulationResults {
    fn empty(genome: &Genome) -> Self {
        SimulationResults {
            player_count: genome.player_count,
            wins: vec![0; genome.player_count as usize],
            team_wins: vec![0; genome.teams.len()],
            ..SimulationResults::default()
        }
    }

    pub fn avg_turns(&self) -> f64 {
        let finished = self.total_games.saturating_sub(self.errors);
        if finished == 0 {
            0.0
        } else {
            self.total_turns as f64 / finished as f64
        }
    }

    /// Mean normalized final margin between the two leading players.
    pub fn closest_margin(&self) -> f64 {
        if self.margin_samples == 0 {
            1.0
        } else {
            self.closest_margin_sum / self.margin_samples as f64
        }
    }

    /// Fraction of tracked turns on which the eventual winner led.
    pub fn decisive_turn_pct(&self) -> f64 {
        if self.tracked_turns == 0 {
            1.0
        } else {
            self.winner_led_turns as f64 / self.tracked_turns as f64
        }
    }

    fn absorb_outcome(&mut self, outcome: &GameOutcome) {
        self.total_games += 1;
        match outcome.winner {
            Some(winner) => {
                self.wins[winner as usize] += 1;
                if let Some(team) = outcome.winning_team {
                    self.team_wins[team as usize] += 1;
                }
                if outcome.counters.trailing_winner {
                    self.trailing_winners += 1;
                }
                self.closest_margin_sum += outcome.counters.closest_margin;
                self.margin_samples += 1;
            }
            None => self.draws += 1,
        }
        self.total_turns += outcome.turns as u64;
        self.absorb_counters(&outcome.counters);
    }

    fn absorb_counters(&mut self, c: &GameCounters) {
        self.total_decisions += c.total_decisions;
        self.total_valid_moves += c.total_valid_moves;
        self.forced_decisions += c.forced_decisions;
        self.total_hand_size += c.total_hand_size;
        self.total_interactions += c.total_interactions;
        self.total_actions += c.total_actions;
        self.total_claims += c.total_claims;
        self.total_bluffs += c.total_bluffs;
        self.total_challenges += c.total_challenges;
        self.successful_bluffs += c.successful_bluffs;
        self.successful_catches += c.successful_catches;
        self.total_bets += c.total_bets;
        self.betting_bluffs += c.betting_bluffs;
        self.fold_wins += c.fold_wins;
        self.showdown_wins += c.showdown_wins;
        self.all_in_count += c.all_in_count;
        self.lead_changes += c.lead_changes;
        self.winner_led_turns += c.winner_led_turns;
        self.tracked_turns += c.tracked_turns;
        self.opponent_turn_count += c.opponent_turn_count;
        self.move_disruption_events += c.move_disruption_events;
        self.contention_events += c.contention_events;
        self.forced_response_events += c.forced_response_events;
    }

    fn absorb_error(&mut self) {
        self.total_games += 1;
        self.errors += 1;
    }

    /// Order-independent merge of two partial aggregates.
    fn merge(mut self, other: SimulationResults) -> SimulationResults {
        self.total_games += other.total_games;
        for (a, b) in self.wins.iter_mut().zip(&other.wins) {
            *a += b;
        }
        for (a, b) in self.team_wins.iter_mut().zip(&other.team_wins) {
            *a += b;
        }
        self.draws += other.draws;
        self.errors += other.errors;
        self.total_turns += other.total_turns;
        self.total_decisions += other.total_decisions;
        self.total_valid_moves += other.total_valid_moves;
        self.forced_decisions += other.forced_decisions;
        self.total_hand_size += other.total_hand_size;
        self.total_interactions += other.total_interactions;
        self.total_actions += other.total_actions;
        self.total_claims += other.total_claims;
        self.total_bluffs += other.total_bluffs;
        self.total_challenges += other.total_challenges;
        self.successful_bluffs += other.successful_bluffs;
        self.successful_catches += other.successful_catches;
        self.total_bets += other.total_bets;
        self.betting_bluffs += other.betting_bluffs;
        self.fold_wins += other.fold_wins;
        self.showdown_wins += other.showdown_wins;
        self.all_in_count += other.all_in_count;
        self.lead_changes += other.lead_changes;
        self.winner_led_turns += other.winner_led_turns;
        self.tracked_turns += other.tracked_turns;
        self.closest_margin_sum += other.closest_margin_sum;
        self.margin_samples += other.margin_samples;
        self.trailing_winners += other.trailing_winners;
        self.opponent_turn_count += other.opponent_turn_count;
        self.move_disruption_events += other.move_disruption_events;
        self.contention_events += other.contention_events;
        self.forced_response_events += other.forced_response_events;
        self
    }
}

/// Run a batch of seeded games in parallel and aggregate the results.
/// Per-game errors are absorbed into `errors`; the batch never fails.
pub fn run_batch(genome: &Genome, config: &BatchConfig) -> SimulationResults {
    (0..config.num_games as u64)
        .into_par_iter()
        .fold(
            || SimulationResults::empty(genome),
            |mut acc, index| {
                let seed = fork_seed(config.base_seed, index);
                match simulate_game(genome, seed, &config.ais) {
                    Ok(outcome) => acc.absorb_outcome(&outcome),
                    Err(_) => acc.absorb_error(),
                }
                acc
            },
        )
        .reduce(|| SimulationResults::empty(genome), SimulationResults::merge)
}

/// Sequential reference implementation, used to verify that parallel
/// aggregation is order-independent.
pub fn run_batch_sequential(genome: &Genome, config: &BatchConfig) -> SimulationResults {
    let mut acc = SimulationResults::empty(genome);
    for index in 0..config.num_games as u64 {
        let seed = fork_seed(config.base_seed, index);
        match simulate_game(genome, seed, &config.ais) {
            Ok(outcome) => acc.absorb_outcome(&outcome),
            Err(_) => acc.absorb_error(),
        }
    }
    acc
}

/// Build the long-lived worker pool for a run: `min(cores, 64)` threads
/// unless overridden.
pub fn worker_pool(workers: Option<usize>) -> rayon::ThreadPool {
    let threads = workers.unwrap_or_else(|| num_threads_default());
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .expect("worker pool")
}

pub fn num_threads_default() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
        .min(64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genome::examples;

    #[test]
    fn test_fork_seed_spreads_indices() {
        let a = fork_seed(42, 0);
        let b = fork_seed(42, 1);
        let c = fork_seed(43, 0);
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_eq!(fork_seed(42, 0), a);
    }

    #[test]
    fn test_war_batch_s1() {
        let genome = examples::war();
        let config = BatchConfig::new(100, 42, AiKind::Random, 2);
        let results = run_batch(&genome, &config);
        assert_eq!(results.errors, 0);
        assert_eq!(results.wins[0] + results.wins[1] + results.draws, 100);
        assert!(results.avg_turns() > 0.0);
    }

    #[test]
    fn test_batch_is_reproducible_s2() {
        let genome = examples::war();
        let config = BatchConfig::new(50, 42, AiKind::Random, 2);
        let a = run_batch(&genome, &config);
        let b = run_batch(&genome, &config);
        assert_eq!(a, b);
    }

    #[test]
    fn test_parallel_matches_sequential_s3() {
        let genome = examples::crazy_eights();
        let config = BatchConfig::new(30, 7, AiKind::Random, 4);
        let parallel = run_batch(&genome, &config);
        let sequential = run_batch_sequential(&genome, &config);
        assert_eq!(parallel, sequential);
    }
}
