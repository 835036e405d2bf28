//! Fitness evaluation: aggregated simulation statistics plus static genome
//! inspection, mapped to a scalar score through style-weighted metrics and
//! hard quality gates.

use serde::{Deserialize, Serialize};

use crate::evolution::complexity::rules_complexity_score;
use crate::genome::coherence;
use crate::genome::schema::{Genome, Phase};
use crate::simulation::batch::SimulationResults;

/// Style presets assigning normalized weights to the seven non-constraint
/// metrics. Rules complexity is weighted heavily across the board: complex
/// games do not get played.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FitnessStyle {
    Balanced,
    Bluffing,
    Strategic,
    Party,
    TrickTaking,
}

impl FitnessStyle {
    pub const ALL: [FitnessStyle; 5] = [
        FitnessStyle::Balanced,
        FitnessStyle::Bluffing,
        FitnessStyle::Strategic,
        FitnessStyle::Party,
        FitnessStyle::TrickTaking,
    ];

    /// Raw preset weights, normalized to sum to 1 by the evaluator.
    fn weights(self) -> MetricWeights {
        match self {
            // Games need meaningful decisions AND need to be learnable; a
            // game without decisions should not rank high just for being
            // simple.
            FitnessStyle::Balanced => MetricWeights {
                decision_density: 0.25,
                skill_vs_luck: 0.20,
                rules_complexity: 0.18,
                comeback_potential: 0.12,
                interaction_frequency: 0.10,
                tension_curve: 0.08,
                bluffing_depth: 0.00,
                betting_engagement: 0.07,
            },
            FitnessStyle::Bluffing => MetricWeights {
                rules_complexity: 0.35,
                decision_density: 0.05,
                comeback_potential: 0.05,
                tension_curve: 0.05,
                interaction_frequency: 0.08,
                skill_vs_luck: 0.05,
                bluffing_depth: 0.18,
                betting_engagement: 0.19,
            },
            FitnessStyle::Strategic => MetricWeights {
                rules_complexity: 0.30,
                decision_density: 0.20,
                comeback_potential: 0.08,
                tension_curve: 0.05,
                interaction_frequency: 0.10,
                skill_vs_luck: 0.27,
                bluffing_depth: 0.00,
                betting_engagement: 0.00,
            },
            // Party games must be dead simple; explain in two minutes.
            FitnessStyle::Party => MetricWeights {
                rules_complexity: 0.50,
                decision_density: 0.04,
                comeback_potential: 0.12,
                tension_curve: 0.06,
                interaction_frequency: 0.14,
                skill_vs_luck: 0.04,
                bluffing_depth: 0.00,
                betting_engagement: 0.10,
            },
            FitnessStyle::TrickTaking => MetricWeights {
                rules_complexity: 0.30,
                decision_density: 0.15,
                comeback_potential: 0.10,
                tension_curve: 0.12,
                interaction_frequency: 0.18,
                skill_vs_luck: 0.15,
                bluffing_depth: 0.00,
                betting_engagement: 0.00,
            },
        }
    }
}

impl std::str::FromStr for FitnessStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "balanced" => Ok(FitnessStyle::Balanced),
            "bluffing" => Ok(FitnessStyle::Bluffing),
            "strategic" => Ok(FitnessStyle::Strategic),
            "party" => Ok(FitnessStyle::Party),
            "trick-taking" => Ok(FitnessStyle::TrickTaking),
            other => Err(format!("unknown fitness style '{}'", other)),
        }
    }
}

impl std::fmt::Display for FitnessStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            FitnessStyle::Balanced => "balanced",
            FitnessStyle::Bluffing => "bluffing",
            FitnessStyle::Strategic => "strategic",
            FitnessStyle::Party => "party",
            FitnessStyle::TrickTaking => "trick-taking",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy)]
struct MetricWeights {
    decision_density: f64,
    comeback_potential: f64,
    tension_curve: f64,
    interaction_frequency: f64,
    rules_complexity: f64,
    skill_vs_luck: f64,
    bluffing_depth: f64,
    betting_engagement: f64,
}

impl MetricWeights {
    fn normalized(self) -> MetricWeights {
        let total = self.decision_density
            + self.comeback_potential
            + self.tension_curve
            + self.interaction_frequency
            + self.rules_complexity
            + self.skill_vs_luck
            + self.bluffing_depth
            + self.betting_engagement;
        MetricWeights {
            decision_density: self.decision_density / total,
            comeback_potential: self.comeback_potential / total,
            tension_curve: self.tension_curve / total,
            interaction_frequency: self.interaction_frequency / total,
            rules_complexity: self.rules_complexity / total,
            skill_vs_luck: self.skill_vs_luck / total,
            bluffing_depth: self.bluffing_depth / total,
            betting_engagement: self.betting_engagement / total,
        }
    }
}

/// Complete fitness evaluation, all components normalized to [0, 1].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitnessMetrics {
    pub decision_density: f64,
    pub comeback_potential: f64,
    pub tension_curve: f64,
    pub interaction_frequency: f64,
    pub rules_complexity: f64,
    /// Constraint, reported but never averaged into the total.
    pub session_length: f64,
    pub skill_vs_luck: f64,
    pub bluffing_depth: f64,
    pub betting_engagement: f64,
    pub total_fitness: f64,
    pub games_simulated: u32,
    pub valid: bool,
}

impl FitnessMetrics {
    pub fn invalid(games_simulated: u32) -> Self {
        FitnessMetrics {
            decision_density: 0.0,
            comeback_potential: 0.0,
            tension_curve: 0.0,
            interaction_frequency: 0.0,
            rules_complexity: 0.0,
            session_length: 0.0,
            skill_vs_luck: 0.0,
            bluffing_depth: 0.0,
            betting_engagement: 0.0,
            total_fitness: 0.0,
            games_simulated,
            valid: false,
        }
    }
}

/// Maps a genome plus its aggregated simulation statistics to fitness.
#[derive(Debug, Clone)]
pub struct FitnessEvaluator {
    pub style: FitnessStyle,
    weights: MetricWeights,
}

impl FitnessEvaluator {
    pub fn new(style: FitnessStyle) -> Self {
        FitnessEvaluator {
            style,
            weights: style.weights().normalized(),
        }
    }

    /// Evaluate a genome against its batch results.
    pub fn evaluate(&self, genome: &Genome, results: &SimulationResults) -> FitnessMetrics {
        // Session length is a hard constraint: ~2 seconds per turn, hour cap.
        let estimated_secs = results.avg_turns() * 2.0;
        if estimated_secs > 3600.0 {
            return FitnessMetrics::invalid(results.total_games);
        }
        let optimal_secs = 15.0 * 60.0;
        let session_length = if estimated_secs < optimal_secs {
            estimated_secs / optimal_secs
        } else {
            1.0 - (estimated_secs - optimal_secs) / (3600.0 - optimal_secs) * 0.5
        };

        let decision_density = self.decision_density(genome, results);
        let comeback_potential = self.comeback_potential(results);
        let tension_curve = self.tension_curve(results);
        let interaction_frequency = self.interaction_frequency(genome, results);
        let rules_complexity = rules_complexity_score(genome);
        let skill_vs_luck = self.skill_vs_luck(genome, results, comeback_potential);
        let bluffing_depth = self.bluffing_depth(results);
        let betting_engagement = self.betting_engagement(results);

        let valid = results.errors == 0 && results.total_games > 0;

        // Tension only matters when there are choices to act on it:
        // dramatic lead changes in a zero-decision game are noise.
        let effective_tension = tension_curve * decision_density;

        let w = &self.weights;
        let mut total = w.decision_density * decision_density
            + w.comeback_potential * comeback_potential
            + w.tension_curve * effective_tension
            + w.interaction_frequency * interaction_frequency
            + w.rules_complexity * rules_complexity
            + w.skill_vs_luck * skill_vs_luck
            + w.bluffing_depth * bluffing_depth
            + w.betting_engagement * betting_engagement;

        // Quality gates: multiplicative penalties on hard failures. These
        // are the best discriminators between known games and noise.
        let mut gate = 1.0;
        if comeback_potential < 0.15 {
            gate *= 0.5;
        }
        if skill_vs_luck < 0.15 {
            gate *= 0.7;
        }
        if results.total_games > 0 && results.wins.len() >= 2 {
            let max_rate =
                *results.wins.iter().max().unwrap() as f64 / results.total_games as f64;
            if max_rate > 0.80 {
                gate *= 0.6;
            }
        }
        total *= gate;

        FitnessMetrics {
            decision_density,
            comeback_potential,
            tension_curve,
            interaction_frequency,
            rules_complexity,
            session_length,
            skill_vs_luck,
            bluffing_depth,
            betting_engagement,
            total_fitness: total,
            games_simulated: results.total_games,
            valid,
        }
    }

    fn decision_density(&self, genome: &Genome, results: &SimulationResults) -> f64 {
        if results.total_decisions > 0 {
            let avg_valid_moves =
                results.total_valid_moves as f64 / results.total_decisions as f64;
            let forced_ratio =
                results.forced_decisions as f64 / results.total_decisions as f64;

            // Meaningful decisions come from constrained choices, not raw
            // option counts: War offers 26 equivalent plays and zero
            // decisions.
            let (filtering_score, variety_score) = if results.total_hand_size > 0 {
                let moves_per_card =
                    results.total_valid_moves as f64 / results.total_hand_size as f64;
                if moves_per_card <= 1.0 {
                    (1.0 - moves_per_card, 0.0)
                } else {
                    let extra = moves_per_card - 1.0;
                    (0.3, (extra * 0.15).min(0.5))
                }
            } else {
                (0.0, 0.0)
            };

            let raw_choice = ((avg_valid_moves - 1.0) / 6.0).clamp(0.0, 1.0);
            let constraint_multiplier = 0.2 + filtering_score * 0.8;
            let choice_score = raw_choice * constraint_multiplier;

            (choice_score * 0.35
                + filtering_score * 0.30
                + variety_score
                + (1.0 - forced_ratio) * 0.20)
                .min(1.0)
        } else {
            // No instrumentation: fall back to structure heuristics.
            let phases = genome.turn_structure.phases.len() as f64;
            let optional = genome
                .turn_structure
                .phases
                .iter()
                .filter(|p| match p {
                    Phase::Draw(d) => !d.mandatory,
                    Phase::Play(p) => !p.mandatory,
                    Phase::Discard(d) => !d.mandatory,
                    _ => false,
                })
                .count() as f64;
            let conditioned = genome
                .turn_structure
                .phases
                .iter()
                .filter(|p| match p {
                    Phase::Draw(d) => d.condition.is_some(),
                    Phase::Play(p) => p.valid_play_condition.is_some(),
                    Phase::Discard(d) => d.matching_condition.is_some(),
                    _ => false,
                })
                .count() as f64;
            ((phases / 6.0).min(1.0) * 0.5
                + (optional / 3.0).min(1.0) * 0.3
                + (conditioned / 3.0).min(1.0) * 0.2)
                .min(1.0)
        }
    }

    fn comeback_potential(&self, results: &SimulationResults) -> f64 {
        let expected = if results.player_count > 0 {
            1.0 / results.player_count as f64
        } else {
            0.5
        };
        let max_deviation = 1.0 - expected;

        let balance_score = if results.total_games > 0 && max_deviation > 0.0 {
            let avg_deviation: f64 = results
                .wins
                .iter()
                .map(|&w| {
                    let rate = w as f64 / results.total_games as f64;
                    (rate - expected).abs() / max_deviation
                })
                .sum::<f64>()
                / results.wins.len().max(1) as f64;
            1.0 - avg_deviation
        } else {
            1.0
        };

        // 50% comebacks is maximal uncertainty: a midpoint leader who
        // never wins is as predictable as one who always does.
        let decisive = results.total_games.saturating_sub(results.draws + results.errors);
        let trailing_score = if decisive > 0 && results.trailing_winners > 0 {
            let freq = results.trailing_winners as f64 / decisive as f64;
            1.0 - (0.5 - freq).abs() * 2.0
        } else {
            balance_score
        };

        trailing_score * 0.6 + balance_score * 0.4
    }

    fn tension_curve(&self, results: &SimulationResults) -> f64 {
        let is_betting_game = results.total_bets > 0;
        let has_tracking = results.lead_changes > 0;
        let games = results
            .total_games
            .saturating_sub(results.draws + results.errors)
            .max(1) as f64;

        if is_betting_game && !has_tracking {
            // Poker-style tension: pot commitment, all-in spikes, showdowns.
            let bets_per_game = results.total_bets as f64 / games;
            let all_in_rate = results.all_in_count as f64 / games;
            let showdown_rate = results.showdown_wins as f64 / games;
            let bet_activity = (bets_per_game / 3.0).min(1.0);
            let all_in = (all_in_rate * 2.0).min(1.0);
            let showdown = showdown_rate.min(1.0);
            bet_activity * 0.4 + all_in * 0.3 + showdown * 0.3
        } else if has_tracking {
            let expected_changes = (results.avg_turns() / 20.0).max(1.0);
            let games_played = results.margin_samples.max(1) as f64;
            let lead_change_score =
                (results.lead_changes as f64 / games_played / expected_changes).min(1.0);
            let decisive = results.decisive_turn_pct();
            let margin = 1.0 - results.closest_margin();
            lead_change_score * 0.4 + decisive * 0.4 + margin * 0.2
        } else if results.closest_margin() > 0.0 && results.closest_margin() < 1.0 {
            // One player always ahead: runaway, low tension.
            let margin = 1.0 - results.closest_margin();
            let decisive = results.decisive_turn_pct();
            margin * 0.5 + decisive * 0.5
        } else {
            // Nothing to verify tension with: length-based, capped.
            let turn_score = (results.avg_turns() / 100.0).min(1.0);
            let length_bonus = ((results.avg_turns() - 20.0) / 50.0).clamp(0.0, 1.0);
            (turn_score * 0.6 + length_bonus * 0.4).min(0.6)
        }
    }

    fn interaction_frequency(&self, genome: &Genome, results: &SimulationResults) -> f64 {
        if results.total_actions > 0 {
            (results.total_interactions as f64 / results.total_actions as f64).min(1.0)
        } else {
            let effects = (genome.special_effects.len() as f64 / 3.0).min(1.0);
            let trick = if genome.turn_structure.is_trick_based {
                0.3
            } else {
                0.0
            };
            let phases = (genome.turn_structure.phases.len() as f64 / 10.0).min(0.4);
            (effects * 0.4 + trick + phases).min(1.0)
        }
    }

    fn skill_vs_luck(
        &self,
        genome: &Genome,
        results: &SimulationResults,
        comeback_potential: f64,
    ) -> f64 {
        // Structural heuristic: long, balanced, mechanically rich games
        // leave more room for skill. Head-to-head AI evidence is applied
        // separately by the skill-evaluation penalties.
        let length = (results.avg_turns() / 80.0).min(1.0);
        let balance = comeback_potential;
        let mechanics = ((genome.turn_structure.phases.len()
            + genome.special_effects.len()
            + usize::from(genome.turn_structure.is_trick_based))
            as f64
            / 8.0)
            .min(1.0);
        let skill = (length * 0.4 + balance * 0.3 + mechanics * 0.3).min(1.0);
        if self.style == FitnessStyle::Party {
            // Party games want luck-friendly outcomes.
            1.0 - skill
        } else {
            skill
        }
    }

    fn bluffing_depth(&self, results: &SimulationResults) -> f64 {
        if results.total_claims > 0 {
            let bluff_rate = results.total_bluffs as f64 / results.total_claims as f64;
            let challenge_rate = results.total_challenges as f64 / results.total_claims as f64;
            let bluff_score = (1.0 - (bluff_rate - 0.6).abs() * 2.0).clamp(0.0, 1.0);
            let challenge_score = (1.0 - (challenge_rate - 0.4).abs() * 2.0).clamp(0.0, 1.0);
            let outcomes = results.successful_bluffs + results.successful_catches;
            let balance_score = if outcomes > 0 {
                let success_rate = results.successful_bluffs as f64 / outcomes as f64;
                (1.0 - (success_rate - 0.5).abs() * 2.0).clamp(0.0, 1.0)
            } else {
                0.0
            };
            bluff_score * 0.3 + challenge_score * 0.3 + balance_score * 0.4
        } else if results.total_bets > 0 {
            let bluff_rate = results.betting_bluffs as f64 / results.total_bets as f64;
            let bluff_score = (1.0 - (bluff_rate - 0.3).abs() * 3.0).clamp(0.0, 1.0);
            let wins = results.fold_wins + results.showdown_wins;
            let fold_score = if wins > 0 {
                let fold_rate = results.fold_wins as f64 / wins as f64;
                (1.0 - (fold_rate - 0.35).abs() * 3.0).clamp(0.0, 1.0)
            } else {
                0.0
            };
            let all_in_rate = results.all_in_count as f64 / results.total_bets as f64;
            let all_in_score = (1.0 - (all_in_rate - 0.10).abs() * 10.0).clamp(0.0, 1.0);
            bluff_score * 0.35 + fold_score * 0.40 + all_in_score * 0.25
        } else {
            0.0
        }
    }

    fn betting_engagement(&self, results: &SimulationResults) -> f64 {
        if results.total_bets == 0 || results.total_games == 0 {
            return 0.0;
        }
        let games = results.total_games as f64;
        let total_wins: u32 = results.wins.iter().sum();

        // Games should resolve with winners; random blackjack loves to
        // double-bust into endless draws.
        let resolution = ((total_wins as f64 / games) * 1.5).min(1.0);

        let all_in_rate = results.all_in_count as f64 / games;
        let drama = if all_in_rate < 0.05 {
            all_in_rate / 0.05
        } else if all_in_rate <= 0.25 {
            1.0
        } else {
            (1.0 - (all_in_rate - 0.25) * 2.0).max(0.3)
        };

        let bets_per_game = results.total_bets as f64 / games;
        let activity = if bets_per_game < 2.0 {
            bets_per_game / 2.0
        } else if bets_per_game <= 20.0 {
            1.0
        } else {
            (1.0 - (bets_per_game - 20.0) / 50.0).max(0.5)
        };

        let variance = if total_wins > 0 {
            let max_wins = *results.wins.iter().max().unwrap() as f64;
            ((1.0 - max_wins / total_wins as f64) * 2.0).min(1.0)
        } else {
            0.5
        };

        let resolved = results.fold_wins + results.showdown_wins;
        let showdown = if resolved > 0 {
            let rate = results.showdown_wins as f64 / resolved as f64;
            (1.0 - (rate - 0.75).abs() * 2.0).clamp(0.0, 1.0)
        } else {
            0.5
        };

        resolution * 0.30 + drama * 0.20 + activity * 0.15 + variance * 0.15 + showdown * 0.20
    }
}

/// Full evaluation result, including coherence output.
#[derive(Debug, Clone)]
pub struct FitnessResult {
    pub fitness: f64,
    pub valid: bool,
    pub metrics: Option<FitnessMetrics>,
    pub coherence_violations: Vec<String>,
}

/// Coherence check, then batch simulation, then metric evaluation.
/// Incoherent genomes cost nothing: they never reach the simulator.
#[derive(Debug, Clone)]
pub struct FullFitnessEvaluator {
    pub evaluator: FitnessEvaluator,
    pub num_simulations: u32,
    pub ai: crate::ai::AiKind,
}

impl FullFitnessEvaluator {
    pub fn new(style: FitnessStyle, num_simulations: u32) -> Self {
        FullFitnessEvaluator {
            evaluator: FitnessEvaluator::new(style),
            num_simulations,
            ai: crate::ai::AiKind::Random,
        }
    }

    pub fn evaluate(&self, genome: &Genome, base_seed: u64) -> FitnessResult {
        let report = coherence::check(genome);
        if !report.is_coherent() {
            return FitnessResult {
                fitness: 0.0,
                valid: false,
                metrics: None,
                coherence_violations: report.violations,
            };
        }
        if genome.check_invariants().is_err() {
            return FitnessResult {
                fitness: 0.0,
                valid: false,
                metrics: None,
                coherence_violations: vec!["genome invariants violated".to_string()],
            };
        }

        let config = crate::simulation::batch::BatchConfig::new(
            self.num_simulations,
            base_seed,
            self.ai,
            genome.player_count,
        );
        let results = crate::simulation::batch::run_batch(genome, &config);

        // A genome erroring on most of its games is broken.
        if results.errors * 2 > results.total_games {
            return FitnessResult {
                fitness: 0.0,
                valid: false,
                metrics: Some(FitnessMetrics::invalid(results.total_games)),
                coherence_violations: Vec::new(),
            };
        }

        let metrics = self.evaluator.evaluate(genome, &results);
        FitnessResult {
            fitness: metrics.total_fitness,
            valid: metrics.valid,
            metrics: Some(metrics),
            coherence_violations: Vec::new(),
        }
    }
}
