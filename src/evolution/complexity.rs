//! Cognitive complexity estimation: how hard a game is to explain and
//! learn, which is not the same as how big its genome is.
//!
//! Condition nesting and conjunctions cost more than raw counts, memory and
//! state tracking are invisible but expensive, and familiar mechanics
//! (trick-taking, draw-and-play, betting) come at a discount. Custom printed
//! decks slash the cost of special effects since the rules ride on the
//! cards.

use std::collections::BTreeSet;

use crate::genome::conditions::Condition;
use crate::genome::schema::{EffectKind, Genome, Location, Phase, WinKind};

/// Detailed breakdown of where a game's complexity comes from.
#[derive(Debug, Clone, PartialEq)]
pub struct ComplexityBreakdown {
    pub phase_explanation_cost: f64,
    pub condition_complexity: f64,
    pub special_effects_cost: f64,
    pub memory_requirements: f64,
    pub state_tracking_cost: f64,
    pub familiar_pattern_discount: f64,
    pub custom_deck_discount: f64,
    /// 0.0 = trivial, 1.0 = very complex.
    pub total_complexity: f64,
    pub explanation_sentences: u32,
}

impl ComplexityBreakdown {
    /// 1 − complexity, for fitness: simpler games score higher.
    pub fn inverted_score(&self) -> f64 {
        (1.0 - self.total_complexity).max(0.0)
    }
}

/// Inverted complexity score used by the fitness evaluator.
pub fn rules_complexity_score(genome: &Genome) -> f64 {
    calculate_complexity(genome).inverted_score()
}

pub fn calculate_complexity(genome: &Genome) -> ComplexityBreakdown {
    let phase_cost = phase_cost(genome);
    let condition_cost = condition_complexity(genome);
    let mut effects_cost = effects_cost(genome);
    let memory_cost = memory_cost(genome);
    let state_cost = state_tracking_cost(genome);
    let implicit_cost = implicit_complexity(genome);
    let discount = familiarity_discount(genome);

    // Printed-on-card effects need one sentence, not a memorized table.
    let mut custom_deck_discount = 0.0;
    if genome.setup.custom_printed_deck && !genome.special_effects.is_empty() {
        custom_deck_discount = effects_cost * 0.80;
        effects_cost *= 0.20;
    }

    // Stretch compressed components onto the full 0-1 range (observed
    // maxima across the seed library).
    let condition_norm = (condition_cost / 0.40).min(1.0);
    let effects_norm = (effects_cost / 0.15).min(1.0);
    let state_norm = (state_cost / 0.40).min(1.0);

    let raw = phase_cost * 0.22
        + condition_norm * 0.20
        + effects_norm * 0.15
        + memory_cost * 0.18
        + state_norm * 0.10
        + implicit_cost * 0.15;

    // Multiplicative discount, capped at a 40% reduction so familiar games
    // keep a meaningful score.
    let discount_factor = (discount * 0.50).min(0.40);
    let total = raw * (1.0 - discount_factor);

    // Power transform spreads the cluster at 0.05-0.45 out to ~0.15-0.65.
    let total = total.powf(0.6).min(1.0);

    ComplexityBreakdown {
        phase_explanation_cost: phase_cost,
        condition_complexity: condition_cost,
        special_effects_cost: effects_cost,
        memory_requirements: memory_cost,
        state_tracking_cost: state_cost,
        familiar_pattern_discount: discount,
        custom_deck_discount,
        total_complexity: total,
        explanation_sentences: explanation_sentences(genome),
    }
}

fn phase_cost(genome: &Genome) -> f64 {
    let mut cost = 0.0;
    let mut distinct: BTreeSet<u8> = BTreeSet::new();
    for phase in &genome.turn_structure.phases {
        distinct.insert(phase.type_tag());
        let mut base = match phase {
            Phase::Draw(draw) => {
                let mut c = 0.08;
                if draw.source == Location::OpponentHand {
                    c += 0.15;
                }
                if !draw.mandatory {
                    c += 0.05;
                }
                if let Some(cond) = &draw.condition {
                    c += cond.depth() as f64 * 0.12;
                }
                c
            }
            Phase::Play(play) => {
                let mut c = 0.15;
                if let Some(cond) = &play.valid_play_condition {
                    c += cond.depth() as f64 * 0.15;
                }
                c
            }
            Phase::Discard(discard) => {
                let mut c = 0.10;
                if discard.matching_condition.is_some() {
                    c += 0.20;
                }
                if discard.count > 1 {
                    c += 0.10;
                }
                c
            }
            Phase::Trick(_) => 0.45,
            Phase::Betting(_) => 0.50,
            Phase::Claim(_) => 0.55,
            Phase::Bidding(_) => 0.35,
        };
        if base < 0.0 {
            base = 0.0;
        }
        cost += base;
    }

    // Duplicate phase types are modeling artifacts: a second PlayPhase is
    // not a second rule to teach.
    let duplicates = genome.turn_structure.phases.len().saturating_sub(distinct.len());
    if duplicates > 0 {
        cost = (cost - duplicates as f64 * 0.10).max(0.1);
    }
    cost += distinct.len() as f64 * 0.06;
    cost.min(1.0)
}

fn phase_conditions(phase: &Phase) -> Vec<&Condition> {
    match phase {
        Phase::Draw(p) => p.condition.iter().collect(),
        Phase::Play(p) => p.valid_play_condition.iter().collect(),
        Phase::Discard(p) => p.matching_condition.iter().collect(),
        _ => Vec::new(),
    }
}

fn condition_complexity(genome: &Genome) -> f64 {
    let mut total_depth = 0u32;
    let mut total_conjunctions = 0u32;
    let mut total_clauses = 0u32;
    let mut condition_count = 0u32;

    for phase in &genome.turn_structure.phases {
        for cond in phase_conditions(phase) {
            total_depth += cond.depth();
            total_conjunctions += cond.conjunction_count();
            total_clauses += cond.clause_count();
            condition_count += 1;
        }
    }
    // Each special effect carries an implicit trigger clause.
    let implicit = genome.special_effects.len() as u32;
    total_clauses += implicit;

    if condition_count == 0 && implicit == 0 {
        return 0.0;
    }

    let presence = (0.15 + condition_count as f64 * 0.08).min(0.4);
    let clauses = (total_clauses as f64 / 8.0).min(1.0);
    let avg_depth = if condition_count > 0 {
        total_depth as f64 / condition_count as f64
    } else {
        1.0
    };
    let depth = ((avg_depth - 1.0) / 2.0).clamp(0.0, 1.0);
    let conjunctions = (total_conjunctions as f64 / 4.0).min(1.0);

    presence * 0.35 + clauses * 0.35 + depth * 0.15 + conjunctions * 0.15
}

fn effects_cost(genome: &Genome) -> f64 {
    if genome.special_effects.is_empty() {
        return 0.0;
    }
    let unique: BTreeSet<u8> = genome
        .special_effects
        .iter()
        .map(|e| e.kind.code())
        .collect();
    let type_cost = unique.len() as f64 * 0.15;
    let exceptions = genome.special_effects.len().saturating_sub(unique.len());
    (type_cost + exceptions as f64 * 0.05).min(1.0)
}

fn memory_cost(genome: &Genome) -> f64 {
    let mut cost: f64 = 0.0;
    for wc in &genome.win_conditions {
        cost += match wc.kind {
            WinKind::MostCaptured => 0.20,
            WinKind::LowScore => 0.15,
            WinKind::BestHand => 0.35,
            WinKind::MostTricks | WinKind::FewestTricks => 0.20,
            _ => 0.0,
        };
    }
    if genome.has_trick_phase() {
        cost += 0.30; // card counting pays off
    }
    if genome.has_claim_phase() {
        cost += 0.25; // claims and opponent reads
    }
    if genome.has_betting_phase() {
        cost += 0.15; // pot math, stack sizes
    }
    if genome.turn_structure.phases.iter().any(|p| {
        matches!(p, Phase::Discard(d) if d.count > 1)
    }) {
        cost += 0.15; // pair and set tracking
    }
    cost += 0.08; // hidden information baseline
    cost.min(1.0)
}

fn state_tracking_cost(genome: &Genome) -> f64 {
    let mut cost = 0.0;
    if genome.has_trick_phase() {
        cost += 0.15;
    }
    if genome.has_betting_phase() {
        cost += 0.20;
    }
    for effect in &genome.special_effects {
        cost += match effect.kind {
            EffectKind::ReverseDirection => 0.10,
            EffectKind::SkipNext => 0.05,
            _ => 0.0,
        };
    }
    if genome.player_count > 2 {
        cost += 0.10 * (genome.player_count as f64 - 2.0);
    }
    cost.min(1.0)
}

fn implicit_complexity(genome: &Genome) -> f64 {
    let mut cost = 0.0;
    for wc in &genome.win_conditions {
        cost += match wc.kind {
            WinKind::BestHand => 0.50, // the whole hand-ranking ladder
            WinKind::LowScore => 0.20,
            WinKind::MostCaptured => 0.15,
            _ => 0.0,
        };
    }
    let flexible_play = genome.turn_structure.phases.iter().any(|p| {
        matches!(p, Phase::Play(play) if play.target == Location::Tableau && play.max_cards > 1)
    });
    if flexible_play {
        cost += 0.25; // meld and run formation
    }
    cost += genome.card_scoring.len() as f64 * 0.10;
    cost.min(1.0)
}

fn familiarity_discount(genome: &Genome) -> f64 {
    let mut discount: f64 = 0.0;
    if genome.has_trick_phase() {
        discount += 0.15;
    }
    let has_draw = genome.turn_structure.has_phase_kind(1);
    let has_play = genome.turn_structure.has_phase_kind(2);
    if has_draw && has_play && genome.turn_structure.phases.len() <= 3 {
        discount += 0.10;
    }
    if genome.has_betting_phase() {
        discount += 0.08;
    }
    if genome.turn_structure.phases.len() == 1
        && matches!(genome.turn_structure.phases[0], Phase::Play(_))
    {
        discount += 0.25; // War-shaped: almost nothing to explain
    }
    discount.min(1.0)
}

fn explanation_sentences(genome: &Genome) -> u32 {
    let mut sentences = 2; // setup
    for phase in &genome.turn_structure.phases {
        sentences += match phase {
            Phase::Draw(_) => 1,
            Phase::Play(play) => {
                2 + play
                    .valid_play_condition
                    .as_ref()
                    .map_or(0, |c| c.depth())
            }
            Phase::Discard(_) => 1,
            Phase::Trick(_) => 5,
            Phase::Betting(_) => 4,
            Phase::Claim(_) => 3,
            Phase::Bidding(_) => 2,
        };
    }
    if !genome.special_effects.is_empty() {
        if genome.setup.custom_printed_deck {
            sentences += 1;
        } else {
            let unique: BTreeSet<u8> = genome
                .special_effects
                .iter()
                .map(|e| e.kind.code())
                .collect();
            sentences += unique.len() as u32 * 2;
        }
    }
    sentences += genome.win_conditions.len() as u32;
    sentences
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genome::examples;

    #[test]
    fn test_war_is_simpler_than_poker() {
        let war = calculate_complexity(&examples::war());
        let poker = calculate_complexity(&examples::simple_poker());
        assert!(war.total_complexity < poker.total_complexity);
    }

    #[test]
    fn test_scores_stay_in_unit_range() {
        for genome in examples::seed_genomes() {
            let breakdown = calculate_complexity(&genome);
            assert!(
                (0.0..=1.0).contains(&breakdown.total_complexity),
                "{} out of range: {}",
                genome.id,
                breakdown.total_complexity
            );
            assert!((0.0..=1.0).contains(&breakdown.inverted_score()));
        }
    }

    #[test]
    fn test_custom_deck_discounts_effects() {
        let printed = examples::switchback();
        let mut plain = printed.clone();
        plain.setup.custom_printed_deck = false;
        let printed_cost = calculate_complexity(&printed);
        let plain_cost = calculate_complexity(&plain);
        assert!(printed_cost.custom_deck_discount > 0.0);
        assert!(printed_cost.total_complexity <= plain_cost.total_complexity);
    }

    #[test]
    fn test_explanation_sentences_counts_mechanics() {
        let hearts = calculate_complexity(&examples::hearts());
        // Setup (2) + trick phase (5) + one win condition (1).
        assert_eq!(hearts.explanation_sentences, 8);
    }
}
