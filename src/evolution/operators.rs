//! Genetic operators: the mutation pipeline and single-point crossover.
//!
//! Operators are applied independently, each with its own probability, and
//! every application builds a new genome with an incremented generation.
//! A pipeline pass that changed anything also assigns a fresh readable id.
//! `CleanupOrphanedResources` is the repair operator: it runs with high
//! probability and removes resources whose supporting mechanic was lost to
//! crossover or another mutation.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::cards::{Rank, Suit};
use crate::evolution::naming::generate_name;
use crate::genome::conditions::{CompareOp, Condition, ConditionKind};
use crate::genome::schema::*;

/// One mutation operator with its firing probability.
#[derive(Debug, Clone)]
pub struct WeightedOp {
    pub op: MutationOp,
    pub probability: f64,
}

/// Every mutation operator in the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationOp {
    TweakParameter,
    SwapPhaseOrder,
    AddPhase,
    RemovePhase,
    ReplacePhase,
    ShuffleAllPhases,
    ModifyCondition,
    MutateDrawCount,
    ModifyWinCondition,
    AddEffect,
    RemoveEffect,
    MutateEffect,
    AddBettingPhase,
    RemoveBettingPhase,
    MutateBettingPhase,
    MutateStartingChips,
    AddBiddingPhase,
    RemoveBiddingPhase,
    MutateTableauMode,
    MutateSequenceDirection,
    MutateTableauVisibility,
    AddCardScoring,
    MutateCardScoring,
    RemoveCardScoring,
    MutateHandPattern,
    MutateCardValue,
    EnableTeamMode,
    DisableTeamMode,
    MutateTeamAssignment,
    CleanupOrphanedResources,
}

fn bump(mut genome: Genome) -> Genome {
    genome.generation += 1;
    genome
}

impl MutationOp {
    /// Apply this operator once. Operators that cannot apply return the
    /// genome unchanged.
    pub fn mutate<R: Rng>(
        self,
        genome: &Genome,
        preserve_player_count: bool,
        rng: &mut R,
    ) -> Genome {
        match self {
            MutationOp::TweakParameter => tweak_parameter(genome, preserve_player_count, rng),
            MutationOp::SwapPhaseOrder => swap_phase_order(genome, rng),
            MutationOp::AddPhase => add_phase(genome, rng),
            MutationOp::RemovePhase => remove_phase(genome, rng),
            MutationOp::ReplacePhase => replace_phase(genome, rng),
            MutationOp::ShuffleAllPhases => shuffle_all_phases(genome, rng),
            MutationOp::ModifyCondition => modify_condition(genome, rng),
            MutationOp::MutateDrawCount => mutate_draw_count(genome, rng),
            MutationOp::ModifyWinCondition => modify_win_condition(genome, rng),
            MutationOp::AddEffect => add_effect(genome, rng),
            MutationOp::RemoveEffect => remove_effect(genome, rng),
            MutationOp::MutateEffect => mutate_effect(genome, rng),
            MutationOp::AddBettingPhase => add_betting_phase(genome, rng),
            MutationOp::RemoveBettingPhase => remove_betting_phase(genome, rng),
            MutationOp::MutateBettingPhase => mutate_betting_phase(genome, rng),
            MutationOp::MutateStartingChips => mutate_starting_chips(genome, rng),
            MutationOp::AddBiddingPhase => add_bidding_phase(genome, rng),
            MutationOp::RemoveBiddingPhase => remove_bidding_phase(genome),
            MutationOp::MutateTableauMode => mutate_tableau_mode(genome, rng),
            MutationOp::MutateSequenceDirection => mutate_sequence_direction(genome, rng),
            MutationOp::MutateTableauVisibility => mutate_tableau_visibility(genome, rng),
            MutationOp::AddCardScoring => add_card_scoring(genome, rng),
            MutationOp::MutateCardScoring => mutate_card_scoring(genome, rng),
            MutationOp::RemoveCardScoring => remove_card_scoring(genome, rng),
            MutationOp::MutateHandPattern => mutate_hand_pattern(genome, rng),
            MutationOp::MutateCardValue => mutate_card_value(genome, rng),
            MutationOp::EnableTeamMode => enable_team_mode(genome),
            MutationOp::DisableTeamMode => disable_team_mode(genome),
            MutationOp::MutateTeamAssignment => mutate_team_assignment(genome, rng),
            MutationOp::CleanupOrphanedResources => cleanup_orphaned_resources(genome),
        }
    }
}

fn tweak_parameter<R: Rng>(genome: &Genome, preserve_player_count: bool, rng: &mut R) -> Genome {
    let mut choices = vec!["cards_per_player", "max_turns", "initial_discard_count"];
    if !preserve_player_count {
        choices.push("player_count");
    }
    let mut g = genome.clone();
    match *choices.choose(rng).unwrap() {
        "cards_per_player" => {
            let delta = rng.gen_range(-3i32..=3);
            let limit = (52 / g.player_count as i32).min(26);
            g.setup.cards_per_player =
                (g.setup.cards_per_player as i32 + delta).clamp(3, limit) as u8;
        }
        "max_turns" => {
            let delta = rng.gen_range(-0.2f64..=0.2);
            g.max_turns = ((g.max_turns as f64 * (1.0 + delta)) as u32).clamp(20, 1000);
        }
        "initial_discard_count" => {
            g.setup.initial_discard_count = 1 - g.setup.initial_discard_count.min(1);
        }
        _ => {
            let options: Vec<u8> = [2u8, 3, 4]
                .into_iter()
                .filter(|&p| p != g.player_count)
                .collect();
            let new_count = *options.choose(rng).unwrap();
            let max_cards = (52 / new_count as u32) as u8;
            g.setup.cards_per_player = g.setup.cards_per_player.min(max_cards);
            if g.player_count == 2 && new_count != 2 && g.setup.tableau_mode == TableauMode::War {
                g.setup.tableau_mode = TableauMode::None;
            }
            if g.team_mode {
                g.team_mode = false;
                g.teams.clear();
            }
            g.player_count = new_count;
        }
    }
    bump(g)
}

fn swap_phase_order<R: Rng>(genome: &Genome, rng: &mut R) -> Genome {
    if genome.turn_structure.phases.len() < 2 {
        return genome.clone();
    }
    let mut g = genome.clone();
    let idx = rng.gen_range(0..g.turn_structure.phases.len() - 1);
    g.turn_structure.phases.swap(idx, idx + 1);
    bump(g)
}

fn random_condition<R: Rng>(rng: &mut R) -> Condition {
    let kind = *[ConditionKind::HandSize, ConditionKind::LocationSize]
        .choose(rng)
        .unwrap();
    let op = *[
        CompareOp::Gt,
        CompareOp::Ge,
        CompareOp::Lt,
        CompareOp::Le,
        CompareOp::Eq,
    ]
    .choose(rng)
    .unwrap();
    Condition::simple(kind, op, rng.gen_range(0..=10))
}

fn random_phase<R: Rng>(rng: &mut R, rich: bool) -> Phase {
    // Weighted sample: draw 30 / play 30 / discard 20 / trick 10 / claim 10.
    let roll = rng.gen_range(0..100);
    if roll < 30 {
        Phase::Draw(DrawPhase {
            source: *[Location::Deck, Location::Discard].choose(rng).unwrap(),
            count: if rich { rng.gen_range(1..=5) } else { 1 },
            mandatory: rng.gen_bool(0.5),
            condition: (rich && rng.gen_bool(0.3)).then(|| random_condition(rng)),
        })
    } else if roll < 60 {
        Phase::Play(PlayPhase {
            target: if rich {
                *[Location::Discard, Location::Tableau].choose(rng).unwrap()
            } else {
                Location::Discard
            },
            valid_play_condition: Some(random_condition(rng)),
            min_cards: 1,
            max_cards: 1,
            mandatory: if rich { rng.gen_bool(0.5) } else { true },
            pass_if_unable: true,
        })
    } else if roll < 80 {
        Phase::Discard(DiscardPhase {
            target: Location::Discard,
            count: if rich { rng.gen_range(1..=3) } else { 1 },
            mandatory: rng.gen_bool(0.5),
            matching_condition: None,
        })
    } else if roll < 90 {
        Phase::Trick(TrickPhase {
            lead_suit_required: rng.gen_bool(0.5),
            trump_suit: *[None, Some(Suit::Spades), Some(Suit::Hearts)]
                .choose(rng)
                .unwrap(),
            high_card_wins: rng.gen_bool(0.5),
            breaking_suit: *[None, Some(Suit::Hearts)].choose(rng).unwrap(),
        })
    } else {
        Phase::Claim(ClaimPhase {
            min_cards: 1,
            max_cards: *[1u8, 2, 3, 4].choose(rng).unwrap(),
            sequential_rank: rng.gen_bool(0.5),
            allow_challenge: true,
            pile_penalty: true,
        })
    }
}

fn add_phase<R: Rng>(genome: &Genome, rng: &mut R) -> Genome {
    if genome.turn_structure.phases.len() >= 5 {
        return genome.clone();
    }
    let mut g = genome.clone();
    let phase = random_phase(rng, false);
    let pos = rng.gen_range(0..=g.turn_structure.phases.len());
    g.turn_structure.phases.insert(pos, phase);
    bump(g)
}

fn remove_phase<R: Rng>(genome: &Genome, rng: &mut R) -> Genome {
    if genome.turn_structure.phases.len() <= 1 {
        return genome.clone();
    }
    let mut g = genome.clone();
    let idx = rng.gen_range(0..g.turn_structure.phases.len());
    g.turn_structure.phases.remove(idx);
    bump(g)
}

fn replace_phase<R: Rng>(genome: &Genome, rng: &mut R) -> Genome {
    if genome.turn_structure.phases.is_empty() {
        return genome.clone();
    }
    let mut g = genome.clone();
    let idx = rng.gen_range(0..g.turn_structure.phases.len());
    g.turn_structure.phases[idx] = random_phase(rng, true);
    bump(g)
}

fn shuffle_all_phases<R: Rng>(genome: &Genome, rng: &mut R) -> Genome {
    if genome.turn_structure.phases.len() < 2 {
        return genome.clone();
    }
    let mut g = genome.clone();
    g.turn_structure.phases.shuffle(rng);
    bump(g)
}

/// Perturb the value or swap the operator of a simple condition. Compound
/// trees are left alone; descending into them is not worth the breakage.
fn modify_condition<R: Rng>(genome: &Genome, rng: &mut R) -> Genome {
    let mut g = genome.clone();
    let candidates: Vec<usize> = g
        .turn_structure
        .phases
        .iter()
        .enumerate()
        .filter(|(_, p)| match p {
            Phase::Play(play) => play.valid_play_condition.is_some(),
            Phase::Draw(draw) => draw.condition.is_some(),
            _ => false,
        })
        .map(|(i, _)| i)
        .collect();
    let Some(&idx) = candidates.choose(rng) else {
        return genome.clone();
    };
    let tweak = |cond: &Condition, rng: &mut R| -> Condition {
        match cond {
            Condition::Simple {
                kind,
                op,
                value,
                reference,
            } => {
                if rng.gen_bool(0.5) {
                    Condition::Simple {
                        kind: *kind,
                        op: *op,
                        value: (value + rng.gen_range(-2..=2)).max(0),
                        reference: *reference,
                    }
                } else {
                    let ops: Vec<CompareOp> = CompareOp::ALL
                        .into_iter()
                        .filter(|o| o != op && *o != CompareOp::Ne)
                        .collect();
                    Condition::Simple {
                        kind: *kind,
                        op: *ops.choose(rng).unwrap(),
                        value: *value,
                        reference: *reference,
                    }
                }
            }
            compound => compound.clone(),
        }
    };
    match &mut g.turn_structure.phases[idx] {
        Phase::Play(play) => {
            let cond = play.valid_play_condition.as_ref().unwrap();
            play.valid_play_condition = Some(tweak(cond, rng));
        }
        Phase::Draw(draw) => {
            let cond = draw.condition.as_ref().unwrap();
            draw.condition = Some(tweak(cond, rng));
        }
        _ => {}
    }
    bump(g)
}

fn mutate_draw_count<R: Rng>(genome: &Genome, rng: &mut R) -> Genome {
    let mut g = genome.clone();
    let draws: Vec<usize> = g
        .turn_structure
        .phases
        .iter()
        .enumerate()
        .filter(|(_, p)| matches!(p, Phase::Draw(_)))
        .map(|(i, _)| i)
        .collect();
    let Some(&idx) = draws.choose(rng) else {
        return genome.clone();
    };
    if let Phase::Draw(draw) = &mut g.turn_structure.phases[idx] {
        draw.count = rng.gen_range(1..=7);
    }
    bump(g)
}

/// Default card scoring injected when a mutation turns the genome towards a
/// score-based win with no scoring mechanism.
fn default_scoring_rule() -> CardScoringRule {
    CardScoringRule {
        condition: CardCondition::default(),
        points: 1,
        trigger: ScoringTrigger::Play,
    }
}

fn modify_win_condition<R: Rng>(genome: &Genome, rng: &mut R) -> Genome {
    let g = genome.clone();
    if g.win_conditions.is_empty() {
        return add_win_condition(g, rng);
    }
    match rng.gen_range(0..3) {
        0 => change_win_condition_type(g, rng),
        1 => change_win_threshold(g, rng),
        _ => {
            if g.win_conditions.len() < 3 {
                add_win_condition(g, rng)
            } else {
                change_win_condition_type(g, rng)
            }
        }
    }
}

fn random_win_kind<R: Rng>(rng: &mut R, exclude: Option<WinKind>) -> WinKind {
    let kinds: Vec<WinKind> = [
        WinKind::EmptyHand,
        WinKind::HighScore,
        WinKind::FirstToScore,
        WinKind::CaptureAll,
        WinKind::LowScore,
        WinKind::AllHandsEmpty,
        WinKind::MostCaptured,
        WinKind::BestHand,
    ]
    .into_iter()
    .filter(|k| Some(*k) != exclude)
    .collect();
    *kinds.choose(rng).unwrap()
}

fn win_condition_for_kind<R: Rng>(kind: WinKind, rng: &mut R) -> WinCondition {
    let threshold = kind
        .is_score_based()
        .then(|| *[50, 100, 200, 500].choose(rng).unwrap());
    let comparison = match kind {
        WinKind::LowScore | WinKind::FewestTricks => WinComparison::Lowest,
        WinKind::FirstToScore => WinComparison::First,
        WinKind::HighScore | WinKind::MostCaptured | WinKind::MostTricks => {
            WinComparison::Highest
        }
        _ => WinComparison::None,
    };
    let trigger = match kind {
        WinKind::HighScore | WinKind::LowScore => TriggerMode::ThresholdGate,
        WinKind::AllHandsEmpty | WinKind::MostTricks | WinKind::FewestTricks => {
            TriggerMode::AllHandsEmpty
        }
        _ => TriggerMode::Immediate,
    };
    WinCondition {
        kind,
        threshold,
        comparison,
        trigger,
        required_hand_size: None,
    }
}

/// When a win condition becomes score-based, make sure something scores.
fn ensure_scoring_support(g: &mut Genome, kind: WinKind) {
    if kind.is_score_based()
        && g.card_scoring.is_empty()
        && g.contract_scoring.is_none()
        && !g.turn_structure.is_trick_based
    {
        g.card_scoring.push(default_scoring_rule());
    }
    if kind == WinKind::BestHand && g.hand_evaluation.is_none() {
        g.hand_evaluation = Some(crate::genome::examples::poker_hand_evaluation());
    }
}

fn change_win_condition_type<R: Rng>(mut g: Genome, rng: &mut R) -> Genome {
    let idx = rng.gen_range(0..g.win_conditions.len());
    let new_kind = random_win_kind(rng, Some(g.win_conditions[idx].kind));
    g.win_conditions[idx] = win_condition_for_kind(new_kind, rng);
    ensure_scoring_support(&mut g, new_kind);
    bump(g)
}

fn change_win_threshold<R: Rng>(mut g: Genome, rng: &mut R) -> Genome {
    let candidates: Vec<usize> = g
        .win_conditions
        .iter()
        .enumerate()
        .filter(|(_, wc)| wc.kind.is_score_based() && wc.threshold.is_some())
        .map(|(i, _)| i)
        .collect();
    let Some(&idx) = candidates.choose(rng) else {
        return g;
    };
    let old = g.win_conditions[idx].threshold.unwrap();
    let delta = rng.gen_range(-0.2f64..=0.2);
    g.win_conditions[idx].threshold = Some(((old as f64 * (1.0 + delta)) as i32).max(10));
    bump(g)
}

fn add_win_condition<R: Rng>(mut g: Genome, rng: &mut R) -> Genome {
    let kind = random_win_kind(rng, None);
    g.win_conditions.push(win_condition_for_kind(kind, rng));
    ensure_scoring_support(&mut g, kind);
    bump(g)
}

fn add_effect<R: Rng>(genome: &Genome, rng: &mut R) -> Genome {
    let mut g = genome.clone();
    g.special_effects.push(SpecialEffect {
        trigger_rank: *Rank::ALL.choose(rng).unwrap(),
        kind: *EffectKind::ALL.choose(rng).unwrap(),
        target: *[TargetSelector::NextPlayer, TargetSelector::AllOpponents]
            .choose(rng)
            .unwrap(),
        value: rng.gen_range(1..=3),
    });
    bump(g)
}

fn remove_effect<R: Rng>(genome: &Genome, rng: &mut R) -> Genome {
    if genome.special_effects.is_empty() {
        return genome.clone();
    }
    let mut g = genome.clone();
    let idx = rng.gen_range(0..g.special_effects.len());
    g.special_effects.remove(idx);
    bump(g)
}

fn mutate_effect<R: Rng>(genome: &Genome, rng: &mut R) -> Genome {
    if genome.special_effects.is_empty() {
        return genome.clone();
    }
    let mut g = genome.clone();
    let idx = rng.gen_range(0..g.special_effects.len());
    let effect = &mut g.special_effects[idx];
    match rng.gen_range(0..4) {
        0 => effect.trigger_rank = *Rank::ALL.choose(rng).unwrap(),
        1 => effect.kind = *EffectKind::ALL.choose(rng).unwrap(),
        2 => {
            effect.target = *[TargetSelector::NextPlayer, TargetSelector::AllOpponents]
                .choose(rng)
                .unwrap()
        }
        _ => {
            let delta = *[-1i8, 1].choose(rng).unwrap();
            effect.value = (effect.value as i8 + delta).clamp(1, 4) as u8;
        }
    }
    bump(g)
}

fn add_betting_phase<R: Rng>(genome: &Genome, rng: &mut R) -> Genome {
    if genome.turn_structure.phases.len() >= 5 {
        return genome.clone();
    }
    let mut g = genome.clone();
    let chips = if g.setup.starting_chips > 0 {
        g.setup.starting_chips
    } else {
        1000
    };
    let options: Vec<i32> = [5, 10, 20, 50]
        .into_iter()
        .filter(|&b| b <= chips)
        .collect();
    let min_bet = options
        .choose(rng)
        .copied()
        .unwrap_or((chips / 10).max(1));
    let phase = Phase::Betting(BettingPhase {
        min_bet,
        max_raises: rng.gen_range(1..=4),
    });
    let pos = rng.gen_range(0..=g.turn_structure.phases.len());
    g.turn_structure.phases.insert(pos, phase);
    if g.setup.starting_chips == 0 {
        g.setup.starting_chips = chips;
    }
    bump(g)
}

fn remove_betting_phase<R: Rng>(genome: &Genome, rng: &mut R) -> Genome {
    if genome.turn_structure.phases.len() <= 1 {
        return genome.clone();
    }
    let betting: Vec<usize> = genome
        .turn_structure
        .phases
        .iter()
        .enumerate()
        .filter(|(_, p)| matches!(p, Phase::Betting(_)))
        .map(|(i, _)| i)
        .collect();
    let Some(&idx) = betting.choose(rng) else {
        return genome.clone();
    };
    let mut g = genome.clone();
    g.turn_structure.phases.remove(idx);
    bump(g)
}

fn mutate_betting_phase<R: Rng>(genome: &Genome, rng: &mut R) -> Genome {
    let betting: Vec<usize> = genome
        .turn_structure
        .phases
        .iter()
        .enumerate()
        .filter(|(_, p)| matches!(p, Phase::Betting(_)))
        .map(|(i, _)| i)
        .collect();
    let Some(&idx) = betting.choose(rng) else {
        return genome.clone();
    };
    let mut g = genome.clone();
    let chips = if g.setup.starting_chips > 0 {
        g.setup.starting_chips
    } else {
        1000
    };
    if let Phase::Betting(phase) = &mut g.turn_structure.phases[idx] {
        if rng.gen_bool(0.5) {
            let delta = rng.gen_range(-0.5f64..=0.5);
            phase.min_bet = ((phase.min_bet as f64 * (1.0 + delta)) as i32).clamp(1, chips);
        } else {
            let delta = *[-1i32, 1].choose(rng).unwrap();
            phase.max_raises = (phase.max_raises as i32 + delta).clamp(1, 5) as u32;
        }
    }
    bump(g)
}

/// Mutating chips keeps betting coherent: bootstrapping chips onto a
/// chipless genome also inserts a betting phase.
fn mutate_starting_chips<R: Rng>(genome: &Genome, rng: &mut R) -> Genome {
    let mut g = genome.clone();
    let new_chips = if g.setup.starting_chips == 0 {
        *[100, 500, 1000, 2000].choose(rng).unwrap()
    } else {
        let delta = rng.gen_range(-0.5f64..=0.5);
        ((g.setup.starting_chips as f64 * (1.0 + delta)) as i32).max(10)
    };

    for phase in g.turn_structure.phases.iter_mut() {
        if let Phase::Betting(betting) = phase {
            if betting.min_bet > new_chips {
                betting.min_bet = (new_chips / 10).max(1);
            }
        }
    }
    if g.setup.starting_chips == 0 && !g.has_betting_phase() {
        g.turn_structure.phases.insert(
            0,
            Phase::Betting(BettingPhase {
                min_bet: (new_chips / 10).max(1),
                max_raises: 3,
            }),
        );
    }
    g.setup.starting_chips = new_chips;
    bump(g)
}

/// Bidding only makes sense in front of trick play.
fn add_bidding_phase<R: Rng>(genome: &Genome, _rng: &mut R) -> Genome {
    if genome.has_bidding_phase() || !genome.has_trick_phase() {
        return genome.clone();
    }
    let mut g = genome.clone();
    let trick_idx = g
        .turn_structure
        .phases
        .iter()
        .position(|p| matches!(p, Phase::Trick(_)))
        .unwrap();
    g.turn_structure
        .phases
        .insert(trick_idx, Phase::Bidding(BiddingPhase::default()));
    g.contract_scoring = Some(ContractScoring::default());
    bump(g)
}

fn remove_bidding_phase(genome: &Genome) -> Genome {
    if !genome.has_bidding_phase() {
        return genome.clone();
    }
    let mut g = genome.clone();
    g.turn_structure
        .phases
        .retain(|p| !matches!(p, Phase::Bidding(_)));
    g.contract_scoring = None;
    bump(g)
}

fn mutate_tableau_mode<R: Rng>(genome: &Genome, rng: &mut R) -> Genome {
    let mut modes = vec![TableauMode::None, TableauMode::MatchRank, TableauMode::Sequence];
    if genome.player_count == 2 {
        modes.push(TableauMode::War);
    }
    modes.retain(|m| *m != genome.setup.tableau_mode);
    let Some(&mode) = modes.choose(rng) else {
        return genome.clone();
    };
    let mut g = genome.clone();
    g.setup.tableau_mode = mode;
    bump(g)
}

fn mutate_sequence_direction<R: Rng>(genome: &Genome, rng: &mut R) -> Genome {
    if genome.setup.tableau_mode != TableauMode::Sequence {
        return genome.clone();
    }
    let mut g = genome.clone();
    if rng.gen_bool(0.5) {
        let directions: Vec<SequenceDirection> = [
            SequenceDirection::Ascending,
            SequenceDirection::Descending,
            SequenceDirection::Both,
        ]
        .into_iter()
        .filter(|d| *d != genome.setup.sequence_direction)
        .collect();
        g.setup.sequence_direction = *directions.choose(rng).unwrap();
    } else {
        g.setup.sequence_wrap = !g.setup.sequence_wrap;
    }
    bump(g)
}

/// Hidden tableaus set up memory-style games.
fn mutate_tableau_visibility<R: Rng>(genome: &Genome, rng: &mut R) -> Genome {
    let options: Vec<Visibility> = [Visibility::FaceUp, Visibility::FaceDown]
        .into_iter()
        .filter(|v| *v != genome.setup.tableau_visibility)
        .collect();
    let Some(&visibility) = options.choose(rng) else {
        return genome.clone();
    };
    let mut g = genome.clone();
    g.setup.tableau_visibility = visibility;
    bump(g)
}

fn add_card_scoring<R: Rng>(genome: &Genome, rng: &mut R) -> Genome {
    let mut g = genome.clone();
    let suit = *[
        None,
        Some(Suit::Hearts),
        Some(Suit::Diamonds),
        Some(Suit::Clubs),
        Some(Suit::Spades),
    ]
    .choose(rng)
    .unwrap();
    let rank = if rng.gen_bool(0.5) {
        None
    } else {
        Some(*Rank::ALL.choose(rng).unwrap())
    };
    g.card_scoring.push(CardScoringRule {
        condition: CardCondition { suit, rank },
        points: rng.gen_range(-5..=15),
        trigger: *ScoringTrigger::ALL.choose(rng).unwrap(),
    });
    bump(g)
}

fn mutate_card_scoring<R: Rng>(genome: &Genome, rng: &mut R) -> Genome {
    if genome.card_scoring.is_empty() {
        return genome.clone();
    }
    let mut g = genome.clone();
    let idx = rng.gen_range(0..g.card_scoring.len());
    let delta = *[-3i32, -2, -1, 1, 2, 3].choose(rng).unwrap();
    g.card_scoring[idx].points += delta;
    bump(g)
}

fn remove_card_scoring<R: Rng>(genome: &Genome, rng: &mut R) -> Genome {
    if genome.card_scoring.is_empty() {
        return genome.clone();
    }
    let mut g = genome.clone();
    let idx = rng.gen_range(0..g.card_scoring.len());
    g.card_scoring.remove(idx);
    bump(g)
}

fn mutate_hand_pattern<R: Rng>(genome: &Genome, rng: &mut R) -> Genome {
    let Some(eval) = &genome.hand_evaluation else {
        return genome.clone();
    };
    if eval.patterns.is_empty() {
        return genome.clone();
    }
    let mut g = genome.clone();
    let eval = g.hand_evaluation.as_mut().unwrap();
    let idx = rng.gen_range(0..eval.patterns.len());
    let delta = *[-10i32, -5, 5, 10].choose(rng).unwrap();
    let priority = (eval.patterns[idx].priority as i32 + delta).clamp(1, 100);
    eval.patterns[idx].priority = priority as u8;
    bump(g)
}

fn mutate_card_value<R: Rng>(genome: &Genome, rng: &mut R) -> Genome {
    let Some(eval) = &genome.hand_evaluation else {
        return genome.clone();
    };
    if eval.card_values.is_empty() {
        return genome.clone();
    }
    let mut g = genome.clone();
    let eval = g.hand_evaluation.as_mut().unwrap();
    let idx = rng.gen_range(0..eval.card_values.len());
    let delta = *[-2i32, -1, 1, 2].choose(rng).unwrap();
    eval.card_values[idx].value = (eval.card_values[idx].value + delta).clamp(1, 15);
    bump(g)
}

/// Alternating-seat 2-team split; even player counts of four or more only.
fn enable_team_mode(genome: &Genome) -> Genome {
    if genome.team_mode || genome.player_count < 4 || genome.player_count % 2 != 0 {
        return genome.clone();
    }
    let mut g = genome.clone();
    g.team_mode = true;
    g.teams = vec![
        (0..g.player_count).step_by(2).collect(),
        (1..g.player_count).step_by(2).collect(),
    ];
    bump(g)
}

fn disable_team_mode(genome: &Genome) -> Genome {
    if !genome.team_mode {
        return genome.clone();
    }
    let mut g = genome.clone();
    g.team_mode = false;
    g.teams.clear();
    bump(g)
}

fn mutate_team_assignment<R: Rng>(genome: &Genome, rng: &mut R) -> Genome {
    if !genome.team_mode || genome.teams.len() < 2 {
        return genome.clone();
    }
    if genome.teams[0].is_empty() || genome.teams[1].is_empty() {
        return genome.clone();
    }
    let mut g = genome.clone();
    let a = rng.gen_range(0..g.teams[0].len());
    let b = rng.gen_range(0..g.teams[1].len());
    let (left, right) = (g.teams[0][a], g.teams[1][b]);
    g.teams[0][a] = right;
    g.teams[1][b] = left;
    for team in g.teams.iter_mut() {
        team.sort_unstable();
    }
    bump(g)
}

/// Repair operator: strip resources whose supporting mechanic is gone.
fn cleanup_orphaned_resources(genome: &Genome) -> Genome {
    let mut g = genome.clone();
    let mut modified = false;

    if g.setup.starting_chips > 0 && !g.has_betting_phase() {
        g.setup.starting_chips = 0;
        modified = true;
    }
    if g.contract_scoring.is_some() && !g.has_bidding_phase() {
        g.contract_scoring = None;
        modified = true;
    }
    if g.hand_evaluation.is_some() {
        let used = g
            .win_conditions
            .iter()
            .any(|wc| wc.kind == WinKind::BestHand)
            || g.has_betting_phase();
        if !used {
            g.hand_evaluation = None;
            modified = true;
        }
    }
    if modified {
        bump(g)
    } else {
        genome.clone()
    }
}

/// Pipeline of operators applied sequentially, each by its own coin flip.
#[derive(Debug, Clone)]
pub struct MutationPipeline {
    pub ops: Vec<WeightedOp>,
    pub preserve_player_count: bool,
}

impl MutationPipeline {
    /// Run the pipeline. If anything fired, the child also receives a fresh
    /// readable id.
    pub fn apply<R: Rng>(&self, genome: &Genome, rng: &mut R) -> Genome {
        let mut current = genome.clone();
        let before = current.generation;
        for weighted in &self.ops {
            if rng.gen_bool(weighted.probability) {
                current = weighted.op.mutate(&current, self.preserve_player_count, rng);
            }
        }
        if current.generation != before {
            current.id = generate_name(rng);
        }
        current
    }
}

/// Standard pipeline; `aggressive` doubles every rate (capped) to escape
/// local optima when diversity collapses.
pub fn create_pipeline(aggressive: bool, preserve_player_count: bool) -> MutationPipeline {
    let mult = if aggressive { 2.0 } else { 1.0 };
    let p = |base: f64, cap: f64| (base * mult).min(cap);
    let ops = vec![
        WeightedOp { op: MutationOp::TweakParameter, probability: p(0.30, 0.6) },
        WeightedOp { op: MutationOp::SwapPhaseOrder, probability: p(0.15, 0.3) },
        WeightedOp { op: MutationOp::AddPhase, probability: p(0.12, 0.25) },
        WeightedOp { op: MutationOp::RemovePhase, probability: p(0.12, 0.25) },
        WeightedOp { op: MutationOp::ReplacePhase, probability: p(0.15, 0.3) },
        WeightedOp { op: MutationOp::ShuffleAllPhases, probability: p(0.05, 0.15) },
        WeightedOp { op: MutationOp::ModifyCondition, probability: p(0.20, 0.4) },
        WeightedOp { op: MutationOp::MutateDrawCount, probability: p(0.20, 0.4) },
        WeightedOp { op: MutationOp::ModifyWinCondition, probability: p(0.15, 0.3) },
        WeightedOp { op: MutationOp::AddEffect, probability: p(0.10, 0.2) },
        WeightedOp { op: MutationOp::RemoveEffect, probability: p(0.10, 0.2) },
        WeightedOp { op: MutationOp::MutateEffect, probability: p(0.15, 0.3) },
        WeightedOp { op: MutationOp::AddBettingPhase, probability: p(0.05, 0.15) },
        WeightedOp { op: MutationOp::RemoveBettingPhase, probability: p(0.05, 0.15) },
        WeightedOp { op: MutationOp::MutateBettingPhase, probability: p(0.10, 0.2) },
        WeightedOp { op: MutationOp::MutateStartingChips, probability: p(0.10, 0.2) },
        WeightedOp { op: MutationOp::AddBiddingPhase, probability: p(0.05, 0.10) },
        WeightedOp { op: MutationOp::RemoveBiddingPhase, probability: p(0.05, 0.10) },
        WeightedOp { op: MutationOp::MutateTableauMode, probability: p(0.05, 0.10) },
        WeightedOp { op: MutationOp::MutateSequenceDirection, probability: p(0.03, 0.06) },
        WeightedOp { op: MutationOp::MutateTableauVisibility, probability: p(0.03, 0.06) },
        WeightedOp { op: MutationOp::AddCardScoring, probability: p(0.05, 0.10) },
        WeightedOp { op: MutationOp::MutateCardScoring, probability: p(0.10, 0.20) },
        WeightedOp { op: MutationOp::RemoveCardScoring, probability: p(0.03, 0.06) },
        WeightedOp { op: MutationOp::MutateHandPattern, probability: p(0.05, 0.10) },
        WeightedOp { op: MutationOp::MutateCardValue, probability: p(0.05, 0.10) },
        WeightedOp { op: MutationOp::EnableTeamMode, probability: p(0.03, 0.06) },
        WeightedOp { op: MutationOp::DisableTeamMode, probability: p(0.03, 0.06) },
        WeightedOp { op: MutationOp::MutateTeamAssignment, probability: p(0.05, 0.10) },
        // Repair always runs hot: it only changes what is broken.
        WeightedOp { op: MutationOp::CleanupOrphanedResources, probability: 0.50 },
    ];
    MutationPipeline {
        ops,
        preserve_player_count,
    }
}

/// Single-point crossover over the phase sequences of two parents.
#[derive(Debug, Clone)]
pub struct CrossoverOperator {
    pub probability: f64,
}

impl CrossoverOperator {
    pub fn new(probability: f64) -> Self {
        CrossoverOperator { probability }
    }

    /// Cross two parents; with probability `1 - p` the parents pass through
    /// unchanged.
    pub fn crossover<R: Rng>(
        &self,
        parent1: &Genome,
        parent2: &Genome,
        rng: &mut R,
    ) -> (Genome, Genome) {
        if !rng.gen_bool(self.probability) {
            return (parent1.clone(), parent2.clone());
        }
        self.crossover_at(
            parent1,
            parent2,
            rng.gen_range(0..=parent1.turn_structure.phases.len()),
            rng.gen_range(0..=parent2.turn_structure.phases.len()),
            rng,
        )
    }

    /// Deterministic cut points; exposed for tests.
    pub fn crossover_at<R: Rng>(
        &self,
        parent1: &Genome,
        parent2: &Genome,
        point1: usize,
        point2: usize,
        rng: &mut R,
    ) -> (Genome, Genome) {
        let phases1 = &parent1.turn_structure.phases;
        let phases2 = &parent2.turn_structure.phases;
        if phases1.is_empty() || phases2.is_empty() {
            return (parent1.clone(), parent2.clone());
        }

        let mut child1_phases: Vec<Phase> = phases1[..point1]
            .iter()
            .chain(&phases2[point2..])
            .cloned()
            .collect();
        let mut child2_phases: Vec<Phase> = phases2[..point2]
            .iter()
            .chain(&phases1[point1..])
            .cloned()
            .collect();
        if child1_phases.is_empty() {
            child1_phases.push(phases1[0].clone());
        }
        if child2_phases.is_empty() {
            child2_phases.push(phases2[0].clone());
        }
        child1_phases.truncate(5);
        child2_phases.truncate(5);

        let mut child1 = parent1.clone();
        child1.turn_structure.phases = child1_phases;
        child1.generation = parent1.generation + 1;
        child1.id = generate_name(rng);

        let mut child2 = parent2.clone();
        child2.turn_structure.phases = child2_phases;
        child2.generation = parent2.generation + 1;
        child2.id = generate_name(rng);

        (child1, child2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genome::examples;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn rng() -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(77)
    }

    #[test]
    fn test_mutation_increments_generation_and_keeps_original() {
        let genome = examples::crazy_eights();
        let mut rng = rng();
        let mutated = MutationOp::TweakParameter.mutate(&genome, false, &mut rng);
        assert_eq!(mutated.generation, genome.generation + 1);
        assert_eq!(genome.generation, 0); // original untouched
    }

    #[test]
    fn test_chip_bootstrap_inserts_betting_phase() {
        let genome = examples::crazy_eights();
        assert_eq!(genome.setup.starting_chips, 0);
        let mut rng = rng();
        let mutated = MutationOp::MutateStartingChips.mutate(&genome, false, &mut rng);
        assert!(mutated.setup.starting_chips > 0);
        assert!(mutated.has_betting_phase());
    }

    #[test]
    fn test_war_mode_blocked_for_more_than_two_players() {
        let genome = examples::hearts(); // four players
        let mut rng = rng();
        for _ in 0..50 {
            let mutated = MutationOp::MutateTableauMode.mutate(&genome, false, &mut rng);
            assert_ne!(mutated.setup.tableau_mode, TableauMode::War);
        }
    }

    #[test]
    fn test_bidding_requires_trick_phase() {
        let eights = examples::crazy_eights();
        let mut rng = rng();
        let unchanged = MutationOp::AddBiddingPhase.mutate(&eights, false, &mut rng);
        assert!(!unchanged.has_bidding_phase());

        let hearts = examples::hearts();
        let with_bidding = MutationOp::AddBiddingPhase.mutate(&hearts, false, &mut rng);
        assert!(with_bidding.has_bidding_phase());
        assert!(with_bidding.contract_scoring.is_some());
    }

    #[test]
    fn test_cleanup_removes_orphaned_chips() {
        let mut genome = examples::crazy_eights();
        genome.setup.starting_chips = 500; // no betting phase to use them
        let cleaned = cleanup_orphaned_resources(&genome);
        assert_eq!(cleaned.setup.starting_chips, 0);
        assert_eq!(cleaned.generation, genome.generation + 1);
    }

    #[test]
    fn test_enable_team_mode_partitions_players() {
        let genome = examples::hearts();
        let teamed = enable_team_mode(&genome);
        assert!(teamed.team_mode);
        assert_eq!(teamed.teams, vec![vec![0, 2], vec![1, 3]]);
        assert!(teamed.check_invariants().is_ok());
    }

    #[test]
    fn test_crossover_single_point_at_fixed_cut() {
        // Parents with phase lists [A,B,C] and [D,E], cut at (2,1):
        // child1 = [A,B] + [E], child2 = [D] + [C].
        let parent1 = examples::gin_rummy(); // 3 phases
        let parent2 = examples::crazy_eights(); // 2 phases
        let mut rng = rng();
        let op = CrossoverOperator::new(1.0);
        let (child1, child2) = op.crossover_at(&parent1, &parent2, 2, 1, &mut rng);

        assert_eq!(child1.turn_structure.phases.len(), 3); // [A,B] + [E]
        assert_eq!(child1.turn_structure.phases[0], parent1.turn_structure.phases[0]);
        assert_eq!(child1.turn_structure.phases[1], parent1.turn_structure.phases[1]);
        assert_eq!(child1.turn_structure.phases[2], parent2.turn_structure.phases[1]);

        assert_eq!(child2.turn_structure.phases.len(), 2); // [D] + [C]
        assert_eq!(child2.turn_structure.phases[0], parent2.turn_structure.phases[0]);
        assert_eq!(child2.turn_structure.phases[1], parent1.turn_structure.phases[2]);

        assert_eq!(child1.generation, parent1.generation + 1);
        assert_eq!(child2.generation, parent2.generation + 1);
        assert_ne!(child1.id, parent1.id);
        assert_ne!(child2.id, parent2.id);
        assert_ne!(child1.id, child2.id);
        // Non-phase fields inherit from the respective parent.
        assert_eq!(child1.player_count, parent1.player_count);
        assert_eq!(child2.player_count, parent2.player_count);
    }

    #[test]
    fn test_crossover_truncates_to_five_phases() {
        let parent1 = examples::gin_rummy();
        let parent2 = examples::gin_rummy();
        let mut rng = rng();
        let op = CrossoverOperator::new(1.0);
        let (child1, _) = op.crossover_at(&parent1, &parent2, 3, 0, &mut rng);
        assert!(child1.turn_structure.phases.len() <= 5);
    }

    #[test]
    fn test_pipeline_assigns_fresh_id_when_mutated() {
        let genome = examples::war();
        let pipeline = create_pipeline(true, false);
        let mut rng = rng();
        let mut changed = 0;
        for _ in 0..20 {
            let child = pipeline.apply(&genome, &mut rng);
            if child.generation > genome.generation {
                assert_ne!(child.id, genome.id);
                changed += 1;
            }
        }
        assert!(changed > 0);
    }

    #[test]
    fn test_aggressive_pipeline_doubles_rates() {
        let normal = create_pipeline(false, false);
        let aggressive = create_pipeline(true, false);
        for (a, b) in normal.ops.iter().zip(&aggressive.ops) {
            assert!(b.probability >= a.probability);
        }
    }
}
