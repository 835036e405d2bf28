//! Semantic coherence checking, orthogonal to schema validity.
//!
//! A genome can be structurally well formed yet describe a game that cannot
//! work: a score-based win condition with nothing that ever scores, chips
//! with no betting round, a showdown with no way to rank hands. Incoherent
//! genomes are assigned zero fitness and never reach the simulator.

use crate::genome::schema::{
    Genome, HandEvalMethod, Phase, ScoringTrigger, TableauMode, WinKind,
};

/// Outcome of a coherence check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoherenceReport {
    pub violations: Vec<String>,
}

impl CoherenceReport {
    pub fn is_coherent(&self) -> bool {
        self.violations.is_empty()
    }
}

/// Check a genome for semantic coherence and return every violation found.
pub fn check(genome: &Genome) -> CoherenceReport {
    let mut violations = Vec::new();

    let has_betting = genome.has_betting_phase();
    let has_trick = genome.has_trick_phase();
    let has_bidding = genome.has_bidding_phase();

    if genome.setup.starting_chips > 0 && !has_betting {
        violations.push(format!(
            "starting_chips = {} but the turn structure has no BettingPhase",
            genome.setup.starting_chips
        ));
    }
    if has_betting && genome.setup.starting_chips <= 0 {
        violations.push("BettingPhase present but starting_chips is 0".to_string());
    }

    // Score-comparing win conditions need a scoring mechanism. Trick-based
    // games must carry explicit card scoring rules; implicit scoring is not
    // honored.
    let has_score_win = genome.win_conditions.iter().any(|wc| wc.kind.is_score_based());
    let has_scoring = !genome.card_scoring.is_empty() || genome.contract_scoring.is_some();
    if has_score_win && !has_scoring {
        violations.push(
            "score-based win condition without any CardScoringRule or contract scoring"
                .to_string(),
        );
    }

    // Capture-style wins need a way to capture cards.
    let has_capture_win = genome
        .win_conditions
        .iter()
        .any(|wc| matches!(wc.kind, WinKind::CaptureAll | WinKind::MostCaptured));
    let can_capture = has_trick
        || matches!(
            genome.setup.tableau_mode,
            TableauMode::War | TableauMode::MatchRank
        );
    if has_capture_win && !can_capture {
        violations.push(
            "capture-based win condition but no trick phase or capturing tableau mode"
                .to_string(),
        );
    }

    let has_trick_win = genome
        .win_conditions
        .iter()
        .any(|wc| matches!(wc.kind, WinKind::MostTricks | WinKind::FewestTricks));
    if has_trick_win && !has_trick {
        violations.push("trick-count win condition without a TrickPhase".to_string());
    }

    let has_best_hand = genome
        .win_conditions
        .iter()
        .any(|wc| wc.kind == WinKind::BestHand);
    match &genome.hand_evaluation {
        None if has_best_hand => {
            violations.push("best_hand win condition without HandEvaluation".to_string());
        }
        Some(eval) if has_best_hand && eval.method == HandEvalMethod::None => {
            violations
                .push("best_hand win condition with HandEvaluation method None".to_string());
        }
        Some(eval)
            if eval.method == HandEvalMethod::PatternMatch && eval.patterns.is_empty() =>
        {
            violations.push("PatternMatch hand evaluation with no patterns".to_string());
        }
        _ => {}
    }

    let has_chip_win = genome
        .win_conditions
        .iter()
        .any(|wc| wc.kind == WinKind::MostChips);
    if has_chip_win && !has_betting {
        violations.push("most_chips win condition without a BettingPhase".to_string());
    }

    if genome.contract_scoring.is_some() && !has_bidding {
        violations.push("contract_scoring without a BiddingPhase".to_string());
    }
    if has_bidding && !has_trick {
        violations.push("BiddingPhase without a TrickPhase to fulfil contracts".to_string());
    }

    // Trick-win scoring rules in a game that never plays tricks never fire.
    let trick_scoring_only = !genome.card_scoring.is_empty()
        && genome
            .card_scoring
            .iter()
            .all(|rule| rule.trigger == ScoringTrigger::TrickWin);
    if trick_scoring_only && !has_trick {
        violations.push("all scoring rules trigger on trick wins but no TrickPhase exists".to_string());
    }

    if genome.win_conditions.is_empty() {
        violations.push("no win conditions".to_string());
    }
    if genome.turn_structure.phases.is_empty() {
        violations.push("empty turn structure".to_string());
    }

    if genome.team_mode {
        let mut members: Vec<u8> = genome.teams.iter().flatten().copied().collect();
        members.sort_unstable();
        let expected: Vec<u8> = (0..genome.player_count).collect();
        if members != expected {
            violations.push("team assignments do not partition the players".to_string());
        }
    }

    // Sequence tableau without any play to the tableau never advances.
    if genome.setup.tableau_mode == TableauMode::Sequence {
        let plays_to_tableau = genome.turn_structure.phases.iter().any(|p| {
            matches!(p, Phase::Play(play) if play.target == crate::genome::schema::Location::Tableau)
        });
        if !plays_to_tableau {
            violations.push(
                "sequence tableau mode but no PlayPhase targets the tableau".to_string(),
            );
        }
    }

    CoherenceReport { violations }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genome::examples;

    #[test]
    fn test_seed_genomes_are_coherent() {
        for genome in examples::seed_genomes() {
            let report = check(&genome);
            assert!(
                report.is_coherent(),
                "{} incoherent: {:?}",
                genome.id,
                report.violations
            );
        }
    }

    #[test]
    fn test_chips_without_betting_phase_flagged() {
        let mut genome = examples::crazy_eights();
        genome.setup.starting_chips = 1000;
        let report = check(&genome);
        assert!(!report.is_coherent());
        assert!(report
            .violations
            .iter()
            .any(|v| v.contains("starting_chips") && v.contains("BettingPhase")));
    }

    #[test]
    fn test_score_win_without_scoring_flagged() {
        let mut genome = examples::hearts();
        genome.card_scoring.clear();
        let report = check(&genome);
        assert!(report
            .violations
            .iter()
            .any(|v| v.contains("score-based win condition")));
    }

    #[test]
    fn test_best_hand_without_evaluation_flagged() {
        let mut genome = examples::simple_poker();
        genome.hand_evaluation = None;
        let report = check(&genome);
        assert!(report
            .violations
            .iter()
            .any(|v| v.contains("best_hand")));
    }
}
