//! Coherence gating: incoherent genomes score zero fitness without being
//! simulated, with human-readable violations.

use deckforge::evolution::{FitnessStyle, FullFitnessEvaluator};
use deckforge::genome::{coherence, examples};

#[test]
fn chips_without_betting_phase_fails_with_named_violation() {
    let mut genome = examples::crazy_eights();
    genome.setup.starting_chips = 1000;

    let report = coherence::check(&genome);
    assert!(!report.is_coherent());
    assert!(
        report
            .violations
            .iter()
            .any(|v| v.contains("starting_chips") && v.contains("BettingPhase")),
        "violations: {:?}",
        report.violations
    );

    let evaluator = FullFitnessEvaluator::new(FitnessStyle::Balanced, 50);
    let result = evaluator.evaluate(&genome, 42);
    assert_eq!(result.fitness, 0.0);
    assert!(!result.valid);
    // No simulation ran: there are no metrics at all.
    assert!(result.metrics.is_none());
}

#[test]
fn betting_phase_without_chips_is_incoherent() {
    let mut genome = examples::simple_poker();
    genome.setup.starting_chips = 0;
    let report = coherence::check(&genome);
    assert!(!report.is_coherent());
}

#[test]
fn trick_game_without_explicit_scoring_is_incoherent() {
    let mut genome = examples::hearts();
    genome.card_scoring.clear();
    genome.win_conditions[0].kind = deckforge::genome::schema::WinKind::LowScore;
    genome.win_conditions[0].threshold = Some(100);
    let report = coherence::check(&genome);
    assert!(
        !report.is_coherent(),
        "score-comparing trick game must demand explicit scoring rules"
    );
}

#[test]
fn best_hand_without_evaluation_is_incoherent() {
    let mut genome = examples::simple_poker();
    genome.hand_evaluation = None;
    let report = coherence::check(&genome);
    assert!(report.violations.iter().any(|v| v.contains("best_hand")));
}

#[test]
fn seed_library_passes_the_gate() {
    for genome in examples::seed_genomes() {
        let report = coherence::check(&genome);
        assert!(
            report.is_coherent(),
            "{}: {:?}",
            genome.id,
            report.violations
        );
    }
}
