//! Universal simulator properties: determinism, card and chip conservation,
//! legal moves closed under apply, and guaranteed termination.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use deckforge::ai::AiKind;
use deckforge::genome::examples;
use deckforge::genome::Genome;
use deckforge::simulation::apply::apply_move;
use deckforge::simulation::engine::{next_decision, simulate_game, StepResult};
use deckforge::simulation::instrument::GameCounters;
use deckforge::simulation::state::initial_state;

/// Walk one game step by step, asserting an invariant on every successor.
fn walk_game<F: FnMut(&deckforge::simulation::GameState)>(
    genome: &Genome,
    seed: u64,
    mut check: F,
) {
    let mut counters = GameCounters::new();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut state = initial_state(genome, seed).expect("initial state");
    check(&state);
    let mut steps = 0;
    loop {
        match next_decision(state, genome, &mut counters) {
            StepResult::Finished(final_state, _) => {
                check(&final_state);
                break;
            }
            StepResult::Stuck(_) => break,
            StepResult::Decision(current, moves) => {
                use rand::Rng;
                let choice = rng.gen_range(0..moves.len());
                let next = apply_move(&current, &moves[choice], genome, &mut rng, &mut counters);
                check(&next);
                state = next;
            }
        }
        steps += 1;
        assert!(steps < 100_000, "runaway game for {}", genome.id);
    }
}

#[test]
fn cards_are_conserved_across_every_transition() {
    for genome in examples::seed_genomes() {
        for seed in [1u64, 7, 42] {
            walk_game(&genome, seed, |state| {
                assert_eq!(
                    state.total_cards(),
                    52,
                    "card conservation broken for {}",
                    genome.id
                );
            });
        }
    }
}

#[test]
fn chips_are_conserved_across_betting() {
    let genome = examples::simple_poker();
    let expected = genome.setup.starting_chips * genome.player_count as i32;
    for seed in [3u64, 11, 99] {
        walk_game(&genome, seed, |state| {
            assert_eq!(state.total_chips(), expected);
        });
    }
}

#[test]
fn every_legal_move_yields_a_well_formed_successor() {
    for genome in examples::seed_genomes() {
        let mut counters = GameCounters::new();
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let mut state = initial_state(&genome, 5).expect("initial state");
        // Explore a bounded prefix of the game, applying *every* legal move
        // at each decision point to a fork of the state.
        for _ in 0..40 {
            match next_decision(state, &genome, &mut counters) {
                StepResult::Decision(current, moves) => {
                    assert!(!moves.is_empty());
                    for mv in &moves {
                        let fork = apply_move(&current, mv, &genome, &mut rng, &mut counters);
                        assert_eq!(fork.total_cards(), 52, "{} after {:?}", genome.id, mv);
                        assert!(fork.players.len() == genome.player_count as usize);
                    }
                    use rand::Rng;
                    let choice = rng.gen_range(0..moves.len());
                    state = apply_move(&current, &moves[choice], &genome, &mut rng, &mut counters);
                }
                StepResult::Finished(_, _) | StepResult::Stuck(_) => break,
            }
        }
    }
}

#[test]
fn simulation_is_bit_identical_for_a_seed() {
    for genome in examples::seed_genomes() {
        let ais = vec![AiKind::Random; genome.player_count as usize];
        let a = simulate_game(&genome, 2024, &ais);
        let b = simulate_game(&genome, 2024, &ais);
        match (a, b) {
            (Ok(a), Ok(b)) => {
                assert_eq!(a.winner, b.winner, "{}", genome.id);
                assert_eq!(a.turns, b.turns, "{}", genome.id);
                assert_eq!(a.counters, b.counters, "{}", genome.id);
            }
            (Err(a), Err(b)) => assert_eq!(a, b),
            _ => panic!("one run errored, the other did not for {}", genome.id),
        }
    }
}

#[test]
fn greedy_and_mcts_are_also_deterministic() {
    let genome = examples::crazy_eights();
    let ais = vec![
        AiKind::Greedy,
        AiKind::Mcts(15),
        AiKind::Random,
        AiKind::Greedy,
    ];
    let a = simulate_game(&genome, 77, &ais).expect("game a");
    let b = simulate_game(&genome, 77, &ais).expect("game b");
    assert_eq!(a.winner, b.winner);
    assert_eq!(a.counters, b.counters);
}

#[test]
fn games_terminate_within_max_turns() {
    for genome in examples::seed_genomes() {
        let ais = vec![AiKind::Random; genome.player_count as usize];
        for seed in 0..5u64 {
            if let Ok(outcome) = simulate_game(&genome, seed, &ais) {
                assert!(
                    outcome.turns <= genome.max_turns,
                    "{} ran {} turns past its cap of {}",
                    genome.id,
                    outcome.turns,
                    genome.max_turns
                );
            }
        }
    }
}
