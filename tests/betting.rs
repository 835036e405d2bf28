//! Betting scenarios: pot bookkeeping and showdown ordering in the simple
//! poker genome.

use deckforge::ai::AiKind;
use deckforge::genome::examples;
use deckforge::simulation::engine::simulate_one_game;
use deckforge::simulation::hand_eval::evaluate_hand;

#[test]
fn poker_pot_equals_chips_transferred() {
    let genome = examples::simple_poker();
    let ais = vec![AiKind::Random; 2];
    let bankroll = genome.setup.starting_chips * 2;
    for seed in 0..100u64 {
        let Ok((outcome, state, _)) = simulate_one_game(&genome, seed, &ais) else {
            continue;
        };
        // After settlement the pot is empty and no chip was minted or lost.
        assert_eq!(state.pot, 0, "seed {} left chips in the pot", seed);
        assert_eq!(
            state.players.iter().map(|p| p.chips).sum::<i32>(),
            bankroll,
            "seed {}",
            seed
        );
        assert!(outcome.winner.is_some(), "seed {} had no winner", seed);
    }
}

#[test]
fn poker_showdown_winner_has_best_pattern() {
    let genome = examples::simple_poker();
    let eval = genome.hand_evaluation.clone().unwrap();
    let ais = vec![AiKind::Random; 2];
    for seed in 0..100u64 {
        let Ok((outcome, state, _)) = simulate_one_game(&genome, seed, &ais) else {
            continue;
        };
        let Some(winner) = outcome.winner else { continue };
        // A fold win needs no hand comparison; at showdown the winner's
        // pattern priority must be at least every other unfolded player's.
        if state.players.iter().any(|p| p.has_folded) {
            continue;
        }
        let winning = evaluate_hand(&eval, &state.players[winner as usize].hand);
        for player in &state.players {
            if player.id == winner {
                continue;
            }
            let other = evaluate_hand(&eval, &player.hand);
            assert!(
                winning.priority >= other.priority,
                "seed {}: winner priority {} below {}",
                seed,
                winning.priority,
                other.priority
            );
        }
    }
}

#[test]
fn blackjack_standing_hand_beats_bust() {
    let genome = examples::blackjack();
    let ais = vec![AiKind::Random; 2];
    let mut decided = 0;
    for seed in 0..60u64 {
        let Ok((outcome, state, _)) = simulate_one_game(&genome, seed, &ais) else {
            continue;
        };
        let Some(winner) = outcome.winner else { continue };
        decided += 1;
        let eval = genome.hand_evaluation.as_ref().unwrap();
        let winning = evaluate_hand(eval, &state.players[winner as usize].hand);
        let loser = 1 - winner;
        let losing = evaluate_hand(eval, &state.players[loser as usize].hand);
        assert!(winning >= losing, "seed {}", seed);
    }
    assert!(decided > 0, "no blackjack game reached a showdown");
}
