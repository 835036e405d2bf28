//! Greedy policy: prefer moves that shed a card, then higher card value.
//! Ties break through the RNG so repeated games do not lock into one line.

use rand::Rng;
use rand_chacha::ChaCha8Rng;

use crate::simulation::movegen::Move;
use crate::simulation::state::GameState;

pub fn decide(state: &GameState, moves: &[Move], rng: &mut ChaCha8Rng) -> usize {
    let hand = &state.active().hand;
    let score = |mv: &Move| -> i32 {
        let plays = if mv.plays_card() { 1000 } else { 0 };
        let card_value = mv
            .card_index()
            .and_then(|idx| hand.get(idx))
            .map_or(0, |card| card.rank.value());
        plays + card_value
    };

    let best = moves.iter().map(score).max().unwrap_or(0);
    let candidates: Vec<usize> = moves
        .iter()
        .enumerate()
        .filter(|(_, mv)| score(mv) == best)
        .map(|(i, _)| i)
        .collect();
    candidates[rng.gen_range(0..candidates.len())]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::{Card, Rank, Suit};
    use crate::genome::examples;
    use crate::genome::schema::Location;
    use crate::simulation::state::initial_state;
    use rand::SeedableRng;

    #[test]
    fn test_greedy_prefers_highest_card_play() {
        let genome = examples::war();
        let mut state = initial_state(&genome, 1).unwrap();
        state.players[0].hand = vec![
            Card::new(Rank::Two, Suit::Clubs),
            Card::new(Rank::Ace, Suit::Hearts),
            Card::new(Rank::Nine, Suit::Spades),
        ];
        let moves: Vec<Move> = (0..3)
            .map(|card_index| Move::PlayCard {
                phase_index: 0,
                card_index,
                target: Location::Tableau,
            })
            .collect();
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        assert_eq!(decide(&state, &moves, &mut rng), 1);
    }

    #[test]
    fn test_greedy_prefers_card_play_over_pass() {
        let genome = examples::war();
        let mut state = initial_state(&genome, 1).unwrap();
        state.players[0].hand = vec![Card::new(Rank::Two, Suit::Clubs)];
        let moves = vec![
            Move::Pass {
                phase_index: 0,
                forced: false,
            },
            Move::PlayCard {
                phase_index: 0,
                card_index: 0,
                target: Location::Tableau,
            },
        ];
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        assert_eq!(decide(&state, &moves, &mut rng), 1);
    }
}
