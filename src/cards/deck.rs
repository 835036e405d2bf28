//! Standard 52-card deck construction and seeded shuffling.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::cards::card::{Card, Rank, Suit};

/// Build the 52 unique cards of a standard deck, in canonical order
/// (suits in `Suit::ALL` order, ranks two through ace within each suit).
pub fn standard_deck() -> Vec<Card> {
    let mut deck = Vec::with_capacity(52);
    for suit in Suit::ALL {
        for rank in Rank::ALL {
            deck.push(Card::new(rank, suit));
        }
    }
    deck
}

/// Build a standard deck shuffled with the given RNG. Two calls with RNGs in
/// the same state produce the same order.
pub fn shuffled_deck<R: Rng>(rng: &mut R) -> Vec<Card> {
    let mut deck = standard_deck();
    deck.shuffle(rng);
    deck
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::collections::HashSet;

    #[test]
    fn test_deck_has_52_unique_cards() {
        let deck = standard_deck();
        assert_eq!(deck.len(), 52);
        let unique: HashSet<_> = deck.iter().collect();
        assert_eq!(unique.len(), 52);
    }

    #[test]
    fn test_shuffle_is_deterministic_for_a_seed() {
        let mut a = ChaCha8Rng::seed_from_u64(42);
        let mut b = ChaCha8Rng::seed_from_u64(42);
        assert_eq!(shuffled_deck(&mut a), shuffled_deck(&mut b));
    }

    #[test]
    fn test_different_seeds_differ() {
        let mut a = ChaCha8Rng::seed_from_u64(1);
        let mut b = ChaCha8Rng::seed_from_u64(2);
        assert_ne!(shuffled_deck(&mut a), shuffled_deck(&mut b));
    }
}
