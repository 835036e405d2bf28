//! Game state snapshots and the seeded initializer.
//!
//! A `GameState` is a complete picture of a game in progress. Transitions
//! never mutate in place: the applier clones the previous snapshot and
//! rebuilds the changed fields, so callers can hold onto any state they have
//! seen (the MCTS tree relies on this).

use rand::seq::SliceRandom;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use rand::SeedableRng;
use thiserror::Error;

use crate::cards::{deck::standard_deck, Card, Rank, Suit};
use crate::genome::schema::{Genome, TableauMode};
use crate::genome::GenomeInvariant;

/// Per-player state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerState {
    pub id: u8,
    pub hand: Vec<Card>,
    pub score: i32,
    pub chips: i32,
    pub current_bet: i32,
    pub has_folded: bool,
    pub is_all_in: bool,
}

impl PlayerState {
    fn new(id: u8, chips: i32) -> Self {
        PlayerState {
            id,
            hand: Vec::new(),
            score: 0,
            chips,
            current_bet: 0,
            has_folded: false,
            is_all_in: false,
        }
    }
}

/// An unresolved face-down claim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimState {
    pub claimer: u8,
    pub claimed_rank: Rank,
    pub claimed_count: u8,
    /// The actual face-down cards; only revealed on challenge.
    pub cards: Vec<Card>,
}

/// Complete game state at one point in time.
#[derive(Debug, Clone, PartialEq)]
pub struct GameState {
    pub players: Vec<PlayerState>,
    /// Face-down draw pile; the top is the last element.
    pub deck: Vec<Card>,
    /// Face-up discard pile; the top is the last element.
    pub discard: Vec<Card>,
    /// Shared piles; empty when the game never plays to the tableau.
    pub tableau: Vec<Vec<Card>>,
    /// Cards contributed to the trick in play, in play order.
    pub current_trick: Vec<(u8, Card)>,
    pub current_claim: Option<ClaimState>,
    /// Cards captured per player (tricks, rank matches, war battles).
    pub captured: Vec<Vec<Card>>,
    pub tricks_won: Vec<u32>,
    /// Declared contracts, one slot per player; `None` until bid.
    pub bids: Vec<Option<u8>>,

    /// 1-based turn number; advances after each full round of player turns.
    pub turn: u32,
    /// Completed player-turns since the deal.
    pub turns_taken: u32,
    pub active_player: u8,
    /// Index into the genome's phase list for the active player's turn.
    pub phase_index: usize,

    pub pot: i32,
    pub current_bet: i32,
    pub raise_count: u32,
    pub acted_in_betting: Vec<bool>,
    pub betting_round_complete: bool,

    pub direction_reversed: bool,
    pub pending_skips: u8,
    pub extra_turn: bool,
    pub breaking_suit_broken: bool,
    /// Trump resolved at deal time (fixed, rotated or drawn at random).
    pub trump: Option<Suit>,
    /// Next rank in the claim cycle for sequential claim games.
    pub expected_claim_rank: Rank,

    /// Full player rounds in a row in which no card or chip moved.
    pub consecutive_pass_rounds: u32,
    /// Whether the round in progress has moved a card or chip yet.
    pub round_had_action: bool,

    /// Winner of the last trick; leads the next one.
    pub next_leader: Option<u8>,
    /// Set when everyone else folded; the survivor takes the pot.
    pub fold_win: Option<u8>,
    /// A draw hit an empty deck that could not be reshuffled.
    pub deck_exhausted: bool,
    /// End-of-hand scoring (hand-end rules, contracts, pot) already applied.
    pub hand_finalized: bool,
}

impl GameState {
    pub fn player_count(&self) -> u8 {
        self.players.len() as u8
    }

    pub fn active(&self) -> &PlayerState {
        &self.players[self.active_player as usize]
    }

    pub fn top_discard(&self) -> Option<Card> {
        self.discard.last().copied()
    }

    /// Multiset size of every card zone; 52 at all times.
    pub fn total_cards(&self) -> usize {
        self.players.iter().map(|p| p.hand.len()).sum::<usize>()
            + self.deck.len()
            + self.discard.len()
            + self.tableau.iter().map(Vec::len).sum::<usize>()
            + self.current_trick.len()
            + self.current_claim.as_ref().map_or(0, |c| c.cards.len())
            + self.captured.iter().map(Vec::len).sum::<usize>()
    }

    /// Sum of chips in play plus the pot; invariant across betting.
    pub fn total_chips(&self) -> i32 {
        self.players.iter().map(|p| p.chips).sum::<i32>() + self.pot
    }

    /// Players still contesting the pot.
    pub fn unfolded_players(&self) -> Vec<u8> {
        self.players
            .iter()
            .filter(|p| !p.has_folded)
            .map(|p| p.id)
            .collect()
    }

    /// Seat after `player` in the current play direction, skipping nobody.
    pub fn seat_after(&self, player: u8) -> u8 {
        let n = self.player_count() as i32;
        let step = if self.direction_reversed { -1 } else { 1 };
        ((player as i32 + step).rem_euclid(n)) as u8
    }
}

/// Failures constructing an initial state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InitError {
    #[error("genome invariant violated: {0}")]
    Invariant(#[from] GenomeInvariant),
}

/// Build the initial state for a genome from a 64-bit seed.
///
/// Deals `cards_per_player` round-robin from a seeded shuffle, seeds the
/// discard pile, sets up chips and betting fields, resolves trump, and
/// leaves player 0 on turn 1.
pub fn initial_state(genome: &Genome, seed: u64) -> Result<GameState, InitError> {
    genome.check_invariants()?;

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut deck = standard_deck();
    deck.shuffle(&mut rng);

    let n = genome.player_count as usize;
    let mut players: Vec<PlayerState> = (0..n)
        .map(|id| PlayerState::new(id as u8, genome.setup.starting_chips))
        .collect();

    for _ in 0..genome.setup.cards_per_player {
        for player in players.iter_mut() {
            if let Some(card) = deck.pop() {
                player.hand.push(card);
            }
        }
    }

    let mut discard = Vec::new();
    for _ in 0..genome.setup.initial_discard_count {
        if let Some(card) = deck.pop() {
            discard.push(card);
        }
    }

    let trump = if genome.setup.random_trump {
        Some(Suit::ALL[rng.gen_range(0..Suit::ALL.len())])
    } else {
        genome.setup.trump_suit.or_else(|| {
            genome.turn_structure.phases.iter().find_map(|p| match p {
                crate::genome::schema::Phase::Trick(t) => t.trump_suit,
                _ => None,
            })
        })
    };

    let tableau = if genome.setup.tableau_mode != TableauMode::None
        || genome.turn_structure.phases.iter().any(|p| {
            matches!(p, crate::genome::schema::Phase::Play(play)
                if play.target == crate::genome::schema::Location::Tableau)
        }) {
        vec![Vec::new()]
    } else {
        Vec::new()
    };

    Ok(GameState {
        players,
        deck,
        discard,
        tableau,
        current_trick: Vec::new(),
        current_claim: None,
        captured: vec![Vec::new(); n],
        tricks_won: vec![0; n],
        bids: vec![None; n],
        turn: 1,
        turns_taken: 0,
        active_player: 0,
        phase_index: 0,
        pot: 0,
        current_bet: 0,
        raise_count: 0,
        acted_in_betting: vec![false; n],
        betting_round_complete: false,
        direction_reversed: false,
        pending_skips: 0,
        extra_turn: false,
        breaking_suit_broken: false,
        trump,
        expected_claim_rank: Rank::Ace,
        consecutive_pass_rounds: 0,
        round_had_action: false,
        next_leader: None,
        fold_win: None,
        deck_exhausted: false,
        hand_finalized: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genome::examples;

    #[test]
    fn test_initial_state_deals_full_hands() {
        let genome = examples::war();
        let state = initial_state(&genome, 42).unwrap();
        assert_eq!(state.players.len(), 2);
        assert_eq!(state.players[0].hand.len(), 26);
        assert_eq!(state.players[1].hand.len(), 26);
        assert_eq!(state.deck.len(), 0);
        assert_eq!(state.total_cards(), 52);
    }

    #[test]
    fn test_initial_state_is_deterministic() {
        let genome = examples::hearts();
        let a = initial_state(&genome, 7).unwrap();
        let b = initial_state(&genome, 7).unwrap();
        assert_eq!(a, b);
        let c = initial_state(&genome, 8).unwrap();
        assert_ne!(a.players[0].hand, c.players[0].hand);
    }

    #[test]
    fn test_initial_discard_and_chips() {
        let genome = examples::simple_poker();
        let state = initial_state(&genome, 1).unwrap();
        assert_eq!(state.players[0].chips, 500);
        assert_eq!(state.pot, 0);
        assert_eq!(state.total_chips(), 1000);

        let eights = examples::crazy_eights();
        let state = initial_state(&eights, 1).unwrap();
        assert_eq!(state.discard.len(), 1);
        assert_eq!(state.total_cards(), 52);
    }

    #[test]
    fn test_invalid_genome_rejected() {
        let mut genome = examples::war();
        genome.setup.cards_per_player = 30;
        assert!(matches!(
            initial_state(&genome, 0),
            Err(InitError::Invariant(_))
        ));
    }

    #[test]
    fn test_trump_resolved_from_trick_phase() {
        let genome = examples::spades();
        let state = initial_state(&genome, 3).unwrap();
        assert_eq!(state.trump, Some(Suit::Spades));
    }
}
