//! Evaluates genome condition trees against a game state.
//!
//! Simple predicates may bind a "card under evaluation" (the candidate card
//! of a play or discard) and may resolve named references such as the top of
//! the discard pile or the pre-filtered count of valid plays.

use crate::cards::{Card, Rank};
use crate::genome::conditions::{CompareOp, Condition, ConditionKind, ConditionRef};
use crate::genome::schema::Genome;
use crate::simulation::state::GameState;

/// Evaluation context: which player is acting and which card, if any, is
/// under consideration.
#[derive(Debug, Clone, Copy)]
pub struct EvalContext {
    pub player: u8,
    pub card: Option<Card>,
    /// Count of cards that already passed the phase filter; resolves the
    /// `valid_plays` reference (pre-computed by the move generator).
    pub valid_plays: i32,
}

impl EvalContext {
    pub fn for_player(player: u8) -> Self {
        EvalContext {
            player,
            card: None,
            valid_plays: 0,
        }
    }

    pub fn with_card(player: u8, card: Card) -> Self {
        EvalContext {
            player,
            card: Some(card),
            valid_plays: 0,
        }
    }
}

/// Evaluate a condition tree. Missing bindings (a card predicate with no
/// card under evaluation) evaluate to false rather than erroring; a genome
/// that gates a draw on a card predicate simply never draws.
pub fn evaluate(cond: &Condition, state: &GameState, genome: &Genome, ctx: &EvalContext) -> bool {
    match cond {
        Condition::Compound { logic, children } => match logic {
            crate::genome::conditions::Logic::And => children
                .iter()
                .all(|c| evaluate(c, state, genome, ctx)),
            crate::genome::conditions::Logic::Or => children
                .iter()
                .any(|c| evaluate(c, state, genome, ctx)),
        },
        Condition::Simple {
            kind,
            op,
            value,
            reference,
        } => evaluate_simple(*kind, *op, *value, *reference, state, genome, ctx),
    }
}

fn evaluate_simple(
    kind: ConditionKind,
    op: CompareOp,
    value: i32,
    reference: ConditionRef,
    state: &GameState,
    genome: &Genome,
    ctx: &EvalContext,
) -> bool {
    let player = &state.players[ctx.player as usize];
    match kind {
        ConditionKind::HandSize => op.compare(player.hand.len() as i32, value),
        ConditionKind::LocationSize => {
            let size = match reference {
                ConditionRef::Hand => player.hand.len() as i32,
                ConditionRef::Deck => state.deck.len() as i32,
                ConditionRef::Discard => state.discard.len() as i32,
                ConditionRef::Tableau => {
                    state.tableau.iter().map(Vec::len).sum::<usize>() as i32
                }
                ConditionRef::ValidPlays => ctx.valid_plays,
                _ => player.hand.len() as i32,
            };
            op.compare(size, value)
        }
        ConditionKind::CardMatchesSuit => {
            let Some(card) = ctx.card else { return false };
            if genome.setup.wild_cards.contains(&card.rank) {
                return true;
            }
            match resolve_card(reference, state) {
                Some(other) => card.suit == other.suit,
                None => false,
            }
        }
        ConditionKind::CardMatchesRank => {
            let Some(card) = ctx.card else { return false };
            if genome.setup.wild_cards.contains(&card.rank) {
                return true;
            }
            match resolve_card(reference, state) {
                Some(other) => card.rank == other.rank,
                None => false,
            }
        }
        ConditionKind::CardIsRank => {
            let Some(card) = ctx.card else { return false };
            Rank::from_ordinal(value as u8).map_or(false, |rank| card.rank == rank)
        }
        ConditionKind::SequenceAdjacent => {
            let Some(card) = ctx.card else { return false };
            match state.tableau.first().and_then(|pile| pile.last()) {
                Some(top) => (card.rank.value() - top.rank.value()).abs() == 1,
                None => true,
            }
        }
        ConditionKind::HasSetOfN => has_set_of_n(&player.hand, value.max(0) as usize),
        ConditionKind::HasRunOfN => has_run_of_n(&player.hand, value.max(0) as usize),
        ConditionKind::HasMatchingPair => has_matching_pair(&player.hand),
        ConditionKind::ChipCount => op.compare(player.chips, value),
        ConditionKind::PotSize => op.compare(state.pot, value),
        ConditionKind::CurrentBet => op.compare(state.current_bet, value),
        ConditionKind::CanAfford => player.chips >= value,
    }
}

fn resolve_card(reference: ConditionRef, state: &GameState) -> Option<Card> {
    match reference {
        ConditionRef::TopDiscard => state.top_discard(),
        ConditionRef::LastPlayed => state
            .current_trick
            .last()
            .map(|(_, card)| *card)
            .or_else(|| state.top_discard()),
        _ => state.top_discard(),
    }
}

/// True when the hand holds `n` cards of one rank.
pub fn has_set_of_n(hand: &[Card], n: usize) -> bool {
    if n == 0 {
        return true;
    }
    let mut counts = [0usize; 13];
    for card in hand {
        let slot = &mut counts[card.rank.ordinal() as usize];
        *slot += 1;
        if *slot >= n {
            return true;
        }
    }
    false
}

/// True when the hand holds `n` cards of consecutive rank (suits ignored,
/// duplicate ranks do not break a run).
pub fn has_run_of_n(hand: &[Card], n: usize) -> bool {
    if n == 0 {
        return true;
    }
    if hand.len() < n {
        return false;
    }
    let mut values: Vec<i32> = hand.iter().map(|c| c.rank.value()).collect();
    values.sort_unstable();
    values.dedup();
    let mut run = 1;
    for pair in values.windows(2) {
        if pair[1] == pair[0] + 1 {
            run += 1;
            if run >= n {
                return true;
            }
        } else {
            run = 1;
        }
    }
    run >= n
}

/// True when the hand holds two cards of the same rank and color.
pub fn has_matching_pair(hand: &[Card]) -> bool {
    matching_pair(hand).is_some()
}

/// Indices of the first same-rank same-color pair, if any.
pub fn matching_pair(hand: &[Card]) -> Option<(usize, usize)> {
    for i in 0..hand.len() {
        for j in i + 1..hand.len() {
            if hand[i].rank == hand[j].rank && hand[i].is_red() == hand[j].is_red() {
                return Some((i, j));
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::{Rank, Suit};
    use crate::genome::examples;
    use crate::simulation::state::initial_state;

    fn card(rank: Rank, suit: Suit) -> Card {
        Card::new(rank, suit)
    }

    #[test]
    fn test_has_set_of_n() {
        let hand = vec![
            card(Rank::Seven, Suit::Hearts),
            card(Rank::Seven, Suit::Clubs),
            card(Rank::Seven, Suit::Spades),
            card(Rank::Two, Suit::Diamonds),
        ];
        assert!(has_set_of_n(&hand, 3));
        assert!(!has_set_of_n(&hand, 4));
    }

    #[test]
    fn test_has_run_of_n() {
        let hand = vec![
            card(Rank::Five, Suit::Hearts),
            card(Rank::Six, Suit::Clubs),
            card(Rank::Six, Suit::Spades),
            card(Rank::Seven, Suit::Diamonds),
        ];
        assert!(has_run_of_n(&hand, 3));
        assert!(!has_run_of_n(&hand, 4));
    }

    #[test]
    fn test_matching_pair_requires_same_color() {
        let hand = vec![
            card(Rank::Queen, Suit::Hearts),
            card(Rank::Queen, Suit::Spades),
        ];
        assert!(!has_matching_pair(&hand));
        let hand = vec![
            card(Rank::Queen, Suit::Hearts),
            card(Rank::Queen, Suit::Diamonds),
        ];
        assert!(has_matching_pair(&hand));
    }

    #[test]
    fn test_card_matches_suit_against_top_discard() {
        let genome = examples::crazy_eights();
        let mut state = initial_state(&genome, 11).unwrap();
        state.discard = vec![card(Rank::Four, Suit::Clubs)];
        let cond = Condition::referencing(ConditionKind::CardMatchesSuit, ConditionRef::TopDiscard);
        let ctx = EvalContext::with_card(0, card(Rank::Nine, Suit::Clubs));
        assert!(evaluate(&cond, &state, &genome, &ctx));
        let ctx = EvalContext::with_card(0, card(Rank::Nine, Suit::Hearts));
        assert!(!evaluate(&cond, &state, &genome, &ctx));
    }

    #[test]
    fn test_wild_cards_match_anything() {
        let genome = examples::crazy_eights();
        let mut state = initial_state(&genome, 11).unwrap();
        state.discard = vec![card(Rank::Four, Suit::Clubs)];
        let cond = Condition::referencing(ConditionKind::CardMatchesSuit, ConditionRef::TopDiscard);
        let ctx = EvalContext::with_card(0, card(Rank::Eight, Suit::Hearts));
        assert!(evaluate(&cond, &state, &genome, &ctx));
    }
}
