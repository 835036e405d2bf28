//! Legal-move generation: from state + genome, the ordered list of moves the
//! active player may take in the current phase.
//!
//! Ordering is stable (hand order, then enumeration order) so AI behavior is
//! reproducible for a fixed seed. A phase that offers nothing returns an
//! empty list; the engine decides whether that means skip or stuck.

use crate::cards::Rank;
use crate::genome::schema::{
    BettingPhase, ClaimPhase, Genome, Location, Phase, PlayPhase, TableauMode, TrickPhase,
};
use crate::simulation::conditions::{evaluate, matching_pair, EvalContext};
use crate::simulation::state::GameState;

/// A betting action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BettingAction {
    Check,
    Bet,
    Call,
    Raise,
    AllIn,
    Fold,
}

/// A possible move. Card moves index into the acting player's hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Move {
    PlayCard {
        phase_index: usize,
        card_index: usize,
        target: Location,
    },
    Draw {
        phase_index: usize,
        source: Location,
        count: u32,
    },
    Discard {
        phase_index: usize,
        card_index: usize,
    },
    TrickFollow {
        phase_index: usize,
        card_index: usize,
    },
    ClaimPlay {
        phase_index: usize,
        count: u8,
        rank: Rank,
        bluff: bool,
    },
    Challenge {
        phase_index: usize,
    },
    AcceptClaim {
        phase_index: usize,
    },
    Bid {
        phase_index: usize,
        amount: u8,
    },
    Betting {
        phase_index: usize,
        action: BettingAction,
    },
    /// Declining an optional phase, or a forced skip of an unplayable one.
    Pass {
        phase_index: usize,
        forced: bool,
    },
}

impl Move {
    /// Whether this move plays a card from the hand (used by the greedy AI).
    pub fn plays_card(&self) -> bool {
        matches!(
            self,
            Move::PlayCard { .. } | Move::TrickFollow { .. } | Move::ClaimPlay { .. }
        )
    }

    pub fn card_index(&self) -> Option<usize> {
        match self {
            Move::PlayCard { card_index, .. }
            | Move::Discard { card_index, .. }
            | Move::TrickFollow { card_index, .. } => Some(*card_index),
            _ => None,
        }
    }
}

/// Generate legal moves for the active player's current phase.
pub fn legal_moves(state: &GameState, genome: &Genome) -> Vec<Move> {
    let Some(phase) = genome.turn_structure.phases.get(state.phase_index) else {
        return Vec::new();
    };
    let phase_index = state.phase_index;
    match phase {
        Phase::Draw(draw) => draw_moves(state, genome, phase_index, draw),
        Phase::Play(play) => play_moves(state, genome, phase_index, play),
        Phase::Discard(discard) => discard_moves(state, genome, phase_index, discard),
        Phase::Trick(trick) => trick_moves(state, phase_index, trick),
        Phase::Betting(betting) => betting_moves(state, phase_index, betting),
        Phase::Claim(claim) => claim_moves(state, phase_index, claim),
        Phase::Bidding(bidding) => bidding_moves(state, phase_index, bidding),
    }
}

fn draw_moves(
    state: &GameState,
    genome: &Genome,
    phase_index: usize,
    draw: &crate::genome::schema::DrawPhase,
) -> Vec<Move> {
    if let Some(cond) = &draw.condition {
        let mut ctx = EvalContext::for_player(state.active_player);
        ctx.valid_plays = count_valid_plays(state, genome);
        if !evaluate(cond, state, genome, &ctx) {
            return Vec::new();
        }
    }
    let source_available = match draw.source {
        Location::Deck => !state.deck.is_empty() || !state.discard.is_empty(),
        Location::Discard => !state.discard.is_empty(),
        Location::OpponentHand => state
            .players
            .iter()
            .any(|p| p.id != state.active_player && !p.hand.is_empty()),
        _ => false,
    };
    if !source_available {
        return Vec::new();
    }
    let mut moves = vec![Move::Draw {
        phase_index,
        source: draw.source,
        count: draw.count,
    }];
    if !draw.mandatory {
        moves.push(Move::Pass {
            phase_index,
            forced: false,
        });
    }
    moves
}

/// Cards in the active player's hand that would satisfy the first play
/// phase's condition; resolves the `valid_plays` reference.
fn count_valid_plays(state: &GameState, genome: &Genome) -> i32 {
    let Some(play) = genome.turn_structure.phases.iter().find_map(|p| match p {
        Phase::Play(play) => Some(play),
        _ => None,
    }) else {
        return state.active().hand.len() as i32;
    };
    playable_indices(state, genome, play).len() as i32
}

fn playable_indices(state: &GameState, genome: &Genome, play: &PlayPhase) -> Vec<usize> {
    let hand = &state.active().hand;
    let mut indices = Vec::new();
    for (idx, card) in hand.iter().enumerate() {
        if play.target == Location::Tableau
            && genome.setup.tableau_mode == TableauMode::Sequence
            && !sequence_extends(state, genome, *card)
        {
            continue;
        }
        let allowed = match &play.valid_play_condition {
            Some(cond) => {
                let ctx = EvalContext::with_card(state.active_player, *card);
                evaluate(cond, state, genome, &ctx)
            }
            None => true,
        };
        if allowed {
            indices.push(idx);
        }
    }
    indices
}

/// In Sequence mode a card must extend the pile contiguously in the
/// configured direction; an empty pile accepts anything. With
/// `sequence_wrap` the ranks form a cycle, so K→A and A→2 both continue
/// an ascending run.
fn sequence_extends(state: &GameState, genome: &Genome, card: crate::cards::Card) -> bool {
    let Some(top) = state.tableau.first().and_then(|pile| pile.last()) else {
        return true;
    };
    use crate::genome::schema::SequenceDirection::*;
    let (ascends, descends) = if genome.setup.sequence_wrap {
        let up = (top.rank.ordinal() + 1) % 13 == card.rank.ordinal();
        let down = (card.rank.ordinal() + 1) % 13 == top.rank.ordinal();
        (up, down)
    } else {
        let diff = card.rank.value() - top.rank.value();
        (diff == 1, diff == -1)
    };
    match genome.setup.sequence_direction {
        Ascending => ascends,
        Descending => descends,
        Both => ascends || descends,
    }
}

fn play_moves(
    state: &GameState,
    genome: &Genome,
    phase_index: usize,
    play: &PlayPhase,
) -> Vec<Move> {
    if play.max_cards == 0 {
        return Vec::new();
    }
    let indices = playable_indices(state, genome, play);
    let mut moves: Vec<Move> = indices
        .into_iter()
        .map(|card_index| Move::PlayCard {
            phase_index,
            card_index,
            target: play.target,
        })
        .collect();
    if moves.is_empty() {
        if !state.active().hand.is_empty() && (play.pass_if_unable || !play.mandatory) {
            moves.push(Move::Pass {
                phase_index,
                forced: true,
            });
        }
        // Otherwise the phase is legally empty; the engine resolves whether
        // that is a skip (empty hand) or a stuck game.
        return moves;
    }
    if !play.mandatory {
        moves.push(Move::Pass {
            phase_index,
            forced: false,
        });
    }
    moves
}

fn discard_moves(
    state: &GameState,
    genome: &Genome,
    phase_index: usize,
    discard: &crate::genome::schema::DiscardPhase,
) -> Vec<Move> {
    let hand = &state.active().hand;
    if hand.is_empty() {
        return Vec::new();
    }
    let mut moves = Vec::new();
    match &discard.matching_condition {
        Some(cond) => {
            // Pair-matching discard: offer each card that has a partner.
            if let Some((first, _)) = matching_pair(hand) {
                let ctx = EvalContext::with_card(state.active_player, hand[first]);
                if evaluate(cond, state, genome, &ctx) {
                    moves.push(Move::Discard {
                        phase_index,
                        card_index: first,
                    });
                }
            }
        }
        None => {
            for card_index in 0..hand.len() {
                moves.push(Move::Discard {
                    phase_index,
                    card_index,
                });
            }
        }
    }
    if !discard.mandatory && !moves.is_empty() {
        moves.push(Move::Pass {
            phase_index,
            forced: false,
        });
    }
    moves
}

fn trick_moves(state: &GameState, phase_index: usize, trick: &TrickPhase) -> Vec<Move> {
    let hand = &state.active().hand;
    if hand.is_empty() {
        return Vec::new();
    }
    // Already contributed to this trick; wait for the others.
    if state
        .current_trick
        .iter()
        .any(|(player, _)| *player == state.active_player)
    {
        return Vec::new();
    }

    let lead_suit = state.current_trick.first().map(|(_, card)| card.suit);
    let indices: Vec<usize> = match lead_suit {
        Some(lead) if trick.lead_suit_required => {
            let following: Vec<usize> = hand
                .iter()
                .enumerate()
                .filter(|(_, c)| c.suit == lead)
                .map(|(i, _)| i)
                .collect();
            if following.is_empty() {
                (0..hand.len()).collect()
            } else {
                following
            }
        }
        Some(_) => (0..hand.len()).collect(),
        None => {
            // Leading: the breaking suit cannot be led until broken.
            match trick.breaking_suit {
                Some(breaking) if !state.breaking_suit_broken => {
                    let non_breaking: Vec<usize> = hand
                        .iter()
                        .enumerate()
                        .filter(|(_, c)| c.suit != breaking)
                        .map(|(i, _)| i)
                        .collect();
                    if non_breaking.is_empty() {
                        (0..hand.len()).collect()
                    } else {
                        non_breaking
                    }
                }
                _ => (0..hand.len()).collect(),
            }
        }
    };

    indices
        .into_iter()
        .map(|card_index| Move::TrickFollow {
            phase_index,
            card_index,
        })
        .collect()
}

fn betting_moves(state: &GameState, phase_index: usize, betting: &BettingPhase) -> Vec<Move> {
    let player = state.active();
    if player.has_folded || player.is_all_in || player.chips <= 0 {
        return Vec::new();
    }
    if state.betting_round_complete {
        return Vec::new();
    }
    // Round settles once everyone has acted and matched the current bet.
    let settled = state.players.iter().all(|p| {
        p.has_folded
            || p.is_all_in
            || (p.current_bet == state.current_bet && state.acted_in_betting[p.id as usize])
    });
    if settled {
        return Vec::new();
    }

    let to_call = state.current_bet - player.current_bet;
    let mut moves = Vec::new();
    let bet = |action| Move::Betting {
        phase_index,
        action,
    };
    if to_call == 0 {
        moves.push(bet(BettingAction::Check));
        if player.chips >= betting.min_bet {
            moves.push(bet(BettingAction::Bet));
        } else if player.chips > 0 {
            moves.push(bet(BettingAction::AllIn));
        }
    } else {
        if player.chips >= to_call {
            moves.push(bet(BettingAction::Call));
            if player.chips >= to_call + betting.min_bet && state.raise_count < betting.max_raises
            {
                moves.push(bet(BettingAction::Raise));
            }
        }
        if player.chips > 0 && player.chips < to_call {
            moves.push(bet(BettingAction::AllIn));
        }
        moves.push(bet(BettingAction::Fold));
    }
    moves
}

fn claim_moves(state: &GameState, phase_index: usize, claim: &ClaimPhase) -> Vec<Move> {
    // A pending claim by someone else must be answered first.
    if let Some(pending) = &state.current_claim {
        if pending.claimer != state.active_player {
            let mut moves = Vec::new();
            if claim.allow_challenge {
                moves.push(Move::Challenge { phase_index });
            }
            moves.push(Move::AcceptClaim { phase_index });
            return moves;
        }
        // Own claim still unresolved; nothing to do.
        return Vec::new();
    }

    let hand = &state.active().hand;
    if hand.is_empty() {
        return Vec::new();
    }
    let min = claim.min_cards.max(1);
    let max = claim.max_cards.max(min);
    let mut moves = Vec::new();

    if claim.sequential_rank {
        let required = state.expected_claim_rank;
        let held = hand.iter().filter(|c| c.rank == required).count() as u8;
        for count in min..=max.min(hand.len() as u8) {
            if held >= count {
                moves.push(Move::ClaimPlay {
                    phase_index,
                    count,
                    rank: required,
                    bluff: false,
                });
            }
            moves.push(Move::ClaimPlay {
                phase_index,
                count,
                rank: required,
                bluff: true,
            });
        }
    } else {
        // Free claims: one truthful move per distinct rank held, plus an
        // ace-high bluff with the lowest cards.
        let mut seen = [false; 13];
        for card in hand {
            let ord = card.rank.ordinal() as usize;
            if seen[ord] {
                continue;
            }
            seen[ord] = true;
            let held = hand.iter().filter(|c| c.rank == card.rank).count() as u8;
            let count = held.min(max).max(min);
            if held >= count {
                moves.push(Move::ClaimPlay {
                    phase_index,
                    count,
                    rank: card.rank,
                    bluff: false,
                });
            }
        }
        moves.push(Move::ClaimPlay {
            phase_index,
            count: min.min(hand.len() as u8),
            rank: Rank::Ace,
            bluff: true,
        });
    }
    moves
}

fn bidding_moves(
    state: &GameState,
    phase_index: usize,
    bidding: &crate::genome::schema::BiddingPhase,
) -> Vec<Move> {
    if state.bids[state.active_player as usize].is_some() {
        return Vec::new();
    }
    let min = if bidding.allow_nil { 0 } else { bidding.min_bid.max(1) };
    let max = bidding.max_bid.max(min);
    (min..=max)
        .map(|amount| Move::Bid {
            phase_index,
            amount,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::{Card, Suit};
    use crate::genome::examples;
    use crate::simulation::state::initial_state;

    #[test]
    fn test_war_offers_every_card() {
        let genome = examples::war();
        let state = initial_state(&genome, 42).unwrap();
        let moves = legal_moves(&state, &genome);
        assert_eq!(moves.len(), 26);
        assert!(moves.iter().all(|m| matches!(
            m,
            Move::PlayCard {
                target: Location::Tableau,
                ..
            }
        )));
    }

    #[test]
    fn test_trick_follow_constrained_to_lead_suit() {
        let genome = examples::hearts();
        let mut state = initial_state(&genome, 3).unwrap();
        state.current_trick = vec![(3, Card::new(Rank::Five, Suit::Clubs))];
        state.active_player = 0;
        state.players[0].hand = vec![
            Card::new(Rank::Two, Suit::Clubs),
            Card::new(Rank::Nine, Suit::Hearts),
            Card::new(Rank::King, Suit::Clubs),
        ];
        let moves = legal_moves(&state, &genome);
        let indices: Vec<usize> = moves.iter().filter_map(Move::card_index).collect();
        assert_eq!(indices, vec![0, 2]);
    }

    #[test]
    fn test_breaking_suit_cannot_be_led_until_broken() {
        let genome = examples::hearts();
        let mut state = initial_state(&genome, 3).unwrap();
        state.active_player = 0;
        state.players[0].hand = vec![
            Card::new(Rank::Two, Suit::Hearts),
            Card::new(Rank::Nine, Suit::Clubs),
        ];
        let moves = legal_moves(&state, &genome);
        let indices: Vec<usize> = moves.iter().filter_map(Move::card_index).collect();
        assert_eq!(indices, vec![1]);

        state.breaking_suit_broken = true;
        let moves = legal_moves(&state, &genome);
        assert_eq!(moves.len(), 2);
    }

    #[test]
    fn test_betting_check_only_without_facing_bet() {
        let genome = examples::simple_poker();
        let state = initial_state(&genome, 9).unwrap();
        let moves = legal_moves(&state, &genome);
        let actions: Vec<BettingAction> = moves
            .iter()
            .filter_map(|m| match m {
                Move::Betting { action, .. } => Some(*action),
                _ => None,
            })
            .collect();
        assert_eq!(actions, vec![BettingAction::Check, BettingAction::Bet]);
    }

    #[test]
    fn test_betting_facing_bet_offers_call_raise_fold() {
        let genome = examples::simple_poker();
        let mut state = initial_state(&genome, 9).unwrap();
        state.current_bet = 10;
        state.players[1].current_bet = 10;
        state.players[1].chips = 490;
        state.pot = 10;
        state.acted_in_betting[1] = true;
        state.active_player = 0;
        let moves = legal_moves(&state, &genome);
        let actions: Vec<BettingAction> = moves
            .iter()
            .filter_map(|m| match m {
                Move::Betting { action, .. } => Some(*action),
                _ => None,
            })
            .collect();
        assert_eq!(
            actions,
            vec![BettingAction::Call, BettingAction::Raise, BettingAction::Fold]
        );
    }

    #[test]
    fn test_folded_player_generates_no_moves() {
        let genome = examples::simple_poker();
        let mut state = initial_state(&genome, 9).unwrap();
        state.players[0].has_folded = true;
        let moves = legal_moves(&state, &genome);
        assert!(moves.is_empty());
    }

    #[test]
    fn test_sequence_pile_requires_adjacent_rank() {
        let genome = examples::royal_climb();
        let mut state = initial_state(&genome, 4).unwrap();
        state.tableau[0] = vec![Card::new(Rank::King, Suit::Clubs)];
        state.players[0].hand = vec![
            Card::new(Rank::Queen, Suit::Hearts),
            Card::new(Rank::Ace, Suit::Spades),
            Card::new(Rank::Two, Suit::Diamonds),
        ];
        let moves = legal_moves(&state, &genome);
        let indices: Vec<usize> = moves.iter().filter_map(Move::card_index).collect();
        // Q and A sit next to the K; the 2 does not without wrapping.
        assert_eq!(indices, vec![0, 1]);
    }

    #[test]
    fn test_sequence_wrap_continues_past_the_ace() {
        let mut genome = examples::royal_climb();
        genome.setup.sequence_wrap = true;
        let mut state = initial_state(&genome, 4).unwrap();
        state.tableau[0] = vec![Card::new(Rank::Ace, Suit::Clubs)];
        state.players[0].hand = vec![
            Card::new(Rank::King, Suit::Hearts),
            Card::new(Rank::Two, Suit::Diamonds),
            Card::new(Rank::Seven, Suit::Spades),
        ];
        let moves = legal_moves(&state, &genome);
        let indices: Vec<usize> = moves.iter().filter_map(Move::card_index).collect();
        // K descends onto the A, 2 wraps upward past it.
        assert_eq!(indices, vec![0, 1]);

        // Without the flag the ace is a dead end upward.
        genome.setup.sequence_wrap = false;
        let moves = legal_moves(&state, &genome);
        let indices: Vec<usize> = moves.iter().filter_map(Move::card_index).collect();
        assert_eq!(indices, vec![0]);
    }

    #[test]
    fn test_bidding_covers_range_once() {
        let genome = examples::spades();
        let state = initial_state(&genome, 5).unwrap();
        let moves = legal_moves(&state, &genome);
        assert_eq!(moves.len(), 14); // nil through 13
        let mut state = state;
        state.bids[0] = Some(4);
        assert!(legal_moves(&state, &genome).is_empty());
    }

    #[test]
    fn test_claim_offers_bluff_and_truth() {
        let genome = examples::cheat();
        let mut state = initial_state(&genome, 6).unwrap();
        state.players[0].hand = vec![
            Card::new(Rank::Ace, Suit::Hearts),
            Card::new(Rank::Four, Suit::Clubs),
        ];
        let moves = legal_moves(&state, &genome);
        assert!(moves
            .iter()
            .any(|m| matches!(m, Move::ClaimPlay { bluff: false, .. })));
        assert!(moves
            .iter()
            .any(|m| matches!(m, Move::ClaimPlay { bluff: true, .. })));
    }
}
