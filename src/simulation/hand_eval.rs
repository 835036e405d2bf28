//! Showdown hand evaluation: ranks a hand according to the genome's
//! `HandEvaluation` block. Used by the `best_hand` win condition.

use crate::cards::{Card, Rank};
use crate::genome::schema::{HandEvalMethod, HandEvaluation, HandPattern};

/// Comparable strength of a hand: pattern priority first, then the kicker.
/// Busted point-total hands rank below everything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct HandStrength {
    pub priority: i32,
    pub kicker: i32,
}

/// Evaluate a hand under the given evaluation rules.
pub fn evaluate_hand(eval: &HandEvaluation, hand: &[Card]) -> HandStrength {
    match eval.method {
        HandEvalMethod::None => HandStrength {
            priority: 0,
            kicker: 0,
        },
        HandEvalMethod::HighCard => HandStrength {
            priority: 0,
            kicker: hand.iter().map(|c| c.rank.value()).max().unwrap_or(0),
        },
        HandEvalMethod::CardCount => HandStrength {
            priority: hand.len() as i32,
            kicker: hand.iter().map(|c| c.rank.value()).max().unwrap_or(0),
        },
        HandEvalMethod::PointTotal => point_total_strength(eval, hand),
        HandEvalMethod::PatternMatch => pattern_strength(eval, hand),
    }
}

/// Best achievable point total, honoring alternate card values (ace low)
/// to stay at or under the bust threshold where possible.
pub fn point_total(eval: &HandEvaluation, hand: &[Card]) -> i32 {
    let value_of = |rank: Rank| -> (i32, Option<i32>) {
        eval.card_values
            .iter()
            .find(|cv| cv.rank == rank)
            .map(|cv| (cv.value, cv.alternate_value))
            .unwrap_or((rank.value(), None))
    };

    let mut total = 0;
    let mut flexible: Vec<i32> = Vec::new();
    for card in hand {
        let (value, alternate) = value_of(card.rank);
        total += value;
        if let Some(alt) = alternate {
            flexible.push(value - alt);
        }
    }
    if let Some(bust) = eval.bust_threshold {
        // Demote flexible cards one at a time while busted.
        flexible.sort_unstable_by(|a, b| b.cmp(a));
        for delta in flexible {
            if total < bust {
                break;
            }
            total -= delta;
        }
    }
    total
}

fn point_total_strength(eval: &HandEvaluation, hand: &[Card]) -> HandStrength {
    let total = point_total(eval, hand);
    if let Some(bust) = eval.bust_threshold {
        if total >= bust {
            return HandStrength {
                priority: -1,
                kicker: -total,
            };
        }
    }
    HandStrength {
        priority: 0,
        kicker: total,
    }
}

fn pattern_strength(eval: &HandEvaluation, hand: &[Card]) -> HandStrength {
    let kicker = hand.iter().map(|c| c.rank.value()).max().unwrap_or(0);
    let mut best: Option<&HandPattern> = None;
    for pattern in &eval.patterns {
        if pattern_matches(pattern, hand) {
            match best {
                Some(current) if current.priority >= pattern.priority => {}
                _ => best = Some(pattern),
            }
        }
    }
    HandStrength {
        priority: best.map_or(0, |p| p.priority as i32),
        kicker,
    }
}

/// Check every constraint of a pattern against the hand.
pub fn pattern_matches(pattern: &HandPattern, hand: &[Card]) -> bool {
    if let Some(required) = pattern.required_count {
        if hand.len() != required as usize {
            return false;
        }
    }
    if let Some(suited) = pattern.same_suit_count {
        let mut counts = [0u8; 4];
        for card in hand {
            counts[card.suit.code() as usize] += 1;
        }
        if !counts.iter().any(|&c| c >= suited) {
            return false;
        }
    }
    if let Some(groups) = &pattern.same_rank_groups {
        if !rank_groups_match(hand, groups) {
            return false;
        }
    }
    if let Some(length) = pattern.sequence_length {
        if !has_sequence(hand, length as usize, pattern.sequence_wrap) {
            return false;
        }
    }
    if let Some(required) = &pattern.required_ranks {
        for rank in required {
            if !hand.iter().any(|c| c.rank == *rank) {
                return false;
            }
        }
    }
    true
}

/// The hand must contain disjoint rank groups of at least the given sizes
/// (e.g. `[3, 2]` is a full house).
fn rank_groups_match(hand: &[Card], groups: &[u8]) -> bool {
    let mut counts = [0u8; 13];
    for card in hand {
        counts[card.rank.ordinal() as usize] += 1;
    }
    let mut available: Vec<u8> = counts.iter().copied().filter(|&c| c > 0).collect();
    available.sort_unstable_by(|a, b| b.cmp(a));
    let mut wanted: Vec<u8> = groups.to_vec();
    wanted.sort_unstable_by(|a, b| b.cmp(a));
    for need in wanted {
        match available.iter().position(|&have| have >= need) {
            Some(idx) => {
                available.remove(idx);
            }
            None => return false,
        }
    }
    true
}

/// Consecutive ranks of the given length; `wrap` additionally allows the
/// ace to sit below the two (A-2-3) or above the king (Q-K-A).
fn has_sequence(hand: &[Card], length: usize, wrap: bool) -> bool {
    if length == 0 {
        return true;
    }
    let mut present = [false; 13];
    for card in hand {
        present[card.rank.ordinal() as usize] = true;
    }
    let window = |start: i32| -> bool {
        (0..length as i32).all(|i| {
            let ord = start + i;
            // With wrap the ace (ordinal 12) also acts as ordinal -1.
            let ord = if wrap && ord == -1 { 12 } else { ord };
            (0..13).contains(&ord) && present[ord as usize]
        })
    };
    let lowest_start = if wrap { -1 } else { 0 };
    (lowest_start..=(13 - length as i32)).any(window)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::Suit;
    use crate::genome::examples::{blackjack, poker_hand_evaluation};

    fn card(rank: Rank, suit: Suit) -> Card {
        Card::new(rank, suit)
    }

    #[test]
    fn test_pair_beats_high_card() {
        let eval = poker_hand_evaluation();
        let pair = evaluate_hand(
            &eval,
            &[
                card(Rank::Four, Suit::Hearts),
                card(Rank::Four, Suit::Clubs),
                card(Rank::Nine, Suit::Spades),
                card(Rank::Jack, Suit::Diamonds),
                card(Rank::Two, Suit::Hearts),
            ],
        );
        let high = evaluate_hand(
            &eval,
            &[
                card(Rank::Ace, Suit::Hearts),
                card(Rank::Four, Suit::Clubs),
                card(Rank::Nine, Suit::Spades),
                card(Rank::Jack, Suit::Diamonds),
                card(Rank::Two, Suit::Hearts),
            ],
        );
        assert!(pair > high);
    }

    #[test]
    fn test_full_house_detected() {
        let eval = poker_hand_evaluation();
        let strength = evaluate_hand(
            &eval,
            &[
                card(Rank::King, Suit::Hearts),
                card(Rank::King, Suit::Clubs),
                card(Rank::King, Suit::Spades),
                card(Rank::Two, Suit::Diamonds),
                card(Rank::Two, Suit::Hearts),
            ],
        );
        assert_eq!(strength.priority, 70);
    }

    #[test]
    fn test_wrap_straight_ace_low() {
        let eval = poker_hand_evaluation();
        let strength = evaluate_hand(
            &eval,
            &[
                card(Rank::Ace, Suit::Hearts),
                card(Rank::Two, Suit::Clubs),
                card(Rank::Three, Suit::Spades),
                card(Rank::Four, Suit::Diamonds),
                card(Rank::Five, Suit::Hearts),
            ],
        );
        assert_eq!(strength.priority, 50);
    }

    #[test]
    fn test_blackjack_ace_demotes_to_avoid_bust() {
        let genome = blackjack();
        let eval = genome.hand_evaluation.unwrap();
        // A + 9 + 5: ace as 11 would bust at 25, so it counts as 1.
        let total = point_total(
            &eval,
            &[
                card(Rank::Ace, Suit::Hearts),
                card(Rank::Nine, Suit::Clubs),
                card(Rank::Five, Suit::Spades),
            ],
        );
        assert_eq!(total, 15);
        // Busted hands rank below any standing hand.
        let busted = evaluate_hand(
            &eval,
            &[
                card(Rank::King, Suit::Hearts),
                card(Rank::Nine, Suit::Clubs),
                card(Rank::Five, Suit::Spades),
            ],
        );
        let standing = evaluate_hand(
            &eval,
            &[card(Rank::Two, Suit::Hearts), card(Rank::Three, Suit::Clubs)],
        );
        assert!(standing > busted);
    }
}
