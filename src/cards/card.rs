//! Playing-card primitives: suits, ranks and cards from a standard 52-card deck.

use serde::{Deserialize, Serialize};

/// One of the four French suits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Suit {
    Hearts,
    Diamonds,
    Clubs,
    Spades,
}

impl Suit {
    pub const ALL: [Suit; 4] = [Suit::Hearts, Suit::Diamonds, Suit::Clubs, Suit::Spades];

    /// Hearts and diamonds are red, clubs and spades are black.
    pub fn is_red(self) -> bool {
        matches!(self, Suit::Hearts | Suit::Diamonds)
    }

    /// Compact code used by the bytecode codec.
    pub fn code(self) -> u8 {
        match self {
            Suit::Hearts => 0,
            Suit::Diamonds => 1,
            Suit::Clubs => 2,
            Suit::Spades => 3,
        }
    }

    pub fn from_code(code: u8) -> Option<Suit> {
        match code {
            0 => Some(Suit::Hearts),
            1 => Some(Suit::Diamonds),
            2 => Some(Suit::Clubs),
            3 => Some(Suit::Spades),
            _ => None,
        }
    }
}

impl std::fmt::Display for Suit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Suit::Hearts => "♥",
            Suit::Diamonds => "♦",
            Suit::Clubs => "♣",
            Suit::Spades => "♠",
        };
        write!(f, "{}", s)
    }
}

/// Card rank. The canonical ordinal (2 = 0 … A = 12) is used for compact
/// encoding; comparison value is ace-high (A = 14).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Rank {
    Two,
    Three,
    Four,
    Five,
    Six,
    Seven,
    Eight,
    Nine,
    Ten,
    Jack,
    Queen,
    King,
    Ace,
}

impl Rank {
    pub const ALL: [Rank; 13] = [
        Rank::Two,
        Rank::Three,
        Rank::Four,
        Rank::Five,
        Rank::Six,
        Rank::Seven,
        Rank::Eight,
        Rank::Nine,
        Rank::Ten,
        Rank::Jack,
        Rank::Queen,
        Rank::King,
        Rank::Ace,
    ];

    /// Canonical ordinal: 2 = 0 … A = 12.
    pub fn ordinal(self) -> u8 {
        self as u8
    }

    pub fn from_ordinal(ord: u8) -> Option<Rank> {
        Rank::ALL.get(ord as usize).copied()
    }

    /// Comparison value: ace high (14), face cards 11-13, otherwise pip value.
    pub fn value(self) -> i32 {
        match self {
            Rank::Ace => 14,
            other => other.ordinal() as i32 + 2,
        }
    }
}

impl std::fmt::Display for Rank {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Rank::Jack => write!(f, "J"),
            Rank::Queen => write!(f, "Q"),
            Rank::King => write!(f, "K"),
            Rank::Ace => write!(f, "A"),
            other => write!(f, "{}", other.ordinal() + 2),
        }
    }
}

/// A playing card. Equality is by rank and suit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Card {
    pub rank: Rank,
    pub suit: Suit,
}

impl Card {
    pub fn new(rank: Rank, suit: Suit) -> Self {
        Card { rank, suit }
    }

    pub fn is_red(self) -> bool {
        self.suit.is_red()
    }
}

impl std::fmt::Display for Card {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.rank, self.suit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rank_ordinals_round_trip() {
        for rank in Rank::ALL {
            assert_eq!(Rank::from_ordinal(rank.ordinal()), Some(rank));
        }
    }

    #[test]
    fn test_ace_is_high() {
        assert_eq!(Rank::Ace.value(), 14);
        assert_eq!(Rank::King.value(), 13);
        assert_eq!(Rank::Two.value(), 2);
        assert!(Rank::Ace.value() > Rank::King.value());
    }

    #[test]
    fn test_card_color() {
        assert!(Card::new(Rank::Queen, Suit::Hearts).is_red());
        assert!(!Card::new(Rank::Queen, Suit::Spades).is_red());
    }
}
