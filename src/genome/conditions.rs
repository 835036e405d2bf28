//! Recursive condition trees used by phases to constrain plays and draws.
//!
//! A condition is either a simple predicate over the game state (optionally
//! bound to the card under evaluation) or an AND/OR combination of nested
//! conditions. The evaluator lives in the simulation layer; this module is
//! the pure data model shared by the genome and the bytecode codec.

use serde::{Deserialize, Serialize};

/// Predicate kind of a simple condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ConditionKind {
    HandSize,
    CardMatchesRank,
    CardMatchesSuit,
    LocationSize,
    SequenceAdjacent,
    CardIsRank,
    HasSetOfN,
    HasRunOfN,
    HasMatchingPair,
    ChipCount,
    PotSize,
    CurrentBet,
    CanAfford,
}

impl ConditionKind {
    /// Bytecode opcode for this predicate (the 0-19 opcode band).
    pub fn opcode(self) -> u8 {
        match self {
            ConditionKind::HandSize => 0,
            ConditionKind::CardMatchesRank => 1,
            ConditionKind::CardMatchesSuit => 2,
            ConditionKind::LocationSize => 3,
            ConditionKind::SequenceAdjacent => 4,
            ConditionKind::HasSetOfN => 5,
            ConditionKind::HasRunOfN => 6,
            ConditionKind::HasMatchingPair => 7,
            ConditionKind::ChipCount => 8,
            ConditionKind::PotSize => 9,
            ConditionKind::CurrentBet => 10,
            ConditionKind::CanAfford => 11,
            ConditionKind::CardIsRank => 12,
        }
    }

    pub fn from_opcode(op: u8) -> Option<ConditionKind> {
        match op {
            0 => Some(ConditionKind::HandSize),
            1 => Some(ConditionKind::CardMatchesRank),
            2 => Some(ConditionKind::CardMatchesSuit),
            3 => Some(ConditionKind::LocationSize),
            4 => Some(ConditionKind::SequenceAdjacent),
            5 => Some(ConditionKind::HasSetOfN),
            6 => Some(ConditionKind::HasRunOfN),
            7 => Some(ConditionKind::HasMatchingPair),
            8 => Some(ConditionKind::ChipCount),
            9 => Some(ConditionKind::PotSize),
            10 => Some(ConditionKind::CurrentBet),
            11 => Some(ConditionKind::CanAfford),
            12 => Some(ConditionKind::CardIsRank),
            _ => None,
        }
    }
}

/// Comparison operator for simple conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
}

impl CompareOp {
    pub const ALL: [CompareOp; 6] = [
        CompareOp::Eq,
        CompareOp::Ne,
        CompareOp::Lt,
        CompareOp::Gt,
        CompareOp::Le,
        CompareOp::Ge,
    ];

    pub fn code(self) -> u8 {
        match self {
            CompareOp::Eq => 0,
            CompareOp::Ne => 1,
            CompareOp::Lt => 2,
            CompareOp::Gt => 3,
            CompareOp::Le => 4,
            CompareOp::Ge => 5,
        }
    }

    pub fn from_code(code: u8) -> Option<CompareOp> {
        CompareOp::ALL.get(code as usize).copied()
    }

    pub fn compare(self, lhs: i32, rhs: i32) -> bool {
        match self {
            CompareOp::Eq => lhs == rhs,
            CompareOp::Ne => lhs != rhs,
            CompareOp::Lt => lhs < rhs,
            CompareOp::Gt => lhs > rhs,
            CompareOp::Le => lhs <= rhs,
            CompareOp::Ge => lhs >= rhs,
        }
    }
}

/// Named state reference a condition may resolve against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ConditionRef {
    #[default]
    None,
    TopDiscard,
    LastPlayed,
    ValidPlays,
    Hand,
    Deck,
    Discard,
    Tableau,
}

impl ConditionRef {
    pub fn code(self) -> u8 {
        match self {
            ConditionRef::None => 0,
            ConditionRef::TopDiscard => 1,
            ConditionRef::LastPlayed => 2,
            ConditionRef::ValidPlays => 3,
            ConditionRef::Hand => 4,
            ConditionRef::Deck => 5,
            ConditionRef::Discard => 6,
            ConditionRef::Tableau => 7,
        }
    }

    pub fn from_code(code: u8) -> Option<ConditionRef> {
        match code {
            0 => Some(ConditionRef::None),
            1 => Some(ConditionRef::TopDiscard),
            2 => Some(ConditionRef::LastPlayed),
            3 => Some(ConditionRef::ValidPlays),
            4 => Some(ConditionRef::Hand),
            5 => Some(ConditionRef::Deck),
            6 => Some(ConditionRef::Discard),
            7 => Some(ConditionRef::Tableau),
            _ => None,
        }
    }
}

/// AND/OR combinator of a compound condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Logic {
    And,
    Or,
}

/// A condition tree: a simple predicate or an AND/OR of nested conditions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Condition {
    Simple {
        kind: ConditionKind,
        op: CompareOp,
        value: i32,
        reference: ConditionRef,
    },
    Compound {
        logic: Logic,
        children: Vec<Condition>,
    },
}

impl Condition {
    /// Simple predicate with an explicit comparison and value.
    pub fn simple(kind: ConditionKind, op: CompareOp, value: i32) -> Condition {
        Condition::Simple {
            kind,
            op,
            value,
            reference: ConditionRef::None,
        }
    }

    /// Simple predicate resolving against a named state reference.
    pub fn referencing(kind: ConditionKind, reference: ConditionRef) -> Condition {
        Condition::Simple {
            kind,
            op: CompareOp::Eq,
            value: 0,
            reference,
        }
    }

    pub fn all_of(children: Vec<Condition>) -> Condition {
        Condition::Compound {
            logic: Logic::And,
            children,
        }
    }

    pub fn any_of(children: Vec<Condition>) -> Condition {
        Condition::Compound {
            logic: Logic::Or,
            children,
        }
    }

    /// Maximum nesting depth. A flat list of simple children counts as 1;
    /// only genuinely nested compounds increase depth.
    pub fn depth(&self) -> u32 {
        match self {
            Condition::Simple { .. } => 1,
            Condition::Compound { children, .. } => {
                let max_child = children.iter().map(Condition::depth).max().unwrap_or(1);
                if max_child > 1 {
                    max_child + 1
                } else {
                    1
                }
            }
        }
    }

    /// Number of simple leaves in the tree.
    pub fn clause_count(&self) -> u32 {
        match self {
            Condition::Simple { .. } => 1,
            Condition::Compound { children, .. } => {
                children.iter().map(Condition::clause_count).sum()
            }
        }
    }

    /// Number of AND combinators that make the tree harder to parse:
    /// nested compounds under AND, or flat ANDs of three or more clauses.
    pub fn conjunction_count(&self) -> u32 {
        match self {
            Condition::Simple { .. } => 0,
            Condition::Compound { logic, children } => {
                let nested: u32 = children.iter().map(Condition::conjunction_count).sum();
                let max_child = children.iter().map(Condition::depth).max().unwrap_or(1);
                let own = if max_child > 1 {
                    u32::from(*logic == Logic::And)
                } else {
                    u32::from(*logic == Logic::And && children.len() > 2)
                };
                nested + own
            }
        }
    }

    /// All predicate kinds used anywhere in the tree.
    pub fn collect_kinds(&self, out: &mut std::collections::BTreeSet<ConditionKind>) {
        match self {
            Condition::Simple { kind, .. } => {
                out.insert(*kind);
            }
            Condition::Compound { children, .. } => {
                for child in children {
                    child.collect_kinds(out);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf() -> Condition {
        Condition::simple(ConditionKind::HandSize, CompareOp::Gt, 0)
    }

    #[test]
    fn test_flat_or_is_depth_one() {
        let cond = Condition::any_of(vec![leaf(), leaf(), leaf()]);
        assert_eq!(cond.depth(), 1);
        assert_eq!(cond.clause_count(), 3);
        assert_eq!(cond.conjunction_count(), 0);
    }

    #[test]
    fn test_nested_and_increases_depth() {
        let cond = Condition::all_of(vec![leaf(), Condition::any_of(vec![leaf(), leaf()])]);
        assert_eq!(cond.depth(), 2);
        assert_eq!(cond.clause_count(), 3);
        assert_eq!(cond.conjunction_count(), 1);
    }

    #[test]
    fn test_compare_ops() {
        assert!(CompareOp::Le.compare(3, 3));
        assert!(CompareOp::Ne.compare(2, 3));
        assert!(!CompareOp::Gt.compare(2, 3));
    }
}
