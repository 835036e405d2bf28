//! Curated seed genomes: known games expressed in the genome vocabulary.
//!
//! These anchor the initial population with structures that are known to
//! play, and double as fixtures for the simulator and codec tests.

use crate::cards::{Rank, Suit};
use crate::genome::conditions::{CompareOp, Condition, ConditionKind, ConditionRef};
use crate::genome::schema::*;

fn play(target: Location, condition: Option<Condition>) -> Phase {
    Phase::Play(PlayPhase {
        target,
        valid_play_condition: condition,
        min_cards: 1,
        max_cards: 1,
        mandatory: true,
        pass_if_unable: true,
    })
}

fn draw(source: Location, count: u32, mandatory: bool) -> Phase {
    Phase::Draw(DrawPhase {
        source,
        count,
        mandatory,
        condition: None,
    })
}

/// War: zero decisions, pure card comparison, winner takes all.
pub fn war() -> Genome {
    let mut setup = SetupRules::new(26);
    setup.tableau_mode = TableauMode::War;
    let mut genome = Genome::new(
        "war-baseline",
        2,
        setup,
        TurnStructure::new(vec![Phase::Play(PlayPhase {
            target: Location::Tableau,
            valid_play_condition: None,
            min_cards: 1,
            max_cards: 1,
            mandatory: true,
            pass_if_unable: false,
        })]),
    );
    genome.win_conditions = vec![WinCondition::new(WinKind::CaptureAll)];
    genome.max_turns = 1000;
    genome.min_turns = 10;
    genome
}

/// Simplified Hearts: follow suit, hearts must be broken, hearts and the
/// queen of spades score against the trick winner, lowest score wins when
/// hands run out.
pub fn hearts() -> Genome {
    let mut genome = Genome::new(
        "hearts-simplified",
        4,
        SetupRules::new(13),
        TurnStructure::trick_based(
            vec![Phase::Trick(TrickPhase {
                lead_suit_required: true,
                trump_suit: None,
                high_card_wins: true,
                breaking_suit: Some(Suit::Hearts),
            })],
            13,
        ),
    );
    genome.card_scoring = vec![
        CardScoringRule {
            condition: CardCondition {
                suit: Some(Suit::Hearts),
                rank: None,
            },
            points: 1,
            trigger: ScoringTrigger::TrickWin,
        },
        CardScoringRule {
            condition: CardCondition {
                suit: Some(Suit::Spades),
                rank: Some(Rank::Queen),
            },
            points: 13,
            trigger: ScoringTrigger::TrickWin,
        },
    ];
    genome.win_conditions = vec![WinCondition {
        kind: WinKind::AllHandsEmpty,
        threshold: None,
        comparison: WinComparison::Lowest,
        trigger: TriggerMode::AllHandsEmpty,
        required_hand_size: None,
    }];
    genome.max_turns = 500;
    genome.min_turns = 52;
    genome
}

/// Crazy Eights: match the discard top by suit or rank, eights are wild,
/// draw when stuck, first empty hand wins.
pub fn crazy_eights() -> Genome {
    let mut setup = SetupRules::new(7);
    setup.initial_discard_count = 1;
    setup.wild_cards = vec![Rank::Eight];
    let match_condition = Condition::any_of(vec![
        Condition::referencing(ConditionKind::CardMatchesSuit, ConditionRef::TopDiscard),
        Condition::referencing(ConditionKind::CardMatchesRank, ConditionRef::TopDiscard),
        Condition::simple(
            ConditionKind::CardIsRank,
            CompareOp::Eq,
            Rank::Eight.ordinal() as i32,
        ),
    ]);
    let mut genome = Genome::new(
        "crazy-eights",
        4,
        setup,
        TurnStructure::new(vec![
            // Draw only when no card in hand can be played.
            Phase::Draw(DrawPhase {
                source: Location::Deck,
                count: 1,
                mandatory: true,
                condition: Some(Condition::Simple {
                    kind: ConditionKind::LocationSize,
                    op: CompareOp::Eq,
                    value: 0,
                    reference: ConditionRef::ValidPlays,
                }),
            }),
            play(Location::Discard, Some(match_condition)),
        ]),
    );
    genome.win_conditions = vec![WinCondition::new(WinKind::EmptyHand)];
    genome.max_turns = 200;
    genome.min_turns = 10;
    genome
}

/// Simplified Gin Rummy: draw, optionally lay melds, discard.
pub fn gin_rummy() -> Genome {
    let mut setup = SetupRules::new(10);
    setup.initial_discard_count = 1;
    let mut genome = Genome::new(
        "gin-rummy-simplified",
        2,
        setup,
        TurnStructure::new(vec![
            draw(Location::Deck, 1, true),
            Phase::Play(PlayPhase {
                target: Location::Tableau,
                valid_play_condition: Some(Condition::simple(
                    ConditionKind::HasRunOfN,
                    CompareOp::Ge,
                    3,
                )),
                min_cards: 1,
                max_cards: 1,
                mandatory: false,
                pass_if_unable: true,
            }),
            Phase::Discard(DiscardPhase {
                target: Location::Discard,
                count: 1,
                mandatory: true,
                matching_condition: None,
            }),
        ]),
    );
    genome.win_conditions = vec![WinCondition::new(WinKind::EmptyHand)];
    genome.max_turns = 100;
    genome.min_turns = 10;
    genome
}

/// Old Maid shape: draw from an opponent, shed matching pairs.
pub fn old_maid() -> Genome {
    let mut genome = Genome::new(
        "old-maid",
        3,
        SetupRules::new(17),
        TurnStructure::new(vec![
            draw(Location::OpponentHand, 1, true),
            Phase::Discard(DiscardPhase {
                target: Location::Discard,
                count: 2,
                mandatory: false,
                matching_condition: Some(Condition::simple(
                    ConditionKind::HasMatchingPair,
                    CompareOp::Ge,
                    1,
                )),
            }),
        ]),
    );
    genome.win_conditions = vec![WinCondition::new(WinKind::EmptyHand)];
    genome.max_turns = 300;
    genome.min_turns = 10;
    genome
}

/// Spades: partnership trick-taking with bidding, spades as trump.
pub fn spades() -> Genome {
    let mut genome = Genome::new(
        "spades-partnership",
        4,
        SetupRules::new(13),
        TurnStructure::trick_based(
            vec![
                Phase::Bidding(BiddingPhase {
                    min_bid: 0,
                    max_bid: 13,
                    allow_nil: true,
                }),
                Phase::Trick(TrickPhase {
                    lead_suit_required: true,
                    trump_suit: Some(Suit::Spades),
                    high_card_wins: true,
                    breaking_suit: Some(Suit::Spades),
                }),
            ],
            13,
        ),
    );
    genome.contract_scoring = Some(ContractScoring::default());
    genome.win_conditions = vec![
        WinCondition {
            kind: WinKind::FirstToScore,
            threshold: Some(250),
            comparison: WinComparison::First,
            trigger: TriggerMode::ThresholdGate,
            required_hand_size: None,
        },
        WinCondition {
            kind: WinKind::AllHandsEmpty,
            threshold: None,
            comparison: WinComparison::Highest,
            trigger: TriggerMode::AllHandsEmpty,
            required_hand_size: None,
        },
    ];
    genome.team_mode = true;
    genome.teams = vec![vec![0, 2], vec![1, 3]];
    genome.max_turns = 600;
    genome.min_turns = 52;
    genome
}

/// Five-card showdown poker: one betting round, best hand takes the pot.
pub fn simple_poker() -> Genome {
    let mut setup = SetupRules::new(5);
    setup.starting_chips = 500;
    let mut genome = Genome::new(
        "simple-poker",
        2,
        setup,
        TurnStructure::new(vec![Phase::Betting(BettingPhase {
            min_bet: 10,
            max_raises: 3,
        })]),
    );
    genome.hand_evaluation = Some(poker_hand_evaluation());
    genome.win_conditions = vec![WinCondition::new(WinKind::BestHand)];
    genome.max_turns = 60;
    genome.min_turns = 2;
    genome
}

/// Blackjack shape: optional hits against a 21 target with ace high/low.
pub fn blackjack() -> Genome {
    let mut genome = Genome::new(
        "blackjack-duel",
        2,
        SetupRules::new(2),
        TurnStructure::new(vec![draw(Location::Deck, 1, false)]),
    );
    let mut card_values: Vec<CardValue> = Rank::ALL
        .iter()
        .map(|&rank| CardValue {
            rank,
            value: match rank {
                Rank::Ace => 11,
                Rank::Jack | Rank::Queen | Rank::King => 10,
                other => other.ordinal() as i32 + 2,
            },
            alternate_value: (rank == Rank::Ace).then_some(1),
        })
        .collect();
    card_values.sort_by_key(|cv| cv.rank.ordinal());
    genome.hand_evaluation = Some(HandEvaluation {
        method: HandEvalMethod::PointTotal,
        patterns: Vec::new(),
        card_values,
        target_value: Some(21),
        bust_threshold: Some(22),
    });
    genome.win_conditions = vec![WinCondition::new(WinKind::BestHand)];
    genome.max_turns = 40;
    genome.min_turns = 2;
    genome
}

/// Cheat: face-down claims in rank order, challengeable.
pub fn cheat() -> Genome {
    let mut genome = Genome::new(
        "cheat-bluff",
        4,
        SetupRules::new(13),
        TurnStructure::new(vec![Phase::Claim(ClaimPhase {
            min_cards: 1,
            max_cards: 4,
            sequential_rank: true,
            allow_challenge: true,
            pile_penalty: true,
        })]),
    );
    genome.win_conditions = vec![WinCondition::new(WinKind::EmptyHand)];
    genome.max_turns = 400;
    genome.min_turns = 10;
    genome
}

/// Sequence builder: extend a shared pile up or down, shed your hand.
pub fn royal_climb() -> Genome {
    let mut setup = SetupRules::new(7);
    setup.initial_discard_count = 0;
    setup.tableau_mode = TableauMode::Sequence;
    setup.sequence_direction = SequenceDirection::Both;
    let mut genome = Genome::new(
        "royal-climb",
        3,
        setup,
        TurnStructure::new(vec![
            play(Location::Tableau, None),
            Phase::Draw(DrawPhase {
                source: Location::Deck,
                count: 1,
                mandatory: true,
                condition: Some(Condition::Simple {
                    kind: ConditionKind::LocationSize,
                    op: CompareOp::Eq,
                    value: 0,
                    reference: ConditionRef::ValidPlays,
                }),
            }),
        ]),
    );
    genome.win_conditions = vec![WinCondition::new(WinKind::EmptyHand)];
    genome.max_turns = 300;
    genome.min_turns = 10;
    genome
}

/// Uno-shaped shedding game with printed special effects.
pub fn switchback() -> Genome {
    let mut setup = SetupRules::new(7);
    setup.initial_discard_count = 1;
    setup.custom_printed_deck = true;
    let match_condition = Condition::any_of(vec![
        Condition::referencing(ConditionKind::CardMatchesSuit, ConditionRef::TopDiscard),
        Condition::referencing(ConditionKind::CardMatchesRank, ConditionRef::TopDiscard),
    ]);
    let mut genome = Genome::new(
        "switchback",
        4,
        setup,
        TurnStructure::new(vec![
            Phase::Draw(DrawPhase {
                source: Location::Deck,
                count: 1,
                mandatory: true,
                condition: Some(Condition::Simple {
                    kind: ConditionKind::LocationSize,
                    op: CompareOp::Eq,
                    value: 0,
                    reference: ConditionRef::ValidPlays,
                }),
            }),
            play(Location::Discard, Some(match_condition)),
        ]),
    );
    genome.special_effects = vec![
        SpecialEffect {
            trigger_rank: Rank::Queen,
            kind: EffectKind::SkipNext,
            target: TargetSelector::NextPlayer,
            value: 1,
        },
        SpecialEffect {
            trigger_rank: Rank::Ace,
            kind: EffectKind::ReverseDirection,
            target: TargetSelector::AllOpponents,
            value: 1,
        },
        SpecialEffect {
            trigger_rank: Rank::Two,
            kind: EffectKind::DrawCards,
            target: TargetSelector::NextPlayer,
            value: 2,
        },
    ];
    genome.win_conditions = vec![WinCondition::new(WinKind::EmptyHand)];
    genome.max_turns = 250;
    genome.min_turns = 10;
    genome
}

/// Standard poker hand ranking as explicit patterns, best first.
pub fn poker_hand_evaluation() -> HandEvaluation {
    let pattern = |name: &str, priority: u8| HandPattern {
        name: name.to_string(),
        priority,
        required_count: None,
        same_suit_count: None,
        same_rank_groups: None,
        sequence_length: None,
        sequence_wrap: false,
        required_ranks: None,
    };
    let patterns = vec![
        HandPattern {
            same_suit_count: Some(5),
            sequence_length: Some(5),
            ..pattern("straight flush", 90)
        },
        HandPattern {
            same_rank_groups: Some(vec![4]),
            ..pattern("four of a kind", 80)
        },
        HandPattern {
            same_rank_groups: Some(vec![3, 2]),
            ..pattern("full house", 70)
        },
        HandPattern {
            same_suit_count: Some(5),
            ..pattern("flush", 60)
        },
        HandPattern {
            sequence_length: Some(5),
            sequence_wrap: true,
            ..pattern("straight", 50)
        },
        HandPattern {
            same_rank_groups: Some(vec![3]),
            ..pattern("three of a kind", 40)
        },
        HandPattern {
            same_rank_groups: Some(vec![2, 2]),
            ..pattern("two pair", 30)
        },
        HandPattern {
            same_rank_groups: Some(vec![2]),
            ..pattern("pair", 20)
        },
        pattern("high card", 10),
    ];
    HandEvaluation {
        method: HandEvalMethod::PatternMatch,
        patterns,
        card_values: Vec::new(),
        target_value: None,
        bust_threshold: None,
    }
}

/// The full seed library, in a stable order.
pub fn seed_genomes() -> Vec<Genome> {
    vec![
        war(),
        hearts(),
        crazy_eights(),
        gin_rummy(),
        old_maid(),
        spades(),
        simple_poker(),
        blackjack(),
        cheat(),
        royal_climb(),
        switchback(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_seed_genomes_satisfy_invariants() {
        for genome in seed_genomes() {
            assert!(
                genome.check_invariants().is_ok(),
                "{} violates invariants: {:?}",
                genome.id,
                genome.check_invariants()
            );
        }
    }

    #[test]
    fn test_seed_ids_are_unique() {
        let genomes = seed_genomes();
        let mut ids: Vec<_> = genomes.iter().map(|g| g.id.clone()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), genomes.len());
    }

    #[test]
    fn test_war_is_two_player_tableau_game() {
        let genome = war();
        assert_eq!(genome.player_count, 2);
        assert_eq!(genome.setup.tableau_mode, TableauMode::War);
        assert_eq!(genome.setup.cards_per_player, 26);
    }

    #[test]
    fn test_hearts_scores_26_points_total() {
        let genome = hearts();
        // 13 hearts at 1 point plus the queen of spades at 13.
        let total: i32 = genome
            .card_scoring
            .iter()
            .map(|rule| match rule.condition.rank {
                Some(_) => rule.points,
                None => rule.points * 13,
            })
            .sum();
        assert_eq!(total, 26);
    }
}
