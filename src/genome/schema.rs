//! Genome schema: the declarative, self-describing specification of a card
//! game. Genomes are deep-immutable by convention; every genetic operator
//! builds a new genome with an incremented generation rather than mutating
//! in place.

use serde::{Deserialize, Serialize};

use crate::cards::{Rank, Suit};
use crate::genome::conditions::Condition;

/// Schema version written into bytecode headers and JSON records.
pub const SCHEMA_VERSION: &str = "2.0.0";

/// Card locations referenced by phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Location {
    Deck,
    Hand,
    Discard,
    Tableau,
    OpponentHand,
}

impl Location {
    pub fn code(self) -> u8 {
        match self {
            Location::Deck => 0,
            Location::Hand => 1,
            Location::Discard => 2,
            Location::Tableau => 3,
            Location::OpponentHand => 4,
        }
    }

    pub fn from_code(code: u8) -> Option<Location> {
        match code {
            0 => Some(Location::Deck),
            1 => Some(Location::Hand),
            2 => Some(Location::Discard),
            3 => Some(Location::Tableau),
            4 => Some(Location::OpponentHand),
            _ => None,
        }
    }
}

/// Who an effect is aimed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetSelector {
    NextPlayer,
    PrevPlayer,
    PlayerChoice,
    RandomOpponent,
    AllOpponents,
    LeftOpponent,
    RightOpponent,
}

impl TargetSelector {
    pub fn code(self) -> u8 {
        match self {
            TargetSelector::NextPlayer => 0,
            TargetSelector::PrevPlayer => 1,
            TargetSelector::PlayerChoice => 2,
            TargetSelector::RandomOpponent => 3,
            TargetSelector::AllOpponents => 4,
            TargetSelector::LeftOpponent => 5,
            TargetSelector::RightOpponent => 6,
        }
    }

    pub fn from_code(code: u8) -> Option<TargetSelector> {
        match code {
            0 => Some(TargetSelector::NextPlayer),
            1 => Some(TargetSelector::PrevPlayer),
            2 => Some(TargetSelector::PlayerChoice),
            3 => Some(TargetSelector::RandomOpponent),
            4 => Some(TargetSelector::AllOpponents),
            5 => Some(TargetSelector::LeftOpponent),
            6 => Some(TargetSelector::RightOpponent),
            _ => None,
        }
    }
}

/// Card visibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Visibility {
    FaceDown,
    FaceUp,
    OwnerOnly,
    Revealed,
}

impl Visibility {
    pub fn code(self) -> u8 {
        match self {
            Visibility::FaceDown => 0,
            Visibility::FaceUp => 1,
            Visibility::OwnerOnly => 2,
            Visibility::Revealed => 3,
        }
    }

    pub fn from_code(code: u8) -> Option<Visibility> {
        match code {
            0 => Some(Visibility::FaceDown),
            1 => Some(Visibility::FaceUp),
            2 => Some(Visibility::OwnerOnly),
            3 => Some(Visibility::Revealed),
            _ => None,
        }
    }
}

/// Immediate effect a played card can trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EffectKind {
    SkipNext,
    ReverseDirection,
    DrawCards,
    ExtraTurn,
    ForceDiscard,
}

impl EffectKind {
    pub const ALL: [EffectKind; 5] = [
        EffectKind::SkipNext,
        EffectKind::ReverseDirection,
        EffectKind::DrawCards,
        EffectKind::ExtraTurn,
        EffectKind::ForceDiscard,
    ];

    pub fn code(self) -> u8 {
        match self {
            EffectKind::SkipNext => 0,
            EffectKind::ReverseDirection => 1,
            EffectKind::DrawCards => 2,
            EffectKind::ExtraTurn => 3,
            EffectKind::ForceDiscard => 4,
        }
    }

    pub fn from_code(code: u8) -> Option<EffectKind> {
        EffectKind::ALL.get(code as usize).copied()
    }
}

/// A card-triggered immediate effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecialEffect {
    pub trigger_rank: Rank,
    pub kind: EffectKind,
    pub target: TargetSelector,
    pub value: u8,
}

/// When a card scoring rule fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScoringTrigger {
    TrickWin,
    Capture,
    Play,
    HandEnd,
    SetComplete,
}

impl ScoringTrigger {
    pub const ALL: [ScoringTrigger; 5] = [
        ScoringTrigger::TrickWin,
        ScoringTrigger::Capture,
        ScoringTrigger::Play,
        ScoringTrigger::HandEnd,
        ScoringTrigger::SetComplete,
    ];

    pub fn code(self) -> u8 {
        match self {
            ScoringTrigger::TrickWin => 0,
            ScoringTrigger::Capture => 1,
            ScoringTrigger::Play => 2,
            ScoringTrigger::HandEnd => 3,
            ScoringTrigger::SetComplete => 4,
        }
    }

    pub fn from_code(code: u8) -> Option<ScoringTrigger> {
        ScoringTrigger::ALL.get(code as usize).copied()
    }
}

/// Card filter for scoring rules: empty fields match anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct CardCondition {
    pub suit: Option<Suit>,
    pub rank: Option<Rank>,
}

impl CardCondition {
    pub fn matches(&self, card: crate::cards::Card) -> bool {
        self.suit.map_or(true, |s| s == card.suit) && self.rank.map_or(true, |r| r == card.rank)
    }
}

/// Score points when a card matching the condition hits the trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardScoringRule {
    pub condition: CardCondition,
    pub points: i32,
    pub trigger: ScoringTrigger,
}

/// How hands are evaluated for showdowns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HandEvalMethod {
    None,
    HighCard,
    PointTotal,
    PatternMatch,
    CardCount,
}

impl HandEvalMethod {
    pub fn code(self) -> u8 {
        match self {
            HandEvalMethod::None => 0,
            HandEvalMethod::HighCard => 1,
            HandEvalMethod::PointTotal => 2,
            HandEvalMethod::PatternMatch => 3,
            HandEvalMethod::CardCount => 4,
        }
    }

    pub fn from_code(code: u8) -> Option<HandEvalMethod> {
        match code {
            0 => Some(HandEvalMethod::None),
            1 => Some(HandEvalMethod::HighCard),
            2 => Some(HandEvalMethod::PointTotal),
            3 => Some(HandEvalMethod::PatternMatch),
            4 => Some(HandEvalMethod::CardCount),
            _ => None,
        }
    }
}

/// A pattern to look for in a hand. All present constraints must hold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandPattern {
    pub name: String,
    /// Higher priority beats lower at showdown.
    pub priority: u8,
    pub required_count: Option<u8>,
    pub same_suit_count: Option<u8>,
    pub same_rank_groups: Option<Vec<u8>>,
    pub sequence_length: Option<u8>,
    pub sequence_wrap: bool,
    pub required_ranks: Option<Vec<Rank>>,
}

/// Point value of a rank, with an optional alternate (ace low/high).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardValue {
    pub rank: Rank,
    pub value: i32,
    pub alternate_value: Option<i32>,
}

/// Showdown hand evaluation configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandEvaluation {
    pub method: HandEvalMethod,
    pub patterns: Vec<HandPattern>,
    pub card_values: Vec<CardValue>,
    pub target_value: Option<i32>,
    pub bust_threshold: Option<i32>,
}

/// What a win condition measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WinKind {
    EmptyHand,
    CaptureAll,
    HighScore,
    LowScore,
    FirstToScore,
    MostCaptured,
    MostTricks,
    FewestTricks,
    BestHand,
    AllHandsEmpty,
    DeckEmpty,
    MostChips,
}

impl WinKind {
    pub const ALL: [WinKind; 12] = [
        WinKind::EmptyHand,
        WinKind::CaptureAll,
        WinKind::HighScore,
        WinKind::LowScore,
        WinKind::FirstToScore,
        WinKind::MostCaptured,
        WinKind::MostTricks,
        WinKind::FewestTricks,
        WinKind::BestHand,
        WinKind::AllHandsEmpty,
        WinKind::DeckEmpty,
        WinKind::MostChips,
    ];

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<WinKind> {
        WinKind::ALL.get(code as usize).copied()
    }

    /// Win kinds that compare accumulated scores against a threshold.
    pub fn is_score_based(self) -> bool {
        matches!(
            self,
            WinKind::HighScore | WinKind::LowScore | WinKind::FirstToScore
        )
    }
}

/// Direction of the comparison used to pick a winner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum WinComparison {
    Highest,
    Lowest,
    First,
    #[default]
    None,
}

impl WinComparison {
    pub fn code(self) -> u8 {
        match self {
            WinComparison::Highest => 0,
            WinComparison::Lowest => 1,
            WinComparison::First => 2,
            WinComparison::None => 3,
        }
    }

    pub fn from_code(code: u8) -> Option<WinComparison> {
        match code {
            0 => Some(WinComparison::Highest),
            1 => Some(WinComparison::Lowest),
            2 => Some(WinComparison::First),
            3 => Some(WinComparison::None),
            _ => None,
        }
    }
}

/// When the win condition is checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum TriggerMode {
    #[default]
    Immediate,
    ThresholdGate,
    AllHandsEmpty,
    DeckEmpty,
}

impl TriggerMode {
    pub fn code(self) -> u8 {
        match self {
            TriggerMode::Immediate => 0,
            TriggerMode::ThresholdGate => 1,
            TriggerMode::AllHandsEmpty => 2,
            TriggerMode::DeckEmpty => 3,
        }
    }

    pub fn from_code(code: u8) -> Option<TriggerMode> {
        match code {
            0 => Some(TriggerMode::Immediate),
            1 => Some(TriggerMode::ThresholdGate),
            2 => Some(TriggerMode::AllHandsEmpty),
            3 => Some(TriggerMode::DeckEmpty),
            _ => None,
        }
    }
}

/// How to win the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WinCondition {
    pub kind: WinKind,
    pub threshold: Option<i32>,
    pub comparison: WinComparison,
    pub trigger: TriggerMode,
    pub required_hand_size: Option<u8>,
}

impl WinCondition {
    pub fn new(kind: WinKind) -> Self {
        WinCondition {
            kind,
            threshold: None,
            comparison: WinComparison::None,
            trigger: TriggerMode::Immediate,
            required_hand_size: None,
        }
    }

    pub fn with_threshold(kind: WinKind, threshold: i32) -> Self {
        WinCondition {
            threshold: Some(threshold),
            ..WinCondition::new(kind)
        }
    }
}

/// What happens when the deck runs out mid-draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum DeckEmptyAction {
    #[default]
    ReshuffleDiscard,
    GameEnds,
    SkipDraw,
}

impl DeckEmptyAction {
    pub fn code(self) -> u8 {
        match self {
            DeckEmptyAction::ReshuffleDiscard => 0,
            DeckEmptyAction::GameEnds => 1,
            DeckEmptyAction::SkipDraw => 2,
        }
    }

    pub fn from_code(code: u8) -> Option<DeckEmptyAction> {
        match code {
            0 => Some(DeckEmptyAction::ReshuffleDiscard),
            1 => Some(DeckEmptyAction::GameEnds),
            2 => Some(DeckEmptyAction::SkipDraw),
            _ => None,
        }
    }
}

/// How War-style ties are resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum TieBreaker {
    #[default]
    ActivePlayer,
    Alternating,
    Split,
    Battle,
}

impl TieBreaker {
    pub fn code(self) -> u8 {
        match self {
            TieBreaker::ActivePlayer => 0,
            TieBreaker::Alternating => 1,
            TieBreaker::Split => 2,
            TieBreaker::Battle => 3,
        }
    }

    pub fn from_code(code: u8) -> Option<TieBreaker> {
        match code {
            0 => Some(TieBreaker::ActivePlayer),
            1 => Some(TieBreaker::Alternating),
            2 => Some(TieBreaker::Split),
            3 => Some(TieBreaker::Battle),
            _ => None,
        }
    }
}

/// How cards on the tableau interact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum TableauMode {
    #[default]
    None,
    /// Compare cards, winner takes all. 2-player only.
    War,
    /// A played card matching a pile card captures the pile.
    MatchRank,
    /// Piles build in rank order.
    Sequence,
}

impl TableauMode {
    pub fn code(self) -> u8 {
        match self {
            TableauMode::None => 0,
            TableauMode::War => 1,
            TableauMode::MatchRank => 2,
            TableauMode::Sequence => 3,
        }
    }

    pub fn from_code(code: u8) -> Option<TableauMode> {
        match code {
            0 => Some(TableauMode::None),
            1 => Some(TableauMode::War),
            2 => Some(TableauMode::MatchRank),
            3 => Some(TableauMode::Sequence),
            _ => None,
        }
    }
}

/// Direction for `TableauMode::Sequence`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum SequenceDirection {
    Ascending,
    Descending,
    #[default]
    Both,
}

impl SequenceDirection {
    pub fn code(self) -> u8 {
        match self {
            SequenceDirection::Ascending => 0,
            SequenceDirection::Descending => 1,
            SequenceDirection::Both => 2,
        }
    }

    pub fn from_code(code: u8) -> Option<SequenceDirection> {
        match code {
            0 => Some(SequenceDirection::Ascending),
            1 => Some(SequenceDirection::Descending),
            2 => Some(SequenceDirection::Both),
            _ => None,
        }
    }
}

/// Initial game configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetupRules {
    pub cards_per_player: u8,
    pub initial_discard_count: u8,
    /// 0 disables betting entirely.
    pub starting_chips: i32,
    pub wild_cards: Vec<Rank>,
    pub hand_visibility: Visibility,
    pub deck_visibility: Visibility,
    pub discard_visibility: Visibility,
    pub tableau_visibility: Visibility,
    pub trump_suit: Option<Suit>,
    pub rotate_trump: bool,
    pub random_trump: bool,
    /// Uno-style decks with effects printed on the cards.
    pub custom_printed_deck: bool,
    pub tableau_mode: TableauMode,
    pub sequence_direction: SequenceDirection,
    /// Sequence piles may continue past K into A (and A into 2).
    pub sequence_wrap: bool,
    pub deck_empty_action: DeckEmptyAction,
    pub keep_top_discard: bool,
    pub tie_breaker: TieBreaker,
}

impl SetupRules {
    pub fn new(cards_per_player: u8) -> Self {
        SetupRules {
            cards_per_player,
            initial_discard_count: 0,
            starting_chips: 0,
            wild_cards: Vec::new(),
            hand_visibility: Visibility::OwnerOnly,
            deck_visibility: Visibility::FaceDown,
            discard_visibility: Visibility::FaceUp,
            tableau_visibility: Visibility::FaceUp,
            trump_suit: None,
            rotate_trump: false,
            random_trump: false,
            custom_printed_deck: false,
            tableau_mode: TableauMode::None,
            sequence_direction: SequenceDirection::Both,
            sequence_wrap: false,
            deck_empty_action: DeckEmptyAction::ReshuffleDiscard,
            keep_top_discard: true,
            tie_breaker: TieBreaker::ActivePlayer,
        }
    }
}

/// Draw cards from a location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawPhase {
    pub source: Location,
    pub count: u32,
    pub mandatory: bool,
    pub condition: Option<Condition>,
}

/// Play cards from hand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayPhase {
    pub target: Location,
    pub valid_play_condition: Option<Condition>,
    pub min_cards: u8,
    pub max_cards: u8,
    pub mandatory: bool,
    pub pass_if_unable: bool,
}

/// Discard cards to a location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscardPhase {
    pub target: Location,
    pub count: u32,
    pub mandatory: bool,
    pub matching_condition: Option<Condition>,
}

/// Trick-taking phase: each player contributes one card; highest card
/// considering trump wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrickPhase {
    pub lead_suit_required: bool,
    pub trump_suit: Option<Suit>,
    pub high_card_wins: bool,
    /// Suit that cannot be led until first discarded into a trick.
    pub breaking_suit: Option<Suit>,
}

/// Poker-style betting round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BettingPhase {
    pub min_bet: i32,
    pub max_raises: u32,
}

/// Bluffing phase: face-down plays with a declared rank that opponents may
/// challenge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimPhase {
    pub min_cards: u8,
    pub max_cards: u8,
    /// Claimed rank must cycle A, 2, 3 … K, A.
    pub sequential_rank: bool,
    pub allow_challenge: bool,
    /// Loser of a challenge takes the discard pile.
    pub pile_penalty: bool,
}

/// Spades-style contract declaration before trick play.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiddingPhase {
    pub min_bid: u8,
    pub max_bid: u8,
    pub allow_nil: bool,
}

impl Default for BiddingPhase {
    fn default() -> Self {
        BiddingPhase {
            min_bid: 0,
            max_bid: 13,
            allow_nil: true,
        }
    }
}

/// One stage of a single player's turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Phase {
    Draw(DrawPhase),
    Play(PlayPhase),
    Discard(DiscardPhase),
    Trick(TrickPhase),
    Betting(BettingPhase),
    Claim(ClaimPhase),
    Bidding(BiddingPhase),
}

impl Phase {
    /// Bytecode type tag.
    pub fn type_tag(&self) -> u8 {
        match self {
            Phase::Draw(_) => 1,
            Phase::Play(_) => 2,
            Phase::Discard(_) => 3,
            Phase::Trick(_) => 4,
            Phase::Betting(_) => 5,
            Phase::Claim(_) => 6,
            Phase::Bidding(_) => 7,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Phase::Draw(_) => "draw",
            Phase::Play(_) => "play",
            Phase::Discard(_) => "discard",
            Phase::Trick(_) => "trick",
            Phase::Betting(_) => "betting",
            Phase::Claim(_) => "claim",
            Phase::Bidding(_) => "bidding",
        }
    }
}

/// Ordered phases within a turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnStructure {
    pub phases: Vec<Phase>,
    pub is_trick_based: bool,
    pub tricks_per_hand: Option<u8>,
}

impl TurnStructure {
    pub fn new(phases: Vec<Phase>) -> Self {
        TurnStructure {
            phases,
            is_trick_based: false,
            tricks_per_hand: None,
        }
    }

    pub fn trick_based(phases: Vec<Phase>, tricks_per_hand: u8) -> Self {
        TurnStructure {
            phases,
            is_trick_based: true,
            tricks_per_hand: Some(tricks_per_hand),
        }
    }

    pub fn has_phase_kind(&self, tag: u8) -> bool {
        self.phases.iter().any(|p| p.type_tag() == tag)
    }
}

/// Scoring for bid contracts (bidding games).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractScoring {
    pub points_per_bid_trick: i32,
    pub overtrick_points: i32,
    pub nil_bonus: i32,
    pub undertrick_penalty: i32,
}

impl Default for ContractScoring {
    fn default() -> Self {
        ContractScoring {
            points_per_bid_trick: 10,
            overtrick_points: 1,
            nil_bonus: 100,
            undertrick_penalty: 10,
        }
    }
}

/// Complete game specification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Genome {
    pub schema_version: String,
    pub id: String,
    pub generation: u32,
    pub setup: SetupRules,
    pub turn_structure: TurnStructure,
    pub special_effects: Vec<SpecialEffect>,
    pub win_conditions: Vec<WinCondition>,
    pub card_scoring: Vec<CardScoringRule>,
    pub hand_evaluation: Option<HandEvaluation>,
    pub contract_scoring: Option<ContractScoring>,
    pub max_turns: u32,
    pub min_turns: u32,
    pub player_count: u8,
    pub team_mode: bool,
    pub teams: Vec<Vec<u8>>,
}

impl Genome {
    /// Base genome with sane defaults; callers fill in phases and win
    /// conditions.
    pub fn new(id: &str, player_count: u8, setup: SetupRules, turns: TurnStructure) -> Self {
        Genome {
            schema_version: SCHEMA_VERSION.to_string(),
            id: id.to_string(),
            generation: 0,
            setup,
            turn_structure: turns,
            special_effects: Vec::new(),
            win_conditions: Vec::new(),
            card_scoring: Vec::new(),
            hand_evaluation: None,
            contract_scoring: None,
            max_turns: 100,
            min_turns: 10,
            player_count,
            team_mode: false,
            teams: Vec::new(),
        }
    }

    pub fn has_betting_phase(&self) -> bool {
        self.turn_structure.has_phase_kind(5)
    }

    pub fn has_trick_phase(&self) -> bool {
        self.turn_structure.has_phase_kind(4)
    }

    pub fn has_claim_phase(&self) -> bool {
        self.turn_structure.has_phase_kind(6)
    }

    pub fn has_bidding_phase(&self) -> bool {
        self.turn_structure.has_phase_kind(7)
    }

    /// Structural invariants of the genome model. Violations are reported
    /// by variant, not by panic.
    pub fn check_invariants(&self) -> Result<(), GenomeInvariant> {
        if !(2..=6).contains(&self.player_count) {
            return Err(GenomeInvariant::PlayerCount(self.player_count));
        }
        let dealt = self.setup.cards_per_player as u32 * self.player_count as u32
            + self.setup.initial_discard_count as u32;
        if dealt > 52 {
            return Err(GenomeInvariant::TooManyCards { dealt });
        }
        if self.has_betting_phase() && self.setup.starting_chips <= 0 {
            return Err(GenomeInvariant::BettingWithoutChips);
        }
        if self.setup.starting_chips > 0 && !self.has_betting_phase() {
            return Err(GenomeInvariant::ChipsWithoutBetting);
        }
        let needs_hand_eval = self
            .win_conditions
            .iter()
            .any(|wc| wc.kind == WinKind::BestHand);
        if needs_hand_eval && self.hand_evaluation.is_none() {
            return Err(GenomeInvariant::BestHandWithoutEvaluation);
        }
        if self.setup.tableau_mode == TableauMode::War && self.player_count != 2 {
            return Err(GenomeInvariant::WarNeedsTwoPlayers(self.player_count));
        }
        if self.team_mode {
            let mut seen: Vec<u8> = self.teams.iter().flatten().copied().collect();
            seen.sort_unstable();
            let expected: Vec<u8> = (0..self.player_count).collect();
            if seen != expected {
                return Err(GenomeInvariant::TeamsNotAPartition);
            }
        }
        Ok(())
    }
}

/// Structural invariant violations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenomeInvariant {
    #[error("player_count {0} outside 2-6")]
    PlayerCount(u8),
    #[error("setup deals {dealt} cards but the deck has 52")]
    TooManyCards { dealt: u32 },
    #[error("BettingPhase present but starting_chips is 0")]
    BettingWithoutChips,
    #[error("starting_chips set without any BettingPhase")]
    ChipsWithoutBetting,
    #[error("best_hand win condition without hand_evaluation")]
    BestHandWithoutEvaluation,
    #[error("war tableau mode requires exactly 2 players, got {0}")]
    WarNeedsTwoPlayers(u8),
    #[error("team assignments do not partition the players")]
    TeamsNotAPartition,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_genome() -> Genome {
        let mut g = Genome::new(
            "test",
            2,
            SetupRules::new(5),
            TurnStructure::new(vec![Phase::Play(PlayPhase {
                target: Location::Discard,
                valid_play_condition: None,
                min_cards: 1,
                max_cards: 1,
                mandatory: true,
                pass_if_unable: true,
            })]),
        );
        g.win_conditions.push(WinCondition::new(WinKind::EmptyHand));
        g
    }

    #[test]
    fn test_minimal_genome_passes_invariants() {
        assert!(minimal_genome().check_invariants().is_ok());
    }

    #[test]
    fn test_too_many_cards_rejected() {
        let mut g = minimal_genome();
        g.setup.cards_per_player = 27;
        assert_eq!(
            g.check_invariants(),
            Err(GenomeInvariant::TooManyCards { dealt: 54 })
        );
    }

    #[test]
    fn test_chips_require_betting_phase() {
        let mut g = minimal_genome();
        g.setup.starting_chips = 500;
        assert_eq!(
            g.check_invariants(),
            Err(GenomeInvariant::ChipsWithoutBetting)
        );
    }

    #[test]
    fn test_war_mode_requires_two_players() {
        let mut g = minimal_genome();
        g.player_count = 3;
        g.setup.tableau_mode = TableauMode::War;
        assert_eq!(
            g.check_invariants(),
            Err(GenomeInvariant::WarNeedsTwoPlayers(3))
        );
    }

    #[test]
    fn test_team_partition_checked() {
        let mut g = minimal_genome();
        g.player_count = 4;
        g.team_mode = true;
        g.teams = vec![vec![0, 2], vec![1, 2]];
        assert_eq!(
            g.check_invariants(),
            Err(GenomeInvariant::TeamsNotAPartition)
        );
        g.teams = vec![vec![0, 2], vec![1, 3]];
        assert!(g.check_invariants().is_ok());
    }
}
