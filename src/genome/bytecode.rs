//! Bytecode codec: compiles a genome to a compact, versioned binary blob and
//! decodes it back. The codec is total and deterministic; the same genome
//! always produces byte-identical output, and `decode(encode(g)) == g`.
//!
//! Layout (all integers big-endian):
//!
//! * 53-byte fixed header: format version (2), schema semver, id hash
//!   (FNV-1a 64), player_count, max_turns, min_turns, seven section offsets,
//!   tableau mode, sequence direction, team flag, team count.
//! * identity block: length-prefixed genome id + generation (the header only
//!   carries the id hash, so the id itself rides here to keep the codec
//!   invertible).
//! * sections at the recorded offsets: setup, turn structure, win
//!   conditions, contract scoring, card scoring, hand evaluation, team data.

use thiserror::Error;

use crate::cards::{Rank, Suit};
use crate::genome::conditions::{CompareOp, Condition, ConditionKind, ConditionRef, Logic};
use crate::genome::schema::*;

/// Current bytecode format version.
pub const FORMAT_VERSION: u8 = 2;
/// Size of the fixed header in bytes.
pub const HEADER_LEN: usize = 53;

const OP_AND: u8 = 40;
const OP_OR: u8 = 41;
const EFFECT_HEADER: u8 = 60;
const NONE_BYTE: u8 = 255;

/// Codec failures. Reported by variant, never by panic.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BytecodeError {
    #[error("malformed bytecode at offset {offset}: {reason}")]
    Malformed { offset: usize, reason: String },
    #[error("unsupported bytecode version {found} (expected {FORMAT_VERSION})")]
    UnsupportedVersion { found: u8 },
    #[error("unknown opcode {opcode} at offset {offset}")]
    UnknownOpcode { opcode: u8, offset: usize },
}

/// FNV-1a 64-bit hash of the genome id; stable across runs and platforms.
pub fn id_hash(id: &str) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in id.as_bytes() {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    fn new() -> Self {
        Writer { buf: Vec::new() }
    }

    fn u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn u16(&mut self, v: u16) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    fn u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    fn i32(&mut self, v: i32) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    fn u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    fn bytes(&mut self, v: &[u8]) {
        self.buf.extend_from_slice(v);
    }

    fn opt_i32(&mut self, v: Option<i32>) {
        match v {
            Some(x) => {
                self.u8(1);
                self.i32(x);
            }
            None => {
                self.u8(0);
                self.i32(0);
            }
        }
    }
}

fn suit_byte(suit: Option<Suit>) -> u8 {
    suit.map_or(NONE_BYTE, Suit::code)
}

fn rank_byte(rank: Option<Rank>) -> u8 {
    rank.map_or(NONE_BYTE, Rank::ordinal)
}

/// Compile a genome to its bytecode blob.
pub fn encode(genome: &Genome) -> Vec<u8> {
    let identity = encode_identity(genome);
    let effects = encode_effects(&genome.special_effects);
    let setup = encode_setup(&genome.setup);
    let turns = encode_turn_structure(&genome.turn_structure);
    let wins = encode_win_conditions(&genome.win_conditions);
    let contract = encode_contract(genome.contract_scoring.as_ref());
    let card_scoring = encode_card_scoring(&genome.card_scoring);
    let hand_eval = encode_hand_evaluation(genome.hand_evaluation.as_ref());
    let teams = encode_teams(&genome.teams);

    let mut offset = HEADER_LEN + identity.len() + effects.len();
    let mut offsets = [0u32; 7];
    for (slot, section) in offsets.iter_mut().zip([
        setup.len(),
        turns.len(),
        wins.len(),
        contract.len(),
        card_scoring.len(),
        hand_eval.len(),
        teams.len(),
    ]) {
        *slot = offset as u32;
        offset += section;
    }

    let (major, minor, patch) = parse_semver(&genome.schema_version);

    let mut w = Writer::new();
    w.u8(FORMAT_VERSION);
    w.u8(major);
    w.u8(minor);
    w.u8(patch);
    w.u64(id_hash(&genome.id));
    w.u8(genome.player_count);
    w.u32(genome.max_turns);
    w.u32(genome.min_turns);
    for off in offsets {
        w.u32(off);
    }
    w.u8(genome.setup.tableau_mode.code());
    w.u8(genome.setup.sequence_direction.code());
    w.u8(u8::from(genome.team_mode));
    w.u8(genome.teams.len() as u8);
    debug_assert_eq!(w.buf.len(), HEADER_LEN);

    w.bytes(&identity);
    w.bytes(&effects);
    w.bytes(&setup);
    w.bytes(&turns);
    w.bytes(&wins);
    w.bytes(&contract);
    w.bytes(&card_scoring);
    w.bytes(&hand_eval);
    w.bytes(&teams);
    w.buf
}

fn parse_semver(version: &str) -> (u8, u8, u8) {
    let mut parts = version.split('.').map(|p| p.parse::<u8>().unwrap_or(0));
    (
        parts.next().unwrap_or(FORMAT_VERSION),
        parts.next().unwrap_or(0),
        parts.next().unwrap_or(0),
    )
}

fn encode_identity(genome: &Genome) -> Vec<u8> {
    let mut w = Writer::new();
    let id = genome.id.as_bytes();
    w.u16(id.len() as u16);
    w.bytes(id);
    w.u32(genome.generation);
    w.buf
}

fn encode_effects(effects: &[SpecialEffect]) -> Vec<u8> {
    if effects.is_empty() {
        return Vec::new();
    }
    let mut w = Writer::new();
    w.u8(EFFECT_HEADER);
    w.u8(effects.len() as u8);
    for effect in effects {
        w.u8(effect.trigger_rank.ordinal());
        w.u8(effect.kind.code());
        w.u8(effect.target.code());
        w.u8(effect.value);
    }
    w.buf
}

fn encode_setup(setup: &SetupRules) -> Vec<u8> {
    let mut w = Writer::new();
    w.i32(setup.cards_per_player as i32);
    w.i32(setup.initial_discard_count as i32);
    w.i32(setup.starting_chips);
    w.u8(setup.wild_cards.len() as u8);
    for rank in &setup.wild_cards {
        w.u8(rank.ordinal());
    }
    w.u8(setup.hand_visibility.code());
    w.u8(setup.deck_visibility.code());
    w.u8(setup.discard_visibility.code());
    w.u8(setup.tableau_visibility.code());
    w.u8(suit_byte(setup.trump_suit));
    w.u8(u8::from(setup.rotate_trump));
    w.u8(u8::from(setup.random_trump));
    w.u8(u8::from(setup.custom_printed_deck));
    w.u8(u8::from(setup.sequence_wrap));
    w.u8(setup.deck_empty_action.code());
    w.u8(u8::from(setup.keep_top_discard));
    w.u8(setup.tie_breaker.code());
    w.buf
}

fn encode_condition(w: &mut Writer, cond: &Condition) {
    match cond {
        Condition::Simple {
            kind,
            op,
            value,
            reference,
        } => {
            w.u8(kind.opcode());
            w.u8(op.code());
            w.i32(*value);
            w.u8(reference.code());
        }
        Condition::Compound { logic, children } => {
            w.u8(match logic {
                Logic::And => OP_AND,
                Logic::Or => OP_OR,
            });
            w.u32(children.len() as u32);
            for child in children {
                encode_condition(w, child);
            }
        }
    }
}

fn encode_opt_condition(w: &mut Writer, cond: Option<&Condition>) {
    match cond {
        Some(c) => {
            w.u8(1);
            encode_condition(w, c);
        }
        None => w.u8(0),
    }
}

fn encode_turn_structure(turns: &TurnStructure) -> Vec<u8> {
    let mut w = Writer::new();
    w.u8(u8::from(turns.is_trick_based));
    w.u8(turns.tricks_per_hand.unwrap_or(0));
    w.u32(turns.phases.len() as u32);
    for phase in &turns.phases {
        w.u8(phase.type_tag());
        match phase {
            Phase::Draw(p) => {
                w.u8(p.source.code());
                w.u32(p.count);
                w.u8(u8::from(p.mandatory));
                encode_opt_condition(&mut w, p.condition.as_ref());
            }
            Phase::Play(p) => {
                w.u8(p.target.code());
                w.u8(p.min_cards);
                w.u8(p.max_cards);
                w.u8(u8::from(p.mandatory));
                w.u8(u8::from(p.pass_if_unable));
                let mut cw = Writer::new();
                encode_opt_condition(&mut cw, p.valid_play_condition.as_ref());
                w.u32(cw.buf.len() as u32);
                w.bytes(&cw.buf);
            }
            Phase::Discard(p) => {
                w.u8(p.target.code());
                w.u32(p.count);
                w.u8(u8::from(p.mandatory));
                encode_opt_condition(&mut w, p.matching_condition.as_ref());
            }
            Phase::Trick(p) => {
                w.u8(u8::from(p.lead_suit_required));
                w.u8(suit_byte(p.trump_suit));
                w.u8(u8::from(p.high_card_wins));
                w.u8(suit_byte(p.breaking_suit));
            }
            Phase::Betting(p) => {
                w.u32(p.min_bet as u32);
                w.u32(p.max_raises);
            }
            Phase::Claim(p) => {
                w.u8(p.min_cards);
                w.u8(p.max_cards);
                w.u8(u8::from(p.sequential_rank));
                w.u8(u8::from(p.allow_challenge));
                w.u8(u8::from(p.pile_penalty));
                w.bytes(&[0; 5]);
            }
            Phase::Bidding(p) => {
                w.u8(p.min_bid);
                w.u8(p.max_bid);
                w.u8(u8::from(p.allow_nil));
            }
        }
    }
    w.buf
}

fn encode_win_conditions(conditions: &[WinCondition]) -> Vec<u8> {
    let mut w = Writer::new();
    w.u32(conditions.len() as u32);
    for wc in conditions {
        w.u8(wc.kind.code());
        w.i32(wc.threshold.unwrap_or(0));
        w.u8(u8::from(wc.threshold.is_some()));
        w.u8(wc.comparison.code());
        w.u8(wc.trigger.code());
        w.u8(wc.required_hand_size.unwrap_or(NONE_BYTE));
    }
    w.buf
}

fn encode_contract(contract: Option<&ContractScoring>) -> Vec<u8> {
    let mut w = Writer::new();
    match contract {
        Some(c) => {
            w.u8(1);
            w.i32(c.points_per_bid_trick);
            w.i32(c.overtrick_points);
            w.i32(c.nil_bonus);
            w.i32(c.undertrick_penalty);
        }
        None => w.u8(0),
    }
    w.buf
}

fn encode_card_scoring(rules: &[CardScoringRule]) -> Vec<u8> {
    let mut w = Writer::new();
    w.u32(rules.len() as u32);
    for rule in rules {
        w.u8(suit_byte(rule.condition.suit));
        w.u8(rank_byte(rule.condition.rank));
        w.i32(rule.points);
        w.u8(rule.trigger.code());
    }
    w.buf
}

fn encode_hand_evaluation(eval: Option<&HandEvaluation>) -> Vec<u8> {
    let mut w = Writer::new();
    let Some(eval) = eval else {
        w.u8(0);
        return w.buf;
    };
    w.u8(1);
    w.u8(eval.method.code());
    w.u8(eval.patterns.len() as u8);
    for pattern in &eval.patterns {
        let name = pattern.name.as_bytes();
        w.u8(name.len() as u8);
        w.bytes(name);
        w.u8(pattern.priority);
        w.u8(pattern.required_count.unwrap_or(NONE_BYTE));
        w.u8(pattern.same_suit_count.unwrap_or(NONE_BYTE));
        match &pattern.same_rank_groups {
            Some(groups) => {
                w.u8(groups.len() as u8);
                w.bytes(groups);
            }
            None => w.u8(0),
        }
        w.u8(pattern.sequence_length.unwrap_or(NONE_BYTE));
        w.u8(u8::from(pattern.sequence_wrap));
        match &pattern.required_ranks {
            Some(ranks) => {
                w.u8(ranks.len() as u8);
                for rank in ranks {
                    w.u8(rank.ordinal());
                }
            }
            None => w.u8(0),
        }
    }
    w.u8(eval.card_values.len() as u8);
    for cv in &eval.card_values {
        w.u8(cv.rank.ordinal());
        w.i32(cv.value);
        w.opt_i32(cv.alternate_value);
    }
    w.opt_i32(eval.target_value);
    w.opt_i32(eval.bust_threshold);
    w.buf
}

fn encode_teams(teams: &[Vec<u8>]) -> Vec<u8> {
    let mut w = Writer::new();
    w.u8(teams.len() as u8);
    for team in teams {
        w.u8(team.len() as u8);
        w.bytes(team);
    }
    w.buf
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Reader { data, pos: 0 }
    }

    fn malformed(&self, reason: &str) -> BytecodeError {
        BytecodeError::Malformed {
            offset: self.pos,
            reason: reason.to_string(),
        }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], BytecodeError> {
        if self.pos + n > self.data.len() {
            return Err(self.malformed("truncated"));
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn u8(&mut self) -> Result<u8, BytecodeError> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> Result<u16, BytecodeError> {
        Ok(u16::from_be_bytes(self.take(2)?.try_into().unwrap()))
    }

    fn u32(&mut self) -> Result<u32, BytecodeError> {
        Ok(u32::from_be_bytes(self.take(4)?.try_into().unwrap()))
    }

    fn i32(&mut self) -> Result<i32, BytecodeError> {
        Ok(i32::from_be_bytes(self.take(4)?.try_into().unwrap()))
    }

    fn u64(&mut self) -> Result<u64, BytecodeError> {
        Ok(u64::from_be_bytes(self.take(8)?.try_into().unwrap()))
    }

    fn bool(&mut self) -> Result<bool, BytecodeError> {
        Ok(self.u8()? != 0)
    }

    fn opt_i32(&mut self) -> Result<Option<i32>, BytecodeError> {
        let present = self.bool()?;
        let value = self.i32()?;
        Ok(present.then_some(value))
    }

    fn opt_suit(&mut self) -> Result<Option<Suit>, BytecodeError> {
        let code = self.u8()?;
        if code == NONE_BYTE {
            return Ok(None);
        }
        Suit::from_code(code)
            .map(Some)
            .ok_or_else(|| self.malformed("bad suit code"))
    }

    fn rank(&mut self) -> Result<Rank, BytecodeError> {
        let code = self.u8()?;
        Rank::from_ordinal(code).ok_or_else(|| self.malformed("bad rank ordinal"))
    }
}

/// Decode a bytecode blob back into a genome.
pub fn decode(data: &[u8]) -> Result<Genome, BytecodeError> {
    let mut r = Reader::new(data);
    let version = r.u8()?;
    if version != FORMAT_VERSION {
        return Err(BytecodeError::UnsupportedVersion { found: version });
    }
    let (major, minor, patch) = (r.u8()?, r.u8()?, r.u8()?);
    let expected_hash = r.u64()?;
    let player_count = r.u8()?;
    let max_turns = r.u32()?;
    let min_turns = r.u32()?;
    let mut offsets = [0u32; 7];
    for slot in &mut offsets {
        *slot = r.u32()?;
    }
    let tableau_mode = TableauMode::from_code(r.u8()?)
        .ok_or_else(|| r.malformed("bad tableau mode"))?;
    let sequence_direction = SequenceDirection::from_code(r.u8()?)
        .ok_or_else(|| r.malformed("bad sequence direction"))?;
    let team_mode = r.bool()?;
    let team_count = r.u8()?;

    // Identity block sits between the header and the first section.
    let id_len = r.u16()? as usize;
    let id = std::str::from_utf8(r.take(id_len)?)
        .map_err(|_| BytecodeError::Malformed {
            offset: HEADER_LEN,
            reason: "genome id is not utf-8".to_string(),
        })?
        .to_string();
    let generation = r.u32()?;
    if id_hash(&id) != expected_hash {
        return Err(BytecodeError::Malformed {
            offset: 4,
            reason: "id hash mismatch".to_string(),
        });
    }

    for (i, off) in offsets.iter().enumerate() {
        if *off as usize > data.len() {
            return Err(BytecodeError::Malformed {
                offset: 21 + i * 4,
                reason: format!("section offset {} beyond blob", off),
            });
        }
    }

    let special_effects = if r.pos < offsets[0] as usize {
        decode_effects(&mut r)?
    } else {
        Vec::new()
    };

    r.pos = offsets[0] as usize;
    let mut setup = decode_setup(&mut r)?;
    setup.tableau_mode = tableau_mode;
    setup.sequence_direction = sequence_direction;

    r.pos = offsets[1] as usize;
    let turn_structure = decode_turn_structure(&mut r)?;

    r.pos = offsets[2] as usize;
    let win_conditions = decode_win_conditions(&mut r)?;

    r.pos = offsets[3] as usize;
    let contract_scoring = decode_contract(&mut r)?;

    r.pos = offsets[4] as usize;
    let card_scoring = decode_card_scoring(&mut r)?;

    r.pos = offsets[5] as usize;
    let hand_evaluation = decode_hand_evaluation(&mut r)?;

    r.pos = offsets[6] as usize;
    let teams = decode_teams(&mut r)?;
    if teams.len() != team_count as usize {
        return Err(r.malformed("team count mismatch"));
    }

    Ok(Genome {
        schema_version: format!("{}.{}.{}", major, minor, patch),
        id,
        generation,
        setup,
        turn_structure,
        special_effects,
        win_conditions,
        card_scoring,
        hand_evaluation,
        contract_scoring,
        max_turns,
        min_turns,
        player_count,
        team_mode,
        teams,
    })
}

fn decode_effects(r: &mut Reader) -> Result<Vec<SpecialEffect>, BytecodeError> {
    let header_offset = r.pos;
    let header = r.u8()?;
    if header != EFFECT_HEADER {
        return Err(BytecodeError::UnknownOpcode {
            opcode: header,
            offset: header_offset,
        });
    }
    let count = r.u8()? as usize;
    let mut effects = Vec::with_capacity(count);
    for _ in 0..count {
        let trigger_rank = r.rank()?;
        let kind =
            EffectKind::from_code(r.u8()?).ok_or_else(|| r.malformed("bad effect kind"))?;
        let target =
            TargetSelector::from_code(r.u8()?).ok_or_else(|| r.malformed("bad target"))?;
        let value = r.u8()?;
        effects.push(SpecialEffect {
            trigger_rank,
            kind,
            target,
            value,
        });
    }
    Ok(effects)
}

fn decode_setup(r: &mut Reader) -> Result<SetupRules, BytecodeError> {
    let cards_per_player = r.i32()? as u8;
    let initial_discard_count = r.i32()? as u8;
    let starting_chips = r.i32()?;
    let wild_count = r.u8()? as usize;
    let mut wild_cards = Vec::with_capacity(wild_count);
    for _ in 0..wild_count {
        wild_cards.push(r.rank()?);
    }
    let hand_visibility =
        Visibility::from_code(r.u8()?).ok_or_else(|| r.malformed("bad visibility"))?;
    let deck_visibility =
        Visibility::from_code(r.u8()?).ok_or_else(|| r.malformed("bad visibility"))?;
    let discard_visibility =
        Visibility::from_code(r.u8()?).ok_or_else(|| r.malformed("bad visibility"))?;
    let tableau_visibility =
        Visibility::from_code(r.u8()?).ok_or_else(|| r.malformed("bad visibility"))?;
    let trump_suit = r.opt_suit()?;
    let rotate_trump = r.bool()?;
    let random_trump = r.bool()?;
    let custom_printed_deck = r.bool()?;
    let sequence_wrap = r.bool()?;
    let deck_empty_action =
        DeckEmptyAction::from_code(r.u8()?).ok_or_else(|| r.malformed("bad deck-empty action"))?;
    let keep_top_discard = r.bool()?;
    let tie_breaker =
        TieBreaker::from_code(r.u8()?).ok_or_else(|| r.malformed("bad tie breaker"))?;

    Ok(SetupRules {
        cards_per_player,
        initial_discard_count,
        starting_chips,
        wild_cards,
        hand_visibility,
        deck_visibility,
        discard_visibility,
        tableau_visibility,
        trump_suit,
        rotate_trump,
        random_trump,
        custom_printed_deck,
        tableau_mode: TableauMode::None,
        sequence_direction: SequenceDirection::Both,
        sequence_wrap,
        deck_empty_action,
        keep_top_discard,
        tie_breaker,
    })
}

fn decode_condition(r: &mut Reader) -> Result<Condition, BytecodeError> {
    let opcode_offset = r.pos;
    let opcode = r.u8()?;
    match opcode {
        OP_AND | OP_OR => {
            let logic = if opcode == OP_AND { Logic::And } else { Logic::Or };
            let count = r.u32()? as usize;
            if count > r.data.len() {
                return Err(r.malformed("compound condition count overflows blob"));
            }
            let mut children = Vec::with_capacity(count);
            for _ in 0..count {
                children.push(decode_condition(r)?);
            }
            Ok(Condition::Compound { logic, children })
        }
        _ => {
            let kind = ConditionKind::from_opcode(opcode).ok_or(BytecodeError::UnknownOpcode {
                opcode,
                offset: opcode_offset,
            })?;
            let op = CompareOp::from_code(r.u8()?).ok_or_else(|| r.malformed("bad operator"))?;
            let value = r.i32()?;
            let reference =
                ConditionRef::from_code(r.u8()?).ok_or_else(|| r.malformed("bad reference"))?;
            Ok(Condition::Simple {
                kind,
                op,
                value,
                reference,
            })
        }
    }
}

fn decode_opt_condition(r: &mut Reader) -> Result<Option<Condition>, BytecodeError> {
    if r.bool()? {
        Ok(Some(decode_condition(r)?))
    } else {
        Ok(None)
    }
}

fn decode_turn_structure(r: &mut Reader) -> Result<TurnStructure, BytecodeError> {
    let is_trick_based = r.bool()?;
    let tricks_per_hand = match r.u8()? {
        0 => None,
        n => Some(n),
    };
    let phase_count = r.u32()? as usize;
    if phase_count > r.data.len() {
        return Err(r.malformed("phase count overflows blob"));
    }
    let mut phases = Vec::with_capacity(phase_count);
    for _ in 0..phase_count {
        let tag_offset = r.pos;
        let tag = r.u8()?;
        let phase = match tag {
            1 => Phase::Draw(DrawPhase {
                source: Location::from_code(r.u8()?)
                    .ok_or_else(|| r.malformed("bad draw source"))?,
                count: r.u32()?,
                mandatory: r.bool()?,
                condition: decode_opt_condition(r)?,
            }),
            2 => {
                let target =
                    Location::from_code(r.u8()?).ok_or_else(|| r.malformed("bad play target"))?;
                let min_cards = r.u8()?;
                let max_cards = r.u8()?;
                let mandatory = r.bool()?;
                let pass_if_unable = r.bool()?;
                let cond_len = r.u32()? as usize;
                let cond_end = r.pos + cond_len;
                if cond_end > r.data.len() {
                    return Err(r.malformed("condition length overflows blob"));
                }
                let valid_play_condition = decode_opt_condition(r)?;
                if r.pos != cond_end {
                    return Err(r.malformed("condition length mismatch"));
                }
                Phase::Play(PlayPhase {
                    target,
                    valid_play_condition,
                    min_cards,
                    max_cards,
                    mandatory,
                    pass_if_unable,
                })
            }
            3 => Phase::Discard(DiscardPhase {
                target: Location::from_code(r.u8()?)
                    .ok_or_else(|| r.malformed("bad discard target"))?,
                count: r.u32()?,
                mandatory: r.bool()?,
                matching_condition: decode_opt_condition(r)?,
            }),
            4 => Phase::Trick(TrickPhase {
                lead_suit_required: r.bool()?,
                trump_suit: r.opt_suit()?,
                high_card_wins: r.bool()?,
                breaking_suit: r.opt_suit()?,
            }),
            5 => Phase::Betting(BettingPhase {
                min_bet: r.u32()? as i32,
                max_raises: r.u32()?,
            }),
            6 => {
                let phase = ClaimPhase {
                    min_cards: r.u8()?,
                    max_cards: r.u8()?,
                    sequential_rank: r.bool()?,
                    allow_challenge: r.bool()?,
                    pile_penalty: r.bool()?,
                };
                r.take(5)?; // reserved
                Phase::Claim(phase)
            }
            7 => Phase::Bidding(BiddingPhase {
                min_bid: r.u8()?,
                max_bid: r.u8()?,
                allow_nil: r.bool()?,
            }),
            _ => {
                return Err(BytecodeError::Malformed {
                    offset: tag_offset,
                    reason: format!("unknown phase type tag {}", tag),
                })
            }
        };
        phases.push(phase);
    }
    Ok(TurnStructure {
        phases,
        is_trick_based,
        tricks_per_hand,
    })
}

fn decode_win_conditions(r: &mut Reader) -> Result<Vec<WinCondition>, BytecodeError> {
    let count = r.u32()? as usize;
    if count > r.data.len() {
        return Err(r.malformed("win condition count overflows blob"));
    }
    let mut conditions = Vec::with_capacity(count);
    for _ in 0..count {
        let kind = WinKind::from_code(r.u8()?).ok_or_else(|| r.malformed("bad win kind"))?;
        let raw_threshold = r.i32()?;
        let has_threshold = r.bool()?;
        let comparison =
            WinComparison::from_code(r.u8()?).ok_or_else(|| r.malformed("bad comparison"))?;
        let trigger = TriggerMode::from_code(r.u8()?).ok_or_else(|| r.malformed("bad trigger"))?;
        let required_hand_size = match r.u8()? {
            NONE_BYTE => None,
            n => Some(n),
        };
        conditions.push(WinCondition {
            kind,
            threshold: has_threshold.then_some(raw_threshold),
            comparison,
            trigger,
            required_hand_size,
        });
    }
    Ok(conditions)
}

fn decode_contract(r: &mut Reader) -> Result<Option<ContractScoring>, BytecodeError> {
    if !r.bool()? {
        return Ok(None);
    }
    Ok(Some(ContractScoring {
        points_per_bid_trick: r.i32()?,
        overtrick_points: r.i32()?,
        nil_bonus: r.i32()?,
        undertrick_penalty: r.i32()?,
    }))
}

fn decode_card_scoring(r: &mut Reader) -> Result<Vec<CardScoringRule>, BytecodeError> {
    let count = r.u32()? as usize;
    if count > r.data.len() {
        return Err(r.malformed("card scoring count overflows blob"));
    }
    let mut rules = Vec::with_capacity(count);
    for _ in 0..count {
        let suit = r.opt_suit()?;
        let rank = match r.u8()? {
            NONE_BYTE => None,
            code => Some(Rank::from_ordinal(code).ok_or_else(|| r.malformed("bad rank"))?),
        };
        let points = r.i32()?;
        let trigger =
            ScoringTrigger::from_code(r.u8()?).ok_or_else(|| r.malformed("bad trigger"))?;
        rules.push(CardScoringRule {
            condition: CardCondition { suit, rank },
            points,
            trigger,
        });
    }
    Ok(rules)
}

fn decode_hand_evaluation(r: &mut Reader) -> Result<Option<HandEvaluation>, BytecodeError> {
    if !r.bool()? {
        return Ok(None);
    }
    let method =
        HandEvalMethod::from_code(r.u8()?).ok_or_else(|| r.malformed("bad eval method"))?;
    let pattern_count = r.u8()? as usize;
    let mut patterns = Vec::with_capacity(pattern_count);
    for _ in 0..pattern_count {
        let name_len = r.u8()? as usize;
        let name = std::str::from_utf8(r.take(name_len)?)
            .map_err(|_| BytecodeError::Malformed {
                offset: 0,
                reason: "pattern name is not utf-8".to_string(),
            })?
            .to_string();
        let priority = r.u8()?;
        let required_count = match r.u8()? {
            NONE_BYTE => None,
            n => Some(n),
        };
        let same_suit_count = match r.u8()? {
            NONE_BYTE => None,
            n => Some(n),
        };
        let group_count = r.u8()? as usize;
        let same_rank_groups = if group_count == 0 {
            None
        } else {
            Some(r.take(group_count)?.to_vec())
        };
        let sequence_length = match r.u8()? {
            NONE_BYTE => None,
            n => Some(n),
        };
        let sequence_wrap = r.bool()?;
        let rank_count = r.u8()? as usize;
        let required_ranks = if rank_count == 0 {
            None
        } else {
            let mut ranks = Vec::with_capacity(rank_count);
            for _ in 0..rank_count {
                ranks.push(r.rank()?);
            }
            Some(ranks)
        };
        patterns.push(HandPattern {
            name,
            priority,
            required_count,
            same_suit_count,
            same_rank_groups,
            sequence_length,
            sequence_wrap,
            required_ranks,
        });
    }
    let value_count = r.u8()? as usize;
    let mut card_values = Vec::with_capacity(value_count);
    for _ in 0..value_count {
        card_values.push(CardValue {
            rank: r.rank()?,
            value: r.i32()?,
            alternate_value: r.opt_i32()?,
        });
    }
    let target_value = r.opt_i32()?;
    let bust_threshold = r.opt_i32()?;
    Ok(Some(HandEvaluation {
        method,
        patterns,
        card_values,
        target_value,
        bust_threshold,
    }))
}

fn decode_teams(r: &mut Reader) -> Result<Vec<Vec<u8>>, BytecodeError> {
    let team_count = r.u8()? as usize;
    let mut teams = Vec::with_capacity(team_count);
    for _ in 0..team_count {
        let size = r.u8()? as usize;
        teams.push(r.take(size)?.to_vec());
    }
    Ok(teams)
}

/// Validate a blob by decoding and re-encoding it; the codec is symmetric so
/// the bytes must match exactly.
pub fn validate(data: &[u8]) -> Result<(), BytecodeError> {
    let genome = decode(data)?;
    let reencoded = encode(&genome);
    if reencoded != data {
        return Err(BytecodeError::Malformed {
            offset: 0,
            reason: "re-encoded blob differs from input".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genome::examples;
    use assert_matches::assert_matches;

    #[test]
    fn test_round_trip_all_seed_genomes() {
        for genome in examples::seed_genomes() {
            let blob = encode(&genome);
            let decoded = decode(&blob).expect("decode");
            assert_eq!(decoded, genome, "round trip failed for {}", genome.id);
            validate(&blob).expect("validate");
        }
    }

    #[test]
    fn test_header_is_53_bytes_and_version_2() {
        let genome = examples::war();
        let blob = encode(&genome);
        assert!(blob.len() > HEADER_LEN);
        assert_eq!(blob[0], FORMAT_VERSION);
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let genome = examples::hearts();
        assert_eq!(encode(&genome), encode(&genome));
    }

    #[test]
    fn test_sequence_wrap_rides_the_setup_section() {
        let mut genome = examples::royal_climb();
        genome.setup.sequence_wrap = true;
        let decoded = decode(&encode(&genome)).expect("decode");
        assert!(decoded.setup.sequence_wrap);
        assert_eq!(decoded, genome);
    }

    #[test]
    fn test_unsupported_version_rejected() {
        let mut blob = encode(&examples::war());
        blob[0] = 9;
        assert_matches!(
            decode(&blob),
            Err(BytecodeError::UnsupportedVersion { found: 9 })
        );
    }

    #[test]
    fn test_truncated_blob_is_malformed() {
        let blob = encode(&examples::war());
        assert_matches!(
            decode(&blob[..HEADER_LEN - 1]),
            Err(BytecodeError::Malformed { .. })
        );
    }

    #[test]
    fn test_id_hash_is_stable() {
        assert_eq!(id_hash("war-baseline"), id_hash("war-baseline"));
        assert_ne!(id_hash("war-baseline"), id_hash("hearts"));
    }
}
