//! Move application: every transition clones the previous snapshot and
//! rebuilds the changed fields, returning a new `GameState`.
//!
//! Phase resolution lives here too: war battles, rank-match captures, trick
//! resolution, claim challenges, betting transitions and special effects.

use rand::seq::SliceRandom;
use rand::Rng;
use rand_chacha::ChaCha8Rng;

use crate::cards::{Card, Rank, Suit};
use crate::genome::schema::{
    DeckEmptyAction, EffectKind, Genome, HandEvalMethod, Location, Phase, ScoringTrigger,
    TableauMode, TargetSelector, TieBreaker, TrickPhase,
};
use crate::simulation::instrument::GameCounters;
use crate::simulation::movegen::{BettingAction, Move};
use crate::simulation::state::{ClaimState, GameState};

/// Apply a legal move, producing the successor state.
pub fn apply_move(
    state: &GameState,
    mv: &Move,
    genome: &Genome,
    rng: &mut ChaCha8Rng,
    counters: &mut GameCounters,
) -> GameState {
    counters.total_actions += 1;
    let mut next = state.clone();
    match *mv {
        Move::PlayCard {
            card_index, target, ..
        } => {
            apply_play(&mut next, card_index, target, genome, rng, counters);
            next.phase_index += 1;
        }
        Move::Draw { source, count, .. } => {
            apply_draw(&mut next, source, count, genome, rng);
            next.round_had_action = true;
            next.phase_index += 1;
        }
        Move::Discard { card_index, .. } => {
            apply_discard(&mut next, card_index, genome);
            next.round_had_action = true;
            next.phase_index += 1;
        }
        Move::TrickFollow { card_index, .. } => {
            apply_trick_follow(&mut next, card_index, genome, counters);
            next.round_had_action = true;
            next.phase_index += 1;
        }
        Move::ClaimPlay {
            count, rank, bluff, ..
        } => {
            apply_claim_play(&mut next, count, rank, bluff, counters);
            next.round_had_action = true;
            next.phase_index += 1;
        }
        Move::Challenge { .. } => {
            apply_challenge(&mut next, counters);
            next.round_had_action = true;
            // Phase unchanged: the challenger still takes their own action.
        }
        Move::AcceptClaim { .. } => {
            apply_accept(&mut next, counters);
        }
        Move::Bid { amount, .. } => {
            next.bids[next.active_player as usize] = Some(amount);
            next.round_had_action = true;
            next.phase_index += 1;
        }
        Move::Betting { action, .. } => {
            apply_betting(&mut next, action, genome, counters);
            next.phase_index += 1;
        }
        Move::Pass { .. } => {
            next.phase_index += 1;
        }
    }
    next
}

/// Advance to the next player's turn: resets the phase cursor, honors
/// reversed direction, pending skips, extra turns and trick leadership, and
/// bumps the turn number after each full round.
pub fn advance_turn(state: &GameState) -> GameState {
    let mut next = state.clone();
    let n = next.player_count() as u32;
    next.turns_taken += 1;
    next.turn = next.turns_taken / n + 1;
    if next.turns_taken % n == 0 {
        if next.round_had_action {
            next.consecutive_pass_rounds = 0;
        } else {
            next.consecutive_pass_rounds += 1;
        }
        next.round_had_action = false;
    }

    if let Some(leader) = next.next_leader.take() {
        next.active_player = leader;
    } else if next.extra_turn {
        next.extra_turn = false;
    } else {
        let mut seat = next.seat_after(next.active_player);
        while next.pending_skips > 0 {
            seat = next.seat_after(seat);
            next.pending_skips -= 1;
        }
        next.active_player = seat;
    }
    next.phase_index = 0;
    next
}

fn take_card(state: &mut GameState, player: u8, card_index: usize) -> Card {
    state.players[player as usize].hand.remove(card_index)
}

fn score_card_rules(
    state: &mut GameState,
    genome: &Genome,
    player: u8,
    card: Card,
    trigger: ScoringTrigger,
) {
    for rule in &genome.card_scoring {
        if rule.trigger == trigger && rule.condition.matches(card) {
            state.players[player as usize].score += rule.points;
        }
    }
}

fn apply_play(
    state: &mut GameState,
    card_index: usize,
    target: Location,
    genome: &Genome,
    rng: &mut ChaCha8Rng,
    counters: &mut GameCounters,
) {
    let player = state.active_player;
    let card = take_card(state, player, card_index);
    state.round_had_action = true;
    score_card_rules(state, genome, player, card, ScoringTrigger::Play);

    match target {
        Location::Discard => {
            state.discard.push(card);
            resolve_special_effects(state, card, genome, rng, counters);
        }
        Location::Tableau => {
            if state.tableau.is_empty() {
                state.tableau.push(Vec::new());
            }
            counters.total_interactions += 1;
            counters.contention_events += 1;
            match genome.setup.tableau_mode {
                TableauMode::War => {
                    state.tableau[0].push(card);
                    resolve_war_battle(state, genome, counters);
                }
                TableauMode::MatchRank => {
                    let pile_matches =
                        state.tableau[0].iter().any(|c| c.rank == card.rank);
                    if pile_matches {
                        let mut pile = std::mem::take(&mut state.tableau[0]);
                        pile.push(card);
                        for captured in &pile {
                            score_card_rules(
                                state,
                                genome,
                                player,
                                *captured,
                                ScoringTrigger::Capture,
                            );
                        }
                        state.captured[player as usize].extend(pile);
                        counters.move_disruption_events += 1;
                    } else {
                        state.tableau[0].push(card);
                    }
                }
                _ => state.tableau[0].push(card),
            }
        }
        _ => state.discard.push(card),
    }
    check_set_completion(state, genome, player);
}

/// War battle: once every player has contributed one card to the pile,
/// compare and hand the pile to the winner.
fn resolve_war_battle(state: &mut GameState, genome: &Genome, counters: &mut GameCounters) {
    let n = state.player_count() as usize;
    let pile_len = state.tableau[0].len();
    if pile_len < n || pile_len % n != 0 {
        return;
    }
    // The last n cards were contributed in seat order ending with the
    // active player.
    let contributions = &state.tableau[0][pile_len - n..];
    let mut contributors: Vec<u8> = Vec::with_capacity(n);
    let mut seat = state.active_player;
    for _ in 0..n {
        contributors.push(seat);
        seat = state.seat_after(seat);
    }
    contributors.reverse(); // oldest contribution first

    let mut best_idx = 0;
    let mut tied = false;
    for idx in 1..n {
        let best = contributions[best_idx].rank.value();
        let challenger = contributions[idx].rank.value();
        if challenger > best {
            best_idx = idx;
            tied = false;
        } else if challenger == best {
            tied = true;
        }
    }

    if tied && genome.setup.tie_breaker == TieBreaker::Battle {
        // Leave the pile in place; the next plays stack on top and the
        // following comparison decides the whole pot.
        return;
    }
    let winner = if tied {
        match genome.setup.tie_breaker {
            TieBreaker::ActivePlayer | TieBreaker::Split => state.active_player,
            TieBreaker::Alternating => {
                if state.turn % 2 == 0 {
                    contributors[0]
                } else {
                    *contributors.last().unwrap()
                }
            }
            TieBreaker::Battle => unreachable!(),
        }
    } else {
        contributors[best_idx]
    };

    let pile = std::mem::take(&mut state.tableau[0]);
    for card in &pile {
        score_card_rules(state, genome, winner, *card, ScoringTrigger::Capture);
    }
    state.players[winner as usize].hand.extend(pile);
    counters.total_interactions += 1;
    counters.move_disruption_events += 1;
}

fn apply_draw(
    state: &mut GameState,
    source: Location,
    count: u32,
    genome: &Genome,
    rng: &mut ChaCha8Rng,
) {
    let player = state.active_player;
    for _ in 0..count.max(1) {
        match source {
            Location::Deck => {
                if state.deck.is_empty() {
                    refill_deck(state, genome, rng);
                }
                match state.deck.pop() {
                    Some(card) => state.players[player as usize].hand.push(card),
                    None => {
                        state.deck_exhausted =
                            genome.setup.deck_empty_action == DeckEmptyAction::GameEnds;
                        break;
                    }
                }
            }
            Location::Discard => match state.discard.pop() {
                Some(card) => state.players[player as usize].hand.push(card),
                None => break,
            },
            Location::OpponentHand => {
                let victims: Vec<u8> = state
                    .players
                    .iter()
                    .filter(|p| p.id != player && !p.hand.is_empty())
                    .map(|p| p.id)
                    .collect();
                let Some(&victim) = victims.first() else { break };
                let victim = if victims.len() > 1 {
                    victims[rng.gen_range(0..victims.len())]
                } else {
                    victim
                };
                let hand_len = state.players[victim as usize].hand.len();
                let idx = rng.gen_range(0..hand_len);
                let card = state.players[victim as usize].hand.remove(idx);
                state.players[player as usize].hand.push(card);
            }
            _ => break,
        }
    }
    check_set_completion(state, genome, player);
}

/// Recycle the discard pile into a fresh shuffled deck. The top discard is
/// kept in place when configured; trick-in-flight and claim cards are never
/// touched.
fn refill_deck(state: &mut GameState, genome: &Genome, rng: &mut ChaCha8Rng) {
    if genome.setup.deck_empty_action != DeckEmptyAction::ReshuffleDiscard {
        return;
    }
    if state.discard.is_empty() {
        return;
    }
    let kept = if genome.setup.keep_top_discard && state.discard.len() > 1 {
        state.discard.pop()
    } else {
        None
    };
    let mut recycled = std::mem::take(&mut state.discard);
    recycled.shuffle(rng);
    state.deck = recycled;
    if let Some(card) = kept {
        state.discard.push(card);
    }
}

fn apply_discard(state: &mut GameState, card_index: usize, genome: &Genome) {
    let player = state.active_player;
    let phase = genome.turn_structure.phases.get(state.phase_index);
    let pair_discard = matches!(
        phase,
        Some(Phase::Discard(d)) if d.matching_condition.is_some() && d.count >= 2
    );

    let card = take_card(state, player, card_index);
    score_card_rules(state, genome, player, card, ScoringTrigger::Play);
    state.discard.push(card);

    if pair_discard {
        // Shed the partner of a matching pair along with the chosen card.
        let hand = &state.players[player as usize].hand;
        if let Some(partner) = hand
            .iter()
            .position(|c| c.rank == card.rank && c.is_red() == card.is_red())
        {
            let partner_card = take_card(state, player, partner);
            state.discard.push(partner_card);
        }
    }
}

fn apply_trick_follow(
    state: &mut GameState,
    card_index: usize,
    genome: &Genome,
    counters: &mut GameCounters,
) {
    let player = state.active_player;
    let card = take_card(state, player, card_index);
    counters.total_interactions += 1;

    let trick_phase = match genome.turn_structure.phases.get(state.phase_index) {
        Some(Phase::Trick(t)) => Some(t.clone()),
        _ => genome.turn_structure.phases.iter().find_map(|p| match p {
            Phase::Trick(t) => Some(t.clone()),
            _ => None,
        }),
    };
    if let Some(phase) = &trick_phase {
        if Some(card.suit) == phase.breaking_suit {
            state.breaking_suit_broken = true;
        }
    }
    state.current_trick.push((player, card));

    if state.current_trick.len() == state.player_count() as usize {
        let phase = trick_phase.unwrap_or(TrickPhase {
            lead_suit_required: true,
            trump_suit: None,
            high_card_wins: true,
            breaking_suit: None,
        });
        resolve_trick(state, genome, &phase, counters);
    }
}

fn resolve_trick(
    state: &mut GameState,
    genome: &Genome,
    phase: &TrickPhase,
    counters: &mut GameCounters,
) {
    let trump: Option<Suit> = phase.trump_suit.or(state.trump);
    let lead_suit = state.current_trick[0].1.suit;

    let class = |card: Card| -> i32 {
        if Some(card.suit) == trump {
            2
        } else if card.suit == lead_suit {
            1
        } else {
            0
        }
    };
    let mut winner = state.current_trick[0].0;
    let mut best = state.current_trick[0].1;
    for &(player, card) in state.current_trick.iter().skip(1) {
        let better = match class(card).cmp(&class(best)) {
            std::cmp::Ordering::Greater => true,
            std::cmp::Ordering::Less => false,
            std::cmp::Ordering::Equal => {
                if phase.high_card_wins {
                    card.rank.value() > best.rank.value()
                } else {
                    card.rank.value() < best.rank.value()
                }
            }
        };
        if better {
            winner = player;
            best = card;
        }
    }

    let cards = std::mem::take(&mut state.current_trick);
    for (_, card) in &cards {
        score_card_rules(state, genome, winner, *card, ScoringTrigger::TrickWin);
        state.captured[winner as usize].push(*card);
    }
    state.tricks_won[winner as usize] += 1;
    state.next_leader = Some(winner);
    counters.move_disruption_events += 1;
}

fn apply_claim_play(
    state: &mut GameState,
    count: u8,
    rank: Rank,
    bluff: bool,
    counters: &mut GameCounters,
) {
    let player = state.active_player;
    let count = count.max(1) as usize;
    let hand = &state.players[player as usize].hand;

    let mut indices: Vec<usize> = if bluff {
        // Shed the lowest cards while claiming the required rank.
        let mut order: Vec<usize> = (0..hand.len()).collect();
        order.sort_by_key(|&i| hand[i].rank.value());
        order.into_iter().take(count).collect()
    } else {
        hand.iter()
            .enumerate()
            .filter(|(_, c)| c.rank == rank)
            .map(|(i, _)| i)
            .take(count)
            .collect()
    };
    indices.sort_unstable_by(|a, b| b.cmp(a));
    let mut cards: Vec<Card> = indices
        .into_iter()
        .map(|i| state.players[player as usize].hand.remove(i))
        .collect();
    cards.reverse();

    counters.total_claims += 1;
    counters.total_interactions += 1;
    if bluff {
        counters.total_bluffs += 1;
    }
    state.current_claim = Some(ClaimState {
        claimer: player,
        claimed_rank: rank,
        claimed_count: cards.len() as u8,
        cards,
    });
    state.expected_claim_rank =
        Rank::from_ordinal((rank.ordinal() + 1) % 13).unwrap_or(Rank::Two);
}

fn apply_challenge(state: &mut GameState, counters: &mut GameCounters) {
    let challenger = state.active_player;
    let Some(claim) = state.current_claim.take() else {
        return;
    };
    counters.total_challenges += 1;
    counters.total_interactions += 1;
    counters.forced_response_events += 1;

    let truthful = claim.cards.iter().all(|c| c.rank == claim.claimed_rank);
    let mut pile = std::mem::take(&mut state.discard);
    pile.extend(claim.cards);
    let loser = if truthful {
        challenger
    } else {
        counters.successful_catches += 1;
        claim.claimer
    };
    state.players[loser as usize].hand.extend(pile);
}

fn apply_accept(state: &mut GameState, counters: &mut GameCounters) {
    let Some(claim) = state.current_claim.take() else {
        return;
    };
    let truthful = claim.cards.iter().all(|c| c.rank == claim.claimed_rank);
    if !truthful {
        counters.successful_bluffs += 1;
    }
    state.discard.extend(claim.cards);
}

fn apply_betting(
    state: &mut GameState,
    action: BettingAction,
    genome: &Genome,
    counters: &mut GameCounters,
) {
    let min_bet = match genome.turn_structure.phases.get(state.phase_index) {
        Some(Phase::Betting(b)) => b.min_bet,
        _ => genome
            .turn_structure
            .phases
            .iter()
            .find_map(|p| match p {
                Phase::Betting(b) => Some(b.min_bet),
                _ => None,
            })
            .unwrap_or(1),
    };
    let actor = state.active_player as usize;
    let n = state.players.len();

    match action {
        BettingAction::Check => {
            state.acted_in_betting[actor] = true;
        }
        BettingAction::Bet => {
            let player = &mut state.players[actor];
            player.chips -= min_bet;
            player.current_bet = min_bet;
            state.pot += min_bet;
            state.current_bet = min_bet;
            state.acted_in_betting = vec![false; n];
            state.acted_in_betting[actor] = true;
            counters.total_bets += 1;
            counters.total_interactions += 1;
            if is_weak_hand(state, genome, actor) {
                counters.betting_bluffs += 1;
            }
            state.round_had_action = true;
        }
        BettingAction::Call => {
            let to_call = state.current_bet - state.players[actor].current_bet;
            let player = &mut state.players[actor];
            player.chips -= to_call;
            player.current_bet = state.current_bet;
            state.pot += to_call;
            state.acted_in_betting[actor] = true;
            state.round_had_action = true;
        }
        BettingAction::Raise => {
            let to_call = state.current_bet - state.players[actor].current_bet;
            let raise_amount = to_call + min_bet;
            state.current_bet += min_bet;
            let player = &mut state.players[actor];
            player.chips -= raise_amount;
            player.current_bet = state.current_bet;
            state.pot += raise_amount;
            state.raise_count += 1;
            state.acted_in_betting = vec![false; n];
            state.acted_in_betting[actor] = true;
            counters.total_bets += 1;
            counters.total_interactions += 1;
            if is_weak_hand(state, genome, actor) {
                counters.betting_bluffs += 1;
            }
            state.round_had_action = true;
        }
        BettingAction::AllIn => {
            let amount = state.players[actor].chips;
            let player = &mut state.players[actor];
            player.chips = 0;
            player.current_bet += amount;
            player.is_all_in = true;
            let new_bet = state.players[actor].current_bet;
            state.pot += amount;
            if new_bet > state.current_bet {
                state.current_bet = new_bet;
                state.acted_in_betting = vec![false; n];
            }
            state.acted_in_betting[actor] = true;
            counters.total_bets += 1;
            counters.all_in_count += 1;
            counters.total_interactions += 1;
            state.round_had_action = true;
        }
        BettingAction::Fold => {
            state.players[actor].has_folded = true;
            state.acted_in_betting[actor] = true;
            let remaining = state.unfolded_players();
            if remaining.len() == 1 {
                state.fold_win = Some(remaining[0]);
            }
        }
    }

    let settled = state.players.iter().all(|p| {
        p.has_folded
            || p.is_all_in
            || (p.current_bet == state.current_bet && state.acted_in_betting[p.id as usize])
    });
    if settled {
        state.betting_round_complete = true;
    }
}

/// A bet made from the weaker half of the hand space counts as a bluff.
fn is_weak_hand(state: &GameState, genome: &Genome, actor: usize) -> bool {
    let Some(eval) = &genome.hand_evaluation else {
        return false;
    };
    let strength =
        crate::simulation::hand_eval::evaluate_hand(eval, &state.players[actor].hand);
    match eval.method {
        HandEvalMethod::PatternMatch => strength.priority <= 20,
        HandEvalMethod::PointTotal => {
            let target = eval.target_value.unwrap_or(21);
            strength.priority < 0 || strength.kicker < target / 2
        }
        _ => strength.kicker <= 8,
    }
}

/// Resolve any special effect whose trigger rank matches the played card.
/// Effects do not nest: forced draws never trigger further effects.
fn resolve_special_effects(
    state: &mut GameState,
    card: Card,
    genome: &Genome,
    rng: &mut ChaCha8Rng,
    counters: &mut GameCounters,
) {
    for effect in &genome.special_effects {
        if effect.trigger_rank != card.rank {
            continue;
        }
        let targets = resolve_targets(state, effect.target, rng);
        match effect.kind {
            EffectKind::SkipNext => {
                state.pending_skips = state.pending_skips.saturating_add(effect.value.max(1));
                counters.total_interactions += 1;
                counters.move_disruption_events += 1;
            }
            EffectKind::ReverseDirection => {
                state.direction_reversed = !state.direction_reversed;
                counters.total_interactions += 1;
            }
            EffectKind::ExtraTurn => {
                state.extra_turn = true;
            }
            EffectKind::DrawCards => {
                for target in &targets {
                    for _ in 0..effect.value.max(1) {
                        if state.deck.is_empty() {
                            refill_deck(state, genome, rng);
                        }
                        match state.deck.pop() {
                            Some(card) => state.players[*target as usize].hand.push(card),
                            None => break,
                        }
                    }
                    counters.total_interactions += 1;
                    counters.forced_response_events += 1;
                }
            }
            EffectKind::ForceDiscard => {
                for target in &targets {
                    for _ in 0..effect.value.max(1) {
                        let hand_len = state.players[*target as usize].hand.len();
                        if hand_len == 0 {
                            break;
                        }
                        let idx = rng.gen_range(0..hand_len);
                        let discarded = state.players[*target as usize].hand.remove(idx);
                        state.discard.push(discarded);
                    }
                    counters.total_interactions += 1;
                    counters.forced_response_events += 1;
                }
            }
        }
    }
}

fn resolve_targets(state: &GameState, selector: TargetSelector, rng: &mut ChaCha8Rng) -> Vec<u8> {
    let me = state.active_player;
    let n = state.player_count();
    let opponents: Vec<u8> = (0..n).filter(|&p| p != me).collect();
    match selector {
        TargetSelector::NextPlayer => vec![state.seat_after(me)],
        TargetSelector::PrevPlayer => vec![((me as i32 - 1).rem_euclid(n as i32)) as u8],
        TargetSelector::LeftOpponent => vec![(me + 1) % n],
        TargetSelector::RightOpponent => vec![((me as i32 - 1).rem_euclid(n as i32)) as u8],
        TargetSelector::AllOpponents => opponents,
        TargetSelector::RandomOpponent | TargetSelector::PlayerChoice => {
            if opponents.is_empty() {
                Vec::new()
            } else {
                vec![opponents[rng.gen_range(0..opponents.len())]]
            }
        }
    }
}

/// Completed four-of-a-kind sets score and move to the captured pile.
fn check_set_completion(state: &mut GameState, genome: &Genome, player: u8) {
    let has_set_rule = genome
        .card_scoring
        .iter()
        .any(|rule| rule.trigger == ScoringTrigger::SetComplete);
    if !has_set_rule {
        return;
    }
    loop {
        let hand = &state.players[player as usize].hand;
        let mut counts = [0u8; 13];
        for card in hand {
            counts[card.rank.ordinal() as usize] += 1;
        }
        let Some(ord) = counts.iter().position(|&c| c >= 4) else {
            break;
        };
        let rank = Rank::from_ordinal(ord as u8).unwrap();
        let mut set = Vec::with_capacity(4);
        let hand = &mut state.players[player as usize].hand;
        let mut i = 0;
        while i < hand.len() {
            if hand[i].rank == rank && set.len() < 4 {
                set.push(hand.remove(i));
            } else {
                i += 1;
            }
        }
        for card in &set {
            score_card_rules(state, genome, player, *card, ScoringTrigger::SetComplete);
        }
        state.captured[player as usize].extend(set);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genome::examples;
    use crate::simulation::state::initial_state;
    use rand::SeedableRng;

    fn rng() -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(99)
    }

    #[test]
    fn test_war_battle_conserves_cards() {
        let genome = examples::war();
        let state = initial_state(&genome, 42).unwrap();
        let mut rng = rng();
        let mut counters = GameCounters::new();

        let mv = Move::PlayCard {
            phase_index: 0,
            card_index: 0,
            target: Location::Tableau,
        };
        let s1 = apply_move(&state, &mv, &genome, &mut rng, &mut counters);
        assert_eq!(s1.total_cards(), 52);
        assert_eq!(s1.tableau[0].len(), 1);

        let s1 = advance_turn(&s1);
        let s2 = apply_move(&s1, &mv, &genome, &mut rng, &mut counters);
        // Both contributed; the battle resolved and the pile is empty.
        assert_eq!(s2.total_cards(), 52);
        assert!(s2.tableau[0].is_empty());
        let hands: usize = s2.players.iter().map(|p| p.hand.len()).sum();
        assert_eq!(hands, 52);
    }

    #[test]
    fn test_trick_resolution_awards_scoring() {
        let genome = examples::hearts();
        let mut state = initial_state(&genome, 8).unwrap();
        state.players[0].hand = vec![Card::new(Rank::Ace, Suit::Clubs)];
        state.players[1].hand = vec![Card::new(Rank::Two, Suit::Clubs)];
        state.players[2].hand = vec![Card::new(Rank::Queen, Suit::Spades)];
        state.players[3].hand = vec![Card::new(Rank::Five, Suit::Hearts)];
        state.active_player = 0;
        let mut rng = rng();
        let mut counters = GameCounters::new();

        let mut s = state;
        for _ in 0..4 {
            let mv = Move::TrickFollow {
                phase_index: 0,
                card_index: 0,
            };
            s = apply_move(&s, &mv, &genome, &mut rng, &mut counters);
            s = advance_turn(&s);
        }
        // Ace of clubs wins the trick and eats Q♠ (13) plus one heart (1).
        assert_eq!(s.players[0].score, 14);
        assert_eq!(s.tricks_won[0], 1);
        assert_eq!(s.captured[0].len(), 4);
        assert_eq!(s.next_leader, None); // consumed by advance_turn
        assert_eq!(s.active_player, 0);
        assert!(s.breaking_suit_broken);
    }

    #[test]
    fn test_betting_preserves_chip_total() {
        let genome = examples::simple_poker();
        let state = initial_state(&genome, 4).unwrap();
        let mut rng = rng();
        let mut counters = GameCounters::new();
        let total = state.total_chips();

        let bet = Move::Betting {
            phase_index: 0,
            action: BettingAction::Bet,
        };
        let s = apply_move(&state, &bet, &genome, &mut rng, &mut counters);
        assert_eq!(s.total_chips(), total);
        assert_eq!(s.pot, 10);
        assert_eq!(s.current_bet, 10);

        let s = advance_turn(&s);
        let raise = Move::Betting {
            phase_index: 0,
            action: BettingAction::Raise,
        };
        let s = apply_move(&s, &raise, &genome, &mut rng, &mut counters);
        assert_eq!(s.total_chips(), total);
        assert_eq!(s.current_bet, 20);
        assert_eq!(s.raise_count, 1);
        assert!(!s.betting_round_complete);

        let s = advance_turn(&s);
        let call = Move::Betting {
            phase_index: 0,
            action: BettingAction::Call,
        };
        let s = apply_move(&s, &call, &genome, &mut rng, &mut counters);
        assert_eq!(s.total_chips(), total);
        assert!(s.betting_round_complete);
    }

    #[test]
    fn test_fold_sets_fold_win() {
        let genome = examples::simple_poker();
        let state = initial_state(&genome, 4).unwrap();
        let mut rng = rng();
        let mut counters = GameCounters::new();
        let fold = Move::Betting {
            phase_index: 0,
            action: BettingAction::Fold,
        };
        let s = apply_move(&state, &fold, &genome, &mut rng, &mut counters);
        assert_eq!(s.fold_win, Some(1));
    }

    #[test]
    fn test_challenge_on_bluff_punishes_claimer() {
        let genome = examples::cheat();
        let mut state = initial_state(&genome, 12).unwrap();
        state.players[0].hand = vec![
            Card::new(Rank::Three, Suit::Hearts),
            Card::new(Rank::Four, Suit::Clubs),
        ];
        state.discard = vec![Card::new(Rank::King, Suit::Spades)];
        let mut rng = rng();
        let mut counters = GameCounters::new();

        let claim = Move::ClaimPlay {
            phase_index: 0,
            count: 1,
            rank: Rank::Ace,
            bluff: true,
        };
        let s = apply_move(&state, &claim, &genome, &mut rng, &mut counters);
        assert_eq!(counters.total_bluffs, 1);
        let s = advance_turn(&s);

        let challenge = Move::Challenge { phase_index: 0 };
        let s = apply_move(&s, &challenge, &genome, &mut rng, &mut counters);
        // Claimer takes the discard pile plus their own lie.
        assert_eq!(s.players[0].hand.len(), 3);
        assert!(s.discard.is_empty());
        assert_eq!(counters.successful_catches, 1);
    }

    #[test]
    fn test_reverse_effect_flips_direction() {
        let genome = examples::switchback();
        let mut state = initial_state(&genome, 21).unwrap();
        state.players[0].hand = vec![Card::new(Rank::Ace, Suit::Hearts)];
        state.discard = vec![Card::new(Rank::Two, Suit::Hearts)];
        state.phase_index = 1;
        let mut rng = rng();
        let mut counters = GameCounters::new();
        let mv = Move::PlayCard {
            phase_index: 1,
            card_index: 0,
            target: Location::Discard,
        };
        let s = apply_move(&state, &mv, &genome, &mut rng, &mut counters);
        assert!(s.direction_reversed);
        let s = advance_turn(&s);
        assert_eq!(s.active_player, 3);
    }
}
