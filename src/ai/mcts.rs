//! Monte Carlo tree search over legal moves.
//!
//! Plain UCT: selection by upper confidence bound, one expansion per
//! playout, uniform-random rollouts to a terminal state, terminal-win
//! reward for the player who made each move on the path. Rollouts reuse
//! the engine's `next_decision`/`apply_move` pair, so search and play can
//! never disagree about the rules.

use rand::Rng;
use rand_chacha::ChaCha8Rng;

use crate::genome::schema::Genome;
use crate::simulation::apply::apply_move;
use crate::simulation::engine::{next_decision, StepResult};
use crate::simulation::instrument::GameCounters;
use crate::simulation::movegen::Move;
use crate::simulation::state::GameState;

const EXPLORATION: f64 = 1.4;

struct Node {
    state: GameState,
    moves: Vec<Move>,
    /// Player to act at this node.
    player: u8,
    /// Child node per move; `None` until expanded.
    children: Vec<Option<usize>>,
    /// Terminal winner when this node ends the game (`Some(None)` = draw).
    terminal: Option<Option<u8>>,
    visits: f64,
    /// Reward accumulated per move edge, from the perspective of `player`.
    edge_visits: Vec<f64>,
    edge_rewards: Vec<f64>,
}

impl Node {
    fn decision(state: GameState, moves: Vec<Move>) -> Self {
        let player = state.active_player;
        let n = moves.len();
        Node {
            state,
            moves,
            player,
            children: vec![None; n],
            terminal: None,
            visits: 0.0,
            edge_visits: vec![0.0; n],
            edge_rewards: vec![0.0; n],
        }
    }

    fn terminal(state: GameState, winner: Option<u8>) -> Self {
        Node {
            player: state.active_player,
            state,
            moves: Vec::new(),
            children: Vec::new(),
            terminal: Some(winner),
            visits: 0.0,
            edge_visits: Vec::new(),
            edge_rewards: Vec::new(),
        }
    }

    fn select_edge(&self, rng: &mut ChaCha8Rng) -> usize {
        // Visit each edge once before applying UCT.
        let unvisited: Vec<usize> = (0..self.moves.len())
            .filter(|&i| self.edge_visits[i] == 0.0)
            .collect();
        if !unvisited.is_empty() {
            return unvisited[rng.gen_range(0..unvisited.len())];
        }
        let log_total = self.visits.max(1.0).ln();
        let mut best = 0;
        let mut best_value = f64::NEG_INFINITY;
        for i in 0..self.moves.len() {
            let exploit = self.edge_rewards[i] / self.edge_visits[i];
            let explore = EXPLORATION * (log_total / self.edge_visits[i]).sqrt();
            let value = exploit + explore;
            if value > best_value {
                best_value = value;
                best = i;
            }
        }
        best
    }
}

/// Choose the move with the most playout visits after `iterations` rounds
/// of search from this decision point.
pub fn decide(
    state: &GameState,
    genome: &Genome,
    moves: &[Move],
    iterations: u32,
    rng: &mut ChaCha8Rng,
) -> usize {
    let mut scratch = GameCounters::new();
    let mut nodes: Vec<Node> = vec![Node::decision(state.clone(), moves.to_vec())];

    for _ in 0..iterations.max(1) {
        // Selection: walk down until an unexpanded edge or terminal node.
        let mut path: Vec<(usize, usize)> = Vec::new();
        let mut node_idx = 0;
        let winner = loop {
            if let Some(winner) = nodes[node_idx].terminal {
                break winner;
            }
            let edge = nodes[node_idx].select_edge(rng);
            match nodes[node_idx].children[edge] {
                Some(child) => {
                    path.push((node_idx, edge));
                    node_idx = child;
                }
                None => {
                    // Expansion: materialize the child, then roll out.
                    path.push((node_idx, edge));
                    let mv = nodes[node_idx].moves[edge];
                    let applied = apply_move(
                        &nodes[node_idx].state,
                        &mv,
                        genome,
                        rng,
                        &mut scratch,
                    );
                    let child = match next_decision(applied, genome, &mut scratch) {
                        StepResult::Decision(child_state, child_moves) => {
                            Node::decision(child_state, child_moves)
                        }
                        StepResult::Finished(final_state, winner) => {
                            Node::terminal(final_state, winner)
                        }
                        StepResult::Stuck(dead_state) => Node::terminal(dead_state, None),
                    };
                    let child_idx = nodes.len();
                    let rollout_seed = child.terminal;
                    let rollout_start =
                        rollout_seed.is_none().then(|| child.state.clone());
                    nodes.push(child);
                    nodes[node_idx].children[edge] = Some(child_idx);
                    node_idx = child_idx;
                    break match rollout_start {
                        Some(start) => rollout(start, genome, rng, &mut scratch),
                        None => rollout_seed.unwrap(),
                    };
                }
            }
        };

        // Backpropagation: credit each move to the player who made it.
        nodes[node_idx].visits += 1.0;
        for &(idx, edge) in path.iter().rev() {
            let reward = match winner {
                Some(w) if w == nodes[idx].player => 1.0,
                Some(_) => 0.0,
                None => 0.5,
            };
            nodes[idx].visits += 1.0;
            nodes[idx].edge_visits[edge] += 1.0;
            nodes[idx].edge_rewards[edge] += reward;
        }
    }

    // Robust child: most-visited root edge.
    let root = &nodes[0];
    let mut best = 0;
    let mut best_visits = -1.0;
    for i in 0..root.moves.len() {
        if root.edge_visits[i] > best_visits {
            best_visits = root.edge_visits[i];
            best = i;
        }
    }
    best
}

/// Uniform-random playout to a terminal state.
fn rollout(
    state: GameState,
    genome: &Genome,
    rng: &mut ChaCha8Rng,
    scratch: &mut GameCounters,
) -> Option<u8> {
    let mut state = state;
    loop {
        match next_decision(state, genome, scratch) {
            StepResult::Finished(_, winner) => return winner,
            StepResult::Stuck(_) => return None,
            StepResult::Decision(current, moves) => {
                let choice = rng.gen_range(0..moves.len());
                state = apply_move(&current, &moves[choice], genome, rng, scratch);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genome::examples;
    use crate::simulation::engine::simulate_game;
    use crate::ai::AiKind;
    use rand::SeedableRng;

    #[test]
    fn test_mcts_returns_valid_index() {
        let genome = examples::crazy_eights();
        let state = crate::simulation::state::initial_state(&genome, 2).unwrap();
        let mut scratch = GameCounters::new();
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        if let StepResult::Decision(state, moves) = next_decision(state, &genome, &mut scratch) {
            let choice = decide(&state, &genome, &moves, 20, &mut rng);
            assert!(choice < moves.len());
        } else {
            panic!("expected a decision point");
        }
    }

    #[test]
    fn test_mcts_game_is_deterministic() {
        let genome = examples::blackjack();
        let ais = vec![AiKind::Mcts(25), AiKind::Random];
        let a = simulate_game(&genome, 9, &ais).unwrap();
        let b = simulate_game(&genome, 9, &ais).unwrap();
        assert_eq!(a.winner, b.winner);
        assert_eq!(a.counters, b.counters);
    }
}
