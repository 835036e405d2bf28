//! Uniform random policy: the baseline for batch simulation and the rollout
//! policy inside MCTS.

use rand::Rng;
use rand_chacha::ChaCha8Rng;

use crate::simulation::movegen::Move;

pub fn decide(moves: &[Move], rng: &mut ChaCha8Rng) -> usize {
    rng.gen_range(0..moves.len())
}
