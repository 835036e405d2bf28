//! AI players. Every policy consumes the same legal-move list the engine
//! produced and returns an index into it; MCTS replays the engine's own
//! apply path for rollouts, so there is no duplicate game logic anywhere.

pub mod greedy;
pub mod mcts;
pub mod random;

use rand_chacha::ChaCha8Rng;

use crate::genome::schema::Genome;
use crate::simulation::movegen::Move;
use crate::simulation::state::GameState;

/// Which policy a seat plays with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AiKind {
    Random,
    Greedy,
    /// UCT search with this many playouts per decision.
    Mcts(u32),
}

impl AiKind {
    /// Pick one of the legal moves. Deterministic for a given RNG state.
    pub fn decide(
        self,
        state: &GameState,
        genome: &Genome,
        moves: &[Move],
        rng: &mut ChaCha8Rng,
    ) -> usize {
        debug_assert!(!moves.is_empty());
        if moves.len() == 1 {
            return 0;
        }
        match self {
            AiKind::Random => random::decide(moves, rng),
            AiKind::Greedy => greedy::decide(state, moves, rng),
            AiKind::Mcts(iterations) => mcts::decide(state, genome, moves, iterations, rng),
        }
    }
}

impl std::fmt::Display for AiKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AiKind::Random => write!(f, "random"),
            AiKind::Greedy => write!(f, "greedy"),
            AiKind::Mcts(k) => write!(f, "mcts{}", k),
        }
    }
}

/// Parse an AI spec like `random`, `greedy`, `mcts`, `mcts500`.
pub fn parse_ai(spec: &str) -> Option<AiKind> {
    match spec {
        "random" => Some(AiKind::Random),
        "greedy" => Some(AiKind::Greedy),
        "mcts" => Some(AiKind::Mcts(100)),
        other => other
            .strip_prefix("mcts")
            .and_then(|k| k.parse().ok())
            .map(AiKind::Mcts),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ai_specs() {
        assert_eq!(parse_ai("random"), Some(AiKind::Random));
        assert_eq!(parse_ai("greedy"), Some(AiKind::Greedy));
        assert_eq!(parse_ai("mcts"), Some(AiKind::Mcts(100)));
        assert_eq!(parse_ai("mcts500"), Some(AiKind::Mcts(500)));
        assert_eq!(parse_ai("neural"), None);
    }
}
