pub mod apply;
pub mod batch;
pub mod conditions;
pub mod engine;
pub mod hand_eval;
pub mod instrument;
pub mod movegen;
pub mod state;
pub mod termination;
pub mod wire;

pub use batch::{run_batch, BatchConfig, SimulationResults};
pub use engine::{simulate_game, simulate_one_game, GameOutcome, SimError};
pub use movegen::{legal_moves, Move};
pub use state::{initial_state, GameState, InitError, PlayerState};
