//! # Deckforge
//!
//! Evolves novel playable card-game rulesets with a genetic algorithm.
//!
//! ## Features
//!
//! - **Genome model**: declarative, self-describing game specifications
//! - **Bytecode codec**: compact, versioned, symmetric binary encoding
//! - **Simulator**: deterministic interpreter with full instrumentation
//! - **Batch engine**: thousands of seeded games in parallel, reproducibly
//! - **AI players**: Random, Greedy, and UCT Monte Carlo tree search
//! - **Evolution**: tournament selection, elitism, crossover, a mutation
//!   pipeline with coherence repair, diversity monitoring, skill penalties
//!
//! ## Usage
//!
//! ```no_run
//! use deckforge::genome::examples;
//! use deckforge::simulation::{run_batch, BatchConfig};
//! use deckforge::ai::AiKind;
//!
//! let genome = examples::hearts();
//! let config = BatchConfig::new(100, 42, AiKind::Random, genome.player_count);
//! let results = run_batch(&genome, &config);
//! println!("wins: {:?}", results.wins);
//! ```

pub mod ai;
pub mod cards;
pub mod evolution;
pub mod genome;
pub mod logging;
pub mod simulation;

pub use evolution::{EvolutionConfig, EvolutionEngine, FitnessMetrics, FitnessStyle};
pub use genome::Genome;
pub use simulation::{simulate_one_game, GameOutcome, SimulationResults};

/// Top-level error type covering every subsystem.
#[derive(Debug, thiserror::Error)]
pub enum DeckforgeError {
    #[error(transparent)]
    Bytecode(#[from] genome::bytecode::BytecodeError),

    #[error(transparent)]
    Invariant(#[from] genome::GenomeInvariant),

    #[error("incoherent genome: {0:?}")]
    Coherence(Vec<String>),

    #[error(transparent)]
    Init(#[from] simulation::InitError),

    #[error(transparent)]
    Simulation(#[from] simulation::SimError),

    #[error("evaluator error: {0}")]
    Evaluator(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for convenience.
pub type Result<T> = std::result::Result<T, DeckforgeError>;

/// Library version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
