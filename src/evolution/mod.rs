pub mod complexity;
pub mod diversity;
pub mod engine;
pub mod fitness;
pub mod naming;
pub mod operators;
pub mod population;
pub mod records;
pub mod seeding;
pub mod skill;

pub use engine::{EvolutionConfig, EvolutionEngine, GenerationStats};
pub use fitness::{FitnessEvaluator, FitnessMetrics, FitnessStyle, FullFitnessEvaluator};
pub use population::{Individual, Population};
