pub mod bytecode;
pub mod coherence;
pub mod conditions;
pub mod examples;
pub mod schema;

pub use schema::{Genome, GenomeInvariant};
