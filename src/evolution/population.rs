//! Individuals and populations for the evolutionary loop.

use crate::evolution::diversity::population_diversity;
use crate::evolution::fitness::FitnessMetrics;
use crate::genome::Genome;

/// One member of the population.
#[derive(Debug, Clone)]
pub struct Individual {
    pub genome: Genome,
    pub fitness: f64,
    pub evaluated: bool,
    pub metrics: Option<FitnessMetrics>,
}

impl Individual {
    pub fn unevaluated(genome: Genome) -> Self {
        Individual {
            genome,
            fitness: 0.0,
            evaluated: false,
            metrics: None,
        }
    }

    pub fn evaluated(genome: Genome, fitness: f64, metrics: Option<FitnessMetrics>) -> Self {
        Individual {
            genome,
            fitness,
            evaluated: true,
            metrics,
        }
    }
}

/// A generation's worth of individuals.
#[derive(Debug, Clone, Default)]
pub struct Population {
    pub individuals: Vec<Individual>,
    pub generation: u32,
}

impl Population {
    pub fn new(individuals: Vec<Individual>) -> Self {
        Population {
            individuals,
            generation: 0,
        }
    }

    pub fn best(&self) -> Option<&Individual> {
        self.individuals
            .iter()
            .max_by(|a, b| a.fitness.total_cmp(&b.fitness))
    }

    pub fn average_fitness(&self) -> f64 {
        if self.individuals.is_empty() {
            return 0.0;
        }
        self.individuals.iter().map(|i| i.fitness).sum::<f64>()
            / self.individuals.len() as f64
    }

    pub fn diversity(&self) -> f64 {
        let genomes: Vec<Genome> = self
            .individuals
            .iter()
            .map(|i| i.genome.clone())
            .collect();
        population_diversity(&genomes)
    }

    /// Individuals sorted best first.
    pub fn ranked(&self) -> Vec<&Individual> {
        let mut ranked: Vec<&Individual> = self.individuals.iter().collect();
        ranked.sort_by(|a, b| b.fitness.total_cmp(&a.fitness));
        ranked
    }
}
