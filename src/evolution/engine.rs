//! The evolutionary loop: seeded initialization, parallel fitness
//! evaluation, tournament selection with elitism, crossover and mutation,
//! diversity monitoring with an aggressive-mutation fallback, plateau
//! detection, and periodic skill-evaluation penalties.

use std::collections::HashMap;

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;

use crate::evolution::fitness::{FitnessStyle, FullFitnessEvaluator};
use crate::evolution::operators::{create_pipeline, CrossoverOperator, MutationPipeline};
use crate::evolution::population::{Individual, Population};
use crate::evolution::seeding::{create_seed_population, create_seed_population_from_genomes};
use crate::evolution::skill::{evaluate_batch_skill, SkillEvalConfig, SkillEvalResult};
use crate::genome::bytecode::id_hash;
use crate::genome::Genome;
use crate::simulation::batch::{fork_seed, num_threads_default};

/// Configuration for an evolutionary run.
#[derive(Debug, Clone)]
pub struct EvolutionConfig {
    pub population_size: usize,
    pub max_generations: u32,
    /// Top fraction preserved verbatim each generation.
    pub elitism_rate: f64,
    pub crossover_rate: f64,
    pub tournament_size: usize,
    /// `None` disables plateau detection.
    pub plateau_threshold: Option<u32>,
    pub improvement_threshold: f64,
    pub diversity_threshold: f64,
    pub seed_ratio: f64,
    pub random_seed: u64,
    pub fitness_style: FitnessStyle,
    /// Restrict seeding (and parameter mutation) to this player count.
    pub player_count: Option<u8>,
    pub num_simulations: u32,
    /// Custom genomes to seed from (previous winners); empty = library only.
    pub seed_genomes: Vec<Genome>,

    /// Run skill evaluation every N generations; 0 disables it.
    pub skill_eval_frequency: u32,
    pub skill_eval_top_percent: f64,
    pub skill_eval_games: u32,
    pub skill_eval_mcts_iterations: u32,
    pub fpa_penalty_threshold: f64,
    pub fpa_penalty_weight: f64,
    pub low_skill_penalty_threshold: f64,
    pub low_skill_penalty_weight: f64,
    pub high_skill_penalty_threshold: f64,
    pub high_skill_penalty_weight: f64,

    pub workers: Option<usize>,
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        EvolutionConfig {
            population_size: 100,
            max_generations: 100,
            elitism_rate: 0.1,
            crossover_rate: 0.7,
            tournament_size: 3,
            plateau_threshold: None,
            improvement_threshold: 0.005,
            diversity_threshold: 0.1,
            seed_ratio: 0.3,
            random_seed: 0,
            fitness_style: FitnessStyle::Balanced,
            player_count: None,
            num_simulations: 100,
            seed_genomes: Vec::new(),
            skill_eval_frequency: 10,
            skill_eval_top_percent: 0.1,
            skill_eval_games: 10,
            skill_eval_mcts_iterations: 100,
            fpa_penalty_threshold: 0.3,
            fpa_penalty_weight: 0.3,
            low_skill_penalty_threshold: 0.6,
            low_skill_penalty_weight: 0.2,
            high_skill_penalty_threshold: 0.85,
            high_skill_penalty_weight: 0.3,
            workers: None,
        }
    }
}

/// Statistics for a single generation.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationStats {
    pub generation: u32,
    pub best_fitness: f64,
    pub avg_fitness: f64,
    pub diversity: f64,
    pub evaluations: usize,
}

/// The engine owns the population; workers only ever see immutable genome
/// references during evaluation.
pub struct EvolutionEngine {
    pub config: EvolutionConfig,
    pub population: Population,
    pub stats_history: Vec<GenerationStats>,
    pub best_ever: Option<Individual>,
    pub use_aggressive_mutation: bool,
    evaluator: FullFitnessEvaluator,
    pipeline: MutationPipeline,
    aggressive_pipeline: MutationPipeline,
    crossover: CrossoverOperator,
    rng: ChaCha8Rng,
    pool: rayon::ThreadPool,
    skill_cache: HashMap<String, SkillEvalResult>,
}

impl EvolutionEngine {
    pub fn new(config: EvolutionConfig) -> Self {
        let workers = config.workers.unwrap_or_else(num_threads_default);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .build()
            .expect("worker pool");
        log::info!(
            "evolution engine initialized with {} workers, style {}",
            workers,
            config.fitness_style
        );
        let preserve = config.player_count.is_some();
        EvolutionEngine {
            evaluator: FullFitnessEvaluator::new(config.fitness_style, config.num_simulations),
            pipeline: create_pipeline(false, preserve),
            aggressive_pipeline: create_pipeline(true, preserve),
            crossover: CrossoverOperator::new(config.crossover_rate),
            rng: ChaCha8Rng::seed_from_u64(config.random_seed),
            pool,
            skill_cache: HashMap::new(),
            population: Population::default(),
            stats_history: Vec::new(),
            best_ever: None,
            use_aggressive_mutation: false,
            config,
        }
    }

    pub fn initialize_population(&mut self) -> Result<(), String> {
        log::info!(
            "initializing population of {} ({}% seeds)",
            self.config.population_size,
            (self.config.seed_ratio * 100.0) as u32
        );
        let individuals = if self.config.seed_genomes.is_empty() {
            create_seed_population(
                self.config.population_size,
                self.config.seed_ratio,
                self.config.player_count,
                &mut self.rng,
            )?
        } else {
            create_seed_population_from_genomes(
                &self.config.seed_genomes.clone(),
                self.config.population_size,
                self.config.seed_ratio,
                self.config.player_count,
                20,
                &mut self.rng,
            )?
        };
        self.population = Population::new(individuals);
        Ok(())
    }

    /// Evaluate every unevaluated individual in parallel. Evaluation seeds
    /// derive from the run seed and the genome id, so a re-run reproduces
    /// every score.
    pub fn evaluate_population(&mut self) {
        let base_seed = self.config.random_seed;
        let evaluator = self.evaluator.clone();
        let pending: Vec<(usize, Genome)> = self
            .population
            .individuals
            .iter()
            .enumerate()
            .filter(|(_, ind)| !ind.evaluated)
            .map(|(i, ind)| (i, ind.genome.clone()))
            .collect();
        if pending.is_empty() {
            return;
        }
        log::info!("evaluating {} individuals...", pending.len());

        let results: Vec<(usize, crate::evolution::fitness::FitnessResult)> =
            self.pool.install(|| {
                pending
                    .par_iter()
                    .map(|(idx, genome)| {
                        let seed = fork_seed(base_seed, id_hash(&genome.id));
                        (*idx, evaluator.evaluate(genome, seed))
                    })
                    .collect()
            });

        for (idx, result) in results {
            let individual = &mut self.population.individuals[idx];
            *individual = Individual::evaluated(
                individual.genome.clone(),
                result.fitness,
                result.metrics,
            );
        }
        log::info!(
            "evaluation complete, avg fitness {:.3}",
            self.population.average_fitness()
        );
    }

    /// Tournament of size k; ties go to the lower generation.
    pub fn tournament_selection(&mut self) -> Individual {
        let k = self.config.tournament_size.max(1);
        let mut best: Option<&Individual> = None;
        for _ in 0..k {
            let candidate = self
                .population
                .individuals
                .choose(&mut self.rng)
                .expect("non-empty population");
            best = Some(match best {
                None => candidate,
                Some(current) => {
                    if candidate.fitness > current.fitness
                        || (candidate.fitness == current.fitness
                            && candidate.genome.generation < current.genome.generation)
                    {
                        candidate
                    } else {
                        current
                    }
                }
            });
        }
        best.expect("tournament winner").clone()
    }

    /// Elites pass through verbatim; the rest come from crossover plus the
    /// active mutation pipeline.
    pub fn create_offspring(&mut self) -> Vec<Individual> {
        let n_elite =
            (self.config.population_size as f64 * self.config.elitism_rate) as usize;
        let mut offspring: Vec<Individual> = self
            .population
            .ranked()
            .into_iter()
            .take(n_elite)
            .cloned()
            .collect();

        let pipeline = if self.use_aggressive_mutation {
            self.aggressive_pipeline.clone()
        } else {
            self.pipeline.clone()
        };

        while offspring.len() < self.config.population_size {
            let parent1 = self.tournament_selection();
            let parent2 = self.tournament_selection();
            let (child1, child2) =
                self.crossover
                    .crossover(&parent1.genome, &parent2.genome, &mut self.rng);
            let child1 = pipeline.apply(&child1, &mut self.rng);
            let child2 = pipeline.apply(&child2, &mut self.rng);
            offspring.push(Individual::unevaluated(child1));
            if offspring.len() < self.config.population_size {
                offspring.push(Individual::unevaluated(child2));
            }
        }
        offspring.truncate(self.config.population_size);
        offspring
    }

    /// No meaningful improvement across the plateau window.
    pub fn check_plateau(&self) -> bool {
        let Some(window) = self.config.plateau_threshold else {
            return false;
        };
        if self.stats_history.len() < window as usize {
            return false;
        }
        let recent = &self.stats_history[self.stats_history.len() - window as usize..];
        let best_recent = recent
            .iter()
            .map(|s| s.best_fitness)
            .fold(f64::NEG_INFINITY, f64::max);
        let oldest = recent[0].best_fitness;
        if oldest == 0.0 {
            return false;
        }
        let improvement = (best_recent - oldest) / oldest;
        if improvement < self.config.improvement_threshold {
            log::info!(
                "plateau detected: {:.2}% improvement over {} generations",
                improvement * 100.0,
                window
            );
            return true;
        }
        false
    }

    /// Skill-evaluate the top slice and penalize first-player advantage and
    /// (style-dependent) the wrong end of the skill spectrum.
    pub fn evaluate_skill_and_penalize(&mut self, generation: u32) {
        if self.config.skill_eval_frequency == 0
            || generation % self.config.skill_eval_frequency != 0
        {
            return;
        }
        let n = ((self.population.individuals.len() as f64
            * self.config.skill_eval_top_percent) as usize)
            .max(1);
        let top_ids: Vec<String> = self
            .population
            .ranked()
            .into_iter()
            .take(n)
            .map(|ind| ind.genome.id.clone())
            .collect();
        log::info!("skill evaluation on top {} individuals", n);

        let uncached: Vec<Genome> = self
            .population
            .individuals
            .iter()
            .filter(|ind| {
                top_ids.contains(&ind.genome.id) && !self.skill_cache.contains_key(&ind.genome.id)
            })
            .map(|ind| ind.genome.clone())
            .collect();
        if !uncached.is_empty() {
            let config = SkillEvalConfig {
                num_games: self.config.skill_eval_games,
                mcts_iterations: self.config.skill_eval_mcts_iterations,
                timeout_secs: 30.0,
                base_seed: self.config.random_seed,
            };
            let results = self
                .pool
                .install(|| evaluate_batch_skill(&uncached, &config));
            for result in results {
                self.skill_cache.insert(result.genome_id.clone(), result);
            }
        }

        let is_party = self.config.fitness_style == FitnessStyle::Party;
        let mut penalties = 0;
        for individual in self.population.individuals.iter_mut() {
            let Some(skill) = self.skill_cache.get(&individual.genome.id) else {
                continue;
            };
            let mut multiplier = 1.0;
            if skill.first_player_advantage.abs() > self.config.fpa_penalty_threshold {
                multiplier *= 1.0 - self.config.fpa_penalty_weight;
            }
            if is_party {
                if skill.skill_score > self.config.high_skill_penalty_threshold {
                    multiplier *= 1.0 - self.config.high_skill_penalty_weight;
                }
            } else if skill.skill_score < self.config.low_skill_penalty_threshold {
                multiplier *= 1.0 - self.config.low_skill_penalty_weight;
            }
            if multiplier < 1.0 {
                individual.fitness *= multiplier;
                penalties += 1;
            }
        }
        log::info!("skill evaluation applied {} penalties", penalties);
    }

    /// Run the full loop. Returns per-generation stats via `stats_history`
    /// and the best-ever individual via `best_ever`.
    pub fn evolve(&mut self) -> Result<(), String> {
        if self.population.individuals.is_empty() {
            self.initialize_population()?;
        }
        self.evaluate_population();
        if self.config.skill_eval_frequency > 0 {
            self.evaluate_skill_and_penalize(0);
        }

        for generation in 0..self.config.max_generations {
            let best = self
                .population
                .best()
                .cloned()
                .ok_or("empty population")?;
            let avg = self.population.average_fitness();
            let diversity = self.population.diversity();

            if self
                .best_ever
                .as_ref()
                .map_or(true, |ever| best.fitness > ever.fitness)
            {
                log::info!(
                    "new best fitness {:.4} ({})",
                    best.fitness,
                    best.genome.id
                );
                self.best_ever = Some(best.clone());
            }

            self.stats_history.push(GenerationStats {
                generation,
                best_fitness: best.fitness,
                avg_fitness: avg,
                diversity,
                evaluations: self
                    .population
                    .individuals
                    .iter()
                    .filter(|i| i.evaluated)
                    .count(),
            });
            let mode = if self.use_aggressive_mutation {
                " [aggressive]"
            } else {
                ""
            };
            log::info!(
                "generation {}/{}: best {:.4}, avg {:.4}, diversity {:.4}{}",
                generation + 1,
                self.config.max_generations,
                best.fitness,
                avg,
                diversity,
                mode
            );

            // Diversity collapse flips the pipeline to aggressive rates;
            // recovery above 1.5x the threshold flips it back.
            if diversity < self.config.diversity_threshold {
                if !self.use_aggressive_mutation {
                    log::warn!(
                        "low diversity ({:.4}), switching to aggressive mutation",
                        diversity
                    );
                    self.use_aggressive_mutation = true;
                }
            } else if diversity > self.config.diversity_threshold * 1.5
                && self.use_aggressive_mutation
            {
                log::info!("diversity recovered ({:.4}), back to normal rates", diversity);
                self.use_aggressive_mutation = false;
            }

            if self.check_plateau() {
                break;
            }

            let offspring = self.create_offspring();
            let next_generation = generation + 1;
            self.population = Population::new(offspring);
            self.population.generation = next_generation;
            self.evaluate_population();
            self.evaluate_skill_and_penalize(next_generation);
        }

        if let Some(best) = &self.best_ever {
            log::info!(
                "evolution complete: best fitness {:.4} ({})",
                best.fitness,
                best.genome.id
            );
        }
        Ok(())
    }

    /// Top N individuals across the run, deduplicated by genome id.
    pub fn best_genomes(&self, n: usize) -> Vec<Individual> {
        let mut all: Vec<Individual> = self.best_ever.iter().cloned().collect();
        all.extend(self.population.individuals.iter().cloned());
        all.sort_by(|a, b| b.fitness.total_cmp(&a.fitness));
        let mut seen = std::collections::HashSet::new();
        let mut unique = Vec::new();
        for individual in all {
            if seen.insert(individual.genome.id.clone()) {
                unique.push(individual);
                if unique.len() >= n {
                    break;
                }
            }
        }
        unique
    }

    pub fn skill_result(&self, genome_id: &str) -> Option<&SkillEvalResult> {
        self.skill_cache.get(genome_id)
    }

    /// Draw a value from the engine RNG (exposed for seeding helpers).
    pub fn gen_seed(&mut self) -> u64 {
        self.rng.gen()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny_config() -> EvolutionConfig {
        EvolutionConfig {
            population_size: 8,
            max_generations: 2,
            num_simulations: 5,
            skill_eval_frequency: 0,
            random_seed: 42,
            workers: Some(2),
            ..EvolutionConfig::default()
        }
    }

    #[test]
    fn test_small_run_completes() {
        let mut engine = EvolutionEngine::new(tiny_config());
        engine.evolve().unwrap();
        assert_eq!(engine.stats_history.len(), 2);
        assert!(engine.best_ever.is_some());
        assert_eq!(engine.population.individuals.len(), 8);
    }

    #[test]
    fn test_offspring_preserves_population_size() {
        let mut engine = EvolutionEngine::new(tiny_config());
        engine.initialize_population().unwrap();
        engine.evaluate_population();
        let offspring = engine.create_offspring();
        assert_eq!(offspring.len(), 8);
    }

    #[test]
    fn test_best_genomes_deduplicated() {
        let mut engine = EvolutionEngine::new(tiny_config());
        engine.evolve().unwrap();
        let best = engine.best_genomes(5);
        let ids: std::collections::HashSet<&str> =
            best.iter().map(|i| i.genome.id.as_str()).collect();
        assert_eq!(ids.len(), best.len());
        for pair in best.windows(2) {
            assert!(pair[0].fitness >= pair[1].fitness);
        }
    }

    #[test]
    fn test_plateau_detection() {
        let mut engine = EvolutionEngine::new(EvolutionConfig {
            plateau_threshold: Some(3),
            ..tiny_config()
        });
        for generation in 0..3 {
            engine.stats_history.push(GenerationStats {
                generation,
                best_fitness: 0.5,
                avg_fitness: 0.3,
                diversity: 0.4,
                evaluations: 8,
            });
        }
        assert!(engine.check_plateau());
        engine.stats_history.push(GenerationStats {
            generation: 3,
            best_fitness: 0.9,
            avg_fitness: 0.4,
            diversity: 0.4,
            evaluations: 8,
        });
        assert!(!engine.check_plateau());
    }
}
