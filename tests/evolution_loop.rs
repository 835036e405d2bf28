//! Evolution-level scenarios: crossover shape, fitness quality gates, and a
//! short end-to-end run with artifacts.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tempfile::tempdir;

use deckforge::evolution::fitness::{FitnessEvaluator, FitnessStyle};
use deckforge::evolution::operators::CrossoverOperator;
use deckforge::evolution::records::{load_records, GenomeRecord, RunRecorder};
use deckforge::evolution::{EvolutionConfig, EvolutionEngine};
use deckforge::genome::examples;
use deckforge::simulation::batch::SimulationResults;

#[test]
fn crossover_children_inherit_and_rename() {
    let parent1 = examples::gin_rummy(); // draw, play, discard
    let parent2 = examples::crazy_eights(); // draw, play
    let mut rng = ChaCha8Rng::seed_from_u64(5);
    let op = CrossoverOperator::new(1.0);
    let (child1, child2) = op.crossover_at(&parent1, &parent2, 2, 1, &mut rng);

    assert_eq!(child1.turn_structure.phases.len(), 3);
    assert_eq!(child2.turn_structure.phases.len(), 2);
    assert!(child1.turn_structure.phases.len() <= 5);
    assert!(child2.turn_structure.phases.len() <= 5);

    assert_eq!(child1.generation, parent1.generation + 1);
    assert_eq!(child2.generation, parent2.generation + 1);
    assert_ne!(child1.id, child2.id);
    assert_ne!(child1.id, parent1.id);

    // Non-phase fields come from the respective parent.
    assert_eq!(child1.setup.cards_per_player, parent1.setup.cards_per_player);
    assert_eq!(child2.setup.cards_per_player, parent2.setup.cards_per_player);
}

#[test]
fn skipped_crossover_passes_parents_through() {
    let parent1 = examples::war();
    let parent2 = examples::hearts();
    let mut rng = ChaCha8Rng::seed_from_u64(5);
    let op = CrossoverOperator::new(0.0);
    let (child1, child2) = op.crossover(&parent1, &parent2, &mut rng);
    assert_eq!(child1, parent1);
    assert_eq!(child2, parent2);
}

#[test]
fn one_sided_wins_strictly_reduce_fitness() {
    // Two result sets identical except for the win distribution: the
    // genome dominated by one player must score strictly less.
    let template = |wins: Vec<u32>| SimulationResults {
        total_games: 100,
        player_count: 2,
        wins,
        total_turns: 4000,
        total_decisions: 3000,
        total_valid_moves: 9000,
        total_hand_size: 20000,
        total_interactions: 1000,
        total_actions: 3000,
        ..SimulationResults::default()
    };
    let evaluator = FitnessEvaluator::new(FitnessStyle::Balanced);
    let genome = examples::crazy_eights();
    let balanced = evaluator.evaluate(&genome, &template(vec![50, 50]));
    let dominated = evaluator.evaluate(&genome, &template(vec![85, 15]));
    assert!(
        dominated.total_fitness < balanced.total_fitness,
        "dominated {} vs balanced {}",
        dominated.total_fitness,
        balanced.total_fitness
    );
}

#[test]
fn short_run_produces_artifacts() {
    let config = EvolutionConfig {
        population_size: 6,
        max_generations: 2,
        num_simulations: 5,
        skill_eval_frequency: 0,
        random_seed: 7,
        workers: Some(2),
        ..EvolutionConfig::default()
    };
    let mut engine = EvolutionEngine::new(config);
    engine.evolve().expect("evolution run");

    let dir = tempdir().unwrap();
    let recorder = RunRecorder::create(dir.path()).unwrap();
    let records: Vec<GenomeRecord> = engine
        .best_genomes(5)
        .iter()
        .map(|individual| GenomeRecord::from_individual(individual, None))
        .collect();
    assert!(!records.is_empty());
    recorder.save_top(&records).unwrap();
    recorder.save_stats(&engine.stats_history).unwrap();

    let loaded = load_records(dir.path());
    assert_eq!(loaded.len(), records.len());
    assert!(recorder.run_dir.join("top5.md").exists());
    assert!(recorder.run_dir.join("generations.csv").exists());
}

#[test]
fn evolved_population_stays_structurally_valid() {
    let config = EvolutionConfig {
        population_size: 10,
        max_generations: 3,
        num_simulations: 5,
        skill_eval_frequency: 0,
        random_seed: 21,
        workers: Some(2),
        ..EvolutionConfig::default()
    };
    let mut engine = EvolutionEngine::new(config);
    engine.evolve().expect("evolution run");
    for individual in &engine.population.individuals {
        // Mutation can produce incoherent genomes (they score zero), but
        // player counts and team partitions must always stay legal for
        // the simulator's sake.
        assert!((2..=6).contains(&individual.genome.player_count));
        if individual.genome.team_mode {
            assert!(individual.genome.check_invariants().is_ok());
        }
    }
}

#[test]
fn elites_survive_verbatim() {
    let config = EvolutionConfig {
        population_size: 10,
        max_generations: 1,
        elitism_rate: 0.2,
        num_simulations: 5,
        skill_eval_frequency: 0,
        random_seed: 3,
        workers: Some(2),
        ..EvolutionConfig::default()
    };
    let mut engine = EvolutionEngine::new(config);
    engine.initialize_population().unwrap();
    engine.evaluate_population();
    let top_ids: Vec<String> = engine
        .population
        .ranked()
        .into_iter()
        .take(2)
        .map(|i| i.genome.id.clone())
        .collect();
    let offspring = engine.create_offspring();
    let offspring_ids: Vec<&str> = offspring.iter().map(|i| i.genome.id.as_str()).collect();
    for id in &top_ids {
        assert!(offspring_ids.contains(&id.as_str()), "elite {} was dropped", id);
    }
}

#[test]
fn evolution_is_reproducible_for_a_seed() {
    let config = EvolutionConfig {
        population_size: 8,
        max_generations: 2,
        num_simulations: 5,
        skill_eval_frequency: 0,
        random_seed: 11,
        workers: Some(2),
        ..EvolutionConfig::default()
    };
    let mut a = EvolutionEngine::new(config.clone());
    a.evolve().unwrap();
    let mut b = EvolutionEngine::new(config);
    b.evolve().unwrap();
    let stats_a: Vec<_> = a.stats_history.iter().map(|s| s.best_fitness).collect();
    let stats_b: Vec<_> = b.stats_history.iter().map(|s| s.best_fitness).collect();
    assert_eq!(stats_a, stats_b);
}

#[test]
fn skill_penalties_only_reduce_fitness() {
    let config = EvolutionConfig {
        population_size: 6,
        max_generations: 1,
        num_simulations: 5,
        skill_eval_frequency: 1,
        skill_eval_games: 4,
        skill_eval_mcts_iterations: 5,
        random_seed: 13,
        workers: Some(2),
        ..EvolutionConfig::default()
    };
    let mut engine = EvolutionEngine::new(config);
    engine.initialize_population().unwrap();
    engine.evaluate_population();
    let before: Vec<f64> = engine
        .population
        .individuals
        .iter()
        .map(|i| i.fitness)
        .collect();
    engine.evaluate_skill_and_penalize(0);
    for (individual, old) in engine.population.individuals.iter().zip(before) {
        assert!(individual.fitness <= old + 1e-12);
    }
}
