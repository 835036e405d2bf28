//! Population seeding: known games replicated into a share of the slots,
//! the rest filled with mutated variants, optionally blended with a
//! diversity-selected subset of previous winners.

use std::collections::HashSet;

use rand::seq::SliceRandom;
use rand::Rng;

use crate::evolution::diversity::{population_diversity, select_diverse_subset};
use crate::evolution::naming::generate_unique_name;
use crate::evolution::operators::create_pipeline;
use crate::evolution::population::Individual;
use crate::genome::examples::seed_genomes;
use crate::genome::Genome;

/// Build the initial population from the built-in seed library.
pub fn create_seed_population<R: Rng>(
    size: usize,
    seed_ratio: f64,
    player_count: Option<u8>,
    rng: &mut R,
) -> Result<Vec<Individual>, String> {
    create_population_from(&seed_genomes(), size, seed_ratio, player_count, rng)
}

/// Build the initial population from previous winners plus the seed
/// library. Previous winners are reduced to a structurally diverse subset
/// first so a converged earlier run cannot flood the new population.
pub fn create_seed_population_from_genomes<R: Rng>(
    previous: &[Genome],
    size: usize,
    seed_ratio: f64,
    player_count: Option<u8>,
    max_from_previous: usize,
    rng: &mut R,
) -> Result<Vec<Individual>, String> {
    if previous.is_empty() {
        return Err("no base genomes provided".to_string());
    }
    let diverse = if previous.len() > max_from_previous {
        let subset = select_diverse_subset(previous, max_from_previous, rng);
        log::info!(
            "diversity selection: {} -> {} genomes (diversity {:.3} -> {:.3})",
            previous.len(),
            subset.len(),
            population_diversity(&previous[..max_from_previous.min(previous.len())]),
            population_diversity(&subset),
        );
        subset
    } else {
        previous.to_vec()
    };

    // Always mix the example games back in for structural variety,
    // deduplicated by id.
    let mut seen: HashSet<String> = HashSet::new();
    let mut combined: Vec<Genome> = Vec::new();
    for genome in diverse.into_iter().chain(seed_genomes()) {
        if seen.insert(genome.id.clone()) {
            combined.push(genome);
        }
    }
    create_population_from(&combined, size, seed_ratio, player_count, rng)
}

fn create_population_from<R: Rng>(
    base: &[Genome],
    size: usize,
    seed_ratio: f64,
    player_count: Option<u8>,
    rng: &mut R,
) -> Result<Vec<Individual>, String> {
    let mut base: Vec<Genome> = base.to_vec();
    if let Some(count) = player_count {
        base.retain(|g| g.player_count == count);
        if base.is_empty() {
            return Err(format!("no seed games with player_count = {}", count));
        }
    }

    let n_seeds = (size as f64 * seed_ratio) as usize;
    let n_mutants = size - n_seeds;
    let mut used_names: HashSet<String> = HashSet::new();
    let mut population = Vec::with_capacity(size);

    // Known games, replicated to fill the seed slots; each copy gets its
    // own id so the fitness cache treats them independently.
    for i in 0..n_seeds {
        let mut genome = base[i % base.len()].clone();
        let name = generate_unique_name(rng, &used_names);
        used_names.insert(name.clone());
        genome.id = name;
        population.push(Individual::unevaluated(genome));
    }

    // Mutated variants: 2-6 pipeline rounds each for exploration.
    let pipeline = create_pipeline(false, player_count.is_some());
    for _ in 0..n_mutants {
        let mut mutated = base.choose(rng).unwrap().clone();
        let rounds = rng.gen_range(2..=6);
        for _ in 0..rounds {
            mutated = pipeline.apply(&mutated, rng);
        }
        let name = generate_unique_name(rng, &used_names);
        used_names.insert(name.clone());
        mutated.id = name;
        mutated.generation = 0;
        population.push(Individual::unevaluated(mutated));
    }

    population.shuffle(rng);
    Ok(population)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genome::examples;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_population_size_and_unique_ids() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let population = create_seed_population(50, 0.3, None, &mut rng).unwrap();
        assert_eq!(population.len(), 50);
        let ids: HashSet<&str> = population
            .iter()
            .map(|i| i.genome.id.as_str())
            .collect();
        assert_eq!(ids.len(), 50);
        assert!(population.iter().all(|i| !i.evaluated));
    }

    #[test]
    fn test_player_count_filter() {
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let population = create_seed_population(20, 1.0, Some(4), &mut rng).unwrap();
        assert!(population.iter().all(|i| i.genome.player_count == 4));
    }

    #[test]
    fn test_player_count_filter_errors_when_empty() {
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        assert!(create_seed_population(20, 1.0, Some(6), &mut rng).is_err());
    }

    #[test]
    fn test_seeding_from_previous_winners() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let previous = vec![examples::war(), examples::hearts()];
        let population =
            create_seed_population_from_genomes(&previous, 30, 0.5, None, 20, &mut rng)
                .unwrap();
        assert_eq!(population.len(), 30);
    }

    #[test]
    fn test_seeding_is_deterministic() {
        let a = create_seed_population(20, 0.3, None, &mut ChaCha8Rng::seed_from_u64(9)).unwrap();
        let b = create_seed_population(20, 0.3, None, &mut ChaCha8Rng::seed_from_u64(9)).unwrap();
        let ids_a: Vec<&str> = a.iter().map(|i| i.genome.id.as_str()).collect();
        let ids_b: Vec<&str> = b.iter().map(|i| i.genome.id.as_str()).collect();
        assert_eq!(ids_a, ids_b);
    }
}
