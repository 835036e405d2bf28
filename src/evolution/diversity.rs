//! Structural diversity: feature extraction, pairwise distance, population
//! diversity, and greedy farthest-point subset selection for seeding from
//! previous winners.

use std::collections::BTreeSet;

use rand::Rng;

use crate::genome::conditions::ConditionKind;
use crate::genome::schema::{Genome, Phase};

/// Fixed-width structural fingerprint of a genome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenomeFeatures {
    pub phase_types: BTreeSet<u8>,
    pub num_phases: usize,
    pub is_trick_based: bool,
    pub has_trump: bool,
    pub has_bluffing: bool,
    pub player_count: u8,
    pub cards_per_player: u8,
    pub win_kinds: BTreeSet<u8>,
    pub condition_kinds: BTreeSet<u8>,
    /// 0: <100, 1: 100-500, 2: 500-1000, 3: ≥1000.
    pub max_turns_bucket: u8,
}

pub fn extract_features(genome: &Genome) -> GenomeFeatures {
    let mut phase_types = BTreeSet::new();
    let mut has_trump = genome.setup.trump_suit.is_some();
    let mut has_bluffing = false;
    let mut condition_kinds: BTreeSet<ConditionKind> = BTreeSet::new();

    for phase in &genome.turn_structure.phases {
        phase_types.insert(phase.type_tag());
        match phase {
            Phase::Trick(trick) if trick.trump_suit.is_some() => has_trump = true,
            Phase::Claim(_) => has_bluffing = true,
            _ => {}
        }
        match phase {
            Phase::Play(p) => {
                if let Some(cond) = &p.valid_play_condition {
                    cond.collect_kinds(&mut condition_kinds);
                }
            }
            Phase::Draw(p) => {
                if let Some(cond) = &p.condition {
                    cond.collect_kinds(&mut condition_kinds);
                }
            }
            Phase::Discard(p) => {
                if let Some(cond) = &p.matching_condition {
                    cond.collect_kinds(&mut condition_kinds);
                }
            }
            _ => {}
        }
    }

    let max_turns_bucket = match genome.max_turns {
        0..=99 => 0,
        100..=499 => 1,
        500..=999 => 2,
        _ => 3,
    };

    GenomeFeatures {
        phase_types,
        num_phases: genome.turn_structure.phases.len(),
        is_trick_based: genome.turn_structure.is_trick_based,
        has_trump,
        has_bluffing,
        player_count: genome.player_count,
        cards_per_player: genome.setup.cards_per_player,
        win_kinds: genome.win_conditions.iter().map(|wc| wc.kind.code()).collect(),
        condition_kinds: condition_kinds.iter().map(|k| k.opcode()).collect(),
        max_turns_bucket,
    }
}

fn jaccard_distance(a: &BTreeSet<u8>, b: &BTreeSet<u8>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 0.0;
    }
    let union = a.union(b).count() as f64;
    let intersection = a.intersection(b).count() as f64;
    1.0 - intersection / union
}

/// Structural distance in [0, 1]: weighted Jaccard over the type sets plus
/// normalized numeric differences.
pub fn compute_distance(a: &GenomeFeatures, b: &GenomeFeatures) -> f64 {
    let distances = [
        jaccard_distance(&a.phase_types, &b.phase_types) * 1.5,
        jaccard_distance(&a.win_kinds, &b.win_kinds),
        jaccard_distance(&a.condition_kinds, &b.condition_kinds) * 1.2,
        f64::from(a.is_trick_based != b.is_trick_based),
        f64::from(a.has_trump != b.has_trump),
        f64::from(a.has_bluffing != b.has_bluffing),
        (a.player_count as f64 - b.player_count as f64).abs() / 3.0,
        ((a.cards_per_player as f64 - b.cards_per_player as f64).abs() / 20.0).min(1.0),
        (a.num_phases as f64 - b.num_phases as f64).abs() / 5.0,
        (a.max_turns_bucket as f64 - b.max_turns_bucket as f64).abs() / 3.0,
    ];
    distances.iter().sum::<f64>() / distances.len() as f64
}

/// Mean pairwise distance; 0 for degenerate populations.
pub fn population_diversity(genomes: &[Genome]) -> f64 {
    if genomes.len() < 2 {
        return 0.0;
    }
    let features: Vec<GenomeFeatures> = genomes.iter().map(extract_features).collect();
    let mut total = 0.0;
    let mut count = 0u32;
    for i in 0..features.len() {
        for j in i + 1..features.len() {
            total += compute_distance(&features[i], &features[j]);
            count += 1;
        }
    }
    total / count as f64
}

/// Greedy farthest-point sampling: start from a random pick, then keep
/// adding the genome farthest from everything already selected.
pub fn select_diverse_subset<R: Rng>(
    genomes: &[Genome],
    target_size: usize,
    rng: &mut R,
) -> Vec<Genome> {
    if genomes.len() <= target_size {
        return genomes.to_vec();
    }
    let features: Vec<GenomeFeatures> = genomes.iter().map(extract_features).collect();
    let n = genomes.len();
    let mut selected: Vec<usize> = vec![rng.gen_range(0..n)];
    let mut remaining: Vec<usize> = (0..n).filter(|i| *i != selected[0]).collect();

    while selected.len() < target_size && !remaining.is_empty() {
        let (pos, _) = remaining
            .iter()
            .enumerate()
            .map(|(pos, &candidate)| {
                let min_dist = selected
                    .iter()
                    .map(|&sel| compute_distance(&features[candidate], &features[sel]))
                    .fold(f64::INFINITY, f64::min);
                (pos, min_dist)
            })
            .fold((0, f64::NEG_INFINITY), |best, (pos, dist)| {
                if dist > best.1 {
                    (pos, dist)
                } else {
                    best
                }
            });
        selected.push(remaining.remove(pos));
    }
    selected.into_iter().map(|i| genomes[i].clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genome::examples;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_identical_genomes_have_zero_distance() {
        let features = extract_features(&examples::war());
        assert_eq!(compute_distance(&features, &features), 0.0);
    }

    #[test]
    fn test_war_and_hearts_are_far_apart() {
        let war = extract_features(&examples::war());
        let hearts = extract_features(&examples::hearts());
        assert!(compute_distance(&war, &hearts) > 0.3);
    }

    #[test]
    fn test_seed_library_is_diverse() {
        let diversity = population_diversity(&examples::seed_genomes());
        assert!(diversity > 0.2, "seed library diversity: {}", diversity);
    }

    #[test]
    fn test_uniform_population_has_low_diversity() {
        let clones = vec![examples::war(); 10];
        assert_eq!(population_diversity(&clones), 0.0);
    }

    #[test]
    fn test_farthest_point_selection_beats_prefix() {
        // Many similar genomes plus a few outliers: the diverse subset
        // should be at least as spread out as the arbitrary prefix.
        let mut pool = vec![examples::war(); 8];
        pool.push(examples::hearts());
        pool.push(examples::simple_poker());
        pool.push(examples::cheat());
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let subset = select_diverse_subset(&pool, 4, &mut rng);
        assert_eq!(subset.len(), 4);
        let selected_diversity = population_diversity(&subset);
        let prefix_diversity = population_diversity(&pool[..4]);
        assert!(selected_diversity >= prefix_diversity);
    }
}
