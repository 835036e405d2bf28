//! Readable genome ids: `adjective-noun-hex`, drawn from the evolution RNG
//! so a seeded run always names its offspring the same way.

use rand::Rng;
use std::collections::HashSet;

const ADJECTIVES: &[&str] = &[
    "amber", "bold", "brisk", "calico", "crimson", "dusty", "eager", "feral", "gilded",
    "hollow", "ivory", "jagged", "keen", "lively", "molten", "nimble", "opal", "pale",
    "quiet", "rustic", "silent", "tidal", "umber", "velvet", "wild", "zesty",
];

const NOUNS: &[&str] = &[
    "ace", "badger", "banner", "cipher", "drake", "ember", "falcon", "gambit", "harbor",
    "ibis", "joker", "knave", "lantern", "meadow", "nomad", "orchid", "pivot", "quarry",
    "raven", "sparrow", "trick", "vane", "wager", "yarrow", "zephyr",
];

/// Generate a fresh readable name.
pub fn generate_name<R: Rng>(rng: &mut R) -> String {
    let adjective = ADJECTIVES[rng.gen_range(0..ADJECTIVES.len())];
    let noun = NOUNS[rng.gen_range(0..NOUNS.len())];
    let tag: u16 = rng.gen();
    format!("{}-{}-{:04x}", adjective, noun, tag)
}

/// Generate a name not present in `used` (callers insert the result).
pub fn generate_unique_name<R: Rng>(rng: &mut R, used: &HashSet<String>) -> String {
    loop {
        let name = generate_name(rng);
        if !used.contains(&name) {
            return name;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_names_are_deterministic_per_seed() {
        let mut a = ChaCha8Rng::seed_from_u64(1);
        let mut b = ChaCha8Rng::seed_from_u64(1);
        assert_eq!(generate_name(&mut a), generate_name(&mut b));
    }

    #[test]
    fn test_unique_name_avoids_collisions() {
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let mut used = HashSet::new();
        for _ in 0..100 {
            let name = generate_unique_name(&mut rng, &used);
            assert!(used.insert(name));
        }
    }
}
