//! Bytecode round-trip property: decode(encode(g)) == g for the whole seed
//! library and for pipelines of mutated descendants.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use deckforge::genome::bytecode::{decode, encode, validate, BytecodeError, FORMAT_VERSION};
use deckforge::genome::examples;
use deckforge::evolution::operators::create_pipeline;

#[test]
fn round_trip_seed_library() {
    for genome in examples::seed_genomes() {
        let blob = encode(&genome);
        let decoded = decode(&blob).unwrap_or_else(|e| panic!("{}: {}", genome.id, e));
        assert_eq!(decoded, genome, "round trip failed for {}", genome.id);
    }
}

#[test]
fn round_trip_survives_mutation_pipelines() {
    let pipeline = create_pipeline(true, false);
    let mut rng = ChaCha8Rng::seed_from_u64(1234);
    for base in examples::seed_genomes() {
        let mut genome = base;
        for _ in 0..5 {
            genome = pipeline.apply(&genome, &mut rng);
            let blob = encode(&genome);
            let decoded = decode(&blob).expect("decode mutated genome");
            assert_eq!(decoded, genome);
            validate(&blob).expect("validator accepts freshly encoded blob");
        }
    }
}

#[test]
fn encoding_is_byte_identical_across_calls() {
    for genome in examples::seed_genomes() {
        assert_eq!(encode(&genome), encode(&genome));
    }
}

#[test]
fn version_byte_leads_the_header() {
    let blob = encode(&examples::spades());
    assert_eq!(blob[0], FORMAT_VERSION);
}

#[test]
fn corrupted_blobs_are_rejected_not_panicked() {
    let blob = encode(&examples::hearts());
    // Truncations at every prefix length must produce an error, never a
    // panic or a bogus genome.
    for len in 0..blob.len() {
        match decode(&blob[..len]) {
            Err(BytecodeError::Malformed { .. })
            | Err(BytecodeError::UnsupportedVersion { .. })
            | Err(BytecodeError::UnknownOpcode { .. }) => {}
            Ok(_) => panic!("decoded a truncated blob of length {}", len),
        }
    }
}
