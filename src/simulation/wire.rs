//! Language-neutral batch request/response contract.
//!
//! A request carries a genome bytecode blob, game count, AI selection and a
//! base seed; the response carries the full aggregated statistics. Only the
//! semantics are contractual; the serde derives give a JSON transport for
//! free. Decoded genomes are cached by blob hash so repeated requests for
//! the same genome skip the codec.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::ai::{parse_ai, AiKind};
use crate::genome::bytecode::{decode, BytecodeError};
use crate::genome::Genome;
use crate::simulation::batch::{run_batch, BatchConfig, SimulationResults};

/// A batch simulation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchRequest {
    /// Compiled genome (bytecode v2).
    pub genome_bytecode: Vec<u8>,
    pub num_games: u32,
    /// AI selector: `random`, `greedy`, `mcts`, `mcts500`, ...
    pub ai_type: String,
    pub mcts_iterations: u32,
    pub random_seed: u64,
}

/// Aggregated statistics for one request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResponse {
    pub wins: Vec<u32>,
    pub team_wins: Vec<u32>,
    pub draws: u32,
    pub errors: u32,
    pub avg_turns: f64,
    pub total_decisions: u64,
    pub total_valid_moves: u64,
    pub forced_decisions: u64,
    pub total_hand_size: u64,
    pub total_interactions: u64,
    pub total_actions: u64,
    pub total_claims: u64,
    pub total_bluffs: u64,
    pub total_challenges: u64,
    pub successful_bluffs: u64,
    pub successful_catches: u64,
    pub total_bets: u64,
    pub betting_bluffs: u64,
    pub fold_wins: u64,
    pub showdown_wins: u64,
    pub all_in_count: u64,
    pub lead_changes: u64,
    pub decisive_turn_pct: f64,
    pub closest_margin: f64,
    pub trailing_winners: u32,
}

impl From<&SimulationResults> for BatchResponse {
    fn from(results: &SimulationResults) -> Self {
        BatchResponse {
            wins: results.wins.clone(),
            team_wins: results.team_wins.clone(),
            draws: results.draws,
            errors: results.errors,
            avg_turns: results.avg_turns(),
            total_decisions: results.total_decisions,
            total_valid_moves: results.total_valid_moves,
            forced_decisions: results.forced_decisions,
            total_hand_size: results.total_hand_size,
            total_interactions: results.total_interactions,
            total_actions: results.total_actions,
            total_claims: results.total_claims,
            total_bluffs: results.total_bluffs,
            total_challenges: results.total_challenges,
            successful_bluffs: results.successful_bluffs,
            successful_catches: results.successful_catches,
            total_bets: results.total_bets,
            betting_bluffs: results.betting_bluffs,
            fold_wins: results.fold_wins,
            showdown_wins: results.showdown_wins,
            all_in_count: results.all_in_count,
            lead_changes: results.lead_changes,
            decisive_turn_pct: results.decisive_turn_pct(),
            closest_margin: results.closest_margin(),
            trailing_winners: results.trailing_winners,
        }
    }
}

/// Decoded-genome cache keyed by blob content hash. A mutation produces a
/// new id, which changes the blob, which changes the key.
#[derive(Debug, Default)]
pub struct BytecodeCache {
    entries: Mutex<HashMap<u64, Arc<Genome>>>,
}

impl BytecodeCache {
    pub fn new() -> Self {
        BytecodeCache::default()
    }

    fn blob_hash(blob: &[u8]) -> u64 {
        // FNV-1a over the whole blob.
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in blob {
            hash ^= u64::from(*byte);
            hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
        }
        hash
    }

    /// Decode a blob, reusing a previous decode of identical bytes.
    pub fn decode(&self, blob: &[u8]) -> Result<Arc<Genome>, BytecodeError> {
        let key = Self::blob_hash(blob);
        if let Some(genome) = self.entries.lock().unwrap().get(&key) {
            return Ok(Arc::clone(genome));
        }
        let genome = Arc::new(decode(blob)?);
        self.entries
            .lock()
            .unwrap()
            .insert(key, Arc::clone(&genome));
        Ok(genome)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Serve one batch request: decode (or reuse) the genome, run the batch,
/// aggregate.
pub fn serve_request(
    request: &BatchRequest,
    cache: &BytecodeCache,
) -> Result<BatchResponse, BytecodeError> {
    let genome = cache.decode(&request.genome_bytecode)?;
    let ai = match parse_ai(&request.ai_type) {
        Some(AiKind::Mcts(_)) if request.mcts_iterations > 0 => {
            AiKind::Mcts(request.mcts_iterations)
        }
        Some(kind) => kind,
        None => AiKind::Random,
    };
    let config = BatchConfig::new(
        request.num_games,
        request.random_seed,
        ai,
        genome.player_count,
    );
    let results = run_batch(&genome, &config);
    Ok(BatchResponse::from(&results))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genome::bytecode::encode;
    use crate::genome::examples;

    fn request(num_games: u32, seed: u64) -> BatchRequest {
        BatchRequest {
            genome_bytecode: encode(&examples::war()),
            num_games,
            ai_type: "random".to_string(),
            mcts_iterations: 0,
            random_seed: seed,
        }
    }

    #[test]
    fn test_serve_request_round_trip() {
        let cache = BytecodeCache::new();
        let response = serve_request(&request(30, 42), &cache).unwrap();
        assert_eq!(response.wins.len(), 2);
        assert_eq!(
            response.wins.iter().sum::<u32>() + response.draws + response.errors,
            30
        );
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_cache_reused_across_requests() {
        let cache = BytecodeCache::new();
        serve_request(&request(5, 1), &cache).unwrap();
        serve_request(&request(5, 2), &cache).unwrap();
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_identical_requests_identical_responses() {
        let cache = BytecodeCache::new();
        let a = serve_request(&request(20, 9), &cache).unwrap();
        let b = serve_request(&request(20, 9), &cache).unwrap();
        assert_eq!(a.wins, b.wins);
        assert_eq!(a.total_actions, b.total_actions);
    }

    #[test]
    fn test_malformed_blob_rejected() {
        let cache = BytecodeCache::new();
        let mut bad = request(5, 1);
        bad.genome_bytecode.truncate(10);
        assert!(serve_request(&bad, &cache).is_err());
    }

    #[test]
    fn test_request_survives_json() {
        let original = request(10, 3);
        let json = serde_json::to_string(&original).unwrap();
        let parsed: BatchRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.genome_bytecode, original.genome_bytecode);
        assert_eq!(parsed.num_games, 10);
    }
}
