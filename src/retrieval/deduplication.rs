//! Candidate deduplication across retrieval strategies

use crate::retrieval::{CandidateDocument, DedupKey};
use ahash::{HashSet, HashSetExt};

/// Deduplicate candidates by identity, keeping the first occurrence
///
/// # Arguments
/// * `candidates` - Candidate pool in strategy order (base, variants, HyDE)
///
/// # Returns
/// Identity-unique candidates in their original relative order
pub fn deduplicate_candidates(candidates: Vec<CandidateDocument>) -> Vec<CandidateDocument> {
    let mut seen: HashSet<DedupKey> = HashSet::new();

    candidates
        .into_iter()
        .filter(|candidate| seen.insert(candidate.dedup_key()))
        .collect()
}
