//! Final ordering and truncation of deduplicated candidates

use crate::backend::{RerankHit, RerankModel};
use crate::retrieval::{CandidateDocument, RetrievalResult};
use std::sync::Arc;

/// Reorders candidates with an optional rerank model, capping at `final_k`
pub struct Reranker {
    model: Option<Arc<dyn RerankModel>>,
    final_k: usize,
}

impl Reranker {
    pub fn new(model: Option<Arc<dyn RerankModel>>, final_k: usize) -> Self {
        Self { model, final_k }
    }

    /// Produce the final context set for `question`.
    ///
    /// Without a model, or when the model fails or returns nothing usable, the
    /// first `final_k` candidates are kept in their current order.
    pub async fn rerank(&self, question: &str, candidates: Vec<CandidateDocument>) -> RetrievalResult {
        let model = match &self.model {
            Some(model) if !candidates.is_empty() => model,
            _ => return self.truncate(candidates),
        };

        let texts: Vec<String> = candidates.iter().map(|c| c.content.clone()).collect();
        let top_n = self.final_k.min(candidates.len());

        let hits = match model.rerank(question, &texts, top_n).await {
            Ok(hits) => hits,
            Err(e) => {
                tracing::warn!("Rerank with {} failed: {}", model.model_name(), e);
                return self.truncate(candidates);
            }
        };

        let reranked = apply_hits(&candidates, &hits);
        if reranked.is_empty() {
            tracing::warn!(
                "Rerank with {} returned no usable results ({} hits)",
                model.model_name(),
                hits.len()
            );
            return self.truncate(candidates);
        }

        tracing::debug!("Reranked {} candidates to {}", candidates.len(), reranked.len());
        RetrievalResult::capped(reranked, self.final_k)
    }

    fn truncate(&self, candidates: Vec<CandidateDocument>) -> RetrievalResult {
        RetrievalResult::capped(candidates, self.final_k)
    }
}

/// Map hits back to candidates by position, attaching the relevance score.
/// Out-of-range and repeated indices are dropped.
fn apply_hits(candidates: &[CandidateDocument], hits: &[RerankHit]) -> Vec<CandidateDocument> {
    let mut used = vec![false; candidates.len()];

    hits.iter()
        .filter_map(|hit| {
            let slot = used.get_mut(hit.index)?;
            if *slot {
                return None;
            }
            *slot = true;
            let mut candidate = candidates[hit.index].clone();
            candidate.set_rerank_score(hit.relevance_score);
            Some(candidate)
        })
        .collect()
}
