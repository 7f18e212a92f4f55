//! Multi-strategy candidate generation: base search, query fusion and HyDE

use crate::backend::{ChatModel, VectorStore};
use crate::config::RetrievalConfig;
use crate::error::{RagError, Result};
use crate::retrieval::parse::parse_variants;
use crate::retrieval::{CandidateDocument, Prompts, Query};
use futures::future::join_all;
use std::sync::Arc;

/// Issues every enabled retrieval strategy and concatenates their results
pub struct CandidateGenerator {
    store: Arc<dyn VectorStore>,
    chat: Arc<dyn ChatModel>,
    prompts: Prompts,
    config: RetrievalConfig,
}

impl CandidateGenerator {
    pub fn new(
        store: Arc<dyn VectorStore>,
        chat: Arc<dyn ChatModel>,
        prompts: Prompts,
        config: RetrievalConfig,
    ) -> Self {
        Self {
            store,
            chat,
            prompts,
            config,
        }
    }

    /// Generate the candidate pool for `query`.
    ///
    /// Fills in `query.variants` and `query.hypothetical_document` and returns
    /// candidates concatenated in strategy order: base, each variant, HyDE.
    /// Only a failing base search is an error.
    pub async fn generate(&self, query: &mut Query) -> Result<Vec<CandidateDocument>> {
        let question = query.rewritten.as_str();
        let k = self.config.primary_k;

        // Step 1: base search and the generation calls are independent
        let (base, variants, hypothetical) = tokio::join!(
            self.store.similarity_search(question, k),
            self.generate_variants(question),
            self.generate_hypothetical(question),
        );

        let mut candidates = base.map_err(RagError::Retrieval)?;
        tracing::debug!("Base query returned {} candidates", candidates.len());

        // Step 2: secondary searches, joined before anything is concatenated
        let variant_searches = join_all(
            variants
                .iter()
                .map(|variant| self.secondary_search("variant", variant)),
        );
        let hyde_search = async {
            match &hypothetical {
                Some(document) => self.secondary_search("hyde", document).await,
                None => Vec::new(),
            }
        };
        let (variant_results, hyde_results) = tokio::join!(variant_searches, hyde_search);

        // Step 3: concatenate in strategy order
        for (variant, docs) in variants.iter().zip(variant_results) {
            tracing::debug!("Variant '{}' returned {} candidates", variant, docs.len());
            candidates.extend(docs);
        }
        if hypothetical.is_some() {
            tracing::debug!("HyDE returned {} candidates", hyde_results.len());
        }
        candidates.extend(hyde_results);

        query.variants = variants;
        query.hypothetical_document = hypothetical;

        Ok(candidates)
    }

    async fn generate_variants(&self, question: &str) -> Vec<String> {
        if !self.config.enable_query_fusion {
            return Vec::new();
        }

        let count = self.config.fusion_variant_count;
        let messages = self.prompts.fusion(question, count);
        match self.chat.invoke(&messages).await {
            Ok(response) => {
                let variants = parse_variants(&response.flatten(), question, count);
                tracing::debug!("Generated {} query variants", variants.len());
                variants
            }
            Err(e) => {
                tracing::warn!("Query fusion failed, continuing without variants: {}", e);
                Vec::new()
            }
        }
    }

    async fn generate_hypothetical(&self, question: &str) -> Option<String> {
        if !self.config.enable_hyde {
            return None;
        }

        let messages = self.prompts.hyde(question);
        match self.chat.invoke(&messages).await {
            Ok(response) => {
                let document = response.flatten().trim().to_string();
                tracing::debug!("Generated HyDE document length={}", document.len());
                Some(document).filter(|d| !d.is_empty())
            }
            Err(e) => {
                tracing::warn!("HyDE generation failed, continuing without it: {}", e);
                None
            }
        }
    }

    /// Search for a non-base strategy; failures contribute no candidates
    async fn secondary_search(&self, strategy: &str, text: &str) -> Vec<CandidateDocument> {
        match self.store.similarity_search(text, self.config.primary_k).await {
            Ok(docs) => docs,
            Err(e) => {
                tracing::warn!("{} search failed, skipping: {}", strategy, e);
                Vec::new()
            }
        }
    }
}
