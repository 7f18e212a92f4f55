//! Cross-encoder reranking using FastEmbed

use super::{BackendError, RerankHit, RerankModel};
use async_trait::async_trait;
use fastembed::{RerankInitOptions, RerankerModel, TextRerank};
use std::sync::Arc;

/// Local cross-encoder reranker
pub struct FastEmbedReranker {
    model: Arc<TextRerank>,
    model_name: String,
}

impl FastEmbedReranker {
    /// Create a new reranker with specified model
    ///
    /// # Arguments
    /// * `model_name` - Model id (e.g., "BAAI/bge-reranker-base")
    pub fn new(model_name: &str) -> Result<Self, BackendError> {
        let reranker_model = match model_name {
            "BAAI/bge-reranker-base" | "bge-reranker-base" => RerankerModel::BGERerankerBase,
            "BAAI/bge-reranker-v2-m3" | "bge-reranker-v2-m3" => RerankerModel::BGERerankerV2M3,
            "jinaai/jina-reranker-v1-turbo-en" | "jina-reranker-v1-turbo-en" => {
                RerankerModel::JINARerankerV1TurboEn
            }
            _ => {
                return Err(BackendError::Initialization(format!(
                    "Unsupported rerank model: {}. Supported: BAAI/bge-reranker-base, BAAI/bge-reranker-v2-m3, jinaai/jina-reranker-v1-turbo-en",
                    model_name
                )));
            }
        };

        tracing::info!("Initializing reranker model: {}", model_name);

        let init_options =
            RerankInitOptions::new(reranker_model).with_show_download_progress(true);

        let model = TextRerank::try_new(init_options)
            .map_err(|e| BackendError::Initialization(e.to_string()))?;

        Ok(Self {
            model: Arc::new(model),
            model_name: model_name.to_string(),
        })
    }
}

#[async_trait]
impl RerankModel for FastEmbedReranker {
    async fn rerank(
        &self,
        query: &str,
        documents: &[String],
        top_n: usize,
    ) -> Result<Vec<RerankHit>, BackendError> {
        if documents.is_empty() {
            return Ok(Vec::new());
        }

        if query.is_empty() {
            return Err(BackendError::InvalidInput(
                "Query cannot be empty".to_string(),
            ));
        }

        let model = Arc::clone(&self.model);
        let query = query.to_string();
        let documents = documents.to_vec();

        // Cross-encoder inference is CPU bound
        let results = tokio::task::spawn_blocking(move || {
            let refs: Vec<&str> = documents.iter().map(String::as_str).collect();
            model.rerank(query.as_str(), refs, false, None)
        })
        .await
        .map_err(|e| BackendError::Request(e.to_string()))?
        .map_err(|e| BackendError::Request(e.to_string()))?;

        let mut hits: Vec<RerankHit> = results
            .into_iter()
            .map(|r| RerankHit {
                index: r.index,
                relevance_score: r.score,
            })
            .collect();

        // Sort by score descending
        hits.sort_by(|a, b| {
            b.relevance_score
                .partial_cmp(&a.relevance_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(top_n);

        Ok(hits)
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}
