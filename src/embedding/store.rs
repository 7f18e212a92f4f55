//! In-memory vector store over a pre-chunked JSON Lines corpus

use super::{EmbeddingProvider, VectorIndex};
use crate::backend::{BackendError, VectorStore};
use crate::config::StoreConfig;
use crate::error::{RagError, Result};
use crate::retrieval::CandidateDocument;
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

/// Metadata key carrying the similarity score of a search hit
pub const SIMILARITY_KEY: &str = "similarity";

/// Vector store holding documents and their HNSW index in memory
pub struct MemoryVectorStore {
    documents: Vec<CandidateDocument>,
    index: VectorIndex,
    provider: Arc<dyn EmbeddingProvider>,
    ef_search: usize,
}

impl MemoryVectorStore {
    /// Embed and index `documents`
    pub fn build(
        documents: Vec<CandidateDocument>,
        provider: Arc<dyn EmbeddingProvider>,
        config: &StoreConfig,
    ) -> Result<Self> {
        let mut index = VectorIndex::new(
            provider.dimension(),
            documents.len(),
            config.hnsw_m,
            config.hnsw_ef_construction,
        );

        let texts: Vec<String> = documents.iter().map(|d| d.content.clone()).collect();
        let embeddings = provider
            .embed_batch(&texts)
            .map_err(|e| BackendError::Initialization(e.to_string()))?;

        for (id, embedding) in embeddings.iter().enumerate() {
            index
                .insert(id, embedding)
                .map_err(|e| BackendError::Initialization(e.to_string()))?;
        }

        tracing::info!(
            "Indexed {} documents with {}",
            index.len(),
            provider.model_name()
        );

        Ok(Self {
            documents,
            index,
            provider,
            ef_search: config.hnsw_ef_search,
        })
    }

    /// Load a corpus file and index it
    pub fn from_corpus(
        path: &Path,
        provider: Arc<dyn EmbeddingProvider>,
        config: &StoreConfig,
    ) -> Result<Self> {
        let documents = load_corpus(path)?;
        Self::build(documents, provider, config)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    fn search_embedding(
        &self,
        embedding: &[f32],
        k: usize,
    ) -> std::result::Result<Vec<CandidateDocument>, BackendError> {
        let hits = self
            .index
            .search(embedding, k, self.ef_search)
            .map_err(|e| BackendError::Request(e.to_string()))?;

        Ok(hits
            .into_iter()
            .filter_map(|hit| {
                let mut doc = self.documents.get(hit.id)?.clone();
                doc.metadata
                    .insert(SIMILARITY_KEY.to_string(), serde_json::json!(hit.score));
                Some(doc)
            })
            .take(k)
            .collect())
    }
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn similarity_search(
        &self,
        query: &str,
        k: usize,
    ) -> std::result::Result<Vec<CandidateDocument>, BackendError> {
        let provider = Arc::clone(&self.provider);
        let text = query.to_string();

        // Embedding inference is CPU bound
        let embedding = tokio::task::spawn_blocking(move || provider.embed(&text))
            .await
            .map_err(|e| BackendError::Request(e.to_string()))?
            .map_err(|e| BackendError::InvalidInput(e.to_string()))?;

        self.search_embedding(&embedding, k)
    }
}

/// Read a JSON Lines corpus of `{"content": ..., "metadata": {...}}` records.
/// Blank lines are skipped.
pub fn load_corpus(path: &Path) -> Result<Vec<CandidateDocument>> {
    let content = std::fs::read_to_string(path).map_err(|e| RagError::Io {
        source: e,
        context: format!("Failed to read corpus file: {:?}", path),
    })?;

    let mut documents = Vec::new();
    for (line_no, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let doc: CandidateDocument = serde_json::from_str(line).map_err(|e| RagError::Json {
            source: e,
            context: format!("Invalid corpus record at {:?}:{}", path, line_no + 1),
        })?;
        if doc.content.trim().is_empty() {
            tracing::warn!("Skipping empty corpus record at line {}", line_no + 1);
            continue;
        }
        documents.push(doc);
    }

    Ok(documents)
}
