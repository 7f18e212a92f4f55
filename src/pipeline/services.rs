//! Long-lived backend handles shared by every request

use crate::backend::{ChatModel, FastEmbedReranker, OpenAiChatModel, RerankModel, VectorStore};
use crate::config::{expand_tilde, Config};
use crate::embedding::{FastEmbedProvider, MemoryVectorStore};
use crate::error::{RagError, Result};
use std::sync::Arc;

/// Backend handles injected into the pipeline, built once at startup
#[derive(Clone)]
pub struct RagServices {
    pub store: Arc<dyn VectorStore>,
    pub chat: Arc<dyn ChatModel>,
    pub reranker: Option<Arc<dyn RerankModel>>,
}

impl RagServices {
    pub fn new(
        store: Arc<dyn VectorStore>,
        chat: Arc<dyn ChatModel>,
        reranker: Option<Arc<dyn RerankModel>>,
    ) -> Self {
        Self {
            store,
            chat,
            reranker,
        }
    }

    /// Build the default backends described by `config`.
    ///
    /// Loads local models and indexes the corpus, so this blocks; call it once
    /// before serving requests.
    pub fn from_config(config: &Config) -> Result<Self> {
        let chat = OpenAiChatModel::from_config(&config.llm)?;
        if std::env::var(&config.llm.api_key_env).is_err() && config.llm.provider != "ollama" {
            tracing::warn!(
                "{} is not set; requests to {} will be unauthenticated",
                config.llm.api_key_env,
                config.llm.provider
            );
        }

        let provider = FastEmbedProvider::new(&config.embedding.model, config.embedding.batch_size)
            .map_err(|e| RagError::Config(e.to_string()))?;
        let corpus = expand_tilde(&config.store.corpus_file);
        let store = MemoryVectorStore::from_corpus(&corpus, Arc::new(provider), &config.store)?;

        let reranker: Option<Arc<dyn RerankModel>> = match &config.rerank.model_id {
            Some(model_id) => Some(Arc::new(FastEmbedReranker::new(model_id)?)),
            None => {
                tracing::info!("No rerank model configured, using order-preserving truncation");
                None
            }
        };

        Ok(Self::new(Arc::new(store), Arc::new(chat), reranker))
    }
}
