//! Recording mock backends for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use ragfuse::backend::{
    BackendError, ChatMessage, ChatModel, RerankHit, RerankModel, ResponseContent, VectorStore,
};
use ragfuse::retrieval::{CandidateDocument, SOURCE_KEY};
use std::collections::HashMap;
use std::sync::Mutex;

pub fn doc(content: &str, source: &str) -> CandidateDocument {
    CandidateDocument::new(content).with_meta(SOURCE_KEY, source)
}

#[derive(Default)]
pub struct MockStore {
    results: HashMap<String, Vec<CandidateDocument>>,
    down: bool,
    pub searches: Mutex<Vec<(String, usize)>>,
}

impl MockStore {
    pub fn answering(mut self, query: &str, docs: Vec<CandidateDocument>) -> Self {
        self.results.insert(query.to_string(), docs);
        self
    }

    pub fn down() -> Self {
        Self {
            down: true,
            ..Self::default()
        }
    }

    pub fn searched(&self) -> Vec<String> {
        self.searches
            .lock()
            .unwrap()
            .iter()
            .map(|(q, _)| q.clone())
            .collect()
    }
}

#[async_trait]
impl VectorStore for MockStore {
    async fn similarity_search(
        &self,
        query: &str,
        k: usize,
    ) -> Result<Vec<CandidateDocument>, BackendError> {
        self.searches.lock().unwrap().push((query.to_string(), k));
        if self.down {
            return Err(BackendError::Status {
                status: 503,
                body: "index unavailable".to_string(),
            });
        }
        let mut docs = self.results.get(query).cloned().unwrap_or_default();
        docs.truncate(k);
        Ok(docs)
    }
}

/// Routes prompts to replies by a distinctive fragment of the prompt text
#[derive(Default)]
pub struct MockChat {
    routes: Vec<(String, Option<ResponseContent>)>,
    pub prompts: Mutex<Vec<String>>,
}

impl MockChat {
    pub fn on(mut self, fragment: &str, reply: impl Into<ResponseContent>) -> Self {
        self.routes.push((fragment.to_string(), Some(reply.into())));
        self
    }

    pub fn failing_on(mut self, fragment: &str) -> Self {
        self.routes.push((fragment.to_string(), None));
        self
    }

    pub fn prompts_containing(&self, fragment: &str) -> usize {
        self.prompts
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.contains(fragment))
            .count()
    }

    pub fn total_calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl ChatModel for MockChat {
    async fn invoke(&self, messages: &[ChatMessage]) -> Result<ResponseContent, BackendError> {
        let prompt = messages
            .iter()
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        self.prompts.lock().unwrap().push(prompt.clone());

        for (fragment, reply) in &self.routes {
            if prompt.contains(fragment.as_str()) {
                return reply
                    .clone()
                    .ok_or_else(|| BackendError::Request("rate limited".to_string()));
            }
        }
        Err(BackendError::Request("unexpected prompt".to_string()))
    }

    fn model_name(&self) -> &str {
        "mock-chat"
    }
}

pub struct MockReranker {
    hits: Option<Vec<RerankHit>>,
    pub requests: Mutex<Vec<(Vec<String>, usize)>>,
}

impl MockReranker {
    pub fn scoring(hits: &[(usize, f32)]) -> Self {
        Self {
            hits: Some(
                hits.iter()
                    .map(|&(index, relevance_score)| RerankHit {
                        index,
                        relevance_score,
                    })
                    .collect(),
            ),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn broken() -> Self {
        Self {
            hits: None,
            requests: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl RerankModel for MockReranker {
    async fn rerank(
        &self,
        _query: &str,
        documents: &[String],
        top_n: usize,
    ) -> Result<Vec<RerankHit>, BackendError> {
        self.requests
            .lock()
            .unwrap()
            .push((documents.to_vec(), top_n));
        self.hits
            .clone()
            .ok_or_else(|| BackendError::Request("reranker crashed".to_string()))
    }

    fn model_name(&self) -> &str {
        "mock-reranker"
    }
}
