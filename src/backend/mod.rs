//! External collaborators of the retrieval pipeline
//!
//! The pipeline only talks to a vector store, a chat (generation) model and an
//! optional rerank model through the traits defined here. Handles are built once
//! at startup and shared read-only across concurrent requests.

mod chat;
mod rerank;

pub use chat::OpenAiChatModel;
pub use rerank::FastEmbedReranker;

use crate::retrieval::CandidateDocument;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Backend initialization failed: {0}")]
    Initialization(String),

    #[error("Request failed: {0}")]
    Request(String),

    #[error("Backend returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed backend response: {0}")]
    Decode(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Role of a message sent to a chat model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// Single message of a chat model invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }
}

/// Content returned by a chat model: either plain text or a list of segments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResponseContent {
    Text(String),
    Segments(Vec<ContentSegment>),
}

/// One segment of a segmented response. Non-text parts carry no text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContentSegment {
    Plain(String),
    Part {
        #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
        kind: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        text: Option<String>,
    },
}

impl ContentSegment {
    pub fn text(&self) -> Option<&str> {
        match self {
            ContentSegment::Plain(text) => Some(text),
            ContentSegment::Part { text, .. } => text.as_deref(),
        }
    }
}

impl ResponseContent {
    /// Flatten the response into a single string, concatenating text segments in order
    pub fn flatten(&self) -> String {
        match self {
            ResponseContent::Text(text) => text.clone(),
            ResponseContent::Segments(segments) => {
                segments.iter().filter_map(ContentSegment::text).collect()
            }
        }
    }
}

impl From<String> for ResponseContent {
    fn from(text: String) -> Self {
        ResponseContent::Text(text)
    }
}

impl From<&str> for ResponseContent {
    fn from(text: &str) -> Self {
        ResponseContent::Text(text.to_string())
    }
}

/// One scored hit returned by a rerank model
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RerankHit {
    /// Position of the document in the list sent to the model
    pub index: usize,
    pub relevance_score: f32,
}

/// Nearest-neighbour search over embedded documents
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Return up to `k` documents most similar to `query`, most similar first
    async fn similarity_search(
        &self,
        query: &str,
        k: usize,
    ) -> Result<Vec<CandidateDocument>, BackendError>;
}

/// Text generation backend
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn invoke(&self, messages: &[ChatMessage]) -> Result<ResponseContent, BackendError>;

    fn model_name(&self) -> &str;
}

/// Cross-encoder style relevance scoring
#[async_trait]
pub trait RerankModel: Send + Sync {
    /// Score `documents` against `query`, returning at most `top_n` hits
    async fn rerank(
        &self,
        query: &str,
        documents: &[String],
        top_n: usize,
    ) -> Result<Vec<RerankHit>, BackendError>;

    fn model_name(&self) -> &str;
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flatten_plain_text() {
        let content = ResponseContent::Text("  hello  ".to_string());
        assert_eq!(content.flatten(), "  hello  ");
    }

    #[test]
    fn test_flatten_segments_skips_non_text_parts() {
        let content: ResponseContent = serde_json::from_value(serde_json::json!([
            {"type": "text", "text": "Paris is "},
            {"type": "image_url", "image_url": {"url": "http://x"}},
            "the capital",
            {"type": "text", "text": "."}
        ]))
        .unwrap();

        assert!(matches!(content, ResponseContent::Segments(_)));
        assert_eq!(content.flatten(), "Paris is the capital.");
    }

    #[test]
    fn test_response_content_from_json_string() {
        let content: ResponseContent = serde_json::from_str("\"plain answer\"").unwrap();
        assert_eq!(content, ResponseContent::Text("plain answer".to_string()));
    }
}
