//! Candidate documents, dedup identity and request-scoped query state

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Free-form document metadata as stored alongside each chunk
pub type Metadata = serde_json::Map<String, Value>;

/// Metadata key naming the originating document
pub const SOURCE_KEY: &str = "source";
/// Metadata key holding the chunk sequence number within its source
pub const CHUNK_KEY: &str = "chunk_id";
/// Metadata key written by the rerank stage
pub const RERANK_SCORE_KEY: &str = "rerank_score";

/// Number of leading content characters used as identity when chunk metadata is missing
const PREFIX_KEY_CHARS: usize = 100;

/// Speaker of a conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    /// Capitalized display label used when rendering history
    pub fn label(&self) -> &'static str {
        match self {
            Role::User => "User",
            Role::Assistant => "Assistant",
        }
    }
}

/// One prior turn of the conversation, supplied by the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
}

impl ConversationTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// A passage returned by the vector store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateDocument {
    pub content: String,
    #[serde(default)]
    pub metadata: Metadata,
}

/// Identity used to collapse duplicates across retrieval strategies
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DedupKey {
    Chunk { source: String, chunk: String },
    Prefix(String),
}

impl CandidateDocument {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            metadata: Metadata::new(),
        }
    }

    /// Builder-style metadata setter
    pub fn with_meta(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }

    pub fn source(&self) -> Option<String> {
        self.metadata.get(SOURCE_KEY).and_then(value_to_key)
    }

    pub fn chunk_id(&self) -> Option<String> {
        self.metadata.get(CHUNK_KEY).and_then(value_to_key)
    }

    pub fn rerank_score(&self) -> Option<f64> {
        self.metadata.get(RERANK_SCORE_KEY).and_then(Value::as_f64)
    }

    pub fn set_rerank_score(&mut self, score: f32) {
        // NaN has no JSON representation
        let value = serde_json::Number::from_f64(f64::from(score))
            .map(Value::Number)
            .unwrap_or(Value::Null);
        self.metadata.insert(RERANK_SCORE_KEY.to_string(), value);
    }

    pub fn dedup_key(&self) -> DedupKey {
        match (self.source(), self.chunk_id()) {
            (Some(source), Some(chunk)) => DedupKey::Chunk { source, chunk },
            _ => DedupKey::Prefix(self.content.chars().take(PREFIX_KEY_CHARS).collect()),
        }
    }
}

fn value_to_key(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Query state of one request, frozen once candidate generation completes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    pub original: String,
    pub rewritten: String,
    pub variants: Vec<String>,
    pub hypothetical_document: Option<String>,
}

impl Query {
    pub fn new(original: impl Into<String>, rewritten: impl Into<String>) -> Self {
        Self {
            original: original.into(),
            rewritten: rewritten.into(),
            variants: Vec::new(),
            hypothetical_document: None,
        }
    }
}

/// Final, capped list of context passages
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RetrievalResult(Vec<CandidateDocument>);

impl RetrievalResult {
    /// Build a result holding at most `cap` documents
    pub fn capped(mut documents: Vec<CandidateDocument>, cap: usize) -> Self {
        documents.truncate(cap);
        Self(documents)
    }

    pub fn documents(&self) -> &[CandidateDocument] {
        &self.0
    }

    pub fn into_documents(self) -> Vec<CandidateDocument> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
