//! Retrieval fusion: question rewriting, multi-strategy candidate generation,
//! deduplication and reranking.

mod candidates;
mod deduplication;
mod document;
pub mod parse;
mod prompts;
mod reranker;
mod rewrite;

pub use candidates::CandidateGenerator;
pub use deduplication::deduplicate_candidates;
pub use document::{
    CandidateDocument, ConversationTurn, DedupKey, Metadata, Query, RetrievalResult, Role,
    CHUNK_KEY, RERANK_SCORE_KEY, SOURCE_KEY,
};
pub use prompts::{Prompts, RESULT_CLOSE, RESULT_OPEN};
pub use reranker::Reranker;
pub use rewrite::{format_history, QuestionRewriter};
