//! ragfuse - Retrieval Fusion and Rerank Orchestrator
//!
//! Answers a question over a document corpus: rewrites follow-ups into
//! standalone questions, gathers candidates from the base question, query
//! variants and a hypothetical answer document, deduplicates and reranks them,
//! then generates an answer grounded in the surviving passages.

pub mod backend;
pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
pub mod pipeline;
pub mod retrieval;
pub mod server;

pub use error::{RagError, Result};
