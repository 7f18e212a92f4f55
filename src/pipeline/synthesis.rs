//! Grounded answer generation

use crate::backend::ChatModel;
use crate::error::{RagError, Result};
use crate::retrieval::{CandidateDocument, Prompts};
use std::sync::Arc;

/// Formats the final contexts and asks the chat model for the answer
pub struct AnswerSynthesizer {
    chat: Arc<dyn ChatModel>,
    prompts: Prompts,
}

impl AnswerSynthesizer {
    pub fn new(chat: Arc<dyn ChatModel>, prompts: Prompts) -> Self {
        Self { chat, prompts }
    }

    /// Answer `question` from `contexts`. A backend failure is fatal.
    pub async fn synthesize(&self, question: &str, contexts: &[CandidateDocument]) -> Result<String> {
        let context_block = format_contexts(contexts);
        let messages = self.prompts.answer(&context_block, question);

        let response = self
            .chat
            .invoke(&messages)
            .await
            .map_err(RagError::Generation)?;

        Ok(response.flatten().trim().to_string())
    }
}

/// Render contexts as numbered blocks:
///
/// ```text
/// [1] handbook.pdf (score=0.913)
/// passage text
///
/// [2] unknown
/// passage text
/// ```
pub fn format_contexts(contexts: &[CandidateDocument]) -> String {
    contexts
        .iter()
        .enumerate()
        .map(|(i, doc)| {
            let source = doc.source().unwrap_or_else(|| "unknown".to_string());
            let mut header = format!("[{}] {}", i + 1, source);
            if let Some(score) = doc.rerank_score() {
                header.push_str(&format!(" (score={:.3})", score));
            }
            format!("{}\n{}", header, doc.content.trim())
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}
