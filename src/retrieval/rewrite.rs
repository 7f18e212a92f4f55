//! Follow-up question rewriting

use crate::backend::ChatModel;
use crate::retrieval::parse::extract_result;
use crate::retrieval::{ConversationTurn, Prompts};
use std::sync::Arc;

/// Turns a follow-up question into a standalone one using conversation history
pub struct QuestionRewriter {
    chat: Arc<dyn ChatModel>,
    prompts: Prompts,
}

impl QuestionRewriter {
    pub fn new(chat: Arc<dyn ChatModel>, prompts: Prompts) -> Self {
        Self { chat, prompts }
    }

    /// Rewrite `question` against `history`.
    ///
    /// Never fails: with no history the question is returned as-is, and any
    /// backend error or empty rewrite falls back to the original question.
    pub async fn rewrite(&self, question: &str, history: &[ConversationTurn]) -> String {
        if history.is_empty() {
            return question.to_string();
        }

        let messages = self.prompts.rewrite(&format_history(history), question);
        let response = match self.chat.invoke(&messages).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("Question rewrite failed: {}", e);
                return question.to_string();
            }
        };

        let rewritten = extract_result(&response.flatten());
        if rewritten.is_empty() {
            tracing::debug!("Rewrite produced empty output, keeping original question");
            return question.to_string();
        }

        tracing::debug!("Rewritten question: {}", rewritten);
        rewritten
    }
}

/// Render history as `Role: content` lines
pub fn format_history(history: &[ConversationTurn]) -> String {
    history
        .iter()
        .map(|turn| format!("{}: {}", turn.role.label(), turn.content.trim()))
        .collect::<Vec<_>>()
        .join("\n")
}
