//! Fixed prompt templates used by the pipeline stages

use crate::backend::ChatMessage;

/// Opening sentinel wrapping the rewriter's payload
pub const RESULT_OPEN: &str = "<result>";
/// Closing sentinel wrapping the rewriter's payload
pub const RESULT_CLOSE: &str = "</result>";

/// Prompt set parameterized by the answer language and fallback phrase
#[derive(Debug, Clone)]
pub struct Prompts {
    answer_language: String,
    no_answer_phrase: String,
}

impl Prompts {
    pub fn new(answer_language: impl Into<String>, no_answer_phrase: impl Into<String>) -> Self {
        Self {
            answer_language: answer_language.into(),
            no_answer_phrase: no_answer_phrase.into(),
        }
    }

    pub fn no_answer_phrase(&self) -> &str {
        &self.no_answer_phrase
    }

    /// Messages asking for a standalone rewrite of a follow-up question
    pub fn rewrite(&self, history: &str, question: &str) -> Vec<ChatMessage> {
        vec![
            ChatMessage::system(format!(
                "Referring to the conversation history, create a standalone version of the \
                 <question>. The rewritten question must keep all critical terms. \
                 Wrap the result in {open}{close} tags. If the conversation is irrelevant, \
                 return the original question inside {open}{close} tags without modifications.",
                open = RESULT_OPEN,
                close = RESULT_CLOSE,
            )),
            ChatMessage::user(format!(
                "Conversation so far:\n{history}\n\n\
                 Create a standalone question for: <question>{question}</question>"
            )),
        ]
    }

    /// Messages asking for alternative search queries (query fusion)
    pub fn fusion(&self, question: &str, variant_count: usize) -> Vec<ChatMessage> {
        vec![
            ChatMessage::system("You are an assistant that writes related search queries."),
            ChatMessage::user(format!(
                "You will receive a question. Write up to {variant_count} different search \
                 queries that keep the meaning of the original question. \
                 Put each query on its own line and do not number them.\n\n\
                 Question: {question}"
            )),
        ]
    }

    /// Messages asking for a hypothetical answer passage (HyDE)
    pub fn hyde(&self, question: &str) -> Vec<ChatMessage> {
        vec![
            ChatMessage::system("You write passages that simulate an answer."),
            ChatMessage::user(format!(
                "Write a short paragraph of 3-5 sentences answering the following question \
                 using everything you know. Use an informative tone. Question: {question}"
            )),
        ]
    }

    /// Messages asking for the final grounded answer
    pub fn answer(&self, contexts: &str, question: &str) -> Vec<ChatMessage> {
        let language = &self.answer_language;
        let fallback = &self.no_answer_phrase;
        vec![
            ChatMessage::system(format!(
                "You are a senior assistant that answers user questions in {language}. \
                 You will receive background context made of text chunks produced during \
                 a retrieval step. Read the context carefully and provide the most accurate \
                 answer possible using only that context. If the context is insufficient, \
                 reply with '{fallback}'"
            )),
            ChatMessage::user(format!(
                "Below is the set of contexts: <contexts>{contexts}</contexts>\n\n\
                 Answer the following question in {language}, without any preamble. \
                 If no suitable information is found in the contexts, reply exactly: \
                 '{fallback}'\n\n\
                 <question>{question}</question>"
            )),
        ]
    }
}

impl Default for Prompts {
    fn default() -> Self {
        Self::new(
            "English",
            "No relevant information was found in the provided context.",
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::ChatRole;

    #[test]
    fn test_rewrite_embeds_history_and_question() {
        let messages = Prompts::default().rewrite("User: hi", "and then?");

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, ChatRole::System);
        assert!(messages[0].content.contains(RESULT_OPEN));
        assert!(messages[1].content.contains("User: hi"));
        assert!(messages[1].content.contains("<question>and then?</question>"));
    }

    #[test]
    fn test_answer_uses_language_and_fallback() {
        let prompts = Prompts::new("Vietnamese", "Khong co thong tin.");
        let messages = prompts.answer("[1] a.pdf\nbody", "Q?");

        assert!(messages[0].content.contains("in Vietnamese"));
        assert!(messages[0].content.contains("'Khong co thong tin.'"));
        assert!(messages[1]
            .content
            .contains("<contexts>[1] a.pdf\nbody</contexts>"));
        assert!(messages[1].content.ends_with("<question>Q?</question>"));
    }

    #[test]
    fn test_fusion_states_variant_count() {
        let messages = Prompts::default().fusion("Q?", 4);
        assert!(messages[1].content.contains("up to 4 different"));
    }
}
