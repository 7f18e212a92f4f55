//! The question answering pipeline
//!
//! Rewrite → Generate Candidates → Deduplicate → Rerank → Synthesize. Each
//! stage consumes the previous stage's output; only base retrieval and answer
//! generation can fail a request.

mod services;
mod synthesis;

pub use services::RagServices;
pub use synthesis::{format_contexts, AnswerSynthesizer};

use crate::config::Config;
use crate::error::{RagError, Result};
use crate::retrieval::{
    deduplicate_candidates, CandidateGenerator, ConversationTurn, Prompts, Query,
    QuestionRewriter, Reranker, RetrievalResult,
};
use serde::{Deserialize, Serialize};
use tracing::Instrument;
use uuid::Uuid;

/// Outcome of one pipeline run, in the shape exposed to callers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineResult {
    #[serde(rename = "question")]
    pub original_question: String,
    pub rewritten_question: String,
    #[serde(rename = "answer")]
    pub answer_text: String,
    pub contexts: RetrievalResult,
    pub query_variants: Vec<String>,
    #[serde(rename = "hyde_document")]
    pub hypothetical_document: Option<String>,
}

/// Retrieval-augmented answering over injected backend services
pub struct RagPipeline {
    rewriter: QuestionRewriter,
    generator: CandidateGenerator,
    reranker: Reranker,
    synthesizer: AnswerSynthesizer,
}

impl RagPipeline {
    pub fn new(services: RagServices, config: &Config) -> Self {
        let prompts = Prompts::new(
            config.llm.answer_language.clone(),
            config.llm.no_answer_phrase.clone(),
        );

        Self {
            rewriter: QuestionRewriter::new(services.chat.clone(), prompts.clone()),
            generator: CandidateGenerator::new(
                services.store,
                services.chat.clone(),
                prompts.clone(),
                config.retrieval.clone(),
            ),
            reranker: Reranker::new(services.reranker, config.retrieval.final_k),
            synthesizer: AnswerSynthesizer::new(services.chat, prompts),
        }
    }

    /// Answer `question`, using `history` (possibly empty) to resolve follow-ups
    pub async fn run(&self, question: &str, history: &[ConversationTurn]) -> Result<PipelineResult> {
        if question.trim().is_empty() {
            return Err(RagError::InvalidRequest(
                "question must not be empty".to_string(),
            ));
        }

        let span = tracing::info_span!("rag_request", request_id = %Uuid::new_v4());
        self.run_stages(question, history).instrument(span).await
    }

    async fn run_stages(
        &self,
        question: &str,
        history: &[ConversationTurn],
    ) -> Result<PipelineResult> {
        tracing::info!("Running RAG pipeline (history turns: {})", history.len());

        let rewritten = self.rewriter.rewrite(question, history).await;
        let mut query = Query::new(question, rewritten);

        let pool = self.generator.generate(&mut query).await?;
        let pool_size = pool.len();

        let candidates = deduplicate_candidates(pool);
        tracing::debug!(
            "Candidate pool: {} total, {} unique",
            pool_size,
            candidates.len()
        );

        let contexts = self.reranker.rerank(&query.rewritten, candidates).await;
        let answer = self
            .synthesizer
            .synthesize(&query.rewritten, contexts.documents())
            .await?;

        tracing::info!("Answered with {} contexts", contexts.len());

        Ok(PipelineResult {
            original_question: query.original,
            rewritten_question: query.rewritten,
            answer_text: answer,
            contexts,
            query_variants: query.variants,
            hypothetical_document: query.hypothetical_document,
        })
    }
}
