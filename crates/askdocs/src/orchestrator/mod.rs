//! Query orchestration
//!
//! Drives one question through retrieve -> assemble -> generate. Each request
//! is independent: the orchestrator holds only immutable configuration and
//! shared provider handles.

mod retry;
mod state;

pub use retry::RetryPolicy;
pub use state::{Failure, QueryState, Stage};

use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

use crate::config::AskDocsConfig;
use crate::error::{Error, Result};
use crate::generation::{build_references, GenerationClient, PromptAssembler};
use crate::providers::{build_providers, GenerationProvider, RetrievalProvider};
use crate::retrieval::RetrievalClient;
use crate::types::{Answer, AnswerStatus, Query};

/// Request handler for the question-answering flow
#[derive(Clone)]
pub struct QueryOrchestrator {
    config: Arc<AskDocsConfig>,
    retrieval: RetrievalClient,
    assembler: PromptAssembler,
    generation: GenerationClient,
    retry: RetryPolicy,
}

impl QueryOrchestrator {
    /// Create an orchestrator from configuration and provider handles
    pub fn new(
        config: Arc<AskDocsConfig>,
        retriever: Arc<dyn RetrievalProvider>,
        generator: Arc<dyn GenerationProvider>,
    ) -> Self {
        Self {
            retrieval: RetrievalClient::new(retriever, config.retrieval.clone()),
            assembler: PromptAssembler::new(config.prompt.max_prompt_chars),
            generation: GenerationClient::new(generator),
            retry: RetryPolicy::from_config(&config.retry),
            config,
        }
    }

    /// Create an orchestrator with the providers of the configured backend
    pub fn from_config(config: Arc<AskDocsConfig>) -> Result<Self> {
        let (retriever, generator) = build_providers(&config)?;
        Ok(Self::new(config, retriever, generator))
    }

    pub fn config(&self) -> &AskDocsConfig {
        &self.config
    }

    pub fn retrieval(&self) -> &RetrievalClient {
        &self.retrieval
    }

    pub fn generation(&self) -> &GenerationClient {
        &self.generation
    }

    /// Answer a plain question with default options
    pub async fn ask(&self, question: &str) -> Answer {
        self.handle(Query::new(question)).await
    }

    /// Handle one query. Failures are reported in the returned answer.
    pub async fn handle(&self, query: Query) -> Answer {
        let request_id = Uuid::new_v4();
        let span = tracing::info_span!(
            "query",
            %request_id,
            received_at = %query.received_at().to_rfc3339()
        );
        self.run(request_id, query).instrument(span).await
    }

    async fn run(&self, request_id: Uuid, query: Query) -> Answer {
        let started = Instant::now();
        let mut state = QueryState::Received;
        let mut answer = Answer {
            request_id,
            status: AnswerStatus::Ok,
            text: String::new(),
            citations: Vec::new(),
            references: Vec::new(),
            failure: None,
            conversation_id: query.conversation_id().map(str::to_string),
            state: QueryState::Received,
            passages_retrieved: 0,
            passages_dropped: 0,
            retrieval_attempts: 0,
            generation_attempts: 0,
            processing_time_ms: 0,
        };

        if let Some(conversation_id) = query.conversation_id() {
            tracing::debug!(
                conversation_id,
                prior_turns = query.history().len(),
                "Conversation context received, answering as a single turn"
            );
        }

        // Received: ingress validation
        let top_k = self.retrieval.resolve_top_k(query.top_k());
        if let Err(e) = self.retrieval.validate(query.text(), top_k) {
            return fail(answer, state, Stage::Received, e, started);
        }

        // Retrieving
        step(&mut state, QueryState::Retrieving);
        let (result, attempts) = self
            .retry
            .run("retrieval", || self.retrieval.retrieve(query.text(), top_k))
            .await;
        answer.retrieval_attempts = attempts;

        let passages = match result {
            Ok(passages) => passages,
            Err(e) => return fail(answer, state, Stage::Retrieving, e, started),
        };
        answer.passages_retrieved = passages.len();
        if passages.is_empty() {
            tracing::info!("No passages retrieved, generating without document context");
        }

        // Assembling
        step(&mut state, QueryState::Assembling);
        let prompt = match self.assembler.assemble(
            query.text(),
            &passages,
            &self.config.prompt.template,
            query.instructions(),
        ) {
            Ok(prompt) => prompt,
            Err(e) => return fail(answer, state, Stage::Assembling, e, started),
        };
        answer.passages_dropped = prompt.dropped_ids().len();

        // Generating
        step(&mut state, QueryState::Generating);
        let (result, attempts) = self
            .retry
            .run("generation", || {
                self.generation.generate(&prompt, &self.config.generation)
            })
            .await;
        answer.generation_attempts = attempts;

        let text = match result {
            Ok(text) => text,
            Err(e) => return fail(answer, state, Stage::Generating, e, started),
        };

        step(&mut state, QueryState::Completed);
        answer.text = text;
        answer.citations = prompt.passage_ids().to_vec();
        answer.references =
            build_references(&passages, &answer.citations, &self.config.references);
        answer.processing_time_ms = started.elapsed().as_millis() as u64;
        answer.state = state;

        tracing::info!(
            citations = answer.citations.len(),
            retrieval_attempts = answer.retrieval_attempts,
            generation_attempts = answer.generation_attempts,
            "Answered in {}ms",
            answer.processing_time_ms
        );

        answer
    }
}

/// Advance the request state; every call site follows the legal order
fn step(state: &mut QueryState, next: QueryState) {
    let advanced = state.advance(next);
    debug_assert!(advanced, "illegal query state transition");
}

/// Record a terminal failure on the answer. The answer text stays empty.
fn fail(
    mut answer: Answer,
    mut state: QueryState,
    stage: Stage,
    error: Error,
    started: Instant,
) -> Answer {
    let failure = Failure::new(stage, &error);
    tracing::warn!("Query failed at {}: {}", stage, error);

    step(&mut state, QueryState::Failed(failure.clone()));
    answer.state = state;
    answer.status = AnswerStatus::Error;
    answer.failure = Some(failure);
    answer.processing_time_ms = started.elapsed().as_millis() as u64;
    answer
}
