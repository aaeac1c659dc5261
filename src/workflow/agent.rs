use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};
use uuid::Uuid;

use super::prompt::{PromptAssembler, PromptStyle};
use super::schema::SchemaCache;
use super::stages::Stage;
use super::state::{AnswerReport, PipelineState};
use crate::config::AgentConfig;
use crate::error::AppResult;
use crate::graph::GraphGateway;
use crate::llm::LlmGateway;
use crate::memory::ConversationMemory;

/// Answers biomedical questions against one knowledge graph.
///
/// Owns the schema snapshot taken at construction and, when enabled, the
/// conversation memory. `answer_question` takes `&mut self`, so questions on
/// one agent never overlap.
pub struct WorkflowAgent {
    pub(super) llm: Arc<dyn LlmGateway>,
    pub(super) graph: Arc<dyn GraphGateway>,
    pub(super) schema: Arc<SchemaCache>,
    pub(super) prompts: PromptAssembler,
    memory: Option<ConversationMemory>,
}

impl WorkflowAgent {
    /// Create an agent, snapshotting the graph schema first.
    pub async fn new(
        llm: Arc<dyn LlmGateway>,
        graph: Arc<dyn GraphGateway>,
        options: &AgentConfig,
        sample_limit: usize,
    ) -> AppResult<Self> {
        let schema = SchemaCache::build(graph.as_ref(), sample_limit).await?;
        Ok(Self::with_schema(llm, graph, Arc::new(schema), options))
    }

    /// Create an agent around an existing schema snapshot.
    pub fn with_schema(
        llm: Arc<dyn LlmGateway>,
        graph: Arc<dyn GraphGateway>,
        schema: Arc<SchemaCache>,
        options: &AgentConfig,
    ) -> Self {
        info!(
            conversation_memory = options.conversation_memory,
            chain_of_thought = options.chain_of_thought,
            "Workflow agent ready"
        );

        Self {
            llm,
            graph,
            schema,
            prompts: PromptAssembler::new(PromptStyle::from(options.chain_of_thought)),
            memory: options.conversation_memory.then(ConversationMemory::new),
        }
    }

    /// Answer a question and record the turn in memory.
    ///
    /// Recoverable failures come back as an apology in `answer` with `error`
    /// set. Failures in query generation or answer formatting are returned
    /// as `Err` and leave memory untouched.
    pub async fn answer_question(&mut self, question: &str) -> AppResult<AnswerReport> {
        let state = self.run_pipeline(question).await?;
        let report = AnswerReport::from(state);

        if let Some(memory) = self.memory.as_mut() {
            memory.add_turn(question, report.answer.as_str());
        }

        Ok(report)
    }

    /// Run the five stages for one question without touching memory.
    pub async fn run_pipeline(&self, question: &str) -> AppResult<PipelineState> {
        let run_id = Uuid::new_v4();
        let started = Instant::now();
        let history = self.memory.as_ref().and_then(ConversationMemory::prompt_block);
        let mut state = PipelineState::new(question);

        info!(run_id = %run_id, question = %question, "Answering question");

        let mut stage = Some(Stage::ENTRY);
        while let Some(current) = stage {
            let stage_start = Instant::now();
            self.run_stage(current, &mut state, history.as_deref()).await?;
            debug!(
                run_id = %run_id,
                stage = %current,
                latency_ms = stage_start.elapsed().as_millis(),
                "Stage complete"
            );
            stage = current.next();
        }

        info!(
            run_id = %run_id,
            question_type = ?state.question_type,
            error = ?state.error,
            latency_ms = started.elapsed().as_millis(),
            "Question answered"
        );

        Ok(state)
    }

    pub fn schema(&self) -> &SchemaCache {
        &self.schema
    }

    pub fn prompt_style(&self) -> PromptStyle {
        self.prompts.style()
    }

    /// Conversation memory, `None` when disabled.
    pub fn memory(&self) -> Option<&ConversationMemory> {
        self.memory.as_ref()
    }

    /// Forget all recorded turns. Returns how many were dropped.
    pub fn clear_memory(&mut self) -> usize {
        match self.memory.as_mut() {
            Some(memory) => {
                let dropped = memory.len();
                memory.clear();
                dropped
            }
            None => 0,
        }
    }
}
