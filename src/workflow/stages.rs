//! The five pipeline stages and the sequence they run in.
//!
//! Recovery is deliberately uneven: classify and execute record an error
//! and keep going, extract falls back to no entities, while generate and
//! format surface gateway failures to the caller.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::agent::WorkflowAgent;
use super::parse::{parse_category, parse_entities, parse_query};
use super::prompt::PromptStyle;
use super::state::{PipelineState, QuestionType};
use crate::error::{AppError, AppResult};

/// Completion budget for classification.
pub const CLASSIFY_MAX_TOKENS: u32 = 50;
/// Completion budget for entity extraction.
pub const EXTRACT_MAX_TOKENS: u32 = 100;
/// Completion budget for query generation.
pub const GENERATE_MAX_TOKENS: u32 = 150;
/// Completion budget for general-knowledge answers.
pub const KNOWLEDGE_MAX_TOKENS: u32 = 300;
/// Completion budget for summarizing query results.
pub const SUMMARY_MAX_TOKENS: u32 = 250;

/// Introspection query used for database questions.
pub const SCHEMA_QUERY: &str =
    "MATCH (n) RETURN labels(n) as node_type, count(n) as count ORDER BY count DESC LIMIT 10";

/// Prefix of the answer given when a recoverable failure was recorded.
pub const APOLOGY_PREFIX: &str = "Sorry, I had trouble with that question: ";

/// Answer given when a database query returned nothing.
pub const NO_RESULTS_ANSWER: &str = "I didn't find any information for that question. \
Try asking about genes, diseases, or drugs in our database.";

/// Pipeline stages in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Classify,
    Extract,
    Generate,
    Execute,
    Format,
}

impl Stage {
    /// Where every run starts.
    pub const ENTRY: Stage = Stage::Classify;

    /// The stage that follows, `None` after the terminal stage.
    pub fn next(self) -> Option<Stage> {
        match self {
            Stage::Classify => Some(Stage::Extract),
            Stage::Extract => Some(Stage::Generate),
            Stage::Generate => Some(Stage::Execute),
            Stage::Execute => Some(Stage::Format),
            Stage::Format => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Classify => "classify",
            Stage::Extract => "extract",
            Stage::Generate => "generate",
            Stage::Execute => "execute",
            Stage::Format => "format",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The apology shown when `error` is set.
pub fn apology(error: &str) -> String {
    format!("{}{}", APOLOGY_PREFIX, error)
}

impl WorkflowAgent {
    /// Run one stage against the state.
    pub(super) async fn run_stage(
        &self,
        stage: Stage,
        state: &mut PipelineState,
        history: Option<&str>,
    ) -> AppResult<()> {
        match stage {
            Stage::Classify => self.classify(state, history).await,
            Stage::Extract => self.extract(state, history).await,
            Stage::Generate => self.generate(state, history).await?,
            Stage::Execute => self.execute(state).await,
            Stage::Format => self.format(state).await?,
        }
        Ok(())
    }

    async fn classify(&self, state: &mut PipelineState, history: Option<&str>) {
        let prompt = self.prompts.classification(&state.user_question, history);

        match self.llm.complete(&prompt, CLASSIFY_MAX_TOKENS).await {
            Ok(completion) => {
                let category = parse_category(&completion);
                debug!(completion = %completion, category = %category, "Question classified");
                state.question_type = Some(category);
            }
            Err(e) => {
                warn!(error = %e, "Classification failed, continuing as general knowledge");
                state.record_error(format!("Classification failed: {}", e));
                state.question_type = Some(QuestionType::GeneralKnowledge);
            }
        }
    }

    async fn extract(&self, state: &mut PipelineState, history: Option<&str>) {
        if !state.category().needs_entities() {
            state.entities = Some(Vec::new());
            return;
        }

        let prompt = self
            .prompts
            .extraction(&state.user_question, &self.schema, history);

        let entities = match self.llm.complete(&prompt, EXTRACT_MAX_TOKENS).await {
            Ok(completion) => parse_entities(&completion).unwrap_or_else(|| {
                debug!(completion = %completion, "No entity list in completion");
                Vec::new()
            }),
            Err(e) => {
                warn!(error = %e, "Entity extraction failed, continuing without entities");
                Vec::new()
            }
        };

        debug!(entities = ?entities, "Entities extracted");
        state.entities = Some(entities);
    }

    async fn generate(&self, state: &mut PipelineState, history: Option<&str>) -> AppResult<()> {
        match state.category() {
            QuestionType::GeneralDb => state.query = Some(SCHEMA_QUERY.to_string()),
            QuestionType::GeneralKnowledge => state.query = None,
            _ => {
                let prompt = self.prompts.query_generation(state, &self.schema, history);
                let completion = self
                    .llm
                    .complete(&prompt, GENERATE_MAX_TOKENS)
                    .await
                    .map_err(|source| AppError::Stage {
                        stage: Stage::Generate,
                        source,
                    })?;

                let marked = self.prompt_style() == PromptStyle::ChainOfThought;
                let query = parse_query(&completion, marked);
                debug!(query = %query, "Query generated");
                state.query = Some(query);
            }
        }
        Ok(())
    }

    async fn execute(&self, state: &mut PipelineState) {
        let query = match state.query.as_deref().map(str::trim) {
            Some(query) if !query.is_empty() => query.to_string(),
            _ => {
                state.results = Some(Vec::new());
                return;
            }
        };

        match self.graph.execute_query(&query).await {
            Ok(rows) => {
                debug!(rows = rows.len(), "Query executed");
                state.results = Some(rows);
            }
            Err(e) => {
                warn!(error = %e, query = %query, "Query execution failed");
                state.record_error(format!("Query failed: {}", e));
                state.results = Some(Vec::new());
            }
        }
    }

    async fn format(&self, state: &mut PipelineState) -> AppResult<()> {
        let answer = if let Some(error) = &state.error {
            apology(error)
        } else if state.category() == QuestionType::GeneralKnowledge {
            let prompt = self.prompts.general_knowledge(&state.user_question);
            self.complete_for(Stage::Format, &prompt, KNOWLEDGE_MAX_TOKENS)
                .await?
        } else if state.results().is_empty() {
            NO_RESULTS_ANSWER.to_string()
        } else {
            let prompt = self
                .prompts
                .results_summary(&state.user_question, state.results());
            self.complete_for(Stage::Format, &prompt, SUMMARY_MAX_TOKENS)
                .await?
        };

        state.final_answer = Some(answer);
        Ok(())
    }

    /// Completion whose failure aborts the pipeline at `stage`.
    async fn complete_for(&self, stage: Stage, prompt: &str, max_tokens: u32) -> AppResult<String> {
        self.llm
            .complete(prompt, max_tokens)
            .await
            .map_err(|source| AppError::Stage { stage, source })
    }
}
