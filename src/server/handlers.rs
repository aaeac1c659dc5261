use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Instant;
use tracing::info;

use super::SharedState;
use crate::error::{McpError, McpResult};
use crate::memory::ConversationTurn;

/// What a tool hands back: one readable line and the structured payload.
#[derive(Debug)]
pub struct ToolOutput {
    pub summary: String,
    pub data: Value,
}

impl ToolOutput {
    fn new(summary: impl Into<String>, data: impl Serialize) -> McpResult<Self> {
        Ok(Self {
            summary: summary.into(),
            data: serde_json::to_value(data).map_err(McpError::Json)?,
        })
    }
}

/// Route tool calls to appropriate handlers
pub async fn handle_tool_call(
    state: &SharedState,
    tool_name: &str,
    arguments: Option<Value>,
) -> McpResult<ToolOutput> {
    info!(tool = %tool_name, "Routing tool call");

    match tool_name {
        "answer_question" => handle_answer_question(state, arguments).await,
        "get_schema" => handle_get_schema(state).await,
        "get_history" => handle_get_history(state).await,
        "clear_history" => handle_clear_history(state).await,
        _ => Err(McpError::UnknownTool {
            tool_name: tool_name.to_string(),
        }),
    }
}

#[derive(Debug, Deserialize)]
struct AnswerQuestionParams {
    question: String,
}

/// Handle answer_question tool call
async fn handle_answer_question(
    state: &SharedState,
    arguments: Option<Value>,
) -> McpResult<ToolOutput> {
    let params: AnswerQuestionParams = parse_arguments("answer_question", arguments)?;
    if params.question.trim().is_empty() {
        return Err(McpError::InvalidParameters {
            tool_name: "answer_question".to_string(),
            message: "question must not be empty".to_string(),
        });
    }

    let start = Instant::now();
    let report = state
        .agent
        .lock()
        .await
        .answer_question(&params.question)
        .await?;

    info!(
        question_type = ?report.question_type,
        results = report.results_count,
        latency_ms = start.elapsed().as_millis(),
        "Question answered via MCP"
    );

    ToolOutput::new(report.answer.clone(), &report)
}

/// Handle get_schema tool call
async fn handle_get_schema(state: &SharedState) -> McpResult<ToolOutput> {
    let agent = state.agent.lock().await;
    let schema = agent.schema();
    let summary = format!(
        "Node labels: {}, relationship types: {}",
        schema.node_labels.len(),
        schema.relationship_types.len()
    );
    ToolOutput::new(summary, schema)
}

#[derive(Debug, Serialize)]
struct HistoryResponse<'a> {
    enabled: bool,
    turns: &'a [ConversationTurn],
}

/// Handle get_history tool call
async fn handle_get_history(state: &SharedState) -> McpResult<ToolOutput> {
    let agent = state.agent.lock().await;
    let response = HistoryResponse {
        enabled: agent.memory().is_some(),
        turns: agent.memory().map(|m| m.turns()).unwrap_or_default(),
    };
    let summary = if response.enabled {
        format!("Recorded turns: {}", response.turns.len())
    } else {
        "Conversation memory is disabled".to_string()
    };
    ToolOutput::new(summary, response)
}

/// Handle clear_history tool call
async fn handle_clear_history(state: &SharedState) -> McpResult<ToolOutput> {
    let cleared = state.agent.lock().await.clear_memory();
    info!(cleared, "Conversation history cleared");
    ToolOutput::new(
        format!("Cleared turns: {}", cleared),
        serde_json::json!({ "cleared": cleared }),
    )
}

// ============================================================================
// Helper functions
// ============================================================================

/// Helper to parse arguments with consistent error handling
fn parse_arguments<T: serde::de::DeserializeOwned>(
    tool_name: &str,
    arguments: Option<Value>,
) -> McpResult<T> {
    match arguments {
        Some(args) => serde_json::from_value(args).map_err(|e| McpError::InvalidParameters {
            tool_name: tool_name.to_string(),
            message: e.to_string(),
        }),
        None => Err(McpError::InvalidParameters {
            tool_name: tool_name.to_string(),
            message: "Missing arguments".to_string(),
        }),
    }
}
