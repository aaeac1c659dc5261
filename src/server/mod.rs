//! MCP server: stdio transport, tool routing and the shared agent.

mod handlers;
mod mcp;

pub use handlers::*;
pub use mcp::*;

use std::sync::Arc;
use tokio::sync::Mutex;

use crate::config::Config;
use crate::workflow::WorkflowAgent;

/// Application state shared across handlers.
pub struct AppState {
    /// Application configuration.
    pub config: Config,
    /// The question-answering agent.
    ///
    /// Behind a mutex so questions are answered one at a time, each seeing
    /// the memory left by the previous one.
    pub agent: Mutex<WorkflowAgent>,
}

impl AppState {
    /// Create new application state
    pub fn new(config: Config, agent: WorkflowAgent) -> Self {
        tracing::info!(
            model = %config.llm.model,
            graph = %config.graph.uri,
            database = %config.graph.database,
            "AppState initialized"
        );

        Self {
            config,
            agent: Mutex::new(agent),
        }
    }
}

/// Shared application state handle
pub type SharedState = Arc<AppState>;
