//! # Helix Navigator
//!
//! Answers natural-language biomedical questions over a Neo4j knowledge graph
//! of genes, proteins, diseases and drugs, using a language model to classify
//! the question, pick out entities, write the graph query and phrase the
//! answer.
//!
//! ## Architecture
//!
//! ```text
//! question → classify → extract → generate → execute → format → answer
//!               │          │          │          │         │
//!               └──── LlmGateway ─────┘     GraphGateway   └── LlmGateway
//! ```
//!
//! The schema is snapshotted once when the agent starts. Conversation memory,
//! when enabled, is threaded into the prompts of later questions.
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use helix_navigator::{AnthropicClient, Config, Neo4jClient, WorkflowAgent};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     let llm = Arc::new(AnthropicClient::new(&config.llm, config.request.clone())?);
//!     let graph = Arc::new(Neo4jClient::new(&config.graph, config.request.clone())?);
//!     let mut agent =
//!         WorkflowAgent::new(llm, graph, &config.agent, config.graph.sample_limit).await?;
//!     let report = agent.answer_question("Which genes are linked to diabetes?").await?;
//!     println!("{}", report.answer);
//!     Ok(())
//! }
//! ```

/// Command-line subcommands.
pub mod cli;
/// Configuration loaded from the environment.
pub mod config;
/// Error types and result aliases for the application.
pub mod error;
/// Knowledge graph gateway and Neo4j client.
pub mod graph;
/// Language model gateway and Anthropic client.
pub mod llm;
/// Conversation memory.
pub mod memory;
/// Prompt templates for every stage.
pub mod prompts;
/// MCP server implementation and request handling.
pub mod server;
/// The question-answering pipeline.
pub mod workflow;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use graph::{GraphGateway, Neo4jClient};
pub use llm::{AnthropicClient, LlmGateway};
pub use server::{AppState, McpServer, SharedState};
pub use workflow::{AnswerReport, PipelineState, QuestionType, WorkflowAgent};
