//! The question-answering pipeline.
//!
//! A question flows through a fixed sequence of stages over one
//! [`PipelineState`]:
//!
//! ```text
//! classify → extract → generate → execute → format
//! ```
//!
//! - [`WorkflowAgent`]: entry point, owns the schema snapshot and memory
//! - [`Stage`]: the sequence and the stage bodies
//! - [`PromptAssembler`]: stage prompts in compact or chain-of-thought style
//! - [`SchemaCache`]: labels, relationship types and sampled property values
//! - [`parse_category`], [`parse_entities`], [`parse_query`]: completion parsing

mod agent;
mod parse;
mod prompt;
mod schema;
mod stages;
mod state;

pub use agent::*;
pub use parse::*;
pub use prompt::*;
pub use schema::*;
pub use stages::*;
pub use state::*;
