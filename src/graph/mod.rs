//! Knowledge graph gateway.
//!
//! [`GraphGateway`] is what the pipeline and the schema snapshot consume;
//! [`Neo4jClient`] implements it over the Neo4j HTTP transactional endpoint.

mod client;
mod types;

pub use client::*;
pub use types::*;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::GraphResult;

/// Prefix that marks a relationship type when probing property values.
pub const RELATIONSHIP_KEY_PREFIX: &str = "REL_";

/// Read access to the knowledge graph.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GraphGateway: Send + Sync {
    /// Labels, relationship types and their declared property names.
    async fn get_schema_info(&self) -> GraphResult<SchemaInfo>;

    /// A bounded sample of distinct values of `property`.
    ///
    /// `key` is a node label, or a relationship type carrying the
    /// [`RELATIONSHIP_KEY_PREFIX`].
    async fn get_property_values(&self, key: &str, property: &str) -> GraphResult<Vec<Value>>;

    /// Run a read query and return its rows in order.
    async fn execute_query(&self, query: &str) -> GraphResult<Vec<Row>>;
}

/// Build the sample lookup key for a relationship type.
pub fn relationship_key(relationship_type: &str) -> String {
    format!("{}{}", RELATIONSHIP_KEY_PREFIX, relationship_type)
}
