use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// One result row: column name to scalar (or null) value.
pub type Row = Map<String, Value>;

/// Structural metadata reported by the graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaInfo {
    pub node_labels: Vec<String>,
    pub relationship_types: Vec<String>,
    #[serde(default)]
    pub node_properties: HashMap<String, Vec<String>>,
    #[serde(default)]
    pub relationship_properties: HashMap<String, Vec<String>>,
}

/// Request body for the transactional commit endpoint
#[derive(Debug, Clone, Serialize)]
pub struct TxRequest {
    pub statements: Vec<Statement>,
}

/// A single Cypher statement with parameters
#[derive(Debug, Clone, Serialize)]
pub struct Statement {
    pub statement: String,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub parameters: Map<String, Value>,
}

/// Response body from the transactional commit endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct TxResponse {
    #[serde(default)]
    pub results: Vec<StatementResult>,
    #[serde(default)]
    pub errors: Vec<TxError>,
}

/// Columns and rows for one statement
#[derive(Debug, Clone, Deserialize)]
pub struct StatementResult {
    pub columns: Vec<String>,
    #[serde(default)]
    pub data: Vec<RowData>,
}

/// Row payload; only the `row` representation is requested
#[derive(Debug, Clone, Deserialize)]
pub struct RowData {
    pub row: Vec<Value>,
}

/// Error reported by the server for a statement
#[derive(Debug, Clone, Deserialize)]
pub struct TxError {
    pub code: String,
    pub message: String,
}

impl Statement {
    /// Statement without parameters
    pub fn new(statement: impl Into<String>) -> Self {
        Self {
            statement: statement.into(),
            parameters: Map::new(),
        }
    }

    /// Add a parameter
    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }
}

impl StatementResult {
    /// Zip each row with the column names.
    pub fn into_rows(self) -> Vec<Row> {
        let columns = self.columns;
        self.data
            .into_iter()
            .map(|data| columns.iter().cloned().zip(data.row).collect())
            .collect()
    }
}
