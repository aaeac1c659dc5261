use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use super::types::{Row, SchemaInfo, Statement, StatementResult, TxRequest, TxResponse};
use super::{GraphGateway, RELATIONSHIP_KEY_PREFIX};
use crate::config::{GraphConfig, RequestConfig};
use crate::error::{GraphError, GraphResult};

/// Number of nodes/relationships inspected when discovering property keys.
const PROPERTY_KEY_SCAN: usize = 100;

/// Client for the Neo4j HTTP transactional API
#[derive(Clone)]
pub struct Neo4jClient {
    client: Client,
    commit_url: String,
    user: String,
    password: String,
    sample_limit: usize,
    request_config: RequestConfig,
}

impl Neo4jClient {
    /// Create a new Neo4j client
    pub fn new(config: &GraphConfig, request_config: RequestConfig) -> GraphResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(request_config.timeout_ms))
            .build()
            .map_err(GraphError::Http)?;

        Ok(Self {
            client,
            commit_url: format!(
                "{}/db/{}/tx/commit",
                config.uri.trim_end_matches('/'),
                config.database
            ),
            user: config.user.clone(),
            password: config.password.clone(),
            sample_limit: config.sample_limit,
            request_config,
        })
    }

    /// Run statements in one auto-committed transaction
    pub async fn run(&self, statements: Vec<Statement>) -> GraphResult<Vec<StatementResult>> {
        let request = TxRequest { statements };
        let mut retries = 0;

        loop {
            let start = Instant::now();

            match self.execute_request(&request).await {
                Ok(results) => {
                    debug!(
                        statements = request.statements.len(),
                        latency_ms = start.elapsed().as_millis(),
                        "Neo4j transaction committed"
                    );
                    return Ok(results);
                }
                Err(e) if is_transient(&e) && retries < self.request_config.max_retries => {
                    retries += 1;
                    let delay = self.request_config.backoff(retries);
                    warn!(
                        error = %e,
                        retry = retries,
                        delay_ms = delay.as_millis(),
                        "Retrying Neo4j request"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    error!(
                        error = %e,
                        latency_ms = start.elapsed().as_millis(),
                        retries,
                        "Neo4j request failed"
                    );
                    return Err(e);
                }
            }
        }
    }

    /// Run one statement and return its rows
    pub async fn run_single(&self, statement: Statement) -> GraphResult<Vec<Row>> {
        let mut results = self.run(vec![statement]).await?;
        if results.is_empty() {
            return Err(GraphError::InvalidResponse {
                message: "No result returned for statement".to_string(),
            });
        }
        Ok(results.swap_remove(0).into_rows())
    }

    /// Execute a single request (internal)
    async fn execute_request(&self, request: &TxRequest) -> GraphResult<Vec<StatementResult>> {
        let response = self
            .client
            .post(&self.commit_url)
            .basic_auth(&self.user, Some(&self.password))
            .header("Accept", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GraphError::Timeout {
                        timeout_ms: self.request_config.timeout_ms,
                    }
                } else {
                    GraphError::Http(e)
                }
            })?;

        let status = response.status();

        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(GraphError::Api {
                status: status.as_u16(),
                message: error_body,
            });
        }

        let body: TxResponse = response
            .json()
            .await
            .map_err(|e| GraphError::InvalidResponse {
                message: format!("Failed to parse response: {}", e),
            })?;

        if let Some(err) = body.errors.into_iter().next() {
            return Err(GraphError::Rejected {
                code: err.code,
                message: err.message,
            });
        }

        Ok(body.results)
    }

    /// Distinct property keys over a bounded scan of one label or relationship type
    async fn property_keys(&self, pattern: &str, alias: &str) -> GraphResult<Vec<String>> {
        let statement = Statement::new(format!(
            "MATCH {pattern} WITH {alias} LIMIT {PROPERTY_KEY_SCAN} \
             UNWIND keys({alias}) AS key RETURN DISTINCT key ORDER BY key"
        ));
        let rows = self.run_single(statement).await?;
        Ok(string_column(rows, "key"))
    }
}

/// Transport failures and server-side errors may succeed on retry.
fn is_transient(err: &GraphError) -> bool {
    match err {
        GraphError::Timeout { .. } | GraphError::Http(_) => true,
        GraphError::Api { status, .. } => *status >= 500,
        GraphError::Rejected { .. } | GraphError::InvalidResponse { .. } => false,
    }
}

/// Quote an identifier for interpolation into Cypher.
pub fn quote_identifier(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

fn string_column(rows: Vec<Row>, column: &str) -> Vec<String> {
    rows.into_iter()
        .filter_map(|mut row| match row.remove(column) {
            Some(Value::String(s)) => Some(s),
            _ => None,
        })
        .collect()
}

#[async_trait]
impl GraphGateway for Neo4jClient {
    async fn get_schema_info(&self) -> GraphResult<SchemaInfo> {
        let mut results = self
            .run(vec![
                Statement::new("CALL db.labels() YIELD label RETURN label ORDER BY label"),
                Statement::new(
                    "CALL db.relationshipTypes() YIELD relationshipType \
                     RETURN relationshipType ORDER BY relationshipType",
                ),
            ])
            .await?
            .into_iter();

        let (labels, relationships) = match (results.next(), results.next()) {
            (Some(labels), Some(relationships)) => (labels, relationships),
            _ => {
                return Err(GraphError::InvalidResponse {
                    message: "Expected label and relationship type results".to_string(),
                })
            }
        };
        let node_labels = string_column(labels.into_rows(), "label");
        let relationship_types = string_column(relationships.into_rows(), "relationshipType");

        let mut node_properties = HashMap::new();
        for label in &node_labels {
            let pattern = format!("(n:{})", quote_identifier(label));
            node_properties.insert(label.clone(), self.property_keys(&pattern, "n").await?);
        }

        let mut relationship_properties = HashMap::new();
        for rel_type in &relationship_types {
            let pattern = format!("()-[r:{}]->()", quote_identifier(rel_type));
            relationship_properties.insert(rel_type.clone(), self.property_keys(&pattern, "r").await?);
        }

        info!(
            labels = node_labels.len(),
            relationship_types = relationship_types.len(),
            "Loaded graph schema"
        );

        Ok(SchemaInfo {
            node_labels,
            relationship_types,
            node_properties,
            relationship_properties,
        })
    }

    async fn get_property_values(&self, key: &str, property: &str) -> GraphResult<Vec<Value>> {
        let property = quote_identifier(property);
        let query = match key.strip_prefix(RELATIONSHIP_KEY_PREFIX) {
            Some(rel_type) => format!(
                "MATCH ()-[r:{}]->() WHERE r.{property} IS NOT NULL \
                 RETURN DISTINCT r.{property} AS value LIMIT $limit",
                quote_identifier(rel_type)
            ),
            None => format!(
                "MATCH (n:{}) WHERE n.{property} IS NOT NULL \
                 RETURN DISTINCT n.{property} AS value LIMIT $limit",
                quote_identifier(key)
            ),
        };

        let statement = Statement::new(query).with_parameter("limit", self.sample_limit);
        let rows = self.run_single(statement).await?;

        Ok(rows
            .into_iter()
            .filter_map(|mut row| row.remove("value"))
            .collect())
    }

    async fn execute_query(&self, query: &str) -> GraphResult<Vec<Row>> {
        debug!(query = %query, "Executing generated query");
        self.run_single(Statement::new(query)).await
    }
}
