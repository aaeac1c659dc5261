//! Line-delimited JSON-RPC 2.0 over stdio, covering the MCP methods a
//! question-answering client needs: `initialize`, `ping`, `tools/list` and
//! `tools/call`.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, info, warn};

use super::{handle_tool_call, SharedState, ToolOutput};

#[cfg(test)]
#[path = "mcp_tests.rs"]
mod mcp_tests;

const JSONRPC_VERSION: &str = "2.0";
const PROTOCOL_VERSION: &str = "2025-06-18";
const SERVER_NAME: &str = "helix-navigator";

/// Standard JSON-RPC error codes.
pub mod codes {
    pub const PARSE_ERROR: i32 = -32700;
    pub const INVALID_REQUEST: i32 = -32600;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL_ERROR: i32 = -32603;
}

#[derive(Debug, Deserialize)]
pub struct Request {
    /// Missing versions deserialize as empty and are rejected.
    #[serde(default)]
    pub jsonrpc: String,
    /// Absent for notifications.
    pub id: Option<Value>,
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct Response {
    jsonrpc: &'static str,
    pub id: Value,
    #[serde(flatten)]
    pub outcome: Outcome,
}

/// Exactly one of `result` or `error` appears on the wire.
#[derive(Debug, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Result(Value),
    Error(RpcError),
}

#[derive(Debug, Serialize)]
pub struct RpcError {
    pub code: i32,
    pub message: String,
}

impl RpcError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl Response {
    pub fn result(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            outcome: Outcome::Result(result),
        }
    }

    pub fn error(id: Value, error: RpcError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            outcome: Outcome::Error(error),
        }
    }
}

/// An advertised tool and the JSON Schema of its arguments.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    pub name: &'static str,
    pub description: &'static str,
    pub input_schema: Value,
}

/// The tools this server answers, in listing order.
pub fn tool_definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: "answer_question",
            description: "Answer a biomedical question about genes, proteins, diseases and \
                          drugs. Database questions are answered from the knowledge graph; \
                          general biology questions are answered directly.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "question": {
                        "type": "string",
                        "description": "The question in plain English"
                    }
                },
                "required": ["question"],
                "additionalProperties": false
            }),
        },
        argument_free(
            "get_schema",
            "Show the knowledge graph schema: node labels, relationship types, property \
             names and sampled property values.",
        ),
        argument_free(
            "get_history",
            "List the recorded conversation turns, oldest first.",
        ),
        argument_free("clear_history", "Forget all recorded conversation turns."),
    ]
}

fn argument_free(name: &'static str, description: &'static str) -> ToolDefinition {
    ToolDefinition {
        name,
        description,
        input_schema: json!({
            "type": "object",
            "properties": {},
            "additionalProperties": false
        }),
    }
}

#[derive(Debug, Deserialize)]
pub struct CallToolParams {
    pub name: String,
    #[serde(default)]
    pub arguments: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct TextContent {
    #[serde(rename = "type")]
    kind: &'static str,
    pub text: String,
}

impl TextContent {
    fn new(text: String) -> Self {
        Self { kind: "text", text }
    }
}

/// `tools/call` result: a readable line for the client to show and, on
/// success, the full payload (answer report, schema, history) as
/// structured content.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallToolResult {
    pub content: Vec<TextContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub structured_content: Option<Value>,
    pub is_error: bool,
}

impl CallToolResult {
    pub fn failure(message: String) -> Self {
        Self {
            content: vec![TextContent::new(message)],
            structured_content: None,
            is_error: true,
        }
    }
}

impl From<ToolOutput> for CallToolResult {
    fn from(output: ToolOutput) -> Self {
        Self {
            content: vec![TextContent::new(output.summary)],
            structured_content: Some(output.data),
            is_error: false,
        }
    }
}

pub struct McpServer {
    state: SharedState,
}

impl McpServer {
    pub fn new(state: SharedState) -> Self {
        Self { state }
    }

    /// Serve stdin/stdout until stdin closes.
    pub async fn run(&self) -> std::io::Result<()> {
        info!("Helix Navigator MCP server starting");
        self.serve(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
            .await
    }

    /// Answer one JSON message per input line, writing one response line per
    /// request. Blank lines are skipped.
    pub async fn serve<R, W>(&self, input: R, mut output: W) -> std::io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = input.lines();
        while let Some(line) = lines.next_line().await? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            if let Some(response) = self.handle_message(line).await {
                let mut encoded = serde_json::to_vec(&response)?;
                encoded.push(b'\n');
                output.write_all(&encoded).await?;
                output.flush().await?;
            }
        }

        info!("Input closed, shutting down");
        Ok(())
    }

    /// Handle one message. `None` means nothing is written back.
    pub async fn handle_message(&self, message: &str) -> Option<Response> {
        let request: Request = match serde_json::from_str(message) {
            Ok(request) => request,
            Err(e) => {
                warn!(error = %e, "Unparsable message");
                return Some(Response::error(
                    Value::Null,
                    RpcError::new(codes::PARSE_ERROR, format!("Parse error: {}", e)),
                ));
            }
        };

        if request.jsonrpc != JSONRPC_VERSION {
            warn!(version = %request.jsonrpc, method = %request.method, "Wrong JSON-RPC version");
            return Some(Response::error(
                request.id.unwrap_or(Value::Null),
                RpcError::new(
                    codes::INVALID_REQUEST,
                    format!(
                        "Invalid request: jsonrpc must be \"{}\", got \"{}\"",
                        JSONRPC_VERSION, request.jsonrpc
                    ),
                ),
            ));
        }

        let Request {
            id, method, params, ..
        } = request;
        debug!(method = %method, notification = id.is_none(), "Dispatching");

        let outcome = match method.as_str() {
            "initialize" => Ok(initialize_result()),
            "ping" => Ok(json!({})),
            "tools/list" => Ok(json!({ "tools": tool_definitions() })),
            "tools/call" => self.call_tool(params).await,
            _ if id.is_none() => {
                debug!(method = %method, "Notification ignored");
                return None;
            }
            _ => Err(RpcError::new(
                codes::METHOD_NOT_FOUND,
                format!("Method not found: {}", method),
            )),
        };

        let id = id?;
        Some(match outcome {
            Ok(result) => Response::result(id, result),
            Err(error) => Response::error(id, error),
        })
    }

    async fn call_tool(&self, params: Option<Value>) -> Result<Value, RpcError> {
        let params = params
            .ok_or_else(|| RpcError::new(codes::INVALID_PARAMS, "Missing params"))?;
        let params: CallToolParams = serde_json::from_value(params).map_err(|e| {
            RpcError::new(codes::INVALID_PARAMS, format!("Invalid params: {}", e))
        })?;

        info!(tool = %params.name, "Tool call");
        let result = match handle_tool_call(&self.state, &params.name, params.arguments).await {
            Ok(output) => CallToolResult::from(output),
            Err(e) => {
                warn!(tool = %params.name, error = %e, "Tool call failed");
                CallToolResult::failure(format!("Error: {}", e))
            }
        };

        serde_json::to_value(result)
            .map_err(|e| RpcError::new(codes::INTERNAL_ERROR, format!("Internal error: {}", e)))
    }
}

fn initialize_result() -> Value {
    json!({
        "protocolVersion": PROTOCOL_VERSION,
        "capabilities": { "tools": { "listChanged": false } },
        "serverInfo": {
            "name": SERVER_NAME,
            "version": env!("CARGO_PKG_VERSION")
        }
    })
}
