//! Command-line commands.
//!
//! `serve` is handled by the binary; everything else runs a
//! [`WorkflowAgent`] directly and prints to stdout.

use std::fmt::Write as _;

use clap::Subcommand;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::workflow::{AnswerReport, SchemaCache, WorkflowAgent};

/// CLI subcommands.
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Commands {
    /// Run the MCP server over stdio (default)
    Serve,

    /// Answer one question and exit
    Ask {
        /// The question to answer
        question: String,

        /// Print the full answer report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Answer questions interactively until `exit`
    Chat,

    /// Print the knowledge graph schema snapshot
    Schema,
}

/// Result of CLI command execution.
pub struct CliResult {
    /// Exit code (0 = success)
    pub exit_code: i32,
    /// Output message
    pub message: String,
}

impl CliResult {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            exit_code: 0,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            exit_code: 1,
            message: message.into(),
        }
    }
}

/// Answer a single question.
pub async fn execute_ask(agent: &mut WorkflowAgent, question: &str, json: bool) -> CliResult {
    if question.trim().is_empty() {
        return CliResult::error("Question must not be empty");
    }

    match agent.answer_question(question).await {
        Ok(report) if json => match serde_json::to_string_pretty(&report) {
            Ok(text) => CliResult::success(text),
            Err(e) => CliResult::error(format!("Failed to serialize report: {}", e)),
        },
        Ok(report) => CliResult::success(format_report(&report)),
        Err(e) => CliResult::error(format!("Error: {}", e)),
    }
}

/// Print the schema snapshot.
pub fn execute_schema(agent: &WorkflowAgent) -> CliResult {
    CliResult::success(format_schema(agent.schema()))
}

/// Interactive loop: one question per line.
///
/// `exit` or `quit` (or end of input) stops; `clear` forgets the
/// conversation so far.
pub async fn run_chat<R, W>(agent: &mut WorkflowAgent, input: R, mut output: W) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();

    output
        .write_all(b"Helix Navigator. Ask about genes, proteins, diseases and drugs. Type 'exit' to quit.\n")
        .await?;

    loop {
        output.write_all(b"\n> ").await?;
        output.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let question = line.trim();

        match question {
            "" => continue,
            "exit" | "quit" => break,
            "clear" => {
                let cleared = agent.clear_memory();
                output
                    .write_all(format!("Cleared {} turn(s).\n", cleared).as_bytes())
                    .await?;
            }
            _ => {
                let text = match agent.answer_question(question).await {
                    Ok(report) => format_report(&report),
                    Err(e) => format!("Error: {}", e),
                };
                output.write_all(text.as_bytes()).await?;
                output.write_all(b"\n").await?;
            }
        }
    }

    output.flush().await
}

/// Human-readable rendering of an answer report.
pub fn format_report(report: &AnswerReport) -> String {
    let mut out = report.answer.clone();

    if let Some(question_type) = report.question_type {
        let _ = write!(out, "\n\n  type:     {}", question_type);
    }
    if !report.entities.is_empty() {
        let _ = write!(out, "\n  entities: {}", report.entities.join(", "));
    }
    if let Some(query) = &report.query {
        let _ = write!(out, "\n  query:    {}", query.replace('\n', " "));
        let _ = write!(out, "\n  results:  {}", report.results_count);
    }

    out
}

/// Human-readable rendering of the schema snapshot.
pub fn format_schema(schema: &SchemaCache) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "Node labels: {}", schema.node_labels.join(", "));
    let _ = writeln!(
        out,
        "Relationship types: {}",
        schema.relationship_types.join(", ")
    );

    out.push_str("\nNode properties:\n");
    for (label, properties) in schema.sorted_node_properties() {
        let _ = writeln!(out, "  {}: {}", label, properties.join(", "));
    }

    if schema.has_samples() {
        out.push_str("\nSampled values:\n");
        for (property, values) in schema.property_samples() {
            let shown: Vec<String> = values.iter().take(5).map(|v| v.to_string()).collect();
            let _ = writeln!(out, "  {}: {}", property, shown.join(", "));
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AgentConfig;
    use crate::graph::{MockGraphGateway, SchemaInfo};
    use crate::llm::MockLlmGateway;
    use crate::workflow::{QuestionType, CLASSIFY_MAX_TOKENS};
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::Arc;

    fn agent(memory: bool) -> WorkflowAgent {
        let mut llm = MockLlmGateway::new();
        llm.expect_complete()
            .returning(|_, max_tokens| match max_tokens {
                CLASSIFY_MAX_TOKENS => Ok("general_knowledge".to_string()),
                _ => Ok("Insulin regulates blood glucose.".to_string()),
            });

        let schema = SchemaCache::from_parts(
            SchemaInfo {
                node_labels: vec!["Gene".to_string(), "Drug".to_string()],
                relationship_types: vec!["TREATS".to_string()],
                node_properties: HashMap::from([
                    ("Gene".to_string(), vec!["gene_name".to_string()]),
                    ("Drug".to_string(), vec!["drug_name".to_string()]),
                ]),
                ..SchemaInfo::default()
            },
            vec![("drug_name".to_string(), vec![json!("Metformin")])],
        );

        WorkflowAgent::with_schema(
            Arc::new(llm),
            Arc::new(MockGraphGateway::new()),
            Arc::new(schema),
            &AgentConfig {
                conversation_memory: memory,
                chain_of_thought: false,
            },
        )
    }

    #[tokio::test]
    async fn test_ask_plain_output() {
        let mut agent = agent(false);

        let result = execute_ask(&mut agent, "What does insulin do?", false).await;

        assert_eq!(result.exit_code, 0);
        assert!(result.message.starts_with("Insulin regulates blood glucose."));
        assert!(result.message.contains("general_knowledge"));
    }

    #[tokio::test]
    async fn test_ask_json_output() {
        let mut agent = agent(false);

        let result = execute_ask(&mut agent, "What does insulin do?", true).await;
        let report: AnswerReport = serde_json::from_str(&result.message).unwrap();

        assert_eq!(report.question_type, Some(QuestionType::GeneralKnowledge));
    }

    #[tokio::test]
    async fn test_ask_rejects_empty_question() {
        let mut agent = agent(false);

        let result = execute_ask(&mut agent, "   ", false).await;

        assert_eq!(result.exit_code, 1);
    }

    #[test]
    fn test_schema_output() {
        let result = execute_schema(&agent(false));

        assert!(result.message.contains("Node labels: Gene, Drug"));
        assert!(result.message.contains("Relationship types: TREATS"));
        assert!(result.message.contains("  Drug: drug_name"));
        assert!(result.message.contains("  drug_name: \"Metformin\""));
    }

    #[test]
    fn test_format_report_with_query() {
        let report = AnswerReport {
            answer: "BRCA1 is linked to breast cancer.".to_string(),
            question_type: Some(QuestionType::GeneDisease),
            entities: vec!["BRCA1".to_string()],
            query: Some("MATCH (g:Gene)\nRETURN g".to_string()),
            results_count: 2,
            raw_results: vec![],
            error: None,
        };

        let text = format_report(&report);

        assert!(text.contains("entities: BRCA1"));
        assert!(text.contains("query:    MATCH (g:Gene) RETURN g"));
        assert!(text.contains("results:  2"));
    }

    #[tokio::test]
    async fn test_chat_loop_answers_and_exits() {
        let mut agent = agent(true);
        let input: &[u8] = b"What is insulin?\n\nclear\nexit\nnever asked\n";
        let mut output = Vec::new();

        run_chat(&mut agent, input, &mut output).await.unwrap();

        let text = String::from_utf8(output).unwrap();
        assert!(text.contains("Insulin regulates blood glucose."));
        assert!(text.contains("Cleared 1 turn(s)."));
        assert!(agent.memory().unwrap().is_empty());
    }
}
