//! Prompt assembly for each stage.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::schema::SchemaCache;
use super::state::PipelineState;
use crate::graph::Row;
use crate::prompts::{
    render, CLASSIFICATION_PROMPT, COT_CLASSIFICATION_PROMPT, COT_ENTITY_EXTRACTION_PROMPT,
    COT_GENERAL_KNOWLEDGE_PROMPT, COT_QUERY_GENERATION_PROMPT, COT_RESULTS_SUMMARY_PROMPT,
    ENTITY_EXTRACTION_PROMPT, GENERAL_KNOWLEDGE_PROMPT, QUERY_GENERATION_PROMPT,
    RESULTS_SUMMARY_PROMPT,
};

/// Sample values shown per property in the extraction prompt.
pub const EXTRACTION_SAMPLES_PER_PROPERTY: usize = 3;

/// Result rows shown to the model when summarizing.
pub const SUMMARY_SAMPLE_ROWS: usize = 5;

/// How prompts are phrased.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptStyle {
    /// Short direct instructions.
    #[default]
    Compact,
    /// Ask the model to reason step by step before answering.
    ChainOfThought,
}

/// Builds stage prompts from pipeline state, the schema snapshot and history.
#[derive(Debug, Clone, Copy, Default)]
pub struct PromptAssembler {
    style: PromptStyle,
}

impl PromptAssembler {
    pub fn new(style: PromptStyle) -> Self {
        Self { style }
    }

    pub fn style(&self) -> PromptStyle {
        self.style
    }

    fn pick(&self, compact: &'static str, cot: &'static str) -> &'static str {
        match self.style {
            PromptStyle::Compact => compact,
            PromptStyle::ChainOfThought => cot,
        }
    }

    pub fn classification(&self, question: &str, history: Option<&str>) -> String {
        let template = self.pick(CLASSIFICATION_PROMPT, COT_CLASSIFICATION_PROMPT);
        render(
            template,
            &[
                ("conversation_history", history_section(history).as_str()),
                ("question", question),
            ],
        )
    }

    pub fn extraction(
        &self,
        question: &str,
        schema: &SchemaCache,
        history: Option<&str>,
    ) -> String {
        let template = self.pick(ENTITY_EXTRACTION_PROMPT, COT_ENTITY_EXTRACTION_PROMPT);

        let property_info: Vec<String> = schema
            .property_samples()
            .map(|(name, values)| {
                format!(
                    "- {}: {}",
                    name,
                    join_values(values.iter().take(EXTRACTION_SAMPLES_PER_PROPERTY))
                )
            })
            .collect();
        let property_info = if property_info.is_empty() {
            "- No property values available".to_string()
        } else {
            property_info.join("\n")
        };

        render(
            template,
            &[
                ("conversation_history", history_section(history).as_str()),
                ("entity_types", schema.node_labels.join(", ").as_str()),
                ("property_info", property_info.as_str()),
                ("question", question),
            ],
        )
    }

    /// History is only threaded into the chain-of-thought form.
    pub fn query_generation(
        &self,
        state: &PipelineState,
        schema: &SchemaCache,
        history: Option<&str>,
    ) -> String {
        let template = self.pick(QUERY_GENERATION_PROMPT, COT_QUERY_GENERATION_PROMPT);
        let entities = serde_json::to_string(state.entities()).unwrap_or_else(|_| "[]".to_string());

        render(
            template,
            &[
                ("conversation_history", history_section(history).as_str()),
                ("question", state.user_question.as_str()),
                ("question_type", state.category().as_str()),
                ("node_labels", schema.node_labels.join(", ").as_str()),
                ("relationship_types", schema.relationship_types.join(", ").as_str()),
                ("node_properties", node_property_catalog(schema).as_str()),
                ("property_values", property_value_catalog(schema).as_str()),
                ("relationship_guide", relationship_guide(schema).as_str()),
                ("entities", entities.as_str()),
            ],
        )
    }

    pub fn general_knowledge(&self, question: &str) -> String {
        let template = self.pick(GENERAL_KNOWLEDGE_PROMPT, COT_GENERAL_KNOWLEDGE_PROMPT);
        render(template, &[("question", question)])
    }

    pub fn results_summary(&self, question: &str, results: &[Row]) -> String {
        let template = self.pick(RESULTS_SUMMARY_PROMPT, COT_RESULTS_SUMMARY_PROMPT);
        let sample = &results[..results.len().min(SUMMARY_SAMPLE_ROWS)];
        let rendered = serde_json::to_string_pretty(sample).unwrap_or_else(|_| "[]".to_string());

        render(
            template,
            &[
                ("question", question),
                ("results", rendered.as_str()),
                ("total_found", results.len().to_string().as_str()),
            ],
        )
    }
}

/// History block followed by a blank line, or nothing at all.
fn history_section(history: Option<&str>) -> String {
    match history {
        Some(block) if !block.is_empty() => format!("{}\n\n", block),
        _ => String::new(),
    }
}

fn join_values<'a>(values: impl Iterator<Item = &'a Value>) -> String {
    values.map(display_value).collect::<Vec<_>>().join(", ")
}

/// Strings without quotes, everything else as JSON.
fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn node_property_catalog(schema: &SchemaCache) -> String {
    let lines: Vec<String> = schema
        .sorted_node_properties()
        .into_iter()
        .map(|(label, props)| format!("- {}: {}", label, props.join(", ")))
        .collect();
    if lines.is_empty() {
        "- No node properties available".to_string()
    } else {
        lines.join("\n")
    }
}

fn property_value_catalog(schema: &SchemaCache) -> String {
    let lines: Vec<String> = schema
        .property_samples()
        .map(|(name, values)| {
            let kind = match values.first() {
                Some(Value::String(_)) => "text values",
                _ => "numeric values",
            };
            let listed = serde_json::to_string(values).unwrap_or_default();
            format!("- {}: {} ({})", name, listed, kind)
        })
        .collect();
    if lines.is_empty() {
        "- No values available".to_string()
    } else {
        lines.join("\n")
    }
}

fn relationship_guide(schema: &SchemaCache) -> String {
    let mut guide = String::from("Available relationships:");
    for rel_type in &schema.relationship_types {
        guide.push_str("\n- ");
        guide.push_str(rel_type);
    }
    guide
}

impl From<bool> for PromptStyle {
    fn from(chain_of_thought: bool) -> Self {
        if chain_of_thought {
            PromptStyle::ChainOfThought
        } else {
            PromptStyle::Compact
        }
    }
}
