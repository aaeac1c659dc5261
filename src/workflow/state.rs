use serde::{Deserialize, Serialize};

use crate::graph::Row;

/// Question categories, in the order used for substring matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    /// Genes and the diseases they are associated with.
    GeneDisease,
    /// Drugs and what they treat.
    DrugTreatment,
    /// Proteins and their functions.
    ProteinFunction,
    /// Questions about the database itself.
    GeneralDb,
    /// Biomedical concepts answered without the database.
    GeneralKnowledge,
}

impl QuestionType {
    /// All categories in enumeration order.
    pub const ALL: [QuestionType; 5] = [
        QuestionType::GeneDisease,
        QuestionType::DrugTreatment,
        QuestionType::ProteinFunction,
        QuestionType::GeneralDb,
        QuestionType::GeneralKnowledge,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::GeneDisease => "gene_disease",
            QuestionType::DrugTreatment => "drug_treatment",
            QuestionType::ProteinFunction => "protein_function",
            QuestionType::GeneralDb => "general_db",
            QuestionType::GeneralKnowledge => "general_knowledge",
        }
    }

    /// Whether answering requires entities extracted from the question.
    pub fn needs_entities(&self) -> bool {
        !matches!(self, QuestionType::GeneralDb | QuestionType::GeneralKnowledge)
    }
}

impl std::fmt::Display for QuestionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for QuestionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        QuestionType::ALL
            .into_iter()
            .find(|qt| qt.as_str() == s)
            .ok_or_else(|| format!("Unknown question type: {}", s))
    }
}

/// The record threaded through the five stages for one question.
///
/// Stages only ever fill fields in; nothing is unset once written.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PipelineState {
    pub user_question: String,
    pub question_type: Option<QuestionType>,
    pub entities: Option<Vec<String>>,
    pub query: Option<String>,
    pub results: Option<Vec<Row>>,
    pub final_answer: Option<String>,
    pub error: Option<String>,
}

impl PipelineState {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            user_question: question.into(),
            ..Self::default()
        }
    }

    /// Category, treating an unclassified state as general knowledge.
    pub fn category(&self) -> QuestionType {
        self.question_type.unwrap_or(QuestionType::GeneralKnowledge)
    }

    pub fn entities(&self) -> &[String] {
        self.entities.as_deref().unwrap_or_default()
    }

    pub fn results(&self) -> &[Row] {
        self.results.as_deref().unwrap_or_default()
    }

    /// Record a recoverable failure for the format stage.
    pub fn record_error(&mut self, message: String) {
        self.error = Some(message);
    }
}

/// What `answer_question` hands back to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerReport {
    pub answer: String,
    pub question_type: Option<QuestionType>,
    pub entities: Vec<String>,
    pub query: Option<String>,
    pub results_count: usize,
    /// At most the first three rows.
    pub raw_results: Vec<Row>,
    pub error: Option<String>,
}

/// Fallback answer for a run that reached the end without one.
pub const NO_ANSWER: &str = "No answer generated";

/// Rows included in [`AnswerReport::raw_results`].
pub const RAW_RESULTS_LIMIT: usize = 3;

impl From<PipelineState> for AnswerReport {
    fn from(state: PipelineState) -> Self {
        let results = state.results.unwrap_or_default();
        Self {
            answer: state.final_answer.unwrap_or_else(|| NO_ANSWER.to_string()),
            question_type: state.question_type,
            entities: state.entities.unwrap_or_default(),
            query: state.query,
            results_count: results.len(),
            raw_results: results.into_iter().take(RAW_RESULTS_LIMIT).collect(),
            error: state.error,
        }
    }
}
