//! End-to-end pipeline tests against scripted gateways.
//!
//! The fakes record every call so tests can assert exactly which model and
//! graph calls a question caused.

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use helix_navigator::config::AgentConfig;
use helix_navigator::error::{AppError, GraphError, GraphResult, LlmError, LlmResult};
use helix_navigator::graph::{GraphGateway, Row, SchemaInfo};
use helix_navigator::llm::LlmGateway;
use helix_navigator::workflow::{
    QuestionType, Stage, WorkflowAgent, APOLOGY_PREFIX, CLASSIFY_MAX_TOKENS, EXTRACT_MAX_TOKENS,
    GENERATE_MAX_TOKENS, KNOWLEDGE_MAX_TOKENS, NO_RESULTS_ANSWER, SCHEMA_QUERY,
    SUMMARY_MAX_TOKENS,
};

// ============================================================================
// Scripted gateways
// ============================================================================

#[derive(Default)]
struct ScriptedLlm {
    responses: Mutex<VecDeque<LlmResult<String>>>,
    calls: Mutex<Vec<(String, u32)>>,
}

impl ScriptedLlm {
    fn new(responses: Vec<LlmResult<String>>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            calls: Mutex::default(),
        })
    }

    fn replies(texts: &[&str]) -> Arc<Self> {
        Self::new(texts.iter().map(|t| Ok(t.to_string())).collect())
    }

    fn budgets(&self) -> Vec<u32> {
        self.calls.lock().unwrap().iter().map(|(_, b)| *b).collect()
    }

    fn prompt(&self, index: usize) -> String {
        self.calls.lock().unwrap()[index].0.clone()
    }
}

#[async_trait]
impl LlmGateway for ScriptedLlm {
    async fn complete(&self, prompt: &str, max_tokens: u32) -> LlmResult<String> {
        self.calls
            .lock()
            .unwrap()
            .push((prompt.to_string(), max_tokens));
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| panic!("unexpected model call with budget {max_tokens}"))
    }
}

#[derive(Default)]
struct FakeGraph {
    schema: SchemaInfo,
    values: HashMap<(String, String), Vec<Value>>,
    results: Mutex<VecDeque<GraphResult<Vec<Row>>>>,
    queries: Mutex<Vec<String>>,
    lookups: Mutex<Vec<(String, String)>>,
    fail_schema: bool,
}

impl FakeGraph {
    fn with_results(results: Vec<GraphResult<Vec<Row>>>) -> Arc<Self> {
        Arc::new(Self {
            schema: biomedical_schema(),
            results: Mutex::new(results.into()),
            ..Self::default()
        })
    }

    fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl GraphGateway for FakeGraph {
    async fn get_schema_info(&self) -> GraphResult<SchemaInfo> {
        if self.fail_schema {
            return Err(GraphError::Timeout { timeout_ms: 100 });
        }
        Ok(self.schema.clone())
    }

    async fn get_property_values(&self, key: &str, property: &str) -> GraphResult<Vec<Value>> {
        self.lookups
            .lock()
            .unwrap()
            .push((key.to_string(), property.to_string()));
        Ok(self
            .values
            .get(&(key.to_string(), property.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    async fn execute_query(&self, query: &str) -> GraphResult<Vec<Row>> {
        self.queries.lock().unwrap().push(query.to_string());
        self.results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| panic!("unexpected graph query: {query}"))
    }
}

fn biomedical_schema() -> SchemaInfo {
    SchemaInfo {
        node_labels: vec![
            "Gene".to_string(),
            "Protein".to_string(),
            "Disease".to_string(),
            "Drug".to_string(),
        ],
        relationship_types: vec![
            "ENCODES".to_string(),
            "ASSOCIATED_WITH".to_string(),
            "TREATS".to_string(),
        ],
        node_properties: HashMap::from([
            ("Gene".to_string(), vec!["gene_name".to_string()]),
            ("Disease".to_string(), vec!["disease_name".to_string()]),
            ("Drug".to_string(), vec!["drug_name".to_string()]),
        ]),
        relationship_properties: HashMap::from([(
            "TREATS".to_string(),
            vec!["efficacy".to_string()],
        )]),
    }
}

fn row(pairs: &[(&str, Value)]) -> Row {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

async fn agent(
    llm: Arc<ScriptedLlm>,
    graph: Arc<FakeGraph>,
    conversation_memory: bool,
    chain_of_thought: bool,
) -> WorkflowAgent {
    let options = AgentConfig {
        conversation_memory,
        chain_of_thought,
    };
    WorkflowAgent::new(llm, graph, &options, 20).await.unwrap()
}

// ============================================================================
// Category paths
// ============================================================================

#[tokio::test]
async fn test_gene_disease_question_end_to_end() {
    let llm = ScriptedLlm::replies(&[
        "gene_disease",
        "```json\n[\"TP53\"]\n```",
        "```cypher\nMATCH (g:Gene {gene_name: 'TP53'})-[:ASSOCIATED_WITH]->(d:Disease)\nRETURN d.disease_name LIMIT 10\n```",
        "TP53 is associated with Li-Fraumeni syndrome and breast cancer.",
    ]);
    let rows: Vec<Row> = ["Li-Fraumeni syndrome", "Breast cancer", "Sarcoma", "Glioma"]
        .iter()
        .map(|name| row(&[("d.disease_name", json!(name))]))
        .collect();
    let graph = FakeGraph::with_results(vec![Ok(rows)]);
    let mut agent = agent(llm.clone(), graph.clone(), false, false).await;

    let report = agent
        .answer_question("What diseases is TP53 associated with?")
        .await
        .unwrap();

    assert_eq!(report.question_type, Some(QuestionType::GeneDisease));
    assert_eq!(report.entities, vec!["TP53"]);
    assert_eq!(
        report.query.as_deref(),
        Some("MATCH (g:Gene {gene_name: 'TP53'})-[:ASSOCIATED_WITH]->(d:Disease)\nRETURN d.disease_name LIMIT 10")
    );
    assert_eq!(report.results_count, 4);
    assert_eq!(report.raw_results.len(), 3);
    assert_eq!(
        report.answer,
        "TP53 is associated with Li-Fraumeni syndrome and breast cancer."
    );
    assert!(report.error.is_none());

    assert_eq!(
        llm.budgets(),
        vec![
            CLASSIFY_MAX_TOKENS,
            EXTRACT_MAX_TOKENS,
            GENERATE_MAX_TOKENS,
            SUMMARY_MAX_TOKENS
        ]
    );
    assert_eq!(graph.queries(), vec![report.query.unwrap()]);

    let generation = llm.prompt(2);
    assert!(generation.contains("TP53"));
    assert!(generation.contains("ASSOCIATED_WITH"));
}

#[tokio::test]
async fn test_empty_results_skip_formatting_call() {
    let llm = ScriptedLlm::replies(&[
        "gene_disease",
        "[\"FAKEGENE1\"]",
        "MATCH (g:Gene {gene_name: 'FAKEGENE1'})-[:ASSOCIATED_WITH]->(d) RETURN d LIMIT 10",
    ]);
    let graph = FakeGraph::with_results(vec![Ok(vec![])]);
    let mut agent = agent(llm.clone(), graph, false, false).await;

    let report = agent
        .answer_question("What diseases is FAKEGENE1 linked to?")
        .await
        .unwrap();

    assert_eq!(report.answer, NO_RESULTS_ANSWER);
    assert_eq!(report.results_count, 0);
    assert_eq!(llm.budgets().len(), 3);
}

#[tokio::test]
async fn test_general_db_uses_fixed_query_without_extraction() {
    let llm = ScriptedLlm::replies(&["general_db", "The graph holds genes, drugs and diseases."]);
    let graph = FakeGraph::with_results(vec![Ok(vec![
        row(&[("node_type", json!(["Gene"])), ("count", json!(120))]),
        row(&[("node_type", json!(["Drug"])), ("count", json!(45))]),
    ])]);
    let mut agent = agent(llm.clone(), graph.clone(), false, false).await;

    let report = agent.answer_question("What is in the database?").await.unwrap();

    assert_eq!(report.question_type, Some(QuestionType::GeneralDb));
    assert!(report.entities.is_empty());
    assert_eq!(report.query.as_deref(), Some(SCHEMA_QUERY));
    assert_eq!(graph.queries(), vec![SCHEMA_QUERY.to_string()]);
    assert_eq!(llm.budgets(), vec![CLASSIFY_MAX_TOKENS, SUMMARY_MAX_TOKENS]);
}

#[tokio::test]
async fn test_general_knowledge_never_touches_graph() {
    let llm = ScriptedLlm::replies(&[
        "general_knowledge",
        "A gene is a unit of heredity encoded in DNA.",
    ]);
    let graph = FakeGraph::with_results(vec![]);
    let mut agent = agent(llm.clone(), graph.clone(), false, false).await;

    let report = agent.answer_question("What is a gene?").await.unwrap();

    assert_eq!(report.question_type, Some(QuestionType::GeneralKnowledge));
    assert!(report.query.is_none());
    assert_eq!(report.results_count, 0);
    assert_eq!(report.answer, "A gene is a unit of heredity encoded in DNA.");
    assert!(graph.queries().is_empty());
    assert_eq!(llm.budgets(), vec![CLASSIFY_MAX_TOKENS, KNOWLEDGE_MAX_TOKENS]);
}

// ============================================================================
// Recovery
// ============================================================================

#[tokio::test]
async fn test_graph_failure_becomes_apology() {
    let llm = ScriptedLlm::replies(&[
        "drug_treatment",
        "[\"Hypertension\"]",
        "MATCH (d:Drug)-[:TREATS]->(x:Disease) RETURN d LIMIT 10",
    ]);
    let graph = FakeGraph::with_results(vec![Err(GraphError::Rejected {
        code: "Neo.ClientError.Statement.SyntaxError".to_string(),
        message: "Variable `x` not defined".to_string(),
    })]);
    let mut agent = agent(llm.clone(), graph, false, false).await;

    let report = agent
        .answer_question("Which drugs treat hypertension?")
        .await
        .unwrap();

    let error = report.error.clone().unwrap();
    assert!(error.starts_with("Query failed: "));
    assert!(error.contains("Variable `x` not defined"));
    assert_eq!(report.answer, format!("{}{}", APOLOGY_PREFIX, error));
    assert_eq!(report.entities, vec!["Hypertension"]);
    assert_eq!(llm.budgets().len(), 3);
}

#[tokio::test]
async fn test_classification_failure_answers_with_apology() {
    let llm = ScriptedLlm::new(vec![Err(LlmError::Api {
        status: 500,
        message: "internal".to_string(),
    })]);
    let graph = FakeGraph::with_results(vec![]);
    let mut agent = agent(llm.clone(), graph.clone(), false, false).await;

    let report = agent.answer_question("What does BRCA1 do?").await.unwrap();

    assert_eq!(report.question_type, Some(QuestionType::GeneralKnowledge));
    assert!(report.error.as_deref().unwrap().starts_with("Classification failed: "));
    assert!(report.answer.starts_with(APOLOGY_PREFIX));
    assert_eq!(llm.budgets(), vec![CLASSIFY_MAX_TOKENS]);
    assert!(graph.queries().is_empty());
}

#[tokio::test]
async fn test_unparsable_entities_do_not_set_error() {
    let llm = ScriptedLlm::replies(&[
        "protein_function",
        "I cannot find entities",
        "MATCH (p:Protein) RETURN p LIMIT 10",
        "Several proteins are listed.",
    ]);
    let graph = FakeGraph::with_results(vec![Ok(vec![row(&[("p", json!({"name": "p53"}))])])]);
    let mut agent = agent(llm, graph, false, false).await;

    let report = agent.answer_question("What do proteins do here?").await.unwrap();

    assert!(report.entities.is_empty());
    assert!(report.error.is_none());
    assert_eq!(report.answer, "Several proteins are listed.");
}

#[tokio::test]
async fn test_generation_failure_propagates() {
    let llm = ScriptedLlm::new(vec![
        Ok("gene_disease".to_string()),
        Ok("[\"TP53\"]".to_string()),
        Err(LlmError::Timeout { timeout_ms: 30000 }),
    ]);
    let graph = FakeGraph::with_results(vec![]);
    let mut agent = agent(llm, graph.clone(), true, false).await;

    let err = agent
        .answer_question("What diseases is TP53 linked to?")
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        AppError::Stage {
            stage: Stage::Generate,
            source: LlmError::Timeout { .. }
        }
    ));
    assert!(graph.queries().is_empty());
    assert!(agent.memory().unwrap().is_empty());
}

// ============================================================================
// Memory and prompt style
// ============================================================================

#[tokio::test]
async fn test_memory_holds_one_turn_per_call_in_order() {
    let llm = ScriptedLlm::replies(&[
        // 1: general knowledge
        "general_knowledge",
        "Insulin is a hormone.",
        // 2: database question whose query fails
        "general_db",
        // 3: general knowledge again
        "general_knowledge",
        "It lowers blood glucose.",
    ]);
    let graph = FakeGraph::with_results(vec![Err(GraphError::Timeout { timeout_ms: 5 })]);
    let mut agent = agent(llm.clone(), graph, true, false).await;

    let questions = ["What is insulin?", "How many nodes are there?", "What does it do?"];
    let mut answers = Vec::new();
    for question in questions {
        answers.push(agent.answer_question(question).await.unwrap().answer);
    }

    let turns = agent.memory().unwrap().turns();
    assert_eq!(turns.len(), 3);
    for (i, turn) in turns.iter().enumerate() {
        assert_eq!(turn.question, questions[i]);
        assert_eq!(turn.answer, answers[i]);
    }
    assert!(turns[1].answer.starts_with(APOLOGY_PREFIX));

    // Third classification sees both earlier turns; the first saw none.
    assert!(!llm.prompt(0).contains("Previous conversation:"));
    let third_classification = llm.prompt(3);
    assert!(third_classification.contains("Previous conversation:"));
    assert!(third_classification.contains("User 1: What is insulin?"));
    assert!(third_classification.contains("Agent 2: Sorry, I had trouble"));
}

#[tokio::test]
async fn test_chain_of_thought_takes_marked_query_line() {
    let llm = ScriptedLlm::replies(&[
        "Step 1: the question names a drug.\nCategory: drug_treatment",
        "[\"Metformin\"]",
        "The question asks what Metformin treats.\nQuery: MATCH (d:Drug {drug_name: 'Metformin'})-[:TREATS]->(x:Disease) RETURN x.disease_name LIMIT 10",
        "Metformin treats type 2 diabetes.",
    ]);
    let graph = FakeGraph::with_results(vec![Ok(vec![row(&[(
        "x.disease_name",
        json!("Type 2 diabetes"),
    )])])]);
    let mut agent = agent(llm, graph.clone(), false, true).await;

    let report = agent.answer_question("What does Metformin treat?").await.unwrap();

    assert_eq!(report.question_type, Some(QuestionType::DrugTreatment));
    assert_eq!(
        graph.queries(),
        vec!["MATCH (d:Drug {drug_name: 'Metformin'})-[:TREATS]->(x:Disease) RETURN x.disease_name LIMIT 10"]
    );
    assert_eq!(report.answer, "Metformin treats type 2 diabetes.");
}

#[tokio::test]
async fn test_chain_of_thought_query_on_line_after_marker() {
    let llm = ScriptedLlm::replies(&[
        "Category: gene_disease",
        "[\"BRCA1\"]",
        "Thought: BRCA1 links to diseases.\nQuery:\nMATCH (g:Gene {gene_name: 'BRCA1'})-[:ASSOCIATED_WITH]->(x:Disease)\nRETURN x.disease_name LIMIT 10",
        "BRCA1 is associated with breast cancer.",
    ]);
    let graph = FakeGraph::with_results(vec![Ok(vec![row(&[(
        "x.disease_name",
        json!("Breast cancer"),
    )])])]);
    let mut agent = agent(llm, graph.clone(), false, true).await;

    let report = agent.answer_question("Which diseases involve BRCA1?").await.unwrap();

    assert_eq!(
        graph.queries(),
        vec!["MATCH (g:Gene {gene_name: 'BRCA1'})-[:ASSOCIATED_WITH]->(x:Disease)\nRETURN x.disease_name LIMIT 10"]
    );
    assert!(report.error.is_none());
    assert_eq!(report.answer, "BRCA1 is associated with breast cancer.");
}

// ============================================================================
// Schema snapshot
// ============================================================================

#[tokio::test]
async fn test_agent_construction_samples_properties() {
    let graph = Arc::new(FakeGraph {
        schema: biomedical_schema(),
        values: HashMap::from([
            (
                ("Drug".to_string(), "drug_name".to_string()),
                vec![json!("Lisinopril"), json!("Metformin")],
            ),
            (
                ("REL_TREATS".to_string(), "efficacy".to_string()),
                vec![json!(0.8)],
            ),
        ]),
        ..FakeGraph::default()
    });
    let agent = agent(ScriptedLlm::replies(&[]), graph.clone(), false, false).await;

    let schema = agent.schema();
    assert_eq!(schema.node_labels.len(), 4);
    assert_eq!(
        schema.samples("drug_name").unwrap(),
        &[json!("Lisinopril"), json!("Metformin")]
    );
    assert_eq!(schema.samples("efficacy").unwrap(), &[json!(0.8)]);
    assert!(schema.samples("gene_name").is_none());
    assert!(graph
        .lookups
        .lock()
        .unwrap()
        .contains(&("REL_TREATS".to_string(), "efficacy".to_string())));
}

#[tokio::test]
async fn test_schema_failure_aborts_construction() {
    let graph = Arc::new(FakeGraph {
        fail_schema: true,
        ..FakeGraph::default()
    });

    let result = WorkflowAgent::new(
        ScriptedLlm::replies(&[]),
        graph,
        &AgentConfig::default(),
        20,
    )
    .await;

    assert!(matches!(result, Err(AppError::Graph(_))));
}
