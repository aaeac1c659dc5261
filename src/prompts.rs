//! Centralized prompt templates for the pipeline stages
//!
//! Every stage has a compact form and a chain-of-thought form. Placeholders
//! are written `{name}` and filled by [`render`]; unknown placeholders are
//! left untouched so literal braces in examples survive.

/// Compact classification prompt.
pub const CLASSIFICATION_PROMPT: &str = r#"{conversation_history}Classify this biomedical question. Choose one:
- gene_disease: genes and diseases
- drug_treatment: drugs and treatments
- protein_function: proteins and functions
- general_db: database exploration
- general_knowledge: biomedical concepts

Question: {question}

Respond with just the type."#;

/// Chain-of-thought classification prompt.
pub const COT_CLASSIFICATION_PROMPT: &str = r#"Classify this biomedical question into one category.

{conversation_history}Categories:
- gene_disease: Questions about genes and diseases
- drug_treatment: Questions about drugs treating diseases
- protein_function: Questions about protein functions
- general_db: Questions about database structure
- general_knowledge: General biomedical facts

Question: {question}

Think about the main focus of the question, then respond with ONLY the category name."#;

/// Compact entity extraction prompt.
pub const ENTITY_EXTRACTION_PROMPT: &str = r#"{conversation_history}Extract specific biomedical entities from this question.

Available entity types: {entity_types}
Available property values:
{property_info}

Question: {question}

Extract specific names and property values. Return JSON list: ["term1", "term2"] or []"#;

/// Chain-of-thought entity extraction prompt.
pub const COT_ENTITY_EXTRACTION_PROMPT: &str = r#"Extract specific biomedical entities from this question.

{conversation_history}ONLY extract:
- Specific disease names (e.g., "Hypertension", "Breast Cancer")
- Specific drug names (e.g., "Lisinopril")
- Specific gene names (e.g., "TP53")
- Property values (e.g., "approved", "common", "severe", "small molecule")

DO NOT extract:
- Generic types ("drugs", "genes", "diseases")
- Actions ("treat", "associated with")
- Question words ("what", "which")

Database context:
Nodes: {entity_types}
{property_info}

Question: {question}

Return ONLY a JSON list like: ["entity1", "entity2"] or []"#;

/// Compact Cypher generation prompt.
pub const QUERY_GENERATION_PROMPT: &str = r#"Create a Cypher query for this biomedical question:

Question: {question}
Type: {question_type}
Schema:
Nodes: {node_labels}
Relations: {relationship_types}
Property names and values:
Node properties:
{node_properties}
Available property values:
{property_values}
Use WHERE property IN [value1, value2] for filtering.

{relationship_guide}
Entities: {entities}

Use MATCH, WHERE with CONTAINS for filtering, RETURN, LIMIT 10.
IMPORTANT: Use property names from schema above and IN filtering for property values.
Return only the Cypher query."#;

/// Chain-of-thought Cypher generation prompt.
pub const COT_QUERY_GENERATION_PROMPT: &str = r#"You are an expert in Cypher query language and biomedical knowledge graphs.

{conversation_history}Your task: Generate an accurate Cypher query based on the user's question.

Question: {question}
Type: {question_type}
Extracted Entities: {entities}

Database Schema:
Nodes: {node_labels}
Relationships: {relationship_types}
Node properties:
{node_properties}
Available property values:
{property_values}

{relationship_guide}

Here's your thought process:
1. Understand what the user is asking for
2. Identify which nodes and relationships are needed
3. Determine how to filter using the extracted entities
4. Construct the MATCH pattern
5. Add WHERE clauses for filtering
6. Define what to RETURN
7. Add LIMIT 10

Guidelines:
- Use exact label names from the schema
- For filtering, use: WHERE property IN [value1, value2] or WHERE property = 'value'
- Do NOT use elementId() or other internal functions
- Always add LIMIT 10

Example:
Question: "Which drugs treat Hypertension?"
Thought: Need Drug nodes that TREAT Disease nodes. Filter Disease by name = "Hypertension".
Query: MATCH (dr:Drug)-[:TREATS]->(d:Disease {disease_name: 'Hypertension'}) RETURN dr.drug_name LIMIT 10

Now generate the query. Think step-by-step, then provide ONLY the Cypher query on the last line starting with "Query:""#;

/// Compact general-knowledge answer prompt.
pub const GENERAL_KNOWLEDGE_PROMPT: &str = r#"Answer this general biomedical question using your knowledge:

Question: {question}

Provide a clear, informative answer about biomedical concepts."#;

/// Chain-of-thought general-knowledge answer prompt.
pub const COT_GENERAL_KNOWLEDGE_PROMPT: &str = r#"You are a helpful biomedical assistant. Your task is to answer the user's general biomedical question comprehensively and clearly using your extensive knowledge. Think step-by-step to formulate a well-structured and informative answer.

Here's your thought process:
1.  **Understand the Question**: Fully grasp the scope and specific focus of the general biomedical question.
2.  **Recall Relevant Knowledge**: Gather all pertinent information related to the question.
3.  **Structure the Answer**: Start with a direct answer, then provide supporting details or context.
4.  **Ensure Clarity and Conciseness**: Avoid jargon where possible while maintaining scientific accuracy.
5.  **Review for Completeness**: Check that all parts of the question have been addressed.

Question: {question}

Answer:"#;

/// Compact results summarization prompt.
pub const RESULTS_SUMMARY_PROMPT: &str = r#"Convert these database results into a clear answer:

Question: {question}
Results: {results}
Total found: {total_found}

Make it concise and informative."#;

/// Chain-of-thought results summarization prompt.
pub const COT_RESULTS_SUMMARY_PROMPT: &str = r#"You are a helpful biomedical assistant. Your task is to convert raw database results into a clear, concise, and informative answer to the user's question. Think step-by-step to best present the information.

Here's your thought process:
1.  **Understand the Question**: Re-read the original user question to ensure the answer directly addresses it.
2.  **Review Database Results**: Examine the provided `Results` (up to 5 examples) and the `Total found` count.
3.  **Extract Key Information**: Pull out the essential data points that directly answer the question.
4.  **Synthesize into Natural Language**: Convert the structured output into fluid sentences rather than raw key-value pairs.
5.  **Handle Multiple Results**: If `Total found` is greater than the number of examples shown, say there are more results.
6.  **Ensure Conciseness and Clarity**: Keep the answer easy to understand and to the point.

Question: {question}
Results: {results}
Total found: {total_found}

Answer:"#;

/// Fill `{name}` placeholders in a single pass.
///
/// Substituted values are never rescanned, so user text containing braces
/// cannot inject further substitutions.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];

        let replacement = after.find('}').and_then(|close| {
            let name = &after[..close];
            vars.iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| (*value, close))
        });

        match replacement {
            Some((value, close)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}
