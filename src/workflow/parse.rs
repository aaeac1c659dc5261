//! Normalization of raw completions into typed stage outputs.

use super::state::QuestionType;

const FENCE: &str = "```";
const QUERY_MARKER: &str = "Query:";

/// Map a classification completion onto a category.
///
/// The completion is trimmed, lowercased and stripped of trailing
/// punctuation. An exact category name wins; otherwise the first category
/// (in enumeration order) appearing anywhere in the text; otherwise
/// general knowledge.
pub fn parse_category(completion: &str) -> QuestionType {
    let normalized = completion
        .trim()
        .to_lowercase()
        .trim_end_matches(['.', ',', ';', ':', '!', '?'])
        .to_string();

    if let Ok(exact) = normalized.parse::<QuestionType>() {
        return exact;
    }

    QuestionType::ALL
        .into_iter()
        .find(|qt| normalized.contains(qt.as_str()))
        .unwrap_or(QuestionType::GeneralKnowledge)
}

/// Pull a JSON list of entity strings out of a completion.
///
/// Code fences are removed, then the first `[`…`]` span (shortest match,
/// newlines allowed) is decoded. Returns `None` when there is no span or it
/// does not decode as a list of strings.
pub fn parse_entities(completion: &str) -> Option<Vec<String>> {
    let cleaned = completion.trim().replace("```json", "").replace(FENCE, "");
    let cleaned = cleaned.trim();

    let open = cleaned.find('[')?;
    let close = open + cleaned[open..].find(']')?;

    serde_json::from_str(&cleaned[open..=close]).ok()
}

/// Clean a query-generation completion into query text.
///
/// A completion opening with a code fence loses its fence lines and any
/// bare language tag line. With `take_marked_line`, everything after the
/// last `Query:` marker line (the rest of that line and all following
/// lines) is used instead, with fence and tag lines removed; a blank
/// remainder falls back to the whole completion.
pub fn parse_query(completion: &str, take_marked_line: bool) -> String {
    let completion = completion.trim();

    if take_marked_line {
        if let Some(marked) = after_last_marker(completion) {
            let query = without_fences(marked);
            if !query.is_empty() {
                return query;
            }
        }
    }

    if completion.starts_with(FENCE) {
        without_fences(completion)
    } else {
        completion.to_string()
    }
}

/// Text following the last `Query:` that opens a line.
fn after_last_marker(text: &str) -> Option<&str> {
    text.rmatch_indices(QUERY_MARKER).find_map(|(at, _)| {
        let line_start = text[..at].rfind('\n').map_or(0, |i| i + 1);
        text[line_start..at]
            .trim()
            .is_empty()
            .then(|| &text[at + QUERY_MARKER.len()..])
    })
}

fn without_fences(text: &str) -> String {
    text.lines()
        .filter(|line| !is_fence_or_tag(line))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

fn is_fence_or_tag(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.starts_with(FENCE) || trimmed.eq_ignore_ascii_case("cypher")
}
