use crate::contexts::spec_normalizer::{self, Normalized};
use crate::data::Spec;
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

/// A closed fence, optionally tagged (```json ... ```); both fences start a line
static CLOSED_FENCE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"(?ms)^[ \t]*```[\w-]*[ \t]*\r?\n?(.*?)^[ \t]*```").ok()
});

/// An opening fence whose closing backticks have not arrived yet
static OPEN_FENCE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?ms)^[ \t]*```[\w-]*[ \t]*\r?\n?(.*)\z").ok());

/// Whether the text being extracted can still grow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamPhase {
    Streaming,
    Ended,
}

/// Outcome of one extraction attempt over the full accumulated text
#[derive(Debug, Clone, PartialEq)]
pub enum Extraction {
    Tree(Normalized),
    /// Nothing but whitespace so far
    Empty,
    /// Prose, a clarifying question or markdown; no parse was attempted
    NotJson,
    /// The JSON candidate did not parse, usually because it is truncated
    Incomplete(String),
    /// Valid JSON of neither the flat nor the nested shape
    Unrecognized,
    /// A known shape with no element worth keeping
    Unrepresentable,
}

impl Extraction {
    pub fn spec(&self) -> Option<&Spec> {
        match self {
            Extraction::Tree(normalized) => Some(&normalized.spec),
            _ => None,
        }
    }

    pub fn into_spec(self) -> Option<Spec> {
        match self {
            Extraction::Tree(normalized) => Some(normalized.spec),
            _ => None,
        }
    }

    fn describe(&self) -> String {
        match self {
            Extraction::Tree(_) => "tree".to_string(),
            Extraction::Empty => "empty".to_string(),
            Extraction::NotJson => "not json".to_string(),
            Extraction::Incomplete(reason) => format!("unparseable json: {}", reason),
            Extraction::Unrecognized => "unrecognized shape".to_string(),
            Extraction::Unrepresentable => "no salvageable elements".to_string(),
        }
    }
}

/// Picks the JSON-bearing part of `text`.
///
/// A fenced block wins over everything else, even when its closing fence is
/// still missing. Fences count only at the start of a line, so backticks
/// inside a JSON string are not one. Unfenced text is only a candidate when
/// it opens with `{`.
pub fn json_candidate(text: &str) -> Option<&str> {
    let trimmed = text.trim();
    let patterns: [&Option<Regex>; 2] = [&*CLOSED_FENCE, &*OPEN_FENCE];
    let fenced = patterns.into_iter().find_map(|pattern| {
        pattern
            .as_ref()
            .and_then(|re| re.captures(trimmed))
            .and_then(|captures| captures.get(1))
    });
    if let Some(inner) = fenced {
        return Some(inner.as_str().trim());
    }

    trimmed.starts_with('{').then_some(trimmed)
}

/// Parses the first JSON value of `candidate`; trailing text is ignored
fn first_value(candidate: &str) -> Result<Value, String> {
    match serde_json::Deserializer::from_str(candidate)
        .into_iter::<Value>()
        .next()
    {
        Some(Ok(value)) => Ok(value),
        Some(Err(e)) => Err(e.to_string()),
        None => Err("no JSON value yet".to_string()),
    }
}

/// Extracts a tree from the full text accumulated so far.
///
/// Pure: the same text always yields the same outcome, so calling it on
/// every stream tick is safe.
pub fn extract(text: &str) -> Extraction {
    if text.trim().is_empty() {
        return Extraction::Empty;
    }
    let Some(candidate) = json_candidate(text) else {
        return Extraction::NotJson;
    };

    // An unparseable fenced block yields to a leading JSON value
    let trimmed = text.trim();
    let value = match first_value(candidate) {
        Ok(value) => value,
        Err(reason) if candidate != trimmed && trimmed.starts_with('{') => {
            match first_value(trimmed) {
                Ok(value) => value,
                Err(_) => return Extraction::Incomplete(reason),
            }
        }
        Err(reason) => return Extraction::Incomplete(reason),
    };

    if spec_normalizer::classify(&value).is_none() {
        return Extraction::Unrecognized;
    }
    match spec_normalizer::normalize(&value) {
        Some(normalized) => Extraction::Tree(normalized),
        None => Extraction::Unrepresentable,
    }
}

/// Extracts a tree, reporting failures only once the stream has ended.
pub fn extract_spec(text: &str, phase: StreamPhase) -> Option<Spec> {
    let extraction = extract(text);
    match (&extraction, phase) {
        (Extraction::Tree(normalized), _) => {
            tracing::debug!(
                shape = ?normalized.shape,
                elements = normalized.spec.len(),
                repairs = normalized.repairs.len(),
                "extracted tree"
            );
        }
        (Extraction::Empty | Extraction::NotJson, _) | (_, StreamPhase::Streaming) => {}
        (failure, StreamPhase::Ended) => {
            tracing::warn!(reason = %failure.describe(), "no tree in completed response");
        }
    }
    extraction.into_spec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contexts::spec_normalizer::SourceShape;

    #[test]
    fn test_empty_and_prose_yield_nothing() {
        assert_eq!(extract("   \n "), Extraction::Empty);
        assert_eq!(extract("Could you clarify which role?"), Extraction::NotJson);
        assert_eq!(extract("# Heading\n- bullet"), Extraction::NotJson);
    }

    #[test]
    fn test_truncated_flat_document_then_complete() {
        let first = r#"{"root":"x","elem"#;
        let second = r#"{"root":"x","elements":{"x":{"type":"Card","props":{}}}}"#;

        assert!(matches!(extract(first), Extraction::Incomplete(_)));
        assert_eq!(extract_spec(first, StreamPhase::Streaming), None);

        let spec = extract_spec(second, StreamPhase::Streaming).unwrap();
        assert_eq!(spec.root, "x");
        assert_eq!(spec.root_element().unwrap().element_type, "Card");
    }

    #[test]
    fn test_fenced_nested_card() {
        let text = "```json\n{\"type\":\"Card\",\"props\":{},\"children\":[]}\n```";
        let extraction = extract(text);
        assert!(matches!(&extraction, Extraction::Tree(n) if n.shape == SourceShape::Nested));
        let spec = extraction.into_spec().unwrap();
        assert_eq!(spec.len(), 1);
        assert_eq!(spec.root_element().unwrap().element_type, "Card");
    }

    #[test]
    fn test_fence_after_leading_prose() {
        let text = "Here is the answer:\n```\n{\"type\":\"Text\",\"props\":{\"content\":\"hi\"}}\n```\nThanks!";
        let spec = extract_spec(text, StreamPhase::Ended).unwrap();
        assert_eq!(spec.root_element().unwrap().prop_str("content"), Some("hi"));
    }

    #[test]
    fn test_unclosed_fence_is_still_a_candidate() {
        assert_eq!(json_candidate("```json\n{\"type\":"), Some("{\"type\":"));
        let text = "```json\n{\"type\":\"Card\"}";
        assert!(extract_spec(text, StreamPhase::Streaming).is_some());
    }

    #[test]
    fn test_candidate_requires_leading_brace_without_fence() {
        assert_eq!(json_candidate("  {\"a\":1}  "), Some("{\"a\":1}"));
        assert_eq!(json_candidate("[1, 2]"), None);
        assert_eq!(json_candidate("Sure! {\"type\":\"Card\"}"), None);
    }

    #[test]
    fn test_trailing_prose_after_json_is_ignored() {
        let text = "{\"type\":\"Card\"}\nLet me know if you need more.";
        assert!(extract_spec(text, StreamPhase::Ended).is_some());
    }

    #[test]
    fn test_unrecognized_and_unrepresentable_shapes() {
        assert_eq!(extract("{\"answer\": \"text\"}"), Extraction::Unrecognized);
        assert_eq!(
            extract("{\"root\": \"a\", \"elements\": {}}"),
            Extraction::Unrepresentable
        );
        assert_eq!(extract_spec("{\"answer\": 1}", StreamPhase::Ended), None);
    }

    #[test]
    fn test_backticks_inside_json_string_are_not_a_fence() {
        let text = r#"{"type":"Text","props":{"content":"Run ```cargo test``` first"}}"#;
        assert_eq!(json_candidate(text), Some(text));
        let spec = extract_spec(text, StreamPhase::Ended).unwrap();
        assert_eq!(
            spec.root_element().unwrap().prop_str("content"),
            Some("Run ```cargo test``` first")
        );
    }

    #[test]
    fn test_leading_json_survives_a_later_fenced_snippet() {
        let text = "{\"type\":\"Card\",\"props\":{\"title\":\"T\"}}\n```sh\ncargo test\n```";
        let spec = extract_spec(text, StreamPhase::Ended).unwrap();
        assert_eq!(spec.root_element().unwrap().prop_str("title"), Some("T"));
    }

    #[test]
    fn test_repeated_calls_agree() {
        let text = r#"{"root":"a","elements":{"b":{"type":"Text","parentKey":"a"}}}"#;
        assert_eq!(extract(text), extract(text));
    }
}
