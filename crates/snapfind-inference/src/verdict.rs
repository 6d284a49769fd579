//! Parsing of oracle face-match output.
//!
//! Models often wrap JSON in a markdown fence or add a sentence around it,
//! so parsing is lenient about the envelope but strict about the shape:
//! an object whose `matchedIds` (or `matched_ids`) is a list of IDs.

use serde_json::Value;

/// What the oracle said about one batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OracleVerdict {
    /// The response had the expected shape.
    Parsed { matched_ids: Vec<String> },
    /// Anything else; the raw text is kept for logging.
    Unparsable { raw_text: String },
}

impl OracleVerdict {
    pub fn parse(text: &str) -> Self {
        let cleaned = strip_code_fence(text);
        match first_verdict(cleaned).or_else(|| first_verdict(text)) {
            Some(matched_ids) => OracleVerdict::Parsed { matched_ids },
            None => OracleVerdict::Unparsable {
                raw_text: text.to_string(),
            },
        }
    }
}

/// The body of the first markdown code fence (with or without a language
/// tag), cut at its closing fence. Text without a fence is only trimmed.
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(open) = trimmed.find("```") else {
        return trimmed;
    };
    let body = trimmed[open + 3..]
        .trim_start_matches(|c: char| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    match body.find("```") {
        Some(close) => body[..close].trim(),
        None => body.trim(),
    }
}

/// Matched IDs from the first complete JSON object that has them.
///
/// Each `{` is tried as the start of a value and the stream deserializer
/// stops at the end of that value, so braces in surrounding prose are ignored.
fn first_verdict(text: &str) -> Option<Vec<String>> {
    text.match_indices('{').find_map(|(start, _)| {
        let mut values = serde_json::Deserializer::from_str(&text[start..]).into_iter::<Value>();
        match values.next() {
            Some(Ok(value)) => matched_ids(&value),
            _ => None,
        }
    })
}

fn matched_ids(value: &Value) -> Option<Vec<String>> {
    let list = value
        .get("matchedIds")
        .or_else(|| value.get("matched_ids"))?
        .as_array()?;

    list.iter()
        .map(|id| match id {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
        .collect()
}
