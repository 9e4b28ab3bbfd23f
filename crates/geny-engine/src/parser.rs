//! Extraction of a structured `{sql, explicacao}` object from raw model text.
//!
//! Models misbehave: they wrap JSON in markdown fences, surround it with
//! prose, or skip JSON entirely. Parsing is therefore permissive by design —
//! the assistant must always produce *some* answer. The algorithm finds the
//! outermost `{...}` substring and parses that; when nothing parses, the
//! whole raw text becomes the explanation and no query runs.

use serde::{Deserialize, Serialize};

/// The model's structured intent for one turn.
///
/// If `sql` is present it is expected to be a single read-only statement;
/// the executor's guard enforces that before anything reaches the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sql: Option<String>,
    pub explanation: String,
}

impl ModelResponse {
    /// An explanation-only response (no query to run).
    #[must_use]
    pub fn explanation_only(text: impl Into<String>) -> Self {
        Self {
            sql: None,
            explanation: text.into(),
        }
    }
}

/// Parse raw model output into a `ModelResponse`.
///
/// Tolerates three shapes: a pure JSON object, JSON wrapped in code fences or
/// prose, and plain prose with no JSON at all. The result never has both
/// fields empty: an unparsable or empty object degrades to the raw text as
/// the explanation.
#[must_use]
pub fn parse(raw: &str) -> ModelResponse {
    let fallback = || ModelResponse::explanation_only(raw.trim());

    let Some(candidate) = outermost_object(raw) else {
        return fallback();
    };

    let Ok(value) = serde_json::from_str::<serde_json::Value>(candidate) else {
        return fallback();
    };

    let Some(object) = value.as_object() else {
        return fallback();
    };

    let sql = object
        .get("sql")
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from);

    let explanation = object
        .get("explicacao")
        .or_else(|| object.get("explanation"))
        .and_then(|v| v.as_str())
        .map(str::trim)
        .map(String::from);

    match (sql, explanation) {
        (None, None) => {
            // An object that carries neither field is still an answer of
            // sorts; surface it rather than losing it.
            ModelResponse::explanation_only(value.to_string())
        }
        (sql, explanation) => {
            let explanation = explanation.unwrap_or_default();
            if sql.is_none() && explanation.is_empty() {
                return fallback();
            }
            ModelResponse { sql, explanation }
        }
    }
}

/// The outermost `{...}` span of the text, if any.
fn outermost_object(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end <= start {
        return None;
    }
    Some(&raw[start..=end])
}
