//! Placeholder binding: turning an explanation template plus a query result
//! into the final answer.
//!
//! Tokens look like `{{name}}` and bind by column name, never by position.
//! The function is pure — no I/O, fully deterministic — which makes it the
//! most testable piece of the pipeline.
//!
//! Formatting follows pt-BR conventions: fractional numbers render as
//! currency (`R$ 12.345,60`), integral numbers as grouped integers
//! (`1.234`). Null or absent values render as `"0"` so the sentence stays
//! grammatically complete even for an empty aggregate. A placeholder that
//! cannot be bound at all stays literal — a visible signal of a prompt/alias
//! mismatch rather than a silent blank.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

use crate::parser::ModelResponse;
use geny_utils::types::{QueryResult, ResultShape};

static PLACEHOLDER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").unwrap());

/// Separator used when a placeholder binds to a column across many rows.
const ROW_JOIN: &str = ", ";

/// Fallback shown for null/absent values in a row binding.
const ZERO: &str = "0";

/// Render the final answer for one turn.
///
/// Without `sql` the explanation is returned verbatim — the model chose not
/// to query the database. Otherwise every distinct `{{name}}` token is
/// resolved against the result per its shape (single row, row sequence, or
/// bare scalar).
#[must_use]
pub fn render(model: &ModelResponse, result: &QueryResult) -> String {
    if model.sql.is_none() {
        return model.explanation.clone();
    }

    let names = placeholder_names(&model.explanation);
    if names.is_empty() {
        return model.explanation.clone();
    }

    let bindings = resolve(&names, result);

    PLACEHOLDER_RE
        .replace_all(&model.explanation, |caps: &regex::Captures<'_>| {
            match bindings.get(&caps[1]) {
                Some(Some(value)) => value.clone(),
                _ => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// Distinct placeholder names in order of first appearance.
fn placeholder_names(explanation: &str) -> Vec<String> {
    let mut names = Vec::new();
    for caps in PLACEHOLDER_RE.captures_iter(explanation) {
        let name = caps[1].to_string();
        if !names.contains(&name) {
            names.push(name);
        }
    }
    names
}

/// Resolve each placeholder to its replacement, or `None` to leave it
/// literal.
fn resolve(names: &[String], result: &QueryResult) -> HashMap<String, Option<String>> {
    let mut bindings = HashMap::new();

    match result.shape() {
        ResultShape::Null => {
            for name in names {
                bindings.insert(name.clone(), Some(ZERO.to_string()));
            }
        }
        ResultShape::Scalar => {
            // A bare scalar is only unambiguous with a single placeholder.
            let bound = if names.len() == 1 {
                Some(format_value(&result.0))
            } else {
                None
            };
            for name in names {
                bindings.insert(name.clone(), bound.clone());
            }
        }
        ResultShape::Row => {
            let row = result.0.as_object().expect("Row shape is an object");
            for name in names {
                let value = match row.get(name.as_str()) {
                    Some(serde_json::Value::Null) | None => ZERO.to_string(),
                    Some(value) => format_value(value),
                };
                bindings.insert(name.clone(), Some(value));
            }
        }
        ResultShape::Rows => {
            let rows = result.0.as_array().expect("Rows shape is an array");
            let single = names.len() == 1;
            for name in names {
                let collected: Vec<String> = rows
                    .iter()
                    .filter_map(|row| match row {
                        serde_json::Value::Object(map) => match map.get(name.as_str()) {
                            Some(serde_json::Value::Null) => Some(ZERO.to_string()),
                            Some(value) => Some(format_value(value)),
                            None => None,
                        },
                        // A flat array of scalars binds a lone placeholder.
                        other if single => Some(format_value(other)),
                        _ => None,
                    })
                    .collect();

                let bound = if collected.is_empty() {
                    None
                } else {
                    Some(collected.join(ROW_JOIN))
                };
                bindings.insert(name.clone(), bound);
            }
        }
    }

    bindings
}

/// Format a single JSON value for display.
fn format_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => ZERO.to_string(),
        serde_json::Value::Bool(b) => b.to_string(),
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Number(n) => format_number(n),
        other => other.to_string(),
    }
}

/// pt-BR numeric formatting: fractional values as currency, integral values
/// as grouped integers.
fn format_number(n: &serde_json::Number) -> String {
    if let Some(i) = n.as_i64() {
        return group_thousands(i.unsigned_abs(), i < 0);
    }
    if let Some(u) = n.as_u64() {
        return group_thousands(u, false);
    }

    let f = n.as_f64().unwrap_or(0.0);
    if f.fract() == 0.0 && f.abs() < 9_007_199_254_740_992.0 {
        return group_thousands(f.abs() as u64, f < 0.0);
    }
    format_currency(f)
}

/// `R$ 12.345,60` — two fraction digits, `.` thousands separator, `,`
/// decimal separator.
fn format_currency(value: f64) -> String {
    let negative = value < 0.0;
    let cents = (value.abs() * 100.0).round() as u64;
    let whole = group_thousands(cents / 100, false);
    let frac = cents % 100;
    if negative {
        format!("-R$ {whole},{frac:02}")
    } else {
        format!("R$ {whole},{frac:02}")
    }
}

fn group_thousands(value: u64, negative: bool) -> String {
    let digits = value.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    let offset = digits.len() % 3;
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (i + 3 - offset) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(c);
    }
    if negative {
        format!("-{grouped}")
    } else {
        grouped
    }
}
