//! Property-based tests for the answer renderer.

use proptest::prelude::*;
use serde_json::json;

use geny::{ModelResponse, QueryResult, render};

/// Valid placeholder names: identifier-shaped, like SQL column aliases.
fn name_strategy() -> impl Strategy<Value = String> {
    "[a-z_][a-z0-9_]{0,15}"
}

fn with_sql(explanation: String) -> ModelResponse {
    ModelResponse {
        sql: Some("SELECT 1".to_string()),
        explanation,
    }
}

proptest! {
    /// Without SQL, the explanation passes through byte-identical whatever
    /// it contains — including things that look like placeholders.
    #[test]
    fn no_sql_is_identity(text in ".{0,200}") {
        let model = ModelResponse { sql: None, explanation: text.clone() };
        prop_assert_eq!(render(&model, &QueryResult(json!(null))), text);
    }

    /// Every placeholder whose key exists in a single-row mapping is
    /// resolved: no `{{...}}` survives.
    #[test]
    fn row_with_all_keys_leaves_no_tokens(
        names in proptest::collection::hash_set(name_strategy(), 1..5),
        value in -1_000_000i64..1_000_000i64,
    ) {
        let names: Vec<String> = names.into_iter().collect();
        let explanation = names
            .iter()
            .map(|n| format!("{n}: {{{{{n}}}}}"))
            .collect::<Vec<_>>()
            .join(", ");

        let mut row = serde_json::Map::new();
        for n in &names {
            row.insert(n.clone(), json!(value));
        }

        let out = render(&with_sql(explanation), &QueryResult(json!(row)));
        prop_assert!(!out.contains("{{"), "unresolved token in {out:?}");
        prop_assert!(!out.contains("}}"), "unresolved token in {out:?}");
    }

    /// A key missing from the mapping becomes the literal "0" fallback, not
    /// a panic and not a blank.
    #[test]
    fn missing_key_becomes_zero(name in name_strategy()) {
        let explanation = format!("Total: {{{{{name}}}}}.");
        // The fixture key is uppercase, which the name strategy never
        // generates, so the placeholder is always a miss.
        let out = render(&with_sql(explanation), &QueryResult(json!({"OTHER_COLUMN": 1})));
        prop_assert_eq!(out, "Total: 0.".to_string());
    }

    /// Multi-row binding preserves row order and joins with a comma.
    #[test]
    fn rows_join_preserves_order(
        values in proptest::collection::vec("[A-Za-z]{1,10}", 1..6),
    ) {
        let rows: Vec<serde_json::Value> =
            values.iter().map(|v| json!({"nome": v})).collect();
        let out = render(
            &with_sql("Lista: {{nome}}".to_string()),
            &QueryResult(json!(rows)),
        );
        prop_assert_eq!(out, format!("Lista: {}", values.join(", ")));
    }

    /// Rendering is a pure function: same inputs, byte-identical output.
    #[test]
    fn render_is_idempotent(
        explanation in ".{0,100}",
        number in proptest::num::f64::NORMAL,
    ) {
        let model = with_sql(explanation);
        let result = QueryResult(json!({"x": number}));
        prop_assert_eq!(render(&model, &result), render(&model, &result));
    }
}
