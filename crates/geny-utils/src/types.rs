//! Core domain types shared across the pipeline stages.

use serde::{Deserialize, Serialize};

/// A user's free-text question. Created per request, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatQuestion {
    pub text: String,
}

impl ChatQuestion {
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// Where a system prompt came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptOrigin {
    /// Loaded from the `system_config` table
    Config,
    /// Built-in fallback
    Default,
}

/// The system prompt used to steer SQL generation.
///
/// Loaded once per request; owned and mutated externally through the admin
/// surface. Absence or a read failure falls back to the built-in default, so
/// constructing one never fails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemPrompt {
    pub text: String,
    pub origin: PromptOrigin,
}

impl SystemPrompt {
    #[must_use]
    pub fn from_config(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            origin: PromptOrigin::Config,
        }
    }

    #[must_use]
    pub fn built_in(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            origin: PromptOrigin::Default,
        }
    }
}

/// Shape of a query result, as seen by the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultShape {
    /// `null` — typically an empty aggregate
    Null,
    /// A bare scalar (number, string, boolean)
    Scalar,
    /// A single column-name → value mapping
    Row,
    /// An ordered sequence of mappings
    Rows,
}

/// Opaque result of the read-only query surface.
///
/// The executor returns whatever JSON the database function produced: `null`,
/// a scalar, one row object, or an array of row objects. Only the renderer
/// interprets it, and only by column name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueryResult(pub serde_json::Value);

impl QueryResult {
    #[must_use]
    pub fn shape(&self) -> ResultShape {
        match &self.0 {
            serde_json::Value::Null => ResultShape::Null,
            serde_json::Value::Object(_) => ResultShape::Row,
            serde_json::Value::Array(_) => ResultShape::Rows,
            _ => ResultShape::Scalar,
        }
    }

    #[must_use]
    pub fn into_inner(self) -> serde_json::Value {
        self.0
    }
}

impl From<serde_json::Value> for QueryResult {
    fn from(value: serde_json::Value) -> Self {
        Self(value)
    }
}
