use std::time::Duration;
use thiserror::Error;

/// Library-level error type returned by geny operations.
///
/// Each concern keeps its own enum (`ConfigError`, `LlmError`, `StoreError`)
/// and `GenyError` wraps them for callers that cross concern boundaries, such
/// as the HTTP handler and the CLI.
///
/// Two failure classes never appear here because they are absorbed where
/// they occur: a parse failure degrades to treating the raw model text as
/// the explanation, and a prompt-store failure degrades to the built-in
/// default prompt.
#[derive(Error, Debug)]
pub enum GenyError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Model backend error: {0}")]
    Llm(#[from] LlmError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration file: {0}")]
    InvalidFile(String),

    #[error("Configuration file not found at {path}")]
    NotFound { path: String },

    #[error("Invalid configuration value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}

/// Errors from the model-generation stage.
///
/// Non-2xx provider responses are classified by status: 401/403 map to
/// `ProviderAuth`, 429 to `ProviderQuota`, 5xx to `ProviderOutage`, anything
/// else to `Transport`. The variants carry the status and response body so
/// the diagnostic `error` field of a chat outcome can surface them.
#[derive(Error, Debug)]
pub enum LlmError {
    /// Transport-level failure (connectivity, malformed provider payload)
    #[error("Transport error: {0}")]
    Transport(String),

    /// Provider authentication failure (401, 403)
    #[error("Provider authentication error: {0}")]
    ProviderAuth(String),

    /// Provider quota/rate limit exceeded (429)
    #[error("Provider quota exceeded: {0}")]
    ProviderQuota(String),

    /// Provider service outage (5xx errors)
    #[error("Provider outage: {0}")]
    ProviderOutage(String),

    /// Generation did not finish inside the bounded wait
    #[error("Timeout after {duration:?}")]
    Timeout { duration: Duration },

    /// Configuration error (missing API key, missing model)
    #[error("Misconfiguration: {0}")]
    Misconfiguration(String),

    /// Unsupported provider name
    #[error("Unsupported: {0}")]
    Unsupported(String),
}

impl LlmError {
    /// Classify an HTTP status + body from a model provider.
    #[must_use]
    pub fn from_status(status: u16, body: impl Into<String>) -> Self {
        let body = body.into();
        match status {
            401 | 403 => Self::ProviderAuth(format!("HTTP {status}: {body}")),
            429 => Self::ProviderQuota(format!("HTTP {status}: {body}")),
            500..=599 => Self::ProviderOutage(format!("HTTP {status}: {body}")),
            _ => Self::Transport(format!("HTTP {status}: {body}")),
        }
    }
}

/// Errors from the query-execution stage.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Statement refused by the read-only guard before reaching the database
    #[error("Query rejected: {0}")]
    QueryRejected(String),

    /// The database function returned an error (syntax, permission, timeout)
    #[error("Query execution failed (HTTP {status}): {detail}")]
    Rpc { status: u16, detail: String },

    /// Connectivity failure talking to the database service
    #[error("Transport error: {0}")]
    Transport(String),

    /// Missing service URL or key
    #[error("Misconfiguration: {0}")]
    Misconfiguration(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn llm_error_classifies_auth_statuses() {
        assert!(matches!(
            LlmError::from_status(401, "nope"),
            LlmError::ProviderAuth(_)
        ));
        assert!(matches!(
            LlmError::from_status(403, "nope"),
            LlmError::ProviderAuth(_)
        ));
    }

    #[test]
    fn llm_error_classifies_quota_and_outage() {
        assert!(matches!(
            LlmError::from_status(429, "slow down"),
            LlmError::ProviderQuota(_)
        ));
        assert!(matches!(
            LlmError::from_status(503, "down"),
            LlmError::ProviderOutage(_)
        ));
    }

    #[test]
    fn llm_error_other_statuses_are_transport() {
        let err = LlmError::from_status(404, "missing");
        match err {
            LlmError::Transport(msg) => {
                assert!(msg.contains("404"));
                assert!(msg.contains("missing"));
            }
            other => panic!("Expected Transport, got {other:?}"),
        }
    }

    #[test]
    fn store_error_display_includes_detail() {
        let err = StoreError::Rpc {
            status: 400,
            detail: "syntax error at or near \"FORM\"".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("400"));
        assert!(text.contains("FORM"));
    }

    #[test]
    fn geny_error_wraps_components() {
        let err: GenyError = LlmError::Unsupported("x".into()).into();
        assert!(matches!(err, GenyError::Llm(_)));

        let err: GenyError = StoreError::QueryRejected("x".into()).into();
        assert!(matches!(err, GenyError::Store(_)));
    }
}
