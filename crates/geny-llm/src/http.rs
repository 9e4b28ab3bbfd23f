//! Shared HTTP plumbing for the model backends.
//!
//! One place maps provider responses onto the `LlmError` taxonomy so both
//! backends classify failures identically.

use std::time::Duration;

use geny_utils::error::LlmError;

/// Send a prepared request and parse the body as JSON.
///
/// Non-2xx statuses become the taxonomy error for that status class with the
/// response body embedded; a body that is not JSON becomes `Transport`.
///
/// # Errors
///
/// Returns `LlmError::Timeout` when the call exceeds `timeout`, otherwise the
/// classified provider error.
pub(crate) async fn send_json(
    request: reqwest::RequestBuilder,
    timeout: Duration,
) -> Result<serde_json::Value, LlmError> {
    let response = request.timeout(timeout).send().await.map_err(|e| {
        if e.is_timeout() {
            LlmError::Timeout { duration: timeout }
        } else {
            LlmError::Transport(e.to_string())
        }
    })?;

    let status = response.status().as_u16();
    let body = response
        .text()
        .await
        .map_err(|e| LlmError::Transport(format!("Failed to read provider response: {e}")))?;

    if !(200..300).contains(&status) {
        return Err(LlmError::from_status(status, body));
    }

    serde_json::from_str(&body)
        .map_err(|e| LlmError::Transport(format!("Provider returned non-JSON body: {e}")))
}

/// Read an API key from the environment variable named in config.
///
/// # Errors
///
/// Returns `LlmError::Misconfiguration` naming the variable when unset.
pub(crate) fn api_key_from_env(env_var: &str, section: &str) -> Result<String, LlmError> {
    std::env::var(env_var).map_err(|_| {
        LlmError::Misconfiguration(format!(
            "API key not found in environment variable '{env_var}'. \
             Please set this variable or configure a different api_key_env in [{section}]."
        ))
    })
}
