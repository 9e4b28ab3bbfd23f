//! Model backend abstraction for the generation stage.
//!
//! Every transport implements the `LlmBackend` trait, so the orchestration
//! pipeline never knows which provider produced the raw text. Two transports
//! exist: a one-shot chat-completions call and an assistants-style run that
//! is polled to completion.

mod assistants;
mod chat;
pub(crate) mod http;
mod types;

pub use types::{ChatInvocation, LlmBackend, LlmResult, Message, Role};

pub use geny_utils::error::LlmError;

use tracing::warn;

pub(crate) use assistants::AssistantsBackend;
pub(crate) use chat::ChatBackend;

/// Metadata about a construction-time fallback, for diagnostics.
#[derive(Debug, Clone)]
pub struct LlmFallbackInfo {
    pub primary_provider: String,
    pub fallback_provider: String,
    pub reason: String,
}

/// Construct a backend for a specific provider.
///
/// # Errors
///
/// Returns `LlmError::Unsupported` if the provider is unknown and
/// `LlmError::Misconfiguration` if provider-specific configuration is
/// invalid.
fn construct_backend_for_provider(
    provider: &str,
    config: &geny_config::Config,
) -> Result<Box<dyn LlmBackend>, LlmError> {
    match provider {
        "openai-chat" => {
            let backend = ChatBackend::new_from_config(config)?;
            Ok(Box::new(backend))
        }
        "openai-assistants" => {
            let backend = AssistantsBackend::new_from_config(config)?;
            Ok(Box::new(backend))
        }
        unknown => Err(LlmError::Unsupported(format!(
            "Unknown model provider '{unknown}'. Supported providers: openai-chat, openai-assistants."
        ))),
    }
}

/// Create a backend from configuration, returning fallback metadata when used.
///
/// If the primary provider fails to *construct* (missing key, missing model)
/// and a fallback provider is configured, the fallback is constructed
/// instead. Runtime errors from `invoke` never trigger fallback — a provider
/// outage mid-run must surface, not silently switch transports.
///
/// # Errors
///
/// Returns the primary provider's error when no fallback is configured or
/// when the fallback also fails to construct.
pub fn from_config_with_fallback(
    config: &geny_config::Config,
) -> Result<(Box<dyn LlmBackend>, Option<LlmFallbackInfo>), LlmError> {
    let provider = config.llm.provider.as_deref().unwrap_or("openai-chat");

    match construct_backend_for_provider(provider, config) {
        Ok(backend) => Ok((backend, None)),
        Err(primary_error) => {
            let Some(fallback_provider) = config.llm.fallback_provider.as_deref() else {
                return Err(primary_error);
            };

            let reason = primary_error.to_string();
            warn!(
                primary = provider,
                fallback = fallback_provider,
                %reason,
                "Primary model provider failed during construction, attempting fallback"
            );

            match construct_backend_for_provider(fallback_provider, config) {
                Ok(fallback_backend) => Ok((
                    fallback_backend,
                    Some(LlmFallbackInfo {
                        primary_provider: provider.to_string(),
                        fallback_provider: fallback_provider.to_string(),
                        reason,
                    }),
                )),
                Err(fallback_error) => {
                    warn!(
                        fallback = fallback_provider,
                        error = %fallback_error,
                        "Fallback model provider also failed"
                    );
                    Err(primary_error)
                }
            }
        }
    }
}

/// Create a backend from configuration, discarding fallback metadata.
///
/// # Errors
///
/// See [`from_config_with_fallback`].
pub fn from_config(config: &geny_config::Config) -> Result<Box<dyn LlmBackend>, LlmError> {
    let (backend, _fallback_info) = from_config_with_fallback(config)?;
    Ok(backend)
}
