//! Core types for the model backend abstraction

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use geny_utils::error::LlmError;

/// Role of a message in a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System-level instructions (the configurable prompt)
    System,
    /// User input (the business question)
    User,
    /// Assistant response
    Assistant,
}

/// A single message in a conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    #[must_use]
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Create a system message
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    /// Create a user message
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }
}

/// Input to one backend invocation.
///
/// `model` may be empty, in which case the backend uses its configured
/// default. `timeout` bounds the whole call, including any polling.
#[derive(Debug, Clone)]
pub struct ChatInvocation {
    pub model: String,
    pub timeout: Duration,
    pub messages: Vec<Message>,
}

impl ChatInvocation {
    #[must_use]
    pub fn new(model: impl Into<String>, timeout: Duration, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            timeout,
            messages,
        }
    }
}

/// Result of one backend invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResult {
    /// Raw response text from the model
    pub raw_response: String,
    /// Provider name (`openai-chat`, `openai-assistants`)
    pub provider: String,
    /// Model that was actually used
    pub model_used: String,
    /// Input tokens consumed (if reported)
    pub tokens_input: Option<u64>,
    /// Output tokens generated (if reported)
    pub tokens_output: Option<u64>,
}

impl LlmResult {
    #[must_use]
    pub fn new(
        raw_response: impl Into<String>,
        provider: impl Into<String>,
        model_used: impl Into<String>,
    ) -> Self {
        Self {
            raw_response: raw_response.into(),
            provider: provider.into(),
            model_used: model_used.into(),
            tokens_input: None,
            tokens_output: None,
        }
    }

    /// Set token counts
    #[must_use]
    pub fn with_tokens(mut self, input: u64, output: u64) -> Self {
        self.tokens_input = Some(input);
        self.tokens_output = Some(output);
        self
    }
}

/// Trait implemented by every model backend.
///
/// The generation stage works against `Box<dyn LlmBackend>` and never learns
/// which transport is behind it.
#[async_trait]
pub trait LlmBackend: Send + Sync {
    /// Invoke the model with the given conversation.
    ///
    /// # Errors
    ///
    /// Returns `LlmError` for transport failures, provider errors
    /// (auth, quota, outages) and timeouts.
    async fn invoke(&self, inv: ChatInvocation) -> Result<LlmResult, LlmError>;
}
