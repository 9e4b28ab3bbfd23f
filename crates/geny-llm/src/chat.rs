//! Chat-completions backend (OpenAI-compatible HTTP API).
//!
//! One POST per turn. Structured output is requested natively via
//! `response_format: json_object`, so a well-behaved model replies with a
//! single JSON object; the parser downstream still tolerates anything else.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::http::{api_key_from_env, send_json};
use crate::types::{ChatInvocation, LlmBackend, LlmResult, Message, Role};
use geny_utils::error::LlmError;

/// Default chat-completions endpoint
const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Default whole-call timeout
const DEFAULT_TIMEOUT_SECS: u64 = 60;

#[derive(Clone, Debug)]
pub(crate) struct ChatBackend {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    default_model: String,
    max_tokens: u32,
    temperature: f32,
    default_timeout: Duration,
}

impl ChatBackend {
    /// Create a backend from configuration.
    ///
    /// # Errors
    ///
    /// Returns `LlmError::Misconfiguration` if the API key env var is unset
    /// or no model is configured.
    pub fn new_from_config(config: &geny_config::Config) -> Result<Self, LlmError> {
        let chat = config.llm.chat.as_ref();

        let api_key_env = chat
            .and_then(|c| c.api_key_env.as_deref())
            .unwrap_or("OPENAI_API_KEY");
        let api_key = api_key_from_env(api_key_env, "llm.chat")?;

        let default_model = chat.and_then(|c| c.model.clone()).ok_or_else(|| {
            LlmError::Misconfiguration(
                "Chat model not specified in configuration. \
                 Please set [llm.chat] model = \"model-name\"."
                    .to_string(),
            )
        })?;

        Ok(Self {
            client: reqwest::Client::new(),
            base_url: chat
                .and_then(|c| c.base_url.clone())
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            api_key,
            default_model,
            max_tokens: chat.and_then(|c| c.max_tokens).unwrap_or(1024),
            temperature: chat.and_then(|c| c.temperature).unwrap_or(0.2),
            default_timeout: Duration::from_secs(
                chat.and_then(|c| c.timeout_secs).unwrap_or(DEFAULT_TIMEOUT_SECS),
            ),
        })
    }

    fn resolve_model(&self, inv: &ChatInvocation) -> String {
        if inv.model.is_empty() {
            self.default_model.clone()
        } else {
            inv.model.clone()
        }
    }

    fn resolve_timeout(&self, inv: &ChatInvocation) -> Duration {
        if inv.timeout.is_zero() {
            self.default_timeout
        } else {
            inv.timeout
        }
    }

    fn convert_messages(messages: &[Message]) -> Vec<WireMessage> {
        messages
            .iter()
            .map(|msg| WireMessage {
                role: match msg.role {
                    Role::System => "system".to_string(),
                    Role::User => "user".to_string(),
                    Role::Assistant => "assistant".to_string(),
                },
                content: msg.content.clone(),
            })
            .collect()
    }
}

#[async_trait]
impl LlmBackend for ChatBackend {
    async fn invoke(&self, inv: ChatInvocation) -> Result<LlmResult, LlmError> {
        let model = self.resolve_model(&inv);
        let timeout = self.resolve_timeout(&inv);

        debug!(
            provider = "openai-chat",
            model = %model,
            timeout_secs = timeout.as_secs(),
            "Invoking chat backend"
        );

        let request_body = ChatRequest {
            model: model.clone(),
            messages: Self::convert_messages(&inv.messages),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            response_format: ResponseFormat {
                format_type: "json_object".to_string(),
            },
            stream: false,
        };

        let request = self
            .client
            .post(&self.base_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request_body);

        let body = send_json(request, timeout).await?;
        let response: ChatResponse = serde_json::from_value(body)
            .map_err(|e| LlmError::Transport(format!("Failed to parse chat response: {e}")))?;

        let choice = response
            .choices
            .first()
            .ok_or_else(|| LlmError::Transport("Chat response missing choices[0]".to_string()))?;

        let content = choice.message.content.clone().ok_or_else(|| {
            LlmError::Transport("Chat response missing content in choices[0]".to_string())
        })?;

        let mut result = LlmResult::new(content, "openai-chat", model);
        if let Some(usage) = response.usage {
            result = result.with_tokens(usage.prompt_tokens, usage.completion_tokens);
        }

        debug!(
            provider = "openai-chat",
            tokens_input = ?result.tokens_input,
            tokens_output = ?result.tokens_output,
            "Chat invocation completed"
        );

        Ok(result)
    }
}

#[derive(Debug, Clone, Serialize)]
struct WireMessage {
    role: String,
    content: String,
}

#[derive(Debug, Clone, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: String,
}

#[derive(Debug, Clone, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<WireMessage>,
    max_tokens: u32,
    temperature: f32,
    response_format: ResponseFormat,
    stream: bool,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Debug, Clone, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Clone, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct Usage {
    prompt_tokens: u64,
    completion_tokens: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_backend() -> ChatBackend {
        ChatBackend {
            client: reqwest::Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: "test-key".to_string(),
            default_model: "default-model".to_string(),
            max_tokens: 1024,
            temperature: 0.2,
            default_timeout: Duration::from_secs(60),
        }
    }

    #[test]
    fn resolve_model_uses_default_when_empty() {
        let backend = test_backend();
        let inv = ChatInvocation::new("", Duration::from_secs(10), vec![]);
        assert_eq!(backend.resolve_model(&inv), "default-model");

        let inv = ChatInvocation::new("custom", Duration::from_secs(10), vec![]);
        assert_eq!(backend.resolve_model(&inv), "custom");
    }

    #[test]
    fn resolve_timeout_uses_default_when_zero() {
        let backend = test_backend();
        let inv = ChatInvocation::new("", Duration::ZERO, vec![]);
        assert_eq!(backend.resolve_timeout(&inv), Duration::from_secs(60));

        let inv = ChatInvocation::new("", Duration::from_secs(5), vec![]);
        assert_eq!(backend.resolve_timeout(&inv), Duration::from_secs(5));
    }

    #[test]
    fn convert_messages_maps_roles() {
        let messages = vec![
            Message::system("Você é a Geny."),
            Message::user("faturamento deste mês"),
        ];
        let wire = ChatBackend::convert_messages(&messages);
        assert_eq!(wire.len(), 2);
        assert_eq!(wire[0].role, "system");
        assert_eq!(wire[1].role, "user");
        assert_eq!(wire[1].content, "faturamento deste mês");
    }

    #[test]
    fn request_body_asks_for_json_object() {
        let body = ChatRequest {
            model: "m".to_string(),
            messages: vec![],
            max_tokens: 16,
            temperature: 0.0,
            response_format: ResponseFormat {
                format_type: "json_object".to_string(),
            },
            stream: false,
        };
        let text = serde_json::to_string(&body).unwrap();
        assert!(text.contains(r#""response_format":{"type":"json_object"}"#));
        assert!(text.contains(r#""stream":false"#));
    }

    #[test]
    fn new_from_config_missing_api_key() {
        let var = "GENY_CHAT_KEY_TEST_MISSING";
        // SAFETY: test-scoped env mutation with a unique variable name
        unsafe {
            std::env::remove_var(var);
        }

        let mut config = geny_config::Config::minimal_for_testing();
        if let Some(chat) = config.llm.chat.as_mut() {
            chat.api_key_env = Some(var.to_string());
        }

        let result = ChatBackend::new_from_config(&config);
        assert!(matches!(result, Err(LlmError::Misconfiguration(_))));
    }

    #[test]
    fn new_from_config_missing_model() {
        let var = "GENY_CHAT_KEY_TEST_MODEL";
        // SAFETY: test-scoped env mutation with a unique variable name
        unsafe {
            std::env::set_var(var, "sk-test");
        }

        let mut config = geny_config::Config::minimal_for_testing();
        if let Some(chat) = config.llm.chat.as_mut() {
            chat.api_key_env = Some(var.to_string());
            chat.model = None;
        }

        let result = ChatBackend::new_from_config(&config);
        match result {
            Err(LlmError::Misconfiguration(msg)) => {
                assert!(msg.contains("model"), "Expected model mention, got: {msg}");
            }
            other => panic!("Expected Misconfiguration, got {other:?}"),
        }

        // SAFETY: cleaning up the variable set above
        unsafe {
            std::env::remove_var(var);
        }
    }
}
