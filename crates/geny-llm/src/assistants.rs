//! Assistants-style polling backend.
//!
//! The run is created in one POST, then its status is polled at a fixed
//! interval for a fixed number of attempts (defaults: 1 s x 30). A run that
//! is still not terminal after the last poll fails with `LlmError::Timeout`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::http::{api_key_from_env, send_json};
use crate::types::{ChatInvocation, LlmBackend, LlmResult, Message, Role};
use geny_utils::error::LlmError;

/// Default assistants API root
const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Beta header required by the assistants API
const ASSISTANTS_BETA: &str = "assistants=v2";

/// Timeout applied to each individual HTTP call inside the loop
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;
const DEFAULT_POLL_ATTEMPTS: u32 = 30;

#[derive(Clone, Debug)]
pub(crate) struct AssistantsBackend {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    assistant_id: String,
    poll_interval: Duration,
    poll_attempts: u32,
}

impl AssistantsBackend {
    /// Create a backend from configuration.
    ///
    /// # Errors
    ///
    /// Returns `LlmError::Misconfiguration` if the API key env var is unset
    /// or no assistant id is configured.
    pub fn new_from_config(config: &geny_config::Config) -> Result<Self, LlmError> {
        let assistants = config.llm.assistants.as_ref();

        let api_key_env = assistants
            .and_then(|a| a.api_key_env.as_deref())
            .unwrap_or("OPENAI_API_KEY");
        let api_key = api_key_from_env(api_key_env, "llm.assistants")?;

        let assistant_id = assistants
            .and_then(|a| a.assistant_id.clone())
            .ok_or_else(|| {
                LlmError::Misconfiguration(
                    "Assistant id not specified in configuration. \
                     Please set [llm.assistants] assistant_id = \"asst_...\"."
                        .to_string(),
                )
            })?;

        Ok(Self {
            client: reqwest::Client::new(),
            base_url: assistants
                .and_then(|a| a.base_url.clone())
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            api_key,
            assistant_id,
            poll_interval: Duration::from_millis(
                assistants
                    .and_then(|a| a.poll_interval_ms)
                    .unwrap_or(DEFAULT_POLL_INTERVAL_MS),
            ),
            poll_attempts: assistants
                .and_then(|a| a.poll_attempts)
                .unwrap_or(DEFAULT_POLL_ATTEMPTS),
        })
    }

    /// Split system instructions from the thread conversation.
    ///
    /// The assistants API takes instructions on the run, not as a thread
    /// message, so system content rides the `instructions` field and only
    /// user/assistant messages populate the thread.
    fn convert_messages(messages: &[Message]) -> (Option<String>, Vec<ThreadMessage>) {
        let mut instructions: Option<String> = None;
        let mut thread_messages = Vec::new();

        for msg in messages {
            match msg.role {
                Role::System => {
                    if let Some(existing) = instructions.as_mut() {
                        existing.push_str("\n\n");
                        existing.push_str(&msg.content);
                    } else {
                        instructions = Some(msg.content.clone());
                    }
                }
                Role::User => thread_messages.push(ThreadMessage {
                    role: "user".to_string(),
                    content: msg.content.clone(),
                }),
                Role::Assistant => thread_messages.push(ThreadMessage {
                    role: "assistant".to_string(),
                    content: msg.content.clone(),
                }),
            }
        }

        (instructions, thread_messages)
    }

    fn authed(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("OpenAI-Beta", ASSISTANTS_BETA)
            .header("Content-Type", "application/json")
    }

    async fn fetch_run(&self, thread_id: &str, run_id: &str) -> Result<RunStatus, LlmError> {
        let url = format!("{}/threads/{thread_id}/runs/{run_id}", self.base_url);
        let body = send_json(self.authed(self.client.get(&url)), REQUEST_TIMEOUT).await?;
        serde_json::from_value(body)
            .map_err(|e| LlmError::Transport(format!("Failed to parse run status: {e}")))
    }

    async fn fetch_answer(&self, thread_id: &str) -> Result<String, LlmError> {
        let url = format!(
            "{}/threads/{thread_id}/messages?order=desc&limit=1",
            self.base_url
        );
        let body = send_json(self.authed(self.client.get(&url)), REQUEST_TIMEOUT).await?;
        let messages: MessageList = serde_json::from_value(body)
            .map_err(|e| LlmError::Transport(format!("Failed to parse thread messages: {e}")))?;

        messages
            .data
            .first()
            .and_then(|m| m.content.first())
            .and_then(|c| c.text.as_ref())
            .map(|t| t.value.clone())
            .ok_or_else(|| LlmError::Transport("Run completed without a text reply".to_string()))
    }
}

#[async_trait]
impl LlmBackend for AssistantsBackend {
    async fn invoke(&self, inv: ChatInvocation) -> Result<LlmResult, LlmError> {
        let (instructions, thread_messages) = Self::convert_messages(&inv.messages);

        debug!(
            provider = "openai-assistants",
            assistant_id = %self.assistant_id,
            poll_attempts = self.poll_attempts,
            "Creating assistant run"
        );

        let create_body = CreateRunRequest {
            assistant_id: self.assistant_id.clone(),
            instructions,
            thread: ThreadSeed {
                messages: thread_messages,
            },
        };

        let url = format!("{}/threads/runs", self.base_url);
        let body = send_json(
            self.authed(self.client.post(&url)).json(&create_body),
            REQUEST_TIMEOUT,
        )
        .await?;
        let mut run: RunStatus = serde_json::from_value(body)
            .map_err(|e| LlmError::Transport(format!("Failed to parse run creation: {e}")))?;

        let mut attempts_left = self.poll_attempts;
        loop {
            match run.status.as_str() {
                "completed" => break,
                "failed" | "cancelled" | "expired" | "incomplete" => {
                    let detail = run
                        .last_error
                        .map(|e| format!("{}: {}", e.code, e.message))
                        .unwrap_or_else(|| run.status.clone());
                    return Err(LlmError::Transport(format!(
                        "Assistant run ended as '{}': {detail}",
                        run.status
                    )));
                }
                _ => {
                    if attempts_left == 0 {
                        return Err(LlmError::Timeout {
                            duration: self.poll_interval * self.poll_attempts,
                        });
                    }
                    attempts_left -= 1;
                    tokio::time::sleep(self.poll_interval).await;
                    run = self.fetch_run(&run.thread_id, &run.id).await?;
                }
            }
        }

        let answer = self.fetch_answer(&run.thread_id).await?;

        debug!(
            provider = "openai-assistants",
            run_id = %run.id,
            "Assistant run completed"
        );

        Ok(LlmResult::new(
            answer,
            "openai-assistants",
            self.assistant_id.clone(),
        ))
    }
}

#[derive(Debug, Clone, Serialize)]
struct ThreadMessage {
    role: String,
    content: String,
}

#[derive(Debug, Clone, Serialize)]
struct ThreadSeed {
    messages: Vec<ThreadMessage>,
}

#[derive(Debug, Clone, Serialize)]
struct CreateRunRequest {
    assistant_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    instructions: Option<String>,
    thread: ThreadSeed,
}

#[derive(Debug, Clone, Deserialize)]
struct RunStatus {
    id: String,
    thread_id: String,
    status: String,
    last_error: Option<RunError>,
}

#[derive(Debug, Clone, Deserialize)]
struct RunError {
    code: String,
    message: String,
}

#[derive(Debug, Clone, Deserialize)]
struct MessageList {
    data: Vec<ListedMessage>,
}

#[derive(Debug, Clone, Deserialize)]
struct ListedMessage {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Clone, Deserialize)]
struct ContentBlock {
    text: Option<TextBlock>,
}

#[derive(Debug, Clone, Deserialize)]
struct TextBlock {
    value: String,
}
