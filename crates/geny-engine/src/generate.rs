//! The generation stage: question + system prompt in, raw model text out.

use std::time::Duration;
use tracing::debug;

use geny_llm::{ChatInvocation, LlmBackend, LlmError, Message};
use geny_utils::types::{ChatQuestion, SystemPrompt};

/// Turns a chat question into raw model output through whichever backend the
/// factory produced. Model and timeout default to the backend's configured
/// values unless overridden here.
pub struct QueryGenerator {
    backend: Box<dyn LlmBackend>,
    model: String,
    timeout: Duration,
}

impl QueryGenerator {
    #[must_use]
    pub fn new(backend: Box<dyn LlmBackend>) -> Self {
        Self {
            backend,
            model: String::new(),
            timeout: Duration::ZERO,
        }
    }

    /// Override the backend's default model.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Override the backend's default timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Issue one generation call.
    ///
    /// # Errors
    ///
    /// Propagates the backend's `LlmError` unchanged; the pipeline maps it to
    /// a degraded response.
    pub async fn generate(
        &self,
        question: &ChatQuestion,
        prompt: &SystemPrompt,
    ) -> Result<String, LlmError> {
        let messages = build_messages(prompt, question);
        let invocation = ChatInvocation::new(self.model.clone(), self.timeout, messages);

        let result = self.backend.invoke(invocation).await?;

        debug!(
            provider = %result.provider,
            model = %result.model_used,
            response_bytes = result.raw_response.len(),
            "Generation completed"
        );

        Ok(result.raw_response)
    }
}

/// System prompt as context, question as the task.
fn build_messages(prompt: &SystemPrompt, question: &ChatQuestion) -> Vec<Message> {
    vec![
        Message::system(prompt.text.trim()),
        Message::user(question.text.trim()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use geny_llm::Role;

    #[test]
    fn build_messages_orders_system_then_user() {
        let prompt = SystemPrompt::built_in("Você é a Geny.\n");
        let question = ChatQuestion::new("  faturamento deste mês ");

        let messages = build_messages(&prompt, &question);

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[0].content, "Você é a Geny.");
        assert_eq!(messages[1].role, Role::User);
        assert_eq!(messages[1].content, "faturamento deste mês");
    }
}
