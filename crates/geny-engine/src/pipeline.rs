//! Orchestration of one chat turn.
//!
//! States: `Init → Prompted → Generated → Parsed → {NoQuery | Executed} →
//! Rendered`, with every state able to fail. A failure never escapes as an
//! error: it is mapped to a natural-language response so the chat UI always
//! has literal text to display, and the HTTP status stays 200 for every
//! handled outcome.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};

use crate::generate::QueryGenerator;
use crate::parser::{self, ModelResponse};
use crate::render;
use geny_utils::error::StoreError;
use geny_utils::types::{ChatQuestion, QueryResult, SystemPrompt};

/// Worst-case reply when generation itself fails.
const GENERATION_FAILURE_REPLY: &str = "Desculpe, ocorreu um erro ao processar sua solicitação.";

/// Prefix for database-side failures; the error detail is appended.
const QUERY_FAILURE_PREFIX: &str = "Desculpe, ocorreu um erro ao consultar os dados";

/// Reply when the model produced neither SQL nor an explanation.
const EMPTY_REPLY: &str = "Não consegui gerar uma resposta para essa pergunta.";

/// Source of the system prompt for a turn. Implementations absorb their own
/// failures and fall back to the built-in default.
#[async_trait]
pub trait PromptSource: Send + Sync {
    async fn load(&self) -> SystemPrompt;
}

/// The sanctioned read-only execution surface. The only path in the process
/// that may run dynamic SQL.
#[async_trait]
pub trait ReadOnlyQueries: Send + Sync {
    async fn execute(&self, sql: &str) -> Result<QueryResult, StoreError>;
}

/// Outcome of one turn. `response` is the only field a caller must render;
/// the rest is diagnostic payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatOutcome {
    pub response: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_response: Option<ModelResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_result: Option<QueryResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Pipeline stage, for tracing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Prompted,
    Generated,
    Parsed,
    NoQuery,
    Executed,
    Rendered,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Prompted => "prompted",
            Stage::Generated => "generated",
            Stage::Parsed => "parsed",
            Stage::NoQuery => "no_query",
            Stage::Executed => "executed",
            Stage::Rendered => "rendered",
        };
        f.write_str(name)
    }
}

/// Sequences the four stages for one request and maps every failure to a
/// user-safe response.
pub struct ChatPipeline {
    prompts: Box<dyn PromptSource>,
    generator: QueryGenerator,
    queries: Box<dyn ReadOnlyQueries>,
}

impl ChatPipeline {
    #[must_use]
    pub fn new(
        prompts: Box<dyn PromptSource>,
        generator: QueryGenerator,
        queries: Box<dyn ReadOnlyQueries>,
    ) -> Self {
        Self {
            prompts,
            generator,
            queries,
        }
    }

    /// Handle one chat turn. Never returns an error; every failure mode is
    /// folded into the outcome.
    pub async fn handle(&self, question: ChatQuestion) -> ChatOutcome {
        let prompt = self.prompts.load().await;
        debug!(stage = %Stage::Prompted, origin = ?prompt.origin, "Prompt loaded");

        let raw = match self.generator.generate(&question, &prompt).await {
            Ok(raw) => raw,
            Err(err) => {
                warn!(error = %err, "Generation failed");
                return ChatOutcome {
                    response: GENERATION_FAILURE_REPLY.to_string(),
                    ai_response: None,
                    query_result: None,
                    error: Some(err.to_string()),
                };
            }
        };
        debug!(stage = %Stage::Generated, bytes = raw.len(), "Model replied");

        let model = parser::parse(&raw);
        debug!(stage = %Stage::Parsed, has_sql = model.sql.is_some(), "Model output parsed");

        let Some(sql) = model.sql.clone() else {
            debug!(stage = %Stage::NoQuery, "Answering without a query");
            let response = if model.explanation.trim().is_empty() {
                EMPTY_REPLY.to_string()
            } else {
                model.explanation.clone()
            };
            return ChatOutcome {
                response,
                ai_response: Some(model),
                query_result: None,
                error: None,
            };
        };

        match self.queries.execute(&sql).await {
            Ok(result) => {
                debug!(stage = %Stage::Executed, shape = ?result.shape(), "Query executed");
                let response = render::render(&model, &result);
                debug!(stage = %Stage::Rendered, bytes = response.len(), "Answer rendered");
                ChatOutcome {
                    response,
                    ai_response: Some(model),
                    query_result: Some(result),
                    error: None,
                }
            }
            Err(err) => {
                warn!(error = %err, "Query execution failed");
                ChatOutcome {
                    response: format!("{QUERY_FAILURE_PREFIX}: {err}"),
                    ai_response: Some(model),
                    query_result: None,
                    error: Some(err.to_string()),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geny_llm::{ChatInvocation, LlmBackend, LlmError, LlmResult};
    use serde_json::json;
    use std::sync::Mutex;

    struct FixedPrompt;

    #[async_trait]
    impl PromptSource for FixedPrompt {
        async fn load(&self) -> SystemPrompt {
            SystemPrompt::built_in("Você é a Geny.")
        }
    }

    struct ScriptedBackend {
        reply: Result<String, LlmError>,
    }

    #[async_trait]
    impl LlmBackend for ScriptedBackend {
        async fn invoke(&self, _inv: ChatInvocation) -> Result<LlmResult, LlmError> {
            match &self.reply {
                Ok(text) => Ok(LlmResult::new(text.clone(), "scripted", "test-model")),
                Err(LlmError::Transport(msg)) => Err(LlmError::Transport(msg.clone())),
                Err(other) => Err(LlmError::Transport(other.to_string())),
            }
        }
    }

    struct ScriptedQueries {
        result: Result<serde_json::Value, String>,
        executed: Mutex<Vec<String>>,
    }

    impl ScriptedQueries {
        fn ok(value: serde_json::Value) -> Self {
            Self {
                result: Ok(value),
                executed: Mutex::new(Vec::new()),
            }
        }

        fn failing(detail: &str) -> Self {
            Self {
                result: Err(detail.to_string()),
                executed: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ReadOnlyQueries for ScriptedQueries {
        async fn execute(&self, sql: &str) -> Result<QueryResult, StoreError> {
            self.executed.lock().unwrap().push(sql.to_string());
            match &self.result {
                Ok(value) => Ok(QueryResult(value.clone())),
                Err(detail) => Err(StoreError::Rpc {
                    status: 400,
                    detail: detail.clone(),
                }),
            }
        }
    }

    fn pipeline_with(
        reply: Result<String, LlmError>,
        queries: ScriptedQueries,
    ) -> (ChatPipeline, std::sync::Arc<ScriptedQueries>) {
        let queries = std::sync::Arc::new(queries);

        struct Shared(std::sync::Arc<ScriptedQueries>);

        #[async_trait]
        impl ReadOnlyQueries for Shared {
            async fn execute(&self, sql: &str) -> Result<QueryResult, StoreError> {
                self.0.execute(sql).await
            }
        }

        let pipeline = ChatPipeline::new(
            Box::new(FixedPrompt),
            QueryGenerator::new(Box::new(ScriptedBackend { reply })),
            Box::new(Shared(queries.clone())),
        );
        (pipeline, queries)
    }

    #[tokio::test]
    async fn full_turn_renders_placeholder() {
        let reply = Ok(r#"{"sql": "SELECT SUM(valor_final) AS faturamento FROM orders", "explicacao": "O faturamento deste mês é {{faturamento}}."}"#.to_string());
        let (pipeline, queries) =
            pipeline_with(reply, ScriptedQueries::ok(json!({"faturamento": 12345.6})));

        let outcome = pipeline.handle(ChatQuestion::new("faturamento deste mês")).await;

        assert_eq!(outcome.response, "O faturamento deste mês é R$ 12.345,60.");
        assert!(outcome.error.is_none());
        assert!(outcome.query_result.is_some());
        assert_eq!(
            queries.executed.lock().unwrap().as_slice(),
            ["SELECT SUM(valor_final) AS faturamento FROM orders"]
        );
    }

    #[tokio::test]
    async fn no_sql_skips_execution() {
        let reply = Ok(r#"{"explicacao": "Olá! Como posso ajudar?"}"#.to_string());
        let (pipeline, queries) = pipeline_with(reply, ScriptedQueries::ok(json!(null)));

        let outcome = pipeline.handle(ChatQuestion::new("oi")).await;

        assert_eq!(outcome.response, "Olá! Como posso ajudar?");
        assert!(outcome.query_result.is_none());
        assert!(queries.executed.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn execution_failure_degrades_with_detail() {
        let reply = Ok(
            r#"{"sql": "SELECT x FROM missing", "explicacao": "Valor: {{x}}"}"#.to_string(),
        );
        let (pipeline, _) = pipeline_with(
            reply,
            ScriptedQueries::failing("relation \"missing\" does not exist"),
        );

        let outcome = pipeline.handle(ChatQuestion::new("algo")).await;

        assert!(outcome.response.starts_with("Desculpe, ocorreu um erro ao consultar os dados"));
        assert!(outcome.response.contains("missing"));
        assert!(outcome.error.is_some());
        assert!(outcome.ai_response.is_some());
    }

    #[tokio::test]
    async fn generation_failure_yields_apology() {
        let reply = Err(LlmError::Transport("HTTP 500: upstream".to_string()));
        let (pipeline, queries) = pipeline_with(reply, ScriptedQueries::ok(json!(null)));

        let outcome = pipeline.handle(ChatQuestion::new("algo")).await;

        assert_eq!(outcome.response, GENERATION_FAILURE_REPLY);
        assert!(outcome.error.unwrap().contains("upstream"));
        assert!(queries.executed.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn unparsable_prose_is_returned_verbatim() {
        let reply = Ok("Não entendi a pergunta, pode detalhar?".to_string());
        let (pipeline, queries) = pipeline_with(reply, ScriptedQueries::ok(json!(null)));

        let outcome = pipeline.handle(ChatQuestion::new("???")).await;

        assert_eq!(outcome.response, "Não entendi a pergunta, pode detalhar?");
        assert!(queries.executed.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_model_output_gets_fixed_reply() {
        let reply = Ok(String::new());
        let (pipeline, _) = pipeline_with(reply, ScriptedQueries::ok(json!(null)));

        let outcome = pipeline.handle(ChatQuestion::new("?")).await;

        assert_eq!(outcome.response, EMPTY_REPLY);
    }

    #[test]
    fn outcome_serializes_without_empty_fields() {
        let outcome = ChatOutcome {
            response: "ok".to_string(),
            ai_response: None,
            query_result: None,
            error: None,
        };
        let text = serde_json::to_string(&outcome).unwrap();
        assert_eq!(text, r#"{"response":"ok"}"#);
    }
}
