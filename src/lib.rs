//! geny - CRM assistant answering business questions through read-only
//! generated SQL.
//!
//! A free-text question goes through four stages: the configurable system
//! prompt is loaded, a model turns the question into `{sql, explicacao}`,
//! the SQL runs through the single read-only execution surface, and the
//! explanation's `{{name}}` placeholders are bound to the result columns.
//! Every stage degrades to a natural-language reply instead of failing the
//! turn.
//!
//! geny can be used in two ways:
//! - **Server**: run `geny-server serve` and POST to `/geny-chat`
//! - **Library**: embed [`ChatPipeline`] with your own seam implementations
//!
//! # Stable Public API
//!
//! - [`Config`] — layered TOML + environment configuration
//! - [`ChatPipeline`] / [`ChatOutcome`] — one chat turn, never panics
//! - [`GenyError`] — library error type
//! - [`render`] / [`parse`] — the pure pieces, usable standalone

pub use geny_config::Config;

pub use geny_engine::{
    ChatOutcome, ChatPipeline, ModelResponse, PromptSource, QueryGenerator, ReadOnlyQueries,
    parse, render,
};

pub use geny_utils::error::{ConfigError, GenyError, LlmError, StoreError};
pub use geny_utils::types::{ChatQuestion, PromptOrigin, QueryResult, SystemPrompt};

pub use geny_store::{ConfigPromptStore, DEFAULT_PROMPT, QueryExecutor, SupabaseClient};

pub use geny_llm::{LlmBackend, from_config as backend_from_config};

pub mod cli;
pub mod logging;
pub mod server;
