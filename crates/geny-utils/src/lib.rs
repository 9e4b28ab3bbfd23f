//! Shared domain types and error taxonomy for the geny workspace.

pub mod error;
pub mod types;

pub use error::{ConfigError, GenyError, LlmError, StoreError};
pub use types::{ChatQuestion, PromptOrigin, QueryResult, ResultShape, SystemPrompt};
