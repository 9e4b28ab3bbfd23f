//! The Geny assistant pipeline.
//!
//! Four stages per chat turn: load the system prompt, generate a candidate
//! query, execute it through the read-only surface, render the answer by
//! binding `{{name}}` placeholders to result columns. Every stage degrades
//! rather than crashing the turn; see `pipeline` for the failure mapping.

pub mod generate;
pub mod parser;
pub mod pipeline;
pub mod render;

pub use generate::QueryGenerator;
pub use parser::{ModelResponse, parse};
pub use pipeline::{ChatOutcome, ChatPipeline, PromptSource, ReadOnlyQueries};
pub use render::render;
