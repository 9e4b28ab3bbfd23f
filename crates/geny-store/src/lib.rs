//! Database-facing side of the assistant: the single sanctioned dynamic-SQL
//! execution path, the read-only guard in front of it, and the configurable
//! prompt store.

mod executor;
mod guard;
mod prompt;
mod supabase;

pub use executor::QueryExecutor;
pub use guard::ensure_read_only;
pub use prompt::{ConfigPromptStore, DEFAULT_PROMPT};
pub use supabase::SupabaseClient;

pub use geny_utils::error::StoreError;
