//! The single sanctioned execution path for model-generated SQL.

use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use crate::guard;
use crate::supabase::SupabaseClient;
use geny_engine::ReadOnlyQueries;
use geny_utils::error::StoreError;
use geny_utils::types::QueryResult;

/// Executes generated SQL through the database-side read-only function.
///
/// Two layers keep this safe: [`guard::ensure_read_only`] rejects anything
/// that is not a single SELECT before it leaves the process, and the
/// database function itself runs under a role restricted to read access.
/// Failed queries are not retried — SQL correctness is the model's problem,
/// not a transient infrastructure fault.
pub struct QueryExecutor {
    client: SupabaseClient,
    rpc_function: String,
}

impl QueryExecutor {
    #[must_use]
    pub fn new(client: SupabaseClient, rpc_function: impl Into<String>) -> Self {
        Self {
            client,
            rpc_function: rpc_function.into(),
        }
    }

    /// Build an executor from configuration.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Misconfiguration` when the Supabase client
    /// cannot be constructed.
    pub fn new_from_config(config: &geny_config::Config) -> Result<Self, StoreError> {
        let client = SupabaseClient::new_from_config(config)?;
        Ok(Self::new(client, config.supabase.rpc_function()))
    }
}

#[async_trait]
impl ReadOnlyQueries for QueryExecutor {
    async fn execute(&self, sql: &str) -> Result<QueryResult, StoreError> {
        guard::ensure_read_only(sql)?;

        debug!(sql_bytes = sql.len(), "Executing read-only query");
        let value = self
            .client
            .rpc(&self.rpc_function, json!({ "query_text": sql }))
            .await?;

        Ok(QueryResult(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// The guard runs before any network call, so a rejected statement fails
    /// even with an unreachable database behind the client.
    #[tokio::test]
    async fn rejected_statement_never_reaches_the_network() {
        let mut config = geny_config::Config::minimal_for_testing();
        config.supabase.service_key_env = Some("GENY_EXECUTOR_TEST_KEY".to_string());
        // SAFETY: test-scoped env mutation with a unique variable name
        unsafe {
            std::env::set_var("GENY_EXECUTOR_TEST_KEY", "service-key");
        }

        let executor = QueryExecutor::new_from_config(&config).unwrap();
        let result = executor.execute("DROP TABLE orders").await;

        assert!(matches!(result, Err(StoreError::QueryRejected(_))));

        // SAFETY: cleaning up the variable set above
        unsafe {
            std::env::remove_var("GENY_EXECUTOR_TEST_KEY");
        }
    }
}
