//! Thin PostgREST client for the hosted database service.
//!
//! Two surfaces only: the `execute_readonly_query` RPC and the
//! `system_config` key/value table. Anything else the dashboard does with
//! the database is out of scope here.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use geny_utils::error::StoreError;

/// Timeout for any single database-service call.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Key/value configuration table.
const CONFIG_TABLE: &str = "system_config";

#[derive(Clone)]
pub struct SupabaseClient {
    http: reqwest::Client,
    base_url: String,
    service_key: String,
}

impl SupabaseClient {
    /// Create a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Misconfiguration` when the project URL or the
    /// service key environment variable is missing.
    pub fn new_from_config(config: &geny_config::Config) -> Result<Self, StoreError> {
        let base_url = config
            .supabase
            .resolve_url()
            .map_err(|e| StoreError::Misconfiguration(e.to_string()))?;

        let key_env = config.supabase.service_key_env();
        let service_key = std::env::var(key_env).map_err(|_| {
            StoreError::Misconfiguration(format!(
                "Service key not found in environment variable '{key_env}'. \
                 Please set this variable or configure a different service_key_env in [supabase]."
            ))
        })?;

        Ok(Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            service_key,
        })
    }

    fn authed(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .header("apikey", &self.service_key)
            .header("Authorization", format!("Bearer {}", self.service_key))
            .timeout(REQUEST_TIMEOUT)
    }

    /// Call a database function through PostgREST.
    ///
    /// # Errors
    ///
    /// Non-2xx responses become `StoreError::Rpc` with the response body as
    /// the detail; connectivity failures become `StoreError::Transport`.
    pub async fn rpc(
        &self,
        function: &str,
        args: serde_json::Value,
    ) -> Result<serde_json::Value, StoreError> {
        let url = format!("{}/rest/v1/rpc/{function}", self.base_url);
        debug!(%function, "Calling database function");

        let response = self
            .authed(self.http.post(&url))
            .header("Content-Type", "application/json")
            .json(&args)
            .send()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| StoreError::Transport(format!("Failed to read response: {e}")))?;

        if !(200..300).contains(&status) {
            return Err(StoreError::Rpc {
                status,
                detail: rpc_error_detail(&body),
            });
        }

        if body.trim().is_empty() {
            return Ok(serde_json::Value::Null);
        }

        serde_json::from_str(&body)
            .map_err(|e| StoreError::Transport(format!("Function returned non-JSON body: {e}")))
    }

    /// Read one value from the configuration table.
    ///
    /// # Errors
    ///
    /// Same classification as [`rpc`](Self::rpc).
    pub async fn config_value(&self, key: &str) -> Result<Option<String>, StoreError> {
        let url = format!("{}/rest/v1/{CONFIG_TABLE}", self.base_url);

        let response = self
            .authed(self.http.get(&url))
            .query(&[("key", format!("eq.{key}")), ("select", "value".to_string())])
            .send()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| StoreError::Transport(format!("Failed to read response: {e}")))?;

        if !(200..300).contains(&status) {
            return Err(StoreError::Rpc {
                status,
                detail: rpc_error_detail(&body),
            });
        }

        let rows: Vec<ConfigRow> = serde_json::from_str(&body)
            .map_err(|e| StoreError::Transport(format!("Unexpected config response: {e}")))?;

        Ok(rows.into_iter().next().and_then(|row| row.value))
    }

    /// Upsert one value in the configuration table.
    ///
    /// # Errors
    ///
    /// Same classification as [`rpc`](Self::rpc).
    pub async fn set_config_value(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let url = format!("{}/rest/v1/{CONFIG_TABLE}", self.base_url);
        let row = ConfigRow {
            key: Some(key.to_string()),
            value: Some(value.to_string()),
        };

        let response = self
            .authed(self.http.post(&url))
            .header("Content-Type", "application/json")
            .header("Prefer", "resolution=merge-duplicates")
            .query(&[("on_conflict", "key")])
            .json(&[row])
            .send()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        if !(200..300).contains(&status) {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Rpc {
                status,
                detail: rpc_error_detail(&body),
            });
        }

        Ok(())
    }
}

/// PostgREST error bodies carry a `message` field; prefer it over the raw
/// body so the degraded chat response reads like the database error it is.
fn rpc_error_detail(body: &str) -> String {
    #[derive(Deserialize)]
    struct PostgrestError {
        message: String,
    }

    match serde_json::from_str::<PostgrestError>(body) {
        Ok(err) => err.message,
        Err(_) => body.trim().to_string(),
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct ConfigRow {
    #[serde(skip_serializing_if = "Option::is_none")]
    key: Option<String>,
    value: Option<String>,
}
