//! Configuration model for the geny service.
//!
//! Configuration is layered: built-in defaults, then an optional TOML file,
//! then environment variables for anything secret-adjacent. Secrets never
//! live in the file — config carries the *names* of the environment variables
//! that hold them (`api_key_env`, `service_key_env`).

use camino::Utf8Path;
use serde::{Deserialize, Serialize};

use geny_utils::error::ConfigError;

/// Default environment variable holding the Supabase project URL.
const SUPABASE_URL_ENV: &str = "SUPABASE_URL";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub supabase: SupabaseConfig,
    #[serde(default)]
    pub llm: LlmConfig,
}

/// HTTP listener settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
}

impl ServerConfig {
    #[must_use]
    pub fn host(&self) -> &str {
        self.host.as_deref().unwrap_or("127.0.0.1")
    }

    #[must_use]
    pub fn port(&self) -> u16 {
        self.port.unwrap_or(8787)
    }
}

/// Supabase/PostgREST settings.
///
/// `url` may be omitted from the file and supplied via `SUPABASE_URL`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SupabaseConfig {
    pub url: Option<String>,
    /// Name of the env var holding the service-role key
    pub service_key_env: Option<String>,
    /// `system_config` key that overrides the built-in system prompt
    pub prompt_key: Option<String>,
    /// Name of the read-only execution function
    pub rpc_function: Option<String>,
}

impl SupabaseConfig {
    /// Resolve the project URL from config or environment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingRequired` when neither is set.
    pub fn resolve_url(&self) -> Result<String, ConfigError> {
        if let Some(url) = self.url.clone() {
            return Ok(url);
        }
        std::env::var(SUPABASE_URL_ENV).map_err(|_| {
            ConfigError::MissingRequired(format!(
                "[supabase] url (or the {SUPABASE_URL_ENV} environment variable)"
            ))
        })
    }

    #[must_use]
    pub fn service_key_env(&self) -> &str {
        self.service_key_env
            .as_deref()
            .unwrap_or("SUPABASE_SERVICE_ROLE_KEY")
    }

    #[must_use]
    pub fn prompt_key(&self) -> &str {
        self.prompt_key.as_deref().unwrap_or("geny_prompt")
    }

    #[must_use]
    pub fn rpc_function(&self) -> &str {
        self.rpc_function
            .as_deref()
            .unwrap_or("execute_readonly_query")
    }
}

/// Model-provider selection and per-provider settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LlmConfig {
    /// `openai-chat` (default) or `openai-assistants`
    pub provider: Option<String>,
    /// Used only when the primary provider fails to construct
    pub fallback_provider: Option<String>,
    pub chat: Option<ChatConfig>,
    pub assistants: Option<AssistantsConfig>,
}

/// Chat-completions backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChatConfig {
    pub base_url: Option<String>,
    pub api_key_env: Option<String>,
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    /// Whole-call timeout in seconds
    pub timeout_secs: Option<u64>,
}

/// Assistants-style polling backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AssistantsConfig {
    pub base_url: Option<String>,
    pub api_key_env: Option<String>,
    pub assistant_id: Option<String>,
    /// Sleep between status polls, milliseconds
    pub poll_interval_ms: Option<u64>,
    /// Number of polls before giving up
    pub poll_attempts: Option<u32>,
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::NotFound` when the path does not exist and
    /// `ConfigError::InvalidFile` on malformed TOML or unknown keys.
    pub fn from_file(path: &Utf8Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|_| ConfigError::NotFound {
            path: path.to_string(),
        })?;
        toml::from_str(&raw).map_err(|e| ConfigError::InvalidFile(e.to_string()))
    }

    /// Load from an optional path, falling back to defaults when absent.
    ///
    /// An explicitly passed path must exist; with `None`, the conventional
    /// `geny.toml` is used if present and defaults otherwise.
    ///
    /// # Errors
    ///
    /// Propagates `from_file` errors for explicit or present files.
    pub fn discover(path: Option<&Utf8Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => Self::from_file(p),
            None => {
                let conventional = Utf8Path::new("geny.toml");
                if conventional.exists() {
                    Self::from_file(conventional)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Minimal config for tests: localhost Supabase, chat provider pointed at
    /// a placeholder endpoint. Network-touching tests override the URLs.
    #[cfg(any(test, feature = "test-utils"))]
    #[must_use]
    pub fn minimal_for_testing() -> Self {
        Self {
            server: ServerConfig::default(),
            supabase: SupabaseConfig {
                url: Some("http://localhost:54321".to_string()),
                service_key_env: Some("GENY_TEST_SERVICE_KEY".to_string()),
                prompt_key: None,
                rpc_function: None,
            },
            llm: LlmConfig {
                provider: Some("openai-chat".to_string()),
                fallback_provider: None,
                chat: Some(ChatConfig {
                    base_url: Some("http://localhost:9999/v1/chat/completions".to_string()),
                    api_key_env: Some("GENY_TEST_API_KEY".to_string()),
                    model: Some("gpt-4o-mini".to_string()),
                    max_tokens: None,
                    temperature: None,
                    timeout_secs: None,
                }),
                assistants: None,
            },
        }
    }
}
