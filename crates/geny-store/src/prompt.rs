//! The configurable system prompt.
//!
//! The prompt lives in the `system_config` table under a well-known key so
//! operators can tune generation without a redeploy. Loading never fails the
//! caller: absence and I/O errors are logged and absorbed, and the built-in
//! default below takes over.

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::supabase::SupabaseClient;
use geny_engine::PromptSource;
use geny_utils::error::StoreError;
use geny_utils::types::SystemPrompt;

/// Built-in system prompt: schema description plus generation rules.
pub const DEFAULT_PROMPT: &str = r#"Você é a Geny, a assistente de IA do CRM. Responda perguntas de negócio gerando uma consulta SQL de leitura sobre o banco de dados PostgreSQL abaixo.

Tabelas disponíveis:
- orders(id_order, id_client, vendedor, data_pedido, status, canal_venda, transportadora, taxa_entrega, valor_total, valor_desconto, valor_final)
- customers(id_client, nome_completo, email, telefone, cidade, estado, bairro, cep, aniversario, genero)
- products(id_product, titulo, sku, categoria, preco, estoque, ativo, tags)
- itens(id_itens, id_order, id_product, product_total, product_desc, product_final, variante1, variante2)
- vendedores(vendedor, nomevendedor, user_id)
- campanhas(id, nome, tipo, ativo, descricao)

Regras:
1. Responda SEMPRE com um único objeto JSON no formato {"sql": "...", "explicacao": "..."}.
2. O campo "sql" deve conter UMA única consulta SELECT. Nunca gere comandos que criem, alterem ou removam dados.
3. Dê um alias claro a cada coluna do resultado e referencie cada alias na explicação com {{alias}}. Exemplo: {"sql": "SELECT SUM(valor_final) AS faturamento FROM orders", "explicacao": "O faturamento total é {{faturamento}}."}
4. Se a pergunta não precisar do banco (saudação, assunto fora do CRM), omita "sql" e responda apenas com "explicacao".
5. O valor de venda de um pedido é a coluna valor_final de orders."#;

/// Prompt store backed by the `system_config` table.
pub struct ConfigPromptStore {
    client: SupabaseClient,
    key: String,
}

impl ConfigPromptStore {
    #[must_use]
    pub fn new(client: SupabaseClient, key: impl Into<String>) -> Self {
        Self {
            client,
            key: key.into(),
        }
    }

    /// Build a prompt store from configuration.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Misconfiguration` when the Supabase client
    /// cannot be constructed.
    pub fn new_from_config(config: &geny_config::Config) -> Result<Self, StoreError> {
        let client = SupabaseClient::new_from_config(config)?;
        Ok(Self::new(client, config.supabase.prompt_key()))
    }

    /// Overwrite the configured prompt (the admin save operation).
    ///
    /// # Errors
    ///
    /// Propagates the store error; saving is the one prompt operation that
    /// does *not* absorb failures, because the admin needs to know the
    /// update did not land.
    pub async fn save(&self, text: &str) -> Result<(), StoreError> {
        self.client.set_config_value(&self.key, text).await
    }
}

#[async_trait]
impl PromptSource for ConfigPromptStore {
    async fn load(&self) -> SystemPrompt {
        match self.client.config_value(&self.key).await {
            Ok(Some(text)) if !text.trim().is_empty() => SystemPrompt::from_config(text),
            Ok(_) => {
                debug!(key = %self.key, "No configured prompt, using built-in default");
                SystemPrompt::built_in(DEFAULT_PROMPT)
            }
            Err(err) => {
                warn!(key = %self.key, error = %err, "Prompt store unavailable, using built-in default");
                SystemPrompt::built_in(DEFAULT_PROMPT)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geny_utils::types::PromptOrigin;

    #[test]
    fn default_prompt_describes_schema_and_contract() {
        assert!(DEFAULT_PROMPT.contains("orders"));
        assert!(DEFAULT_PROMPT.contains("valor_final"));
        assert!(DEFAULT_PROMPT.contains(r#"{"sql": "...", "explicacao": "..."}"#));
        assert!(DEFAULT_PROMPT.contains("{{alias}}"));
    }

    /// An unreachable store must still yield a usable prompt.
    #[tokio::test]
    async fn load_absorbs_store_failure() {
        let mut config = geny_config::Config::minimal_for_testing();
        config.supabase.url = Some("http://127.0.0.1:1".to_string());
        config.supabase.service_key_env = Some("GENY_PROMPT_TEST_KEY".to_string());
        // SAFETY: test-scoped env mutation with a unique variable name
        unsafe {
            std::env::set_var("GENY_PROMPT_TEST_KEY", "service-key");
        }

        let store = ConfigPromptStore::new_from_config(&config).unwrap();
        let prompt = store.load().await;

        assert_eq!(prompt.origin, PromptOrigin::Default);
        assert_eq!(prompt.text, DEFAULT_PROMPT);

        // SAFETY: cleaning up the variable set above
        unsafe {
            std::env::remove_var("GENY_PROMPT_TEST_KEY");
        }
    }
}
