//! Ollama Model Backend
//!
//! Implementation of `ModelInvoker` for local Ollama inference.

use async_trait::async_trait;
use ollama_rs::{
    Ollama,
    generation::chat::{ChatMessage, MessageRole, request::ChatMessageRequest},
    models::ModelOptions,
};
use toolagent_core::{
    error::{AgentError, Result},
    provider::{GenerationOptions, ModelInfo, ModelInvoker},
};

/// Ollama backend configuration
#[derive(Clone, Debug)]
pub struct OllamaConfig {
    /// Ollama host URL
    pub host: String,

    /// Ollama port
    pub port: u16,

    /// Model and sampling settings
    pub generation: GenerationOptions,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            host: "http://localhost".into(),
            port: 11434,
            generation: GenerationOptions::default(),
        }
    }
}

impl OllamaConfig {
    /// Read `OLLAMA_HOST`, `OLLAMA_PORT`, `OLLAMA_MODEL` and
    /// `OLLAMA_TEMPERATURE`; unset or unparsable values keep their defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let host = std::env::var("OLLAMA_HOST").unwrap_or(defaults.host);
        let port = std::env::var("OLLAMA_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(defaults.port);

        let mut generation = defaults.generation;
        if let Ok(model) = std::env::var("OLLAMA_MODEL") {
            generation.model = model;
        }
        if let Some(temperature) = std::env::var("OLLAMA_TEMPERATURE")
            .ok()
            .and_then(|t| t.parse().ok())
        {
            generation.temperature = temperature;
        }

        Self {
            host,
            port,
            generation,
        }
    }
}

/// Ollama model backend
pub struct OllamaInvoker {
    client: Ollama,
    config: OllamaConfig,
}

impl OllamaInvoker {
    /// Create from configuration
    pub fn from_config(config: OllamaConfig) -> Self {
        Self {
            client: Ollama::new(&config.host, config.port),
            config,
        }
    }

    /// Create from environment variables
    pub fn from_env() -> Self {
        Self::from_config(OllamaConfig::from_env())
    }

    /// Create with default localhost settings
    pub fn localhost() -> Self {
        Self::from_config(OllamaConfig::default())
    }

    pub const fn config(&self) -> &OllamaConfig {
        &self.config
    }

    /// Check that the Ollama server answers
    pub async fn health_check(&self) -> bool {
        match self.client.list_local_models().await {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!("Ollama health check failed: {}", e);
                false
            }
        }
    }

    /// List locally available models
    pub async fn list_models(&self) -> Result<Vec<ModelInfo>> {
        let models = self
            .client
            .list_local_models()
            .await
            .map_err(|e| AgentError::ModelUnavailable(e.to_string()))?;

        Ok(models
            .into_iter()
            .map(|m| ModelInfo {
                id: m.name.clone(),
                name: m.name,
            })
            .collect())
    }

    fn build_request(&self, text: &str) -> ChatMessageRequest {
        let opts = &self.config.generation;
        let options = ModelOptions::default()
            .temperature(opts.temperature)
            .top_p(opts.top_p)
            .num_predict(i32::try_from(opts.max_tokens).unwrap_or(i32::MAX));

        ChatMessageRequest::new(
            opts.model.clone(),
            vec![ChatMessage::new(MessageRole::User, text.to_owned())],
        )
        .options(options)
    }
}

#[async_trait]
impl ModelInvoker for OllamaInvoker {
    async fn invoke(&self, text: &str) -> Result<String> {
        let response = self
            .client
            .send_chat_messages(self.build_request(text))
            .await
            .map_err(|e| AgentError::Model(e.to_string()))?;

        Ok(response.message.content)
    }

    fn name(&self) -> &str {
        &self.config.generation.model
    }
}
