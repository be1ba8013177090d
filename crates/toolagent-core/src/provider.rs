//! Model Invocation Boundary
//!
//! The agent talks to a language model through a single capability: text in,
//! text out. Local runtimes (Ollama), remote APIs and plain closures all sit
//! behind [`ModelInvoker`] and are treated the same way.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use toolagent_core::provider::{FnInvoker, ModelInvoker};
//!
//! let model = FnInvoker::new(|prompt: &str| {
//!     Ok(r#"{"tool_name": null, "tool_args": {}, "answer": "hi"}"#.to_string())
//! });
//! let text = model.invoke("hello").await?;
//! ```

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{AgentError, Result};

/// Configuration for model generation
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GenerationOptions {
    /// Model identifier (e.g., "qwen3:1.7b", "llama3.2")
    pub model: String,

    /// Temperature for sampling (0.0 = deterministic, 1.0 = creative)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens to generate
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Top-p nucleus sampling
    #[serde(default = "default_top_p")]
    pub top_p: f32,
}

const fn default_temperature() -> f32 { 0.7 }
const fn default_max_tokens() -> u32 { 2048 }
const fn default_top_p() -> f32 { 0.9 }

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            model: "qwen3:1.7b".into(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            top_p: default_top_p(),
        }
    }
}

/// Information about a model offered by a backend
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ModelInfo {
    pub id: String,
    pub name: String,
}

/// "String in, string out" language-model capability
///
/// Implementations may be slow. They must not block the async executor:
/// anything synchronous belongs on the blocking pool (see [`FnInvoker`]) so
/// that callers can put a timeout around [`ModelInvoker::invoke`].
#[async_trait]
pub trait ModelInvoker: Send + Sync {
    /// Send `text` to the model and return its raw completion
    async fn invoke(&self, text: &str) -> Result<String>;

    /// Short backend label used in logs
    fn name(&self) -> &str {
        "model"
    }
}

type ModelFn = dyn Fn(&str) -> anyhow::Result<String> + Send + Sync;

/// Wraps an arbitrary blocking callable (an SDK call, a canned responder)
/// as a [`ModelInvoker`]. Each call runs on tokio's blocking pool.
#[derive(Clone)]
pub struct FnInvoker {
    func: Arc<ModelFn>,
    label: String,
}

impl FnInvoker {
    pub fn new<F>(func: F) -> Self
    where
        F: Fn(&str) -> anyhow::Result<String> + Send + Sync + 'static,
    {
        Self {
            func: Arc::new(func),
            label: "callable".into(),
        }
    }

    /// Set the label reported by [`ModelInvoker::name`]
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }
}

impl std::fmt::Debug for FnInvoker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnInvoker").field("label", &self.label).finish_non_exhaustive()
    }
}

#[async_trait]
impl ModelInvoker for FnInvoker {
    async fn invoke(&self, text: &str) -> Result<String> {
        let func = Arc::clone(&self.func);
        let text = text.to_owned();

        tokio::task::spawn_blocking(move || func(&text))
            .await
            .map_err(|e| AgentError::Model(format!("model task failed: {e}")))?
            .map_err(|e| AgentError::Model(e.to_string()))
    }

    fn name(&self) -> &str {
        &self.label
    }
}

/// Invoke the model, optionally bounded by `budget`.
pub async fn invoke_within(
    model: &dyn ModelInvoker,
    text: &str,
    budget: Option<Duration>,
) -> Result<String> {
    match budget {
        Some(limit) => tokio::time::timeout(limit, model.invoke(text))
            .await
            .map_err(|_| AgentError::ModelTimeout(limit))?,
        None => model.invoke(text).await,
    }
}
