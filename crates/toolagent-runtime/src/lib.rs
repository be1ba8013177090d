//! # toolagent-runtime
//!
//! Concrete backends for the toolagent core.
//!
//! ## Backends
//!
//! - **Ollama** (default feature): local model inference via Ollama
//! - **MCP**: tool channel speaking JSON-RPC to an MCP server over stdio
//!
//! ## Usage
//!
//! ```rust,ignore
//! use toolagent_runtime::{McpChannel, McpServerConfig, OllamaInvoker};
//!
//! let channel = Arc::new(McpChannel::new(McpServerConfig::new("uv").args(["run", "server.py"])));
//! let catalog = ToolCatalog::discover(channel.as_ref()).await?;
//! let agent = AgentBuilder::new()
//!     .model(Arc::new(OllamaInvoker::from_env()))
//!     .catalog(catalog)
//!     .channel(channel)
//!     .build()?;
//! ```

pub mod mcp;

#[cfg(feature = "ollama")]
pub mod ollama;

pub use mcp::{McpChannel, McpServerConfig};

#[cfg(feature = "ollama")]
pub use ollama::{OllamaConfig, OllamaInvoker};

// Re-export core types for convenience
pub use toolagent_core::{
    Agent, AgentBuilder, AgentConfig, AgentError, ChannelError, ModelInvoker, Outcome, Result,
    ToolCatalog, ToolChannel, ToolResult,
};
