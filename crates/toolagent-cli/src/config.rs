//! Client Configuration

use std::path::PathBuf;

use toolagent_core::AgentConfig;
use toolagent_runtime::{McpServerConfig, OllamaConfig};

/// Everything the interactive client needs, read from the environment
#[derive(Clone, Debug)]
pub struct CliConfig {
    /// Ollama connection and model settings
    pub ollama: OllamaConfig,

    /// MCP server to spawn; `None` runs with simulated tool results
    pub mcp_server: Option<McpServerConfig>,

    /// Agent timeouts and policies
    pub agent: AgentConfig,

    /// Where screenshots returned by tools are written
    pub screenshot_path: PathBuf,
}

impl CliConfig {
    pub fn from_env() -> toolagent_core::Result<Self> {
        Ok(Self {
            ollama: OllamaConfig::from_env(),
            mcp_server: McpServerConfig::from_env(),
            agent: AgentConfig::from_env()?,
            screenshot_path: std::env::var("SCREENSHOT_PATH")
                .map_or_else(|_| PathBuf::from("output.png"), PathBuf::from),
        })
    }
}
