//! toolagent interactive client
//!
//! Reads requests from stdin, lets the model pick a tool or answer, and
//! prints what came back. Tools are served by the MCP server named in
//! `MCP_SERVER_COMMAND`; without one, tool results are simulated.

mod config;
mod handlers;

use std::sync::Arc;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use toolagent_core::{Agent, AgentBuilder, Outcome};
use toolagent_runtime::{McpChannel, OllamaInvoker};

use crate::config::CliConfig;
use crate::handlers::handle_outcome;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment
    dotenvy::dotenv().ok();

    // stdout belongs to the conversation
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = CliConfig::from_env().context("invalid agent configuration")?;

    // Initialize model backend
    let model = Arc::new(OllamaInvoker::from_config(config.ollama.clone()));
    if model.health_check().await {
        tracing::info!("Connected to Ollama, using model {}", config.ollama.generation.model);
        if let Ok(models) = model.list_models().await {
            for m in models {
                tracing::debug!("  Model: {}", m.id);
            }
        }
    } else {
        tracing::warn!("Ollama not available, requests will fail until it is running");
        tracing::warn!("  Make sure Ollama is running: ollama serve");
    }

    let mut builder = AgentBuilder::new().model(model).config(config.agent.clone());

    // Discover tools
    match &config.mcp_server {
        Some(server) => {
            builder = builder
                .discover_tools(Arc::new(McpChannel::new(server.clone())))
                .await
                .with_context(|| format!("failed to discover tools from '{}'", server.name))?;
        }
        None => tracing::warn!("MCP_SERVER_COMMAND not set, tool results will be simulated"),
    }

    let agent = builder.build()?;

    tracing::info!("Available tools:");
    for name in agent.catalog().names() {
        tracing::info!("  • {}", name);
    }

    repl(&agent, &config).await
}

async fn repl(agent: &Agent, config: &CliConfig) -> anyhow::Result<()> {
    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        stdout.write_all(b"user input: ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if matches!(input.to_lowercase().as_str(), "exit" | "quit") {
            break;
        }

        let outcome = match decide_and_act(agent, input).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(error = %e, "Request failed");
                println!("{}", e.user_message());
                continue;
            }
        };

        match handle_outcome(&outcome, &config.screenshot_path) {
            Ok(handled) => println!("{handled}"),
            Err(e) => {
                tracing::error!(error = %e, "Could not handle tool result");
                println!("{e}");
            }
        }
    }

    tracing::info!("Goodbye");
    Ok(())
}

async fn decide_and_act(agent: &Agent, input: &str) -> toolagent_core::Result<Outcome> {
    let action = agent.decide_action(input).await?;
    match action.as_ref().and_then(|a| a.selected_tool()) {
        Some(tool) => tracing::info!(tool, "Calling tool"),
        None => tracing::info!("No tool selected, answering directly"),
    }
    agent.act(action.as_ref(), input).await
}
