//! MCP tool channel over a child process's stdio.
//!
//! Every [`McpChannel::open`] spawns the configured server, performs the
//! `initialize` handshake and hands back a session that owns the process.
//! Closing the session ends the process; so does dropping it.

use std::collections::HashMap;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use toolagent_core::{
    ChannelError, ToolArgs,
    tool::{ToolChannel, ToolDescriptor, ToolOutput, ToolSession},
};

use super::transport::JsonRpcTransport;
use super::types::{CallToolResult, ListToolsResult, PROTOCOL_VERSION};

/// Timeout for the initialize handshake.
const INIT_TIMEOUT: Duration = Duration::from_secs(30);

/// Time a server gets to exit after its input is closed.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// How to launch an MCP server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct McpServerConfig {
    /// Label used in logs and errors
    pub name: String,
    pub command: String,
    pub args: Vec<String>,
    pub env: HashMap<String, String>,
    pub cwd: Option<String>,
}

impl McpServerConfig {
    pub fn new(command: impl Into<String>) -> Self {
        let command = command.into();
        Self {
            name: server_label(&command),
            command,
            args: Vec::new(),
            env: HashMap::new(),
            cwd: None,
        }
    }

    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Read `MCP_SERVER_COMMAND`, `MCP_SERVER_ARGS` (whitespace separated)
    /// and `MCP_SERVER_CWD`. Returns `None` when no command is configured.
    pub fn from_env() -> Option<Self> {
        let command = std::env::var("MCP_SERVER_COMMAND").ok().filter(|c| !c.trim().is_empty())?;
        let args = std::env::var("MCP_SERVER_ARGS").unwrap_or_default();

        let mut config = Self::new(command.trim()).args(args.split_whitespace());
        config.cwd = std::env::var("MCP_SERVER_CWD").ok();
        Some(config)
    }
}

fn server_label(command: &str) -> String {
    std::path::Path::new(command)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(command)
        .to_string()
}

/// [`ToolChannel`] backed by an MCP server spawned per session
#[derive(Debug, Clone)]
pub struct McpChannel {
    config: McpServerConfig,
}

impl McpChannel {
    pub const fn new(config: McpServerConfig) -> Self {
        Self { config }
    }

    pub const fn config(&self) -> &McpServerConfig {
        &self.config
    }

    fn spawn(&self) -> Result<Child, ChannelError> {
        let config = &self.config;
        let mut cmd = Command::new(&config.command);
        cmd.args(&config.args)
            .envs(&config.env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &config.cwd {
            cmd.current_dir(dir);
        }

        cmd.spawn().map_err(|e| ChannelError::Spawn {
            name: config.name.clone(),
            reason: e.to_string(),
        })
    }
}

#[async_trait]
impl ToolChannel for McpChannel {
    async fn open(&self) -> Result<Box<dyn ToolSession>, ChannelError> {
        let name = self.config.name.clone();
        let mut child = self.spawn()?;

        let missing = |pipe: &str| ChannelError::Spawn {
            name: name.clone(),
            reason: format!("failed to capture {pipe}"),
        };
        let stdin = child.stdin.take().ok_or_else(|| missing("stdin"))?;
        let stdout = child.stdout.take().ok_or_else(|| missing("stdout"))?;

        if let Some(stderr) = child.stderr.take() {
            let server = name.clone();
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    tracing::debug!(server = %server, "{line}");
                }
            });
        }

        let transport = JsonRpcTransport::new(&name, stdin, BufReader::new(stdout));
        let mut client = McpClient::new(transport);
        match tokio::time::timeout(INIT_TIMEOUT, client.initialize()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e),
            Err(_) => {
                return Err(ChannelError::Unavailable(format!(
                    "server '{name}' did not finish initialization within {}s",
                    INIT_TIMEOUT.as_secs()
                )));
            }
        }

        tracing::debug!(server = %name, "MCP session opened");
        Ok(Box::new(McpSession { client, child }))
    }

    fn name(&self) -> &str {
        &self.config.name
    }
}

/// MCP protocol operations over any JSON-RPC transport
pub struct McpClient<W, R> {
    transport: JsonRpcTransport<W, R>,
}

impl<W, R> McpClient<W, R>
where
    W: AsyncWrite + Unpin + Send,
    R: AsyncBufRead + Unpin + Send,
{
    pub const fn new(transport: JsonRpcTransport<W, R>) -> Self {
        Self { transport }
    }

    /// `initialize` request followed by the `initialized` notification
    pub async fn initialize(&mut self) -> Result<(), ChannelError> {
        let params = json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {},
            "clientInfo": {
                "name": "toolagent",
                "version": env!("CARGO_PKG_VERSION"),
            },
        });
        self.transport.request("initialize", Some(params)).await?;
        self.transport.notify("notifications/initialized", None).await
    }

    /// All tools, following pagination cursors
    pub async fn list_tools(&mut self) -> Result<Vec<ToolDescriptor>, ChannelError> {
        let mut tools = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let params = cursor.as_ref().map(|c| json!({ "cursor": c }));
            let value = self.transport.request("tools/list", params).await?;
            let page: ListToolsResult = decode(value, "tools/list")?;

            tools.extend(page.tools.into_iter().map(ToolDescriptor::from));
            match page.next_cursor {
                Some(next) if !next.is_empty() => cursor = Some(next),
                _ => return Ok(tools),
            }
        }
    }

    /// Call `name`; an `isError` result becomes [`ChannelError::Tool`]
    pub async fn call_tool(
        &mut self,
        name: &str,
        args: &ToolArgs,
    ) -> Result<ToolOutput, ChannelError> {
        let params = json!({ "name": name, "arguments": args });
        let value = self.transport.request("tools/call", Some(params)).await?;
        let result: CallToolResult = decode(value, "tools/call")?;

        if result.is_error {
            let message = result.text();
            return Err(ChannelError::Tool(if message.is_empty() {
                format!("tool '{name}' reported an error")
            } else {
                message
            }));
        }
        Ok(result.into())
    }
}

fn decode<T: serde::de::DeserializeOwned>(value: Value, method: &str) -> Result<T, ChannelError> {
    serde_json::from_value(value)
        .map_err(|e| ChannelError::Protocol(format!("malformed {method} result: {e}")))
}

/// A live MCP server process and its protocol client
pub struct McpSession {
    client: McpClient<ChildStdin, BufReader<ChildStdout>>,
    child: Child,
}

#[async_trait]
impl ToolSession for McpSession {
    async fn list_tools(&mut self) -> Result<Vec<ToolDescriptor>, ChannelError> {
        self.client.list_tools().await
    }

    async fn call(&mut self, name: &str, args: &ToolArgs) -> Result<ToolOutput, ChannelError> {
        self.client.call_tool(name, args).await
    }

    async fn close(self: Box<Self>) {
        let Self { client, mut child } = *self;
        let server = client.transport.server_name().to_owned();
        // closing stdin asks the server to exit
        drop(client);

        match tokio::time::timeout(SHUTDOWN_TIMEOUT, child.wait()).await {
            Ok(Ok(status)) => tracing::debug!(server = %server, %status, "MCP server exited"),
            _ => {
                tracing::debug!(server = %server, "MCP server did not exit, killing it");
                let _ = child.kill().await;
            }
        }
    }
}
