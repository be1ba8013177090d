//! Tool System
//!
//! Tools live behind an external invocation channel (an MCP server in
//! practice). The agent only sees:
//!
//! - a [`ToolCatalog`] enumerated once from the channel,
//! - a [`ToolChannel`] that opens a fresh [`ToolSession`] per call,
//! - the [`ToolExecutor`], which turns every failure into a [`ToolResult`].

use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::action::{Action, ToolArgs};
use crate::error::ChannelError;

/// Description of a tool as advertised by the backend
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// Unique tool identifier
    pub name: String,

    /// Human-readable description (shown to the model)
    #[serde(default)]
    pub description: String,

    /// JSON schema of the arguments; `{}` when the backend gives none
    #[serde(default = "empty_schema", alias = "inputSchema")]
    pub param_schema: Value,
}

fn empty_schema() -> Value {
    Value::Object(serde_json::Map::new())
}

impl ToolDescriptor {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        param_schema: Value,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            param_schema: if param_schema.is_null() { empty_schema() } else { param_schema },
        }
    }
}

/// Read-only mapping of tool name to descriptor
///
/// Ordered by name so that anything rendered from it is deterministic.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ToolCatalog {
    tools: BTreeMap<String, ToolDescriptor>,
}

impl ToolCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enumerate the tools offered by `channel` through a short-lived session
    pub async fn discover(channel: &dyn ToolChannel) -> Result<Self, ChannelError> {
        let mut session = channel.open().await?;
        let listed = session.list_tools().await;
        session.close().await;

        let catalog: Self = listed?.into_iter().collect();
        tracing::info!(
            channel = channel.name(),
            tools = catalog.len(),
            "Discovered tool catalog"
        );
        Ok(catalog)
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<&ToolDescriptor> {
        self.tools.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Descriptors in name order
    pub fn iter(&self) -> impl Iterator<Item = &ToolDescriptor> {
        self.tools.values()
    }

    /// Tool names in order
    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl FromIterator<ToolDescriptor> for ToolCatalog {
    fn from_iter<I: IntoIterator<Item = ToolDescriptor>>(iter: I) -> Self {
        let mut tools = BTreeMap::new();
        for descriptor in iter {
            if let Some(previous) = tools.insert(descriptor.name.clone(), descriptor) {
                tracing::warn!(tool = %previous.name, "Duplicate tool name, keeping the last one");
            }
        }
        Self { tools }
    }
}

/// Payload returned by a successful tool call
///
/// Opaque to the agent. `content` holds the backend's content blocks and
/// `data` its structured result, when it has one.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolOutput {
    #[serde(default)]
    pub content: Vec<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ToolOutput {
    /// Output consisting of structured data only
    pub const fn from_data(data: Value) -> Self {
        Self {
            content: Vec::new(),
            data: Some(data),
        }
    }

    /// Output consisting of a single text block
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![serde_json::json!({"type": "text", "text": text.into()})],
            data: None,
        }
    }

    /// Base64 image stored under `data.screenshot`, if any
    pub fn screenshot(&self) -> Option<&str> {
        self.data.as_ref()?.get("screenshot")?.as_str()
    }

    /// Concatenated text of all text content blocks
    pub fn text_content(&self) -> String {
        self.content
            .iter()
            .filter_map(|block| block.get("text").and_then(Value::as_str))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Result of dispatching an action to the tool path
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ToolResult {
    /// The call failed; the caller may fall back to a plain answer
    Failed { error: String, fallback: bool },

    /// No channel configured; echoes the requested arguments
    Simulated { tool_args: ToolArgs, simulated: bool },

    /// Payload from the backend
    Output(ToolOutput),
}

impl ToolResult {
    pub fn failed(error: impl Into<String>) -> Self {
        Self::Failed {
            error: error.into(),
            fallback: true,
        }
    }

    pub const fn simulated(tool_args: ToolArgs) -> Self {
        Self::Simulated {
            tool_args,
            simulated: true,
        }
    }

    pub const fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    pub const fn is_simulated(&self) -> bool {
        matches!(self, Self::Simulated { .. })
    }

    pub const fn output(&self) -> Option<&ToolOutput> {
        match self {
            Self::Output(output) => Some(output),
            _ => None,
        }
    }
}

/// A connection to the tool backend, valid for one unit of work
#[async_trait]
pub trait ToolSession: Send {
    /// Enumerate the backend's tools
    async fn list_tools(&mut self) -> Result<Vec<ToolDescriptor>, ChannelError>;

    /// Invoke `name` with `args`
    async fn call(&mut self, name: &str, args: &ToolArgs) -> Result<ToolOutput, ChannelError>;

    /// Release the session. Dropping a session without closing it must also
    /// release its resources.
    async fn close(self: Box<Self>);
}

/// Factory for tool sessions
///
/// Sessions are opened per call rather than held for the agent's lifetime,
/// so a broken call cannot poison the next one.
#[async_trait]
pub trait ToolChannel: Send + Sync {
    async fn open(&self) -> Result<Box<dyn ToolSession>, ChannelError>;

    /// Short label used in logs
    fn name(&self) -> &str {
        "tools"
    }
}

/// Executes actions against the configured channel, never failing outward
#[derive(Clone, Default)]
pub struct ToolExecutor {
    channel: Option<Arc<dyn ToolChannel>>,
}

impl ToolExecutor {
    pub fn new(channel: Option<Arc<dyn ToolChannel>>) -> Self {
        Self { channel }
    }

    pub fn has_channel(&self) -> bool {
        self.channel.is_some()
    }

    /// Execute the tool named by `action`
    ///
    /// Without a channel this returns a simulated result. Every channel
    /// failure, and any panic raised by the channel, comes back as
    /// [`ToolResult::Failed`].
    pub async fn execute(&self, action: &Action) -> ToolResult {
        self.execute_within(action, None)
            .await
            .unwrap_or_else(|| ToolResult::failed("tool call timed out"))
    }

    /// Like [`ToolExecutor::execute`], with opening the session and making
    /// the call bounded by `budget`. Returns `None` when the budget runs out.
    ///
    /// Releasing the session happens after the call and is not counted
    /// against the budget.
    pub async fn execute_within(
        &self,
        action: &Action,
        budget: Option<Duration>,
    ) -> Option<ToolResult> {
        let Some(channel) = self.channel.as_deref() else {
            tracing::warn!(
                tool = action.tool_name.as_deref().unwrap_or_default(),
                "No tool channel configured, returning simulated result"
            );
            return Some(ToolResult::simulated(action.tool_args.clone()));
        };

        let Some(tool_name) = action.selected_tool() else {
            return Some(ToolResult::failed("action does not name a tool"));
        };

        let start = Instant::now();
        let call = call_bounded(channel, tool_name, &action.tool_args, budget);
        let outcome = AssertUnwindSafe(call).catch_unwind().await;
        let duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

        let result = match outcome {
            Ok(None) => return None,
            Ok(Some(Ok(output))) => {
                tracing::info!(tool = tool_name, duration_ms, "Tool call succeeded");
                ToolResult::Output(output)
            }
            Ok(Some(Err(ChannelError::Tool(message)))) => {
                tracing::warn!(tool = tool_name, duration_ms, error = %message, "Tool call failed");
                ToolResult::failed(message)
            }
            Ok(Some(Err(e))) => {
                tracing::warn!(tool = tool_name, duration_ms, error = %e, "Tool channel error");
                ToolResult::failed(e.to_string())
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                tracing::error!(tool = tool_name, error = %message, "Tool channel panicked");
                ToolResult::failed(message)
            }
        };
        Some(result)
    }
}

impl std::fmt::Debug for ToolExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolExecutor")
            .field("channel", &self.channel.as_ref().map(|c| c.name().to_owned()))
            .finish()
    }
}

/// Open a session and call `name` within `budget`, then close the session.
/// `None` means the budget ran out; the session is dropped unclosed.
async fn call_bounded(
    channel: &dyn ToolChannel,
    name: &str,
    args: &ToolArgs,
    budget: Option<Duration>,
) -> Option<Result<ToolOutput, ChannelError>> {
    let open_and_call = async {
        let mut session = channel.open().await?;
        let result = session.call(name, args).await;
        Ok::<_, ChannelError>((session, result))
    };

    let called = match budget {
        Some(limit) => tokio::time::timeout(limit, open_and_call).await.ok()?,
        None => open_and_call.await,
    };

    Some(match called {
        Ok((session, result)) => {
            session.close().await;
            result
        }
        Err(e) => Err(e),
    })
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_owned())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "tool channel panicked".into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeChannel, FakeReply};
    use serde_json::json;

    fn args(value: Value) -> ToolArgs {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn test_catalog_is_ordered_and_deduplicated() {
        let catalog: ToolCatalog = vec![
            ToolDescriptor::new("zoom", "Zoom in", json!({})),
            ToolDescriptor::new("click", "Click", Value::Null),
            ToolDescriptor::new("zoom", "Zoom in again", json!({})),
        ]
        .into_iter()
        .collect();

        assert_eq!(catalog.names(), vec!["click", "zoom"]);
        assert_eq!(catalog.get("zoom").unwrap().description, "Zoom in again");
        assert_eq!(catalog.get("click").unwrap().param_schema, json!({}));
    }

    #[test]
    fn test_descriptor_accepts_mcp_field_names() {
        let descriptor: ToolDescriptor = serde_json::from_value(json!({
            "name": "Launch-Tool",
            "description": "Launch an application",
            "inputSchema": {"type": "object", "properties": {"name": {"type": "string"}}}
        }))
        .unwrap();
        assert_eq!(descriptor.param_schema["type"], "object");
    }

    #[test]
    fn test_result_wire_shapes() {
        assert_eq!(
            serde_json::to_value(ToolResult::failed("nope")).unwrap(),
            json!({"error": "nope", "fallback": true})
        );
        assert_eq!(
            serde_json::to_value(ToolResult::simulated(args(json!({"url": "x"})))).unwrap(),
            json!({"tool_args": {"url": "x"}, "simulated": true})
        );
    }

    #[test]
    fn test_screenshot_lookup() {
        let output = ToolOutput::from_data(json!({"screenshot": "aGVsbG8="}));
        assert_eq!(output.screenshot(), Some("aGVsbG8="));
        assert_eq!(ToolOutput::from_data(json!({"rows": 3})).screenshot(), None);
        assert_eq!(ToolOutput::text("done").text_content(), "done");
    }

    #[tokio::test]
    async fn test_execute_without_channel_simulates() {
        let executor = ToolExecutor::new(None);
        let action = Action::tool("open_browser", args(json!({"url": "https://github.com"})));

        let result = executor.execute(&action).await;
        assert_eq!(
            result,
            ToolResult::simulated(args(json!({"url": "https://github.com"})))
        );
    }

    #[tokio::test]
    async fn test_execute_returns_backend_output() {
        let channel = FakeChannel::new(FakeReply::Output(ToolOutput::text("launched")));
        let executor = ToolExecutor::new(Some(channel.clone()));

        let action = Action::tool("Launch-Tool", args(json!({"name": "chrome"})));
        let result = executor.execute(&action).await;
        assert_eq!(result, ToolResult::Output(ToolOutput::text("launched")));
        assert_eq!(channel.calls(), vec![("Launch-Tool".to_string(), action.tool_args)]);
    }

    #[tokio::test]
    async fn test_execute_maps_tool_error() {
        let channel =
            FakeChannel::new(FakeReply::Error(ChannelError::Tool("window not found".into())));
        let executor = ToolExecutor::new(Some(channel));

        let result = executor.execute(&Action::tool("Switch-Tool", ToolArgs::new())).await;
        assert_eq!(result, ToolResult::failed("window not found"));
    }

    #[tokio::test]
    async fn test_execute_maps_plumbing_errors() {
        let channel = FakeChannel::new(FakeReply::Error(ChannelError::Transport {
            server: "desktop".into(),
            reason: "stdout closed".into(),
        }));
        let executor = ToolExecutor::new(Some(channel));

        let result = executor.execute(&Action::tool("Click-Tool", ToolArgs::new())).await;
        assert!(matches!(
            result,
            ToolResult::Failed { ref error, fallback: true } if error.contains("stdout closed")
        ));
    }

    #[tokio::test]
    async fn test_execute_absorbs_open_failure() {
        let channel = FakeChannel::refusing(ChannelError::Spawn {
            name: "desktop".into(),
            reason: "no such file".into(),
        });
        let executor = ToolExecutor::new(Some(channel));

        let result = executor.execute(&Action::tool("Click-Tool", ToolArgs::new())).await;
        assert!(result.is_failure());
    }

    #[tokio::test]
    async fn test_execute_absorbs_panics() {
        let channel = FakeChannel::new(FakeReply::Panic("backend exploded"));
        let executor = ToolExecutor::new(Some(channel));

        let result = executor.execute(&Action::tool("Click-Tool", ToolArgs::new())).await;
        assert_eq!(result, ToolResult::failed("backend exploded"));
    }

    #[tokio::test]
    async fn test_session_released_on_every_path() {
        for reply in [
            FakeReply::Output(ToolOutput::default()),
            FakeReply::Error(ChannelError::Tool("bad".into())),
            FakeReply::Panic("boom"),
        ] {
            let channel = FakeChannel::new(reply);
            let executor = ToolExecutor::new(Some(channel.clone()));
            executor.execute(&Action::tool("t", ToolArgs::new())).await;

            assert_eq!(channel.opened(), 1);
            assert_eq!(channel.released(), 1);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_budget_excludes_session_close() {
        let reply = FakeReply::Slow(Duration::from_secs(3), ToolOutput::text("ok"));
        let channel = FakeChannel::new(reply).with_close_delay(Duration::from_secs(5));
        let executor = ToolExecutor::new(Some(channel.clone()));
        let action = Action::tool("Launch-Tool", ToolArgs::new());

        let result = executor.execute_within(&action, Some(Duration::from_secs(4))).await;
        assert_eq!(result, Some(ToolResult::Output(ToolOutput::text("ok"))));
        assert_eq!(channel.closed(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_budget_exhausted_drops_session() {
        let channel = FakeChannel::new(FakeReply::Hang);
        let executor = ToolExecutor::new(Some(channel.clone()));
        let action = Action::tool("Launch-Tool", ToolArgs::new());

        let result = executor.execute_within(&action, Some(Duration::from_secs(1))).await;
        assert_eq!(result, None);
        assert_eq!(channel.closed(), 0);
        assert_eq!(channel.released(), 1);
    }

    #[tokio::test]
    async fn test_discover_builds_catalog() {
        let channel = FakeChannel::new(FakeReply::Output(ToolOutput::default())).with_tools(vec![
            ToolDescriptor::new("Launch-Tool", "Launch an application", json!({})),
            ToolDescriptor::new("Click-Tool", "Click at coordinates", json!({})),
        ]);

        let catalog = ToolCatalog::discover(channel.as_ref()).await.unwrap();
        assert_eq!(catalog.names(), vec!["Click-Tool", "Launch-Tool"]);
        assert_eq!(channel.released(), 1);
    }
}
