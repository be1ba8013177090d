//! Agent Facade
//!
//! One request, one pass: decide (prompt → model → parse), then act
//! (dispatch to a tool or fall back to a model answer). Nothing is carried
//! over between calls, so a single `Agent` can serve concurrent requests.

use std::sync::Arc;
use std::time::Duration;

use crate::action::Action;
use crate::dispatch::{ActionDispatcher, AnswerPolicy, DEFAULT_TOOL_TIMEOUT, Outcome};
use crate::error::{AgentError, Result};
use crate::parser::OutputParser;
use crate::prompt::action_prompt;
use crate::provider::{ModelInvoker, invoke_within};
use crate::tool::{ToolCatalog, ToolChannel, ToolExecutor};

/// Agent configuration
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AgentConfig {
    /// Budget for a single tool call before falling back to the model
    pub tool_timeout: Duration,

    /// Optional budget for each model call
    pub model_timeout: Option<Duration>,

    /// What to return for a no-tool decision
    pub answer_policy: AnswerPolicy,

    /// Log prompts and raw model output
    pub debug: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            tool_timeout: DEFAULT_TOOL_TIMEOUT,
            model_timeout: None,
            answer_policy: AnswerPolicy::default(),
            debug: false,
        }
    }
}

impl AgentConfig {
    /// Read `AGENT_TOOL_TIMEOUT_SECS`, `AGENT_MODEL_TIMEOUT_SECS`,
    /// `AGENT_ANSWER_POLICY` and `AGENT_DEBUG`, keeping defaults for unset ones.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(secs) = lookup("AGENT_TOOL_TIMEOUT_SECS") {
            config.tool_timeout = parse_secs("AGENT_TOOL_TIMEOUT_SECS", &secs)?;
        }
        if let Some(secs) = lookup("AGENT_MODEL_TIMEOUT_SECS") {
            config.model_timeout = Some(parse_secs("AGENT_MODEL_TIMEOUT_SECS", &secs)?);
        }
        if let Some(policy) = lookup("AGENT_ANSWER_POLICY") {
            config.answer_policy = policy
                .parse()
                .map_err(|e| AgentError::Config(format!("AGENT_ANSWER_POLICY: {e}")))?;
        }
        if let Some(debug) = lookup("AGENT_DEBUG") {
            config.debug = matches!(debug.trim(), "1" | "true" | "yes" | "on");
        }

        Ok(config)
    }
}

fn parse_secs(key: &str, value: &str) -> Result<Duration> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|secs| *secs > 0.0)
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
        .ok_or_else(|| {
            AgentError::Config(format!("{key} must be a positive number of seconds, got '{value}'"))
        })
}

/// The main Agent struct
pub struct Agent {
    model: Arc<dyn ModelInvoker>,
    catalog: Arc<ToolCatalog>,
    parser: OutputParser,
    dispatcher: ActionDispatcher,
    config: AgentConfig,
}

impl Agent {
    /// Create a new agent. Without a channel, tool calls are simulated.
    pub fn new(
        model: Arc<dyn ModelInvoker>,
        catalog: Arc<ToolCatalog>,
        channel: Option<Arc<dyn ToolChannel>>,
        config: AgentConfig,
    ) -> Self {
        let dispatcher = ActionDispatcher::new(ToolExecutor::new(channel), Arc::clone(&model))
            .with_tool_timeout(config.tool_timeout)
            .with_model_timeout(config.model_timeout)
            .with_answer_policy(config.answer_policy);

        Self {
            model,
            catalog,
            parser: OutputParser::new(),
            dispatcher,
            config,
        }
    }

    /// Create with default configuration
    pub fn with_defaults(
        model: Arc<dyn ModelInvoker>,
        catalog: Arc<ToolCatalog>,
        channel: Option<Arc<dyn ToolChannel>>,
    ) -> Self {
        Self::new(model, catalog, channel, AgentConfig::default())
    }

    /// Handle one user request end to end
    pub async fn run(&self, user_input: &str) -> Result<Outcome> {
        let action = self.decide_action(user_input).await?;
        self.act(action.as_ref(), user_input).await
    }

    /// Ask the model which action to take. `None` means its output could not
    /// be parsed.
    pub async fn decide_action(&self, user_input: &str) -> Result<Option<Action>> {
        let prompt = action_prompt(&self.catalog, user_input);
        if self.config.debug {
            tracing::debug!(%prompt, "Built action prompt");
        }

        let output = invoke_within(self.model.as_ref(), &prompt, self.config.model_timeout).await?;
        if self.config.debug {
            tracing::debug!(model = self.model.name(), %output, "Model output");
        }

        let action = self.parser.parse(&output);
        if let Some(tool) = action.as_ref().and_then(Action::selected_tool) {
            if !self.catalog.is_empty() && !self.catalog.contains(tool) {
                tracing::warn!(tool, "Model selected a tool that is not in the catalog");
            }
        }
        Ok(action)
    }

    /// Carry out `action` for `user_input`
    pub async fn act(&self, action: Option<&Action>, user_input: &str) -> Result<Outcome> {
        self.dispatcher.dispatch(action, user_input).await
    }

    /// Get the tool catalog
    pub fn catalog(&self) -> &ToolCatalog {
        &self.catalog
    }

    /// Get configuration
    pub const fn config(&self) -> &AgentConfig {
        &self.config
    }
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("model", &self.model.name())
            .field("tools", &self.catalog.len())
            .field("dispatcher", &self.dispatcher)
            .field("config", &self.config)
            .finish()
    }
}

/// Builder for Agent configuration
#[derive(Default)]
pub struct AgentBuilder {
    model: Option<Arc<dyn ModelInvoker>>,
    catalog: ToolCatalog,
    channel: Option<Arc<dyn ToolChannel>>,
    config: AgentConfig,
}

impl AgentBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn model(mut self, model: Arc<dyn ModelInvoker>) -> Self {
        self.model = Some(model);
        self
    }

    #[must_use]
    pub fn catalog(mut self, catalog: ToolCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    #[must_use]
    pub fn channel(mut self, channel: Arc<dyn ToolChannel>) -> Self {
        self.channel = Some(channel);
        self
    }

    /// Use `channel` for tool calls, with the catalog it advertises
    pub async fn discover_tools(mut self, channel: Arc<dyn ToolChannel>) -> Result<Self> {
        self.catalog = ToolCatalog::discover(channel.as_ref()).await?;
        self.channel = Some(channel);
        Ok(self)
    }

    #[must_use]
    pub fn config(mut self, config: AgentConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub const fn tool_timeout(mut self, timeout: Duration) -> Self {
        self.config.tool_timeout = timeout;
        self
    }

    #[must_use]
    pub const fn answer_policy(mut self, policy: AnswerPolicy) -> Self {
        self.config.answer_policy = policy;
        self
    }

    #[must_use]
    pub const fn debug(mut self, debug: bool) -> Self {
        self.config.debug = debug;
        self
    }

    pub fn build(self) -> Result<Agent> {
        let model = self
            .model
            .ok_or_else(|| AgentError::Config("Model is required".into()))?;

        Ok(Agent::new(model, Arc::new(self.catalog), self.channel, self.config))
    }
}
