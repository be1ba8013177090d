//! Action Dispatch
//!
//! Routes a parsed action to the tool path or the answer path:
//!
//! ```text
//! DECIDE ──tool selected──▶ TOOL_PATH ──done──────────▶ DONE (Outcome::Tool)
//!    │                          │
//!    │                          └──timeout──┐
//!    └──no action / no tool────────────────▶ ANSWER_PATH ──▶ DONE (Outcome::Answer)
//! ```
//!
//! The tool timeout only stops local waiting. The backend may still carry
//! out the call after we have given up on it; nothing here can abort a
//! remote operation that is already in flight. The budget covers opening
//! the session and the call; closing the session afterwards is not counted.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::action::Action;
use crate::error::Result;
use crate::provider::{ModelInvoker, invoke_within};
use crate::tool::{ToolExecutor, ToolResult};

/// Default budget for a single tool call
pub const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(10);

/// What to return for a no-tool action
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerPolicy {
    /// Ask the model again with the original user input
    #[default]
    Reinvoke,

    /// Return the `answer` the model already produced, when there is one
    UseParsedAnswer,
}

impl std::str::FromStr for AnswerPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reinvoke" => Ok(Self::Reinvoke),
            "parsed" | "use_parsed_answer" => Ok(Self::UseParsedAnswer),
            other => Err(format!("unknown answer policy '{other}'")),
        }
    }
}

/// Final result of a dispatched request
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Outcome {
    /// The tool path completed (possibly with a failed or simulated result)
    Tool(ToolResult),

    /// Plain-language answer from the model
    Answer(String),
}

impl Outcome {
    pub fn as_answer(&self) -> Option<&str> {
        match self {
            Self::Answer(text) => Some(text.as_str()),
            Self::Tool(_) => None,
        }
    }

    pub const fn as_tool_result(&self) -> Option<&ToolResult> {
        match self {
            Self::Tool(result) => Some(result),
            Self::Answer(_) => None,
        }
    }
}

/// Applies the tool-or-answer decision with timeout fallback
#[derive(Clone)]
pub struct ActionDispatcher {
    executor: ToolExecutor,
    model: Arc<dyn ModelInvoker>,
    tool_timeout: Duration,
    model_timeout: Option<Duration>,
    answer_policy: AnswerPolicy,
}

impl ActionDispatcher {
    pub fn new(executor: ToolExecutor, model: Arc<dyn ModelInvoker>) -> Self {
        Self {
            executor,
            model,
            tool_timeout: DEFAULT_TOOL_TIMEOUT,
            model_timeout: None,
            answer_policy: AnswerPolicy::default(),
        }
    }

    #[must_use]
    pub const fn with_tool_timeout(mut self, timeout: Duration) -> Self {
        self.tool_timeout = timeout;
        self
    }

    #[must_use]
    pub const fn with_model_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.model_timeout = timeout;
        self
    }

    #[must_use]
    pub const fn with_answer_policy(mut self, policy: AnswerPolicy) -> Self {
        self.answer_policy = policy;
        self
    }

    pub const fn tool_timeout(&self) -> Duration {
        self.tool_timeout
    }

    /// Dispatch `action` for `user_input`
    ///
    /// Tool-level failures come back inside [`Outcome::Tool`]. The only
    /// error this returns is a failed model call on the answer path.
    pub async fn dispatch(&self, action: Option<&Action>, user_input: &str) -> Result<Outcome> {
        let Some(action) = action.filter(|a| a.wants_tool()) else {
            return self.answer(action, user_input).await;
        };

        match self.executor.execute_within(action, Some(self.tool_timeout)).await {
            Some(result) => Ok(Outcome::Tool(result)),
            None => {
                tracing::warn!(
                    tool = action.selected_tool().unwrap_or_default(),
                    timeout_secs = self.tool_timeout.as_secs_f64(),
                    "Tool call timed out, falling back to a model answer"
                );
                self.reinvoke(user_input).await
            }
        }
    }

    async fn answer(&self, action: Option<&Action>, user_input: &str) -> Result<Outcome> {
        if self.answer_policy == AnswerPolicy::UseParsedAnswer {
            if let Some(answer) = action.and_then(|a| a.answer.as_deref()) {
                return Ok(Outcome::Answer(answer.to_owned()));
            }
        }
        self.reinvoke(user_input).await
    }

    async fn reinvoke(&self, user_input: &str) -> Result<Outcome> {
        let text = invoke_within(self.model.as_ref(), user_input, self.model_timeout).await?;
        Ok(Outcome::Answer(text))
    }
}

impl std::fmt::Debug for ActionDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionDispatcher")
            .field("executor", &self.executor)
            .field("model", &self.model.name())
            .field("tool_timeout", &self.tool_timeout)
            .field("model_timeout", &self.model_timeout)
            .field("answer_policy", &self.answer_policy)
            .finish()
    }
}
