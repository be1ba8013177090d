//! Error Types

use std::time::Duration;

use thiserror::Error;

/// Result type alias for agent operations
pub type Result<T> = std::result::Result<T, AgentError>;

/// Agent error types
///
/// Only model-side and setup failures surface here. Everything that goes
/// wrong on the tool path is folded into a [`crate::tool::ToolResult`].
#[derive(Error, Debug)]
pub enum AgentError {
    /// Model invocation failed
    #[error("Model error: {0}")]
    Model(String),

    /// Model backend unavailable or not responding
    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    /// Model did not answer within the configured budget
    #[error("Model timed out after {0:?}")]
    ModelTimeout(Duration),

    /// Tool channel failure outside of a dispatched call (e.g. catalog discovery)
    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

}

impl AgentError {
    /// Check if error is retryable
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ModelUnavailable(_) | Self::ModelTimeout(_)
        )
    }

    /// Convert to a user-friendly message
    pub fn user_message(&self) -> String {
        match self {
            Self::Model(msg) => format!("The language model encountered an error: {msg}"),
            Self::ModelUnavailable(_) => {
                "The language model is currently unavailable. Please try again.".into()
            }
            Self::ModelTimeout(_) => "The language model took too long to answer.".into(),
            Self::Channel(e) => format!("The tool server could not be reached: {e}"),
            Self::Config(msg) => format!("Invalid configuration: {msg}"),
        }
    }
}

/// Failures reported by a tool-invocation channel
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChannelError {
    /// The backend ran the tool and reported a tool-level failure
    #[error("{0}")]
    Tool(String),

    /// The backend could not be started
    #[error("failed to spawn tool server '{name}': {reason}")]
    Spawn { name: String, reason: String },

    /// Reading from or writing to the backend failed
    #[error("transport error for tool server '{server}': {reason}")]
    Transport { server: String, reason: String },

    /// The backend answered with something we could not interpret
    #[error("protocol error: {0}")]
    Protocol(String),

    /// JSON-RPC error object returned by the backend
    #[error("server error [{code}]: {message}")]
    Rpc { code: i32, message: String },

    /// Channel closed or otherwise not usable
    #[error("channel unavailable: {0}")]
    Unavailable(String),
}

impl ChannelError {
    /// Whether the backend itself reported the failure (as opposed to plumbing)
    pub const fn is_tool_error(&self) -> bool {
        matches!(self, Self::Tool(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(AgentError::ModelUnavailable("down".into()).is_retryable());
        assert!(AgentError::ModelTimeout(Duration::from_secs(1)).is_retryable());
        assert!(!AgentError::Model("bad".into()).is_retryable());
        assert!(!AgentError::Config("x".into()).is_retryable());
    }

    #[test]
    fn test_tool_error_display_is_bare_message() {
        let err = ChannelError::Tool("window not found".into());
        assert_eq!(err.to_string(), "window not found");
        assert!(err.is_tool_error());
        assert!(!ChannelError::Protocol("x".into()).is_tool_error());
    }
}
