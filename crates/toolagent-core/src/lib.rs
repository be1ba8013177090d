//! # toolagent-core
//!
//! Decision-and-dispatch loop that turns a natural-language request into
//! either a tool call or a plain model answer.
//!
//! ## Architecture
//!
//! ```text
//! user input ─▶ action_prompt ─▶ ModelInvoker ─▶ OutputParser ─▶ ActionDispatcher
//!                   ▲                                               │        │
//!              ToolCatalog                               ToolExecutor    ModelInvoker
//!                                                        (ToolChannel)   (fallback)
//! ```
//!
//! The `ModelInvoker` and `ToolChannel` traits are the two seams: any model
//! backend and any tool backend can be plugged in without touching the
//! dispatch logic.

pub mod action;
pub mod agent;
pub mod dispatch;
pub mod error;
pub mod parser;
pub mod prompt;
pub mod provider;
pub mod tool;

#[cfg(test)]
pub(crate) mod testing;

pub use action::{Action, ToolArgs};
pub use agent::{Agent, AgentBuilder, AgentConfig};
pub use dispatch::{ActionDispatcher, AnswerPolicy, Outcome};
pub use error::{AgentError, ChannelError, Result};
pub use parser::OutputParser;
pub use prompt::action_prompt;
pub use provider::{FnInvoker, ModelInvoker};
pub use tool::{
    ToolCatalog, ToolChannel, ToolDescriptor, ToolExecutor, ToolOutput, ToolResult, ToolSession,
};
