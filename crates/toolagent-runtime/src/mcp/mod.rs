//! MCP tool channel.
//!
//! Speaks the Model Context Protocol to a server launched as a child
//! process, using line-delimited JSON-RPC over its stdio.

pub mod channel;
pub mod transport;
pub mod types;

pub use channel::{McpChannel, McpClient, McpServerConfig, McpSession};
pub use transport::JsonRpcTransport;
