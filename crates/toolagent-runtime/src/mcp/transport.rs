//! Line-delimited JSON-RPC transport.
//!
//! One JSON object per line in each direction. Lines on the read side that
//! are not JSON-RPC (servers that log to stdout) are skipped.

use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use toolagent_core::ChannelError;

use super::types::{JsonRpcMessage, JsonRpcNotification, JsonRpcRequest, error_codes};

/// Bi-directional JSON-RPC transport over a writer/reader pair.
pub struct JsonRpcTransport<W, R> {
    server_name: String,
    writer: W,
    reader: R,
    next_id: u64,
}

impl<W, R> JsonRpcTransport<W, R>
where
    W: AsyncWrite + Unpin + Send,
    R: AsyncBufRead + Unpin + Send,
{
    pub fn new(server_name: &str, writer: W, reader: R) -> Self {
        Self {
            server_name: server_name.to_string(),
            writer,
            reader,
            next_id: 1,
        }
    }

    pub fn server_name(&self) -> &str {
        &self.server_name
    }

    /// Send a request and wait for the response with the matching id.
    pub async fn request(
        &mut self,
        method: &str,
        params: Option<Value>,
    ) -> Result<Value, ChannelError> {
        let id = self.next_id;
        self.next_id += 1;

        let line = serde_json::to_string(&JsonRpcRequest::new(id, method, params))
            .map_err(|e| self.transport_error(format!("failed to serialize request: {e}")))?;
        self.write_line(line).await?;

        let mut line_buf = String::new();
        loop {
            line_buf.clear();
            let bytes_read = self
                .reader
                .read_line(&mut line_buf)
                .await
                .map_err(|e| self.transport_error(format!("failed to read from server: {e}")))?;

            if bytes_read == 0 {
                let reason = "server output closed (process may have exited)";
                return Err(self.transport_error(reason.into()));
            }

            let trimmed = line_buf.trim();
            if trimmed.is_empty() {
                continue;
            }

            match serde_json::from_str::<JsonRpcMessage>(trimmed) {
                Ok(message) if message.answers(id) => return extract_result(message),
                Ok(message) => {
                    tracing::trace!(
                        server = %self.server_name,
                        method = message.method.as_deref().unwrap_or_default(),
                        "Skipping unrelated JSON-RPC message"
                    );
                }
                Err(_) => {
                    tracing::trace!(
                        server = %self.server_name,
                        line = trimmed,
                        "Skipping non JSON-RPC output"
                    );
                }
            }
        }
    }

    /// Send a notification (no response expected).
    pub async fn notify(
        &mut self,
        method: &str,
        params: Option<Value>,
    ) -> Result<(), ChannelError> {
        let line = serde_json::to_string(&JsonRpcNotification::new(method, params))
            .map_err(|e| self.transport_error(format!("failed to serialize notification: {e}")))?;
        self.write_line(line).await
    }

    async fn write_line(&mut self, mut line: String) -> Result<(), ChannelError> {
        line.push('\n');
        self.writer
            .write_all(line.as_bytes())
            .await
            .map_err(|e| self.transport_error(format!("failed to write to server: {e}")))?;
        self.writer
            .flush()
            .await
            .map_err(|e| self.transport_error(format!("failed to flush server input: {e}")))
    }

    fn transport_error(&self, reason: String) -> ChannelError {
        ChannelError::Transport {
            server: self.server_name.clone(),
            reason,
        }
    }
}

/// Extract the result of a response, converting JSON-RPC errors.
pub fn extract_result(message: JsonRpcMessage) -> Result<Value, ChannelError> {
    if let Some(err) = message.error {
        return Err(ChannelError::Rpc {
            code: err.code,
            message: err.message,
        });
    }

    message.result.ok_or(ChannelError::Rpc {
        code: error_codes::INTERNAL_ERROR,
        message: "response missing both result and error".into(),
    })
}
