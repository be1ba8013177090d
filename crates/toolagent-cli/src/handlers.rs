//! Outcome Handling
//!
//! Turns what the agent returned into something a person can read. Tool
//! results carrying a base64 `screenshot` are decoded and written to disk.

use std::path::{Path, PathBuf};

use base64::{Engine, engine::general_purpose::STANDARD};
use serde_json::Value;
use thiserror::Error;
use toolagent_core::{Outcome, ToolResult};

#[derive(Error, Debug)]
pub enum HandlerError {
    #[error("screenshot is not valid base64: {0}")]
    Decode(#[from] base64::DecodeError),

    #[error("failed to save screenshot: {0}")]
    Io(#[from] std::io::Error),
}

/// What was done with an outcome
#[derive(Debug, PartialEq)]
pub enum Handled {
    /// Plain answer from the model
    Answer(String),

    /// Screenshot decoded and written to the given path
    ImageSaved(PathBuf),

    /// Structured tool data
    Data(Value),

    /// Text returned by a tool
    Text(String),

    /// Failed or simulated result, or anything else we do not interpret
    Raw(Value),
}

impl std::fmt::Display for Handled {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Answer(text) => write!(f, "[answer] {text}"),
            Self::ImageSaved(path) => write!(f, "[screenshot saved] {}", path.display()),
            Self::Data(data) => write!(f, "[tool data] {data}"),
            Self::Text(text) => write!(f, "[tool output] {text}"),
            Self::Raw(value) => write!(f, "[tool result] {value}"),
        }
    }
}

/// Handle one agent outcome
pub fn handle_outcome(outcome: &Outcome, screenshot_path: &Path) -> Result<Handled, HandlerError> {
    let result = match outcome {
        Outcome::Answer(text) => return Ok(Handled::Answer(text.clone())),
        Outcome::Tool(result) => result,
    };

    let ToolResult::Output(output) = result else {
        return Ok(Handled::Raw(serde_json::to_value(result).unwrap_or(Value::Null)));
    };

    if let Some(encoded) = output.screenshot() {
        let bytes = STANDARD.decode(encoded.trim())?;
        std::fs::write(screenshot_path, bytes)?;
        tracing::info!(path = %screenshot_path.display(), "Saved screenshot");
        return Ok(Handled::ImageSaved(screenshot_path.to_path_buf()));
    }

    if let Some(data) = &output.data {
        return Ok(Handled::Data(data.clone()));
    }

    let text = output.text_content();
    if text.is_empty() {
        Ok(Handled::Raw(serde_json::to_value(output).unwrap_or(Value::Null)))
    } else {
        Ok(Handled::Text(text))
    }
}
