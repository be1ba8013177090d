//! Output Parsing
//!
//! Turns raw model text into an [`Action`]. Models often think out loud
//! inside `<think>` tags or wrap the JSON in prose, so parsing is two-tier:
//! strict first, then the outermost `{...}` span.

use std::sync::LazyLock;

use regex::Regex;

use crate::action::Action;

static THINK_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<think>.*?</think>").unwrap_or_else(|e| unreachable!("invalid regex: {e}"))
});

/// Parses model completions into actions
#[derive(Clone, Copy, Debug, Default)]
pub struct OutputParser;

impl OutputParser {
    pub const fn new() -> Self {
        Self
    }

    /// Parse `raw` into an action, or `None` if no action can be recovered
    pub fn parse(&self, raw: &str) -> Option<Action> {
        let cleaned = strip_reasoning(raw);

        if let Ok(action) = serde_json::from_str::<Action>(&cleaned) {
            return Some(action);
        }

        let Some(span) = json_span(&cleaned) else {
            tracing::warn!(output = %cleaned, "No JSON found in model output");
            return None;
        };

        match serde_json::from_str::<Action>(span) {
            Ok(action) => Some(action),
            Err(e) => {
                tracing::warn!(error = %e, output = %cleaned, "Failed to parse model output");
                None
            }
        }
    }
}

/// Remove every `<think>...</think>` region and trim the rest
pub fn strip_reasoning(raw: &str) -> String {
    THINK_BLOCK.replace_all(raw, "").trim().to_owned()
}

/// Span from the first `{` to the last `}`
fn json_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}
