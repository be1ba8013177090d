//! Actions
//!
//! The structured decision extracted from model output. Wire shape:
//!
//! ```json
//! {"tool_name": "open_browser", "tool_args": {"url": "https://example.com"}}
//! {"tool_name": null, "tool_args": {}, "answer": "Paris is the capital of France."}
//! ```

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Arguments passed to a tool
pub type ToolArgs = Map<String, Value>;

/// A tool call or a direct answer, as decided by the model
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Action {
    /// Tool to call; `None` means no tool is needed
    #[serde(default)]
    pub tool_name: Option<String>,

    /// Arguments for the tool (always present, possibly empty; `null` reads as empty)
    #[serde(default, deserialize_with = "null_as_empty")]
    pub tool_args: ToolArgs,

    /// Free-form answer for a no-tool decision
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
}

impl Action {
    /// Action that calls `name` with `args`
    pub fn tool(name: impl Into<String>, args: ToolArgs) -> Self {
        Self {
            tool_name: Some(name.into()),
            tool_args: args,
            answer: None,
        }
    }

    /// No-tool action carrying an answer
    pub fn answer(text: impl Into<String>) -> Self {
        Self {
            tool_name: None,
            tool_args: ToolArgs::new(),
            answer: Some(text.into()),
        }
    }

    /// Name of the selected tool. An empty name selects nothing.
    pub fn selected_tool(&self) -> Option<&str> {
        self.tool_name.as_deref().filter(|name| !name.is_empty())
    }

    /// Whether this action routes to the tool path
    pub fn wants_tool(&self) -> bool {
        self.selected_tool().is_some()
    }
}

fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<ToolArgs, D::Error> {
    Option::<ToolArgs>::deserialize(deserializer).map(Option::unwrap_or_default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_missing_fields_default() {
        let action: Action = serde_json::from_value(json!({"tool_name": "X"})).unwrap();
        assert_eq!(action.selected_tool(), Some("X"));
        assert!(action.tool_args.is_empty());
        assert!(action.answer.is_none());
    }

    #[test]
    fn test_empty_tool_name_selects_nothing() {
        let action: Action =
            serde_json::from_value(json!({"tool_name": "", "tool_args": {}})).unwrap();
        assert!(!action.wants_tool());
    }

    #[test]
    fn test_null_tool_args_read_as_empty() {
        let action: Action =
            serde_json::from_value(json!({"tool_name": null, "tool_args": null, "answer": "hi"}))
                .unwrap();
        assert_eq!(action, Action::answer("hi"));

        let bad = serde_json::from_value::<Action>(json!({"tool_name": "X", "tool_args": [1]}));
        assert!(bad.is_err());
    }

    #[test]
    fn test_answer_constructor() {
        let action = Action::answer("hi");
        assert!(!action.wants_tool());
        assert_eq!(action.answer.as_deref(), Some("hi"));
    }
}
