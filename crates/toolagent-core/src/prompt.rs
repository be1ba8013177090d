//! Action Prompt
//!
//! Builds the prompt that asks the model to pick a tool or answer directly.
//! The output depends only on the catalog and the user input, so it can be
//! snapshot-tested.

use std::fmt::Write;

use crate::tool::ToolCatalog;

const INSTRUCTIONS: &str = r#"You are an assistant that decides whether a user request needs a tool.

If a tool is needed, reply with JSON only, in exactly this shape:
{"tool_name": "<tool name>", "tool_args": {<arguments matching the tool's parameters>}}

If no tool is needed, answer directly, still as JSON:
{"tool_name": null, "tool_args": {}, "answer": "<your answer>"}

Do not add any text outside the JSON object."#;

/// Build the decision prompt for `user_input` over `catalog`
pub fn action_prompt(catalog: &ToolCatalog, user_input: &str) -> String {
    let mut prompt = String::from(INSTRUCTIONS);

    prompt.push_str("\n\n## Available Tools\n\n");
    if catalog.is_empty() {
        prompt.push_str("(no tools are available; always answer directly)\n");
    }
    for tool in catalog.iter() {
        let _ = writeln!(prompt, "### {}", tool.name);
        let _ = writeln!(prompt, "description: {}", tool.description);
        let _ = writeln!(prompt, "params: {}", tool.param_schema);
        prompt.push('\n');
    }

    prompt.push_str("## Examples\n\n");
    let example_tool = catalog.names().first().copied().unwrap_or("open_browser");
    let _ = writeln!(prompt, "User input: do this with a tool");
    let _ = writeln!(prompt, "Output:");
    let _ = writeln!(prompt, r#"{{"tool_name": "{example_tool}", "tool_args": {{}}}}"#);
    prompt.push('\n');
    prompt.push_str("User input: What is the capital of France?\n");
    prompt.push_str("Output:\n");
    prompt.push_str(
        r#"{"tool_name": null, "tool_args": {}, "answer": "The capital of France is Paris."}"#,
    );
    prompt.push_str("\n\n");

    let _ = write!(prompt, "User input: {user_input}\nOutput:\n");
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::ToolDescriptor;
    use serde_json::json;

    fn desktop_catalog() -> ToolCatalog {
        vec![
            ToolDescriptor::new(
                "Launch-Tool",
                "Launch an application from the start menu",
                json!({
                    "type": "object",
                    "properties": {"name": {"type": "string"}},
                    "required": ["name"]
                }),
            ),
            ToolDescriptor::new(
                "Scrape-Tool",
                "Fetch a web page and return its text",
                json!({"type": "object", "properties": {"url": {"type": "string"}}}),
            ),
            ToolDescriptor::new("State-Tool", "Capture the desktop state", json!({})),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_prompt_lists_every_tool() {
        let catalog = desktop_catalog();
        let prompt = action_prompt(&catalog, "open chrome");

        for tool in catalog.iter() {
            assert!(prompt.contains(&tool.name), "missing {}", tool.name);
            assert!(prompt.contains(&tool.description));
        }
        assert!(prompt.contains(r#""required":["name"]"#));
    }

    #[test]
    fn test_prompt_is_deterministic() {
        let first = action_prompt(&desktop_catalog(), "open chrome");
        let second = action_prompt(&desktop_catalog(), "open chrome");
        assert_eq!(first, second);
    }

    #[test]
    fn test_prompt_contains_both_output_shapes() {
        let prompt = action_prompt(&desktop_catalog(), "hello");
        assert!(prompt.contains(r#"{"tool_name": "Launch-Tool", "tool_args": {}}"#));
        assert!(prompt.contains(r#""tool_name": null, "tool_args": {}, "answer": "#));
    }

    #[test]
    fn test_user_input_comes_last() {
        let prompt = action_prompt(&desktop_catalog(), "take a screenshot");
        assert!(prompt.trim_end().ends_with("User input: take a screenshot\nOutput:"));
    }

    #[test]
    fn test_empty_catalog_still_has_examples() {
        let prompt = action_prompt(&ToolCatalog::new(), "hi");
        assert!(prompt.contains("no tools are available"));
        assert!(prompt.contains(r#""tool_name": "open_browser""#));
    }
}
