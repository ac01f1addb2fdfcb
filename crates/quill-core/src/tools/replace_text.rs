//! Replace text tool.
//!
//! Replaces every occurrence of an exact string in the document.

use serde::Deserialize;
use serde_json::{Value, json};

use super::{ToolContext, ToolDefinition, edit_failure, parse_input};
use crate::core::events::ToolOutput;
use crate::document::DocumentEdit;

pub fn definition() -> ToolDefinition {
    ToolDefinition {
        name: "replace_text".to_string(),
        description: "Replace specific text in the document. Use this for targeted edits where you want to replace one piece of text with another. Every occurrence is replaced.".to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "old_text": {
                    "type": "string",
                    "description": "The exact text to find and replace."
                },
                "new_text": {
                    "type": "string",
                    "description": "The new text to replace it with."
                }
            },
            "required": ["old_text", "new_text"],
            "additionalProperties": false
        }),
    }
}

#[derive(Debug, Deserialize)]
struct ReplaceTextInput {
    old_text: String,
    new_text: String,
}

pub fn execute(input: &Value, ctx: &ToolContext) -> ToolOutput {
    let input: ReplaceTextInput = match parse_input("replace_text", input) {
        Ok(i) => i,
        Err(output) => return output,
    };

    match ctx.document.apply(&DocumentEdit::ReplaceText {
        old_text: input.old_text,
        new_text: input.new_text,
    }) {
        Ok(outcome) => ToolOutput::success(json!({
            "revision": outcome.revision,
            "replacements": outcome.replacements,
        })),
        Err(err) => edit_failure(&err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Document, SharedDocument};

    fn ctx(content: &str) -> ToolContext {
        ToolContext::new(SharedDocument::new(Document::new(content)), None)
    }

    #[test]
    fn test_reports_replacement_count() {
        let ctx = ctx("red, red, blue");
        let output = execute(&json!({"old_text": "red", "new_text": "green"}), &ctx);
        assert_eq!(
            output.data(),
            Some(&json!({"revision": 1, "replacements": 2}))
        );
        assert_eq!(ctx.document.snapshot().content(), "green, green, blue");
    }

    #[test]
    fn test_not_found_keeps_revision() {
        let ctx = ctx("red");
        let output = execute(&json!({"old_text": "blue", "new_text": "x"}), &ctx);
        let (code, message) = output.error_summary().unwrap();
        assert_eq!(code, "text_not_found");
        assert!(message.contains("blue"));
        assert_eq!(ctx.document.revision(), 0);
    }

    #[test]
    fn test_missing_new_text_is_invalid_input() {
        let ctx = ctx("red");
        let output = execute(&json!({"old_text": "red"}), &ctx);
        assert_eq!(output.error_summary().map(|(code, _)| code), Some("invalid_input"));
    }
}
