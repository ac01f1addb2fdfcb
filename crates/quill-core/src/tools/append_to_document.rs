//! Append to document tool.

use serde::Deserialize;
use serde_json::{Value, json};

use super::{ToolContext, ToolDefinition, edit_failure, parse_input};
use crate::core::events::ToolOutput;
use crate::document::DocumentEdit;

pub fn definition() -> ToolDefinition {
    ToolDefinition {
        name: "append_to_document".to_string(),
        description: "Append content to the end of the markdown document. Use this when adding new sections or content at the end.".to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "content_to_add": {
                    "type": "string",
                    "description": "The markdown content to append at the end."
                }
            },
            "required": ["content_to_add"],
            "additionalProperties": false
        }),
    }
}

#[derive(Debug, Deserialize)]
struct AppendInput {
    content_to_add: String,
}

pub fn execute(input: &Value, ctx: &ToolContext) -> ToolOutput {
    let input: AppendInput = match parse_input("append_to_document", input) {
        Ok(i) => i,
        Err(output) => return output,
    };

    match ctx.document.apply(&DocumentEdit::Append {
        content_to_add: input.content_to_add,
    }) {
        Ok(outcome) => ToolOutput::success(json!({
            "revision": outcome.revision,
            "bytes": outcome.bytes,
        })),
        Err(err) => edit_failure(&err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Document, SharedDocument};

    #[test]
    fn test_appends_after_blank_line() {
        let ctx = ToolContext::new(SharedDocument::new(Document::new("# A\n\n")), None);
        let output = execute(&json!({"content_to_add": "## B"}), &ctx);
        assert!(output.is_ok());
        assert_eq!(ctx.document.snapshot().content(), "# A\n\n## B");
    }

    #[test]
    fn test_empty_append_rejected() {
        let ctx = ToolContext::new(SharedDocument::new(Document::new("# A")), None);
        let output = execute(&json!({"content_to_add": ""}), &ctx);
        assert_eq!(output.error_summary().map(|(code, _)| code), Some("empty_content"));
        assert_eq!(ctx.document.revision(), 0);
    }
}
