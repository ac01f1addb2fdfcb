//! Update document tool.
//!
//! Replaces the whole document.

use serde::Deserialize;
use serde_json::{Value, json};

use super::{ToolContext, ToolDefinition, edit_failure, parse_input};
use crate::core::events::ToolOutput;
use crate::document::DocumentEdit;

/// Returns the tool definition for the update document tool.
pub fn definition() -> ToolDefinition {
    ToolDefinition {
        name: "update_document".to_string(),
        description: "Replace the entire markdown document with new content. Use this when you need to completely rewrite the document or make major changes.".to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "new_content": {
                    "type": "string",
                    "description": "The complete new markdown content for the document."
                }
            },
            "required": ["new_content"],
            "additionalProperties": false
        }),
    }
}

#[derive(Debug, Deserialize)]
struct UpdateDocumentInput {
    new_content: String,
}

/// Executes the update document tool and returns a structured envelope.
pub fn execute(input: &Value, ctx: &ToolContext) -> ToolOutput {
    let input: UpdateDocumentInput = match parse_input("update_document", input) {
        Ok(i) => i,
        Err(output) => return output,
    };

    match ctx.document.apply(&DocumentEdit::Replace {
        new_content: input.new_content,
    }) {
        Ok(outcome) => ToolOutput::success(json!({
            "revision": outcome.revision,
            "bytes": outcome.bytes,
        })),
        Err(err) => edit_failure(&err),
    }
}
