//! Conversation history exchanged with the model.
//!
//! The history is provider-neutral; the chat client maps it onto its own
//! wire format right before sending.

use serde_json::Value;

use crate::core::events::ToolOutput;

/// A tool invocation requested by the assistant.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    /// Parsed arguments. Unparseable arguments are kept as
    /// `{"unparsed_arguments": "<raw>"}` so the call can still be echoed back.
    pub arguments: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChatMessage {
    User(String),
    Assistant {
        text: String,
        tool_calls: Vec<ToolCall>,
    },
    /// Answer to one tool call, carrying the JSON envelope as text.
    ToolResult { call_id: String, content: String },
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        ChatMessage::User(text.into())
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        ChatMessage::Assistant {
            text: text.into(),
            tool_calls: Vec::new(),
        }
    }

    pub fn tool_result(call_id: impl Into<String>, output: &ToolOutput) -> Self {
        ChatMessage::ToolResult {
            call_id: call_id.into(),
            content: output.to_json_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_tool_result_carries_envelope() {
        let output = ToolOutput::success(json!({"revision": 2}));
        let message = ChatMessage::tool_result("call_1", &output);
        let ChatMessage::ToolResult { call_id, content } = message else {
            panic!("expected a tool result");
        };
        assert_eq!(call_id, "call_1");
        let value: Value = serde_json::from_str(&content).unwrap();
        assert_eq!(value, json!({"ok": true, "data": {"revision": 2}}));
    }
}
