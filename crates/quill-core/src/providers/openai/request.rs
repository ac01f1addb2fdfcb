//! Request body of a streaming chat completion.

use serde::Serialize;
use serde_json::Value;

use super::ChatSettings;
use crate::conversation::ChatMessage;
use crate::tools::ToolDefinition;

#[derive(Debug, Serialize)]
pub(super) struct ChatRequest<'a> {
    model: &'a str,
    stream: bool,
    messages: Vec<WireMessage<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<WireTool<'a>>,
    max_tokens: u32,
    temperature: f64,
    stream_options: StreamOptions,
}

#[derive(Debug, Serialize)]
struct StreamOptions {
    include_usage: bool,
}

#[derive(Debug, Serialize)]
#[serde(tag = "role", rename_all = "lowercase")]
enum WireMessage<'a> {
    System {
        content: &'a str,
    },
    User {
        content: &'a str,
    },
    Assistant {
        #[serde(skip_serializing_if = "Option::is_none")]
        content: Option<&'a str>,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        tool_calls: Vec<WireToolCall<'a>>,
    },
    Tool {
        tool_call_id: &'a str,
        content: &'a str,
    },
}

#[derive(Debug, Serialize)]
struct WireToolCall<'a> {
    id: &'a str,
    #[serde(rename = "type")]
    kind: &'static str,
    function: WireFunctionCall<'a>,
}

#[derive(Debug, Serialize)]
struct WireFunctionCall<'a> {
    name: &'a str,
    /// JSON-encoded arguments, as the API expects a string here.
    arguments: String,
}

#[derive(Debug, Serialize)]
struct WireTool<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    function: WireFunction<'a>,
}

#[derive(Debug, Serialize)]
struct WireFunction<'a> {
    name: &'a str,
    description: &'a str,
    parameters: &'a Value,
}

impl<'a> ChatRequest<'a> {
    pub(super) fn new(
        settings: &'a ChatSettings,
        system_prompt: &'a str,
        history: &'a [ChatMessage],
        tools: &'a [ToolDefinition],
    ) -> Self {
        let mut messages = Vec::with_capacity(history.len() + 1);
        if !system_prompt.trim().is_empty() {
            messages.push(WireMessage::System {
                content: system_prompt,
            });
        }
        messages.extend(history.iter().filter_map(wire_message));

        Self {
            model: &settings.model,
            stream: true,
            messages,
            tools: tools
                .iter()
                .map(|tool| WireTool {
                    kind: "function",
                    function: WireFunction {
                        name: &tool.name,
                        description: &tool.description,
                        parameters: &tool.input_schema,
                    },
                })
                .collect(),
            max_tokens: settings.max_tokens,
            temperature: settings.temperature,
            stream_options: StreamOptions {
                include_usage: true,
            },
        }
    }
}

fn wire_message(message: &ChatMessage) -> Option<WireMessage<'_>> {
    match message {
        ChatMessage::User(text) => Some(WireMessage::User { content: text }),
        ChatMessage::Assistant { text, tool_calls } => {
            if text.is_empty() && tool_calls.is_empty() {
                return None;
            }
            Some(WireMessage::Assistant {
                content: (!text.is_empty()).then_some(text.as_str()),
                tool_calls: tool_calls
                    .iter()
                    .map(|call| WireToolCall {
                        id: &call.id,
                        kind: "function",
                        function: WireFunctionCall {
                            name: &call.name,
                            arguments: call.arguments.to_string(),
                        },
                    })
                    .collect(),
            })
        }
        ChatMessage::ToolResult { call_id, content } => Some(WireMessage::Tool {
            tool_call_id: call_id,
            content,
        }),
    }
}
