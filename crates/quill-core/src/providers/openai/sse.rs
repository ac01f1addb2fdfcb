//! Chat Completions SSE decoding.

use std::collections::{BTreeSet, VecDeque};
use std::fmt::Display;

use bytes::Bytes;
use eventsource_stream::{EventStreamError, Eventsource};
use futures_util::stream::{self, BoxStream};
use futures_util::{Stream, StreamExt};
use serde::Deserialize;
use serde_json::Value;

use crate::providers::{ProviderError, ProviderErrorKind, ProviderStream, StreamEvent, Usage};

#[derive(Debug, Deserialize)]
struct Chunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
    usage: Option<ChunkUsage>,
    error: Option<ChunkError>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: ChunkDelta,
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ChunkDelta {
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<ToolCallDelta>,
}

#[derive(Debug, Deserialize)]
struct ToolCallDelta {
    #[serde(default)]
    index: usize,
    id: Option<String>,
    #[serde(default)]
    function: FunctionDelta,
}

#[derive(Debug, Default, Deserialize)]
struct FunctionDelta {
    name: Option<String>,
    arguments: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChunkUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}

#[derive(Debug, Deserialize)]
struct ChunkError {
    code: Option<Value>,
    #[serde(rename = "type")]
    kind: Option<String>,
    message: Option<String>,
}

type Queue = VecDeque<Result<StreamEvent, ProviderError>>;

/// Turns chunk payloads into `StreamEvent`s.
#[derive(Debug, Default)]
struct ChunkDecoder {
    opened_slots: BTreeSet<usize>,
    finish_reason: Option<String>,
    usage: Option<Usage>,
    done: bool,
}

impl ChunkDecoder {
    fn feed(&mut self, data: &str, out: &mut Queue) {
        let data = data.trim();
        if self.done || data.is_empty() || data == "[DONE]" {
            return;
        }

        let chunk: Chunk = match serde_json::from_str(data) {
            Ok(chunk) => chunk,
            Err(err) => {
                self.done = true;
                out.push_back(Err(ProviderError::parse(format!(
                    "Failed to parse SSE JSON: {err}"
                ))));
                return;
            }
        };

        if let Some(error) = chunk.error {
            self.done = true;
            let code = match error.code {
                Some(Value::String(code)) => code,
                Some(Value::Number(code)) => code.to_string(),
                _ => error.kind.unwrap_or_else(|| "error".to_string()),
            };
            out.push_back(Ok(StreamEvent::Failed {
                code,
                message: error.message.unwrap_or_else(|| "Unknown error".to_string()),
            }));
            return;
        }

        for choice in chunk.choices {
            if let Some(text) = choice.delta.content.filter(|text| !text.is_empty()) {
                out.push_back(Ok(StreamEvent::TextDelta(text)));
            }
            for call in choice.delta.tool_calls {
                let slot = call.index;
                if self.opened_slots.insert(slot) {
                    out.push_back(Ok(StreamEvent::ToolCallStarted {
                        slot,
                        id: call.id.unwrap_or_else(|| format!("call_{slot}")),
                        name: call.function.name.unwrap_or_default(),
                    }));
                }
                if let Some(fragment) = call.function.arguments.filter(|f| !f.is_empty()) {
                    out.push_back(Ok(StreamEvent::ToolCallArguments { slot, fragment }));
                }
            }
            if choice.finish_reason.is_some() {
                self.finish_reason = choice.finish_reason;
            }
        }

        if let Some(usage) = chunk.usage {
            self.usage = Some(Usage {
                input_tokens: usage.prompt_tokens,
                output_tokens: usage.completion_tokens,
            });
        }

        if self.finish_reason.is_some() && self.usage.is_some() {
            self.emit_finished(out);
        }
    }

    /// Called when the byte stream ends.
    fn finish(&mut self, out: &mut Queue) {
        if !self.done {
            self.emit_finished(out);
        }
    }

    fn emit_finished(&mut self, out: &mut Queue) {
        self.done = true;
        out.push_back(Ok(StreamEvent::Finished {
            finish_reason: self
                .finish_reason
                .take()
                .unwrap_or_else(|| "stop".to_string()),
            usage: self.usage.take().unwrap_or_default(),
        }));
    }
}

struct DecodeState<E> {
    events: BoxStream<'static, Result<eventsource_stream::Event, EventStreamError<E>>>,
    decoder: ChunkDecoder,
    queue: Queue,
    closed: bool,
}

fn stream_error<E: Display>(err: &EventStreamError<E>) -> ProviderError {
    match err {
        EventStreamError::Transport(err) => ProviderError::new(
            ProviderErrorKind::HttpStatus,
            format!("Response stream failed: {err}"),
        ),
        other => ProviderError::parse(format!("Malformed SSE stream: {other}")),
    }
}

/// Decodes a response body into provider events.
///
/// The stream ends after `Finished`, `Failed` or the first error.
pub(super) fn decode<S, E>(bytes: S) -> ProviderStream
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: Display + Send + 'static,
{
    // A last event without a blank line after it is otherwise never dispatched.
    let terminated = bytes.chain(stream::iter([Ok::<_, E>(Bytes::from_static(b"\n\n"))]));
    let state = DecodeState {
        events: terminated.eventsource().boxed(),
        decoder: ChunkDecoder::default(),
        queue: VecDeque::new(),
        closed: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(item) = state.queue.pop_front() {
                return Some((item, state));
            }
            if state.closed {
                return None;
            }
            match state.events.next().await {
                Some(Ok(event)) => state.decoder.feed(&event.data, &mut state.queue),
                Some(Err(err)) => {
                    state.closed = true;
                    state.queue.push_back(Err(stream_error(&err)));
                }
                None => {
                    state.closed = true;
                    state.decoder.finish(&mut state.queue);
                }
            }
            if state.decoder.done {
                state.closed = true;
            }
        }
    })
    .boxed()
}

#[cfg(test)]
mod tests {
    use std::convert::Infallible;

    use super::*;

    async fn collect(body: &'static str) -> Vec<Result<StreamEvent, ProviderError>> {
        let bytes = stream::iter([Ok::<_, Infallible>(Bytes::from_static(body.as_bytes()))]);
        decode(bytes).collect().await
    }

    async fn collect_ok(body: &'static str) -> Vec<StreamEvent> {
        collect(body)
            .await
            .into_iter()
            .map(|item| item.expect("stream item"))
            .collect()
    }

    #[tokio::test]
    async fn test_text_stream_with_usage() {
        let events = collect_ok(concat!(
            "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\",\"content\":\"\"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"lo\"},\"finish_reason\":\"stop\"}]}\n\n",
            "data: {\"choices\":[],\"usage\":{\"prompt_tokens\":12,\"completion_tokens\":2}}\n\n",
            "data: [DONE]\n\n",
        ))
        .await;

        assert_eq!(
            events,
            vec![
                StreamEvent::TextDelta("Hel".to_string()),
                StreamEvent::TextDelta("lo".to_string()),
                StreamEvent::Finished {
                    finish_reason: "stop".to_string(),
                    usage: Usage {
                        input_tokens: 12,
                        output_tokens: 2,
                    },
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_tool_call_fragments_keep_their_slot() {
        let events = collect_ok(concat!(
            "data: {\"choices\":[{\"delta\":{\"tool_calls\":[{\"index\":0,\"id\":\"call_a\",\"function\":{\"name\":\"replace_text\",\"arguments\":\"\"}}]}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"tool_calls\":[{\"index\":0,\"function\":{\"arguments\":\"{\\\"old_text\\\":\"}}]}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"tool_calls\":[{\"index\":1,\"function\":{\"name\":\"append_to_document\"}}]}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{},\"finish_reason\":\"tool_calls\"}]}\n\n",
            "data: [DONE]\n\n",
        ))
        .await;

        assert_eq!(
            events,
            vec![
                StreamEvent::ToolCallStarted {
                    slot: 0,
                    id: "call_a".to_string(),
                    name: "replace_text".to_string(),
                },
                StreamEvent::ToolCallArguments {
                    slot: 0,
                    fragment: "{\"old_text\":".to_string(),
                },
                StreamEvent::ToolCallStarted {
                    slot: 1,
                    id: "call_1".to_string(),
                    name: "append_to_document".to_string(),
                },
                StreamEvent::Finished {
                    finish_reason: "tool_calls".to_string(),
                    usage: Usage::default(),
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_error_chunk_ends_stream() {
        let events = collect_ok(concat!(
            "data: {\"choices\":[{\"delta\":{\"content\":\"Hi\"}}]}\n\n",
            "data: {\"error\":{\"message\":\"Rate limited\",\"type\":\"rate_limit_error\",\"code\":null}}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"ignored\"}}]}\n\n",
        ))
        .await;

        assert_eq!(
            events,
            vec![
                StreamEvent::TextDelta("Hi".to_string()),
                StreamEvent::Failed {
                    code: "rate_limit_error".to_string(),
                    message: "Rate limited".to_string(),
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_final_event_without_blank_line_is_delivered() {
        let events = collect_ok(
            "data: {\"choices\":[{\"delta\":{\"content\":\"end\"},\"finish_reason\":\"stop\"}]}",
        )
        .await;

        assert_eq!(events[0], StreamEvent::TextDelta("end".to_string()));
        assert!(matches!(
            &events[1],
            StreamEvent::Finished { finish_reason, .. } if finish_reason == "stop"
        ));
        assert_eq!(events.len(), 2);
    }

    #[tokio::test]
    async fn test_invalid_json_is_a_parse_error() {
        let items = collect("data: {not json\n\n").await;
        assert_eq!(items.len(), 1);
        let err = items[0].as_ref().unwrap_err();
        assert_eq!(err.kind, ProviderErrorKind::Parse);
        assert!(err.message.starts_with("Failed to parse SSE JSON"));
    }
}
