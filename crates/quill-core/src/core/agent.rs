//! Agent turn: model requests, tool execution and the event stream the
//! frontends consume.
//!
//! Nothing here writes to stdout or stderr; everything a frontend shows
//! arrives as an `AgentEvent`.

use std::sync::Arc;

use anyhow::{Result, anyhow};
use futures_util::StreamExt;
use serde_json::{Value, json};
use tokio::sync::mpsc;

use crate::config::Config;
use crate::conversation::{ChatMessage, ToolCall};
use crate::core::events::{AgentEvent, ErrorKind, ToolOutput};
use crate::core::interrupt::{self, InterruptedError};
use crate::core::preview;
use crate::document::SharedDocument;
use crate::prompts;
use crate::providers::openai::{ChatClient, ChatSettings};
use crate::providers::{ProviderError, ProviderStream, StreamEvent};
use crate::tools::{ToolContext, ToolRegistry};

pub type AgentEventTx = mpsc::Sender<Arc<AgentEvent>>;
pub type AgentEventRx = mpsc::Receiver<Arc<AgentEvent>>;

pub const EVENT_CHANNEL_CAPACITY: usize = 128;

/// Rounds in a row whose tool calls all had unreadable arguments before the
/// turn gives up.
const MAX_MALFORMED_ROUNDS: usize = 3;
const CANCELED_MESSAGE: &str = "Interrupted by user";
const RAW_ARGUMENTS_LIMIT: usize = 500;

pub fn event_channel() -> (AgentEventTx, AgentEventRx) {
    mpsc::channel(EVENT_CHANNEL_CAPACITY)
}

#[derive(Debug, Clone)]
pub struct AgentOptions {
    pub document: SharedDocument,
    pub registry: ToolRegistry,
}

impl AgentOptions {
    pub fn new(document: SharedDocument) -> Self {
        Self {
            document,
            registry: ToolRegistry::builtins(),
        }
    }
}

/// Sending side of the event channel.
///
/// Text deltas go through `lossy`, which drops them when the consumer lags.
/// Everything else is awaited.
#[derive(Clone)]
struct Emitter {
    tx: AgentEventTx,
}

impl Emitter {
    fn lossy(&self, event: AgentEvent) {
        let _ = self.tx.try_send(Arc::new(event));
    }

    async fn send(&self, event: AgentEvent) {
        let _ = self.tx.send(Arc::new(event)).await;
    }

    /// Reports a turn-ending failure and hands the error back.
    async fn fail(&self, err: anyhow::Error) -> anyhow::Error {
        let event = match err.downcast_ref::<ProviderError>() {
            Some(provider) => AgentEvent::Error {
                kind: provider.kind.into(),
                message: provider.message.clone(),
                details: provider.details.clone(),
            },
            None => AgentEvent::Error {
                kind: ErrorKind::Internal,
                message: format!("{err:#}"),
                details: None,
            },
        };
        self.send(event).await;
        err
    }

    async fn interrupted(&self, partial: &str) -> anyhow::Error {
        self.send(AgentEvent::Interrupted {
            partial_content: (!partial.is_empty()).then(|| partial.to_string()),
        })
        .await;
        InterruptedError.into()
    }
}

/// A tool call as it streams in.
#[derive(Debug)]
struct PendingCall {
    slot: usize,
    id: String,
    name: String,
    arguments: String,
    /// Length of the last preview sent for this call.
    previewed: usize,
}

impl PendingCall {
    fn parse_arguments(&self) -> Result<Value, serde_json::Error> {
        if self.arguments.trim().is_empty() {
            Ok(json!({}))
        } else {
            serde_json::from_str(&self.arguments)
        }
    }
}

/// What the model produced in one request.
#[derive(Debug, Default)]
struct Round {
    text: String,
    calls: Vec<PendingCall>,
}

/// Runs one user turn: request, run the requested tools, and repeat until
/// the model answers without tool calls.
///
/// The system prompt is rendered from the current document before every
/// request, with `extra_instructions` appended.
///
/// # Errors
/// Provider failures, interruption (`InterruptedError`) and repeated
/// malformed tool calls. The matching event is sent first.
pub async fn run_turn(
    messages: Vec<ChatMessage>,
    config: &Config,
    options: &AgentOptions,
    extra_instructions: Option<&str>,
    tx: AgentEventTx,
) -> Result<(String, Vec<ChatMessage>)> {
    let events = Emitter { tx };
    events.send(AgentEvent::TurnStarted).await;

    let client = match ChatSettings::from_config(config) {
        Ok(settings) => ChatClient::new(settings),
        Err(err) => return Err(events.fail(err).await),
    };
    let ctx = ToolContext::new(options.document.clone(), config.tool_timeout());
    tracing::info!(
        model = client.model(),
        tools = options.registry.definitions().len(),
        "starting agent turn"
    );

    let mut history = messages;
    let mut malformed_rounds = 0;
    loop {
        if interrupt::is_interrupted() {
            return Err(events.interrupted("").await);
        }
        let system_prompt = match prompts::build_system_prompt(
            &config.language,
            &options.document.snapshot(),
            extra_instructions,
        ) {
            Ok(prompt) => prompt,
            Err(err) => return Err(events.fail(err).await),
        };

        let opened = tokio::select! {
            biased;
            () = interrupt::wait_for_interrupt() => return Err(events.interrupted("").await),
            opened = client.stream(&system_prompt, &history, options.registry.definitions()) => opened,
        };
        let stream = match opened {
            Ok(stream) => stream,
            Err(err) => return Err(events.fail(err.into()).await),
        };
        let round = consume_stream(stream, &events).await?;

        if round.calls.is_empty() {
            let text = round.text;
            if !text.is_empty() {
                events
                    .send(AgentEvent::AssistantCompleted { text: text.clone() })
                    .await;
                history.push(ChatMessage::assistant(text.clone()));
            }
            events
                .send(AgentEvent::TurnCompleted {
                    final_text: text.clone(),
                    messages: history.clone(),
                })
                .await;
            return Ok((text, history));
        }

        let executed = run_tool_round(round, &mut history, &options.registry, &ctx, &events).await?;
        if executed > 0 {
            malformed_rounds = 0;
            continue;
        }
        malformed_rounds += 1;
        if malformed_rounds >= MAX_MALFORMED_ROUNDS {
            let message = "Aborting after repeated malformed tool calls with invalid JSON input";
            events
                .send(AgentEvent::Error {
                    kind: ErrorKind::Parse,
                    message: message.to_string(),
                    details: Some(format!(
                        "{MAX_MALFORMED_ROUNDS} rounds in a row had no readable tool arguments"
                    )),
                })
                .await;
            return Err(anyhow!(message));
        }
    }
}

/// Reads one model reply, forwarding text and tool-call progress.
async fn consume_stream(mut stream: ProviderStream, events: &Emitter) -> Result<Round> {
    let mut round = Round::default();
    loop {
        let next = tokio::select! {
            biased;
            () = interrupt::wait_for_interrupt() => return Err(events.interrupted(&round.text).await),
            next = stream.next() => next,
        };
        let event = match next {
            None => return Ok(round),
            Some(Ok(event)) => event,
            Some(Err(err)) => return Err(events.fail(err.into()).await),
        };

        match event {
            StreamEvent::TextDelta(text) => {
                round.text.push_str(&text);
                events.lossy(AgentEvent::AssistantDelta { text });
            }
            StreamEvent::ToolCallStarted { slot, id, name } => {
                let name = name.to_ascii_lowercase();
                events
                    .send(AgentEvent::ToolRequested {
                        id: id.clone(),
                        name: name.clone(),
                    })
                    .await;
                round.calls.push(PendingCall {
                    slot,
                    id,
                    name,
                    arguments: String::new(),
                    previewed: 0,
                });
            }
            StreamEvent::ToolCallArguments { slot, fragment } => {
                let Some(call) = round.calls.iter_mut().find(|call| call.slot == slot) else {
                    tracing::warn!(slot, "arguments for a tool call that never started");
                    continue;
                };
                call.arguments.push_str(&fragment);
                if let Some(text) = preview::written_text(&call.name, &call.arguments)
                    && text.len() > call.previewed
                {
                    call.previewed = text.len();
                    events
                        .send(AgentEvent::ToolInputDelta {
                            id: call.id.clone(),
                            name: call.name.clone(),
                            delta: text,
                        })
                        .await;
                }
            }
            StreamEvent::Finished {
                finish_reason,
                usage,
            } => {
                tracing::debug!(%finish_reason, calls = round.calls.len(), "model reply finished");
                events
                    .send(AgentEvent::UsageUpdate {
                        input_tokens: usage.input_tokens,
                        output_tokens: usage.output_tokens,
                    })
                    .await;
                for call in &round.calls {
                    events
                        .send(AgentEvent::ToolInputCompleted {
                            id: call.id.clone(),
                            name: call.name.clone(),
                            input: call.parse_arguments().unwrap_or_else(|_| json!({})),
                        })
                        .await;
                }
            }
            StreamEvent::Failed { code, message } => {
                let err = ProviderError::api_error(&code, &message);
                return Err(events.fail(err.into()).await);
            }
        }
    }
}

/// Answers every tool call of a round, one after another in the order the
/// model asked for them, and records the exchange in `history`.
///
/// Returns how many calls had readable arguments.
async fn run_tool_round(
    round: Round,
    history: &mut Vec<ChatMessage>,
    registry: &ToolRegistry,
    ctx: &ToolContext,
    events: &Emitter,
) -> Result<usize> {
    if !round.text.is_empty() {
        events
            .send(AgentEvent::AssistantCompleted {
                text: round.text.clone(),
            })
            .await;
    }

    let revision_before = ctx.document.revision();
    let mut calls = Vec::with_capacity(round.calls.len());
    let mut results = Vec::with_capacity(round.calls.len());
    let mut readable = 0;
    let mut interrupted = false;

    for pending in round.calls {
        events
            .send(AgentEvent::ToolStarted {
                id: pending.id.clone(),
                name: pending.name.clone(),
            })
            .await;

        let (arguments, output) = match pending.parse_arguments() {
            Err(err) => {
                tracing::warn!(tool = %pending.name, error = %err, "unreadable tool arguments");
                let output = ToolOutput::failure(
                    "invalid_json",
                    format!("Failed to parse tool arguments: {err}"),
                )
                .with_details(clip(&pending.arguments, RAW_ARGUMENTS_LIMIT));
                (json!({ "unparsed_arguments": pending.arguments }), output)
            }
            Ok(arguments) => {
                readable += 1;
                let output = if interrupted {
                    ToolOutput::canceled(CANCELED_MESSAGE)
                } else {
                    tokio::select! {
                        biased;
                        () = interrupt::wait_for_interrupt() => {
                            interrupted = true;
                            ToolOutput::canceled(CANCELED_MESSAGE)
                        }
                        output = registry.execute(&pending.name, &arguments, ctx) => output,
                    }
                };
                (arguments, output)
            }
        };

        events
            .send(AgentEvent::ToolCompleted {
                id: pending.id.clone(),
                result: output.clone(),
            })
            .await;
        results.push(ChatMessage::tool_result(pending.id.clone(), &output));
        calls.push(ToolCall {
            id: pending.id,
            name: pending.name,
            arguments,
        });
    }

    history.push(ChatMessage::Assistant {
        text: round.text.clone(),
        tool_calls: calls,
    });
    history.extend(results);

    let document = ctx.document.snapshot();
    if document.revision() != revision_before {
        tracing::info!(
            revision = document.revision(),
            bytes = document.content().len(),
            "document updated"
        );
        events
            .send(AgentEvent::DocumentUpdated {
                content: document.content().to_string(),
                revision: document.revision(),
            })
            .await;
    }

    if interrupted {
        events
            .send(AgentEvent::TurnCompleted {
                final_text: round.text.clone(),
                messages: history.clone(),
            })
            .await;
        return Err(events.interrupted(&round.text).await);
    }
    Ok(readable)
}

/// Shortens `text` to at most `limit` bytes on a char boundary.
fn clip(text: &str, limit: usize) -> String {
    if text.len() <= limit {
        return text.to_string();
    }
    let cut = (0..=limit)
        .rev()
        .find(|&at| text.is_char_boundary(at))
        .unwrap_or(0);
    format!("{}... ({} bytes total)", &text[..cut], text.len())
}
