//! Streamed stdout/stderr rendering and the exec wrapper.
//!
//! Output contract:
//! - assistant text goes to stdout
//! - tool progress, document revisions and errors go to stderr

use std::collections::HashMap;
use std::io::{Stderr, Stdout, Write, stderr, stdout};
use std::time::Instant;

use anyhow::Result;
use quill_core::config::Config;
use quill_core::core::agent::{self, AgentEventRx, AgentOptions};
use quill_core::core::events::{AgentEvent, ToolOutput};
use quill_core::conversation::ChatMessage;
use quill_core::document::SharedDocument;
use tokio::task::JoinHandle;

/// Sends one request to the model and streams the reply to stdout.
///
/// Tool calls edit `document` in place; the caller decides whether to save.
/// Returns the final assistant text.
pub async fn run_exec(
    prompt: &str,
    config: &Config,
    document: &SharedDocument,
    extra_instructions: Option<&str>,
) -> Result<String> {
    let messages = vec![ChatMessage::user(prompt)];
    let options = AgentOptions::new(document.clone());

    let (agent_tx, agent_rx) = agent::event_channel();
    let renderer = spawn_exec_renderer_task(agent_rx);

    let result = agent::run_turn(messages, config, &options, extra_instructions, agent_tx).await;

    // The sender is gone once run_turn returns; wait for the last events to print.
    let _ = renderer.await;

    let (final_text, _messages) = result?;
    Ok(final_text)
}

/// Writes agent events to a pair of output streams.
pub struct ExecRenderer<O: Write, E: Write> {
    out: O,
    err: E,
    needs_final_newline: bool,
    tool_start_times: HashMap<String, Instant>,
}

impl ExecRenderer<Stdout, Stderr> {
    pub fn stdio() -> Self {
        Self::new(stdout(), stderr())
    }
}

impl<O: Write, E: Write> ExecRenderer<O, E> {
    pub fn new(out: O, err: E) -> Self {
        Self {
            out,
            err,
            needs_final_newline: false,
            tool_start_times: HashMap::new(),
        }
    }

    pub fn handle_event(&mut self, event: &AgentEvent) {
        match event {
            AgentEvent::AssistantDelta { text } => {
                if !text.is_empty() {
                    let _ = write!(self.out, "{text}");
                    let _ = self.out.flush();
                    self.needs_final_newline = true;
                }
            }
            AgentEvent::AssistantCompleted { text } => {
                if !text.is_empty() {
                    self.needs_final_newline = true;
                }
            }
            AgentEvent::ToolRequested { .. } => self.finish(),
            AgentEvent::ToolStarted { id, name } => {
                self.tool_start_times.insert(id.clone(), Instant::now());
                let _ = write!(self.err, "⚙ Running {name}...");
                let _ = self.err.flush();
            }
            AgentEvent::ToolCompleted { id, result } => {
                let duration = self
                    .tool_start_times
                    .remove(id)
                    .map(|start| format!(" ({:.2}s)", start.elapsed().as_secs_f64()))
                    .unwrap_or_default();
                match result {
                    ToolOutput::Success(_) => {
                        let _ = writeln!(self.err, " Done.{duration}");
                    }
                    ToolOutput::Failure(failure) => {
                        let _ = writeln!(self.err, " Failed: {}: {}", failure.code, failure.message);
                    }
                    ToolOutput::Canceled(message) => {
                        let _ = writeln!(self.err, " Canceled ({message})");
                    }
                }
            }
            AgentEvent::DocumentUpdated { revision, .. } => {
                let _ = writeln!(self.err, "Document updated (revision {revision})");
            }
            AgentEvent::Error {
                kind,
                message,
                details,
            } => {
                self.finish();
                let _ = writeln!(self.err, "Error [{kind}]: {message}");
                if let Some(details) = details {
                    let _ = writeln!(self.err, "  Details: {details}");
                }
            }
            AgentEvent::Interrupted { .. } => {
                self.finish();
                let _ = writeln!(self.err, "^C Interrupted.");
            }
            AgentEvent::TurnStarted
            | AgentEvent::ToolInputDelta { .. }
            | AgentEvent::ToolInputCompleted { .. }
            | AgentEvent::TurnCompleted { .. }
            | AgentEvent::UsageUpdate { .. } => {}
        }
    }

    /// Ends the current line of assistant output, if any.
    pub fn finish(&mut self) {
        if self.needs_final_newline {
            let _ = writeln!(self.out);
            let _ = self.out.flush();
            self.needs_final_newline = false;
        }
    }
}

/// Spawns a task rendering events until the channel closes.
pub fn spawn_exec_renderer_task(mut rx: AgentEventRx) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut renderer = ExecRenderer::stdio();
        while let Some(event) = rx.recv().await {
            renderer.handle_event(&event);
        }
        renderer.finish();
    })
}
