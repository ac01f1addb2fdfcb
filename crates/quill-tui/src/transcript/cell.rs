use std::sync::atomic::{AtomicU64, Ordering};

use quill_core::core::events::ToolOutput;
use serde_json::Value;
use unicode_width::UnicodeWidthStr;

use super::style::{Style, StyledLine, StyledSpan};
use crate::common::{sanitize_for_display, truncate_with_ellipsis};
use crate::markdown::{WrapOptions, render_markdown, wrap_styled_spans};

static CELL_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

const SPINNER_FRAMES: &[&str] = &["◐", "◓", "◑", "◒"];

/// Lines of streamed tool input kept in the running preview.
const TOOL_PREVIEW_MAX_LINES: usize = 3;
const TOOL_ARG_MAX_WIDTH: usize = 48;

/// Stable address of a transcript cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellId(pub u64);

impl CellId {
    pub fn new() -> Self {
        Self(CELL_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for CellId {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolState {
    Running,
    Done,
    Error,
    Cancelled,
}

/// A logical block of the chat transcript.
#[derive(Debug, Clone, PartialEq)]
pub enum HistoryCell {
    User {
        id: CellId,
        content: String,
        is_interrupted: bool,
    },
    /// Assistant reply; `content` grows while `is_streaming`.
    Assistant {
        id: CellId,
        content: String,
        is_streaming: bool,
        is_interrupted: bool,
    },
    /// One document tool call.
    Tool {
        id: CellId,
        tool_use_id: String,
        name: String,
        input: Value,
        /// Text the model is still streaming into the tool's main argument.
        input_delta: Option<String>,
        state: ToolState,
        result: Option<ToolOutput>,
    },
    System {
        id: CellId,
        content: String,
    },
}

impl HistoryCell {
    pub fn id(&self) -> CellId {
        match self {
            Self::User { id, .. }
            | Self::Assistant { id, .. }
            | Self::Tool { id, .. }
            | Self::System { id, .. } => *id,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::User {
            id: CellId::new(),
            content: content.into(),
            is_interrupted: false,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::Assistant {
            id: CellId::new(),
            content: content.into(),
            is_streaming: false,
            is_interrupted: false,
        }
    }

    pub fn assistant_streaming(content: impl Into<String>) -> Self {
        Self::Assistant {
            id: CellId::new(),
            content: content.into(),
            is_streaming: true,
            is_interrupted: false,
        }
    }

    pub fn tool_running(
        tool_use_id: impl Into<String>,
        name: impl Into<String>,
        input: Value,
    ) -> Self {
        Self::Tool {
            id: CellId::new(),
            tool_use_id: tool_use_id.into(),
            name: name.into(),
            input,
            input_delta: None,
            state: ToolState::Running,
            result: None,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::System {
            id: CellId::new(),
            content: content.into(),
        }
    }

    pub fn append_assistant_delta(&mut self, delta: &str) {
        if let Self::Assistant { content, .. } = self {
            content.push_str(delta);
        }
    }

    /// Stops streaming; `text` replaces the accumulated content when given.
    pub fn finalize_assistant(&mut self, text: Option<&str>) {
        if let Self::Assistant {
            content,
            is_streaming,
            ..
        } = self
        {
            if let Some(text) = text {
                text.clone_into(content);
            }
            *is_streaming = false;
        }
    }

    /// Complete input arrived; the streamed preview is no longer needed.
    pub fn set_tool_input(&mut self, new_input: Value) {
        if let Self::Tool {
            input, input_delta, ..
        } = self
        {
            *input = new_input;
            *input_delta = None;
        }
    }

    pub fn set_tool_input_delta(&mut self, delta: String) {
        if let Self::Tool { input_delta, .. } = self {
            *input_delta = Some(delta);
        }
    }

    pub fn set_tool_result(&mut self, output: ToolOutput) {
        if let Self::Tool {
            state,
            result,
            input_delta,
            ..
        } = self
        {
            *state = match &output {
                ToolOutput::Canceled(_) => ToolState::Cancelled,
                out if out.is_ok() => ToolState::Done,
                _ => ToolState::Error,
            };
            *input_delta = None;
            *result = Some(output);
        }
    }

    /// Stops whatever is still in flight after a user interrupt.
    pub fn mark_cancelled(&mut self) {
        match self {
            Self::Tool { state, .. } if *state == ToolState::Running => {
                *state = ToolState::Cancelled;
            }
            Self::Assistant {
                is_streaming,
                is_interrupted,
                ..
            } if *is_streaming => {
                *is_streaming = false;
                *is_interrupted = true;
            }
            _ => {}
        }
    }

    /// Stops streaming after a provider error, without the interrupt marker.
    pub fn mark_errored(&mut self) {
        match self {
            Self::Tool { state, .. } if *state == ToolState::Running => {
                *state = ToolState::Error;
            }
            Self::Assistant { is_streaming, .. } => *is_streaming = false,
            _ => {}
        }
    }

    pub fn mark_request_interrupted(&mut self) {
        if let Self::User { is_interrupted, .. } = self {
            *is_interrupted = true;
        }
    }

    /// Renders this cell for the given width. `spinner_frame` advances the
    /// running-tool indicator.
    pub fn display_lines(&self, width: usize, spinner_frame: usize) -> Vec<StyledLine> {
        match self {
            Self::User {
                content,
                is_interrupted,
                ..
            } => {
                let opts = WrapOptions::with_prefix(
                    width,
                    vec![StyledSpan::new("│ ", Style::UserPrefix)],
                );
                let text = sanitize_for_display(content);
                let mut lines =
                    wrap_styled_spans(&[StyledSpan::new(text.as_ref(), Style::User)], &opts);
                if *is_interrupted && let Some(last) = lines.last_mut() {
                    last.spans
                        .push(StyledSpan::new(" (interrupted)", Style::Interrupted));
                }
                lines
            }
            Self::Assistant {
                content,
                is_streaming,
                is_interrupted,
                ..
            } => {
                let text = sanitize_for_display(content);
                let mut lines = if text.is_empty() {
                    vec![StyledLine::empty()]
                } else {
                    render_markdown(&text, width)
                };
                if let Some(last) = lines.last_mut() {
                    if *is_streaming {
                        last.spans.push(StyledSpan::new("▌", Style::StreamingCursor));
                    }
                    if *is_interrupted {
                        last.spans
                            .push(StyledSpan::new(" (interrupted)", Style::Interrupted));
                    }
                }
                lines
            }
            Self::Tool {
                name,
                input,
                input_delta,
                state,
                result,
                ..
            } => tool_lines(
                name,
                input,
                input_delta.as_deref(),
                *state,
                result.as_ref(),
                width,
                spinner_frame,
            ),
            Self::System { content, .. } => {
                let opts = WrapOptions {
                    width,
                    first_prefix: vec![StyledSpan::new("• ", Style::SystemPrefix)],
                    rest_prefix: vec![StyledSpan::new("  ", Style::Plain)],
                };
                let text = sanitize_for_display(content);
                wrap_styled_spans(&[StyledSpan::new(text.as_ref(), Style::System)], &opts)
            }
        }
    }
}

fn str_arg<'a>(input: &'a Value, key: &str) -> Option<&'a str> {
    input.get(key)?.as_str()
}

fn quoted(text: &str) -> String {
    let first = text.lines().next().unwrap_or_default();
    format!("\"{}\"", truncate_with_ellipsis(first, TOOL_ARG_MAX_WIDTH))
}

/// One-line description of a document tool call.
fn tool_display_text(name: &str, input: &Value) -> String {
    match name {
        "update_document" => str_arg(input, "new_content").map_or_else(
            || name.to_string(),
            |c| format!("{name} ({} chars)", c.chars().count()),
        ),
        "append_to_document" => str_arg(input, "content_to_add").map_or_else(
            || name.to_string(),
            |c| format!("{name} {}", quoted(c)),
        ),
        "replace_text" => match (str_arg(input, "old_text"), str_arg(input, "new_text")) {
            (Some(old), Some(new)) => format!("{name} {} → {}", quoted(old), quoted(new)),
            (Some(old), None) => format!("{name} {}", quoted(old)),
            _ => name.to_string(),
        },
        _ => name.to_string(),
    }
}

fn tool_result_text(result: &ToolOutput) -> Option<(String, Style)> {
    if let Some((code, message)) = result.error_summary() {
        return Some((format!("{code}: {message}"), Style::ToolError));
    }
    let data = result.data()?;
    let revision = data.get("revision").and_then(Value::as_u64)?;
    let detail = data
        .get("replacements")
        .and_then(Value::as_u64)
        .map(|n| format!(", {n} replaced"))
        .unwrap_or_default();
    Some((format!("revision {revision}{detail}"), Style::ToolStatus))
}

fn tool_lines(
    name: &str,
    input: &Value,
    input_delta: Option<&str>,
    state: ToolState,
    result: Option<&ToolOutput>,
    width: usize,
    spinner_frame: usize,
) -> Vec<StyledLine> {
    let (prefix, prefix_style, text_style, suffix) = match state {
        ToolState::Running => (
            format!("{} ", SPINNER_FRAMES[spinner_frame % SPINNER_FRAMES.len()]),
            Style::ToolRunning,
            Style::ToolStatus,
            None,
        ),
        ToolState::Done => ("✎ ".to_string(), Style::ToolSuccess, Style::ToolStatus, None),
        ToolState::Error => (
            "✎ ".to_string(),
            Style::ToolError,
            Style::ToolCancelled,
            Some(" (failed)"),
        ),
        ToolState::Cancelled => (
            "✎ ".to_string(),
            Style::ToolCancelled,
            Style::ToolCancelled,
            Some(" (interrupted)"),
        ),
    };

    let indent = " ".repeat(prefix.width());
    let opts = WrapOptions {
        width,
        first_prefix: vec![StyledSpan::new(prefix, prefix_style)],
        rest_prefix: vec![StyledSpan::new(indent.clone(), Style::Plain)],
    };
    let mut lines = wrap_styled_spans(
        &[StyledSpan::new(tool_display_text(name, input), text_style)],
        &opts,
    );
    if let Some(suffix) = suffix
        && let Some(last) = lines.last_mut()
    {
        last.spans.push(StyledSpan::new(suffix, Style::Interrupted));
    }

    let body_width = width.saturating_sub(indent.width() + 2).max(1);
    if state == ToolState::Running
        && let Some(delta) = input_delta.filter(|d| !d.trim().is_empty())
    {
        let delta = sanitize_for_display(delta);
        let tail: Vec<&str> = delta.lines().rev().take(TOOL_PREVIEW_MAX_LINES).collect();
        for line in tail.into_iter().rev() {
            lines.push(StyledLine {
                spans: vec![
                    StyledSpan::new(format!("{indent}┊ "), Style::ToolBracket),
                    StyledSpan::new(truncate_with_ellipsis(line, body_width), Style::ToolPreview),
                ],
            });
        }
    }

    if let Some((text, style)) = result.and_then(tool_result_text) {
        lines.push(StyledLine {
            spans: vec![
                StyledSpan::new(format!("{indent}└ "), Style::ToolBracket),
                StyledSpan::new(truncate_with_ellipsis(&text, body_width), style),
            ],
        });
    }

    lines
}
