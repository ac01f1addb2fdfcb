//! Pure view functions.
//!
//! Everything here takes `&AppState` and draws to a frame. The only writes
//! are the hit-test rectangles kept in `Cell`s for mouse routing.

use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Padding, Paragraph};
use unicode_width::UnicodeWidthStr;

use crate::artifact::{ArtifactView, PanelInfo, PanelSummary, inline_block_lines};
use crate::state::{AgentState, AppState};
use crate::transcript::{Style as TranscriptStyle, StyledLine};

/// Horizontal padding on each side of the transcript.
pub const TRANSCRIPT_MARGIN: u16 = 1;

const STATUS_HEIGHT: u16 = 1;
const MAX_INPUT_LINES: u16 = 6;
const SPINNER_FRAMES: &[&str] = &["◐", "◓", "◑", "◒"];

pub fn render(state: &AppState, frame: &mut Frame) {
    let area = frame.area();
    let info = state.panel_info(area.width, area.height);
    let chat_width = match info {
        PanelInfo::Present { width, .. } => {
            area.width.saturating_sub(width.min(area.width))
        }
        PanelInfo::Absent => area.width,
    };
    let transcript_width = usize::from(chat_width.saturating_sub(TRANSCRIPT_MARGIN * 2));
    let view = state
        .controller
        .view(&state.artifact, info, transcript_width);

    state.panel_summary_area.set(Rect::default());
    state.panel_body_area.set(Rect::default());

    match view {
        ArtifactView::Panel {
            summary,
            body: Some(body),
        } => {
            let [chat, panel] = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Length(chat_width), Constraint::Min(1)])
                .areas(area);
            render_chat(state, frame, chat, None, Vec::new());
            render_panel(state, frame, panel, &summary, body);
        }
        ArtifactView::Panel {
            summary,
            body: None,
        } => {
            // Closed panel: the chat keeps the full width under a summary row.
            render_chat(state, frame, area, Some(&summary), Vec::new());
        }
        ArtifactView::Inline { title, body } => {
            let block = inline_block_lines(&title, &body, transcript_width);
            render_chat(state, frame, area, None, block);
        }
    }
}

fn render_chat(
    state: &AppState,
    frame: &mut Frame,
    area: Rect,
    summary: Option<&PanelSummary>,
    trailing: Vec<StyledLine>,
) {
    let input_lines = u16::try_from(state.input.buffer.lines().len())
        .unwrap_or(MAX_INPUT_LINES)
        .clamp(1, MAX_INPUT_LINES);
    let summary_height = u16::from(summary.is_some());

    let [summary_area, transcript_area, input_area, status_area] = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(summary_height),
            Constraint::Min(1),
            Constraint::Length(input_lines + 2),
            Constraint::Length(STATUS_HEIGHT),
        ])
        .areas(area);

    if let Some(summary) = summary {
        render_summary(state, frame, summary_area, summary);
    }
    render_transcript(state, frame, transcript_area, trailing);
    render_input(state, frame, input_area);
    render_status_line(state, frame, status_area);
}

fn render_summary(state: &AppState, frame: &mut Frame, area: Rect, summary: &PanelSummary) {
    state.panel_summary_area.set(area);
    let line = convert_styled_line(summary.to_line());
    frame.render_widget(Paragraph::new(line), area);
}

fn render_transcript(state: &AppState, frame: &mut Frame, area: Rect, trailing: Vec<StyledLine>) {
    let inner = Rect {
        x: area.x + TRANSCRIPT_MARGIN.min(area.width),
        width: area.width.saturating_sub(TRANSCRIPT_MARGIN * 2),
        ..area
    };
    let width = usize::from(inner.width);
    let height = usize::from(inner.height);

    let mut lines = state.transcript.display_lines(width, state.spinner_frame);
    if !trailing.is_empty() {
        if !lines.is_empty() {
            lines.push(StyledLine::empty());
        }
        lines.extend(trailing);
    }

    let start = state.transcript.visible_start(lines.len(), height);
    let mut visible: Vec<Line<'static>> = lines
        .into_iter()
        .skip(start)
        .take(height)
        .map(convert_styled_line)
        .collect();

    // Bottom-align short transcripts.
    if visible.len() < height {
        let mut padded = vec![Line::default(); height - visible.len()];
        padded.append(&mut visible);
        visible = padded;
    }

    frame.render_widget(Paragraph::new(visible), inner);
}

fn render_panel(
    state: &AppState,
    frame: &mut Frame,
    area: Rect,
    summary: &PanelSummary,
    body: Vec<StyledLine>,
) {
    let [summary_area, body_area] = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(1)])
        .areas(area);
    render_summary(state, frame, summary_area, summary);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(convert_style(TranscriptStyle::ArtifactBorder))
        .padding(Padding::horizontal(1));
    let inner_height = block.inner(body_area).height;
    state.panel_body_area.set(body_area);

    let max_scroll = u16::try_from(body.len())
        .unwrap_or(u16::MAX)
        .saturating_sub(inner_height);
    let scroll = state.side_panel.scroll.min(max_scroll);

    let lines: Vec<Line<'static>> = body.into_iter().map(convert_styled_line).collect();
    frame.render_widget(
        Paragraph::new(lines).block(block).scroll((scroll, 0)),
        body_area,
    );
}

fn render_input(state: &AppState, frame: &mut Frame, area: Rect) {
    let border_color = if state.agent_state.is_running() {
        Color::DarkGray
    } else {
        Color::Cyan
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color));
    let inner = block.inner(area);

    let (row, _) = state.input.buffer.cursor();
    let visible_rows = usize::from(inner.height.max(1));
    let first_row = (row + 1).saturating_sub(visible_rows);

    let lines: Vec<Line<'static>> = state
        .input
        .buffer
        .lines()
        .iter()
        .skip(first_row)
        .take(visible_rows)
        .map(|l| Line::from(l.clone()))
        .collect();
    frame.render_widget(Paragraph::new(lines).block(block), area);

    let col = u16::try_from(state.input.buffer.cursor_display_col()).unwrap_or(u16::MAX);
    let cursor_row = u16::try_from(row - first_row).unwrap_or(0);
    frame.set_cursor_position((
        inner.x + col.min(inner.width.saturating_sub(1)),
        inner.y + cursor_row,
    ));
}

fn render_status_line(state: &AppState, frame: &mut Frame, area: Rect) {
    let dim = Style::default().fg(Color::DarkGray);
    let mut spans = Vec::new();

    match &state.agent_state {
        AgentState::Idle => {}
        AgentState::Waiting { .. } | AgentState::Streaming { .. } => {
            let spinner = SPINNER_FRAMES[state.spinner_frame % SPINNER_FRAMES.len()];
            spans.push(Span::styled(
                format!("{spinner} working "),
                Style::default().fg(Color::Cyan),
            ));
        }
    }

    let revision = state.document.revision();
    let saved = if state.is_dirty() { "unsaved" } else { "saved" };
    spans.push(Span::styled(
        format!(
            "{} · rev {revision} {saved}",
            state.config.model
        ),
        dim,
    ));
    if state.usage.input_tokens > 0 || state.usage.output_tokens > 0 {
        spans.push(Span::styled(
            format!(
                " · {}↑ {}↓",
                state.usage.input_tokens, state.usage.output_tokens
            ),
            dim,
        ));
    }

    let hint = if state.agent_state.is_running() {
        "Esc interrupt"
    } else {
        "Enter send · Ctrl+O panel · /help"
    };
    let used: usize = spans.iter().map(|s| s.content.width()).sum();
    let gap = usize::from(area.width).saturating_sub(used + hint.width());
    if gap > 0 {
        spans.push(Span::raw(" ".repeat(gap)));
        spans.push(Span::styled(hint, dim));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn convert_styled_line(line: StyledLine) -> Line<'static> {
    Line::from(
        line.spans
            .into_iter()
            .map(|s| Span::styled(s.text, convert_style(s.style)))
            .collect::<Vec<_>>(),
    )
}

fn convert_style(style: TranscriptStyle) -> Style {
    let base = Style::default();
    match style {
        TranscriptStyle::Plain => base,
        TranscriptStyle::UserPrefix => base.fg(Color::Green).add_modifier(Modifier::BOLD),
        TranscriptStyle::User => base.fg(Color::Green).add_modifier(Modifier::ITALIC),
        TranscriptStyle::Assistant => base.fg(Color::White),
        TranscriptStyle::StreamingCursor => base.fg(Color::Yellow).add_modifier(Modifier::SLOW_BLINK),
        TranscriptStyle::SystemPrefix => base.fg(Color::Magenta).add_modifier(Modifier::BOLD),
        TranscriptStyle::System | TranscriptStyle::Interrupted => {
            base.fg(Color::DarkGray).add_modifier(Modifier::DIM)
        }
        TranscriptStyle::ToolBracket => base.fg(Color::Yellow).add_modifier(Modifier::DIM),
        TranscriptStyle::ToolStatus => base.fg(Color::White).add_modifier(Modifier::BOLD),
        TranscriptStyle::ToolError => base.fg(Color::Red),
        TranscriptStyle::ToolRunning => base.fg(Color::Cyan),
        TranscriptStyle::ToolSuccess => base.fg(Color::Green).add_modifier(Modifier::BOLD),
        TranscriptStyle::ToolCancelled => base
            .fg(Color::Yellow)
            .add_modifier(Modifier::CROSSED_OUT | Modifier::BOLD),
        TranscriptStyle::ToolPreview => base.fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        TranscriptStyle::ArtifactBorder => base.fg(Color::Blue),
        TranscriptStyle::ArtifactTitle => base.fg(Color::White).add_modifier(Modifier::BOLD),
        TranscriptStyle::ArtifactIndicator => base.fg(Color::Blue).add_modifier(Modifier::BOLD),
        TranscriptStyle::ArtifactCaption | TranscriptStyle::CodeFence | TranscriptStyle::Rule => {
            base.fg(Color::DarkGray)
        }
        TranscriptStyle::CodeInline | TranscriptStyle::CodeBlock => base.fg(Color::Cyan),
        TranscriptStyle::Emphasis => base.add_modifier(Modifier::ITALIC),
        TranscriptStyle::Strong | TranscriptStyle::H2 => base.add_modifier(Modifier::BOLD),
        TranscriptStyle::H1 => base.add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
        TranscriptStyle::H3 => base.fg(Color::White).add_modifier(Modifier::ITALIC),
        TranscriptStyle::Link => base.fg(Color::Cyan).add_modifier(Modifier::UNDERLINED),
        TranscriptStyle::BlockQuote => base.fg(Color::Green).add_modifier(Modifier::ITALIC),
        TranscriptStyle::ListBullet | TranscriptStyle::ListNumber => base.fg(Color::Yellow),
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use quill_core::config::Config;
    use quill_core::document::{Document, SharedDocument};
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    use super::*;
    use crate::events::UiEvent;
    use crate::update::update;

    fn state() -> AppState {
        AppState::new(
            Config::default(),
            SharedDocument::new(Document::new("# Trip plan\n\n- pack bags\n")),
            PathBuf::from("/tmp/quill-render-test.md"),
            None,
        )
    }

    fn draw(state: &mut AppState, width: u16, height: u16) -> String {
        update(state, UiEvent::Frame { width, height });
        let mut terminal = Terminal::new(TestBackend::new(width, height)).expect("terminal");
        terminal
            .draw(|frame| render(state, frame))
            .expect("draw");
        let buffer = terminal.backend().buffer().clone();
        let mut out = String::new();
        for y in 0..height {
            for x in 0..width {
                out.push_str(buffer[(x, y)].symbol());
            }
            out.push('\n');
        }
        out
    }

    #[test]
    fn test_wide_terminal_shows_open_side_panel() {
        let mut state = state();
        let screen = draw(&mut state, 120, 24);
        assert!(screen.contains("▾ Trip plan · open"));
        assert!(screen.contains("• pack bags"));
        assert!(state.panel_body_area.get().width > 0);
    }

    #[test]
    fn test_closed_panel_shows_summary_only() {
        let mut state = state();
        draw(&mut state, 120, 24);
        update(
            &mut state,
            UiEvent::Terminal(crossterm::event::Event::Key(crossterm::event::KeyEvent::new(
                crossterm::event::KeyCode::Char('o'),
                crossterm::event::KeyModifiers::CONTROL,
            ))),
        );
        let screen = draw(&mut state, 120, 24);
        assert!(screen.contains("▸ Trip plan · closed"));
        assert!(!screen.contains("pack bags"));
        assert_eq!(state.panel_body_area.get().width, 0);
    }

    #[test]
    fn test_narrow_terminal_falls_back_inline() {
        let mut state = state();
        let screen = draw(&mut state, 60, 24);
        assert!(screen.contains("╭─ Trip plan "));
        assert!(screen.contains("pack bags"));
        assert_eq!(state.panel_summary_area.get(), Rect::default());
    }

    #[test]
    fn test_every_style_converts() {
        // Markdown headings must stand out from body text.
        assert_ne!(convert_style(TranscriptStyle::H1), convert_style(TranscriptStyle::Plain));
        assert_eq!(convert_style(TranscriptStyle::Plain), Style::default());
    }
}
