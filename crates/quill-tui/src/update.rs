//! TUI reducer.
//!
//! All state mutations happen here. The runtime calls `update(state, event)`
//! and executes the returned effects.

use crossterm::event::{
    Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use quill_core::conversation::ChatMessage;
use quill_core::core::events::AgentEvent;
use quill_core::document::{DEFAULT_MARKDOWN, Document};
use ratatui::layout::{Position, Rect};

use crate::artifact::{Artifact, PanelContext};
use crate::common::{COMMANDS, find_command};
use crate::effects::UiEffect;
use crate::events::UiEvent;
use crate::state::{AgentState, AppState};
use crate::transcript::{self, HistoryCell};

const MOUSE_SCROLL_LINES: usize = 3;
const PANEL_SCROLL_LINES: u16 = 3;
const PAGE_SCROLL_LINES: usize = 10;

pub fn update(state: &mut AppState, event: UiEvent) -> Vec<UiEffect> {
    match event {
        UiEvent::Tick => {
            state.spinner_frame = state.spinner_frame.wrapping_add(1);
            transcript::apply_pending_delta(&mut state.transcript, &mut state.agent_state);
            vec![]
        }
        UiEvent::Frame { width, height } => {
            handle_frame(state, width, height);
            vec![]
        }
        UiEvent::Terminal(event) => handle_terminal_event(state, event),
        UiEvent::Agent(event) => handle_agent_event(state, &event),
        UiEvent::AgentSpawned { rx } => {
            state.agent_state = AgentState::Waiting { rx };
            vec![]
        }
        UiEvent::AgentFinished => {
            transcript::finish_turn(&mut state.transcript, &mut state.agent_state);
            vec![]
        }
        UiEvent::DocumentSaved { path, revision } => {
            tracing::debug!(path = %path.display(), revision, "document saved");
            state.saved_revision = Some(revision);
            vec![]
        }
        UiEvent::DocumentSaveFailed { error } => {
            state
                .transcript
                .push_cell(HistoryCell::system(format!("Could not save document: {error}")));
            vec![]
        }
        UiEvent::OpenFailed { error } => {
            state
                .transcript
                .push_cell(HistoryCell::system(format!("Could not open document: {error}")));
            vec![]
        }
    }
}

/// Per-frame work: records the terminal size, flushes coalesced deltas and
/// lets the panel controller auto-open for a new artifact.
fn handle_frame(state: &mut AppState, width: u16, height: u16) {
    state.terminal_size = (width, height);
    transcript::apply_pending_delta(&mut state.transcript, &mut state.agent_state);

    let container = state.panel_container(width, height);
    let ctx = PanelContext::resolve(container, Some(&mut state.side_panel));
    state.controller.sync(&state.artifact, ctx);
}

/// Flips the side panel; reports when the terminal is too narrow for one.
fn toggle_panel(state: &mut AppState) {
    let (width, height) = state.terminal_size;
    let container = state.panel_container(width, height);
    let ctx = PanelContext::resolve(container, Some(&mut state.side_panel));
    if !state.controller.toggle(ctx) {
        state.transcript.push_cell(HistoryCell::system(
            "The terminal is too narrow for the side panel; the document is shown inline.",
        ));
    }
}

fn handle_agent_event(state: &mut AppState, event: &AgentEvent) -> Vec<UiEffect> {
    transcript::handle_agent_event(&mut state.transcript, &mut state.agent_state, event);

    match event {
        AgentEvent::DocumentUpdated { content, .. } => {
            let title = Document::new(content.as_str()).title();
            state.artifact = state.artifact.updated(title, content.as_str());
            state.side_panel.scroll = 0;
            vec![UiEffect::SaveDocument {
                path: state.document_path.clone(),
            }]
        }
        AgentEvent::TurnCompleted { messages, .. } => {
            state.messages.clone_from(messages);
            vec![]
        }
        AgentEvent::UsageUpdate {
            input_tokens,
            output_tokens,
        } => {
            state.usage.input_tokens += input_tokens;
            state.usage.output_tokens += output_tokens;
            vec![]
        }
        _ => vec![],
    }
}

fn handle_terminal_event(state: &mut AppState, event: Event) -> Vec<UiEffect> {
    match event {
        Event::Key(key) if key.kind != KeyEventKind::Release => handle_key(state, key),
        Event::Mouse(mouse) => handle_mouse(state, mouse),
        Event::Paste(text) => {
            state.input.buffer.insert_str(&text);
            vec![]
        }
        _ => vec![],
    }
}

fn handle_key(state: &mut AppState, key: KeyEvent) -> Vec<UiEffect> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    let alt = key.modifiers.contains(KeyModifiers::ALT);
    let shift = key.modifiers.contains(KeyModifiers::SHIFT);

    match key.code {
        KeyCode::Char('c') if ctrl => {
            if state.agent_state.is_running() {
                vec![UiEffect::InterruptAgent]
            } else if !state.input.buffer.is_empty() {
                state.input.buffer.clear();
                vec![]
            } else {
                quit(state)
            }
        }
        KeyCode::Char('d') if ctrl && state.input.buffer.is_empty() => quit(state),
        KeyCode::Esc if state.agent_state.is_running() => vec![UiEffect::InterruptAgent],
        KeyCode::Char('o') if ctrl => {
            toggle_panel(state);
            vec![]
        }
        KeyCode::Char('s') if ctrl => vec![UiEffect::SaveDocument {
            path: state.document_path.clone(),
        }],
        KeyCode::Enter if shift || alt => {
            state.input.buffer.insert_newline();
            vec![]
        }
        KeyCode::Enter => submit(state),
        KeyCode::Up if alt => {
            state.side_panel.scroll = state.side_panel.scroll.saturating_sub(1);
            vec![]
        }
        KeyCode::Down if alt => {
            state.side_panel.scroll = state.side_panel.scroll.saturating_add(1);
            vec![]
        }
        KeyCode::Up if state.input.should_navigate_up() => {
            state.input.navigate_up();
            vec![]
        }
        KeyCode::Down if state.input.should_navigate_down() => {
            state.input.navigate_down();
            vec![]
        }
        KeyCode::PageUp => {
            state.transcript.scroll_up(PAGE_SCROLL_LINES);
            vec![]
        }
        KeyCode::PageDown => {
            state.transcript.scroll_down(PAGE_SCROLL_LINES);
            vec![]
        }
        _ => {
            state.input.buffer.input(key);
            vec![]
        }
    }
}

/// Quits, saving first when the document has unsaved changes.
pub fn quit(state: &mut AppState) -> Vec<UiEffect> {
    state.should_quit = true;
    let mut effects = Vec::new();
    if state.is_dirty() {
        effects.push(UiEffect::SaveDocument {
            path: state.document_path.clone(),
        });
    }
    effects.push(UiEffect::Quit);
    effects
}

fn submit(state: &mut AppState) -> Vec<UiEffect> {
    let text = state.input.text();
    if text.trim_start().starts_with('/') {
        if let Some(command) = find_command(&text) {
            state.input.submit();
            return run_command(state, command.name);
        }
        state.input.buffer.clear();
        state.transcript.push_cell(HistoryCell::system(format!(
            "Unknown command: {}. Type /help for a list.",
            text.trim()
        )));
        return vec![];
    }

    if state.agent_state.is_running() {
        return vec![];
    }
    let Some(prompt) = state.input.submit() else {
        return vec![];
    };

    state.transcript.push_cell(HistoryCell::user(prompt.as_str()));
    state.transcript.scroll_to_bottom();
    state.messages.push(ChatMessage::user(prompt));
    vec![UiEffect::StartAgentTurn]
}

fn run_command(state: &mut AppState, name: &str) -> Vec<UiEffect> {
    match name {
        "panel" => {
            toggle_panel(state);
            vec![]
        }
        "reset" => {
            if state.agent_state.is_running() {
                state.transcript.push_cell(HistoryCell::system(
                    "Wait for the current turn to finish before resetting.",
                ));
                return vec![];
            }
            state.document.reset(DEFAULT_MARKDOWN);
            state.artifact = Artifact::from_document(&state.document.snapshot());
            state.side_panel.scroll = 0;
            state.messages.clear();
            state.transcript.clear();
            state
                .transcript
                .push_cell(HistoryCell::system("Started a new document."));
            vec![UiEffect::SaveDocument {
                path: state.document_path.clone(),
            }]
        }
        "save" => vec![UiEffect::SaveDocument {
            path: state.document_path.clone(),
        }],
        "open" => vec![UiEffect::OpenDocument {
            path: state.document_path.clone(),
        }],
        "help" => {
            let mut help = String::from("Commands:");
            for command in COMMANDS {
                help.push_str(&format!(
                    "\n  /{}  {}",
                    command.display_name(),
                    command.description
                ));
            }
            help.push_str(
                "\nKeys: Enter send, Shift+Enter newline, Ctrl+O panel, Ctrl+S save, \
                 Alt+Up/Down scroll document, Esc interrupt, Ctrl+C quit",
            );
            state.transcript.push_cell(HistoryCell::system(help));
            vec![]
        }
        "quit" => quit(state),
        _ => vec![],
    }
}

fn contains(area: Rect, column: u16, row: u16) -> bool {
    area.width > 0 && area.contains(Position::new(column, row))
}

fn handle_mouse(state: &mut AppState, mouse: MouseEvent) -> Vec<UiEffect> {
    let in_panel = contains(state.panel_body_area.get(), mouse.column, mouse.row);
    match mouse.kind {
        MouseEventKind::ScrollUp if in_panel => {
            state.side_panel.scroll = state
                .side_panel
                .scroll
                .saturating_sub(PANEL_SCROLL_LINES);
        }
        MouseEventKind::ScrollDown if in_panel => {
            state.side_panel.scroll = state
                .side_panel
                .scroll
                .saturating_add(PANEL_SCROLL_LINES);
        }
        MouseEventKind::ScrollUp => state.transcript.scroll_up(MOUSE_SCROLL_LINES),
        MouseEventKind::ScrollDown => state.transcript.scroll_down(MOUSE_SCROLL_LINES),
        MouseEventKind::Down(MouseButton::Left)
            if contains(state.panel_summary_area.get(), mouse.column, mouse.row) =>
        {
            toggle_panel(state);
        }
        _ => {}
    }
    vec![]
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use quill_core::config::Config;
    use quill_core::core::events::ErrorKind;
    use quill_core::document::SharedDocument;
    use tokio::sync::mpsc;

    use super::*;
    use crate::artifact::PanelBag;

    fn state() -> AppState {
        AppState::new(
            Config::default(),
            SharedDocument::new(Document::new("# Draft\n")),
            PathBuf::from("/tmp/quill-update-test.md"),
            None,
        )
    }

    fn key(code: KeyCode, modifiers: KeyModifiers) -> UiEvent {
        UiEvent::Terminal(Event::Key(KeyEvent::new(code, modifiers)))
    }

    fn type_text(state: &mut AppState, text: &str) {
        state.input.buffer.insert_str(text);
    }

    fn wide_frame() -> UiEvent {
        UiEvent::Frame {
            width: 200,
            height: 40,
        }
    }

    #[test]
    fn test_first_frame_auto_opens_panel_once() {
        let mut state = state();
        update(&mut state, wide_frame());
        assert!(state.side_panel.is_open());

        update(&mut state, key(KeyCode::Char('o'), KeyModifiers::CONTROL));
        assert!(!state.side_panel.is_open());

        update(&mut state, wide_frame());
        assert!(!state.side_panel.is_open());
    }

    #[test]
    fn test_narrow_frame_keeps_panel_closed_and_toggle_reports() {
        let mut state = state();
        update(
            &mut state,
            UiEvent::Frame {
                width: 60,
                height: 40,
            },
        );
        assert!(!state.side_panel.is_open());

        update(&mut state, key(KeyCode::Char('o'), KeyModifiers::CONTROL));
        assert!(!state.side_panel.is_open());
        assert!(matches!(
            state.transcript.cells().last(),
            Some(HistoryCell::System { .. })
        ));
    }

    #[test]
    fn test_document_update_keeps_artifact_identity_and_saves() {
        let mut state = state();
        let id = state.artifact.id;

        let effects = update(
            &mut state,
            UiEvent::Agent(AgentEvent::DocumentUpdated {
                content: "# Plan\n\nSteps".to_string(),
                revision: 1,
            }),
        );
        assert_eq!(state.artifact.id, id);
        assert_eq!(state.artifact.title, "Plan");
        assert_eq!(state.artifact.content(), "# Plan\n\nSteps");
        assert_eq!(
            effects,
            vec![UiEffect::SaveDocument {
                path: state.document_path.clone()
            }]
        );
    }

    #[test]
    fn test_enter_submits_prompt_and_starts_turn() {
        let mut state = state();
        type_text(&mut state, "add a section");
        let effects = update(&mut state, key(KeyCode::Enter, KeyModifiers::NONE));

        assert_eq!(effects, vec![UiEffect::StartAgentTurn]);
        assert_eq!(state.messages.len(), 1);
        assert!(state.input.buffer.is_empty());
        assert!(matches!(
            state.transcript.cells().last(),
            Some(HistoryCell::User { content, .. }) if content == "add a section"
        ));
    }

    #[test]
    fn test_enter_while_running_keeps_input() {
        let mut state = state();
        let (_tx, rx) = mpsc::channel(1);
        update(&mut state, UiEvent::AgentSpawned { rx });
        type_text(&mut state, "next");

        let effects = update(&mut state, key(KeyCode::Enter, KeyModifiers::NONE));
        assert!(effects.is_empty());
        assert_eq!(state.input.text(), "next");
    }

    #[test]
    fn test_shift_enter_inserts_newline() {
        let mut state = state();
        type_text(&mut state, "a");
        update(&mut state, key(KeyCode::Enter, KeyModifiers::SHIFT));
        assert_eq!(state.input.buffer.lines().len(), 2);
    }

    #[test]
    fn test_ctrl_c_interrupts_running_agent() {
        let mut state = state();
        let (_tx, rx) = mpsc::channel(1);
        update(&mut state, UiEvent::AgentSpawned { rx });
        let effects = update(&mut state, key(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert_eq!(effects, vec![UiEffect::InterruptAgent]);
        assert!(!state.should_quit);
    }

    #[test]
    fn test_ctrl_c_on_empty_input_quits() {
        let mut state = state();
        let effects = update(&mut state, key(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert_eq!(effects, vec![UiEffect::Quit]);
        assert!(state.should_quit);
    }

    #[test]
    fn test_panel_command_toggles() {
        let mut state = state();
        update(&mut state, wide_frame());
        type_text(&mut state, "/panel");
        update(&mut state, key(KeyCode::Enter, KeyModifiers::NONE));
        assert!(!state.side_panel.is_open());
        assert!(state.input.buffer.is_empty());
    }

    #[test]
    fn test_reset_command_starts_new_artifact() {
        let mut state = state();
        update(&mut state, wide_frame());
        update(&mut state, key(KeyCode::Char('o'), KeyModifiers::CONTROL));
        let old_id = state.artifact.id;
        state.messages.push(ChatMessage::user("hi"));

        type_text(&mut state, "/reset");
        let effects = update(&mut state, key(KeyCode::Enter, KeyModifiers::NONE));
        assert_ne!(state.artifact.id, old_id);
        assert!(state.messages.is_empty());
        assert_eq!(state.document.snapshot().content(), DEFAULT_MARKDOWN);
        assert!(matches!(effects.as_slice(), [UiEffect::SaveDocument { .. }]));

        // New identity: the next frame auto-opens the panel again.
        update(&mut state, wide_frame());
        assert!(state.side_panel.is_open());
    }

    #[test]
    fn test_unknown_command_is_reported() {
        let mut state = state();
        type_text(&mut state, "/bogus");
        let effects = update(&mut state, key(KeyCode::Enter, KeyModifiers::NONE));
        assert!(effects.is_empty());
        assert!(state.messages.is_empty());
        assert!(matches!(
            state.transcript.cells().last(),
            Some(HistoryCell::System { content, .. }) if content.contains("/bogus")
        ));
    }

    #[test]
    fn test_turn_completed_replaces_messages() {
        let mut state = state();
        let messages = vec![ChatMessage::user("a"), ChatMessage::assistant("b")];
        update(
            &mut state,
            UiEvent::Agent(AgentEvent::TurnCompleted {
                final_text: "b".to_string(),
                messages: messages.clone(),
            }),
        );
        assert_eq!(state.messages.len(), messages.len());
    }

    #[test]
    fn test_turn_keeps_applying_edits_after_an_error_event() {
        let mut state = state();
        let (_tx, rx) = mpsc::channel(1);
        update(&mut state, UiEvent::AgentSpawned { rx });

        update(
            &mut state,
            UiEvent::Agent(AgentEvent::Error {
                kind: ErrorKind::Parse,
                message: "Invalid tool input".to_string(),
                details: None,
            }),
        );
        let effects = update(
            &mut state,
            UiEvent::Agent(AgentEvent::DocumentUpdated {
                content: "# Kept\n".to_string(),
                revision: 1,
            }),
        );

        assert_eq!(state.artifact.content(), "# Kept\n");
        assert!(matches!(effects.as_slice(), [UiEffect::SaveDocument { .. }]));
        assert!(state.agent_state.is_running());

        update(&mut state, UiEvent::AgentFinished);
        assert!(!state.agent_state.is_running());
    }

    #[test]
    fn test_click_on_summary_row_toggles_panel() {
        let mut state = state();
        update(&mut state, wide_frame());
        state.panel_summary_area.set(Rect::new(110, 0, 90, 1));

        update(
            &mut state,
            UiEvent::Terminal(Event::Mouse(MouseEvent {
                kind: MouseEventKind::Down(MouseButton::Left),
                column: 120,
                row: 0,
                modifiers: KeyModifiers::NONE,
            })),
        );
        assert!(!state.side_panel.is_open());
    }

    #[test]
    fn test_saved_event_clears_dirty_flag() {
        let mut state = state();
        state.document.reset("# Changed");
        assert!(state.is_dirty());
        let event = UiEvent::DocumentSaved {
            path: state.document_path.clone(),
            revision: state.document.revision(),
        };
        update(&mut state, event);
        assert!(!state.is_dirty());
    }
}
