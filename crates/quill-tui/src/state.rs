//! Application state.
//!
//! ```text
//! AppState
//! ├── input: InputState           (prompt editing, history)
//! ├── transcript: TranscriptState (cells, scroll)
//! ├── agent_state: AgentState     (idle, waiting, streaming)
//! ├── messages: Vec<ChatMessage>  (conversation sent to the model)
//! ├── document: SharedDocument    (shared with the agent's tools)
//! ├── artifact + panel            (what the document panel shows)
//! └── config
//! ```

use std::cell::Cell;
use std::path::PathBuf;
use std::sync::Arc;

use quill_core::config::Config;
use quill_core::conversation::ChatMessage;
use quill_core::core::events::AgentEvent;
use quill_core::document::SharedDocument;
use ratatui::layout::Rect;
use tokio::sync::mpsc;

use crate::artifact::{
    Artifact, ArtifactPanelController, ArtifactRegistry, PanelBag, PanelContainer, PanelInfo,
};
use crate::input::InputState;
use crate::transcript::{CellId, TranscriptState};

/// Agent execution state.
#[derive(Debug, Default)]
pub enum AgentState {
    #[default]
    Idle,
    /// Turn spawned, nothing received yet.
    Waiting {
        rx: mpsc::Receiver<Arc<AgentEvent>>,
    },
    Streaming {
        rx: mpsc::Receiver<Arc<AgentEvent>>,
        /// Cell receiving assistant text (or the latest tool cell).
        cell_id: CellId,
        /// Text buffered until the next tick.
        pending_delta: String,
    },
}

impl AgentState {
    pub fn is_running(&self) -> bool {
        !matches!(self, Self::Idle)
    }

    /// Points streaming at `cell_id`, leaving `Waiting` if needed.
    pub fn start_streaming(&mut self, cell_id: CellId) {
        match std::mem::take(self) {
            Self::Waiting { rx } => {
                *self = Self::Streaming {
                    rx,
                    cell_id,
                    pending_delta: String::new(),
                };
            }
            Self::Streaming {
                rx, pending_delta, ..
            } => {
                *self = Self::Streaming {
                    rx,
                    cell_id,
                    pending_delta,
                };
            }
            Self::Idle => {}
        }
    }

    pub fn receiver_mut(&mut self) -> Option<&mut mpsc::Receiver<Arc<AgentEvent>>> {
        match self {
            Self::Waiting { rx } | Self::Streaming { rx, .. } => Some(rx),
            Self::Idle => None,
        }
    }
}

/// Open/closed state of the document side panel plus its body scroll.
#[derive(Debug, Default)]
pub struct SidePanelState {
    open: bool,
    pub scroll: u16,
}

impl PanelBag for SidePanelState {
    fn is_open(&self) -> bool {
        self.open
    }

    fn request_open(&mut self, open: bool) {
        if self.open != open {
            tracing::debug!(open, "document panel state changed");
        }
        self.open = open;
    }
}

/// Token totals reported by the provider for this session.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct UsageTotals {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

pub struct AppState {
    pub should_quit: bool,
    pub config: Config,
    pub input: InputState,
    pub transcript: TranscriptState,
    pub agent_state: AgentState,
    pub messages: Vec<ChatMessage>,
    pub document: SharedDocument,
    pub document_path: PathBuf,
    /// Appended to the generated system prompt on every request.
    pub extra_instructions: Option<String>,
    pub artifact: Artifact,
    pub controller: ArtifactPanelController,
    pub side_panel: SidePanelState,
    pub spinner_frame: usize,
    pub usage: UsageTotals,
    /// Terminal size from the latest `Frame` event.
    pub terminal_size: (u16, u16),
    /// Revision last written to disk.
    pub saved_revision: Option<u64>,
    /// Summary row of the panel (set during render, used for mouse clicks).
    pub panel_summary_area: Cell<Rect>,
    /// Panel body area (set during render, used for wheel scrolling).
    pub panel_body_area: Cell<Rect>,
}

impl AppState {
    pub fn new(
        config: Config,
        document: SharedDocument,
        document_path: PathBuf,
        extra_instructions: Option<String>,
    ) -> Self {
        let artifact = Artifact::from_document(&document.snapshot());
        let controller =
            ArtifactPanelController::new(ArtifactRegistry::with_builtins(), config.ui.renderer);
        let saved_revision = Some(document.revision());

        Self {
            should_quit: false,
            config,
            input: InputState::new(),
            transcript: TranscriptState::new(),
            agent_state: AgentState::Idle,
            messages: Vec::new(),
            document,
            document_path,
            extra_instructions,
            artifact,
            controller,
            side_panel: SidePanelState::default(),
            spinner_frame: 0,
            usage: UsageTotals::default(),
            terminal_size: (0, 0),
            saved_revision,
            panel_summary_area: Cell::new(Rect::default()),
            panel_body_area: Cell::new(Rect::default()),
        }
    }

    /// Side panel geometry for a terminal of the given size.
    pub fn panel_container(&self, width: u16, height: u16) -> Option<PanelContainer> {
        PanelContainer::for_terminal(width, height, &self.config.ui)
    }

    /// Read-only panel snapshot for rendering at `width` x `height`.
    pub fn panel_info(&self, width: u16, height: u16) -> PanelInfo {
        match self.panel_container(width, height) {
            Some(container) if container.width > 0 && container.height > 0 => PanelInfo::Present {
                width: container.width,
                open: self.side_panel.is_open(),
            },
            _ => PanelInfo::Absent,
        }
    }

    /// Whether the document has changes not yet written to disk.
    pub fn is_dirty(&self) -> bool {
        self.saved_revision != Some(self.document.revision())
    }
}

#[cfg(test)]
mod tests {
    use quill_core::document::Document;

    use super::*;

    fn state() -> AppState {
        AppState::new(
            Config::default(),
            SharedDocument::new(Document::new("# Draft\n")),
            PathBuf::from("/tmp/quill-test.md"),
            None,
        )
    }

    #[test]
    fn test_new_state_builds_artifact_from_document() {
        let state = state();
        assert_eq!(state.artifact.title, "Draft");
        assert!(!state.is_dirty());
        assert!(!state.side_panel.is_open());
    }

    #[test]
    fn test_panel_info_depends_on_width() {
        let state = state();
        assert_eq!(state.panel_info(60, 30), PanelInfo::Absent);
        assert!(matches!(
            state.panel_info(200, 30),
            PanelInfo::Present { open: false, .. }
        ));
    }

    #[test]
    fn test_start_streaming_from_waiting() {
        let (_tx, rx) = mpsc::channel(1);
        let mut agent = AgentState::Waiting { rx };
        let cell = CellId::new();
        agent.start_streaming(cell);
        assert!(matches!(agent, AgentState::Streaming { cell_id, .. } if cell_id == cell));

        let mut idle = AgentState::Idle;
        idle.start_streaming(cell);
        assert!(!idle.is_running());
    }
}
