//! UI event types.
//!
//! Every input (terminal, agent, async I/O results) becomes a `UiEvent`
//! before the reducer sees it.

use std::path::PathBuf;
use std::sync::Arc;

use crossterm::event::Event as CrosstermEvent;
use quill_core::core::events::AgentEvent;
use tokio::sync::mpsc;

#[derive(Debug)]
pub enum UiEvent {
    /// Animation and delta-coalescing timer.
    Tick,

    /// Emitted once per loop iteration before other events, with the
    /// terminal size used for panel layout.
    Frame { width: u16, height: u16 },

    Terminal(CrosstermEvent),

    Agent(AgentEvent),

    /// Agent turn spawned; the reducer moves to `Waiting`.
    AgentSpawned { rx: mpsc::Receiver<Arc<AgentEvent>> },

    /// The turn's event channel closed after its last event.
    AgentFinished,

    /// Document written to disk.
    DocumentSaved { path: PathBuf, revision: u64 },

    DocumentSaveFailed { error: String },

    /// The OS opener failed for the document file.
    OpenFailed { error: String },
}
