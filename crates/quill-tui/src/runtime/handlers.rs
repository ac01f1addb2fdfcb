//! Effect handlers for the TUI runtime.
//!
//! These perform I/O and spawn tasks. They never mutate state directly; results
//! come back as `UiEvent`s.

use std::path::PathBuf;

use quill_core::core::agent::{self, AgentOptions};
use quill_core::core::interrupt;

use crate::events::UiEvent;
use crate::state::AppState;

/// Interrupts the running agent.
pub fn interrupt_agent(state: &AppState) {
    if state.agent_state.is_running() {
        interrupt::trigger_ctrl_c();
    }
}

/// Spawns an agent turn over the current conversation.
pub fn spawn_agent_turn(state: &AppState) -> UiEvent {
    let (agent_tx, agent_rx) = agent::event_channel();

    let messages = state.messages.clone();
    let config = state.config.clone();
    let options = AgentOptions::new(state.document.clone());
    let extra_instructions = state.extra_instructions.clone();

    // Completion and failure reach the UI as events; the channel closing
    // after them ends the turn.
    tokio::spawn(async move {
        if let Err(err) = agent::run_turn(
            messages,
            &config,
            &options,
            extra_instructions.as_deref(),
            agent_tx,
        )
        .await
        {
            tracing::debug!(error = %err, "agent turn ended with error");
        }
    });

    UiEvent::AgentSpawned { rx: agent_rx }
}

/// Writes the current document snapshot to `path`.
pub fn save_document(state: &AppState, path: PathBuf) -> UiEvent {
    let snapshot = state.document.snapshot();
    match snapshot.save(&path) {
        Ok(()) => {
            tracing::info!(path = %path.display(), revision = snapshot.revision(), "document saved");
            UiEvent::DocumentSaved {
                path,
                revision: snapshot.revision(),
            }
        }
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "document save failed");
            UiEvent::DocumentSaveFailed {
                error: format!("{err:#}"),
            }
        }
    }
}

/// Opens `path` with the system's default application.
pub fn open_document(path: &std::path::Path) -> Option<UiEvent> {
    match open::that(path) {
        Ok(()) => None,
        Err(err) => Some(UiEvent::OpenFailed {
            error: format!("Failed to open {}: {err}", path.display()),
        }),
    }
}
