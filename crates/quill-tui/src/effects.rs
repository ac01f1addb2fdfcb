//! Effects returned by the reducer for the runtime to execute.
//!
//! The reducer only mutates state; I/O and task spawning happen here.

use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEffect {
    Quit,

    /// Start an agent turn; the prompt is already in the message history.
    StartAgentTurn,

    InterruptAgent,

    /// Write the shared document to `path`.
    SaveDocument { path: PathBuf },

    /// Open the document file with the system default application.
    OpenDocument { path: PathBuf },
}
