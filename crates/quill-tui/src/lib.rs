//! Full-screen chat TUI with a live document panel.

pub mod artifact;
pub mod common;
pub mod effects;
pub mod events;
pub mod input;
pub mod markdown;
pub mod render;
pub mod runtime;
pub mod state;
pub mod terminal;
pub mod transcript;
pub mod update;

use std::io::{IsTerminal, Write, stderr};
use std::path::PathBuf;

use anyhow::Result;
use quill_core::config::Config;
use quill_core::document::SharedDocument;
pub use runtime::TuiRuntime;

use crate::transcript::HistoryCell;

/// Runs the interactive chat loop over `document`, saved at `document_path`.
///
/// # Errors
/// Returns an error if stderr is not a terminal or terminal I/O fails.
pub async fn run_interactive_chat(
    config: &Config,
    document: SharedDocument,
    document_path: PathBuf,
    extra_instructions: Option<String>,
) -> Result<()> {
    if !stderr().is_terminal() {
        anyhow::bail!(
            "Chat mode requires a terminal.\n\
             Use `quill exec --prompt '...'` for non-interactive execution."
        );
    }

    let mut err = stderr();
    writeln!(err, "Quill")?;
    writeln!(err, "Model: {}", config.model)?;
    writeln!(err, "Document: {}", document_path.display())?;
    err.flush()?;

    let mut runtime = TuiRuntime::new(
        config.clone(),
        document,
        document_path.clone(),
        extra_instructions,
    )?;

    runtime.state.transcript.push_cell(HistoryCell::system(format!(
        "Editing {}. Ask for changes in plain language; /help lists commands.",
        document_path.display()
    )));
    let config_path = quill_core::config::paths::config_path();
    if config_path.exists() {
        runtime.state.transcript.push_cell(HistoryCell::system(format!(
            "Config file: {}",
            config_path.display()
        )));
    }

    runtime.run()?;
    drop(runtime);

    writeln!(stderr(), "Goodbye!")?;
    Ok(())
}
