//! Chat command handler.

use std::io::{IsTerminal, Read};
use std::path::Path;

use anyhow::{Context, Result};
use quill_core::config::Config;
use quill_core::document::{Document, SharedDocument};

use super::exec;
use crate::modes;

pub async fn run(config: &Config, document_path: &Path) -> Result<()> {
    // Piped stdin runs a single exec turn instead.
    if !std::io::stdin().is_terminal() {
        let mut prompt = String::new();
        std::io::stdin().lock().read_to_string(&mut prompt)?;
        let prompt = prompt.trim();
        if prompt.is_empty() {
            anyhow::bail!("No input provided via pipe");
        }
        return exec::run(exec::ExecRunOptions {
            prompt,
            config,
            document_path,
            print_document: false,
        })
        .await;
    }

    let document = Document::load(document_path).context("load document")?;
    let extra_instructions = config.effective_system_prompt()?;

    modes::run_interactive_chat(
        config,
        SharedDocument::new(document),
        document_path.to_path_buf(),
        extra_instructions,
    )
    .await
    .context("interactive chat failed")
}
