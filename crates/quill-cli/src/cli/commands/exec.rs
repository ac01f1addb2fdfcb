//! Exec command handler.

use std::path::Path;

use anyhow::{Context, Result};
use quill_core::config::Config;
use quill_core::document::{Document, SharedDocument};

use crate::modes;

pub struct ExecRunOptions<'a> {
    pub prompt: &'a str,
    pub config: &'a Config,
    pub document_path: &'a Path,
    pub print_document: bool,
}

pub async fn run(options: ExecRunOptions<'_>) -> Result<()> {
    let document = SharedDocument::new(
        Document::load(options.document_path).context("load document")?,
    );
    let extra_instructions = options.config.effective_system_prompt()?;

    let result = modes::exec::run_exec(
        options.prompt,
        options.config,
        &document,
        extra_instructions.as_deref(),
    )
    .await;

    // Edits made before a failure are kept.
    let snapshot = document.snapshot();
    if snapshot.revision() > 0 {
        snapshot
            .save(options.document_path)
            .context("save document")?;
    }
    result.context("execute prompt")?;

    if options.print_document {
        print!("{}", snapshot.content());
        if !snapshot.content().ends_with('\n') {
            println!();
        }
    }

    Ok(())
}
