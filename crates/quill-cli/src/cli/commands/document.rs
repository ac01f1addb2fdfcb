//! Document command handlers.

use std::path::Path;

use anyhow::{Context, Result};
use quill_core::config::{self, Config};
use quill_core::document::Document;

pub fn path(document_path: &Path) {
    println!("{}", document_path.display());
}

pub fn show(document_path: &Path) -> Result<()> {
    let document = Document::load(document_path).context("load document")?;
    print!("{}", document.content());
    if !document.content().ends_with('\n') {
        println!();
    }
    Ok(())
}

pub fn reset(document_path: &Path) -> Result<()> {
    Document::default()
        .save(document_path)
        .with_context(|| format!("reset document at {}", document_path.display()))?;
    println!("Reset document at {}", document_path.display());
    Ok(())
}

pub fn use_path(document_path: &Path) -> Result<()> {
    let absolute = std::path::absolute(document_path)
        .with_context(|| format!("resolve {}", document_path.display()))?;
    let config_path = config::paths::config_path();
    Config::save_document_path_to(&config_path, &absolute.to_string_lossy())
        .with_context(|| format!("update config at {}", config_path.display()))?;
    println!("Document set to {}", absolute.display());
    Ok(())
}
