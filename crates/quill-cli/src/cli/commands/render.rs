//! Render command handler.

use std::path::Path;

use anyhow::{Context, Result};
use quill_core::config::RendererKind;

use crate::modes;

pub fn run(file: &Path, simple: bool, width: usize) -> Result<()> {
    let content = std::fs::read_to_string(file)
        .with_context(|| format!("read markdown from {}", file.display()))?;
    let kind = if simple {
        RendererKind::Simple
    } else {
        RendererKind::Rich
    };

    for line in modes::render_markdown_lines(&content, width.max(1), kind)? {
        println!("{}", line.trim_end());
    }
    Ok(())
}
