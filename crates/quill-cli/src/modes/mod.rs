//! Runtime execution modes.
//!
//! - `exec`: non-interactive streaming mode (stdout/stderr)
//! - TUI: full-screen chat with the document panel (optional feature)

pub mod exec;

use quill_core::config::RendererKind;
#[cfg(feature = "tui")]
pub use quill_tui::run_interactive_chat;

/// Renders markdown to plain text lines at `width` columns.
#[cfg(feature = "tui")]
pub fn render_markdown_lines(
    content: &str,
    width: usize,
    kind: RendererKind,
) -> anyhow::Result<Vec<String>> {
    Ok(quill_tui::markdown::render_document(content, width, kind)
        .iter()
        .map(quill_tui::transcript::StyledLine::text)
        .collect())
}

#[cfg(not(feature = "tui"))]
pub async fn run_interactive_chat(
    _config: &quill_core::config::Config,
    _document: quill_core::document::SharedDocument,
    _document_path: std::path::PathBuf,
    _extra_instructions: Option<String>,
) -> anyhow::Result<()> {
    anyhow::bail!("TUI support is disabled in this build (feature \"tui\").");
}

#[cfg(not(feature = "tui"))]
pub fn render_markdown_lines(
    _content: &str,
    _width: usize,
    _kind: RendererKind,
) -> anyhow::Result<Vec<String>> {
    anyhow::bail!("Rendering needs the TUI renderers (feature \"tui\").");
}
