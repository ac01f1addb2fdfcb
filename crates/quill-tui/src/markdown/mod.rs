//! Markdown rendering for the document artifact.
//!
//! - `rich::render_markdown()`: pulldown-cmark renderer (inline styles, code, tables)
//! - `simple::render_blocks()`: line-oriented converter without inline parsing
//! - `wrap_styled_spans()`: style-preserving wrapping shared by both

pub mod rich;
pub mod simple;
mod wrap;

pub use rich::render_markdown;
pub use simple::{MarkdownBlock, blocks_to_lines, render_blocks};
pub use wrap::{WrapOptions, wrap_styled_spans};
use quill_core::config::RendererKind;

use crate::transcript::StyledLine;

/// Renders document content with the configured renderer.
pub fn render_document(content: &str, width: usize, kind: RendererKind) -> Vec<StyledLine> {
    match kind {
        RendererKind::Rich => render_markdown(content, width),
        RendererKind::Simple => blocks_to_lines(&render_blocks(content), width),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_document_dispatches_on_kind() {
        let rich = render_document("**bold**", 40, RendererKind::Rich);
        assert_eq!(rich[0].text(), "bold");

        let simple = render_document("**bold**", 40, RendererKind::Simple);
        assert_eq!(simple[0].text(), "**bold**");
    }
}
