//! Artifacts shown next to the chat and the registry of their renderers.
//!
//! An artifact is produced whenever the agent changes the document. The
//! registry maps the artifact kind key to the function that draws its body;
//! the panel controller decides where that body goes.

mod panel;

use std::collections::HashMap;

pub use panel::{
    ArtifactPanelController, ArtifactView, PanelBag, PanelContainer, PanelContext, PanelInfo,
    PanelSummary, inline_block_lines,
};
use quill_core::artifact::{ArtifactId, MARKDOWN_ARTIFACT};
use quill_core::config::RendererKind;
use quill_core::document::Document;

use crate::markdown;
use crate::transcript::{Style, StyledLine};

/// One artifact value. Immutable per render; updates replace it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub id: ArtifactId,
    pub kind: String,
    pub title: String,
    /// Markdown source. `None` renders as an empty body.
    pub content: Option<String>,
}

impl Artifact {
    /// Creates a markdown artifact with a fresh identity.
    pub fn markdown(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: ArtifactId::new(),
            kind: MARKDOWN_ARTIFACT.to_string(),
            title: title.into(),
            content: Some(content.into()),
        }
    }

    /// Creates a markdown artifact from a document snapshot.
    pub fn from_document(document: &Document) -> Self {
        Self::markdown(document.title(), document.content())
    }

    /// Replaces content and title while keeping the identity.
    pub fn updated(&self, title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: self.id,
            kind: self.kind.clone(),
            title: title.into(),
            content: Some(content.into()),
        }
    }

    pub fn content(&self) -> &str {
        self.content.as_deref().unwrap_or_default()
    }
}

/// Draws an artifact body at a given width.
pub type RenderBodyFn = fn(content: &str, width: usize, renderer: RendererKind) -> Vec<StyledLine>;

/// Registered renderer for one artifact kind.
#[derive(Debug, Clone, Copy)]
pub struct ArtifactEntry {
    pub kind: &'static str,
    pub render: RenderBodyFn,
}

/// Maps artifact kind keys to their renderers.
#[derive(Debug, Clone, Default)]
pub struct ArtifactRegistry {
    entries: HashMap<&'static str, ArtifactEntry>,
}

impl ArtifactRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in `markdown_artifact` renderer.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(ArtifactEntry {
            kind: MARKDOWN_ARTIFACT,
            render: markdown::render_document,
        });
        registry
    }

    pub fn register(&mut self, entry: ArtifactEntry) {
        self.entries.insert(entry.kind, entry);
    }

    pub fn lookup(&self, kind: &str) -> Option<&ArtifactEntry> {
        self.entries.get(kind)
    }

    /// Renders an artifact body; unknown kinds fall back to plain text lines.
    pub fn render_body(
        &self,
        artifact: &Artifact,
        width: usize,
        renderer: RendererKind,
    ) -> Vec<StyledLine> {
        match self.lookup(&artifact.kind) {
            Some(entry) => (entry.render)(artifact.content(), width, renderer),
            None => {
                tracing::debug!(kind = %artifact.kind, "no renderer registered for artifact kind");
                artifact
                    .content()
                    .lines()
                    .map(|line| StyledLine::plain(line, Style::Plain))
                    .collect()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtins_register_markdown_artifact() {
        let registry = ArtifactRegistry::with_builtins();
        let entry = registry.lookup("markdown_artifact").expect("registered");
        assert_eq!(entry.kind, MARKDOWN_ARTIFACT);
    }

    #[test]
    fn test_unknown_kind_has_no_entry() {
        let registry = ArtifactRegistry::with_builtins();
        assert!(registry.lookup("chart_artifact").is_none());
    }

    #[test]
    fn test_unknown_kind_renders_plain_text() {
        let registry = ArtifactRegistry::with_builtins();
        let mut artifact = Artifact::markdown("T", "# not a heading\nline");
        artifact.kind = "other".to_string();

        let lines = registry.render_body(&artifact, 40, RendererKind::Rich);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].text(), "# not a heading");
        assert!(lines.iter().all(|l| l.spans[0].style == Style::Plain));
    }

    #[test]
    fn test_absent_content_renders_empty_body() {
        let registry = ArtifactRegistry::with_builtins();
        let mut artifact = Artifact::markdown("T", "");
        artifact.content = None;

        let lines = registry.render_body(&artifact, 40, RendererKind::Rich);
        assert!(lines.iter().all(|l| l.text().is_empty()));
    }

    #[test]
    fn test_updated_keeps_identity() {
        let artifact = Artifact::markdown("A", "one");
        let next = artifact.updated("B", "two");
        assert_eq!(next.id, artifact.id);
        assert_eq!(next.title, "B");
        assert_eq!(next.content(), "two");
    }

    #[test]
    fn test_from_document_uses_heading_title() {
        let artifact = Artifact::from_document(&Document::new("# Plan\n\nbody"));
        assert_eq!(artifact.title, "Plan");
        assert_eq!(artifact.kind, MARKDOWN_ARTIFACT);
    }
}
