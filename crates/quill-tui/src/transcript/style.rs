/// A styled span of text (UI-agnostic).
///
/// Converted to ratatui `Span`s at render time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyledSpan {
    pub text: String,
    pub style: Style,
}

impl StyledSpan {
    pub fn new(text: impl Into<String>, style: Style) -> Self {
        Self {
            text: text.into(),
            style,
        }
    }
}

/// A line of styled spans.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StyledLine {
    pub spans: Vec<StyledSpan>,
}

impl StyledLine {
    pub fn empty() -> Self {
        StyledLine { spans: vec![] }
    }

    pub fn plain(text: impl Into<String>, style: Style) -> Self {
        StyledLine {
            spans: vec![StyledSpan::new(text, style)],
        }
    }

    /// Concatenated text of all spans.
    pub fn text(&self) -> String {
        self.spans.iter().map(|s| s.text.as_str()).collect()
    }
}

/// Semantic style identifiers.
///
/// Translated to terminal styles by the renderer so transcript and markdown
/// code stay free of terminal dependencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Style {
    Plain,
    /// User message prefix ("│ ").
    UserPrefix,
    User,
    Assistant,
    StreamingCursor,
    SystemPrefix,
    System,
    ToolBracket,
    ToolStatus,
    ToolError,
    ToolRunning,
    ToolSuccess,
    ToolCancelled,
    /// Streaming preview of a tool's document text.
    ToolPreview,
    Interrupted,

    // Artifact chrome
    ArtifactBorder,
    ArtifactTitle,
    ArtifactIndicator,
    ArtifactCaption,

    // Markdown
    CodeInline,
    CodeBlock,
    CodeFence,
    Emphasis,
    Strong,
    H1,
    H2,
    H3,
    Link,
    BlockQuote,
    ListBullet,
    ListNumber,
    Rule,
}
