use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::transcript::{Style, StyledLine, StyledSpan};

/// Wrapping parameters with hanging-indent prefixes.
#[derive(Debug, Clone, Default)]
pub struct WrapOptions {
    /// Maximum display width of a line, prefixes included.
    pub width: usize,
    /// Prefix for the first line (e.g. a list bullet).
    pub first_prefix: Vec<StyledSpan>,
    /// Prefix for continuation lines.
    pub rest_prefix: Vec<StyledSpan>,
}

impl WrapOptions {
    pub fn new(width: usize) -> Self {
        Self {
            width,
            ..Self::default()
        }
    }

    /// Uses the same prefix on every line (e.g. a block quote bar).
    pub fn with_prefix(width: usize, prefix: Vec<StyledSpan>) -> Self {
        Self {
            width,
            first_prefix: prefix.clone(),
            rest_prefix: prefix,
        }
    }
}

fn prefix_width(prefix: &[StyledSpan]) -> usize {
    prefix.iter().map(|s| s.text.width()).sum()
}

/// A unit of layout: either a breakable gap or an unbreakable run.
enum Piece {
    Space(Style),
    Word(StyledSpan),
    HardBreak,
}

fn is_verbatim(style: Style) -> bool {
    matches!(style, Style::CodeInline | Style::CodeBlock)
}

/// Splits spans into words and collapsible gaps. Code keeps its whitespace.
fn tokenize(spans: &[StyledSpan]) -> Vec<Piece> {
    let mut pieces = Vec::new();
    for span in spans {
        for (i, segment) in span.text.split('\n').enumerate() {
            if i > 0 {
                pieces.push(Piece::HardBreak);
            }
            if segment.is_empty() {
                continue;
            }
            if is_verbatim(span.style) {
                pieces.push(Piece::Word(StyledSpan::new(segment, span.style)));
                continue;
            }
            if segment.starts_with(char::is_whitespace) {
                pieces.push(Piece::Space(span.style));
            }
            let mut words = segment.split_whitespace().peekable();
            while let Some(word) = words.next() {
                pieces.push(Piece::Word(StyledSpan::new(word, span.style)));
                if words.peek().is_some() {
                    pieces.push(Piece::Space(span.style));
                }
            }
            if segment.ends_with(char::is_whitespace) && !segment.trim().is_empty() {
                pieces.push(Piece::Space(span.style));
            }
        }
    }
    pieces
}

struct LineBuilder<'a> {
    opts: &'a WrapOptions,
    lines: Vec<StyledLine>,
    current: Vec<StyledSpan>,
    used: usize,
    pending_space: Option<Style>,
}

impl<'a> LineBuilder<'a> {
    fn new(opts: &'a WrapOptions) -> Self {
        Self {
            opts,
            lines: Vec::new(),
            current: Vec::new(),
            used: 0,
            pending_space: None,
        }
    }

    fn available(&self) -> usize {
        let prefix = if self.lines.is_empty() {
            &self.opts.first_prefix
        } else {
            &self.opts.rest_prefix
        };
        self.opts.width.saturating_sub(prefix_width(prefix)).max(1)
    }

    fn flush(&mut self) {
        let prefix = if self.lines.is_empty() {
            &self.opts.first_prefix
        } else {
            &self.opts.rest_prefix
        };
        let mut spans = prefix.clone();
        spans.append(&mut self.current);
        self.lines.push(StyledLine { spans });
        self.used = 0;
        self.pending_space = None;
    }

    fn push_word(&mut self, word: StyledSpan) {
        let width = word.text.width();
        let space = usize::from(self.pending_space.is_some() && self.used > 0);

        if self.used > 0 && self.used + space + width > self.available() {
            self.flush();
        }

        if self.used > 0
            && let Some(style) = self.pending_space.take()
        {
            self.current.push(StyledSpan::new(" ", style));
            self.used += 1;
        }
        self.pending_space = None;

        if width <= self.available().saturating_sub(self.used) {
            self.used += width;
            self.current.push(word);
            return;
        }

        // Longer than a whole line: break by display width.
        for fragment in break_by_width(&word, self.available()) {
            let fw = fragment.text.width();
            if self.used > 0 && self.used + fw > self.available() {
                self.flush();
            }
            self.used += fw;
            self.current.push(fragment);
        }
    }

    fn finish(mut self) -> Vec<StyledLine> {
        if !self.current.is_empty() || self.lines.is_empty() {
            self.flush();
        }
        self.lines
    }
}

fn break_by_width(span: &StyledSpan, max_width: usize) -> Vec<StyledSpan> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut current_width = 0usize;

    for ch in span.text.chars() {
        let w = ch.width().unwrap_or(0);
        if w > 0 && current_width + w > max_width && !current.is_empty() {
            parts.push(StyledSpan::new(std::mem::take(&mut current), span.style));
            current_width = 0;
        }
        current.push(ch);
        current_width += w;
    }
    if !current.is_empty() {
        parts.push(StyledSpan::new(current, span.style));
    }
    parts
}

/// Wraps styled spans to `opts.width`, keeping each span's style.
///
/// Prose wraps at word boundaries with whitespace collapsed; inline code and
/// code blocks keep their whitespace and break by character width. Embedded
/// newlines force a line break. Always returns at least one line.
pub fn wrap_styled_spans(spans: &[StyledSpan], opts: &WrapOptions) -> Vec<StyledLine> {
    if opts.width == 0 {
        let mut all = opts.first_prefix.clone();
        all.extend(spans.iter().cloned());
        return vec![StyledLine { spans: all }];
    }

    let mut builder = LineBuilder::new(opts);
    for piece in tokenize(spans) {
        match piece {
            Piece::Space(style) => builder.pending_space = Some(style),
            Piece::Word(word) => builder.push_word(word),
            Piece::HardBreak => builder.flush(),
        }
    }
    builder.finish()
}
