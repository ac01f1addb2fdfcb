//! pulldown-cmark backed renderer with inline styles, code, lists and tables.

use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{ContentArrangement, Table};
use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag, TagEnd};
use unicode_width::UnicodeWidthStr;

use super::wrap::{WrapOptions, wrap_styled_spans};
use crate::transcript::{Style, StyledLine, StyledSpan};

/// Renders markdown into styled lines wrapped to `width`.
///
/// Raw HTML is dropped. Trailing blank lines are trimmed; empty input yields
/// a single empty line.
pub fn render_markdown(text: &str, width: usize) -> Vec<StyledLine> {
    if text.trim().is_empty() {
        return vec![StyledLine::empty()];
    }

    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);

    let mut renderer = Renderer::new(width);
    for event in Parser::new_ext(text, options) {
        renderer.handle(event);
    }
    renderer.finish()
}

#[derive(Debug, Default)]
struct TableBuffer {
    header: Vec<String>,
    rows: Vec<Vec<String>>,
    row: Vec<String>,
    cell: String,
    in_head: bool,
}

impl TableBuffer {
    fn end_cell(&mut self) {
        let cell = std::mem::take(&mut self.cell);
        self.row.push(cell.trim().to_string());
    }

    fn end_row(&mut self) {
        let row = std::mem::take(&mut self.row);
        if self.in_head {
            self.header = row;
        } else {
            self.rows.push(row);
        }
    }

    fn render(&self, width: usize) -> Vec<String> {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL_CONDENSED)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_width(u16::try_from(width).unwrap_or(u16::MAX));
        if !self.header.is_empty() {
            table.set_header(&self.header);
        }
        for row in &self.rows {
            table.add_row(row);
        }
        table.to_string().lines().map(str::to_string).collect()
    }
}

#[derive(Debug)]
struct ListLevel {
    /// Next number for ordered lists; `None` for bullets.
    next_number: Option<u64>,
}

struct Renderer {
    width: usize,
    lines: Vec<StyledLine>,
    spans: Vec<StyledSpan>,
    styles: Vec<Style>,
    lists: Vec<ListLevel>,
    quote_depth: usize,
    code_block: Option<Option<String>>,
    table: Option<TableBuffer>,
}

impl Renderer {
    fn new(width: usize) -> Self {
        Self {
            width,
            lines: Vec::new(),
            spans: Vec::new(),
            styles: vec![Style::Assistant],
            lists: Vec::new(),
            quote_depth: 0,
            code_block: None,
            table: None,
        }
    }

    fn style(&self) -> Style {
        self.styles.last().copied().unwrap_or(Style::Assistant)
    }

    fn pop_style(&mut self) {
        if self.styles.len() > 1 {
            self.styles.pop();
        }
    }

    fn quote_prefix(&self) -> Vec<StyledSpan> {
        if self.quote_depth == 0 {
            Vec::new()
        } else {
            vec![StyledSpan::new("│ ".repeat(self.quote_depth), Style::BlockQuote)]
        }
    }

    fn blank_line(&mut self) {
        if self.lines.last().is_some_and(|l| !l.spans.is_empty()) {
            self.lines.push(StyledLine {
                spans: self.quote_prefix(),
            });
        }
    }

    fn push_text(&mut self, text: &str, style: Style) {
        if let Some(table) = self.table.as_mut() {
            table.cell.push_str(&text.replace('\n', " "));
            return;
        }
        self.spans.push(StyledSpan::new(text, style));
    }

    fn handle(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(tag) => self.end(tag),
            Event::Text(text) => self.push_text(&text, self.style()),
            Event::Code(code) => {
                if self.table.is_some() {
                    self.push_text(&format!("`{code}`"), Style::CodeInline);
                } else {
                    self.push_text(&code, Style::CodeInline);
                }
            }
            Event::SoftBreak => self.push_text(" ", self.style()),
            Event::HardBreak => self.push_text("\n", self.style()),
            Event::TaskListMarker(checked) => {
                let marker = if checked { "[x] " } else { "[ ] " };
                self.spans.push(StyledSpan::new(marker, Style::ListBullet));
            }
            Event::Rule => {
                self.flush_paragraph();
                let rule = "─".repeat(self.width.clamp(1, 40));
                self.lines.push(StyledLine::plain(rule, Style::Rule));
                self.blank_line();
            }
            Event::Html(_)
            | Event::InlineHtml(_)
            | Event::FootnoteReference(_)
            | Event::InlineMath(_)
            | Event::DisplayMath(_) => {}
        }
    }

    fn start(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Heading { level, .. } => {
                self.flush_paragraph();
                self.styles.push(match level {
                    HeadingLevel::H1 => Style::H1,
                    HeadingLevel::H2 => Style::H2,
                    _ => Style::H3,
                });
            }
            Tag::CodeBlock(kind) => {
                self.flush_paragraph();
                let lang = match kind {
                    CodeBlockKind::Fenced(lang) if !lang.is_empty() => Some(lang.to_string()),
                    _ => None,
                };
                self.code_block = Some(lang);
            }
            Tag::List(start) => {
                self.flush_list_item_or_paragraph();
                self.lists.push(ListLevel { next_number: start });
            }
            Tag::Item => self.flush_paragraph(),
            Tag::BlockQuote(_) => {
                self.flush_paragraph();
                self.quote_depth += 1;
                self.styles.push(Style::BlockQuote);
            }
            Tag::Emphasis => self.styles.push(Style::Emphasis),
            Tag::Strong => self.styles.push(Style::Strong),
            Tag::Link { .. } => self.styles.push(Style::Link),
            Tag::Strikethrough | Tag::Superscript | Tag::Subscript => {
                let current = self.style();
                self.styles.push(current);
            }
            Tag::Table(_) => {
                self.flush_paragraph();
                self.table = Some(TableBuffer::default());
            }
            Tag::TableHead => {
                if let Some(table) = self.table.as_mut() {
                    table.in_head = true;
                }
            }
            Tag::Paragraph
            | Tag::TableRow
            | Tag::TableCell
            | Tag::Image { .. }
            | Tag::FootnoteDefinition(_)
            | Tag::MetadataBlock(_)
            | Tag::HtmlBlock
            | Tag::DefinitionList
            | Tag::DefinitionListTitle
            | Tag::DefinitionListDefinition => {}
        }
    }

    fn end(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph => {
                if self.lists.is_empty() {
                    self.flush_paragraph();
                    self.blank_line();
                }
            }
            TagEnd::Heading(_) => {
                self.flush_paragraph();
                self.pop_style();
                self.blank_line();
            }
            TagEnd::CodeBlock => {
                self.flush_code_block();
                self.blank_line();
            }
            TagEnd::List(_) => {
                self.flush_list_item_or_paragraph();
                self.lists.pop();
                if self.lists.is_empty() {
                    self.blank_line();
                }
            }
            TagEnd::Item => {
                self.flush_list_item_or_paragraph();
                if let Some(level) = self.lists.last_mut()
                    && let Some(n) = level.next_number.as_mut()
                {
                    *n += 1;
                }
            }
            TagEnd::BlockQuote(_) => {
                self.flush_paragraph();
                if self.lines.last().is_some_and(|l| l.spans == self.quote_prefix()) {
                    self.lines.pop();
                }
                self.quote_depth = self.quote_depth.saturating_sub(1);
                self.pop_style();
                self.blank_line();
            }
            TagEnd::Emphasis
            | TagEnd::Strong
            | TagEnd::Link
            | TagEnd::Strikethrough
            | TagEnd::Superscript
            | TagEnd::Subscript => self.pop_style(),
            TagEnd::Table => {
                if let Some(table) = self.table.take() {
                    for line in table.render(self.width) {
                        self.lines.push(StyledLine::plain(line, Style::Plain));
                    }
                }
                self.blank_line();
            }
            TagEnd::TableHead => {
                if let Some(table) = self.table.as_mut() {
                    table.end_row();
                    table.in_head = false;
                }
            }
            TagEnd::TableRow => {
                if let Some(table) = self.table.as_mut() {
                    table.end_row();
                }
            }
            TagEnd::TableCell => {
                if let Some(table) = self.table.as_mut() {
                    table.end_cell();
                }
            }
            _ => {}
        }
    }

    fn flush_paragraph(&mut self) {
        if self.spans.is_empty() {
            return;
        }
        let spans = std::mem::take(&mut self.spans);
        let opts = WrapOptions::with_prefix(self.width, self.quote_prefix());
        self.lines.extend(wrap_styled_spans(&spans, &opts));
    }

    /// Flushes pending spans as a list item when inside a list.
    fn flush_list_item_or_paragraph(&mut self) {
        if self.spans.is_empty() {
            return;
        }
        let Some(level) = self.lists.last() else {
            self.flush_paragraph();
            return;
        };

        let (marker, marker_style) = match level.next_number {
            Some(n) => (format!("{n}. "), Style::ListNumber),
            None => ("• ".to_string(), Style::ListBullet),
        };
        let indent = "  ".repeat(self.lists.len().saturating_sub(1));
        let hang = " ".repeat(marker.width());

        let mut first_prefix = self.quote_prefix();
        first_prefix.push(StyledSpan::new(indent.as_str(), Style::Plain));
        first_prefix.push(StyledSpan::new(marker, marker_style));
        let mut rest_prefix = self.quote_prefix();
        rest_prefix.push(StyledSpan::new(format!("{indent}{hang}"), Style::Plain));

        let spans = std::mem::take(&mut self.spans);
        let opts = WrapOptions {
            width: self.width,
            first_prefix,
            rest_prefix,
        };
        self.lines.extend(wrap_styled_spans(&spans, &opts));
    }

    fn flush_code_block(&mut self) {
        let lang = self.code_block.take().flatten();
        let body: String = std::mem::take(&mut self.spans)
            .into_iter()
            .map(|s| s.text)
            .collect();

        let fence = match lang {
            Some(lang) => format!("```{lang}"),
            None => "```".to_string(),
        };
        self.lines.push(StyledLine::plain(fence, Style::CodeFence));
        for line in body.trim_end_matches('\n').split('\n') {
            self.lines.push(StyledLine {
                spans: vec![
                    StyledSpan::new("  ", Style::Plain),
                    StyledSpan::new(line, Style::CodeBlock),
                ],
            });
        }
        self.lines.push(StyledLine::plain("```", Style::CodeFence));
    }

    fn finish(mut self) -> Vec<StyledLine> {
        if self.code_block.is_some() {
            self.flush_code_block();
        } else {
            self.flush_list_item_or_paragraph();
        }
        while self
            .lines
            .last()
            .is_some_and(|l| l.spans.iter().all(|s| s.text.trim().is_empty()))
        {
            self.lines.pop();
        }
        if self.lines.is_empty() {
            self.lines.push(StyledLine::empty());
        }
        self.lines
    }
}
