//! Line-oriented markdown converter.
//!
//! Each source line is classified independently (heading 1-3, list item,
//! blank, paragraph); there is no inline parsing. Used when the rich
//! renderer is disabled.

use super::wrap::{WrapOptions, wrap_styled_spans};
use crate::transcript::{Style, StyledLine, StyledSpan};

/// One rendered block of the line-oriented converter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkdownBlock {
    Heading { level: u8, text: String },
    /// Contiguous list items, in source order.
    List { items: Vec<String> },
    /// Spacer produced by a blank or whitespace-only line.
    Break,
    /// A non-special line, verbatim.
    Paragraph(String),
}

/// Classification of a single source line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Line<'a> {
    Heading(u8, &'a str),
    Item(&'a str),
    Blank,
    Paragraph(&'a str),
}

fn classify(line: &str) -> Line<'_> {
    if let Some(rest) = line.strip_prefix("# ") {
        Line::Heading(1, rest)
    } else if let Some(rest) = line.strip_prefix("## ") {
        Line::Heading(2, rest)
    } else if let Some(rest) = line.strip_prefix("### ") {
        Line::Heading(3, rest)
    } else if let Some(rest) = line
        .strip_prefix("- ")
        .or_else(|| line.strip_prefix("* "))
    {
        Line::Item(rest)
    } else if line.trim().is_empty() {
        Line::Blank
    } else {
        Line::Paragraph(line)
    }
}

/// Converts markdown into blocks, one classification per source line.
///
/// Pure and deterministic. Consecutive list items are grouped into a single
/// [`MarkdownBlock::List`].
pub fn render_blocks(content: &str) -> Vec<MarkdownBlock> {
    let mut blocks: Vec<MarkdownBlock> = Vec::new();

    for line in content.lines() {
        match classify(line) {
            Line::Heading(level, text) => blocks.push(MarkdownBlock::Heading {
                level,
                text: text.to_string(),
            }),
            Line::Item(text) => {
                if let Some(MarkdownBlock::List { items }) = blocks.last_mut() {
                    items.push(text.to_string());
                } else {
                    blocks.push(MarkdownBlock::List {
                        items: vec![text.to_string()],
                    });
                }
            }
            Line::Blank => blocks.push(MarkdownBlock::Break),
            Line::Paragraph(text) => blocks.push(MarkdownBlock::Paragraph(text.to_string())),
        }
    }

    blocks
}

/// Lays blocks out as styled lines wrapped to `width`.
pub fn blocks_to_lines(blocks: &[MarkdownBlock], width: usize) -> Vec<StyledLine> {
    let mut lines = Vec::new();

    for block in blocks {
        match block {
            MarkdownBlock::Heading { level, text } => {
                let style = match level {
                    1 => Style::H1,
                    2 => Style::H2,
                    _ => Style::H3,
                };
                let span = StyledSpan::new(text.as_str(), style);
                lines.extend(wrap_styled_spans(&[span], &WrapOptions::new(width)));
            }
            MarkdownBlock::List { items } => {
                for item in items {
                    let opts = WrapOptions {
                        width,
                        first_prefix: vec![StyledSpan::new("• ", Style::ListBullet)],
                        rest_prefix: vec![StyledSpan::new("  ", Style::Plain)],
                    };
                    let span = StyledSpan::new(item.as_str(), Style::Assistant);
                    lines.extend(wrap_styled_spans(&[span], &opts));
                }
            }
            MarkdownBlock::Break => lines.push(StyledLine::empty()),
            MarkdownBlock::Paragraph(text) => {
                let span = StyledSpan::new(text.as_str(), Style::Assistant);
                lines.extend(wrap_styled_spans(&[span], &WrapOptions::new(width)));
            }
        }
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_h1() {
        assert_eq!(
            render_blocks("# Title"),
            vec![MarkdownBlock::Heading {
                level: 1,
                text: "Title".to_string()
            }]
        );
    }

    #[test]
    fn test_h2_break_paragraph() {
        assert_eq!(
            render_blocks("## A\n\nB"),
            vec![
                MarkdownBlock::Heading {
                    level: 2,
                    text: "A".to_string()
                },
                MarkdownBlock::Break,
                MarkdownBlock::Paragraph("B".to_string()),
            ]
        );
    }

    #[test]
    fn test_h3() {
        assert_eq!(
            render_blocks("### Deep"),
            vec![MarkdownBlock::Heading {
                level: 3,
                text: "Deep".to_string()
            }]
        );
    }

    #[test]
    fn test_contiguous_items_grouped() {
        assert_eq!(
            render_blocks("- a\n* b"),
            vec![MarkdownBlock::List {
                items: vec!["a".to_string(), "b".to_string()]
            }]
        );
    }

    #[test]
    fn test_items_separated_by_other_lines_are_separate_lists() {
        let blocks = render_blocks("- a\ntext\n- b");
        assert_eq!(blocks.len(), 3);
        assert!(matches!(&blocks[0], MarkdownBlock::List { items } if items == &["a"]));
        assert!(matches!(&blocks[2], MarkdownBlock::List { items } if items == &["b"]));
    }

    #[test]
    fn test_whitespace_line_is_break() {
        assert_eq!(render_blocks("   \t"), vec![MarkdownBlock::Break]);
    }

    #[test]
    fn test_prefix_without_space_is_paragraph() {
        assert_eq!(
            render_blocks("#Title\n-item\n#### four"),
            vec![
                MarkdownBlock::Paragraph("#Title".to_string()),
                MarkdownBlock::Paragraph("-item".to_string()),
                MarkdownBlock::Paragraph("#### four".to_string()),
            ]
        );
    }

    #[test]
    fn test_plain_lines_preserved_verbatim() {
        let input = "first line\n  indented **not bold**\nlast: `x`";
        let blocks = render_blocks(input);
        let texts: Vec<&str> = blocks
            .iter()
            .map(|b| match b {
                MarkdownBlock::Paragraph(t) => t.as_str(),
                other => panic!("unexpected block {other:?}"),
            })
            .collect();
        assert_eq!(texts, input.lines().collect::<Vec<_>>());
    }

    /// Deterministic line generator for paragraph text.
    struct Lcg(u64);

    impl Lcg {
        fn below(&mut self, bound: usize) -> usize {
            self.0 = self
                .0
                .wrapping_mul(6_364_136_223_846_793_005)
                .wrapping_add(1_442_695_040_888_963_407);
            usize::try_from(self.0 >> 33).unwrap() % bound
        }
    }

    #[test]
    fn test_generated_plain_lines_stay_verbatim() {
        // None of these start a heading or list item, alone or joined by spaces.
        const WORDS: [&str; 12] = [
            "alpha", "β-γ", "42", "x*y", "#tag", "-dash", "`code`", "**bold**", "a.b", "1)",
            "[link](u)", "naïve🙂",
        ];
        let mut rng = Lcg(0x9e37_79b9_7f4a_7c15);

        for _ in 0..200 {
            let mut lines = Vec::new();
            for _ in 0..=rng.below(6) {
                let mut line = " ".repeat(rng.below(3));
                for word in 0..=rng.below(5) {
                    if word > 0 {
                        line.push_str(if rng.below(4) == 0 { "  " } else { " " });
                    }
                    line.push_str(WORDS[rng.below(WORDS.len())]);
                }
                lines.push(line);
            }
            let content = lines.join("\n");

            let expected: Vec<MarkdownBlock> = lines
                .iter()
                .map(|line| MarkdownBlock::Paragraph(line.clone()))
                .collect();
            assert_eq!(render_blocks(&content), expected, "input: {content:?}");
        }
    }

    #[test]
    fn test_empty_content_has_no_blocks() {
        assert!(render_blocks("").is_empty());
    }

    #[test]
    fn test_blocks_to_lines_styles() {
        let lines = blocks_to_lines(&render_blocks("# T\n\n- a\nbody"), 40);
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0].spans[0].style, Style::H1);
        assert!(lines[1].spans.is_empty());
        assert_eq!(lines[2].text(), "• a");
        assert_eq!(lines[3].text(), "body");
    }
}
