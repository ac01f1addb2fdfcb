//! Multi-line text buffer with a grapheme-indexed cursor.

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorMove {
    Up,
    Down,
    Forward,
    Back,
    Head,
    End,
}

/// Lines of text plus a `(row, col)` cursor; `col` counts graphemes.
#[derive(Debug, Clone)]
pub struct TextBuffer {
    lines: Vec<String>,
    row: usize,
    col: usize,
}

impl Default for TextBuffer {
    fn default() -> Self {
        Self {
            lines: vec![String::new()],
            row: 0,
            col: 0,
        }
    }
}

fn grapheme_len(line: &str) -> usize {
    line.graphemes(true).count()
}

/// Byte offset of grapheme `idx`, or the line length past the end.
fn byte_index(line: &str, idx: usize) -> usize {
    line.grapheme_indices(true)
        .nth(idx)
        .map_or(line.len(), |(i, _)| i)
}

impl TextBuffer {
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn cursor(&self) -> (usize, usize) {
        (self.row, self.col)
    }

    /// Display column of the cursor on its line.
    pub fn cursor_display_col(&self) -> usize {
        let line = &self.lines[self.row];
        line[..byte_index(line, self.col)].width()
    }

    pub fn text(&self) -> String {
        self.lines.join("\n")
    }

    pub fn is_empty(&self) -> bool {
        self.lines.len() == 1 && self.lines[0].is_empty()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn set_text(&mut self, text: &str) {
        self.clear();
        self.insert_str(text);
    }

    pub fn insert_str(&mut self, text: &str) {
        let text = text.replace("\r\n", "\n").replace('\r', "\n");
        let line = &self.lines[self.row];
        let at = byte_index(line, self.col);
        let tail = line[at..].to_string();
        let head = line[..at].to_string();

        let mut parts = text.split('\n');
        let first = parts.next().unwrap_or_default();
        let mut current = head + first;
        let mut new_lines = Vec::new();
        for part in parts {
            new_lines.push(std::mem::replace(&mut current, part.to_string()));
        }
        self.col = grapheme_len(&current);
        current.push_str(&tail);

        let inserted = new_lines.len();
        new_lines.push(current);
        self.lines.splice(self.row..=self.row, new_lines);
        self.row += inserted;
    }

    pub fn insert_char(&mut self, ch: char) {
        let mut buf = [0u8; 4];
        self.insert_str(ch.encode_utf8(&mut buf));
    }

    pub fn insert_newline(&mut self) {
        self.insert_str("\n");
    }

    /// Backspace: removes one grapheme or joins with the previous line.
    pub fn delete_prev(&mut self) {
        if self.col > 0 {
            let line = &mut self.lines[self.row];
            let start = byte_index(line, self.col - 1);
            let end = byte_index(line, self.col);
            line.replace_range(start..end, "");
            self.col -= 1;
        } else if self.row > 0 {
            let current = self.lines.remove(self.row);
            self.row -= 1;
            self.col = grapheme_len(&self.lines[self.row]);
            self.lines[self.row].push_str(&current);
        }
    }

    /// Delete: removes one grapheme or joins the next line.
    pub fn delete_next(&mut self) {
        let len = grapheme_len(&self.lines[self.row]);
        if self.col < len {
            let line = &mut self.lines[self.row];
            let start = byte_index(line, self.col);
            let end = byte_index(line, self.col + 1);
            line.replace_range(start..end, "");
        } else if self.row + 1 < self.lines.len() {
            let next = self.lines.remove(self.row + 1);
            self.lines[self.row].push_str(&next);
        }
    }

    /// Deletes back to the start of the previous word on this line.
    pub fn delete_word_left(&mut self) {
        if self.col == 0 {
            self.delete_prev();
            return;
        }
        let line = &self.lines[self.row];
        let graphemes: Vec<&str> = line.graphemes(true).collect();
        let mut idx = self.col.min(graphemes.len());
        while idx > 0 && graphemes[idx - 1].trim().is_empty() {
            idx -= 1;
        }
        while idx > 0 && !graphemes[idx - 1].trim().is_empty() {
            idx -= 1;
        }
        let start = byte_index(line, idx);
        let end = byte_index(line, self.col);
        self.lines[self.row].replace_range(start..end, "");
        self.col = idx;
    }

    /// Deletes from the line start to the cursor.
    pub fn delete_to_head(&mut self) {
        let line = &mut self.lines[self.row];
        let end = byte_index(line, self.col);
        line.replace_range(..end, "");
        self.col = 0;
    }

    pub fn move_cursor(&mut self, movement: CursorMove) {
        match movement {
            CursorMove::Up if self.row > 0 => {
                self.row -= 1;
                self.col = self.col.min(grapheme_len(&self.lines[self.row]));
            }
            CursorMove::Down if self.row + 1 < self.lines.len() => {
                self.row += 1;
                self.col = self.col.min(grapheme_len(&self.lines[self.row]));
            }
            CursorMove::Forward => {
                if self.col < grapheme_len(&self.lines[self.row]) {
                    self.col += 1;
                } else if self.row + 1 < self.lines.len() {
                    self.row += 1;
                    self.col = 0;
                }
            }
            CursorMove::Back => {
                if self.col > 0 {
                    self.col -= 1;
                } else if self.row > 0 {
                    self.row -= 1;
                    self.col = grapheme_len(&self.lines[self.row]);
                }
            }
            CursorMove::Head => self.col = 0,
            CursorMove::End => self.col = grapheme_len(&self.lines[self.row]),
            CursorMove::Up | CursorMove::Down => {}
        }
    }

    /// Applies an editing key. Returns `false` for keys it does not handle.
    pub fn input(&mut self, key: KeyEvent) -> bool {
        if key.kind == KeyEventKind::Release {
            return false;
        }
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Char('w') if ctrl => self.delete_word_left(),
            KeyCode::Char('u') if ctrl => self.delete_to_head(),
            KeyCode::Char('a') if ctrl => self.move_cursor(CursorMove::Head),
            KeyCode::Char('e') if ctrl => self.move_cursor(CursorMove::End),
            KeyCode::Char(ch)
                if !key
                    .modifiers
                    .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) =>
            {
                self.insert_char(ch);
            }
            KeyCode::Backspace => self.delete_prev(),
            KeyCode::Delete => self.delete_next(),
            KeyCode::Left => self.move_cursor(CursorMove::Back),
            KeyCode::Right => self.move_cursor(CursorMove::Forward),
            KeyCode::Up => self.move_cursor(CursorMove::Up),
            KeyCode::Down => self.move_cursor(CursorMove::Down),
            KeyCode::Home => self.move_cursor(CursorMove::Head),
            KeyCode::End => self.move_cursor(CursorMove::End),
            _ => return false,
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_multiline() {
        let mut buf = TextBuffer::default();
        buf.insert_str("one\ntwo");
        assert_eq!(buf.lines(), &["one", "two"]);
        assert_eq!(buf.cursor(), (1, 3));
    }

    #[test]
    fn test_insert_in_middle_keeps_tail() {
        let mut buf = TextBuffer::default();
        buf.insert_str("ad");
        buf.move_cursor(CursorMove::Back);
        buf.insert_str("b\nc");
        assert_eq!(buf.text(), "ab\ncd");
        assert_eq!(buf.cursor(), (1, 1));
    }

    #[test]
    fn test_backspace_removes_whole_grapheme() {
        let mut buf = TextBuffer::default();
        buf.insert_str("e\u{301}x");
        buf.move_cursor(CursorMove::Back);
        buf.delete_prev();
        assert_eq!(buf.text(), "x");
    }

    #[test]
    fn test_backspace_joins_lines() {
        let mut buf = TextBuffer::default();
        buf.insert_str("a\nb");
        buf.move_cursor(CursorMove::Head);
        buf.delete_prev();
        assert_eq!(buf.text(), "ab");
        assert_eq!(buf.cursor(), (0, 1));
    }

    #[test]
    fn test_delete_word_left() {
        let mut buf = TextBuffer::default();
        buf.insert_str("add a section  ");
        buf.delete_word_left();
        assert_eq!(buf.text(), "add a ");
    }

    #[test]
    fn test_cursor_display_col_counts_wide_chars() {
        let mut buf = TextBuffer::default();
        buf.insert_str("文档x");
        buf.move_cursor(CursorMove::Back);
        assert_eq!(buf.cursor_display_col(), 4);
    }

    #[test]
    fn test_vertical_move_clamps_column() {
        let mut buf = TextBuffer::default();
        buf.insert_str("long line\nab");
        buf.move_cursor(CursorMove::Up);
        buf.move_cursor(CursorMove::End);
        buf.move_cursor(CursorMove::Down);
        assert_eq!(buf.cursor(), (1, 2));
    }
}
