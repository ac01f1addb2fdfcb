//! Prompt input: editing buffer and submitted-prompt history.

mod text_buffer;

pub use text_buffer::{CursorMove, TextBuffer};

/// Input box state.
#[derive(Debug, Default)]
pub struct InputState {
    pub buffer: TextBuffer,
    history: Vec<String>,
    /// Position while browsing history; `None` when editing a fresh draft.
    history_index: Option<usize>,
    draft: Option<String>,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&self) -> String {
        self.buffer.text()
    }

    /// Takes the trimmed prompt and records it in history.
    ///
    /// Returns `None` for blank input, leaving the buffer untouched.
    pub fn submit(&mut self) -> Option<String> {
        let text = self.buffer.text();
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return None;
        }
        let prompt = trimmed.to_string();
        if self.history.last() != Some(&prompt) {
            self.history.push(prompt.clone());
        }
        self.buffer.clear();
        self.history_index = None;
        self.draft = None;
        Some(prompt)
    }

    /// History browsing applies only on the first or last buffer line.
    pub fn should_navigate_up(&self) -> bool {
        !self.history.is_empty() && self.buffer.cursor().0 == 0
    }

    pub fn should_navigate_down(&self) -> bool {
        self.history_index.is_some() && self.buffer.cursor().0 + 1 == self.buffer.lines().len()
    }

    pub fn navigate_up(&mut self) {
        let next = match self.history_index {
            None => {
                self.draft = Some(self.buffer.text());
                self.history.len().checked_sub(1)
            }
            Some(i) => Some(i.saturating_sub(1)),
        };
        if let Some(i) = next {
            self.history_index = Some(i);
            self.buffer.set_text(&self.history[i]);
        }
    }

    pub fn navigate_down(&mut self) {
        let Some(i) = self.history_index else {
            return;
        };
        if i + 1 < self.history.len() {
            self.history_index = Some(i + 1);
            self.buffer.set_text(&self.history[i + 1]);
        } else {
            self.history_index = None;
            let draft = self.draft.take().unwrap_or_default();
            self.buffer.set_text(&draft);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_submit_trims_and_clears() {
        let mut input = InputState::new();
        input.buffer.insert_str("  add a summary \n");
        assert_eq!(input.submit().as_deref(), Some("add a summary"));
        assert!(input.buffer.is_empty());
    }

    #[test]
    fn test_blank_submit_is_ignored() {
        let mut input = InputState::new();
        input.buffer.insert_str("   ");
        assert!(input.submit().is_none());
        assert_eq!(input.text(), "   ");
    }

    #[test]
    fn test_history_navigation_restores_draft() {
        let mut input = InputState::new();
        for prompt in ["first", "second"] {
            input.buffer.insert_str(prompt);
            input.submit();
        }
        input.buffer.insert_str("draft");

        input.navigate_up();
        assert_eq!(input.text(), "second");
        input.navigate_up();
        assert_eq!(input.text(), "first");
        input.navigate_down();
        assert_eq!(input.text(), "second");
        input.navigate_down();
        assert_eq!(input.text(), "draft");
    }
}
