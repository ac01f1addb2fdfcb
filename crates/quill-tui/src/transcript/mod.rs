//! Chat transcript: cells, scrolling and agent event handling.

mod cell;
mod style;
mod update;

pub use cell::{CellId, HistoryCell, ToolState};
pub use style::{Style, StyledLine, StyledSpan};
pub use update::{apply_pending_delta, finish_turn, handle_agent_event};

/// Cells plus a scroll position counted in lines from the bottom.
///
/// Offset 0 follows new output; scrolling up pins the view until the user
/// scrolls back down.
#[derive(Debug, Default)]
pub struct TranscriptState {
    cells: Vec<HistoryCell>,
    scroll_from_bottom: usize,
}

impl TranscriptState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cells(&self) -> &[HistoryCell] {
        &self.cells
    }

    pub fn push_cell(&mut self, cell: HistoryCell) {
        self.cells.push(cell);
    }

    pub fn clear(&mut self) {
        self.cells.clear();
        self.scroll_from_bottom = 0;
    }

    pub fn cell_mut(&mut self, id: CellId) -> Option<&mut HistoryCell> {
        self.cells.iter_mut().find(|c| c.id() == id)
    }

    fn tool_cell_mut(&mut self, tool_use_id: &str) -> Option<&mut HistoryCell> {
        self.cells.iter_mut().rev().find(|c| {
            matches!(c, HistoryCell::Tool { tool_use_id: id, .. } if id == tool_use_id)
        })
    }

    pub fn set_tool_input_for(&mut self, tool_use_id: &str, input: serde_json::Value) {
        if let Some(cell) = self.tool_cell_mut(tool_use_id) {
            cell.set_tool_input(input);
        }
    }

    pub fn set_tool_input_delta_for(&mut self, tool_use_id: &str, delta: String) {
        if let Some(cell) = self.tool_cell_mut(tool_use_id) {
            cell.set_tool_input_delta(delta);
        }
    }

    pub fn set_tool_result_for(
        &mut self,
        tool_use_id: &str,
        result: quill_core::core::events::ToolOutput,
    ) {
        if let Some(cell) = self.tool_cell_mut(tool_use_id) {
            cell.set_tool_result(result);
        }
    }

    pub fn mark_interrupted(&mut self) {
        for cell in &mut self.cells {
            cell.mark_cancelled();
        }
        // A request cancelled before any reply marks the prompt itself.
        if let Some(last) = self.cells.last_mut() {
            last.mark_request_interrupted();
        }
    }

    pub fn mark_errored(&mut self) {
        for cell in &mut self.cells {
            cell.mark_errored();
        }
    }

    pub fn is_following(&self) -> bool {
        self.scroll_from_bottom == 0
    }

    pub fn scroll_from_bottom(&self) -> usize {
        self.scroll_from_bottom
    }

    pub fn scroll_up(&mut self, lines: usize) {
        self.scroll_from_bottom = self.scroll_from_bottom.saturating_add(lines);
    }

    pub fn scroll_down(&mut self, lines: usize) {
        self.scroll_from_bottom = self.scroll_from_bottom.saturating_sub(lines);
    }

    pub fn scroll_to_bottom(&mut self) {
        self.scroll_from_bottom = 0;
    }

    /// All cells rendered at `width`, separated by blank lines.
    pub fn display_lines(&self, width: usize, spinner_frame: usize) -> Vec<StyledLine> {
        let mut lines = Vec::new();
        for (i, cell) in self.cells.iter().enumerate() {
            if i > 0 {
                lines.push(StyledLine::empty());
            }
            lines.extend(cell.display_lines(width, spinner_frame));
        }
        lines
    }

    /// First visible line index for a viewport of `height` lines.
    ///
    /// Clamps the stored offset so scrolling past the top stops there.
    pub fn visible_start(&self, total_lines: usize, height: usize) -> usize {
        let max_start = total_lines.saturating_sub(height);
        max_start.saturating_sub(self.scroll_from_bottom.min(max_start))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_display_lines_separate_cells() {
        let mut transcript = TranscriptState::new();
        transcript.push_cell(HistoryCell::user("hi"));
        transcript.push_cell(HistoryCell::assistant("hello"));
        let texts: Vec<String> = transcript
            .display_lines(40, 0)
            .iter()
            .map(StyledLine::text)
            .collect();
        assert_eq!(texts, vec!["│ hi", "", "hello"]);
    }

    #[test]
    fn test_visible_start_follows_and_clamps() {
        let mut transcript = TranscriptState::new();
        assert_eq!(transcript.visible_start(30, 10), 20);

        transcript.scroll_up(5);
        assert!(!transcript.is_following());
        assert_eq!(transcript.visible_start(30, 10), 15);

        transcript.scroll_up(100);
        assert_eq!(transcript.visible_start(30, 10), 0);

        transcript.scroll_to_bottom();
        assert_eq!(transcript.visible_start(5, 10), 0);
    }

    #[test]
    fn test_tool_updates_target_latest_matching_cell() {
        let mut transcript = TranscriptState::new();
        transcript.push_cell(HistoryCell::tool_running("t1", "update_document", json!({})));
        transcript.set_tool_input_for("t1", json!({"new_content": "# A"}));
        transcript.set_tool_input_for("missing", json!({}));

        let HistoryCell::Tool { input, .. } = &transcript.cells()[0] else {
            panic!("tool cell");
        };
        assert_eq!(input, &json!({"new_content": "# A"}));
    }

    #[test]
    fn test_interrupt_marks_pending_user_request() {
        let mut transcript = TranscriptState::new();
        transcript.push_cell(HistoryCell::user("write a plan"));
        transcript.mark_interrupted();
        assert!(matches!(
            transcript.cells()[0],
            HistoryCell::User {
                is_interrupted: true,
                ..
            }
        ));
    }
}
