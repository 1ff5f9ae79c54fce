use std::fmt;

use crate::sheets::CellGrid;

/// Longest status the publisher accepts, in characters.
pub const MAX_STATUS_LEN: usize = 280; // wowee!

const LABEL: &str = "some cool data: ";

/// Text of a status update, never longer than [`MAX_STATUS_LEN`] characters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage(String);

impl StatusMessage {
    /// Hard cut at [`MAX_STATUS_LEN`] characters: no ellipsis, no word boundaries.
    pub fn new(text: impl Into<String>) -> Self {
        let mut text = text.into();
        if let Some((idx, _)) = text.char_indices().nth(MAX_STATUS_LEN) {
            text.truncate(idx);
        }
        Self(text)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StatusMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Placeholder policy: a fixed label followed by the whole grid as
/// `[[a b] [c d]]`.
pub fn format(grid: &CellGrid) -> StatusMessage {
    StatusMessage::new(format!("{}{}", LABEL, render_grid(grid)))
}

fn render_grid(grid: &CellGrid) -> String {
    let rows = grid
        .rows()
        .iter()
        .map(|row| format!("[{}]", row.join(" ")))
        .collect::<Vec<_>>();
    format!("[{}]", rows.join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_small_grid() {
        let grid = CellGrid::from_iter([vec!["a", "b"], vec!["c", "d"]]);
        assert_eq!(format(&grid).as_str(), "some cool data: [[a b] [c d]]");
    }

    #[test]
    fn ragged_and_empty_rows_keep_their_brackets() {
        let grid = CellGrid::from_iter([vec!["x"], vec![], vec!["y", "", "z"]]);
        assert_eq!(format(&grid).as_str(), "some cool data: [[x] [] [y  z]]");
    }

    #[test]
    fn long_output_is_cut_at_limit() {
        let grid = CellGrid::from_iter((0..100).map(|i| vec![format!("cell-{i}")]));
        let status = format(&grid);
        let full = format!("{}{}", LABEL, render_grid(&grid));

        assert_eq!(status.as_str().chars().count(), MAX_STATUS_LEN);
        assert!(full.starts_with(status.as_str()));
        assert_eq!(status, format(&grid));
    }

    #[test]
    fn short_text_is_untouched() {
        assert_eq!(StatusMessage::new("hi").as_str(), "hi");
        let exact = "x".repeat(MAX_STATUS_LEN);
        assert_eq!(StatusMessage::new(exact.clone()).as_str(), exact);
    }

    #[test]
    fn cut_counts_characters_not_bytes() {
        let text = "é".repeat(MAX_STATUS_LEN + 5);
        let status = StatusMessage::new(text);
        assert_eq!(status.as_str().chars().count(), MAX_STATUS_LEN);
        assert_eq!(status.as_str().len(), MAX_STATUS_LEN * 2);
    }
}
