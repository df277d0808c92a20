//! Delete/reorder directives typed into the page editing form
//!
//! The text carries one of two markers followed by a page range expression:
//! `"순서 변경: 3,1,2"` gives the complete new page order and
//! `"삭제: 2,4"` lists pages to drop.

use crate::error::PdfDeskError;
use crate::page_range::{parse_page_order, parse_page_ranges};

pub const REORDER_MARKER: &str = "순서 변경:";
pub const DELETE_MARKER: &str = "삭제:";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModifyPagesCommand {
    /// The complete new page order, as a range expression. Pages are taken
    /// in written order, so `"3,1-2"` puts page 3 first; unlisted pages are
    /// dropped.
    Reorder(String),
    /// Pages to remove, as a range expression
    Delete(String),
}

impl ModifyPagesCommand {
    /// Parse directive text. The reorder marker wins when both are present.
    pub fn parse(input: &str) -> Result<Self, PdfDeskError> {
        let text = input.to_lowercase();

        if let Some(expression) = text.split(REORDER_MARKER).nth(1) {
            return Ok(ModifyPagesCommand::Reorder(expression.trim().to_string()));
        }
        if let Some(expression) = text.split(DELETE_MARKER).nth(1) {
            return Ok(ModifyPagesCommand::Delete(expression.trim().to_string()));
        }

        Err(PdfDeskError::InvalidCommand(format!(
            "expected \"{}\" or \"{}\"",
            REORDER_MARKER, DELETE_MARKER
        )))
    }

    /// Resolve to the zero-based page order of the output document.
    pub fn resolve(&self, page_count: usize) -> Vec<usize> {
        match self {
            ModifyPagesCommand::Reorder(expression) => parse_page_order(expression, page_count),
            ModifyPagesCommand::Delete(expression) => {
                let removed = parse_page_ranges(expression, page_count);
                (0..page_count)
                    .filter(|index| removed.binary_search(index).is_err())
                    .collect()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_reorder() {
        let cmd = ModifyPagesCommand::parse("순서 변경: 3,1,2").unwrap();
        assert_eq!(cmd, ModifyPagesCommand::Reorder("3,1,2".into()));
    }

    #[test]
    fn test_parse_delete() {
        let cmd = ModifyPagesCommand::parse("삭제: 2, 4").unwrap();
        assert_eq!(cmd, ModifyPagesCommand::Delete("2, 4".into()));
    }

    #[test]
    fn test_parse_without_marker_fails() {
        let result = ModifyPagesCommand::parse("1,2,3");
        assert!(matches!(result, Err(PdfDeskError::InvalidCommand(_))));
    }

    #[test]
    fn test_reorder_marker_takes_precedence() {
        let cmd = ModifyPagesCommand::parse("삭제: 1 순서 변경: 2,1").unwrap();
        assert_eq!(cmd, ModifyPagesCommand::Reorder("2,1".into()));
    }

    #[test]
    fn test_delete_resolution_keeps_original_order() {
        let cmd = ModifyPagesCommand::Delete("2,4".into());
        assert_eq!(cmd.resolve(5), vec![0, 2, 3, 4]);
    }

    #[test]
    fn test_delete_ignores_out_of_range_pages() {
        let cmd = ModifyPagesCommand::Delete("0, 9".into());
        assert_eq!(cmd.resolve(3), vec![0, 1, 2]);
    }

    #[test]
    fn test_reorder_full_shuffle_is_verbatim() {
        let cmd = ModifyPagesCommand::Reorder("4,2,5,1,3".into());
        let order = cmd.resolve(5);
        assert_eq!(order, vec![3, 1, 4, 0, 2]);
        assert_eq!(order.len(), 5);
    }

    #[test]
    fn test_reorder_takes_written_order_and_drops_unlisted_pages() {
        let cmd = ModifyPagesCommand::Reorder("3,1-2".into());
        assert_eq!(cmd.resolve(4), vec![2, 0, 1]);
    }
}
