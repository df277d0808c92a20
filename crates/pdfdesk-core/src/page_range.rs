//! Page range parsing and serialization
//!
//! Converts user-entered expressions such as `"1, 3-5, 8"` into zero-based
//! page indices, and turns a preview selection back into that text form.
//! Parsing never fails: tokens that are not numbers, or that point outside
//! the document, are dropped.

use crate::command::{DELETE_MARKER, REORDER_MARKER};
use std::collections::BTreeSet;

/// A single comma-separated token of a range expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token {
    Single(i64),
    Range(i64, i64),
}

impl Token {
    fn parse(part: &str) -> Option<Self> {
        if part.contains('-') {
            // Only the first two pieces count, "1-2-3" reads as "1-2"
            let mut pieces = part.split('-');
            let start = pieces.next()?.trim().parse::<i64>().ok()?;
            let end = pieces.next()?.trim().parse::<i64>().ok()?;
            Some(Token::Range(start, end))
        } else {
            part.parse::<i64>().ok().map(Token::Single)
        }
    }

    /// Zero-based indices this token covers inside `1..=page_count`.
    /// A descending range covers nothing.
    fn indices(self, page_count: usize) -> impl Iterator<Item = usize> {
        let max = page_count as i64;
        let (start, end) = match self {
            Token::Single(page) => (page, page),
            Token::Range(start, end) => (start, end),
        };
        let first = start.max(1);
        let last = end.min(max);
        (first..=last).map(|page| (page - 1) as usize)
    }
}

fn tokens(expression: &str) -> impl Iterator<Item = Token> + '_ {
    expression
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .filter_map(Token::parse)
}

/// Parse a range expression into sorted, unique, zero-based page indices.
///
/// # Examples
/// ```
/// use pdfdesk_core::page_range::parse_page_ranges;
///
/// assert_eq!(parse_page_ranges("1,3-5,8", 10), vec![0, 2, 3, 4, 7]);
/// assert_eq!(parse_page_ranges("3-1", 10), Vec::<usize>::new());
/// assert_eq!(parse_page_ranges("abc,2", 5), vec![1]);
/// ```
pub fn parse_page_ranges(expression: &str, page_count: usize) -> Vec<usize> {
    let pages: BTreeSet<usize> = tokens(expression)
        .flat_map(|token| token.indices(page_count))
        .collect();
    pages.into_iter().collect()
}

/// Parse a range expression keeping the order in which pages are written.
///
/// Duplicates keep their first position. Used where the expression is a
/// page order rather than a set, e.g. `"3,1,2"` after a drag reorder.
pub fn parse_page_order(expression: &str, page_count: usize) -> Vec<usize> {
    let mut seen = BTreeSet::new();
    tokens(expression)
        .flat_map(|token| token.indices(page_count))
        .filter(|index| seen.insert(*index))
        .collect()
}

fn join(page_numbers: &[u32]) -> String {
    page_numbers
        .iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

/// Serialize selected 1-based page numbers as `"1,2,3"` (no range compression).
pub fn serialize_selection(page_numbers: &[u32]) -> String {
    join(page_numbers)
}

/// Serialize the full display order as a reorder directive.
pub fn serialize_reorder(page_numbers: &[u32]) -> String {
    format!("{} {}", REORDER_MARKER, join(page_numbers))
}

/// Serialize selected pages as a delete directive.
pub fn serialize_delete(page_numbers: &[u32]) -> String {
    format!("{} {}", DELETE_MARKER, join(page_numbers))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_mixed_tokens() {
        assert_eq!(parse_page_ranges("1,3-5,8", 10), vec![0, 2, 3, 4, 7]);
    }

    #[test]
    fn test_parse_descending_range_is_empty() {
        assert!(parse_page_ranges("3-1", 10).is_empty());
    }

    #[test]
    fn test_parse_out_of_bounds_dropped() {
        assert!(parse_page_ranges("0,11", 10).is_empty());
    }

    #[test]
    fn test_parse_invalid_token_dropped() {
        assert_eq!(parse_page_ranges("abc,2", 5), vec![1]);
    }

    #[test]
    fn test_parse_has_no_numeric_prefix_leniency() {
        assert_eq!(parse_page_ranges("3abc,1", 5), vec![0]);
        assert_eq!(parse_page_ranges("2.5", 5), Vec::<usize>::new());
        assert!(parse_page_order("1-3x", 5).is_empty());
    }

    #[test]
    fn test_parse_half_invalid_range_discarded_whole() {
        assert_eq!(parse_page_ranges("2-x, 4", 5), vec![3]);
        assert!(parse_page_ranges("-3", 5).is_empty());
    }

    #[test]
    fn test_parse_range_clamped_to_document() {
        assert_eq!(parse_page_ranges("0-3", 5), vec![0, 1, 2]);
        assert_eq!(parse_page_ranges("4-100", 5), vec![3, 4]);
    }

    #[test]
    fn test_parse_deduplicates_and_sorts() {
        assert_eq!(parse_page_ranges("5, 1-3, 2-4", 10), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_parse_whitespace_and_empty_tokens() {
        assert_eq!(parse_page_ranges("  2 ,, 3 - 4 ,", 10), vec![1, 2, 3]);
        assert!(parse_page_ranges("", 10).is_empty());
        assert!(parse_page_ranges("   ", 10).is_empty());
    }

    #[test]
    fn test_parse_extra_hyphen_uses_first_two_numbers() {
        assert_eq!(parse_page_ranges("1-2-3", 10), vec![0, 1]);
    }

    #[test]
    fn test_parse_empty_document() {
        assert!(parse_page_ranges("1-3", 0).is_empty());
    }

    #[test]
    fn test_parse_order_keeps_written_order() {
        assert_eq!(parse_page_order("3,1,2", 3), vec![2, 0, 1]);
        assert_eq!(parse_page_order("4-5, 1, 4", 5), vec![3, 4, 0]);
        assert_eq!(parse_page_order("9, 2", 3), vec![1]);
    }

    #[test]
    fn test_serialize_selection_has_no_range_compression() {
        assert_eq!(serialize_selection(&[1, 2, 3]), "1,2,3");
        assert_eq!(serialize_selection(&[]), "");
    }

    #[test]
    fn test_serialize_directives() {
        assert_eq!(serialize_reorder(&[3, 1, 2]), "순서 변경: 3,1,2");
        assert_eq!(serialize_delete(&[2, 4]), "삭제: 2,4");
    }

    #[test]
    fn test_selection_round_trip() {
        let text = serialize_selection(&[4, 2, 2, 7]);
        let parsed = parse_page_ranges(&text, 10);
        let one_based: Vec<u32> = parsed.iter().map(|i| *i as u32 + 1).collect();
        assert_eq!(one_based, vec![2, 4, 7]);
    }
}
