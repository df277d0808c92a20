//! Page selection: extract, delete and reorder
//!
//! All three build the output by "construction by whitelist": the source is
//! loaded once, the page tree is replaced by the wanted pages in the wanted
//! order, and everything no longer reachable is pruned.

use crate::command::ModifyPagesCommand;
use crate::document::{self, rebuild_page_tree};
use crate::error::PdfDeskError;
use crate::page_range::parse_page_ranges;

/// Build a new document from the zero-based `order` of source pages.
pub fn copy_pages(bytes: &[u8], order: &[usize]) -> Result<Vec<u8>, PdfDeskError> {
    if order.is_empty() {
        return Err(PdfDeskError::NoValidPages);
    }

    let mut doc = document::load(bytes)?;
    let page_ids = document::page_ids(&doc);

    let selected = order
        .iter()
        .map(|&index| {
            page_ids.get(index).copied().ok_or_else(|| {
                PdfDeskError::OperationError(format!(
                    "Page {} does not exist (document has {} pages)",
                    index + 1,
                    page_ids.len()
                ))
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    rebuild_page_tree(&mut doc, &selected)?;
    doc.compress();

    document::save(&mut doc)
}

/// Extract the pages named by a range expression, in ascending order.
pub fn extract_pages(bytes: &[u8], ranges: &str) -> Result<Vec<u8>, PdfDeskError> {
    let page_count = crate::get_page_count(bytes)?;
    let indices = parse_page_ranges(ranges, page_count);
    if indices.is_empty() {
        return Err(PdfDeskError::NoValidPages);
    }
    tracing::debug!(pages = indices.len(), page_count, "extracting pages");
    copy_pages(bytes, &indices)
}

/// Apply a delete or reorder directive.
pub fn modify_pages(bytes: &[u8], command: &ModifyPagesCommand) -> Result<Vec<u8>, PdfDeskError> {
    let page_count = crate::get_page_count(bytes)?;
    let order = command.resolve(page_count);
    tracing::debug!(?command, kept = order.len(), page_count, "modifying pages");
    copy_pages(bytes, &order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{create_test_pdf, page_labels};
    use lopdf::Document;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_copy_empty_order_fails() {
        let pdf = create_test_pdf(5);
        assert!(matches!(
            copy_pages(&pdf, &[]),
            Err(PdfDeskError::NoValidPages)
        ));
    }

    #[test]
    fn test_copy_out_of_range_index_fails() {
        let pdf = create_test_pdf(5);
        assert!(copy_pages(&pdf, &[9]).is_err());
    }

    #[test]
    fn test_extract_single_page() {
        let pdf = create_test_pdf(5);
        let result = extract_pages(&pdf, "3").unwrap();
        assert_eq!(page_labels(&result), vec!["Page 3"]);
    }

    #[test]
    fn test_extract_is_ascending_whatever_the_input_order() {
        let pdf = create_test_pdf(10);
        let result = extract_pages(&pdf, "8, 1, 3-5").unwrap();
        assert_eq!(
            page_labels(&result),
            vec!["Page 1", "Page 3", "Page 4", "Page 5", "Page 8"]
        );
    }

    #[test]
    fn test_extract_nothing_valid_fails() {
        let pdf = create_test_pdf(5);
        let result = extract_pages(&pdf, "0, 6-9, abc");
        assert!(matches!(result, Err(PdfDeskError::NoValidPages)));
    }

    #[test]
    fn test_extract_output_is_smaller_document() {
        let pdf = create_test_pdf(10);
        let result = extract_pages(&pdf, "2-3").unwrap();
        let doc = Document::load_mem(&result).unwrap();
        assert_eq!(doc.get_pages().len(), 2);
    }

    #[test]
    fn test_delete_directive() {
        let pdf = create_test_pdf(5);
        let command = ModifyPagesCommand::parse("삭제: 2,4").unwrap();
        let result = modify_pages(&pdf, &command).unwrap();
        assert_eq!(
            page_labels(&result),
            vec!["Page 1", "Page 3", "Page 5"]
        );
    }

    #[test]
    fn test_reorder_directive() {
        let pdf = create_test_pdf(3);
        let command = ModifyPagesCommand::parse("순서 변경: 3,1,2").unwrap();
        let result = modify_pages(&pdf, &command).unwrap();
        assert_eq!(page_labels(&result), vec!["Page 3", "Page 1", "Page 2"]);
    }

    #[test]
    fn test_deleting_every_page_fails() {
        let pdf = create_test_pdf(2);
        let command = ModifyPagesCommand::parse("삭제: 1-2").unwrap();
        assert!(matches!(
            modify_pages(&pdf, &command),
            Err(PdfDeskError::NoValidPages)
        ));
    }
}
