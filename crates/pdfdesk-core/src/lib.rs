//! Client-side PDF toolkit operations
//!
//! Everything here works on in-memory byte buffers using lopdf: merging,
//! page extraction and reordering, watermarking, image conversion,
//! rasterizing compression and password removal, plus the page-range
//! expressions the UI uses to describe page selections.
//!
//! Page rendering is not done by this crate. Compression goes through the
//! [`PageRasterizer`] trait; hosts either hand in pre-rendered pages or
//! enable the `pdfium` feature.

pub mod command;
pub mod compress;
pub mod document;
pub mod error;
pub mod images;
pub mod merge;
pub mod page_range;
pub mod security;
pub mod split;
pub mod unlock;
pub mod validation;
pub mod watermark;

#[cfg(any(test, feature = "test-fixtures"))]
pub mod fixtures;

#[cfg(feature = "pdfium")]
pub mod pdfium;

pub use command::{ModifyPagesCommand, DELETE_MARKER, REORDER_MARKER};
pub use compress::{compress_document, PageRasterizer, PrerenderedPages, Quality, RasterizerFactory};
pub use error::PdfDeskError;
pub use images::{images_to_pdf, ImageKind};
pub use merge::{add_cover, merge_documents};
pub use page_range::{
    parse_page_order, parse_page_ranges, serialize_delete, serialize_reorder, serialize_selection,
};
pub use security::SecurityHandler;
pub use split::{copy_pages, extract_pages, modify_pages};
pub use unlock::unlock_document;
pub use validation::{quick_validate, validate_pdf, PdfInfo};
pub use watermark::add_watermark;

/// Parse PDF bytes and return page count
pub fn get_page_count(bytes: &[u8]) -> Result<usize, PdfDeskError> {
    let doc = document::load(bytes)?;
    Ok(doc.get_pages().len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::create_test_pdf;

    #[test]
    fn test_get_page_count() {
        assert_eq!(get_page_count(&create_test_pdf(7)).unwrap(), 7);
    }

    #[test]
    fn test_get_page_count_rejects_garbage() {
        assert!(matches!(
            get_page_count(b"%PDF-1.7 nonsense"),
            Err(PdfDeskError::ParseError(_))
        ));
    }

    #[test]
    fn test_extract_then_count() {
        let pdf = create_test_pdf(10);
        let extracted = extract_pages(&pdf, "1,3-5,8").unwrap();
        assert_eq!(get_page_count(&extracted).unwrap(), 5);
    }
}
