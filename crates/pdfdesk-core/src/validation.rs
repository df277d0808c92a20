//! Input checks and document info
//!
//! Used by hosts when a file is picked, before any operation runs.

use crate::error::PdfDeskError;
use lopdf::{Document, Object};
use serde::Serialize;

/// Facts about a picked PDF shown next to the file input.
#[derive(Debug, Clone, Serialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PdfInfo {
    pub page_count: usize,
    /// Header version, e.g. "1.7"
    pub version: String,
    pub encrypted: bool,
    pub size_bytes: usize,
    pub title: Option<String>,
    pub author: Option<String>,
}

/// Parse a PDF and report its page count and metadata.
///
/// Encrypted documents are reported rather than rejected; whether they can
/// be processed depends on the operation.
pub fn validate_pdf(bytes: &[u8]) -> Result<PdfInfo, PdfDeskError> {
    quick_check_header(bytes)?;
    let version = extract_version(bytes);

    let document = Document::load_mem(bytes).map_err(|e| PdfDeskError::ParseError(e.to_string()))?;
    let page_count = document.get_pages().len();
    if page_count == 0 {
        return Err(PdfDeskError::ParseError("PDF has no pages".into()));
    }

    let info = info_dictionary(&document);
    Ok(PdfInfo {
        page_count,
        version,
        encrypted: document.is_encrypted(),
        size_bytes: bytes.len(),
        title: info.and_then(|dict| text_entry(dict, b"Title")),
        author: info.and_then(|dict| text_entry(dict, b"Author")),
    })
}

/// Header and trailer sanity check without parsing the document.
pub fn quick_validate(bytes: &[u8]) -> Result<(), PdfDeskError> {
    quick_check_header(bytes)?;

    let tail = &bytes[bytes.len().saturating_sub(1024)..];
    if !tail.windows(5).any(|w| w == b"%%EOF") {
        return Err(PdfDeskError::ParseError(
            "PDF appears truncated (missing %%EOF marker)".into(),
        ));
    }
    Ok(())
}

fn quick_check_header(bytes: &[u8]) -> Result<(), PdfDeskError> {
    if bytes.len() < 8 {
        return Err(PdfDeskError::ParseError("File too small to be a valid PDF".into()));
    }
    if !bytes.starts_with(b"%PDF-") {
        return Err(PdfDeskError::ParseError(
            "Not a valid PDF file (missing %PDF- header)".into(),
        ));
    }
    Ok(())
}

/// Version from the `%PDF-x.y` header, "1.4" when unreadable.
fn extract_version(bytes: &[u8]) -> String {
    bytes
        .get(5..8)
        .and_then(|v| std::str::from_utf8(v).ok())
        .map(|v| v.trim().to_string())
        .unwrap_or_else(|| "1.4".to_string())
}

fn info_dictionary(document: &Document) -> Option<&lopdf::Dictionary> {
    let id = document.trailer.get(b"Info").and_then(Object::as_reference).ok()?;
    document.get_object(id).and_then(Object::as_dict).ok()
}

fn text_entry(dict: &lopdf::Dictionary, key: &[u8]) -> Option<String> {
    let bytes = dict.get(key).and_then(Object::as_str).ok()?;
    let text = decode_text_string(bytes);
    (!text.is_empty()).then_some(text)
}

/// PDF text strings are UTF-16BE with a BOM, or PDFDocEncoding (treated as
/// Latin-1 here).
fn decode_text_string(bytes: &[u8]) -> String {
    if let Some(utf16) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = utf16
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        String::from_utf16_lossy(&units)
    } else {
        bytes.iter().map(|&b| b as char).collect()
    }
}
