//! WASM bindings for the browser PDF toolbox
//!
//! All UI state is held in Rust by [`PdfDeskSession`]; JavaScript handles
//! DOM events, pdf.js page rendering and file downloads.
//!
//! ## Usage (JavaScript)
//!
//! ```javascript
//! import init, { PdfDeskSession } from './pkg/pdfdesk_wasm.js';
//!
//! await init();
//!
//! const session = new PdfDeskSession();
//! session.select("extract");
//! session.addFile(file.name, file.type, bytes);
//! session.togglePage(2);
//! const result = session.apply();
//! for (const toast of session.takeToasts()) showToast(toast.kind, toast.message);
//! if (result) downloadBlob(result, session.downloadName);
//! draw(session.render());
//! ```

pub mod session;

use pdfdesk_controller::{OperationDescriptor, OperationKind};
use wasm_bindgen::prelude::*;

pub use session::PdfDeskSession;

#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

#[wasm_bindgen]
pub fn get_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

/// Descriptors for the main menu, in display order.
#[wasm_bindgen]
pub fn list_operations() -> Result<JsValue, JsValue> {
    let descriptors: Vec<&OperationDescriptor> =
        OperationKind::ALL.iter().map(|kind| kind.descriptor()).collect();
    serde_wasm_bindgen::to_value(&descriptors)
        .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
}

/// Header and trailer check without parsing the document.
#[wasm_bindgen]
pub fn quick_validate(bytes: &[u8]) -> Result<(), JsValue> {
    pdfdesk_core::quick_validate(bytes).map_err(|e| JsValue::from_str(&e.to_string()))
}

#[wasm_bindgen]
pub fn get_pdf_info(bytes: &[u8]) -> Result<JsValue, JsValue> {
    let info = pdfdesk_core::validate_pdf(bytes).map_err(|e| JsValue::from_str(&e.to_string()))?;

    serde_wasm_bindgen::to_value(&info)
        .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
}

#[wasm_bindgen]
pub fn get_page_count(bytes: &[u8]) -> Result<usize, JsValue> {
    pdfdesk_core::get_page_count(bytes).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Format bytes as human-readable string
#[wasm_bindgen]
pub fn format_bytes(bytes: usize) -> String {
    const KB: usize = 1024;
    const MB: usize = KB * 1024;

    if bytes < KB {
        format!("{} B", bytes)
    } else if bytes < MB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_version() {
        assert!(!get_version().is_empty());
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(500), "500 B");
        assert_eq!(format_bytes(1024), "1.0 KB");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(2621440), "2.5 MB");
    }
}
