//! Native page rasterizer backed by the pdfium shared library.

use crate::compress::{PageRasterizer, RasterizerFactory};
use crate::error::PdfDeskError;
use image::RgbaImage;
use pdfium_render::prelude::*;

/// Holds a bound pdfium library and opens documents for rendering.
pub struct PdfiumRasterizer {
    pdfium: Pdfium,
}

impl PdfiumRasterizer {
    /// Bind pdfium from the system library path, falling back to the
    /// current directory.
    pub fn bind() -> Result<Self, PdfDeskError> {
        let bindings = Pdfium::bind_to_system_library()
            .or_else(|_| {
                Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            })
            .map_err(|e| PdfDeskError::Render(format!("Failed to bind pdfium library: {}", e)))?;
        Ok(Self {
            pdfium: Pdfium::new(bindings),
        })
    }
}

impl RasterizerFactory for PdfiumRasterizer {
    fn open<'a>(&'a self, pdf: &'a [u8]) -> Result<Box<dyn PageRasterizer + 'a>, PdfDeskError> {
        let document = self
            .pdfium
            .load_pdf_from_byte_slice(pdf, None)
            .map_err(|e| PdfDeskError::Render(format!("Failed to load PDF: {}", e)))?;
        Ok(Box::new(PdfiumDocument { document }))
    }
}

struct PdfiumDocument<'a> {
    document: PdfDocument<'a>,
}

impl PageRasterizer for PdfiumDocument<'_> {
    fn page_count(&self) -> usize {
        self.document.pages().len() as usize
    }

    fn render_page(&self, index: usize, scale: f32) -> Result<RgbaImage, PdfDeskError> {
        let page_index = u16::try_from(index)
            .map_err(|_| PdfDeskError::Render(format!("page {} out of range", index + 1)))?;
        let page = self
            .document
            .pages()
            .get(page_index)
            .map_err(|e| PdfDeskError::Render(format!("page {}: {}", index + 1, e)))?;

        let width = (page.width().value * scale).round().max(1.0) as i32;
        let height = (page.height().value * scale).round().max(1.0) as i32;
        let bitmap = page
            .render_with_config(
                &PdfRenderConfig::new()
                    .set_target_width(width)
                    .set_target_height(height)
                    .render_form_data(true)
                    .render_annotations(true),
            )
            .map_err(|e| PdfDeskError::Render(format!("page {}: {}", index + 1, e)))?;

        RgbaImage::from_raw(
            bitmap.width() as u32,
            bitmap.height() as u32,
            bitmap.as_rgba_bytes(),
        )
        .ok_or_else(|| PdfDeskError::Render(format!("page {}: bad bitmap size", index + 1)))
    }
}
