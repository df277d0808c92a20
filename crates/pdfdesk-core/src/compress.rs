//! Lossy compression by rasterization
//!
//! Every page is rendered to pixels, re-encoded as JPEG at the requested
//! quality and placed on a new page of the same pixel size. Text and vector
//! content are flattened in the process.

use crate::document::DocumentBuilder;
use crate::error::PdfDeskError;
use crate::images::embed_jpeg;
use image::codecs::jpeg::JpegEncoder;
use image::{Rgb, RgbImage, RgbaImage};
use std::fmt;
use std::str::FromStr;

/// Scale at which pages are rendered for compression (1 pixel per point).
pub const RENDER_SCALE: f32 = 1.0;

/// Renders pages of one loaded document to RGBA pixels.
pub trait PageRasterizer {
    fn page_count(&self) -> usize;

    /// Render the zero-based page `index` at `scale` pixels per point.
    fn render_page(&self, index: usize, scale: f32) -> Result<RgbaImage, PdfDeskError>;
}

impl<R: PageRasterizer + ?Sized> PageRasterizer for &R {
    fn page_count(&self) -> usize {
        (**self).page_count()
    }

    fn render_page(&self, index: usize, scale: f32) -> Result<RgbaImage, PdfDeskError> {
        (**self).render_page(index, scale)
    }
}

/// Opens a rasterizer over PDF bytes.
pub trait RasterizerFactory {
    fn open<'a>(&'a self, pdf: &'a [u8]) -> Result<Box<dyn PageRasterizer + 'a>, PdfDeskError>;
}

/// Page images rendered elsewhere (pdf.js in the browser) at scale 1.
#[derive(Debug, Clone, Default)]
pub struct PrerenderedPages {
    pages: Vec<RgbaImage>,
}

impl PrerenderedPages {
    pub fn new(pages: Vec<RgbaImage>) -> Self {
        Self { pages }
    }

    /// Build from raw RGBA buffers as produced by a canvas `ImageData`.
    pub fn push_rgba(&mut self, width: u32, height: u32, data: Vec<u8>) -> Result<(), PdfDeskError> {
        let image = RgbaImage::from_raw(width, height, data).ok_or_else(|| {
            PdfDeskError::Render(format!(
                "pixel buffer does not match {}x{} RGBA",
                width, height
            ))
        })?;
        self.pages.push(image);
        Ok(())
    }

    pub fn clear(&mut self) {
        self.pages.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

impl PageRasterizer for PrerenderedPages {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn render_page(&self, index: usize, scale: f32) -> Result<RgbaImage, PdfDeskError> {
        if (scale - RENDER_SCALE).abs() > f32::EPSILON {
            return Err(PdfDeskError::Render(format!(
                "pre-rendered pages are only available at scale {}",
                RENDER_SCALE
            )));
        }
        self.pages
            .get(index)
            .cloned()
            .ok_or_else(|| PdfDeskError::Render(format!("page {} was not rendered", index + 1)))
    }
}

/// The renderings must cover every page of the document being compressed.
impl RasterizerFactory for PrerenderedPages {
    fn open<'a>(&'a self, pdf: &'a [u8]) -> Result<Box<dyn PageRasterizer + 'a>, PdfDeskError> {
        if self.pages.is_empty() {
            return Err(PdfDeskError::Render("no rendered pages available".into()));
        }
        let page_count = crate::get_page_count(pdf)?;
        if page_count != self.pages.len() {
            return Err(PdfDeskError::Render(format!(
                "{} rendered pages for a {}-page document",
                self.pages.len(),
                page_count
            )));
        }
        Ok(Box::new(self))
    }
}

/// JPEG quality, 1 (smallest) to 100 (best).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(u8);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualityOutOfRange;

impl fmt::Display for QualityOutOfRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "quality must be an integer between 1 and 100")
    }
}

impl std::error::Error for QualityOutOfRange {}

impl Quality {
    pub const DEFAULT: Quality = Quality(75);

    pub fn new(value: u8) -> Result<Self, QualityOutOfRange> {
        if (1..=100).contains(&value) {
            Ok(Quality(value))
        } else {
            Err(QualityOutOfRange)
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Quality::DEFAULT
    }
}

impl FromStr for Quality {
    type Err = QualityOutOfRange;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: i64 = s.trim().parse().map_err(|_| QualityOutOfRange)?;
        u8::try_from(value)
            .map_err(|_| QualityOutOfRange)
            .and_then(Quality::new)
    }
}

/// Rebuild the rasterizer's document as one JPEG image per page.
///
/// `progress` is called with `(pages_done, pages_total)` after each page.
pub fn compress_document(
    rasterizer: &dyn PageRasterizer,
    quality: Quality,
    progress: &mut dyn FnMut(usize, usize),
) -> Result<Vec<u8>, PdfDeskError> {
    let total = rasterizer.page_count();
    if total == 0 {
        return Err(PdfDeskError::NoValidPages);
    }

    let mut builder = DocumentBuilder::new();
    for index in 0..total {
        let rendered = rasterizer.render_page(index, RENDER_SCALE)?;
        let jpeg = encode_jpeg(&rendered, quality)?;
        let embedded = embed_jpeg(builder.document_mut(), &jpeg)?;
        builder.add_image_page(embedded.width as f32, embedded.height as f32, embedded.id)?;

        tracing::debug!(
            page = index + 1,
            total,
            jpeg_bytes = jpeg.len(),
            "compressed page"
        );
        progress(index + 1, total);
    }

    builder.finish()
}

/// Encode as baseline JPEG, compositing transparency onto white.
pub fn encode_jpeg(image: &RgbaImage, quality: Quality) -> Result<Vec<u8>, PdfDeskError> {
    let flattened = RgbImage::from_fn(image.width(), image.height(), |x, y| {
        let [r, g, b, a] = image.get_pixel(x, y).0;
        let blend = |c: u8| ((c as u16 * a as u16 + 255 * (255 - a as u16)) / 255) as u8;
        Rgb([blend(r), blend(g), blend(b)])
    });

    let mut buffer = Vec::new();
    JpegEncoder::new_with_quality(&mut buffer, quality.get())
        .encode_image(&flattened)
        .map_err(|e| PdfDeskError::Render(format!("JPEG encoding failed: {}", e)))?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;
    use lopdf::{Document, Object};
    use pretty_assertions::assert_eq;

    fn noisy_page(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_fn(width, height, |x, y| {
            let v = ((x * 31 + y * 17) ^ (x * y)) as u8;
            Rgba([v, v.wrapping_mul(3), v.wrapping_add(90), 255])
        })
    }

    fn pages(sizes: &[(u32, u32)]) -> PrerenderedPages {
        PrerenderedPages::new(sizes.iter().map(|&(w, h)| noisy_page(w, h)).collect())
    }

    #[test]
    fn test_quality_parsing() {
        assert_eq!("75".parse::<Quality>().unwrap().get(), 75);
        assert_eq!(" 1 ".parse::<Quality>().unwrap().get(), 1);
        assert_eq!("100".parse::<Quality>().unwrap().get(), 100);
        for bad in ["0", "101", "-5", "abc", "", "50.5", "300"] {
            assert!(bad.parse::<Quality>().is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn test_one_jpeg_page_per_rendered_page() {
        let source = pages(&[(200, 100), (50, 80)]);
        let mut reports = Vec::new();

        let pdf = compress_document(&source, Quality::DEFAULT, &mut |done, total| {
            reports.push((done, total))
        })
        .unwrap();

        let doc = Document::load_mem(&pdf).unwrap();
        let sizes: Vec<(f32, f32)> = doc
            .get_pages()
            .into_values()
            .map(|id| crate::document::page_size(&doc, id))
            .collect();
        assert_eq!(sizes, vec![(200.0, 100.0), (50.0, 80.0)]);
        assert_eq!(reports, vec![(1, 2), (2, 2)]);

        let jpeg_streams = doc
            .objects
            .values()
            .filter_map(|obj| obj.as_stream().ok())
            .filter(|s| {
                s.dict
                    .get(b"Filter")
                    .and_then(Object::as_name)
                    .map(|name| name == b"DCTDecode")
                    .unwrap_or(false)
            })
            .count();
        assert_eq!(jpeg_streams, 2);
    }

    #[test]
    fn test_lower_quality_gives_smaller_output() {
        let source = pages(&[(300, 300)]);
        let low = compress_document(&source, Quality::new(10).unwrap(), &mut |_, _| {}).unwrap();
        let high = compress_document(&source, Quality::new(95).unwrap(), &mut |_, _| {}).unwrap();
        assert!(low.len() < high.len());
    }

    #[test]
    fn test_renderings_must_match_document_pages() {
        let source = pages(&[(40, 40)]);
        let pdf = crate::fixtures::create_test_pdf(5);

        let err = source.open(&pdf).err().unwrap();
        assert!(matches!(err, PdfDeskError::Render(_)));
        assert_eq!(
            err.to_string(),
            "Page rendering failed: 1 rendered pages for a 5-page document"
        );

        let matching = pages(&[(40, 40); 5]);
        let rasterizer = matching.open(&pdf).unwrap();
        assert_eq!(rasterizer.page_count(), 5);
    }

    #[test]
    fn test_empty_document_fails() {
        let source = PrerenderedPages::default();
        assert!(matches!(
            compress_document(&source, Quality::DEFAULT, &mut |_, _| {}),
            Err(PdfDeskError::NoValidPages)
        ));
        assert!(source.open(b"%PDF-1.7").is_err());
    }

    #[test]
    fn test_prerendered_pages_reject_other_scales_and_indices() {
        let source = pages(&[(10, 10)]);
        assert!(source.render_page(0, 2.0).is_err());
        assert!(source.render_page(1, RENDER_SCALE).is_err());
        assert_eq!(source.render_page(0, RENDER_SCALE).unwrap().width(), 10);
    }

    #[test]
    fn test_push_rgba_checks_buffer_length() {
        let mut source = PrerenderedPages::default();
        assert!(source.push_rgba(2, 2, vec![0; 16]).is_ok());
        assert!(source.push_rgba(2, 2, vec![0; 15]).is_err());
        assert_eq!(source.page_count(), 1);
    }

    #[test]
    fn test_transparent_pixels_flatten_to_white() {
        let clear = RgbaImage::from_pixel(8, 8, Rgba([0, 0, 0, 0]));
        let jpeg = encode_jpeg(&clear, Quality::new(100).unwrap()).unwrap();
        let decoded = image::load_from_memory(&jpeg).unwrap().to_rgb8();
        assert!(decoded.get_pixel(4, 4).0.iter().all(|&c| c > 245));
    }
}
