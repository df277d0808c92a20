//! Image embedding and image-to-PDF conversion
//!
//! JPEG data is embedded as-is with `DCTDecode`. Other formats are decoded
//! and stored as Flate-compressed samples, with any alpha channel split into
//! a soft mask.

use crate::document::DocumentBuilder;
use crate::error::PdfDeskError;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use image::{DynamicImage, GenericImageView};
use lopdf::{dictionary, Document, Object, ObjectId, Stream};
use std::io::Write;

/// Image encodings accepted for conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Png,
    Jpeg,
}

impl ImageKind {
    /// Pick the decoder from a MIME type such as `image/png`.
    pub fn from_media_type(media_type: &str) -> Result<Self, PdfDeskError> {
        match media_type.trim().to_ascii_lowercase().as_str() {
            "image/png" => Ok(ImageKind::Png),
            "image/jpeg" | "image/jpg" | "image/pjpeg" => Ok(ImageKind::Jpeg),
            other => Err(PdfDeskError::UnsupportedImage(format!(
                "unsupported media type '{}'",
                other
            ))),
        }
    }
}

/// An image XObject added to a document, with its pixel size.
#[derive(Debug, Clone, Copy)]
pub struct EmbeddedImage {
    pub id: ObjectId,
    pub width: u32,
    pub height: u32,
}

/// Convert images into a PDF with one page per image, each page exactly the
/// image's pixel size.
///
/// `progress` is called with `(images_done, images_total)` after each page.
pub fn images_to_pdf(
    images: &[(ImageKind, &[u8])],
    progress: &mut dyn FnMut(usize, usize),
) -> Result<Vec<u8>, PdfDeskError> {
    if images.is_empty() {
        return Err(PdfDeskError::UnsupportedImage("no images given".into()));
    }

    let mut builder = DocumentBuilder::new();
    let total = images.len();
    for (i, (kind, bytes)) in images.iter().enumerate() {
        let embedded = match kind {
            ImageKind::Jpeg => embed_jpeg(builder.document_mut(), bytes)?,
            ImageKind::Png => embed_png(builder.document_mut(), bytes)?,
        };
        builder.add_image_page(
            embedded.width as f32,
            embedded.height as f32,
            embedded.id,
        )?;
        tracing::debug!(
            image = i + 1,
            width = embedded.width,
            height = embedded.height,
            "added image page"
        );
        progress(i + 1, total);
    }

    builder.finish()
}

/// Embed JPEG bytes unchanged.
pub fn embed_jpeg(doc: &mut Document, bytes: &[u8]) -> Result<EmbeddedImage, PdfDeskError> {
    let info = jpeg_info(bytes)?;
    let color_space = match info.components {
        1 => "DeviceGray",
        3 => "DeviceRGB",
        4 => "DeviceCMYK",
        n => {
            return Err(PdfDeskError::UnsupportedImage(format!(
                "JPEG with {} colour components",
                n
            )))
        }
    };

    let mut dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => info.width as i64,
        "Height" => info.height as i64,
        "ColorSpace" => color_space,
        "BitsPerComponent" => 8,
        "Filter" => "DCTDecode",
    };
    if info.components == 4 && info.adobe_inverted {
        // Adobe CMYK JPEGs store inverted samples
        dict.set(
            "Decode",
            vec![
                1.into(),
                0.into(),
                1.into(),
                0.into(),
                1.into(),
                0.into(),
                1.into(),
                0.into(),
            ],
        );
    }

    // DCT data is already compressed; keep lopdf from deflating it again
    let stream = Stream::new(dict, bytes.to_vec()).with_compression(false);
    let id = doc.add_object(stream);
    Ok(EmbeddedImage {
        id,
        width: info.width,
        height: info.height,
    })
}

/// Decode PNG (or any format the `image` crate reads) and embed its samples.
pub fn embed_png(doc: &mut Document, bytes: &[u8]) -> Result<EmbeddedImage, PdfDeskError> {
    let decoded = image::load_from_memory(bytes)
        .map_err(|e| PdfDeskError::UnsupportedImage(e.to_string()))?;
    embed_decoded(doc, &decoded)
}

/// Embed an already decoded image as Flate-compressed samples.
pub fn embed_decoded(doc: &mut Document, img: &DynamicImage) -> Result<EmbeddedImage, PdfDeskError> {
    let (width, height) = img.dimensions();
    let color = img.color();
    let grey = !color.has_color();

    let (color_space, samples) = if grey {
        ("DeviceGray", img.to_luma8().into_raw())
    } else {
        ("DeviceRGB", img.to_rgb8().into_raw())
    };

    let smask = if color.has_alpha() {
        let alpha: Vec<u8> = img.to_rgba8().pixels().map(|p| p.0[3]).collect();
        let mask = flate_stream(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => width as i64,
                "Height" => height as i64,
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 8,
            },
            &alpha,
        )?;
        Some(doc.add_object(mask))
    } else {
        None
    };

    let mut dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => width as i64,
        "Height" => height as i64,
        "ColorSpace" => color_space,
        "BitsPerComponent" => 8,
    };
    if let Some(mask_id) = smask {
        dict.set("SMask", Object::Reference(mask_id));
    }

    let id = doc.add_object(flate_stream(dict, &samples)?);
    Ok(EmbeddedImage { id, width, height })
}

fn flate_stream(mut dict: lopdf::Dictionary, data: &[u8]) -> Result<Stream, PdfDeskError> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(data)
        .and_then(|_| encoder.finish())
        .map(|compressed| {
            dict.set("Filter", "FlateDecode");
            Stream::new(dict, compressed).with_compression(false)
        })
        .map_err(|e| PdfDeskError::OperationError(format!("Failed to compress image: {}", e)))
}

/// Frame header facts needed to embed a JPEG.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JpegInfo {
    pub width: u32,
    pub height: u32,
    pub components: u8,
    pub adobe_inverted: bool,
}

/// Scan JPEG markers up to the first start-of-frame segment.
pub fn jpeg_info(bytes: &[u8]) -> Result<JpegInfo, PdfDeskError> {
    let invalid = |msg: &str| PdfDeskError::UnsupportedImage(format!("invalid JPEG: {}", msg));

    if bytes.len() < 4 || bytes[0] != 0xFF || bytes[1] != 0xD8 {
        return Err(invalid("missing SOI marker"));
    }

    let mut adobe = false;
    let mut pos = 2;
    while pos + 4 <= bytes.len() {
        if bytes[pos] != 0xFF {
            return Err(invalid("marker expected"));
        }
        let marker = bytes[pos + 1];
        // Fill bytes and standalone markers carry no length
        if marker == 0xFF {
            pos += 1;
            continue;
        }
        if marker == 0x01 || (0xD0..=0xD7).contains(&marker) {
            pos += 2;
            continue;
        }

        let length = u16::from_be_bytes([bytes[pos + 2], bytes[pos + 3]]) as usize;
        let segment = bytes
            .get(pos + 4..pos + 2 + length)
            .ok_or_else(|| invalid("truncated segment"))?;

        match marker {
            // APP14 "Adobe"
            0xEE if segment.starts_with(b"Adobe") => adobe = true,
            // SOF0..SOF15 except DHT (C4), JPG (C8) and DAC (CC)
            0xC0..=0xCF if !matches!(marker, 0xC4 | 0xC8 | 0xCC) => {
                if segment.len() < 6 {
                    return Err(invalid("short frame header"));
                }
                let height = u16::from_be_bytes([segment[1], segment[2]]) as u32;
                let width = u16::from_be_bytes([segment[3], segment[4]]) as u32;
                if width == 0 || height == 0 {
                    return Err(invalid("zero dimension"));
                }
                return Ok(JpegInfo {
                    width,
                    height,
                    components: segment[5],
                    adobe_inverted: adobe,
                });
            }
            0xDA => break,
            _ => {}
        }
        pos += 2 + length;
    }

    Err(invalid("no frame header"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{create_jpeg, create_png, create_png_with_alpha};

    fn page_sizes(bytes: &[u8]) -> Vec<(f32, f32)> {
        let doc = Document::load_mem(bytes).unwrap();
        doc.get_pages()
            .into_values()
            .map(|id| crate::document::page_size(&doc, id))
            .collect()
    }

    #[test]
    fn test_media_type_detection() {
        assert_eq!(ImageKind::from_media_type("image/png").unwrap(), ImageKind::Png);
        assert_eq!(ImageKind::from_media_type("image/jpeg").unwrap(), ImageKind::Jpeg);
        assert_eq!(ImageKind::from_media_type("IMAGE/JPG").unwrap(), ImageKind::Jpeg);
        assert!(ImageKind::from_media_type("image/gif").is_err());
    }

    #[test]
    fn test_jpeg_info_reads_frame_header() {
        let jpeg = create_jpeg(40, 25);
        let info = jpeg_info(&jpeg).unwrap();
        assert_eq!((info.width, info.height, info.components), (40, 25, 3));
    }

    #[test]
    fn test_jpeg_info_rejects_png() {
        assert!(jpeg_info(&create_png(4, 4)).is_err());
        assert!(jpeg_info(b"").is_err());
    }

    #[test]
    fn test_pages_match_image_pixel_sizes() {
        let jpeg = create_jpeg(120, 80);
        let png = create_png(30, 60);
        let mut reports = Vec::new();

        let pdf = images_to_pdf(
            &[(ImageKind::Jpeg, jpeg.as_slice()), (ImageKind::Png, png.as_slice())],
            &mut |done, total| reports.push((done, total)),
        )
        .unwrap();

        assert_eq!(page_sizes(&pdf), vec![(120.0, 80.0), (30.0, 60.0)]);
        assert_eq!(reports, vec![(1, 2), (2, 2)]);
    }

    #[test]
    fn test_png_alpha_becomes_soft_mask() {
        let mut doc = Document::with_version("1.7");
        let embedded = embed_png(&mut doc, &create_png_with_alpha(8, 8)).unwrap();
        let stream = doc.get_object(embedded.id).unwrap().as_stream().unwrap();
        assert!(stream.dict.get(b"SMask").is_ok());
    }

    #[test]
    fn test_corrupt_image_fails() {
        let result = images_to_pdf(&[(ImageKind::Png, b"not a png".as_slice())], &mut |_, _| {});
        assert!(matches!(result, Err(PdfDeskError::UnsupportedImage(_))));
    }

    #[test]
    fn test_no_images_fails() {
        assert!(images_to_pdf(&[], &mut |_, _| {}).is_err());
    }
}
