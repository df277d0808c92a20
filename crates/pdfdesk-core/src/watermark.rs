//! Diagonal text watermark
//!
//! Every page gets the same text drawn across its centre in translucent red
//! Helvetica, rotated by -45 degrees. The original page content is wrapped
//! in `q`/`Q` so its graphics state cannot leak into the watermark.

use crate::document::{self, effective_resources};
use crate::error::PdfDeskError;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat};

pub const FONT_SIZE: f32 = 50.0;
pub const OPACITY: f32 = 0.2;
pub const ROTATION_DEGREES: f32 = -45.0;
pub const COLOR: (f32, f32, f32) = (0.95, 0.1, 0.1);

const FONT_RESOURCE: &str = "PdfDeskWmFont";
const STATE_RESOURCE: &str = "PdfDeskWmGs";

/// Helvetica cap height in glyph units
const CAP_HEIGHT: f32 = 718.0;

/// Stamp `text` onto every page of the document.
pub fn add_watermark(bytes: &[u8], text: &str) -> Result<Vec<u8>, PdfDeskError> {
    let encoded = encode_win_ansi(text)?;
    let mut doc = document::load(bytes)?;

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let state_id = doc.add_object(dictionary! {
        "Type" => "ExtGState",
        "ca" => OPACITY,
        "CA" => OPACITY,
    });

    let text_width = text_width(&encoded, FONT_SIZE);
    let pages = document::page_ids(&doc);
    for &page_id in &pages {
        let (width, height) = document::page_size(&doc, page_id);
        let overlay = overlay_content(&encoded, text_width, width, height)?;
        stamp_page(&mut doc, page_id, font_id, state_id, overlay)?;
    }

    tracing::debug!(pages = pages.len(), "watermarked document");
    doc.compress();
    document::save(&mut doc)
}

/// Content stream drawing the watermark centred on a `width` x `height` page.
fn overlay_content(
    encoded: &[u8],
    text_width: f32,
    width: f32,
    height: f32,
) -> Result<Vec<u8>, PdfDeskError> {
    let angle = ROTATION_DEGREES.to_radians();
    let (sin, cos) = angle.sin_cos();
    let half_width = text_width / 2.0;
    let half_height = CAP_HEIGHT / 1000.0 * FONT_SIZE / 2.0;

    // Shift the baseline origin so the rotated text box is centred
    let x = width / 2.0 - (half_width * cos - half_height * sin);
    let y = height / 2.0 - (half_width * sin + half_height * cos);

    let (r, g, b) = COLOR;
    let content = Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new("gs", vec![Object::Name(STATE_RESOURCE.into())]),
            Operation::new("rg", vec![r.into(), g.into(), b.into()]),
            Operation::new("BT", vec![]),
            Operation::new(
                "Tf",
                vec![Object::Name(FONT_RESOURCE.into()), FONT_SIZE.into()],
            ),
            Operation::new(
                "Tm",
                vec![
                    cos.into(),
                    sin.into(),
                    (-sin).into(),
                    cos.into(),
                    x.into(),
                    y.into(),
                ],
            ),
            Operation::new(
                "Tj",
                vec![Object::String(encoded.to_vec(), StringFormat::Literal)],
            ),
            Operation::new("ET", vec![]),
            Operation::new("Q", vec![]),
        ],
    };
    content
        .encode()
        .map_err(|e| PdfDeskError::OperationError(e.to_string()))
}

/// Register the watermark resources on a page and append the overlay.
fn stamp_page(
    doc: &mut Document,
    page_id: ObjectId,
    font_id: ObjectId,
    state_id: ObjectId,
    overlay: Vec<u8>,
) -> Result<(), PdfDeskError> {
    let mut resources = effective_resources(doc, page_id);
    add_resource(doc, &mut resources, b"Font", FONT_RESOURCE, font_id);
    add_resource(doc, &mut resources, b"ExtGState", STATE_RESOURCE, state_id);

    let existing = match doc
        .get_object(page_id)
        .and_then(Object::as_dict)?
        .get(b"Contents")
    {
        Ok(Object::Reference(id)) => vec![Object::Reference(*id)],
        Ok(Object::Array(items)) => items.clone(),
        _ => Vec::new(),
    };

    let open_id = doc.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
    let overlay_id = doc.add_object(Stream::new(
        Dictionary::new(),
        [b"Q\n".as_slice(), overlay.as_slice()].concat(),
    ));

    let mut contents = Vec::with_capacity(existing.len() + 2);
    contents.push(Object::Reference(open_id));
    contents.extend(existing);
    contents.push(Object::Reference(overlay_id));

    let page = doc.get_object_mut(page_id).and_then(Object::as_dict_mut)?;
    page.set("Resources", resources);
    page.set("Contents", contents);
    Ok(())
}

/// Insert `name -> id` into the `category` sub-dictionary of `resources`,
/// resolving an indirect sub-dictionary into an inline copy first.
fn add_resource(
    doc: &Document,
    resources: &mut Dictionary,
    category: &[u8],
    name: &str,
    id: ObjectId,
) {
    let mut entries = resources
        .get(category)
        .ok()
        .cloned()
        .map(|obj| document::resolve(doc, obj))
        .and_then(|obj| obj.as_dict().ok().cloned())
        .unwrap_or_default();
    entries.set(name, Object::Reference(id));
    resources.set(category, entries);
}

/// Encode text for a WinAnsi standard font. Characters outside Latin-1
/// (and control characters) cannot be shown and are rejected.
pub fn encode_win_ansi(text: &str) -> Result<Vec<u8>, PdfDeskError> {
    text.chars()
        .map(|c| match u32::from(c) {
            code @ 0x20..=0x7e | code @ 0xa0..=0xff => Ok(code as u8),
            _ => Err(PdfDeskError::UnencodableText(format!("{:?}", c))),
        })
        .collect()
}

/// Rendered width of WinAnsi text in Helvetica at `size` points.
pub fn text_width(encoded: &[u8], size: f32) -> f32 {
    let units: u32 = encoded.iter().map(|&b| helvetica_width(b)).sum();
    units as f32 * size / 1000.0
}

/// Helvetica advance widths (glyph units) for printable ASCII; other
/// Latin-1 glyphs use the font's common 556 width.
fn helvetica_width(byte: u8) -> u32 {
    const ASCII: [u32; 95] = [
        278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '../
        556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // 0-9
        278, 278, 584, 584, 584, 556, 1015, // :..@
        667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, // A-M
        722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, // N-Z
        278, 278, 278, 469, 556, 333, // [..`
        556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, // a-m
        556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, // n-z
        334, 260, 334, 584, // {..~
    ];
    match byte {
        0x20..=0x7e => ASCII[(byte - 0x20) as usize],
        _ => 556,
    }
}
