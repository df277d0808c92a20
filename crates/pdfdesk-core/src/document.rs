//! Shared lopdf plumbing: loading, saving, page tree rebuilding and
//! inherited page attributes.

use crate::error::PdfDeskError;
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId};

/// Page attributes a page may inherit from its ancestors in the page tree.
const INHERITABLE: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// US Letter, used when no MediaBox can be found
const DEFAULT_MEDIA_BOX: [f32; 4] = [0.0, 0.0, 612.0, 792.0];

pub fn load(bytes: &[u8]) -> Result<Document, PdfDeskError> {
    Document::load_mem(bytes).map_err(|e| PdfDeskError::ParseError(e.to_string()))
}

pub fn save(doc: &mut Document) -> Result<Vec<u8>, PdfDeskError> {
    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)
        .map_err(|e| PdfDeskError::OperationError(format!("Failed to save PDF: {}", e)))?;
    Ok(buffer)
}

/// Page object ids in page order.
pub fn page_ids(doc: &Document) -> Vec<ObjectId> {
    doc.get_pages().into_values().collect()
}

/// Look up a page attribute on the page itself or the nearest ancestor.
pub fn inherited_attribute(doc: &Document, page_id: ObjectId, key: &[u8]) -> Option<Object> {
    let mut current = page_id;
    // Parent chains are short; the bound guards against cycles in broken files
    for _ in 0..64 {
        let dict = doc.get_object(current).and_then(Object::as_dict).ok()?;
        if let Ok(value) = dict.get(key) {
            return Some(value.clone());
        }
        current = dict.get(b"Parent").and_then(Object::as_reference).ok()?;
    }
    None
}

/// Width and height of a page's MediaBox in points.
pub fn page_size(doc: &Document, page_id: ObjectId) -> (f32, f32) {
    let media_box = inherited_attribute(doc, page_id, b"MediaBox")
        .and_then(|obj| resolve(doc, obj).as_array().ok().and_then(|a| parse_box_array(a)))
        .unwrap_or(DEFAULT_MEDIA_BOX);
    (
        (media_box[2] - media_box[0]).abs(),
        (media_box[3] - media_box[1]).abs(),
    )
}

/// Parse a box array [x1, y1, x2, y2]
fn parse_box_array(array: &[Object]) -> Option<[f32; 4]> {
    if array.len() != 4 {
        return None;
    }
    let mut result = [0.0; 4];
    for (i, obj) in array.iter().enumerate() {
        result[i] = obj.as_float().ok()?;
    }
    Some(result)
}

/// Follow a reference to its target, or return the object itself.
pub fn resolve(doc: &Document, obj: Object) -> Object {
    match obj {
        Object::Reference(id) => doc.get_object(id).cloned().unwrap_or(Object::Null),
        other => other,
    }
}

/// The page's effective resource dictionary, inherited entries included.
pub fn effective_resources(doc: &Document, page_id: ObjectId) -> Dictionary {
    inherited_attribute(doc, page_id, b"Resources")
        .map(|obj| resolve(doc, obj))
        .and_then(|obj| obj.as_dict().ok().cloned())
        .unwrap_or_default()
}

/// Replace the document's page tree with a single flat Pages node listing
/// `pages` in order, under a fresh catalog.
///
/// Inherited attributes are copied onto each page first so that nothing is
/// lost when intermediate Pages nodes drop out. Objects no longer reachable
/// from the new catalog are pruned.
pub fn rebuild_page_tree(doc: &mut Document, pages: &[ObjectId]) -> Result<(), PdfDeskError> {
    for &page_id in pages {
        let inherited: Vec<(&[u8], Object)> = INHERITABLE
            .iter()
            .filter_map(|key| inherited_attribute(doc, page_id, key).map(|value| (*key, value)))
            .collect();
        let page = doc
            .get_object_mut(page_id)
            .and_then(Object::as_dict_mut)
            .map_err(|e| PdfDeskError::OperationError(format!("Invalid page object: {}", e)))?;
        for (key, value) in inherited {
            if !page.has(key) {
                page.set(key, value);
            }
        }
    }

    let pages_id = doc.new_object_id();
    for &page_id in pages {
        if let Ok(page) = doc.get_object_mut(page_id).and_then(Object::as_dict_mut) {
            page.set("Parent", Object::Reference(pages_id));
        }
    }

    let kids: Vec<Object> = pages.iter().map(|&id| Object::Reference(id)).collect();
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => pages.len() as i64,
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => Object::Reference(pages_id),
    });
    doc.trailer.set("Root", Object::Reference(catalog_id));

    doc.prune_objects();
    Ok(())
}

/// A new, empty document with a catalog and an empty page tree.
pub struct DocumentBuilder {
    doc: Document,
    pages_id: ObjectId,
    kids: Vec<ObjectId>,
}

impl DocumentBuilder {
    pub fn new() -> Self {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();
        Self {
            doc,
            pages_id,
            kids: Vec::new(),
        }
    }

    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.doc
    }

    /// Append a page of the given size whose content is a single image
    /// XObject stretched over the whole page.
    pub fn add_image_page(
        &mut self,
        width: f32,
        height: f32,
        image_id: ObjectId,
    ) -> Result<ObjectId, PdfDeskError> {
        use lopdf::content::{Content, Operation};

        let content = Content {
            operations: vec![
                Operation::new("q", vec![]),
                Operation::new(
                    "cm",
                    vec![
                        width.into(),
                        0.into(),
                        0.into(),
                        height.into(),
                        0.into(),
                        0.into(),
                    ],
                ),
                Operation::new("Do", vec![Object::Name(b"Im0".to_vec())]),
                Operation::new("Q", vec![]),
            ],
        };
        let encoded = content
            .encode()
            .map_err(|e| PdfDeskError::OperationError(e.to_string()))?;
        let content_id = self
            .doc
            .add_object(lopdf::Stream::new(Dictionary::new(), encoded));

        let page_id = self.doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => Object::Reference(self.pages_id),
            "MediaBox" => vec![0.into(), 0.into(), width.into(), height.into()],
            "Resources" => dictionary! {
                "XObject" => dictionary! {
                    "Im0" => Object::Reference(image_id),
                },
            },
            "Contents" => Object::Reference(content_id),
        });
        self.kids.push(page_id);
        Ok(page_id)
    }

    pub fn page_count(&self) -> usize {
        self.kids.len()
    }

    pub fn finish(mut self) -> Result<Vec<u8>, PdfDeskError> {
        let kids: Vec<Object> = self.kids.iter().map(|&id| Object::Reference(id)).collect();
        self.doc.objects.insert(
            self.pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => self.kids.len() as i64,
            }),
        );
        let catalog_id = self.doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => Object::Reference(self.pages_id),
        });
        self.doc.trailer.set("Root", Object::Reference(catalog_id));
        self.doc.compress();
        save(&mut self.doc)
    }
}

impl Default for DocumentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::create_test_pdf;

    #[test]
    fn test_parse_box_array() {
        let array = vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Real(612.0),
            Object::Real(792.0),
        ];
        assert_eq!(parse_box_array(&array), Some([0.0, 0.0, 612.0, 792.0]));
        assert_eq!(parse_box_array(&array[..3]), None);
    }

    #[test]
    fn test_page_size_inherited_from_parent() {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => Object::Reference(pages_id),
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![Object::Reference(page_id)],
                "Count" => 1,
                "MediaBox" => vec![0.into(), 0.into(), 300.into(), 400.into()],
            }),
        );
        assert_eq!(page_size(&doc, page_id), (300.0, 400.0));
    }

    #[test]
    fn test_rebuild_page_tree_reorders_and_prunes() {
        let pdf = create_test_pdf(4);
        let mut doc = load(&pdf).unwrap();
        let ids = page_ids(&doc);

        rebuild_page_tree(&mut doc, &[ids[3], ids[0]]).unwrap();

        let pages = page_ids(&doc);
        assert_eq!(pages, vec![ids[3], ids[0]]);
        assert!(doc.get_object(ids[1]).is_err(), "dropped page should be pruned");
    }

    #[test]
    fn test_builder_produces_empty_but_valid_document() {
        let bytes = DocumentBuilder::new().finish().unwrap();
        let doc = load(&bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 0);
    }
}
