//! PDF Merge algorithm
//!
//! Combines multiple PDFs into a single document, and prepends a cover
//! document to a main document.

use crate::document::{self, rebuild_page_tree};
use crate::error::PdfDeskError;
use lopdf::{Document, Object, ObjectId};
use std::collections::BTreeMap;

/// Merge multiple PDFs into one, keeping the input order.
///
/// The algorithm:
/// 1. If empty, return error
/// 2. Load the first document as the destination
/// 3. For each further source document:
///    a. Calculate ID offset to avoid conflicts
///    b. Import all objects with remapped IDs
///    c. Append its pages to the destination page list
/// 4. Rebuild a flat page tree over the collected pages
/// 5. Compress and return the merged result
///
/// `progress` is called with `(documents_done, documents_total)` after each
/// input has been loaded and appended.
pub fn merge_documents(
    documents: &[Vec<u8>],
    progress: &mut dyn FnMut(usize, usize),
) -> Result<Vec<u8>, PdfDeskError> {
    if documents.is_empty() {
        return Err(PdfDeskError::OperationError("No documents to merge".into()));
    }

    let total = documents.len();
    let mut dest: Option<Document> = None;
    let mut dest_page_refs: Vec<ObjectId> = Vec::new();

    for (i, doc_bytes) in documents.iter().enumerate() {
        let source = Document::load_mem(doc_bytes).map_err(|e| {
            PdfDeskError::ParseError(format!("Failed to load document {}: {}", i + 1, e))
        })?;

        match dest.as_mut() {
            None => {
                dest_page_refs = document::page_ids(&source);
                dest = Some(source);
            }
            Some(dest) => {
                let pages = append_document(dest, source);
                dest_page_refs.extend(pages);
            }
        }

        tracing::debug!(document = i + 1, total, "appended document to merge");
        progress(i + 1, total);
    }

    let mut dest =
        dest.ok_or_else(|| PdfDeskError::OperationError("No documents to merge".into()))?;
    rebuild_page_tree(&mut dest, &dest_page_refs)?;
    dest.compress();

    document::save(&mut dest)
}

/// Copy all pages of `cover` followed by all pages of `main`.
pub fn add_cover(cover: &[u8], main: &[u8]) -> Result<Vec<u8>, PdfDeskError> {
    merge_documents(&[cover.to_vec(), main.to_vec()], &mut |_, _| {})
}

/// Move every object of `source` into `dest` under fresh ids and return the
/// source's page ids as they are numbered in `dest`.
fn append_document(dest: &mut Document, source: Document) -> Vec<ObjectId> {
    let id_offset = dest.max_id;
    let source_pages = document::page_ids(&source);

    let mut remapped_objects = BTreeMap::new();
    for (old_id, object) in source.objects.into_iter() {
        let new_id = (old_id.0 + id_offset, old_id.1);
        remapped_objects.insert(new_id, remap_object_refs(object, id_offset));
    }
    dest.objects.extend(remapped_objects);

    dest.max_id = (source.max_id + id_offset).max(dest.max_id);

    source_pages
        .into_iter()
        .map(|old| (old.0 + id_offset, old.1))
        .collect()
}

/// Recursively remap object references in an object
fn remap_object_refs(obj: Object, offset: u32) -> Object {
    match obj {
        Object::Reference(id) => Object::Reference((id.0 + offset, id.1)),
        Object::Array(arr) => Object::Array(
            arr.into_iter()
                .map(|o| remap_object_refs(o, offset))
                .collect(),
        ),
        Object::Dictionary(mut dict) => {
            for (_, value) in dict.iter_mut() {
                *value = remap_object_refs(std::mem::replace(value, Object::Null), offset);
            }
            Object::Dictionary(dict)
        }
        Object::Stream(mut stream) => {
            for (_, value) in stream.dict.iter_mut() {
                *value = remap_object_refs(std::mem::replace(value, Object::Null), offset);
            }
            Object::Stream(stream)
        }
        other => other,
    }
}
