//! Binary-merge primitive: open foreign PDFs and concatenate documents.

use std::collections::BTreeMap;

use lopdf::{Dictionary, Document, Object, ObjectId};
use tracing::{debug, instrument};

use dossier_shared::{DossierError, Result};

/// Page attributes a page may inherit from its ancestors in the page tree.
const INHERITABLE_KEYS: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Guards against cyclic `Parent` chains in malformed files.
const MAX_TREE_DEPTH: usize = 32;

/// Opens foreign documents and concatenates document handles in order.
pub trait DocumentMerger: Send + Sync {
    /// Parse a source document for embedding. Fails on malformed or empty input.
    fn open(&self, name: &str, bytes: &[u8]) -> Result<Document>;

    /// Concatenate `parts` into one document, preserving part and page order.
    fn merge(&self, parts: Vec<Document>) -> Result<Document>;
}

/// [`DocumentMerger`] backed by lopdf.
#[derive(Debug, Clone, Default)]
pub struct LopdfMerger;

impl DocumentMerger for LopdfMerger {
    fn open(&self, name: &str, bytes: &[u8]) -> Result<Document> {
        let doc = Document::load_mem(bytes).map_err(|e| DossierError::merge(name, e.to_string()))?;
        if doc.get_pages().is_empty() {
            return Err(DossierError::merge(name, "document contains no pages"));
        }
        debug!(document = name, pages = doc.get_pages().len(), "opened source document");
        Ok(doc)
    }

    #[instrument(skip_all, fields(parts = parts.len()))]
    fn merge(&self, parts: Vec<Document>) -> Result<Document> {
        concat(parts)
    }
}

/// Concatenate documents page by page.
///
/// Objects of every part are renumbered into one id space; page dictionaries
/// are re-parented under a single flat page tree with inherited attributes
/// copied onto each page, and outlines are discarded.
pub fn concat(parts: Vec<Document>) -> Result<Document> {
    if parts.is_empty() {
        return Err(DossierError::render("no documents to merge"));
    }

    let mut max_id: u32 = 1;
    let mut pages: Vec<(ObjectId, Dictionary)> = Vec::new();
    let mut objects: BTreeMap<ObjectId, Object> = BTreeMap::new();

    for (index, mut doc) in parts.into_iter().enumerate() {
        doc.renumber_objects_with(max_id);
        max_id = doc.max_id + 1;

        for page_id in doc.get_pages().into_values() {
            let dict = flattened_page(&doc, page_id).map_err(|e| {
                DossierError::render(format!("part {}: unreadable page {page_id:?}: {e}", index + 1))
            })?;
            pages.push((page_id, dict));
        }

        for (object_id, object) in doc.objects {
            match object.type_name().unwrap_or(b"") {
                b"Catalog" | b"Pages" | b"Page" | b"Outlines" | b"Outline" => {}
                _ => {
                    objects.insert(object_id, object);
                }
            }
        }
    }

    let mut merged = Document::with_version("1.5");
    merged.objects = objects;
    merged.max_id = max_id;

    let pages_id = merged.new_object_id();
    let mut kids = Vec::with_capacity(pages.len());
    for (page_id, mut dict) in pages {
        dict.set("Parent", Object::Reference(pages_id));
        merged.objects.insert(page_id, Object::Dictionary(dict));
        kids.push(Object::Reference(page_id));
    }

    let count = kids.len() as i64;
    merged.objects.insert(
        pages_id,
        Object::Dictionary(Dictionary::from_iter([
            ("Type", Object::Name(b"Pages".to_vec())),
            ("Kids", Object::Array(kids)),
            ("Count", Object::Integer(count)),
        ])),
    );

    let catalog_id = merged.add_object(Dictionary::from_iter([
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_id)),
    ]));
    merged.trailer.set("Root", Object::Reference(catalog_id));

    debug!(pages = count, "documents concatenated");
    Ok(merged)
}

/// Number of pages in a document.
pub fn page_count(doc: &Document) -> usize {
    doc.get_pages().len()
}

/// Drop every page after the first `keep`. Returns how many pages were removed.
pub fn truncate_pages(doc: &mut Document, keep: usize) -> usize {
    let total = page_count(doc);
    if total <= keep {
        return 0;
    }
    let doomed: Vec<u32> = ((keep as u32 + 1)..=(total as u32)).collect();
    doc.delete_pages(&doomed);
    doc.prune_objects();
    total - keep
}

/// Set the document information dictionary (Title, Producer).
pub fn set_document_info(doc: &mut Document, title: &str, producer: &str) {
    let info_id = doc.add_object(Dictionary::from_iter([
        ("Title", Object::string_literal(title)),
        ("Producer", Object::string_literal(producer)),
    ]));
    doc.trailer.set("Info", Object::Reference(info_id));
}

/// Serialize a document to PDF bytes.
pub fn to_bytes(mut doc: Document) -> Result<Vec<u8>> {
    doc.compress();
    let mut output = Vec::new();
    doc.save_to(&mut output)
        .map_err(|e| DossierError::render(format!("failed to serialize PDF: {e}")))?;
    Ok(output)
}

/// Clone a page dictionary, filling in attributes inherited from the page tree.
fn flattened_page(doc: &Document, page_id: ObjectId) -> lopdf::Result<Dictionary> {
    let mut dict = doc.get_object(page_id)?.as_dict()?.clone();

    let mut parent = dict.get(b"Parent").and_then(Object::as_reference).ok();
    let mut depth = 0;
    while let Some(parent_id) = parent {
        if depth >= MAX_TREE_DEPTH {
            break;
        }
        let Ok(parent_dict) = doc.get_object(parent_id).and_then(Object::as_dict) else {
            break;
        };
        for key in INHERITABLE_KEYS {
            if !dict.has(key) {
                if let Ok(value) = parent_dict.get(key) {
                    dict.set(key.to_vec(), value.clone());
                }
            }
        }
        parent = parent_dict.get(b"Parent").and_then(Object::as_reference).ok();
        depth += 1;
    }

    Ok(dict)
}
