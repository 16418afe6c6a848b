//! PDF primitives for dossier compilation.
//!
//! This crate provides:
//! - [`PageRenderer`] / [`LopdfRenderer`]: structured [`PageSpec`] → single-page document
//! - [`DocumentMerger`] / [`LopdfMerger`]: open foreign PDFs, concatenate documents
//! - [`PdfBackend`]: the pair of primitives the assembler works against

pub mod merge;
pub mod render;
pub mod text;

pub use lopdf::Document;
pub use merge::{
    DocumentMerger, LopdfMerger, concat, page_count, set_document_info, to_bytes, truncate_pages,
};
pub use render::{Block, LopdfRenderer, PageRenderer, PageSpec, RULE_HEIGHT, TextStyle};

use dossier_shared::LayoutConfig;

/// Rendering and merging primitives used to build one dossier.
pub struct PdfBackend {
    pub renderer: Box<dyn PageRenderer>,
    pub merger: Box<dyn DocumentMerger>,
}

impl PdfBackend {
    pub fn new(renderer: Box<dyn PageRenderer>, merger: Box<dyn DocumentMerger>) -> Self {
        Self { renderer, merger }
    }

    /// lopdf-backed primitives using the page geometry from `layout`.
    pub fn lopdf(layout: &LayoutConfig) -> Self {
        Self::new(
            Box::new(LopdfRenderer::from_layout(layout)),
            Box::new(LopdfMerger),
        )
    }
}

/// Decoded content stream of a 1-based page, lossily converted to text.
///
/// Useful for checking which page a piece of text landed on.
pub fn page_text(doc: &Document, page_number: u32) -> Option<String> {
    let page_id = *doc.get_pages().get(&page_number)?;
    let content = doc.get_page_content(page_id).ok()?;
    Some(String::from_utf8_lossy(&content).into_owned())
}

/// Build an `pages`-page document whose pages read `"<label> <n>"`.
#[cfg(any(test, feature = "testing"))]
pub fn sample_document(label: &str, pages: usize) -> Document {
    let renderer = LopdfRenderer::new(595.0, 842.0, 56.0);
    let parts = (1..=pages)
        .map(|n| {
            renderer
                .render(&PageSpec::new().title(format!("{label} {n}")))
                .expect("render sample page")
        })
        .collect();
    concat(parts).expect("concat sample pages")
}

/// Serialized form of [`sample_document`].
#[cfg(any(test, feature = "testing"))]
pub fn sample_pdf_bytes(label: &str, pages: usize) -> Vec<u8> {
    to_bytes(sample_document(label, pages)).expect("serialize sample document")
}
