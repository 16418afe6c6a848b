//! Pagination planner.
//!
//! First pass of compilation. [`prepare`] opens every embeddable document so
//! that failures are known (and isolated) before any page number is assigned;
//! [`plan`] then walks the prepared dossier and records where every category,
//! document and the summary will start.

use tracing::{debug, info, instrument, warn};

use dossier_pdf::{Document, DocumentMerger};
use dossier_shared::{
    CategoryEntry, CategoryId, DocumentEntry, DocumentOutcome, InputDocument, LayoutConfig,
    PaginationPlan, Result,
};

use crate::cancel::CancelToken;
use crate::classifier::CategorizedDocuments;
use crate::toc;

/// Page 1 is always the dossier cover.
pub const COVER_PAGE: u32 = 1;

// ---------------------------------------------------------------------------
// Preparation
// ---------------------------------------------------------------------------

/// What the assembler will be able to do with a document.
#[derive(Debug)]
pub enum PreparedContent {
    /// Parsed PDF, ready to embed.
    Embeddable(Document),
    /// Non-PDF document, represented by a reference page.
    Reference,
    /// PDF that could not be opened; represented by an error page.
    Unreadable(String),
}

/// A document after its content has been opened.
///
/// For embeddable documents the raw bytes are released once parsed.
#[derive(Debug)]
pub struct PreparedDocument {
    pub source: InputDocument,
    pub content: PreparedContent,
}

/// Prepared documents of one category, in arrival order.
#[derive(Debug)]
pub struct PreparedGroup {
    pub category: CategoryId,
    pub documents: Vec<PreparedDocument>,
}

/// All prepared groups in canonical category order.
#[derive(Debug, Default)]
pub struct PreparedDossier {
    pub groups: Vec<PreparedGroup>,
}

impl PreparedDossier {
    pub fn document_count(&self) -> usize {
        self.groups.iter().map(|g| g.documents.len()).sum()
    }

    /// Table-of-contents lines: one per category plus one per document.
    pub fn toc_line_count(&self) -> usize {
        self.groups.len() + self.document_count()
    }
}

/// Open every PDF with the merge primitive.
///
/// A document that cannot be opened is recorded as unreadable and logged;
/// it never aborts the run. Cancellation is checked between documents.
#[instrument(skip_all, fields(documents = categorized.document_count()))]
pub fn prepare(
    categorized: CategorizedDocuments,
    merger: &dyn DocumentMerger,
    cancel: &CancelToken,
) -> Result<PreparedDossier> {
    let mut groups = Vec::new();

    for (category, documents) in categorized {
        let mut prepared = Vec::with_capacity(documents.len());
        for mut source in documents {
            cancel.check()?;

            let content = if source.is_pdf() {
                match merger.open(&source.name, &source.content) {
                    Ok(doc) => {
                        source.content = Vec::new();
                        PreparedContent::Embeddable(doc)
                    }
                    Err(e) => {
                        warn!(
                            document = %source.name,
                            category = %category,
                            error = %e,
                            "document cannot be embedded, an error page will be used"
                        );
                        PreparedContent::Unreadable(e.to_string())
                    }
                }
            } else {
                PreparedContent::Reference
            };

            prepared.push(PreparedDocument { source, content });
        }
        groups.push(PreparedGroup {
            category,
            documents: prepared,
        });
    }

    Ok(PreparedDossier { groups })
}

// ---------------------------------------------------------------------------
// Planning
// ---------------------------------------------------------------------------

/// Estimated content pages of an embedded PDF: `max(1, ceil(size / bytes_per_page))`.
pub fn estimate_content_pages(size_bytes: u64, bytes_per_page: u64) -> u32 {
    let pages = size_bytes.div_ceil(bytes_per_page.max(1)).max(1);
    u32::try_from(pages).unwrap_or(u32::MAX)
}

/// Compute the pagination plan.
///
/// The table of contents is sized here, from the number of entries it will
/// list, so body page numbers already account for every ToC page. Pure:
/// the same prepared dossier and layout always produce an equal plan.
#[instrument(skip_all, fields(documents = prepared.document_count()))]
pub fn plan(prepared: &PreparedDossier, layout: &LayoutConfig) -> PaginationPlan {
    let toc_start_page = COVER_PAGE + 1;
    let toc_page_count = toc::toc_page_count(prepared.toc_line_count(), layout.toc_entries_per_page);
    let body_start_page = toc_start_page + toc_page_count;

    let mut next_page = body_start_page;
    let mut categories = Vec::with_capacity(prepared.groups.len());
    for group in &prepared.groups {
        let (entry, after) = plan_category(group, next_page, layout.bytes_per_page_estimate);
        categories.push(entry);
        next_page = after;
    }

    let summary_page = next_page;
    let plan = PaginationPlan {
        toc_start_page,
        toc_page_count,
        body_start_page,
        categories,
        summary_page,
        total_pages: summary_page,
    };

    info!(
        toc_pages = plan.toc_page_count,
        total_pages = plan.total_pages,
        "pagination planned"
    );
    plan
}

/// Plan one category starting at `start_page`; returns the entry and the next free page.
fn plan_category(group: &PreparedGroup, start_page: u32, bytes_per_page: u64) -> (CategoryEntry, u32) {
    // Divider
    let mut next_page = start_page.saturating_add(1);

    let mut documents = Vec::with_capacity(group.documents.len());
    for doc in &group.documents {
        let (entry, after) = plan_document(doc, next_page, bytes_per_page);
        documents.push(entry);
        next_page = after;
    }

    let entry = CategoryEntry {
        id: group.category,
        display_name: group.category.display_name().to_string(),
        start_page,
        documents,
    };
    (entry, next_page)
}

/// Plan one document starting at `start_page`; returns the entry and the next free page.
fn plan_document(doc: &PreparedDocument, start_page: u32, bytes_per_page: u64) -> (DocumentEntry, u32) {
    let outcome = match &doc.content {
        PreparedContent::Embeddable(_) => DocumentOutcome::Embedded {
            content_pages: estimate_content_pages(doc.source.size_bytes, bytes_per_page),
        },
        PreparedContent::Reference => DocumentOutcome::Referenced,
        PreparedContent::Unreadable(reason) => DocumentOutcome::Failed {
            reason: reason.clone(),
        },
    };
    let page_count = outcome.page_count();

    debug!(
        document = %doc.source.name,
        start_page,
        page_count,
        outcome = outcome.label(),
        "document planned"
    );

    let entry = DocumentEntry {
        name: doc.source.name.clone(),
        start_page,
        page_count,
        outcome,
    };
    (entry, start_page.saturating_add(page_count))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
