//! Dossier assembler.
//!
//! Takes the prepared documents, the pagination plan and the rendered ToC
//! pages, then emits every page in plan order and concatenates them into the
//! final artifact.
//!
//! Each document occupies exactly the slot the planner gave it. Embedded
//! documents shorter than their estimate are padded with filler pages; longer
//! ones are cut to the slot when `strict_page_budget` is on.

use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument, warn};

use dossier_artifacts::{artifact_file_name, sha256_hex};
use dossier_pdf::{
    Document, PageSpec, PdfBackend, page_count, set_document_info, to_bytes, truncate_pages,
};
use dossier_shared::{
    CategoryEntry, CategoryId, CompileConfig, CompiledArtifact, DocumentEntry, DossierError,
    InputDocument, PaginationPlan, Result, dossier_type_label,
};

use crate::cancel::CancelToken;
use crate::pages::{self, OutcomeTally};
use crate::planner::{PreparedContent, PreparedDocument, PreparedDossier};

/// Producer string written into the PDF document info.
const PRODUCER: &str = concat!("dossier ", env!("CARGO_PKG_VERSION"));

/// Caller-supplied metadata for one dossier.
#[derive(Debug, Clone)]
pub struct DossierMeta {
    /// Dossier type id, e.g. `impd`. Required.
    pub dossier_type: Option<String>,
    /// Cover title. Defaults to the dossier type label.
    pub title: Option<String>,
    pub generated_at: DateTime<Utc>,
}

impl DossierMeta {
    pub fn new(dossier_type: impl Into<String>) -> Self {
        Self {
            dossier_type: Some(dossier_type.into()),
            title: None,
            generated_at: Utc::now(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn generated_at(mut self, at: DateTime<Utc>) -> Self {
        self.generated_at = at;
        self
    }
}

/// Output from a successful assembly.
#[derive(Debug, Clone)]
pub struct AssembleResult {
    pub artifact: CompiledArtifact,
    /// Documents replaced by an error page, in plan order.
    pub failed_documents: Vec<String>,
}

/// Check the request before any work is done. Returns the trimmed dossier type.
pub fn validate_request(meta: &DossierMeta, document_count: usize) -> Result<String> {
    let dossier_type = meta
        .dossier_type
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| DossierError::configuration("Dossier type is required"))?;

    if document_count == 0 {
        return Err(DossierError::configuration("No documents provided"));
    }
    Ok(dossier_type.to_string())
}

/// Assemble the dossier.
///
/// Emits the cover, the ToC pages, one divider per category followed by its
/// documents, and the summary, then concatenates everything into one PDF.
#[instrument(skip_all, fields(documents = prepared.document_count(), planned_pages = plan.total_pages))]
pub fn assemble(
    meta: &DossierMeta,
    prepared: PreparedDossier,
    plan: &PaginationPlan,
    toc_pages: &[PageSpec],
    backend: &PdfBackend,
    config: &CompileConfig,
    cancel: &CancelToken,
) -> Result<AssembleResult> {
    let document_count = prepared.document_count();
    let dossier_type = validate_request(meta, document_count)?;
    let type_label = dossier_type_label(&dossier_type);
    let title = meta
        .title
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| type_label.clone());

    if toc_pages.len() != plan.toc_page_count as usize {
        return Err(DossierError::render(format!(
            "expected {} table of contents pages, got {}",
            plan.toc_page_count,
            toc_pages.len()
        )));
    }
    if prepared.groups.len() != plan.categories.len() {
        return Err(DossierError::render(
            "pagination plan does not match the prepared documents",
        ));
    }

    let mut assembler = SlotAssembler {
        backend,
        strict: config.layout.strict_page_budget,
        parts: Vec::with_capacity(plan.total_pages as usize),
        tally: OutcomeTally::default(),
    };

    info!(title = %title, dossier_type = %dossier_type, "assembling dossier");

    // Front matter
    assembler.render(&pages::cover_page(
        &title,
        &type_label,
        document_count,
        meta.generated_at,
    ))?;
    for page in toc_pages {
        assembler.render(page)?;
    }

    // Body
    for (section, (group, category)) in prepared.groups.into_iter().zip(&plan.categories).enumerate() {
        if group.category != category.id || group.documents.len() != category.documents.len() {
            return Err(DossierError::render(format!(
                "pagination plan does not match the prepared documents of '{}'",
                category.id
            )));
        }

        assembler.render(&pages::divider_page(section + 1, category))?;
        for (doc, entry) in group.documents.into_iter().zip(&category.documents) {
            cancel.check()?;
            assembler.document(category, doc, entry)?;
        }
    }

    // Closing summary
    assembler.render(&pages::summary_page(plan, &assembler.tally, &config.disclaimer))?;

    let SlotAssembler { parts, tally, .. } = assembler;
    let mut merged = backend.merger.merge(parts)?;

    let total = page_count(&merged) as u32;
    if total != plan.total_pages {
        if config.layout.strict_page_budget {
            return Err(DossierError::render(format!(
                "assembled {total} pages but the plan expects {}",
                plan.total_pages
            )));
        }
        warn!(
            planned = plan.total_pages,
            actual = total,
            "page numbers after the first oversized document do not match the table of contents"
        );
    }

    set_document_info(&mut merged, &title, PRODUCER);
    let bytes = to_bytes(merged)?;
    let sha256 = sha256_hex(&bytes);
    let file_name = artifact_file_name(&dossier_type, meta.generated_at);

    info!(
        file = %file_name,
        pages = total,
        size = bytes.len(),
        failed = tally.failed.len(),
        "dossier assembled"
    );

    Ok(AssembleResult {
        artifact: CompiledArtifact {
            bytes,
            file_name,
            document_count,
            dossier_type,
            dossier_type_label: type_label,
            page_count: total,
            sha256,
        },
        failed_documents: tally.failed,
    })
}

// ---------------------------------------------------------------------------
// Slot assembly
// ---------------------------------------------------------------------------

/// Accumulates rendered parts in page order.
struct SlotAssembler<'a> {
    backend: &'a PdfBackend,
    strict: bool,
    parts: Vec<Document>,
    tally: OutcomeTally,
}

impl SlotAssembler<'_> {
    fn render(&mut self, page: &PageSpec) -> Result<()> {
        let doc = self.backend.renderer.render(page)?;
        self.parts.push(doc);
        Ok(())
    }

    /// Emit one document's slot.
    fn document(
        &mut self,
        category: &CategoryEntry,
        doc: PreparedDocument,
        entry: &DocumentEntry,
    ) -> Result<()> {
        let PreparedDocument { source, content } = doc;
        match content {
            PreparedContent::Reference => {
                self.render(&pages::reference_page(category.id, entry, &source))?;
                self.tally.referenced += 1;
            }
            PreparedContent::Unreadable(reason) => {
                self.failed_slot(category.id, entry, &reason)?;
            }
            PreparedContent::Embeddable(content) => {
                match self.embedded_slot(category.id, entry, &source, content) {
                    Ok(slot) => {
                        self.parts.push(slot);
                        self.tally.embedded += 1;
                    }
                    Err(DossierError::DocumentMerge { message, .. }) => {
                        warn!(
                            document = %entry.name,
                            error = %message,
                            "document failed to merge, an error page will be used"
                        );
                        self.failed_slot(category.id, entry, &message)?;
                    }
                    Err(e) => return Err(e),
                }
            }
        }
        Ok(())
    }

    /// Cover, content fitted to the planned range, and filler pages, merged into one part.
    fn embedded_slot(
        &self,
        category: CategoryId,
        entry: &DocumentEntry,
        source: &InputDocument,
        mut content: Document,
    ) -> Result<Document> {
        let slot_pages = entry.page_count.saturating_sub(1) as usize;
        let actual = page_count(&content);

        let note = if actual > slot_pages {
            if self.strict {
                let removed = truncate_pages(&mut content, slot_pages);
                debug!(document = %entry.name, removed, "document cut to its planned range");
                Some(format!(
                    "Showing the first {slot_pages} of {actual} pages of this document."
                ))
            } else {
                warn!(
                    document = %entry.name,
                    planned = slot_pages,
                    actual,
                    "document is longer than estimated, later page numbers will drift"
                );
                None
            }
        } else {
            None
        };

        let kept = page_count(&content);
        let mut slot = vec![
            self.backend
                .renderer
                .render(&pages::document_cover_page(category, entry, source, note.as_deref()))?,
            content,
        ];

        let first_filler = entry.start_page + 1 + kept as u32;
        for i in 0..slot_pages.saturating_sub(kept) {
            slot.push(
                self.backend
                    .renderer
                    .render(&pages::filler_page(&entry.name, first_filler + i as u32))?,
            );
        }
        if kept < slot_pages {
            debug!(document = %entry.name, padding = slot_pages - kept, "document padded to its planned range");
        }

        self.backend
            .merger
            .merge(slot)
            .map_err(|e| DossierError::merge(&entry.name, e.to_string()))
    }

    /// Error page followed by filler pages for the rest of the planned range.
    fn failed_slot(&mut self, category: CategoryId, entry: &DocumentEntry, reason: &str) -> Result<()> {
        self.render(&pages::error_page(category, &entry.name, reason, entry.start_page))?;
        for page in (entry.start_page + 1)..(entry.start_page + entry.page_count) {
            self.render(&pages::filler_page(&entry.name, page))?;
        }
        self.tally.failed.push(entry.name.clone());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::classify;
    use crate::planner::{plan, prepare};
    use crate::toc::render_toc;
    use chrono::TimeZone;
    use dossier_pdf::{DocumentMerger, LopdfMerger, LopdfRenderer, page_text, sample_pdf_bytes};
    use dossier_shared::LayoutConfig;

    const KIB: u64 = 1024;

    fn pdf(name: &str, category: CategoryId, pages: usize, size_bytes: u64) -> InputDocument {
        let mut doc = InputDocument::new(name, category, sample_pdf_bytes(name, pages));
        doc.size_bytes = size_bytes;
        doc
    }

    fn labelled_pdf(name: &str, label: &str, category: CategoryId, size_bytes: u64) -> InputDocument {
        let mut doc = InputDocument::new(name, category, sample_pdf_bytes(label, 1));
        doc.size_bytes = size_bytes;
        doc
    }

    fn other(name: &str, category: CategoryId) -> InputDocument {
        InputDocument::new(name, category, b"PK\x03\x04 docx".to_vec())
    }

    fn meta() -> DossierMeta {
        DossierMeta::new("impd")
            .with_title("Study XYZ-001")
            .generated_at(Utc.with_ymd_and_hms(2026, 2, 1, 12, 0, 0).unwrap())
    }

    fn compile_with(
        docs: Vec<InputDocument>,
        config: &CompileConfig,
        backend: &PdfBackend,
    ) -> Result<(PaginationPlan, AssembleResult)> {
        let cancel = CancelToken::new();
        let prepared = prepare(classify(docs), backend.merger.as_ref(), &cancel)?;
        let plan = plan(&prepared, &config.layout);
        let toc = render_toc(&plan, &config.layout);
        let result = assemble(&meta(), prepared, &plan, &toc, backend, config, &cancel)?;
        Ok((plan, result))
    }

    fn compile(docs: Vec<InputDocument>) -> (PaginationPlan, AssembleResult) {
        let config = CompileConfig::default();
        compile_with(docs, &config, &PdfBackend::lopdf(&config.layout)).unwrap()
    }

    fn reload(result: &AssembleResult) -> Document {
        Document::load_mem(&result.artifact.bytes).unwrap()
    }

    fn text_on(doc: &Document, page: u32) -> String {
        page_text(doc, page).unwrap_or_default()
    }

    fn assert_footer(doc: &Document, page: u32) {
        let text = text_on(doc, page);
        assert!(
            text.contains(&format!("(Page {page})")),
            "page {page} lacks its footer: {text}"
        );
    }

    fn scenario() -> Vec<InputDocument> {
        vec![
            pdf("protocol.pdf", CategoryId::Protocol, 3, 250 * KIB),
            other("brochure.docx", CategoryId::Ib),
            pdf("letter.pdf", CategoryId::Other, 1, 50 * KIB),
        ]
    }

    #[test]
    fn planned_pages_match_assembled_offsets() {
        let (plan, result) = compile(scenario());
        let doc = reload(&result);

        assert_eq!(result.artifact.page_count, 13);
        assert_eq!(page_count(&doc), 13);
        assert_eq!(plan.total_pages, 13);

        // Every synthetic page carries its planned number.
        for page in [1, 2, 3, 4, 8, 9, 10, 11, 13] {
            assert_footer(&doc, page);
        }
        for category in &plan.categories {
            assert_footer(&doc, category.start_page);
            for entry in &category.documents {
                assert_footer(&doc, entry.start_page);
            }
        }

        // Embedded content sits right after its document cover.
        assert!(text_on(&doc, 5).contains("(protocol.pdf 1)"));
        assert!(text_on(&doc, 7).contains("(protocol.pdf 3)"));
        assert!(text_on(&doc, 12).contains("(letter.pdf 1)"));

        // The ToC points at those pages.
        let toc = text_on(&doc, 2);
        assert!(toc.contains("(1. Clinical Trial Protocol)"));
        assert!(toc.contains("(Page 9)"));
        assert!(toc.contains("(Page 11)"));
    }

    #[test]
    fn multi_page_toc_shifts_body_offsets() {
        let mut config = CompileConfig::default();
        config.layout.toc_entries_per_page = 4;
        let backend = PdfBackend::lopdf(&config.layout);

        let (plan, result) = compile_with(
            vec![
                other("synopsis.docx", CategoryId::Protocol),
                other("amendment.docx", CategoryId::Protocol),
                other("spec.docx", CategoryId::Quality),
                other("stability.docx", CategoryId::Quality),
                other("gmp.docx", CategoryId::Quality),
                other("a.docx", CategoryId::Other),
                other("b.docx", CategoryId::Other),
                pdf("letter.pdf", CategoryId::Other, 1, 10 * KIB),
            ],
            &config,
            &backend,
        )
        .unwrap();
        let doc = reload(&result);

        // 3 categories + 8 documents at 4 lines per page.
        assert_eq!(plan.toc_page_count, 3);
        assert_eq!(plan.body_start_page, 5);
        assert_eq!(plan.total_pages, 17);
        assert_eq!(page_count(&doc) as u32, plan.total_pages);

        for page in 1..=4 {
            assert_footer(&doc, page);
        }
        for category in &plan.categories {
            assert_footer(&doc, category.start_page);
            for entry in &category.documents {
                assert_footer(&doc, entry.start_page);
            }
        }
        assert_footer(&doc, plan.summary_page);

        assert!(text_on(&doc, 3).contains("continued"));
        assert!(text_on(&doc, 3).contains("(3. Other Documents)"));
        let last_toc = text_on(&doc, 4);
        assert!(last_toc.contains("(3.3 letter.pdf)"));
        assert!(last_toc.contains("(Page 15)"));
        assert!(text_on(&doc, 16).contains("(letter.pdf 1)"));
    }

    #[test]
    fn many_failures_keep_summary_disclaimer() {
        let mut config = CompileConfig::default();
        config.disclaimer = "Verify against the source documents.".into();
        let backend = PdfBackend::lopdf(&config.layout);

        let docs = (0..40)
            .map(|i| {
                InputDocument::new(
                    format!("corrupt-{i:02}.pdf"),
                    CategoryId::Quality,
                    b"%PDF-1.4 junk".to_vec(),
                )
            })
            .collect();
        let (plan, result) = compile_with(docs, &config, &backend).unwrap();
        let doc = reload(&result);

        assert_eq!(result.failed_documents.len(), 40);
        assert_eq!(plan.toc_page_count, 2);
        assert_eq!(page_count(&doc) as u32, plan.total_pages);

        let summary = text_on(&doc, plan.summary_page);
        assert!(summary.contains("(Not merged: corrupt-00.pdf)"));
        assert!(summary.contains("(... and 30 more)"));
        assert!(summary.contains("(Verify against the source documents.)"));
        assert_footer(&doc, plan.summary_page);
    }

    #[test]
    fn artifact_metadata() {
        let (_, result) = compile(scenario());
        let artifact = &result.artifact;
        assert_eq!(artifact.file_name, "impd_dossier_20260201-120000.pdf");
        assert_eq!(artifact.document_count, 3);
        assert_eq!(artifact.dossier_type, "impd");
        assert_eq!(
            artifact.dossier_type_label,
            "Investigational Medicinal Product Dossier (IMPD)"
        );
        assert_eq!(artifact.sha256, sha256_hex(&artifact.bytes));
        assert!(artifact.bytes.starts_with(b"%PDF"));
        assert!(result.failed_documents.is_empty());

        let cover = text_on(&reload(&result), 1);
        assert!(cover.contains("(Study XYZ-001)"));
        assert!(cover.contains("(Documents included: 3)"));
    }

    #[test]
    fn short_document_is_padded() {
        // Estimated at 3 content pages, really 1.
        let (plan, result) = compile(vec![pdf("short.pdf", CategoryId::Quality, 1, 250 * KIB)]);
        let doc = reload(&result);

        assert_eq!(page_count(&doc) as u32, plan.total_pages);
        assert!(text_on(&doc, 5).contains("(short.pdf 1)"));
        assert!(text_on(&doc, 6).contains("intentionally left blank"));
        assert_footer(&doc, 7);
        assert_footer(&doc, plan.summary_page);
    }

    #[test]
    fn long_document_is_cut_in_strict_mode() {
        // Estimated at 1 content page, really 4.
        let (plan, result) = compile(vec![
            pdf("long.pdf", CategoryId::Clinical, 4, 10 * KIB),
            other("notes.docx", CategoryId::Clinical),
        ]);
        let doc = reload(&result);

        assert_eq!(plan.total_pages, 7);
        assert_eq!(page_count(&doc), 7);
        assert!(text_on(&doc, 4).contains("Showing the first 1 of 4 pages"));
        assert!(text_on(&doc, 5).contains("(long.pdf 1)"));
        assert_footer(&doc, 6);
        assert_eq!(result.artifact.page_count, 7);
    }

    #[test]
    fn long_document_is_kept_whole_when_not_strict() {
        let mut config = CompileConfig::default();
        config.layout.strict_page_budget = false;
        let backend = PdfBackend::lopdf(&config.layout);

        let (plan, result) = compile_with(
            vec![pdf("long.pdf", CategoryId::Clinical, 4, 10 * KIB)],
            &config,
            &backend,
        )
        .unwrap();

        assert_eq!(plan.total_pages, 6);
        assert_eq!(result.artifact.page_count, 9);
    }

    #[test]
    fn unreadable_document_gets_error_page() {
        let (plan, result) = compile(vec![
            InputDocument::new("corrupt.pdf", CategoryId::Quality, b"%PDF-1.4 junk".to_vec()),
            pdf("ok.pdf", CategoryId::Quality, 1, 10 * KIB),
        ]);
        let doc = reload(&result);

        assert_eq!(plan.document_count(), 2);
        assert_eq!(result.failed_documents, vec!["corrupt.pdf".to_string()]);
        assert!(text_on(&doc, 4).contains("could not be merged"));
        assert_footer(&doc, 5);
        assert!(text_on(&doc, 6).contains("(ok.pdf 1)"));

        let summary = text_on(&doc, plan.summary_page);
        assert!(summary.contains("(Not merged: corrupt.pdf)"));
    }

    /// Opens everything, but refuses to merge content carrying the marker.
    struct PoisonedMerger;

    impl DocumentMerger for PoisonedMerger {
        fn open(&self, name: &str, bytes: &[u8]) -> Result<Document> {
            LopdfMerger.open(name, bytes)
        }

        fn merge(&self, parts: Vec<Document>) -> Result<Document> {
            let poisoned = parts.iter().any(|part| {
                (1..=page_count(part) as u32)
                    .any(|n| page_text(part, n).is_some_and(|t| t.contains("POISON")))
            });
            if poisoned {
                return Err(DossierError::render("unsupported object stream"));
            }
            LopdfMerger.merge(parts)
        }
    }

    #[test]
    fn late_merge_failure_keeps_slot_size() {
        let config = CompileConfig::default();
        let backend = PdfBackend::new(
            Box::new(LopdfRenderer::from_layout(&config.layout)),
            Box::new(PoisonedMerger),
        );

        let (plan, result) = compile_with(
            vec![
                labelled_pdf("poison.pdf", "POISON", CategoryId::Nonclinical, 250 * KIB),
                other("study.xlsx", CategoryId::Nonclinical),
            ],
            &config,
            &backend,
        )
        .unwrap();
        let doc = reload(&result);

        assert_eq!(result.failed_documents, vec!["poison.pdf".to_string()]);
        assert_eq!(page_count(&doc) as u32, plan.total_pages);
        assert!(text_on(&doc, 4).contains("could not be merged"));
        for page in 5..=7 {
            assert!(text_on(&doc, page).contains("intentionally left blank"));
        }
        assert_footer(&doc, 8);
    }

    #[test]
    fn missing_type_is_rejected() {
        let mut meta = meta();
        meta.dossier_type = None;
        let err = validate_request(&meta, 3).unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("Dossier type is required"));

        meta.dossier_type = Some("   ".into());
        assert!(validate_request(&meta, 3).unwrap_err().is_configuration());
    }

    #[test]
    fn empty_document_list_is_rejected() {
        let err = validate_request(&meta(), 0).unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("No documents provided"));
    }

    #[test]
    fn toc_page_mismatch_is_a_render_error() {
        let config = CompileConfig::default();
        let backend = PdfBackend::lopdf(&config.layout);
        let cancel = CancelToken::new();
        let prepared = prepare(classify(scenario()), backend.merger.as_ref(), &cancel).unwrap();
        let plan = plan(&prepared, &LayoutConfig::default());

        let err = assemble(&meta(), prepared, &plan, &[], &backend, &config, &cancel).unwrap_err();
        assert!(matches!(err, DossierError::Render(_)));
    }

    #[test]
    fn cancellation_stops_assembly() {
        let config = CompileConfig::default();
        let backend = PdfBackend::lopdf(&config.layout);
        let cancel = CancelToken::new();
        let prepared = prepare(classify(scenario()), backend.merger.as_ref(), &cancel).unwrap();
        let plan = plan(&prepared, &config.layout);
        let toc = render_toc(&plan, &config.layout);

        cancel.cancel();
        let err = assemble(&meta(), prepared, &plan, &toc, &backend, &config, &cancel).unwrap_err();
        assert!(matches!(err, DossierError::Cancelled));
    }
}
