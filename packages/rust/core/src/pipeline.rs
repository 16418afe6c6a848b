//! End-to-end `compile` pipeline: documents → classify → prepare → plan →
//! ToC → assemble → sink.

use std::time::Instant;

use tokio::runtime::{Handle, RuntimeFlavor};
use tracing::{info, instrument};

use dossier_artifacts::DownloadSink;
use dossier_pdf::PdfBackend;
use dossier_shared::{CompileConfig, CompileReport, InputDocument, PaginationPlan, Result};

use crate::assembler::{self, DossierMeta};
use crate::cancel::CancelToken;
use crate::classifier::classify;
use crate::planner::{self, PreparedDossier};
use crate::toc;

/// One compilation request.
#[derive(Debug, Clone)]
pub struct CompileRequest {
    pub meta: DossierMeta,
    pub documents: Vec<InputDocument>,
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called when the artifact has been delivered.
    fn done(&self, report: &CompileReport);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn done(&self, _report: &CompileReport) {}
}

/// Run the full compilation and hand the artifact to `sink`.
///
/// 1. Validate the request
/// 2. Classify documents into categories
/// 3. Open embeddable documents
/// 4. Plan pagination
/// 5. Render the table of contents
/// 6. Assemble the PDF
/// 7. Deliver it
///
/// Invalid requests fail before any work is done. Documents that cannot be
/// merged do not fail the run; they are listed in the report.
///
/// Opening documents, assembly and delivery are CPU- and disk-bound. On a multi-threaded
/// runtime they run under [`tokio::task::block_in_place`], so other tasks keep
/// being polled; on a current-thread runtime they block it until done.
#[instrument(skip_all, fields(documents = request.documents.len()))]
pub async fn compile(
    request: CompileRequest,
    config: &CompileConfig,
    backend: &PdfBackend,
    sink: &dyn DownloadSink,
    progress: &dyn ProgressReporter,
    cancel: &CancelToken,
) -> Result<CompileReport> {
    let start = Instant::now();
    let run_id = uuid::Uuid::now_v7().to_string();

    validate_config(config)?;
    assembler::validate_request(&request.meta, request.documents.len())?;

    info!(%run_id, documents = request.documents.len(), "starting compile pipeline");

    let CompileRequest { meta, documents } = request;

    // --- Phase 1: Classify + inspect ---
    progress.phase("Inspecting documents");
    let prepared = run_blocking(|| prepare_documents(documents, backend, cancel))?;
    tokio::task::yield_now().await;

    // --- Phase 2: Plan ---
    progress.phase("Planning pagination");
    let plan = planner::plan(&prepared, &config.layout);

    // --- Phase 3: Table of contents ---
    progress.phase("Rendering table of contents");
    let toc_pages = toc::render_toc(&plan, &config.layout);
    tokio::task::yield_now().await;

    // --- Phase 4: Assemble ---
    progress.phase("Assembling dossier");
    let assembled = run_blocking(|| {
        assembler::assemble(&meta, prepared, &plan, &toc_pages, backend, config, cancel)
    })?;
    cancel.check()?;

    // --- Phase 5: Deliver ---
    progress.phase("Saving dossier");
    let artifact = assembled.artifact;
    run_blocking(|| sink.deliver(&artifact.bytes, &artifact.file_name))?;

    let report = CompileReport {
        success: true,
        message: report_message(
            &artifact.dossier_type_label,
            artifact.document_count,
            artifact.page_count,
            assembled.failed_documents.len(),
        ),
        file_name: artifact.file_name,
        document_count: artifact.document_count,
        dossier_type: artifact.dossier_type,
        page_count: artifact.page_count,
        sha256: artifact.sha256,
        failed_documents: assembled.failed_documents,
        run_id,
    };

    progress.done(&report);

    info!(
        run_id = %report.run_id,
        file = %report.file_name,
        pages = report.page_count,
        failed = report.failed_documents.len(),
        elapsed_ms = start.elapsed().as_millis(),
        "compile pipeline complete"
    );

    Ok(report)
}

/// Classify, inspect and plan without rendering anything.
#[instrument(skip_all, fields(documents = request.documents.len()))]
pub fn plan_only(
    request: CompileRequest,
    config: &CompileConfig,
    backend: &PdfBackend,
    cancel: &CancelToken,
) -> Result<PaginationPlan> {
    validate_config(config)?;
    assembler::validate_request(&request.meta, request.documents.len())?;

    let prepared = prepare_documents(request.documents, backend, cancel)?;
    Ok(planner::plan(&prepared, &config.layout))
}

/// Check `config`, including that the ToC line capacity fits the page geometry.
pub fn validate_config(config: &CompileConfig) -> Result<()> {
    config.validate()?;
    toc::check_capacity(&config.layout)
}

/// Run blocking work without stalling other tasks on a multi-threaded runtime.
fn run_blocking<T>(work: impl FnOnce() -> T) -> T {
    match Handle::try_current() {
        Ok(handle) if matches!(handle.runtime_flavor(), RuntimeFlavor::MultiThread) => {
            tokio::task::block_in_place(work)
        }
        _ => work(),
    }
}

fn prepare_documents(
    documents: Vec<InputDocument>,
    backend: &PdfBackend,
    cancel: &CancelToken,
) -> Result<PreparedDossier> {
    let categorized = classify(documents);
    planner::prepare(categorized, backend.merger.as_ref(), cancel)
}

fn report_message(type_label: &str, documents: usize, pages: u32, failed: usize) -> String {
    let mut message = format!("{type_label} compiled: {documents} documents, {pages} pages");
    if failed > 0 {
        message.push_str(&format!("; {failed} could not be merged"));
    }
    message
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
