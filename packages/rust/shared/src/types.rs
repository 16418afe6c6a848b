//! Core domain types for dossier compilation.

use std::path::Path;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// CategoryId
// ---------------------------------------------------------------------------

/// Regulatory document category.
///
/// Variant declaration order is the canonical priority order, so the derived
/// `Ord` sorts categories the way they appear in a compiled dossier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CategoryId {
    Protocol,
    Ib,
    Quality,
    Nonclinical,
    Clinical,
    Application,
    #[default]
    Other,
}

impl CategoryId {
    /// All categories in canonical priority order.
    pub const ALL: [CategoryId; 7] = [
        CategoryId::Protocol,
        CategoryId::Ib,
        CategoryId::Quality,
        CategoryId::Nonclinical,
        CategoryId::Clinical,
        CategoryId::Application,
        CategoryId::Other,
    ];

    /// Parse a caller-supplied category id. Unknown or blank ids map to `Other`.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "protocol" => Self::Protocol,
            "ib" => Self::Ib,
            "quality" => Self::Quality,
            "nonclinical" => Self::Nonclinical,
            "clinical" => Self::Clinical,
            "application" => Self::Application,
            _ => Self::Other,
        }
    }

    /// Stable machine id.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Protocol => "protocol",
            Self::Ib => "ib",
            Self::Quality => "quality",
            Self::Nonclinical => "nonclinical",
            Self::Clinical => "clinical",
            Self::Application => "application",
            Self::Other => "other",
        }
    }

    /// Human-readable name printed on dividers and in the table of contents.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Protocol => "Clinical Trial Protocol",
            Self::Ib => "Investigator's Brochure",
            Self::Quality => "Quality Documentation",
            Self::Nonclinical => "Non-clinical Documentation",
            Self::Clinical => "Clinical Documentation",
            Self::Application => "Application Forms",
            Self::Other => "Other Documents",
        }
    }
}

impl From<String> for CategoryId {
    fn from(value: String) -> Self {
        Self::from_label(&value)
    }
}

impl From<CategoryId> for String {
    fn from(value: CategoryId) -> Self {
        value.as_str().to_string()
    }
}

impl std::fmt::Display for CategoryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// InputDocument
// ---------------------------------------------------------------------------

/// Whether a document's content can be embedded page-by-page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MimeKind {
    Pdf,
    Other,
}

impl MimeKind {
    /// Detect from a file name extension (case-insensitive `.pdf`).
    pub fn from_file_name(name: &str) -> Self {
        let is_pdf = Path::new(name)
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
        if is_pdf { Self::Pdf } else { Self::Other }
    }

    /// Detect from a declared MIME type.
    pub fn from_mime_type(mime: &str) -> Self {
        if mime.trim().eq_ignore_ascii_case("application/pdf") {
            Self::Pdf
        } else {
            Self::Other
        }
    }
}

/// A caller-supplied document to be compiled into the dossier.
#[derive(Clone)]
pub struct InputDocument {
    /// File name shown in the table of contents.
    pub name: String,
    /// Declared size, used for page estimation.
    pub size_bytes: u64,
    pub mime_kind: MimeKind,
    pub category: CategoryId,
    /// Raw binary content.
    pub content: Vec<u8>,
}

impl InputDocument {
    /// Build a document from its name and bytes, detecting the mime kind from the name.
    pub fn new(name: impl Into<String>, category: CategoryId, content: Vec<u8>) -> Self {
        let name = name.into();
        Self {
            mime_kind: MimeKind::from_file_name(&name),
            size_bytes: content.len() as u64,
            name,
            category,
            content,
        }
    }

    pub fn is_pdf(&self) -> bool {
        self.mime_kind == MimeKind::Pdf
    }
}

impl std::fmt::Debug for InputDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InputDocument")
            .field("name", &self.name)
            .field("size_bytes", &self.size_bytes)
            .field("mime_kind", &self.mime_kind)
            .field("category", &self.category)
            .field("content_len", &self.content.len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// PaginationPlan
// ---------------------------------------------------------------------------

/// How a document is represented in the compiled dossier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum DocumentOutcome {
    /// Synthetic cover followed by `content_pages` pages of the source PDF.
    Embedded { content_pages: u32 },
    /// A single page describing a non-PDF document.
    Referenced,
    /// A single error page; the source could not be embedded.
    Failed { reason: String },
}

impl DocumentOutcome {
    /// Pages this outcome occupies in the dossier body.
    pub fn page_count(&self) -> u32 {
        match self {
            Self::Embedded { content_pages } => 1 + content_pages,
            Self::Referenced | Self::Failed { .. } => 1,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Embedded { .. } => "embedded",
            Self::Referenced => "referenced",
            Self::Failed { .. } => "failed",
        }
    }
}

/// Planned position of one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentEntry {
    pub name: String,
    pub start_page: u32,
    pub page_count: u32,
    #[serde(flatten)]
    pub outcome: DocumentOutcome,
}

/// Planned position of one category and its documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryEntry {
    pub id: CategoryId,
    pub display_name: String,
    /// Page of the category divider.
    pub start_page: u32,
    pub documents: Vec<DocumentEntry>,
}

/// Page number of every structural element of a dossier, computed before rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationPlan {
    pub toc_start_page: u32,
    pub toc_page_count: u32,
    pub body_start_page: u32,
    pub categories: Vec<CategoryEntry>,
    pub summary_page: u32,
    pub total_pages: u32,
}

impl PaginationPlan {
    pub fn document_count(&self) -> usize {
        self.categories.iter().map(|c| c.documents.len()).sum()
    }

    /// Iterate all document entries in walk order.
    pub fn documents(&self) -> impl Iterator<Item = &DocumentEntry> {
        self.categories.iter().flat_map(|c| c.documents.iter())
    }

    /// Names of documents whose outcome is `failed`.
    pub fn failed_documents(&self) -> Vec<String> {
        self.documents()
            .filter(|d| matches!(d.outcome, DocumentOutcome::Failed { .. }))
            .map(|d| d.name.clone())
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Artifact
// ---------------------------------------------------------------------------

/// The assembled dossier, ready to be handed to a download sink.
#[derive(Clone)]
pub struct CompiledArtifact {
    pub bytes: Vec<u8>,
    pub file_name: String,
    pub document_count: usize,
    pub dossier_type: String,
    pub dossier_type_label: String,
    pub page_count: u32,
    /// Hex SHA-256 of `bytes`.
    pub sha256: String,
}

impl std::fmt::Debug for CompiledArtifact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledArtifact")
            .field("file_name", &self.file_name)
            .field("document_count", &self.document_count)
            .field("dossier_type", &self.dossier_type)
            .field("page_count", &self.page_count)
            .field("size_bytes", &self.bytes.len())
            .field("sha256", &self.sha256)
            .finish()
    }
}

/// Result record returned to the caller after a compilation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompileReport {
    pub success: bool,
    pub file_name: String,
    pub message: String,
    pub document_count: usize,
    pub dossier_type: String,
    pub page_count: u32,
    pub sha256: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failed_documents: Vec<String>,
    pub run_id: String,
}

/// Human-readable label for a dossier type id.
pub fn dossier_type_label(dossier_type: &str) -> String {
    match dossier_type.trim().to_ascii_lowercase().as_str() {
        "impd" | "imp" => "Investigational Medicinal Product Dossier (IMPD)".to_string(),
        "ind" => "Investigational New Drug Application (IND)".to_string(),
        "cta" => "Clinical Trial Application (CTA)".to_string(),
        "ctd" => "Common Technical Document (CTD)".to_string(),
        other => other.to_uppercase(),
    }
}
