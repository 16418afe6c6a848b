//! Document selection from disk: TOML manifests and `category=path` pairs.
//!
//! A manifest looks like:
//!
//! ```toml
//! dossier_type = "impd"
//! title = "Study XYZ-001"
//!
//! [[documents]]
//! path = "protocol/protocol-v3.pdf"
//! category = "protocol"
//!
//! [[documents]]
//! path = "quality/specification.docx"
//! category = "quality"
//! name = "Drug substance specification.docx"
//! ```
//!
//! Relative paths are resolved against the manifest's directory.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, info, instrument};

use dossier_shared::{CategoryId, DossierError, InputDocument, MimeKind, Result};

/// Parsed manifest file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub dossier_type: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub documents: Vec<ManifestEntry>,
}

/// One `[[documents]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct ManifestEntry {
    pub path: PathBuf,
    /// Category id; missing or unknown ids land in `other`.
    #[serde(default)]
    pub category: Option<String>,
    /// Name shown in the dossier. Defaults to the file name.
    #[serde(default)]
    pub name: Option<String>,
    /// Declared MIME type, overriding detection from the file name.
    #[serde(default)]
    pub mime_type: Option<String>,
}

impl Manifest {
    /// Read every listed document. Relative paths resolve against `base_dir`.
    #[instrument(skip_all, fields(documents = self.documents.len()))]
    pub fn load_documents(&self, base_dir: &Path) -> Result<Vec<InputDocument>> {
        self.documents
            .iter()
            .map(|entry| {
                let path = if entry.path.is_absolute() {
                    entry.path.clone()
                } else {
                    base_dir.join(&entry.path)
                };
                let category = entry
                    .category
                    .as_deref()
                    .map(CategoryId::from_label)
                    .unwrap_or_default();

                let mut doc = load_document(&path, category)?;
                if let Some(name) = entry.name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
                    doc.name = name.to_string();
                }
                if let Some(mime) = &entry.mime_type {
                    doc.mime_kind = MimeKind::from_mime_type(mime);
                }
                Ok(doc)
            })
            .collect()
    }
}

/// Load and parse a manifest file.
pub fn load_manifest(path: &Path) -> Result<Manifest> {
    let content = std::fs::read_to_string(path).map_err(|e| DossierError::io(path, e))?;
    let manifest: Manifest = toml::from_str(&content)
        .map_err(|e| DossierError::validation(format!("invalid manifest {}: {e}", path.display())))?;

    info!(path = %path.display(), documents = manifest.documents.len(), "manifest loaded");
    Ok(manifest)
}

/// Read a document from disk into an [`InputDocument`].
pub fn load_document(path: &Path, category: CategoryId) -> Result<InputDocument> {
    let content = std::fs::read(path).map_err(|e| DossierError::io(path, e))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| DossierError::validation(format!("not a file path: {}", path.display())))?;

    let doc = InputDocument::new(name, category, content);
    debug!(
        document = %doc.name,
        category = %doc.category,
        size = doc.size_bytes,
        pdf = doc.is_pdf(),
        "document loaded"
    );
    Ok(doc)
}

/// Parse a `category=path` selection. A bare path goes to `other`.
pub fn parse_document_arg(arg: &str) -> Result<(CategoryId, PathBuf)> {
    let (category, path) = match arg.split_once('=') {
        Some((category, path)) => (CategoryId::from_label(category), path),
        None => (CategoryId::Other, arg),
    };
    let path = path.trim();
    if path.is_empty() {
        return Err(DossierError::validation(format!(
            "document selection '{arg}' has no path"
        )));
    }
    Ok((category, PathBuf::from(path)))
}
