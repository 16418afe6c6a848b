//! Artifact naming, checksums, and download sinks.
//!
//! A compiled dossier leaves the engine through a [`DownloadSink`]: the engine
//! hands over the bytes and a file name and keeps nothing.

use std::path::{Path, PathBuf};
use std::sync::{LazyLock, Mutex};

use chrono::{DateTime, Utc};
use regex::Regex;
use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument};

use dossier_shared::{DossierError, Result};

/// Timestamp format embedded in artifact file names.
const FILE_TIMESTAMP_FORMAT: &str = "%Y%m%d-%H%M%S";

static UNSAFE_FILE_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9_-]+").expect("valid regex"));

// ---------------------------------------------------------------------------
// Naming
// ---------------------------------------------------------------------------

/// Deterministic file name: `<dossier_type>_dossier_<timestamp>.pdf`.
pub fn artifact_file_name(dossier_type: &str, generated_at: DateTime<Utc>) -> String {
    format!(
        "{}_dossier_{}.pdf",
        sanitize_component(dossier_type),
        generated_at.format(FILE_TIMESTAMP_FORMAT)
    )
}

/// Replace runs of characters outside `[A-Za-z0-9_-]` with a single `_`.
pub fn sanitize_component(raw: &str) -> String {
    let cleaned = UNSAFE_FILE_CHARS.replace_all(raw.trim(), "_");
    let cleaned = cleaned.trim_matches('_');
    if cleaned.is_empty() {
        "dossier".to_string()
    } else {
        cleaned.to_string()
    }
}

/// Lowercase hex SHA-256 of `bytes`.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

// ---------------------------------------------------------------------------
// Sinks
// ---------------------------------------------------------------------------

/// Receives a finished artifact. Fire-and-forget from the engine's perspective.
pub trait DownloadSink: Send + Sync {
    fn deliver(&self, bytes: &[u8], file_name: &str) -> Result<()>;
}

/// Saves artifacts into a directory, writing to a temp file and renaming.
#[derive(Debug, Clone)]
pub struct FileSink {
    dir: PathBuf,
}

impl FileSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Where an artifact named `file_name` ends up.
    pub fn path_for(&self, file_name: &str) -> PathBuf {
        self.dir.join(file_name)
    }
}

impl DownloadSink for FileSink {
    #[instrument(skip(self, bytes), fields(dir = %self.dir.display(), size = bytes.len()))]
    fn deliver(&self, bytes: &[u8], file_name: &str) -> Result<()> {
        std::fs::create_dir_all(&self.dir).map_err(|e| DossierError::io(&self.dir, e))?;

        let target = self.path_for(file_name);
        let temp = self.dir.join(format!(".{file_name}.tmp"));

        // Write to temp file first
        if let Err(e) = std::fs::write(&temp, bytes) {
            let _ = std::fs::remove_file(&temp);
            return Err(DossierError::io(&temp, e));
        }

        // Atomic rename
        if let Err(e) = std::fs::rename(&temp, &target) {
            let _ = std::fs::remove_file(&temp);
            return Err(DossierError::io(&target, e));
        }

        info!(path = %target.display(), "artifact saved");
        Ok(())
    }
}

/// Keeps delivered artifacts in memory (headless and test usage).
#[derive(Debug, Default)]
pub struct MemorySink {
    delivered: Mutex<Vec<(String, Vec<u8>)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything delivered so far, in delivery order.
    pub fn delivered(&self) -> Vec<(String, Vec<u8>)> {
        self.delivered
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.delivered().is_empty()
    }
}

impl DownloadSink for MemorySink {
    fn deliver(&self, bytes: &[u8], file_name: &str) -> Result<()> {
        let mut guard = self
            .delivered
            .lock()
            .map_err(|_| DossierError::render("memory sink lock poisoned"))?;
        guard.push((file_name.to_string(), bytes.to_vec()));
        debug!(file = file_name, size = bytes.len(), "artifact kept in memory");
        Ok(())
    }
}
