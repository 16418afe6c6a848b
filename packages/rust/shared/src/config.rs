//! Application configuration for the dossier compiler.
//!
//! User config lives at `~/.dossier/dossier.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{DossierError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "dossier.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".dossier";

/// Bytes of embedded PDF assumed to fill one page (100 KiB).
pub const DEFAULT_BYTES_PER_PAGE: u64 = 100 * 1024;

// ---------------------------------------------------------------------------
// Config structs (matching dossier.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Page layout and pagination estimates.
    #[serde(default)]
    pub layout: LayoutConfig,

    /// Where compiled dossiers are written.
    #[serde(default)]
    pub output: OutputConfig,

    /// Closing summary page.
    #[serde(default)]
    pub summary: SummaryConfig,
}

/// `[layout]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutConfig {
    /// Bytes of embedded PDF content assumed per page when estimating page counts.
    #[serde(default = "default_bytes_per_page")]
    pub bytes_per_page_estimate: u64,

    /// Entry lines that fit on one table-of-contents page.
    #[serde(default = "default_toc_entries_per_page")]
    pub toc_entries_per_page: u32,

    /// Document names longer than this are truncated in the table of contents.
    #[serde(default = "default_toc_name_max_chars")]
    pub toc_name_max_chars: usize,

    /// Keep embedded documents within their estimated page budget.
    #[serde(default = "default_true")]
    pub strict_page_budget: bool,

    /// Page width in PDF points (A4 by default).
    #[serde(default = "default_page_width")]
    pub page_width_pt: f32,

    /// Page height in PDF points.
    #[serde(default = "default_page_height")]
    pub page_height_pt: f32,

    /// Uniform page margin in PDF points.
    #[serde(default = "default_margin")]
    pub margin_pt: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            bytes_per_page_estimate: default_bytes_per_page(),
            toc_entries_per_page: default_toc_entries_per_page(),
            toc_name_max_chars: default_toc_name_max_chars(),
            strict_page_budget: true,
            page_width_pt: default_page_width(),
            page_height_pt: default_page_height(),
            margin_pt: default_margin(),
        }
    }
}

fn default_bytes_per_page() -> u64 {
    DEFAULT_BYTES_PER_PAGE
}
fn default_toc_entries_per_page() -> u32 {
    32
}
fn default_toc_name_max_chars() -> usize {
    40
}
fn default_true() -> bool {
    true
}
fn default_page_width() -> f32 {
    595.0
}
fn default_page_height() -> f32 {
    842.0
}
fn default_margin() -> f32 {
    56.0
}

/// `[output]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory compiled dossiers are saved to.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
        }
    }
}

fn default_output_dir() -> String {
    "dossiers".into()
}

/// `[summary]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryConfig {
    /// Disclaimer printed at the bottom of the closing summary page.
    #[serde(default = "default_disclaimer")]
    pub disclaimer: String,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            disclaimer: default_disclaimer(),
        }
    }
}

fn default_disclaimer() -> String {
    "This dossier was compiled automatically. Page counts of embedded documents are \
     estimated; verify the content of every section against the source documents \
     before regulatory submission."
        .into()
}

// ---------------------------------------------------------------------------
// Compile config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime compilation settings, merged from the config file and CLI flags.
#[derive(Debug, Clone)]
pub struct CompileConfig {
    pub layout: LayoutConfig,
    /// Directory the file sink writes into.
    pub output_dir: PathBuf,
    pub disclaimer: String,
}

impl From<&AppConfig> for CompileConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            layout: config.layout.clone(),
            output_dir: PathBuf::from(&config.output.output_dir),
            disclaimer: config.summary.disclaimer.clone(),
        }
    }
}

impl Default for CompileConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl CompileConfig {
    /// Reject layout values that would make pagination meaningless.
    pub fn validate(&self) -> Result<()> {
        let layout = &self.layout;
        if layout.bytes_per_page_estimate == 0 {
            return Err(DossierError::configuration(
                "layout.bytes_per_page_estimate must be greater than zero",
            ));
        }
        if layout.toc_entries_per_page == 0 {
            return Err(DossierError::configuration(
                "layout.toc_entries_per_page must be greater than zero",
            ));
        }
        if layout.toc_name_max_chars < 4 {
            return Err(DossierError::configuration(
                "layout.toc_name_max_chars must be at least 4",
            ));
        }
        if layout.margin_pt * 2.0 >= layout.page_width_pt.min(layout.page_height_pt) {
            return Err(DossierError::configuration(
                "layout.margin_pt leaves no printable area",
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.dossier/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| DossierError::configuration("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.dossier/dossier.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| DossierError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        DossierError::configuration(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| DossierError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| DossierError::configuration(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| DossierError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("bytes_per_page_estimate = 102400"));
        assert!(toml_str.contains("output_dir"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.layout, LayoutConfig::default());
        assert_eq!(parsed.layout.toc_name_max_chars, 40);
    }

    #[test]
    fn partial_config_keeps_defaults() {
        let toml_str = r#"
[layout]
bytes_per_page_estimate = 51200
strict_page_budget = false

[output]
output_dir = "/tmp/dossiers"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.layout.bytes_per_page_estimate, 51_200);
        assert!(!config.layout.strict_page_budget);
        assert_eq!(config.layout.toc_entries_per_page, 32);
        assert_eq!(config.output.output_dir, "/tmp/dossiers");
        assert!(config.summary.disclaimer.contains("estimated"));
    }

    #[test]
    fn compile_config_from_app_config() {
        let app = AppConfig::default();
        let compile = CompileConfig::from(&app);
        assert_eq!(compile.layout.bytes_per_page_estimate, DEFAULT_BYTES_PER_PAGE);
        assert_eq!(compile.output_dir, PathBuf::from("dossiers"));
        assert!(compile.validate().is_ok());
    }

    #[test]
    fn compile_config_rejects_zero_capacity() {
        let mut compile = CompileConfig::default();
        compile.layout.toc_entries_per_page = 0;
        let err = compile.validate().unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("toc_entries_per_page"));

        let mut compile = CompileConfig::default();
        compile.layout.bytes_per_page_estimate = 0;
        assert!(compile.validate().is_err());
    }

    #[test]
    fn load_config_from_missing_file_is_io_error() {
        let err = load_config_from(Path::new("/nonexistent/dossier.toml")).unwrap_err();
        assert!(matches!(err, DossierError::Io { .. }));
    }
}
