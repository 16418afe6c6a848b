//! Shared types, error model, and configuration for the dossier compiler.
//!
//! This crate is the foundation depended on by all other dossier crates.
//! It provides:
//! - [`DossierError`]: the unified error type
//! - Domain types ([`InputDocument`], [`CategoryId`], [`PaginationPlan`], [`CompiledArtifact`])
//! - Configuration ([`AppConfig`], [`CompileConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, CompileConfig, LayoutConfig, OutputConfig, SummaryConfig, config_dir,
    config_file_path, init_config, load_config, load_config_from,
};
pub use error::{DossierError, Result};
pub use types::{
    CategoryEntry, CategoryId, CompileReport, CompiledArtifact, DocumentEntry, DocumentOutcome,
    InputDocument, MimeKind, PaginationPlan, dossier_type_label,
};
