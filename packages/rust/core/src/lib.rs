//! Core compilation logic for the dossier compiler.
//!
//! This crate ties together classification, pagination planning, ToC
//! rendering and PDF assembly into the end-to-end [`pipeline::compile`]
//! workflow.

pub mod assembler;
pub mod cancel;
pub mod classifier;
pub mod manifest;
pub mod pages;
pub mod pipeline;
pub mod planner;
pub mod toc;

pub use assembler::{AssembleResult, DossierMeta};
pub use cancel::CancelToken;
pub use pipeline::{
    CompileRequest, ProgressReporter, SilentProgress, compile, plan_only, validate_config,
};
