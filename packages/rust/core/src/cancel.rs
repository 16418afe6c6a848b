//! Cooperative cancellation, checked between documents.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use dossier_shared::{DossierError, Result};

/// Cloneable cancellation flag shared between the caller and a running compilation.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Return `Err(Cancelled)` once [`cancel`](Self::cancel) has been called.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(DossierError::Cancelled)
        } else {
            Ok(())
        }
    }
}
