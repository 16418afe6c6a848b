//! Category classifier.
//!
//! Groups input documents by category and exposes the groups in canonical
//! priority order, independent of the order documents arrived in.

use std::collections::BTreeMap;

use tracing::{debug, instrument};

use dossier_shared::{CategoryId, InputDocument};

/// Documents grouped by category.
///
/// Backed by a `BTreeMap` keyed on [`CategoryId`], whose `Ord` is the
/// canonical order. Only categories that received a document are present.
#[derive(Debug, Default)]
pub struct CategorizedDocuments {
    groups: BTreeMap<CategoryId, Vec<InputDocument>>,
}

impl CategorizedDocuments {
    /// Groups in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (CategoryId, &[InputDocument])> {
        self.groups.iter().map(|(id, docs)| (*id, docs.as_slice()))
    }

    /// Category ids present, in canonical order.
    pub fn categories(&self) -> Vec<CategoryId> {
        self.groups.keys().copied().collect()
    }

    pub fn get(&self, id: CategoryId) -> Option<&[InputDocument]> {
        self.groups.get(&id).map(Vec::as_slice)
    }

    pub fn document_count(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

impl IntoIterator for CategorizedDocuments {
    type Item = (CategoryId, Vec<InputDocument>);
    type IntoIter = std::collections::btree_map::IntoIter<CategoryId, Vec<InputDocument>>;

    fn into_iter(self) -> Self::IntoIter {
        self.groups.into_iter()
    }
}

/// Group documents by category, keeping arrival order within each group.
#[instrument(skip_all, fields(documents = documents.len()))]
pub fn classify(documents: Vec<InputDocument>) -> CategorizedDocuments {
    let mut groups: BTreeMap<CategoryId, Vec<InputDocument>> = BTreeMap::new();
    for doc in documents {
        groups.entry(doc.category).or_default().push(doc);
    }

    debug!(
        categories = ?groups.keys().map(CategoryId::as_str).collect::<Vec<_>>(),
        "documents classified"
    );

    CategorizedDocuments { groups }
}
