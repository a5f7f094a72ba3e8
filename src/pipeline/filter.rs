//! The filter/sort pipeline.
//!
//! Stages run in a fixed order: search, kind bucket, tags, sort. Each filter
//! stage narrows the set (intersection across stages); within the tag stage
//! any selected tag is enough (union within the stage). The whole chain is
//! pure and idempotent: applying a state to its own output changes nothing.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::sort::{SortKey, sort_documents};
use crate::document::Document;
use crate::kind::KindFilter;

/// Everything the pipeline needs to know about the user's choices.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterState {
    pub search_text: String,
    pub active_kind: KindFilter,
    pub selected_tags: BTreeSet<String>,
    pub sort: SortKey,
}

impl FilterState {
    /// Whether any filter stage is active (sort does not count).
    pub fn is_filtering(&self) -> bool {
        !self.search_text.is_empty()
            || self.active_kind != KindFilter::All
            || !self.selected_tags.is_empty()
    }
}

/// Case-insensitive substring match on the name or any tag.
pub fn matches_search(doc: &Document, needle_lower: &str) -> bool {
    needle_lower.is_empty()
        || doc.name.to_lowercase().contains(needle_lower)
        || doc
            .tags
            .iter()
            .any(|t| t.to_lowercase().contains(needle_lower))
}

/// At least one of the document's tags is selected.
pub fn matches_tags(doc: &Document, selected: &BTreeSet<String>) -> bool {
    selected.is_empty() || doc.tags.iter().any(|t| selected.contains(t))
}

/// Run the pipeline over `documents`.
pub fn apply(documents: &[Document], state: &FilterState) -> Vec<Document> {
    if documents.is_empty() {
        return Vec::new();
    }

    let needle = state.search_text.to_lowercase();
    let mut result: Vec<Document> = documents
        .iter()
        .filter(|d| matches_search(d, &needle))
        .filter(|d| state.active_kind.matches(&d.file_kind))
        .filter(|d| matches_tags(d, &state.selected_tags))
        .cloned()
        .collect();

    sort_documents(&mut result, state.sort);
    result
}
