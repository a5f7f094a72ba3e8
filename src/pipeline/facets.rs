//! Facet catalogue derived from a loaded document set.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::document::Document;

/// Category name of the managed-keyword facet.
pub const TAGS_CATEGORY: &str = "Tags";

/// One selectable facet value and how many documents carry it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FacetValue {
    pub value: String,
    pub count: usize,
}

/// A named group of facet values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FacetGroup {
    pub category: String,
    pub values: Vec<FacetValue>,
}

impl FacetGroup {
    pub fn contains(&self, value: &str) -> bool {
        self.values.iter().any(|v| v.value == value)
    }
}

/// Unique tags across `documents`, sorted, each counted once per document.
/// Duplicates on a single document collapse here but stay on the document.
pub fn tag_facet(documents: &[Document]) -> FacetGroup {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for doc in documents {
        let unique: BTreeSet<&str> = doc.tags.iter().map(String::as_str).collect();
        for tag in unique {
            *counts.entry(tag).or_default() += 1;
        }
    }
    FacetGroup {
        category: TAGS_CATEGORY.to_string(),
        values: counts
            .into_iter()
            .map(|(value, count)| FacetValue {
                value: value.to_string(),
                count,
            })
            .collect(),
    }
}

/// Facet groups to offer for `documents`. Empty groups are omitted.
pub fn available_facets(documents: &[Document]) -> Vec<FacetGroup> {
    let tags = tag_facet(documents);
    if tags.values.is_empty() {
        Vec::new()
    } else {
        vec![tags]
    }
}

/// Values found in each target column, one group per column in the given
/// order. Read-only summary: these groups do not feed the tag stage.
pub fn column_facets<F: AsRef<str>>(documents: &[Document], target_fields: &[F]) -> Vec<FacetGroup> {
    target_fields
        .iter()
        .filter_map(|field| {
            let field = field.as_ref();
            let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
            for doc in documents {
                let Some(values) = doc.field_tags.get(field) else {
                    continue;
                };
                let unique: BTreeSet<&str> = values.iter().map(String::as_str).collect();
                for value in unique {
                    *counts.entry(value).or_default() += 1;
                }
            }
            if counts.is_empty() {
                return None;
            }
            Some(FacetGroup {
                category: field.to_string(),
                values: counts
                    .into_iter()
                    .map(|(value, count)| FacetValue {
                        value: value.to_string(),
                        count,
                    })
                    .collect(),
            })
        })
        .collect()
}
