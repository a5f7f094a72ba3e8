//! The canonical document record.
//!
//! Every raw item from every library is normalized into this one shape by the
//! library fetcher. Nothing downstream (filters, facets, pagination) ever sees
//! a raw record.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::key::{self, CompositeKey};
use crate::kind::KindBucket;
use crate::thumbnail::{self, PreviewRequest, Resolution};

/// Inputs kept from normalization so the preview can be re-derived at a
/// different resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewSource {
    /// Rich-preview capability id of the parent library.
    pub capability_id: Option<String>,
    /// File-level identifier of the item.
    pub file_id: Option<String>,
}

/// One document from one library.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Unique within its library only.
    pub id: String,
    /// Display name, including the extension.
    pub name: String,
    /// Lowercase extension token; empty when undetermined.
    pub file_kind: String,
    /// Managed keywords, as delivered (order and duplicates kept).
    pub tags: Vec<String>,
    /// Values of the configured target metadata columns, by column name.
    pub field_tags: BTreeMap<String, Vec<String>>,
    /// Absolute link to the file.
    pub href: String,
    /// Default-resolution preview url.
    pub preview_url: String,
    pub modified: Option<DateTime<Utc>>,
    pub modified_by: Option<String>,
    pub size_bytes: u64,
    pub parent_library_id: String,
    /// Site url the library lives under.
    pub parent_source_group: String,
    pub preview_source: PreviewSource,
}

impl Document {
    /// Bucket of this document's file kind.
    pub fn bucket(&self) -> KindBucket {
        KindBucket::of(&self.file_kind)
    }

    /// The composite key of the library that produced this record.
    pub fn library_key(&self) -> CompositeKey {
        CompositeKey::new(&self.parent_source_group, &self.parent_library_id)
    }

    /// Globally unique identity: library key plus item id.
    pub fn global_id(&self) -> String {
        format!(
            "{}#{}",
            key::encode(&self.parent_source_group, &self.parent_library_id),
            self.id
        )
    }

    /// High-resolution preview, derived on demand through the same resolver
    /// that produced [`Document::preview_url`].
    pub fn high_res_preview_url(&self) -> String {
        thumbnail::resolve(&self.preview_request(), Resolution::High)
    }

    pub(crate) fn preview_request(&self) -> PreviewRequest<'_> {
        PreviewRequest {
            file_kind: &self.file_kind,
            capability_id: self.preview_source.capability_id.as_deref(),
            file_id: self.preview_source.file_id.as_deref(),
            site_url: &self.parent_source_group,
            library_id: &self.parent_library_id,
            href: &self.href,
        }
    }
}
