//! The remote query capability.
//!
//! docfacet does not own transport, auth or wire format. A [`LibrarySource`]
//! answers two asynchronous, individually failable questions about one
//! library: "list your items with these columns" and "what is your
//! rich-preview capability id". [`RestSource`] talks to a SharePoint-style
//! REST endpoint; [`MemorySource`] serves canned records in-process.

pub mod memory;
pub mod raw;
pub mod rest;

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::error::SourceResult;

pub use memory::MemorySource;
pub use raw::RawItem;
pub use rest::RestSource;

/// Columns every library is expected to have.
pub const STANDARD_SELECT: &[&str] = &[
    "Id",
    "UniqueId",
    "FileLeafRef",
    "FileRef",
    "EncodedAbsUrl",
    "File_x0020_Type",
    "File/UniqueId",
    "TaxCatchAll/Term",
    "Modified",
    "Editor/Title",
    "File/Length",
];

/// Lookups expanded alongside the standard columns.
pub const STANDARD_EXPAND: &[&str] = &["File", "TaxCatchAll", "Editor"];

/// Files only: no folders, no site pages.
pub const ITEM_FILTER: &str = "FSObjType eq 0 and File_x0020_Type ne 'aspx'";

/// Default cap on rows fetched per library.
pub const DEFAULT_ROW_LIMIT: usize = 5000;

/// Which column set a query asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QueryTier {
    /// Standard columns plus the site-specific target columns.
    Enhanced,
    /// Standard columns only.
    Standard,
}

impl QueryTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Enhanced => "enhanced",
            Self::Standard => "standard",
        }
    }
}

impl std::fmt::Display for QueryTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One item query against one library.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ItemQuery {
    pub tier: QueryTier,
    pub select: Vec<String>,
    pub expand: Vec<String>,
    pub filter: String,
    pub top: usize,
}

impl ItemQuery {
    /// Build the query for a tier. Target columns are lookups in the
    /// enhanced tier, so they are both selected and expanded.
    pub fn for_tier(tier: QueryTier, target_fields: &[String], row_limit: usize) -> Self {
        let mut select: Vec<String> = STANDARD_SELECT.iter().map(|s| s.to_string()).collect();
        let mut expand: Vec<String> = STANDARD_EXPAND.iter().map(|s| s.to_string()).collect();
        if tier == QueryTier::Enhanced {
            select.extend(target_fields.iter().cloned());
            expand.extend(target_fields.iter().cloned());
        }
        Self {
            tier,
            select,
            expand,
            filter: ITEM_FILTER.to_string(),
            top: row_limit,
        }
    }

    /// Stable text form, used as part of cache keys.
    pub fn fingerprint(&self) -> String {
        format!(
            "{}|{}|{}|{}|{}",
            self.tier,
            self.select.join(","),
            self.expand.join(","),
            self.filter,
            self.top
        )
    }
}

/// A remote document-library service.
///
/// Both calls are asynchronous and may fail independently. Implementations
/// should not retry; tiering and failure isolation live in the fetcher.
pub trait LibrarySource {
    /// List the raw items of one library using the given column set.
    fn list_items(
        &self,
        group: &str,
        library_id: &str,
        query: &ItemQuery,
    ) -> impl Future<Output = SourceResult<Vec<RawItem>>>;

    /// Resolve the rich-preview capability (drive) id of one library.
    /// `Ok(None)` means the library has none.
    fn resolve_capability(
        &self,
        group: &str,
        library_id: &str,
    ) -> impl Future<Output = SourceResult<Option<String>>>;
}

impl<S: LibrarySource> LibrarySource for &S {
    fn list_items(
        &self,
        group: &str,
        library_id: &str,
        query: &ItemQuery,
    ) -> impl Future<Output = SourceResult<Vec<RawItem>>> {
        (**self).list_items(group, library_id, query)
    }

    fn resolve_capability(
        &self,
        group: &str,
        library_id: &str,
    ) -> impl Future<Output = SourceResult<Option<String>>> {
        (**self).resolve_capability(group, library_id)
    }
}

impl<S: LibrarySource> LibrarySource for std::sync::Arc<S> {
    fn list_items(
        &self,
        group: &str,
        library_id: &str,
        query: &ItemQuery,
    ) -> impl Future<Output = SourceResult<Vec<RawItem>>> {
        (**self).list_items(group, library_id, query)
    }

    fn resolve_capability(
        &self,
        group: &str,
        library_id: &str,
    ) -> impl Future<Output = SourceResult<Option<String>>> {
        (**self).resolve_capability(group, library_id)
    }
}
