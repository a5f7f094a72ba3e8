//! Faceted filter, sort and highlight over canonical documents.
//!
//! Depends only on [`Document`](crate::document::Document); it never sees
//! raw records or the aggregator.

pub mod facets;
pub mod filter;
pub mod highlight;
pub mod sort;

pub use facets::{FacetGroup, FacetValue, available_facets, column_facets, tag_facet};
pub use filter::{FilterState, apply};
pub use highlight::{Segment, segments};
pub use sort::{SortKey, sort_documents};
