// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # docfacet
//!
//! Aggregates document records from many remote document libraries into one
//! canonical set and drives a faceted, paginated browsing experience over it.
//!
//! ## Architecture
//!
//! - **Composite keys** (`key`): `group||library_id` selection keys
//! - **Sources** (`source`): the [`LibrarySource`](source::LibrarySource) query
//!   capability, with a reqwest adapter and an in-memory implementation
//! - **Fetcher** (`fetch`): two-tier queries, capability lookup, normalization
//! - **Aggregator** (`aggregate`): concurrent fan-out with per-library failure isolation
//! - **Pipeline** (`pipeline`): search → kind bucket → tags → sort, plus facets
//! - **View** (`paginate`, `presets`, `debounce`, `browser`): headless UI state
//!
//! ## Library usage
//!
//! ```no_run
//! use docfacet::browser::Browser;
//! use docfacet::config::BrowserConfig;
//! use docfacet::kind::KindBucket;
//! use docfacet::source::RestSource;
//!
//! # async fn run() -> docfacet::error::DocfacetResult<()> {
//! let config = BrowserConfig::load(std::path::Path::new("browser.toml"))?;
//! let mut browser = Browser::new(RestSource::new(reqwest::Client::new()), config);
//! browser.load().await;
//! browser.toggle_kind(KindBucket::Pdf);
//! for doc in browser.page().items {
//!     println!("{} -> {}", doc.name, doc.preview_url);
//! }
//! # Ok(())
//! # }
//! ```

pub mod aggregate;
pub mod browser;
pub mod cache;
pub mod config;
pub mod debounce;
pub mod document;
pub mod error;
pub mod fetch;
pub mod key;
pub mod kind;
pub mod paginate;
pub mod pipeline;
pub mod presets;
pub mod source;
pub mod thumbnail;
