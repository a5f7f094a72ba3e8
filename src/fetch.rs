//! Library fetcher: one library in, canonical documents out.
//!
//! Per library the fetcher:
//!
//! 1. runs the item query through the two-tier strategy
//!    (`Enhanced -> Standard -> Empty`, see [`run_tiered`]);
//! 2. concurrently asks for the library's rich-preview capability id, which
//!    is best-effort and never fails the fetch;
//! 3. normalizes every raw item into a [`Document`], resolving its preview
//!    url on the way.
//!
//! [`LibraryFetcher::fetch`] never fails. Whatever goes wrong is logged and
//! shows up as an empty contribution, which is what lets the aggregator
//! isolate failures per library.

use std::collections::BTreeMap;
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::cache::{self, CachedResponse, NoCache, ResponseCache};
use crate::document::{Document, PreviewSource};
use crate::error::SourceResult;
use crate::key::CompositeKey;
use crate::kind::derive_file_kind;
use crate::source::raw::{as_u64_lenient, scalar_text};
use crate::source::{DEFAULT_ROW_LIMIT, ItemQuery, LibrarySource, QueryTier, RawItem};
use crate::thumbnail::{self, PreviewRequest, Resolution};

/// Target metadata columns queried by default in the enhanced tier.
pub const DEFAULT_TARGET_FIELDS: &[&str] = &["Department", "Project", "DocType"];

/// Fetcher settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchConfig {
    /// Extra columns requested in the enhanced tier.
    pub target_fields: Vec<String>,
    /// Maximum rows per library.
    pub row_limit: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            target_fields: DEFAULT_TARGET_FIELDS.iter().map(|f| f.to_string()).collect(),
            row_limit: DEFAULT_ROW_LIMIT,
        }
    }
}

// ---------------------------------------------------------------------------
// Two-tier strategy
// ---------------------------------------------------------------------------

/// Result of running a query through the tiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tiered<T> {
    /// The enhanced query succeeded.
    Enhanced(T),
    /// The enhanced query failed and the standard retry succeeded.
    Standard(T),
    /// Both tiers failed.
    Empty,
}

impl<T> Tiered<T> {
    pub fn outcome(&self) -> TierOutcome {
        match self {
            Self::Enhanced(_) => TierOutcome::Enhanced,
            Self::Standard(_) => TierOutcome::Standard,
            Self::Empty => TierOutcome::Empty,
        }
    }

    pub fn into_value(self) -> Option<T> {
        match self {
            Self::Enhanced(v) | Self::Standard(v) => Some(v),
            Self::Empty => None,
        }
    }
}

/// Which tier satisfied a library, without the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TierOutcome {
    Enhanced,
    Standard,
    Empty,
}

/// Run `query` for the enhanced tier, falling back to the standard tier.
///
/// The standard tier is only attempted when the enhanced one fails. When
/// both fail the result is [`Tiered::Empty`]; no error escapes. `key` only
/// labels the log lines.
pub async fn run_tiered<T, E, F, Fut>(key: &CompositeKey, mut query: F) -> Tiered<T>
where
    F: FnMut(QueryTier) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let enhanced_err = match query(QueryTier::Enhanced).await {
        Ok(v) => return Tiered::Enhanced(v),
        Err(e) => e,
    };
    warn!(
        group = %key.group,
        library_id = %key.library_id,
        error = %enhanced_err,
        "enhanced query failed, retrying with standard columns"
    );

    match query(QueryTier::Standard).await {
        Ok(v) => Tiered::Standard(v),
        Err(e) => {
            error!(
                group = %key.group,
                library_id = %key.library_id,
                error = %e,
                "standard query failed"
            );
            Tiered::Empty
        }
    }
}

// ---------------------------------------------------------------------------
// Fetcher
// ---------------------------------------------------------------------------

/// Everything one fetch produced, for diagnostics.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub key: CompositeKey,
    pub documents: Vec<Document>,
    pub tier: TierOutcome,
    /// Whether a rich-preview capability id was available.
    pub rich_preview: bool,
    /// Raw items dropped because they lacked an id or a name.
    pub skipped: usize,
}

/// Fetches and normalizes one library at a time.
pub struct LibraryFetcher<S> {
    source: S,
    cache: Arc<dyn ResponseCache>,
    config: FetchConfig,
}

impl<S: LibrarySource> LibraryFetcher<S> {
    /// A fetcher without caching.
    pub fn new(source: S) -> Self {
        Self::with_cache(source, Arc::new(NoCache))
    }

    pub fn with_cache(source: S, cache: Arc<dyn ResponseCache>) -> Self {
        Self {
            source,
            cache,
            config: FetchConfig::default(),
        }
    }

    pub fn with_config(mut self, config: FetchConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    pub fn cache(&self) -> &Arc<dyn ResponseCache> {
        &self.cache
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Fetch one library's documents. Never fails; failures yield `[]`.
    pub async fn fetch(&self, group: &str, library_id: &str) -> Vec<Document> {
        self.fetch_outcome(group, library_id).await.documents
    }

    /// Fetch one library and report how it went.
    pub async fn fetch_outcome(&self, group: &str, library_id: &str) -> FetchOutcome {
        let site_url = group.trim_end_matches('/');
        let key = CompositeKey::new(group, library_id);

        let (tiered, capability) = futures_util::join!(
            run_tiered(&key, |tier| self.query_items(site_url, library_id, tier)),
            self.capability(site_url, library_id),
        );

        let tier = tiered.outcome();
        let Some(items) = tiered.into_value() else {
            error!(group = site_url, library_id, "library failed on every tier, contributing no documents");
            return FetchOutcome {
                key,
                documents: Vec::new(),
                tier,
                rich_preview: capability.is_some(),
                skipped: 0,
            };
        };

        let ctx = LibraryContext {
            group,
            site_url,
            library_id,
            capability_id: capability.as_deref(),
            target_fields: if tier == TierOutcome::Enhanced {
                self.config.target_fields.as_slice()
            } else {
                &[]
            },
        };

        let documents: Vec<Document> = items.iter().filter_map(|item| normalize(item, &ctx)).collect();
        let skipped = items.len() - documents.len();
        debug!(
            group = site_url,
            library_id,
            tier = ?tier,
            count = documents.len(),
            skipped,
            "library fetched"
        );

        FetchOutcome {
            key,
            documents,
            tier,
            rich_preview: capability.is_some(),
            skipped,
        }
    }

    async fn query_items(
        &self,
        group: &str,
        library_id: &str,
        tier: QueryTier,
    ) -> SourceResult<Arc<Vec<RawItem>>> {
        let query = ItemQuery::for_tier(tier, &self.config.target_fields, self.config.row_limit);
        let cache_key = cache::items_key(group, library_id, &query);
        if let Some(CachedResponse::Items(items)) = self.cache.get(&cache_key) {
            return Ok(items);
        }

        let items = Arc::new(self.source.list_items(group, library_id, &query).await?);
        self.cache
            .put(cache_key, CachedResponse::Items(Arc::clone(&items)));
        Ok(items)
    }

    /// Best-effort capability lookup; failures degrade to `None`.
    async fn capability(&self, group: &str, library_id: &str) -> Option<String> {
        let cache_key = cache::capability_key(group, library_id);
        if let Some(CachedResponse::Capability(id)) = self.cache.get(&cache_key) {
            return id;
        }

        match self.source.resolve_capability(group, library_id).await {
            Ok(id) => {
                self.cache
                    .put(cache_key, CachedResponse::Capability(id.clone()));
                id
            }
            Err(e) => {
                warn!(error = %e, group, library_id, "could not resolve rich-preview capability");
                None
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

/// Per-library facts shared by every item's normalization.
#[derive(Debug, Clone, Copy)]
pub struct LibraryContext<'a> {
    /// Group exactly as it appeared in the composite key.
    pub group: &'a str,
    /// Group with any trailing `/` removed; base of every request and url.
    pub site_url: &'a str,
    pub library_id: &'a str,
    pub capability_id: Option<&'a str>,
    /// Target columns to read; empty outside the enhanced tier.
    pub target_fields: &'a [String],
}

/// Normalize one raw item. Items without an id or a name are dropped.
pub fn normalize(item: &RawItem, ctx: &LibraryContext<'_>) -> Option<Document> {
    let Some(id) = item.text_field("Id").or_else(|| item.text_field("ID")) else {
        debug!(library_id = ctx.library_id, "skipping item without id");
        return None;
    };
    let Some(name) = item.str_field("FileLeafRef").map(str::to_string) else {
        debug!(library_id = ctx.library_id, id = %id, "skipping item without file name");
        return None;
    };

    let file_kind = derive_file_kind(item.str_field("File_x0020_Type"), Some(&name));
    let href = item
        .str_field("EncodedAbsUrl")
        .map(str::to_string)
        .or_else(|| {
            item.str_field("FileRef")
                .map(|path| absolute_href(ctx.site_url, path))
        })
        .unwrap_or_default();
    let file_id = item
        .nested("File", "UniqueId")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    let preview_url = thumbnail::resolve(
        &PreviewRequest {
            file_kind: &file_kind,
            capability_id: ctx.capability_id,
            file_id: file_id.as_deref(),
            site_url: ctx.site_url,
            library_id: ctx.library_id,
            href: &href,
        },
        Resolution::Default,
    );

    let field_tags: BTreeMap<String, Vec<String>> = ctx
        .target_fields
        .iter()
        .filter_map(|field| {
            let values = item.field(field).map(field_values).unwrap_or_default();
            (!values.is_empty()).then(|| (field.clone(), values))
        })
        .collect();

    Some(Document {
        id,
        name,
        file_kind,
        tags: managed_keywords(item),
        field_tags,
        href,
        preview_url,
        modified: item.str_field("Modified").and_then(parse_timestamp),
        modified_by: item
            .nested("Editor", "Title")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string),
        size_bytes: item
            .nested("File", "Length")
            .and_then(as_u64_lenient)
            .unwrap_or(0),
        parent_library_id: ctx.library_id.to_string(),
        parent_source_group: ctx.group.to_string(),
        preview_source: PreviewSource {
            capability_id: ctx.capability_id.map(str::to_string),
            file_id,
        },
    })
}

/// Absolute url for a `FileRef`. Server-relative paths (leading `/`) already
/// include the site path, so they hang off the origin; anything else is
/// taken relative to the site.
fn absolute_href(site_url: &str, file_ref: &str) -> String {
    if !file_ref.starts_with('/') {
        return format!("{site_url}/{file_ref}");
    }
    match reqwest::Url::parse(site_url).map(|url| url.origin()) {
        Ok(origin) if origin.is_tuple() => format!("{}{file_ref}", origin.ascii_serialization()),
        _ => format!("{site_url}{file_ref}"),
    }
}

/// Terms from the managed-keyword lookup, in delivery order.
fn managed_keywords(item: &RawItem) -> Vec<String> {
    item.field("TaxCatchAll")
        .map(collection)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|term| term.get("Term").and_then(Value::as_str))
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Values of one target column. Lookup objects contribute their label.
fn field_values(value: &Value) -> Vec<String> {
    match value {
        Value::Array(_) => collection(value)
            .into_iter()
            .filter_map(|v| match v {
                Value::Object(_) => Some(label_of(v).unwrap_or_else(|| "Unknown".to_string())),
                other => scalar_text(other),
            })
            .collect(),
        Value::Object(_) if value.get("results").is_some() => field_values(&Value::Array(
            collection(value).into_iter().cloned().collect(),
        )),
        Value::Object(_) => label_of(value).into_iter().collect(),
        other => scalar_text(other).into_iter().collect(),
    }
}

fn label_of(value: &Value) -> Option<String> {
    ["Label", "Term", "Title"]
        .iter()
        .find_map(|k| value.get(*k).and_then(scalar_text))
}

/// Elements of a plain array or of a verbose-OData `{"results": [...]}`.
fn collection(value: &Value) -> Vec<&Value> {
    match value {
        Value::Array(items) => items.iter().collect(),
        Value::Object(map) => match map.get("results") {
            Some(Value::Array(items)) => items.iter().collect(),
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    match DateTime::parse_from_rfc3339(raw) {
        Ok(dt) => Some(dt.with_timezone(&Utc)),
        Err(e) => {
            debug!(value = raw, error = %e, "ignoring unparseable modified timestamp");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::error::SourceError;
    use crate::source::MemorySource;
    use serde_json::json;

    const SITE: &str = "https://contoso.example/sites/ops";

    fn ctx<'a>(capability: Option<&'a str>, fields: &'a [String]) -> LibraryContext<'a> {
        LibraryContext {
            group: SITE,
            site_url: SITE,
            library_id: "lib-a",
            capability_id: capability,
            target_fields: fields,
        }
    }

    fn key() -> CompositeKey {
        CompositeKey::new(SITE, "lib-a")
    }

    fn full_item() -> RawItem {
        RawItem::new(json!({
            "Id": 42,
            "FileLeafRef": "Quarterly Report.DOCX",
            "FileRef": "/sites/ops/Shared Documents/Quarterly Report.DOCX",
            "File_x0020_Type": "DOCX",
            "File": { "UniqueId": "f-42", "Length": "1536" },
            "TaxCatchAll": [{ "Term": "Finance" }, { "Term": "Q3" }, { "Term": "Finance" }],
            "Modified": "2024-05-02T08:30:00Z",
            "Editor": { "Title": "Robin Ash" },
            "Department": { "Label": "Finance", "TermGuid": "x" },
            "Project": [{ "Label": "Apollo" }, "Zephyr", { "Other": 1 }],
            "DocType": "Report"
        }))
    }

    #[test]
    fn normalizes_full_item() {
        let fields: Vec<String> = DEFAULT_TARGET_FIELDS.iter().map(|f| f.to_string()).collect();
        let doc = normalize(&full_item(), &ctx(Some("b!drive"), &fields)).unwrap();

        assert_eq!(doc.id, "42");
        assert_eq!(doc.name, "Quarterly Report.DOCX");
        assert_eq!(doc.file_kind, "docx");
        assert_eq!(doc.tags, vec!["Finance", "Q3", "Finance"]);
        assert_eq!(doc.href, format!("{SITE}/Shared Documents/Quarterly Report.DOCX"));
        assert_eq!(doc.size_bytes, 1536);
        assert_eq!(doc.modified_by.as_deref(), Some("Robin Ash"));
        assert_eq!(doc.modified.unwrap().to_rfc3339(), "2024-05-02T08:30:00+00:00");
        assert_eq!(doc.field_tags["Department"], vec!["Finance"]);
        assert_eq!(doc.field_tags["Project"], vec!["Apollo", "Zephyr", "Unknown"]);
        assert_eq!(doc.field_tags["DocType"], vec!["Report"]);
        assert!(doc.preview_url.contains("/drives/b!drive/items/f-42/thumbnails/0/large/content"));
        assert_eq!(doc.parent_source_group, SITE);
    }

    #[test]
    fn defaults_for_sparse_item() {
        let item = RawItem::new(json!({
            "Id": "7",
            "FileLeafRef": "photo.JPEG",
            "EncodedAbsUrl": "https://contoso.example/sites/ops/Pics/photo.JPEG",
            "File": { "Length": "unknown" },
            "Modified": "yesterday"
        }));
        let doc = normalize(&item, &ctx(None, &[])).unwrap();
        assert_eq!(doc.file_kind, "jpeg");
        assert!(doc.tags.is_empty());
        assert!(doc.field_tags.is_empty());
        assert_eq!(doc.size_bytes, 0);
        assert_eq!(doc.modified, None);
        assert!(doc.preview_url.contains("getpreview.ashx?path="));
        assert!(doc.preview_url.ends_with("&resolution=0"));
    }

    #[test]
    fn verbose_odata_collections_are_understood() {
        let item = RawItem::new(json!({
            "Id": 1,
            "FileLeafRef": "a.pdf",
            "TaxCatchAll": { "results": [{ "Term": "Legal" }] },
            "Project": { "results": [{ "Label": "Apollo" }] }
        }));
        let fields = vec!["Project".to_string()];
        let doc = normalize(&item, &ctx(None, &fields)).unwrap();
        assert_eq!(doc.tags, vec!["Legal"]);
        assert_eq!(doc.field_tags["Project"], vec!["Apollo"]);
    }

    #[test]
    fn items_without_id_or_name_are_skipped() {
        let no_id = RawItem::new(json!({ "FileLeafRef": "x.txt" }));
        let no_name = RawItem::new(json!({ "Id": 3 }));
        assert!(normalize(&no_id, &ctx(None, &[])).is_none());
        assert!(normalize(&no_name, &ctx(None, &[])).is_none());
    }

    #[tokio::test]
    async fn run_tiered_prefers_enhanced() {
        let mut seen = Vec::new();
        let result = run_tiered(&key(), |tier| {
            seen.push(tier);
            std::future::ready(Ok::<_, String>(tier))
        })
        .await;
        assert_eq!(result, Tiered::Enhanced(QueryTier::Enhanced));
        assert_eq!(seen, vec![QueryTier::Enhanced]);
    }

    #[tokio::test]
    async fn run_tiered_falls_back_then_gives_up() {
        let fallback = run_tiered(&key(), |tier| {
            std::future::ready(match tier {
                QueryTier::Enhanced => Err("no such column".to_string()),
                QueryTier::Standard => Ok(5),
            })
        })
        .await;
        assert_eq!(fallback, Tiered::Standard(5));
        assert_eq!(fallback.outcome(), TierOutcome::Standard);

        let mut calls = 0;
        let empty: Tiered<u8> = run_tiered(&key(), |_| {
            calls += 1;
            std::future::ready(Err::<u8, _>("down"))
        })
        .await;
        assert_eq!(empty, Tiered::Empty);
        assert_eq!(calls, 2);
    }

    #[tokio::test]
    async fn missing_target_column_downgrades_to_standard() {
        let source = MemorySource::new()
            .with_library(SITE, "lib-a", vec![full_item()])
            .without_columns(SITE, "lib-a", &["DocType"]);
        let fetcher = LibraryFetcher::new(source);

        let outcome = fetcher.fetch_outcome(SITE, "lib-a").await;
        assert_eq!(outcome.tier, TierOutcome::Standard);
        assert_eq!(outcome.documents.len(), 1);
        assert!(outcome.documents[0].field_tags.is_empty());
        assert_eq!(outcome.documents[0].tags.len(), 3);
    }

    #[tokio::test]
    async fn capability_failure_does_not_fail_fetch() {
        let source = MemorySource::new()
            .with_library(SITE, "lib-a", vec![full_item()])
            .failing_capability(SITE, "lib-a");
        let fetcher = LibraryFetcher::new(source);

        let outcome = fetcher.fetch_outcome(SITE, "lib-a").await;
        assert_eq!(outcome.tier, TierOutcome::Enhanced);
        assert!(!outcome.rich_preview);
        assert!(outcome.documents[0].preview_url.contains("getpreview.ashx"));
    }

    #[tokio::test]
    async fn failing_library_yields_nothing() {
        let source = MemorySource::new().failing(SITE, "lib-a");
        let fetcher = LibraryFetcher::new(&source);
        assert!(fetcher.fetch(SITE, "lib-a").await.is_empty());
        assert_eq!(source.item_calls(), 2);
    }

    #[tokio::test]
    async fn cache_serves_repeat_fetches() {
        let source = MemorySource::new()
            .with_library(SITE, "lib-a", vec![full_item()])
            .with_capability(SITE, "lib-a", "b!drive");
        let cache = Arc::new(MemoryCache::new());
        let fetcher = LibraryFetcher::with_cache(&source, cache.clone());

        let first = fetcher.fetch(SITE, "lib-a").await;
        let second = fetcher.fetch(SITE, "lib-a").await;
        assert_eq!(first, second);
        assert_eq!(source.item_calls(), 1);
        assert_eq!(source.capability_calls(), 1);

        cache.invalidate_all();
        fetcher.fetch(SITE, "lib-a").await;
        assert_eq!(source.item_calls(), 2);
    }

    #[tokio::test]
    async fn trailing_slash_is_trimmed_for_requests_but_kept_for_provenance() {
        let source = MemorySource::new().with_library(SITE, "lib-a", vec![full_item()]);
        let fetcher = LibraryFetcher::new(source);
        let group = format!("{SITE}/");
        let outcome = fetcher.fetch_outcome(&group, "lib-a").await;
        assert_eq!(outcome.documents.len(), 1);
        assert_eq!(outcome.key, CompositeKey::new(&group, "lib-a"));

        let doc = &outcome.documents[0];
        assert_eq!(doc.parent_source_group, group);
        assert_eq!(
            Some(doc.library_key()),
            crate::key::decode(&crate::key::encode(&group, "lib-a"))
        );
        assert_eq!(doc.href, format!("{SITE}/Shared Documents/Quarterly Report.DOCX"));
    }

    #[test]
    fn file_refs_resolve_against_the_site_origin() {
        assert_eq!(
            absolute_href(SITE, "/sites/ops/Shared Documents/a b.pdf"),
            "https://contoso.example/sites/ops/Shared Documents/a b.pdf"
        );
        assert_eq!(
            absolute_href("https://contoso.example:8443/sites/hr", "/sites/hr/Docs/x.txt"),
            "https://contoso.example:8443/sites/hr/Docs/x.txt"
        );
        assert_eq!(
            absolute_href(SITE, "Shared Documents/x.txt"),
            format!("{SITE}/Shared Documents/x.txt")
        );
        assert_eq!(absolute_href("not a url", "/x.txt"), "not a url/x.txt");
    }

    #[test]
    fn legacy_preview_uses_the_resolved_href() {
        let doc = normalize(&full_item(), &ctx(None, &[])).unwrap();
        assert!(!doc.href.contains("/sites/ops/sites/ops/"));
        assert!(doc.preview_url.contains(
            "path=https%3A%2F%2Fcontoso.example%2Fsites%2Fops%2FShared%20Documents%2F"
        ));
    }

    #[derive(Clone, Default)]
    struct LogCapture(Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for LogCapture {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn tier_downgrade_is_logged_with_library_identity() {
        let capture = LogCapture::default();
        let writer = capture.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::WARN)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let source = MemorySource::new()
            .with_library(SITE, "lib-a", vec![full_item()])
            .without_columns(SITE, "lib-a", &["Project"]);
        LibraryFetcher::new(source).fetch(SITE, "lib-a").await;

        let logs = String::from_utf8(capture.0.lock().unwrap().clone()).unwrap();
        let line = logs
            .lines()
            .find(|l| l.contains("enhanced query failed"))
            .unwrap();
        assert!(line.contains("library_id=lib-a"));
        assert!(line.contains(SITE));
    }

    #[test]
    fn source_errors_display_for_logging() {
        let err = SourceError::Unavailable {
            group: SITE.into(),
            library_id: "lib-a".into(),
        };
        assert!(err.to_string().contains("lib-a"));
    }
}
