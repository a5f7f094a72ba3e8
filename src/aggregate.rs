//! Fan-out / fan-in over many libraries.
//!
//! Composite keys are decoded (invalid ones dropped), grouped by source
//! group, and one fetch per library is polled concurrently on the calling
//! task. Each fetch owns its own output; results are concatenated once every
//! fetch has settled. Groups come in first-seen order, libraries within a
//! group in first-seen order, and each library's documents in fetch order.
//!
//! There is no cap on the number of concurrent fetches. A selection of
//! hundreds of libraries issues hundreds of simultaneous requests.

use futures_util::future::join_all;
use tracing::{debug, info};

use crate::document::Document;
use crate::fetch::{FetchOutcome, LibraryFetcher, TierOutcome};
use crate::key::{self, CompositeKey};
use crate::source::LibrarySource;

/// Libraries of one source group, in first-seen order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceGroup {
    /// Group as decoded from the key; the fetcher trims it for requests.
    pub url: String,
    pub library_ids: Vec<String>,
}

/// Decode keys and group them by source group.
///
/// Returns the groups plus the keys that failed to decode. Duplicate
/// `(group, library)` pairs are fetched once.
pub fn partition_keys<K: AsRef<str>>(keys: &[K]) -> (Vec<SourceGroup>, Vec<String>) {
    let mut groups: Vec<SourceGroup> = Vec::new();
    let mut invalid = Vec::new();

    for raw in keys {
        let raw = raw.as_ref();
        let Some(CompositeKey { group, library_id }) = key::decode(raw) else {
            debug!(key = raw, "dropping invalid composite key");
            invalid.push(raw.to_string());
            continue;
        };

        // Per-group setup happens once, on first sight of the group. The
        // group stays as decoded so documents carry their producing key.
        let idx = match groups.iter().position(|g| g.url == group) {
            Some(idx) => idx,
            None => {
                groups.push(SourceGroup {
                    url: group,
                    library_ids: Vec::new(),
                });
                groups.len() - 1
            }
        };
        let entry = &mut groups[idx];
        if !entry.library_ids.contains(&library_id) {
            entry.library_ids.push(library_id);
        }
    }

    (groups, invalid)
}

/// Diagnostic view of one aggregation run.
#[derive(Debug, Clone, Default)]
pub struct AggregateReport {
    pub documents: Vec<Document>,
    /// Keys dropped because they did not decode.
    pub invalid_keys: Vec<String>,
    /// Per-library outcome, in fetch order.
    pub libraries: Vec<LibraryReport>,
}

/// How one library fared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryReport {
    pub key: CompositeKey,
    pub tier: TierOutcome,
    pub documents: usize,
    pub rich_preview: bool,
}

impl AggregateReport {
    /// Libraries that contributed nothing because every tier failed.
    pub fn failed_libraries(&self) -> impl Iterator<Item = &CompositeKey> {
        self.libraries
            .iter()
            .filter(|l| l.tier == TierOutcome::Empty)
            .map(|l| &l.key)
    }

    /// Whether some libraries failed while others answered.
    pub fn is_partial(&self) -> bool {
        let failed = self.failed_libraries().count();
        failed > 0 && failed < self.libraries.len()
    }
}

/// Runs library fetches concurrently and merges their documents.
pub struct Aggregator<S> {
    fetcher: LibraryFetcher<S>,
}

impl<S: LibrarySource> Aggregator<S> {
    pub fn new(fetcher: LibraryFetcher<S>) -> Self {
        Self { fetcher }
    }

    pub fn fetcher(&self) -> &LibraryFetcher<S> {
        &self.fetcher
    }

    /// All documents from every valid key. Never fails; an empty result
    /// means no valid keys or no library yielded anything.
    pub async fn aggregate<K: AsRef<str>>(&self, keys: &[K]) -> Vec<Document> {
        self.aggregate_report(keys).await.documents
    }

    /// Same as [`Aggregator::aggregate`], keeping per-library diagnostics.
    pub async fn aggregate_report<K: AsRef<str>>(&self, keys: &[K]) -> AggregateReport {
        let (groups, invalid_keys) = partition_keys(keys);

        let tasks = groups.iter().flat_map(|group| {
            group
                .library_ids
                .iter()
                .map(move |library_id| self.fetcher.fetch_outcome(&group.url, library_id))
        });
        let outcomes: Vec<FetchOutcome> = join_all(tasks).await;

        let mut report = AggregateReport {
            documents: Vec::with_capacity(outcomes.iter().map(|o| o.documents.len()).sum()),
            invalid_keys,
            libraries: Vec::with_capacity(outcomes.len()),
        };
        for outcome in outcomes {
            report.libraries.push(LibraryReport {
                key: outcome.key,
                tier: outcome.tier,
                documents: outcome.documents.len(),
                rich_preview: outcome.rich_preview,
            });
            report.documents.extend(outcome.documents);
        }

        info!(
            libraries = report.libraries.len(),
            failed = report.failed_libraries().count(),
            invalid_keys = report.invalid_keys.len(),
            documents = report.documents.len(),
            "aggregation complete"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{MemorySource, RawItem};
    use serde_json::json;
    use std::time::Duration;

    const HR: &str = "https://contoso.example/sites/hr";
    const OPS: &str = "https://contoso.example/sites/ops";

    fn items(prefix: &str, n: usize) -> Vec<RawItem> {
        (0..n)
            .map(|i| RawItem::new(json!({ "Id": i, "FileLeafRef": format!("{prefix}-{i}.pdf") })))
            .collect()
    }

    #[test]
    fn partition_groups_by_decoded_group_and_drops_invalid() {
        let keys = [
            key::encode(HR, "a"),
            "garbage".to_string(),
            key::encode(OPS, "x"),
            key::encode(&format!("{HR}/"), "b"),
            key::encode(HR, "a"),
        ];
        let (groups, invalid) = partition_keys(&keys);
        assert_eq!(invalid, vec!["garbage".to_string()]);
        assert_eq!(
            groups,
            vec![
                SourceGroup {
                    url: HR.into(),
                    library_ids: vec!["a".into()]
                },
                SourceGroup {
                    url: OPS.into(),
                    library_ids: vec!["x".into()]
                },
                SourceGroup {
                    url: format!("{HR}/"),
                    library_ids: vec!["b".into()]
                },
            ]
        );
    }

    #[tokio::test]
    async fn one_failing_library_does_not_sink_the_batch() {
        let source = MemorySource::new()
            .with_library(HR, "five", items("hr", 5))
            .with_library(OPS, "seven", items("ops", 7))
            .failing(OPS, "broken");
        let aggregator = Aggregator::new(LibraryFetcher::new(source));

        let keys = [
            key::encode(HR, "five"),
            key::encode(OPS, "broken"),
            key::encode(OPS, "seven"),
        ];
        let report = aggregator.aggregate_report(&keys).await;
        assert_eq!(report.documents.len(), 12);
        assert!(report.is_partial());
        assert_eq!(
            report.failed_libraries().collect::<Vec<_>>(),
            vec![&CompositeKey::new(OPS, "broken")]
        );
    }

    #[tokio::test]
    async fn documents_carry_the_key_that_produced_them() {
        let source = MemorySource::new().with_library(HR, "a", items("a", 1));
        let aggregator = Aggregator::new(LibraryFetcher::new(source));

        let raw = key::encode(&format!("{HR}/"), "a");
        let docs = aggregator.aggregate(&[raw.as_str()]).await;
        assert_eq!(docs.len(), 1);
        assert_eq!(Some(docs[0].library_key()), key::decode(&raw));
    }

    #[tokio::test]
    async fn results_concatenate_in_group_then_fetch_order() {
        let source = MemorySource::new()
            .with_library(HR, "a", items("a", 2))
            .with_library(OPS, "b", items("b", 2));
        let aggregator = Aggregator::new(LibraryFetcher::new(source));

        let keys = [key::encode(HR, "a"), "nope".into(), key::encode(OPS, "b")];
        let names: Vec<String> = aggregator
            .aggregate(&keys)
            .await
            .into_iter()
            .map(|d| d.name)
            .collect();
        assert_eq!(names, vec!["a-0.pdf", "a-1.pdf", "b-0.pdf", "b-1.pdf"]);
    }

    #[tokio::test]
    async fn no_valid_keys_means_no_documents() {
        let aggregator = Aggregator::new(LibraryFetcher::new(MemorySource::new()));
        let report = aggregator.aggregate_report(&["a", "b||"]).await;
        assert!(report.documents.is_empty());
        assert!(report.libraries.is_empty());
        assert_eq!(report.invalid_keys.len(), 2);
        assert!(!report.is_partial());
    }

    #[tokio::test(start_paused = true)]
    async fn libraries_are_fetched_concurrently() {
        let delay = Duration::from_millis(200);
        let source = MemorySource::new()
            .with_library(HR, "a", items("a", 1))
            .with_delay(HR, "a", delay)
            .with_library(HR, "b", items("b", 1))
            .with_delay(HR, "b", delay)
            .with_library(OPS, "c", items("c", 1))
            .with_delay(OPS, "c", delay);
        let aggregator = Aggregator::new(LibraryFetcher::new(source));

        let start = tokio::time::Instant::now();
        let keys = [key::encode(HR, "a"), key::encode(HR, "b"), key::encode(OPS, "c")];
        let docs = aggregator.aggregate(&keys).await;
        assert_eq!(docs.len(), 3);
        assert!(start.elapsed() < delay * 2);
    }
}
