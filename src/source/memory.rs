//! In-process source serving canned records.
//!
//! Useful for hosts that already hold item payloads (exports, fixtures) and
//! for exercising the fetcher's failure handling without a network: a
//! library can be made to fail outright, to reject queries that select
//! columns missing from its schema, or to answer after a delay.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use super::{ItemQuery, LibrarySource, RawItem};
use crate::error::{SourceError, SourceResult};
use crate::key::CompositeKey;

#[derive(Debug, Default, Clone)]
struct LibraryScript {
    items: Vec<RawItem>,
    capability: Option<String>,
    fail_items: bool,
    fail_capability: bool,
    missing_columns: HashSet<String>,
    delay: Option<Duration>,
}

/// A [`LibrarySource`] over in-memory item payloads.
#[derive(Debug, Default)]
pub struct MemorySource {
    libraries: HashMap<CompositeKey, LibraryScript>,
    item_calls: AtomicUsize,
    capability_calls: AtomicUsize,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    fn script(&mut self, group: &str, library_id: &str) -> &mut LibraryScript {
        self.libraries
            .entry(CompositeKey::new(group, library_id))
            .or_default()
    }

    /// Register a library with its raw items.
    pub fn with_library(
        mut self,
        group: &str,
        library_id: &str,
        items: impl IntoIterator<Item = RawItem>,
    ) -> Self {
        self.script(group, library_id).items = items.into_iter().collect();
        self
    }

    /// Give a library a rich-preview capability id.
    pub fn with_capability(mut self, group: &str, library_id: &str, id: &str) -> Self {
        self.script(group, library_id).capability = Some(id.to_string());
        self
    }

    /// Make every item query against a library fail.
    pub fn failing(mut self, group: &str, library_id: &str) -> Self {
        self.script(group, library_id).fail_items = true;
        self
    }

    /// Make capability resolution for a library fail.
    pub fn failing_capability(mut self, group: &str, library_id: &str) -> Self {
        self.script(group, library_id).fail_capability = true;
        self
    }

    /// Reject queries selecting any of these columns, the way a server
    /// rejects a `$select` naming a column the list does not have.
    pub fn without_columns(mut self, group: &str, library_id: &str, columns: &[&str]) -> Self {
        self.script(group, library_id)
            .missing_columns
            .extend(columns.iter().map(|c| c.to_string()));
        self
    }

    /// Delay answers from a library.
    pub fn with_delay(mut self, group: &str, library_id: &str, delay: Duration) -> Self {
        self.script(group, library_id).delay = Some(delay);
        self
    }

    /// Number of item queries served so far (including failed ones).
    pub fn item_calls(&self) -> usize {
        self.item_calls.load(Ordering::Relaxed)
    }

    /// Number of capability lookups served so far.
    pub fn capability_calls(&self) -> usize {
        self.capability_calls.load(Ordering::Relaxed)
    }

    fn lookup(&self, group: &str, library_id: &str) -> SourceResult<&LibraryScript> {
        self.libraries
            .get(&CompositeKey::new(group, library_id))
            .ok_or_else(|| unavailable(group, library_id))
    }
}

fn unavailable(group: &str, library_id: &str) -> SourceError {
    SourceError::Unavailable {
        group: group.to_string(),
        library_id: library_id.to_string(),
    }
}

impl LibrarySource for MemorySource {
    async fn list_items(
        &self,
        group: &str,
        library_id: &str,
        query: &ItemQuery,
    ) -> SourceResult<Vec<RawItem>> {
        self.item_calls.fetch_add(1, Ordering::Relaxed);
        let script = self.lookup(group, library_id)?;
        if let Some(delay) = script.delay {
            tokio::time::sleep(delay).await;
        }
        if script.fail_items {
            return Err(unavailable(group, library_id));
        }
        if query.select.iter().any(|c| script.missing_columns.contains(c)) {
            return Err(SourceError::Status {
                url: format!("memory://{group}/{library_id}"),
                status: 400,
            });
        }
        Ok(script.items.iter().take(query.top).cloned().collect())
    }

    async fn resolve_capability(
        &self,
        group: &str,
        library_id: &str,
    ) -> SourceResult<Option<String>> {
        self.capability_calls.fetch_add(1, Ordering::Relaxed);
        let script = self.lookup(group, library_id)?;
        if script.fail_capability {
            return Err(unavailable(group, library_id));
        }
        Ok(script.capability.clone())
    }
}
