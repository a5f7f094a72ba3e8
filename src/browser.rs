//! Headless view-model tying the pieces together.
//!
//! A [`Browser`] owns the loaded document set and every piece of user state:
//! selected sources, search text (debounced), kind bucket, selected tags,
//! sort order, active preset and the pager. Every state change re-runs the
//! filter pipeline and resets the pager to page 1. Rendering is left to the
//! host, which reads [`Browser::page`], [`Browser::facets`] and
//! [`Browser::empty_state`].

use std::collections::BTreeSet;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info};

use crate::aggregate::{AggregateReport, Aggregator};
use crate::cache::{MemoryCache, ResponseCache};
use crate::config::{BrowserConfig, TagRetention};
use crate::debounce::DebouncedText;
use crate::document::Document;
use crate::fetch::LibraryFetcher;
use crate::kind::{KindBucket, KindFilter};
use crate::paginate::{Density, Page, Pager, paginate};
use crate::pipeline::{self, FacetGroup, FilterState, Segment, SortKey};
use crate::presets::PresetBar;
use crate::source::LibrarySource;

/// Why there is nothing to show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptyState {
    /// Sources are selected but have not been loaded yet.
    Loading,
    NoSources,
    /// A kind bucket is active and nothing in it survived the filters.
    NoResultsForKind(KindBucket),
    NoResults,
}

/// Interactive document browser over a [`LibrarySource`].
pub struct Browser<S> {
    aggregator: Aggregator<S>,
    config: BrowserConfig,
    documents: Vec<Document>,
    results: Vec<Document>,
    facets: Vec<FacetGroup>,
    state: FilterState,
    pager: Pager,
    presets: PresetBar,
    search_input: String,
    search: DebouncedText,
    search_rx: watch::Receiver<String>,
    loaded: bool,
    report: Option<AggregateReport>,
}

impl<S: LibrarySource> Browser<S> {
    /// A browser with an in-memory response cache.
    pub fn new(source: S, config: BrowserConfig) -> Self {
        Self::with_cache(source, Arc::new(MemoryCache::new()), config)
    }

    pub fn with_cache(source: S, cache: Arc<dyn ResponseCache>, config: BrowserConfig) -> Self {
        let fetcher = LibraryFetcher::with_cache(source, cache).with_config(config.fetch_config());
        let search = DebouncedText::new(config.debounce());
        let search_rx = search.subscribe();
        Self {
            aggregator: Aggregator::new(fetcher),
            presets: PresetBar::new(config.presets.clone()),
            config,
            documents: Vec::new(),
            results: Vec::new(),
            facets: Vec::new(),
            state: FilterState::default(),
            pager: Pager::default(),
            search_input: String::new(),
            search,
            search_rx,
            loaded: false,
            report: None,
        }
    }

    // -----------------------------------------------------------------------
    // Sources
    // -----------------------------------------------------------------------

    pub fn sources(&self) -> &[String] {
        &self.config.sources
    }

    /// Replace the selected libraries and load them.
    pub async fn set_sources<K: AsRef<str>>(&mut self, keys: &[K]) {
        self.config.sources = keys.iter().map(|k| k.as_ref().to_string()).collect();
        if self.config.tag_retention == TagRetention::Clear {
            self.state.selected_tags.clear();
        }
        self.loaded = false;
        self.load().await;
    }

    /// Fetch every selected library and rebuild the result set.
    pub async fn load(&mut self) {
        let mut report = self.aggregator.aggregate_report(&self.config.sources).await;
        self.documents = std::mem::take(&mut report.documents);
        self.facets = pipeline::available_facets(&self.documents);
        self.report = Some(report);
        self.loaded = true;
        info!(
            sources = self.config.sources.len(),
            documents = self.documents.len(),
            "browser loaded"
        );
        self.recompute();
    }

    /// Drop cached responses and load again.
    pub async fn refresh(&mut self) {
        self.clear_cache();
        self.load().await;
    }

    pub fn clear_cache(&self) {
        self.aggregator.fetcher().cache().invalidate_all();
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Per-library outcome of the last load.
    pub fn report(&self) -> Option<&AggregateReport> {
        self.report.as_ref()
    }

    pub fn aggregator(&self) -> &Aggregator<S> {
        &self.aggregator
    }

    // -----------------------------------------------------------------------
    // Search and presets
    // -----------------------------------------------------------------------

    /// The text as typed, which may not be applied yet.
    pub fn search_input(&self) -> &str {
        &self.search_input
    }

    /// Record typed text; it is applied once input goes quiet. Typing
    /// deactivates the current preset.
    pub fn on_search_input(&mut self, text: impl Into<String>) {
        let text = text.into();
        self.presets.deactivate();
        self.search_input.clone_from(&text);
        self.search.input(text);
    }

    /// Apply the typed text now, skipping the quiet period.
    pub fn commit_search(&mut self) {
        self.search.commit(self.search_input.clone());
        self.sync_search();
    }

    /// Pick up debounced text that has settled. Returns whether it changed
    /// the filter.
    pub fn sync_search(&mut self) -> bool {
        let committed = self.search_rx.borrow_and_update().clone();
        if committed == self.state.search_text {
            return false;
        }
        debug!(search = %committed, "search text applied");
        self.state.search_text = committed;
        self.recompute();
        true
    }

    /// Wait for pending input to settle, then apply it.
    pub async fn settle_search(&mut self) -> bool {
        // A pending commit always publishes the latest input, so stop once
        // that value is visible, whether or not the task has finished.
        while self.search.is_pending() && *self.search_rx.borrow_and_update() != self.search_input {
            if self.search_rx.changed().await.is_err() {
                break;
            }
        }
        self.sync_search()
    }

    /// Split `text` around matches of the applied search text.
    pub fn highlight<'a>(&self, text: &'a str) -> Vec<Segment<'a>> {
        pipeline::segments(text, &self.state.search_text)
    }

    pub fn presets(&self) -> &PresetBar {
        &self.presets
    }

    /// Toggle a preset by label and apply its query immediately.
    pub fn select_preset(&mut self, label: &str) -> bool {
        match self.presets.select(label) {
            Some(query) => {
                self.apply_search_now(query);
                true
            }
            None => false,
        }
    }

    pub fn clear_preset(&mut self) {
        let query = self.presets.clear();
        self.apply_search_now(query);
    }

    fn apply_search_now(&mut self, text: String) {
        self.search_input.clone_from(&text);
        self.search.commit(text);
        self.sync_search();
    }

    // -----------------------------------------------------------------------
    // Facets
    // -----------------------------------------------------------------------

    pub fn filter_state(&self) -> &FilterState {
        &self.state
    }

    pub fn facets(&self) -> &[FacetGroup] {
        &self.facets
    }

    /// Read-only summary of the target columns in the loaded set.
    pub fn column_facets(&self) -> Vec<FacetGroup> {
        pipeline::column_facets(&self.documents, &self.config.target_fields)
    }

    pub fn set_kind(&mut self, kind: KindFilter) {
        self.state.active_kind = kind;
        self.recompute();
    }

    /// Select `bucket`, or return to `All` if it is already active.
    pub fn toggle_kind(&mut self, bucket: KindBucket) {
        self.set_kind(self.state.active_kind.toggled(bucket));
    }

    pub fn set_tags<I, T>(&mut self, tags: I)
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.state.selected_tags = tags.into_iter().map(Into::into).collect::<BTreeSet<_>>();
        self.recompute();
    }

    /// Add or remove one tag from the selection.
    pub fn toggle_tag(&mut self, tag: &str) {
        if !self.state.selected_tags.remove(tag) {
            self.state.selected_tags.insert(tag.to_string());
        }
        self.recompute();
    }

    pub fn remove_tag(&mut self, tag: &str) {
        if self.state.selected_tags.remove(tag) {
            self.recompute();
        }
    }

    pub fn clear_tags(&mut self) {
        if !self.state.selected_tags.is_empty() {
            self.state.selected_tags.clear();
            self.recompute();
        }
    }

    pub fn set_sort(&mut self, sort: SortKey) {
        self.state.sort = sort;
        self.recompute();
    }

    // -----------------------------------------------------------------------
    // Results and paging
    // -----------------------------------------------------------------------

    /// Every loaded document, unfiltered.
    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    /// The filtered, sorted result set.
    pub fn results(&self) -> &[Document] {
        &self.results
    }

    pub fn page(&self) -> Page<'_> {
        paginate(
            &self.results,
            self.config.page_size(self.pager.density()),
            self.pager.page(),
        )
    }

    pub fn pager(&self) -> &Pager {
        &self.pager
    }

    pub fn set_density(&mut self, density: Density) {
        self.pager.set_density(density);
    }

    pub fn next_page(&mut self) {
        let total = self.page().total_pages;
        self.pager.next(total);
    }

    pub fn prev_page(&mut self) {
        self.pager.prev();
    }

    pub fn go_to_page(&mut self, page: usize) {
        let total = self.page().total_pages;
        self.pager.go_to(page, total);
    }

    /// What to show instead of results, if there are none.
    pub fn empty_state(&self) -> Option<EmptyState> {
        if self.config.sources.is_empty() {
            return Some(EmptyState::NoSources);
        }
        if !self.loaded {
            return Some(EmptyState::Loading);
        }
        if !self.results.is_empty() {
            return None;
        }
        Some(match self.state.active_kind {
            KindFilter::Bucket(bucket) => EmptyState::NoResultsForKind(bucket),
            KindFilter::All => EmptyState::NoResults,
        })
    }

    fn recompute(&mut self) {
        self.results = pipeline::apply(&self.documents, &self.state);
        self.pager.reset();
        debug!(
            results = self.results.len(),
            of = self.documents.len(),
            "filters applied"
        );
    }
}
