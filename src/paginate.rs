//! Page slicing over the filtered result set.

use serde::{Deserialize, Serialize};

use crate::document::Document;

/// One page of results.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Page<'a> {
    pub items: &'a [Document],
    pub total_pages: usize,
}

impl Page<'_> {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Slice page `page_number` (1-indexed) of `page_size` items.
///
/// Page 0, a page past the end, or a zero page size yield an empty slice.
pub fn paginate(documents: &[Document], page_size: usize, page_number: usize) -> Page<'_> {
    if page_size == 0 {
        return Page {
            items: &[],
            total_pages: 0,
        };
    }

    let total_pages = documents.len().div_ceil(page_size);
    let items = page_number
        .checked_sub(1)
        .and_then(|idx| idx.checked_mul(page_size))
        .filter(|start| *start < documents.len())
        .map(|start| {
            let end = start.saturating_add(page_size).min(documents.len());
            &documents[start..end]
        })
        .unwrap_or(&[]);

    Page { items, total_pages }
}

/// Layout density; each has its own page size.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Density {
    #[default]
    Cards,
    List,
}

/// Current page and density. Reset to page 1 whenever the filtered set or
/// the density changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pager {
    page: usize,
    density: Density,
}

impl Default for Pager {
    fn default() -> Self {
        Self::new(Density::default())
    }
}

impl Pager {
    pub fn new(density: Density) -> Self {
        Self { page: 1, density }
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn density(&self) -> Density {
        self.density
    }

    pub fn reset(&mut self) {
        self.page = 1;
    }

    pub fn set_density(&mut self, density: Density) {
        self.density = density;
        self.reset();
    }

    /// Jump to `page`, clamped to `1..=total_pages` (or 1 when there are none).
    pub fn go_to(&mut self, page: usize, total_pages: usize) {
        self.page = page.clamp(1, total_pages.max(1));
    }

    pub fn next(&mut self, total_pages: usize) {
        self.go_to(self.page.saturating_add(1), total_pages);
    }

    pub fn prev(&mut self) {
        self.page = self.page.saturating_sub(1).max(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn docs(n: usize) -> Vec<Document> {
        (1..=n)
            .map(|i| Document {
                id: i.to_string(),
                ..Default::default()
            })
            .collect()
    }

    fn ids<'a>(page: &Page<'a>) -> Vec<&'a str> {
        page.items.iter().map(|d| d.id.as_str()).collect()
    }

    #[test]
    fn last_page_holds_the_remainder() {
        let all = docs(30);
        let page = paginate(&all, 12, 3);
        assert_eq!(page.total_pages, 3);
        assert_eq!(ids(&page), vec!["25", "26", "27", "28", "29", "30"]);
    }

    #[test]
    fn out_of_range_pages_are_empty() {
        let all = docs(30);
        assert!(paginate(&all, 12, 0).is_empty());
        assert!(paginate(&all, 12, 4).is_empty());
        assert!(paginate(&all, 12, usize::MAX).is_empty());
        assert_eq!(paginate(&all, 12, 4).total_pages, 3);
    }

    #[test]
    fn zero_page_size_has_no_pages() {
        let five = docs(5);
        let page = paginate(&five, 0, 1);
        assert_eq!(page.total_pages, 0);
        assert!(page.is_empty());
    }

    #[test]
    fn empty_set_has_no_pages() {
        let page = paginate(&[], 12, 1);
        assert_eq!(page.total_pages, 0);
        assert!(page.is_empty());
    }

    #[test]
    fn pager_clamps_and_resets() {
        let mut pager = Pager::default();
        pager.next(3);
        pager.next(3);
        pager.next(3);
        assert_eq!(pager.page(), 3);
        pager.prev();
        assert_eq!(pager.page(), 2);

        pager.set_density(Density::List);
        assert_eq!(pager.page(), 1);
        assert_eq!(pager.density(), Density::List);

        pager.prev();
        assert_eq!(pager.page(), 1);
        pager.go_to(9, 0);
        assert_eq!(pager.page(), 1);
    }
}
