//! Pagination types: counted pages and look-ahead slices.

use serde::{Deserialize, Serialize};

/// Default page size.
const DEFAULT_PAGE_SIZE: u64 = 25;
/// Maximum page size.
const MAX_PAGE_SIZE: u64 = 100;

/// Request parameters for paginated queries.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PageRequest {
    /// Page index (0-based).
    #[serde(default)]
    pub page_index: u64,
    /// Number of items per page.
    #[serde(default = "default_page_size")]
    pub page_size: u64,
}

impl PageRequest {
    /// Create a new page request. The page size is clamped to
    /// `1..=MAX_PAGE_SIZE`.
    pub fn new(page_index: u64, page_size: u64) -> Self {
        Self {
            page_index,
            page_size: page_size.clamp(1, MAX_PAGE_SIZE),
        }
    }

    /// Calculate the first-result offset.
    pub fn offset(&self) -> u64 {
        self.page_index * self.page_size
    }

    /// Return the max-result limit.
    pub fn limit(&self) -> u64 {
        self.page_size
    }

    /// The over-fetch limit used by slice queries to detect a next page
    /// without counting.
    pub fn look_ahead_limit(&self) -> u64 {
        self.page_size + 1
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page_index: 0,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// A counted page of results. Producing one requires a second counting
/// query in addition to the content query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T: serde::Serialize> {
    /// The items on this page, in query order.
    pub content: Vec<T>,
    /// Page index (0-based).
    pub page_index: u64,
    /// Number of items per page.
    pub page_size: u64,
    /// Total number of items across all pages.
    pub total_elements: u64,
    /// Total number of pages. Zero when the result is empty.
    pub total_pages: u64,
}

impl<T: serde::Serialize> Page<T> {
    /// Build a page from content, the originating request, and the total
    /// element count.
    pub fn new(content: Vec<T>, request: PageRequest, total_elements: u64) -> Self {
        let total_pages = total_elements.div_ceil(request.page_size);
        Self {
            content,
            page_index: request.page_index,
            page_size: request.page_size,
            total_elements,
            total_pages,
        }
    }

    /// Whether a page follows this one.
    pub fn has_next(&self) -> bool {
        self.page_index + 1 < self.total_pages
    }

    /// Whether this is the first page.
    pub fn is_first(&self) -> bool {
        self.page_index == 0
    }

    /// Map the page content into another type, preserving the page
    /// metadata.
    pub fn map<U: serde::Serialize>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            content: self.content.into_iter().map(f).collect(),
            page_index: self.page_index,
            page_size: self.page_size,
            total_elements: self.total_elements,
            total_pages: self.total_pages,
        }
    }
}

/// An uncounted slice of results. `has_next` is derived by over-fetching
/// one extra row; no counting query is ever issued.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Slice<T: serde::Serialize> {
    /// The items on this slice, in query order.
    pub content: Vec<T>,
    /// Page index (0-based).
    pub page_index: u64,
    /// Number of items per page.
    pub page_size: u64,
    /// Whether at least one more row exists past this slice.
    pub has_next: bool,
}

impl<T: serde::Serialize> Slice<T> {
    /// Build a slice from an over-fetched result (up to `page_size + 1`
    /// rows), truncating the look-ahead row.
    pub fn from_look_ahead(mut content: Vec<T>, request: PageRequest) -> Self {
        let has_next = content.len() as u64 > request.page_size;
        content.truncate(request.page_size as usize);
        Self {
            content,
            page_index: request.page_index,
            page_size: request.page_size,
            has_next,
        }
    }

    /// Whether this is the first slice.
    pub fn is_first(&self) -> bool {
        self.page_index == 0
    }

    /// Map the slice content into another type, preserving the slice
    /// metadata.
    pub fn map<U: serde::Serialize>(self, f: impl FnMut(T) -> U) -> Slice<U> {
        Slice {
            content: self.content.into_iter().map(f).collect(),
            page_index: self.page_index,
            page_size: self.page_size,
            has_next: self.has_next,
        }
    }
}

fn default_page_size() -> u64 {
    DEFAULT_PAGE_SIZE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_math() {
        let page = Page::new(vec![1, 2, 3], PageRequest::new(0, 3), 5);
        assert_eq!(page.total_pages, 2);
        assert!(page.has_next());
        assert!(page.is_first());

        let last = Page::new(vec![4, 5], PageRequest::new(1, 3), 5);
        assert!(!last.has_next());
    }

    #[test]
    fn empty_page_has_zero_pages() {
        let page: Page<i64> = Page::new(vec![], PageRequest::new(0, 10), 0);
        assert_eq!(page.total_pages, 0);
        assert!(!page.has_next());
    }

    #[test]
    fn slice_truncates_look_ahead_row() {
        let slice = Slice::from_look_ahead(vec![1, 2, 3, 4], PageRequest::new(0, 3));
        assert_eq!(slice.content, vec![1, 2, 3]);
        assert!(slice.has_next);

        let tail = Slice::from_look_ahead(vec![4, 5], PageRequest::new(1, 3));
        assert_eq!(tail.content, vec![4, 5]);
        assert!(!tail.has_next);
    }

    #[test]
    fn page_size_is_clamped() {
        assert_eq!(PageRequest::new(0, 0).page_size, 1);
        assert_eq!(PageRequest::new(0, 10_000).page_size, MAX_PAGE_SIZE);
    }
}
