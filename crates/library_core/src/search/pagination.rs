//! crates/library_core/src/search/pagination.rs
//!
//! Fixed-size, 1-indexed pages. Asking for a page past the end is not an
//! error: it yields no items while the totals stay intact.

/// Results per page on search result listings.
pub const SEARCH_PAGE_SIZE: u32 = 5;
/// Results per page on the browse and favorites listings.
pub const BROWSE_PAGE_SIZE: u32 = 6;
/// Rows per page on recent-activity listings.
pub const ACTIVITY_PAGE_SIZE: u32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub per_page: u32,
}

impl PageRequest {
    /// Pages below 1 are clamped to 1; a zero page size is raised to 1.
    pub fn new(page: i64, per_page: u32) -> Self {
        Self {
            page: page.clamp(1, u32::MAX as i64) as u32,
            per_page: per_page.max(1),
        }
    }

    pub fn offset(&self) -> u64 {
        (self.page as u64 - 1) * self.per_page as u64
    }

    pub fn limit(&self) -> u64 {
        self.per_page as u64
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub per_page: u32,
    pub total: u64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, request: PageRequest, total: u64) -> Self {
        Self {
            items,
            page: request.page,
            per_page: request.per_page,
            total,
        }
    }

    /// Slices an already ordered sequence.
    pub fn from_ordered(all: Vec<T>, request: PageRequest) -> Self {
        let total = all.len() as u64;
        let items = all
            .into_iter()
            .skip(request.offset() as usize)
            .take(request.per_page as usize)
            .collect();
        Self::new(items, request, total)
    }

    pub fn total_pages(&self) -> u64 {
        self.total.div_ceil(self.per_page as u64)
    }

    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        (self.page as u64) < self.total_pages()
    }
}
