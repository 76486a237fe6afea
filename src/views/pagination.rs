//! Page bookkeeping shared by the list views.

#[cfg(test)]
#[path = "pagination_test.rs"]
mod pagination_test;

use crate::net::types::{PageRequest, Paginated};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageState {
    /// 1-based.
    pub page: u32,
    pub page_size: u32,
    /// Total item count from the last response; `None` until loaded.
    pub count: Option<u64>,
    /// Page whose items are on screen.
    shown: u32,
}

impl PageState {
    pub fn new(page_size: u32) -> Self {
        Self { page: 1, page_size: page_size.max(1), count: None, shown: 1 }
    }

    pub fn request(&self) -> PageRequest {
        PageRequest::new(self.page, self.page_size)
    }

    /// Take the total count from a response for the requested page.
    pub fn absorb<T>(&mut self, page: &Paginated<T>) {
        self.count = Some(page.count);
        self.shown = self.page;
    }

    /// Return to the page on screen after a failed fetch.
    pub fn rollback(&mut self) {
        self.page = self.shown;
    }

    pub fn total_pages(&self) -> u64 {
        self.count.map_or(0, |count| count.div_ceil(u64::from(self.page_size)))
    }

    pub fn has_next(&self) -> bool {
        self.count
            .is_some_and(|count| u64::from(self.page) * u64::from(self.page_size) < count)
    }

    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    /// Advance one page. Returns false (and changes nothing) on the last page
    /// or before anything was loaded.
    pub fn next(&mut self) -> bool {
        if !self.has_next() {
            return false;
        }
        self.page += 1;
        true
    }

    pub fn prev(&mut self) -> bool {
        if !self.has_prev() {
            return false;
        }
        self.page -= 1;
        true
    }

    pub fn reset(&mut self) {
        self.page = 1;
    }

    /// Jump straight to `page` (clamped to 1). Used before anything is loaded,
    /// so it is not checked against the count.
    pub fn jump(&mut self, page: u32) {
        self.page = page.max(1);
    }
}
