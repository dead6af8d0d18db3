// SPDX-License-Identifier: MPL-2.0

use crate::config::{FIRST_PAGE_SIZE, NEXT_PAGE_SIZE};
use std::ops::Range;

/// Client-side windowing over a backend that returns every post at once.
///
/// Page 1 is `[0, 30)`; page N >= 2 is `[30 + (N-2)*10, 30 + (N-1)*10)`.
#[derive(Debug, Clone)]
pub struct Pager {
    /// Next page to request (1-based)
    next_page: usize,
    /// Whether there are more posts to load
    has_more: bool,
    /// A window is being fetched
    loading: bool,
    /// Bumped on reset so a load started before it is discarded
    generation: u64,
}

/// Ticket for one in-flight window load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageTicket {
    pub page: usize,
    generation: u64,
}

impl Default for Pager {
    fn default() -> Self {
        Self {
            next_page: 1,
            has_more: true,
            loading: false,
            generation: 0,
        }
    }
}

impl Pager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Expected chunk length for `page`.
    pub fn page_size(page: usize) -> usize {
        if page <= 1 {
            FIRST_PAGE_SIZE
        } else {
            NEXT_PAGE_SIZE
        }
    }

    /// Index range of `page` in the full backend result.
    pub fn window(page: usize) -> Range<usize> {
        let start = if page <= 1 {
            0
        } else {
            FIRST_PAGE_SIZE + (page - 2) * NEXT_PAGE_SIZE
        };
        start..start + Self::page_size(page)
    }

    /// The part of `all` that belongs to `page`, clamped to what exists.
    pub fn slice<T>(all: &[T], page: usize) -> &[T] {
        let Range { start, end } = Self::window(page);
        let start = start.min(all.len());
        let end = end.min(all.len());
        &all[start..end]
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Pages loaded so far.
    pub fn loaded_pages(&self) -> usize {
        self.next_page - 1
    }

    /// Start loading the next window, unless one is in flight or the feed is exhausted.
    pub fn begin(&mut self) -> Option<PageTicket> {
        if self.loading || !self.has_more {
            return None;
        }
        self.loading = true;
        Some(PageTicket {
            page: self.next_page,
            generation: self.generation,
        })
    }

    /// Record a completed load of `chunk_len` items.
    ///
    /// Returns false if the ticket predates a reset; its chunk must be dropped.
    pub fn finish(&mut self, ticket: PageTicket, chunk_len: usize) -> bool {
        if ticket.generation != self.generation {
            return false;
        }
        self.loading = false;
        if chunk_len == 0 || chunk_len < Self::page_size(ticket.page) {
            self.has_more = false;
        }
        if chunk_len > 0 {
            self.next_page = ticket.page + 1;
        }
        true
    }

    /// A failed load leaves the page unchanged so the next trigger retries it.
    pub fn fail(&mut self, ticket: PageTicket) {
        if ticket.generation == self.generation {
            self.loading = false;
        }
    }

    pub fn reset(&mut self) {
        *self = Self {
            generation: self.generation + 1,
            ..Self::default()
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_windows() {
        assert_eq!(Pager::window(1), 0..30);
        assert_eq!(Pager::window(2), 30..40);
        assert_eq!(Pager::window(3), 40..50);
        assert_eq!(Pager::window(5), 60..70);
    }

    #[test]
    fn test_forty_five_items() {
        let all: Vec<usize> = (0..45).collect();
        let mut pager = Pager::new();

        let t1 = pager.begin().unwrap();
        let chunk = Pager::slice(&all, t1.page);
        assert_eq!(chunk, &all[0..30]);
        assert!(pager.finish(t1, chunk.len()));
        assert!(pager.has_more());

        let t2 = pager.begin().unwrap();
        let chunk = Pager::slice(&all, t2.page);
        assert_eq!(chunk, &all[30..40]);
        assert!(pager.finish(t2, chunk.len()));
        assert!(pager.has_more());

        let t3 = pager.begin().unwrap();
        let chunk = Pager::slice(&all, t3.page);
        assert_eq!(chunk.len(), 5);
        assert!(pager.finish(t3, chunk.len()));
        assert!(!pager.has_more());
        assert!(pager.begin().is_none());
    }

    #[test]
    fn test_empty_chunk_exhausts() {
        let all: Vec<usize> = (0..30).collect();
        let mut pager = Pager::new();
        let t1 = pager.begin().unwrap();
        pager.finish(t1, Pager::slice(&all, 1).len());
        assert!(pager.has_more());

        let t2 = pager.begin().unwrap();
        assert!(Pager::slice(&all, t2.page).is_empty());
        pager.finish(t2, 0);
        assert!(!pager.has_more());
        assert_eq!(pager.loaded_pages(), 1);
    }

    #[test]
    fn test_single_flight() {
        let mut pager = Pager::new();
        let ticket = pager.begin().unwrap();
        assert!(pager.is_loading());
        assert!(pager.begin().is_none());
        pager.fail(ticket);
        assert_eq!(pager.begin().unwrap().page, 1);
    }

    #[test]
    fn test_reset_discards_stale_ticket() {
        let mut pager = Pager::new();
        let stale = pager.begin().unwrap();
        pager.reset();
        let fresh = pager.begin().unwrap();
        assert!(!pager.finish(stale, 30));
        assert!(pager.is_loading());
        assert!(pager.finish(fresh, 30));
        assert_eq!(pager.loaded_pages(), 1);
    }
}
