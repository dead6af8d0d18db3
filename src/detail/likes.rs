// SPDX-License-Identifier: MPL-2.0

use crate::config::{LIKES_SCROLL_THRESHOLD_PX, LIKES_SCROLL_THROTTLE};
use std::time::Instant;

/// Scroll position of the likes list, as reported by the view.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollMetrics {
    pub scroll_top: f64,
    pub scroll_height: f64,
    pub client_height: f64,
}

impl ScrollMetrics {
    pub fn distance_to_bottom(&self) -> f64 {
        self.scroll_height - self.scroll_top - self.client_height
    }
}

/// Reveals the liked-by list in chunks as the user scrolls.
#[derive(Debug, Clone)]
pub struct LikesPager {
    page_size: usize,
    revealed: usize,
    last_scroll_load: Option<Instant>,
}

impl LikesPager {
    pub fn new(page_size: usize) -> Self {
        let page_size = page_size.max(1);
        Self {
            page_size,
            revealed: page_size,
            last_scroll_load: None,
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// How many of `total` users are shown.
    pub fn visible(&self, total: usize) -> usize {
        self.revealed.min(total)
    }

    pub fn has_more(&self, total: usize) -> bool {
        self.revealed < total
    }

    /// Reveal the next chunk. Returns false if everything is already shown.
    pub fn load_more(&mut self, total: usize) -> bool {
        if !self.has_more(total) {
            return false;
        }
        self.revealed = (self.revealed + self.page_size).min(total);
        true
    }

    /// Scroll handler: near the bottom, and not within the throttle window of
    /// the previous scroll-triggered load, reveals the next chunk.
    pub fn on_scroll(&mut self, metrics: ScrollMetrics, total: usize, now: Instant) -> bool {
        if metrics.distance_to_bottom() > LIKES_SCROLL_THRESHOLD_PX || !self.has_more(total) {
            return false;
        }
        let throttled = self
            .last_scroll_load
            .is_some_and(|last| now.saturating_duration_since(last) < LIKES_SCROLL_THROTTLE);
        if throttled {
            return false;
        }
        self.last_scroll_load = Some(now);
        self.load_more(total)
    }

    pub fn reset(&mut self) {
        self.revealed = self.page_size;
        self.last_scroll_load = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn at_bottom() -> ScrollMetrics {
        ScrollMetrics {
            scroll_top: 560.0,
            scroll_height: 1000.0,
            client_height: 400.0,
        }
    }

    #[test]
    fn test_chunked_reveal() {
        let mut pager = LikesPager::new(12);
        assert_eq!(pager.visible(30), 12);
        assert!(pager.load_more(30));
        assert_eq!(pager.visible(30), 24);
        assert!(pager.load_more(30));
        assert_eq!(pager.visible(30), 30);
        assert!(!pager.load_more(30));
    }

    #[test]
    fn test_short_list_fully_visible() {
        let pager = LikesPager::new(12);
        assert_eq!(pager.visible(5), 5);
        assert!(!pager.has_more(5));
    }

    #[test]
    fn test_scroll_throttled() {
        let mut pager = LikesPager::new(12);
        let start = Instant::now();
        assert!(pager.on_scroll(at_bottom(), 50, start));
        assert!(!pager.on_scroll(at_bottom(), 50, start + Duration::from_millis(50)));
        assert_eq!(pager.visible(50), 24);
        assert!(pager.on_scroll(at_bottom(), 50, start + Duration::from_millis(250)));
        assert_eq!(pager.visible(50), 36);
    }

    #[test]
    fn test_scroll_far_from_bottom_ignored() {
        let mut pager = LikesPager::new(12);
        let top = ScrollMetrics {
            scroll_top: 0.0,
            ..at_bottom()
        };
        assert!(!pager.on_scroll(top, 50, Instant::now()));
        assert_eq!(pager.visible(50), 12);
    }
}
