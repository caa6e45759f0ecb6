// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Virtualization window computation and the scroll-owner contract.

use crate::extent::ExtentCache;

/// A contiguous inclusive index range of realized items.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct WindowRange {
    /// First realized index.
    pub first: usize,
    /// Last realized index (inclusive).
    pub last: usize,
}

impl WindowRange {
    /// Returns `true` if `index` falls inside the window.
    #[must_use]
    pub fn contains(&self, index: usize) -> bool {
        (self.first..=self.last).contains(&index)
    }

    /// Returns the number of realized indices.
    #[must_use]
    pub fn len(&self) -> usize {
        self.last - self.first + 1
    }

    /// Inclusive ranges are never empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Iterates the realized indices.
    pub fn iter(&self) -> impl Iterator<Item = usize> + use<> {
        self.first..=self.last
    }
}

/// Extra realization distance kept around the viewport.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum CachePadding {
    /// A fixed number of pixels on each side.
    Pixels(f64),
    /// A number of items (at the current average extent) on each side.
    Items(usize),
    /// A fraction of the viewport extent on each side.
    Pages(f64),
}

impl CachePadding {
    /// Resolves the padding to pixels for the given viewport and average
    /// item extent.
    #[must_use]
    pub fn resolve(self, viewport: f64, average: f64) -> f64 {
        let raw = match self {
            Self::Pixels(pixels) => pixels,
            Self::Items(items) => {
                #[expect(clippy::cast_precision_loss, reason = "item counts are small")]
                let items = items as f64;
                items * average
            }
            Self::Pages(fraction) => fraction * viewport,
        };
        if raw.is_finite() { raw.max(0.0) } else { 0.0 }
    }
}

/// Scroll-owner contract consumed by a virtualizing container.
///
/// An ancestor scroll surface exposes its viewport extent and current
/// offset along the virtualization axis; the container reads both when it
/// has no finite viewport of its own, and notifies the owner back when the
/// content extent or viewport it computed changes.
pub trait ViewportSource {
    /// Viewport extent along the virtualization axis, in pixels.
    fn viewport_extent(&self) -> f64;

    /// Current scroll offset along the virtualization axis, in pixels.
    fn scroll_offset(&self) -> f64;

    /// Called after a measure pass when the content extent or viewport
    /// changed, so the owner can update its scrollbars.
    fn extent_changed(&mut self, total_extent: f64, viewport: f64) {
        let _ = (total_extent, viewport);
    }
}

/// Computes the realized window for a scroll position.
///
/// `[offset - cache, offset + viewport + cache]` is resolved against the
/// prefix-sum offsets: the first index is the last whose start offset is
/// `<=` the padded start, the last index the last whose start offset is
/// strictly before the padded end. Returns `None` for an empty list. A
/// non-finite or non-positive viewport realizes every item (virtualization
/// falls back to plain measurement).
#[must_use]
pub fn compute_window(
    cache: &mut ExtentCache,
    offset: f64,
    viewport: f64,
    padding: CachePadding,
) -> Option<WindowRange> {
    if cache.is_empty() {
        return None;
    }
    let all = WindowRange {
        first: 0,
        last: cache.len() - 1,
    };
    if !viewport.is_finite() || viewport <= 0.0 {
        return Some(all);
    }

    let offset = if offset.is_finite() { offset.max(0.0) } else { 0.0 };
    let padding = padding.resolve(viewport, cache.estimate());
    let start = (offset - padding).max(0.0);
    let end = offset + viewport + padding;

    let first = cache.index_at_offset(start);
    let last = cache.last_index_before(end).max(first);
    Some(WindowRange { first, last })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uniform(len: usize, extent: f64) -> ExtentCache {
        let mut cache = ExtentCache::new(extent);
        cache.set_len(len);
        cache
    }

    #[test]
    fn uniform_window_matches_floor_and_ceil() {
        // 10,000 rows of 24px, 480px viewport, scrolled to 2400px.
        let mut cache = uniform(10_000, 24.0);
        let window =
            compute_window(&mut cache, 2400.0, 480.0, CachePadding::Pixels(0.0)).unwrap();
        assert_eq!(window, WindowRange { first: 100, last: 119 });
        assert_eq!(window.len(), 20);

        // Back at the top.
        let window = compute_window(&mut cache, 0.0, 480.0, CachePadding::Pixels(0.0)).unwrap();
        assert_eq!(window, WindowRange { first: 0, last: 19 });
    }

    #[test]
    fn mid_item_offsets_include_the_straddling_rows() {
        let mut cache = uniform(100, 24.0);
        let window = compute_window(&mut cache, 12.0, 480.0, CachePadding::Pixels(0.0)).unwrap();
        // Row 0 straddles the top edge, row 20 straddles the bottom.
        assert_eq!(window, WindowRange { first: 0, last: 20 });
    }

    #[test]
    fn padding_extends_both_sides() {
        let mut cache = uniform(1000, 10.0);
        let base = compute_window(&mut cache, 500.0, 100.0, CachePadding::Pixels(0.0)).unwrap();
        let padded = compute_window(&mut cache, 500.0, 100.0, CachePadding::Items(3)).unwrap();
        assert_eq!(padded.first + 3, base.first);
        assert_eq!(padded.last - 3, base.last);

        let paged = compute_window(&mut cache, 500.0, 100.0, CachePadding::Pages(0.5)).unwrap();
        assert_eq!(paged.first + 5, base.first);
        assert_eq!(paged.last - 5, base.last);
    }

    #[test]
    fn degenerate_viewports_realize_everything() {
        let mut cache = uniform(50, 10.0);
        for viewport in [f64::INFINITY, f64::NAN, 0.0, -10.0] {
            let window =
                compute_window(&mut cache, 100.0, viewport, CachePadding::Pixels(0.0)).unwrap();
            assert_eq!(window, WindowRange { first: 0, last: 49 });
        }
    }

    #[test]
    fn empty_lists_have_no_window() {
        let mut cache = ExtentCache::new(10.0);
        assert!(compute_window(&mut cache, 0.0, 100.0, CachePadding::Pixels(0.0)).is_none());
    }

    #[test]
    fn window_clamps_at_the_tail() {
        let mut cache = uniform(10, 24.0);
        let window =
            compute_window(&mut cache, 1_000.0, 480.0, CachePadding::Pixels(0.0)).unwrap();
        assert_eq!(window.last, 9);
        assert!(window.first <= window.last);
    }
}
