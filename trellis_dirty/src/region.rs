// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Redraw requests and accumulated dirty regions.

use alloc::vec::Vec;
use kurbo::Rect;

/// Why a full-surface invalidation was requested.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum RedrawReason {
    /// The element's root-space bounds could not be computed (it is not
    /// attached to a rooted tree).
    Unrooted,
    /// The tree structure changed (attach/detach/reorder).
    Structure,
    /// An arrange invalidation occurred; bounds will only be known after the
    /// next layout pass.
    Arrange,
}

/// A single redraw demand reported to the owning surface.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum RedrawRequest {
    /// Redraw the given root-space rectangle.
    Region(Rect),
    /// Redraw the entire surface.
    Full(RedrawReason),
}

/// Accumulated redraw rectangles with a sticky full-invalidate flag.
///
/// The region is intentionally coarse: rectangles may overlap and are not
/// deduplicated, which is sufficient to bound a repaint traversal. Once a
/// [`RedrawRequest::Full`] arrives the rect list is dropped and every later
/// push is absorbed until the region is drained with [`DirtyRegion::take`].
#[derive(Clone, Debug, Default)]
pub struct DirtyRegion {
    rects: Vec<Rect>,
    full: Option<RedrawReason>,
}

impl DirtyRegion {
    /// Creates an empty region.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if nothing has been marked dirty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rects.is_empty() && self.full.is_none()
    }

    /// Returns `true` if a full-surface invalidation is pending.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.full.is_some()
    }

    /// Returns the pending full-invalidate reason, if any.
    #[must_use]
    pub fn full_reason(&self) -> Option<RedrawReason> {
        self.full
    }

    /// Returns the accumulated rectangles.
    ///
    /// Empty (and meaningless) while [`DirtyRegion::is_full`] holds.
    #[must_use]
    pub fn rects(&self) -> &[Rect] {
        &self.rects
    }

    /// Accumulates a redraw request.
    ///
    /// Region rects that are empty or non-finite are ignored; the surface
    /// never sees NaN geometry. A full request collapses the rect list.
    pub fn push(&mut self, request: RedrawRequest) {
        match request {
            RedrawRequest::Region(rect) => {
                if self.full.is_some() {
                    return;
                }
                let finite = rect.x0.is_finite()
                    && rect.y0.is_finite()
                    && rect.x1.is_finite()
                    && rect.y1.is_finite();
                if finite && rect.area() > 0.0 {
                    self.rects.push(rect);
                }
            }
            RedrawRequest::Full(reason) => {
                self.rects.clear();
                // First reason wins; later ones add no information.
                if self.full.is_none() {
                    self.full = Some(reason);
                }
            }
        }
    }

    /// Returns the union of all accumulated rects.
    ///
    /// Returns `None` when the region is empty or fully invalidated.
    #[must_use]
    pub fn union_rect(&self) -> Option<Rect> {
        if self.full.is_some() {
            return None;
        }
        let mut it = self.rects.iter().copied();
        let first = it.next()?;
        Some(it.fold(first, |acc, r| acc.union(r)))
    }

    /// Drains the region, returning the accumulated state and resetting it.
    pub fn take(&mut self) -> Self {
        core::mem::take(self)
    }
}

/// Redraw/layout-dirty sink exposed by an owning root surface.
///
/// The element tree calls into this on every invalidation; the frame loop
/// consumes the accumulated state once per tick. Embedders that host a tree
/// inside another compositor implement this to forward damage outward.
pub trait InvalidationSink {
    /// Reports a region (or full-surface) redraw demand.
    fn mark_visual_dirty(&mut self, request: RedrawRequest);

    /// Reports that a layout pass is required before the next frame.
    fn mark_layout_dirty(&mut self);
}
