// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The virtualizing column container.

use alloc::collections::BTreeMap;
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::RefCell;
use kurbo::{Rect, Size};
use trellis_element::{
    Arrangeable, ElementId, ElementTree, HitTestable, Measurable, PropertyAware, Renderable,
};

use crate::extent::ExtentCache;
use crate::window::{CachePadding, ViewportSource, WindowRange, compute_window};

/// Viewport fallback, in multiples of the average item extent, used when
/// neither the container's own constraint nor a scroll owner provides a
/// finite viewport.
const FALLBACK_VIEWPORT_ITEMS: f64 = 16.0;

/// Supplies child elements for a virtualizing container on demand.
///
/// The container realizes an element only while its index is inside the
/// virtualization window and hands it back through
/// [`ItemSource::recycle`] when the index scrolls out. A source may pool
/// recycled elements or simply remove them from the tree.
pub trait ItemSource {
    /// Number of items in the backing list.
    fn len(&self) -> usize;

    /// Returns `true` if the backing list is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Creates (or revives) the element for `index`, detached.
    ///
    /// The container attaches the returned element as its visual child.
    fn realize(&mut self, tree: &mut ElementTree, index: usize) -> ElementId;

    /// Takes back an element whose index left the window.
    ///
    /// The element has already been detached from the container.
    fn recycle(&mut self, tree: &mut ElementTree, index: usize, element: ElementId);
}

/// A vertically virtualizing container behavior.
///
/// Only the items inside the computed window — the viewport plus the
/// configured [`CachePadding`] — are realized as children, measured, and
/// arranged; everything else stays unrealized and costs nothing per frame.
/// Desired height is the estimated total extent, so an enclosing scroll
/// surface sees the full content size.
///
/// The viewport extent resolves in order: the container's own measure
/// constraint when finite, an attached [`ViewportSource`], and finally a
/// heuristic multiple of the average item extent. With virtualization
/// disabled (or a degenerate viewport) every item is realized.
///
/// Scrolling goes through [`VirtualizingColumn::scroll_to`], which updates
/// the offset and invalidates measure so the window is recomputed on the
/// next layout pass.
pub struct VirtualizingColumn<S: ItemSource> {
    items: S,
    cache: ExtentCache,
    padding: CachePadding,
    virtualizing: bool,
    scroll_offset: f64,
    viewport_source: Option<Rc<RefCell<dyn ViewportSource>>>,
    realized: BTreeMap<usize, ElementId>,
    last_notified: Option<(f64, f64)>,
}

impl<S: ItemSource> core::fmt::Debug for VirtualizingColumn<S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("VirtualizingColumn")
            .field("len", &self.items.len())
            .field("realized", &self.realized.len())
            .field("virtualizing", &self.virtualizing)
            .field("scroll_offset", &self.scroll_offset)
            .finish_non_exhaustive()
    }
}

impl<S: ItemSource + 'static> VirtualizingColumn<S> {
    /// Creates a container over `items` with a seed estimate for item
    /// extents.
    ///
    /// # Panics
    ///
    /// Panics unless the seed estimate is finite and positive.
    #[must_use]
    pub fn new(items: S, seed_estimate: f64) -> Self {
        Self {
            items,
            cache: ExtentCache::new(seed_estimate),
            padding: CachePadding::Pages(1.0),
            virtualizing: true,
            scroll_offset: 0.0,
            viewport_source: None,
            realized: BTreeMap::new(),
            last_notified: None,
        }
    }

    /// Sets the realization padding kept around the viewport.
    #[must_use]
    pub fn with_padding(mut self, padding: CachePadding) -> Self {
        self.padding = padding;
        self
    }

    /// Enables or disables virtualization; disabled containers realize
    /// every item.
    #[must_use]
    pub fn with_virtualizing(mut self, virtualizing: bool) -> Self {
        self.virtualizing = virtualizing;
        self
    }

    /// Attaches the scroll owner consulted for viewport extent and offset.
    #[must_use]
    pub fn with_viewport_source(mut self, source: Rc<RefCell<dyn ViewportSource>>) -> Self {
        self.viewport_source = Some(source);
        self
    }

    /// Returns the backing item source.
    #[must_use]
    pub fn items(&self) -> &S {
        &self.items
    }

    /// Returns the backing item source mutably.
    ///
    /// After changing the item list, invalidate measure on the container's
    /// element so the window is rebuilt.
    pub fn items_mut(&mut self) -> &mut S {
        &mut self.items
    }

    /// Returns the currently realized `(index, element)` pairs, ascending.
    pub fn realized(&self) -> impl Iterator<Item = (usize, ElementId)> + '_ {
        self.realized.iter().map(|(&index, &element)| (index, element))
    }

    /// Returns the current scroll offset.
    #[must_use]
    pub fn scroll_offset(&self) -> f64 {
        self.scroll_offset
    }

    /// Scrolls the container identified by `node` to `offset`.
    ///
    /// Convenience wrapper over [`ElementTree::behavior_mut`]; invalidates
    /// measure when the offset actually changes.
    pub fn scroll_to(tree: &mut ElementTree, node: ElementId, offset: f64) {
        let Some(this) = tree.behavior_mut::<Self>(node) else {
            return;
        };
        let offset = if offset.is_finite() { offset.max(0.0) } else { 0.0 };
        if this.scroll_offset != offset {
            this.scroll_offset = offset;
            tree.invalidate_measure(node);
        }
    }

    fn effective_offset(&self) -> f64 {
        match &self.viewport_source {
            Some(source) => source.borrow().scroll_offset().max(0.0),
            None => self.scroll_offset,
        }
    }

    /// Viewport resolution: own constraint, scroll owner, heuristic.
    fn resolve_viewport(&self, own_extent: f64) -> f64 {
        if own_extent.is_finite() && own_extent > 0.0 {
            return own_extent;
        }
        if let Some(source) = &self.viewport_source {
            let extent = source.borrow().viewport_extent();
            if extent.is_finite() && extent > 0.0 {
                return extent;
            }
        }
        self.cache.estimate() * FALLBACK_VIEWPORT_ITEMS
    }

    fn reconcile(&mut self, tree: &mut ElementTree, node: ElementId, window: Option<WindowRange>) {
        let stale: Vec<(usize, ElementId)> = self
            .realized
            .iter()
            .filter(|&(&index, _)| !window.is_some_and(|w| w.contains(index)))
            .map(|(&index, &element)| (index, element))
            .collect();
        for (index, element) in stale {
            self.realized.remove(&index);
            tree.remove_child(node, element);
            self.items.recycle(tree, index, element);
        }

        if let Some(window) = window {
            for index in window.iter() {
                if !self.realized.contains_key(&index) {
                    let element = self.items.realize(tree, index);
                    tree.add_child(node, element);
                    self.realized.insert(index, element);
                }
            }
        }
    }

    fn notify_scroll_owner(&mut self, total: f64, viewport: f64) {
        let Some(source) = &self.viewport_source else {
            return;
        };
        if self.last_notified != Some((total, viewport)) {
            self.last_notified = Some((total, viewport));
            source.borrow_mut().extent_changed(total, viewport);
        }
    }
}

impl<S: ItemSource + 'static> Measurable for VirtualizingColumn<S> {
    fn measure(&mut self, tree: &mut ElementTree, node: ElementId, available: Size) -> Size {
        self.cache.set_len(self.items.len());

        let viewport = self.resolve_viewport(available.height);
        let offset = self.effective_offset();
        let window = if self.virtualizing {
            compute_window(&mut self.cache, offset, viewport, self.padding)
        } else if self.cache.is_empty() {
            None
        } else {
            Some(WindowRange {
                first: 0,
                last: self.cache.len() - 1,
            })
        };

        self.reconcile(tree, node, window);

        let mut width = 0.0_f64;
        if let Some(window) = window {
            for index in window.iter() {
                let element = self.realized[&index];
                tree.measure(element, Size::new(available.width, f64::INFINITY));
                let desired = tree.desired_size(element);
                self.cache.record(index, desired.height, desired.width);
                width = width.max(desired.width);
            }
        }

        let total = self.cache.total_extent();
        self.notify_scroll_owner(total, viewport);
        Size::new(width, total)
    }
}

impl<S: ItemSource + 'static> Arrangeable for VirtualizingColumn<S> {
    fn arrange(&mut self, tree: &mut ElementTree, node: ElementId, final_size: Size) -> Size {
        let _ = node;
        let offset = self.effective_offset();
        let pairs: Vec<(usize, ElementId)> = self
            .realized
            .iter()
            .map(|(&index, &element)| (index, element))
            .collect();
        for (index, element) in pairs {
            let top = self.cache.offset_of(index) - offset;
            let extent = self.cache.extent_of(index);
            tree.arrange(
                element,
                Rect::new(0.0, top, final_size.width, top + extent),
            );
        }
        final_size
    }
}

impl<S: ItemSource + 'static> Renderable for VirtualizingColumn<S> {}

impl<S: ItemSource + 'static> HitTestable for VirtualizingColumn<S> {}

impl<S: ItemSource + 'static> PropertyAware for VirtualizingColumn<S> {}
