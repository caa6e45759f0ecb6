// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The owning root surface: dirty accumulation and the render traversal.

use core::any::Any;
use kurbo::{Rect, Size};
use trellis_dirty::{DirtyRegion, InvalidationSink, RedrawReason, RedrawRequest};

use crate::tree::ElementTree;
use crate::types::{ElementId, Visibility};

/// The redraw/layout-dirty sink owned by an [`ElementTree`].
///
/// Every invalidation in the tree lands here; the frame loop drains the
/// accumulated state once per tick ([`Surface::take_region`],
/// [`Surface::take_layout_dirty`]) and hands the region to the draw
/// backend. Embedders hosting a tree inside another compositor can forward
/// the same information through their own [`InvalidationSink`].
#[derive(Debug)]
pub struct Surface {
    size: Size,
    region: DirtyRegion,
    layout_dirty: bool,
}

impl Surface {
    /// Creates a surface of the given size.
    #[must_use]
    pub fn new(size: Size) -> Self {
        Self {
            size,
            region: DirtyRegion::new(),
            layout_dirty: false,
        }
    }

    /// Returns the surface size.
    #[must_use]
    pub fn size(&self) -> Size {
        self.size
    }

    pub(crate) fn set_size(&mut self, size: Size) {
        self.size = size;
        self.layout_dirty = true;
    }

    /// Returns the accumulated redraw region without draining it.
    #[must_use]
    pub fn region(&self) -> &DirtyRegion {
        &self.region
    }

    /// Returns whether a layout pass is pending.
    #[must_use]
    pub fn is_layout_dirty(&self) -> bool {
        self.layout_dirty
    }

    pub(crate) fn push_region(&mut self, rect: Rect) {
        self.region.push(RedrawRequest::Region(rect));
    }

    pub(crate) fn push_full(&mut self, reason: RedrawReason) {
        self.region.push(RedrawRequest::Full(reason));
    }

    pub(crate) fn set_layout_dirty(&mut self) {
        self.layout_dirty = true;
    }

    pub(crate) fn clear_layout_dirty(&mut self) {
        self.layout_dirty = false;
    }

    /// Drains the accumulated redraw region.
    pub fn take_region(&mut self) -> DirtyRegion {
        self.region.take()
    }

    /// Drains the layout-dirty flag.
    pub fn take_layout_dirty(&mut self) -> bool {
        core::mem::take(&mut self.layout_dirty)
    }
}

impl InvalidationSink for Surface {
    fn mark_visual_dirty(&mut self, request: RedrawRequest) {
        self.region.push(request);
    }

    fn mark_layout_dirty(&mut self) {
        self.layout_dirty = true;
    }
}

impl ElementTree {
    /// Walks the tree parent-before-child, siblings in ascending paint
    /// order, invoking each element's render hook with the type-erased
    /// backend surface.
    ///
    /// Hidden and collapsed subtrees are skipped entirely. Rendering never
    /// mutates layout state; run [`ElementTree::update_layout`] first when
    /// the layout-dirty flag is set.
    pub fn render(&self, backend: &mut dyn Any) {
        if let Some(root) = self.root() {
            self.render_node(root, backend);
        }
    }

    fn render_node(&self, node: ElementId, backend: &mut dyn Any) {
        if self.get_property(node, self.props().visibility) != Visibility::Visible {
            return;
        }
        if let Some(behavior) = self.data(node).behavior.as_deref() {
            behavior.render(self, node, backend);
        }
        for child in self.children_in_paint_order(node) {
            self.render_node(child, backend);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::behavior::{Arrangeable, HitTestable, Measurable, PropertyAware, Renderable};
    use crate::props::CoreProps;
    use alloc::vec::Vec;
    use trellis_property::PropertyRegistry;

    fn new_tree() -> (ElementTree, CoreProps) {
        let mut registry = PropertyRegistry::new();
        let props = CoreProps::register(&mut registry);
        (ElementTree::new(registry, props), props)
    }

    #[derive(Default)]
    struct PaintLog {
        order: Vec<ElementId>,
    }

    struct Painted;
    impl Measurable for Painted {
        fn measure(&mut self, tree: &mut ElementTree, node: ElementId, available: Size) -> Size {
            let children: Vec<_> = tree.children(node).to_vec();
            for child in children {
                tree.measure(child, available);
            }
            available
        }
    }
    impl Arrangeable for Painted {
        fn arrange(&mut self, tree: &mut ElementTree, node: ElementId, final_size: Size) -> Size {
            let children: Vec<_> = tree.children(node).to_vec();
            for child in children {
                tree.arrange(child, Rect::from_origin_size(kurbo::Point::ZERO, final_size));
            }
            final_size
        }
    }
    impl Renderable for Painted {
        fn render(&self, _tree: &ElementTree, node: ElementId, surface: &mut dyn Any) {
            if let Some(log) = surface.downcast_mut::<PaintLog>() {
                log.order.push(node);
            }
        }
    }
    impl HitTestable for Painted {}
    impl PropertyAware for Painted {}

    #[test]
    fn render_visits_parent_first_in_paint_order() {
        let (mut tree, props) = new_tree();
        let root = tree.insert_with_behavior(Painted);
        let low = tree.insert_with_behavior(Painted);
        let high = tree.insert_with_behavior(Painted);
        let hidden = tree.insert_with_behavior(Painted);
        tree.add_child(root, high);
        tree.add_child(root, low);
        tree.add_child(root, hidden);
        tree.set_z_index(high, 1);
        let _ = tree.set_property(hidden, props.visibility, Visibility::Hidden);
        tree.set_root(root);
        tree.set_surface_size(Size::new(100.0, 100.0));
        tree.update_layout();

        let mut log = PaintLog::default();
        tree.render(&mut log);
        assert_eq!(log.order, [root, low, high]);
    }

    #[test]
    fn surface_drains_region_and_layout_flag() {
        let mut surface = Surface::new(Size::new(10.0, 10.0));
        surface.mark_visual_dirty(RedrawRequest::Region(Rect::new(0.0, 0.0, 5.0, 5.0)));
        surface.mark_layout_dirty();

        assert!(!surface.region().is_empty());
        assert!(surface.is_layout_dirty());

        let region = surface.take_region();
        assert_eq!(region.rects().len(), 1);
        assert!(surface.region().is_empty());
        assert!(surface.take_layout_dirty());
        assert!(!surface.is_layout_dirty());
    }
}
