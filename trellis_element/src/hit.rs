// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Transform- and clip-aware hit testing.
//!
//! Hit testing walks the visual tree from the root, visiting children in
//! descending paint order so the topmost element wins. Each element's local
//! render transform and clip participate: the query point is mapped through
//! the inverse transform into element-local space, and a clip rejects the
//! whole subtree.
//!
//! Only elements that are `Visible` and hit-test-visible can be returned;
//! an element's [`HitTestable`](crate::HitTestable) hook refines the
//! default rectangular test.

use alloc::vec::Vec;
use kurbo::{Affine, Point, Rect};

use crate::tree::ElementTree;
use crate::types::{ElementId, Visibility};

impl ElementTree {
    /// Maps element-local geometry into the parent's coordinate space.
    fn to_parent(&self, node: ElementId) -> Affine {
        let data = self.data(node);
        Affine::translate(data.slot.origin().to_vec2()) * data.transform
    }

    /// Returns the element's bounds in root coordinates, conservatively
    /// transformed and clipped by ancestors.
    ///
    /// Returns `None` when the element is not attached under the tree root.
    #[must_use]
    pub fn root_bounds(&self, node: ElementId) -> Option<Rect> {
        if !self.is_rooted(node) {
            return None;
        }
        let mut rect = Rect::from_origin_size(Point::ZERO, self.data(node).render_size);
        let mut current = node;
        loop {
            rect = self.to_parent(current).transform_rect_bbox(rect);
            match self.data(current).visual_parent {
                Some(parent) => {
                    if let Some(clip) = self.data(parent).clip {
                        rect = rect.intersect(clip);
                    }
                    current = parent;
                }
                None => return Some(rect),
            }
        }
    }

    /// Returns the topmost element hit by `point` (root coordinates).
    pub fn hit_test(&self, point: Point) -> Option<ElementId> {
        let root = self.root()?;
        self.hit_test_node(root, point)
    }

    /// Returns the root→target path for the element hit by `point`, for
    /// feeding a routed-event dispatch.
    #[must_use]
    pub fn hit_test_path(&self, point: Point) -> Vec<ElementId> {
        let mut path = Vec::new();
        if let Some(mut target) = self.hit_test(point) {
            path.push(target);
            while let Some(parent) = self.data(target).visual_parent {
                path.push(parent);
                target = parent;
            }
            path.reverse();
        }
        path
    }

    fn hit_test_node(&self, node: ElementId, point_in_parent: Point) -> Option<ElementId> {
        let props = self.props();
        if self.get_property(node, props.visibility) != Visibility::Visible {
            return None;
        }

        let to_parent = self.to_parent(node);
        if to_parent.determinant() == 0.0 {
            return None;
        }
        let local = to_parent.inverse() * point_in_parent;

        if let Some(clip) = self.data(node).clip
            && !clip.contains(local)
        {
            return None;
        }

        // Topmost child first.
        let order = self.children_in_paint_order(node);
        for &child in order.iter().rev() {
            if let Some(hit) = self.hit_test_node(child, local) {
                return Some(hit);
            }
        }

        if !self.get_property(node, props.hit_test_visible) {
            return None;
        }
        let hit = match self.data(node).behavior.as_deref() {
            Some(behavior) => behavior.hit_test(self, node, local),
            None => Rect::from_origin_size(Point::ZERO, self.data(node).render_size)
                .contains(local),
        };
        hit.then_some(node)
    }

    /// Returns `true` when `node` and every ancestor are enabled.
    ///
    /// Input layers consult this before raising pointer/keyboard events at
    /// a hit-test result; a disabled element still occludes content below
    /// it.
    #[must_use]
    pub fn is_effectively_enabled(&self, node: ElementId) -> bool {
        let props = self.props();
        let mut current = Some(node);
        while let Some(key) = current {
            if !self.get_property(key, props.is_enabled) {
                return false;
            }
            current = self.data(key).visual_parent;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::behavior::{Arrangeable, HitTestable, Measurable, PropertyAware, Renderable};
    use crate::props::CoreProps;
    use crate::types::Alignment;
    use kurbo::Size;
    use trellis_property::PropertyRegistry;

    fn new_tree() -> (ElementTree, CoreProps) {
        let mut registry = PropertyRegistry::new();
        let props = CoreProps::register(&mut registry);
        (ElementTree::new(registry, props), props)
    }

    struct Fixed(Size);
    impl Measurable for Fixed {
        fn measure(&mut self, _: &mut ElementTree, _: ElementId, _: Size) -> Size {
            self.0
        }
    }
    impl Arrangeable for Fixed {}
    impl Renderable for Fixed {}
    impl HitTestable for Fixed {}
    impl PropertyAware for Fixed {}

    /// A stack that arranges each child at its desired size, top-left.
    struct Overlay;
    impl Measurable for Overlay {
        fn measure(&mut self, tree: &mut ElementTree, node: ElementId, available: Size) -> Size {
            let children: alloc::vec::Vec<_> = tree.children(node).to_vec();
            for child in children {
                tree.measure(child, available);
            }
            available
        }
    }
    impl Arrangeable for Overlay {
        fn arrange(&mut self, tree: &mut ElementTree, node: ElementId, final_size: Size) -> Size {
            let children: alloc::vec::Vec<_> = tree.children(node).to_vec();
            for child in children {
                let desired = tree.desired_size(child);
                tree.arrange(
                    child,
                    Rect::from_origin_size(Point::ZERO, desired),
                );
            }
            final_size
        }
    }
    impl Renderable for Overlay {}
    impl HitTestable for Overlay {}
    impl PropertyAware for Overlay {}

    fn overlay_with_two_blocks() -> (ElementTree, ElementId, ElementId, ElementId) {
        let (mut tree, props) = new_tree();
        let root = tree.insert_with_behavior(Overlay);
        let a = tree.insert_with_behavior(Fixed(Size::new(50.0, 50.0)));
        let b = tree.insert_with_behavior(Fixed(Size::new(30.0, 30.0)));
        tree.add_child(root, a);
        tree.add_child(root, b);
        // Children must not stretch past their reported sizes.
        for node in [a, b] {
            let _ = tree.set_property(node, props.h_align, Alignment::Start);
            let _ = tree.set_property(node, props.v_align, Alignment::Start);
        }
        tree.set_root(root);
        tree.set_surface_size(Size::new(100.0, 100.0));
        tree.update_layout();
        (tree, root, a, b)
    }

    #[test]
    fn topmost_sibling_wins() {
        let (tree, root, a, b) = overlay_with_two_blocks();

        // Both blocks overlap at (10, 10); `b` is later in document order.
        assert_eq!(tree.hit_test(Point::new(10.0, 10.0)), Some(b));
        // Outside `b`, inside `a`.
        assert_eq!(tree.hit_test(Point::new(45.0, 45.0)), Some(a));
        // Inside the root only.
        assert_eq!(tree.hit_test(Point::new(90.0, 90.0)), Some(root));
        // Outside everything.
        assert_eq!(tree.hit_test(Point::new(150.0, 150.0)), None);
    }

    #[test]
    fn z_index_overrides_document_order() {
        let (mut tree, _root, a, b) = overlay_with_two_blocks();
        tree.set_z_index(a, 10);
        assert_eq!(tree.hit_test(Point::new(10.0, 10.0)), Some(a));
    }

    #[test]
    fn hidden_and_hit_test_invisible_elements_are_skipped() {
        let (mut tree, _root, a, b) = overlay_with_two_blocks();
        let props = tree.props();

        let _ = tree.set_property(b, props.visibility, crate::types::Visibility::Hidden);
        assert_eq!(tree.hit_test(Point::new(10.0, 10.0)), Some(a));

        let _ = tree.set_property(a, props.hit_test_visible, false);
        let hit = tree.hit_test(Point::new(10.0, 10.0));
        assert_ne!(hit, Some(a));
        assert_ne!(hit, Some(b));
    }

    #[test]
    fn transform_moves_the_hit_region() {
        let (mut tree, _root, _a, b) = overlay_with_two_blocks();
        tree.set_transform(b, Affine::translate((60.0, 60.0)));
        tree.update_layout();

        assert_eq!(tree.hit_test(Point::new(65.0, 65.0)), Some(b));
        assert_ne!(tree.hit_test(Point::new(10.0, 10.0)), Some(b));
    }

    #[test]
    fn clip_rejects_the_subtree() {
        let (mut tree, root, _a, b) = overlay_with_two_blocks();
        tree.set_clip(root, Some(Rect::new(0.0, 0.0, 20.0, 20.0)));

        assert_eq!(tree.hit_test(Point::new(10.0, 10.0)), Some(b));
        assert_eq!(tree.hit_test(Point::new(40.0, 40.0)), None);
    }

    #[test]
    fn hit_test_path_is_root_to_target() {
        let (tree, root, _a, b) = overlay_with_two_blocks();
        assert_eq!(tree.hit_test_path(Point::new(10.0, 10.0)), [root, b]);
        assert!(tree.hit_test_path(Point::new(500.0, 500.0)).is_empty());
    }

    #[test]
    fn root_bounds_follow_transforms_and_detachment() {
        let (mut tree, _root, a, _b) = overlay_with_two_blocks();

        assert_eq!(tree.root_bounds(a), Some(Rect::new(0.0, 0.0, 50.0, 50.0)));

        tree.set_transform(a, Affine::translate((5.0, 5.0)));
        assert_eq!(tree.root_bounds(a), Some(Rect::new(5.0, 5.0, 55.0, 55.0)));

        let detached = tree.insert();
        assert_eq!(tree.root_bounds(detached), None);
    }

    #[test]
    fn effectively_enabled_requires_the_whole_chain() {
        let (mut tree, root, a, _b) = overlay_with_two_blocks();
        let props = tree.props();

        assert!(tree.is_effectively_enabled(a));
        let _ = tree.set_property(root, props.is_enabled, false);
        assert!(!tree.is_effectively_enabled(a));
    }
}
