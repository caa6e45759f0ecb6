// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Capability traits widgets implement to participate in layout, rendering,
//! and hit testing.
//!
//! Instead of a deep override hierarchy, each hook is its own small trait;
//! [`Behavior`] is the blanket composition an element carries as a boxed
//! object. All hooks have defaults, so a widget only writes the hooks it
//! cares about:
//!
//! ```rust
//! use kurbo::Size;
//! use trellis_element::{Arrangeable, ElementId, ElementTree, HitTestable,
//!     Measurable, PropertyAware, Renderable};
//!
//! /// A fixed-size block.
//! struct Block {
//!     size: Size,
//! }
//!
//! impl Measurable for Block {
//!     fn measure(&mut self, _tree: &mut ElementTree, _node: ElementId,
//!         _available: Size) -> Size {
//!         self.size
//!     }
//! }
//!
//! impl Arrangeable for Block {}
//! impl Renderable for Block {}
//! impl HitTestable for Block {}
//! impl PropertyAware for Block {}
//! ```
//!
//! Container behaviors measure and arrange their children through the
//! `tree` parameter; the element's own box is taken out of the tree for the
//! duration of the call, so re-entrant layout of the same element is
//! rejected rather than aliased.

use core::any::Any;
use kurbo::{Point, Rect, Size};
use trellis_property::PropertyId;

use crate::tree::ElementTree;
use crate::types::ElementId;

/// Size negotiation: given an available size, report the desired size.
pub trait Measurable {
    /// Measures content under `available` and returns the desired size.
    ///
    /// The constraint has margin removed and explicit/min/max bounds
    /// applied; the returned size is clamped the same way and must not be
    /// relied on verbatim. Containers measure children here via
    /// [`ElementTree::measure`].
    fn measure(&mut self, tree: &mut ElementTree, node: ElementId, available: Size) -> Size {
        let _ = (tree, node, available);
        Size::ZERO
    }
}

/// Final placement: given the arranged size, place content and report the
/// size actually used.
pub trait Arrangeable {
    /// Arranges content into `final_size` and returns the used size.
    ///
    /// The element's slot is republished from the returned size, which may
    /// differ from the requested one. Containers arrange children here via
    /// [`ElementTree::arrange`].
    fn arrange(&mut self, tree: &mut ElementTree, node: ElementId, final_size: Size) -> Size {
        let _ = (tree, node);
        final_size
    }
}

/// Drawing hook, invoked post-arrange in parent-to-child order.
pub trait Renderable {
    /// Records draw operations against the backend surface.
    ///
    /// The surface is type-erased; the draw backend is not part of the
    /// core, so widgets downcast to whatever backend the host runs.
    fn render(&self, tree: &ElementTree, node: ElementId, surface: &mut dyn Any) {
        let _ = (tree, node, surface);
    }
}

/// Hit-test refinement in element-local coordinates.
pub trait HitTestable {
    /// Returns whether `point` (element-local) hits this element.
    ///
    /// The default accepts any point inside the render bounds; widgets with
    /// non-rectangular shapes override this.
    fn hit_test(&self, tree: &ElementTree, node: ElementId, point: Point) -> bool {
        Rect::from_origin_size(Point::ZERO, tree.render_size(node)).contains(point)
    }
}

/// Per-element reaction to dependency property changes.
pub trait PropertyAware {
    /// Invoked after a property's effective value changed on this element,
    /// after the descriptor's `changed` callback and before invalidation is
    /// applied.
    ///
    /// The hook is not re-entered for properties it sets on its own
    /// element, and it does not fire while the element is mid-layout.
    fn property_changed(&mut self, tree: &mut ElementTree, node: ElementId, property: PropertyId) {
        let _ = (tree, node, property);
    }
}

/// The full capability set an element can carry.
///
/// Blanket-implemented for any type providing the five hooks. The `Any`
/// supertrait lets hosts reach a concrete behavior back out of the tree
/// via [`ElementTree::behavior_mut`].
pub trait Behavior:
    Measurable + Arrangeable + Renderable + HitTestable + PropertyAware + Any
{
}

impl<T: Measurable + Arrangeable + Renderable + HitTestable + PropertyAware + 'static> Behavior
    for T
{
}
