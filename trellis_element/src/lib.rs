// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Trellis Element: the element tree and measure/arrange layout engine.
//!
//! This crate is the center of the Trellis core. It owns the visual/logical
//! tree of elements, wires the typed property system into invalidation, and
//! runs the two-pass layout protocol that every widget participates in.
//!
//! ## The tree
//!
//! [`ElementTree`] is a generational arena: elements are created detached,
//! attached under at most one visual parent (and optionally a distinct
//! logical parent), and owned exclusively by the tree. [`ElementId`]s are
//! small copyable handles that go stale on removal. The tree is
//! `!Send + !Sync` — all mutation, layout, and dispatch happen on the one
//! UI thread that owns it.
//!
//! ## Properties drive invalidation
//!
//! Every observable attribute is a descriptor registered in a
//! [`PropertyRegistry`](trellis_property::PropertyRegistry); the
//! [`CoreProps`] bundle covers the attributes the layout engine itself
//! reads (size bounds, margin, alignment, visibility, opacity, and so on).
//! [`ElementTree::set_property`] runs validate → coerce → change detection
//! → `changed` callback, then maps the descriptor's affected channels onto
//! [`ElementTree::invalidate_measure`] /
//! [`ElementTree::invalidate_arrange`] /
//! [`ElementTree::invalidate_visual`]. Reparenting re-resolves every
//! `inherits` descriptor across the moved subtree and raises change
//! notifications for values that differ.
//!
//! ## Layout
//!
//! [`ElementTree::measure`] and [`ElementTree::arrange`] implement the
//! dirty-tracked measure/arrange state machine: idempotent passes,
//! bit-identical constraint short-circuiting, margin/explicit/min-max
//! constraint resolution, alignment, and slot republishing from the size
//! the widget's override actually returns. Invalidation climbs
//! visual-else-logical parents and stops at already-invalid ancestors.
//! [`ElementTree::update_layout`] runs a forced full pass.
//!
//! Widgets plug in through the capability traits of [`Measurable`],
//! [`Arrangeable`], [`Renderable`], [`HitTestable`], and [`PropertyAware`]
//! — composed as a boxed [`Behavior`] per element rather than an
//! inheritance chain.
//!
//! ## Example
//!
//! ```rust
//! use kurbo::{Rect, Size};
//! use trellis_element::{
//!     Arrangeable, CoreProps, ElementId, ElementTree, HitTestable,
//!     Measurable, PropertyAware, Renderable,
//! };
//! use trellis_property::PropertyRegistry;
//!
//! struct Label;
//! impl Measurable for Label {
//!     fn measure(&mut self, _tree: &mut ElementTree, _node: ElementId,
//!         _available: Size) -> Size {
//!         Size::new(80.0, 20.0)
//!     }
//! }
//! impl Arrangeable for Label {}
//! impl Renderable for Label {}
//! impl HitTestable for Label {}
//! impl PropertyAware for Label {}
//!
//! let mut registry = PropertyRegistry::new();
//! let props = CoreProps::register(&mut registry);
//! let mut tree = ElementTree::new(registry, props);
//!
//! let root = tree.insert_with_behavior(Label);
//! tree.set_root(root);
//! tree.set_surface_size(Size::new(200.0, 100.0));
//! tree.update_layout();
//!
//! assert_eq!(tree.desired_size(root), Size::new(80.0, 20.0));
//! assert_eq!(tree.slot(root), Rect::new(0.0, 0.0, 200.0, 100.0));
//! ```
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

mod behavior;
mod hit;
mod layout;
mod props;
mod surface;
mod tree;
mod types;

pub use behavior::{Arrangeable, Behavior, HitTestable, Measurable, PropertyAware, Renderable};
pub use layout::LAYOUT_EPSILON;
pub use props::{CoreProps, Element};
pub use surface::Surface;
pub use tree::ElementTree;
pub use types::{Alignment, Cursor, ElementId, LayoutFlags, Visibility};
