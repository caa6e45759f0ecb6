// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The measure/arrange layout engine.
//!
//! Every element carries a small state machine:
//! `{measure dirty, measure valid} x {arrange dirty, arrange valid}`, both
//! dirty at creation. [`ElementTree::measure`] and [`ElementTree::arrange`]
//! short-circuit when nothing changed, which makes layout passes idempotent:
//! invoking either twice with identical inputs never re-runs the element's
//! override.
//!
//! Invalidation climbs the parent chain (visual, else logical) and stops at
//! the first already-invalid ancestor, so a burst of property changes deep
//! in the tree settles in one cheap fixed point. The next
//! [`ElementTree::update_layout`] pass re-measures and re-arranges only the
//! dirty spine.

use kurbo::{Insets, Point, Rect, Size};

use crate::tree::ElementTree;
use crate::types::{Alignment, ElementId, LayoutFlags, Visibility};

/// Tolerance used when comparing arrange rects.
pub const LAYOUT_EPSILON: f64 = 1e-6;

/// Replaces NaN constraint components with infinity (unconstrained) and
/// clamps negatives to zero.
fn sanitize_constraint(size: Size) -> Size {
    let fix = |v: f64| if v.is_nan() { f64::INFINITY } else { v.max(0.0) };
    Size::new(fix(size.width), fix(size.height))
}

/// Forces a size reported by an override into finite, non-negative range.
fn sanitize_reported(size: Size) -> Size {
    let fix = |v: f64| if v.is_finite() { v.max(0.0) } else { 0.0 };
    Size::new(fix(size.width), fix(size.height))
}

/// Keeps slot geometry finite: NaN and infinite rect coordinates collapse
/// to zero.
fn sanitize_rect(rect: Rect) -> Rect {
    let fix = |v: f64| if v.is_finite() { v } else { 0.0 };
    Rect::new(fix(rect.x0), fix(rect.y0), fix(rect.x1), fix(rect.y1))
}

fn deflate(size: Size, margin: Insets) -> Size {
    Size::new(
        (size.width - (margin.x0 + margin.x1)).max(0.0),
        (size.height - (margin.y0 + margin.y1)).max(0.0),
    )
}

fn inflate(size: Size, margin: Insets) -> Size {
    Size::new(
        (size.width + margin.x0 + margin.x1).max(0.0),
        (size.height + margin.y0 + margin.y1).max(0.0),
    )
}

fn size_bits(size: Size) -> (u64, u64) {
    (size.width.to_bits(), size.height.to_bits())
}

fn rect_close(a: Rect, b: Rect) -> bool {
    (a.x0 - b.x0).abs() <= LAYOUT_EPSILON
        && (a.y0 - b.y0).abs() <= LAYOUT_EPSILON
        && (a.x1 - b.x1).abs() <= LAYOUT_EPSILON
        && (a.y1 - b.y1).abs() <= LAYOUT_EPSILON
}

fn align_offset(alignment: Alignment, available: f64, used: f64) -> f64 {
    match alignment {
        Alignment::Start | Alignment::Stretch => 0.0,
        Alignment::Center => (available - used) / 2.0,
        Alignment::End => available - used,
    }
}

/// Explicit size and min/max bounds of one element, resolved once per pass.
#[derive(Copy, Clone, Debug)]
struct SizeLimits {
    explicit: Size,
    min: Size,
    max: Size,
}

impl SizeLimits {
    fn resolve(tree: &ElementTree, node: ElementId) -> Self {
        let props = tree.props();
        let min = Size::new(
            tree.get_property(node, props.min_width),
            tree.get_property(node, props.min_height),
        );
        let max = Size::new(
            tree.get_property(node, props.max_width).max(min.width),
            tree.get_property(node, props.max_height).max(min.height),
        );
        Self {
            explicit: Size::new(
                tree.get_property(node, props.width),
                tree.get_property(node, props.height),
            ),
            min,
            max,
        }
    }

    /// Applies explicit size (NaN = pass-through) then min/max per axis.
    fn clamp(&self, size: Size) -> Size {
        let width = if self.explicit.width.is_nan() {
            size.width
        } else {
            self.explicit.width
        };
        let height = if self.explicit.height.is_nan() {
            size.height
        } else {
            self.explicit.height
        };
        Size::new(
            width.clamp(self.min.width, self.max.width),
            height.clamp(self.min.height, self.max.height),
        )
    }
}

impl ElementTree {
    /// Measures `node` under `available`, caching the desired size.
    ///
    /// No-op when measure is valid and `available` is bit-identical to the
    /// last constraint. A collapsed element reports zero desired size
    /// without invoking its override.
    ///
    /// # Panics
    ///
    /// Panics if `node` is stale or this measure re-enters an element
    /// already mid-measure.
    pub fn measure(&mut self, node: ElementId, available: Size) {
        let props = self.props();
        let available = sanitize_constraint(available);

        if self.get_property(node, props.visibility) == Visibility::Collapsed {
            let data = self.data_mut(node);
            data.desired_size = Size::ZERO;
            data.last_constraint = Some(available);
            data.flags.insert(LayoutFlags::MEASURE_VALID);
            return;
        }

        {
            let data = self.data(node);
            assert!(
                !data.flags.contains(LayoutFlags::IN_MEASURE),
                "Measure re-entrancy on {node:?}"
            );
            if data.flags.contains(LayoutFlags::MEASURE_VALID)
                && data
                    .last_constraint
                    .is_some_and(|last| size_bits(last) == size_bits(available))
            {
                return;
            }
        }

        let margin = self.get_property(node, props.margin);
        let limits = SizeLimits::resolve(self, node);
        let constraint = limits.clamp(deflate(available, margin));

        let mut behavior = self.data_mut(node).behavior.take();
        self.data_mut(node).flags.insert(LayoutFlags::IN_MEASURE);
        let reported = match behavior.as_mut() {
            Some(behavior) => behavior.measure(self, node, constraint),
            None => Size::ZERO,
        };

        let content = limits.clamp(sanitize_reported(reported));
        let data = self.data_mut(node);
        data.flags.remove(LayoutFlags::IN_MEASURE);
        if behavior.is_some() {
            data.behavior = behavior;
        }
        data.desired_size = inflate(content, margin);
        data.last_constraint = Some(available);
        data.flags.insert(LayoutFlags::MEASURE_VALID);
        // A measure actually ran, so the published slot is no longer valid.
        data.flags.remove(LayoutFlags::ARRANGE_VALID);
    }

    /// Arranges `node` into `rect` (parent coordinates), publishing the
    /// layout slot.
    ///
    /// No-op when both passes are valid and `rect` is within
    /// [`LAYOUT_EPSILON`] of the last arrange rect. Re-measures first if
    /// measure is dirty. The slot is republished from the size the
    /// override actually returns, which may differ from the requested
    /// size.
    ///
    /// # Panics
    ///
    /// Panics if `node` is stale or this arrange re-enters an element
    /// already mid-arrange.
    pub fn arrange(&mut self, node: ElementId, rect: Rect) {
        let props = self.props();
        let rect = sanitize_rect(rect);

        if self.get_property(node, props.visibility) == Visibility::Collapsed {
            let data = self.data_mut(node);
            data.render_size = Size::ZERO;
            data.slot = Rect::from_origin_size(rect.origin(), Size::ZERO);
            data.last_arrange = Some(rect);
            data.flags
                .insert(LayoutFlags::MEASURE_VALID | LayoutFlags::ARRANGE_VALID);
            return;
        }

        {
            let data = self.data(node);
            assert!(
                !data.flags.contains(LayoutFlags::IN_ARRANGE),
                "Arrange re-entrancy on {node:?}"
            );
            if data
                .flags
                .contains(LayoutFlags::MEASURE_VALID | LayoutFlags::ARRANGE_VALID)
                && data.last_arrange.is_some_and(|last| rect_close(last, rect))
            {
                return;
            }
        }

        if !self.data(node).flags.contains(LayoutFlags::MEASURE_VALID) {
            let constraint = self.data(node).last_constraint.unwrap_or_else(|| rect.size());
            self.measure(node, constraint);
        }

        let old_bounds = self.root_bounds(node);

        let margin = self.get_property(node, props.margin);
        let limits = SizeLimits::resolve(self, node);
        let h_align = self.get_property(node, props.h_align);
        let v_align = self.get_property(node, props.v_align);

        let content = deflate(rect.size(), margin);
        let desired_content = deflate(self.data(node).desired_size, margin);

        let width = if h_align == Alignment::Stretch {
            content.width
        } else {
            desired_content.width.min(content.width)
        };
        let height = if v_align == Alignment::Stretch {
            content.height
        } else {
            desired_content.height.min(content.height)
        };
        let final_size = limits.clamp(Size::new(width, height));

        let mut behavior = self.data_mut(node).behavior.take();
        self.data_mut(node).flags.insert(LayoutFlags::IN_ARRANGE);
        let reported = match behavior.as_mut() {
            Some(behavior) => behavior.arrange(self, node, final_size),
            None => final_size,
        };

        let used = sanitize_reported(reported);
        let origin = Point::new(
            rect.x0 + margin.x0 + align_offset(h_align, content.width, used.width),
            rect.y0 + margin.y0 + align_offset(v_align, content.height, used.height),
        );

        let data = self.data_mut(node);
        data.flags.remove(LayoutFlags::IN_ARRANGE);
        if behavior.is_some() {
            data.behavior = behavior;
        }
        data.render_size = used;
        data.slot = Rect::from_origin_size(origin, used);
        data.last_arrange = Some(rect);
        data.flags.insert(LayoutFlags::ARRANGE_VALID);

        let new_bounds = self.root_bounds(node);
        for bounds in [old_bounds, new_bounds].into_iter().flatten() {
            self.surface_mut()
                .push_region(bounds);
        }
    }

    /// Invalidates the cached desired size of `node` and every ancestor.
    ///
    /// Climbing stops at the first already-measure-invalid ancestor.
    pub fn invalidate_measure(&mut self, node: ElementId) {
        if !self.data(node).flags.contains(LayoutFlags::MEASURE_VALID) {
            return;
        }
        self.data_mut(node).flags.remove(LayoutFlags::MEASURE_VALID);
        self.invalidate_arrange(node);
        self.surface_mut().set_layout_dirty();
        if let Some(parent) = self.data(node).climb_parent() {
            self.invalidate_measure(parent);
        }
    }

    /// Invalidates the published slot of `node` and every ancestor.
    ///
    /// Marks a redraw demand against the owning surface; climbing stops at
    /// the first already-arrange-invalid ancestor.
    pub fn invalidate_arrange(&mut self, node: ElementId) {
        if !self.data(node).flags.contains(LayoutFlags::ARRANGE_VALID) {
            return;
        }
        self.data_mut(node).flags.remove(LayoutFlags::ARRANGE_VALID);
        self.mark_redraw(node, trellis_dirty::RedrawReason::Arrange);
        self.surface_mut().set_layout_dirty();
        if let Some(parent) = self.data(node).climb_parent() {
            self.invalidate_arrange(parent);
        }
    }

    /// Marks the element's current root-space bounds as needing redraw.
    ///
    /// Leaves layout state alone. Falls back to a full-surface invalidation
    /// when bounds cannot be computed (the element is unrooted).
    pub fn invalidate_visual(&mut self, node: ElementId) {
        self.mark_redraw(node, trellis_dirty::RedrawReason::Unrooted);
    }

    fn mark_redraw(&mut self, node: ElementId, fallback: trellis_dirty::RedrawReason) {
        match self.root_bounds(node) {
            Some(bounds) => self.surface_mut().push_region(bounds),
            None => self
                .surface_mut()
                .push_full(fallback),
        }
    }

    /// Runs a forced full layout pass: measures the root with its last
    /// constraint (falling back to the surface size), then arranges with
    /// the last-known rect, recursing through dirty visual children.
    ///
    /// Needed when layout must be current immediately, e.g. before hit
    /// testing right after a structural change.
    pub fn update_layout(&mut self) {
        let Some(root) = self.root() else {
            return;
        };
        let surface_size = self.surface().size();
        let constraint = self.data(root).last_constraint.unwrap_or(surface_size);
        self.measure(root, constraint);
        let rect = self
            .data(root)
            .last_arrange
            .unwrap_or_else(|| Rect::from_origin_size(Point::ZERO, surface_size));
        self.arrange(root, rect);
        self.surface_mut().clear_layout_dirty();
    }
}
