// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Public element types: identifiers, visibility, alignment, layout flags.

use core::fmt;

/// Identifier for an element in an [`ElementTree`](crate::ElementTree).
///
/// A small, copyable generational handle: a slot index plus a generation
/// counter. Handles stay stable across tree mutation and become stale when
/// the element is removed; a reused slot gets a higher generation, so a
/// stale id never aliases a different live element.
///
/// Use [`ElementTree::is_alive`](crate::ElementTree::is_alive) to check
/// liveness; mutating APIs panic on stale ids (programmer error).
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
pub struct ElementId(pub(crate) u32, pub(crate) u32);

impl ElementId {
    pub(crate) const fn new(index: u32, generation: u32) -> Self {
        Self(index, generation)
    }

    pub(crate) const fn idx(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ElementId({}v{})", self.0, self.1)
    }
}

/// Whether and how an element participates in layout and rendering.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum Visibility {
    /// Rendered, hit-testable, and occupies layout space.
    #[default]
    Visible,
    /// Not rendered and not hit-testable, but still occupies layout space.
    Hidden,
    /// Not rendered and reports zero desired size; layout skips the
    /// element's size-negotiation override entirely.
    Collapsed,
}

/// Per-axis placement of an element inside the space its parent arranged.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum Alignment {
    /// Fill the available space.
    #[default]
    Stretch,
    /// Clamp to the desired size, placed at the near edge.
    Start,
    /// Clamp to the desired size, centered.
    Center,
    /// Clamp to the desired size, placed at the far edge.
    End,
}

/// Pointer cursor requested by an element.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum Cursor {
    /// The platform default arrow.
    #[default]
    Arrow,
    /// A pointing hand, for activatable content.
    Pointer,
    /// An I-beam, for text.
    Text,
    /// A crosshair.
    Crosshair,
    /// A busy indicator.
    Wait,
    /// The action is unavailable.
    NotAllowed,
}

bitflags::bitflags! {
    /// Layout and lifecycle state bits of one element.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct LayoutFlags: u8 {
        /// The cached desired size matches the last measure constraint.
        const MEASURE_VALID = 0b0000_0001;
        /// The published slot matches the last arrange rect.
        const ARRANGE_VALID = 0b0000_0010;
        /// The element is attached to a rooted tree.
        const LOADED        = 0b0000_0100;
        /// A measure pass is currently running on this element.
        const IN_MEASURE    = 0b0000_1000;
        /// An arrange pass is currently running on this element.
        const IN_ARRANGE    = 0b0001_0000;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn element_id_debug_shows_slot_and_generation() {
        let id = ElementId::new(3, 2);
        assert_eq!(alloc::format!("{id:?}"), "ElementId(3v2)");
    }

    #[test]
    fn stale_ids_never_compare_equal_to_reused_slots() {
        assert_ne!(ElementId::new(0, 1), ElementId::new(0, 2));
    }

    #[test]
    fn defaults() {
        assert_eq!(Visibility::default(), Visibility::Visible);
        assert_eq!(Alignment::default(), Alignment::Stretch);
        assert_eq!(Cursor::default(), Cursor::Arrow);
        assert!(LayoutFlags::default().is_empty());
    }
}
