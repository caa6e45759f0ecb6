// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Trellis Dirty: invalidation channels and redraw-region accumulation.
//!
//! This crate is the smallest layer of the Trellis UI core. It defines the
//! vocabulary the rest of the stack uses to talk about *what kind* of work a
//! change invalidates and *where* on screen the result must be redrawn:
//!
//! - [`Channel`] / [`ChannelSet`]: named invalidation domains. Property
//!   metadata declares which channels a property affects; the element tree
//!   translates those channels into measure/arrange/redraw invalidation.
//! - [`RedrawRequest`] / [`RedrawReason`]: a single redraw demand, either a
//!   bounded region or a full-surface invalidation with a reason.
//! - [`DirtyRegion`]: accumulated redraw rectangles with a sticky
//!   full-invalidate flag, drained once per frame by the draw backend.
//! - [`InvalidationSink`]: the contract a root surface implements so layout
//!   and property code can report dirty work without knowing the backend.
//!
//! ## Core channels
//!
//! The core reserves the first three channel indices:
//!
//! ```rust
//! use trellis_dirty::{Channel, ChannelSet};
//!
//! assert_eq!(Channel::MEASURE.index(), 0);
//! assert_eq!(Channel::ARRANGE.index(), 1);
//! assert_eq!(Channel::RENDER.index(), 2);
//!
//! // A size-like property affects all three.
//! let affects = Channel::MEASURE.into_set() | Channel::ARRANGE.into_set()
//!     | Channel::RENDER.into_set();
//! assert!(affects.contains(Channel::MEASURE));
//! ```
//!
//! Indices 8 and above are free for embedders (accessibility trees, style
//! recomputation, and so on).
//!
//! ## Accumulating redraw work
//!
//! ```rust
//! use kurbo::Rect;
//! use trellis_dirty::{DirtyRegion, RedrawReason, RedrawRequest};
//!
//! let mut region = DirtyRegion::new();
//! region.push(RedrawRequest::Region(Rect::new(0.0, 0.0, 20.0, 20.0)));
//! region.push(RedrawRequest::Region(Rect::new(10.0, 10.0, 40.0, 40.0)));
//! assert_eq!(region.union_rect(), Some(Rect::new(0.0, 0.0, 40.0, 40.0)));
//!
//! // A full invalidation collapses the rect list.
//! region.push(RedrawRequest::Full(RedrawReason::Structure));
//! assert!(region.is_full());
//! ```
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

mod channel;
mod region;

pub use channel::{Channel, ChannelSet, ChannelSetIter};
pub use region::{DirtyRegion, InvalidationSink, RedrawReason, RedrawRequest};
