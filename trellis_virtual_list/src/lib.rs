// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Trellis Virtual List: viewport virtualization for large item lists.
//!
//! A list with tens of thousands of rows cannot afford to realize, measure,
//! and arrange every row each frame. This crate virtualizes along one axis
//! on top of the measure/arrange contract of
//! [`trellis_element`]: only the items inside a computed window around the
//! viewport exist as live elements; everything else is estimated.
//!
//! ## Pieces
//!
//! - [`ExtentCache`]: per-index measured extents, seeded from a running
//!   average over all measured items, with a lazily rebuilt prefix-sum
//!   array of start offsets that is binary-searched to map scroll offsets
//!   to indices.
//! - [`compute_window`] / [`WindowRange`] / [`CachePadding`]: resolves
//!   `[offset - cache, offset + viewport + cache]` to the inclusive index
//!   range to realize; degenerate viewports fall back to realizing
//!   everything.
//! - [`ViewportSource`]: the scroll-owner contract — viewport extent and
//!   offset in, content-extent notifications back out.
//! - [`VirtualizingColumn`] / [`ItemSource`]: the vertical container
//!   behavior that realizes exactly the window through an item source,
//!   feeds measured sizes back into the cache, and arranges realized rows
//!   at their prefix-sum offsets.
//!
//! ## Window math
//!
//! ```rust
//! use trellis_virtual_list::{CachePadding, ExtentCache, compute_window};
//!
//! // 10,000 rows of 24px inside a 480px viewport, scrolled to 2400px.
//! let mut cache = ExtentCache::new(24.0);
//! cache.set_len(10_000);
//!
//! let window =
//!     compute_window(&mut cache, 2400.0, 480.0, CachePadding::Pixels(0.0)).unwrap();
//! assert_eq!((window.first, window.last), (100, 119));
//!
//! // Realizing only that slice reports the same total extent as
//! // realizing all 10,000 rows would.
//! assert_eq!(cache.total_extent(), 240_000.0);
//! ```
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

mod container;
mod extent;
mod window;

pub use container::{ItemSource, VirtualizingColumn};
pub use extent::ExtentCache;
pub use window::{CachePadding, ViewportSource, WindowRange, compute_window};
