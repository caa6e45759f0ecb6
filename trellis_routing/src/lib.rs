// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Trellis Routing: routed-event registry and deterministic dispatch.
//!
//! Events in the Trellis core are not delivered to a single listener; they
//! travel along a computed ancestor path. This crate owns that pipeline:
//!
//! - [`EventRegistry`]: process-wide event descriptors, registered once per
//!   name with a [`RoutingStrategy`] (`Direct`, `Bubble`, or `Tunnel`), plus
//!   class handlers keyed by element kind.
//! - [`EventRouter`]: per-element instance handlers and public subscribers,
//!   pooled route arrays, pointer-capture state, and the [`EventRouter::raise`]
//!   entry point.
//!
//! The crate knows nothing about trees or geometry. Hosts supply a
//! [`ParentSource`] (the visual-parent chain) and a [`KindSource`] (element
//! kind for class-handler lookup), both implemented for plain closures.
//!
//! ## Dispatch order
//!
//! Bubble and tunnel dispatch build the route once (source → root via the
//! parent chain). Tunnel visits root-most first, bubble source first. At
//! every node, in order:
//!
//! 1. **Class handlers** — registered per `(event, kind)`; these always run,
//!    even after the event is handled (bookkeeping).
//! 2. **Instance handlers** — skipped once handled, unless the handler was
//!    added with `handled_too`.
//! 3. **The element hook** — the host-supplied per-node callback (the
//!    `On<Event>` override point); skipped once handled.
//! 4. **Public subscribers** — external listeners; same skip rule as
//!    instance handlers.
//!
//! Handler panics are not caught; they propagate to the `raise` caller.
//!
//! ## Example
//!
//! ```rust
//! use trellis_routing::{EventRegistry, EventRouter, RoutingStrategy};
//!
//! struct Click {
//!     count: u32,
//! }
//!
//! let mut registry = EventRegistry::<u32>::new();
//! let click = registry.register::<Click>("Click", RoutingStrategy::Bubble);
//!
//! let mut router = EventRouter::<u32>::new();
//! router.add_handler(2, click, false, |_ctx, args: &mut Click| {
//!     args.count += 1;
//! });
//! router.add_handler(1, click, false, |_ctx, args: &mut Click| {
//!     args.count += 10;
//! });
//!
//! // A two-node chain: 2's parent is 1.
//! let parents = |key: u32| if key == 2 { Some(1) } else { None };
//! let kinds = |_key: u32| core::any::TypeId::of::<()>();
//!
//! let mut args = Click { count: 0 };
//! let handled = router.raise(&registry, click, 2, &mut args, &parents, &kinds, |_, _| {});
//! assert!(!handled);
//! assert_eq!(args.count, 11); // source first, then its ancestor
//! ```
//!
//! ## Pointer capture
//!
//! A node may take exclusive pointer capture; while captured,
//! [`EventRouter::raise_pointer`] routes to the capturing node regardless of
//! the geometric target. [`EventRouter::capture`] and
//! [`EventRouter::release_capture`] report the node that lost capture so the
//! host can deliver its direct (non-routed) lost-capture notification.
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

mod dispatch;
mod event;
mod route;

pub use dispatch::{EventCtx, EventRouter, HandlerId};
pub use event::{EventId, EventRegistration, EventRegistry, RoutedEvent, RoutingStrategy};
pub use route::{KindSource, ParentSource};
