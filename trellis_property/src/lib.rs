// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Trellis Property: typed, inheritable dependency properties.
//!
//! Every observable attribute in the Trellis core is backed by this crate:
//! a process-wide registry of immutable property descriptors, a per-object
//! sparse value store, and a mutation pipeline that validates, coerces,
//! detects real changes, and reports which invalidation channels a change
//! affects.
//!
//! ## Core concepts
//!
//! - [`PropertyRegistry`]: descriptors registered once per `(name, owner
//!   type)` during startup; duplicate registration is a fatal programmer
//!   error. Descriptors are looked up by [`PropertyId`] identity at runtime,
//!   never by name.
//! - [`PropertyMetadata`]: default value, `inherits` flag, affected
//!   [`ChannelSet`](trellis_dirty::ChannelSet), and the optional
//!   `validate` / `coerce` / `changed` callbacks.
//! - [`PropertyStore`]: per-object sparse storage with **Local** and
//!   **Style** layers.
//! - [`DependencyObjectExt::set_local_checked`]: the blessed mutation path.
//!   `validate` rejects the raw value outright; `coerce` runs after; the
//!   coerced result is what is stored and what change detection compares
//!   against the previous *effective* value.
//!
//! ## Effective value precedence
//!
//! `local > inherited-from-nearest-ancestor > style > default`, where the
//! inherited step applies only to descriptors registered with
//! `inherits(true)` and only while the object has a parent.
//!
//! ## Quick start
//!
//! ```rust
//! use trellis_dirty::Channel;
//! use trellis_property::{
//!     DependencyObject, DependencyObjectExt, PropertyMetadataBuilder,
//!     PropertyRegistry, PropertyStore, SetOutcome,
//! };
//!
//! struct Slider;
//!
//! let mut registry = PropertyRegistry::new();
//! let value = registry.register::<Slider, f64>(
//!     "Value",
//!     PropertyMetadataBuilder::new(0.0)
//!         .affects(Channel::RENDER.into_set())
//!         .validate(|v: &f64| v.is_finite())
//!         .coerce(|v: f64| v.clamp(0.0, 100.0))
//!         .build(),
//! );
//!
//! struct Thumb {
//!     key: u32,
//!     store: PropertyStore<u32>,
//! }
//!
//! impl DependencyObject<u32> for Thumb {
//!     fn property_store(&self) -> &PropertyStore<u32> {
//!         &self.store
//!     }
//!     fn property_store_mut(&mut self) -> &mut PropertyStore<u32> {
//!         &mut self.store
//!     }
//!     fn key(&self) -> u32 {
//!         self.key
//!     }
//!     fn parent_key(&self) -> Option<u32> {
//!         None
//!     }
//! }
//!
//! let mut thumb = Thumb { key: 1, store: PropertyStore::new(1) };
//!
//! // Out-of-range values are clamped by `coerce`.
//! let outcome = thumb.set_local_checked(value, 250.0, &registry, &|_key: u32| None);
//! assert!(matches!(outcome, SetOutcome::Changed(_)));
//! assert_eq!(thumb.get_value(value, &registry, &|_key: u32| None), 100.0);
//!
//! // Setting the already-clamped value again raises no change.
//! let outcome = thumb.set_local_checked(value, 250.0, &registry, &|_key: u32| None);
//! assert_eq!(outcome, SetOutcome::Unchanged);
//!
//! // Non-finite values are rejected outright; the store keeps its value.
//! let outcome = thumb.set_local_checked(value, f64::NAN, &registry, &|_key: u32| None);
//! assert_eq!(outcome, SetOutcome::Rejected);
//! assert_eq!(thumb.get_value(value, &registry, &|_key: u32| None), 100.0);
//! ```
//!
//! ## Attached properties
//!
//! A descriptor's owner type does not have to match the object it is set
//! on; a container can annotate its children by registering under its own
//! owner type and setting the value on any object. Storage and lookup are
//! by descriptor identity throughout.
//!
//! ## `no_std` support
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

mod id;
mod metadata;
mod object;
mod registry;
mod store;
mod value;

pub use id::{Property, PropertyId};
pub use metadata::{
    CoerceValueCallback, PropertyChangedCallback, PropertyMetadata, PropertyMetadataBuilder,
    PropertyValue, ValidateValueCallback,
};
pub use object::{
    DependencyObject, DependencyObjectExt, ParentLookup, SetOutcome, resolve_effective_raw,
    walk_inherited, walk_inherited_raw,
};
pub use registry::{PropertyRegistration, PropertyRegistry};
pub use store::{PropertyStore, ValueLayer};
pub use value::ErasedValue;
