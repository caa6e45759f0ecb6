// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Process-wide property registry.
//!
//! Descriptors are registered once per `(name, owner type)` during startup
//! and are append-only afterwards. All runtime lookup is by
//! [`PropertyId`] identity.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::any::{Any, TypeId, type_name};
use hashbrown::HashMap;
use trellis_dirty::ChannelSet;

use crate::id::{Property, PropertyId};
use crate::metadata::{PropertyMetadata, PropertyValue};
use crate::value::ErasedValue;

/// A registration entry for one descriptor.
pub struct PropertyRegistration {
    name: &'static str,
    owner: TypeId,
    owner_name: &'static str,
    value_type: TypeId,
    metadata: Box<dyn ErasedMetadata>,
}

impl PropertyRegistration {
    /// Returns the property name.
    #[must_use]
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Returns the [`TypeId`] of the owner type the descriptor was
    /// registered under.
    #[must_use]
    #[inline]
    pub fn owner(&self) -> TypeId {
        self.owner
    }

    /// Returns the owner type name, for diagnostics.
    #[must_use]
    #[inline]
    pub fn owner_name(&self) -> &'static str {
        self.owner_name
    }

    /// Returns the [`TypeId`] of the value type.
    #[must_use]
    #[inline]
    pub fn value_type(&self) -> TypeId {
        self.value_type
    }

    /// Returns whether the descriptor inherits down the tree.
    #[must_use]
    #[inline]
    pub fn inherits(&self) -> bool {
        self.metadata.inherits()
    }

    /// Returns the channels affected by changes (base metadata).
    #[must_use]
    #[inline]
    pub fn affects(&self) -> ChannelSet {
        self.metadata.affects()
    }
}

impl core::fmt::Debug for PropertyRegistration {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PropertyRegistration")
            .field("name", &self.name)
            .field("owner", &self.owner_name)
            .field("inherits", &self.inherits())
            .field("affects", &self.affects())
            .finish_non_exhaustive()
    }
}

/// A registry of dependency property descriptors.
///
/// Identity is `(name, owner type)`: two owner types may each register a
/// property of the same name, and a descriptor registered by one type may be
/// set on objects of any kind (attached properties). Duplicate registration
/// under the same key is a fatal programmer error.
///
/// # Example
///
/// ```rust
/// use trellis_dirty::ChannelSet;
/// use trellis_property::{PropertyMetadataBuilder, PropertyRegistry};
///
/// struct Panel;
/// struct Canvas;
///
/// let mut registry = PropertyRegistry::new();
/// let panel_gap = registry.register::<Panel, f64>(
///     "Gap",
///     PropertyMetadataBuilder::new(0.0).affects(ChannelSet::LAYOUT).build(),
/// );
/// // Same name, different owner: a distinct descriptor.
/// let canvas_gap = registry.register::<Canvas, f64>(
///     "Gap",
///     PropertyMetadataBuilder::new(4.0).build(),
/// );
/// assert_ne!(panel_gap.id(), canvas_gap.id());
/// ```
#[derive(Default)]
pub struct PropertyRegistry {
    properties: Vec<PropertyRegistration>,
    by_key: HashMap<(TypeId, &'static str), PropertyId>,
    overrides: HashMap<(PropertyId, TypeId), Box<dyn ErasedMetadata>>,
}

impl PropertyRegistry {
    /// Creates a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a descriptor under `(name, O)` and returns its typed handle.
    ///
    /// # Panics
    ///
    /// Panics if `(name, O)` is already registered, or if more than
    /// 65,536 descriptors are registered.
    pub fn register<O: 'static, T: PropertyValue>(
        &mut self,
        name: &'static str,
        metadata: PropertyMetadata<T>,
    ) -> Property<T> {
        let owner = TypeId::of::<O>();
        assert!(
            !self.by_key.contains_key(&(owner, name)),
            "Property '{name}' is already registered for owner {}",
            type_name::<O>()
        );
        assert!(
            self.properties.len() < u16::MAX as usize,
            "Too many properties registered (max {})",
            u16::MAX
        );

        #[expect(clippy::cast_possible_truncation, reason = "checked above")]
        let id = PropertyId::new(self.properties.len() as u16);

        self.properties.push(PropertyRegistration {
            name,
            owner,
            owner_name: type_name::<O>(),
            value_type: TypeId::of::<T>(),
            metadata: Box::new(metadata),
        });
        self.by_key.insert((owner, name), id);

        Property::from_id(id)
    }

    /// Overrides a descriptor's metadata for objects of kind `O`.
    ///
    /// The override may change the default value, affected channels, and
    /// callbacks; the `inherits` flag is fixed at registration and is read
    /// from the base metadata regardless of overrides.
    ///
    /// # Panics
    ///
    /// Panics if the property is not registered or an override for `O`
    /// already exists.
    pub fn override_metadata<O: 'static, T: PropertyValue>(
        &mut self,
        property: Property<T>,
        metadata: PropertyMetadata<T>,
    ) {
        let id = property.id();
        let Some(registration) = self.properties.get(id.index() as usize) else {
            panic!("Cannot override metadata for unregistered property {id:?}");
        };
        assert!(
            registration.value_type == TypeId::of::<T>(),
            "Metadata override for '{}' has mismatched value type",
            registration.name
        );
        let key = (id, TypeId::of::<O>());
        assert!(
            !self.overrides.contains_key(&key),
            "Metadata for '{}' is already overridden for kind {}",
            registration.name,
            type_name::<O>()
        );
        self.overrides.insert(key, Box::new(metadata));
    }

    /// Returns the number of registered descriptors.
    #[must_use]
    #[inline]
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    /// Returns `true` if no descriptors are registered.
    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Looks up a descriptor id by `(owner, name)`.
    ///
    /// This exists for tooling and diagnostics; runtime code holds typed
    /// handles and never resolves by name.
    #[must_use]
    pub fn lookup(&self, owner: TypeId, name: &'static str) -> Option<PropertyId> {
        self.by_key.get(&(owner, name)).copied()
    }

    /// Returns the name of a descriptor.
    #[must_use]
    pub fn name(&self, id: PropertyId) -> Option<&'static str> {
        self.properties.get(id.index() as usize).map(|r| r.name)
    }

    /// Returns the registration entry for a descriptor.
    #[must_use]
    pub fn get(&self, id: PropertyId) -> Option<&PropertyRegistration> {
        self.properties.get(id.index() as usize)
    }

    /// Returns whether a descriptor inherits down the tree.
    #[must_use]
    pub fn inherits(&self, id: PropertyId) -> bool {
        self.properties
            .get(id.index() as usize)
            .is_some_and(PropertyRegistration::inherits)
    }

    /// Returns the base metadata for a typed property.
    ///
    /// Returns `None` if the property is not registered or the value type
    /// doesn't match.
    #[must_use]
    pub fn metadata<T: PropertyValue>(&self, property: Property<T>) -> Option<&PropertyMetadata<T>> {
        self.properties
            .get(property.id().index() as usize)
            .and_then(|r| r.metadata.downcast_ref())
    }

    /// Returns the effective metadata for a typed property as seen by an
    /// object of the given kind: the kind's override if one exists, the base
    /// registration otherwise.
    #[must_use]
    pub fn metadata_for<T: PropertyValue>(
        &self,
        property: Property<T>,
        kind: TypeId,
    ) -> Option<&PropertyMetadata<T>> {
        if let Some(overridden) = self.overrides.get(&(property.id(), kind))
            && let Some(metadata) = overridden.downcast_ref()
        {
            return Some(metadata);
        }
        self.metadata(property)
    }

    /// Returns the erased default value for a descriptor as seen by `kind`.
    #[must_use]
    pub fn default_raw(&self, id: PropertyId, kind: TypeId) -> Option<ErasedValue> {
        if let Some(overridden) = self.overrides.get(&(id, kind)) {
            return Some(overridden.default_raw());
        }
        self.properties
            .get(id.index() as usize)
            .map(|r| r.metadata.default_raw())
    }

    /// Returns the erased affected channels for a descriptor as seen by `kind`.
    #[must_use]
    pub fn affects_for(&self, id: PropertyId, kind: TypeId) -> ChannelSet {
        if let Some(overridden) = self.overrides.get(&(id, kind)) {
            return overridden.affects();
        }
        self.properties
            .get(id.index() as usize)
            .map(|r| r.affects())
            .unwrap_or_default()
    }

    /// Invokes the changed callback for a descriptor with erased values.
    ///
    /// Used by tree code re-resolving `inherits` descriptors across a
    /// subtree without knowing their concrete types. Values whose type does
    /// not match the descriptor are ignored.
    pub fn changed_raw(&self, id: PropertyId, kind: TypeId, old: &ErasedValue, new: &ErasedValue) {
        if let Some(overridden) = self.overrides.get(&(id, kind)) {
            overridden.changed_raw(old, new);
            return;
        }
        if let Some(registration) = self.properties.get(id.index() as usize) {
            registration.metadata.changed_raw(old, new);
        }
    }

    /// Returns an iterator over the ids of all `inherits`-flagged descriptors.
    pub fn inherited_ids(&self) -> impl Iterator<Item = PropertyId> + '_ {
        self.iter()
            .filter(|(_, r)| r.inherits())
            .map(|(id, _)| id)
    }

    /// Returns an iterator over all registered descriptors.
    pub fn iter(&self) -> impl Iterator<Item = (PropertyId, &PropertyRegistration)> {
        self.properties.iter().enumerate().map(|(i, r)| {
            #[expect(clippy::cast_possible_truncation, reason = "index < len < u16::MAX")]
            (PropertyId::new(i as u16), r)
        })
    }
}

impl core::fmt::Debug for PropertyRegistry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PropertyRegistry")
            .field("count", &self.properties.len())
            .field(
                "properties",
                &self.properties.iter().map(|r| r.name).collect::<Vec<_>>(),
            )
            .finish_non_exhaustive()
    }
}

/// Type-erased metadata facade for heterogeneous storage.
trait ErasedMetadata: Any {
    fn as_any(&self) -> &dyn Any;
    fn affects(&self) -> ChannelSet;
    fn inherits(&self) -> bool;
    fn default_raw(&self) -> ErasedValue;
    fn changed_raw(&self, old: &ErasedValue, new: &ErasedValue);
}

impl<T: PropertyValue> ErasedMetadata for PropertyMetadata<T> {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn affects(&self) -> ChannelSet {
        Self::affects(self)
    }

    fn inherits(&self) -> bool {
        Self::inherits(self)
    }

    fn default_raw(&self) -> ErasedValue {
        ErasedValue::new(self.default_value().clone())
    }

    fn changed_raw(&self, old: &ErasedValue, new: &ErasedValue) {
        if let Some(old) = old.downcast_ref::<T>()
            && let Some(new) = new.downcast_ref::<T>()
        {
            self.on_changed(old, new);
        }
    }
}

impl dyn ErasedMetadata {
    fn downcast_ref<T: PropertyValue>(&self) -> Option<&PropertyMetadata<T>> {
        self.as_any().downcast_ref()
    }
}
