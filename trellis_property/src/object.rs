// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Dependency object traits and effective-value resolution.
//!
//! [`DependencyObject`] connects an object to its [`PropertyStore`] and its
//! inheritance parent; [`DependencyObjectExt`] layers the effective-value
//! precedence and the checked mutation pipeline on top. Tree crates supply
//! a [`ParentLookup`] so resolution can walk ancestor stores without this
//! crate knowing anything about tree structure.

use core::any::TypeId;

use trellis_dirty::ChannelSet;

use crate::id::{Property, PropertyId};
use crate::metadata::PropertyValue;
use crate::registry::PropertyRegistry;
use crate::store::{PropertyStore, ValueLayer};
use crate::value::ErasedValue;

/// A lookup mechanism for walking parent chains during inheritance.
///
/// Given an object key, returns its [`PropertyStore`] and its parent key.
/// Implemented for closures of the matching shape.
pub trait ParentLookup<'a, K: Copy + Eq + 'a> {
    /// Looks up the store and parent key for `key`.
    fn lookup(&self, key: K) -> Option<(&'a PropertyStore<K>, Option<K>)>;
}

impl<'a, K, F> ParentLookup<'a, K> for F
where
    K: Copy + Eq + 'a,
    F: Fn(K) -> Option<(&'a PropertyStore<K>, Option<K>)>,
{
    #[inline]
    fn lookup(&self, key: K) -> Option<(&'a PropertyStore<K>, Option<K>)> {
        self(key)
    }
}

/// Result of a checked property set.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[must_use]
pub enum SetOutcome {
    /// The validate callback rejected the value; nothing was mutated.
    Rejected,
    /// The coerced value equals the previous effective value; the local
    /// value was stored but no change was raised.
    Unchanged,
    /// The effective value changed. Carries the channels the caller should
    /// invalidate.
    Changed(ChannelSet),
}

impl SetOutcome {
    /// Returns the affected channels, empty unless the value changed.
    #[must_use]
    pub fn channels(self) -> ChannelSet {
        match self {
            Self::Changed(channels) => channels,
            Self::Rejected | Self::Unchanged => ChannelSet::empty(),
        }
    }
}

/// Walks the parent chain looking for an inherited value.
///
/// Checks Local then Style at each ancestor and returns the first value
/// found, or `None` when no ancestor declares the property.
pub fn walk_inherited<'a, K, T, F>(
    mut current_key: Option<K>,
    property: Property<T>,
    store_lookup: &F,
) -> Option<T>
where
    K: Copy + Eq + 'a,
    T: PropertyValue,
    F: ParentLookup<'a, K> + ?Sized,
{
    while let Some(key) = current_key {
        let (store, next_parent) = store_lookup.lookup(key)?;
        if let Some(value) = store.get_local(property) {
            return Some(value.clone());
        }
        if let Some(value) = store.get_style(property) {
            return Some(value.clone());
        }
        current_key = next_parent;
    }
    None
}

/// Type-erased variant of [`walk_inherited`], used by tree code that
/// re-resolves `inherits` descriptors without knowing their value types.
pub fn walk_inherited_raw<'a, K, F>(
    mut current_key: Option<K>,
    id: PropertyId,
    store_lookup: &F,
) -> Option<ErasedValue>
where
    K: Copy + Eq + 'a,
    F: ParentLookup<'a, K> + ?Sized,
{
    while let Some(key) = current_key {
        let (store, next_parent) = store_lookup.lookup(key)?;
        if let Some(value) = store.layered_raw(id) {
            return Some(value.clone());
        }
        current_key = next_parent;
    }
    None
}

/// Resolves the type-erased effective value of a descriptor for one object.
///
/// Precedence: local > inherited (only for `inherits` descriptors) > style >
/// the default registered for `kind`. Returns `None` if the property is not
/// registered.
pub fn resolve_effective_raw<'a, K, F>(
    store: &PropertyStore<K>,
    parent: Option<K>,
    kind: TypeId,
    id: PropertyId,
    registry: &PropertyRegistry,
    store_lookup: &F,
) -> Option<ErasedValue>
where
    K: Copy + Eq + 'a,
    F: ParentLookup<'a, K> + ?Sized,
{
    if let Some(value) = store.get_raw(id, ValueLayer::Local) {
        return Some(value.clone());
    }
    if registry.inherits(id)
        && let Some(value) = walk_inherited_raw(parent, id, store_lookup)
    {
        return Some(value);
    }
    if let Some(value) = store.get_raw(id, ValueLayer::Style) {
        return Some(value.clone());
    }
    registry.default_raw(id, kind)
}

/// A trait for objects that carry dependency properties.
///
/// # Example
///
/// ```rust
/// use trellis_property::{DependencyObject, PropertyStore};
///
/// struct Element {
///     key: u32,
///     parent: Option<u32>,
///     store: PropertyStore<u32>,
/// }
///
/// impl DependencyObject<u32> for Element {
///     fn property_store(&self) -> &PropertyStore<u32> {
///         &self.store
///     }
///     fn property_store_mut(&mut self) -> &mut PropertyStore<u32> {
///         &mut self.store
///     }
///     fn key(&self) -> u32 {
///         self.key
///     }
///     fn parent_key(&self) -> Option<u32> {
///         self.parent
///     }
/// }
/// ```
pub trait DependencyObject<K: Copy + Eq> {
    /// Returns a reference to the object's property store.
    fn property_store(&self) -> &PropertyStore<K>;

    /// Returns a mutable reference to the object's property store.
    fn property_store_mut(&mut self) -> &mut PropertyStore<K>;

    /// Returns the key identifying this object.
    fn key(&self) -> K;

    /// Returns the inheritance parent's key, if any.
    fn parent_key(&self) -> Option<K>;

    /// Returns the object's kind, used to resolve per-kind metadata
    /// overrides. The default is the unit kind (no overrides apply).
    fn kind(&self) -> TypeId {
        TypeId::of::<()>()
    }
}

/// Effective-value access and the checked mutation pipeline.
pub trait DependencyObjectExt<K: Copy + Eq>: DependencyObject<K> {
    /// Gets the local value only.
    fn get_local_value<'a, T: PropertyValue>(&'a self, property: Property<T>) -> Option<&'a T>
    where
        K: 'a,
    {
        self.property_store().get_local(property)
    }

    /// Gets the effective value with full precedence:
    /// local > inherited > style > default.
    ///
    /// # Panics
    ///
    /// Panics if the property is not registered.
    fn get_value<'a, T, F>(
        &'a self,
        property: Property<T>,
        registry: &PropertyRegistry,
        store_lookup: &F,
    ) -> T
    where
        K: 'a,
        T: PropertyValue,
        F: ParentLookup<'a, K> + ?Sized,
    {
        let Some(metadata) = registry.metadata_for(property, self.kind()) else {
            panic!("Property {:?} is not registered", property.id());
        };
        if let Some(value) = self.property_store().get_local(property) {
            return value.clone();
        }
        if metadata.inherits()
            && let Some(value) = walk_inherited(self.parent_key(), property, store_lookup)
        {
            return value;
        }
        if let Some(value) = self.property_store().get_style(property) {
            return value.clone();
        }
        metadata.default_value().clone()
    }

    /// Sets the local value through the full pipeline.
    ///
    /// 1. `validate` — rejection drops the set with no mutation.
    /// 2. `coerce` — the coerced result is what is stored and compared.
    /// 3. Change detection against the previous *effective* value.
    /// 4. On change: store, invoke `changed`, and return the affected
    ///    channels for the caller to translate into invalidation.
    ///
    /// The caller owns dirty marking:
    ///
    /// ```ignore
    /// match element.set_local_checked(width, 100.0, &registry, &lookup) {
    ///     SetOutcome::Changed(channels) => tree.apply_channels(key, channels),
    ///     _ => {}
    /// }
    /// ```
    ///
    /// # Panics
    ///
    /// Panics if the property is not registered.
    fn set_local_checked<'a, T, F>(
        &mut self,
        property: Property<T>,
        value: T,
        registry: &PropertyRegistry,
        store_lookup: &F,
    ) -> SetOutcome
    where
        K: 'a,
        T: PropertyValue,
        F: ParentLookup<'a, K> + ?Sized,
    {
        let Some(metadata) = registry.metadata_for(property, self.kind()) else {
            panic!("Property {:?} is not registered", property.id());
        };

        if !metadata.validate(&value) {
            return SetOutcome::Rejected;
        }
        let value = metadata.coerce(value);

        let previous = {
            let store = self.property_store();
            if let Some(v) = store.get_local(property) {
                v.clone()
            } else if metadata.inherits()
                && let Some(v) = walk_inherited(self.parent_key(), property, store_lookup)
            {
                v
            } else if let Some(v) = store.get_style(property) {
                v.clone()
            } else {
                metadata.default_value().clone()
            }
        };

        if previous == value {
            self.property_store_mut().set_local(property, value);
            return SetOutcome::Unchanged;
        }

        self.property_store_mut().set_local(property, value.clone());
        metadata.on_changed(&previous, &value);
        SetOutcome::Changed(metadata.affects())
    }

    /// Sets a style-layer value without callbacks.
    ///
    /// Style application is driven by an external styling system, which is
    /// responsible for re-resolution and invalidation of everything it
    /// touches.
    fn set_style<T: PropertyValue>(&mut self, property: Property<T>, value: T) {
        self.property_store_mut().set_style(property, value);
    }

    /// Clears the local value. Returns `true` if a value was removed.
    fn clear_local<T: PropertyValue>(&mut self, property: Property<T>) -> bool {
        self.property_store_mut().clear_local(property)
    }

    /// Returns `true` if the property has a local value.
    fn has_local<T: PropertyValue>(&self, property: Property<T>) -> bool {
        self.property_store().has_local(property)
    }
}

// Blanket implementation for all DependencyObject types.
impl<K: Copy + Eq, T: DependencyObject<K>> DependencyObjectExt<K> for T {}
