// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-object sparse property storage.
//!
//! A [`PropertyStore`] holds the values explicitly present on one object:
//! the **Local** layer (programmatic sets) and the **Style** layer (values
//! applied by an external styling system). Everything else — inheritance
//! and registered defaults — is resolved above the store, see
//! [`DependencyObjectExt`](crate::DependencyObjectExt).
//!
//! Entries are kept in a sorted vector with binary-search lookup rather
//! than a hash map: contiguous memory, no bucket overhead, and O(log n)
//! lookup over the handful of properties a typical object sets. The first
//! few local entries are stored inline via `SmallVec`.

use alloc::vec::Vec;
use smallvec::SmallVec;

use crate::id::{Property, PropertyId};
use crate::metadata::PropertyValue;
use crate::value::ErasedValue;

/// Inline capacity for local entries.
///
/// Most elements set fewer than 8 non-default properties, which keeps the
/// common case off the heap.
const INLINE_CAPACITY: usize = 8;

/// Which explicit layer a value lives in.
///
/// Local out-ranks Style during effective-value resolution (with the
/// inherited value of an ancestor slotted between them).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ValueLayer {
    /// Explicitly set by application code.
    Local,
    /// Applied by a styling system.
    Style,
}

/// Per-object sparse storage for explicit property values.
///
/// # Example
///
/// ```rust
/// use trellis_property::{PropertyMetadataBuilder, PropertyRegistry, PropertyStore};
///
/// struct Widget;
///
/// let mut registry = PropertyRegistry::new();
/// let width = registry.register::<Widget, f64>(
///     "Width",
///     PropertyMetadataBuilder::new(0.0).build(),
/// );
///
/// let mut store = PropertyStore::<u32>::new(1);
/// assert!(store.get_local(width).is_none());
///
/// store.set_local(width, 100.0);
/// store.set_style(width, 50.0);
/// assert_eq!(store.get_local(width), Some(&100.0));
/// assert_eq!(store.get_style(width), Some(&50.0));
///
/// store.clear_local(width);
/// assert_eq!(store.get_local(width), None);
/// assert_eq!(store.get_style(width), Some(&50.0));
/// ```
#[derive(Debug)]
pub struct PropertyStore<K> {
    /// Local values, sorted by [`PropertyId`].
    local_entries: SmallVec<[(PropertyId, ErasedValue); INLINE_CAPACITY]>,
    /// Style values, sorted by [`PropertyId`]. Stored out-of-line so
    /// unstyled objects pay minimal per-object overhead.
    style_entries: Vec<(PropertyId, ErasedValue)>,
    owner: K,
}

impl<K: Copy + Eq> PropertyStore<K> {
    /// Creates a new store for the given owner key.
    #[must_use]
    pub fn new(owner: K) -> Self {
        Self {
            local_entries: SmallVec::new(),
            style_entries: Vec::new(),
            owner,
        }
    }

    /// Returns the owner key of this store.
    #[must_use]
    #[inline]
    pub fn owner(&self) -> K {
        self.owner
    }

    /// Returns `true` if no explicit values are present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.local_entries.is_empty() && self.style_entries.is_empty()
    }

    /// Returns the ids of all properties with an explicit value, ascending,
    /// without duplicates.
    pub fn property_ids(&self) -> impl Iterator<Item = PropertyId> + '_ {
        MergedIds {
            local: self.local_entries.as_slice(),
            style: self.style_entries.as_slice(),
            local_i: 0,
            style_i: 0,
        }
    }

    fn entries(&self, layer: ValueLayer) -> &[(PropertyId, ErasedValue)] {
        match layer {
            ValueLayer::Local => &self.local_entries,
            ValueLayer::Style => &self.style_entries,
        }
    }

    fn find(&self, id: PropertyId, layer: ValueLayer) -> Result<usize, usize> {
        self.entries(layer).binary_search_by_key(&id, |(pid, _)| *pid)
    }

    /// Returns the erased value stored at a layer, if any.
    #[must_use]
    pub fn get_raw(&self, id: PropertyId, layer: ValueLayer) -> Option<&ErasedValue> {
        self.find(id, layer).ok().map(|i| &self.entries(layer)[i].1)
    }

    /// Returns the erased value the explicit layers resolve to:
    /// Local, then Style.
    #[must_use]
    pub fn layered_raw(&self, id: PropertyId) -> Option<&ErasedValue> {
        self.get_raw(id, ValueLayer::Local)
            .or_else(|| self.get_raw(id, ValueLayer::Style))
    }

    fn set_raw(&mut self, id: PropertyId, layer: ValueLayer, value: ErasedValue) {
        match self.find(id, layer) {
            Ok(i) => match layer {
                ValueLayer::Local => self.local_entries[i].1 = value,
                ValueLayer::Style => self.style_entries[i].1 = value,
            },
            Err(i) => match layer {
                ValueLayer::Local => self.local_entries.insert(i, (id, value)),
                ValueLayer::Style => self.style_entries.insert(i, (id, value)),
            },
        }
    }

    fn clear_raw(&mut self, id: PropertyId, layer: ValueLayer) -> bool {
        match self.find(id, layer) {
            Ok(i) => {
                match layer {
                    ValueLayer::Local => {
                        self.local_entries.remove(i);
                    }
                    ValueLayer::Style => {
                        self.style_entries.remove(i);
                    }
                }
                true
            }
            Err(_) => false,
        }
    }

    /// Gets the local value, if set.
    #[must_use]
    #[inline]
    pub fn get_local<T: PropertyValue>(&self, property: Property<T>) -> Option<&T> {
        self.get_raw(property.id(), ValueLayer::Local)
            .and_then(ErasedValue::downcast_ref)
    }

    /// Sets the local value.
    pub fn set_local<T: PropertyValue>(&mut self, property: Property<T>, value: T) {
        self.set_raw(property.id(), ValueLayer::Local, ErasedValue::new(value));
    }

    /// Clears the local value. Returns `true` if a value was removed.
    pub fn clear_local<T: PropertyValue>(&mut self, property: Property<T>) -> bool {
        self.clear_raw(property.id(), ValueLayer::Local)
    }

    /// Returns `true` if the property has a local value.
    #[must_use]
    #[inline]
    pub fn has_local<T: PropertyValue>(&self, property: Property<T>) -> bool {
        self.find(property.id(), ValueLayer::Local).is_ok()
    }

    /// Gets the style value, if set.
    #[must_use]
    #[inline]
    pub fn get_style<T: PropertyValue>(&self, property: Property<T>) -> Option<&T> {
        self.get_raw(property.id(), ValueLayer::Style)
            .and_then(ErasedValue::downcast_ref)
    }

    /// Sets the style value.
    pub fn set_style<T: PropertyValue>(&mut self, property: Property<T>, value: T) {
        self.set_raw(property.id(), ValueLayer::Style, ErasedValue::new(value));
    }

    /// Clears the style value. Returns `true` if a value was removed.
    pub fn clear_style<T: PropertyValue>(&mut self, property: Property<T>) -> bool {
        self.clear_raw(property.id(), ValueLayer::Style)
    }

    /// Returns `true` if the property has a style value.
    #[must_use]
    #[inline]
    pub fn has_style<T: PropertyValue>(&self, property: Property<T>) -> bool {
        self.find(property.id(), ValueLayer::Style).is_ok()
    }

    /// Returns `true` if the property has any explicit value.
    #[must_use]
    #[inline]
    pub fn has_value<T: PropertyValue>(&self, property: Property<T>) -> bool {
        self.find(property.id(), ValueLayer::Local).is_ok()
            || self.find(property.id(), ValueLayer::Style).is_ok()
    }

    /// Clears all style values. Returns the number of values removed.
    pub fn clear_all_styles(&mut self) -> usize {
        let len = self.style_entries.len();
        self.style_entries.clear();
        len
    }
}

impl<K: Copy + Eq> Clone for PropertyStore<K> {
    fn clone(&self) -> Self {
        Self {
            local_entries: self.local_entries.clone(),
            style_entries: self.style_entries.clone(),
            owner: self.owner,
        }
    }
}

struct MergedIds<'a> {
    local: &'a [(PropertyId, ErasedValue)],
    style: &'a [(PropertyId, ErasedValue)],
    local_i: usize,
    style_i: usize,
}

impl Iterator for MergedIds<'_> {
    type Item = PropertyId;

    fn next(&mut self) -> Option<Self::Item> {
        let local = self.local.get(self.local_i).map(|(id, _)| *id);
        let style = self.style.get(self.style_i).map(|(id, _)| *id);

        match (local, style) {
            (None, None) => None,
            (Some(id), None) => {
                self.local_i += 1;
                Some(id)
            }
            (None, Some(id)) => {
                self.style_i += 1;
                Some(id)
            }
            (Some(a), Some(b)) => {
                if a < b {
                    self.local_i += 1;
                    Some(a)
                } else if b < a {
                    self.style_i += 1;
                    Some(b)
                } else {
                    self.local_i += 1;
                    self.style_i += 1;
                    Some(a)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::PropertyMetadataBuilder;
    use crate::registry::PropertyRegistry;
    use alloc::vec::Vec;

    struct Widget;

    fn setup() -> (PropertyRegistry, Property<f64>, Property<i32>) {
        let mut registry = PropertyRegistry::new();
        let width =
            registry.register::<Widget, f64>("Width", PropertyMetadataBuilder::new(0.0).build());
        let count =
            registry.register::<Widget, i32>("Count", PropertyMetadataBuilder::new(0).build());
        (registry, width, count)
    }

    #[test]
    fn empty_store() {
        let store = PropertyStore::<u32>::new(7);
        assert!(store.is_empty());
        assert_eq!(store.owner(), 7);
        assert_eq!(store.property_ids().count(), 0);
    }

    #[test]
    fn local_set_get_clear() {
        let (_, width, _) = setup();
        let mut store = PropertyStore::<u32>::new(1);

        store.set_local(width, 100.0);
        assert_eq!(store.get_local(width), Some(&100.0));
        assert!(store.has_local(width));

        assert!(store.clear_local(width));
        assert!(!store.has_local(width));
        assert!(!store.clear_local(width));
    }

    #[test]
    fn style_is_independent_of_local() {
        let (_, width, _) = setup();
        let mut store = PropertyStore::<u32>::new(1);

        store.set_style(width, 50.0);
        store.set_local(width, 100.0);

        assert_eq!(store.get_style(width), Some(&50.0));
        assert_eq!(store.get_local(width), Some(&100.0));

        store.clear_local(width);
        assert!(store.has_value(width));
        assert_eq!(store.layered_raw(width.id()).unwrap().downcast_ref(), Some(&50.0));
    }

    #[test]
    fn layered_raw_prefers_local() {
        let (_, width, _) = setup();
        let mut store = PropertyStore::<u32>::new(1);

        store.set_style(width, 50.0);
        assert_eq!(
            store.layered_raw(width.id()).unwrap().downcast_ref(),
            Some(&50.0)
        );

        store.set_local(width, 100.0);
        assert_eq!(
            store.layered_raw(width.id()).unwrap().downcast_ref(),
            Some(&100.0)
        );
    }

    #[test]
    fn merged_ids_are_sorted_and_deduped() {
        let (_, width, count) = setup();
        let mut store = PropertyStore::<u32>::new(1);

        store.set_local(count, 3);
        store.set_style(width, 50.0);
        store.set_local(width, 100.0);

        let ids: Vec<_> = store.property_ids().collect();
        assert_eq!(ids, [width.id(), count.id()]);
    }

    #[test]
    fn clear_all_styles() {
        let (_, width, count) = setup();
        let mut store = PropertyStore::<u32>::new(1);

        store.set_style(width, 1.0);
        store.set_style(count, 2);
        store.set_local(width, 3.0);

        assert_eq!(store.clear_all_styles(), 2);
        assert!(!store.has_style(width));
        assert!(store.has_local(width));
    }

    #[test]
    fn lookup_stays_correct_over_sparse_inserts() {
        let mut registry = PropertyRegistry::new();
        let props: Vec<Property<i32>> = (0..20)
            .map(|i| {
                registry.register::<Widget, i32>(
                    alloc::boxed::Box::leak(alloc::format!("Prop{i}").into_boxed_str()),
                    PropertyMetadataBuilder::new(0).build(),
                )
            })
            .collect();

        let mut store = PropertyStore::<u32>::new(1);
        for (i, prop) in props.iter().enumerate() {
            if i % 3 == 0 {
                store.set_local(*prop, i32::try_from(i).unwrap());
            }
        }

        for (i, prop) in props.iter().enumerate() {
            if i % 3 == 0 {
                assert_eq!(store.get_local(*prop), Some(&i32::try_from(i).unwrap()));
            } else {
                assert!(store.get_local(*prop).is_none());
            }
        }
    }
}
