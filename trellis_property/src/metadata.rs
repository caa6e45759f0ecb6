// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Property metadata: defaults, inheritance, affected channels, callbacks.

use alloc::boxed::Box;
use trellis_dirty::ChannelSet;

/// Bound required of every property value type.
///
/// Equality is load-bearing: a change notification is only raised when the
/// coerced new value differs from the previous effective value.
pub trait PropertyValue: Clone + PartialEq + 'static {}

impl<T: Clone + PartialEq + 'static> PropertyValue for T {}

/// Callback that accepts or rejects a proposed value before any mutation.
///
/// Returning `false` drops the set silently; the property keeps its
/// previous effective value.
pub type ValidateValueCallback<T> = Box<dyn Fn(&T) -> bool + Send + Sync>;

/// Callback that adjusts a validated value before it is stored.
///
/// Runs after `validate`; the coerced result is what is stored and what
/// change detection compares.
pub type CoerceValueCallback<T> = Box<dyn Fn(T) -> T + Send + Sync>;

/// Callback invoked when a property's effective value changes.
///
/// Receives the previous effective value and the new one.
pub type PropertyChangedCallback<T> = Box<dyn Fn(&T, &T) + Send + Sync>;

/// Metadata for a dependency property.
///
/// Immutable once built. Carries the default value, the `inherits` flag,
/// the invalidation channels a change affects, and the optional
/// validate/coerce/changed callbacks.
///
/// # Example
///
/// ```rust
/// use trellis_dirty::{Channel, ChannelSet};
/// use trellis_property::PropertyMetadataBuilder;
///
/// let metadata = PropertyMetadataBuilder::new(12.0_f64)
///     .inherits(true)
///     .affects(ChannelSet::LAYOUT | Channel::RENDER.into_set())
///     .coerce(|v: f64| v.max(1.0))
///     .build();
///
/// assert_eq!(metadata.default_value(), &12.0);
/// assert!(metadata.inherits());
/// assert_eq!(metadata.coerce(0.25), 1.0);
/// ```
pub struct PropertyMetadata<T: PropertyValue> {
    default_value: T,
    inherits: bool,
    affects: ChannelSet,
    validate: Option<ValidateValueCallback<T>>,
    coerce: Option<CoerceValueCallback<T>>,
    changed: Option<PropertyChangedCallback<T>>,
}

impl<T: PropertyValue> PropertyMetadata<T> {
    /// Creates metadata with the given default and no flags or callbacks.
    #[must_use]
    pub fn new(default_value: T) -> Self {
        Self {
            default_value,
            inherits: false,
            affects: ChannelSet::empty(),
            validate: None,
            coerce: None,
            changed: None,
        }
    }

    /// Returns a reference to the default value.
    #[must_use]
    #[inline]
    pub fn default_value(&self) -> &T {
        &self.default_value
    }

    /// Returns whether this property inherits down the tree.
    #[must_use]
    #[inline]
    pub fn inherits(&self) -> bool {
        self.inherits
    }

    /// Returns the invalidation channels affected by changes.
    #[must_use]
    #[inline]
    pub fn affects(&self) -> ChannelSet {
        self.affects
    }

    /// Runs the validate callback, if any.
    ///
    /// Without a callback every value is valid.
    #[must_use]
    #[inline]
    pub fn validate(&self, value: &T) -> bool {
        self.validate.as_ref().is_none_or(|callback| callback(value))
    }

    /// Runs the coerce callback, if any.
    #[must_use]
    #[inline]
    pub fn coerce(&self, value: T) -> T {
        match &self.coerce {
            Some(callback) => callback(value),
            None => value,
        }
    }

    /// Invokes the changed callback, if any.
    #[inline]
    pub fn on_changed(&self, old_value: &T, new_value: &T) {
        if let Some(callback) = &self.changed {
            callback(old_value, new_value);
        }
    }

    /// Returns whether a changed callback is set.
    #[must_use]
    #[inline]
    pub fn has_changed_callback(&self) -> bool {
        self.changed.is_some()
    }
}

// Manual Debug impl since callbacks aren't Debug.
impl<T: PropertyValue + core::fmt::Debug> core::fmt::Debug for PropertyMetadata<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PropertyMetadata")
            .field("default_value", &self.default_value)
            .field("inherits", &self.inherits)
            .field("affects", &self.affects)
            .field("has_validate", &self.validate.is_some())
            .field("has_coerce", &self.coerce.is_some())
            .field("has_changed", &self.changed.is_some())
            .finish()
    }
}

/// Builder for [`PropertyMetadata`].
pub struct PropertyMetadataBuilder<T: PropertyValue> {
    metadata: PropertyMetadata<T>,
}

impl<T: PropertyValue + core::fmt::Debug> core::fmt::Debug for PropertyMetadataBuilder<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PropertyMetadataBuilder")
            .field("metadata", &self.metadata)
            .finish()
    }
}

impl<T: PropertyValue> PropertyMetadataBuilder<T> {
    /// Creates a new builder with the given default value.
    #[must_use]
    pub fn new(default_value: T) -> Self {
        Self {
            metadata: PropertyMetadata::new(default_value),
        }
    }

    /// Sets whether this property inherits from ancestor objects.
    #[must_use]
    pub fn inherits(mut self, inherits: bool) -> Self {
        self.metadata.inherits = inherits;
        self
    }

    /// Sets the invalidation channels a change to this property affects.
    #[must_use]
    pub fn affects(mut self, channels: ChannelSet) -> Self {
        self.metadata.affects = channels;
        self
    }

    /// Sets a callback that accepts or rejects proposed values.
    ///
    /// Rejected sets are dropped without mutation and without coercion.
    #[must_use]
    pub fn validate<F>(mut self, callback: F) -> Self
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.metadata.validate = Some(Box::new(callback));
        self
    }

    /// Sets a callback that coerces validated values before storage.
    #[must_use]
    pub fn coerce<F>(mut self, callback: F) -> Self
    where
        F: Fn(T) -> T + Send + Sync + 'static,
    {
        self.metadata.coerce = Some(Box::new(callback));
        self
    }

    /// Sets a callback invoked when the effective value changes.
    #[must_use]
    pub fn on_changed<F>(mut self, callback: F) -> Self
    where
        F: Fn(&T, &T) + Send + Sync + 'static,
    {
        self.metadata.changed = Some(Box::new(callback));
        self
    }

    /// Builds the [`PropertyMetadata`].
    #[must_use]
    pub fn build(self) -> PropertyMetadata<T> {
        self.metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::sync::Arc;
    use core::sync::atomic::{AtomicU32, Ordering};
    use trellis_dirty::Channel;

    #[test]
    fn defaults() {
        let metadata = PropertyMetadata::new(42_i32);
        assert_eq!(metadata.default_value(), &42);
        assert!(!metadata.inherits());
        assert!(metadata.affects().is_empty());
        assert!(metadata.validate(&i32::MIN));
        assert_eq!(metadata.coerce(7), 7);
    }

    #[test]
    fn builder_sets_flags_and_channels() {
        let metadata = PropertyMetadataBuilder::new(100.0_f64)
            .inherits(true)
            .affects(ChannelSet::LAYOUT)
            .build();

        assert!(metadata.inherits());
        assert!(metadata.affects().contains(Channel::MEASURE));
        assert!(metadata.affects().contains(Channel::ARRANGE));
        assert!(!metadata.affects().contains(Channel::RENDER));
    }

    #[test]
    fn validate_then_coerce_are_independent() {
        let metadata = PropertyMetadataBuilder::new(0.0_f64)
            .validate(|v: &f64| v.is_finite())
            .coerce(|v: f64| v.clamp(0.0, 100.0))
            .build();

        assert!(!metadata.validate(&f64::NAN));
        assert!(metadata.validate(&-10.0));
        // Coerce is never consulted for validity; it clamps whatever it is given.
        assert_eq!(metadata.coerce(-10.0), 0.0);
        assert_eq!(metadata.coerce(150.0), 100.0);
    }

    #[test]
    fn changed_callback_receives_old_and_new() {
        let sum = Arc::new(AtomicU32::new(0));
        let sum_clone = sum.clone();

        let metadata = PropertyMetadataBuilder::new(0_u32)
            .on_changed(move |old: &u32, new: &u32| {
                sum_clone.store(old + new, Ordering::SeqCst);
            })
            .build();

        assert!(metadata.has_changed_callback());
        metadata.on_changed(&2, &40);
        assert_eq!(sum.load(Ordering::SeqCst), 42);
    }
}
