// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Event descriptors, the process-wide event registry, and class handlers.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::any::{Any, TypeId, type_name};
use core::fmt;
use core::hash::{Hash, Hasher};
use core::marker::PhantomData;
use hashbrown::HashMap;

use crate::dispatch::EventCtx;

/// How an event travels through the tree.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum RoutingStrategy {
    /// Delivered once, to the source only.
    Direct,
    /// Source first, then each ancestor up the visual-parent chain.
    Bubble,
    /// Root-most ancestor first, ending at the source.
    Tunnel,
}

/// A runtime event identifier.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EventId(u16);

impl EventId {
    /// Creates an event ID from a raw index.
    #[must_use]
    #[inline]
    pub const fn new(index: u16) -> Self {
        Self(index)
    }

    /// Returns the underlying index.
    #[must_use]
    #[inline]
    pub const fn index(self) -> u16 {
        self.0
    }
}

impl fmt::Debug for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("EventId").field(&self.0).finish()
    }
}

/// A type-safe event handle carrying the argument type as a phantom.
pub struct RoutedEvent<A> {
    id: EventId,
    _marker: PhantomData<fn() -> A>,
}

impl<A> RoutedEvent<A> {
    /// Wraps a raw [`EventId`].
    ///
    /// The caller must ensure the id was registered with argument type `A`.
    #[must_use]
    #[inline]
    pub const fn from_id(id: EventId) -> Self {
        Self {
            id,
            _marker: PhantomData,
        }
    }

    /// Returns the underlying event ID.
    #[must_use]
    #[inline]
    pub const fn id(self) -> EventId {
        self.id
    }
}

impl<A> Copy for RoutedEvent<A> {}

impl<A> Clone for RoutedEvent<A> {
    #[inline]
    fn clone(&self) -> Self {
        *self
    }
}

impl<A> PartialEq for RoutedEvent<A> {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<A> Eq for RoutedEvent<A> {}

impl<A> Hash for RoutedEvent<A> {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl<A> fmt::Debug for RoutedEvent<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoutedEvent")
            .field("id", &self.id)
            .field("args", &type_name::<A>())
            .finish()
    }
}

/// An argument-erased handler closure.
///
/// The wrapper downcasts the argument payload back to the concrete type the
/// handler was registered with; a mismatch (impossible through the typed
/// API) is a no-op.
pub(crate) type ErasedHandler<K> = Box<dyn Fn(&mut EventCtx<K>, &mut dyn Any)>;

pub(crate) fn erase_handler<K, A, F>(handler: F) -> ErasedHandler<K>
where
    A: 'static,
    F: Fn(&mut EventCtx<K>, &mut A) + 'static,
{
    Box::new(move |ctx, args| {
        if let Some(args) = args.downcast_mut::<A>() {
            handler(ctx, args);
        }
    })
}

/// A registration entry for one event.
pub struct EventRegistration {
    name: &'static str,
    strategy: RoutingStrategy,
    args_type: TypeId,
}

impl EventRegistration {
    /// Returns the event name.
    #[must_use]
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Returns the routing strategy declared at registration.
    #[must_use]
    #[inline]
    pub fn strategy(&self) -> RoutingStrategy {
        self.strategy
    }

    /// Returns the [`TypeId`] of the argument type.
    #[must_use]
    #[inline]
    pub fn args_type(&self) -> TypeId {
        self.args_type
    }
}

impl fmt::Debug for EventRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventRegistration")
            .field("name", &self.name)
            .field("strategy", &self.strategy)
            .finish_non_exhaustive()
    }
}

/// A registry of routed events and their class handlers.
///
/// Events are registered once per name during startup; duplicate
/// registration is a fatal programmer error. Class handlers attach behavior
/// to every element of a given kind and run before any per-instance
/// handler, even after the event has been marked handled.
///
/// `K` is the host's element key type.
pub struct EventRegistry<K> {
    events: Vec<EventRegistration>,
    by_name: HashMap<&'static str, EventId>,
    class_handlers: HashMap<(EventId, TypeId), Vec<ErasedHandler<K>>>,
}

impl<K> Default for EventRegistry<K> {
    fn default() -> Self {
        Self {
            events: Vec::new(),
            by_name: HashMap::new(),
            class_handlers: HashMap::new(),
        }
    }
}

impl<K> EventRegistry<K> {
    /// Creates a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new event and returns its typed handle.
    ///
    /// # Panics
    ///
    /// Panics if an event with the same name is already registered, or if
    /// more than 65,536 events are registered.
    pub fn register<A: 'static>(
        &mut self,
        name: &'static str,
        strategy: RoutingStrategy,
    ) -> RoutedEvent<A> {
        assert!(
            !self.by_name.contains_key(name),
            "Event '{name}' is already registered"
        );
        assert!(
            self.events.len() < u16::MAX as usize,
            "Too many events registered (max {})",
            u16::MAX
        );

        #[expect(clippy::cast_possible_truncation, reason = "checked above")]
        let id = EventId::new(self.events.len() as u16);

        self.events.push(EventRegistration {
            name,
            strategy,
            args_type: TypeId::of::<A>(),
        });
        self.by_name.insert(name, id);

        RoutedEvent::from_id(id)
    }

    /// Registers a class handler for every element of kind `Kind`.
    ///
    /// Class handlers run before instance handlers at each node of the
    /// route, in registration order, regardless of the handled flag.
    ///
    /// # Panics
    ///
    /// Panics if the event is not registered.
    pub fn register_class_handler<Kind, A, F>(&mut self, event: RoutedEvent<A>, handler: F)
    where
        Kind: 'static,
        A: 'static,
        F: Fn(&mut EventCtx<K>, &mut A) + 'static,
    {
        assert!(
            self.get(event.id()).is_some(),
            "Cannot add a class handler for unregistered event {:?}",
            event.id()
        );
        self.class_handlers
            .entry((event.id(), TypeId::of::<Kind>()))
            .or_default()
            .push(erase_handler(handler));
    }

    /// Returns the class handlers for `(event, kind)`.
    pub(crate) fn class_handlers(&self, event: EventId, kind: TypeId) -> &[ErasedHandler<K>] {
        self.class_handlers
            .get(&(event, kind))
            .map_or(&[], Vec::as_slice)
    }

    /// Returns the number of registered events.
    #[must_use]
    #[inline]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Returns `true` if no events are registered.
    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Looks up an event by name (tooling and diagnostics).
    #[must_use]
    pub fn by_name(&self, name: &str) -> Option<EventId> {
        self.by_name.get(name).copied()
    }

    /// Returns the registration entry for an event.
    #[must_use]
    pub fn get(&self, id: EventId) -> Option<&EventRegistration> {
        self.events.get(id.index() as usize)
    }

    /// Returns the routing strategy of an event.
    ///
    /// # Panics
    ///
    /// Panics if the event is not registered.
    #[must_use]
    pub fn strategy(&self, id: EventId) -> RoutingStrategy {
        match self.events.get(id.index() as usize) {
            Some(registration) => registration.strategy,
            None => panic!("Event {id:?} is not registered"),
        }
    }
}

impl<K> fmt::Debug for EventRegistry<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventRegistry")
            .field("count", &self.events.len())
            .field(
                "events",
                &self.events.iter().map(|e| e.name).collect::<Vec<_>>(),
            )
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Tap;

    #[test]
    fn register_and_lookup() {
        let mut registry = EventRegistry::<u32>::new();
        let tap = registry.register::<Tap>("Tap", RoutingStrategy::Bubble);

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.by_name("Tap"), Some(tap.id()));
        assert_eq!(registry.strategy(tap.id()), RoutingStrategy::Bubble);
        assert_eq!(registry.get(tap.id()).unwrap().args_type(), TypeId::of::<Tap>());
    }

    #[test]
    #[should_panic(expected = "already registered")]
    fn duplicate_name_panics() {
        let mut registry = EventRegistry::<u32>::new();
        registry.register::<Tap>("Tap", RoutingStrategy::Bubble);
        registry.register::<Tap>("Tap", RoutingStrategy::Tunnel);
    }

    #[test]
    #[should_panic(expected = "not registered")]
    fn strategy_of_unknown_event_panics() {
        let registry = EventRegistry::<u32>::new();
        let _ = registry.strategy(EventId::new(3));
    }

    #[test]
    fn class_handlers_keyed_by_kind() {
        struct ButtonKind;
        struct LabelKind;

        let mut registry = EventRegistry::<u32>::new();
        let tap = registry.register::<Tap>("Tap", RoutingStrategy::Bubble);
        registry.register_class_handler::<ButtonKind, Tap, _>(tap, |_, _| {});

        assert_eq!(
            registry
                .class_handlers(tap.id(), TypeId::of::<ButtonKind>())
                .len(),
            1
        );
        assert!(
            registry
                .class_handlers(tap.id(), TypeId::of::<LabelKind>())
                .is_empty()
        );
    }

    #[test]
    fn handle_is_two_bytes() {
        use core::mem::size_of;
        assert_eq!(size_of::<EventId>(), 2);
        assert_eq!(size_of::<RoutedEvent<Tap>>(), 2);
    }
}
