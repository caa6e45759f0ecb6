// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The event router: per-element handlers, dispatch, and pointer capture.

use alloc::vec::Vec;
use core::fmt;
use core::hash::Hash;
use core::marker::PhantomData;
use hashbrown::HashMap;

use crate::event::{ErasedHandler, EventId, EventRegistry, RoutedEvent, RoutingStrategy, erase_handler};
use crate::route::{KindSource, ParentSource, RoutePool, build_route};

/// Identifies one added handler so it can be removed later.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

/// Per-dispatch state visible to every handler along the route.
pub struct EventCtx<K> {
    event: EventId,
    source: K,
    current: K,
    handled: bool,
}

impl<K: Copy> EventCtx<K> {
    fn new(event: EventId, source: K) -> Self {
        Self {
            event,
            source,
            current: source,
            handled: false,
        }
    }

    /// Returns the event being dispatched.
    #[must_use]
    #[inline]
    pub fn event(&self) -> EventId {
        self.event
    }

    /// Returns the original source of the dispatch.
    #[must_use]
    #[inline]
    pub fn source(&self) -> K {
        self.source
    }

    /// Returns the node currently being visited.
    #[must_use]
    #[inline]
    pub fn current(&self) -> K {
        self.current
    }

    /// Returns whether the event has been marked handled.
    #[must_use]
    #[inline]
    pub fn is_handled(&self) -> bool {
        self.handled
    }

    /// Marks the event handled. Later nodes still receive class handlers,
    /// but skip instance handlers, hooks, and subscribers that did not opt
    /// in with `handled_too`.
    #[inline]
    pub fn mark_handled(&mut self) {
        self.handled = true;
    }

    /// Sets the handled flag explicitly.
    #[inline]
    pub fn set_handled(&mut self, handled: bool) {
        self.handled = handled;
    }
}

impl<K: Copy + fmt::Debug> fmt::Debug for EventCtx<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventCtx")
            .field("event", &self.event)
            .field("source", &self.source)
            .field("current", &self.current)
            .field("handled", &self.handled)
            .finish()
    }
}

struct HandlerEntry<K> {
    id: HandlerId,
    handled_too: bool,
    handler: ErasedHandler<K>,
}

/// Routed-event dispatch state for one tree of elements.
///
/// Owns per-element instance handlers and public subscribers, the pooled
/// route arrays, and the pointer-capture slot. See the crate docs for the
/// dispatch order.
///
/// The router is single-threaded by construction (`!Send + !Sync`); all
/// dispatch happens on the UI thread that owns the tree.
pub struct EventRouter<K> {
    instance: HashMap<(K, EventId), Vec<HandlerEntry<K>>>,
    subscribers: HashMap<(K, EventId), Vec<HandlerEntry<K>>>,
    pool: RoutePool<K>,
    capture: Option<K>,
    next_handler: u64,
    _single_thread: PhantomData<*const ()>,
}

impl<K> Default for EventRouter<K> {
    fn default() -> Self {
        Self {
            instance: HashMap::new(),
            subscribers: HashMap::new(),
            pool: RoutePool::new(),
            capture: None,
            next_handler: 0,
            _single_thread: PhantomData,
        }
    }
}

impl<K: Copy + Eq + Hash> EventRouter<K> {
    /// Creates a new router.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn next_handler_id(&mut self) -> HandlerId {
        let id = HandlerId(self.next_handler);
        self.next_handler += 1;
        id
    }

    /// Adds an instance handler on `node` for `event`.
    ///
    /// With `handled_too` the handler keeps running after the event has
    /// been marked handled.
    pub fn add_handler<A, F>(
        &mut self,
        node: K,
        event: RoutedEvent<A>,
        handled_too: bool,
        handler: F,
    ) -> HandlerId
    where
        A: 'static,
        F: Fn(&mut EventCtx<K>, &mut A) + 'static,
    {
        let id = self.next_handler_id();
        self.instance
            .entry((node, event.id()))
            .or_default()
            .push(HandlerEntry {
                id,
                handled_too,
                handler: erase_handler(handler),
            });
        id
    }

    /// Subscribes an external listener on `node` for `event`.
    ///
    /// Subscribers run after the element hook and honor the same
    /// `handled_too` opt-in as instance handlers.
    pub fn subscribe<A, F>(
        &mut self,
        node: K,
        event: RoutedEvent<A>,
        handled_too: bool,
        handler: F,
    ) -> HandlerId
    where
        A: 'static,
        F: Fn(&mut EventCtx<K>, &mut A) + 'static,
    {
        let id = self.next_handler_id();
        self.subscribers
            .entry((node, event.id()))
            .or_default()
            .push(HandlerEntry {
                id,
                handled_too,
                handler: erase_handler(handler),
            });
        id
    }

    /// Removes a previously added handler or subscriber.
    ///
    /// Returns `true` if the handler was found.
    pub fn remove_handler<A>(&mut self, node: K, event: RoutedEvent<A>, id: HandlerId) -> bool {
        for table in [&mut self.instance, &mut self.subscribers] {
            if let Some(entries) = table.get_mut(&(node, event.id()))
                && let Some(index) = entries.iter().position(|e| e.id == id)
            {
                entries.remove(index);
                return true;
            }
        }
        false
    }

    /// Drops every handler and subscriber registered on `node`.
    ///
    /// Called when an element is removed from its tree; also releases
    /// pointer capture if `node` held it (the caller is responsible for the
    /// lost-capture notification, see [`EventRouter::release_capture`]).
    pub fn remove_all_for(&mut self, node: K) {
        self.instance.retain(|(key, _), _| *key != node);
        self.subscribers.retain(|(key, _), _| *key != node);
        if self.capture == Some(node) {
            self.capture = None;
        }
    }

    /// Raises `event` from `source` and runs the full dispatch pipeline.
    ///
    /// `hook` is invoked once per visited node (after class and instance
    /// handlers, before subscribers) and models the element's overridable
    /// `On<Event>` method. Returns whether the event ended handled.
    ///
    /// # Panics
    ///
    /// Panics if the event is not registered. Panics from handlers
    /// propagate untouched.
    pub fn raise<A: 'static>(
        &mut self,
        registry: &EventRegistry<K>,
        event: RoutedEvent<A>,
        source: K,
        args: &mut A,
        parents: &impl ParentSource<K>,
        kinds: &impl KindSource<K>,
        mut hook: impl FnMut(&mut EventCtx<K>, &mut A),
    ) -> bool {
        let strategy = registry.strategy(event.id());
        let mut ctx = EventCtx::new(event.id(), source);

        match strategy {
            RoutingStrategy::Direct => {
                self.deliver_at(registry, &mut ctx, source, args, kinds, &mut hook);
            }
            RoutingStrategy::Bubble => {
                let mut route = self.pool.acquire();
                build_route(&mut route, source, parents);
                for &node in &route {
                    self.deliver_at(registry, &mut ctx, node, args, kinds, &mut hook);
                }
                self.pool.release(route);
            }
            RoutingStrategy::Tunnel => {
                let mut route = self.pool.acquire();
                build_route(&mut route, source, parents);
                for &node in route.iter().rev() {
                    self.deliver_at(registry, &mut ctx, node, args, kinds, &mut hook);
                }
                self.pool.release(route);
            }
        }

        ctx.is_handled()
    }

    /// Raises a pointer event, honoring capture.
    ///
    /// While a node holds capture, the dispatch source is the capturing node
    /// regardless of `hit_target`.
    pub fn raise_pointer<A: 'static>(
        &mut self,
        registry: &EventRegistry<K>,
        event: RoutedEvent<A>,
        hit_target: K,
        args: &mut A,
        parents: &impl ParentSource<K>,
        kinds: &impl KindSource<K>,
        hook: impl FnMut(&mut EventCtx<K>, &mut A),
    ) -> bool {
        let source = self.capture.unwrap_or(hit_target);
        self.raise(registry, event, source, args, parents, kinds, hook)
    }

    fn deliver_at<A: 'static>(
        &self,
        registry: &EventRegistry<K>,
        ctx: &mut EventCtx<K>,
        node: K,
        args: &mut A,
        kinds: &impl KindSource<K>,
        hook: &mut impl FnMut(&mut EventCtx<K>, &mut A),
    ) {
        ctx.current = node;

        // Class handlers run unconditionally, even once handled.
        let kind = kinds.kind_of(node);
        for handler in registry.class_handlers(ctx.event, kind) {
            handler(ctx, args);
        }

        if let Some(entries) = self.instance.get(&(node, ctx.event)) {
            for entry in entries {
                if !ctx.handled || entry.handled_too {
                    (entry.handler)(ctx, args);
                }
            }
        }

        if !ctx.handled {
            hook(ctx, args);
        }

        if let Some(entries) = self.subscribers.get(&(node, ctx.event)) {
            for entry in entries {
                if !ctx.handled || entry.handled_too {
                    (entry.handler)(ctx, args);
                }
            }
        }
    }

    /// Takes exclusive pointer capture for `node`.
    ///
    /// Returns the previous holder when capture moves between nodes, so the
    /// host can raise its direct lost-capture notification.
    pub fn capture(&mut self, node: K) -> Option<K> {
        let previous = self.capture.filter(|&held| held != node);
        self.capture = Some(node);
        previous
    }

    /// Releases pointer capture.
    ///
    /// Returns the node that lost capture, if any; the host raises the
    /// direct lost-capture notification for it.
    pub fn release_capture(&mut self) -> Option<K> {
        self.capture.take()
    }

    /// Returns the current capture holder.
    #[must_use]
    pub fn captured(&self) -> Option<K> {
        self.capture
    }
}

impl<K: Copy + Eq + Hash + fmt::Debug> fmt::Debug for EventRouter<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventRouter")
            .field("instance_tables", &self.instance.len())
            .field("subscriber_tables", &self.subscribers.len())
            .field("capture", &self.capture)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::rc::Rc;
    use alloc::string::String;
    use alloc::vec;
    use alloc::vec::Vec;
    use core::any::TypeId;
    use core::cell::RefCell;

    struct Press;

    // Chain: 3 (source) -> 2 -> 1 (root).
    fn chain_parents(key: u32) -> Option<u32> {
        if key > 1 { Some(key - 1) } else { None }
    }

    fn unit_kinds(_key: u32) -> TypeId {
        TypeId::of::<()>()
    }

    fn trace_handler(
        log: &Rc<RefCell<Vec<String>>>,
        label: &'static str,
    ) -> impl Fn(&mut EventCtx<u32>, &mut Press) + 'static {
        let log = log.clone();
        move |ctx, _| {
            log.borrow_mut()
                .push(alloc::format!("{label}:{}", ctx.current()));
        }
    }

    #[test]
    fn bubble_visits_source_then_ancestors() {
        let mut registry = EventRegistry::<u32>::new();
        let press = registry.register::<Press>("Press", RoutingStrategy::Bubble);

        let log = Rc::new(RefCell::new(Vec::new()));
        let mut router = EventRouter::<u32>::new();
        for node in 1..=3 {
            router.add_handler(node, press, false, trace_handler(&log, "i"));
        }

        let handled = router.raise(
            &registry,
            press,
            3,
            &mut Press,
            &chain_parents,
            &unit_kinds,
            |_, _| {},
        );

        assert!(!handled);
        assert_eq!(*log.borrow(), vec!["i:3", "i:2", "i:1"]);
    }

    #[test]
    fn tunnel_visits_root_first() {
        let mut registry = EventRegistry::<u32>::new();
        let press = registry.register::<Press>("PreviewPress", RoutingStrategy::Tunnel);

        let log = Rc::new(RefCell::new(Vec::new()));
        let mut router = EventRouter::<u32>::new();
        for node in 1..=3 {
            router.add_handler(node, press, false, trace_handler(&log, "i"));
        }

        router.raise(
            &registry,
            press,
            3,
            &mut Press,
            &chain_parents,
            &unit_kinds,
            |_, _| {},
        );

        assert_eq!(*log.borrow(), vec!["i:1", "i:2", "i:3"]);
    }

    #[test]
    fn direct_delivers_to_source_only() {
        let mut registry = EventRegistry::<u32>::new();
        let press = registry.register::<Press>("Press", RoutingStrategy::Direct);

        let log = Rc::new(RefCell::new(Vec::new()));
        let mut router = EventRouter::<u32>::new();
        for node in 1..=3 {
            router.add_handler(node, press, false, trace_handler(&log, "i"));
        }

        router.raise(
            &registry,
            press,
            3,
            &mut Press,
            &chain_parents,
            &unit_kinds,
            |_, _| {},
        );

        assert_eq!(*log.borrow(), vec!["i:3"]);
    }

    #[test]
    fn handled_suppresses_later_instance_handlers_and_hook_but_not_class() {
        let mut registry = EventRegistry::<u32>::new();
        let press = registry.register::<Press>("Press", RoutingStrategy::Bubble);

        let log = Rc::new(RefCell::new(Vec::new()));
        {
            let log = log.clone();
            registry.register_class_handler::<(), Press, _>(press, move |ctx, _| {
                log.borrow_mut()
                    .push(alloc::format!("c:{}", ctx.current()));
            });
        }

        let mut router = EventRouter::<u32>::new();
        for node in 1..=3 {
            router.add_handler(node, press, false, trace_handler(&log, "i"));
        }
        // The handler at node 2 marks the event handled.
        {
            let log = log.clone();
            router.add_handler(2, press, false, move |ctx, _: &mut Press| {
                log.borrow_mut().push(String::from("i2:handled"));
                ctx.mark_handled();
            });
        }
        // An opted-in handler at node 1 still runs.
        router.add_handler(1, press, true, trace_handler(&log, "opt"));

        let hook_log = log.clone();
        let handled = router.raise(
            &registry,
            press,
            3,
            &mut Press,
            &chain_parents,
            &unit_kinds,
            move |ctx, _| {
                hook_log
                    .borrow_mut()
                    .push(alloc::format!("h:{}", ctx.current()));
            },
        );

        assert!(handled);
        assert_eq!(
            *log.borrow(),
            vec![
                "c:3",
                "i:3",
                "h:3",
                "c:2",
                "i:2",
                "i2:handled",
                // Node 2's hook is suppressed by its own handler.
                "c:1",
                // Node 1's plain instance handler and hook are suppressed;
                // the opted-in handler still runs.
                "opt:1",
            ]
        );
    }

    #[test]
    fn subscribers_run_after_hook() {
        let mut registry = EventRegistry::<u32>::new();
        let press = registry.register::<Press>("Press", RoutingStrategy::Direct);

        let log = Rc::new(RefCell::new(Vec::new()));
        let mut router = EventRouter::<u32>::new();
        router.add_handler(1, press, false, trace_handler(&log, "i"));
        router.subscribe(1, press, false, trace_handler(&log, "s"));

        let hook_log = log.clone();
        router.raise(
            &registry,
            press,
            1,
            &mut Press,
            &|_: u32| None,
            &unit_kinds,
            move |ctx, _| {
                hook_log
                    .borrow_mut()
                    .push(alloc::format!("h:{}", ctx.current()));
            },
        );

        assert_eq!(*log.borrow(), vec!["i:1", "h:1", "s:1"]);
    }

    #[test]
    fn remove_handler_stops_invocation() {
        let mut registry = EventRegistry::<u32>::new();
        let press = registry.register::<Press>("Press", RoutingStrategy::Direct);

        let log = Rc::new(RefCell::new(Vec::new()));
        let mut router = EventRouter::<u32>::new();
        let id = router.add_handler(1, press, false, trace_handler(&log, "i"));

        assert!(router.remove_handler(1, press, id));
        assert!(!router.remove_handler(1, press, id));

        router.raise(
            &registry,
            press,
            1,
            &mut Press,
            &|_: u32| None,
            &unit_kinds,
            |_, _| {},
        );
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn capture_redirects_pointer_events() {
        let mut registry = EventRegistry::<u32>::new();
        let press = registry.register::<Press>("Press", RoutingStrategy::Bubble);

        let log = Rc::new(RefCell::new(Vec::new()));
        let mut router = EventRouter::<u32>::new();
        for node in 1..=3 {
            router.add_handler(node, press, false, trace_handler(&log, "i"));
        }

        assert_eq!(router.capture(2), None);
        assert_eq!(router.captured(), Some(2));

        // The hit target is 3, but capture routes from 2.
        router.raise_pointer(
            &registry,
            press,
            3,
            &mut Press,
            &chain_parents,
            &unit_kinds,
            |_, _| {},
        );
        assert_eq!(*log.borrow(), vec!["i:2", "i:1"]);

        // Capturing elsewhere reports the loser; releasing reports the holder.
        assert_eq!(router.capture(3), Some(2));
        assert_eq!(router.release_capture(), Some(3));
        assert_eq!(router.captured(), None);
    }

    #[test]
    fn remove_all_for_drops_handlers_and_capture() {
        let mut registry = EventRegistry::<u32>::new();
        let press = registry.register::<Press>("Press", RoutingStrategy::Direct);

        let log = Rc::new(RefCell::new(Vec::new()));
        let mut router = EventRouter::<u32>::new();
        router.add_handler(1, press, false, trace_handler(&log, "i"));
        router.subscribe(1, press, false, trace_handler(&log, "s"));
        router.capture(1);

        router.remove_all_for(1);
        assert_eq!(router.captured(), None);

        router.raise(
            &registry,
            press,
            1,
            &mut Press,
            &|_: u32| None,
            &unit_kinds,
            |_, _| {},
        );
        assert!(log.borrow().is_empty());
    }
}
