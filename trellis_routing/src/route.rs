// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Route construction and the pooled route arrays.

use alloc::vec::Vec;
use core::any::TypeId;

/// Supplies the visual-parent chain used to build routes.
///
/// Implemented for closures `Fn(K) -> Option<K>`.
pub trait ParentSource<K> {
    /// Returns the visual parent of `key`, or `None` at the root.
    fn parent_of(&self, key: K) -> Option<K>;
}

impl<K, F> ParentSource<K> for F
where
    F: Fn(K) -> Option<K>,
{
    #[inline]
    fn parent_of(&self, key: K) -> Option<K> {
        self(key)
    }
}

/// Supplies element kinds for class-handler lookup.
///
/// Implemented for closures `Fn(K) -> TypeId`. Elements without a distinct
/// kind report `TypeId::of::<()>()`.
pub trait KindSource<K> {
    /// Returns the kind of `key`.
    fn kind_of(&self, key: K) -> TypeId;
}

impl<K, F> KindSource<K> for F
where
    F: Fn(K) -> TypeId,
{
    #[inline]
    fn kind_of(&self, key: K) -> TypeId {
        self(key)
    }
}

/// Fills `route` with the chain `source..=root`, source first.
pub(crate) fn build_route<K: Copy>(
    route: &mut Vec<K>,
    source: K,
    parents: &impl ParentSource<K>,
) {
    route.push(source);
    let mut current = source;
    while let Some(parent) = parents.parent_of(current) {
        route.push(parent);
        current = parent;
    }
}

/// Bound on the number of retained route buffers.
const MAX_POOLED_ROUTES: usize = 8;

/// A bounded pool of route arrays.
///
/// Dispatch acquires a buffer, builds the route into it, and releases it
/// afterwards; in the common case no allocation happens per dispatch.
/// Re-entrant dispatch beyond the pool bound simply allocates.
#[derive(Debug, Default)]
pub(crate) struct RoutePool<K> {
    free: Vec<Vec<K>>,
}

impl<K> RoutePool<K> {
    pub(crate) fn new() -> Self {
        Self { free: Vec::new() }
    }

    pub(crate) fn acquire(&mut self) -> Vec<K> {
        self.free.pop().unwrap_or_default()
    }

    pub(crate) fn release(&mut self, mut route: Vec<K>) {
        if self.free.len() < MAX_POOLED_ROUTES {
            route.clear();
            self.free.push(route);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn route_is_source_first() {
        // 3 -> 2 -> 1 -> root(0)
        let parents = |key: u32| if key > 0 { Some(key - 1) } else { None };

        let mut route = Vec::new();
        build_route(&mut route, 3, &parents);
        assert_eq!(route, vec![3, 2, 1, 0]);
    }

    #[test]
    fn route_of_root_is_singleton() {
        let parents = |_key: u32| None;
        let mut route = Vec::new();
        build_route(&mut route, 9, &parents);
        assert_eq!(route, vec![9]);
    }

    #[test]
    fn pool_reuses_buffers() {
        let mut pool = RoutePool::<u32>::new();
        let mut route = pool.acquire();
        route.push(1);
        let capacity = route.capacity();
        pool.release(route);

        let reused = pool.acquire();
        assert!(reused.is_empty());
        assert_eq!(reused.capacity(), capacity);
    }

    #[test]
    fn pool_is_bounded() {
        let mut pool = RoutePool::<u32>::new();
        for _ in 0..32 {
            pool.release(Vec::with_capacity(4));
        }
        assert!(pool.free.len() <= MAX_POOLED_ROUTES);
    }
}
