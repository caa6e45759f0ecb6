// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The element tree: a generational arena of visual/logical nodes with the
//! property pipeline wired to invalidation.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::any::TypeId;
use core::marker::PhantomData;
use hashbrown::HashSet;
use kurbo::{Affine, Rect, Size};
use trellis_dirty::{Channel, ChannelSet, InvalidationSink, RedrawReason, RedrawRequest};
use trellis_property::{
    ErasedValue, Property, PropertyId, PropertyRegistry, PropertyStore, PropertyValue, SetOutcome,
    ValueLayer,
};

use crate::behavior::Behavior;
use crate::props::CoreProps;
use crate::surface::Surface;
use crate::types::{ElementId, LayoutFlags};

pub(crate) struct ElementData {
    pub(crate) visual_parent: Option<ElementId>,
    pub(crate) logical_parent: Option<ElementId>,
    pub(crate) children: Vec<ElementId>,
    pub(crate) logical_children: Vec<ElementId>,
    pub(crate) z_index: i32,
    pub(crate) transform: Affine,
    pub(crate) clip: Option<Rect>,
    pub(crate) store: PropertyStore<ElementId>,
    pub(crate) behavior: Option<Box<dyn Behavior>>,
    pub(crate) kind: TypeId,
    pub(crate) flags: LayoutFlags,
    pub(crate) last_constraint: Option<Size>,
    pub(crate) last_arrange: Option<Rect>,
    pub(crate) desired_size: Size,
    pub(crate) render_size: Size,
    pub(crate) slot: Rect,
}

impl ElementData {
    fn new(key: ElementId, behavior: Option<Box<dyn Behavior>>, kind: TypeId) -> Self {
        Self {
            visual_parent: None,
            logical_parent: None,
            children: Vec::new(),
            logical_children: Vec::new(),
            z_index: 0,
            transform: Affine::IDENTITY,
            clip: None,
            store: PropertyStore::new(key),
            behavior,
            kind,
            flags: LayoutFlags::empty(),
            last_constraint: None,
            last_arrange: None,
            desired_size: Size::ZERO,
            render_size: Size::ZERO,
            slot: Rect::ZERO,
        }
    }

    /// Parent used for invalidation climbing: visual, else logical.
    pub(crate) fn climb_parent(&self) -> Option<ElementId> {
        self.visual_parent.or(self.logical_parent)
    }

    /// Parent used for property inheritance: logical, else visual.
    pub(crate) fn inheritance_parent(&self) -> Option<ElementId> {
        self.logical_parent.or(self.visual_parent)
    }
}

struct Slot {
    generation: u32,
    element: Option<ElementData>,
}

/// A tree of elements with typed properties, layout state, and an owning
/// surface.
///
/// The tree owns every element exclusively; parent pointers are non-owning
/// back-references used only for upward traversal. All mutation happens on
/// the single UI thread that owns the tree — the type is `!Send + !Sync`,
/// so cross-thread access is rejected at compile time.
///
/// # Example
///
/// ```rust
/// use trellis_element::{CoreProps, ElementTree, Visibility};
/// use trellis_property::{PropertyRegistry, SetOutcome};
///
/// let mut registry = PropertyRegistry::new();
/// let props = CoreProps::register(&mut registry);
/// let mut tree = ElementTree::new(registry, props);
///
/// let root = tree.insert();
/// let child = tree.insert();
/// tree.add_child(root, child);
/// tree.set_root(root);
///
/// let outcome = tree.set_property(child, props.width, 120.0);
/// assert!(matches!(outcome, SetOutcome::Changed(_)));
/// assert_eq!(tree.get_property(child, props.visibility), Visibility::Visible);
/// ```
pub struct ElementTree {
    registry: PropertyRegistry,
    props: CoreProps,
    slots: Vec<Slot>,
    free: Vec<u32>,
    root: Option<ElementId>,
    surface: Surface,
    _single_thread: PhantomData<*const ()>,
}

impl ElementTree {
    /// Creates an empty tree over a fully registered property table.
    ///
    /// The registry is append-only from here on; register descriptors
    /// (including attached properties) before constructing trees.
    #[must_use]
    pub fn new(registry: PropertyRegistry, props: CoreProps) -> Self {
        Self {
            registry,
            props,
            slots: Vec::new(),
            free: Vec::new(),
            root: None,
            surface: Surface::new(Size::ZERO),
            _single_thread: PhantomData,
        }
    }

    /// Returns the property registry.
    #[must_use]
    pub fn registry(&self) -> &PropertyRegistry {
        &self.registry
    }

    /// Returns the core property handles.
    #[must_use]
    pub fn props(&self) -> CoreProps {
        self.props
    }

    // =========================================================================
    // Slot management
    // =========================================================================

    fn slot_data(slots: &[Slot], id: ElementId) -> &ElementData {
        match slots.get(id.idx()) {
            Some(slot) if slot.generation == id.1 => match &slot.element {
                Some(data) => data,
                None => panic!("Use of removed {id:?}"),
            },
            _ => panic!("Use of stale {id:?}"),
        }
    }

    fn slot_data_mut(slots: &mut [Slot], id: ElementId) -> &mut ElementData {
        match slots.get_mut(id.idx()) {
            Some(slot) if slot.generation == id.1 => match &mut slot.element {
                Some(data) => data,
                None => panic!("Use of removed {id:?}"),
            },
            _ => panic!("Use of stale {id:?}"),
        }
    }

    pub(crate) fn data(&self, id: ElementId) -> &ElementData {
        Self::slot_data(&self.slots, id)
    }

    pub(crate) fn data_mut(&mut self, id: ElementId) -> &mut ElementData {
        Self::slot_data_mut(&mut self.slots, id)
    }

    fn try_data(&self, id: ElementId) -> Option<&ElementData> {
        self.slots
            .get(id.idx())
            .filter(|slot| slot.generation == id.1)
            .and_then(|slot| slot.element.as_ref())
    }

    /// Returns `true` if `id` refers to a live element.
    #[must_use]
    pub fn is_alive(&self, id: ElementId) -> bool {
        self.try_data(id).is_some()
    }

    /// Creates a new detached element with no behavior.
    pub fn insert(&mut self) -> ElementId {
        self.insert_inner(None, TypeId::of::<()>())
    }

    /// Creates a new detached element carrying `behavior`.
    ///
    /// The element's kind (used for class handlers and per-kind metadata
    /// overrides) is the behavior's type.
    pub fn insert_with_behavior<B: Behavior>(&mut self, behavior: B) -> ElementId {
        self.insert_inner(Some(Box::new(behavior)), TypeId::of::<B>())
    }

    fn insert_inner(&mut self, behavior: Option<Box<dyn Behavior>>, kind: TypeId) -> ElementId {
        let (index, generation) = match self.free.pop() {
            Some(index) => (index, self.slots[index as usize].generation),
            None => {
                assert!(
                    self.slots.len() < u32::MAX as usize,
                    "Element slot index overflow"
                );
                self.slots.push(Slot {
                    generation: 1,
                    element: None,
                });
                #[expect(clippy::cast_possible_truncation, reason = "checked above")]
                let index = (self.slots.len() - 1) as u32;
                (index, 1)
            }
        };
        let id = ElementId::new(index, generation);
        self.slots[index as usize].element = Some(ElementData::new(id, behavior, kind));
        id
    }

    /// Returns the element's kind.
    #[must_use]
    pub fn kind(&self, node: ElementId) -> TypeId {
        self.data(node).kind
    }

    /// Downcasts the element's behavior to a concrete type.
    ///
    /// Returns `None` if the element has no behavior, carries a different
    /// type, or is mid-layout (the behavior is taken out for the duration
    /// of its own measure/arrange call).
    #[must_use]
    pub fn behavior<B: Behavior>(&self, node: ElementId) -> Option<&B> {
        let behavior = self.data(node).behavior.as_deref()?;
        (behavior as &dyn core::any::Any).downcast_ref::<B>()
    }

    /// Mutable variant of [`ElementTree::behavior`].
    ///
    /// The caller is responsible for invalidating whatever the mutation
    /// affects, typically via [`ElementTree::invalidate_measure`].
    pub fn behavior_mut<B: Behavior>(&mut self, node: ElementId) -> Option<&mut B> {
        let behavior = self.data_mut(node).behavior.as_deref_mut()?;
        (behavior as &mut dyn core::any::Any).downcast_mut::<B>()
    }

    // =========================================================================
    // Structure
    // =========================================================================

    /// Returns the root element, if one is set.
    #[must_use]
    pub fn root(&self) -> Option<ElementId> {
        self.root
    }

    /// Makes `node` the root of this tree.
    ///
    /// The subtree becomes loaded and a full layout pass is scheduled.
    ///
    /// # Panics
    ///
    /// Panics if `node` is stale or has a visual parent.
    pub fn set_root(&mut self, node: ElementId) {
        assert!(
            self.data(node).visual_parent.is_none(),
            "Root element must not have a visual parent"
        );
        self.root = Some(node);
        self.propagate_loaded(node, true);
        self.surface.mark_layout_dirty();
        self.surface
            .mark_visual_dirty(RedrawRequest::Full(RedrawReason::Structure));
    }

    /// Returns the visual parent of `node`.
    #[must_use]
    pub fn visual_parent(&self, node: ElementId) -> Option<ElementId> {
        self.data(node).visual_parent
    }

    /// Returns the logical parent of `node`.
    #[must_use]
    pub fn logical_parent(&self, node: ElementId) -> Option<ElementId> {
        self.data(node).logical_parent
    }

    /// Returns the visual children of `node`, in document order.
    #[must_use]
    pub fn children(&self, node: ElementId) -> &[ElementId] {
        &self.data(node).children
    }

    /// Returns `true` if `ancestor` is `node` or one of its visual ancestors.
    #[must_use]
    pub fn is_ancestor_or_self(&self, ancestor: ElementId, node: ElementId) -> bool {
        let mut current = Some(node);
        while let Some(key) = current {
            if key == ancestor {
                return true;
            }
            current = self.data(key).visual_parent;
        }
        false
    }

    pub(crate) fn is_rooted(&self, node: ElementId) -> bool {
        match self.root {
            Some(root) => self.is_ancestor_or_self(root, node),
            None => false,
        }
    }

    /// Appends `child` to `parent`'s visual children.
    ///
    /// Re-resolves every `inherits` descriptor across the child subtree and
    /// raises change notifications for values that differ under the new
    /// parentage.
    ///
    /// # Panics
    ///
    /// Panics if either id is stale, `child` already has a visual parent,
    /// or the attachment would create a cycle.
    pub fn add_child(&mut self, parent: ElementId, child: ElementId) {
        assert!(
            self.data(child).visual_parent.is_none(),
            "{child:?} already has a visual parent"
        );
        assert!(
            !self.is_ancestor_or_self(child, parent),
            "Attaching {child:?} under {parent:?} would create a cycle"
        );

        let snapshot = self.inherited_snapshot(child);

        self.data_mut(parent).children.push(child);
        self.data_mut(child).visual_parent = Some(parent);

        if self.data(parent).flags.contains(LayoutFlags::LOADED) {
            self.propagate_loaded(child, true);
        }
        self.invalidate_measure(parent);
        self.cascade_inherited(&snapshot);
    }

    /// Detaches `child` from `parent`, keeping the subtree alive.
    ///
    /// Severs both the visual and logical parent pointers, unloads the
    /// subtree, and re-resolves inherited values under the severed
    /// parentage.
    ///
    /// # Panics
    ///
    /// Panics if either id is stale or `child` is not a visual child of
    /// `parent`.
    pub fn remove_child(&mut self, parent: ElementId, child: ElementId) {
        assert!(
            self.data(child).visual_parent == Some(parent),
            "{child:?} is not a visual child of {parent:?}"
        );

        // The region the child occupied must be repainted.
        if let Some(bounds) = self.root_bounds(child) {
            self.surface.mark_visual_dirty(RedrawRequest::Region(bounds));
        }

        let snapshot = self.inherited_snapshot(child);

        let position = self
            .data(parent)
            .children
            .iter()
            .position(|&c| c == child);
        if let Some(position) = position {
            self.data_mut(parent).children.remove(position);
        }
        self.data_mut(child).visual_parent = None;
        self.sever_logical_parent(child);

        self.propagate_loaded(child, false);
        self.invalidate_measure(parent);
        self.cascade_inherited(&snapshot);
    }

    /// Sets (or clears) the logical parent of `node`.
    ///
    /// The logical parent wins over the visual parent for property
    /// inheritance; a template-generated element can this way inherit from
    /// its logical owner rather than its visual container.
    ///
    /// # Panics
    ///
    /// Panics if an id is stale or the link would create an inheritance
    /// cycle.
    pub fn set_logical_parent(&mut self, node: ElementId, parent: Option<ElementId>) {
        if self.data(node).logical_parent == parent {
            return;
        }
        if let Some(parent) = parent {
            assert!(
                !self.inheritance_chain_contains(parent, node),
                "Logical link from {node:?} to {parent:?} would create a cycle"
            );
        }

        let snapshot = self.inherited_snapshot(node);

        self.sever_logical_parent(node);
        if let Some(parent) = parent {
            self.data_mut(parent).logical_children.push(node);
            self.data_mut(node).logical_parent = Some(parent);
        }

        self.cascade_inherited(&snapshot);
    }

    fn sever_logical_parent(&mut self, node: ElementId) {
        if let Some(old) = self.data(node).logical_parent {
            let position = self
                .data(old)
                .logical_children
                .iter()
                .position(|&c| c == node);
            if let Some(position) = position {
                self.data_mut(old).logical_children.remove(position);
            }
            self.data_mut(node).logical_parent = None;
        }
    }

    fn inheritance_chain_contains(&self, start: ElementId, needle: ElementId) -> bool {
        let mut current = Some(start);
        while let Some(key) = current {
            if key == needle {
                return true;
            }
            current = self.data(key).inheritance_parent();
        }
        false
    }

    /// Removes `node` and its entire visual subtree.
    ///
    /// Detaches from the visual parent first, severs logical links into and
    /// out of the subtree, then frees every slot. Returns the removed ids so
    /// the host can drop event handlers registered against them.
    ///
    /// # Panics
    ///
    /// Panics if `node` is stale.
    pub fn remove(&mut self, node: ElementId) -> Vec<ElementId> {
        if let Some(parent) = self.data(node).visual_parent {
            self.remove_child(parent, node);
        } else {
            self.sever_logical_parent(node);
            self.propagate_loaded(node, false);
        }

        let mut removed = Vec::new();
        let mut visited = HashSet::new();
        self.collect_visual_subtree(node, &mut removed, &mut visited);

        // Logical children pointing into the doomed subtree from outside
        // lose their inherited source.
        let doomed: HashSet<ElementId> = removed.iter().copied().collect();
        let mut external = Vec::new();
        for &id in &removed {
            for &logical_child in &self.data(id).logical_children {
                if !doomed.contains(&logical_child) {
                    external.push(logical_child);
                }
            }
        }
        for logical_child in external {
            self.set_logical_parent(logical_child, None);
        }

        for &id in &removed {
            if self.root == Some(id) {
                self.root = None;
            }
            let slot = &mut self.slots[id.idx()];
            slot.element = None;
            slot.generation = slot.generation.wrapping_add(1);
            self.free.push(id.0);
        }

        removed
    }

    fn collect_visual_subtree(
        &self,
        node: ElementId,
        out: &mut Vec<ElementId>,
        visited: &mut HashSet<ElementId>,
    ) {
        if !visited.insert(node) {
            return;
        }
        out.push(node);
        for &child in &self.data(node).children {
            self.collect_visual_subtree(child, out, visited);
        }
    }

    fn propagate_loaded(&mut self, node: ElementId, loaded: bool) {
        let data = self.data_mut(node);
        if loaded {
            data.flags.insert(LayoutFlags::LOADED);
        } else {
            data.flags.remove(LayoutFlags::LOADED);
        }
        let children = data.children.clone();
        for child in children {
            self.propagate_loaded(child, loaded);
        }
    }

    /// Returns `true` once `node` is attached under the tree root.
    #[must_use]
    pub fn is_loaded(&self, node: ElementId) -> bool {
        self.data(node).flags.contains(LayoutFlags::LOADED)
    }

    // =========================================================================
    // Geometry adjuncts
    // =========================================================================

    /// Returns the z-order of `node` within its parent.
    #[must_use]
    pub fn z_index(&self, node: ElementId) -> i32 {
        self.data(node).z_index
    }

    /// Sets the z-order of `node` within its parent.
    pub fn set_z_index(&mut self, node: ElementId, z_index: i32) {
        if self.data(node).z_index != z_index {
            self.data_mut(node).z_index = z_index;
            self.invalidate_visual(node);
        }
    }

    /// Returns the local render transform of `node`.
    #[must_use]
    pub fn transform(&self, node: ElementId) -> Affine {
        self.data(node).transform
    }

    /// Sets the local render transform, applied around the element's own
    /// origin before slot placement. Affects hit testing and redraw-region
    /// math but not layout.
    pub fn set_transform(&mut self, node: ElementId, transform: Affine) {
        self.invalidate_visual(node);
        self.data_mut(node).transform = transform;
        self.invalidate_visual(node);
    }

    /// Returns the local clip rect of `node`.
    #[must_use]
    pub fn clip(&self, node: ElementId) -> Option<Rect> {
        self.data(node).clip
    }

    /// Sets (or clears) the local clip rect, in element-local coordinates.
    pub fn set_clip(&mut self, node: ElementId, clip: Option<Rect>) {
        self.invalidate_visual(node);
        self.data_mut(node).clip = clip;
        self.invalidate_visual(node);
    }

    /// Returns the visual children of `node` in paint order: ascending
    /// z-index, document order within equal z.
    #[must_use]
    pub fn children_in_paint_order(&self, node: ElementId) -> Vec<ElementId> {
        let mut order = self.data(node).children.clone();
        order.sort_by_key(|&child| self.data(child).z_index);
        order
    }

    // =========================================================================
    // Layout state accessors
    // =========================================================================

    /// Returns the desired size cached by the last measure pass.
    #[must_use]
    pub fn desired_size(&self, node: ElementId) -> Size {
        self.data(node).desired_size
    }

    /// Returns the render size reported by the last arrange pass.
    #[must_use]
    pub fn render_size(&self, node: ElementId) -> Size {
        self.data(node).render_size
    }

    /// Returns the layout slot published by the last arrange pass, in
    /// parent coordinates.
    #[must_use]
    pub fn slot(&self, node: ElementId) -> Rect {
        self.data(node).slot
    }

    /// Returns `true` while the cached desired size is valid.
    #[must_use]
    pub fn is_measure_valid(&self, node: ElementId) -> bool {
        self.data(node).flags.contains(LayoutFlags::MEASURE_VALID)
    }

    /// Returns `true` while the published slot is valid.
    #[must_use]
    pub fn is_arrange_valid(&self, node: ElementId) -> bool {
        self.data(node).flags.contains(LayoutFlags::ARRANGE_VALID)
    }

    // =========================================================================
    // Property pipeline
    // =========================================================================

    /// Returns the element's property store (read-only).
    #[must_use]
    pub fn store(&self, node: ElementId) -> &PropertyStore<ElementId> {
        &self.data(node).store
    }

    fn inherited_value<T: PropertyValue>(
        &self,
        start: Option<ElementId>,
        property: Property<T>,
    ) -> Option<T> {
        let mut current = start;
        while let Some(key) = current {
            let data = self.data(key);
            if let Some(value) = data.store.get_local(property) {
                return Some(value.clone());
            }
            if let Some(value) = data.store.get_style(property) {
                return Some(value.clone());
            }
            current = data.inheritance_parent();
        }
        None
    }

    /// Gets the effective value of `property` on `node`:
    /// local > inherited > style > default.
    ///
    /// # Panics
    ///
    /// Panics if `node` is stale or the property is not registered.
    #[must_use]
    pub fn get_property<T: PropertyValue>(&self, node: ElementId, property: Property<T>) -> T {
        let data = self.data(node);
        let Some(metadata) = self.registry.metadata_for(property, data.kind) else {
            panic!("Property {:?} is not registered", property.id());
        };
        if let Some(value) = data.store.get_local(property) {
            return value.clone();
        }
        if metadata.inherits()
            && let Some(value) = self.inherited_value(data.inheritance_parent(), property)
        {
            return value;
        }
        if let Some(value) = data.store.get_style(property) {
            return value.clone();
        }
        metadata.default_value().clone()
    }

    /// Sets a local value through the full pipeline: validate, coerce,
    /// change detection against the previous effective value, `changed`
    /// callback, and invalidation of the affected channels.
    ///
    /// # Panics
    ///
    /// Panics if `node` is stale or the property is not registered.
    pub fn set_property<T: PropertyValue>(
        &mut self,
        node: ElementId,
        property: Property<T>,
        value: T,
    ) -> SetOutcome {
        let kind = Self::slot_data(&self.slots, node).kind;
        let Some(metadata) = self.registry.metadata_for(property, kind) else {
            panic!("Property {:?} is not registered", property.id());
        };

        if !metadata.validate(&value) {
            return SetOutcome::Rejected;
        }
        let value = metadata.coerce(value);

        let previous = {
            let data = Self::slot_data(&self.slots, node);
            if let Some(v) = data.store.get_local(property) {
                v.clone()
            } else if metadata.inherits()
                && let Some(v) = self.inherited_value(data.inheritance_parent(), property)
            {
                v
            } else if let Some(v) = data.store.get_style(property) {
                v.clone()
            } else {
                metadata.default_value().clone()
            }
        };

        if previous == value {
            Self::slot_data_mut(&mut self.slots, node)
                .store
                .set_local(property, value);
            return SetOutcome::Unchanged;
        }

        Self::slot_data_mut(&mut self.slots, node)
            .store
            .set_local(property, value.clone());
        metadata.on_changed(&previous, &value);
        let channels = metadata.affects();

        self.notify_behavior_changed(node, property.id());
        self.apply_channels(node, channels);
        SetOutcome::Changed(channels)
    }

    /// Invokes the element's [`PropertyAware`](crate::PropertyAware) hook.
    ///
    /// Skipped while the behavior is taken out (mid-layout, or a property
    /// set from inside the hook itself).
    fn notify_behavior_changed(&mut self, node: ElementId, id: PropertyId) {
        let Some(mut behavior) = self.data_mut(node).behavior.take() else {
            return;
        };
        behavior.property_changed(self, node, id);
        self.data_mut(node).behavior = Some(behavior);
    }

    /// Clears a local value, raising change/invalidation if the effective
    /// value moves. Returns `true` if a local value was removed.
    ///
    /// # Panics
    ///
    /// Panics if `node` is stale or the property is not registered.
    pub fn clear_property<T: PropertyValue>(
        &mut self,
        node: ElementId,
        property: Property<T>,
    ) -> bool {
        let kind = Self::slot_data(&self.slots, node).kind;
        let Some(metadata) = self.registry.metadata_for(property, kind) else {
            panic!("Property {:?} is not registered", property.id());
        };

        let previous = self.get_property(node, property);
        let removed = Self::slot_data_mut(&mut self.slots, node)
            .store
            .clear_local(property);
        if !removed {
            return false;
        }

        let current = self.get_property(node, property);
        if current != previous {
            metadata.on_changed(&previous, &current);
            let channels = metadata.affects();
            self.notify_behavior_changed(node, property.id());
            self.apply_channels(node, channels);
        }
        true
    }

    /// Maps affected channels onto invalidation: measure, arrange, redraw.
    pub fn apply_channels(&mut self, node: ElementId, channels: ChannelSet) {
        if channels.contains(Channel::MEASURE) {
            self.invalidate_measure(node);
        }
        if channels.contains(Channel::ARRANGE) {
            self.invalidate_arrange(node);
        }
        if channels.contains(Channel::RENDER) {
            self.invalidate_visual(node);
        }
    }

    // =========================================================================
    // Inheritance cascade
    // =========================================================================

    fn resolve_raw(&self, node: ElementId, id: PropertyId) -> Option<ErasedValue> {
        let data = self.data(node);
        if let Some(value) = data.store.get_raw(id, ValueLayer::Local) {
            return Some(value.clone());
        }
        if self.registry.inherits(id) {
            let mut current = data.inheritance_parent();
            while let Some(key) = current {
                let ancestor = self.data(key);
                if let Some(value) = ancestor.store.layered_raw(id) {
                    return Some(value.clone());
                }
                current = ancestor.inheritance_parent();
            }
        }
        if let Some(value) = data.store.get_raw(id, ValueLayer::Style) {
            return Some(value.clone());
        }
        self.registry.default_raw(id, data.kind)
    }

    fn collect_inheritance_subtree(
        &self,
        node: ElementId,
        out: &mut Vec<ElementId>,
        visited: &mut HashSet<ElementId>,
    ) {
        if !visited.insert(node) {
            return;
        }
        out.push(node);
        let data = self.data(node);
        for &child in data.children.iter().chain(data.logical_children.iter()) {
            self.collect_inheritance_subtree(child, out, visited);
        }
    }

    /// Resolves every `inherits` descriptor for `node` and its descendants,
    /// before a parentage change.
    fn inherited_snapshot(
        &self,
        node: ElementId,
    ) -> Vec<(ElementId, PropertyId, Option<ErasedValue>)> {
        let inherited: Vec<PropertyId> = self.registry.inherited_ids().collect();
        if inherited.is_empty() {
            return Vec::new();
        }

        let mut nodes = Vec::new();
        self.collect_inheritance_subtree(node, &mut nodes, &mut HashSet::new());

        let mut snapshot = Vec::with_capacity(nodes.len() * inherited.len());
        for &key in &nodes {
            for &id in &inherited {
                snapshot.push((key, id, self.resolve_raw(key, id)));
            }
        }
        snapshot
    }

    /// Re-resolves the snapshot under the new parentage and fires `changed`
    /// plus channel invalidation for every difference.
    fn cascade_inherited(&mut self, snapshot: &[(ElementId, PropertyId, Option<ErasedValue>)]) {
        let mut diffs = Vec::new();
        for (key, id, old) in snapshot {
            let new = self.resolve_raw(*key, *id);
            if new != *old {
                diffs.push((*key, *id, old.clone(), new));
            }
        }

        for (key, id, old, new) in diffs {
            let kind = self.data(key).kind;
            if let (Some(old), Some(new)) = (&old, &new) {
                self.registry.changed_raw(id, kind, old, new);
            }
            let channels = self.registry.affects_for(id, kind);
            self.notify_behavior_changed(key, id);
            self.apply_channels(key, channels);
        }
    }

    // =========================================================================
    // Surface access
    // =========================================================================

    /// Returns the owning surface.
    #[must_use]
    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    pub(crate) fn surface_mut(&mut self) -> &mut Surface {
        &mut self.surface
    }

    /// Resizes the surface, scheduling a full layout pass and redraw.
    pub fn set_surface_size(&mut self, size: Size) {
        if self.surface.size() == size {
            return;
        }
        self.surface.set_size(size);
        if let Some(root) = self.root {
            self.invalidate_measure(root);
        }
        self.surface
            .mark_visual_dirty(RedrawRequest::Full(RedrawReason::Structure));
    }

    /// Drains the accumulated redraw region for the draw backend.
    pub fn take_dirty_region(&mut self) -> trellis_dirty::DirtyRegion {
        self.surface.take_region()
    }

    /// Drains the layout-dirty flag for the frame loop.
    pub fn take_layout_dirty(&mut self) -> bool {
        self.surface.take_layout_dirty()
    }
}

impl core::fmt::Debug for ElementTree {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ElementTree")
            .field("elements", &(self.slots.len() - self.free.len()))
            .field("root", &self.root)
            .field("surface", &self.surface)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::sync::Arc;
    use alloc::vec;
    use core::sync::atomic::{AtomicU32, AtomicU64, Ordering};
    use trellis_property::PropertyMetadataBuilder;

    fn new_tree() -> (ElementTree, CoreProps) {
        let mut registry = PropertyRegistry::new();
        let props = CoreProps::register(&mut registry);
        (ElementTree::new(registry, props), props)
    }

    #[test]
    fn insert_starts_detached_and_dirty() {
        let (mut tree, _) = new_tree();
        let node = tree.insert();

        assert!(tree.is_alive(node));
        assert!(tree.visual_parent(node).is_none());
        assert!(!tree.is_measure_valid(node));
        assert!(!tree.is_arrange_valid(node));
        assert!(!tree.is_loaded(node));
    }

    #[test]
    fn removed_ids_go_stale_and_slots_are_reused() {
        let (mut tree, _) = new_tree();
        let node = tree.insert();
        let removed = tree.remove(node);
        assert_eq!(removed, vec![node]);
        assert!(!tree.is_alive(node));

        let reused = tree.insert();
        assert_eq!(reused.idx(), node.idx());
        assert_ne!(reused, node);
        assert!(tree.is_alive(reused));
        assert!(!tree.is_alive(node));
    }

    #[test]
    #[should_panic(expected = "Use of removed")]
    fn stale_id_panics_in_accessors() {
        let (mut tree, props) = new_tree();
        let node = tree.insert();
        tree.remove(node);
        let _ = tree.get_property(node, props.width);
    }

    #[test]
    fn add_child_loads_subtree_under_root() {
        let (mut tree, _) = new_tree();
        let root = tree.insert();
        let child = tree.insert();
        let grandchild = tree.insert();
        tree.add_child(child, grandchild);
        tree.set_root(root);
        assert!(tree.is_loaded(root));
        assert!(!tree.is_loaded(child));

        tree.add_child(root, child);
        assert!(tree.is_loaded(child));
        assert!(tree.is_loaded(grandchild));

        tree.remove_child(root, child);
        assert!(!tree.is_loaded(child));
        assert!(!tree.is_loaded(grandchild));
    }

    #[test]
    #[should_panic(expected = "would create a cycle")]
    fn attaching_an_ancestor_panics() {
        let (mut tree, _) = new_tree();
        let a = tree.insert();
        let b = tree.insert();
        tree.add_child(a, b);
        tree.add_child(b, a);
    }

    #[test]
    fn remove_detaches_and_returns_subtree() {
        let (mut tree, _) = new_tree();
        let root = tree.insert();
        let child = tree.insert();
        let grandchild = tree.insert();
        tree.add_child(root, child);
        tree.add_child(child, grandchild);
        tree.set_root(root);

        let removed = tree.remove(child);
        assert_eq!(removed.len(), 2);
        assert!(removed.contains(&child));
        assert!(removed.contains(&grandchild));
        assert!(tree.children(root).is_empty());
        assert!(!tree.is_alive(grandchild));
    }

    #[test]
    fn set_property_runs_validate_coerce_and_invalidation() {
        let (mut tree, props) = new_tree();
        let root = tree.insert();
        tree.set_root(root);
        tree.measure(root, Size::new(100.0, 100.0));
        assert!(tree.is_measure_valid(root));

        // Rejected: no mutation, no invalidation.
        let outcome = tree.set_property(root, props.width, -5.0);
        assert_eq!(outcome, SetOutcome::Rejected);
        assert!(tree.is_measure_valid(root));

        // Changed: measure invalidated.
        let outcome = tree.set_property(root, props.width, 50.0);
        assert!(matches!(outcome, SetOutcome::Changed(_)));
        assert!(!tree.is_measure_valid(root));
    }

    #[test]
    fn coerced_second_set_raises_no_change() {
        let mut registry = PropertyRegistry::new();
        let props = CoreProps::register(&mut registry);
        let hits = Arc::new(AtomicU32::new(0));
        let hits_clone = hits.clone();
        struct SliderKind;
        let value = registry.register::<SliderKind, f64>(
            "Value",
            PropertyMetadataBuilder::new(0.0)
                .coerce(|v: f64| v.clamp(0.0, 10.0))
                .on_changed(move |_: &f64, _: &f64| {
                    hits_clone.fetch_add(1, Ordering::SeqCst);
                })
                .build(),
        );
        let mut tree = ElementTree::new(registry, props);
        let node = tree.insert();

        assert!(matches!(
            tree.set_property(node, value, 42.0),
            SetOutcome::Changed(_)
        ));
        assert_eq!(tree.get_property(node, value), 10.0);
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        // Already clamped: stored but silent.
        assert_eq!(tree.set_property(node, value, 10.0), SetOutcome::Unchanged);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn attached_property_set_on_foreign_kind() {
        let mut registry = PropertyRegistry::new();
        let props = CoreProps::register(&mut registry);
        struct Dock;
        let dock_order =
            registry.register::<Dock, i32>("Order", PropertyMetadataBuilder::new(0).build());

        let mut tree = ElementTree::new(registry, props);
        let node = tree.insert();
        let _ = tree.set_property(node, dock_order, 3);
        assert_eq!(tree.get_property(node, dock_order), 3);
    }

    #[test]
    fn inherited_value_flows_and_reverts_on_detach() {
        let mut registry = PropertyRegistry::new();
        let props = CoreProps::register(&mut registry);
        struct TextKind;
        let font_size = registry.register::<TextKind, f64>(
            "FontSize",
            PropertyMetadataBuilder::new(12.0).inherits(true).build(),
        );

        let mut tree = ElementTree::new(registry, props);
        let root = tree.insert();
        let mid = tree.insert();
        let leaf = tree.insert();
        tree.add_child(root, mid);
        tree.add_child(mid, leaf);
        tree.set_root(root);

        let _ = tree.set_property(root, font_size, 20.0);
        assert_eq!(tree.get_property(leaf, font_size), 20.0);

        // Detaching the middle severs the chain for the whole subtree.
        tree.remove_child(root, mid);
        assert_eq!(tree.get_property(leaf, font_size), 12.0);
    }

    #[test]
    fn reparent_cascade_fires_changed_for_descendants() {
        let mut registry = PropertyRegistry::new();
        let props = CoreProps::register(&mut registry);
        let count = Arc::new(AtomicU32::new(0));
        let last_old = Arc::new(AtomicU64::new(0));
        let last_new = Arc::new(AtomicU64::new(0));
        let (c, o, n) = (count.clone(), last_old.clone(), last_new.clone());
        struct TextKind;
        let font_size = registry.register::<TextKind, f64>(
            "FontSize",
            PropertyMetadataBuilder::new(12.0)
                .inherits(true)
                .on_changed(move |old: &f64, new: &f64| {
                    c.fetch_add(1, Ordering::SeqCst);
                    o.store(old.to_bits(), Ordering::SeqCst);
                    n.store(new.to_bits(), Ordering::SeqCst);
                })
                .build(),
        );

        let mut tree = ElementTree::new(registry, props);
        let big = tree.insert();
        let small = tree.insert();
        let parent = tree.insert();
        let child = tree.insert();
        tree.add_child(parent, child);
        let _ = tree.set_property(big, font_size, 32.0);
        count.store(0, Ordering::SeqCst);

        // Attaching under `big` re-resolves for parent and child.
        tree.add_child(big, parent);
        assert_eq!(count.load(Ordering::SeqCst), 2);
        assert_eq!(f64::from_bits(last_old.load(Ordering::SeqCst)), 12.0);
        assert_eq!(f64::from_bits(last_new.load(Ordering::SeqCst)), 32.0);
        assert_eq!(tree.get_property(child, font_size), 32.0);

        // Detaching re-fires with the value resolved under severed
        // parentage.
        count.store(0, Ordering::SeqCst);
        tree.remove_child(big, parent);
        assert_eq!(count.load(Ordering::SeqCst), 2);
        assert_eq!(f64::from_bits(last_new.load(Ordering::SeqCst)), 12.0);

        // `small` declares no value; resolution lands on the default and no
        // change fires.
        count.store(0, Ordering::SeqCst);
        tree.add_child(small, parent);
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert_eq!(tree.get_property(child, font_size), 12.0);
    }

    #[test]
    fn logical_parent_wins_for_inheritance() {
        let mut registry = PropertyRegistry::new();
        let props = CoreProps::register(&mut registry);
        struct TextKind;
        let font_size = registry.register::<TextKind, f64>(
            "FontSize",
            PropertyMetadataBuilder::new(12.0).inherits(true).build(),
        );

        let mut tree = ElementTree::new(registry, props);
        let visual_host = tree.insert();
        let logical_owner = tree.insert();
        let node = tree.insert();
        tree.add_child(visual_host, node);
        let _ = tree.set_property(visual_host, font_size, 14.0);
        let _ = tree.set_property(logical_owner, font_size, 22.0);

        assert_eq!(tree.get_property(node, font_size), 14.0);

        tree.set_logical_parent(node, Some(logical_owner));
        assert_eq!(tree.get_property(node, font_size), 22.0);

        tree.set_logical_parent(node, None);
        assert_eq!(tree.get_property(node, font_size), 14.0);
    }

    #[test]
    fn clear_property_reverts_to_lower_precedence() {
        let (mut tree, props) = new_tree();
        let node = tree.insert();

        let _ = tree.set_property(node, props.opacity, 0.5);
        assert_eq!(tree.get_property(node, props.opacity), 0.5);

        assert!(tree.clear_property(node, props.opacity));
        assert_eq!(tree.get_property(node, props.opacity), 1.0);
        assert!(!tree.clear_property(node, props.opacity));
    }

    #[test]
    fn behavior_property_changed_hook_fires_once_per_real_change() {
        use crate::behavior::{Arrangeable, HitTestable, Measurable, PropertyAware, Renderable};

        struct Watcher {
            hits: Arc<AtomicU32>,
            last: Arc<AtomicU32>,
        }
        impl Measurable for Watcher {}
        impl Arrangeable for Watcher {}
        impl Renderable for Watcher {}
        impl HitTestable for Watcher {}
        impl PropertyAware for Watcher {
            fn property_changed(
                &mut self,
                _tree: &mut ElementTree,
                _node: ElementId,
                property: PropertyId,
            ) {
                self.hits.fetch_add(1, Ordering::SeqCst);
                self.last
                    .store(u32::from(property.index()), Ordering::SeqCst);
            }
        }

        let (mut tree, props) = new_tree();
        let hits = Arc::new(AtomicU32::new(0));
        let last = Arc::new(AtomicU32::new(u32::MAX));
        let node = tree.insert_with_behavior(Watcher {
            hits: hits.clone(),
            last: last.clone(),
        });

        let _ = tree.set_property(node, props.opacity, 0.5);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(
            last.load(Ordering::SeqCst),
            u32::from(props.opacity.id().index())
        );

        // An unchanged set stays silent.
        let _ = tree.set_property(node, props.opacity, 0.5);
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        // Clearing reverts to the default and fires again.
        assert!(tree.clear_property(node, props.opacity));
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn paint_order_sorts_by_z_then_document_order() {
        let (mut tree, _) = new_tree();
        let root = tree.insert();
        let a = tree.insert();
        let b = tree.insert();
        let c = tree.insert();
        tree.add_child(root, a);
        tree.add_child(root, b);
        tree.add_child(root, c);
        tree.set_z_index(b, 5);

        assert_eq!(tree.children_in_paint_order(root), vec![a, c, b]);
    }
}
