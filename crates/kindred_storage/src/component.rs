//! Per-type component storage.
//!
//! Each component type gets its own sparse set: a dense list of
//! `(entity, value)` pairs plus a sparse array mapping entity slot to dense
//! position. Attach, detach and lookup are O(1); detach swap-removes, so dense
//! order is not stable.
//!
//! Stores do not own the families that watch them. A store keeps the ids of
//! its subscribers and reports each change to a [`ChangeSink`], which the
//! registry backs with its family table.

use std::any::Any;

use kindred_foundation::{Component, ComponentKey, EntityId, Error, Result};

use crate::family::FamilyId;
use crate::handle::{DetachedField, FieldBox};

/// Sparse slot marker for "no value".
const ABSENT: usize = usize::MAX;

/// Receives attach and detach events from component stores.
pub trait ChangeSink {
    /// `key` was attached to `id`; deliver to `subscribers`.
    fn attached(&mut self, subscribers: &[FamilyId], key: ComponentKey, id: EntityId);

    /// `key` was detached from `id`; deliver to `subscribers`.
    fn detached(&mut self, subscribers: &[FamilyId], key: ComponentKey, id: EntityId);
}

/// Sink that drops every event, for stores used on their own.
impl ChangeSink for () {
    fn attached(&mut self, _: &[FamilyId], _: ComponentKey, _: EntityId) {}
    fn detached(&mut self, _: &[FamilyId], _: ComponentKey, _: EntityId) {}
}

/// Sparse-set storage for one component type.
#[derive(Debug)]
pub struct ComponentStore<T> {
    key: ComponentKey,
    /// Entity slot -> dense position, or `ABSENT`.
    sparse: Vec<usize>,
    /// Owner of each dense value.
    ids: Vec<EntityId>,
    values: Vec<T>,
    subscribers: Vec<FamilyId>,
}

impl<T: Component> Default for ComponentStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Component> ComponentStore<T> {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(0, 0)
    }

    /// Creates a store covering `slots` identifiers with room for `dense` values.
    #[must_use]
    pub fn with_capacity(slots: usize, dense: usize) -> Self {
        Self {
            key: ComponentKey::of::<T>(),
            sparse: vec![ABSENT; slots],
            ids: Vec::with_capacity(dense),
            values: Vec::with_capacity(dense),
            subscribers: Vec::new(),
        }
    }

    /// Returns the component type this store holds.
    #[must_use]
    pub fn key(&self) -> ComponentKey {
        self.key
    }

    /// Returns the number of stored values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if no entity holds this component.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Grows the sparse array to cover `id`.
    pub fn on_entity_added(&mut self, id: EntityId) {
        let slot = id.slot();
        if slot >= self.sparse.len() {
            self.sparse.resize(slot + 1, ABSENT);
        }
    }

    fn position(&self, id: EntityId) -> Option<usize> {
        match self.sparse.get(id.slot()) {
            Some(&pos) if pos != ABSENT => Some(pos),
            _ => None,
        }
    }

    /// Returns true if `id` holds a value.
    #[must_use]
    pub fn contains(&self, id: EntityId) -> bool {
        self.position(id).is_some()
    }

    /// Returns the value held by `id`.
    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<&T> {
        self.position(id).map(|pos| &self.values[pos])
    }

    /// Returns the value held by `id` mutably.
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut T> {
        self.position(id).map(|pos| &mut self.values[pos])
    }

    /// Stores `value` for `id` and notifies subscribers.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateAttribute` if `id` already holds a value; the store is
    /// left unchanged.
    pub fn attach(
        &mut self,
        id: EntityId,
        value: T,
        sink: &mut dyn ChangeSink,
    ) -> Result<&mut T> {
        if self.contains(id) {
            return Err(Error::duplicate_attribute(id, self.key));
        }

        self.on_entity_added(id);
        let pos = self.values.len();
        self.sparse[id.slot()] = pos;
        self.ids.push(id);
        self.values.push(value);

        sink.attached(&self.subscribers, self.key, id);
        Ok(&mut self.values[pos])
    }

    /// Removes the value held by `id`, notifying subscribers.
    ///
    /// Returns `None` and does nothing if `id` holds no value.
    pub fn detach(&mut self, id: EntityId, sink: &mut dyn ChangeSink) -> Option<T> {
        let pos = self.position(id)?;

        let last = self.values.len() - 1;
        if pos != last {
            let moved = self.ids[last];
            self.sparse[moved.slot()] = pos;
        }
        self.sparse[id.slot()] = ABSENT;
        self.ids.swap_remove(pos);
        let value = self.values.swap_remove(pos);

        sink.detached(&self.subscribers, self.key, id);
        Some(value)
    }

    /// Registers a family for change events. Idempotent.
    pub fn subscribe(&mut self, family: FamilyId) {
        if !self.subscribers.contains(&family) {
            self.subscribers.push(family);
        }
    }

    /// Returns the subscribed families.
    #[must_use]
    pub fn subscribers(&self) -> &[FamilyId] {
        &self.subscribers
    }

    /// Returns the owners of the stored values, in dense order.
    #[must_use]
    pub fn entities(&self) -> &[EntityId] {
        &self.ids
    }

    /// Iterates over `(entity, value)` pairs in dense order.
    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &T)> + '_ {
        self.ids.iter().copied().zip(self.values.iter())
    }

    /// Iterates over `(entity, value)` pairs mutably, in dense order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (EntityId, &mut T)> + '_ {
        self.ids.iter().copied().zip(self.values.iter_mut())
    }
}

/// Type-erased interface over a [`ComponentStore`].
///
/// The registry keeps one boxed store per component key and reaches the
/// typed store through [`ErasedStore::as_any_mut`] when the type is known.
pub trait ErasedStore: Any {
    /// Returns the component type this store holds.
    fn key(&self) -> ComponentKey;

    /// Returns the number of stored values.
    fn len(&self) -> usize;

    /// Returns true if the store is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Grows the sparse array to cover `id`.
    fn on_entity_added(&mut self, id: EntityId);

    /// Returns true if `id` holds a value.
    fn contains(&self, id: EntityId) -> bool;

    /// Registers a family for change events. Idempotent.
    fn subscribe(&mut self, family: FamilyId);

    /// Returns the value held by `id` without its static type.
    fn get_untyped(&self, id: EntityId) -> Option<&dyn Any>;

    /// Drops the value held by `id`. Returns whether one was present.
    fn detach_untyped(&mut self, id: EntityId, sink: &mut dyn ChangeSink) -> bool;

    /// Moves the value held by `id` out of the store.
    fn take_field(&mut self, id: EntityId, sink: &mut dyn ChangeSink) -> Option<FieldBox>;

    /// Stores a boxed value for `id`.
    ///
    /// # Errors
    ///
    /// Returns `TypeMismatch` if the box does not hold this store's type, or
    /// `DuplicateAttribute` if `id` already holds a value.
    fn attach_untyped(
        &mut self,
        id: EntityId,
        value: Box<dyn Any>,
        sink: &mut dyn ChangeSink,
    ) -> Result<()>;

    /// Upcast for downcasting to the typed store.
    fn as_any(&self) -> &dyn Any;

    /// Mutable upcast for downcasting to the typed store.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Component> ErasedStore for ComponentStore<T> {
    fn key(&self) -> ComponentKey {
        self.key
    }

    fn len(&self) -> usize {
        self.values.len()
    }

    fn on_entity_added(&mut self, id: EntityId) {
        ComponentStore::on_entity_added(self, id);
    }

    fn contains(&self, id: EntityId) -> bool {
        ComponentStore::contains(self, id)
    }

    fn subscribe(&mut self, family: FamilyId) {
        ComponentStore::subscribe(self, family);
    }

    fn get_untyped(&self, id: EntityId) -> Option<&dyn Any> {
        self.get(id).map(|value| value as &dyn Any)
    }

    fn detach_untyped(&mut self, id: EntityId, sink: &mut dyn ChangeSink) -> bool {
        self.detach(id, sink).is_some()
    }

    fn take_field(&mut self, id: EntityId, sink: &mut dyn ChangeSink) -> Option<FieldBox> {
        self.detach(id, sink)
            .map(|value| Box::new(DetachedField::new(value)) as FieldBox)
    }

    fn attach_untyped(
        &mut self,
        id: EntityId,
        value: Box<dyn Any>,
        sink: &mut dyn ChangeSink,
    ) -> Result<()> {
        let actual = (*value).type_id();
        let value = value
            .downcast::<T>()
            .map_err(|_| Error::type_mismatch(self.key, actual))?;
        self.attach(id, *value, sink).map(|_| ())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
