//! Entity handles that survive destruction.
//!
//! A [`Handle`] names an entity either inside a registry ([`Handle::Managed`])
//! or as a free-standing bag of fields ([`Handle::Detached`]). Destroying a
//! managed handle moves every field out of the stores, so the handle keeps its
//! data after the identifier is recycled. A detached bag can later be adopted
//! back into a registry as a new entity.

use std::any::Any;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt;

use kindred_foundation::{Component, ComponentKey, EntityId, Error, KeySet, Result};

use crate::predicate::Predicate;
use crate::registry::Registry;

/// A component value moved out of its store.
pub trait AnyField {
    /// Returns the value's component type.
    fn key(&self) -> ComponentKey;

    /// Returns the value.
    fn value(&self) -> &dyn Any;

    /// Returns the value mutably.
    fn value_mut(&mut self) -> &mut dyn Any;

    /// Unwraps the value.
    fn into_any(self: Box<Self>) -> Box<dyn Any>;

    /// Attaches the value to `id` in `registry`, creating its store if needed.
    ///
    /// # Errors
    ///
    /// Returns the error [`Registry::attach`] would.
    fn attach_to(self: Box<Self>, registry: &mut Registry, id: EntityId) -> Result<()>;
}

/// Boxed field of any component type.
pub type FieldBox = Box<dyn AnyField>;

/// Typed field wrapper.
#[derive(Debug, Clone, PartialEq)]
pub struct DetachedField<T> {
    value: T,
}

impl<T: Component> DetachedField<T> {
    /// Wraps a value.
    #[must_use]
    pub fn new(value: T) -> Self {
        Self { value }
    }

    /// Unwraps the value.
    #[must_use]
    pub fn into_inner(self) -> T {
        self.value
    }
}

impl<T: Component> AnyField for DetachedField<T> {
    fn key(&self) -> ComponentKey {
        ComponentKey::of::<T>()
    }

    fn value(&self) -> &dyn Any {
        &self.value
    }

    fn value_mut(&mut self) -> &mut dyn Any {
        &mut self.value
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        Box::new(self.value)
    }

    fn attach_to(self: Box<Self>, registry: &mut Registry, id: EntityId) -> Result<()> {
        registry.attach(id, self.value).map(|_| ())
    }
}

impl fmt::Debug for dyn AnyField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Field({})", self.key().short_name())
    }
}

/// Fields of an entity that no longer lives in a registry.
///
/// Holds at most one value per component type, the same rule a registry
/// enforces. Errors that name an entity use [`EntityId::null`].
#[derive(Default)]
pub struct DetachedEntity {
    fields: HashMap<ComponentKey, FieldBox>,
}

impl DetachedEntity {
    /// Creates an empty bag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if the bag holds no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Returns the component types held.
    #[must_use]
    pub fn keys(&self) -> KeySet {
        self.fields.keys().copied().collect()
    }

    /// Returns true if a `T` is held.
    #[must_use]
    pub fn has<T: Component>(&self) -> bool {
        self.has_key(ComponentKey::of::<T>())
    }

    /// Returns true if a value of type `key` is held.
    #[must_use]
    pub fn has_key(&self, key: ComponentKey) -> bool {
        self.fields.contains_key(&key)
    }

    /// Returns the held `T`.
    #[must_use]
    pub fn get<T: Component>(&self) -> Option<&T> {
        self.fields
            .get(&ComponentKey::of::<T>())
            .and_then(|field| field.value().downcast_ref())
    }

    /// Returns the held `T` mutably.
    pub fn get_mut<T: Component>(&mut self) -> Option<&mut T> {
        self.fields
            .get_mut(&ComponentKey::of::<T>())
            .and_then(|field| field.value_mut().downcast_mut())
    }

    /// Adds a `T`.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateAttribute` if a `T` is already held.
    pub fn attach<T: Component>(&mut self, value: T) -> Result<()> {
        self.insert_field(Box::new(DetachedField::new(value)))
    }

    /// Adds a boxed field.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateAttribute` if a field of the same type is already held.
    pub fn insert_field(&mut self, field: FieldBox) -> Result<()> {
        match self.fields.entry(field.key()) {
            Entry::Occupied(slot) => Err(Error::duplicate_attribute(EntityId::null(), *slot.key())),
            Entry::Vacant(slot) => {
                slot.insert(field);
                Ok(())
            }
        }
    }

    /// Removes and returns the held `T`, if any.
    pub fn detach<T: Component>(&mut self) -> Option<T> {
        self.fields
            .remove(&ComponentKey::of::<T>())
            .and_then(|field| field.into_any().downcast::<T>().ok())
            .map(|value| *value)
    }

    /// Evaluates `predicate` against the held component types.
    #[must_use]
    pub fn matches(&self, predicate: &Predicate) -> bool {
        predicate.matches_by(|key| self.has_key(key))
    }

    /// Inserts every field into `registry` as a new entity.
    ///
    /// # Errors
    ///
    /// Propagates the first attach failure. The partially built entity is
    /// destroyed before returning.
    pub fn adopt_into(self, registry: &mut Registry) -> Result<EntityId> {
        let id = registry.create_entity();
        for field in self.fields.into_values() {
            if let Err(err) = registry.attach_field(id, field) {
                registry.destroy_entity(id);
                return Err(err);
            }
        }
        Ok(id)
    }
}

impl fmt::Debug for DetachedEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set()
            .entries(self.fields.keys().map(|key| key.short_name()))
            .finish()
    }
}

/// An entity that is either registry-managed or a detached bag of fields.
#[derive(Debug)]
pub enum Handle {
    /// Lives in a registry under this identifier.
    Managed(EntityId),
    /// Owns its fields directly.
    Detached(DetachedEntity),
}

impl Handle {
    /// Creates a managed handle for a new entity.
    pub fn spawn(registry: &mut Registry) -> Self {
        Self::Managed(registry.create_entity())
    }

    /// Creates an empty detached handle.
    #[must_use]
    pub fn detached() -> Self {
        Self::Detached(DetachedEntity::new())
    }

    /// Returns the identifier of a managed handle.
    #[must_use]
    pub fn id(&self) -> Option<EntityId> {
        match self {
            Self::Managed(id) => Some(*id),
            Self::Detached(_) => None,
        }
    }

    /// Returns true if the handle lives in a registry.
    #[must_use]
    pub fn is_managed(&self) -> bool {
        matches!(self, Self::Managed(_))
    }

    /// Returns true unless this is a managed handle whose entity was destroyed
    /// behind its back.
    #[must_use]
    pub fn is_valid(&self, registry: &Registry) -> bool {
        match self {
            Self::Managed(id) => registry.is_valid(*id),
            Self::Detached(_) => true,
        }
    }

    /// Attaches a `T`.
    ///
    /// # Errors
    ///
    /// Returns `EntityInvalid` for a stale managed handle and
    /// `DuplicateAttribute` if a `T` is already held.
    pub fn attach<T: Component>(&mut self, registry: &mut Registry, value: T) -> Result<()> {
        match self {
            Self::Managed(id) => registry.attach(*id, value).map(|_| ()),
            Self::Detached(bag) => bag.attach(value),
        }
    }

    /// Detaches a `T` if held.
    ///
    /// # Errors
    ///
    /// Returns `EntityInvalid` for a stale managed handle.
    pub fn detach<T: Component>(&mut self, registry: &mut Registry) -> Result<()> {
        match self {
            Self::Managed(id) => registry.detach::<T>(*id),
            Self::Detached(bag) => {
                bag.detach::<T>();
                Ok(())
            }
        }
    }

    /// Returns true if a `T` is held.
    ///
    /// # Errors
    ///
    /// Returns `EntityInvalid` for a stale managed handle.
    pub fn has<T: Component>(&self, registry: &Registry) -> Result<bool> {
        match self {
            Self::Managed(id) => registry.has::<T>(*id),
            Self::Detached(bag) => Ok(bag.has::<T>()),
        }
    }

    /// Returns the held `T`.
    ///
    /// # Errors
    ///
    /// Returns `EntityInvalid` for a stale managed handle.
    pub fn get<'a, T: Component>(&'a self, registry: &'a Registry) -> Result<Option<&'a T>> {
        match self {
            Self::Managed(id) => registry.get::<T>(*id),
            Self::Detached(bag) => Ok(bag.get::<T>()),
        }
    }

    /// Evaluates `predicate` against the held component types.
    ///
    /// # Errors
    ///
    /// Returns `EntityInvalid` for a stale managed handle.
    pub fn matches(&self, registry: &Registry, predicate: &Predicate) -> Result<bool> {
        match self {
            Self::Managed(id) => {
                let keys = registry.components_of(*id)?;
                Ok(predicate.matches(&keys))
            }
            Self::Detached(bag) => Ok(bag.matches(predicate)),
        }
    }

    /// Destroys a managed entity, keeping its fields in this handle.
    ///
    /// Does nothing for a detached handle.
    ///
    /// # Errors
    ///
    /// Returns `EntityInvalid` for a stale managed handle; the handle is left
    /// unchanged.
    pub fn destroy(&mut self, registry: &mut Registry) -> Result<()> {
        if let Self::Managed(id) = self {
            let bag = registry.take_entity(*id)?;
            *self = Self::Detached(bag);
        }
        Ok(())
    }

    /// Moves a detached handle's fields into `registry`, making it managed.
    ///
    /// Returns the identifier; a managed handle just returns its own.
    ///
    /// # Errors
    ///
    /// Propagates [`DetachedEntity::adopt_into`] failures. The fields are lost
    /// and the handle is left empty and detached.
    pub fn adopt(&mut self, registry: &mut Registry) -> Result<EntityId> {
        match std::mem::replace(self, Self::detached()) {
            Self::Managed(id) => {
                *self = Self::Managed(id);
                Ok(id)
            }
            Self::Detached(bag) => {
                let id = bag.adopt_into(registry)?;
                *self = Self::Managed(id);
                Ok(id)
            }
        }
    }
}

impl From<DetachedEntity> for Handle {
    fn from(bag: DetachedEntity) -> Self {
        Self::Detached(bag)
    }
}
