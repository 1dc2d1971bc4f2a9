//! The registry coordinator.
//!
//! [`Registry`] owns the identifier registry, one store per component type and
//! one family index per distinct predicate. Every entity lifecycle event and
//! every attach/detach goes through it, and it forwards change events from
//! stores to the families subscribed to them.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;

use kindred_foundation::{Component, ComponentKey, EntityId, Error, KeySet, Result};
use tracing::{debug, trace};

use crate::component::{ComponentStore, ErasedStore};
use crate::config::RegistryConfig;
use crate::entity::EntityRegistry;
use crate::family::{Family, FamilyIndex, FamilyTable};
use crate::handle::{DetachedEntity, FieldBox};
use crate::predicate::Predicate;

type StoreMap = HashMap<ComponentKey, Box<dyn ErasedStore>>;

/// Entity/component storage with live query results.
///
/// # Example
///
/// ```
/// use kindred_storage::{Predicate, Registry};
///
/// struct Position(f32, f32);
/// struct Velocity(f32, f32);
///
/// let mut registry = Registry::new();
/// let moving = registry.query(&Predicate::all_of::<(Position, Velocity)>().build());
///
/// let e = registry.create_entity();
/// registry.attach(e, Position(0.0, 0.0)).unwrap();
/// assert!(moving.is_empty());
///
/// registry.attach(e, Velocity(1.0, 0.0)).unwrap();
/// assert_eq!(moving.to_vec(), vec![e]);
/// ```
pub struct Registry {
    config: RegistryConfig,
    entities: EntityRegistry,
    stores: StoreMap,
    families: FamilyTable,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

/// Returns the typed store for `T`, creating it on first use.
///
/// A new store is sized for every slot allocated so far and subscribed to
/// every existing family that mentions `T`.
fn typed_store<'a, T: Component>(
    stores: &'a mut StoreMap,
    entities: &EntityRegistry,
    families: &FamilyTable,
    config: &RegistryConfig,
) -> Result<&'a mut ComponentStore<T>> {
    let key = ComponentKey::of::<T>();
    let store = stores.entry(key).or_insert_with(|| {
        let mut store =
            ComponentStore::<T>::with_capacity(entities.slot_count(), config.component_capacity);
        for family in families.referencing(key) {
            store.subscribe(family);
        }
        debug!(component = %key, subscribers = store.subscribers().len(), "created component store");
        Box::new(store) as Box<dyn ErasedStore>
    });

    let actual = store.as_any().type_id();
    store
        .as_any_mut()
        .downcast_mut::<ComponentStore<T>>()
        .ok_or_else(|| Error::type_mismatch(key, actual))
}

impl Registry {
    /// Creates an empty registry with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    /// Creates an empty registry.
    #[must_use]
    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            entities: EntityRegistry::with_config(&config),
            stores: HashMap::new(),
            families: FamilyTable::new(),
            config,
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    // --- Entity Lifecycle ---

    /// Creates an entity with no components.
    ///
    /// Families whose predicate accepts an empty entity include it immediately.
    pub fn create_entity(&mut self) -> EntityId {
        let id = self.entities.create();
        for store in self.stores.values_mut() {
            store.on_entity_added(id);
        }
        self.families.on_entity_added(id);
        trace!(entity = %id, "created entity");
        id
    }

    /// Destroys an entity, detaching each of its components first.
    ///
    /// Every family has dropped the entity by the time this returns. Returns
    /// `false` and does nothing if `id` is not live.
    pub fn destroy_entity(&mut self, id: EntityId) -> bool {
        if !self.entities.is_valid(id) {
            return false;
        }

        for key in self.entities.components(id).to_vec() {
            if let Some(store) = self.stores.get_mut(&key) {
                store.detach_untyped(id, &mut self.families);
            }
            self.entities.record_detach(id, key);
        }
        self.families.on_entity_destroyed(id);
        self.entities.release(id);

        debug!(entity = %id, "destroyed entity");
        true
    }

    /// Destroys an entity, moving its components into a [`DetachedEntity`].
    ///
    /// # Errors
    ///
    /// Returns `EntityInvalid` if `id` is not live.
    pub fn take_entity(&mut self, id: EntityId) -> Result<DetachedEntity> {
        self.entities
            .validate(id)
            .map_err(|e| e.in_operation("take_entity"))?;

        let mut bag = DetachedEntity::new();
        for key in self.entities.components(id).to_vec() {
            let field = self
                .stores
                .get_mut(&key)
                .and_then(|store| store.take_field(id, &mut self.families));
            self.entities.record_detach(id, key);
            if let Some(field) = field {
                bag.insert_field(field)?;
            }
        }
        self.families.on_entity_destroyed(id);
        self.entities.release(id);

        debug!(entity = %id, fields = bag.len(), "took entity");
        Ok(bag)
    }

    /// Destroys every live entity. Returns how many were destroyed.
    pub fn destroy_all(&mut self) -> usize {
        let live: Vec<EntityId> = self.entities.iter().collect();
        for id in &live {
            self.destroy_entity(*id);
        }
        debug!(count = live.len(), "destroyed all entities");
        live.len()
    }

    /// Destroys every entity matching `predicate`. Returns how many were destroyed.
    pub fn destroy_matching(&mut self, predicate: &Predicate) -> usize {
        let doomed = self.query(predicate).to_vec();
        for id in &doomed {
            self.destroy_entity(*id);
        }
        debug!(family = %predicate, count = doomed.len(), "destroyed matching entities");
        doomed.len()
    }

    /// Checks if an identifier is live.
    #[must_use]
    pub fn is_valid(&self, id: EntityId) -> bool {
        self.entities.is_valid(id)
    }

    /// Returns the number of live entities.
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Returns the number of component stores created so far.
    #[must_use]
    pub fn store_count(&self) -> usize {
        self.stores.len()
    }

    /// Returns the number of families created so far.
    #[must_use]
    pub fn family_count(&self) -> usize {
        self.families.len()
    }

    // --- Component Operations ---

    /// Attaches `value` to `id`, returning the stored value.
    ///
    /// # Errors
    ///
    /// Returns `EntityInvalid` if `id` is not live, or `DuplicateAttribute` if
    /// it already holds a `T`. Nothing changes on error.
    pub fn attach<T: Component>(&mut self, id: EntityId, value: T) -> Result<&mut T> {
        self.entities
            .validate(id)
            .map_err(|e| e.in_operation("attach"))?;

        let key = ComponentKey::of::<T>();
        let store = typed_store::<T>(&mut self.stores, &self.entities, &self.families, &self.config)?;
        let stored = store
            .attach(id, value, &mut self.families)
            .map_err(|e| e.in_operation("attach"))?;
        self.entities.record_attach(id, key);
        Ok(stored)
    }

    /// Attaches a boxed field to `id`.
    ///
    /// Uses the existing store for the field's type when there is one, and
    /// otherwise lets the field create it.
    ///
    /// # Errors
    ///
    /// Returns `EntityInvalid`, `DuplicateAttribute`, or `TypeMismatch` if the
    /// field's value is not of the type it reports.
    pub fn attach_field(&mut self, id: EntityId, field: FieldBox) -> Result<()> {
        self.entities
            .validate(id)
            .map_err(|e| e.in_operation("attach"))?;

        let key = field.key();
        match self.stores.get_mut(&key) {
            Some(store) => {
                store
                    .attach_untyped(id, field.into_any(), &mut self.families)
                    .map_err(|e| e.in_operation("attach"))?;
                self.entities.record_attach(id, key);
                Ok(())
            }
            None => field.attach_to(self, id),
        }
    }

    /// Detaches the `T` held by `id`, if any.
    ///
    /// # Errors
    ///
    /// Returns `EntityInvalid` if `id` is not live.
    pub fn detach<T: Component>(&mut self, id: EntityId) -> Result<()> {
        self.detach_key(id, ComponentKey::of::<T>())
            .map(|_| ())
            .map_err(|e| e.in_operation("detach"))
    }

    /// Detaches the component of type `key` from `id`.
    ///
    /// Returns whether a value was present.
    ///
    /// # Errors
    ///
    /// Returns `EntityInvalid` if `id` is not live.
    pub fn detach_key(&mut self, id: EntityId, key: ComponentKey) -> Result<bool> {
        self.entities
            .validate(id)
            .map_err(|e| e.in_operation("detach_key"))?;

        let removed = self
            .stores
            .get_mut(&key)
            .is_some_and(|store| store.detach_untyped(id, &mut self.families));
        if removed {
            self.entities.record_detach(id, key);
        }
        Ok(removed)
    }

    /// Removes and returns the `T` held by `id`.
    ///
    /// # Errors
    ///
    /// Returns `EntityInvalid` if `id` is not live, or `AttributeNotFound` if
    /// it holds no `T`.
    pub fn remove<T: Component>(&mut self, id: EntityId) -> Result<T> {
        self.entities
            .validate(id)
            .map_err(|e| e.in_operation("remove"))?;

        let key = ComponentKey::of::<T>();
        let value = self
            .stores
            .get_mut(&key)
            .and_then(|store| store.as_any_mut().downcast_mut::<ComponentStore<T>>())
            .and_then(|store| store.detach(id, &mut self.families))
            .ok_or_else(|| Error::attribute_not_found(id, key).in_operation("remove"))?;
        self.entities.record_detach(id, key);
        Ok(value)
    }

    /// Detaches every component of `id` whose type is not in `keep`.
    ///
    /// Returns how many were detached.
    ///
    /// # Errors
    ///
    /// Returns `EntityInvalid` if `id` is not live.
    pub fn strip_all_except(&mut self, id: EntityId, keep: &[ComponentKey]) -> Result<usize> {
        self.entities
            .validate(id)
            .map_err(|e| e.in_operation("strip_all_except"))?;

        let doomed: Vec<ComponentKey> = self
            .entities
            .components(id)
            .iter()
            .copied()
            .filter(|key| !keep.contains(key))
            .collect();
        for key in &doomed {
            self.detach_key(id, *key)?;
        }
        Ok(doomed.len())
    }

    /// Returns the `T` held by `id`.
    ///
    /// # Errors
    ///
    /// Returns `EntityInvalid` if `id` is not live.
    pub fn get<T: Component>(&self, id: EntityId) -> Result<Option<&T>> {
        self.entities.validate(id).map_err(|e| e.in_operation("get"))?;
        Ok(self.store::<T>().and_then(|store| store.get(id)))
    }

    /// Returns the `T` held by `id` mutably.
    ///
    /// Mutating a value never changes family membership.
    ///
    /// # Errors
    ///
    /// Returns `EntityInvalid` if `id` is not live.
    pub fn get_mut<T: Component>(&mut self, id: EntityId) -> Result<Option<&mut T>> {
        self.entities
            .validate(id)
            .map_err(|e| e.in_operation("get_mut"))?;
        Ok(self
            .stores
            .get_mut(&ComponentKey::of::<T>())
            .and_then(|store| store.as_any_mut().downcast_mut::<ComponentStore<T>>())
            .and_then(|store| store.get_mut(id)))
    }

    /// Returns the value of type `key` held by `id`, without its static type.
    ///
    /// # Errors
    ///
    /// Returns `EntityInvalid` if `id` is not live.
    pub fn get_untyped(&self, id: EntityId, key: ComponentKey) -> Result<Option<&dyn Any>> {
        self.entities
            .validate(id)
            .map_err(|e| e.in_operation("get_untyped"))?;
        Ok(self.stores.get(&key).and_then(|store| store.get_untyped(id)))
    }

    /// Returns true if `id` holds a `T`.
    ///
    /// # Errors
    ///
    /// Returns `EntityInvalid` if `id` is not live.
    pub fn has<T: Component>(&self, id: EntityId) -> Result<bool> {
        self.has_key(id, ComponentKey::of::<T>())
            .map_err(|e| e.in_operation("has"))
    }

    /// Returns true if `id` holds a component of type `key`.
    ///
    /// # Errors
    ///
    /// Returns `EntityInvalid` if `id` is not live.
    pub fn has_key(&self, id: EntityId, key: ComponentKey) -> Result<bool> {
        self.entities.validate(id)?;
        Ok(self.stores.get(&key).is_some_and(|store| store.contains(id)))
    }

    /// Returns the component types held by `id`.
    ///
    /// # Errors
    ///
    /// Returns `EntityInvalid` if `id` is not live.
    pub fn components_of(&self, id: EntityId) -> Result<KeySet> {
        self.entities
            .validate(id)
            .map_err(|e| e.in_operation("components_of"))?;
        Ok(self.entities.components(id).iter().copied().collect())
    }

    /// Returns the store for `T`, if one has been created.
    #[must_use]
    pub fn store<T: Component>(&self) -> Option<&ComponentStore<T>> {
        self.stores
            .get(&ComponentKey::of::<T>())
            .and_then(|store| store.as_any().downcast_ref())
    }

    /// Iterates over every `(entity, value)` pair for `T`, in storage order.
    pub fn components<T: Component>(&self) -> impl Iterator<Item = (EntityId, &T)> + '_ {
        self.store::<T>().into_iter().flat_map(|store| store.iter())
    }

    // --- Queries ---

    /// Returns the live family for `predicate`.
    ///
    /// Equal predicates share one family. The first request builds it from the
    /// current contents of the stores; afterwards it is kept up to date by
    /// attach, detach and destroy.
    pub fn query(&mut self, predicate: &Predicate) -> Family {
        if let Some(index) = self
            .families
            .lookup(predicate)
            .and_then(|id| self.families.get(id))
        {
            return index.view();
        }

        let family_id = self.families.next_id();
        let mut index = FamilyIndex::new(predicate.clone(), self.entities.slot_count());
        for key in predicate.referenced().iter() {
            if let Some(store) = self.stores.get_mut(&key) {
                store.subscribe(family_id);
            }
        }

        let stores = &self.stores;
        index.initialize(self.entities.iter(), |key, id| {
            stores.get(&key).is_some_and(|store| store.contains(id))
        });
        debug!(family = %predicate, members = index.len(), "created family");

        let view = index.view();
        self.families.insert(index);
        view
    }

    /// Returns a live family containing every valid entity.
    pub fn entities(&mut self) -> Family {
        self.query(&Predicate::any())
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut stores: Vec<_> = self.stores.keys().map(|key| key.short_name()).collect();
        stores.sort_unstable();
        f.debug_struct("Registry")
            .field("entities", &self.entities.len())
            .field("stores", &stores)
            .field("families", &self.families.len())
            .finish_non_exhaustive()
    }
}
