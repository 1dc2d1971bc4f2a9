//! Identifier allocation and recycling.
//!
//! The `EntityRegistry` hands out identifiers, tracks which are live, and
//! remembers which component types each live identifier currently holds so
//! that destruction only has to visit the stores involved.

// Identifier space is u32; slot counts never exceed it.
#![allow(clippy::cast_possible_truncation)]

use std::collections::VecDeque;

use kindred_foundation::{ComponentKey, EntityId, Error, Result};

use crate::config::{RecyclePolicy, RegistryConfig};

/// Manages identifier lifecycle.
///
/// Identifiers come from the free pool when it is non-empty, otherwise the
/// next sequential index is allocated. Validity is a single slot lookup.
#[derive(Debug, Clone, Default)]
pub struct EntityRegistry {
    /// Liveness flag for every slot ever allocated.
    alive: Vec<bool>,
    /// Component types attached to each slot; empty for free slots.
    attached: Vec<Vec<ComponentKey>>,
    /// Freed identifiers awaiting reuse.
    free: VecDeque<u32>,
    /// Count of live entities.
    live_count: usize,
    recycle: RecyclePolicy,
}

impl EntityRegistry {
    /// Creates a new empty registry with FIFO recycling.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry honoring the capacity and recycle settings.
    #[must_use]
    pub fn with_config(config: &RegistryConfig) -> Self {
        Self {
            alive: Vec::with_capacity(config.entity_capacity),
            attached: Vec::with_capacity(config.entity_capacity),
            free: VecDeque::new(),
            live_count: 0,
            recycle: config.recycle,
        }
    }

    /// Allocates an identifier, reusing a freed one when available.
    pub fn create(&mut self) -> EntityId {
        self.live_count += 1;

        let recycled = match self.recycle {
            RecyclePolicy::Fifo => self.free.pop_front(),
            RecyclePolicy::Lifo => self.free.pop_back(),
        };

        if let Some(index) = recycled {
            self.alive[index as usize] = true;
            EntityId::new(index)
        } else {
            let index = self.alive.len() as u32;
            self.alive.push(true);
            self.attached.push(Vec::new());
            EntityId::new(index)
        }
    }

    /// Marks an identifier invalid and returns it to the free pool.
    ///
    /// Returns `false` without doing anything if the identifier is not live.
    /// Callers are expected to have detached every component first.
    pub fn release(&mut self, id: EntityId) -> bool {
        if !self.is_valid(id) {
            return false;
        }

        let slot = id.slot();
        self.alive[slot] = false;
        self.attached[slot].clear();
        self.free.push_back(id.index());
        self.live_count -= 1;
        true
    }

    /// Checks if an identifier is currently allocated.
    #[must_use]
    pub fn is_valid(&self, id: EntityId) -> bool {
        self.alive.get(id.slot()).copied().unwrap_or(false)
    }

    /// Validates that an identifier is live.
    ///
    /// # Errors
    ///
    /// Returns `EntityInvalid` if the identifier was destroyed or never created.
    pub fn validate(&self, id: EntityId) -> Result<()> {
        if self.is_valid(id) {
            Ok(())
        } else {
            Err(Error::entity_invalid(id))
        }
    }

    /// Records that `key` is now attached to `id`.
    pub fn record_attach(&mut self, id: EntityId, key: ComponentKey) {
        if let Some(keys) = self.attached.get_mut(id.slot()) {
            if !keys.contains(&key) {
                keys.push(key);
            }
        }
    }

    /// Records that `key` is no longer attached to `id`.
    pub fn record_detach(&mut self, id: EntityId, key: ComponentKey) {
        if let Some(keys) = self.attached.get_mut(id.slot()) {
            if let Some(pos) = keys.iter().position(|k| *k == key) {
                keys.swap_remove(pos);
            }
        }
    }

    /// Returns the component types attached to `id`, in no particular order.
    ///
    /// Empty for identifiers that are not live.
    #[must_use]
    pub fn components(&self, id: EntityId) -> &[ComponentKey] {
        self.attached
            .get(id.slot())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Returns the number of live entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.live_count
    }

    /// Returns true if there are no live entities.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.live_count == 0
    }

    /// Returns the number of slots ever allocated, live or free.
    ///
    /// Parallel per-identifier arrays must be at least this long.
    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.alive.len()
    }

    /// Returns the number of identifiers waiting to be reused.
    #[must_use]
    pub fn free_count(&self) -> usize {
        self.free.len()
    }

    /// Iterates over all live identifiers in index order.
    pub fn iter(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.alive
            .iter()
            .enumerate()
            .filter(|(_, alive)| **alive)
            .map(|(idx, _)| EntityId::new(idx as u32))
    }
}
