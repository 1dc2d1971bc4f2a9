//! Configuration for a [`Registry`](crate::Registry).

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Order in which destroyed identifiers are handed out again.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum RecyclePolicy {
    /// Oldest freed identifier first.
    #[default]
    Fifo,
    /// Most recently freed identifier first.
    Lifo,
}

/// Configuration for a registry.
///
/// Capacities are hints only; every structure still grows on demand.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RegistryConfig {
    /// Identifier slots reserved up front in the registry and in each store's
    /// sparse array.
    pub entity_capacity: usize,

    /// Dense capacity reserved by each newly created component store.
    pub component_capacity: usize,

    /// Identifier reuse order.
    pub recycle: RecyclePolicy,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            entity_capacity: 0,
            component_capacity: 0,
            recycle: RecyclePolicy::Fifo,
        }
    }
}

impl RegistryConfig {
    /// Creates a configuration sized for roughly `entities` live entities.
    #[must_use]
    pub fn with_capacity(entities: usize) -> Self {
        Self {
            entity_capacity: entities,
            component_capacity: entities,
            ..Self::default()
        }
    }

    /// Builder method to set the reserved identifier slots.
    #[must_use]
    pub fn with_entity_capacity(mut self, capacity: usize) -> Self {
        self.entity_capacity = capacity;
        self
    }

    /// Builder method to set the per-store dense capacity.
    #[must_use]
    pub fn with_component_capacity(mut self, capacity: usize) -> Self {
        self.component_capacity = capacity;
        self
    }

    /// Builder method to set the recycle policy.
    #[must_use]
    pub fn with_recycle(mut self, recycle: RecyclePolicy) -> Self {
        self.recycle = recycle;
        self
    }
}
