//! Persistent key sets with structural sharing.
//!
//! A thin wrapper around `im::OrdSet`, giving predicate groups an
//! order-independent identity and O(1) cloning.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::iter::FromIterator;

use crate::types::ComponentKey;

/// Persistent ordered set of component keys.
///
/// Two sets are equal when they contain the same keys, regardless of the
/// order or multiplicity in which those keys were inserted.
#[derive(Clone, Default)]
pub struct KeySet(im::OrdSet<ComponentKey>);

impl KeySet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self(im::OrdSet::new())
    }

    /// Returns the number of keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns true if the set contains the key.
    #[must_use]
    pub fn contains(&self, key: ComponentKey) -> bool {
        self.0.contains(&key)
    }

    /// Returns a new set with the key inserted.
    #[must_use]
    pub fn insert(&self, key: ComponentKey) -> Self {
        let mut new = self.0.clone();
        new.insert(key);
        Self(new)
    }

    /// Returns a new set with the key removed.
    #[must_use]
    pub fn remove(&self, key: ComponentKey) -> Self {
        let mut new = self.0.clone();
        new.remove(&key);
        Self(new)
    }

    /// Returns the union of two sets.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        Self(self.0.clone().union(other.0.clone()))
    }

    /// Returns true if every key of `self` is in `other`.
    #[must_use]
    pub fn is_subset(&self, other: &Self) -> bool {
        self.0.is_subset(&other.0)
    }

    /// Returns an iterator over the keys in key order.
    pub fn iter(&self) -> impl Iterator<Item = ComponentKey> + '_ {
        self.0.iter().copied()
    }
}

impl fmt::Debug for KeySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl PartialEq for KeySet {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for KeySet {}

impl Hash for KeySet {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.len().hash(state);
        for key in self.iter() {
            key.hash(state);
        }
    }
}

impl FromIterator<ComponentKey> for KeySet {
    fn from_iter<I: IntoIterator<Item = ComponentKey>>(iter: I) -> Self {
        Self(im::OrdSet::from_iter(iter))
    }
}

impl Extend<ComponentKey> for KeySet {
    fn extend<I: IntoIterator<Item = ComponentKey>>(&mut self, iter: I) {
        for key in iter {
            self.0.insert(key);
        }
    }
}
