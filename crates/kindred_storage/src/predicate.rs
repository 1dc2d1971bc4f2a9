//! Membership predicates over component types.
//!
//! A [`Predicate`] has three groups:
//! - *required*: the entity must hold every one of these,
//! - *alternatives*: if non-empty, the entity must hold at least one,
//! - *excluded*: the entity must hold none of these.
//!
//! Predicates are built with [`PredicateBuilder`]:
//!
//! ```
//! use kindred_storage::Predicate;
//!
//! struct Position;
//! struct Velocity;
//! struct Frozen;
//!
//! let moving = Predicate::all_of::<(Position, Velocity)>()
//!     .none::<Frozen>()
//!     .build();
//! assert_eq!(moving.required().len(), 2);
//! ```

use std::fmt;

use kindred_foundation::{Component, ComponentKey, ComponentSet, KeySet};

/// Immutable membership rule over component types.
///
/// Equality and hashing consider all three groups as sets, so the order and
/// repetition of types given to the builder do not matter.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Predicate {
    all: KeySet,
    one: KeySet,
    none: KeySet,
}

impl Predicate {
    /// Starts an empty builder.
    #[must_use]
    pub fn builder() -> PredicateBuilder {
        PredicateBuilder::new()
    }

    /// The empty predicate, matched by every entity.
    #[must_use]
    pub fn any() -> Self {
        Self::default()
    }

    /// Starts a builder requiring component `T`.
    #[must_use]
    pub fn all<T: Component>() -> PredicateBuilder {
        PredicateBuilder::new().all::<T>()
    }

    /// Starts a builder requiring at least one of component `T`.
    #[must_use]
    pub fn one<T: Component>() -> PredicateBuilder {
        PredicateBuilder::new().one::<T>()
    }

    /// Starts a builder excluding component `T`.
    #[must_use]
    pub fn none<T: Component>() -> PredicateBuilder {
        PredicateBuilder::new().none::<T>()
    }

    /// Starts a builder requiring every component in `S`.
    #[must_use]
    pub fn all_of<S: ComponentSet>() -> PredicateBuilder {
        PredicateBuilder::new().all_of::<S>()
    }

    /// Starts a builder requiring at least one component in `S`.
    #[must_use]
    pub fn one_of<S: ComponentSet>() -> PredicateBuilder {
        PredicateBuilder::new().one_of::<S>()
    }

    /// Starts a builder excluding every component in `S`.
    #[must_use]
    pub fn none_of<S: ComponentSet>() -> PredicateBuilder {
        PredicateBuilder::new().none_of::<S>()
    }

    /// Component types an entity must all hold.
    #[must_use]
    pub fn required(&self) -> &KeySet {
        &self.all
    }

    /// Component types of which an entity must hold at least one, if any.
    #[must_use]
    pub fn alternatives(&self) -> &KeySet {
        &self.one
    }

    /// Component types an entity must not hold.
    #[must_use]
    pub fn excluded(&self) -> &KeySet {
        &self.none
    }

    /// Every component type mentioned in any group.
    #[must_use]
    pub fn referenced(&self) -> KeySet {
        self.all.union(&self.one).union(&self.none)
    }

    /// Returns true if `key` appears in any group.
    #[must_use]
    pub fn references(&self, key: ComponentKey) -> bool {
        self.all.contains(key) || self.one.contains(key) || self.none.contains(key)
    }

    /// Returns true if an entity holding no components satisfies this predicate.
    #[must_use]
    pub fn matches_empty(&self) -> bool {
        self.all.is_empty() && self.one.is_empty()
    }

    /// Evaluates the predicate against a set of present component types.
    #[must_use]
    pub fn matches(&self, present: &KeySet) -> bool {
        self.matches_by(|key| present.contains(key))
    }

    /// Evaluates the predicate using a presence test.
    pub fn matches_by(&self, has: impl Fn(ComponentKey) -> bool) -> bool {
        if self.none.iter().any(&has) {
            return false;
        }
        if !self.all.iter().all(&has) {
            return false;
        }
        self.one.is_empty() || self.one.iter().any(&has)
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn group(f: &mut fmt::Formatter<'_>, label: &str, keys: &KeySet) -> fmt::Result {
            write!(f, "{label}(")?;
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{key}")?;
            }
            write!(f, ")")
        }

        group(f, "All", &self.all)?;
        write!(f, " ")?;
        group(f, "One", &self.one)?;
        write!(f, " ")?;
        group(f, "None", &self.none)
    }
}

/// Accumulates component types for a [`Predicate`].
///
/// Repeated types are allowed and ignored.
#[derive(Clone, Debug, Default)]
pub struct PredicateBuilder {
    all: Vec<ComponentKey>,
    one: Vec<ComponentKey>,
    none: Vec<ComponentKey>,
}

impl PredicateBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requires component `T`.
    #[must_use]
    pub fn all<T: Component>(mut self) -> Self {
        self.all.push(ComponentKey::of::<T>());
        self
    }

    /// Adds `T` to the at-least-one group.
    #[must_use]
    pub fn one<T: Component>(mut self) -> Self {
        self.one.push(ComponentKey::of::<T>());
        self
    }

    /// Excludes component `T`.
    #[must_use]
    pub fn none<T: Component>(mut self) -> Self {
        self.none.push(ComponentKey::of::<T>());
        self
    }

    /// Requires every component in `S`.
    #[must_use]
    pub fn all_of<S: ComponentSet>(self) -> Self {
        self.all_keys(S::keys())
    }

    /// Adds every component in `S` to the at-least-one group.
    #[must_use]
    pub fn one_of<S: ComponentSet>(self) -> Self {
        self.one_keys(S::keys())
    }

    /// Excludes every component in `S`.
    #[must_use]
    pub fn none_of<S: ComponentSet>(self) -> Self {
        self.none_keys(S::keys())
    }

    /// Requires every key given.
    #[must_use]
    pub fn all_keys(mut self, keys: impl IntoIterator<Item = ComponentKey>) -> Self {
        self.all.extend(keys);
        self
    }

    /// Adds every key given to the at-least-one group.
    #[must_use]
    pub fn one_keys(mut self, keys: impl IntoIterator<Item = ComponentKey>) -> Self {
        self.one.extend(keys);
        self
    }

    /// Excludes every key given.
    #[must_use]
    pub fn none_keys(mut self, keys: impl IntoIterator<Item = ComponentKey>) -> Self {
        self.none.extend(keys);
        self
    }

    /// Freezes the accumulated groups into a predicate.
    #[must_use]
    pub fn build(self) -> Predicate {
        Predicate {
            all: self.all.into_iter().collect(),
            one: self.one.into_iter().collect(),
            none: self.none.into_iter().collect(),
        }
    }
}

impl From<PredicateBuilder> for Predicate {
    fn from(builder: PredicateBuilder) -> Self {
        builder.build()
    }
}
