//! Component type descriptors.
//!
//! A [`ComponentKey`] is the runtime token standing in for a component type.
//! Stores and families are looked up by key, so every Rust type used as a
//! component maps to exactly one key for the life of the process.

use std::any::{Any, TypeId, type_name};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Marker for types that can be attached to entities.
///
/// Every `'static` type qualifies; there is no registration step.
pub trait Component: Any {}

impl<T: Any> Component for T {}

/// Runtime token identifying a component type.
///
/// Equality, hashing and ordering use the [`TypeId`] only; the type name is
/// carried for diagnostics.
#[derive(Copy, Clone)]
pub struct ComponentKey {
    id: TypeId,
    name: &'static str,
}

impl ComponentKey {
    /// Returns the key for component type `T`.
    #[must_use]
    pub fn of<T: Component>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    /// Returns the underlying type id.
    #[must_use]
    pub fn type_id(self) -> TypeId {
        self.id
    }

    /// Returns the fully qualified type name.
    #[must_use]
    pub fn name(self) -> &'static str {
        self.name
    }

    /// Returns the type name without its module path.
    #[must_use]
    pub fn short_name(self) -> &'static str {
        // Generic arguments may contain paths too; only strip the outer one.
        let outer = self.name.split('<').next().unwrap_or(self.name);
        match outer.rfind("::") {
            Some(pos) => &self.name[pos + 2..],
            None => self.name,
        }
    }

    /// Returns true if this key names component type `T`.
    #[must_use]
    pub fn is<T: Component>(self) -> bool {
        self.id == TypeId::of::<T>()
    }
}

impl PartialEq for ComponentKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ComponentKey {}

impl Hash for ComponentKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl PartialOrd for ComponentKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ComponentKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.id.cmp(&other.id)
    }
}

impl fmt::Debug for ComponentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ComponentKey({})", self.name)
    }
}

impl fmt::Display for ComponentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

/// A group of component types named together, e.g. `(Position, Velocity)`.
///
/// Implemented for the unit type and for tuples of up to eight components.
pub trait ComponentSet {
    /// Returns the keys of every type in the group, in declaration order.
    fn keys() -> Vec<ComponentKey>;
}

impl ComponentSet for () {
    fn keys() -> Vec<ComponentKey> {
        Vec::new()
    }
}

macro_rules! impl_component_set {
    ($($name:ident),+) => {
        impl<$($name: Component),+> ComponentSet for ($($name,)+) {
            fn keys() -> Vec<ComponentKey> {
                vec![$(ComponentKey::of::<$name>()),+]
            }
        }
    };
}

impl_component_set!(A);
impl_component_set!(A, B);
impl_component_set!(A, B, C);
impl_component_set!(A, B, C, D);
impl_component_set!(A, B, C, D, E);
impl_component_set!(A, B, C, D, E, F);
impl_component_set!(A, B, C, D, E, F, G);
impl_component_set!(A, B, C, D, E, F, G, H);
