//! Entity-component storage and live queries for Kindred.
//!
//! This crate provides:
//! - [`EntityRegistry`] - Identifier allocation with recycling
//! - [`ComponentStore`] - Sparse-set storage, one per component type
//! - [`Predicate`] - Membership rules over component types
//! - [`Family`] - Incrementally maintained query results
//! - [`Registry`] - The coordinator tying them together
//! - [`Handle`] - Entities that keep their fields after destruction

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod component;
pub mod config;
pub mod entity;
pub mod family;
pub mod handle;
pub mod predicate;
pub mod registry;

pub use component::{ChangeSink, ComponentStore, ErasedStore};
pub use config::{RecyclePolicy, RegistryConfig};
pub use entity::EntityRegistry;
pub use family::{Family, FamilyId, FamilyIndex, FamilyTable};
pub use handle::{AnyField, DetachedEntity, DetachedField, FieldBox, Handle};
pub use predicate::{Predicate, PredicateBuilder};
pub use registry::Registry;
