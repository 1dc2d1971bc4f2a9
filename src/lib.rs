//! Kindred - Entity-component storage with live query families
//!
//! This crate re-exports all layers of the Kindred system for convenient access.
//! For detailed documentation, see the individual layer crates.
//!
//! # Architecture
//!
//! ```text
//! Layer 1: kindred_storage    - Identifier registry, sparse-set stores,
//!                               predicates, families, registry, handles
//! Layer 0: kindred_foundation - Core types (EntityId, ComponentKey, Error)
//! ```

pub use kindred_foundation as foundation;
pub use kindred_storage as storage;
