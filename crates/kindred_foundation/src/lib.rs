//! Core types and persistent collections for Kindred.
//!
//! This crate provides:
//! - [`EntityId`] - Recyclable entity identifiers
//! - [`ComponentKey`] - Runtime tokens for component types
//! - [`Error`] - Rich error types with context
//! - Persistent collections ([`KeySet`])

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod collections;
pub mod entity;
pub mod error;
pub mod types;

pub use collections::KeySet;
pub use entity::EntityId;
pub use error::{Error, ErrorContext, ErrorKind, Result};
pub use types::{Component, ComponentKey, ComponentSet};
