//! Integration tests for Layer 1: Storage
//!
//! Tests for the registry: entity lifecycle, components, families, and handles.

mod components;
mod entities;
mod handles;
