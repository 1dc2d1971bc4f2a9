//! Integration tests for component storage
//!
//! Tests attach/detach/get/has through the registry, including the untyped
//! paths and in-place mutation.

use kindred_foundation::{ComponentKey, ErrorKind, KeySet};
use kindred_storage::{DetachedField, Registry};

#[derive(Debug, Clone, PartialEq)]
struct Position {
    x: f32,
    y: f32,
}

#[derive(Debug, Clone, PartialEq)]
struct Name(String);

#[derive(Debug, Clone, Copy, PartialEq)]
struct Tag;

// =============================================================================
// Attach and Get
// =============================================================================

#[test]
fn attach_returns_stored_value() {
    let mut registry = Registry::new();
    let e = registry.create_entity();

    let stored = registry.attach(e, Position { x: 1.0, y: 2.0 }).unwrap();
    stored.x = 5.0;

    assert_eq!(
        registry.get::<Position>(e).unwrap(),
        Some(&Position { x: 5.0, y: 2.0 })
    );
}

#[test]
fn get_absent_component_is_none() {
    let mut registry = Registry::new();
    let e = registry.create_entity();

    assert_eq!(registry.get::<Name>(e).unwrap(), None);
    assert!(!registry.has::<Name>(e).unwrap());
}

#[test]
fn attach_creates_store_once() {
    let mut registry = Registry::new();
    let a = registry.create_entity();
    let b = registry.create_entity();

    registry.attach(a, Tag).unwrap();
    registry.attach(b, Tag).unwrap();

    assert_eq!(registry.store_count(), 1);
    assert_eq!(registry.store::<Tag>().map(|s| s.len()), Some(2));
}

#[test]
fn attach_duplicate_fails() {
    let mut registry = Registry::new();
    let e = registry.create_entity();
    registry.attach(e, Name("first".into())).unwrap();

    let err = registry.attach(e, Name("second".into())).unwrap_err();

    assert!(matches!(
        err.kind,
        ErrorKind::DuplicateAttribute { entity, component }
            if entity == e && component.is::<Name>()
    ));
    assert_eq!(registry.get::<Name>(e).unwrap(), Some(&Name("first".into())));
}

#[test]
fn values_survive_swap_remove_of_neighbours() {
    let mut registry = Registry::new();
    let ids: Vec<_> = (0..5).map(|_| registry.create_entity()).collect();
    for (i, e) in ids.iter().enumerate() {
        registry.attach(*e, Name(format!("n{i}"))).unwrap();
    }

    registry.detach::<Name>(ids[0]).unwrap();
    registry.detach::<Name>(ids[2]).unwrap();

    assert_eq!(registry.get::<Name>(ids[1]).unwrap(), Some(&Name("n1".into())));
    assert_eq!(registry.get::<Name>(ids[3]).unwrap(), Some(&Name("n3".into())));
    assert_eq!(registry.get::<Name>(ids[4]).unwrap(), Some(&Name("n4".into())));
    assert_eq!(registry.components::<Name>().count(), 3);
}

// =============================================================================
// Detach and Remove
// =============================================================================

#[test]
fn detach_twice_equals_once() {
    let mut registry = Registry::new();
    let e = registry.create_entity();
    registry.attach(e, Tag).unwrap();

    registry.detach::<Tag>(e).unwrap();
    let after_once = registry.components_of(e).unwrap();
    registry.detach::<Tag>(e).unwrap();

    assert_eq!(registry.components_of(e).unwrap(), after_once);
}

#[test]
fn detach_never_attached_type_is_noop() {
    let mut registry = Registry::new();
    let e = registry.create_entity();

    registry.detach::<Position>(e).unwrap();

    assert_eq!(registry.store_count(), 0);
}

#[test]
fn remove_returns_value() {
    let mut registry = Registry::new();
    let e = registry.create_entity();
    registry.attach(e, Name("gone".into())).unwrap();

    assert_eq!(registry.remove::<Name>(e).unwrap(), Name("gone".into()));
    assert!(!registry.has::<Name>(e).unwrap());
}

#[test]
fn remove_absent_reports_not_found() {
    let mut registry = Registry::new();
    let e = registry.create_entity();

    let err = registry.remove::<Name>(e).unwrap_err();

    assert!(matches!(err.kind, ErrorKind::AttributeNotFound { .. }));
    assert_eq!(err.context.and_then(|c| c.operation), Some("remove"));
}

#[test]
fn strip_all_except_detaches_the_rest() {
    let mut registry = Registry::new();
    let e = registry.create_entity();
    registry.attach(e, Tag).unwrap();
    registry.attach(e, Name("keep".into())).unwrap();
    registry.attach(e, Position { x: 0.0, y: 0.0 }).unwrap();

    let stripped = registry
        .strip_all_except(e, &[ComponentKey::of::<Name>()])
        .unwrap();

    assert_eq!(stripped, 2);
    assert!(registry.has::<Name>(e).unwrap());
    assert!(!registry.has::<Tag>(e).unwrap());
}

// =============================================================================
// Mutation
// =============================================================================

#[test]
fn get_mut_updates_in_place() {
    let mut registry = Registry::new();
    let e = registry.create_entity();
    registry.attach(e, Position { x: 0.0, y: 0.0 }).unwrap();

    if let Some(p) = registry.get_mut::<Position>(e).unwrap() {
        p.y = 3.0;
    }

    assert_eq!(registry.get::<Position>(e).unwrap().map(|p| p.y), Some(3.0));
}

// =============================================================================
// Untyped Access
// =============================================================================

#[test]
fn components_of_lists_attached_types() {
    let mut registry = Registry::new();
    let e = registry.create_entity();
    registry.attach(e, Tag).unwrap();
    registry.attach(e, Name("x".into())).unwrap();

    let expected: KeySet = [ComponentKey::of::<Tag>(), ComponentKey::of::<Name>()]
        .into_iter()
        .collect();
    assert_eq!(registry.components_of(e).unwrap(), expected);
}

#[test]
fn get_untyped_downcasts() {
    let mut registry = Registry::new();
    let e = registry.create_entity();
    registry.attach(e, Name("boxed".into())).unwrap();

    let value = registry
        .get_untyped(e, ComponentKey::of::<Name>())
        .unwrap()
        .and_then(|v| v.downcast_ref::<Name>());

    assert_eq!(value, Some(&Name("boxed".into())));
}

#[test]
fn attach_field_into_existing_store() {
    let mut registry = Registry::new();
    let a = registry.create_entity();
    let b = registry.create_entity();
    registry.attach(a, Tag).unwrap();

    registry
        .attach_field(b, Box::new(DetachedField::new(Tag)))
        .unwrap();

    assert!(registry.has::<Tag>(b).unwrap());
    let err = registry
        .attach_field(b, Box::new(DetachedField::new(Tag)))
        .unwrap_err();
    assert!(matches!(err.kind, ErrorKind::DuplicateAttribute { .. }));
}

#[test]
fn attach_field_creates_missing_store() {
    let mut registry = Registry::new();
    let e = registry.create_entity();

    registry
        .attach_field(e, Box::new(DetachedField::new(Position { x: 1.0, y: 1.0 })))
        .unwrap();

    assert_eq!(registry.store_count(), 1);
    assert!(registry.has_key(e, ComponentKey::of::<Position>()).unwrap());
}
