//! Integration tests for handles
//!
//! Tests managed and detached handles, conversion on destroy, and adoption of
//! detached entities back into a registry.

use kindred_foundation::ErrorKind;
use kindred_storage::{DetachedEntity, Handle, Predicate, Registry};

#[derive(Debug, Clone, PartialEq)]
struct Name(&'static str);

#[derive(Debug, Clone, PartialEq)]
struct Level(u8);

// =============================================================================
// Managed Handles
// =============================================================================

#[test]
fn managed_handle_delegates_to_registry() {
    let mut registry = Registry::new();
    let mut handle = Handle::spawn(&mut registry);

    handle.attach(&mut registry, Level(2)).unwrap();

    let id = handle.id().unwrap();
    assert!(handle.is_managed());
    assert_eq!(registry.get::<Level>(id).unwrap(), Some(&Level(2)));
    assert!(handle.has::<Level>(&registry).unwrap());
}

#[test]
fn managed_handle_shows_in_families() {
    let mut registry = Registry::new();
    let leveled = registry.query(&Predicate::all::<Level>().build());
    let mut handle = Handle::spawn(&mut registry);

    handle.attach(&mut registry, Level(1)).unwrap();

    assert_eq!(leveled.to_vec(), vec![handle.id().unwrap()]);
}

// =============================================================================
// Destroy Converts to Detached
// =============================================================================

#[test]
fn destroy_keeps_fields_and_frees_id() {
    let mut registry = Registry::new();
    let named = registry.query(&Predicate::all::<Name>().build());
    let mut handle = Handle::spawn(&mut registry);
    handle.attach(&mut registry, Name("ada")).unwrap();
    handle.attach(&mut registry, Level(4)).unwrap();
    let id = handle.id().unwrap();

    handle.destroy(&mut registry).unwrap();

    assert!(!handle.is_managed());
    assert!(named.is_empty());
    assert!(!registry.is_valid(id));
    assert_eq!(handle.get::<Name>(&registry).unwrap(), Some(&Name("ada")));
    assert_eq!(handle.get::<Level>(&registry).unwrap(), Some(&Level(4)));

    let reissued = registry.create_entity();
    assert_eq!(reissued, id);
    assert!(!registry.has::<Name>(reissued).unwrap());
    assert_eq!(handle.get::<Name>(&registry).unwrap(), Some(&Name("ada")));
}

#[test]
fn destroy_detached_is_noop() {
    let mut registry = Registry::new();
    let mut handle = Handle::detached();
    handle.attach(&mut registry, Level(1)).unwrap();

    handle.destroy(&mut registry).unwrap();

    assert!(handle.has::<Level>(&registry).unwrap());
}

#[test]
fn stale_managed_handle_reports_invalid() {
    let mut registry = Registry::new();
    let mut handle = Handle::spawn(&mut registry);
    registry.destroy_entity(handle.id().unwrap());

    assert!(!handle.is_valid(&registry));
    let err = handle.attach(&mut registry, Level(1)).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::EntityInvalid(_)));
}

// =============================================================================
// Detached Entities
// =============================================================================

#[test]
fn detached_handle_enforces_one_value_per_type() {
    let mut registry = Registry::new();
    let mut handle = Handle::detached();
    handle.attach(&mut registry, Level(1)).unwrap();

    let err = handle.attach(&mut registry, Level(2)).unwrap_err();

    assert!(matches!(err.kind, ErrorKind::DuplicateAttribute { .. }));
    assert_eq!(registry.entity_count(), 0);
}

#[test]
fn detached_handle_matches_predicates() {
    let registry = Registry::new();
    let mut bag = DetachedEntity::new();
    bag.attach(Name("x")).unwrap();
    let handle = Handle::from(bag);

    assert!(
        handle
            .matches(&registry, &Predicate::all::<Name>().none::<Level>().build())
            .unwrap()
    );
    assert!(!handle.matches(&registry, &Predicate::one::<Level>().build()).unwrap());
}

#[test]
fn take_entity_then_adopt_round_trips_membership() {
    let mut registry = Registry::new();
    let named = registry.query(&Predicate::all::<Name>().build());
    let e = registry.create_entity();
    registry.attach(e, Name("bo")).unwrap();

    let bag = registry.take_entity(e).unwrap();
    assert!(named.is_empty());
    assert_eq!(bag.len(), 1);

    let back = bag.adopt_into(&mut registry).unwrap();
    assert_eq!(named.to_vec(), vec![back]);
    assert_eq!(registry.get::<Name>(back).unwrap(), Some(&Name("bo")));
}

#[test]
fn adopt_turns_detached_into_managed() {
    let mut registry = Registry::new();
    let mut handle = Handle::detached();
    handle.attach(&mut registry, Name("cy")).unwrap();
    handle.attach(&mut registry, Level(9)).unwrap();

    let id = handle.adopt(&mut registry).unwrap();

    assert_eq!(handle.id(), Some(id));
    assert_eq!(registry.components_of(id).unwrap().len(), 2);
}
