//! Integration tests for entity lifecycle
//!
//! Tests creation, destruction, validity, and identifier recycling.

use kindred_foundation::{EntityId, ErrorKind};
use kindred_storage::{Predicate, RecyclePolicy, Registry, RegistryConfig};

#[derive(Debug, PartialEq)]
struct Health(i32);

struct Marker;

// =============================================================================
// Creation
// =============================================================================

#[test]
fn create_assigns_sequential_ids() {
    let mut registry = Registry::new();

    let ids: Vec<u32> = (0..4).map(|_| registry.create_entity().index()).collect();

    assert_eq!(ids, vec![0, 1, 2, 3]);
    assert_eq!(registry.entity_count(), 4);
}

#[test]
fn created_entity_is_valid_and_bare() {
    let mut registry = Registry::new();
    let e = registry.create_entity();

    assert!(registry.is_valid(e));
    assert!(registry.components_of(e).unwrap().is_empty());
}

#[test]
fn never_created_id_is_invalid() {
    let registry = Registry::new();

    assert!(!registry.is_valid(EntityId::new(0)));
    assert!(!registry.is_valid(EntityId::null()));
}

// =============================================================================
// Destruction
// =============================================================================

#[test]
fn destroy_invalidates() {
    let mut registry = Registry::new();
    let e = registry.create_entity();

    assert!(registry.destroy_entity(e));

    assert!(!registry.is_valid(e));
    assert_eq!(registry.entity_count(), 0);
}

#[test]
fn destroy_twice_is_noop() {
    let mut registry = Registry::new();
    let e = registry.create_entity();
    let other = registry.create_entity();

    assert!(registry.destroy_entity(e));
    assert!(!registry.destroy_entity(e));

    assert!(registry.is_valid(other));
    assert_eq!(registry.entity_count(), 1);
}

#[test]
fn destroy_detaches_every_component() {
    let mut registry = Registry::new();
    let e = registry.create_entity();
    registry.attach(e, Health(3)).unwrap();
    registry.attach(e, Marker).unwrap();

    registry.destroy_entity(e);

    assert_eq!(registry.components::<Health>().count(), 0);
    assert_eq!(registry.store::<Marker>().map(|s| s.len()), Some(0));
}

#[test]
fn field_calls_on_destroyed_entity_fail() {
    let mut registry = Registry::new();
    let e = registry.create_entity();
    registry.destroy_entity(e);

    for err in [
        registry.attach(e, Health(1)).map(|_| ()).unwrap_err(),
        registry.detach::<Health>(e).unwrap_err(),
        registry.get::<Health>(e).map(|_| ()).unwrap_err(),
        registry.has::<Health>(e).map(|_| ()).unwrap_err(),
        registry.remove::<Health>(e).map(|_| ()).unwrap_err(),
        registry.components_of(e).map(|_| ()).unwrap_err(),
    ] {
        assert!(matches!(err.kind, ErrorKind::EntityInvalid(id) if id == e));
    }
}

// =============================================================================
// Recycling
// =============================================================================

#[test]
fn fifo_recycles_oldest_first() {
    let mut registry = Registry::new();
    let a = registry.create_entity();
    let b = registry.create_entity();
    let _c = registry.create_entity();

    registry.destroy_entity(b);
    registry.destroy_entity(a);

    assert_eq!(registry.create_entity(), b);
    assert_eq!(registry.create_entity(), a);
    assert_eq!(registry.create_entity().index(), 3);
}

#[test]
fn lifo_recycles_newest_first() {
    let mut registry =
        Registry::with_config(RegistryConfig::default().with_recycle(RecyclePolicy::Lifo));
    let a = registry.create_entity();
    let b = registry.create_entity();

    registry.destroy_entity(a);
    registry.destroy_entity(b);

    assert_eq!(registry.create_entity(), b);
    assert_eq!(registry.create_entity(), a);
}

#[test]
fn recycled_id_has_no_components() {
    let mut registry = Registry::new();
    let e = registry.create_entity();
    registry.attach(e, Health(9)).unwrap();
    registry.destroy_entity(e);

    let again = registry.create_entity();

    assert_eq!(again, e);
    assert_eq!(registry.get::<Health>(again).unwrap(), None);
    assert!(!registry.has::<Marker>(again).unwrap());
}

#[test]
fn recycled_id_is_absent_from_non_vacuous_families() {
    let mut registry = Registry::new();
    let with_health = registry.query(&Predicate::all::<Health>().build());
    let either = registry.query(&Predicate::one_of::<(Health, Marker)>().build());
    let e = registry.create_entity();
    registry.attach(e, Health(1)).unwrap();
    registry.attach(e, Marker).unwrap();
    registry.destroy_entity(e);

    let again = registry.create_entity();

    assert!(!with_health.contains(again));
    assert!(!either.contains(again));
}

// =============================================================================
// Bulk Destruction
// =============================================================================

#[test]
fn destroy_all_empties_registry() {
    let mut registry = Registry::new();
    for _ in 0..10 {
        let e = registry.create_entity();
        registry.attach(e, Marker).unwrap();
    }

    assert_eq!(registry.destroy_all(), 10);
    assert_eq!(registry.entity_count(), 0);
    assert_eq!(registry.components::<Marker>().count(), 0);
}

#[test]
fn destroy_matching_spares_others() {
    let mut registry = Registry::new();
    let marked = registry.create_entity();
    registry.attach(marked, Marker).unwrap();
    let plain = registry.create_entity();

    assert_eq!(registry.destroy_matching(&Predicate::all::<Marker>().build()), 1);

    assert!(!registry.is_valid(marked));
    assert!(registry.is_valid(plain));
}

#[test]
fn capacity_config_does_not_limit_growth() {
    let mut registry = Registry::with_config(RegistryConfig::with_capacity(2));
    let ids: Vec<_> = (0..10).map(|_| registry.create_entity()).collect();

    for (i, e) in ids.iter().enumerate() {
        registry.attach(*e, Health(i32::try_from(i).unwrap())).unwrap();
    }

    assert_eq!(registry.get::<Health>(ids[9]).unwrap(), Some(&Health(9)));
    assert_eq!(registry.config().entity_capacity, 2);
}
