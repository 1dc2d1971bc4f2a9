//! Integration tests for persistent collections
//!
//! Tests KeySet construction, set algebra, and structural sharing.

use kindred_foundation::{ComponentKey, KeySet};

struct A;
struct B;
struct C;

fn a() -> ComponentKey {
    ComponentKey::of::<A>()
}

fn b() -> ComponentKey {
    ComponentKey::of::<B>()
}

fn c() -> ComponentKey {
    ComponentKey::of::<C>()
}

// =============================================================================
// KeySet
// =============================================================================

#[test]
fn keyset_insert_is_persistent() {
    let empty = KeySet::new();
    let one = empty.insert(a());

    assert!(empty.is_empty());
    assert_eq!(one.len(), 1);
    assert!(one.contains(a()));
}

#[test]
fn keyset_ignores_duplicates() {
    let set: KeySet = [a(), b(), a()].into_iter().collect();
    assert_eq!(set.len(), 2);
}

#[test]
fn keyset_equality_ignores_insertion_order() {
    let left: KeySet = [a(), b()].into_iter().collect();
    let right: KeySet = [b(), a()].into_iter().collect();
    assert_eq!(left, right);
}

#[test]
fn keyset_union_and_subset() {
    let ab: KeySet = [a(), b()].into_iter().collect();
    let bc: KeySet = [b(), c()].into_iter().collect();
    let all = ab.union(&bc);

    assert_eq!(all.len(), 3);
    assert!(ab.is_subset(&all));
    assert!(!all.is_subset(&ab));
}

#[test]
fn keyset_remove() {
    let ab: KeySet = [a(), b()].into_iter().collect();
    let only_b = ab.remove(a());

    assert!(!only_b.contains(a()));
    assert!(ab.contains(a()));
}

#[test]
fn keyset_extend() {
    let mut set = KeySet::new();
    set.extend([c(), a()]);
    assert_eq!(set.iter().count(), 2);
}
