//! Incrementally maintained query results.
//!
//! A [`FamilyIndex`] exists for every distinct [`Predicate`] ever queried. It
//! keeps its own presence flags for each referenced component type and
//! updates its member list from attach/detach events, so membership never
//! requires a scan of the stores after the initial backfill.
//!
//! Members are removed with swap-remove: iteration order is insertion order
//! until the first removal and unspecified afterwards.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use kindred_foundation::{ComponentKey, EntityId, KeySet};

use crate::component::ChangeSink;
use crate::predicate::Predicate;

const ABSENT: usize = usize::MAX;

/// Identifies a family within its registry.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FamilyId(usize);

impl FamilyId {
    /// Creates a family id from a table position.
    #[must_use]
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    /// Returns the table position.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

/// Dense member list with O(1) membership and removal.
#[derive(Debug, Default)]
struct Members {
    ids: Vec<EntityId>,
    /// Entity slot -> position in `ids`, or `ABSENT`.
    positions: Vec<usize>,
}

impl Members {
    fn contains(&self, id: EntityId) -> bool {
        self.positions
            .get(id.slot())
            .is_some_and(|&pos| pos != ABSENT)
    }

    fn insert(&mut self, id: EntityId) -> bool {
        if self.contains(id) {
            return false;
        }
        let slot = id.slot();
        if slot >= self.positions.len() {
            self.positions.resize(slot + 1, ABSENT);
        }
        self.positions[slot] = self.ids.len();
        self.ids.push(id);
        true
    }

    fn remove(&mut self, id: EntityId) -> bool {
        let Some(&pos) = self.positions.get(id.slot()) else {
            return false;
        };
        if pos == ABSENT {
            return false;
        }

        let last = self.ids.len() - 1;
        if pos != last {
            let moved = self.ids[last];
            self.positions[moved.slot()] = pos;
        }
        self.positions[id.slot()] = ABSENT;
        self.ids.swap_remove(pos);
        true
    }
}

/// Live, read-only view of a family's members.
///
/// Cloning is cheap and every clone observes the same list. The list changes
/// only when the owning registry attaches, detaches or destroys; the methods
/// here read the current state at call time.
#[derive(Clone)]
pub struct Family {
    members: Rc<RefCell<Members>>,
}

impl Family {
    /// Returns the number of members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.borrow().ids.len()
    }

    /// Returns true if there are no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.borrow().ids.is_empty()
    }

    /// Returns true if `id` is a member.
    #[must_use]
    pub fn contains(&self, id: EntityId) -> bool {
        self.members.borrow().contains(id)
    }

    /// Returns the member at `index` in the current order.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<EntityId> {
        self.members.borrow().ids.get(index).copied()
    }

    /// Copies the current members out.
    #[must_use]
    pub fn to_vec(&self) -> Vec<EntityId> {
        self.members.borrow().ids.clone()
    }

    /// Iterates over a snapshot of the current members.
    ///
    /// The snapshot is unaffected by changes made while iterating, so it is
    /// safe to destroy or modify entities inside the loop.
    #[must_use]
    pub fn iter(&self) -> std::vec::IntoIter<EntityId> {
        self.to_vec().into_iter()
    }

    /// Returns true if both views observe the same family.
    #[must_use]
    pub fn same_family(&self, other: &Family) -> bool {
        Rc::ptr_eq(&self.members, &other.members)
    }
}

impl fmt::Debug for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.members.borrow().ids.iter()).finish()
    }
}

impl IntoIterator for &Family {
    type Item = EntityId;
    type IntoIter = std::vec::IntoIter<EntityId>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Presence flags for one component type, indexed by entity slot.
#[derive(Debug)]
struct FlagColumn {
    key: ComponentKey,
    present: Vec<bool>,
}

impl FlagColumn {
    fn new(key: ComponentKey, slots: usize) -> Self {
        Self {
            key,
            present: vec![false; slots],
        }
    }

    fn get(&self, slot: usize) -> bool {
        self.present.get(slot).copied().unwrap_or(false)
    }

    fn set(&mut self, slot: usize, value: bool) {
        if slot >= self.present.len() {
            if !value {
                return;
            }
            self.present.resize(slot + 1, false);
        }
        self.present[slot] = value;
    }

    fn grow(&mut self, slots: usize) {
        if slots > self.present.len() {
            self.present.resize(slots, false);
        }
    }
}

/// Sets the flag for `key` in `columns`; returns whether the group has `key`.
fn set_flag(columns: &mut [FlagColumn], key: ComponentKey, slot: usize, value: bool) -> bool {
    match columns.iter_mut().find(|c| c.key == key) {
        Some(column) => {
            column.set(slot, value);
            true
        }
        None => false,
    }
}

/// The incremental index behind one predicate.
#[derive(Debug)]
pub struct FamilyIndex {
    predicate: Predicate,
    all: Vec<FlagColumn>,
    one: Vec<FlagColumn>,
    none: Vec<FlagColumn>,
    members: Rc<RefCell<Members>>,
}

impl FamilyIndex {
    /// Creates an empty index with flags covering `slots` identifiers.
    #[must_use]
    pub fn new(predicate: Predicate, slots: usize) -> Self {
        let columns = |keys: &KeySet| {
            keys.iter()
                .map(|key| FlagColumn::new(key, slots))
                .collect::<Vec<_>>()
        };
        Self {
            all: columns(predicate.required()),
            one: columns(predicate.alternatives()),
            none: columns(predicate.excluded()),
            predicate,
            members: Rc::new(RefCell::new(Members::default())),
        }
    }

    /// Returns the predicate this index maintains.
    #[must_use]
    pub fn predicate(&self) -> &Predicate {
        &self.predicate
    }

    /// Returns a live view of the members.
    #[must_use]
    pub fn view(&self) -> Family {
        Family {
            members: Rc::clone(&self.members),
        }
    }

    /// Returns the number of members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.borrow().ids.len()
    }

    /// Returns true if there are no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true if `id` is a member.
    #[must_use]
    pub fn contains(&self, id: EntityId) -> bool {
        self.members.borrow().contains(id)
    }

    /// Evaluates the predicate from cached flags.
    fn evaluate(&self, slot: usize) -> bool {
        if self.none.iter().any(|c| c.get(slot)) {
            return false;
        }
        if !self.all.iter().all(|c| c.get(slot)) {
            return false;
        }
        self.one.is_empty() || self.one.iter().any(|c| c.get(slot))
    }

    fn add(&mut self, id: EntityId) {
        if self.members.borrow_mut().insert(id) {
            tracing::trace!(entity = %id, family = %self.predicate, "joined family");
        }
    }

    fn remove(&mut self, id: EntityId) {
        if self.members.borrow_mut().remove(id) {
            tracing::trace!(entity = %id, family = %self.predicate, "left family");
        }
    }

    /// A new identifier was allocated (fresh or recycled).
    ///
    /// Grows the flag columns and admits the entity if the predicate accepts
    /// an entity holding nothing.
    pub fn on_entity_added(&mut self, id: EntityId) {
        let slots = id.slot() + 1;
        for column in self.all.iter_mut().chain(&mut self.one).chain(&mut self.none) {
            column.grow(slots);
        }
        if self.predicate.matches_empty() {
            self.add(id);
        }
    }

    /// `key` was attached to `id`.
    pub fn on_attach(&mut self, key: ComponentKey, id: EntityId) {
        let slot = id.slot();
        set_flag(&mut self.all, key, slot, true);
        set_flag(&mut self.one, key, slot, true);
        let excluded = set_flag(&mut self.none, key, slot, true);

        let member = self.contains(id);
        if !member && self.evaluate(slot) {
            self.add(id);
        } else if member && excluded {
            self.remove(id);
        }
    }

    /// `key` was detached from `id`.
    pub fn on_detach(&mut self, key: ComponentKey, id: EntityId) {
        let slot = id.slot();
        let required = set_flag(&mut self.all, key, slot, false);
        let alternative = set_flag(&mut self.one, key, slot, false);
        let excluded = set_flag(&mut self.none, key, slot, false);

        if self.contains(id) {
            if required || (alternative && !self.one.iter().any(|c| c.get(slot))) {
                self.remove(id);
            }
        } else if excluded && self.evaluate(slot) {
            self.add(id);
        }
    }

    /// `id` is being destroyed; its components have already been detached.
    pub fn on_entity_destroyed(&mut self, id: EntityId) {
        let slot = id.slot();
        for column in self.all.iter_mut().chain(&mut self.one).chain(&mut self.none) {
            column.set(slot, false);
        }
        self.remove(id);
    }

    /// Backfills membership from current store contents.
    ///
    /// Replays an attach for every referenced component each live entity
    /// holds, then admits entities that match while holding none of them.
    pub fn initialize(
        &mut self,
        live: impl IntoIterator<Item = EntityId>,
        has: impl Fn(ComponentKey, EntityId) -> bool,
    ) {
        let referenced = self.predicate.referenced();
        for id in live {
            for key in referenced.iter() {
                if has(key, id) {
                    self.on_attach(key, id);
                }
            }
            if !self.contains(id) && self.evaluate(id.slot()) {
                self.add(id);
            }
        }
    }
}

/// All family indexes of a registry, keyed by predicate.
#[derive(Debug, Default)]
pub struct FamilyTable {
    indexes: Vec<FamilyIndex>,
    by_predicate: HashMap<Predicate, FamilyId>,
}

impl FamilyTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of families.
    #[must_use]
    pub fn len(&self) -> usize {
        self.indexes.len()
    }

    /// Returns true if no family has been created.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.indexes.is_empty()
    }

    /// Finds the family for an equal predicate.
    #[must_use]
    pub fn lookup(&self, predicate: &Predicate) -> Option<FamilyId> {
        self.by_predicate.get(predicate).copied()
    }

    /// Returns the id the next inserted index will receive.
    #[must_use]
    pub fn next_id(&self) -> FamilyId {
        FamilyId(self.indexes.len())
    }

    /// Adds an index, returning its id.
    pub fn insert(&mut self, index: FamilyIndex) -> FamilyId {
        let id = self.next_id();
        self.by_predicate.insert(index.predicate().clone(), id);
        self.indexes.push(index);
        id
    }

    /// Returns an index by id.
    #[must_use]
    pub fn get(&self, id: FamilyId) -> Option<&FamilyIndex> {
        self.indexes.get(id.0)
    }

    /// Families whose predicate mentions `key`.
    pub fn referencing(&self, key: ComponentKey) -> impl Iterator<Item = FamilyId> + '_ {
        self.indexes
            .iter()
            .enumerate()
            .filter(move |(_, index)| index.predicate().references(key))
            .map(|(i, _)| FamilyId(i))
    }

    /// Iterates over every index.
    pub fn iter(&self) -> impl Iterator<Item = &FamilyIndex> + '_ {
        self.indexes.iter()
    }

    /// Forwards a new identifier to every index.
    pub fn on_entity_added(&mut self, id: EntityId) {
        for index in &mut self.indexes {
            index.on_entity_added(id);
        }
    }

    /// Forwards a destroyed identifier to every index.
    pub fn on_entity_destroyed(&mut self, id: EntityId) {
        for index in &mut self.indexes {
            index.on_entity_destroyed(id);
        }
    }
}

impl ChangeSink for FamilyTable {
    fn attached(&mut self, subscribers: &[FamilyId], key: ComponentKey, id: EntityId) {
        for family in subscribers {
            if let Some(index) = self.indexes.get_mut(family.0) {
                index.on_attach(key, id);
            }
        }
    }

    fn detached(&mut self, subscribers: &[FamilyId], key: ComponentKey, id: EntityId) {
        for family in subscribers {
            if let Some(index) = self.indexes.get_mut(family.0) {
                index.on_detach(key, id);
            }
        }
    }
}
