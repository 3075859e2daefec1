//! Per-entity behavior lists.

use thicket_world::entity::EntityId;
use thicket_world::monster::MonsterDef;
use tracing::trace;

use super::{Behavior, BehaviorKind, Trigger};
use crate::context::SimContext;

// ---------------------------------------------------------------------------
// BehaviorUnit
// ---------------------------------------------------------------------------

/// A behavior bound to the entity it acts for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BehaviorUnit {
    behavior: Behavior,
    owner: Option<EntityId>,
}

impl BehaviorUnit {
    /// An unbound unit.
    pub fn new(behavior: Behavior) -> Self {
        Self {
            behavior,
            owner: None,
        }
    }

    /// Bind this unit to `owner`.
    ///
    /// # Panics
    ///
    /// Panics if the unit is already bound. A unit belongs to exactly one
    /// entity for its whole life.
    pub fn bind(&mut self, owner: EntityId) {
        if let Some(existing) = self.owner {
            panic!(
                "{:?} behavior is already bound to {existing}, cannot rebind to {owner}",
                self.behavior.kind()
            );
        }
        self.owner = Some(owner);
    }

    pub fn owner(&self) -> Option<EntityId> {
        self.owner
    }

    pub fn behavior(&self) -> &Behavior {
        &self.behavior
    }

    pub fn kind(&self) -> BehaviorKind {
        self.behavior.kind()
    }
}

// ---------------------------------------------------------------------------
// BehaviorCollection
// ---------------------------------------------------------------------------

/// Result of [`BehaviorCollection::add`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    Added,
    /// The owner's definition cannot carry this behavior.
    Ineligible,
    /// A behavior of the same kind is already present.
    Duplicate,
}

#[derive(Debug, Clone)]
struct Entry {
    serial: u32,
    unit: BehaviorUnit,
}

/// The ordered behaviors of one entity, at most one per [`BehaviorKind`].
#[derive(Debug, Clone)]
pub struct BehaviorCollection {
    owner: EntityId,
    entries: Vec<Entry>,
    next_serial: u32,
}

impl BehaviorCollection {
    pub fn new(owner: EntityId) -> Self {
        Self {
            owner,
            entries: Vec::new(),
            next_serial: 0,
        }
    }

    pub fn owner(&self) -> EntityId {
        self.owner
    }

    /// Add `behavior` for an owner of type `def`.
    pub fn add(&mut self, behavior: Behavior, def: &MonsterDef) -> AddOutcome {
        self.add_unit(BehaviorUnit::new(behavior), def)
    }

    /// Add a prebuilt unit, binding it to this collection's owner.
    ///
    /// # Panics
    ///
    /// Panics if `unit` was already bound to an entity.
    pub fn add_unit(&mut self, mut unit: BehaviorUnit, def: &MonsterDef) -> AddOutcome {
        let kind = unit.kind();
        if !unit.behavior.is_supported_by(def) {
            trace!(entity = %self.owner, ?kind, def = %def.name, "behavior not supported");
            return AddOutcome::Ineligible;
        }
        if self.has(kind) {
            trace!(entity = %self.owner, ?kind, "behavior already present");
            return AddOutcome::Duplicate;
        }
        unit.bind(self.owner);
        let serial = self.next_serial;
        self.next_serial = self.next_serial.wrapping_add(1);
        self.entries.push(Entry { serial, unit });
        AddOutcome::Added
    }

    /// Remove every unit of `kind`, scanning from the end. Returns how many
    /// were removed.
    pub fn remove(&mut self, kind: BehaviorKind) -> usize {
        let mut removed = 0;
        for index in (0..self.entries.len()).rev() {
            if self.entries[index].unit.kind() == kind {
                self.entries.remove(index);
                removed += 1;
            }
        }
        removed
    }

    pub fn has(&self, kind: BehaviorKind) -> bool {
        self.entries.iter().any(|e| e.unit.kind() == kind)
    }

    pub fn get(&self, kind: BehaviorKind) -> Option<&BehaviorUnit> {
        self.entries
            .iter()
            .map(|e| &e.unit)
            .find(|unit| unit.kind() == kind)
    }

    /// Add `behavior` if `include`, otherwise remove its kind. Returns whether
    /// the kind is present afterwards.
    pub fn set(&mut self, behavior: Behavior, include: bool, def: &MonsterDef) -> bool {
        if include {
            self.add(behavior, def);
        } else {
            self.remove(behavior.kind());
        }
        self.has(behavior.kind())
    }

    /// Run every unit regardless of trigger. Returns how many ran.
    pub fn perform_all(&mut self, ctx: &mut SimContext<'_>) -> usize {
        self.dispatch(None, ctx)
    }

    /// Run every unit listening for `trigger`. Returns how many ran.
    pub fn perform(&mut self, trigger: Trigger, ctx: &mut SimContext<'_>) -> usize {
        self.dispatch(Some(trigger), ctx)
    }

    fn dispatch(&mut self, trigger: Option<Trigger>, ctx: &mut SimContext<'_>) -> usize {
        let pass: Vec<(u32, Behavior)> = self
            .entries
            .iter()
            .filter(|e| trigger.map_or(true, |t| e.unit.kind().responds_to(t)))
            .map(|e| (e.serial, e.unit.behavior))
            .collect();

        let mut ran = 0;
        for (serial, behavior) in pass {
            if !self.entries.iter().any(|e| e.serial == serial) {
                continue;
            }
            behavior.perform(self.owner, self, ctx);
            ran += 1;
        }
        ran
    }

    /// Kinds present, in insertion order.
    pub fn kinds(&self) -> Vec<BehaviorKind> {
        self.entries.iter().map(|e| e.unit.kind()).collect()
    }

    pub fn units(&self) -> impl Iterator<Item = &BehaviorUnit> {
        self.entries.iter().map(|e| &e.unit)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
