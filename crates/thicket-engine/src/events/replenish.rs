//! Slot-based fruit replenishment.
//!
//! Every configured fruit kind owns a fixed row of slots, one per fruit the
//! kind may have alive at once. On each tick the slot `tick % quantity` of
//! every distribution entry gets one attempt at growing a fruit. A slot stays
//! taken until the fruit grown from it is removed from the world, which the
//! event learns about through its removal mailbox.
//!
//! Placement is random within the entry's spawn area but never on a tile
//! that already holds an item, and never within one room size of the player
//! on both axes, so fruit does not appear under the player's nose.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use thicket_world::entity::EntityId;
use thicket_world::tile::TileRect;
use thicket_world::world::{Entity, FruitKind, RemovalSubscription, World};
use tracing::{debug, trace};

use crate::clock::ClockEvent;
use crate::context::SimContext;

/// Name under which [`ReplenishFruit`] registers with the clock.
pub const REPLENISH_FRUIT_EVENT: &str = "replenish_fruit";

/// A tick skips replenishment when `rng.test(mask)` hits: with the default
/// mask of 3, fruit grows on three ticks out of four.
pub const DEFAULT_FRUIT_SKIP_MASK: u32 = 3;

// ---------------------------------------------------------------------------
// Distribution
// ---------------------------------------------------------------------------

/// One line of the fruit distribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FruitSpec {
    pub kind: FruitKind,
    /// Maximum number of this entry's fruit alive at once.
    pub quantity: u32,
    /// Energy each fruit restores.
    pub energy: u32,
    /// Where the fruit may grow.
    pub area: TileRect,
}

/// Problems found when validating a [`FruitDistribution`].
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DistributionError {
    #[error("fruit distribution has no entries")]
    Empty,

    #[error("fruit entry {index} ({kind}) has zero quantity")]
    ZeroQuantity { index: usize, kind: FruitKind },

    #[error("fruit entry {index} ({kind}) has an empty spawn area")]
    EmptyArea { index: usize, kind: FruitKind },
}

/// The set of fruit the world keeps topped up.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FruitDistribution {
    entries: Vec<FruitSpec>,
}

impl FruitDistribution {
    pub fn new(entries: Vec<FruitSpec>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[FruitSpec] {
        &self.entries
    }

    pub fn validate(&self) -> Result<(), DistributionError> {
        if self.entries.is_empty() {
            return Err(DistributionError::Empty);
        }
        for (index, spec) in self.entries.iter().enumerate() {
            if spec.quantity == 0 {
                return Err(DistributionError::ZeroQuantity {
                    index,
                    kind: spec.kind,
                });
            }
            if spec.area.is_empty() {
                return Err(DistributionError::EmptyArea {
                    index,
                    kind: spec.kind,
                });
            }
        }
        Ok(())
    }

    /// Largest quantity configured for each kind.
    fn capacities(&self) -> HashMap<FruitKind, u32> {
        let mut caps: HashMap<FruitKind, u32> = HashMap::new();
        for spec in &self.entries {
            let cap = caps.entry(spec.kind).or_default();
            *cap = (*cap).max(spec.quantity);
        }
        caps
    }
}

// ---------------------------------------------------------------------------
// Slot population
// ---------------------------------------------------------------------------

/// Occupancy of one fruit kind's slots.
#[derive(Debug)]
struct SlotPopulation {
    occupied: Vec<bool>,
    /// The last fruit released from each slot, until the slot is refilled.
    last_released: Vec<Option<EntityId>>,
}

impl SlotPopulation {
    fn new(capacity: u32) -> Self {
        Self {
            occupied: vec![false; capacity as usize],
            last_released: vec![None; capacity as usize],
        }
    }
}

// ---------------------------------------------------------------------------
// ReplenishFruit
// ---------------------------------------------------------------------------

/// Clock event that keeps the configured fruit population topped up.
#[derive(Debug)]
pub struct ReplenishFruit {
    distribution: FruitDistribution,
    populations: HashMap<FruitKind, SlotPopulation>,
    /// Live fruit grown by this event and the slot each one holds.
    spawned: HashMap<EntityId, (FruitKind, usize)>,
    /// Fruit already released, kept while their slot stays empty so a second
    /// release of the same fruit is caught. Holds at most one entry per slot.
    released: HashMap<EntityId, (FruitKind, usize)>,
    /// Fruit released directly whose removal notice is still in the mailbox.
    acknowledged: HashSet<EntityId>,
    removals: Option<RemovalSubscription>,
    skip_mask: u32,
}

impl ReplenishFruit {
    /// Build the slot populations and subscribe to entity removals.
    pub fn new(distribution: FruitDistribution, world: &mut World) -> Result<Self, DistributionError> {
        distribution.validate()?;
        let populations = distribution
            .capacities()
            .into_iter()
            .map(|(kind, cap)| (kind, SlotPopulation::new(cap)))
            .collect();
        Ok(Self {
            distribution,
            populations,
            spawned: HashMap::new(),
            released: HashMap::new(),
            acknowledged: HashSet::new(),
            removals: Some(world.subscribe_removals()),
            skip_mask: DEFAULT_FRUIT_SKIP_MASK,
        })
    }

    /// Replace the mask used for the per-tick skip test.
    pub fn with_skip_mask(mut self, mask: u32) -> Self {
        self.skip_mask = mask;
        self
    }

    pub fn distribution(&self) -> &FruitDistribution {
        &self.distribution
    }

    /// Whether `slot` of `kind` currently holds a live fruit.
    pub fn is_occupied(&self, kind: FruitKind, slot: usize) -> bool {
        self.populations
            .get(&kind)
            .and_then(|p| p.occupied.get(slot))
            .copied()
            .unwrap_or(false)
    }

    /// Number of occupied slots of `kind`.
    pub fn occupied_slots(&self, kind: FruitKind) -> usize {
        self.populations
            .get(&kind)
            .map_or(0, |p| p.occupied.iter().filter(|&&o| o).count())
    }

    /// Number of live fruit grown by this event.
    pub fn tracked_count(&self) -> usize {
        self.spawned.len()
    }

    /// The slot held by `fruit`, if this event grew it and it is still alive.
    pub fn slot_of(&self, fruit: EntityId) -> Option<(FruitKind, usize)> {
        self.spawned.get(&fruit).copied()
    }

    /// Apply every removal notice posted since the last call.
    pub fn sync_removals(&mut self, world: &mut World) {
        let removed = match &self.removals {
            Some(sub) => world.take_removals(sub),
            None => return,
        };
        for entity in &removed {
            if self.acknowledged.remove(&entity.id) {
                trace!(entity = %entity.id, "removal already applied");
                continue;
            }
            self.release(entity);
        }
    }

    /// Release the slot held by a removed fruit right away, without waiting
    /// for the next update. The matching notice in the removal mailbox is
    /// then consumed silently.
    ///
    /// Returns `true` if a slot was released. Entities that are not fruit, or
    /// fruit this event did not grow, are ignored.
    ///
    /// # Panics
    ///
    /// Panics if the same fruit is released twice, or if its slot is already
    /// empty: either means the slot bookkeeping is corrupt.
    pub fn on_entity_removed(&mut self, removed: &Entity) -> bool {
        let released = self.release(removed);
        if released && self.removals.is_some() {
            self.acknowledged.insert(removed.id);
        }
        released
    }

    fn release(&mut self, removed: &Entity) -> bool {
        let Some(fruit) = removed.as_fruit() else {
            return false;
        };
        let id = removed.id;

        if let Some((kind, slot)) = self.spawned.remove(&id) {
            let population = self.population_mut(kind);
            assert!(
                population.occupied[slot],
                "fruit slot {kind}[{slot}] released by {id} while already empty"
            );
            population.occupied[slot] = false;
            if let Some(previous) = population.last_released[slot].replace(id) {
                self.released.remove(&previous);
            }
            self.released.insert(id, (kind, slot));
            debug!(entity = %id, %kind, slot, "fruit slot released");
            return true;
        }

        if let Some((kind, slot)) = self.released.get(&id) {
            panic!("fruit {id} released twice from slot {kind}[{slot}]");
        }
        trace!(entity = %id, kind = %fruit.kind, "untracked fruit removed");
        false
    }

    fn population_mut(&mut self, kind: FruitKind) -> &mut SlotPopulation {
        self.populations
            .get_mut(&kind)
            .unwrap_or_else(|| panic!("no slot population for configured fruit kind {kind}"))
    }

    /// One placement attempt for `spec` on `tick`. Returns the new fruit.
    fn try_place(&mut self, spec: &FruitSpec, tick: u32, ctx: &mut SimContext<'_>) -> Option<EntityId> {
        let slot = (tick % spec.quantity) as usize;
        if self.population_mut(spec.kind).occupied[slot] {
            trace!(tick, kind = %spec.kind, slot, "slot already populated");
            return None;
        }

        let tile = spec.area.offset(
            ctx.rng.next(spec.area.width()),
            ctx.rng.next(spec.area.height()),
        );
        if !ctx.world.items_at(tile).is_empty() {
            trace!(tick, kind = %spec.kind, %tile, "tile already holds an item");
            return None;
        }
        let player = ctx.world.player().tile;
        if ctx.world.rooms().within_room_window(tile, player) {
            trace!(tick, kind = %spec.kind, %tile, %player, "too close to the player");
            return None;
        }

        let id = ctx.world.spawn_fruit(spec.kind, spec.energy, tile);
        let population = self.population_mut(spec.kind);
        population.occupied[slot] = true;
        if let Some(previous) = population.last_released[slot].take() {
            self.released.remove(&previous);
        }
        self.spawned.insert(id, (spec.kind, slot));
        debug!(tick, entity = %id, kind = %spec.kind, slot, %tile, "fruit grown");
        Some(id)
    }
}

impl ClockEvent for ReplenishFruit {
    fn name(&self) -> &str {
        REPLENISH_FRUIT_EVENT
    }

    fn update(&mut self, tick: u32, ctx: &mut SimContext<'_>) {
        self.sync_removals(ctx.world);
        if ctx.rng.test(self.skip_mask) {
            trace!(tick, "fruit replenishment skipped");
            return;
        }
        for index in 0..self.distribution.entries.len() {
            let spec = self.distribution.entries[index];
            self.try_place(&spec, tick, ctx);
        }
    }

    fn detach(&mut self, world: &mut World) {
        if let Some(sub) = self.removals.take() {
            world.unsubscribe(sub);
        }
        self.acknowledged.clear();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
