//! Progressive activation of dormant monsters.
//!
//! The world is split into numbered areas. Every `2^shift` ticks another
//! level unlocks, and each dormant monster standing in an area numbered below
//! the new level wakes up, unless it is confined to its room.

use thicket_world::entity::EntityId;
use thicket_world::world::World;
use tracing::debug;

use crate::clock::ClockEvent;
use crate::context::SimContext;

/// Name under which [`UnlockLevel`] registers with the clock.
pub const UNLOCK_LEVEL_EVENT: &str = "unlock_level";

/// Default number of tick bits per level: one level every 4096 ticks.
pub const DEFAULT_LEVEL_SHIFT: u32 = 12;

#[derive(Debug, Clone)]
pub struct UnlockLevel {
    shift: u32,
    unlocked: u32,
}

impl UnlockLevel {
    pub fn new(shift: u32) -> Self {
        Self { shift, unlocked: 0 }
    }

    /// Resume with `unlocked` levels already applied.
    pub fn with_unlocked(mut self, unlocked: u32) -> Self {
        self.unlocked = unlocked;
        self
    }

    pub fn unlocked(&self) -> u32 {
        self.unlocked
    }

    pub fn shift(&self) -> u32 {
        self.shift
    }

    /// The level `tick` has reached.
    pub fn level_at(&self, tick: u32) -> u32 {
        tick.checked_shr(self.shift).unwrap_or(0)
    }
}

impl Default for UnlockLevel {
    fn default() -> Self {
        Self::new(DEFAULT_LEVEL_SHIFT)
    }
}

/// Wake every dormant, living, roaming monster in an area below `level`,
/// eggs included. Returns how many monsters woke.
fn activate_below(world: &mut World, level: u32) -> usize {
    let sleepers: Vec<EntityId> = world
        .entities()
        .filter_map(|entity| {
            let monster = entity.as_monster()?;
            let eligible = !monster.active
                && monster.alive
                && !monster.is_confined()
                && world.area_of(entity.tile) < level;
            eligible.then_some(entity.id)
        })
        .collect();

    for &id in &sleepers {
        if let Some(monster) = world.monster_mut(id) {
            monster.active = true;
        }
    }
    sleepers.len()
}

impl ClockEvent for UnlockLevel {
    fn name(&self) -> &str {
        UNLOCK_LEVEL_EVENT
    }

    fn update(&mut self, tick: u32, ctx: &mut SimContext<'_>) {
        let target = self.level_at(tick);
        while self.unlocked < target {
            self.unlocked += 1;
            let woke = activate_below(ctx.world, self.unlocked);
            debug!(tick, level = self.unlocked, woke, "level unlocked");
        }
    }
}
