//! Monster definitions and per-monster runtime state.

use serde::{Deserialize, Serialize};

use crate::tile::Direction;
use crate::weapon::Weapon;

/// How a monster moves around.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mobility {
    /// Never leaves its tile.
    Stationary,
    /// Walks a fixed route.
    Patrolling,
    /// Moves at random.
    Wandering,
    /// Heads for the player.
    Chasing,
}

impl Mobility {
    /// Whether the monster is free to roam, as opposed to standing still or
    /// following a fixed route.
    pub fn is_free(self) -> bool {
        matches!(self, Mobility::Wandering | Mobility::Chasing)
    }
}

/// Whether a monster may leave the room it spawned in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomPolicy {
    Confined,
    Roaming,
}

/// Range of ticks an egg waits before hatching: `base + [0, spread)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HatchDelay {
    pub base: u32,
    pub spread: u32,
}

impl Default for HatchDelay {
    fn default() -> Self {
        Self {
            base: 200,
            spread: 100,
        }
    }
}

/// Index of a [`MonsterDef`] registered with the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MonsterDefId(pub u32);

/// Static description shared by every monster of one type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonsterDef {
    pub name: String,
    pub mobility: Mobility,
    pub room_policy: RoomPolicy,
    /// Whether this type of monster can lay eggs at all.
    pub lays_eggs: bool,
    pub hatch_delay: HatchDelay,
    pub weapon: Option<Weapon>,
}

impl MonsterDef {
    /// A wandering, roaming, unarmed monster that does not lay eggs.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mobility: Mobility::Wandering,
            room_policy: RoomPolicy::Roaming,
            lays_eggs: false,
            hatch_delay: HatchDelay::default(),
            weapon: None,
        }
    }

    pub fn with_mobility(mut self, mobility: Mobility) -> Self {
        self.mobility = mobility;
        self
    }

    pub fn with_room_policy(mut self, room_policy: RoomPolicy) -> Self {
        self.room_policy = room_policy;
        self
    }

    pub fn with_eggs(mut self, hatch_delay: HatchDelay) -> Self {
        self.lays_eggs = true;
        self.hatch_delay = hatch_delay;
        self
    }

    pub fn with_weapon(mut self, weapon: Weapon) -> Self {
        self.weapon = Some(weapon);
        self
    }
}

/// Runtime state of a single monster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Monster {
    pub def: MonsterDefId,
    /// Dormant monsters do not move or attack until activated.
    pub active: bool,
    /// Cleared when the monster is killed; the entity may linger until it is
    /// removed from the world.
    pub alive: bool,
    pub mobility: Mobility,
    pub room_policy: RoomPolicy,
    pub facing: Direction,
    /// Ticks until hatching, while the monster is still an egg.
    pub egg: Option<u32>,
}

impl Monster {
    /// A dormant, living monster in the definition's default mode.
    pub fn from_def(id: MonsterDefId, def: &MonsterDef) -> Self {
        Self {
            def: id,
            active: false,
            alive: true,
            mobility: def.mobility,
            room_policy: def.room_policy,
            facing: Direction::South,
            egg: None,
        }
    }

    pub fn is_egg(&self) -> bool {
        self.egg.is_some()
    }

    pub fn is_confined(&self) -> bool {
        self.room_policy == RoomPolicy::Confined
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_monster_starts_dormant_in_default_mode() {
        let def = MonsterDef::new("slime")
            .with_mobility(Mobility::Patrolling)
            .with_room_policy(RoomPolicy::Confined);
        let m = Monster::from_def(MonsterDefId(3), &def);
        assert!(!m.active);
        assert!(m.alive);
        assert!(!m.is_egg());
        assert!(m.is_confined());
        assert_eq!(m.mobility, Mobility::Patrolling);
    }

    #[test]
    fn only_wandering_and_chasing_are_free() {
        assert!(!Mobility::Stationary.is_free());
        assert!(!Mobility::Patrolling.is_free());
        assert!(Mobility::Wandering.is_free());
        assert!(Mobility::Chasing.is_free());
    }
}
