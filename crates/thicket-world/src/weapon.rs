//! Ranged weapons carried by monsters.
//!
//! A weapon fires straight along a row or a column. Firing spawns a shot
//! entity on the tile next to the shooter; moving the shot is the job of
//! whatever drives projectiles, not of this crate.

use serde::{Deserialize, Serialize};

use crate::entity::EntityId;
use crate::tile::{Direction, TilePos};
use crate::world::World;

/// Which lines a weapon can fire along.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sightline {
    Horizontal,
    Vertical,
    Both,
}

impl Sightline {
    fn allows(self, dir: Direction) -> bool {
        match self {
            Sightline::Both => true,
            Sightline::Horizontal => matches!(dir, Direction::East | Direction::West),
            Sightline::Vertical => matches!(dir, Direction::North | Direction::South),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Weapon {
    /// Maximum distance in tiles.
    pub range: u32,
    pub sightline: Sightline,
    pub damage: u32,
}

impl Weapon {
    /// The direction to fire in if `to` lies on one of this weapon's
    /// sightlines from `from` and within range.
    pub fn covers(&self, from: TilePos, to: TilePos) -> Option<Direction> {
        let dir = Direction::toward(from, to)?;
        let distance = from.x.abs_diff(to.x) + from.y.abs_diff(to.y);
        (self.sightline.allows(dir) && distance <= self.range).then_some(dir)
    }

    /// Fire from `from` toward `to`.
    ///
    /// Returns the spawned shot, or `None` when the target is not covered or
    /// the muzzle tile is obstructed.
    pub fn fire(
        &self,
        world: &mut World,
        owner: EntityId,
        from: TilePos,
        to: TilePos,
    ) -> Option<EntityId> {
        let dir = self.covers(from, to)?;
        let muzzle = from.step(dir);
        if world.is_obstructed(muzzle) {
            return None;
        }
        Some(world.spawn_shot(owner, muzzle, dir, *self))
    }
}
