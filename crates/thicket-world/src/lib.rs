//! Thicket World -- the entity registry and world queries the simulation core
//! runs against.
//!
//! This crate holds everything the clock events and monster behaviors read or
//! mutate: generational entity ids, tile and room geometry, monster
//! definitions, weapons, the player, static obstructions, the world-area map,
//! buffered entity-removal notifications and the deterministic random source.
//!
//! # Quick Start
//!
//! ```
//! use thicket_world::prelude::*;
//!
//! let mut world = World::new(RoomGeometry { width: 20, height: 12 });
//! let slime = world.register_monster_def(MonsterDef::new("slime"));
//! let monster = world.spawn_monster(slime, TilePos::new(4, 4)).unwrap();
//!
//! let removals = world.subscribe_removals();
//! world.despawn(monster).unwrap();
//! assert_eq!(world.take_removals(&removals).len(), 1);
//! ```

#![deny(unsafe_code)]

pub mod entity;
pub mod monster;
pub mod random;
pub mod tile;
pub mod weapon;
pub mod world;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced by world operations.
#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    /// The entity does not exist (already removed or never allocated).
    #[error("entity {entity} does not exist (stale or never allocated)")]
    StaleEntity { entity: entity::EntityId },

    /// A monster definition id was used that was never registered.
    #[error("monster definition {def} is not registered")]
    UnknownMonsterDef { def: u32 },
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::entity::EntityId;
    pub use crate::monster::{HatchDelay, Mobility, Monster, MonsterDef, MonsterDefId, RoomPolicy};
    pub use crate::random::{PcgRandom, RandomSource};
    pub use crate::tile::{Direction, RoomGeometry, RoomId, TilePos, TileRect};
    pub use crate::weapon::{Sightline, Weapon};
    pub use crate::world::{
        AreaMap, Entity, EntityKind, Fruit, FruitKind, Player, RemovalSubscription, Shot, World,
    };
    pub use crate::WorldError;
}
