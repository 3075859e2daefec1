//! The [`World`] is the entity registry the simulation core runs against.
//!
//! It owns every monster, fruit and shot, an index of items by tile, the
//! static obstruction map, monster definitions, the world-area map, room
//! geometry and the player. Removing an entity posts a notice to every
//! removal subscriber's mailbox; subscribers drain their mailbox when they
//! next run, so no callback ever re-enters the world mid-mutation.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::entity::{EntityAllocator, EntityId};
use crate::monster::{Monster, MonsterDef, MonsterDefId};
use crate::tile::{Direction, RoomGeometry, RoomId, TilePos, TileRect};
use crate::weapon::Weapon;
use crate::WorldError;

// ---------------------------------------------------------------------------
// Entity payloads
// ---------------------------------------------------------------------------

/// The kinds of fruit that grow in the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FruitKind {
    Apple,
    Banana,
    Cherry,
    Grape,
    Melon,
    Mushroom,
}

impl fmt::Display for FruitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FruitKind::Apple => "apple",
            FruitKind::Banana => "banana",
            FruitKind::Cherry => "cherry",
            FruitKind::Grape => "grape",
            FruitKind::Melon => "melon",
            FruitKind::Mushroom => "mushroom",
        };
        f.write_str(name)
    }
}

/// A piece of fruit lying on a tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fruit {
    pub kind: FruitKind,
    /// Energy restored to whoever eats it.
    pub energy: u32,
}

/// A projectile in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shot {
    pub owner: EntityId,
    pub direction: Direction,
    pub weapon: Weapon,
}

/// What an entity is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EntityKind {
    Monster(Monster),
    Fruit(Fruit),
    Shot(Shot),
}

/// A live entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    pub tile: TilePos,
    pub kind: EntityKind,
}

impl Entity {
    pub fn as_monster(&self) -> Option<&Monster> {
        match &self.kind {
            EntityKind::Monster(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_fruit(&self) -> Option<&Fruit> {
        match &self.kind {
            EntityKind::Fruit(f) => Some(f),
            _ => None,
        }
    }

    /// Items are things the player can pick up; they block fruit growth.
    pub fn is_item(&self) -> bool {
        matches!(self.kind, EntityKind::Fruit(_))
    }
}

// ---------------------------------------------------------------------------
// Player
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub tile: TilePos,
    pub alive: bool,
}

impl Default for Player {
    fn default() -> Self {
        Self {
            tile: TilePos::new(0, 0),
            alive: true,
        }
    }
}

// ---------------------------------------------------------------------------
// AreaMap
// ---------------------------------------------------------------------------

/// Classifies tiles into coarse progression areas.
///
/// Regions are checked in insertion order; the first containing the tile
/// wins. Tiles outside every region belong to the fallback area.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AreaMap {
    regions: Vec<(TileRect, u32)>,
    fallback: u32,
}

impl AreaMap {
    pub fn new(fallback: u32) -> Self {
        Self {
            regions: Vec::new(),
            fallback,
        }
    }

    pub fn with_region(mut self, rect: TileRect, area: u32) -> Self {
        self.regions.push((rect, area));
        self
    }

    pub fn area_of(&self, tile: TilePos) -> u32 {
        self.regions
            .iter()
            .find(|(rect, _)| rect.contains(tile))
            .map_or(self.fallback, |(_, area)| *area)
    }
}

// ---------------------------------------------------------------------------
// Removal notifications
// ---------------------------------------------------------------------------

/// Handle for a removal mailbox, returned by [`World::subscribe_removals`].
///
/// Not `Clone`: exactly one owner drains each mailbox and hands the handle
/// back through [`World::unsubscribe`] when it is torn down.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct RemovalSubscription(u32);

// ---------------------------------------------------------------------------
// World
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct World {
    allocator: EntityAllocator,
    /// Entity storage indexed by [`EntityId::index`].
    slots: Vec<Option<Entity>>,
    /// Item entities by tile.
    items: HashMap<TilePos, Vec<EntityId>>,
    obstructions: HashSet<TilePos>,
    defs: Vec<MonsterDef>,
    areas: AreaMap,
    rooms: RoomGeometry,
    player: Player,
    /// Pending removal notices per subscriber, ordered by subscription.
    mailboxes: BTreeMap<u32, Vec<Entity>>,
    next_subscription: u32,
}

impl World {
    /// An empty world with the given room size. Zero dimensions are raised
    /// to one tile.
    pub fn new(rooms: RoomGeometry) -> Self {
        let rooms = if rooms.is_valid() {
            rooms
        } else {
            warn!(width = rooms.width, height = rooms.height, "degenerate room size, clamped to one tile");
            RoomGeometry {
                width: rooms.width.max(1),
                height: rooms.height.max(1),
            }
        };
        Self {
            rooms,
            ..Self::default()
        }
    }

    // -- geometry -----------------------------------------------------------

    pub fn rooms(&self) -> RoomGeometry {
        self.rooms
    }

    pub fn room_of(&self, tile: TilePos) -> RoomId {
        self.rooms.room_of(tile)
    }

    pub fn set_areas(&mut self, areas: AreaMap) {
        self.areas = areas;
    }

    /// The world-area id of `tile`.
    pub fn area_of(&self, tile: TilePos) -> u32 {
        self.areas.area_of(tile)
    }

    pub fn add_obstruction(&mut self, tile: TilePos) {
        self.obstructions.insert(tile);
    }

    /// Whether a wall or other static obstruction occupies `tile`.
    pub fn is_obstructed(&self, tile: TilePos) -> bool {
        self.obstructions.contains(&tile)
    }

    // -- player -------------------------------------------------------------

    pub fn player(&self) -> &Player {
        &self.player
    }

    pub fn player_mut(&mut self) -> &mut Player {
        &mut self.player
    }

    /// Whether `tile` is in the same room as the player.
    pub fn shares_room_with_player(&self, tile: TilePos) -> bool {
        self.room_of(tile) == self.room_of(self.player.tile)
    }

    // -- definitions --------------------------------------------------------

    pub fn register_monster_def(&mut self, def: MonsterDef) -> MonsterDefId {
        self.defs.push(def);
        MonsterDefId(self.defs.len() as u32 - 1)
    }

    pub fn monster_def(&self, id: MonsterDefId) -> Option<&MonsterDef> {
        self.defs.get(id.0 as usize)
    }

    // -- spawning -----------------------------------------------------------

    fn insert(&mut self, tile: TilePos, kind: EntityKind) -> EntityId {
        let id = self.allocator.allocate();
        let entity = Entity { id, tile, kind };
        if entity.is_item() {
            self.items.entry(tile).or_default().push(id);
        }
        let idx = id.index() as usize;
        if idx >= self.slots.len() {
            self.slots.resize_with(idx + 1, || None);
        }
        self.slots[idx] = Some(entity);
        id
    }

    pub fn spawn_fruit(&mut self, kind: FruitKind, energy: u32, tile: TilePos) -> EntityId {
        let id = self.insert(tile, EntityKind::Fruit(Fruit { kind, energy }));
        debug!(entity = %id, %kind, energy, %tile, "fruit spawned");
        id
    }

    /// Spawn a dormant monster of type `def`.
    pub fn spawn_monster(&mut self, def: MonsterDefId, tile: TilePos) -> Result<EntityId, WorldError> {
        let monster = self.new_monster(def)?;
        let id = self.insert(tile, EntityKind::Monster(monster));
        debug!(entity = %id, def = def.0, %tile, "monster spawned");
        Ok(id)
    }

    /// Spawn an egg of type `def` that hatches after `hatch_in` ticks.
    pub fn spawn_egg(
        &mut self,
        def: MonsterDefId,
        tile: TilePos,
        hatch_in: u32,
    ) -> Result<EntityId, WorldError> {
        let mut monster = self.new_monster(def)?;
        monster.egg = Some(hatch_in);
        let id = self.insert(tile, EntityKind::Monster(monster));
        debug!(entity = %id, def = def.0, %tile, hatch_in, "egg spawned");
        Ok(id)
    }

    pub fn spawn_shot(
        &mut self,
        owner: EntityId,
        tile: TilePos,
        direction: Direction,
        weapon: Weapon,
    ) -> EntityId {
        self.insert(
            tile,
            EntityKind::Shot(Shot {
                owner,
                direction,
                weapon,
            }),
        )
    }

    fn new_monster(&self, def: MonsterDefId) -> Result<Monster, WorldError> {
        let template = self
            .monster_def(def)
            .ok_or(WorldError::UnknownMonsterDef { def: def.0 })?;
        Ok(Monster::from_def(def, template))
    }

    // -- removal ------------------------------------------------------------

    /// Remove an entity and notify every removal subscriber.
    pub fn despawn(&mut self, id: EntityId) -> Result<Entity, WorldError> {
        if !self.allocator.is_live(id) {
            warn!(entity = %id, "despawn of stale entity");
            return Err(WorldError::StaleEntity { entity: id });
        }
        let entity = self.slots[id.index() as usize]
            .take()
            .ok_or(WorldError::StaleEntity { entity: id })?;
        self.allocator.release(id);
        if entity.is_item() {
            if let Some(ids) = self.items.get_mut(&entity.tile) {
                ids.retain(|&other| other != id);
                if ids.is_empty() {
                    self.items.remove(&entity.tile);
                }
            }
        }
        for mailbox in self.mailboxes.values_mut() {
            mailbox.push(entity.clone());
        }
        debug!(entity = %id, tile = %entity.tile, "entity removed");
        Ok(entity)
    }

    /// Open a mailbox that receives a copy of every entity removed from now on.
    pub fn subscribe_removals(&mut self) -> RemovalSubscription {
        let key = self.next_subscription;
        self.next_subscription += 1;
        self.mailboxes.insert(key, Vec::new());
        RemovalSubscription(key)
    }

    /// Drain the removal notices posted since the last call, oldest first.
    pub fn take_removals(&mut self, subscription: &RemovalSubscription) -> Vec<Entity> {
        self.mailboxes
            .get_mut(&subscription.0)
            .map(std::mem::take)
            .unwrap_or_default()
    }

    /// Close a mailbox. Returns `false` if it was not open.
    pub fn unsubscribe(&mut self, subscription: RemovalSubscription) -> bool {
        self.mailboxes.remove(&subscription.0).is_some()
    }

    pub fn subscriber_count(&self) -> usize {
        self.mailboxes.len()
    }

    // -- access -------------------------------------------------------------

    pub fn is_alive(&self, id: EntityId) -> bool {
        self.allocator.is_live(id)
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        if !self.allocator.is_live(id) {
            return None;
        }
        self.slots.get(id.index() as usize)?.as_ref()
    }

    fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        if !self.allocator.is_live(id) {
            return None;
        }
        self.slots.get_mut(id.index() as usize)?.as_mut()
    }

    pub fn monster(&self, id: EntityId) -> Option<&Monster> {
        self.get(id)?.as_monster()
    }

    pub fn monster_mut(&mut self, id: EntityId) -> Option<&mut Monster> {
        match &mut self.get_mut(id)?.kind {
            EntityKind::Monster(m) => Some(m),
            _ => None,
        }
    }

    /// Move an entity, keeping the item index in step.
    pub fn move_to(&mut self, id: EntityId, tile: TilePos) -> Result<(), WorldError> {
        let entity = self.get_mut(id).ok_or(WorldError::StaleEntity { entity: id })?;
        let from = std::mem::replace(&mut entity.tile, tile);
        if entity.is_item() && from != tile {
            if let Some(ids) = self.items.get_mut(&from) {
                ids.retain(|&other| other != id);
                if ids.is_empty() {
                    self.items.remove(&from);
                }
            }
            self.items.entry(tile).or_default().push(id);
        }
        Ok(())
    }

    /// Item entities currently on `tile`.
    pub fn items_at(&self, tile: TilePos) -> &[EntityId] {
        self.items.get(&tile).map_or(&[], Vec::as_slice)
    }

    /// All live entities in slot order.
    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.slots.iter().flatten()
    }

    /// Ids of all live monsters (eggs included) in slot order.
    pub fn monster_ids(&self) -> Vec<EntityId> {
        self.entities()
            .filter(|e| e.as_monster().is_some())
            .map(|e| e.id)
            .collect()
    }

    pub fn entity_count(&self) -> usize {
        self.allocator.live_count()
    }

    /// Number of live fruit of `kind`.
    pub fn fruit_count(&self, kind: FruitKind) -> usize {
        self.entities()
            .filter(|e| e.as_fruit().is_some_and(|f| f.kind == kind))
            .count()
    }

    /// A blake3 digest of every live entity and the player, in slot order.
    ///
    /// Two worlds driven by the same seed and inputs produce the same digest.
    pub fn digest(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&(self.entity_count() as u64).to_le_bytes());
        for entity in self.entities() {
            hasher.update(&entity.id.to_raw().to_le_bytes());
            hasher.update(&entity.tile.x.to_le_bytes());
            hasher.update(&entity.tile.y.to_le_bytes());
            match &entity.kind {
                EntityKind::Monster(m) => {
                    hasher.update(&[0, m.active as u8, m.alive as u8, m.mobility as u8]);
                    hasher.update(&[m.room_policy as u8, m.facing as u8]);
                    hasher.update(&m.def.0.to_le_bytes());
                    hasher.update(&m.egg.map_or(u64::MAX, u64::from).to_le_bytes());
                }
                EntityKind::Fruit(f) => {
                    hasher.update(&[1, f.kind as u8]);
                    hasher.update(&f.energy.to_le_bytes());
                }
                EntityKind::Shot(s) => {
                    hasher.update(&[2, s.direction as u8]);
                    hasher.update(&s.owner.to_raw().to_le_bytes());
                }
            }
        }
        hasher.update(&self.player.tile.x.to_le_bytes());
        hasher.update(&self.player.tile.y.to_le_bytes());
        hasher.update(&[self.player.alive as u8]);
        hasher.finalize().to_hex().to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monster::Mobility;

    fn world_with_slime() -> (World, MonsterDefId) {
        let mut world = World::default();
        let def = world.register_monster_def(MonsterDef::new("slime"));
        (world, def)
    }

    #[test]
    fn fruit_is_indexed_by_tile() {
        let mut world = World::default();
        let tile = TilePos::new(3, 4);
        let a = world.spawn_fruit(FruitKind::Apple, 5, tile);
        let b = world.spawn_fruit(FruitKind::Cherry, 2, tile);
        assert_eq!(world.items_at(tile), &[a, b]);
        world.despawn(a).unwrap();
        assert_eq!(world.items_at(tile), &[b]);
        world.despawn(b).unwrap();
        assert!(world.items_at(tile).is_empty());
    }

    #[test]
    fn monsters_are_not_items() {
        let (mut world, def) = world_with_slime();
        let tile = TilePos::new(1, 1);
        world.spawn_monster(def, tile).unwrap();
        assert!(world.items_at(tile).is_empty());
        assert_eq!(world.entity_count(), 1);
    }

    #[test]
    fn zero_room_size_is_clamped() {
        let world = World::new(RoomGeometry {
            width: 0,
            height: 6,
        });
        assert_eq!(
            world.rooms(),
            RoomGeometry {
                width: 1,
                height: 6
            }
        );
        assert_eq!(world.room_of(TilePos::new(3, 7)), RoomId { col: 3, row: 1 });
    }

    #[test]
    fn area_map_loads_from_json() {
        let json = r#"{
            "regions": [[{ "x0": 0, "y0": 0, "x1": 10, "y1": 10 }, 1]],
            "fallback": 4
        }"#;
        let areas: AreaMap = serde_json::from_str(json).unwrap();
        assert_eq!(areas.area_of(TilePos::new(5, 5)), 1);
        assert_eq!(areas.area_of(TilePos::new(10, 5)), 4);
    }

    #[test]
    fn unknown_def_is_rejected() {
        let mut world = World::default();
        let err = world.spawn_monster(MonsterDefId(9), TilePos::new(0, 0)).unwrap_err();
        assert!(matches!(err, WorldError::UnknownMonsterDef { def: 9 }));
    }

    #[test]
    fn despawn_posts_to_every_mailbox() {
        let mut world = World::default();
        let first = world.subscribe_removals();
        let id = world.spawn_fruit(FruitKind::Grape, 1, TilePos::new(0, 0));
        let second = world.subscribe_removals();
        world.despawn(id).unwrap();

        let seen_first = world.take_removals(&first);
        let seen_second = world.take_removals(&second);
        assert_eq!(seen_first.len(), 1);
        assert_eq!(seen_first[0].id, id);
        assert_eq!(seen_second.len(), 1);
        assert!(world.take_removals(&first).is_empty(), "mailbox drained");
    }

    #[test]
    fn unsubscribed_mailbox_gets_nothing() {
        let mut world = World::default();
        let sub = world.subscribe_removals();
        assert_eq!(world.subscriber_count(), 1);
        assert!(world.unsubscribe(sub));
        assert_eq!(world.subscriber_count(), 0);
        let id = world.spawn_fruit(FruitKind::Grape, 1, TilePos::new(0, 0));
        world.despawn(id).unwrap();
        assert_eq!(world.subscriber_count(), 0);
    }

    #[test]
    fn despawn_twice_is_stale() {
        let mut world = World::default();
        let id = world.spawn_fruit(FruitKind::Melon, 1, TilePos::new(0, 0));
        world.despawn(id).unwrap();
        assert!(matches!(
            world.despawn(id),
            Err(WorldError::StaleEntity { .. })
        ));
        assert!(world.get(id).is_none());
    }

    #[test]
    fn egg_carries_countdown_and_def() {
        let (mut world, def) = world_with_slime();
        let egg = world.spawn_egg(def, TilePos::new(2, 2), 40).unwrap();
        let m = world.monster(egg).unwrap();
        assert_eq!(m.egg, Some(40));
        assert_eq!(m.def, def);
        assert_eq!(m.mobility, Mobility::Wandering);
    }

    #[test]
    fn move_to_updates_item_index() {
        let mut world = World::default();
        let id = world.spawn_fruit(FruitKind::Banana, 1, TilePos::new(0, 0));
        world.move_to(id, TilePos::new(5, 5)).unwrap();
        assert!(world.items_at(TilePos::new(0, 0)).is_empty());
        assert_eq!(world.items_at(TilePos::new(5, 5)), &[id]);
    }

    #[test]
    fn area_map_uses_first_matching_region() {
        let areas = AreaMap::new(9)
            .with_region(TileRect::new(0, 0, 10, 10), 1)
            .with_region(TileRect::new(0, 0, 100, 100), 2);
        assert_eq!(areas.area_of(TilePos::new(5, 5)), 1);
        assert_eq!(areas.area_of(TilePos::new(50, 5)), 2);
        assert_eq!(areas.area_of(TilePos::new(500, 5)), 9);
    }

    #[test]
    fn shares_room_with_player_uses_geometry() {
        let mut world = World::new(RoomGeometry {
            width: 10,
            height: 10,
        });
        world.player_mut().tile = TilePos::new(12, 3);
        assert!(world.shares_room_with_player(TilePos::new(19, 9)));
        assert!(!world.shares_room_with_player(TilePos::new(9, 3)));
    }

    #[test]
    fn digest_tracks_state() {
        let (mut a, def_a) = world_with_slime();
        let (mut b, def_b) = world_with_slime();
        let ma = a.spawn_monster(def_a, TilePos::new(1, 1)).unwrap();
        b.spawn_monster(def_b, TilePos::new(1, 1)).unwrap();
        assert_eq!(a.digest(), b.digest());
        a.monster_mut(ma).unwrap().active = true;
        assert_ne!(a.digest(), b.digest());
    }
}
