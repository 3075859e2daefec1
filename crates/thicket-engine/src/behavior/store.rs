//! Side table of behavior collections keyed by entity.
//!
//! Behaviors are not stored on the entity itself. The store maps each
//! monster's [`EntityId`] to its [`BehaviorCollection`], fills new
//! collections from a per-definition loadout, and drops a collection once its
//! owner has been removed from the world.

use std::collections::HashMap;

use thicket_world::entity::EntityId;
use thicket_world::monster::MonsterDefId;
use thicket_world::world::{RemovalSubscription, World};
use tracing::{debug, trace, warn};

use super::{AddOutcome, Behavior, BehaviorCollection, Trigger};
use crate::context::SimContext;

#[derive(Debug)]
pub struct BehaviorStore {
    /// Maps raw entity id -> behaviors.
    collections: HashMap<u64, BehaviorCollection>,
    loadouts: HashMap<MonsterDefId, Vec<Behavior>>,
    removals: Option<RemovalSubscription>,
}

impl BehaviorStore {
    /// Create an empty store subscribed to `world`'s removals.
    pub fn new(world: &mut World) -> Self {
        Self {
            collections: HashMap::new(),
            loadouts: HashMap::new(),
            removals: Some(world.subscribe_removals()),
        }
    }

    /// Behaviors given to every monster of type `def` attached from now on.
    pub fn set_loadout(&mut self, def: MonsterDefId, behaviors: Vec<Behavior>) {
        self.loadouts.insert(def, behaviors);
    }

    pub fn loadout(&self, def: MonsterDefId) -> &[Behavior] {
        self.loadouts.get(&def).map_or(&[], Vec::as_slice)
    }

    /// Give `entity` a collection filled from its definition's loadout.
    ///
    /// Returns the existing collection if the entity already has one, and
    /// `None` if the entity is not a live monster.
    pub fn attach(&mut self, world: &World, entity: EntityId) -> Option<&mut BehaviorCollection> {
        let raw = entity.to_raw();
        if !self.collections.contains_key(&raw) {
            let monster = world.monster(entity)?;
            let def = world.monster_def(monster.def)?;
            let mut units = BehaviorCollection::new(entity);
            for behavior in self.loadout(monster.def) {
                if units.add(*behavior, def) == AddOutcome::Ineligible {
                    warn!(entity = %entity, def = %def.name, kind = ?behavior.kind(),
                        "loadout behavior not supported by definition");
                }
            }
            debug!(entity = %entity, behaviors = units.len(), "behaviors attached");
            self.collections.insert(raw, units);
        }
        self.collections.get_mut(&raw)
    }

    /// Drop collections of removed entities and attach loadouts to monsters
    /// that have none yet.
    pub fn sync(&mut self, world: &mut World) {
        if let Some(sub) = &self.removals {
            for removed in world.take_removals(sub) {
                if self.collections.remove(&removed.id.to_raw()).is_some() {
                    trace!(entity = %removed.id, "behaviors dropped with entity");
                }
            }
        }
        for id in world.monster_ids() {
            if !self.collections.contains_key(&id.to_raw()) {
                self.attach(world, id);
            }
        }
    }

    pub fn collection(&self, entity: EntityId) -> Option<&BehaviorCollection> {
        self.collections.get(&entity.to_raw())
    }

    pub fn collection_mut(&mut self, entity: EntityId) -> Option<&mut BehaviorCollection> {
        self.collections.get_mut(&entity.to_raw())
    }

    pub fn contains(&self, entity: EntityId) -> bool {
        self.collections.contains_key(&entity.to_raw())
    }

    pub fn len(&self) -> usize {
        self.collections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collections.is_empty()
    }

    /// Run the movement trigger for every living, hatched monster in slot
    /// order. Eggs laid during the pass wait for the next one. Returns the
    /// number of behavior runs.
    pub fn run_movement(&mut self, ctx: &mut SimContext<'_>) -> usize {
        self.sync(ctx.world);
        let mut ran = 0;
        for id in ctx.world.monster_ids() {
            let moving = ctx
                .world
                .monster(id)
                .is_some_and(|m| m.alive && !m.is_egg());
            if !moving {
                continue;
            }
            if let Some(units) = self.collections.get_mut(&id.to_raw()) {
                ran += units.perform(Trigger::Movement, ctx);
            }
        }
        ran
    }

    /// Tell `entity`'s behaviors it was hurt.
    pub fn notify_injury(&mut self, entity: EntityId, ctx: &mut SimContext<'_>) -> usize {
        self.notify(entity, Trigger::Injury, ctx)
    }

    /// Tell `entity`'s behaviors it was killed. Call before removing the
    /// entity from the world.
    pub fn notify_death(&mut self, entity: EntityId, ctx: &mut SimContext<'_>) -> usize {
        self.notify(entity, Trigger::Death, ctx)
    }

    fn notify(&mut self, entity: EntityId, trigger: Trigger, ctx: &mut SimContext<'_>) -> usize {
        if !ctx.world.is_alive(entity) {
            warn!(entity = %entity, ?trigger, "trigger for stale entity ignored");
            return 0;
        }
        match self.attach(ctx.world, entity) {
            Some(units) => units.perform(trigger, ctx),
            None => 0,
        }
    }

    /// Close the removal subscription and drop every collection.
    pub fn detach(&mut self, world: &mut World) {
        if let Some(sub) = self.removals.take() {
            world.unsubscribe(sub);
        }
        self.collections.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::SilentSink;
    use crate::behavior::BehaviorKind;
    use thicket_world::monster::{MonsterDef, Mobility};
    use thicket_world::random::PcgRandom;
    use thicket_world::tile::TilePos;
    use thicket_world::world::FruitKind;

    fn with_ctx<R>(world: &mut World, f: impl FnOnce(&mut SimContext<'_>) -> R) -> R {
        let mut rng = PcgRandom::new(7);
        let mut sound = SilentSink;
        let mut ctx = SimContext::new(world, &mut rng, &mut sound);
        f(&mut ctx)
    }

    fn bat_world() -> (World, MonsterDefId) {
        let mut world = World::default();
        let def = world.register_monster_def(MonsterDef::new("bat"));
        (world, def)
    }

    #[test]
    fn attach_fills_from_loadout_and_skips_ineligible() {
        let (mut world, def) = bat_world();
        let bat = world.spawn_monster(def, TilePos::new(0, 0)).unwrap();
        let mut store = BehaviorStore::new(&mut world);
        store.set_loadout(def, vec![Behavior::ActivateWhenHurt, Behavior::LaysEgg]);

        let units = store.attach(&world, bat).unwrap();
        assert_eq!(units.kinds(), vec![BehaviorKind::ActivateWhenHurt]);
        assert!(store.attach(&world, EntityId::new(40, 0)).is_none());
    }

    #[test]
    fn attach_twice_keeps_existing_collection() {
        let (mut world, def) = bat_world();
        let bat = world.spawn_monster(def, TilePos::new(0, 0)).unwrap();
        let mut store = BehaviorStore::new(&mut world);
        store.attach(&world, bat);
        store
            .collection_mut(bat)
            .unwrap()
            .add(Behavior::ActivateWhenHurt, &MonsterDef::new("bat"));
        let units = store.attach(&world, bat).unwrap();
        assert_eq!(units.len(), 1);
    }

    #[test]
    fn sync_prunes_despawned_and_attaches_new() {
        let (mut world, def) = bat_world();
        let mut store = BehaviorStore::new(&mut world);
        let first = world.spawn_monster(def, TilePos::new(0, 0)).unwrap();
        store.sync(&mut world);
        assert!(store.contains(first));

        world.despawn(first).unwrap();
        let second = world.spawn_monster(def, TilePos::new(1, 0)).unwrap();
        store.sync(&mut world);
        assert!(!store.contains(first));
        assert!(store.contains(second));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn injury_and_death_reach_the_right_units() {
        let (mut world, def) = bat_world();
        let bat = world.spawn_monster(def, TilePos::new(60, 60)).unwrap();
        let mut store = BehaviorStore::new(&mut world);
        store.set_loadout(
            def,
            vec![
                Behavior::ChangeMovementWhenHurt {
                    mobility: Mobility::Chasing,
                },
                Behavior::DropsFruitWhenKilled {
                    fruit: FruitKind::Cherry,
                    energy: 5,
                },
            ],
        );

        let ran = with_ctx(&mut world, |ctx| store.notify_injury(bat, ctx));
        assert_eq!(ran, 1);
        assert_eq!(world.monster(bat).unwrap().mobility, Mobility::Chasing);

        let ran = with_ctx(&mut world, |ctx| store.notify_death(bat, ctx));
        assert_eq!(ran, 1);
        assert_eq!(world.items_at(TilePos::new(60, 60)).len(), 1);
        assert!(store.collection(bat).unwrap().is_empty());
    }

    #[test]
    fn movement_skips_eggs() {
        let (mut world, def) = bat_world();
        let egg = world.spawn_egg(def, TilePos::new(2, 2), 100).unwrap();
        let mut store = BehaviorStore::new(&mut world);
        store.set_loadout(def, vec![Behavior::ActivateWhenMeetsPlayer]);

        let ran = with_ctx(&mut world, |ctx| store.run_movement(ctx));
        assert_eq!(ran, 0);
        assert!(!world.monster(egg).unwrap().active);
        assert!(store.contains(egg));
    }

    #[test]
    fn detach_unsubscribes() {
        let (mut world, _) = bat_world();
        let mut store = BehaviorStore::new(&mut world);
        assert_eq!(world.subscriber_count(), 1);
        store.detach(&mut world);
        assert_eq!(world.subscriber_count(), 0);
        assert!(store.is_empty());
    }
}
