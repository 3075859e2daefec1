//! Composable monster behaviors.
//!
//! A monster's reactions are a list of small, single-purpose [`Behavior`]s
//! kept in a [`BehaviorCollection`]. Each behavior kind listens for a fixed
//! set of [`Trigger`]s; when the owner moves, is hurt or dies, the collection
//! runs every unit that listens for that trigger, in insertion order.
//!
//! Several kinds fire once: they apply their effect and then remove
//! themselves from the collection. Removal takes effect immediately, so a
//! unit removed earlier in a dispatch pass is not run later in that pass.
//!
//! Behaviors are attached to monsters by the [`BehaviorStore`], which keeps a
//! loadout per monster definition and drops collections whose owner has left
//! the world.

pub mod collection;
pub mod store;

use serde::{Deserialize, Serialize};
use thicket_world::entity::EntityId;
use thicket_world::monster::{MonsterDef, Mobility, RoomPolicy};
use thicket_world::world::FruitKind;
use tracing::{debug, trace};

use crate::audio::Sound;
use crate::context::SimContext;

pub use collection::{AddOutcome, BehaviorCollection, BehaviorUnit};
pub use store::BehaviorStore;

/// An egg is laid when `rng.test(EGG_LAYING_MASK)` hits: one chance in 16.
pub const EGG_LAYING_MASK: u32 = 15;

/// A shot is held back when `rng.test(SHOT_HOLD_MASK)` hits: one in four.
pub const SHOT_HOLD_MASK: u32 = 3;

// ---------------------------------------------------------------------------
// Triggers and kinds
// ---------------------------------------------------------------------------

/// What happened to the owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Trigger {
    /// The owner took a movement step.
    Movement,
    /// The owner was hurt but survived.
    Injury,
    /// The owner was killed.
    Death,
}

/// Identifies a concrete behavior type, ignoring its parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BehaviorKind {
    ActivateWhenHurt,
    ActivateWhenMeetsPlayer,
    ChangeMovementWhenHurt,
    MobilityAfterInjury,
    ChangeRoomsAfterInjury,
    LaysEgg,
    ShootsAtPlayer,
    DropsFruitWhenKilled,
}

impl BehaviorKind {
    /// The triggers this kind listens for.
    pub fn triggers(self) -> &'static [Trigger] {
        match self {
            BehaviorKind::ActivateWhenMeetsPlayer
            | BehaviorKind::LaysEgg
            | BehaviorKind::ShootsAtPlayer => &[Trigger::Movement],
            BehaviorKind::ActivateWhenHurt
            | BehaviorKind::ChangeMovementWhenHurt
            | BehaviorKind::MobilityAfterInjury
            | BehaviorKind::ChangeRoomsAfterInjury => &[Trigger::Injury],
            BehaviorKind::DropsFruitWhenKilled => &[Trigger::Death],
        }
    }

    pub fn responds_to(self, trigger: Trigger) -> bool {
        self.triggers().contains(&trigger)
    }
}

// ---------------------------------------------------------------------------
// Behavior
// ---------------------------------------------------------------------------

/// A single behavior with its parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Behavior {
    /// Wake up when hurt, then forget this behavior.
    ActivateWhenHurt,
    /// Wake up on entering the player's room, then forget this behavior.
    ActivateWhenMeetsPlayer,
    /// Switch movement mode when hurt, once.
    ChangeMovementWhenHurt { mobility: Mobility },
    /// Switch movement mode and room policy when hurt, once.
    MobilityAfterInjury {
        mobility: Mobility,
        room_policy: RoomPolicy,
    },
    /// Switch room policy when hurt, once.
    ChangeRoomsAfterInjury { room_policy: RoomPolicy },
    /// Now and then lay an egg behind itself while in the player's room.
    LaysEgg,
    /// Fire the definition's weapon at the player when lined up.
    ShootsAtPlayer,
    /// Leave a fruit where it died, once.
    DropsFruitWhenKilled { fruit: FruitKind, energy: u32 },
}

impl Behavior {
    pub fn kind(&self) -> BehaviorKind {
        match self {
            Behavior::ActivateWhenHurt => BehaviorKind::ActivateWhenHurt,
            Behavior::ActivateWhenMeetsPlayer => BehaviorKind::ActivateWhenMeetsPlayer,
            Behavior::ChangeMovementWhenHurt { .. } => BehaviorKind::ChangeMovementWhenHurt,
            Behavior::MobilityAfterInjury { .. } => BehaviorKind::MobilityAfterInjury,
            Behavior::ChangeRoomsAfterInjury { .. } => BehaviorKind::ChangeRoomsAfterInjury,
            Behavior::LaysEgg => BehaviorKind::LaysEgg,
            Behavior::ShootsAtPlayer => BehaviorKind::ShootsAtPlayer,
            Behavior::DropsFruitWhenKilled { .. } => BehaviorKind::DropsFruitWhenKilled,
        }
    }

    pub fn triggers(&self) -> &'static [Trigger] {
        self.kind().triggers()
    }

    /// Whether a monster of type `def` can carry this behavior at all.
    pub fn is_supported_by(&self, def: &MonsterDef) -> bool {
        match self {
            Behavior::LaysEgg => def.lays_eggs,
            Behavior::ShootsAtPlayer => def.weapon.is_some(),
            _ => true,
        }
    }

    /// Run this behavior for `owner`. Fire-once kinds remove themselves from
    /// `units` before returning.
    pub fn perform(&self, owner: EntityId, units: &mut BehaviorCollection, ctx: &mut SimContext<'_>) {
        match *self {
            Behavior::ActivateWhenHurt => {
                activate(owner, ctx);
                units.remove(self.kind());
            }
            Behavior::ActivateWhenMeetsPlayer => {
                let Some(entity) = ctx.world.get(owner) else {
                    return;
                };
                let tile = entity.tile;
                if ctx.world.player().alive && ctx.world.shares_room_with_player(tile) {
                    activate(owner, ctx);
                    ctx.sound.play(Sound::MonsterWoke, tile);
                    units.remove(self.kind());
                }
            }
            Behavior::ChangeMovementWhenHurt { mobility } => {
                if let Some(monster) = ctx.world.monster_mut(owner) {
                    monster.mobility = mobility;
                }
                units.remove(self.kind());
            }
            Behavior::MobilityAfterInjury {
                mobility,
                room_policy,
            } => {
                if let Some(monster) = ctx.world.monster_mut(owner) {
                    monster.mobility = mobility;
                    monster.room_policy = room_policy;
                }
                units.remove(self.kind());
            }
            Behavior::ChangeRoomsAfterInjury { room_policy } => {
                if let Some(monster) = ctx.world.monster_mut(owner) {
                    monster.room_policy = room_policy;
                }
                units.remove(self.kind());
            }
            Behavior::LaysEgg => lay_egg(owner, ctx),
            Behavior::ShootsAtPlayer => shoot_at_player(owner, ctx),
            Behavior::DropsFruitWhenKilled { fruit, energy } => {
                if let Some(entity) = ctx.world.get(owner) {
                    let tile = entity.tile;
                    if ctx.world.items_at(tile).is_empty() {
                        let dropped = ctx.world.spawn_fruit(fruit, energy, tile);
                        debug!(entity = %owner, fruit = %dropped, %tile, "dropped fruit on death");
                    } else {
                        trace!(entity = %owner, %tile, "death tile occupied, no fruit dropped");
                    }
                }
                units.remove(self.kind());
            }
        }
    }
}

fn activate(owner: EntityId, ctx: &mut SimContext<'_>) {
    if let Some(monster) = ctx.world.monster_mut(owner) {
        if !monster.active {
            monster.active = true;
            debug!(entity = %owner, "monster activated");
        }
    }
}

fn lay_egg(owner: EntityId, ctx: &mut SimContext<'_>) {
    let Some(entity) = ctx.world.get(owner) else {
        return;
    };
    let Some(monster) = entity.as_monster() else {
        return;
    };
    let (tile, def_id, facing) = (entity.tile, monster.def, monster.facing);
    if monster.is_egg() || !monster.alive || !monster.mobility.is_free() {
        return;
    }
    if !ctx.world.player().alive || !ctx.world.shares_room_with_player(tile) {
        return;
    }
    if !ctx.rng.test(EGG_LAYING_MASK) {
        trace!(entity = %owner, "egg roll missed");
        return;
    }
    let target = tile.step(facing.opposite());
    if ctx.world.is_obstructed(target) {
        trace!(entity = %owner, %target, "no room behind to lay an egg");
        return;
    }
    let Some(delay) = ctx.world.monster_def(def_id).map(|def| def.hatch_delay) else {
        return;
    };
    let hatch_in = if delay.spread > 0 {
        delay.base.saturating_add(ctx.rng.next(delay.spread))
    } else {
        delay.base
    };
    if let Ok(egg) = ctx.world.spawn_egg(def_id, target, hatch_in) {
        ctx.sound.play(Sound::EggLaid, target);
        debug!(entity = %owner, egg = %egg, %target, hatch_in, "egg laid");
    }
}

fn shoot_at_player(owner: EntityId, ctx: &mut SimContext<'_>) {
    let Some(entity) = ctx.world.get(owner) else {
        return;
    };
    let Some(monster) = entity.as_monster() else {
        return;
    };
    let (tile, def_id) = (entity.tile, monster.def);
    if monster.is_egg() || !ctx.world.shares_room_with_player(tile) {
        return;
    }
    if ctx.rng.test(SHOT_HOLD_MASK) {
        trace!(entity = %owner, "holding fire");
        return;
    }
    let player = *ctx.world.player();
    if !player.alive {
        return;
    }
    let Some(weapon) = ctx.world.monster_def(def_id).and_then(|def| def.weapon) else {
        return;
    };
    if let Some(shot) = weapon.fire(ctx.world, owner, tile, player.tile) {
        ctx.sound.play(Sound::Shot, tile);
        debug!(entity = %owner, shot = %shot, target = %player.tile, "fired at player");
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{SilentSink, SoundLog};
    use thicket_world::monster::{HatchDelay, MonsterDefId};
    use thicket_world::random::RandomSource;
    use thicket_world::tile::{Direction, TilePos};
    use thicket_world::weapon::{Sightline, Weapon};
    use thicket_world::world::World;

    /// Returns the same raw draw every time.
    struct Fixed(u32);

    impl RandomSource for Fixed {
        fn next_u32(&mut self) -> u32 {
            self.0
        }

        fn next(&mut self, max_exclusive: u32) -> u32 {
            self.0 % max_exclusive
        }
    }

    fn sentry_def() -> MonsterDef {
        MonsterDef::new("sentry").with_weapon(Weapon {
            range: 6,
            sightline: Sightline::Both,
            damage: 1,
        })
    }

    fn layer_def() -> MonsterDef {
        MonsterDef::new("slime")
            .with_mobility(Mobility::Wandering)
            .with_eggs(HatchDelay { base: 20, spread: 0 })
    }

    fn setup(def: MonsterDef, tile: TilePos) -> (World, MonsterDefId, EntityId) {
        let mut world = World::default();
        let id = world.register_monster_def(def);
        let monster = world.spawn_monster(id, tile).unwrap();
        (world, id, monster)
    }

    fn perform(behavior: Behavior, owner: EntityId, world: &mut World, rng: u32, sound: &mut SoundLog) -> BehaviorCollection {
        let mut units = BehaviorCollection::new(owner);
        let def = world
            .monster(owner)
            .and_then(|m| world.monster_def(m.def))
            .cloned()
            .unwrap();
        units.add(behavior, &def);
        let mut rng = Fixed(rng);
        let mut ctx = SimContext::new(world, &mut rng, sound);
        behavior.perform(owner, &mut units, &mut ctx);
        units
    }

    // -- 1. kinds and eligibility -----------------------------------------

    #[test]
    fn kinds_declare_their_triggers() {
        assert_eq!(BehaviorKind::LaysEgg.triggers(), &[Trigger::Movement]);
        assert!(BehaviorKind::ActivateWhenHurt.responds_to(Trigger::Injury));
        assert!(!BehaviorKind::ActivateWhenHurt.responds_to(Trigger::Movement));
        assert!(BehaviorKind::DropsFruitWhenKilled.responds_to(Trigger::Death));
    }

    #[test]
    fn eligibility_follows_definition() {
        let plain = MonsterDef::new("bat");
        assert!(!Behavior::LaysEgg.is_supported_by(&plain));
        assert!(!Behavior::ShootsAtPlayer.is_supported_by(&plain));
        assert!(Behavior::ActivateWhenHurt.is_supported_by(&plain));
        assert!(Behavior::LaysEgg.is_supported_by(&layer_def()));
        assert!(Behavior::ShootsAtPlayer.is_supported_by(&sentry_def()));
    }

    #[test]
    fn behavior_parses_from_tagged_json() {
        let json = r#"{"kind":"change_movement_when_hurt","mobility":"chasing"}"#;
        let behavior: Behavior = serde_json::from_str(json).unwrap();
        assert_eq!(
            behavior,
            Behavior::ChangeMovementWhenHurt {
                mobility: Mobility::Chasing
            }
        );

        let json = r#"{"kind":"drops_fruit_when_killed","fruit":"grape","energy":7}"#;
        let behavior: Behavior = serde_json::from_str(json).unwrap();
        assert_eq!(
            behavior,
            Behavior::DropsFruitWhenKilled {
                fruit: FruitKind::Grape,
                energy: 7
            }
        );
    }

    // -- 2. fire-once kinds ------------------------------------------------

    #[test]
    fn activate_when_hurt_activates_and_removes_itself() {
        let (mut world, _, bat) = setup(MonsterDef::new("bat"), TilePos::new(3, 3));
        let mut sound = SoundLog::new();
        let units = perform(Behavior::ActivateWhenHurt, bat, &mut world, 0, &mut sound);
        assert!(world.monster(bat).unwrap().active);
        assert!(units.is_empty());
    }

    #[test]
    fn meets_player_waits_for_shared_room() {
        let (mut world, _, bat) = setup(MonsterDef::new("bat"), TilePos::new(50, 50));
        let mut sound = SoundLog::new();
        let units = perform(Behavior::ActivateWhenMeetsPlayer, bat, &mut world, 0, &mut sound);
        assert!(!world.monster(bat).unwrap().active);
        assert!(units.has(BehaviorKind::ActivateWhenMeetsPlayer));

        world.player_mut().tile = TilePos::new(45, 49);
        let units = perform(Behavior::ActivateWhenMeetsPlayer, bat, &mut world, 0, &mut sound);
        assert!(world.monster(bat).unwrap().active);
        assert!(units.is_empty());
        assert_eq!(sound.count(Sound::MonsterWoke), 1);
    }

    #[test]
    fn injury_kinds_overwrite_movement_and_rooms() {
        let (mut world, _, bat) = setup(MonsterDef::new("bat"), TilePos::new(0, 0));
        let mut sound = SoundLog::new();
        let units = perform(
            Behavior::MobilityAfterInjury {
                mobility: Mobility::Chasing,
                room_policy: RoomPolicy::Confined,
            },
            bat,
            &mut world,
            0,
            &mut sound,
        );
        let monster = world.monster(bat).unwrap();
        assert_eq!(monster.mobility, Mobility::Chasing);
        assert_eq!(monster.room_policy, RoomPolicy::Confined);
        assert!(units.is_empty());

        perform(
            Behavior::ChangeRoomsAfterInjury {
                room_policy: RoomPolicy::Roaming,
            },
            bat,
            &mut world,
            0,
            &mut sound,
        );
        assert_eq!(world.monster(bat).unwrap().room_policy, RoomPolicy::Roaming);
    }

    #[test]
    fn drops_fruit_only_on_free_tile() {
        let (mut world, _, bat) = setup(MonsterDef::new("bat"), TilePos::new(4, 4));
        let mut sound = SoundLog::new();
        let drop = Behavior::DropsFruitWhenKilled {
            fruit: FruitKind::Mushroom,
            energy: 3,
        };
        let units = perform(drop, bat, &mut world, 0, &mut sound);
        assert_eq!(world.items_at(TilePos::new(4, 4)).len(), 1);
        assert!(units.is_empty());

        perform(drop, bat, &mut world, 0, &mut sound);
        assert_eq!(world.items_at(TilePos::new(4, 4)).len(), 1);
    }

    // -- 3. egg laying -----------------------------------------------------

    #[test]
    fn lays_egg_behind_itself() {
        let (mut world, def, slime) = setup(layer_def(), TilePos::new(5, 5));
        world.monster_mut(slime).unwrap().facing = Direction::East;
        let mut sound = SoundLog::new();
        let units = perform(Behavior::LaysEgg, slime, &mut world, 0, &mut sound);

        let egg = world.items_at(TilePos::new(4, 5));
        assert!(egg.is_empty(), "eggs are monsters, not items");
        let eggs: Vec<_> = world
            .entities()
            .filter(|e| e.as_monster().is_some_and(|m| m.is_egg()))
            .collect();
        assert_eq!(eggs.len(), 1);
        assert_eq!(eggs[0].tile, TilePos::new(4, 5));
        let egg = eggs[0].as_monster().unwrap();
        assert_eq!(egg.def, def);
        assert_eq!(egg.egg, Some(20));
        assert_eq!(sound.played(), &[(Sound::EggLaid, TilePos::new(4, 5))]);
        assert!(units.has(BehaviorKind::LaysEgg), "egg laying is not fire-once");
    }

    #[test]
    fn egg_gates_block_laying() {
        let mut sound = SoundLog::new();

        // Failed roll.
        let (mut world, _, slime) = setup(layer_def(), TilePos::new(5, 5));
        perform(Behavior::LaysEgg, slime, &mut world, 1, &mut sound);
        assert_eq!(world.entity_count(), 1);

        // Player in another room.
        world.player_mut().tile = TilePos::new(100, 100);
        perform(Behavior::LaysEgg, slime, &mut world, 0, &mut sound);
        assert_eq!(world.entity_count(), 1);

        // Dead player.
        world.player_mut().tile = TilePos::new(0, 0);
        world.player_mut().alive = false;
        perform(Behavior::LaysEgg, slime, &mut world, 0, &mut sound);
        assert_eq!(world.entity_count(), 1);
        world.player_mut().alive = true;

        // Patrolling monsters keep to their route.
        world.monster_mut(slime).unwrap().mobility = Mobility::Patrolling;
        perform(Behavior::LaysEgg, slime, &mut world, 0, &mut sound);
        assert_eq!(world.entity_count(), 1);
        world.monster_mut(slime).unwrap().mobility = Mobility::Wandering;

        // Wall behind.
        world.add_obstruction(TilePos::new(5, 4));
        perform(Behavior::LaysEgg, slime, &mut world, 0, &mut sound);
        assert_eq!(world.entity_count(), 1);
        assert_eq!(sound.count(Sound::EggLaid), 0);
    }

    #[test]
    fn huge_hatch_delay_saturates() {
        let def = MonsterDef::new("slime")
            .with_mobility(Mobility::Wandering)
            .with_eggs(HatchDelay {
                base: u32::MAX - 1,
                spread: 10,
            });
        let (mut world, _, slime) = setup(def, TilePos::new(5, 5));
        let mut sound = SoundLog::new();
        // 16 passes the egg roll and draws 6 from the spread.
        perform(Behavior::LaysEgg, slime, &mut world, 16, &mut sound);
        let egg = world
            .entities()
            .find_map(|e| e.as_monster().filter(|m| m.is_egg()).cloned())
            .unwrap();
        assert_eq!(egg.egg, Some(u32::MAX));
    }

    #[test]
    fn eggs_do_not_lay_eggs() {
        let mut world = World::default();
        let def = world.register_monster_def(layer_def());
        let egg = world.spawn_egg(def, TilePos::new(5, 5), 10).unwrap();
        let mut sound = SoundLog::new();
        perform(Behavior::LaysEgg, egg, &mut world, 0, &mut sound);
        assert_eq!(world.entity_count(), 1);
    }

    // -- 4. shooting -------------------------------------------------------

    #[test]
    fn shoots_when_player_lined_up() {
        let (mut world, _, sentry) = setup(sentry_def(), TilePos::new(2, 5));
        world.player_mut().tile = TilePos::new(6, 5);
        let mut sound = SoundLog::new();
        let units = perform(Behavior::ShootsAtPlayer, sentry, &mut world, 1, &mut sound);

        let shots: Vec<_> = world
            .entities()
            .filter(|e| matches!(e.kind, thicket_world::world::EntityKind::Shot(_)))
            .collect();
        assert_eq!(shots.len(), 1);
        assert_eq!(shots[0].tile, TilePos::new(3, 5));
        assert_eq!(sound.count(Sound::Shot), 1);
        assert!(units.has(BehaviorKind::ShootsAtPlayer));
    }

    #[test]
    fn holds_fire_on_roll_or_misaligned_player() {
        let (mut world, _, sentry) = setup(sentry_def(), TilePos::new(2, 5));
        world.player_mut().tile = TilePos::new(6, 5);
        let mut sound = SoundLog::new();

        perform(Behavior::ShootsAtPlayer, sentry, &mut world, 0, &mut sound);
        assert_eq!(world.entity_count(), 1);

        world.player_mut().tile = TilePos::new(6, 6);
        perform(Behavior::ShootsAtPlayer, sentry, &mut world, 1, &mut sound);
        assert_eq!(world.entity_count(), 1);
        assert_eq!(sound.count(Sound::Shot), 0);
    }

    #[test]
    fn silent_sink_accepts_every_sound() {
        let (mut world, _, bat) = setup(MonsterDef::new("bat"), TilePos::new(1, 1));
        let mut units = BehaviorCollection::new(bat);
        units.add(Behavior::ActivateWhenMeetsPlayer, &MonsterDef::new("bat"));
        let mut rng = Fixed(0);
        let mut sound = SilentSink;
        let mut ctx = SimContext::new(&mut world, &mut rng, &mut sound);
        Behavior::ActivateWhenMeetsPlayer.perform(bat, &mut units, &mut ctx);
        assert!(units.is_empty());
    }
}
