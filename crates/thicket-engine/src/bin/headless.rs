//! Headless runner: builds a small demo world and drives it for a fixed
//! amount of simulated time, logging a summary at the end.
//!
//! ```text
//! thicket-headless [config.json] [seconds]
//! ```
//!
//! Set `RUST_LOG=debug` to watch individual world events.

use std::time::Duration;

use anyhow::{Context, Result};
use thicket_engine::prelude::*;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Frame length fed to the clock; deliberately not a multiple of the tick.
const FRAME: Duration = Duration::from_micros(16_667);

const DEFAULT_SECONDS: u64 = 600;

/// Slimes stop laying eggs while the world holds this many monsters.
const MONSTER_CAP: usize = 48;

fn main() -> Result<()> {
    init_tracing();

    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) => {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("reading config file {path}"))?;
            EngineConfig::from_json_str(&raw).with_context(|| format!("loading config {path}"))?
        }
        None => EngineConfig::default(),
    };
    let seconds = match args.next() {
        Some(raw) => raw
            .parse::<u64>()
            .with_context(|| format!("simulated seconds must be a whole number, got {raw:?}"))?,
        None => DEFAULT_SECONDS,
    };

    let mut world = World::new(config.rooms);
    let defs = populate(&mut world).context("building demo world")?;

    let mut clock = SimulationClock::new(config.clock_config()).context("creating clock")?;
    let replenish = ReplenishFruit::new(config.fruit.clone(), &mut world)
        .context("creating fruit replenishment")?
        .with_skip_mask(config.fruit_skip_mask);
    clock.register(Box::new(replenish))?;
    clock.register(Box::new(UnlockLevel::new(config.level_shift)))?;
    clock.register(Box::new(HatchEggs))?;

    let mut store = BehaviorStore::new(&mut world);
    defs.install_loadouts(&mut store);

    let mut rng = PcgRandom::new(config.seed);
    let mut sound = SoundLog::new();
    let mut eaten = 0usize;
    let frames = seconds * 1_000_000 / FRAME.as_micros() as u64;
    info!(seed = config.seed, seconds, frames, "simulation starting");

    {
        let mut ctx = SimContext::new(&mut world, &mut rng, &mut sound);
        for _ in 0..frames {
            clock.advance_with(FRAME, &mut ctx, |tick, ctx| {
                limit_breeding(&mut store, ctx.world, defs.slime);
                store.run_movement(ctx);
                resolve_shots(ctx);
                eaten += walk_player(tick, ctx);
                if tick % 500 == 0 {
                    injure_nearest(&mut store, ctx);
                }
            });
            if clock.is_saturated() {
                warn!("tick counter saturated, stopping early");
                break;
            }
        }
    }

    let monsters = world.monster_ids().len();
    let fruit = world.entity_count() - monsters;
    info!(
        tick = clock.tick(),
        entities = world.entity_count(),
        monsters,
        fruit,
        eaten,
        eggs_laid = sound.count(Sound::EggLaid),
        eggs_hatched = sound.count(Sound::EggHatched),
        shots = sound.count(Sound::Shot),
        digest = %world.digest(),
        "simulation finished"
    );

    clock.shutdown(&mut world);
    store.detach(&mut world);
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

// ---------------------------------------------------------------------------
// Demo world
// ---------------------------------------------------------------------------

struct DemoDefs {
    slime: MonsterDefId,
    sentry: MonsterDefId,
    bat: MonsterDefId,
}

impl DemoDefs {
    fn install_loadouts(&self, store: &mut BehaviorStore) {
        store.set_loadout(
            self.slime,
            vec![
                Behavior::ActivateWhenMeetsPlayer,
                Behavior::LaysEgg,
                Behavior::DropsFruitWhenKilled {
                    fruit: FruitKind::Grape,
                    energy: 15,
                },
            ],
        );
        store.set_loadout(
            self.sentry,
            vec![
                Behavior::ShootsAtPlayer,
                Behavior::MobilityAfterInjury {
                    mobility: Mobility::Chasing,
                    room_policy: RoomPolicy::Roaming,
                },
            ],
        );
        store.set_loadout(
            self.bat,
            vec![
                Behavior::ActivateWhenHurt,
                Behavior::ChangeMovementWhenHurt {
                    mobility: Mobility::Chasing,
                },
            ],
        );
    }
}

/// Four progression areas in vertical bands, a wall down one side and a
/// handful of monsters.
fn populate(world: &mut World) -> Result<DemoDefs> {
    world.set_areas(
        AreaMap::new(3)
            .with_region(TileRect::new(0, 0, 20, 48), 0)
            .with_region(TileRect::new(20, 0, 40, 48), 1)
            .with_region(TileRect::new(40, 0, 60, 48), 2),
    );
    for y in 0..48 {
        world.add_obstruction(TilePos::new(-1, y));
    }

    let defs = DemoDefs {
        slime: world.register_monster_def(
            MonsterDef::new("slime")
                .with_mobility(Mobility::Wandering)
                .with_eggs(HatchDelay::default()),
        ),
        sentry: world.register_monster_def(
            MonsterDef::new("sentry")
                .with_room_policy(RoomPolicy::Confined)
                .with_weapon(Weapon {
                    range: 8,
                    sightline: Sightline::Both,
                    damage: 2,
                }),
        ),
        bat: world.register_monster_def(MonsterDef::new("bat").with_mobility(Mobility::Chasing)),
    };

    world.spawn_monster(defs.slime, TilePos::new(5, 5))?;
    world.spawn_monster(defs.slime, TilePos::new(45, 30))?;
    world.spawn_monster(defs.sentry, TilePos::new(10, 2))?;
    world.spawn_monster(defs.bat, TilePos::new(25, 10))?;
    world.spawn_monster(defs.bat, TilePos::new(70, 40))?;
    Ok(defs)
}

/// Toggle egg laying on every slime according to the monster cap.
fn limit_breeding(store: &mut BehaviorStore, world: &mut World, slime: MonsterDefId) {
    store.sync(world);
    let ids = world.monster_ids();
    let breeding = ids.len() < MONSTER_CAP;
    let Some(def) = world.monster_def(slime) else {
        return;
    };
    for id in ids {
        if world.monster(id).map(|m| m.def) != Some(slime) {
            continue;
        }
        if let Some(units) = store.collection_mut(id) {
            units.set(Behavior::LaysEgg, breeding, def);
        }
    }
}

/// Shots land on the tick they are fired.
fn resolve_shots(ctx: &mut SimContext<'_>) {
    let shots: Vec<EntityId> = ctx
        .world
        .entities()
        .filter(|e| matches!(e.kind, EntityKind::Shot(_)))
        .map(|e| e.id)
        .collect();
    for id in shots {
        if let Err(err) = ctx.world.despawn(id) {
            warn!(error = %err, "shot vanished before it landed");
        }
    }
}

/// Walk the player around a fixed loop, one tile every ten ticks, eating
/// whatever fruit lies underfoot. Returns how many fruit were eaten.
fn walk_player(tick: u32, ctx: &mut SimContext<'_>) -> usize {
    if tick % 10 == 0 {
        let step = (tick / 10) % 160;
        let (x, y) = match step {
            0..=39 => (step as i32 * 2, 6),
            40..=79 => (78, 6 + (step as i32 - 40)),
            80..=119 => (78 - (step as i32 - 80) * 2, 45),
            _ => (0, 45 - (step as i32 - 120)),
        };
        ctx.world.player_mut().tile = TilePos::new(x, y);
    }

    let tile = ctx.world.player().tile;
    let food: Vec<EntityId> = ctx.world.items_at(tile).to_vec();
    food.into_iter()
        .filter(|&id| ctx.world.despawn(id).is_ok())
        .count()
}

/// Hurt the first monster sharing the player's room, killing it if it was
/// already awake.
fn injure_nearest(store: &mut BehaviorStore, ctx: &mut SimContext<'_>) {
    let target = ctx.world.entities().find_map(|e| {
        let monster = e.as_monster()?;
        (monster.alive && !monster.is_egg() && ctx.world.shares_room_with_player(e.tile))
            .then_some((e.id, monster.active))
    });
    let Some((id, was_active)) = target else {
        return;
    };
    if !was_active {
        store.notify_injury(id, ctx);
        return;
    }
    store.notify_death(id, ctx);
    if let Some(monster) = ctx.world.monster_mut(id) {
        monster.alive = false;
    }
    if let Err(err) = ctx.world.despawn(id) {
        warn!(error = %err, "killed monster already gone");
    }
}
