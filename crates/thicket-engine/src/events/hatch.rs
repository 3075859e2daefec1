//! Egg countdown.

use thicket_world::entity::EntityId;
use tracing::debug;

use crate::audio::Sound;
use crate::clock::ClockEvent;
use crate::context::SimContext;

/// Name under which [`HatchEggs`] registers with the clock.
pub const HATCH_EGGS_EVENT: &str = "hatch_eggs";

/// Counts every egg down by one per tick and hatches it at zero.
///
/// A hatched monster wakes immediately in its definition's default mode.
#[derive(Debug, Default, Clone, Copy)]
pub struct HatchEggs;

impl ClockEvent for HatchEggs {
    fn name(&self) -> &str {
        HATCH_EGGS_EVENT
    }

    fn update(&mut self, tick: u32, ctx: &mut SimContext<'_>) {
        let mut hatched: Vec<EntityId> = Vec::new();
        for id in ctx.world.monster_ids() {
            let Some(monster) = ctx.world.monster_mut(id) else {
                continue;
            };
            if !monster.alive {
                continue;
            }
            match monster.egg {
                Some(0) | Some(1) => {
                    monster.egg = None;
                    monster.active = true;
                    hatched.push(id);
                }
                Some(left) => monster.egg = Some(left - 1),
                None => {}
            }
        }

        for id in hatched {
            if let Some(entity) = ctx.world.get(id) {
                ctx.sound.play(Sound::EggHatched, entity.tile);
                debug!(tick, entity = %id, tile = %entity.tile, "egg hatched");
            }
        }
    }
}
