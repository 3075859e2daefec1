//! The mutable state handed to clock events and behaviors.

use thicket_world::random::RandomSource;
use thicket_world::world::World;

use crate::audio::SoundSink;

/// Borrowed view of everything a tick or a behavior may touch.
///
/// The clock and the behavior store do not own the world; the caller lends
/// it for the duration of one call.
pub struct SimContext<'a> {
    pub world: &'a mut World,
    pub rng: &'a mut dyn RandomSource,
    pub sound: &'a mut dyn SoundSink,
}

impl<'a> SimContext<'a> {
    pub fn new(
        world: &'a mut World,
        rng: &'a mut dyn RandomSource,
        sound: &'a mut dyn SoundSink,
    ) -> Self {
        Self { world, rng, sound }
    }
}
