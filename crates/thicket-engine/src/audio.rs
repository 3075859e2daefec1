//! Fire-and-forget sound triggers.
//!
//! The core never waits on audio. Clock events and behaviors call
//! [`SoundSink::play`] and carry on; the front end decides what, if
//! anything, is heard.

use thicket_world::tile::TilePos;

/// Sounds the simulation core can trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sound {
    EggLaid,
    EggHatched,
    Shot,
    MonsterWoke,
}

/// Receives sound triggers.
pub trait SoundSink {
    fn play(&mut self, sound: Sound, at: TilePos);
}

/// Discards every sound.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentSink;

impl SoundSink for SilentSink {
    fn play(&mut self, _sound: Sound, _at: TilePos) {}
}

/// Records every sound in order.
#[derive(Debug, Default, Clone)]
pub struct SoundLog {
    played: Vec<(Sound, TilePos)>,
}

impl SoundLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn played(&self) -> &[(Sound, TilePos)] {
        &self.played
    }

    /// How many times `sound` was played.
    pub fn count(&self, sound: Sound) -> usize {
        self.played.iter().filter(|(s, _)| *s == sound).count()
    }
}

impl SoundSink for SoundLog {
    fn play(&mut self, sound: Sound, at: TilePos) {
        self.played.push((sound, at));
    }
}
