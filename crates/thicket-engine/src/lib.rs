//! Thicket Engine -- the simulation core: a fixed-resolution clock with
//! periodic world events, and composable per-monster behaviors.
//!
//! This crate builds on [`thicket_world`]. The [`SimulationClock`] turns
//! elapsed time into ticks and runs its registered events once per tick in
//! registration order: fruit replenishment, level unlocking and egg hatching.
//! Monster reactions are lists of small [`Behavior`]s kept by the
//! [`BehaviorStore`] and fired on movement, injury and death.
//!
//! Neither the clock nor the store owns the world. Every call that touches it
//! takes a [`SimContext`] lending the world, the random source and the sound
//! sink for the duration of the call.
//!
//! # Quick Start
//!
//! ```
//! use thicket_engine::prelude::*;
//!
//! let config = EngineConfig::default();
//! let mut world = World::new(config.rooms);
//! let mut clock = SimulationClock::new(config.clock_config()).unwrap();
//! let replenish = ReplenishFruit::new(config.fruit.clone(), &mut world).unwrap();
//! clock.register(Box::new(replenish)).unwrap();
//! clock.register(Box::new(UnlockLevel::new(config.level_shift))).unwrap();
//!
//! let mut rng = PcgRandom::new(config.seed);
//! let mut sound = SilentSink;
//! let mut ctx = SimContext::new(&mut world, &mut rng, &mut sound);
//! assert_eq!(clock.run_ticks(100, &mut ctx), 100);
//! assert_eq!(clock.tick(), 100);
//! ```
//!
//! [`SimulationClock`]: clock::SimulationClock
//! [`Behavior`]: behavior::Behavior
//! [`BehaviorStore`]: behavior::BehaviorStore
//! [`SimContext`]: context::SimContext

#![deny(unsafe_code)]

pub mod audio;
pub mod behavior;
pub mod clock;
pub mod config;
pub mod context;
pub mod events;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

/// Re-export the world crate for convenience.
pub use thicket_world;

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common engine usage.
pub mod prelude {
    // Re-export everything from the world prelude.
    pub use thicket_world::prelude::*;

    pub use crate::audio::{SilentSink, Sound, SoundLog, SoundSink};
    pub use crate::clock::{ClockConfig, ClockError, ClockEvent, SimulationClock, TickDiagnostics};
    pub use crate::config::{ConfigError, EngineConfig};
    pub use crate::context::SimContext;

    // Clock events.
    pub use crate::events::{
        DistributionError, FruitDistribution, FruitSpec, HatchEggs, ReplenishFruit, UnlockLevel,
    };

    // Behaviors.
    pub use crate::behavior::{
        AddOutcome, Behavior, BehaviorCollection, BehaviorKind, BehaviorStore, BehaviorUnit,
        Trigger,
    };
}
