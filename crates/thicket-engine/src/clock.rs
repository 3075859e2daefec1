//! Fixed-resolution simulation clock.
//!
//! The [`SimulationClock`] turns elapsed real time into discrete ticks. Each
//! call to [`advance`](SimulationClock::advance):
//!
//! 1. Adds the elapsed time to an accumulator.
//! 2. While the accumulator holds at least one resolution interval, removes
//!    one interval and emits one tick.
//! 3. Emitting a tick bumps the tick counter and runs every registered
//!    [`ClockEvent`] in registration order, to completion, before the next
//!    pending tick is considered.
//!
//! Work that must run once per tick alongside the events, such as monster
//! behaviors, goes through [`advance_with`](SimulationClock::advance_with):
//! its hook runs right after the events of each tick, so the world evolves
//! the same way whatever the frame size.
//!
//! Time is accumulated as a [`Duration`] (integer nanoseconds), so any two
//! sequences of elapsed times with the same sum produce the same tick count
//! and the same remainder. The tick counter is a `u32` that saturates: once
//! it reaches `u32::MAX`, further ticks are dropped silently.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use thicket_engine::prelude::*;
//!
//! let mut clock = SimulationClock::new(ClockConfig {
//!     resolution: Duration::from_millis(50),
//!     ..Default::default()
//! })
//! .unwrap();
//!
//! let mut world = World::default();
//! let mut rng = PcgRandom::new(1);
//! let mut sound = SilentSink;
//! let mut ctx = SimContext::new(&mut world, &mut rng, &mut sound);
//!
//! assert_eq!(clock.advance(Duration::from_millis(120), &mut ctx), 2);
//! assert_eq!(clock.tick(), 2);
//! assert_eq!(clock.pending(), Duration::from_millis(20));
//! ```

use std::time::{Duration, Instant};

use thicket_world::world::World;
use tracing::{debug, trace, warn};

use crate::context::SimContext;

/// Default tick resolution: 20 ticks per second.
pub const DEFAULT_TICK_RESOLUTION: Duration = Duration::from_millis(50);

// ---------------------------------------------------------------------------
// ClockConfig
// ---------------------------------------------------------------------------

/// Configuration for the simulation clock.
#[derive(Debug, Clone)]
pub struct ClockConfig {
    /// Real time per tick. Must be non-zero.
    pub resolution: Duration,
    /// Tick counter value to start from, e.g. when resuming a saved world.
    /// The first tick delivered is `start_tick + 1`.
    pub start_tick: u32,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            resolution: DEFAULT_TICK_RESOLUTION,
            start_tick: 0,
        }
    }
}

// ---------------------------------------------------------------------------
// ClockError
// ---------------------------------------------------------------------------

/// Errors produced when building or feeding the clock.
#[derive(Debug, thiserror::Error)]
pub enum ClockError {
    /// A constructor or registration argument was unusable.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

// ---------------------------------------------------------------------------
// TickDiagnostics
// ---------------------------------------------------------------------------

/// Timing diagnostics for the last delivered tick.
#[derive(Debug, Clone, Default)]
pub struct TickDiagnostics {
    /// The tick these timings belong to.
    pub tick: u32,
    /// Wall-clock time per event, in execution order.
    pub event_times: Vec<(String, Duration)>,
    /// Total time for the tick.
    pub total_time: Duration,
}

// ---------------------------------------------------------------------------
// ClockEvent
// ---------------------------------------------------------------------------

/// A world event driven once per tick.
pub trait ClockEvent {
    /// Unique, non-empty name used in logs and diagnostics.
    fn name(&self) -> &str;

    /// Run this event for `tick`.
    fn update(&mut self, tick: u32, ctx: &mut SimContext<'_>);

    /// Release anything the event holds in the world, such as removal
    /// subscriptions. Called once from [`SimulationClock::shutdown`].
    fn detach(&mut self, _world: &mut World) {}
}

// ---------------------------------------------------------------------------
// SimulationClock
// ---------------------------------------------------------------------------

/// Converts real time into ticks and drives the registered clock events.
///
/// The registry is append-only: events live as long as the clock.
pub struct SimulationClock {
    /// Events in registration (= invocation) order.
    events: Vec<Box<dyn ClockEvent>>,
    /// Real time not yet converted into ticks. Always below `resolution`
    /// between calls.
    accumulated: Duration,
    /// Last tick delivered.
    tick: u32,
    resolution: Duration,
    last_diagnostics: TickDiagnostics,
}

impl SimulationClock {
    /// Create a clock with no events.
    pub fn new(config: ClockConfig) -> Result<Self, ClockError> {
        if config.resolution.is_zero() {
            return Err(ClockError::InvalidArgument(
                "tick resolution must be non-zero".to_owned(),
            ));
        }
        Ok(Self {
            events: Vec::new(),
            accumulated: Duration::ZERO,
            tick: config.start_tick,
            resolution: config.resolution,
            last_diagnostics: TickDiagnostics::default(),
        })
    }

    /// Append an event to the registry.
    ///
    /// Fails with [`ClockError::InvalidArgument`] if the event's name is empty
    /// or already registered.
    pub fn register(&mut self, event: Box<dyn ClockEvent>) -> Result<(), ClockError> {
        let name = event.name();
        if name.is_empty() {
            return Err(ClockError::InvalidArgument(
                "clock event name must not be empty".to_owned(),
            ));
        }
        if self.events.iter().any(|e| e.name() == name) {
            return Err(ClockError::InvalidArgument(format!(
                "duplicate clock event name: {name:?}"
            )));
        }
        debug!(event = name, position = self.events.len(), "clock event registered");
        self.events.push(event);
        Ok(())
    }

    /// Feed `elapsed` real time into the clock and deliver every whole tick
    /// it completes. Returns the number of ticks delivered.
    pub fn advance(&mut self, elapsed: Duration, ctx: &mut SimContext<'_>) -> u32 {
        self.advance_with(elapsed, ctx, |_, _| {})
    }

    /// [`advance`](Self::advance), calling `after_tick(tick, ctx)` once per
    /// delivered tick, after that tick's events and before the next tick.
    pub fn advance_with<F>(&mut self, elapsed: Duration, ctx: &mut SimContext<'_>, mut after_tick: F) -> u32
    where
        F: FnMut(u32, &mut SimContext<'_>),
    {
        self.accumulated = self.accumulated.saturating_add(elapsed);
        let mut delivered = 0;
        while self.accumulated >= self.resolution {
            if self.is_saturated() {
                // Drop every whole interval at once; keep the remainder.
                let rem = self.accumulated.as_nanos() % self.resolution.as_nanos();
                self.accumulated = Duration::from_nanos(rem as u64);
                break;
            }
            self.accumulated -= self.resolution;
            self.emit(ctx);
            after_tick(self.tick, ctx);
            delivered += 1;
        }
        delivered
    }

    /// [`advance`](Self::advance) with the elapsed time in seconds.
    ///
    /// Negative, non-finite or overflowing values are rejected.
    pub fn advance_secs(&mut self, secs: f64, ctx: &mut SimContext<'_>) -> Result<u32, ClockError> {
        let elapsed = Duration::try_from_secs_f64(secs)
            .map_err(|e| ClockError::InvalidArgument(format!("elapsed time {secs}: {e}")))?;
        Ok(self.advance(elapsed, ctx))
    }

    /// Deliver up to `count` ticks immediately, bypassing the accumulator.
    /// Returns the number actually delivered, which is lower than `count`
    /// only when the counter saturates.
    pub fn run_ticks(&mut self, count: u32, ctx: &mut SimContext<'_>) -> u32 {
        self.run_ticks_with(count, ctx, |_, _| {})
    }

    /// [`run_ticks`](Self::run_ticks) with a per-tick hook, as in
    /// [`advance_with`](Self::advance_with).
    pub fn run_ticks_with<F>(&mut self, count: u32, ctx: &mut SimContext<'_>, mut after_tick: F) -> u32
    where
        F: FnMut(u32, &mut SimContext<'_>),
    {
        let mut delivered = 0;
        for _ in 0..count {
            if self.is_saturated() {
                break;
            }
            self.emit(ctx);
            after_tick(self.tick, ctx);
            delivered += 1;
        }
        delivered
    }

    /// Bump the counter and run every event for the new tick.
    fn emit(&mut self, ctx: &mut SimContext<'_>) {
        let tick_start = Instant::now();
        self.tick += 1;
        let tick = self.tick;

        let mut event_times = Vec::with_capacity(self.events.len());
        for event in &mut self.events {
            let start = Instant::now();
            event.update(tick, ctx);
            event_times.push((event.name().to_owned(), start.elapsed()));
        }
        trace!(tick, "tick delivered");

        if self.is_saturated() {
            warn!(tick, "tick counter saturated; later ticks will be dropped");
        }

        self.last_diagnostics = TickDiagnostics {
            tick,
            event_times,
            total_time: tick_start.elapsed(),
        };
    }

    /// Detach every event from the world, in registration order.
    pub fn shutdown(mut self, world: &mut World) {
        for event in &mut self.events {
            event.detach(world);
        }
        debug!(tick = self.tick, "clock shut down");
    }

    // -- accessors ----------------------------------------------------------

    /// The last tick delivered (or the start tick if none has been).
    pub fn tick(&self) -> u32 {
        self.tick
    }

    pub fn resolution(&self) -> Duration {
        self.resolution
    }

    /// Real time accumulated toward the next tick.
    pub fn pending(&self) -> Duration {
        self.accumulated
    }

    /// Whether the counter has reached `u32::MAX`.
    pub fn is_saturated(&self) -> bool {
        self.tick == u32::MAX
    }

    /// Simulated time represented by the tick counter.
    pub fn sim_time(&self) -> Duration {
        self.resolution.saturating_mul(self.tick)
    }

    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    /// Names of all registered events, in execution order.
    pub fn event_names(&self) -> Vec<&str> {
        self.events.iter().map(|e| e.name()).collect()
    }

    pub fn last_diagnostics(&self) -> &TickDiagnostics {
        &self.last_diagnostics
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
