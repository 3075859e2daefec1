//! Periodic world events driven by the [`SimulationClock`](crate::clock::SimulationClock).

pub mod hatch;
pub mod replenish;
pub mod unlock;

pub use hatch::{HatchEggs, HATCH_EGGS_EVENT};
pub use replenish::{
    DistributionError, FruitDistribution, FruitSpec, ReplenishFruit, DEFAULT_FRUIT_SKIP_MASK,
    REPLENISH_FRUIT_EVENT,
};
pub use unlock::{UnlockLevel, DEFAULT_LEVEL_SHIFT, UNLOCK_LEVEL_EVENT};
