//! Engine configuration loaded from JSON.
//!
//! Every field has a default, so a config file only needs to name what it
//! changes:
//!
//! ```
//! use thicket_engine::config::EngineConfig;
//!
//! let config = EngineConfig::from_json_str(r#"{ "seed": 9, "tick_millis": 25 }"#).unwrap();
//! assert_eq!(config.seed, 9);
//! assert_eq!(config.clock_config().resolution.as_millis(), 25);
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thicket_world::tile::{RoomGeometry, TileRect};
use thicket_world::world::FruitKind;

use crate::clock::ClockConfig;
use crate::events::{DistributionError, FruitDistribution, FruitSpec, DEFAULT_FRUIT_SKIP_MASK, DEFAULT_LEVEL_SHIFT};

/// Errors produced when loading or validating an [`EngineConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to parse engine config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid engine config: {0}")]
    Invalid(String),

    #[error("invalid fruit distribution: {0}")]
    Distribution(#[from] DistributionError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Seed for the world's random source.
    pub seed: u64,
    /// Real milliseconds per tick.
    pub tick_millis: u64,
    /// Tick to resume from.
    pub start_tick: u32,
    /// A new level unlocks every `2^level_shift` ticks.
    pub level_shift: u32,
    /// Mask for the per-tick fruit skip test.
    pub fruit_skip_mask: u32,
    pub rooms: RoomGeometry,
    pub fruit: FruitDistribution,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            seed: 0x7468_6963,
            tick_millis: 50,
            start_tick: 0,
            level_shift: DEFAULT_LEVEL_SHIFT,
            fruit_skip_mask: DEFAULT_FRUIT_SKIP_MASK,
            rooms: RoomGeometry::default(),
            fruit: default_fruit(),
        }
    }
}

fn default_fruit() -> FruitDistribution {
    FruitDistribution::new(vec![
        FruitSpec {
            kind: FruitKind::Apple,
            quantity: 8,
            energy: 10,
            area: TileRect::new(0, 0, 80, 48),
        },
        FruitSpec {
            kind: FruitKind::Cherry,
            quantity: 4,
            energy: 25,
            area: TileRect::new(40, 0, 80, 24),
        },
        FruitSpec {
            kind: FruitKind::Mushroom,
            quantity: 2,
            energy: 40,
            area: TileRect::new(0, 24, 40, 48),
        },
    ])
}

impl EngineConfig {
    /// Parse and validate a JSON config.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_millis == 0 {
            return Err(ConfigError::Invalid("tick_millis must be positive".into()));
        }
        if self.rooms.width == 0 || self.rooms.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "room size must be positive, got {}x{}",
                self.rooms.width, self.rooms.height
            )));
        }
        if self.level_shift >= u32::BITS {
            return Err(ConfigError::Invalid(format!(
                "level_shift must be below {}, got {}",
                u32::BITS,
                self.level_shift
            )));
        }
        self.fruit.validate()?;
        Ok(())
    }

    pub fn clock_config(&self) -> ClockConfig {
        ClockConfig {
            resolution: Duration::from_millis(self.tick_millis),
            start_tick: self.start_tick,
        }
    }
}
