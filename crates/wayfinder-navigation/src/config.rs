//! Controller configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use wayfinder_core::constants::{
    DEFAULT_ADJUST_SPEED, DEFAULT_INSTRUCTION_PAUSE_MS, DEFAULT_MOVE_SPEED, DEFAULT_ROTATE_SPEED,
    DEFAULT_TICK_INTERVAL_MS, MAX_WHEEL_SPEED,
};

use crate::error::{NavigationError, Result};

/// Speeds and timing of the navigation controller.
///
/// Speeds are in mm/s. Missing fields fall back to their defaults when
/// deserialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Straight-line speed used for distance instructions.
    pub move_speed: i16,

    /// Wheel speed used for in-place rotations.
    pub rotate_speed: i16,

    /// Wheel speed of the single driven wheel while steering around an
    /// obstacle.
    pub adjust_speed: i16,

    /// Delay between two iterations of the move loop.
    pub tick_interval_ms: u64,

    /// Delay between two instructions of a sequence.
    pub instruction_pause_ms: u64,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            move_speed: DEFAULT_MOVE_SPEED,
            rotate_speed: DEFAULT_ROTATE_SPEED,
            adjust_speed: DEFAULT_ADJUST_SPEED,
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            instruction_pause_ms: DEFAULT_INSTRUCTION_PAUSE_MS,
        }
    }
}

impl ControllerConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn instruction_pause(&self) -> Duration {
        Duration::from_millis(self.instruction_pause_ms)
    }

    /// Check speeds against the drive limits and require a non-zero tick.
    pub fn validate(&self) -> Result<()> {
        for (name, speed) in [
            ("move_speed", self.move_speed),
            ("rotate_speed", self.rotate_speed),
            ("adjust_speed", self.adjust_speed),
        ] {
            if speed <= 0 || speed > MAX_WHEEL_SPEED {
                return Err(NavigationError::Config(format!(
                    "{} must be in 1..={}, got {}",
                    name, MAX_WHEEL_SPEED, speed
                )));
            }
        }

        if self.tick_interval_ms == 0 {
            return Err(NavigationError::Config(
                "tick_interval_ms must be positive".to_string(),
            ));
        }

        Ok(())
    }
}
