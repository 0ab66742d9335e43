//! Common types shared across hardware device implementations.
//!
//! This module defines types used by both device traits, such as device
//! information, wheel speed pairs and the drive command record kept by
//! motor implementations.

use serde::{Deserialize, Serialize};
use wayfinder_core::StopReason;

/// Generic device information.
///
/// Contains metadata about a hardware device such as name, model
/// and firmware version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// Device name (e.g., "RPLidar A1", "MockMotor").
    pub name: String,

    /// Device model identifier.
    pub model: String,

    /// Optional firmware version string.
    pub firmware_version: Option<String>,
}

impl DeviceInfo {
    /// Create a new DeviceInfo with required fields.
    pub fn new(name: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            model: model.into(),
            firmware_version: None,
        }
    }

    /// Set the firmware version.
    pub fn with_firmware_version(mut self, firmware_version: impl Into<String>) -> Self {
        self.firmware_version = Some(firmware_version.into());
        self
    }
}

/// Speeds of the two drive wheels in mm/s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WheelSpeeds {
    pub right: i16,
    pub left: i16,
}

impl WheelSpeeds {
    pub const STOPPED: WheelSpeeds = WheelSpeeds { right: 0, left: 0 };

    pub fn new(right: i16, left: i16) -> Self {
        Self { right, left }
    }

    pub fn is_stopped(&self) -> bool {
        self.right == 0 && self.left == 0
    }
}

/// A command received by a drive, in the order it was issued.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MotorCommand {
    MoveDistance { speed: i16, distance_mm: i32 },
    Rotate { speed: i16, degrees: f64 },
    SetSpeed(WheelSpeeds),
    Halt(StopReason),
    CancelMove,
}

impl MotorCommand {
    pub fn is_move_distance(&self) -> bool {
        matches!(self, MotorCommand::MoveDistance { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_info_builder() {
        let info = DeviceInfo::new("RPLidar A1", "360 Laser Scanner")
            .with_firmware_version("v1.29");

        assert_eq!(info.name, "RPLidar A1");
        assert_eq!(info.model, "360 Laser Scanner");
        assert_eq!(info.firmware_version, Some("v1.29".to_string()));
    }

    #[test]
    fn test_wheel_speeds() {
        assert!(WheelSpeeds::STOPPED.is_stopped());

        let turn = WheelSpeeds::new(17, 0);
        assert!(!turn.is_stopped());
    }

    #[test]
    fn test_motor_command_serialization() {
        let command = MotorCommand::Halt(StopReason::Collision);
        let json = serde_json::to_string(&command).unwrap();
        let back: MotorCommand = serde_json::from_str(&json).unwrap();
        assert_eq!(command, back);

        assert!(
            MotorCommand::MoveDistance {
                speed: 350,
                distance_mm: 1000
            }
            .is_move_distance()
        );
        assert!(!MotorCommand::CancelMove.is_move_distance());
    }
}
