//! Default constants for obstacle analysis and navigation.
//!
//! This module centralises the tuning values shared across the Wayfinder
//! workspace. Every value here is a *default*: the analyzer thresholds and the
//! controller speeds can be overridden at runtime through their configuration
//! structs, so these constants mostly document what the robot was tuned with.
//!
//! # Zones
//!
//! The analyzer looks at two cones straddling the robot's heading (0°/360°):
//!
//! ```text
//!            adjust FOV (65°)
//!        \        |        /
//!         \  stop | FOV   /
//!          \ (35°)|      /
//!           \     |     /
//!            \    |    /
//!             [ robot ]
//! ```
//!
//! A cone of half-width `fov` contains every angle with
//! `angle < fov || angle > 360 - fov`, so the total width is `2 * fov`.
//!
//! # Usage
//!
//! ```
//! use wayfinder_core::constants::*;
//!
//! assert!(DEFAULT_STOP_DISTANCE_MM < DEFAULT_ADJUST_DISTANCE_MM);
//! assert!(DEFAULT_STOP_FOV_DEGREES < DEFAULT_ADJUST_FOV_DEGREES);
//! ```

// ============================================================================
// Obstacle Zones
// ============================================================================

/// Distance (mm) below which an obstacle inside the stop cone halts the robot.
pub const DEFAULT_STOP_DISTANCE_MM: f64 = 300.0;

/// Half-angle (degrees) of the stop cone.
pub const DEFAULT_STOP_FOV_DEGREES: f64 = 35.0;

/// Distance (mm) below which an obstacle inside the adjust cone triggers a
/// course correction.
pub const DEFAULT_ADJUST_DISTANCE_MM: f64 = 425.0;

/// Half-angle (degrees) of the adjust cone.
pub const DEFAULT_ADJUST_FOV_DEGREES: f64 = 65.0;

/// A side must hold strictly more adjust-zone points than this before the
/// analyzer recommends an adjustment.
pub const DEFAULT_MIN_ADJUST_POINT_COUNT: usize = 1;

/// Maximum summed squared residual for a set of points to count as a wall.
pub const DEFAULT_ERROR_SQUARED_TOLERANCE: f64 = 700.0;

/// Magnitude of the turn hint attached to an adjust recommendation.
///
/// Only the sign is meaningful to the controller.
pub const ADJUST_ANGLE_DEGREES: i16 = 90;

/// Full circle in degrees, used by the zone membership test.
pub const FULL_CIRCLE_DEGREES: f64 = 360.0;

// ============================================================================
// Drive
// ============================================================================

/// Forward speed (mm/s) used for distance instructions.
pub const DEFAULT_MOVE_SPEED: i16 = 350;

/// Wheel speed (mm/s) used for angle instructions.
pub const DEFAULT_ROTATE_SPEED: i16 = 70;

/// Wheel speed (mm/s) used while steering away from an obstacle.
///
/// A quarter of the rotate speed, truncated.
pub const DEFAULT_ADJUST_SPEED: i16 = DEFAULT_ROTATE_SPEED / 4;

/// Maximum wheel speed magnitude accepted by the drive (mm/s).
pub const MAX_WHEEL_SPEED: i16 = 500;

/// Distance between the two drive wheels (mm).
pub const WHEEL_BASE_MM: f64 = 233.0;

// ============================================================================
// Timing
// ============================================================================

/// Interval between two iterations of the move loop (ms).
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 100;

/// Pause between two consecutive instructions of a sequence (ms).
pub const DEFAULT_INSTRUCTION_PAUSE_MS: u64 = 500;

/// Minimum interval between two scan reads of one LIDAR task (ms).
pub const DEFAULT_MIN_SCAN_INTERVAL_MS: u64 = 10;

/// Capacity of the scan event channel.
pub const DEFAULT_SCAN_CHANNEL_CAPACITY: usize = 32;

/// Capacity of broadcast channels carrying analysis and motor events.
pub const EVENT_CHANNEL_CAPACITY: usize = 64;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adjust_speed_is_quarter_of_rotate_speed() {
        assert_eq!(DEFAULT_ADJUST_SPEED, 17);
    }

    #[test]
    fn test_speeds_within_drive_limits() {
        for speed in [DEFAULT_MOVE_SPEED, DEFAULT_ROTATE_SPEED, DEFAULT_ADJUST_SPEED] {
            assert!(speed > 0 && speed <= MAX_WHEEL_SPEED);
        }
    }
}
