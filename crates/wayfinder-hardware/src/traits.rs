//! Hardware device trait definitions.
//!
//! This module defines the trait interfaces between the navigation core and
//! the robot's peripherals: a scanning range finder (LIDAR) and a
//! differential drive. These traits let the controller run unchanged against
//! mock devices in tests and simulation, and against real drivers on the
//! robot.
//!
//! `LidarDevice` uses native `async fn` methods (Rust 1.90 + Edition 2024
//! RPITIT). `MotorDevice` spells its futures out as `impl Future + Send` so
//! that a controller generic over the drive can still be spawned onto the
//! multi-threaded runtime; implementations write plain `async fn`.

#![allow(async_fn_in_trait)]

use std::future::Future;

use tokio::sync::broadcast;
use wayfinder_core::{ReadingBatch, StopReason};

use crate::error::Result;
use crate::types::DeviceInfo;

/// Scanning range finder abstraction.
///
/// A LIDAR produces one [`ReadingBatch`] per revolution. Batches carry a
/// monotonic timestamp so consumers can drop batches delivered out of order.
///
/// # Object Safety and Dynamic Dispatch
///
/// **NOTE**: This trait is NOT object-safe because `async fn` methods return
/// `impl Future`. Use generic type parameters, or the enum wrapper from the
/// [`devices`](crate::devices) module when a concrete type is required (e.g.
/// in the [`ScanManager`](crate::manager::ScanManager)).
///
/// # Examples
///
/// ```no_run
/// use wayfinder_hardware::traits::LidarDevice;
/// use wayfinder_hardware::error::Result;
///
/// async fn closest_obstacle<L: LidarDevice>(lidar: &mut L) -> Result<Option<f64>> {
///     let batch = lidar.read_scan().await?;
///
///     Ok(batch
///         .valid_readings()
///         .map(|r| r.distance)
///         .min_by(|a, b| a.total_cmp(b)))
/// }
/// ```
pub trait LidarDevice: Send + Sync {
    /// Wait for the next complete scan.
    ///
    /// # Errors
    ///
    /// Returns an error if the device disconnects or delivers a malformed
    /// scan.
    async fn read_scan(&mut self) -> Result<ReadingBatch>;

    /// Get device information.
    async fn get_info(&self) -> Result<DeviceInfo>;
}

/// Differential drive abstraction.
///
/// Speeds are in mm/s, distances in millimeters and angles in degrees
/// (positive turns right). Long-running commands (`move_distance`, `rotate`)
/// are overridden by any later command: an overridden command returns early
/// without a stop notification. Every other way a movement ends is announced
/// on the stop channel returned by [`subscribe_stops`](Self::subscribe_stops).
///
/// # Examples
///
/// ```no_run
/// use wayfinder_hardware::traits::MotorDevice;
/// use wayfinder_hardware::error::Result;
///
/// async fn creep_forward<M: MotorDevice>(motor: &M) -> Result<f64> {
///     if !motor.is_enabled() {
///         return Ok(0.0);
///     }
///     motor.move_distance(100, 250).await
/// }
/// ```
pub trait MotorDevice: Send + Sync {
    /// Whether the drive is initialised and accepting commands.
    fn is_enabled(&self) -> bool;

    /// Drive straight for `distance_mm` at `speed`.
    ///
    /// Resolves once the movement ends and returns the distance actually
    /// travelled, which is shorter than requested when the movement was
    /// halted, overridden or interrupted by a collision.
    fn move_distance(
        &self,
        speed: i16,
        distance_mm: i32,
    ) -> impl Future<Output = Result<f64>> + Send;

    /// Rotate in place by `degrees` at `speed`.
    fn rotate(&self, speed: i16, degrees: f64) -> impl Future<Output = Result<()>> + Send;

    /// Set both wheel speeds, overriding any command in flight.
    fn set_speed(&self, right: i16, left: i16) -> impl Future<Output = Result<()>> + Send;

    /// Stop the wheels and announce `reason` on the stop channel.
    fn halt(&self, reason: StopReason);

    /// Abort the command in flight without announcing a stop.
    fn cancel_move(&self);

    /// Subscribe to stop notifications.
    fn subscribe_stops(&self) -> broadcast::Receiver<StopReason>;

    /// Get device information.
    fn get_info(&self) -> impl Future<Output = Result<DeviceInfo>> + Send;
}
