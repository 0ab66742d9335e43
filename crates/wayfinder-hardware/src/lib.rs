//! Hardware device abstraction layer for the wayfinder navigation robot.
//!
//! This crate provides trait-based abstractions for the two peripherals the
//! navigation core needs: a scanning range finder (LIDAR) and a differential
//! drive. Mock implementations allow the whole navigation stack to run in
//! tests and simulation without a robot.
//!
//! # Design Philosophy
//!
//! - **Async-first**: I/O operations are asynchronous using native `async fn`
//!   in traits (Rust 1.90 + Edition 2024 RPITIT).
//! - **Thread-safe**: All traits require `Send + Sync` for use with Tokio.
//! - **Error-aware**: All operations return `Result<T>` with detailed error
//!   information.
//!
//! # Device Traits
//!
//! ## LIDAR
//!
//! The [`LidarDevice`] trait yields one [`ReadingBatch`] per revolution:
//!
//! ```no_run
//! use wayfinder_hardware::traits::LidarDevice;
//! use wayfinder_hardware::error::Result;
//!
//! async fn count_valid<L: LidarDevice>(lidar: &mut L) -> Result<usize> {
//!     let batch = lidar.read_scan().await?;
//!     Ok(batch.valid_readings().count())
//! }
//! ```
//!
//! ## Drive
//!
//! The [`MotorDevice`] trait drives the wheels and announces how each
//! movement ended on a broadcast channel:
//!
//! ```no_run
//! use wayfinder_core::StopReason;
//! use wayfinder_hardware::traits::MotorDevice;
//! use wayfinder_hardware::error::Result;
//!
//! async fn nudge<M: MotorDevice>(motor: &M) -> Result<StopReason> {
//!     let mut stops = motor.subscribe_stops();
//!     motor.move_distance(100, 50).await?;
//!     Ok(stops.recv().await.unwrap_or(StopReason::Cancelled))
//! }
//! ```
//!
//! # Scan Manager
//!
//! [`ScanManager`] runs every registered LIDAR in its own task and merges the
//! scans into one stream of [`ScanEvent`]s.
//!
//! [`LidarDevice`]: traits::LidarDevice
//! [`MotorDevice`]: traits::MotorDevice
//! [`ReadingBatch`]: wayfinder_core::ReadingBatch

pub mod devices;
pub mod error;
pub mod manager;
pub mod mock;
pub mod traits;
pub mod types;

// Re-export commonly used types for convenience
pub use error::{HardwareError, Result};
pub use traits::{LidarDevice, MotorDevice};
pub use types::{DeviceInfo, MotorCommand, WheelSpeeds};

// Re-export manager types
pub use manager::{ScanConfig, ScanEvent, ScanHandle, ScanManager, TaskTermination};
