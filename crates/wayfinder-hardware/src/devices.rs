//! Enum wrappers for hardware device dispatch.
//!
//! Native `async fn` in traits is not object-safe, so `Box<dyn LidarDevice>`
//! is not available. The enums in this module give the scan manager and the
//! CLI one concrete type per device family while keeping static dispatch.
//!
//! # Examples
//!
//! ```
//! use wayfinder_hardware::devices::AnyLidarDevice;
//! use wayfinder_hardware::mock::MockLidar;
//!
//! let (lidar, _handle) = MockLidar::new();
//! let any_lidar = AnyLidarDevice::Mock(lidar);
//!
//! // Can now be used polymorphically through the LidarDevice trait
//! ```

use tokio::sync::broadcast;
use wayfinder_core::{ReadingBatch, StopReason};

use crate::mock::{MockLidar, MockMotor};
use crate::traits::{LidarDevice, MotorDevice};
use crate::{DeviceInfo, Result};

/// Enum wrapper for LIDAR dispatch.
///
/// # Examples
///
/// ```
/// use wayfinder_hardware::devices::AnyLidarDevice;
/// use wayfinder_hardware::traits::LidarDevice;
/// use wayfinder_hardware::mock::MockLidar;
///
/// #[tokio::main]
/// async fn main() -> wayfinder_hardware::Result<()> {
///     let (lidar, _handle) = MockLidar::new();
///     let any_lidar = AnyLidarDevice::Mock(lidar);
///
///     let info = any_lidar.get_info().await?;
///     println!("LIDAR: {}", info.name);
///
///     Ok(())
/// }
/// ```
#[derive(Debug)]
#[non_exhaustive]
pub enum AnyLidarDevice {
    /// Mock LIDAR for development and testing.
    Mock(MockLidar),
}

impl LidarDevice for AnyLidarDevice {
    async fn read_scan(&mut self) -> Result<ReadingBatch> {
        match self {
            Self::Mock(device) => device.read_scan().await,
        }
    }

    async fn get_info(&self) -> Result<DeviceInfo> {
        match self {
            Self::Mock(device) => LidarDevice::get_info(device).await,
        }
    }
}

impl From<MockLidar> for AnyLidarDevice {
    fn from(device: MockLidar) -> Self {
        Self::Mock(device)
    }
}

/// Enum wrapper for drive dispatch.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum AnyMotorDevice {
    /// Mock drive for development and testing.
    Mock(MockMotor),
}

impl MotorDevice for AnyMotorDevice {
    fn is_enabled(&self) -> bool {
        match self {
            Self::Mock(device) => device.is_enabled(),
        }
    }

    async fn move_distance(&self, speed: i16, distance_mm: i32) -> Result<f64> {
        match self {
            Self::Mock(device) => device.move_distance(speed, distance_mm).await,
        }
    }

    async fn rotate(&self, speed: i16, degrees: f64) -> Result<()> {
        match self {
            Self::Mock(device) => device.rotate(speed, degrees).await,
        }
    }

    async fn set_speed(&self, right: i16, left: i16) -> Result<()> {
        match self {
            Self::Mock(device) => device.set_speed(right, left).await,
        }
    }

    fn halt(&self, reason: StopReason) {
        match self {
            Self::Mock(device) => device.halt(reason),
        }
    }

    fn cancel_move(&self) {
        match self {
            Self::Mock(device) => device.cancel_move(),
        }
    }

    fn subscribe_stops(&self) -> broadcast::Receiver<StopReason> {
        match self {
            Self::Mock(device) => device.subscribe_stops(),
        }
    }

    async fn get_info(&self) -> Result<DeviceInfo> {
        match self {
            Self::Mock(device) => MotorDevice::get_info(device).await,
        }
    }
}

impl From<MockMotor> for AnyMotorDevice {
    fn from(device: MockMotor) -> Self {
        Self::Mock(device)
    }
}
