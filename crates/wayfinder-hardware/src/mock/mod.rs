//! Mock device implementations for testing and simulation.
//!
//! These devices are driven programmatically through their handles and need
//! no physical hardware.

pub mod lidar;
pub mod motor;

pub use lidar::{MockLidar, MockLidarHandle};
pub use motor::{MockMotor, MockMotorHandle};
