//! Error types for navigation operations.

use wayfinder_hardware::HardwareError;

use crate::state_machine::NavigationPhase;

/// Result type alias for navigation operations.
pub type Result<T> = std::result::Result<T, NavigationError>;

/// Errors returned by the navigation controller and route planner.
///
/// Collisions and cancellations are not errors: they end a movement normally
/// and are reported through [`StopReason`](wayfinder_core::StopReason).
#[derive(Debug, thiserror::Error)]
pub enum NavigationError {
    /// The drive is not enabled, so no movement was attempted.
    #[error("Drive is not ready")]
    MotorNotReady,

    /// A movement was requested while another one is in progress.
    #[error("Controller busy: {0}")]
    Busy(NavigationPhase),

    /// Room navigation was requested without a building map.
    #[error("No route planner configured")]
    NoPlanner,

    /// Invalid controller configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Drive or LIDAR failure.
    #[error(transparent)]
    Hardware(#[from] HardwareError),

    /// Map, route or state errors from the core crate.
    #[error(transparent)]
    Core(#[from] wayfinder_core::Error),
}

impl NavigationError {
    /// Whether the error came from a room that is not on the map.
    pub fn is_unknown_room(&self) -> bool {
        matches!(self, Self::Core(wayfinder_core::Error::RoomNotFound(_)))
    }
}
