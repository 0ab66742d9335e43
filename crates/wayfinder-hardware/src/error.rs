//! Errors raised by the LIDAR and drive devices.

/// Result type alias for hardware operations.
pub type Result<T> = std::result::Result<T, HardwareError>;

#[derive(Debug, thiserror::Error)]
pub enum HardwareError {
    /// The device went away, or its feed closed.
    #[error("Device disconnected: {device}")]
    Disconnected { device: String },

    /// A command argument the device cannot act on.
    #[error("Invalid data: {message}")]
    InvalidData { message: String },

    /// Drive command rejected because the motors are not enabled.
    #[error("Drive not enabled: {device}")]
    NotEnabled { device: String },

    /// Wheel speed outside of the drive's range.
    #[error("Invalid speed {speed} mm/s (limit {limit} mm/s)")]
    InvalidSpeed { speed: i16, limit: i16 },
}

impl HardwareError {
    pub fn disconnected(device: impl Into<String>) -> Self {
        Self::Disconnected {
            device: device.into(),
        }
    }

    pub fn invalid_data(message: impl Into<String>) -> Self {
        Self::InvalidData {
            message: message.into(),
        }
    }

    pub fn not_enabled(device: impl Into<String>) -> Self {
        Self::NotEnabled {
            device: device.into(),
        }
    }

    pub fn invalid_speed(speed: i16, limit: i16) -> Self {
        Self::InvalidSpeed { speed, limit }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::disconnected(
        HardwareError::disconnected("RPLidar A1"),
        "Device disconnected: RPLidar A1"
    )]
    #[case::invalid_data(
        HardwareError::invalid_data("Rotation must be finite, got NaN"),
        "Invalid data: Rotation must be finite, got NaN"
    )]
    #[case::not_enabled(HardwareError::not_enabled("Create 2"), "Drive not enabled: Create 2")]
    #[case::invalid_speed(
        HardwareError::invalid_speed(700, 500),
        "Invalid speed 700 mm/s (limit 500 mm/s)"
    )]
    fn test_error_display(#[case] error: HardwareError, #[case] expected: &str) {
        assert_eq!(error.to_string(), expected);
    }
}
