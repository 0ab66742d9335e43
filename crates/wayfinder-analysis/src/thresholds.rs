//! Detection zones and their thresholds.
//!
//! Both zones are cones centred on the robot's heading: a reading is inside
//! when its angle is within `fov_degrees` of straight ahead (on either side of
//! 0°/360°) and it is closer than `distance_mm`.

use serde::{Deserialize, Serialize};
use wayfinder_core::constants::{
    DEFAULT_ADJUST_DISTANCE_MM, DEFAULT_ADJUST_FOV_DEGREES, DEFAULT_ERROR_SQUARED_TOLERANCE,
    DEFAULT_MIN_ADJUST_POINT_COUNT, DEFAULT_STOP_DISTANCE_MM, DEFAULT_STOP_FOV_DEGREES,
    FULL_CIRCLE_DEGREES,
};
use wayfinder_core::{Error, Result};

/// A forward-facing detection cone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Zone {
    pub fov_degrees: f64,
    pub distance_mm: f64,
}

impl Zone {
    pub fn new(fov_degrees: f64, distance_mm: f64) -> Self {
        Self {
            fov_degrees,
            distance_mm,
        }
    }

    /// Whether a reading at `angle` degrees and `distance` mm falls inside.
    ///
    /// # Examples
    ///
    /// ```
    /// use wayfinder_analysis::Zone;
    ///
    /// let zone = Zone::new(35.0, 300.0);
    /// assert!(zone.contains(10.0, 200.0));
    /// assert!(zone.contains(350.0, 200.0));
    /// assert!(!zone.contains(170.0, 10.0));
    /// assert!(!zone.contains(10.0, 300.0));
    /// ```
    pub fn contains(&self, angle: f64, distance: f64) -> bool {
        (angle < self.fov_degrees || angle > FULL_CIRCLE_DEGREES - self.fov_degrees)
            && distance < self.distance_mm
    }
}

/// Thresholds used by the obstacle analyzer.
///
/// Missing fields fall back to their defaults when deserialized.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoneThresholds {
    pub stop_distance_mm: f64,
    pub stop_fov_degrees: f64,
    pub adjust_distance_mm: f64,
    pub adjust_fov_degrees: f64,
    /// A side needs strictly more adjust-zone points than this to count.
    pub min_adjust_point_count: usize,
    /// Upper bound on the summed squared residual of a wall fit.
    pub error_squared_tolerance: f64,
}

impl Default for ZoneThresholds {
    fn default() -> Self {
        Self {
            stop_distance_mm: DEFAULT_STOP_DISTANCE_MM,
            stop_fov_degrees: DEFAULT_STOP_FOV_DEGREES,
            adjust_distance_mm: DEFAULT_ADJUST_DISTANCE_MM,
            adjust_fov_degrees: DEFAULT_ADJUST_FOV_DEGREES,
            min_adjust_point_count: DEFAULT_MIN_ADJUST_POINT_COUNT,
            error_squared_tolerance: DEFAULT_ERROR_SQUARED_TOLERANCE,
        }
    }
}

impl ZoneThresholds {
    pub fn stop_zone(&self) -> Zone {
        Zone::new(self.stop_fov_degrees, self.stop_distance_mm)
    }

    pub fn adjust_zone(&self) -> Zone {
        Zone::new(self.adjust_fov_degrees, self.adjust_distance_mm)
    }

    /// Check that every threshold is usable.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        validate_distance("stop_distance_mm", self.stop_distance_mm)?;
        validate_distance("adjust_distance_mm", self.adjust_distance_mm)?;
        validate_fov("stop_fov_degrees", self.stop_fov_degrees)?;
        validate_fov("adjust_fov_degrees", self.adjust_fov_degrees)?;

        if !self.error_squared_tolerance.is_finite() || self.error_squared_tolerance < 0.0 {
            return Err(Error::Config(format!(
                "error_squared_tolerance must be finite and non-negative, got {}",
                self.error_squared_tolerance
            )));
        }

        Ok(())
    }
}

fn validate_distance(field: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(Error::Config(format!(
            "{} must be finite and positive, got {}",
            field, value
        )));
    }
    Ok(())
}

fn validate_fov(field: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value <= 0.0 || value > FULL_CIRCLE_DEGREES / 2.0 {
        return Err(Error::Config(format!(
            "{} must be in (0, 180], got {}",
            field, value
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_default_thresholds_are_valid() {
        let thresholds = ZoneThresholds::default();
        assert!(thresholds.validate().is_ok());
        assert_eq!(thresholds.stop_zone(), Zone::new(35.0, 300.0));
        assert_eq!(thresholds.adjust_zone(), Zone::new(65.0, 425.0));
    }

    #[rstest]
    #[case(0.0, 100.0, true)]
    #[case(34.9, 299.0, true)]
    #[case(325.1, 10.0, true)]
    #[case(35.0, 100.0, false)]
    #[case(325.0, 100.0, false)]
    #[case(180.0, 10.0, false)]
    #[case(10.0, 300.0, false)]
    fn test_stop_zone_membership(#[case] angle: f64, #[case] distance: f64, #[case] inside: bool) {
        let zone = ZoneThresholds::default().stop_zone();
        assert_eq!(zone.contains(angle, distance), inside);
    }

    #[rstest]
    #[case::zero_stop_distance(ZoneThresholds { stop_distance_mm: 0.0, ..Default::default() })]
    #[case::nan_adjust_distance(ZoneThresholds { adjust_distance_mm: f64::NAN, ..Default::default() })]
    #[case::zero_fov(ZoneThresholds { stop_fov_degrees: 0.0, ..Default::default() })]
    #[case::wide_fov(ZoneThresholds { adjust_fov_degrees: 181.0, ..Default::default() })]
    #[case::negative_tolerance(ZoneThresholds { error_squared_tolerance: -1.0, ..Default::default() })]
    fn test_invalid_thresholds_rejected(#[case] thresholds: ZoneThresholds) {
        assert!(matches!(thresholds.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let thresholds: ZoneThresholds =
            serde_json::from_str(r#"{"stop_distance_mm": 250.0}"#).unwrap();

        assert_eq!(thresholds.stop_distance_mm, 250.0);
        assert_eq!(thresholds.adjust_distance_mm, DEFAULT_ADJUST_DISTANCE_MM);
        assert_eq!(thresholds.min_adjust_point_count, 1);
    }
}
