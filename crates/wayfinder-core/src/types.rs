use crate::constants::{ADJUST_ANGLE_DEGREES, FULL_CIRCLE_DEGREES};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One LIDAR sample.
///
/// Angles are sensor-relative degrees in `[0, 360)`, with 0° straight ahead
/// and angles growing clockwise. A `quality` of zero marks an invalid sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Angle in degrees.
    pub angle: f64,
    /// Distance in millimeters.
    pub distance: f64,
    /// Signal quality, 0 when the sample is unusable.
    pub quality: u8,
}

impl Reading {
    /// Create a reading, rejecting non-finite or negative values.
    pub fn new(angle: f64, distance: f64, quality: u8) -> Result<Self> {
        if !angle.is_finite() || !(0.0..360.0).contains(&angle) {
            return Err(Error::InvalidReading(format!(
                "angle must be in [0, 360), got {}",
                angle
            )));
        }
        if !distance.is_finite() || distance < 0.0 {
            return Err(Error::InvalidReading(format!(
                "distance must be non-negative, got {}",
                distance
            )));
        }
        Ok(Self {
            angle,
            distance,
            quality,
        })
    }

    pub fn is_valid(&self) -> bool {
        self.quality != 0
    }

    /// Convert to Cartesian coordinates, y pointing ahead and x to the right.
    pub fn to_cartesian(&self) -> Point {
        let radians = self.angle.to_radians();
        Point {
            x: radians.sin() * self.distance,
            y: radians.cos() * self.distance,
        }
    }

    /// Which side of the robot this reading lies on.
    pub fn side(&self) -> Side {
        if self.to_cartesian().x < 0.0 {
            Side::Left
        } else {
            Side::Right
        }
    }
}

/// A point in the robot frame, in millimeters.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Distance from the origin.
    pub fn norm(&self) -> f64 {
        self.x.hypot(self.y)
    }

    /// Convert back to `(angle, distance)`, with the angle in `[0, 360)` like
    /// a [`Reading`].
    ///
    /// The angle comes from `asin(x / r)`, so points behind the robot fold
    /// onto the front half-plane. Returns `None` for the origin.
    pub fn to_polar(&self) -> Option<(f64, f64)> {
        let distance = self.norm();
        if distance == 0.0 {
            return None;
        }
        let mut angle = (self.x / distance).asin().to_degrees();
        if angle < 0.0 {
            angle += FULL_CIRCLE_DEGREES;
        }
        // -1e-17 + 360 rounds to 360
        if angle >= FULL_CIRCLE_DEGREES {
            angle = 0.0;
        }
        Some((angle, distance))
    }

    /// The reading a sensor at the origin would report for this point.
    pub fn to_reading(&self, quality: u8) -> Option<Reading> {
        self.to_polar().map(|(angle, distance)| Reading {
            angle,
            distance,
            quality,
        })
    }
}

/// All readings of one scan cycle.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ReadingBatch {
    pub readings: Vec<Reading>,
    /// Monotonic timestamp in milliseconds.
    pub timestamp: u64,
}

impl ReadingBatch {
    pub fn new(readings: Vec<Reading>, timestamp: u64) -> Self {
        Self {
            readings,
            timestamp,
        }
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    /// Iterate over readings with non-zero quality.
    pub fn valid_readings(&self) -> impl Iterator<Item = &Reading> {
        self.readings.iter().filter(|r| r.is_valid())
    }
}

/// Side of the robot, split by the sign of the Cartesian x coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Left,
    Right,
}

impl Side {
    /// Signed turn hint carried by an adjust recommendation.
    ///
    /// An obstacle on the left yields `+90`, on the right `-90`.
    pub fn adjust_angle(&self) -> i16 {
        match self {
            Side::Left => ADJUST_ANGLE_DEGREES,
            Side::Right => -ADJUST_ANGLE_DEGREES,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Left => write!(f, "left"),
            Side::Right => write!(f, "right"),
        }
    }
}

/// Movement recommendation derived from a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    /// Path ahead is clear.
    Move,
    /// Something is too close ahead, or the situation is ambiguous.
    ///
    /// Also the initial value, before anything has been scanned.
    #[default]
    Stop,
    /// Steer away from the obstacle on the given side.
    AdjustObstacle(Side),
}

impl Recommendation {
    /// Signed adjust angle, zero unless this is an adjust recommendation.
    pub fn adjust_angle(&self) -> i16 {
        match self {
            Recommendation::AdjustObstacle(side) => side.adjust_angle(),
            _ => 0,
        }
    }
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Recommendation::Move => write!(f, "Move"),
            Recommendation::Stop => write!(f, "Stop"),
            Recommendation::AdjustObstacle(side) => {
                write!(f, "AdjustObstacle({:+})", side.adjust_angle())
            }
        }
    }
}

/// Why the drive stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum StopReason {
    /// A halt was explicitly requested.
    Requested = 0,
    /// The movement completed.
    Success = 1,
    /// A bumper fired.
    Collision = 2,
    /// The movement was cancelled as a whole.
    Cancelled = 3,
}

impl StopReason {
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn from_u8(value: u8) -> Result<Self> {
        match value {
            0 => Ok(StopReason::Requested),
            1 => Ok(StopReason::Success),
            2 => Ok(StopReason::Collision),
            3 => Ok(StopReason::Cancelled),
            other => Err(Error::Config(format!("Unknown stop reason: {}", other))),
        }
    }

    /// Whether this reason ends any move loop in progress.
    pub fn is_interrupting(&self) -> bool {
        matches!(self, StopReason::Collision | StopReason::Cancelled)
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            StopReason::Requested => "Requested",
            StopReason::Success => "Success",
            StopReason::Collision => "Collision",
            StopReason::Cancelled => "Cancelled",
        };
        write!(f, "{}", reason)
    }
}

/// A single navigation step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Instruction {
    /// Rotate in place; positive degrees turn right.
    Angle(f64),
    /// Drive forward this many meters.
    Distance(f64),
}

impl Instruction {
    /// Target distance in millimeters for a distance instruction.
    pub fn distance_mm(&self) -> Option<i32> {
        match self {
            Instruction::Distance(meters) => Some((meters * 1000.0).round() as i32),
            Instruction::Angle(_) => None,
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Instruction::Angle(degrees) if degrees == 90.0 => write!(f, "Turn right."),
            Instruction::Angle(degrees) if degrees == -90.0 => write!(f, "Turn left."),
            Instruction::Angle(degrees) if degrees == 180.0 => write!(f, "Turn around."),
            Instruction::Angle(degrees) => write!(f, "Turn {} degrees.", degrees),
            Instruction::Distance(meters) => write!(f, "Move {} meters.", meters),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const EPS: f64 = 1e-9;

    #[rstest]
    #[case(0.0, 100.0, 0.0, 100.0)]
    #[case(90.0, 100.0, 100.0, 0.0)]
    #[case(180.0, 100.0, 0.0, -100.0)]
    #[case(270.0, 100.0, -100.0, 0.0)]
    fn test_reading_to_cartesian(
        #[case] angle: f64,
        #[case] distance: f64,
        #[case] x: f64,
        #[case] y: f64,
    ) {
        let point = Reading::new(angle, distance, 1).unwrap().to_cartesian();
        assert!((point.x - x).abs() < EPS, "x = {}", point.x);
        assert!((point.y - y).abs() < EPS, "y = {}", point.y);
    }

    #[rstest]
    #[case(10.0, Side::Right)]
    #[case(350.0, Side::Left)]
    #[case(0.0, Side::Right)]
    #[case(200.0, Side::Left)]
    fn test_reading_side(#[case] angle: f64, #[case] expected: Side) {
        let reading = Reading::new(angle, 250.0, 1).unwrap();
        assert_eq!(reading.side(), expected);
    }

    #[rstest]
    #[case(-1.0, 10.0)]
    #[case(360.0, 10.0)]
    #[case(10.0, -5.0)]
    #[case(f64::NAN, 10.0)]
    #[case(10.0, f64::INFINITY)]
    fn test_reading_invalid(#[case] angle: f64, #[case] distance: f64) {
        assert!(Reading::new(angle, distance, 1).is_err());
    }

    #[test]
    fn test_point_to_polar() {
        let (angle, distance) = Point::new(100.0, 100.0).to_polar().unwrap();
        assert!((angle - 45.0).abs() < 1e-6);
        assert!((distance - 100.0 * 2f64.sqrt()).abs() < 1e-6);

        assert!(Point::default().to_polar().is_none());
    }

    #[rstest]
    #[case::ahead_right(45.0)]
    #[case::ahead_left(315.0)]
    #[case::straight_ahead(0.0)]
    #[case::left(270.0)]
    #[case::right(90.0)]
    fn test_front_readings_survive_polar_round_trip(#[case] angle: f64) {
        let reading = Reading::new(angle, 100.0, 3).unwrap();
        let back = reading.to_cartesian().to_reading(3).unwrap();

        assert!((back.angle - angle).abs() < 1e-9, "angle = {}", back.angle);
        assert!((back.distance - 100.0).abs() < 1e-9);
        assert_eq!(back.side(), reading.side());
        assert!(Reading::new(back.angle, back.distance, back.quality).is_ok());
    }

    #[test]
    fn test_point_behind_folds_forward() {
        let (angle, _) = Point::new(-100.0, -100.0).to_polar().unwrap();
        assert!((angle - 315.0).abs() < 1e-9);

        let (angle, distance) = Point::new(-0.0, -50.0).to_polar().unwrap();
        assert_eq!(angle, 0.0);
        assert_eq!(distance, 50.0);
    }

    #[test]
    fn test_batch_valid_readings() {
        let batch = ReadingBatch::new(
            vec![
                Reading::new(10.0, 100.0, 0).unwrap(),
                Reading::new(20.0, 100.0, 15).unwrap(),
            ],
            5,
        );
        assert_eq!(batch.len(), 2);
        assert_eq!(batch.valid_readings().count(), 1);
    }

    #[test]
    fn test_recommendation_adjust_angle() {
        assert_eq!(Recommendation::Move.adjust_angle(), 0);
        assert_eq!(Recommendation::Stop.adjust_angle(), 0);
        assert_eq!(
            Recommendation::AdjustObstacle(Side::Left).adjust_angle(),
            90
        );
        assert_eq!(
            Recommendation::AdjustObstacle(Side::Right).adjust_angle(),
            -90
        );
        assert_eq!(Recommendation::default(), Recommendation::Stop);
    }

    #[test]
    fn test_recommendation_display() {
        assert_eq!(
            Recommendation::AdjustObstacle(Side::Right).to_string(),
            "AdjustObstacle(-90)"
        );
        assert_eq!(
            Recommendation::AdjustObstacle(Side::Left).to_string(),
            "AdjustObstacle(+90)"
        );
    }

    #[rstest]
    #[case(StopReason::Requested)]
    #[case(StopReason::Success)]
    #[case(StopReason::Collision)]
    #[case(StopReason::Cancelled)]
    fn test_stop_reason_u8(#[case] reason: StopReason) {
        assert_eq!(StopReason::from_u8(reason.as_u8()).unwrap(), reason);
    }

    #[test]
    fn test_stop_reason_unknown() {
        assert!(StopReason::from_u8(4).is_err());
        assert!(StopReason::Collision.is_interrupting());
        assert!(!StopReason::Requested.is_interrupting());
    }

    #[rstest]
    #[case(Instruction::Angle(90.0), "Turn right.")]
    #[case(Instruction::Angle(-90.0), "Turn left.")]
    #[case(Instruction::Angle(180.0), "Turn around.")]
    #[case(Instruction::Angle(45.0), "Turn 45 degrees.")]
    #[case(Instruction::Distance(2.5), "Move 2.5 meters.")]
    fn test_instruction_display(#[case] instruction: Instruction, #[case] expected: &str) {
        assert_eq!(instruction.to_string(), expected);
    }

    #[test]
    fn test_instruction_serialization() {
        let json = serde_json::to_string(&Instruction::Distance(1.5)).unwrap();
        assert_eq!(json, r#"{"type":"distance","value":1.5}"#);
        let back: Instruction = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Instruction::Distance(1.5));
        assert_eq!(back.distance_mm(), Some(1500));
    }
}
