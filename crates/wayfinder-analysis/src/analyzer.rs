//! Obstacle analyzer.
//!
//! Turns each LIDAR scan into a movement [`Recommendation`]:
//!
//! 1. Any valid reading inside the stop zone recommends `Stop` immediately.
//! 2. Otherwise readings inside the adjust zone are split into left (`x < 0`)
//!    and right points. When either side holds more than
//!    `min_adjust_point_count` points, the side with the strictly nearer
//!    point is avoided (`AdjustObstacle(side)`); a tie recommends `Stop`.
//! 3. Otherwise `Move`.
//!
//! Batches are processed one at a time in timestamp order; a batch older than
//! the last processed one is dropped without touching any state. Observers
//! read the held recommendation through a `watch` channel and receive one
//! [`AnalysisChanged`] event per change on a `broadcast` channel.
//!
//! # Examples
//!
//! ```
//! use wayfinder_analysis::ObstacleAnalyzer;
//! use wayfinder_core::{Reading, Recommendation};
//!
//! let analyzer = ObstacleAnalyzer::new();
//! let readings = [
//!     Reading { angle: 10.0, distance: 200.0, quality: 1 },
//!     Reading { angle: 170.0, distance: 10.0, quality: 1 },
//! ];
//!
//! assert_eq!(analyzer.process_readings(&readings, 1), Some(Recommendation::Stop));
//! assert_eq!(analyzer.current(), Recommendation::Stop);
//! ```

use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, watch};
use tracing::{debug, trace};
use wayfinder_core::constants::EVENT_CHANNEL_CAPACITY;
use wayfinder_core::{Point, Reading, ReadingBatch, Recommendation, Result, Side};

use crate::geometry::{LineFit, fit_wall};
use crate::thresholds::ZoneThresholds;

/// Notification that the held recommendation changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisChanged {
    pub recommendation: Recommendation,
    /// Timestamp of the batch that caused the change.
    pub timestamp: u64,
}

/// Walls fitted independently on each side of the adjust zone.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct WallEstimates {
    pub left: Option<LineFit>,
    pub right: Option<LineFit>,
}

#[derive(Debug, Default)]
struct ProcessingState {
    last_timestamp: u64,
}

/// Classifies LIDAR scans into movement recommendations.
///
/// All methods take `&self`; share the analyzer behind an `Arc`.
#[derive(Debug)]
pub struct ObstacleAnalyzer {
    processing: Mutex<ProcessingState>,
    thresholds: watch::Sender<ZoneThresholds>,
    recommendation: watch::Sender<Recommendation>,
    events: broadcast::Sender<AnalysisChanged>,
}

impl Default for ObstacleAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl ObstacleAnalyzer {
    /// Create an analyzer with default thresholds, holding `Stop`.
    pub fn new() -> Self {
        let (thresholds, _) = watch::channel(ZoneThresholds::default());
        let (recommendation, _) = watch::channel(Recommendation::default());
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Self {
            processing: Mutex::new(ProcessingState::default()),
            thresholds,
            recommendation,
            events,
        }
    }

    /// Create an analyzer with custom thresholds.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `thresholds` fail validation.
    pub fn with_thresholds(thresholds: ZoneThresholds) -> Result<Self> {
        let analyzer = Self::new();
        analyzer.set_thresholds(thresholds)?;
        Ok(analyzer)
    }

    /// Analyse one scan.
    ///
    /// Returns `None` when the batch is older than the last processed one.
    pub fn process_batch(&self, batch: &ReadingBatch) -> Option<Recommendation> {
        self.process_readings(&batch.readings, batch.timestamp)
    }

    /// Analyse readings taken at `timestamp`.
    pub fn process_readings(&self, readings: &[Reading], timestamp: u64) -> Option<Recommendation> {
        let mut state = self.processing.lock().unwrap_or_else(PoisonError::into_inner);

        if timestamp < state.last_timestamp {
            trace!(
                "Skipping stale batch {} (last processed {})",
                timestamp, state.last_timestamp
            );
            return None;
        }

        let thresholds = *self.thresholds.borrow();
        let recommendation = classify(readings, &thresholds);

        state.last_timestamp = timestamp;
        self.publish(recommendation, timestamp);

        Some(recommendation)
    }

    fn publish(&self, recommendation: Recommendation, timestamp: u64) {
        let changed = self.recommendation.send_if_modified(|held| {
            if *held == recommendation {
                false
            } else {
                *held = recommendation;
                true
            }
        });

        if changed {
            debug!("Recommendation changed to {} at {}", recommendation, timestamp);
            // No subscribers is fine.
            let _ = self.events.send(AnalysisChanged {
                recommendation,
                timestamp,
            });
        }
    }

    /// The recommendation currently held.
    pub fn current(&self) -> Recommendation {
        *self.recommendation.borrow()
    }

    /// Receiver that always sees the latest recommendation.
    pub fn watch(&self) -> watch::Receiver<Recommendation> {
        self.recommendation.subscribe()
    }

    /// Receive one event per recommendation change.
    pub fn subscribe(&self) -> broadcast::Receiver<AnalysisChanged> {
        self.events.subscribe()
    }

    /// Timestamp of the last batch that was processed, 0 before the first.
    pub fn last_processed_timestamp(&self) -> u64 {
        self.processing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last_timestamp
    }

    /// Snapshot of the current thresholds.
    pub fn thresholds(&self) -> ZoneThresholds {
        *self.thresholds.borrow()
    }

    /// Replace the thresholds. Takes effect from the next batch.
    ///
    /// # Errors
    ///
    /// Invalid thresholds are rejected and the previous ones stay in place.
    pub fn set_thresholds(&self, thresholds: ZoneThresholds) -> Result<()> {
        thresholds.validate()?;
        self.thresholds.send_replace(thresholds);
        debug!("Thresholds replaced: {:?}", thresholds);
        Ok(())
    }

    /// Modify a copy of the current thresholds and swap it in if it is valid.
    ///
    /// # Examples
    ///
    /// ```
    /// use wayfinder_analysis::ObstacleAnalyzer;
    ///
    /// let analyzer = ObstacleAnalyzer::new();
    /// analyzer.update_thresholds(|t| t.stop_distance_mm = 250.0).unwrap();
    /// assert_eq!(analyzer.thresholds().stop_distance_mm, 250.0);
    ///
    /// assert!(analyzer.update_thresholds(|t| t.stop_fov_degrees = -1.0).is_err());
    /// assert_eq!(analyzer.thresholds().stop_fov_degrees, 35.0);
    /// ```
    pub fn update_thresholds<F>(&self, update: F) -> Result<()>
    where
        F: FnOnce(&mut ZoneThresholds),
    {
        let mut outcome = Ok(());
        self.thresholds.send_if_modified(|current| {
            let mut next = *current;
            update(&mut next);
            match next.validate() {
                Ok(()) => {
                    *current = next;
                    true
                }
                Err(e) => {
                    outcome = Err(e);
                    false
                }
            }
        });
        outcome
    }

    /// Fit walls on both sides of the adjust zone.
    ///
    /// Diagnostics only; the fits never change the recommendation.
    pub fn wall_estimates(&self, batch: &ReadingBatch) -> WallEstimates {
        let thresholds = self.thresholds();
        let zone = thresholds.adjust_zone();

        let (left, right): (Vec<Point>, Vec<Point>) = batch
            .valid_readings()
            .filter(|r| zone.contains(r.angle, r.distance))
            .map(Reading::to_cartesian)
            .partition(|p| p.x < 0.0);

        WallEstimates {
            left: fit_wall(
                &left,
                thresholds.min_adjust_point_count,
                thresholds.error_squared_tolerance,
            ),
            right: fit_wall(
                &right,
                thresholds.min_adjust_point_count,
                thresholds.error_squared_tolerance,
            ),
        }
    }
}

/// Classify one scan against `thresholds`.
///
/// Pure; the analyzer adds ordering and change notification on top.
pub fn classify(readings: &[Reading], thresholds: &ZoneThresholds) -> Recommendation {
    let stop_zone = thresholds.stop_zone();
    let adjust_zone = thresholds.adjust_zone();

    let mut left_count = 0usize;
    let mut right_count = 0usize;
    let mut left_min = f64::INFINITY;
    let mut right_min = f64::INFINITY;

    for reading in readings.iter().filter(|r| r.is_valid()) {
        if stop_zone.contains(reading.angle, reading.distance) {
            return Recommendation::Stop;
        }

        if adjust_zone.contains(reading.angle, reading.distance) {
            match reading.side() {
                Side::Left => {
                    left_count += 1;
                    left_min = left_min.min(reading.distance);
                }
                Side::Right => {
                    right_count += 1;
                    right_min = right_min.min(reading.distance);
                }
            }
        }
    }

    let min_points = thresholds.min_adjust_point_count;
    if left_count <= min_points && right_count <= min_points {
        return Recommendation::Move;
    }

    if left_min < right_min {
        Recommendation::AdjustObstacle(Side::Left)
    } else if right_min < left_min {
        Recommendation::AdjustObstacle(Side::Right)
    } else {
        Recommendation::Stop
    }
}
