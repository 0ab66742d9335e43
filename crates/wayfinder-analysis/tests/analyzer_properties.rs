//! Property-based tests for the obstacle analyzer.
//!
//! Scans are generated from arbitrary readings; the properties hold for every
//! scan regardless of its contents.

use proptest::prelude::*;
use wayfinder_analysis::{ObstacleAnalyzer, ZoneThresholds, classify};
use wayfinder_core::{Reading, ReadingBatch, Recommendation, Side};

/// Strategy for one reading anywhere around the robot.
fn any_reading() -> impl Strategy<Value = Reading> {
    (0.0f64..360.0, 0.0f64..3000.0, 0u8..=15).prop_map(|(angle, distance, quality)| Reading {
        angle,
        distance,
        quality,
    })
}

/// Strategy for a whole scan.
fn any_scan() -> impl Strategy<Value = Vec<Reading>> {
    prop::collection::vec(any_reading(), 0..64)
}

/// Strategy for a valid reading inside the default stop zone.
fn stop_zone_reading() -> impl Strategy<Value = Reading> {
    let angle = prop_oneof![0.0f64..34.9, 325.1f64..359.9];
    (angle, 0.0f64..299.0, 1u8..=15).prop_map(|(angle, distance, quality)| Reading {
        angle,
        distance,
        quality,
    })
}

/// Strategy for a scan with angles on a 0.01° grid.
///
/// `360 - angle` is then far from any cone edge unless it lands on it
/// exactly, so a reading and its mirror always fall in matching zones.
fn grid_scan() -> impl Strategy<Value = Vec<Reading>> {
    let reading = (1u32..36_000, 0.0f64..3000.0, 0u8..=15).prop_map(|(hundredths, distance, quality)| {
        Reading {
            angle: f64::from(hundredths) / 100.0,
            distance,
            quality,
        }
    });
    prop::collection::vec(reading, 0..64)
}

fn mirror(reading: &Reading) -> Reading {
    Reading {
        angle: 360.0 - reading.angle,
        ..*reading
    }
}

proptest! {
    /// Property: replaying a batch produces at most one change notification.
    #[test]
    fn prop_replay_notifies_once(readings in any_scan()) {
        let analyzer = ObstacleAnalyzer::new();
        let mut events = analyzer.subscribe();
        let batch = ReadingBatch::new(readings, 5);

        let first = analyzer.process_batch(&batch);
        let second = analyzer.process_batch(&batch);
        prop_assert_eq!(first, second);

        let mut notifications = 0;
        while events.try_recv().is_ok() {
            notifications += 1;
        }
        let expected = usize::from(first != Some(Recommendation::Stop));
        prop_assert_eq!(notifications, expected);
    }

    /// Property: a stale batch changes nothing and notifies no one.
    #[test]
    fn prop_stale_batch_is_ignored(
        first in any_scan(),
        stale in any_scan(),
        newer in 1u64..1_000_000,
        age in 1u64..1000,
    ) {
        let analyzer = ObstacleAnalyzer::new();
        analyzer.process_readings(&first, newer);
        let held = analyzer.current();
        let mut events = analyzer.subscribe();

        let result = analyzer.process_readings(&stale, newer.saturating_sub(age));

        prop_assert_eq!(result, None);
        prop_assert_eq!(analyzer.current(), held);
        prop_assert_eq!(analyzer.last_processed_timestamp(), newer);
        prop_assert!(events.try_recv().is_err());
    }

    /// Property: one valid stop-zone reading forces `Stop` whatever else is seen.
    #[test]
    fn prop_stop_zone_has_priority(
        mut readings in any_scan(),
        blocker in stop_zone_reading(),
        position in any::<prop::sample::Index>(),
    ) {
        let at = position.index(readings.len() + 1);
        readings.insert(at, blocker);

        prop_assert_eq!(
            classify(&readings, &ZoneThresholds::default()),
            Recommendation::Stop
        );
    }

    /// Property: a scan that is mirrored left/right recommends the mirrored side.
    #[test]
    fn prop_mirrored_scan_mirrors_side(readings in grid_scan()) {
        // The grid starts above 0°: readings straight ahead count as
        // right-hand points and have no mirror image.
        let thresholds = ZoneThresholds::default();
        let mirrored: Vec<Reading> = readings.iter().map(mirror).collect();

        let expected = match classify(&readings, &thresholds) {
            Recommendation::AdjustObstacle(Side::Left) => Recommendation::AdjustObstacle(Side::Right),
            Recommendation::AdjustObstacle(Side::Right) => Recommendation::AdjustObstacle(Side::Left),
            other => other,
        };

        prop_assert_eq!(classify(&mirrored, &thresholds), expected);
    }

    /// Property: the adjust sign follows the side of the nearest obstacle.
    #[test]
    fn prop_adjust_sign_matches_side(readings in any_scan()) {
        match classify(&readings, &ZoneThresholds::default()) {
            Recommendation::AdjustObstacle(side) => {
                let expected = if side == Side::Left { 90 } else { -90 };
                prop_assert_eq!(side.adjust_angle(), expected);
            }
            other => prop_assert_eq!(other.adjust_angle(), 0),
        }
    }
}

#[test]
fn symmetric_obstacles_recommend_stop() {
    let readings = [
        Reading { angle: 30.0, distance: 400.0, quality: 1 },
        Reading { angle: 330.0, distance: 400.0, quality: 1 },
        Reading { angle: 40.0, distance: 410.0, quality: 1 },
        Reading { angle: 320.0, distance: 410.0, quality: 1 },
    ];

    assert_eq!(
        classify(&readings, &ZoneThresholds::default()),
        Recommendation::Stop
    );
}

#[test]
fn close_reading_ahead_stops_despite_rear_obstacle() {
    let analyzer = ObstacleAnalyzer::new();
    analyzer.process_readings(&[Reading { angle: 0.0, distance: 2000.0, quality: 1 }], 1);

    let readings = [
        Reading { angle: 10.0, distance: 200.0, quality: 1 },
        Reading { angle: 170.0, distance: 10.0, quality: 1 },
    ];

    assert_eq!(analyzer.process_readings(&readings, 2), Some(Recommendation::Stop));
    assert_eq!(analyzer.current(), Recommendation::Stop);
}
