//! Mock LIDAR implementation for testing and simulation.
//!
//! Scans are pushed through a channel by a [`MockLidarHandle`], either one at
//! a time or replayed from a recorded list at a fixed cadence.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::mpsc;
use wayfinder_core::{Point, Reading, ReadingBatch};

use crate::{HardwareError, Result, traits::LidarDevice, types::DeviceInfo};

/// Mock LIDAR for testing and simulation.
///
/// # Examples
///
/// ```
/// use wayfinder_core::Reading;
/// use wayfinder_hardware::mock::MockLidar;
/// use wayfinder_hardware::traits::LidarDevice;
///
/// #[tokio::main]
/// async fn main() -> wayfinder_hardware::Result<()> {
///     let (mut lidar, handle) = MockLidar::new();
///
///     let stamp = handle
///         .send_scan(vec![Reading { angle: 10.0, distance: 800.0, quality: 15 }])
///         .await?;
///
///     let batch = lidar.read_scan().await?;
///     assert_eq!(batch.timestamp, stamp);
///     assert_eq!(batch.len(), 1);
///
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct MockLidar {
    /// Channel receiver for simulated scans
    scan_rx: mpsc::Receiver<ReadingBatch>,

    /// Device name
    name: String,
}

impl MockLidar {
    /// Create a new mock LIDAR with the default name.
    ///
    /// Returns the device and a handle used to feed it scans.
    pub fn new() -> (Self, MockLidarHandle) {
        Self::with_name("Mock LIDAR".to_string())
    }

    /// Create a new mock LIDAR with a custom name.
    pub fn with_name(name: String) -> (Self, MockLidarHandle) {
        let (scan_tx, scan_rx) = mpsc::channel(32);

        let lidar = Self {
            scan_rx,
            name: name.clone(),
        };

        let handle = MockLidarHandle {
            scan_tx,
            name,
            next_timestamp: Arc::new(AtomicU64::new(1)),
        };

        (lidar, handle)
    }
}

impl Default for MockLidar {
    fn default() -> Self {
        Self::new().0
    }
}

impl LidarDevice for MockLidar {
    async fn read_scan(&mut self) -> Result<ReadingBatch> {
        self.scan_rx
            .recv()
            .await
            .ok_or_else(|| HardwareError::disconnected(format!("{} scan channel closed", self.name)))
    }

    async fn get_info(&self) -> Result<DeviceInfo> {
        Ok(DeviceInfo::new(self.name.clone(), "Mock LIDAR v1.0").with_firmware_version("1.0.0"))
    }
}

/// Handle for feeding scans to a mock LIDAR.
///
/// Can be cloned and shared across tasks; clones share the timestamp counter.
#[derive(Debug, Clone)]
pub struct MockLidarHandle {
    scan_tx: mpsc::Sender<ReadingBatch>,
    name: String,
    next_timestamp: Arc<AtomicU64>,
}

impl MockLidarHandle {
    /// Send a batch with an explicit timestamp.
    ///
    /// # Errors
    ///
    /// Returns an error if the mock LIDAR has been dropped.
    pub async fn send_batch(&self, batch: ReadingBatch) -> Result<()> {
        self.scan_tx
            .send(batch)
            .await
            .map_err(|_| HardwareError::disconnected(format!("{} dropped", self.name)))
    }

    /// Send readings stamped with the next timestamp of this handle.
    ///
    /// Returns the timestamp used.
    pub async fn send_scan(&self, readings: Vec<Reading>) -> Result<u64> {
        let timestamp = self.next_timestamp.fetch_add(1, Ordering::Relaxed);
        self.send_batch(ReadingBatch::new(readings, timestamp)).await?;
        Ok(timestamp)
    }

    /// Send obstacles given in the robot frame, as full-quality readings.
    ///
    /// A point at the origin has no bearing and is left out.
    pub async fn send_points(&self, points: &[Point]) -> Result<u64> {
        let readings = points
            .iter()
            .filter_map(|point| point.to_reading(u8::MAX))
            .collect();
        self.send_scan(readings).await
    }

    /// Send recorded batches one after another, `interval` apart.
    pub async fn replay(&self, batches: Vec<ReadingBatch>, interval: Duration) -> Result<()> {
        for batch in batches {
            self.send_batch(batch).await?;
            tokio::time::sleep(interval).await;
        }
        Ok(())
    }

    /// Get the name of the LIDAR this handle feeds.
    pub fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(angle: f64, distance: f64) -> Reading {
        Reading {
            angle,
            distance,
            quality: 10,
        }
    }

    #[tokio::test]
    async fn test_mock_lidar_send_scan_stamps_monotonically() {
        let (mut lidar, handle) = MockLidar::new();

        let first = handle.send_scan(vec![reading(0.0, 500.0)]).await.unwrap();
        let second = handle.send_scan(vec![reading(5.0, 400.0)]).await.unwrap();
        assert!(second > first);

        assert_eq!(lidar.read_scan().await.unwrap().timestamp, first);
        assert_eq!(lidar.read_scan().await.unwrap().timestamp, second);
    }

    #[tokio::test]
    async fn test_mock_lidar_send_points() {
        let (mut lidar, handle) = MockLidar::new();

        handle
            .send_points(&[Point::new(-100.0, 100.0), Point::default()])
            .await
            .unwrap();

        let batch = lidar.read_scan().await.unwrap();
        assert_eq!(batch.len(), 1);
        let reading = batch.readings[0];
        assert!((reading.angle - 315.0).abs() < 1e-9);
        assert!((reading.distance - 100.0 * 2f64.sqrt()).abs() < 1e-9);
        assert_eq!(reading.quality, u8::MAX);
    }

    #[tokio::test]
    async fn test_mock_lidar_explicit_batch() {
        let (mut lidar, handle) = MockLidar::new();

        let batch = ReadingBatch::new(vec![reading(90.0, 1200.0)], 42);
        handle.send_batch(batch.clone()).await.unwrap();

        assert_eq!(lidar.read_scan().await.unwrap(), batch);
    }

    #[tokio::test(start_paused = true)]
    async fn test_mock_lidar_replay() {
        let (mut lidar, handle) = MockLidar::new();

        let batches = vec![
            ReadingBatch::new(vec![reading(0.0, 100.0)], 10),
            ReadingBatch::new(vec![reading(0.0, 200.0)], 20),
        ];
        tokio::spawn(async move {
            handle
                .replay(batches, Duration::from_millis(200))
                .await
                .unwrap();
        });

        assert_eq!(lidar.read_scan().await.unwrap().timestamp, 10);
        assert_eq!(lidar.read_scan().await.unwrap().timestamp, 20);
    }

    #[tokio::test]
    async fn test_mock_lidar_get_info() {
        let (lidar, handle) = MockLidar::with_name("Front LIDAR".to_string());

        let info = lidar.get_info().await.unwrap();
        assert_eq!(info.name, "Front LIDAR");
        assert_eq!(handle.name(), "Front LIDAR");
    }

    #[tokio::test]
    async fn test_mock_lidar_closed_channel() {
        let (mut lidar, handle) = MockLidar::new();

        drop(handle);

        let result = lidar.read_scan().await;
        assert!(matches!(result, Err(HardwareError::Disconnected { .. })));
    }
}
