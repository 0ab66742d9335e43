//! LIDAR scan manager.
//!
//! This module provides the `ScanManager`, which runs every registered LIDAR
//! in its own task and aggregates the scans into one event stream for the
//! navigation pipeline.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────┐       ┌─────────────────┐
//! │ LIDAR 0  │──────►│                 │
//! │ Task     │       │  Event Channel  │
//! └──────────┘       │  (mpsc)         │──────► Obstacle analysis
//!                    │                 │
//! ┌──────────┐       │                 │
//! │ LIDAR 1  │──────►│                 │
//! │ Task     │       └─────────────────┘
//! └──────────┘
//! ```
//!
//! A device task stops after reporting its first error. Scans are forwarded
//! with `try_send`; a full channel makes the task back off before a blocking
//! retry, and reads are rate limited to `min_poll_interval_ms`.
//!
//! # Examples
//!
//! ```no_run
//! use wayfinder_hardware::manager::{ScanConfig, ScanEvent, ScanManager};
//! use wayfinder_hardware::devices::AnyLidarDevice;
//! use wayfinder_hardware::mock::MockLidar;
//!
//! #[tokio::main]
//! async fn main() -> wayfinder_hardware::Result<()> {
//!     let mut manager = ScanManager::new(ScanConfig::default());
//!
//!     let (lidar, _handle) = MockLidar::new();
//!     manager.register_lidar(AnyLidarDevice::Mock(lidar));
//!
//!     let mut handle = manager.start();
//!
//!     while let Some(event) = handle.recv().await {
//!         if let ScanEvent::ScanComplete(batch) = event {
//!             println!("{} readings at {}", batch.len(), batch.timestamp);
//!         }
//!     }
//!
//!     handle.shutdown().await?;
//!     Ok(())
//! }
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};
use wayfinder_core::ReadingBatch;
use wayfinder_core::constants::{DEFAULT_MIN_SCAN_INTERVAL_MS, DEFAULT_SCAN_CHANNEL_CAPACITY};

use crate::Result;
use crate::devices::AnyLidarDevice;
use crate::traits::LidarDevice;

/// Back-off before retrying a send into a full channel.
const BACKPRESSURE_DELAY_MS: u64 = 100;

/// Event produced by a LIDAR task.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum ScanEvent {
    /// A full revolution was read.
    ScanComplete(ReadingBatch),

    /// A device failed. Its task terminates after sending this event.
    DeviceError {
        /// Name of the device that failed.
        device: String,

        /// Error message.
        error: String,
    },
}

/// Scan manager configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Capacity of the aggregated event channel.
    pub channel_capacity: usize,

    /// Minimum delay between two reads of the same device.
    pub min_poll_interval_ms: u64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            channel_capacity: DEFAULT_SCAN_CHANNEL_CAPACITY,
            min_poll_interval_ms: DEFAULT_MIN_SCAN_INTERVAL_MS,
        }
    }
}

/// Handle for receiving scan events.
///
/// Can be held independently of the manager and polled from the navigation
/// pipeline.
pub struct ScanHandle {
    event_rx: mpsc::Receiver<ScanEvent>,
    tasks: JoinSet<Result<()>>,
}

impl ScanHandle {
    /// Receive the next event from any LIDAR.
    ///
    /// Returns `None` once every device task has terminated.
    pub async fn recv(&mut self) -> Option<ScanEvent> {
        self.event_rx.recv().await
    }

    /// Abort all device tasks and wait for them to terminate.
    ///
    /// Failed or panicked tasks are logged, they do not fail the shutdown.
    pub async fn shutdown(mut self) -> Result<()> {
        self.tasks.abort_all();

        let mut error_count = 0;
        let mut panic_count = 0;

        while let Some(result) = self.tasks.join_next().await {
            match classify_task_result(result) {
                TaskTermination::Success | TaskTermination::Cancelled => {}
                TaskTermination::Error => error_count += 1,
                TaskTermination::Panic => panic_count += 1,
            }
        }

        if error_count + panic_count > 0 {
            warn!(
                "Scan tasks terminated abnormally: {} errors, {} panics",
                error_count, panic_count
            );
        } else {
            debug!("Scan tasks shut down cleanly");
        }

        Ok(())
    }
}

/// Task termination classification for shutdown handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskTermination {
    /// Task completed successfully.
    Success,
    /// Task returned an error.
    Error,
    /// Task was cancelled (expected during shutdown).
    Cancelled,
    /// Task panicked.
    Panic,
}

/// Classify how a supervised task ended.
pub fn classify_task_result<E>(
    result: std::result::Result<std::result::Result<(), E>, tokio::task::JoinError>,
) -> TaskTermination {
    match result {
        Ok(Ok(())) => TaskTermination::Success,
        Ok(Err(_)) => TaskTermination::Error,
        Err(e) if e.is_cancelled() => TaskTermination::Cancelled,
        Err(_) => TaskTermination::Panic,
    }
}

/// Runs the registered LIDARs.
///
/// # Lifecycle
///
/// 1. Create the manager with a configuration
/// 2. Register devices with `register_lidar`
/// 3. Call `start()` to spawn one task per device
/// 4. Receive events from the returned handle
pub struct ScanManager {
    lidars: Vec<AnyLidarDevice>,
    config: ScanConfig,
}

impl ScanManager {
    /// Create a scan manager with no devices.
    ///
    /// # Examples
    ///
    /// ```
    /// use wayfinder_hardware::manager::{ScanConfig, ScanManager};
    ///
    /// let manager = ScanManager::new(ScanConfig::default());
    /// assert_eq!(manager.lidar_count(), 0);
    /// ```
    pub fn new(config: ScanConfig) -> Self {
        Self {
            lidars: Vec::new(),
            config,
        }
    }

    /// Register a LIDAR. Must be called before `start()`.
    pub fn register_lidar(&mut self, device: AnyLidarDevice) {
        self.lidars.push(device);
    }

    /// Number of registered LIDARs.
    pub fn lidar_count(&self) -> usize {
        self.lidars.len()
    }

    /// Get the configuration.
    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Spawn one task per registered LIDAR and return the event handle.
    pub fn start(self) -> ScanHandle {
        let (event_tx, event_rx) = mpsc::channel(self.config.channel_capacity.max(1));
        let poll_interval = Duration::from_millis(self.config.min_poll_interval_ms);
        let mut tasks = JoinSet::new();

        for (index, device) in self.lidars.into_iter().enumerate() {
            tasks.spawn(Self::lidar_task(index, device, event_tx.clone(), poll_interval));
        }

        info!("Scan manager started with {} LIDAR(s)", tasks.len());

        ScanHandle { event_rx, tasks }
    }

    async fn lidar_task(
        index: usize,
        mut device: AnyLidarDevice,
        tx: mpsc::Sender<ScanEvent>,
        poll_interval: Duration,
    ) -> Result<()> {
        let name = match device.get_info().await {
            Ok(info) => info.name,
            Err(_) => format!("lidar-{}", index),
        };
        debug!("Scan task for {} running", name);

        loop {
            let start = tokio::time::Instant::now();

            match device.read_scan().await {
                Ok(batch) => match tx.try_send(ScanEvent::ScanComplete(batch)) {
                    Ok(()) => {}
                    Err(TrySendError::Full(event)) => {
                        warn!("Scan channel full, {} backing off", name);
                        tokio::time::sleep(Duration::from_millis(BACKPRESSURE_DELAY_MS)).await;
                        if tx.send(event).await.is_err() {
                            break;
                        }
                    }
                    Err(TrySendError::Closed(_)) => break,
                },
                Err(e) => {
                    error!("{} failed: {}", name, e);
                    let _ = tx
                        .send(ScanEvent::DeviceError {
                            device: name,
                            error: e.to_string(),
                        })
                        .await;
                    return Err(e);
                }
            }

            let elapsed = start.elapsed();
            if elapsed < poll_interval {
                tokio::time::sleep(poll_interval - elapsed).await;
            }
        }

        debug!("Scan task for {} stopped: channel closed", name);
        Ok(())
    }
}
