//! LIDAR obstacle analysis.
//!
//! This crate classifies range scans into movement recommendations for the
//! navigation controller:
//!
//! - [`ObstacleAnalyzer`]: ordered, serialised batch processing with change
//!   notification and live-swappable [`ZoneThresholds`]
//! - [`classify`]: the pure per-scan decision used by the analyzer
//! - [`geometry`]: least-squares wall fitting used for diagnostics
//!
//! # Examples
//!
//! ```
//! use wayfinder_analysis::ObstacleAnalyzer;
//! use wayfinder_core::{Reading, ReadingBatch, Recommendation, Side};
//!
//! let analyzer = ObstacleAnalyzer::new();
//! let mut changes = analyzer.subscribe();
//!
//! // Two points close on the left, inside the adjust zone only.
//! let batch = ReadingBatch::new(
//!     vec![
//!         Reading { angle: 300.0, distance: 350.0, quality: 1 },
//!         Reading { angle: 310.0, distance: 380.0, quality: 1 },
//!     ],
//!     1,
//! );
//!
//! let recommendation = analyzer.process_batch(&batch);
//! assert_eq!(recommendation, Some(Recommendation::AdjustObstacle(Side::Left)));
//! assert_eq!(changes.try_recv().unwrap().recommendation.adjust_angle(), 90);
//! ```

pub mod analyzer;
pub mod geometry;
pub mod thresholds;

pub use analyzer::{AnalysisChanged, ObstacleAnalyzer, WallEstimates, classify};
pub use geometry::LineFit;
pub use thresholds::{Zone, ZoneThresholds};
