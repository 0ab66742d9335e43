//! Robot configuration file.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;
use wayfinder_analysis::ZoneThresholds;
use wayfinder_core::ReadingBatch;
use wayfinder_hardware::ScanConfig;
use wayfinder_navigation::ControllerConfig;

/// Everything tunable on the robot, as one JSON document.
///
/// Every section and field is optional and falls back to its default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RobotConfig {
    pub thresholds: ZoneThresholds,
    pub controller: ControllerConfig,
    pub scan: ScanConfig,
}

impl RobotConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json).context("Malformed robot configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path`, or use the defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            info!("Using default configuration");
            return Ok(Self::default());
        };

        info!("Loading configuration from {}", path.display());
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot read {}", path.display()))?;
        Self::from_json(&json)
    }

    pub fn validate(&self) -> Result<()> {
        self.thresholds.validate()?;
        self.controller.validate()?;
        Ok(())
    }
}

/// Load a recorded scan list.
pub fn load_scans(path: &Path) -> Result<Vec<ReadingBatch>> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Cannot read {}", path.display()))?;
    serde_json::from_str(&json).with_context(|| format!("Malformed scan list in {}", path.display()))
}
