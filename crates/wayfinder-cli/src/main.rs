//! `wayfinder` CLI: scan analysis, route directions and simulated runs.

mod config;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{info, warn};
use wayfinder_analysis::{ObstacleAnalyzer, WallEstimates};
use wayfinder_core::{Instruction, Recommendation, StopReason};
use wayfinder_hardware::devices::{AnyLidarDevice, AnyMotorDevice};
use wayfinder_hardware::mock::{MockLidar, MockMotor};
use wayfinder_hardware::{MotorCommand, MotorDevice, ScanManager};
use wayfinder_navigation::{
    BuildingMap, NavigationController, PhaseTransition, RoutePlanner, SequenceOutcome,
};

use crate::config::{RobotConfig, load_scans};

#[derive(Parser)]
#[command(name = "wayfinder", about = "LIDAR obstacle avoidance and indoor navigation")]
struct Cli {
    /// Robot configuration (JSON); defaults apply when omitted
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify recorded scans and report the recommendation for each.
    Analyze {
        /// Path to a JSON list of scan batches
        scans: PathBuf,
    },
    /// Print the instructions leading to one or more rooms, in order.
    Directions {
        /// Path to the building map (JSON)
        map: PathBuf,
        /// Rooms to visit
        #[arg(required = true)]
        rooms: Vec<u32>,
        /// Start from this room instead of the map's start node
        #[arg(long)]
        from: Option<u32>,
    },
    /// Drive a simulated robot to a room.
    Simulate {
        /// Path to the building map (JSON)
        map: PathBuf,
        /// Destination room
        room: u32,
        /// Scans to replay while driving; a clear path is assumed otherwise
        #[arg(long)]
        scans: Option<PathBuf>,
        /// Delay between replayed scans
        #[arg(long, default_value_t = 100)]
        scan_interval_ms: u64,
        /// Give up and cancel after this many seconds
        #[arg(long, default_value_t = 120)]
        timeout_secs: u64,
    },
}

#[derive(Serialize)]
struct ScanReport {
    timestamp: u64,
    /// `None` for a batch older than the previous one.
    recommendation: Option<Recommendation>,
    walls: WallEstimates,
}

#[derive(Serialize)]
struct RouteReport {
    room: u32,
    instructions: Vec<Instruction>,
}

#[derive(Serialize)]
struct SimulationReport {
    room: u32,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
    outcome: Option<SequenceOutcome>,
    commands: Vec<MotorCommand>,
    odometer_mm: f64,
    phases: Vec<PhaseTransition>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = RobotConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Analyze { scans } => analyze(&config, &scans),
        Commands::Directions { map, rooms, from } => directions(&map, &rooms, from),
        Commands::Simulate {
            map,
            room,
            scans,
            scan_interval_ms,
            timeout_secs,
        } => {
            simulate(
                &config,
                &map,
                room,
                scans.as_deref(),
                Duration::from_millis(scan_interval_ms),
                Duration::from_secs(timeout_secs),
            )
            .await
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn load_planner(path: &Path) -> Result<RoutePlanner> {
    let map = BuildingMap::load(path)
        .with_context(|| format!("Cannot load building map {}", path.display()))?;
    Ok(RoutePlanner::new(map)?)
}

fn analyze(config: &RobotConfig, scans: &Path) -> Result<()> {
    let batches = load_scans(scans)?;
    let analyzer = ObstacleAnalyzer::with_thresholds(config.thresholds)?;

    let reports: Vec<ScanReport> = batches
        .iter()
        .map(|batch| ScanReport {
            timestamp: batch.timestamp,
            recommendation: analyzer.process_batch(batch),
            walls: analyzer.wall_estimates(batch),
        })
        .collect();

    let stale = reports.iter().filter(|r| r.recommendation.is_none()).count();
    info!(
        "Analyzed {} scans ({} stale), final recommendation {}",
        reports.len(),
        stale,
        analyzer.current()
    );

    print_json(&reports)
}

fn directions(map: &Path, rooms: &[u32], from: Option<u32>) -> Result<()> {
    let mut planner = load_planner(map)?;
    if let Some(room) = from {
        planner.set_start_room(room)?;
    }

    let routes = rooms
        .iter()
        .map(|&room| {
            let instructions = planner
                .directions(room)
                .with_context(|| format!("No directions to room {}", room))?;
            Ok(RouteReport { room, instructions })
        })
        .collect::<Result<Vec<_>>>()?;

    print_json(&routes)
}

async fn simulate(
    config: &RobotConfig,
    map: &Path,
    room: u32,
    scans: Option<&Path>,
    scan_interval: Duration,
    timeout: Duration,
) -> Result<()> {
    let planner = load_planner(map)?;
    if !planner.has_room(room) {
        bail!("Room {} is not on the map", room);
    }
    let batches = scans.map(load_scans).transpose()?;

    let (motor, motor_handle) = MockMotor::new();
    let (lidar, lidar_handle) = MockLidar::new();

    let mut manager = ScanManager::new(config.scan.clone());
    manager.register_lidar(AnyLidarDevice::Mock(lidar));

    let analyzer = Arc::new(ObstacleAnalyzer::with_thresholds(config.thresholds)?);
    let controller = NavigationController::new(
        AnyMotorDevice::Mock(motor),
        Arc::clone(&analyzer),
        config.controller,
    )?
    .with_planner(planner);

    let handle = controller.start(manager.start());

    let replay = match batches {
        Some(batches) => {
            info!("Replaying {} scans every {:?}", batches.len(), scan_interval);
            let lidar = lidar_handle.clone();
            tokio::spawn(async move { lidar.replay(batches, scan_interval).await })
        }
        None => {
            let lidar = lidar_handle.clone();
            tokio::spawn(async move { lidar.send_scan(Vec::new()).await.map(|_| ()) })
        }
    };

    let started_at = Utc::now();
    let outcome = match tokio::time::timeout(timeout, controller.navigate_to(room)).await {
        Ok(outcome) => Some(outcome?),
        Err(_) => {
            warn!("Simulation timed out after {:?}", timeout);
            controller.cancel();
            controller.motor().halt(StopReason::Cancelled);
            None
        }
    };
    let finished_at = Utc::now();

    replay.abort();
    handle.shutdown().await;

    print_json(&SimulationReport {
        room,
        started_at,
        finished_at,
        outcome,
        commands: motor_handle.commands(),
        odometer_mm: motor_handle.odometer_mm(),
        phases: controller.phase_history(usize::MAX),
    })
}
