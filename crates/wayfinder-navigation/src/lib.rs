//! Navigation for the wayfinder robot.
//!
//! - [`NavigationController`]: runs instruction sequences on a drive, with a
//!   continuous move loop that reacts to obstacle recommendations, drive stop
//!   events and cancellation
//! - [`RoutePlanner`]: turns a [`BuildingMap`] into instructions towards a
//!   room
//! - [`StateMachine`]: movement phase tracking (idle, rotating, moving)
//! - [`decide`]: the per-tick decision of the move loop
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//!
//! use wayfinder_analysis::ObstacleAnalyzer;
//! use wayfinder_core::Instruction;
//! use wayfinder_hardware::mock::MockMotor;
//! use wayfinder_navigation::{ControllerConfig, NavigationController, SequenceOutcome};
//!
//! #[tokio::main(flavor = "current_thread", start_paused = true)]
//! async fn main() -> wayfinder_navigation::Result<()> {
//!     let (motor, handle) = MockMotor::new();
//!     let analyzer = Arc::new(ObstacleAnalyzer::new());
//!     analyzer.process_readings(&[], 1);
//!
//!     let controller = NavigationController::new(motor, analyzer, ControllerConfig::default())?;
//!     let outcome = controller
//!         .execute_instructions(&[Instruction::Angle(90.0), Instruction::Distance(0.5)])
//!         .await?;
//!
//!     assert!(matches!(outcome, SequenceOutcome::Finished { executed: 2, .. }));
//!     assert_eq!(handle.commands().len(), 2);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod controller;
pub mod error;
pub mod planner;
pub mod state_machine;
pub mod tick;

pub use config::ControllerConfig;
pub use controller::{ControllerHandle, MoveOutcome, NavigationController, SequenceOutcome};
pub use error::{NavigationError, Result};
pub use planner::{BuildingMap, Connection, MapNode, RoutePlanner};
pub use state_machine::{NavigationPhase, PhaseTransition, StateMachine};
pub use tick::{TickDecision, decide};
