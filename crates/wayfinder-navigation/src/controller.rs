//! Navigation controller.
//!
//! The controller drives the robot through instruction sequences while the
//! obstacle analyzer watches the path ahead. Three tasks started with
//! [`NavigationController::start`] connect it to the outside world:
//!
//! ```text
//! ┌────────────┐  ScanEvent   ┌──────────────────┐  AnalysisChanged  ┌───────────────┐
//! │ ScanHandle │─────────────►│ ObstacleAnalyzer │──────────────────►│ analysis      │──► halt / cancel_move
//! └────────────┘              └──────────────────┘                   │ reactor       │
//!                                      │ watch                       └───────────────┘
//!                                      ▼
//!                             ┌──────────────────┐  StopReason       ┌───────────────┐
//!                             │ move loop        │◄──────────────────│ stop reactor  │◄── MotorDevice
//!                             └──────────────────┘  (atomic + token) └───────────────┘
//! ```
//!
//! The reactors only issue motor commands and update the stop reason and
//! cancellation token. Every decision of the move loop is taken by
//! [`decide`] once per tick.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};
use wayfinder_analysis::{AnalysisChanged, ObstacleAnalyzer};
use wayfinder_core::{Instruction, Recommendation, Side, StopReason};
use wayfinder_hardware::manager::{TaskTermination, classify_task_result};
use wayfinder_hardware::{MotorDevice, ScanEvent, ScanHandle};

use crate::config::ControllerConfig;
use crate::error::{NavigationError, Result};
use crate::planner::RoutePlanner;
use crate::state_machine::{NavigationPhase, PhaseTransition, StateMachine};
use crate::tick::{TickDecision, decide};

/// Result of one continuous move.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MoveOutcome {
    /// Why the loop ended.
    pub reason: StopReason,
    /// Distance reported by the drive, in millimeters.
    pub travelled_mm: f64,
    /// Number of `move_distance` commands issued.
    pub move_commands: usize,
}

/// Result of an instruction sequence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SequenceOutcome {
    /// Another sequence was already running; nothing was executed.
    Rejected,
    /// The sequence ran to completion or stopped early.
    Finished {
        /// Instructions carried out, including one that was interrupted.
        executed: usize,
        last_stop: StopReason,
    },
}

struct Inner<M> {
    motor: M,
    analyzer: Arc<ObstacleAnalyzer>,
    config: ControllerConfig,
    planner: Mutex<Option<RoutePlanner>>,
    is_navigating: AtomicBool,
    last_stop: AtomicU8,
    token: Mutex<CancellationToken>,
    phase: Mutex<StateMachine>,
}

/// Drives a [`MotorDevice`] along instruction sequences, steering around
/// obstacles reported by an [`ObstacleAnalyzer`].
///
/// Cheap to clone; clones share the same state.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use tokio_util::sync::CancellationToken;
/// use wayfinder_analysis::ObstacleAnalyzer;
/// use wayfinder_core::StopReason;
/// use wayfinder_hardware::mock::MockMotor;
/// use wayfinder_navigation::{ControllerConfig, NavigationController};
///
/// #[tokio::main(flavor = "current_thread", start_paused = true)]
/// async fn main() -> wayfinder_navigation::Result<()> {
///     let (motor, handle) = MockMotor::new();
///     let analyzer = Arc::new(ObstacleAnalyzer::new());
///     analyzer.process_readings(&[], 1);
///
///     let controller = NavigationController::new(motor, analyzer, ControllerConfig::default())?;
///     let outcome = controller
///         .continuous_move(350, 700.0, &CancellationToken::new())
///         .await?;
///
///     assert_eq!(outcome.reason, StopReason::Success);
///     assert_eq!(handle.move_command_count(), 1);
///     Ok(())
/// }
/// ```
pub struct NavigationController<M> {
    inner: Arc<Inner<M>>,
}

impl<M> Clone for NavigationController<M> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

/// Returns the phase machine to `Idle` when a movement ends, however it ends.
struct PhaseGuard<'a> {
    phase: &'a Mutex<StateMachine>,
}

impl Drop for PhaseGuard<'_> {
    fn drop(&mut self) {
        let mut machine = self.phase.lock().unwrap_or_else(PoisonError::into_inner);
        if machine.transition_to(NavigationPhase::Idle).is_err() {
            machine.reset();
        }
    }
}

/// Releases the navigation claim.
struct NavigatingGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for NavigatingGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

impl<M: MotorDevice> NavigationController<M> {
    /// Create a controller.
    ///
    /// # Errors
    ///
    /// Returns [`NavigationError::Config`] if `config` fails validation.
    pub fn new(motor: M, analyzer: Arc<ObstacleAnalyzer>, config: ControllerConfig) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            inner: Arc::new(Inner {
                motor,
                analyzer,
                config,
                planner: Mutex::new(None),
                is_navigating: AtomicBool::new(false),
                last_stop: AtomicU8::new(StopReason::Success.as_u8()),
                token: Mutex::new(CancellationToken::new()),
                phase: Mutex::new(StateMachine::new()),
            }),
        })
    }

    /// Attach a route planner for [`navigate_to`](Self::navigate_to).
    pub fn with_planner(self, planner: RoutePlanner) -> Self {
        self.set_planner(planner);
        self
    }

    pub fn set_planner(&self, planner: RoutePlanner) {
        *self.inner.planner.lock().unwrap_or_else(PoisonError::into_inner) = Some(planner);
    }

    pub fn motor(&self) -> &M {
        &self.inner.motor
    }

    pub fn analyzer(&self) -> &Arc<ObstacleAnalyzer> {
        &self.inner.analyzer
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.inner.config
    }

    pub fn phase(&self) -> NavigationPhase {
        self.phase_machine().current_phase()
    }

    /// The last `count` phase changes, oldest first.
    pub fn phase_history(&self, count: usize) -> Vec<PhaseTransition> {
        self.phase_machine().last_transitions(count)
    }

    pub fn is_navigating(&self) -> bool {
        self.inner.is_navigating.load(Ordering::Acquire)
    }

    /// Reason the last movement ended, as far as the controller knows.
    pub fn last_stop_reason(&self) -> StopReason {
        StopReason::from_u8(self.inner.last_stop.load(Ordering::Acquire))
            .unwrap_or(StopReason::Success)
    }

    /// Token of the current navigation attempt.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.current_token().clone()
    }

    /// Cancel the current navigation attempt.
    pub fn cancel(&self) {
        info!("Navigation cancelled");
        self.current_token().cancel();
    }

    fn phase_machine(&self) -> MutexGuard<'_, StateMachine> {
        self.inner.phase.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn current_token(&self) -> MutexGuard<'_, CancellationToken> {
        self.inner.token.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn store_stop_reason(&self, reason: StopReason) {
        self.inner.last_stop.store(reason.as_u8(), Ordering::Release);
    }

    fn enter_phase(&self, phase: NavigationPhase) -> Result<PhaseGuard<'_>> {
        let mut machine = self.phase_machine();
        let current = machine.current_phase();
        machine
            .transition_to(phase)
            .map_err(|_| NavigationError::Busy(current))?;

        Ok(PhaseGuard {
            phase: &self.inner.phase,
        })
    }

    fn claim_navigation(&self) -> Option<NavigatingGuard<'_>> {
        let claimed = self
            .inner
            .is_navigating
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();

        if !claimed {
            warn!("Already navigating, request rejected");
            return None;
        }

        Some(NavigatingGuard {
            flag: &self.inner.is_navigating,
        })
    }

    fn ensure_ready(&self) -> Result<()> {
        if self.inner.motor.is_enabled() {
            Ok(())
        } else {
            Err(NavigationError::MotorNotReady)
        }
    }

    /// Drive `distance_mm` straight ahead at `speed`, steering around
    /// obstacles on the way.
    ///
    /// Each tick the loop either advances the remaining distance, steers
    /// away from an obstacle, holds while the path is blocked, or exits on
    /// cancellation or collision. Cancelling `token` halts a move in flight.
    ///
    /// # Errors
    ///
    /// - [`NavigationError::MotorNotReady`] if the drive is disabled; no
    ///   command is issued.
    /// - [`NavigationError::Busy`] if another movement is in progress.
    /// - Any drive error, after which the controller is idle again.
    pub async fn continuous_move(
        &self,
        speed: i16,
        distance_mm: f64,
        token: &CancellationToken,
    ) -> Result<MoveOutcome> {
        self.ensure_ready()?;
        let _phase = self.enter_phase(NavigationPhase::Moving)?;
        self.store_stop_reason(StopReason::Success);

        info!("Moving {:.0} mm at {} mm/s", distance_mm, speed);

        let motor = &self.inner.motor;
        let mut travelled_mm = 0.0;
        let mut move_commands = 0;
        let mut reason = StopReason::Success;
        let mut steering = false;

        while travelled_mm < distance_mm {
            let decision = decide(
                token.is_cancelled(),
                self.last_stop_reason(),
                self.inner.analyzer.current(),
                travelled_mm,
                distance_mm,
            );
            trace!("Tick at {:.0}/{:.0} mm: {:?}", travelled_mm, distance_mm, decision);

            match decision {
                TickDecision::Exit(exit) => {
                    let stored = self.last_stop_reason();
                    reason = if stored.is_interrupting() { stored } else { exit };
                    break;
                }
                TickDecision::Advance { remaining_mm } => {
                    move_commands += 1;
                    steering = false;
                    let step = motor.move_distance(speed, remaining_mm.ceil() as i32);
                    tokio::pin!(step);

                    travelled_mm += tokio::select! {
                        biased;
                        result = &mut step => result?,
                        _ = token.cancelled() => {
                            motor.halt(StopReason::Cancelled);
                            step.await?
                        }
                    };
                }
                TickDecision::Adjust(side) => {
                    let adjust = self.inner.config.adjust_speed;
                    let (right, left) = match side {
                        Side::Right => (adjust, 0),
                        Side::Left => (0, adjust),
                    };
                    debug!("Obstacle on the {}, steering", side);
                    motor.set_speed(right, left).await?;
                    steering = true;
                }
                TickDecision::Hold => {}
            }

            tokio::time::sleep(self.inner.config.tick_interval()).await;
        }

        // Wheels set by `set_speed` keep turning until told otherwise.
        if steering {
            motor.cancel_move();
        }

        self.store_stop_reason(reason);
        info!(
            "Move finished: {} after {:.0} mm ({} move commands)",
            reason, travelled_mm, move_commands
        );

        Ok(MoveOutcome {
            reason,
            travelled_mm,
            move_commands,
        })
    }

    /// Rotate in place by `degrees`; positive turns right.
    ///
    /// # Errors
    ///
    /// Same as [`continuous_move`](Self::continuous_move).
    pub async fn rotate(&self, degrees: f64) -> Result<()> {
        self.ensure_ready()?;
        let _phase = self.enter_phase(NavigationPhase::Rotating)?;

        info!("Rotating {:+.0} degrees", degrees);
        self.inner
            .motor
            .rotate(self.inner.config.rotate_speed, degrees)
            .await?;
        Ok(())
    }

    /// Run `instructions` in order.
    ///
    /// Only one sequence runs at a time: a call made while navigating logs a
    /// warning and returns [`SequenceOutcome::Rejected`]. The sequence stops
    /// early after an instruction that ended in a collision or cancellation.
    pub async fn execute_instructions(&self, instructions: &[Instruction]) -> Result<SequenceOutcome> {
        let Some(_claim) = self.claim_navigation() else {
            return Ok(SequenceOutcome::Rejected);
        };

        self.run_sequence(instructions).await
    }

    /// Plan a route to `room` and follow it.
    ///
    /// # Errors
    ///
    /// [`NavigationError::NoPlanner`] without a planner; unknown or
    /// unreachable rooms surface as [`NavigationError::Core`].
    pub async fn navigate_to(&self, room: u32) -> Result<SequenceOutcome> {
        let Some(_claim) = self.claim_navigation() else {
            return Ok(SequenceOutcome::Rejected);
        };

        let directions = {
            let mut planner = self.inner.planner.lock().unwrap_or_else(PoisonError::into_inner);
            planner
                .as_mut()
                .ok_or(NavigationError::NoPlanner)?
                .directions(room)?
        };

        info!("Navigating to room {}", room);
        self.run_sequence(&directions).await
    }

    async fn run_sequence(&self, instructions: &[Instruction]) -> Result<SequenceOutcome> {
        let token = CancellationToken::new();
        *self.current_token() = token.clone();

        info!("Executing {} instruction(s)", instructions.len());

        let mut executed = 0;
        for (index, instruction) in instructions.iter().enumerate() {
            debug!("Instruction {}/{}: {}", index + 1, instructions.len(), instruction);

            let interrupted = match *instruction {
                Instruction::Angle(degrees) => {
                    self.rotate(degrees).await?;
                    false
                }
                Instruction::Distance(meters) => {
                    let outcome = self
                        .continuous_move(self.inner.config.move_speed, meters * 1000.0, &token)
                        .await?;
                    outcome.reason.is_interrupting()
                }
            };
            executed += 1;

            if interrupted || token.is_cancelled() {
                info!("Sequence stopped after {} instruction(s)", executed);
                break;
            }

            if index + 1 < instructions.len() {
                tokio::select! {
                    _ = tokio::time::sleep(self.inner.config.instruction_pause()) => {}
                    _ = token.cancelled() => {}
                }
            }
        }

        let last_stop = self.last_stop_reason();
        info!("Sequence finished: {} executed, last stop {}", executed, last_stop);

        Ok(SequenceOutcome::Finished {
            executed,
            last_stop,
        })
    }

    /// React to a stop reported by the drive.
    ///
    /// The reason is picked up by the move loop at its next tick; a collision
    /// or cancellation also cancels the current navigation attempt.
    pub fn handle_motor_stopped(&self, reason: StopReason) {
        debug!("Drive stopped: {}", reason);
        self.store_stop_reason(reason);

        if reason.is_interrupting() {
            self.current_token().cancel();
        }
    }

    /// React to a new recommendation from the analyzer.
    pub fn handle_analysis_changed(&self, recommendation: Recommendation) {
        debug!("Recommendation changed: {}", recommendation);

        match recommendation {
            Recommendation::Stop => self.inner.motor.halt(StopReason::Requested),
            Recommendation::AdjustObstacle(_) => self.inner.motor.cancel_move(),
            Recommendation::Move => {}
        }
    }
}

impl<M: MotorDevice + 'static> NavigationController<M> {
    /// Connect the controller to a scan stream.
    ///
    /// Spawns the scan pipeline feeding the analyzer, and the reactors for
    /// analysis changes and drive stops. Subscriptions are taken before this
    /// returns, so no event sent afterwards is missed.
    pub fn start(&self, scans: ScanHandle) -> ControllerHandle {
        let shutdown = CancellationToken::new();
        let analysis_rx = self.inner.analyzer.subscribe();
        let stop_rx = self.inner.motor.subscribe_stops();

        let mut tasks = JoinSet::new();
        tasks.spawn(run_scan_pipeline(
            Arc::clone(&self.inner.analyzer),
            scans,
            shutdown.clone(),
        ));
        tasks.spawn(run_analysis_reactor(self.clone(), analysis_rx, shutdown.clone()));
        tasks.spawn(run_stop_reactor(self.clone(), stop_rx, shutdown.clone()));

        info!("Navigation controller started");
        ControllerHandle { tasks, shutdown }
    }
}

async fn run_scan_pipeline(
    analyzer: Arc<ObstacleAnalyzer>,
    mut scans: ScanHandle,
    shutdown: CancellationToken,
) -> Result<()> {
    loop {
        let event = tokio::select! {
            _ = shutdown.cancelled() => break,
            event = scans.recv() => event,
        };

        match event {
            Some(ScanEvent::ScanComplete(batch)) => {
                if analyzer.process_batch(&batch).is_none() {
                    trace!("Dropped stale scan {}", batch.timestamp);
                }
            }
            Some(ScanEvent::DeviceError { device, error }) => {
                warn!("LIDAR {} failed: {}", device, error);
            }
            Some(other) => debug!("Ignoring scan event {:?}", other),
            None => {
                info!("Scan stream ended");
                break;
            }
        }
    }

    scans.shutdown().await?;
    Ok(())
}

async fn run_analysis_reactor<M: MotorDevice>(
    controller: NavigationController<M>,
    mut events: broadcast::Receiver<AnalysisChanged>,
    shutdown: CancellationToken,
) -> Result<()> {
    loop {
        let event = tokio::select! {
            _ = shutdown.cancelled() => break,
            event = events.recv() => event,
        };

        match event {
            Ok(change) => controller.handle_analysis_changed(change.recommendation),
            Err(RecvError::Lagged(skipped)) => {
                warn!("Analysis reactor lagged by {} events", skipped);
                controller.handle_analysis_changed(controller.analyzer().current());
            }
            Err(RecvError::Closed) => break,
        }
    }
    Ok(())
}

async fn run_stop_reactor<M: MotorDevice>(
    controller: NavigationController<M>,
    mut stops: broadcast::Receiver<StopReason>,
    shutdown: CancellationToken,
) -> Result<()> {
    loop {
        let event = tokio::select! {
            _ = shutdown.cancelled() => break,
            event = stops.recv() => event,
        };

        match event {
            Ok(reason) => controller.handle_motor_stopped(reason),
            Err(RecvError::Lagged(skipped)) => {
                warn!("Stop reactor lagged by {} events", skipped);
            }
            Err(RecvError::Closed) => break,
        }
    }
    Ok(())
}

/// Handle to the tasks spawned by [`NavigationController::start`].
pub struct ControllerHandle {
    tasks: JoinSet<Result<()>>,
    shutdown: CancellationToken,
}

impl ControllerHandle {
    /// Number of tasks still running.
    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    /// Stop the pipeline and reactors and wait for them to terminate.
    ///
    /// Failed or panicked tasks are logged, they do not fail the shutdown.
    pub async fn shutdown(mut self) {
        self.shutdown.cancel();

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
                "Controller tasks terminated abnormally: {} errors, {} panics",
                error_count, panic_count
            );
        } else {
            debug!("Controller tasks shut down cleanly");
        }
    }
}
