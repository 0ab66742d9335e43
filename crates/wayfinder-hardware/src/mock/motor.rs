//! Mock differential drive for testing and simulation.
//!
//! The mock simulates timing rather than physics: a straight move of `d` mm
//! at `v` mm/s takes `|d| / v` seconds, a rotation takes the wheel arc length
//! over the speed. Each long-running command owns a one-shot interrupt
//! channel; any later command, a halt or a simulated bump fires it.
//!
//! | Way a movement ends | Returned distance | Stop notification |
//! |---------------------|-------------------|-------------------|
//! | Runs to completion | full | `Success` |
//! | Overridden (`cancel_move`, `set_speed`, new move) | partial | none |
//! | `halt(reason)` | partial | `reason` |
//! | Bump (`MockMotorHandle::bump`) | partial | `Collision` |

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::{broadcast, oneshot};
use tokio::time::Instant;
use tracing::{debug, trace};
use wayfinder_core::StopReason;
use wayfinder_core::constants::{EVENT_CHANNEL_CAPACITY, MAX_WHEEL_SPEED, WHEEL_BASE_MM};

use crate::{
    HardwareError, Result,
    traits::MotorDevice,
    types::{DeviceInfo, MotorCommand, WheelSpeeds},
};

/// Why an in-flight movement ended early.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Interrupt {
    Overridden,
    Halted,
    Collision,
}

#[derive(Debug)]
struct InFlight {
    id: u64,
    interrupt_tx: oneshot::Sender<Interrupt>,
}

#[derive(Debug)]
struct MotorState {
    enabled: bool,
    wheels: WheelSpeeds,
    commands: Vec<MotorCommand>,
    odometer_mm: f64,
    in_flight: Option<InFlight>,
    next_id: u64,
}

impl MotorState {
    /// Fire the interrupt of the movement in flight, if any.
    fn interrupt(&mut self, interrupt: Interrupt) -> bool {
        match self.in_flight.take() {
            Some(active) => {
                let _ = active.interrupt_tx.send(interrupt);
                true
            }
            None => false,
        }
    }

    /// Clear the in-flight slot if it still belongs to movement `id`.
    fn finish(&mut self, id: u64) {
        if self.in_flight.as_ref().is_some_and(|active| active.id == id) {
            self.in_flight = None;
        }
    }
}

#[derive(Debug)]
struct MotorShared {
    name: String,
    state: Mutex<MotorState>,
    stop_tx: broadcast::Sender<StopReason>,
}

impl MotorShared {
    fn state(&self) -> MutexGuard<'_, MotorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn notify_stop(&self, reason: StopReason) {
        debug!("{} stopped: {}", self.name, reason);
        // No subscribers is fine.
        let _ = self.stop_tx.send(reason);
    }
}

/// Mock differential drive for testing and simulation.
///
/// # Examples
///
/// ```
/// use wayfinder_core::StopReason;
/// use wayfinder_hardware::mock::MockMotor;
/// use wayfinder_hardware::traits::MotorDevice;
///
/// #[tokio::main]
/// async fn main() -> wayfinder_hardware::Result<()> {
///     let (motor, handle) = MockMotor::new();
///     let mut stops = motor.subscribe_stops();
///
///     let travelled = motor.move_distance(500, 100).await?;
///     assert_eq!(travelled, 100.0);
///     assert_eq!(stops.recv().await.ok(), Some(StopReason::Success));
///     assert_eq!(handle.move_command_count(), 1);
///
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct MockMotor {
    shared: Arc<MotorShared>,
}

impl MockMotor {
    /// Create a new, enabled mock drive with the default name.
    pub fn new() -> (Self, MockMotorHandle) {
        Self::with_name("Mock Drive".to_string())
    }

    /// Create a new, enabled mock drive with a custom name.
    pub fn with_name(name: String) -> (Self, MockMotorHandle) {
        let (stop_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let shared = Arc::new(MotorShared {
            name,
            state: Mutex::new(MotorState {
                enabled: true,
                wheels: WheelSpeeds::STOPPED,
                commands: Vec::new(),
                odometer_mm: 0.0,
                in_flight: None,
                next_id: 0,
            }),
            stop_tx,
        });

        let handle = MockMotorHandle {
            shared: Arc::clone(&shared),
        };

        (Self { shared }, handle)
    }

    fn check_speed(speed: i16) -> Result<()> {
        if speed == 0 || speed.unsigned_abs() > MAX_WHEEL_SPEED.unsigned_abs() {
            return Err(HardwareError::invalid_speed(speed, MAX_WHEEL_SPEED));
        }
        Ok(())
    }

    /// Record `command`, override whatever is in flight and register a new
    /// movement with the given wheel speeds.
    fn begin(
        &self,
        command: MotorCommand,
        wheels: WheelSpeeds,
    ) -> Result<(u64, oneshot::Receiver<Interrupt>)> {
        let mut state = self.shared.state();
        if !state.enabled {
            return Err(HardwareError::not_enabled(self.shared.name.clone()));
        }

        state.commands.push(command);
        state.interrupt(Interrupt::Overridden);

        let (interrupt_tx, interrupt_rx) = oneshot::channel();
        let id = state.next_id;
        state.next_id += 1;
        state.in_flight = Some(InFlight { id, interrupt_tx });
        state.wheels = wheels;

        Ok((id, interrupt_rx))
    }

    /// Run a movement of `duration`, returning the completed fraction and the
    /// interrupt that ended it early, if any.
    async fn run(
        &self,
        id: u64,
        duration: Duration,
        interrupt_rx: oneshot::Receiver<Interrupt>,
    ) -> (f64, Option<Interrupt>) {
        let started = Instant::now();

        let interrupt = tokio::select! {
            _ = tokio::time::sleep(duration) => None,
            Ok(interrupt) = interrupt_rx => Some(interrupt),
        };

        let fraction = if duration.is_zero() {
            1.0
        } else {
            (started.elapsed().as_secs_f64() / duration.as_secs_f64()).min(1.0)
        };

        let mut state = self.shared.state();
        state.finish(id);
        if matches!(interrupt, None | Some(Interrupt::Collision)) {
            state.wheels = WheelSpeeds::STOPPED;
        }

        match interrupt {
            Some(_) => (fraction, interrupt),
            None => (1.0, None),
        }
    }

    fn announce(&self, interrupt: Option<Interrupt>) {
        match interrupt {
            None => self.shared.notify_stop(StopReason::Success),
            Some(Interrupt::Collision) => self.shared.notify_stop(StopReason::Collision),
            // Halt announces itself, overrides stay silent.
            Some(Interrupt::Halted) | Some(Interrupt::Overridden) => {}
        }
    }
}

impl MotorDevice for MockMotor {
    fn is_enabled(&self) -> bool {
        self.shared.state().enabled
    }

    async fn move_distance(&self, speed: i16, distance_mm: i32) -> Result<f64> {
        Self::check_speed(speed)?;

        let signed_speed = if distance_mm < 0 { -speed.abs() } else { speed.abs() };
        let (id, interrupt_rx) = self.begin(
            MotorCommand::MoveDistance { speed, distance_mm },
            WheelSpeeds::new(signed_speed, signed_speed),
        )?;

        let duration =
            Duration::from_secs_f64(f64::from(distance_mm.unsigned_abs()) / f64::from(speed.unsigned_abs()));
        trace!("Moving {} mm over {:?}", distance_mm, duration);

        let (fraction, interrupt) = self.run(id, duration, interrupt_rx).await;
        let travelled = f64::from(distance_mm) * fraction;
        self.shared.state().odometer_mm += travelled.abs();

        self.announce(interrupt);
        Ok(travelled)
    }

    async fn rotate(&self, speed: i16, degrees: f64) -> Result<()> {
        Self::check_speed(speed)?;
        if !degrees.is_finite() {
            return Err(HardwareError::invalid_data(format!(
                "Rotation must be finite, got {}",
                degrees
            )));
        }

        let wheel = if degrees < 0.0 { -speed.abs() } else { speed.abs() };
        let (id, interrupt_rx) = self.begin(
            MotorCommand::Rotate { speed, degrees },
            WheelSpeeds::new(-wheel, wheel),
        )?;

        let arc_mm = degrees.abs().to_radians() * WHEEL_BASE_MM / 2.0;
        let duration = Duration::from_secs_f64(arc_mm / f64::from(speed.unsigned_abs()));

        let (_, interrupt) = self.run(id, duration, interrupt_rx).await;
        self.announce(interrupt);
        Ok(())
    }

    async fn set_speed(&self, right: i16, left: i16) -> Result<()> {
        for speed in [right, left] {
            if speed.unsigned_abs() > MAX_WHEEL_SPEED.unsigned_abs() {
                return Err(HardwareError::invalid_speed(speed, MAX_WHEEL_SPEED));
            }
        }

        let wheels = WheelSpeeds::new(right, left);
        let mut state = self.shared.state();
        if !state.enabled {
            return Err(HardwareError::not_enabled(self.shared.name.clone()));
        }
        state.commands.push(MotorCommand::SetSpeed(wheels));
        state.interrupt(Interrupt::Overridden);
        state.wheels = wheels;
        Ok(())
    }

    fn halt(&self, reason: StopReason) {
        {
            let mut state = self.shared.state();
            state.commands.push(MotorCommand::Halt(reason));
            state.interrupt(Interrupt::Halted);
            state.wheels = WheelSpeeds::STOPPED;
        }
        self.shared.notify_stop(reason);
    }

    fn cancel_move(&self) {
        let mut state = self.shared.state();
        state.commands.push(MotorCommand::CancelMove);
        state.interrupt(Interrupt::Overridden);
        state.wheels = WheelSpeeds::STOPPED;
    }

    fn subscribe_stops(&self) -> broadcast::Receiver<StopReason> {
        self.shared.stop_tx.subscribe()
    }

    async fn get_info(&self) -> Result<DeviceInfo> {
        Ok(DeviceInfo::new(self.shared.name.clone(), "Mock Drive v1.0")
            .with_firmware_version("1.0.0"))
    }
}

/// Handle for inspecting and disturbing a mock drive.
///
/// Can be cloned and shared across tasks.
#[derive(Debug, Clone)]
pub struct MockMotorHandle {
    shared: Arc<MotorShared>,
}

impl MockMotorHandle {
    /// Enable or disable the drive.
    pub fn set_enabled(&self, enabled: bool) {
        self.shared.state().enabled = enabled;
    }

    /// Simulate a bumper hit.
    ///
    /// Interrupts the movement in flight, which then reports `Collision`.
    /// With nothing in flight the collision is announced directly.
    pub fn bump(&self) {
        let interrupted = {
            let mut state = self.shared.state();
            state.wheels = WheelSpeeds::STOPPED;
            state.interrupt(Interrupt::Collision)
        };
        if !interrupted {
            self.shared.notify_stop(StopReason::Collision);
        }
    }

    /// All commands received so far, oldest first.
    pub fn commands(&self) -> Vec<MotorCommand> {
        self.shared.state().commands.clone()
    }

    /// Number of `move_distance` commands received so far.
    pub fn move_command_count(&self) -> usize {
        self.shared
            .state()
            .commands
            .iter()
            .filter(|command| command.is_move_distance())
            .count()
    }

    /// Current wheel speeds.
    pub fn wheel_speeds(&self) -> WheelSpeeds {
        self.shared.state().wheels
    }

    /// Total straight-line distance driven, in millimeters.
    pub fn odometer_mm(&self) -> f64 {
        self.shared.state().odometer_mm
    }

    /// Whether a move or rotation is currently in flight.
    pub fn is_moving(&self) -> bool {
        self.shared.state().in_flight.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_move_distance_completes() {
        let (motor, handle) = MockMotor::new();
        let mut stops = motor.subscribe_stops();

        let travelled = motor.move_distance(350, 700).await.unwrap();

        assert_eq!(travelled, 700.0);
        assert_eq!(stops.recv().await.unwrap(), StopReason::Success);
        assert_eq!(handle.odometer_mm(), 700.0);
        assert!(handle.wheel_speeds().is_stopped());
        assert!(!handle.is_moving());
    }

    #[tokio::test(start_paused = true)]
    async fn test_move_distance_takes_simulated_time() {
        let (motor, _handle) = MockMotor::new();

        let started = Instant::now();
        motor.move_distance(200, 400).await.unwrap();

        assert_eq!(started.elapsed(), Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_halt_interrupts_move() {
        let (motor, handle) = MockMotor::new();
        let mut stops = motor.subscribe_stops();

        let mover = motor.clone();
        let task = tokio::spawn(async move { mover.move_distance(100, 1000).await });

        tokio::time::sleep(Duration::from_secs(5)).await;
        motor.halt(StopReason::Requested);

        let travelled = task.await.unwrap().unwrap();
        assert!((travelled - 500.0).abs() < 1.0, "travelled {}", travelled);
        assert_eq!(stops.recv().await.unwrap(), StopReason::Requested);
        assert!(stops.try_recv().is_err(), "halted move must not report success");
        assert!(handle.wheel_speeds().is_stopped());
    }

    #[tokio::test(start_paused = true)]
    async fn test_bump_reports_collision() {
        let (motor, handle) = MockMotor::new();
        let mut stops = motor.subscribe_stops();

        let mover = motor.clone();
        let task = tokio::spawn(async move { mover.move_distance(100, 1000).await });

        tokio::time::sleep(Duration::from_secs(2)).await;
        handle.bump();

        let travelled = task.await.unwrap().unwrap();
        assert!(travelled < 1000.0);
        assert_eq!(stops.recv().await.unwrap(), StopReason::Collision);
    }

    #[tokio::test]
    async fn test_bump_while_idle_reports_collision() {
        let (motor, handle) = MockMotor::new();
        let mut stops = motor.subscribe_stops();

        handle.bump();

        assert_eq!(stops.recv().await.unwrap(), StopReason::Collision);
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_speed_overrides_move_silently() {
        let (motor, handle) = MockMotor::new();
        let mut stops = motor.subscribe_stops();

        let mover = motor.clone();
        let task = tokio::spawn(async move { mover.move_distance(100, 1000).await });

        tokio::time::sleep(Duration::from_secs(1)).await;
        motor.set_speed(17, 0).await.unwrap();

        let travelled = task.await.unwrap().unwrap();
        assert!(travelled < 1000.0);
        assert!(stops.try_recv().is_err());
        assert_eq!(handle.wheel_speeds(), WheelSpeeds::new(17, 0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_move_is_silent() {
        let (motor, handle) = MockMotor::new();
        let mut stops = motor.subscribe_stops();

        let mover = motor.clone();
        let task = tokio::spawn(async move { mover.move_distance(100, 1000).await });

        tokio::time::sleep(Duration::from_secs(1)).await;
        motor.cancel_move();

        task.await.unwrap().unwrap();
        assert!(stops.try_recv().is_err());
        assert_eq!(handle.commands().last(), Some(&MotorCommand::CancelMove));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rotate_records_command() {
        let (motor, handle) = MockMotor::new();

        motor.rotate(70, -90.0).await.unwrap();

        assert_eq!(
            handle.commands(),
            vec![MotorCommand::Rotate {
                speed: 70,
                degrees: -90.0
            }]
        );
        assert_eq!(handle.odometer_mm(), 0.0);
    }

    #[tokio::test]
    async fn test_disabled_drive_rejects_commands() {
        let (motor, handle) = MockMotor::new();
        handle.set_enabled(false);

        assert!(!motor.is_enabled());
        assert!(matches!(
            motor.move_distance(350, 100).await,
            Err(HardwareError::NotEnabled { .. })
        ));
        assert!(matches!(
            motor.set_speed(10, 10).await,
            Err(HardwareError::NotEnabled { .. })
        ));
        assert!(handle.commands().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_speed_rejected() {
        let (motor, _handle) = MockMotor::new();

        assert!(matches!(
            motor.move_distance(0, 100).await,
            Err(HardwareError::InvalidSpeed { .. })
        ));
        assert!(matches!(
            motor.set_speed(600, 0).await,
            Err(HardwareError::InvalidSpeed { .. })
        ));
    }

    #[tokio::test]
    async fn test_get_info() {
        let (motor, _handle) = MockMotor::with_name("Create 2".to_string());

        let info = motor.get_info().await.unwrap();
        assert_eq!(info.name, "Create 2");
        assert_eq!(info.model, "Mock Drive v1.0");
    }
}
