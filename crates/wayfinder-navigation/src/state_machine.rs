//! Movement phase state machine.
//!
//! The controller is always in exactly one phase:
//!
//! - `Idle`: no movement in progress
//! - `Rotating`: an in-place rotation is being executed
//! - `Moving`: the continuous move loop is running
//!
//! # Valid Transitions
//!
//! - Idle → Rotating → Idle
//! - Idle → Moving → Idle
//!
//! A movement can therefore only start from `Idle`; the controller maps a
//! rejected transition to a busy error.
//!
//! # Examples
//!
//! ```
//! use wayfinder_navigation::{NavigationPhase, StateMachine};
//!
//! let mut machine = StateMachine::new();
//! machine.transition_to(NavigationPhase::Moving).unwrap();
//!
//! assert!(machine.transition_to(NavigationPhase::Rotating).is_err());
//!
//! machine.transition_to(NavigationPhase::Idle).unwrap();
//! assert_eq!(machine.history().len(), 2);
//! ```

use std::collections::VecDeque;
use std::fmt;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use wayfinder_core::{Error, Result};

/// Maximum number of phase transitions kept in history.
const MAX_HISTORY_SIZE: usize = 100;

/// Movement phase of the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NavigationPhase {
    #[default]
    Idle,
    Rotating,
    Moving,
}

impl fmt::Display for NavigationPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let phase = match self {
            NavigationPhase::Idle => "Idle",
            NavigationPhase::Rotating => "Rotating",
            NavigationPhase::Moving => "Moving",
        };
        write!(f, "{}", phase)
    }
}

impl NavigationPhase {
    /// Check if a transition to `target` is allowed from this phase.
    ///
    /// ```
    /// use wayfinder_navigation::NavigationPhase;
    ///
    /// assert!(NavigationPhase::Idle.can_transition_to(&NavigationPhase::Moving));
    /// assert!(!NavigationPhase::Moving.can_transition_to(&NavigationPhase::Rotating));
    /// ```
    pub fn can_transition_to(&self, target: &NavigationPhase) -> bool {
        matches!(
            (self, target),
            (
                NavigationPhase::Idle,
                NavigationPhase::Rotating | NavigationPhase::Moving
            ) | (
                NavigationPhase::Rotating | NavigationPhase::Moving,
                NavigationPhase::Idle
            )
        )
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, NavigationPhase::Idle)
    }
}

/// One recorded phase change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseTransition {
    pub from: NavigationPhase,
    pub to: NavigationPhase,
    /// Wall-clock time of the change.
    pub at: DateTime<Utc>,
}

impl PhaseTransition {
    pub fn new(from: NavigationPhase, to: NavigationPhase) -> Self {
        Self {
            from,
            to,
            at: Utc::now(),
        }
    }
}

/// State machine tracking the controller's movement phase.
///
/// Not thread-safe by itself; the controller keeps it behind a mutex.
#[derive(Debug)]
pub struct StateMachine {
    current: NavigationPhase,
    entered_at: Instant,
    history: VecDeque<PhaseTransition>,
}

impl StateMachine {
    /// Create a machine in the `Idle` phase.
    pub fn new() -> Self {
        Self {
            current: NavigationPhase::Idle,
            entered_at: Instant::now(),
            history: VecDeque::with_capacity(MAX_HISTORY_SIZE),
        }
    }

    pub fn current_phase(&self) -> NavigationPhase {
        self.current
    }

    /// Time spent in the current phase.
    pub fn time_in_current_phase(&self) -> Duration {
        self.entered_at.elapsed()
    }

    /// Recent transitions, oldest first.
    pub fn history(&self) -> &VecDeque<PhaseTransition> {
        &self.history
    }

    /// Get the last `count` transitions.
    pub fn last_transitions(&self, count: usize) -> Vec<PhaseTransition> {
        let skip = self.history.len().saturating_sub(count);
        self.history.iter().skip(skip).cloned().collect()
    }

    /// Move to `phase` if the transition is valid.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidStateTransition`] and leaves the machine
    /// untouched if the transition is not allowed.
    pub fn transition_to(&mut self, phase: NavigationPhase) -> Result<PhaseTransition> {
        if !self.current.can_transition_to(&phase) {
            return Err(Error::InvalidStateTransition {
                from: self.current.to_string(),
                to: phase.to_string(),
            });
        }

        let transition = PhaseTransition::new(self.current, phase);
        self.perform_phase_change(phase, transition.clone());
        Ok(transition)
    }

    /// Force the machine back to `Idle`, whatever the current phase.
    pub fn reset(&mut self) -> PhaseTransition {
        let transition = PhaseTransition::new(self.current, NavigationPhase::Idle);
        self.perform_phase_change(NavigationPhase::Idle, transition.clone());
        transition
    }

    fn perform_phase_change(&mut self, phase: NavigationPhase, transition: PhaseTransition) {
        self.current = phase;
        self.entered_at = Instant::now();

        self.history.push_back(transition);
        if self.history.len() > MAX_HISTORY_SIZE {
            self.history.pop_front();
        }
    }
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}
