//! Per-tick decision of the continuous move loop.

use serde::{Deserialize, Serialize};
use wayfinder_core::{Recommendation, Side, StopReason};

/// What the move loop does on one tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum TickDecision {
    /// Leave the loop with this reason.
    Exit(StopReason),
    /// Drive the remaining distance.
    Advance { remaining_mm: f64 },
    /// Steer away from an obstacle on `Side`.
    Adjust(Side),
    /// Wait for the path to clear.
    Hold,
}

/// Decide the next step of the move loop.
///
/// Cancellation wins over everything, then an interrupting stop reason
/// (collision or cancellation reported by the drive), then the analyzer's
/// recommendation.
///
/// # Examples
///
/// ```
/// use wayfinder_core::{Recommendation, StopReason};
/// use wayfinder_navigation::{TickDecision, decide};
///
/// assert_eq!(
///     decide(false, StopReason::Success, Recommendation::Move, 250.0, 1000.0),
///     TickDecision::Advance { remaining_mm: 750.0 }
/// );
/// assert_eq!(
///     decide(false, StopReason::Collision, Recommendation::Move, 250.0, 1000.0),
///     TickDecision::Exit(StopReason::Collision)
/// );
/// ```
pub fn decide(
    cancelled: bool,
    last_stop: StopReason,
    recommendation: Recommendation,
    travelled_mm: f64,
    target_mm: f64,
) -> TickDecision {
    if cancelled {
        return TickDecision::Exit(StopReason::Cancelled);
    }

    if last_stop.is_interrupting() {
        return TickDecision::Exit(last_stop);
    }

    match recommendation {
        Recommendation::Move => TickDecision::Advance {
            remaining_mm: target_mm - travelled_mm,
        },
        Recommendation::AdjustObstacle(side) => TickDecision::Adjust(side),
        Recommendation::Stop => TickDecision::Hold,
    }
}
