//! [`GoalValidator`] – the single pre-dispatch check.
//!
//! A goal is refused before anything reaches the controller when the arm is
//! already faulted.  Nothing else is checked up front: bad frames surface
//! during dispatch, waypoint by waypoint.

use trajex_hal::ArmSnapshot;
use trajex_types::{Goal, TrajError};

/// What the executor should do with a freshly submitted goal.
#[derive(Debug, Clone, PartialEq)]
pub enum Validation {
    /// Dispatch and monitor.
    Accept,
    /// Nothing to send: finish as succeeded at the current pose without
    /// touching the controller queue.
    Empty,
    /// Abort without dispatching.
    Reject(TrajError),
}

pub struct GoalValidator;

impl GoalValidator {
    /// Classify `goal` against the arm state in `snapshot`.
    ///
    /// The fault check runs first, so an empty goal on a faulted arm is
    /// still rejected.
    pub fn validate<P>(goal: &Goal<P>, snapshot: &ArmSnapshot) -> Validation {
        if snapshot.is_faulted {
            return Validation::Reject(TrajError::ArmFaultedBeforeStart);
        }
        if goal.is_empty() {
            return Validation::Empty;
        }
        Validation::Accept
    }
}
