//! In-process simulated arm for CI and headless runs.
//!
//! [`SimArm`] keeps a real motion queue but no dynamics: every call to
//! [`ArmController::queued_count`] retires the head of the queue and snaps the
//! end effector onto it, so a trajectory of N waypoints completes after N
//! polls.  Faults can be injected at any time, and every command is recorded
//! so tests can assert on exactly what reached the controller.
//!
//! # Example
//!
//! ```rust
//! use trajex_hal::{ArmController, SimArm};
//! use trajex_types::{CartesianPose, CartesianWaypoint, Waypoint};
//!
//! let arm = SimArm::new();
//! let wp = Waypoint::Cartesian(CartesianWaypoint::canonical(CartesianPose::at(0.2, 0.0, 0.4)));
//! arm.enqueue(&wp, true).expect("sim enqueue must succeed");
//!
//! assert_eq!(arm.queued_count(), 0);
//! assert_eq!(arm.current_pose(), CartesianPose::at(0.2, 0.0, 0.4));
//! ```

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use tracing::{debug, warn};
use trajex_types::{CartesianPose, FingerAngles, TrajError, TrajectoryPoint, Waypoint};

use crate::controller::ArmController;

#[derive(Debug, Default)]
struct SimState {
    pose: CartesianPose,
    fingers: Option<FingerAngles>,
    queue: VecDeque<Waypoint>,
    faulted: bool,
    disarmed: bool,
    history: Vec<(Waypoint, bool)>,
    stops: usize,
    starts: usize,
}

/// A simulated arm controller.  Always armed and fault-free until told
/// otherwise.
#[derive(Debug, Default)]
pub struct SimArm {
    state: Mutex<SimState>,
}

impl SimArm {
    /// A simulated arm without a hand, resting at the base frame origin.
    pub fn new() -> Self {
        Self::default()
    }

    /// A simulated arm with a three-finger hand, fingers open.
    pub fn with_hand() -> Self {
        let arm = Self::new();
        arm.state().fingers = Some(FingerAngles::default());
        arm
    }

    /// Put the arm into a fault state.
    pub fn inject_fault(&self) {
        warn!("sim arm: fault injected");
        self.state().faulted = true;
    }

    pub fn clear_fault(&self) {
        self.state().faulted = false;
    }

    /// Every `(waypoint, reset_queue)` pair accepted so far, oldest first.
    pub fn history(&self) -> Vec<(Waypoint, bool)> {
        self.state().history.clone()
    }

    pub fn stop_count(&self) -> usize {
        self.state().stops
    }

    pub fn start_count(&self) -> usize {
        self.state().starts
    }

    fn state(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl ArmController for SimArm {
    fn is_faulted(&self) -> bool {
        self.state().faulted
    }

    fn current_pose(&self) -> CartesianPose {
        self.state().pose
    }

    fn current_fingers(&self) -> Option<FingerAngles> {
        self.state().fingers
    }

    fn queued_count(&self) -> usize {
        let mut state = self.state();
        if !state.faulted
            && let Some(reached) = state.queue.pop_front()
        {
            state.pose = *reached.pose();
            if let (Some(fingers), Some(_)) = (reached.fingers(), state.fingers) {
                state.fingers = Some(fingers);
            }
        }
        state.queue.len()
    }

    fn enqueue(&self, waypoint: &Waypoint, reset_queue: bool) -> Result<(), TrajError> {
        let mut state = self.state();
        if state.faulted || state.disarmed {
            return Err(TrajError::HardwareFault {
                component: "sim_arm".to_string(),
                details: if state.faulted {
                    "arm is faulted".to_string()
                } else {
                    "arm is stopped; call start() first".to_string()
                },
            });
        }
        if reset_queue {
            state.queue.clear();
        }
        state.queue.push_back(waypoint.clone());
        state.history.push((waypoint.clone(), reset_queue));
        debug!(queued = state.queue.len(), reset_queue, "sim arm: waypoint queued");
        Ok(())
    }

    fn stop(&self) -> Result<(), TrajError> {
        let mut state = self.state();
        state.queue.clear();
        state.disarmed = true;
        state.stops += 1;
        Ok(())
    }

    fn start(&self) -> Result<(), TrajError> {
        let mut state = self.state();
        state.disarmed = false;
        state.starts += 1;
        Ok(())
    }
}
