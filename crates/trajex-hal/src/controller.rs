//! The `ArmController` trait implemented by arm drivers.
//!
//! A driver owns the physical motion queue and fault detection.  Reads are
//! cheap and return promptly; writes are synchronous and report failure via
//! [`TrajError::HardwareFault`].

use trajex_types::{CartesianPose, FingerAngles, TrajError, Waypoint};

/// A robot arm controller with an internal queue of pending motions.
///
/// All methods take `&self` so one controller can be shared between goal
/// endpoints; drivers use interior mutability for their own state.  Callers
/// that write to the queue must hold the [`SharedArm`][crate::SharedArm]
/// lease.
pub trait ArmController: Send + Sync {
    /// `true` while the arm is in a fault (or emergency-stopped) state.
    fn is_faulted(&self) -> bool;

    /// Current end-effector pose in the controller's own base frame.  The
    /// executor's configured base frame must name this frame; poses read
    /// here are labelled with it unchanged.
    fn current_pose(&self) -> CartesianPose;

    /// Current finger positions, if the arm has a hand.
    fn current_fingers(&self) -> Option<FingerAngles>;

    /// Number of motions still waiting in the controller queue.
    fn queued_count(&self) -> usize;

    /// Append `waypoint` to the motion queue.  With `reset_queue` set, any
    /// previously queued motion is discarded first.
    ///
    /// # Errors
    ///
    /// Returns [`TrajError::HardwareFault`] if the controller rejects the
    /// command.
    fn enqueue(&self, waypoint: &Waypoint, reset_queue: bool) -> Result<(), TrajError>;

    /// Halt motion and drop the queue.
    fn stop(&self) -> Result<(), TrajError>;

    /// Re-arm the controller so it accepts new motions.
    fn start(&self) -> Result<(), TrajError>;
}

/// Point-in-time read of an [`ArmController`].  Never cached: take a fresh one
/// on every poll.
#[derive(Debug, Clone, PartialEq)]
pub struct ArmSnapshot {
    pub is_faulted: bool,
    pub pose: CartesianPose,
    pub finger_angles: Option<FingerAngles>,
    pub queued_count: usize,
}

impl ArmSnapshot {
    /// Read every field from `controller`: fault state, then queue length,
    /// then pose, so the pose is never older than the queue it is paired
    /// with.
    pub fn read(controller: &dyn ArmController) -> Self {
        let is_faulted = controller.is_faulted();
        let queued_count = controller.queued_count();
        let pose = controller.current_pose();
        let finger_angles = controller.current_fingers();
        Self {
            is_faulted,
            pose,
            finger_angles,
            queued_count,
        }
    }
}
