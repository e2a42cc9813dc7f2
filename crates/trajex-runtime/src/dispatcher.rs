//! [`WaypointDispatcher`] – sends a goal's waypoints to the controller.
//!
//! Waypoints are handled strictly in goal order, one `enqueue` call each.  A
//! waypoint in a foreign frame is converted into the base frame first; if that
//! is impossible the dispatch stops right there and nothing after it is sent.
//! The first waypoint resets the controller queue so stale motion from an
//! earlier goal is dropped.  No retries, no batching.

use tracing::{debug, error};
use trajex_hal::ArmController;
use trajex_tf::FrameTransformer;
use trajex_types::{StampedPose, TrajError, TrajectoryPoint};

/// Dispatch stopped early.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchFailure {
    /// Waypoints the controller accepted before the failure.
    pub dispatched: usize,
    pub error: TrajError,
}

pub struct WaypointDispatcher<'a> {
    arm: &'a dyn ArmController,
    tf: &'a dyn FrameTransformer,
    base_frame: &'a str,
}

impl<'a> WaypointDispatcher<'a> {
    pub fn new(arm: &'a dyn ArmController, tf: &'a dyn FrameTransformer, base_frame: &'a str) -> Self {
        Self {
            arm,
            tf,
            base_frame,
        }
    }

    /// Send every waypoint, returning how many were enqueued.
    ///
    /// # Errors
    ///
    /// Returns a [`DispatchFailure`] carrying
    /// [`TrajError::TransformUnavailable`] (with the waypoint index) or the
    /// controller's [`TrajError::HardwareFault`].
    pub fn dispatch<P: TrajectoryPoint>(&self, waypoints: &[P]) -> Result<usize, DispatchFailure> {
        for (index, waypoint) in waypoints.iter().enumerate() {
            let fail = |error: TrajError| DispatchFailure {
                dispatched: index,
                error,
            };

            let canonical = match waypoint.source_frame() {
                None => *waypoint.pose(),
                Some(source_frame) => {
                    if !self
                        .tf
                        .can_transform(self.base_frame, source_frame, waypoint.stamp())
                    {
                        error!(
                            waypoint = index + 1,
                            source_frame,
                            base_frame = self.base_frame,
                            "no transform to base frame; aborting trajectory"
                        );
                        return Err(fail(TrajError::TransformUnavailable {
                            target_frame: self.base_frame.to_string(),
                            source_frame: source_frame.to_string(),
                            index: Some(index),
                        }));
                    }
                    let stamped = StampedPose::new(source_frame, *waypoint.pose())
                        .with_stamp(waypoint.stamp());
                    self.tf
                        .transform(self.base_frame, &stamped)
                        .map_err(|e| match e {
                            TrajError::TransformUnavailable {
                                target_frame,
                                source_frame,
                                ..
                            } => fail(TrajError::TransformUnavailable {
                                target_frame,
                                source_frame,
                                index: Some(index),
                            }),
                            other => fail(other),
                        })?
                        .pose
                }
            };

            let reset_queue = index == 0;
            self.arm
                .enqueue(&waypoint.to_command(canonical), reset_queue)
                .map_err(|e| {
                    error!(waypoint = index + 1, error = %e, "controller rejected waypoint");
                    fail(e)
                })?;
            debug!(waypoint = index + 1, reset_queue, "waypoint queued");
        }
        Ok(waypoints.len())
    }
}
