//! [`TrajectoryExecutor`] – runs one trajectory goal from submission to a
//! terminal outcome.
//!
//! ```text
//!   acquire lease ─▶ validate ─▶ dispatch ─▶ monitor ─▶ GoalResult
//!                      │            │           │
//!                      └─ Aborted   └─ Aborted  └─ Succeeded / Preempted / Aborted
//! ```
//!
//! The executor is generic over the waypoint variant, so the pose-only and
//! pose+finger endpoints share every line of the state machine.  Both
//! collaborators are injected at construction; executors built on clones of
//! the same [`SharedArm`] run their goals one at a time.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//! use trajex_hal::{SharedArm, SimArm};
//! use trajex_runtime::{ExecutorConfig, GoalHandle, PoseTrajectoryExecutor};
//! use trajex_tf::TfBuffer;
//! use trajex_types::{CartesianPose, CartesianWaypoint, Goal};
//!
//! # async fn demo() {
//! let executor = PoseTrajectoryExecutor::new(
//!     SharedArm::new(Arc::new(SimArm::new())),
//!     Arc::new(TfBuffer::new()),
//!     ExecutorConfig::default(),
//!     CancellationToken::new(),
//! );
//! let goal = Goal::new(vec![CartesianWaypoint::canonical(CartesianPose::at(0.2, 0.0, 0.4))]);
//! let (handle, _feedback) = GoalHandle::new();
//! let result = executor.execute(&goal, &handle).await;
//! println!("{}", result.outcome);
//! # }
//! ```

use std::marker::PhantomData;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};
use trajex_hal::{ArmSnapshot, SharedArm};
use trajex_tf::FrameTransformer;
use trajex_types::{
    CartesianWaypoint, ExecutionOutcome, Goal, GoalResult, JointTrajectoryPoint, StampedPose,
    TrajError, TrajectoryPoint,
};

use crate::config::ExecutorConfig;
use crate::dispatcher::WaypointDispatcher;
use crate::handle::GoalHandle;
use crate::monitor::{ExecutionMonitor, express_in_base};
use crate::validator::{GoalValidator, Validation};

/// Executor for pose-only trajectories.
pub type PoseTrajectoryExecutor = TrajectoryExecutor<CartesianWaypoint>;

/// Executor for trajectories that also drive the fingers.
pub type JointTrajectoryExecutor = TrajectoryExecutor<JointTrajectoryPoint>;

pub struct TrajectoryExecutor<P> {
    arm: SharedArm,
    tf: Arc<dyn FrameTransformer>,
    config: ExecutorConfig,
    /// Process-wide shutdown signal, polled once per monitoring tick.
    shutdown: CancellationToken,
    _point: PhantomData<fn() -> P>,
}

impl<P: TrajectoryPoint> TrajectoryExecutor<P> {
    pub fn new(
        arm: SharedArm,
        tf: Arc<dyn FrameTransformer>,
        config: ExecutorConfig,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            arm,
            tf,
            config,
            shutdown,
            _point: PhantomData,
        }
    }

    /// Execute `goal` to completion.
    ///
    /// Never returns early on error: every path ends in a [`GoalResult`] with
    /// an explicit outcome.  Feedback is sent through `handle` once per
    /// monitoring tick, and cancellation requested through `handle` is
    /// honoured at the next tick.
    #[instrument(name = "trajectory_goal", skip_all, fields(goal_id = %goal.id, waypoints = goal.len()))]
    pub async fn execute(&self, goal: &Goal<P>, handle: &GoalHandle) -> GoalResult {
        let lease = self.arm.acquire().await;
        let arm = lease.controller();
        let tf = self.tf.as_ref();
        let base_frame = self.config.base_frame.as_str();
        info!("trajectory goal started");

        let snapshot = ArmSnapshot::read(arm);
        match GoalValidator::validate(goal, &snapshot) {
            Validation::Accept => {}
            Validation::Empty => {
                info!("empty trajectory; nothing to dispatch");
                let pose = express_in_base(tf, base_frame, snapshot.pose);
                return self.report(goal, ExecutionOutcome::Succeeded, pose, None, 0, 0);
            }
            Validation::Reject(reason) => {
                error!(%reason, "trajectory goal rejected");
                let pose = express_in_base(tf, base_frame, snapshot.pose);
                return self.report(goal, reason.outcome(), pose, Some(reason), 0, 0);
            }
        }

        let dispatched = match WaypointDispatcher::new(arm, tf, base_frame).dispatch(&goal.waypoints) {
            Ok(sent) => sent,
            Err(failure) => {
                let pose = express_in_base(tf, base_frame, arm.current_pose());
                let outcome = failure.error.outcome();
                return self.report(goal, outcome, pose, Some(failure.error), failure.dispatched, 0);
            }
        };

        let monitor = ExecutionMonitor::new(arm, tf, base_frame, goal.id, handle, &self.shutdown);
        let (terminal, ticks) = monitor.run(self.config.poll_interval).await;
        self.report(goal, terminal.outcome, terminal.pose, terminal.reason, dispatched, ticks)
    }

    fn report(
        &self,
        goal: &Goal<P>,
        outcome: ExecutionOutcome,
        pose: Option<StampedPose>,
        reason: Option<TrajError>,
        dispatched: usize,
        ticks: u64,
    ) -> GoalResult {
        match (&outcome, &reason) {
            (ExecutionOutcome::Succeeded, _) => info!(dispatched, ticks, "trajectory goal succeeded"),
            (_, Some(reason)) => warn!(%outcome, %reason, dispatched, ticks, "trajectory goal ended"),
            (_, None) => warn!(%outcome, dispatched, ticks, "trajectory goal ended"),
        }
        GoalResult {
            goal_id: goal.id,
            outcome,
            pose,
            reason,
            dispatched,
            ticks,
        }
    }
}
