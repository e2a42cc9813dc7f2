//! [`ExecutionMonitor`] – watches the arm until the trajectory ends.
//!
//! The monitor is a small state machine: it starts in `Monitoring` and each
//! call to [`ExecutionMonitor::poll`] runs exactly one tick, which either
//! leaves it monitoring or finishes it as succeeded, preempted or aborted.
//! [`ExecutionMonitor::run`] drives `poll` from a fixed-rate
//! [`tokio::time::interval`]; the interval wait is the only suspension point,
//! so cancellation and shutdown are observed at tick boundaries and never
//! mid-tick.
//!
//! # Tick order
//!
//! 1. Cancellation or shutdown requested → `stop()` then `start()` on the
//!    controller, finish as preempted.
//! 2. Fresh [`ArmSnapshot`].  Faulted → finish as aborted, controller left
//!    as it is.
//! 3. Publish feedback: the current pose in the base frame.
//! 4. Queue empty → finish as succeeded with that same pose.
//!
//! Feedback is therefore never published for a faulted tick, and the success
//! result is always the pose read on the tick that saw the empty queue.

use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use trajex_hal::{ArmController, ArmSnapshot};
use trajex_tf::FrameTransformer;
use trajex_types::{CartesianPose, ExecutionOutcome, Feedback, StampedPose, TrajError};
use uuid::Uuid;

use crate::config::MIN_POLL_INTERVAL;
use crate::handle::GoalHandle;

/// How a monitored trajectory ended.
#[derive(Debug, Clone, PartialEq)]
pub struct Terminal {
    pub outcome: ExecutionOutcome,
    pub pose: Option<StampedPose>,
    pub reason: Option<TrajError>,
}

/// Result of one monitoring tick.
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    Continue,
    Finished(Terminal),
}

pub struct ExecutionMonitor<'a> {
    arm: &'a dyn ArmController,
    tf: &'a dyn FrameTransformer,
    base_frame: &'a str,
    goal_id: Uuid,
    handle: &'a GoalHandle,
    shutdown: &'a CancellationToken,
    last_feedback: Option<StampedPose>,
    ticks: u64,
}

impl<'a> ExecutionMonitor<'a> {
    pub fn new(
        arm: &'a dyn ArmController,
        tf: &'a dyn FrameTransformer,
        base_frame: &'a str,
        goal_id: Uuid,
        handle: &'a GoalHandle,
        shutdown: &'a CancellationToken,
    ) -> Self {
        Self {
            arm,
            tf,
            base_frame,
            goal_id,
            handle,
            shutdown,
            last_feedback: None,
            ticks: 0,
        }
    }

    /// Ticks run so far.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Tick at `poll_interval` until the trajectory ends.  The first tick runs
    /// immediately.  Intervals shorter than [`MIN_POLL_INTERVAL`] are raised
    /// to it.
    pub async fn run(mut self, poll_interval: Duration) -> (Terminal, u64) {
        if poll_interval < MIN_POLL_INTERVAL {
            warn!(?poll_interval, "poll interval below minimum; clamping");
        }
        let mut interval = tokio::time::interval(poll_interval.max(MIN_POLL_INTERVAL));
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            // Let cancellation and transform updates queued on this runtime
            // land before the tick reads them.
            tokio::task::yield_now().await;
            if let TickOutcome::Finished(terminal) = self.poll() {
                return (terminal, self.ticks);
            }
        }
    }

    /// Run one tick without waiting.
    pub fn poll(&mut self) -> TickOutcome {
        self.ticks += 1;
        let tick = self.ticks;

        if let Some(reason) = self.preemption_reason() {
            info!(tick, %reason, "preempting trajectory");
            let pose = self.last_feedback.clone().or_else(|| self.express(self.arm.current_pose()));
            // Stop drops the rest of the queue; start leaves the arm ready for
            // the next goal.
            if let Err(e) = self.arm.stop() {
                warn!(error = %e, "stop failed while preempting");
            }
            if let Err(e) = self.arm.start() {
                warn!(error = %e, "restart failed while preempting");
            }
            return TickOutcome::Finished(Terminal {
                outcome: ExecutionOutcome::Preempted,
                pose,
                reason: Some(reason),
            });
        }

        let snapshot = ArmSnapshot::read(self.arm);
        if snapshot.is_faulted {
            error!(tick, "arm faulted during trajectory execution");
            let pose = self.last_feedback.clone().or_else(|| self.express(snapshot.pose));
            return TickOutcome::Finished(Terminal {
                outcome: ExecutionOutcome::Aborted,
                pose,
                reason: Some(TrajError::ArmFaultedDuringExecution),
            });
        }

        // The controller reports in its own frame, which `base_frame` names.
        let pose = match self.tf.transform(
            self.base_frame,
            &StampedPose::new(self.base_frame, snapshot.pose),
        ) {
            Ok(pose) => pose,
            Err(e) => {
                error!(tick, error = %e, "cannot express arm pose in base frame");
                return TickOutcome::Finished(Terminal {
                    outcome: ExecutionOutcome::Aborted,
                    pose: self.last_feedback.clone(),
                    reason: Some(e),
                });
            }
        };

        self.handle.publish(Feedback {
            goal_id: self.goal_id,
            tick,
            pose: pose.clone(),
        });
        self.last_feedback = Some(pose.clone());

        if snapshot.queued_count == 0 {
            info!(tick, "trajectory complete");
            return TickOutcome::Finished(Terminal {
                outcome: ExecutionOutcome::Succeeded,
                pose: Some(pose),
                reason: None,
            });
        }

        debug!(tick, remaining = snapshot.queued_count, "trajectory in progress");
        TickOutcome::Continue
    }

    /// Caller cancellation wins over shutdown when both are set.
    fn preemption_reason(&self) -> Option<TrajError> {
        if self.handle.is_cancel_requested() {
            Some(TrajError::UserCancellation)
        } else if self.shutdown.is_cancelled() {
            Some(TrajError::ProcessShutdown)
        } else {
            None
        }
    }

    fn express(&self, pose: CartesianPose) -> Option<StampedPose> {
        express_in_base(self.tf, self.base_frame, pose)
    }
}

/// The controller's pose as a result pose in `base_frame`, or `None` if the
/// transformer cannot produce it.
pub(crate) fn express_in_base(
    tf: &dyn FrameTransformer,
    base_frame: &str,
    pose: CartesianPose,
) -> Option<StampedPose> {
    tf.transform(base_frame, &StampedPose::new(base_frame, pose))
        .map_err(|e| warn!(error = %e, "final pose not expressible in base frame"))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ArmCall, ScriptedArm};
    use trajex_tf::TfBuffer;

    const BASE: &str = "base";

    struct Rig {
        arm: ScriptedArm,
        tf: TfBuffer,
        handle: GoalHandle,
        feedback: tokio::sync::mpsc::UnboundedReceiver<Feedback>,
        shutdown: CancellationToken,
    }

    impl Rig {
        /// An arm with one waypoint already sent so its queue script is live.
        fn new(arm: ScriptedArm) -> Self {
            arm.enqueue(
                &trajex_types::Waypoint::Cartesian(trajex_types::CartesianWaypoint::canonical(
                    CartesianPose::default(),
                )),
                true,
            )
            .unwrap();
            let (handle, feedback) = GoalHandle::new();
            Self {
                arm,
                tf: TfBuffer::new(),
                handle,
                feedback,
                shutdown: CancellationToken::new(),
            }
        }

        fn monitor(&self) -> ExecutionMonitor<'_> {
            ExecutionMonitor::new(
                &self.arm,
                &self.tf,
                BASE,
                Uuid::nil(),
                &self.handle,
                &self.shutdown,
            )
        }

        fn drain_feedback(&mut self) -> Vec<Feedback> {
            let mut out = Vec::new();
            while let Ok(fb) = self.feedback.try_recv() {
                out.push(fb);
            }
            out
        }
    }

    #[test]
    fn succeeds_on_first_tick_that_sees_an_empty_queue() {
        let mut rig = Rig::new(ScriptedArm::new().queue_lengths(&[2, 1, 0]));
        let mut monitor = rig.monitor();

        assert_eq!(monitor.poll(), TickOutcome::Continue);
        assert_eq!(monitor.poll(), TickOutcome::Continue);
        let TickOutcome::Finished(terminal) = monitor.poll() else {
            panic!("expected the third tick to finish");
        };
        assert_eq!(monitor.ticks(), 3);
        drop(monitor);

        assert_eq!(terminal.outcome, ExecutionOutcome::Succeeded);
        let feedback = rig.drain_feedback();
        assert_eq!(feedback.len(), 3);
        assert_eq!(terminal.pose.as_ref(), Some(&feedback[2].pose));
        assert_eq!(feedback.iter().map(|f| f.tick).collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[test]
    fn feedback_matches_the_pose_read_on_each_tick() {
        let mut rig = Rig::new(ScriptedArm::new().queue_lengths(&[3, 2, 0]));
        let mut monitor = rig.monitor();
        while monitor.poll() == TickOutcome::Continue {}
        drop(monitor);

        let feedback = rig.drain_feedback();
        let poses = rig.arm.poses_seen();
        assert_eq!(feedback.len(), poses.len());
        for (fb, pose) in feedback.iter().zip(poses) {
            assert_eq!(fb.pose.frame_id, BASE);
            assert_eq!(fb.pose.pose, pose);
        }
    }

    #[test]
    fn fault_mid_run_aborts_with_last_feedback_and_no_restart() {
        let mut rig = Rig::new(
            ScriptedArm::new()
                .faults(&[false, false, true])
                .queue_lengths(&[5]),
        );
        let mut monitor = rig.monitor();

        assert_eq!(monitor.poll(), TickOutcome::Continue);
        assert_eq!(monitor.poll(), TickOutcome::Continue);
        let TickOutcome::Finished(terminal) = monitor.poll() else {
            panic!("fault should finish the trajectory");
        };
        drop(monitor);

        assert_eq!(terminal.outcome, ExecutionOutcome::Aborted);
        assert_eq!(terminal.reason, Some(TrajError::ArmFaultedDuringExecution));
        // Two feedback messages; none for the faulted tick.
        let feedback = rig.drain_feedback();
        assert_eq!(feedback.len(), 2);
        assert_eq!(terminal.pose.as_ref(), Some(&feedback[1].pose));
        assert_eq!(rig.arm.count(&ArmCall::Stop), 0);
        assert_eq!(rig.arm.count(&ArmCall::Start), 0);
    }

    #[test]
    fn fault_on_first_tick_reports_current_pose() {
        let mut rig = Rig::new(ScriptedArm::new().faults(&[true]).queue_lengths(&[1]));
        let mut monitor = rig.monitor();
        let TickOutcome::Finished(terminal) = monitor.poll() else {
            panic!("fault should finish the trajectory");
        };
        drop(monitor);

        assert!(rig.drain_feedback().is_empty());
        let pose = terminal.pose.expect("current pose is expressible");
        assert_eq!(pose.pose, rig.arm.poses_seen()[0]);
    }

    #[test]
    fn cancellation_stops_then_restarts_exactly_once() {
        let mut rig = Rig::new(ScriptedArm::new().queue_lengths(&[4]));
        let mut monitor = rig.monitor();
        assert_eq!(monitor.poll(), TickOutcome::Continue);

        rig.handle.cancel();
        let TickOutcome::Finished(terminal) = monitor.poll() else {
            panic!("cancellation should finish the trajectory");
        };
        drop(monitor);

        assert_eq!(terminal.outcome, ExecutionOutcome::Preempted);
        assert_eq!(terminal.reason, Some(TrajError::UserCancellation));
        let feedback = rig.drain_feedback();
        assert_eq!(feedback.len(), 1);
        assert_eq!(terminal.pose.as_ref(), Some(&feedback[0].pose));

        let calls = rig.arm.calls();
        let tail = &calls[calls.len() - 2..];
        assert_eq!(tail, &[ArmCall::Stop, ArmCall::Start]);
        assert_eq!(rig.arm.count(&ArmCall::Stop), 1);
        assert_eq!(rig.arm.count(&ArmCall::Start), 1);
    }

    #[test]
    fn shutdown_preempts_like_cancellation() {
        let rig = Rig::new(ScriptedArm::new().queue_lengths(&[4]));
        rig.shutdown.cancel();
        let mut monitor = rig.monitor();
        let TickOutcome::Finished(terminal) = monitor.poll() else {
            panic!("shutdown should finish the trajectory");
        };
        drop(monitor);

        assert_eq!(terminal.outcome, ExecutionOutcome::Preempted);
        assert_eq!(terminal.reason, Some(TrajError::ProcessShutdown));
        assert_eq!(rig.arm.count(&ArmCall::Stop), 1);
        assert_eq!(rig.arm.count(&ArmCall::Start), 1);
    }

    #[test]
    fn failed_stop_and_start_still_preempt() {
        let rig = Rig::new(ScriptedArm::new().queue_lengths(&[4]).fail_stop().fail_start());
        rig.handle.cancel();
        let mut monitor = rig.monitor();
        let TickOutcome::Finished(terminal) = monitor.poll() else {
            panic!("cancellation should finish the trajectory");
        };
        drop(monitor);

        assert_eq!(terminal.outcome, ExecutionOutcome::Preempted);
        assert_eq!(terminal.reason, Some(TrajError::UserCancellation));
        assert!(terminal.pose.is_some());
        assert_eq!(rig.arm.count(&ArmCall::Stop), 1);
        assert_eq!(rig.arm.count(&ArmCall::Start), 1);
    }

    /// Transformer that knows no frames at all, not even the identity.
    struct NoFrames;

    impl FrameTransformer for NoFrames {
        fn can_transform(
            &self,
            _target_frame: &str,
            _source_frame: &str,
            _stamp: Option<chrono::DateTime<chrono::Utc>>,
        ) -> bool {
            false
        }

        fn transform(&self, target_frame: &str, pose: &StampedPose) -> Result<StampedPose, TrajError> {
            Err(TrajError::TransformUnavailable {
                target_frame: target_frame.to_string(),
                source_frame: pose.frame_id.clone(),
                index: None,
            })
        }
    }

    #[test]
    fn unexpressible_pose_aborts_without_feedback() {
        let mut rig = Rig::new(ScriptedArm::new().queue_lengths(&[1]));
        let mut monitor =
            ExecutionMonitor::new(&rig.arm, &NoFrames, BASE, Uuid::nil(), &rig.handle, &rig.shutdown);
        let TickOutcome::Finished(terminal) = monitor.poll() else {
            panic!("transform failure should finish the trajectory");
        };
        drop(monitor);

        assert_eq!(terminal.outcome, ExecutionOutcome::Aborted);
        assert!(matches!(terminal.reason, Some(TrajError::TransformUnavailable { .. })));
        assert!(terminal.pose.is_none());
        assert!(rig.drain_feedback().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn run_ticks_at_the_configured_interval() {
        let rig = Rig::new(ScriptedArm::new().queue_lengths(&[3, 2, 1, 0]));
        let started = tokio::time::Instant::now();

        let (terminal, ticks) = rig.monitor().run(Duration::from_millis(100)).await;

        assert_eq!(terminal.outcome, ExecutionOutcome::Succeeded);
        assert_eq!(ticks, 4);
        // First tick is immediate, then three waits.
        assert_eq!(started.elapsed(), Duration::from_millis(300));
    }

    #[tokio::test(start_paused = true)]
    async fn zero_interval_is_clamped_to_the_minimum() {
        let rig = Rig::new(ScriptedArm::new().queue_lengths(&[2, 1, 0]));
        let started = tokio::time::Instant::now();

        let (terminal, ticks) = rig.monitor().run(Duration::ZERO).await;

        assert_eq!(terminal.outcome, ExecutionOutcome::Succeeded);
        assert_eq!(ticks, 3);
        assert_eq!(started.elapsed(), MIN_POLL_INTERVAL * 2);
    }
}
