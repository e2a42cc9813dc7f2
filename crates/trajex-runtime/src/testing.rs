//! Test doubles shared by the runtime test modules.

use std::collections::VecDeque;
use std::sync::Mutex;

use trajex_hal::ArmController;
use trajex_types::{CartesianPose, FingerAngles, TrajError, Waypoint};

/// Every call the engine made against a [`ScriptedArm`], in order.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ArmCall {
    Enqueue(Waypoint, bool),
    Stop,
    Start,
}

#[derive(Default)]
struct Script {
    faulted: VecDeque<bool>,
    queued: VecDeque<usize>,
    pose_reads: usize,
    poses_seen: Vec<CartesianPose>,
    calls: Vec<ArmCall>,
    fail_enqueue_at: Option<usize>,
    fail_stop: bool,
    fail_start: bool,
}

/// Controller whose fault flag and queue length follow a script.
///
/// Each scripted value is consumed by one read; the last value repeats once
/// the script runs out.  Before anything has been enqueued the queue reads as
/// empty without consuming the script.  Every `current_pose` read returns a
/// fresh pose (x = 0.1 · read number) so feedback can be matched to the read
/// that produced it.
#[derive(Default)]
pub(crate) struct ScriptedArm {
    script: Mutex<Script>,
}

fn next_or_last<T: Copy>(values: &mut VecDeque<T>, fallback: T) -> T {
    if values.len() > 1 {
        values.pop_front().unwrap_or(fallback)
    } else {
        values.front().copied().unwrap_or(fallback)
    }
}

fn scripted_fault(details: &str) -> TrajError {
    TrajError::HardwareFault {
        component: "scripted_arm".to_string(),
        details: details.to_string(),
    }
}

impl ScriptedArm {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn faults(self, values: &[bool]) -> Self {
        self.script.lock().unwrap().faulted = values.iter().copied().collect();
        self
    }

    pub(crate) fn queue_lengths(self, values: &[usize]) -> Self {
        self.script.lock().unwrap().queued = values.iter().copied().collect();
        self
    }

    /// Reject the `n`-th enqueue (0-based).
    pub(crate) fn fail_enqueue_at(self, n: usize) -> Self {
        self.script.lock().unwrap().fail_enqueue_at = Some(n);
        self
    }

    /// Record `stop` calls but report them as failed.
    pub(crate) fn fail_stop(self) -> Self {
        self.script.lock().unwrap().fail_stop = true;
        self
    }

    /// Record `start` calls but report them as failed.
    pub(crate) fn fail_start(self) -> Self {
        self.script.lock().unwrap().fail_start = true;
        self
    }

    pub(crate) fn calls(&self) -> Vec<ArmCall> {
        self.script.lock().unwrap().calls.clone()
    }

    pub(crate) fn enqueues(&self) -> Vec<(Waypoint, bool)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                ArmCall::Enqueue(wp, reset) => Some((wp, reset)),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn count(&self, call: &ArmCall) -> usize {
        self.calls().iter().filter(|c| *c == call).count()
    }

    /// Poses handed out by `current_pose`, in order.
    pub(crate) fn poses_seen(&self) -> Vec<CartesianPose> {
        self.script.lock().unwrap().poses_seen.clone()
    }
}

impl ArmController for ScriptedArm {
    fn is_faulted(&self) -> bool {
        next_or_last(&mut self.script.lock().unwrap().faulted, false)
    }

    fn current_pose(&self) -> CartesianPose {
        let mut script = self.script.lock().unwrap();
        script.pose_reads += 1;
        let pose = CartesianPose::at(0.1 * script.pose_reads as f32, 0.0, 0.5);
        script.poses_seen.push(pose);
        pose
    }

    fn current_fingers(&self) -> Option<FingerAngles> {
        None
    }

    fn queued_count(&self) -> usize {
        let mut script = self.script.lock().unwrap();
        let anything_sent = script
            .calls
            .iter()
            .any(|c| matches!(c, ArmCall::Enqueue(..)));
        if !anything_sent {
            return 0;
        }
        next_or_last(&mut script.queued, 0)
    }

    fn enqueue(&self, waypoint: &Waypoint, reset_queue: bool) -> Result<(), TrajError> {
        let mut script = self.script.lock().unwrap();
        let sent = script
            .calls
            .iter()
            .filter(|c| matches!(c, ArmCall::Enqueue(..)))
            .count();
        if script.fail_enqueue_at == Some(sent) {
            return Err(scripted_fault("enqueue rejected"));
        }
        script.calls.push(ArmCall::Enqueue(waypoint.clone(), reset_queue));
        Ok(())
    }

    fn stop(&self) -> Result<(), TrajError> {
        let mut script = self.script.lock().unwrap();
        script.calls.push(ArmCall::Stop);
        if script.fail_stop {
            return Err(scripted_fault("stop rejected"));
        }
        Ok(())
    }

    fn start(&self) -> Result<(), TrajError> {
        let mut script = self.script.lock().unwrap();
        script.calls.push(ArmCall::Start);
        if script.fail_start {
            return Err(scripted_fault("start rejected"));
        }
        Ok(())
    }
}
