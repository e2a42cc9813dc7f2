//! `trajex-types` – shared data model for the trajectory execution engine.
//!
//! Poses, waypoints, goals, feedback, results and the [`TrajError`] taxonomy
//! used by every other crate in the workspace.

pub mod geometry;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub use geometry::{Quaternion, Transform3D, Vec3};

/// The arm's base reference frame.  Every waypoint is converted into it before
/// being queued, and every feedback and result pose is expressed in it.
pub const ARM_BASE_FRAME: &str = "jaco_api_origin";

// ────────────────────────────────────────────────────────────────────────────
// Poses
// ────────────────────────────────────────────────────────────────────────────

/// End-effector position and orientation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CartesianPose {
    pub position: Vec3,
    pub orientation: Quaternion,
}

impl CartesianPose {
    pub fn new(position: Vec3, orientation: Quaternion) -> Self {
        Self {
            position,
            orientation,
        }
    }

    /// Pose at `(x, y, z)` with identity orientation.
    pub fn at(x: f32, y: f32, z: f32) -> Self {
        Self::new(Vec3::new(x, y, z), Quaternion::identity())
    }
}

impl Default for CartesianPose {
    fn default() -> Self {
        Self::new(Vec3::zero(), Quaternion::identity())
    }
}

/// Finger positions of the three-finger hand, in radians.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FingerAngles {
    pub finger1: f32,
    pub finger2: f32,
    pub finger3: f32,
}

impl FingerAngles {
    pub fn new(finger1: f32, finger2: f32, finger3: f32) -> Self {
        Self {
            finger1,
            finger2,
            finger3,
        }
    }
}

/// A pose tagged with the frame it is expressed in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct StampedPose {
    pub frame_id: String,
    /// `None` means "latest available".
    #[serde(default)]
    pub stamp: Option<DateTime<Utc>>,
    pub pose: CartesianPose,
}

impl StampedPose {
    pub fn new(frame_id: impl Into<String>, pose: CartesianPose) -> Self {
        Self {
            frame_id: frame_id.into(),
            stamp: None,
            pose,
        }
    }

    pub fn with_stamp(mut self, stamp: Option<DateTime<Utc>>) -> Self {
        self.stamp = stamp;
        self
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Waypoints
// ────────────────────────────────────────────────────────────────────────────

/// A Cartesian target for the end effector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CartesianWaypoint {
    pub pose: CartesianPose,
    /// Frame `pose` is expressed in.  `None` means it is already in
    /// [`ARM_BASE_FRAME`] and no transform is applied.
    #[serde(default)]
    pub source_frame: Option<String>,
    #[serde(default)]
    pub stamp: Option<DateTime<Utc>>,
}

impl CartesianWaypoint {
    /// A waypoint already expressed in the arm base frame.
    pub fn canonical(pose: CartesianPose) -> Self {
        Self {
            pose,
            source_frame: None,
            stamp: None,
        }
    }

    pub fn in_frame(pose: CartesianPose, frame: impl Into<String>) -> Self {
        Self {
            pose,
            source_frame: Some(frame.into()),
            stamp: None,
        }
    }
}

/// A Cartesian target together with the finger positions to reach with it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct JointTrajectoryPoint {
    pub pose: CartesianPose,
    pub fingers: FingerAngles,
    #[serde(default)]
    pub source_frame: Option<String>,
    #[serde(default)]
    pub stamp: Option<DateTime<Utc>>,
}

impl JointTrajectoryPoint {
    pub fn canonical(pose: CartesianPose, fingers: FingerAngles) -> Self {
        Self {
            pose,
            fingers,
            source_frame: None,
            stamp: None,
        }
    }

    pub fn in_frame(pose: CartesianPose, fingers: FingerAngles, frame: impl Into<String>) -> Self {
        Self {
            pose,
            fingers,
            source_frame: Some(frame.into()),
            stamp: None,
        }
    }
}

/// Either waypoint variant.  This is what the controller receives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Waypoint {
    Cartesian(CartesianWaypoint),
    Joint(JointTrajectoryPoint),
}

impl Waypoint {
    pub fn fingers(&self) -> Option<FingerAngles> {
        match self {
            Waypoint::Cartesian(_) => None,
            Waypoint::Joint(p) => Some(p.fingers),
        }
    }
}

/// Common view over the waypoint variants so a single executor can drive
/// pose-only and pose+finger trajectories.
pub trait TrajectoryPoint: Clone + Send + Sync + 'static {
    fn pose(&self) -> &CartesianPose;

    fn source_frame(&self) -> Option<&str>;

    fn stamp(&self) -> Option<DateTime<Utc>>;

    /// Build the controller command for this point, with `canonical_pose`
    /// already expressed in [`ARM_BASE_FRAME`].
    fn to_command(&self, canonical_pose: CartesianPose) -> Waypoint;
}

impl TrajectoryPoint for CartesianWaypoint {
    fn pose(&self) -> &CartesianPose {
        &self.pose
    }

    fn source_frame(&self) -> Option<&str> {
        self.source_frame.as_deref()
    }

    fn stamp(&self) -> Option<DateTime<Utc>> {
        self.stamp
    }

    fn to_command(&self, canonical_pose: CartesianPose) -> Waypoint {
        Waypoint::Cartesian(CartesianWaypoint {
            pose: canonical_pose,
            source_frame: None,
            stamp: self.stamp,
        })
    }
}

impl TrajectoryPoint for JointTrajectoryPoint {
    fn pose(&self) -> &CartesianPose {
        &self.pose
    }

    fn source_frame(&self) -> Option<&str> {
        self.source_frame.as_deref()
    }

    fn stamp(&self) -> Option<DateTime<Utc>> {
        self.stamp
    }

    fn to_command(&self, canonical_pose: CartesianPose) -> Waypoint {
        Waypoint::Joint(JointTrajectoryPoint {
            pose: canonical_pose,
            fingers: self.fingers,
            source_frame: None,
            stamp: self.stamp,
        })
    }
}

impl TrajectoryPoint for Waypoint {
    fn pose(&self) -> &CartesianPose {
        match self {
            Waypoint::Cartesian(p) => p.pose(),
            Waypoint::Joint(p) => p.pose(),
        }
    }

    fn source_frame(&self) -> Option<&str> {
        match self {
            Waypoint::Cartesian(p) => p.source_frame(),
            Waypoint::Joint(p) => p.source_frame(),
        }
    }

    fn stamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Waypoint::Cartesian(p) => p.stamp(),
            Waypoint::Joint(p) => p.stamp(),
        }
    }

    fn to_command(&self, canonical_pose: CartesianPose) -> Waypoint {
        match self {
            Waypoint::Cartesian(p) => p.to_command(canonical_pose),
            Waypoint::Joint(p) => p.to_command(canonical_pose),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Goals, feedback, results
// ────────────────────────────────────────────────────────────────────────────

/// An ordered trajectory submitted for execution.  Order is preserved
/// verbatim through dispatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Goal<P> {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub waypoints: Vec<P>,
}

impl<P> Goal<P> {
    pub fn new(waypoints: Vec<P>) -> Self {
        Self {
            id: Uuid::new_v4(),
            waypoints,
        }
    }

    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }
}

pub type PoseTrajectoryGoal = Goal<CartesianWaypoint>;
pub type JointTrajectoryGoal = Goal<JointTrajectoryPoint>;

/// Progress report published once per monitoring tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feedback {
    pub goal_id: Uuid,
    /// 1-based monitoring tick that produced this feedback.
    pub tick: u64,
    pub pose: StampedPose,
}

/// Terminal classification of a goal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionOutcome {
    Succeeded,
    Preempted,
    Aborted,
}

impl std::fmt::Display for ExecutionOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecutionOutcome::Succeeded => write!(f, "succeeded"),
            ExecutionOutcome::Preempted => write!(f, "preempted"),
            ExecutionOutcome::Aborted => write!(f, "aborted"),
        }
    }
}

/// Final report for a goal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalResult {
    pub goal_id: Uuid,
    pub outcome: ExecutionOutcome,
    /// Final arm pose in the base frame: the last feedback published, or the
    /// arm's pose when the goal ended before any feedback.  `None` only if
    /// that pose could not be expressed in the base frame.
    pub pose: Option<StampedPose>,
    /// Why the goal did not succeed.  `None` on success.
    pub reason: Option<TrajError>,
    /// Number of waypoints accepted by the controller.
    pub dispatched: usize,
    /// Number of monitoring ticks run.
    pub ticks: u64,
}

// ────────────────────────────────────────────────────────────────────────────
// Errors
// ────────────────────────────────────────────────────────────────────────────

/// Every way a goal can end without succeeding.  None of these are retried.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TrajError {
    #[error("Arm is faulted; goal rejected before dispatch")]
    ArmFaultedBeforeStart,

    #[error("Arm faulted during execution")]
    ArmFaultedDuringExecution,

    #[error("Transform from {source_frame} to {target_frame} unavailable{}", waypoint_suffix(.index))]
    TransformUnavailable {
        target_frame: String,
        source_frame: String,
        /// 0-based waypoint index when raised during dispatch.
        index: Option<usize>,
    },

    #[error("Goal cancelled by caller")]
    UserCancellation,

    #[error("Process shutting down")]
    ProcessShutdown,

    #[error("Hardware Fault on {component}: {details}")]
    HardwareFault { component: String, details: String },

    #[error("Configuration Error: {0}")]
    Config(String),
}

fn waypoint_suffix(index: &Option<usize>) -> String {
    match index {
        Some(i) => format!(" (waypoint {})", i + 1),
        None => String::new(),
    }
}

impl TrajError {
    /// Outcome reported to the goal issuer when a goal ends with this error.
    pub fn outcome(&self) -> ExecutionOutcome {
        match self {
            TrajError::UserCancellation | TrajError::ProcessShutdown => ExecutionOutcome::Preempted,
            _ => ExecutionOutcome::Aborted,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn waypoint_json_is_tagged_by_kind() {
        let wp = Waypoint::Joint(JointTrajectoryPoint::canonical(
            CartesianPose::at(0.1, 0.2, 0.3),
            FingerAngles::new(0.5, 0.5, 0.0),
        ));
        let json = serde_json::to_value(&wp).unwrap();
        assert_eq!(json["kind"], "joint");
        assert!((json["fingers"]["finger1"].as_f64().unwrap() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn goal_file_without_id_or_frames_parses() {
        let raw = r#"{
            "waypoints": [
                { "pose": { "position": { "x": 0.1, "y": 0.0, "z": 0.4 },
                            "orientation": { "w": 1.0, "x": 0.0, "y": 0.0, "z": 0.0 } } },
                { "pose": { "position": { "x": 0.2, "y": 0.0, "z": 0.4 },
                            "orientation": { "w": 1.0, "x": 0.0, "y": 0.0, "z": 0.0 } },
                  "source_frame": "table" }
            ]
        }"#;
        let goal: PoseTrajectoryGoal = serde_json::from_str(raw).unwrap();
        assert_eq!(goal.len(), 2);
        assert!(goal.waypoints[0].source_frame.is_none());
        assert_eq!(goal.waypoints[1].source_frame.as_deref(), Some("table"));
    }

    #[test]
    fn to_command_drops_source_frame_and_keeps_fingers() {
        let point = JointTrajectoryPoint::in_frame(
            CartesianPose::at(1.0, 0.0, 0.0),
            FingerAngles::new(0.1, 0.2, 0.3),
            "camera",
        );
        let cmd = point.to_command(CartesianPose::at(2.0, 0.0, 0.0));
        assert!(cmd.source_frame().is_none());
        assert_eq!(cmd.fingers(), Some(FingerAngles::new(0.1, 0.2, 0.3)));
        assert!((cmd.pose().position.x - 2.0).abs() < f32::EPSILON);
    }

    #[test]
    fn error_outcomes() {
        assert_eq!(TrajError::UserCancellation.outcome(), ExecutionOutcome::Preempted);
        assert_eq!(TrajError::ProcessShutdown.outcome(), ExecutionOutcome::Preempted);
        assert_eq!(TrajError::ArmFaultedBeforeStart.outcome(), ExecutionOutcome::Aborted);
        assert_eq!(
            TrajError::HardwareFault {
                component: "arm".into(),
                details: "stopped".into()
            }
            .outcome(),
            ExecutionOutcome::Aborted
        );
    }

    #[test]
    fn transform_error_display_names_waypoint() {
        let err = TrajError::TransformUnavailable {
            target_frame: ARM_BASE_FRAME.to_string(),
            source_frame: "camera".to_string(),
            index: Some(1),
        };
        let msg = err.to_string();
        assert!(msg.contains("camera"));
        assert!(msg.contains("waypoint 2"));
    }
}
