//! Transform buffer.
//!
//! Maintains a graph of named reference frames and the rigid-body transforms
//! that relate them.  Edges are stored `parent → child` but can be walked in
//! either direction; walking an edge backwards applies its inverse.  Given two
//! frame names the buffer finds the shortest chain via BFS and composes it.
//!
//! Each edge may carry a `since` time.  A lookup stamped earlier than that
//! time cannot use the edge, the same way a ROS tf buffer refuses to
//! extrapolate into the past.  Edges without a `since` are static.
//!
//! # Example
//!
//! ```rust
//! use trajex_tf::transform::{FrameTransformer, TfBuffer};
//! use trajex_types::{CartesianPose, Quaternion, StampedPose, Transform3D, Vec3};
//!
//! let tf = TfBuffer::new();
//! // The table frame sits 0.5 m along X of the arm base.
//! tf.set_transform("jaco_api_origin", "table",
//!     Transform3D::new(Vec3::new(0.5, 0.0, 0.0), Quaternion::identity()));
//!
//! let on_table = StampedPose::new("table", CartesianPose::at(0.1, 0.0, 0.0));
//! let in_base = tf.transform("jaco_api_origin", &on_table).unwrap();
//! assert!((in_base.pose.position.x - 0.6).abs() < 1e-5);
//! ```

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use tracing::debug;
use trajex_types::{StampedPose, Transform3D, TrajError};

// ────────────────────────────────────────────────────────────────────────────
// FrameTransformer
// ────────────────────────────────────────────────────────────────────────────

/// Re-expresses stamped poses in another frame.
///
/// Implementations may block while waiting for frame data but must not retry
/// indefinitely: an unavailable transform is reported, not hidden.
pub trait FrameTransformer: Send + Sync {
    /// `true` if a pose stamped at `stamp` in `source_frame` can currently be
    /// expressed in `target_frame`.  `None` means "latest available".
    fn can_transform(
        &self,
        target_frame: &str,
        source_frame: &str,
        stamp: Option<DateTime<Utc>>,
    ) -> bool;

    /// Re-express `pose` in `target_frame`.
    ///
    /// # Errors
    ///
    /// Returns [`TrajError::TransformUnavailable`] when no chain of transforms
    /// relates the two frames at the pose's stamp.
    fn transform(&self, target_frame: &str, pose: &StampedPose) -> Result<StampedPose, TrajError>;
}

// ────────────────────────────────────────────────────────────────────────────
// TfBuffer
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
struct Edge {
    transform: Transform3D,
    since: Option<DateTime<Utc>>,
}

impl Edge {
    fn usable_at(&self, stamp: Option<DateTime<Utc>>) -> bool {
        match (self.since, stamp) {
            (Some(since), Some(stamp)) => stamp >= since,
            _ => true,
        }
    }
}

/// Thread-safe directed graph of frames.  Share it as
/// `Arc<dyn FrameTransformer>`; updates go through `&self`.
#[derive(Debug, Default)]
pub struct TfBuffer {
    /// `edges[parent][child]`
    edges: RwLock<HashMap<String, HashMap<String, Edge>>>,
}

impl TfBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace a static transform: the pose of `child_frame` in
    /// `parent_frame`.
    pub fn set_transform(&self, parent_frame: &str, child_frame: &str, transform: Transform3D) {
        self.insert(parent_frame, child_frame, Edge { transform, since: None });
    }

    /// Register or replace a transform that is only known from `since`
    /// onwards.
    pub fn set_transform_at(
        &self,
        parent_frame: &str,
        child_frame: &str,
        transform: Transform3D,
        since: DateTime<Utc>,
    ) {
        self.insert(
            parent_frame,
            child_frame,
            Edge {
                transform,
                since: Some(since),
            },
        );
    }

    fn insert(&self, parent_frame: &str, child_frame: &str, edge: Edge) {
        let mut edges = self.edges.write().unwrap_or_else(|e| e.into_inner());
        edges
            .entry(parent_frame.to_string())
            .or_default()
            .insert(child_frame.to_string(), edge);
    }

    /// Compute T_target_source: the transform that maps poses expressed in
    /// `source_frame` into `target_frame`.
    ///
    /// Returns `None` if no usable chain exists at `stamp`.
    pub fn lookup(
        &self,
        target_frame: &str,
        source_frame: &str,
        stamp: Option<DateTime<Utc>>,
    ) -> Option<Transform3D> {
        if target_frame == source_frame {
            return Some(Transform3D::identity());
        }

        let edges = self.edges.read().unwrap_or_else(|e| e.into_inner());

        // Undirected adjacency view: forward edges as stored, backward edges
        // inverted.
        let neighbours = |frame: &str| -> Vec<(String, Transform3D)> {
            let mut out = Vec::new();
            if let Some(children) = edges.get(frame) {
                for (child, edge) in children {
                    if edge.usable_at(stamp) {
                        out.push((child.clone(), edge.transform));
                    }
                }
            }
            for (parent, children) in edges.iter() {
                if let Some(edge) = children.get(frame)
                    && edge.usable_at(stamp)
                {
                    out.push((parent.clone(), edge.transform.inverse()));
                }
            }
            out
        };

        // BFS outward from the target; each item carries T_target_current.
        let mut queue: VecDeque<(String, Transform3D)> = VecDeque::new();
        let mut visited: HashSet<String> = HashSet::new();
        queue.push_back((target_frame.to_string(), Transform3D::identity()));
        visited.insert(target_frame.to_string());

        while let Some((current, accumulated)) = queue.pop_front() {
            for (next, edge_tf) in neighbours(&current) {
                if visited.contains(&next) {
                    continue;
                }
                let composed = accumulated.compose(edge_tf);
                if next == source_frame {
                    return Some(composed);
                }
                visited.insert(next.clone());
                queue.push_back((next, composed));
            }
        }

        None
    }
}

impl FrameTransformer for TfBuffer {
    fn can_transform(
        &self,
        target_frame: &str,
        source_frame: &str,
        stamp: Option<DateTime<Utc>>,
    ) -> bool {
        self.lookup(target_frame, source_frame, stamp).is_some()
    }

    fn transform(&self, target_frame: &str, pose: &StampedPose) -> Result<StampedPose, TrajError> {
        let tf = self
            .lookup(target_frame, &pose.frame_id, pose.stamp)
            .ok_or_else(|| {
                debug!(target_frame, source_frame = %pose.frame_id, "no transform chain");
                TrajError::TransformUnavailable {
                    target_frame: target_frame.to_string(),
                    source_frame: pose.frame_id.clone(),
                    index: None,
                }
            })?;
        Ok(StampedPose {
            frame_id: target_frame.to_string(),
            stamp: pose.stamp,
            pose: tf.apply(&pose.pose),
        })
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
