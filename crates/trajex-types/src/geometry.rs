//! Rigid-body geometry primitives shared by every trajex crate.
//!
//! All rotations are unit quaternions in (w, x, y, z) order.  A
//! [`Transform3D`] stored as `parent → child` expresses the pose of the child
//! frame in the parent frame, so applying it to a pose given in the child
//! frame yields the same pose expressed in the parent frame.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

// ────────────────────────────────────────────────────────────────────────────
// Vec3
// ────────────────────────────────────────────────────────────────────────────

/// A 3-D translation vector in metres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    pub fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }

    pub fn neg(self) -> Self {
        Self::new(-self.x, -self.y, -self.z)
    }

    /// Euclidean distance to `other`.
    pub fn distance(self, other: Self) -> f32 {
        let (dx, dy, dz) = (self.x - other.x, self.y - other.y, self.z - other.z);
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Quaternion
// ────────────────────────────────────────────────────────────────────────────

/// A unit quaternion representing a 3-D rotation (w, x, y, z convention).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Quaternion {
    pub w: f32,
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Quaternion {
    /// Create a quaternion.  The caller is responsible for providing a unit
    /// quaternion (|q| = 1).
    pub fn new(w: f32, x: f32, y: f32, z: f32) -> Self {
        Self { w, x, y, z }
    }

    pub fn identity() -> Self {
        Self::new(1.0, 0.0, 0.0, 0.0)
    }

    /// Rotation of `angle_rad` about the Z axis.
    pub fn from_yaw(angle_rad: f32) -> Self {
        let half = angle_rad * 0.5;
        Self::new(half.cos(), 0.0, 0.0, half.sin())
    }

    /// Hamilton product: `self` applied after `rhs`.
    pub fn mul(self, rhs: Self) -> Self {
        Self::new(
            self.w * rhs.w - self.x * rhs.x - self.y * rhs.y - self.z * rhs.z,
            self.w * rhs.x + self.x * rhs.w + self.y * rhs.z - self.z * rhs.y,
            self.w * rhs.y - self.x * rhs.z + self.y * rhs.w + self.z * rhs.x,
            self.w * rhs.z + self.x * rhs.y - self.y * rhs.x + self.z * rhs.w,
        )
    }

    /// Conjugate (== inverse for a unit quaternion).
    pub fn conjugate(self) -> Self {
        Self::new(self.w, -self.x, -self.y, -self.z)
    }

    /// Rotate a vector: p' = q * p * q*.
    pub fn rotate(self, v: Vec3) -> Vec3 {
        let p = Self::new(0.0, v.x, v.y, v.z);
        let rotated = self.mul(p).mul(self.conjugate());
        Vec3::new(rotated.x, rotated.y, rotated.z)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Transform3D
// ────────────────────────────────────────────────────────────────────────────

/// A rigid-body transform: rotate by `rotation`, then add `translation`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Transform3D {
    pub translation: Vec3,
    pub rotation: Quaternion,
}

impl Transform3D {
    pub fn new(translation: Vec3, rotation: Quaternion) -> Self {
        Self {
            translation,
            rotation,
        }
    }

    pub fn identity() -> Self {
        Self::new(Vec3::zero(), Quaternion::identity())
    }

    /// Compose two transforms.  If `self` = T_A_B and `other` = T_B_C, the
    /// result is T_A_C.
    pub fn compose(self, other: Self) -> Self {
        let translated = self.translation.add(self.rotation.rotate(other.translation));
        let rotated = self.rotation.mul(other.rotation);
        Self::new(translated, rotated)
    }

    /// T_B_A from T_A_B.
    pub fn inverse(self) -> Self {
        let rotation = self.rotation.conjugate();
        let translation = rotation.rotate(self.translation).neg();
        Self::new(translation, rotation)
    }

    /// Re-express `pose` (given in the child frame) in the parent frame.
    pub fn apply(self, pose: &crate::CartesianPose) -> crate::CartesianPose {
        crate::CartesianPose {
            position: self.translation.add(self.rotation.rotate(pose.position)),
            orientation: self.rotation.mul(pose.orientation),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CartesianPose;
    use std::f32::consts::{FRAC_1_SQRT_2, FRAC_PI_2};

    fn assert_vec_close(a: Vec3, b: Vec3) {
        assert!(a.distance(b) < 1e-5, "{a:?} != {b:?}");
    }

    #[test]
    fn quaternion_90deg_yaw_rotates_x_to_y() {
        let q = Quaternion::new(FRAC_1_SQRT_2, 0.0, 0.0, FRAC_1_SQRT_2);
        let r = q.rotate(Vec3::new(1.0, 0.0, 0.0));
        assert_vec_close(r, Vec3::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn from_yaw_matches_explicit_quaternion() {
        let q = Quaternion::from_yaw(FRAC_PI_2);
        assert!((q.w - FRAC_1_SQRT_2).abs() < 1e-5);
        assert!((q.z - FRAC_1_SQRT_2).abs() < 1e-5);
    }

    #[test]
    fn compose_with_inverse_is_identity() {
        let t = Transform3D::new(Vec3::new(0.3, -1.0, 2.0), Quaternion::from_yaw(0.7));
        let id = t.compose(t.inverse());
        assert_vec_close(id.translation, Vec3::zero());
        assert!((id.rotation.w.abs() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn apply_rotates_then_translates() {
        let t = Transform3D::new(Vec3::new(1.0, 0.0, 0.0), Quaternion::from_yaw(FRAC_PI_2));
        let pose = CartesianPose::new(Vec3::new(1.0, 0.0, 0.5), Quaternion::identity());
        let out = t.apply(&pose);
        assert_vec_close(out.position, Vec3::new(1.0, 1.0, 0.5));
        assert!((out.orientation.z - FRAC_1_SQRT_2).abs() < 1e-5);
    }

    #[test]
    fn inverse_undoes_apply() {
        let t = Transform3D::new(Vec3::new(0.2, 0.4, -0.1), Quaternion::from_yaw(-1.2));
        let pose = CartesianPose::new(Vec3::new(0.5, 0.5, 0.5), Quaternion::identity());
        let back = t.inverse().apply(&t.apply(&pose));
        assert_vec_close(back.position, pose.position);
    }
}
