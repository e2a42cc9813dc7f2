//! `trajex-tf` – coordinate frame transforms.
//!
//! Every waypoint that names a foreign frame passes through a
//! [`FrameTransformer`] before it reaches the arm controller, and every
//! feedback pose passes through it on the way out.
//!
//! # Modules
//!
//! - [`transform`] – the [`FrameTransformer`][transform::FrameTransformer]
//!   contract and [`TfBuffer`][transform::TfBuffer], a thread-safe graph of
//!   named frames that composes chains of rigid transforms in either
//!   direction.

pub mod transform;

pub use transform::{FrameTransformer, TfBuffer};
