//! `trajex-hal` – the arm controller boundary.
//!
//! The execution engine never talks to a driver directly; it talks to the
//! [`ArmController`] trait.
//!
//! # Modules
//!
//! - [`controller`] – [`ArmController`][controller::ArmController], the
//!   driver contract, and [`ArmSnapshot`][controller::ArmSnapshot], a
//!   point-in-time read of it.
//! - [`shared`] – [`SharedArm`][shared::SharedArm]: one controller shared by
//!   several goal endpoints, with a single-writer lease so two goals never
//!   interleave their queue writes.
//! - [`sim`] – [`SimArm`][sim::SimArm]: an in-process simulated arm for tests
//!   and headless runs.

pub mod controller;
pub mod shared;
pub mod sim;

pub use controller::{ArmController, ArmSnapshot};
pub use shared::{ArmLease, SharedArm};
pub use sim::SimArm;
