//! `trajex-runtime` – The Trajectory Execution Engine
//!
//! Takes a goal (an ordered list of waypoints), pushes it into the arm
//! controller's motion queue and watches the arm until the queue drains, the
//! arm faults, or the caller gives up.
//!
//! # Modules
//!
//! - [`executor`] – [`TrajectoryExecutor`][executor::TrajectoryExecutor]:
//!   the goal state machine, generic over the waypoint variant, with the
//!   [`PoseTrajectoryExecutor`] and [`JointTrajectoryExecutor`] aliases for
//!   the two endpoints.
//! - [`validator`] – [`GoalValidator`][validator::GoalValidator]: refuses a
//!   goal up front when the arm is already faulted.
//! - [`dispatcher`] – [`WaypointDispatcher`][dispatcher::WaypointDispatcher]:
//!   converts each waypoint into the base frame and enqueues it, in order.
//! - [`monitor`] – [`ExecutionMonitor`][monitor::ExecutionMonitor]: the
//!   fixed-rate polling loop that publishes feedback and decides the outcome.
//! - [`handle`] – [`GoalHandle`][handle::GoalHandle]: the caller's side of a
//!   running goal (cancel requests in, feedback out).
//! - [`config`] – [`ExecutorConfig`][config::ExecutorConfig]: poll rate and
//!   base frame.
//! - [`telemetry`] – [`init_tracing`][telemetry::init_tracing]: initialises
//!   the global `tracing` subscriber with an optional OTLP span exporter.
//!   Set `OTEL_EXPORTER_OTLP_ENDPOINT` to enable live trace export.
//!
//! # Preemption
//!
//! A running goal ends early when its [`GoalHandle`] is cancelled or when the
//! process-wide shutdown [`CancellationToken`][tokio_util::sync::CancellationToken]
//! handed to the executor fires.  Both are checked once per tick; either way
//! the controller is stopped and restarted before the goal reports
//! `Preempted`.

pub mod config;
pub mod dispatcher;
pub mod executor;
pub mod handle;
pub mod monitor;
pub mod telemetry;
pub mod validator;

#[cfg(test)]
mod testing;

pub use config::{DEFAULT_POLL_RATE_HZ, ExecutorConfig, MIN_POLL_INTERVAL};
pub use dispatcher::{DispatchFailure, WaypointDispatcher};
pub use executor::{JointTrajectoryExecutor, PoseTrajectoryExecutor, TrajectoryExecutor};
pub use handle::GoalHandle;
pub use monitor::{ExecutionMonitor, Terminal, TickOutcome};
pub use telemetry::{TracerProviderGuard, init_tracing};
pub use validator::{GoalValidator, Validation};
