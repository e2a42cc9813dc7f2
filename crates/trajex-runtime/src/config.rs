//! [`ExecutorConfig`] – tunables for the trajectory executor.

use std::time::Duration;

use trajex_types::{ARM_BASE_FRAME, TrajError};

/// Default monitoring rate (10 Hz).
pub const DEFAULT_POLL_RATE_HZ: f64 = 10.0;

/// Shortest accepted tick interval (1 kHz).
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Configuration bundle for [`TrajectoryExecutor`][crate::TrajectoryExecutor].
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutorConfig {
    /// Time between monitoring ticks.  Also the lower bound on cancellation
    /// latency.
    pub poll_interval: Duration,
    /// Frame every waypoint is converted into and every feedback/result pose
    /// is expressed in.  It must name the frame the controller itself reports
    /// and accepts poses in: controller poses are labelled with it as read.
    pub base_frame: String,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs_f64(1.0 / DEFAULT_POLL_RATE_HZ),
            base_frame: ARM_BASE_FRAME.to_string(),
        }
    }
}

impl ExecutorConfig {
    /// Build a config polling at `rate_hz`.
    ///
    /// # Errors
    ///
    /// Returns [`TrajError::Config`] if `rate_hz` is not a positive finite
    /// number, its interval is shorter than [`MIN_POLL_INTERVAL`] or does not
    /// fit a [`Duration`], or `base_frame` is empty.
    pub fn from_rate(rate_hz: f64, base_frame: impl Into<String>) -> Result<Self, TrajError> {
        if !rate_hz.is_finite() || rate_hz <= 0.0 {
            return Err(TrajError::Config(format!(
                "poll rate must be a positive number of Hz, got {rate_hz}"
            )));
        }
        let poll_interval = Duration::try_from_secs_f64(1.0 / rate_hz).map_err(|_| {
            TrajError::Config(format!("poll rate {rate_hz} Hz is too low to schedule"))
        })?;
        if poll_interval < MIN_POLL_INTERVAL {
            return Err(TrajError::Config(format!(
                "poll rate {rate_hz} Hz exceeds the {} Hz maximum",
                1.0 / MIN_POLL_INTERVAL.as_secs_f64()
            )));
        }
        let base_frame = base_frame.into();
        if base_frame.trim().is_empty() {
            return Err(TrajError::Config("base frame must not be empty".to_string()));
        }
        Ok(Self {
            poll_interval,
            base_frame,
        })
    }
}
