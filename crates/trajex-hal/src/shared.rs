//! [`SharedArm`] – one controller, many goal endpoints, one writer at a time.
//!
//! The pose-trajectory and joint-trajectory endpoints drive the same physical
//! arm.  Each endpoint holds a clone of the same `SharedArm`; before touching
//! the motion queue a goal takes the [`ArmLease`] and keeps it until the goal
//! reaches a terminal state.  Waiting goals queue up in FIFO order on the
//! lease, so their `enqueue` calls can never interleave.

use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

use crate::controller::ArmController;

/// Cloneable handle to a controller plus its single-writer lock.
#[derive(Clone)]
pub struct SharedArm {
    controller: Arc<dyn ArmController>,
    writer: Arc<Mutex<()>>,
}

impl SharedArm {
    pub fn new(controller: Arc<dyn ArmController>) -> Self {
        Self {
            controller,
            writer: Arc::new(Mutex::new(())),
        }
    }

    /// Wait until no other goal holds the arm, then take it.
    pub async fn acquire(&self) -> ArmLease {
        if self.writer.try_lock().is_err() {
            debug!("arm busy; waiting for the active goal to finish");
        }
        let guard = Arc::clone(&self.writer).lock_owned().await;
        ArmLease {
            controller: Arc::clone(&self.controller),
            _guard: guard,
        }
    }

    /// `true` while some goal holds the lease.
    pub fn is_busy(&self) -> bool {
        self.writer.try_lock().is_err()
    }
}

/// Exclusive write access to the arm for the lifetime of one goal.  Dropping
/// it releases the arm to the next waiting goal.
pub struct ArmLease {
    controller: Arc<dyn ArmController>,
    _guard: OwnedMutexGuard<()>,
}

impl ArmLease {
    pub fn controller(&self) -> &dyn ArmController {
        self.controller.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimArm;
    use std::time::Duration;

    #[tokio::test]
    async fn lease_marks_arm_busy_until_dropped() {
        let shared = SharedArm::new(Arc::new(SimArm::new()));
        assert!(!shared.is_busy());

        let lease = shared.acquire().await;
        assert!(shared.is_busy());
        assert!(!lease.controller().is_faulted());

        drop(lease);
        assert!(!shared.is_busy());
    }

    #[tokio::test(start_paused = true)]
    async fn second_goal_waits_for_first_lease() {
        let shared = SharedArm::new(Arc::new(SimArm::new()));
        let first = shared.acquire().await;

        let waiter = {
            let shared = shared.clone();
            tokio::spawn(async move {
                let _lease = shared.acquire().await;
            })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!waiter.is_finished());

        drop(first);
        waiter.await.unwrap();
        assert!(!shared.is_busy());
    }
}
