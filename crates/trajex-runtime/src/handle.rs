//! [`GoalHandle`] – the issuer's side of a running goal.
//!
//! The issuer keeps a clone of the handle to request cancellation and reads
//! feedback from the receiver returned by [`GoalHandle::new`].  Cancellation
//! is cooperative: the executor only looks at the token at tick boundaries.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use trajex_types::Feedback;

#[derive(Debug, Clone)]
pub struct GoalHandle {
    cancel: CancellationToken,
    feedback: mpsc::UnboundedSender<Feedback>,
}

impl GoalHandle {
    /// Create a handle and the receiver its feedback is delivered to.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Feedback>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                cancel: CancellationToken::new(),
                feedback: tx,
            },
            rx,
        )
    }

    /// Ask the executor to preempt this goal at its next tick.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancel_requested(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Publish one feedback message.  A dropped receiver is not an error: the
    /// goal keeps running without an audience.
    pub(crate) fn publish(&self, feedback: Feedback) {
        let _ = self.feedback.send(feedback);
    }
}
