use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::task::JoinHandle;

use crate::foundation::cancel::CancelToken;
use crate::foundation::error::{LuminaError, LuminaResult};

/// Handle to one background pipeline operation.
///
/// Awaiting the handle yields the operation's outcome. Dropping it detaches: the operation still
/// runs to completion and updates the coordinator.
#[derive(Debug)]
pub struct TaskHandle<T> {
    join: JoinHandle<LuminaResult<T>>,
    cancel: CancelToken,
}

impl<T> TaskHandle<T> {
    pub(crate) fn new(join: JoinHandle<LuminaResult<T>>, cancel: CancelToken) -> Self {
        Self { join, cancel }
    }

    /// Request cooperative cancellation.
    ///
    /// Work that has already passed its point of no return (an artifact commit) completes anyway.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Cancel, then abort the task at its next suspension point.
    ///
    /// A composition reverts to its prior stable state. A save that is already running on the
    /// blocking pool cannot be interrupted: it stops before its commit if it has not reached it
    /// and otherwise completes, and the coordinator stays `Saving` until it settles.
    pub fn abort(&self) {
        self.cancel.cancel();
        self.join.abort();
    }

    /// Token observed by the operation.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Return `true` once the operation has finished.
    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }
}

impl<T> Future for TaskHandle<T> {
    type Output = LuminaResult<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.join).poll(cx).map(|joined| match joined {
            Ok(outcome) => outcome,
            Err(e) if e.is_cancelled() => Err(LuminaError::cancelled("pipeline task aborted")),
            Err(e) => Err(LuminaError::Other(anyhow::anyhow!(
                "pipeline task panicked: {e}"
            ))),
        })
    }
}
