use std::sync::Arc;

use tokio::sync::watch;

use crate::foundation::error::{LuminaError, LuminaResult};

/// Cooperative cancellation flag shared between a task and its handle.
///
/// Firing is idempotent and sticky: once cancelled, a token never resets.
#[derive(Clone, Debug)]
pub struct CancelToken {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelToken {
    /// Create a token that has not fired.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Fire the token.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    /// Return `true` once the token has fired.
    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolve once the token fires.
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        let _ = rx.wait_for(|fired| *fired).await;
    }

    /// Fail with [`LuminaError::Cancelled`] when the token has fired.
    pub fn check(&self, stage: &str) -> LuminaResult<()> {
        if self.is_cancelled() {
            return Err(LuminaError::cancelled(format!("cancelled during {stage}")));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/cancel.rs"]
mod tests;
