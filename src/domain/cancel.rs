//! Cancellation tied to a grid instance's lifetime.

use std::future::Future;
use tokio::sync::watch;

use super::error::GridError;

/// Cloneable token; every clone observes the same cancellation.
#[derive(Debug, Clone)]
pub struct CancelToken {
    sender: std::rc::Rc<watch::Sender<bool>>,
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelToken {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(false);
        Self {
            sender: std::rc::Rc::new(sender),
        }
    }

    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.sender.borrow()
    }

    /// Resolves once [`cancel`](Self::cancel) has been called.
    pub async fn cancelled(&self) {
        let mut rx = self.sender.subscribe();
        // The sender lives in `self`, so `wait_for` cannot fail on a closed
        // channel while we hold it.
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }

    /// Run `operation` unless the token fires first.
    pub async fn run<T, F>(&self, operation: F) -> Result<T, GridError>
    where
        F: Future<Output = Result<T, GridError>>,
    {
        if self.is_cancelled() {
            return Err(GridError::Cancelled);
        }
        tokio::select! {
            biased;
            _ = self.cancelled() => Err(GridError::Cancelled),
            result = operation => result,
        }
    }
}
