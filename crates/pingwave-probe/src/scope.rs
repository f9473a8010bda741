//! Cancellation scopes.
//!
//! A [`ServiceScope`] lives as long as the probe service and is cancelled
//! exactly once, by [`CancelHandle::cancel`] or by dropping the handle.
//! Every wave derives a [`WaveScope`] from it: the same cancellation plus a
//! deadline one probe interval away.

use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;

use crate::error::ProbeError;

/// Create a linked cancel handle and service scope.
pub fn service_scope() -> (CancelHandle, ServiceScope) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx }, ServiceScope { rx })
}

/// Owner side of a [`ServiceScope`]. Dropping it cancels the scope.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    /// Cancel the scope. Later calls have no further effect.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }
}

/// Observer side: the service's overall cancellation scope.
#[derive(Debug, Clone)]
pub struct ServiceScope {
    rx: watch::Receiver<bool>,
}

impl ServiceScope {
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow() || self.rx.has_changed().is_err()
    }

    /// Resolves once the scope is cancelled or its handle is dropped.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }

    /// Derive a wave scope whose deadline is `timeout` from now.
    pub fn wave(&self, timeout: Duration) -> WaveScope {
        WaveScope {
            service: self.clone(),
            deadline: Instant::now() + timeout,
            timeout,
        }
    }
}

/// A deadline-bound child of the [`ServiceScope`], shared by one wave.
#[derive(Debug, Clone)]
pub struct WaveScope {
    service: ServiceScope,
    deadline: Instant,
    timeout: Duration,
}

impl WaveScope {
    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Drive `fut` until it completes, the wave deadline passes, or the
    /// service scope is cancelled, whichever comes first.
    pub async fn run<F: Future>(&self, fut: F) -> Result<F::Output, ProbeError> {
        if self.service.is_cancelled() {
            return Err(ProbeError::Cancelled);
        }

        tokio::select! {
            biased;
            _ = self.service.cancelled() => Err(ProbeError::Cancelled),
            out = tokio::time::timeout_at(self.deadline, fut) => {
                out.map_err(|_| ProbeError::DeadlineExceeded(self.timeout))
            }
        }
    }
}
