//! Per-scan deadline and cancellation
//!
//! A [`ScanGuard`] travels with one scan request. Chunked loops call
//! [`ScanGuard::check`] between chunks; awaits on the network go through
//! [`ScanGuard::bounded`] so a stalled read cannot outlive the deadline.
//! [`ScanGuard::scoped`] derives a guard that is also cancelled when its
//! [`ScopeCancel`] handle drops, which stops blocking work left behind by an
//! aborted release scan.

use std::future::Future;
use std::time::{Duration, Instant};

use crate::core::shutdown::CancellationFlag;
use crate::scanner::error::{ScanError, ScanResult};

#[derive(Debug, Clone, Default)]
pub struct ScanGuard {
    cancellation: CancellationFlag,
    scopes: Vec<CancellationFlag>,
    deadline: Option<Instant>,
}

/// Cancels the scope of a [`ScanGuard::scoped`] guard when dropped
#[derive(Debug)]
pub struct ScopeCancel(CancellationFlag);

impl Drop for ScopeCancel {
    fn drop(&mut self) {
        self.0.cancel();
    }
}

impl ScanGuard {
    /// No deadline and a private cancellation flag
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Guard tied to `cancellation`, expiring `timeout` from now if given
    pub fn new(cancellation: CancellationFlag, timeout: Option<Duration>) -> Self {
        Self {
            cancellation,
            scopes: Vec::new(),
            deadline: timeout.map(|t| Instant::now() + t),
        }
    }

    /// Child guard with the same flag and deadline, additionally cancelled
    /// once the returned handle is dropped
    pub fn scoped(&self) -> (ScanGuard, ScopeCancel) {
        let scope = CancellationFlag::new();
        let mut child = self.clone();
        child.scopes.push(scope.clone());
        (child, ScopeCancel(scope))
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn cancellation(&self) -> &CancellationFlag {
        &self.cancellation
    }

    /// Time left before the deadline; `None` when there is no deadline
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// Fail if the scan was cancelled or ran past its deadline
    pub fn check(&self, artifact: &str) -> ScanResult<()> {
        if self.cancellation.is_cancelled() || self.scopes.iter().any(|s| s.is_cancelled()) {
            return Err(ScanError::Cancelled {
                artifact: artifact.to_string(),
            });
        }
        if self.remaining() == Some(Duration::ZERO) {
            return Err(ScanError::DeadlineExceeded {
                artifact: artifact.to_string(),
            });
        }
        Ok(())
    }

    /// Await `fut`, giving up when the deadline passes
    pub async fn bounded<F: Future>(&self, artifact: &str, fut: F) -> ScanResult<F::Output> {
        self.check(artifact)?;
        match self.remaining() {
            None => Ok(fut.await),
            Some(left) => tokio::time::timeout(left, fut).await.map_err(|_| {
                ScanError::DeadlineExceeded {
                    artifact: artifact.to_string(),
                }
            }),
        }
    }
}
