//! Deadline enforcement for upstream work.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;

/// The deadline passed before the operation finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("deadline exceeded")]
pub struct DeadlineExceeded;

/// Deadline for a request starting now.
pub fn deadline_after(timeout: Duration) -> Instant {
    Instant::now() + timeout
}

/// Run `fut` until `deadline`. The future is dropped (and thereby cancelled)
/// if it has not completed in time.
pub async fn within<F: Future>(deadline: Instant, fut: F) -> Result<F::Output, DeadlineExceeded> {
    tokio::time::timeout_at(deadline, fut)
        .await
        .map_err(|_| DeadlineExceeded)
}
