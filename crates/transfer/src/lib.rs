//! Upload bookkeeping shared by the batch orchestrator and the screen.
//!
//! - [`ProgressAggregator`] folds one file's progress into a batch percentage.
//! - [`ProgressThrottle`] limits how often the screen redraws it.
//! - [`RetryPolicy`] decides whether and when a failed attempt is retried.
//! - [`UploadAttempt`] is the per-file `pending → transferring → done` state.

mod progress;
mod retry;
mod types;

pub use progress::{ProgressAggregator, ProgressThrottle, combine};
pub use retry::RetryPolicy;
pub use types::{AttemptStatus, UploadAttempt};

/// Errors produced by the transfer crate.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("invalid attempt transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: AttemptStatus,
        to: AttemptStatus,
    },
}
