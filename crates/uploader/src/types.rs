//! Data types for the batch upload flow.

use std::time::Duration;

use snapdrop_transfer::RetryPolicy;

use crate::error::UploadError;

/// Event emitted while a batch is uploading.
#[derive(Debug, Clone, PartialEq)]
pub enum UploadEvent {
    /// An attempt for a file began.
    FileStarted {
        file_index: usize,
        file_name: String,
        attempt: u32,
    },
    /// Overall progress changed.
    Progress {
        overall: f64,
        file_index: usize,
        file_percent: f64,
    },
    /// A retry was scheduled after a transient failure.
    Retrying {
        file_index: usize,
        attempt: u32,
        delay: Duration,
        /// `true` when the whole batch is being resumed rather than a
        /// single attempt repeated.
        batch_level: bool,
        error: String,
    },
    /// A file was accepted by the server.
    FileCompleted { file_index: usize, attempts: u32 },
    /// Every file was uploaded.
    Completed { count: usize },
    /// The batch stopped on a failure.
    Failed {
        file_index: usize,
        file_name: String,
        error: String,
    },
}

/// The failure that ended a batch.
#[derive(Debug)]
pub struct BatchFailure {
    pub file_index: usize,
    pub file_name: String,
    /// Attempts spent on the failing file, counting every batch pass.
    pub attempts: u32,
    pub error: UploadError,
}

impl BatchFailure {
    /// Message naming the file, suitable for showing to the user.
    pub fn user_message(&self) -> String {
        format!(
            "Uploading \"{}\" failed. {}",
            self.file_name,
            self.error.user_message()
        )
    }
}

/// Outcome of [`BatchUploadOrchestrator::upload_batch`](crate::BatchUploadOrchestrator::upload_batch).
#[derive(Debug)]
pub enum BatchResult {
    Succeeded { count: usize },
    Aborted(BatchFailure),
    Cancelled,
}

impl BatchResult {
    pub fn is_success(&self) -> bool {
        matches!(self, BatchResult::Succeeded { .. })
    }
}

/// Retry policies used by the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchConfig {
    /// Retries of a single file.
    pub file_retry: RetryPolicy,
    /// Resumptions of the whole batch once a file exhausted its retries.
    pub batch_retry: RetryPolicy,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            file_retry: RetryPolicy::per_file(),
            batch_retry: RetryPolicy::whole_batch(),
        }
    }
}
