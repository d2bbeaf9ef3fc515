//! Batch upload orchestrator.
//!
//! Uploads the selected files one at a time, retries transient failures
//! per file, resumes the whole batch from the failing file once a file runs
//! out of retries, and reports progress and outcome through an event
//! channel. Supports cancellation.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use reqwest::Url;
use snapdrop_protocol::{Classify, ErrorKind, PickedFile};
use snapdrop_transfer::{ProgressAggregator, TransferError, UploadAttempt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::error::UploadError;
use crate::resolver::FileBlobResolver;
use crate::transport::{TransportResponse, UploadTransport};
use crate::types::{BatchConfig, BatchFailure, BatchResult, UploadEvent};

const EVENT_CAPACITY: usize = 256;

/// Orchestrates sequential upload of a batch of picked files.
pub struct BatchUploadOrchestrator {
    resolver: FileBlobResolver,
    transport: Arc<dyn UploadTransport>,
    config: BatchConfig,
    events_tx: mpsc::Sender<UploadEvent>,
    events_rx: Option<mpsc::Receiver<UploadEvent>>,
    cancel: CancellationToken,
}

/// Bookkeeping for one `upload_batch` call.
struct BatchState<'f> {
    files: &'f [PickedFile],
    attempts: Vec<UploadAttempt>,
    /// First file not yet uploaded; a resumed batch starts here.
    next_index: usize,
    overall_retry_count: u32,
    // Updated from the transport's progress callback, which only gets `&`.
    progress: Mutex<ProgressBook>,
}

struct ProgressBook {
    /// Fraction in `[0, 1]` of each file touched so far.
    per_file_progress: HashMap<usize, f64>,
    aggregate: ProgressAggregator,
}

impl<'f> BatchState<'f> {
    fn new(files: &'f [PickedFile]) -> Self {
        Self {
            files,
            attempts: (0..files.len()).map(UploadAttempt::new).collect(),
            next_index: 0,
            overall_retry_count: 0,
            progress: Mutex::new(ProgressBook {
                per_file_progress: HashMap::new(),
                aggregate: ProgressAggregator::new(files.len()),
            }),
        }
    }

    /// Records one file's progress and returns the overall percentage.
    fn record_progress(&self, file_index: usize, file_percent: f64) -> f64 {
        let mut book = self.progress.lock().unwrap_or_else(PoisonError::into_inner);
        book.per_file_progress
            .insert(file_index, (file_percent / 100.0).clamp(0.0, 1.0));
        book.aggregate.update(file_index, file_percent)
    }

    /// Marks one file as fully sent and returns the overall percentage.
    fn record_completion(&self, file_index: usize) -> f64 {
        let mut book = self.progress.lock().unwrap_or_else(PoisonError::into_inner);
        book.per_file_progress.insert(file_index, 1.0);
        book.aggregate.file_completed(file_index)
    }

    fn file_fraction(&self, file_index: usize) -> f64 {
        self.progress
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .per_file_progress
            .get(&file_index)
            .copied()
            .unwrap_or(0.0)
    }
}

struct FileFailure {
    file_index: usize,
    error: UploadError,
}

impl BatchUploadOrchestrator {
    pub fn new(
        resolver: FileBlobResolver,
        transport: Arc<dyn UploadTransport>,
        config: BatchConfig,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::channel(EVENT_CAPACITY);
        Self {
            resolver,
            transport,
            config,
            events_tx,
            events_rx: Some(events_rx),
            cancel: CancellationToken::new(),
        }
    }

    /// Takes the event receiver. Can only be called once.
    ///
    /// Events are sent without waiting; a receiver that falls more than
    /// the channel capacity behind misses updates.
    pub fn take_events(&mut self) -> Option<mpsc::Receiver<UploadEvent>> {
        self.events_rx.take()
    }

    /// Returns a cancellation token for this orchestrator.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Uploads `files` in order to `endpoint`.
    ///
    /// Files are never uploaded concurrently. A file that succeeded is
    /// never sent again, even when the batch is resumed.
    pub async fn upload_batch(&self, files: &[PickedFile], endpoint: &Url) -> BatchResult {
        info!(files = files.len(), url = %endpoint, "batch upload starting");
        let mut state = BatchState::new(files);

        loop {
            let failure = match self.run_pass(&mut state, endpoint).await {
                Ok(()) => {
                    info!(count = files.len(), "batch upload completed");
                    self.emit(UploadEvent::Completed { count: files.len() });
                    return BatchResult::Succeeded { count: files.len() };
                }
                Err(failure) => failure,
            };

            if failure.error.kind() == ErrorKind::Cancelled {
                info!(file_index = failure.file_index, "batch upload cancelled");
                return BatchResult::Cancelled;
            }

            state.overall_retry_count += 1;
            let retry = state.overall_retry_count;
            if self.config.batch_retry.should_retry(&failure.error, retry) {
                let delay = self.config.batch_retry.delay_for(retry);
                warn!(
                    file_index = failure.file_index,
                    retry,
                    delay_ms = delay.as_millis() as u64,
                    error = %failure.error,
                    "resuming batch after failure"
                );
                self.emit(UploadEvent::Retrying {
                    file_index: failure.file_index,
                    attempt: retry,
                    delay,
                    batch_level: true,
                    error: failure.error.to_string(),
                });
                if self.backoff(delay).await.is_err() {
                    info!("batch upload cancelled during backoff");
                    return BatchResult::Cancelled;
                }
                note_transition(state.attempts[failure.file_index].retry());
                continue;
            }

            let file_name = files[failure.file_index].name.clone();
            let attempts = state.attempts[failure.file_index].attempt_number;
            error!(
                file = %file_name,
                file_index = failure.file_index,
                attempts,
                error = %failure.error,
                "batch upload failed"
            );
            self.emit(UploadEvent::Failed {
                file_index: failure.file_index,
                file_name: file_name.clone(),
                error: failure.error.to_string(),
            });
            return BatchResult::Aborted(BatchFailure {
                file_index: failure.file_index,
                file_name,
                attempts,
                error: failure.error,
            });
        }
    }

    /// Uploads every file from `state.next_index` on.
    async fn run_pass(&self, state: &mut BatchState<'_>, endpoint: &Url) -> Result<(), FileFailure> {
        while state.next_index < state.files.len() {
            let file_index = state.next_index;
            self.upload_file(state, file_index, endpoint)
                .await
                .map_err(|error| FileFailure { file_index, error })?;
            state.next_index += 1;
        }
        Ok(())
    }

    /// Uploads one file, retrying transient failures per the file policy.
    /// The retry budget starts over on every batch pass.
    async fn upload_file(
        &self,
        state: &mut BatchState<'_>,
        file_index: usize,
        endpoint: &Url,
    ) -> Result<(), UploadError> {
        let file_name = state.files[file_index].name.clone();
        let mut pass_attempt = 0u32;

        loop {
            if self.cancel.is_cancelled() {
                return Err(UploadError::Cancelled);
            }
            pass_attempt += 1;
            let attempt = state.attempts[file_index].attempt_number;

            debug!(file = %file_name, file_index, attempt, "file upload starting");
            self.emit(UploadEvent::FileStarted {
                file_index,
                file_name: file_name.clone(),
                attempt,
            });
            let overall = state.record_progress(file_index, 0.0);
            self.emit(UploadEvent::Progress {
                overall,
                file_index,
                file_percent: 0.0,
            });

            let error = match self.attempt_file(state, file_index, endpoint).await {
                Ok(response) => {
                    note_transition(state.attempts[file_index].succeed());
                    let overall = state.record_completion(file_index);
                    self.emit(UploadEvent::Progress {
                        overall,
                        file_index,
                        file_percent: 100.0,
                    });
                    self.emit(UploadEvent::FileCompleted {
                        file_index,
                        attempts: attempt,
                    });
                    info!(file = %file_name, status = response.status, attempt, "file uploaded");
                    return Ok(());
                }
                Err(error) => error,
            };

            note_transition(state.attempts[file_index].fail(error.to_string()));
            if error.kind() == ErrorKind::Cancelled {
                return Err(error);
            }

            if self.config.file_retry.should_retry(&error, pass_attempt) {
                let delay = self.config.file_retry.delay_for(pass_attempt);
                warn!(
                    file = %file_name,
                    attempt,
                    reached = state.file_fraction(file_index),
                    delay_ms = delay.as_millis() as u64,
                    error = %error,
                    "file upload failed, retrying"
                );
                self.emit(UploadEvent::Retrying {
                    file_index,
                    attempt: pass_attempt,
                    delay,
                    batch_level: false,
                    error: error.to_string(),
                });
                self.backoff(delay).await?;
                note_transition(state.attempts[file_index].retry());
                continue;
            }

            warn!(file = %file_name, attempt, kind = ?error.kind(), error = %error, "file upload failed");
            return Err(error);
        }
    }

    /// Resolves and sends one file. Resolution happens while the attempt is
    /// still pending.
    async fn attempt_file(
        &self,
        state: &mut BatchState<'_>,
        file_index: usize,
        endpoint: &Url,
    ) -> Result<TransportResponse, UploadError> {
        let payload = self.resolver.resolve(&state.files[file_index]).await?;
        note_transition(state.attempts[file_index].start());

        let state = &*state;
        let on_progress = |file_percent: f64| {
            let overall = state.record_progress(file_index, file_percent);
            self.emit(UploadEvent::Progress {
                overall,
                file_index,
                file_percent,
            });
        };

        tokio::select! {
            _ = self.cancel.cancelled() => Err(UploadError::Cancelled),
            result = self.transport.send(&payload, endpoint, &on_progress) => Ok(result?),
        }
    }

    async fn backoff(&self, delay: Duration) -> Result<(), UploadError> {
        tokio::select! {
            _ = self.cancel.cancelled() => Err(UploadError::Cancelled),
            _ = tokio::time::sleep(delay) => Ok(()),
        }
    }

    fn emit(&self, event: UploadEvent) {
        if let Err(e) = self.events_tx.try_send(event) {
            trace!(error = %e, "upload event dropped");
        }
    }
}

fn note_transition(result: Result<(), TransferError>) {
    if let Err(e) = result {
        warn!(error = %e, "unexpected upload attempt transition");
    }
}
