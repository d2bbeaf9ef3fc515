use serde::{Deserialize, Serialize};

use crate::TransferError;

/// Where a single file's current attempt stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttemptStatus {
    #[serde(rename = "pending")]
    Pending,
    #[serde(rename = "transferring")]
    Transferring,
    #[serde(rename = "succeeded")]
    Succeeded,
    #[serde(rename = "failed")]
    Failed,
}

/// Per-file attempt state, owned by the orchestrator for one batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadAttempt {
    pub file_index: usize,
    /// 1-based.
    pub attempt_number: u32,
    pub status: AttemptStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl UploadAttempt {
    /// Creates the first, pending attempt for a file.
    pub fn new(file_index: usize) -> Self {
        Self {
            file_index,
            attempt_number: 1,
            status: AttemptStatus::Pending,
            last_error: None,
        }
    }

    /// `Pending → Transferring`.
    pub fn start(&mut self) -> Result<(), TransferError> {
        self.transition(AttemptStatus::Pending, AttemptStatus::Transferring)
    }

    /// `Transferring → Succeeded`.
    pub fn succeed(&mut self) -> Result<(), TransferError> {
        self.transition(AttemptStatus::Transferring, AttemptStatus::Succeeded)?;
        self.last_error = None;
        Ok(())
    }

    /// `Pending | Transferring → Failed`, recording the error.
    ///
    /// Failing from `Pending` covers errors raised before the transfer
    /// starts (payload resolution).
    pub fn fail(&mut self, error: impl Into<String>) -> Result<(), TransferError> {
        match self.status {
            AttemptStatus::Pending | AttemptStatus::Transferring => {
                self.status = AttemptStatus::Failed;
                self.last_error = Some(error.into());
                Ok(())
            }
            from => Err(TransferError::InvalidTransition {
                from,
                to: AttemptStatus::Failed,
            }),
        }
    }

    /// `Failed → Pending` with the next attempt number.
    pub fn retry(&mut self) -> Result<(), TransferError> {
        self.transition(AttemptStatus::Failed, AttemptStatus::Pending)?;
        self.attempt_number += 1;
        Ok(())
    }

    /// Returns `true` once the file is uploaded or has failed.
    pub fn is_terminal(&self) -> bool {
        matches!(self.status, AttemptStatus::Succeeded | AttemptStatus::Failed)
    }

    fn transition(&mut self, from: AttemptStatus, to: AttemptStatus) -> Result<(), TransferError> {
        if self.status != from {
            return Err(TransferError::InvalidTransition {
                from: self.status,
                to,
            });
        }
        self.status = to;
        Ok(())
    }
}
