//! Closed classification of collaborator failures.
//!
//! Each error type reports its [`ErrorKind`] where it is created. Plugin
//! errors arrive as opaque strings, so [`classify_message`] keeps a
//! best-effort text heuristic for wrapping those.

use serde::{Deserialize, Serialize};

/// What a failure means for the retry decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Network-like failure; worth another attempt.
    Transient,
    /// Capability denied by the user or the OS.
    Permission,
    /// The user backed out of the operation.
    Cancelled,
    /// Input that can never succeed (bad base64, unknown representation).
    Invalid,
    /// Anything else that is not worth retrying.
    Fatal,
}

impl ErrorKind {
    /// Returns `true` for failures the retry policy may retry.
    pub fn is_transient(self) -> bool {
        matches!(self, ErrorKind::Transient)
    }
}

/// Implemented by every error that can reach a retry decision.
pub trait Classify {
    fn kind(&self) -> ErrorKind;
}

impl Classify for ErrorKind {
    fn kind(&self) -> ErrorKind {
        *self
    }
}

const CANCEL_MARKERS: &[&str] = &["cancel", "canceled", "cancelled", "aborted by user"];
const PERMISSION_MARKERS: &[&str] = &[
    "permission",
    "denied",
    "not allowed",
    "not authorized",
    "unauthorized",
];
const TRANSIENT_MARKERS: &[&str] = &[
    "network",
    "timeout",
    "timed out",
    "connection",
    "offline",
    "failed to fetch",
    "temporarily unavailable",
];

/// Classifies an external error description.
///
/// Cancellation wins over permission, which wins over transience: a
/// "permission request cancelled" message is a cancellation, and a
/// "network permission denied" message must never be retried.
pub fn classify_message(message: &str) -> ErrorKind {
    let lower = message.to_ascii_lowercase();
    let has = |markers: &[&str]| markers.iter().any(|m| lower.contains(m));

    if has(CANCEL_MARKERS) {
        ErrorKind::Cancelled
    } else if has(PERMISSION_MARKERS) {
        ErrorKind::Permission
    } else if has(TRANSIENT_MARKERS) {
        ErrorKind::Transient
    } else {
        ErrorKind::Fatal
    }
}
