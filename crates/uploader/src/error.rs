//! Upload error types.

use snapdrop_device::DeviceError;
use snapdrop_protocol::{Classify, ErrorKind, UnrecognizedRepresentation, classify_message};

/// A picked file could not be turned into bytes.
///
/// Never transient: resolution failures end the batch.
#[derive(Debug, thiserror::Error)]
pub enum ResolutionError {
    #[error("unrecognized file representation")]
    UnrecognizedRepresentation,

    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: DeviceError,
    },

    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("malformed data URL: {0}")]
    DataUrl(String),

    #[error("declared size of {declared} bytes but the payload is empty")]
    SizeMismatch { declared: u64 },
}

impl From<UnrecognizedRepresentation> for ResolutionError {
    fn from(_: UnrecognizedRepresentation) -> Self {
        ResolutionError::UnrecognizedRepresentation
    }
}

impl Classify for ResolutionError {
    fn kind(&self) -> ErrorKind {
        match self {
            ResolutionError::Read { source, .. } => match source.kind() {
                ErrorKind::Permission => ErrorKind::Permission,
                ErrorKind::Cancelled => ErrorKind::Cancelled,
                _ => ErrorKind::Fatal,
            },
            _ => ErrorKind::Invalid,
        }
    }
}

/// A single HTTP transfer failed.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out")]
    Timeout,

    #[error("no response from server (network or CORS failure)")]
    NoResponse,

    #[error("405 Method Not Allowed: the endpoint rejected POST, likely a CORS or method mismatch")]
    MethodNotAllowed,

    #[error("server returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("{0}")]
    Other(String),
}

impl TransportError {
    /// Maps a non-2xx status to the matching error. A zero status means
    /// the request never produced a readable response.
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            0 => TransportError::NoResponse,
            405 => TransportError::MethodNotAllowed,
            _ => TransportError::Status { status, body },
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TransportError::Timeout
        } else if e.is_connect() || e.is_request() || e.is_body() {
            TransportError::Network(e.to_string())
        } else if e.is_builder() {
            TransportError::InvalidRequest(e.to_string())
        } else {
            TransportError::Other(e.to_string())
        }
    }
}

impl Classify for TransportError {
    fn kind(&self) -> ErrorKind {
        match self {
            TransportError::Network(_) | TransportError::Timeout | TransportError::NoResponse => {
                ErrorKind::Transient
            }
            TransportError::MethodNotAllowed => ErrorKind::Fatal,
            TransportError::Status { status, .. } => match status {
                408 | 429 | 500..=599 => ErrorKind::Transient,
                401 | 403 => ErrorKind::Permission,
                _ => ErrorKind::Fatal,
            },
            TransportError::InvalidRequest(_) => ErrorKind::Invalid,
            TransportError::Other(message) => classify_message(message),
        }
    }
}

/// Why one file of a batch could not be uploaded.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("cancelled")]
    Cancelled,

    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl Classify for UploadError {
    fn kind(&self) -> ErrorKind {
        match self {
            UploadError::Cancelled => ErrorKind::Cancelled,
            UploadError::Resolution(e) => e.kind(),
            UploadError::Transport(e) => e.kind(),
        }
    }
}

impl UploadError {
    /// Message suitable for showing to the user. Empty for cancellation.
    pub fn user_message(&self) -> String {
        match self {
            UploadError::Cancelled => String::new(),
            UploadError::Resolution(ResolutionError::Read { source, .. })
                if source.kind() == ErrorKind::Permission =>
            {
                "Access to the file was denied. Check the app's storage permission in your device settings."
                    .into()
            }
            UploadError::Resolution(e) => format!("The file could not be prepared ({e})."),
            UploadError::Transport(TransportError::MethodNotAllowed) => {
                "The upload server rejected the request (405 Method Not Allowed). Check the endpoint URL and its CORS settings."
                    .into()
            }
            UploadError::Transport(
                TransportError::Network(_) | TransportError::NoResponse,
            ) => "Could not reach the upload server. Check your connection and try again.".into(),
            UploadError::Transport(TransportError::Timeout) => {
                "The upload timed out. Try again on a faster connection.".into()
            }
            UploadError::Transport(TransportError::Status { status, .. }) => {
                format!("The upload server answered with status {status}.")
            }
            UploadError::Transport(e) => format!("Upload failed: {e}"),
        }
    }
}
