//! Device capability errors.

use snapdrop_protocol::{Classify, ErrorKind, classify_message};

/// Errors produced by camera, picker and filesystem capabilities.
#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("cancelled")]
    Cancelled,

    #[error("capability unavailable: {0}")]
    Unavailable(String),

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("plugin error: {0}")]
    Plugin(String),
}

impl DeviceError {
    /// Wraps an opaque plugin error message.
    ///
    /// Plugins only report strings, so cancellation and permission denial
    /// are recovered from the text.
    pub fn from_plugin(message: impl Into<String>) -> Self {
        let message = message.into();
        match classify_message(&message) {
            ErrorKind::Cancelled => DeviceError::Cancelled,
            ErrorKind::Permission => DeviceError::PermissionDenied(message),
            _ => DeviceError::Plugin(message),
        }
    }

    /// Returns `true` for user-initiated cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self.kind(), ErrorKind::Cancelled)
    }

    /// Message suitable for showing to the user.
    pub fn user_message(&self) -> String {
        match self {
            DeviceError::PermissionDenied(_) => {
                "Access was denied. Enable camera and photo permissions in your device settings."
                    .into()
            }
            DeviceError::Cancelled => String::new(),
            DeviceError::Unavailable(what) => format!("This device does not support {what}."),
            other => format!("Something went wrong: {other}"),
        }
    }
}

impl Classify for DeviceError {
    fn kind(&self) -> ErrorKind {
        match self {
            DeviceError::PermissionDenied(_) => ErrorKind::Permission,
            DeviceError::Cancelled => ErrorKind::Cancelled,
            DeviceError::Unavailable(_) => ErrorKind::Fatal,
            DeviceError::InvalidPath(_) => ErrorKind::Invalid,
            DeviceError::Io(e) => match e.kind() {
                std::io::ErrorKind::PermissionDenied => ErrorKind::Permission,
                std::io::ErrorKind::NotFound => ErrorKind::Invalid,
                std::io::ErrorKind::TimedOut
                | std::io::ErrorKind::Interrupted
                | std::io::ErrorKind::WouldBlock => ErrorKind::Transient,
                _ => ErrorKind::Fatal,
            },
            DeviceError::Plugin(message) => classify_message(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plugin_cancellation_is_recognised() {
        let err = DeviceError::from_plugin("User cancelled photos app");
        assert!(matches!(err, DeviceError::Cancelled));
        assert!(err.is_cancelled());
        assert!(err.user_message().is_empty());
    }

    #[test]
    fn plugin_denial_is_recognised() {
        let err = DeviceError::from_plugin("User denied access to camera");
        assert!(matches!(err, DeviceError::PermissionDenied(_)));
        assert_eq!(err.kind(), ErrorKind::Permission);
        assert!(err.user_message().contains("settings"));
    }

    #[test]
    fn other_plugin_errors_keep_their_text() {
        let err = DeviceError::from_plugin("No camera available");
        assert!(matches!(err, DeviceError::Plugin(ref m) if m == "No camera available"));
        assert_eq!(err.kind(), ErrorKind::Fatal);
    }

    #[test]
    fn io_error_kinds() {
        let denied = DeviceError::from(std::io::Error::from(std::io::ErrorKind::PermissionDenied));
        assert_eq!(denied.kind(), ErrorKind::Permission);

        let missing = DeviceError::from(std::io::Error::from(std::io::ErrorKind::NotFound));
        assert_eq!(missing.kind(), ErrorKind::Invalid);

        let slow = DeviceError::from(std::io::Error::from(std::io::ErrorKind::TimedOut));
        assert_eq!(slow.kind(), ErrorKind::Transient);
    }
}
