//! Shared data model for the SnapDrop welcome screen.
//!
//! Picked-file descriptors as delivered by the platform plugins, the
//! resolved binary payloads handed to the transport, camera DTOs and the
//! closed error classification every collaborator reports.

pub mod capture;
pub mod constants;
pub mod kind;
pub mod types;

// Re-export primary types for convenience.
pub use capture::{
    CameraPermissions, CameraSource, CapturedPhoto, PermissionKind, PermissionState,
    PhotoOptions, ResultFormat,
};
pub use kind::{Classify, ErrorKind, classify_message};
pub use types::{
    FilePayload, NativeFileRef, PickOptions, PickedFile, PickedFileDescriptor, ReadFileRequest,
    ReadFileResult, ResolvedPayload, UnrecognizedRepresentation,
};
