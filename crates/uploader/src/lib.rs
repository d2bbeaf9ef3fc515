//! Multi-file upload for the SnapDrop screen.
//!
//! - [`FileBlobResolver`] turns picked files into bytes.
//! - [`UploadTransport`] sends one file; [`HttpTransport`] is the
//!   `multipart/form-data` implementation.
//! - [`BatchUploadOrchestrator`] runs a batch sequentially with per-file
//!   and whole-batch retries, emitting [`UploadEvent`]s.

pub mod error;
pub mod orchestrator;
pub mod resolver;
pub mod transport;
pub mod types;

pub use error::{ResolutionError, TransportError, UploadError};
pub use orchestrator::BatchUploadOrchestrator;
pub use resolver::FileBlobResolver;
pub use reqwest::Url;
pub use transport::{HttpTransport, ProgressFn, TransportResponse, UploadTransport};
pub use types::{BatchConfig, BatchFailure, BatchResult, UploadEvent};
