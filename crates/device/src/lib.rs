//! Device capabilities consumed by the SnapDrop screen.
//!
//! Camera access, native file picking and filesystem reads are provided by
//! the host shell's plugins. This crate defines them as traits so the
//! upload and screen logic stays decoupled from any particular shell and
//! testable with mocks. [`LocalFileReader`] is the desktop implementation
//! of the filesystem capability.

pub mod camera;
pub mod error;
pub mod fs;
pub mod picker;

use std::future::Future;
use std::pin::Pin;

pub use camera::{Camera, ensure_camera_access, take_photo};
pub use error::DeviceError;
pub use fs::{FileReader, LocalFileReader, validate_relative_path};
pub use picker::{FilePicker, mime_matches, pick_files};

/// Boxed future returned by capability trait methods.
pub type DeviceFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, DeviceError>> + Send + 'a>>;
