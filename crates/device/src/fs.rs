//! Filesystem-read capability.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};

use base64::Engine;
use snapdrop_protocol::{ReadFileRequest, ReadFileResult};
use tracing::debug;

use crate::DeviceFuture;
use crate::error::DeviceError;

/// Filesystem plugin provided by the host shell.
///
/// Returns the whole file as base64, which is how the mobile plugins hand
/// content across the bridge.
pub trait FileReader: Send + Sync {
    fn read_file(&self, request: ReadFileRequest) -> DeviceFuture<'_, ReadFileResult>;
}

/// Validates that a path relative to a named directory stays inside it.
///
/// Rejects:
/// - Empty paths
/// - Absolute paths (Unix `/` or Windows `C:\`)
/// - Parent directory traversal (`..`)
/// - Windows prefix components (`C:`, `\\server`)
pub fn validate_relative_path(file_path: &str) -> Result<(), DeviceError> {
    if file_path.is_empty() {
        return Err(DeviceError::InvalidPath("empty path".into()));
    }

    let path = Path::new(file_path);

    if path.is_absolute() {
        return Err(DeviceError::InvalidPath(format!(
            "absolute path not allowed: {file_path}"
        )));
    }

    for component in path.components() {
        match component {
            Component::ParentDir => {
                return Err(DeviceError::InvalidPath(format!(
                    "parent directory traversal not allowed: {file_path}"
                )));
            }
            Component::Prefix(_) | Component::RootDir => {
                return Err(DeviceError::InvalidPath(format!(
                    "absolute path not allowed: {file_path}"
                )));
            }
            Component::CurDir | Component::Normal(_) => {}
        }
    }

    Ok(())
}

/// [`FileReader`] backed by the local filesystem.
///
/// Requests without a directory are treated as plain paths (a `file://`
/// prefix is accepted). Requests naming a directory are resolved against
/// the root registered for it with [`with_directory`](Self::with_directory).
#[derive(Debug, Clone, Default)]
pub struct LocalFileReader {
    directories: HashMap<String, PathBuf>,
}

impl LocalFileReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the root for a named directory such as `DOCUMENTS`.
    pub fn with_directory(mut self, name: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        self.directories.insert(name.into(), root.into());
        self
    }

    /// Maps a request to a concrete filesystem path.
    pub fn resolve_path(&self, request: &ReadFileRequest) -> Result<PathBuf, DeviceError> {
        match &request.directory {
            Some(name) => {
                let root = self.directories.get(name).ok_or_else(|| {
                    DeviceError::InvalidPath(format!("unknown directory: {name}"))
                })?;
                validate_relative_path(&request.path)?;
                Ok(root.join(&request.path))
            }
            None => {
                let path = request
                    .path
                    .strip_prefix("file://")
                    .unwrap_or(request.path.as_str());
                if path.is_empty() {
                    return Err(DeviceError::InvalidPath("empty path".into()));
                }
                Ok(PathBuf::from(path))
            }
        }
    }
}

impl FileReader for LocalFileReader {
    fn read_file(&self, request: ReadFileRequest) -> DeviceFuture<'_, ReadFileResult> {
        Box::pin(async move {
            let path = self.resolve_path(&request)?;
            let content = tokio::fs::read(&path).await?;
            debug!(path = %path.display(), bytes = content.len(), "file read");
            Ok(ReadFileResult {
                data: base64::engine::general_purpose::STANDARD.encode(&content),
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_path() {
        assert!(validate_relative_path("").is_err());
    }

    #[test]
    fn rejects_parent_dir_traversal() {
        assert!(validate_relative_path("../../../etc/passwd").is_err());
        assert!(validate_relative_path("sub/../../../escape").is_err());
    }

    #[test]
    fn rejects_absolute_unix_path() {
        assert!(validate_relative_path("/tmp/malicious").is_err());
    }

    #[test]
    fn accepts_nested_relative_path() {
        assert!(validate_relative_path("photos/2024/img.jpg").is_ok());
        assert!(validate_relative_path("./notes.txt").is_ok());
    }

    #[tokio::test]
    async fn reads_named_directory_as_base64() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("photos")).unwrap();
        std::fs::write(dir.path().join("photos/a.txt"), b"hello").unwrap();

        let reader = LocalFileReader::new().with_directory("DOCUMENTS", dir.path());
        let result = reader
            .read_file(ReadFileRequest {
                path: "photos/a.txt".into(),
                directory: Some("DOCUMENTS".into()),
            })
            .await
            .unwrap();
        assert_eq!(result.data, "aGVsbG8=");
    }

    #[tokio::test]
    async fn reads_plain_and_file_url_paths() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("b.bin");
        std::fs::write(&file, [0u8, 1, 2]).unwrap();

        let reader = LocalFileReader::new();
        let plain = reader
            .read_file(ReadFileRequest {
                path: file.to_string_lossy().into_owned(),
                directory: None,
            })
            .await
            .unwrap();
        assert_eq!(plain.data, "AAEC");

        let url = reader
            .read_file(ReadFileRequest {
                path: format!("file://{}", file.display()),
                directory: None,
            })
            .await
            .unwrap();
        assert_eq!(url.data, "AAEC");
    }

    #[tokio::test]
    async fn unknown_directory_is_invalid() {
        let reader = LocalFileReader::new();
        let err = reader
            .read_file(ReadFileRequest {
                path: "a.txt".into(),
                directory: Some("CACHE".into()),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DeviceError::InvalidPath(_)));
    }

    #[tokio::test]
    async fn traversal_out_of_directory_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let reader = LocalFileReader::new().with_directory("DATA", dir.path());
        let err = reader
            .read_file(ReadFileRequest {
                path: "../secret".into(),
                directory: Some("DATA".into()),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DeviceError::InvalidPath(_)));
    }

    #[tokio::test]
    async fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let reader = LocalFileReader::new();
        let err = reader
            .read_file(ReadFileRequest {
                path: dir.path().join("nope").to_string_lossy().into_owned(),
                directory: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DeviceError::Io(_)));
    }
}
