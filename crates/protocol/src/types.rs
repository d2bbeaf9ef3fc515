use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_FILE_NAME, DEFAULT_MIME_TYPE};

/// Opaque platform reference to a file the picker returned by path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NativeFileRef {
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<String>,
}

/// The one payload representation a picked file carries.
#[derive(Debug, Clone, PartialEq)]
pub enum FilePayload {
    /// Already-decoded bytes.
    Inline(Bytes),
    /// Platform path, read through the filesystem capability.
    ///
    /// Some pickers hand out an encoded copy next to the path; it is kept
    /// as the fallback when the read fails.
    Native {
        file: NativeFileRef,
        encoded_fallback: Option<String>,
    },
    /// Base64 text or a `data:` URL.
    Encoded(String),
}

/// A file selected by the user, ready to be resolved and uploaded.
#[derive(Debug, Clone, PartialEq)]
pub struct PickedFile {
    pub name: String,
    pub mime_type: String,
    /// Declared size in bytes; 0 when the picker did not know.
    pub size: u64,
    pub payload: FilePayload,
}

impl PickedFile {
    /// Creates a file with default name and media type.
    pub fn new(payload: FilePayload) -> Self {
        Self {
            name: DEFAULT_FILE_NAME.into(),
            mime_type: DEFAULT_MIME_TYPE.into(),
            size: 0,
            payload,
        }
    }

    /// Convenience constructor for in-memory content.
    pub fn inline(bytes: impl Into<Bytes>) -> Self {
        let bytes = bytes.into();
        let size = bytes.len() as u64;
        Self::new(FilePayload::Inline(bytes)).with_size(size)
    }

    /// Convenience constructor for base64 / data-URL content.
    pub fn encoded(data: impl Into<String>) -> Self {
        Self::new(FilePayload::Encoded(data.into()))
    }

    /// Convenience constructor for a native path reference.
    pub fn native(path: impl Into<String>, directory: Option<String>) -> Self {
        Self::new(FilePayload::Native {
            file: NativeFileRef {
                path: path.into(),
                directory,
            },
            encoded_fallback: None,
        })
    }

    /// Sets the name; blank names keep the default.
    pub fn with_name(mut self, name: impl AsRef<str>) -> Self {
        let name = name.as_ref().trim();
        if !name.is_empty() {
            self.name = name.to_string();
        }
        self
    }

    /// Sets the media type; blank values keep the default.
    pub fn with_mime_type(mut self, mime_type: impl AsRef<str>) -> Self {
        let mime_type = mime_type.as_ref().trim();
        if !mime_type.is_empty() {
            self.mime_type = mime_type.to_string();
        }
        self
    }

    pub fn with_size(mut self, size: u64) -> Self {
        self.size = size;
        self
    }

    /// Returns `true` when the media type is the generic default.
    pub fn has_default_mime_type(&self) -> bool {
        self.mime_type == DEFAULT_MIME_TYPE
    }
}

/// Raw file descriptor as the picker plugin serializes it.
///
/// Every field is optional on the wire; conversion into [`PickedFile`]
/// picks the first usable representation in the order inline bytes,
/// native path, encoded data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PickedFileDescriptor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blob: Option<Vec<u8>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

/// A descriptor carried none of the known payload fields.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized file representation")]
pub struct UnrecognizedRepresentation;

impl TryFrom<PickedFileDescriptor> for PickedFile {
    type Error = UnrecognizedRepresentation;

    fn try_from(desc: PickedFileDescriptor) -> Result<Self, Self::Error> {
        let data = desc.data.filter(|d| !d.trim().is_empty());
        let path = desc.path.filter(|p| !p.trim().is_empty());

        let payload = if let Some(blob) = desc.blob {
            FilePayload::Inline(Bytes::from(blob))
        } else if let Some(path) = path {
            FilePayload::Native {
                file: NativeFileRef {
                    path,
                    directory: desc.directory,
                },
                encoded_fallback: data,
            }
        } else if let Some(data) = data {
            FilePayload::Encoded(data)
        } else {
            return Err(UnrecognizedRepresentation);
        };

        let mut file = PickedFile::new(payload).with_size(desc.size.unwrap_or(0));
        if let Some(name) = desc.name {
            file = file.with_name(name);
        }
        if let Some(mime_type) = desc.mime_type {
            file = file.with_mime_type(mime_type);
        }
        Ok(file)
    }
}

/// Binary content ready for the transport.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedPayload {
    pub bytes: Bytes,
    pub mime_type: String,
    pub name: String,
}

impl ResolvedPayload {
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Options passed to the file-pick capability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PickOptions {
    pub multiple: bool,
    /// MIME patterns such as `image/*`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub types: Vec<String>,
}

/// Request for the filesystem-read capability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadFileRequest {
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<String>,
}

impl From<&NativeFileRef> for ReadFileRequest {
    fn from(file: &NativeFileRef) -> Self {
        Self {
            path: file.path.clone(),
            directory: file.directory.clone(),
        }
    }
}

/// Result of the filesystem-read capability: base64 file content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadFileResult {
    pub data: String,
}
