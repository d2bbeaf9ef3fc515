//! Camera capability DTOs.

use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_PHOTO_QUALITY;
use crate::types::PickedFile;

/// Permission state as reported by the camera plugin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PermissionState {
    Granted,
    Denied,
    Prompt,
    PromptWithRationale,
    /// Partial photo-library access (iOS).
    Limited,
}

impl PermissionState {
    /// Returns `true` when the capability can be used without asking.
    pub fn is_usable(self) -> bool {
        matches!(self, PermissionState::Granted | PermissionState::Limited)
    }
}

/// Which permission to request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionKind {
    Camera,
    Photos,
}

/// Permission states for both camera-related capabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CameraPermissions {
    pub camera: PermissionState,
    pub photos: PermissionState,
}

impl CameraPermissions {
    pub fn state(&self, kind: PermissionKind) -> PermissionState {
        match kind {
            PermissionKind::Camera => self.camera,
            PermissionKind::Photos => self.photos,
        }
    }
}

/// Where the picture comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CameraSource {
    /// Let the user choose between camera and gallery.
    Prompt,
    Camera,
    Photos,
}

impl CameraSource {
    /// Permissions the source needs before capture.
    pub fn required_permissions(self) -> &'static [PermissionKind] {
        match self {
            CameraSource::Prompt => &[PermissionKind::Camera, PermissionKind::Photos],
            CameraSource::Camera => &[PermissionKind::Camera],
            CameraSource::Photos => &[PermissionKind::Photos],
        }
    }
}

/// Shape of the capture result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResultFormat {
    Uri,
    Base64,
    DataUrl,
}

/// Options for a single photo capture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoOptions {
    pub quality: u8,
    pub allow_editing: bool,
    pub source: CameraSource,
    pub result_type: ResultFormat,
}

impl Default for PhotoOptions {
    fn default() -> Self {
        Self {
            quality: DEFAULT_PHOTO_QUALITY,
            allow_editing: false,
            source: CameraSource::Prompt,
            result_type: ResultFormat::DataUrl,
        }
    }
}

/// A captured picture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapturedPhoto {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_url: Option<String>,
    /// Image format, e.g. `jpeg` or `png`.
    pub format: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

impl CapturedPhoto {
    /// Approximate decoded size in bytes, from the base64 overhead of the
    /// data URL (4 characters per 3 bytes).
    pub fn estimated_size(&self) -> Option<u64> {
        self.data_url
            .as_ref()
            .map(|url| ((url.len() as f64) * 3.0 / 4.0).round() as u64)
    }

    /// Exact decoded size of a base64 data URL, counted from the payload
    /// after the comma. `None` when there is no data URL or it is not
    /// base64-encoded.
    pub fn decoded_size(&self) -> Option<u64> {
        let (header, payload) = self.data_url.as_ref()?.split_once(',')?;
        if !header.to_ascii_lowercase().ends_with(";base64") {
            return None;
        }
        let chars = payload
            .chars()
            .filter(|c| *c != '=' && !c.is_ascii_whitespace())
            .count() as u64;
        Some(chars * 3 / 4)
    }

    /// Media type derived from the reported format.
    pub fn mime_type(&self) -> String {
        match self.format.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" | "" => "image/jpeg".into(),
            other => format!("image/{other}"),
        }
    }

    /// Turns the capture into an uploadable file named `photo-<seq>.<ext>`.
    ///
    /// Returns `None` when the plugin returned no data URL.
    pub fn to_picked_file(&self, seq: usize) -> Option<PickedFile> {
        let data_url = self.data_url.as_ref()?;
        let ext = if self.format.is_empty() {
            "jpeg"
        } else {
            self.format.as_str()
        };
        Some(
            PickedFile::encoded(data_url.clone())
                .with_name(format!("photo-{seq}.{ext}"))
                .with_mime_type(self.mime_type())
                .with_size(self.decoded_size().unwrap_or(0)),
        )
    }
}
