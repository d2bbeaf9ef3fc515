//! Camera capability and the permission flow around it.

use snapdrop_protocol::{
    CameraPermissions, CameraSource, CapturedPhoto, PermissionKind, PhotoOptions,
};
use tracing::{debug, info, warn};

use crate::DeviceFuture;
use crate::error::DeviceError;

/// Camera plugin provided by the host shell.
///
/// Implementations should build errors with [`DeviceError::from_plugin`]
/// so cancellations and denials are told apart from real failures.
pub trait Camera: Send + Sync {
    /// Reports the current camera and photo-library permission states.
    ///
    /// Platforms without a permission model return
    /// [`DeviceError::Unavailable`].
    fn check_permissions(&self) -> DeviceFuture<'_, CameraPermissions>;

    /// Prompts the user for the given permissions.
    fn request_permissions(&self, kinds: Vec<PermissionKind>) -> DeviceFuture<'_, CameraPermissions>;

    /// Opens the camera or gallery and returns the picture.
    fn capture_photo(&self, options: PhotoOptions) -> DeviceFuture<'_, CapturedPhoto>;
}

/// Makes sure the camera may be used for `source`.
///
/// Checks first and only prompts for what is missing. Access is granted when
/// any permission the source can work with is usable (a `Prompt` source
/// works with either the camera or the gallery). A denial after the prompt
/// is terminal and reported as [`DeviceError::PermissionDenied`].
pub async fn ensure_camera_access(
    camera: &dyn Camera,
    source: CameraSource,
) -> Result<(), DeviceError> {
    let required = source.required_permissions();

    let current = match camera.check_permissions().await {
        Ok(p) => p,
        Err(DeviceError::Unavailable(reason)) => {
            // Web shells fall back to a file input and have nothing to check.
            debug!(%reason, "permission check unavailable, capturing directly");
            return Ok(());
        }
        Err(e) => return Err(e),
    };

    if any_usable(&current, required) {
        return Ok(());
    }

    debug!(?current, "requesting camera permissions");
    let granted = camera.request_permissions(required.to_vec()).await?;

    if any_usable(&granted, required) {
        info!("camera permission granted");
        Ok(())
    } else {
        warn!(?granted, "camera permission denied after request");
        Err(DeviceError::PermissionDenied(format!(
            "camera: {:?}, photos: {:?}",
            granted.camera, granted.photos
        )))
    }
}

fn any_usable(perms: &CameraPermissions, kinds: &[PermissionKind]) -> bool {
    kinds.iter().any(|k| perms.state(*k).is_usable())
}

/// Runs the permission flow and captures one photo.
pub async fn take_photo(
    camera: &dyn Camera,
    options: PhotoOptions,
) -> Result<CapturedPhoto, DeviceError> {
    ensure_camera_access(camera, options.source).await?;

    let photo = camera.capture_photo(options).await?;

    info!(
        format = %photo.format,
        width = ?photo.width,
        height = ?photo.height,
        data_url_len = photo.data_url.as_ref().map(String::len),
        estimated_bytes = photo.estimated_size(),
        "photo captured"
    );

    Ok(photo)
}
