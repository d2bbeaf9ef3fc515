/// Name used when a picked file carries no name.
pub const DEFAULT_FILE_NAME: &str = "file";

/// Media type used when a picked file carries no media type.
pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// Multipart field the endpoint expects the file under.
pub const DEFAULT_FIELD_NAME: &str = "file";

/// JPEG quality requested from the camera plugin (0-100).
pub const DEFAULT_PHOTO_QUALITY: u8 = 90;

/// Default retry budget for a single file.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
