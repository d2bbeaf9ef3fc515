//! Turns a picked file into uploadable bytes.

use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD};
use bytes::Bytes;
use snapdrop_device::FileReader;
use snapdrop_protocol::{
    FilePayload, NativeFileRef, PickedFile, PickedFileDescriptor, ReadFileRequest,
    ResolvedPayload,
};
use tracing::{debug, warn};

use crate::error::ResolutionError;

/// Resolves every supported payload representation to raw bytes.
///
/// Native paths go through the filesystem capability; inline bytes pass
/// through untouched; base64 and `data:` URLs are decoded locally.
#[derive(Clone)]
pub struct FileBlobResolver {
    reader: Arc<dyn FileReader>,
}

impl FileBlobResolver {
    pub fn new(reader: Arc<dyn FileReader>) -> Self {
        Self { reader }
    }

    /// Resolves one file.
    ///
    /// A native read that fails falls back to the encoded copy when the
    /// picker supplied one. A declared non-zero size with an empty result is
    /// an error; other size mismatches are only logged.
    pub async fn resolve(&self, file: &PickedFile) -> Result<ResolvedPayload, ResolutionError> {
        let (bytes, embedded_type) = match &file.payload {
            FilePayload::Inline(bytes) => (bytes.clone(), None),
            FilePayload::Native {
                file: native,
                encoded_fallback,
            } => match self.read_native(native).await {
                Ok(bytes) => (bytes, None),
                Err(e) => match encoded_fallback {
                    Some(encoded) => {
                        warn!(file = %file.name, error = %e, "native read failed, using encoded copy");
                        decode_encoded(encoded)?
                    }
                    None => return Err(e),
                },
            },
            FilePayload::Encoded(data) => decode_encoded(data)?,
        };

        if file.size > 0 {
            if bytes.is_empty() {
                return Err(ResolutionError::SizeMismatch {
                    declared: file.size,
                });
            }
            if bytes.len() as u64 != file.size {
                warn!(
                    file = %file.name,
                    declared = file.size,
                    resolved = bytes.len(),
                    "resolved size differs from declared size"
                );
            }
        }

        let mime_type = match embedded_type {
            Some(media) if file.has_default_mime_type() => media,
            _ => file.mime_type.clone(),
        };

        debug!(file = %file.name, bytes = bytes.len(), %mime_type, "payload resolved");
        Ok(ResolvedPayload {
            bytes,
            mime_type,
            name: file.name.clone(),
        })
    }

    /// Converts a raw picker descriptor and resolves it.
    pub async fn resolve_descriptor(
        &self,
        descriptor: PickedFileDescriptor,
    ) -> Result<ResolvedPayload, ResolutionError> {
        let file = PickedFile::try_from(descriptor)?;
        self.resolve(&file).await
    }

    async fn read_native(&self, native: &NativeFileRef) -> Result<Bytes, ResolutionError> {
        let result = self
            .reader
            .read_file(ReadFileRequest::from(native))
            .await
            .map_err(|source| ResolutionError::Read {
                path: native.path.clone(),
                source,
            })?;
        decode_base64(&result.data)
    }
}

/// Decodes base64 text or a `data:` URL. Returns the media type embedded
/// in a data URL, if any.
fn decode_encoded(data: &str) -> Result<(Bytes, Option<String>), ResolutionError> {
    let trimmed = data.trim();
    let is_data_url = trimmed
        .get(..5)
        .is_some_and(|scheme| scheme.eq_ignore_ascii_case("data:"));
    if is_data_url {
        decode_data_url(&trimmed[5..])
    } else {
        Ok((decode_base64(trimmed)?, None))
    }
}

/// Parses the part of a data URL after `data:`:
/// `[<media type>][;param]*[;base64],<data>`.
fn decode_data_url(rest: &str) -> Result<(Bytes, Option<String>), ResolutionError> {
    let (meta, payload) = rest
        .split_once(',')
        .ok_or_else(|| ResolutionError::DataUrl("missing ',' separator".into()))?;

    let mut params = meta.split(';');
    let media_type = params.next().unwrap_or_default().trim();
    let is_base64 = params.any(|p| p.trim().eq_ignore_ascii_case("base64"));

    let bytes = if is_base64 {
        decode_base64(payload)?
    } else {
        Bytes::from(percent_encoding::percent_decode_str(payload).collect::<Vec<u8>>())
    };

    let media_type = (!media_type.is_empty()).then(|| media_type.to_ascii_lowercase());
    Ok((bytes, media_type))
}

fn decode_base64(data: &str) -> Result<Bytes, ResolutionError> {
    let cleaned: String = data.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    match STANDARD.decode(&cleaned) {
        Ok(decoded) => Ok(Bytes::from(decoded)),
        Err(e) => STANDARD_NO_PAD
            .decode(cleaned.trim_end_matches('='))
            .map(Bytes::from)
            .map_err(|_| ResolutionError::Base64(e)),
    }
}
