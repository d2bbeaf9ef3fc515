//! Native file-pick capability.

use snapdrop_protocol::{PickOptions, PickedFile};
use tracing::{debug, warn};

use crate::DeviceFuture;
use crate::error::DeviceError;

/// File picker plugin provided by the host shell.
pub trait FilePicker: Send + Sync {
    /// Shows the native picker. A dismissed picker is
    /// [`DeviceError::Cancelled`].
    fn pick_files(&self, options: PickOptions) -> DeviceFuture<'_, Vec<PickedFile>>;
}

/// Returns `true` if `mime_type` matches one of `patterns`
/// (`image/*`, `*/*`, or an exact type). An empty pattern list accepts all.
pub fn mime_matches(mime_type: &str, patterns: &[String]) -> bool {
    if patterns.is_empty() {
        return true;
    }
    let mime_type = mime_type.to_ascii_lowercase();
    patterns.iter().any(|pattern| {
        let pattern = pattern.trim().to_ascii_lowercase();
        match pattern.strip_suffix("/*") {
            Some("*") => true,
            Some(top) => mime_type
                .split_once('/')
                .is_some_and(|(t, _)| t == top),
            None => pattern == mime_type,
        }
    })
}

/// Opens the picker for a multi-file selection restricted to `types`.
///
/// Some platforms ignore the type filter, so results are filtered again
/// here; files the filter rejects are logged and dropped from the pick.
/// Files the plugin reported without a media type are kept, since only
/// the platform filter could have judged them.
pub async fn pick_files(
    picker: &dyn FilePicker,
    types: &[String],
) -> Result<Vec<PickedFile>, DeviceError> {
    let options = PickOptions {
        multiple: true,
        types: types.to_vec(),
    };
    let picked = picker.pick_files(options).await?;

    let mut accepted = Vec::with_capacity(picked.len());
    for file in picked {
        if file.has_default_mime_type() || mime_matches(&file.mime_type, types) {
            accepted.push(file);
        } else {
            warn!(file = %file.name, mime = %file.mime_type, "picked file type not accepted");
        }
    }

    debug!(count = accepted.len(), "files picked");
    Ok(accepted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct MockPicker {
        result: Mutex<Option<Result<Vec<PickedFile>, DeviceError>>>,
        last_options: Mutex<Option<PickOptions>>,
    }

    impl MockPicker {
        fn new(result: Result<Vec<PickedFile>, DeviceError>) -> Self {
            Self {
                result: Mutex::new(Some(result)),
                last_options: Mutex::new(None),
            }
        }
    }

    impl FilePicker for MockPicker {
        fn pick_files(&self, options: PickOptions) -> DeviceFuture<'_, Vec<PickedFile>> {
            *self.last_options.lock().unwrap() = Some(options);
            let result = self.result.lock().unwrap().take().unwrap_or(Ok(Vec::new()));
            Box::pin(async move { result })
        }
    }

    fn types(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn wildcard_patterns() {
        assert!(mime_matches("image/png", &types(&["image/*"])));
        assert!(mime_matches("IMAGE/JPEG", &types(&["image/*"])));
        assert!(!mime_matches("video/mp4", &types(&["image/*"])));
        assert!(mime_matches("video/mp4", &types(&["*/*"])));
    }

    #[test]
    fn exact_patterns() {
        assert!(mime_matches("application/pdf", &types(&["image/*", "application/pdf"])));
        assert!(!mime_matches("application/zip", &types(&["application/pdf"])));
    }

    #[test]
    fn empty_pattern_list_accepts_everything() {
        assert!(mime_matches("application/x-whatever", &[]));
    }

    #[tokio::test]
    async fn pick_requests_multiple_and_filters() {
        let picker = MockPicker::new(Ok(vec![
            PickedFile::inline(vec![1]).with_name("a.png").with_mime_type("image/png"),
            PickedFile::inline(vec![2]).with_name("b.zip").with_mime_type("application/zip"),
        ]));
        let accepted = types(&["image/*"]);
        let files = pick_files(&picker, &accepted).await.unwrap();

        assert_eq!(files.len(), 1);
        assert_eq!(files[0].name, "a.png");

        let opts = picker.last_options.lock().unwrap().clone().unwrap();
        assert!(opts.multiple);
        assert_eq!(opts.types, accepted);
    }

    #[tokio::test]
    async fn files_without_a_media_type_are_kept() {
        let picker = MockPicker::new(Ok(vec![
            PickedFile::inline(vec![1]).with_name("scan.jpg"),
            PickedFile::inline(vec![2]).with_name("b.zip").with_mime_type("application/zip"),
        ]));
        let accepted = types(&["image/*", "application/pdf", "text/*"]);
        let files = pick_files(&picker, &accepted).await.unwrap();

        assert_eq!(files.len(), 1);
        assert_eq!(files[0].name, "scan.jpg");
        assert_eq!(files[0].mime_type, "application/octet-stream");
    }

    #[tokio::test]
    async fn pick_cancellation_propagates() {
        let picker = MockPicker::new(Err(DeviceError::Cancelled));
        let err = pick_files(&picker, &[]).await.unwrap_err();
        assert!(err.is_cancelled());
    }
}
