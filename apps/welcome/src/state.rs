//! Welcome-screen view-model.

use serde::Serialize;
use tokio_util::sync::CancellationToken;

use snapdrop_protocol::{CapturedPhoto, PickedFile};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusLevel {
    Info,
    Success,
    Error,
}

/// One-line message shown under the buttons.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusMessage {
    pub level: StatusLevel,
    pub text: String,
}

impl StatusMessage {
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            level: StatusLevel::Info,
            text: text.into(),
        }
    }

    pub fn success(text: impl Into<String>) -> Self {
        Self {
            level: StatusLevel::Success,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            level: StatusLevel::Error,
            text: text.into(),
        }
    }
}

/// Everything the screen shows, owned by the controller.
#[derive(Debug, Default)]
pub struct ScreenState {
    pub selection: Vec<PickedFile>,
    /// Data URL of the last captured photo.
    pub preview: Option<String>,
    /// Overall upload percentage while a batch runs or after it finished.
    pub progress: Option<f64>,
    pub status: Option<StatusMessage>,
    photos_taken: usize,
    batch_seq: u64,
    active_batch: Option<(u64, CancellationToken)>,
}

impl ScreenState {
    pub fn is_uploading(&self) -> bool {
        self.active_batch.is_some()
    }

    /// Shows `photo` as the preview and queues it for upload. Returns
    /// `false` when the capture carried no image data.
    pub fn add_photo(&mut self, photo: &CapturedPhoto) -> bool {
        self.preview = photo.data_url.clone();
        self.photos_taken += 1;
        match photo.to_picked_file(self.photos_taken) {
            Some(file) => {
                self.selection.push(file);
                true
            }
            None => false,
        }
    }

    pub fn add_files(&mut self, files: Vec<PickedFile>) -> usize {
        let added = files.len();
        self.selection.extend(files);
        added
    }

    /// Marks a batch as running and returns its id.
    pub fn begin_upload(&mut self, cancel: CancellationToken) -> u64 {
        self.batch_seq += 1;
        self.active_batch = Some((self.batch_seq, cancel));
        self.progress = Some(0.0);
        self.status = Some(StatusMessage::info("Uploading…"));
        self.batch_seq
    }

    /// Returns `true` while batch `id` is the one running. A batch stops
    /// being current when it finishes or the selection is cleared.
    pub fn is_current_batch(&self, id: u64) -> bool {
        self.active_batch.as_ref().is_some_and(|(active, _)| *active == id)
    }

    pub fn finish_upload(&mut self) {
        self.active_batch = None;
    }

    /// Empties selection, preview, progress and status. Returns the token
    /// of the batch that was running, if any.
    pub fn clear(&mut self) -> Option<CancellationToken> {
        self.selection.clear();
        self.preview = None;
        self.progress = None;
        self.status = None;
        self.active_batch.take().map(|(_, token)| token)
    }

    pub fn snapshot(&self, upload_configured: bool) -> ScreenSnapshot {
        let uploading = self.is_uploading();
        ScreenSnapshot {
            selected_files: self.selection.iter().map(SelectedFileView::from).collect(),
            preview_data_url: self.preview.clone(),
            progress: self.progress,
            uploading,
            status: self.status.clone(),
            can_take_photo: !uploading,
            can_pick_files: !uploading,
            can_upload: upload_configured && !uploading && !self.selection.is_empty(),
            can_clear: uploading || !self.selection.is_empty() || self.preview.is_some(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectedFileView {
    pub name: String,
    pub mime_type: String,
    pub size: u64,
}

impl From<&PickedFile> for SelectedFileView {
    fn from(file: &PickedFile) -> Self {
        Self {
            name: file.name.clone(),
            mime_type: file.mime_type.clone(),
            size: file.size,
        }
    }
}

/// Serializable view of [`ScreenState`] for the shell.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenSnapshot {
    pub selected_files: Vec<SelectedFileView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview_data_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<f64>,
    pub uploading: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<StatusMessage>,
    pub can_take_photo: bool,
    pub can_pick_files: bool,
    pub can_upload: bool,
    pub can_clear: bool,
}
