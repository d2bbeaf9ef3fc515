//! Welcome-screen controller.
//!
//! Wires the camera, picker and filesystem capabilities to the batch
//! uploader and keeps the [`ScreenState`] view-model current. Every
//! operation returns the resulting [`ScreenSnapshot`]; the shell can also
//! [`subscribe`](WelcomeScreen::subscribe) to redraw on progress.

use std::sync::Arc;

use tokio::sync::{Mutex, mpsc, watch};
use tracing::{debug, info, trace, warn};

use snapdrop_device::{Camera, FilePicker, FileReader};
use snapdrop_transfer::ProgressThrottle;
use snapdrop_uploader::{
    BatchResult, BatchUploadOrchestrator, FileBlobResolver, HttpTransport, UploadEvent,
    UploadTransport, Url,
};

use crate::config::WelcomeConfig;
use crate::state::{ScreenSnapshot, ScreenState, StatusMessage};

/// Device capabilities provided by the host shell.
#[derive(Clone)]
pub struct Capabilities {
    pub camera: Arc<dyn Camera>,
    pub picker: Arc<dyn FilePicker>,
    pub reader: Arc<dyn FileReader>,
}

pub struct WelcomeScreen {
    config: WelcomeConfig,
    endpoint: Option<Url>,
    caps: Capabilities,
    transport: Arc<dyn UploadTransport>,
    state: Arc<Mutex<ScreenState>>,
    snapshots: Arc<watch::Sender<ScreenSnapshot>>,
}

impl WelcomeScreen {
    /// Creates the controller. An invalid or missing endpoint is logged and
    /// leaves uploading disabled.
    pub fn new(
        config: WelcomeConfig,
        caps: Capabilities,
        transport: Arc<dyn UploadTransport>,
    ) -> Self {
        let endpoint = match config.endpoint_url() {
            Ok(url) => Some(url),
            Err(e) => {
                warn!(error = %e, "uploads disabled");
                None
            }
        };
        let state = ScreenState::default();
        let (snapshots, _) = watch::channel(state.snapshot(endpoint.is_some()));

        Self {
            config,
            endpoint,
            caps,
            transport,
            state: Arc::new(Mutex::new(state)),
            snapshots: Arc::new(snapshots),
        }
    }

    /// Creates the controller with the `reqwest` multipart transport.
    pub fn with_http(config: WelcomeConfig, caps: Capabilities) -> anyhow::Result<Self> {
        let transport =
            HttpTransport::new(config.request_timeout())?.with_field_name(&config.field_name);
        Ok(Self::new(config, caps, Arc::new(transport)))
    }

    pub fn config(&self) -> &WelcomeConfig {
        &self.config
    }

    /// Receives a new snapshot after every state change.
    pub fn subscribe(&self) -> watch::Receiver<ScreenSnapshot> {
        self.snapshots.subscribe()
    }

    pub async fn snapshot(&self) -> ScreenSnapshot {
        self.state.lock().await.snapshot(self.endpoint.is_some())
    }

    /// Runs the permission flow, captures a photo, shows it as the preview
    /// and adds it to the selection.
    pub async fn take_photo(&self) -> ScreenSnapshot {
        if self.state.lock().await.is_uploading() {
            debug!("photo capture ignored while uploading");
            return self.snapshot().await;
        }

        let result =
            snapdrop_device::take_photo(self.caps.camera.as_ref(), self.config.photo_options())
                .await;

        let mut state = self.state.lock().await;
        if state.is_uploading() {
            // A batch started while the camera was open.
            debug!("photo discarded, upload started during capture");
            return state.snapshot(self.endpoint.is_some());
        }
        match result {
            Ok(photo) => {
                if state.add_photo(&photo) {
                    state.status = Some(StatusMessage::info("Photo added to the selection."));
                } else {
                    warn!(format = %photo.format, "capture returned no image data");
                    state.status = Some(StatusMessage::error(
                        "Error taking photo: the camera returned no image.",
                    ));
                }
            }
            Err(e) if e.is_cancelled() => debug!("photo capture cancelled"),
            Err(e) => {
                warn!(error = %e, "photo capture failed");
                state.status = Some(StatusMessage::error(format!(
                    "Error taking photo: {}",
                    e.user_message()
                )));
            }
        }
        self.publish(&state)
    }

    /// Opens the picker for multiple files of the configured types and
    /// appends the result to the selection.
    pub async fn pick_files(&self) -> ScreenSnapshot {
        if self.state.lock().await.is_uploading() {
            debug!("file pick ignored while uploading");
            return self.snapshot().await;
        }

        let result =
            snapdrop_device::pick_files(self.caps.picker.as_ref(), &self.config.accepted_types)
                .await;

        let mut state = self.state.lock().await;
        match result {
            Ok(files) if files.is_empty() => {
                state.status = Some(StatusMessage::info("No supported files were selected."));
            }
            Ok(files) => {
                let added = state.add_files(files);
                state.status = Some(StatusMessage::info(format!("{added} file(s) selected.")));
            }
            Err(e) if e.is_cancelled() => debug!("file pick cancelled"),
            Err(e) => {
                warn!(error = %e, "file pick failed");
                state.status = Some(StatusMessage::error(format!(
                    "Error picking files: {}",
                    e.user_message()
                )));
            }
        }
        self.publish(&state)
    }

    /// Uploads the current selection as one batch.
    ///
    /// On success the selection is emptied. On failure it is kept and the
    /// status names the file that failed.
    pub async fn upload_selected(&self) -> ScreenSnapshot {
        let Some(endpoint) = self.endpoint.clone() else {
            let mut state = self.state.lock().await;
            state.status = Some(StatusMessage::error(
                "No upload endpoint is configured.",
            ));
            return self.publish(&state);
        };

        let mut orchestrator = BatchUploadOrchestrator::new(
            FileBlobResolver::new(self.caps.reader.clone()),
            self.transport.clone(),
            self.config.batch_config(),
        );
        let events_rx = orchestrator.take_events();

        let (files, batch_id) = {
            let mut state = self.state.lock().await;
            if state.is_uploading() || state.selection.is_empty() {
                return state.snapshot(true);
            }
            let batch_id = state.begin_upload(orchestrator.cancel_token());
            self.publish(&state);
            (state.selection.clone(), batch_id)
        };
        info!(files = files.len(), batch = batch_id, "upload requested");

        // Keep the handle so every event is applied before the final state.
        let forwarder = events_rx.map(|rx| {
            tokio::spawn(forward_events(
                rx,
                self.state.clone(),
                self.snapshots.clone(),
                batch_id,
            ))
        });

        let result = orchestrator.upload_batch(&files, &endpoint).await;

        drop(orchestrator);
        if let Some(handle) = forwarder {
            let _ = handle.await;
        }

        let mut state = self.state.lock().await;
        if !state.is_current_batch(batch_id) {
            debug!(batch = batch_id, "batch ended after the selection was cleared");
            return state.snapshot(true);
        }
        state.finish_upload();

        match result {
            BatchResult::Succeeded { count } => {
                state.selection.clear();
                state.progress = Some(100.0);
                state.status = Some(StatusMessage::success(format!("Uploaded {count} file(s).")));
            }
            BatchResult::Aborted(failure) => {
                state.progress = None;
                state.status = Some(StatusMessage::error(failure.user_message()));
            }
            BatchResult::Cancelled => {
                state.progress = None;
                state.status = None;
            }
        }
        self.publish(&state)
    }

    /// Cancels a running batch and empties selection, preview and progress.
    pub async fn clear_selection(&self) -> ScreenSnapshot {
        let mut state = self.state.lock().await;
        if let Some(cancel) = state.clear() {
            info!("cancelling running upload");
            cancel.cancel();
        }
        self.publish(&state)
    }

    fn publish(&self, state: &ScreenState) -> ScreenSnapshot {
        let snapshot = state.snapshot(self.endpoint.is_some());
        self.snapshots.send_replace(snapshot.clone());
        snapshot
    }
}

/// Applies orchestrator events to the screen until the batch ends.
async fn forward_events(
    mut rx: mpsc::Receiver<UploadEvent>,
    screen: Arc<Mutex<ScreenState>>,
    snapshots: Arc<watch::Sender<ScreenSnapshot>>,
    batch_id: u64,
) {
    let mut throttle = ProgressThrottle::default();

    while let Some(event) = rx.recv().await {
        let state = match event {
            UploadEvent::Progress { overall, .. } => {
                if !throttle.should_emit(overall) {
                    continue;
                }
                let mut state = screen.lock().await;
                if !state.is_current_batch(batch_id) {
                    continue;
                }
                state.progress = Some(overall);
                state
            }
            UploadEvent::Retrying {
                file_index,
                attempt,
                delay,
                batch_level,
                ..
            } => {
                let mut state = screen.lock().await;
                if !state.is_current_batch(batch_id) {
                    continue;
                }
                let name = state
                    .selection
                    .get(file_index)
                    .map(|f| f.name.clone())
                    .unwrap_or_default();
                let scope = if batch_level { "batch" } else { "upload" };
                state.status = Some(StatusMessage::info(format!(
                    "Retrying {scope} of \"{name}\" in {}s (retry {attempt}).",
                    delay.as_secs_f64().round()
                )));
                state
            }
            other => {
                trace!(event = ?other, "upload event");
                continue;
            }
        };
        // Uploading is always allowed here: only configured screens start batches.
        snapshots.send_replace(state.snapshot(true));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use snapdrop_device::{DeviceError, DeviceFuture, LocalFileReader};
    use snapdrop_protocol::{
        CameraPermissions, CapturedPhoto, PermissionKind, PermissionState, PhotoOptions,
        PickOptions, PickedFile, ResolvedPayload,
    };
    use snapdrop_uploader::{TransportError, TransportResponse};
    use std::collections::VecDeque;
    use std::future::Future;
    use std::pin::Pin;

    struct MockCamera {
        granted: bool,
        capture: std::sync::Mutex<Option<Result<CapturedPhoto, DeviceError>>>,
        /// When set, a capture waits for it before returning.
        shutter: Option<Arc<tokio::sync::Notify>>,
        capturing: std::sync::atomic::AtomicBool,
    }

    impl MockCamera {
        fn new(granted: bool, capture: Result<CapturedPhoto, DeviceError>) -> Self {
            Self {
                granted,
                capture: std::sync::Mutex::new(Some(capture)),
                shutter: None,
                capturing: std::sync::atomic::AtomicBool::new(false),
            }
        }

        fn held_open(shutter: Arc<tokio::sync::Notify>) -> Self {
            Self {
                shutter: Some(shutter),
                ..Self::new(true, Ok(photo()))
            }
        }

        fn perms(&self) -> CameraPermissions {
            let state = if self.granted {
                PermissionState::Granted
            } else {
                PermissionState::Denied
            };
            CameraPermissions {
                camera: state,
                photos: state,
            }
        }
    }

    impl Camera for MockCamera {
        fn check_permissions(&self) -> DeviceFuture<'_, CameraPermissions> {
            let perms = self.perms();
            Box::pin(async move { Ok(perms) })
        }

        fn request_permissions(
            &self,
            _kinds: Vec<PermissionKind>,
        ) -> DeviceFuture<'_, CameraPermissions> {
            let perms = self.perms();
            Box::pin(async move { Ok(perms) })
        }

        fn capture_photo(&self, _options: PhotoOptions) -> DeviceFuture<'_, CapturedPhoto> {
            let result = self
                .capture
                .lock()
                .unwrap()
                .take()
                .unwrap_or_else(|| Err(DeviceError::Cancelled));
            self.capturing
                .store(true, std::sync::atomic::Ordering::SeqCst);
            let shutter = self.shutter.clone();
            Box::pin(async move {
                if let Some(shutter) = shutter {
                    shutter.notified().await;
                }
                result
            })
        }
    }

    struct MockPicker {
        result: std::sync::Mutex<Option<Result<Vec<PickedFile>, DeviceError>>>,
    }

    impl FilePicker for MockPicker {
        fn pick_files(&self, _options: PickOptions) -> DeviceFuture<'_, Vec<PickedFile>> {
            let result = self
                .result
                .lock()
                .unwrap()
                .take()
                .unwrap_or_else(|| Err(DeviceError::Cancelled));
            Box::pin(async move { result })
        }
    }

    #[derive(Default)]
    struct MockTransport {
        script: std::sync::Mutex<VecDeque<Result<(), TransportError>>>,
        sent: std::sync::Mutex<Vec<String>>,
        hang: bool,
    }

    impl UploadTransport for MockTransport {
        fn send<'a>(
            &'a self,
            payload: &'a ResolvedPayload,
            _endpoint: &'a Url,
            on_progress: &'a (dyn Fn(f64) + Send + Sync),
        ) -> Pin<Box<dyn Future<Output = Result<TransportResponse, TransportError>> + Send + 'a>>
        {
            Box::pin(async move {
                self.sent.lock().unwrap().push(payload.name.clone());
                on_progress(0.0);
                if self.hang {
                    std::future::pending::<()>().await;
                }
                let outcome = self.script.lock().unwrap().pop_front().unwrap_or(Ok(()));
                outcome?;
                on_progress(100.0);
                Ok(TransportResponse {
                    status: 200,
                    body: String::new(),
                })
            })
        }
    }

    fn photo() -> CapturedPhoto {
        CapturedPhoto {
            data_url: Some("data:image/jpeg;base64,/9j/4AAQ".into()),
            format: "jpeg".into(),
            width: Some(640),
            height: Some(480),
        }
    }

    fn config(endpoint: &str) -> WelcomeConfig {
        WelcomeConfig {
            endpoint: endpoint.into(),
            ..Default::default()
        }
    }

    struct Fixture {
        camera: Result<CapturedPhoto, DeviceError>,
        granted: bool,
        picked: Result<Vec<PickedFile>, DeviceError>,
        transport: Arc<MockTransport>,
        endpoint: &'static str,
    }

    impl Default for Fixture {
        fn default() -> Self {
            Self {
                camera: Ok(photo()),
                granted: true,
                picked: Ok(Vec::new()),
                transport: Arc::new(MockTransport::default()),
                endpoint: "https://upload.example.com/files",
            }
        }
    }

    impl Fixture {
        fn build(self) -> (WelcomeScreen, Arc<MockTransport>) {
            let caps = Capabilities {
                camera: Arc::new(MockCamera::new(self.granted, self.camera)),
                picker: Arc::new(MockPicker {
                    result: std::sync::Mutex::new(Some(self.picked)),
                }),
                reader: Arc::new(LocalFileReader::new()),
            };
            let screen = WelcomeScreen::new(config(self.endpoint), caps, self.transport.clone());
            (screen, self.transport)
        }
    }

    fn text_files() -> Vec<PickedFile> {
        vec![
            PickedFile::inline(b"first".to_vec())
                .with_name("a.txt")
                .with_mime_type("text/plain"),
            PickedFile::inline(b"second".to_vec())
                .with_name("b.txt")
                .with_mime_type("text/plain"),
        ]
    }

    #[tokio::test]
    async fn photo_is_previewed_and_selected() {
        let (screen, _) = Fixture::default().build();
        let snap = screen.take_photo().await;

        assert_eq!(snap.selected_files.len(), 1);
        assert_eq!(snap.selected_files[0].name, "photo-1.jpeg");
        assert_eq!(snap.selected_files[0].mime_type, "image/jpeg");
        assert!(snap.preview_data_url.is_some());
        assert!(snap.can_upload);
    }

    #[tokio::test]
    async fn cancelled_photo_is_silent() {
        let (screen, _) = Fixture {
            camera: Err(DeviceError::from_plugin("User cancelled photos app")),
            ..Default::default()
        }
        .build();
        let snap = screen.take_photo().await;
        assert!(snap.status.is_none());
        assert!(snap.selected_files.is_empty());
    }

    #[tokio::test]
    async fn denied_camera_points_to_settings() {
        let (screen, _) = Fixture {
            granted: false,
            ..Default::default()
        }
        .build();
        let snap = screen.take_photo().await;
        let status = snap.status.unwrap();
        assert_eq!(status.level, crate::state::StatusLevel::Error);
        assert!(status.text.contains("settings"));
        assert!(snap.selected_files.is_empty());
    }

    #[tokio::test]
    async fn picked_files_are_filtered_and_appended() {
        let mut picked = text_files();
        picked.push(
            PickedFile::inline(vec![0u8])
                .with_name("archive.zip")
                .with_mime_type("application/zip"),
        );
        let (screen, _) = Fixture {
            picked: Ok(picked),
            ..Default::default()
        }
        .build();

        let snap = screen.pick_files().await;
        let names: Vec<_> = snap.selected_files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["a.txt", "b.txt"]);
        assert_eq!(snap.status.unwrap().text, "2 file(s) selected.");
    }

    #[tokio::test]
    async fn cancelled_pick_is_silent() {
        let (screen, _) = Fixture {
            picked: Err(DeviceError::Cancelled),
            ..Default::default()
        }
        .build();
        let snap = screen.pick_files().await;
        assert!(snap.status.is_none());
    }

    #[tokio::test]
    async fn successful_upload_clears_the_selection() {
        let (screen, transport) = Fixture {
            picked: Ok(text_files()),
            ..Default::default()
        }
        .build();
        let updates = screen.subscribe();

        screen.pick_files().await;
        let snap = screen.upload_selected().await;

        assert_eq!(*transport.sent.lock().unwrap(), vec!["a.txt", "b.txt"]);
        assert!(snap.selected_files.is_empty());
        assert!(!snap.uploading);
        assert_eq!(snap.progress, Some(100.0));
        assert_eq!(snap.status.as_ref().unwrap().text, "Uploaded 2 file(s).");
        assert_eq!(*updates.borrow(), snap);
    }

    #[tokio::test]
    async fn failed_upload_names_the_file_and_keeps_the_selection() {
        let transport = Arc::new(MockTransport {
            script: std::sync::Mutex::new(VecDeque::from([Err(TransportError::MethodNotAllowed)])),
            ..Default::default()
        });
        let (screen, _) = Fixture {
            picked: Ok(text_files()),
            transport,
            ..Default::default()
        }
        .build();

        screen.pick_files().await;
        let snap = screen.upload_selected().await;

        let status = snap.status.unwrap();
        assert_eq!(status.level, crate::state::StatusLevel::Error);
        assert!(status.text.contains("a.txt"));
        assert!(status.text.contains("405"));
        assert_eq!(snap.selected_files.len(), 2);
        assert!(snap.can_upload);
    }

    #[tokio::test]
    async fn missing_endpoint_disables_upload() {
        let (screen, transport) = Fixture {
            picked: Ok(text_files()),
            endpoint: "",
            ..Default::default()
        }
        .build();

        let snap = screen.pick_files().await;
        assert!(!snap.can_upload);

        let snap = screen.upload_selected().await;
        assert!(snap.status.unwrap().text.contains("endpoint"));
        assert!(transport.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_selection_does_not_upload() {
        let (screen, transport) = Fixture::default().build();
        let snap = screen.upload_selected().await;
        assert!(!snap.uploading);
        assert!(transport.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn clear_cancels_a_running_upload() {
        let transport = Arc::new(MockTransport {
            hang: true,
            ..Default::default()
        });
        let (screen, transport) = Fixture {
            picked: Ok(text_files()),
            transport,
            ..Default::default()
        }
        .build();
        let screen = Arc::new(screen);
        screen.pick_files().await;

        let upload = tokio::spawn({
            let screen = screen.clone();
            async move { screen.upload_selected().await }
        });
        while transport.sent.lock().unwrap().is_empty() {
            tokio::task::yield_now().await;
        }

        let cleared = screen.clear_selection().await;
        assert!(cleared.selected_files.is_empty());
        assert!(!cleared.uploading);

        let after = upload.await.unwrap();
        assert!(after.selected_files.is_empty());
        assert!(after.status.is_none());
        assert_eq!(*transport.sent.lock().unwrap(), vec!["a.txt"]);
    }

    #[tokio::test]
    async fn photo_finished_after_upload_started_is_not_queued() {
        let shutter = Arc::new(tokio::sync::Notify::new());
        let camera = Arc::new(MockCamera::held_open(shutter.clone()));
        let transport = Arc::new(MockTransport {
            hang: true,
            ..Default::default()
        });
        let caps = Capabilities {
            camera: camera.clone(),
            picker: Arc::new(MockPicker {
                result: std::sync::Mutex::new(Some(Ok(text_files()))),
            }),
            reader: Arc::new(LocalFileReader::new()),
        };
        let screen = Arc::new(WelcomeScreen::new(
            config("https://upload.example.com/files"),
            caps,
            transport.clone(),
        ));
        screen.pick_files().await;

        let capture = tokio::spawn({
            let screen = screen.clone();
            async move { screen.take_photo().await }
        });
        while !camera.capturing.load(std::sync::atomic::Ordering::SeqCst) {
            tokio::task::yield_now().await;
        }

        let upload = tokio::spawn({
            let screen = screen.clone();
            async move { screen.upload_selected().await }
        });
        while transport.sent.lock().unwrap().is_empty() {
            tokio::task::yield_now().await;
        }

        shutter.notify_one();
        let snap = capture.await.unwrap();
        assert!(snap.uploading);
        let names: Vec<_> = snap.selected_files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["a.txt", "b.txt"]);
        assert!(snap.preview_data_url.is_none());

        screen.clear_selection().await;
        upload.await.unwrap();
    }

    #[tokio::test]
    async fn with_http_builds_from_config() {
        let caps = Capabilities {
            camera: Arc::new(MockCamera::new(true, Ok(photo()))),
            picker: Arc::new(MockPicker {
                result: std::sync::Mutex::new(None),
            }),
            reader: Arc::new(LocalFileReader::new()),
        };
        let screen =
            WelcomeScreen::with_http(config("http://127.0.0.1:9/upload"), caps).unwrap();
        assert_eq!(screen.config().field_name, "file");
        assert!(!screen.snapshot().await.uploading);
    }
}
