//! Single-file multipart upload.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use bytes::Bytes;
use futures_util::StreamExt;
use reqwest::Url;
use reqwest::multipart::{Form, Part};
use snapdrop_protocol::ResolvedPayload;
use snapdrop_protocol::constants::DEFAULT_FIELD_NAME;
use tokio::sync::mpsc;
use tracing::debug;

use crate::error::TransportError;

/// Default size of the body slices whose delivery drives progress.
const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Progress callback receiving the percentage (0–100) of the current file.
pub type ProgressFn<'a> = &'a (dyn Fn(f64) + Send + Sync);

/// Successful server answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

/// Sends one resolved file to the upload endpoint.
///
/// Implementations report monotonically non-decreasing progress through
/// `on_progress` and return a 2xx answer, or the error describing why none
/// was obtained.
pub trait UploadTransport: Send + Sync {
    fn send<'a>(
        &'a self,
        payload: &'a ResolvedPayload,
        endpoint: &'a Url,
        on_progress: ProgressFn<'a>,
    ) -> Pin<Box<dyn Future<Output = Result<TransportResponse, TransportError>> + Send + 'a>>;
}

/// `multipart/form-data` POST over `reqwest`.
///
/// The file is the single form part named `field_name`, carrying the
/// payload's file name and media type.
pub struct HttpTransport {
    http: reqwest::Client,
    field_name: String,
    chunk_size: usize,
}

impl HttpTransport {
    /// Creates a transport. `timeout` bounds each request end to end.
    pub fn new(timeout: Option<Duration>) -> Result<Self, TransportError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            http: builder.build()?,
            field_name: DEFAULT_FIELD_NAME.to_string(),
            chunk_size: DEFAULT_CHUNK_SIZE,
        })
    }

    /// Sets the form field name; blank names keep the default.
    pub fn with_field_name(mut self, name: impl AsRef<str>) -> Self {
        let name = name.as_ref().trim();
        if !name.is_empty() {
            self.field_name = name.to_string();
        }
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    async fn post(
        &self,
        payload: &ResolvedPayload,
        endpoint: &Url,
        on_progress: ProgressFn<'_>,
    ) -> Result<TransportResponse, TransportError> {
        let total = payload.bytes.len() as u64;
        let (sent_tx, mut sent_rx) = mpsc::unbounded_channel::<u64>();

        let body = progress_body(payload.bytes.clone(), self.chunk_size, sent_tx);
        let part = Part::stream_with_length(body, total)
            .file_name(payload.name.clone())
            .mime_str(&payload.mime_type)
            .map_err(|e| TransportError::InvalidRequest(e.to_string()))?;
        let form = Form::new().part(self.field_name.clone(), part);

        debug!(url = %endpoint, file = %payload.name, bytes = total, "posting file");

        let mut reporter = PercentReporter::new(total, on_progress);
        reporter.report(0);

        let request = self.http.post(endpoint.clone()).multipart(form).send();
        tokio::pin!(request);

        let result = loop {
            tokio::select! {
                Some(sent) = sent_rx.recv() => reporter.report(sent),
                result = &mut request => break result,
            }
        };
        while let Ok(sent) = sent_rx.try_recv() {
            reporter.report(sent);
        }

        let response = result?;
        let status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                debug!(status = status.as_u16(), error = %e, "failed to read response body");
                String::new()
            }
        };

        if !status.is_success() {
            return Err(TransportError::from_status(status.as_u16(), body));
        }

        reporter.finish();
        Ok(TransportResponse {
            status: status.as_u16(),
            body,
        })
    }
}

impl UploadTransport for HttpTransport {
    fn send<'a>(
        &'a self,
        payload: &'a ResolvedPayload,
        endpoint: &'a Url,
        on_progress: ProgressFn<'a>,
    ) -> Pin<Box<dyn Future<Output = Result<TransportResponse, TransportError>> + Send + 'a>> {
        Box::pin(self.post(payload, endpoint, on_progress))
    }
}

/// Streams `data` in slices, reporting the cumulative byte count of each
/// slice as the client pulls it.
fn progress_body(data: Bytes, chunk_size: usize, sent: mpsc::UnboundedSender<u64>) -> reqwest::Body {
    let total = data.len();
    let chunk_size = chunk_size.max(1);
    let stream = futures_util::stream::iter((0..total).step_by(chunk_size)).map(move |start| {
        let end = (start + chunk_size).min(total);
        let _ = sent.send(end as u64);
        Ok::<Bytes, std::io::Error>(data.slice(start..end))
    });
    reqwest::Body::wrap_stream(stream)
}

/// Converts byte counts to percentages and drops anything that would move
/// backwards or repeat.
struct PercentReporter<'a> {
    total: u64,
    last: Option<f64>,
    on_progress: ProgressFn<'a>,
}

impl<'a> PercentReporter<'a> {
    fn new(total: u64, on_progress: ProgressFn<'a>) -> Self {
        Self {
            total,
            last: None,
            on_progress,
        }
    }

    fn report(&mut self, sent: u64) {
        let percent = if self.total == 0 {
            0.0
        } else {
            (sent as f64 / self.total as f64 * 100.0).min(100.0)
        };
        self.emit(percent);
    }

    fn finish(&mut self) {
        self.emit(100.0);
    }

    fn emit(&mut self, percent: f64) {
        if self.last.is_none_or(|last| percent > last) {
            self.last = Some(percent);
            (self.on_progress)(percent);
        }
    }
}
