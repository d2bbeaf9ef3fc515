//! Screen configuration.
//!
//! Read from `<config dir>/snapdrop/config.json` at start-up. Every field
//! is optional; the upload endpoint can also come from
//! `SNAPDROP_UPLOAD_ENDPOINT`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use snapdrop_protocol::PhotoOptions;
use snapdrop_protocol::constants::{DEFAULT_FIELD_NAME, DEFAULT_MAX_ATTEMPTS, DEFAULT_PHOTO_QUALITY};
use snapdrop_transfer::RetryPolicy;
use snapdrop_uploader::{BatchConfig, Url};

/// Environment variable overriding [`WelcomeConfig::endpoint`].
pub const ENDPOINT_ENV: &str = "SNAPDROP_UPLOAD_ENDPOINT";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WelcomeConfig {
    /// Absolute `http(s)` URL receiving the multipart POSTs. Empty disables
    /// uploading.
    pub endpoint: String,
    pub field_name: String,
    /// Retries of a single file.
    pub max_attempts: u32,
    pub file_retry_base_ms: u64,
    /// Resumptions of a batch after a file ran out of retries.
    pub batch_max_retries: u32,
    pub batch_retry_base_ms: u64,
    /// 0 disables the timeout.
    pub request_timeout_secs: u64,
    /// MIME patterns offered to the picker.
    pub accepted_types: Vec<String>,
    pub photo_quality: u8,
}

impl Default for WelcomeConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            field_name: DEFAULT_FIELD_NAME.into(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            file_retry_base_ms: 1000,
            batch_max_retries: DEFAULT_MAX_ATTEMPTS,
            batch_retry_base_ms: 2000,
            request_timeout_secs: 120,
            accepted_types: vec![
                "image/*".into(),
                "application/pdf".into(),
                "text/*".into(),
            ],
            photo_quality: DEFAULT_PHOTO_QUALITY,
        }
    }
}

impl WelcomeConfig {
    /// Loads the configuration file and applies the environment override.
    pub fn load() -> anyhow::Result<Self> {
        let config = Self::load_from(&config_path()?)?;
        Ok(config.with_endpoint_override(std::env::var(ENDPOINT_ENV).ok()))
    }

    /// Loads `path`. A missing file yields the defaults; an unparsable one
    /// is logged and also yields the defaults.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        match serde_json::from_str::<WelcomeConfig>(&content) {
            Ok(config) => {
                tracing::debug!(path = %path.display(), "configuration loaded");
                Ok(config)
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse configuration, using defaults"
                );
                Ok(Self::default())
            }
        }
    }

    /// Replaces the endpoint with `value` when it is set and not blank.
    pub fn with_endpoint_override(mut self, value: Option<String>) -> Self {
        if let Some(value) = value
            && !value.trim().is_empty()
        {
            self.endpoint = value.trim().to_string();
        }
        self
    }

    /// Parses and checks the upload endpoint.
    pub fn endpoint_url(&self) -> anyhow::Result<Url> {
        let endpoint = self.endpoint.trim();
        anyhow::ensure!(!endpoint.is_empty(), "no upload endpoint configured");

        let url = Url::parse(endpoint).with_context(|| format!("invalid endpoint {endpoint:?}"))?;
        anyhow::ensure!(
            matches!(url.scheme(), "http" | "https"),
            "endpoint must use http or https, got {}",
            url.scheme()
        );
        anyhow::ensure!(url.host_str().is_some(), "endpoint has no host");
        Ok(url)
    }

    pub fn batch_config(&self) -> BatchConfig {
        BatchConfig {
            file_retry: RetryPolicy::new(
                self.max_attempts,
                Duration::from_millis(self.file_retry_base_ms),
            ),
            batch_retry: RetryPolicy::new(
                self.batch_max_retries,
                Duration::from_millis(self.batch_retry_base_ms),
            ),
        }
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_secs > 0).then(|| Duration::from_secs(self.request_timeout_secs))
    }

    pub fn photo_options(&self) -> PhotoOptions {
        PhotoOptions {
            quality: self.photo_quality.min(100),
            ..PhotoOptions::default()
        }
    }
}

/// `<config dir>/snapdrop/config.json`.
pub fn config_path() -> anyhow::Result<PathBuf> {
    Ok(config_base_dir()?.join("snapdrop").join("config.json"))
}

fn config_base_dir() -> anyhow::Result<PathBuf> {
    #[cfg(target_os = "linux")]
    {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
        Ok(PathBuf::from(home).join(".config"))
    }

    #[cfg(target_os = "windows")]
    {
        let appdata =
            std::env::var("APPDATA").unwrap_or_else(|_| "C:\\Users\\Default\\AppData".into());
        Ok(PathBuf::from(appdata))
    }

    #[cfg(not(any(target_os = "linux", target_os = "windows")))]
    {
        Ok(PathBuf::from("/tmp"))
    }
}
