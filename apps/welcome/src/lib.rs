//! SnapDrop welcome screen.
//!
//! The host shell supplies the device [`Capabilities`], calls [`start`] once
//! and then drives the returned [`WelcomeScreen`] from its buttons.

mod config;
mod controller;
mod state;

use tracing_subscriber::EnvFilter;

pub use config::{ENDPOINT_ENV, WelcomeConfig, config_path};
pub use controller::{Capabilities, WelcomeScreen};
pub use state::{ScreenSnapshot, SelectedFileView, StatusLevel, StatusMessage};

/// Installs the `tracing` subscriber. `RUST_LOG` overrides the default
/// filter. Calling it again is a no-op.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,snapdrop=debug")),
        )
        .try_init();
}

/// Loads the configuration and builds the screen with the HTTP transport.
pub fn start(caps: Capabilities) -> anyhow::Result<WelcomeScreen> {
    init_logging();

    let config = WelcomeConfig::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to load configuration, using defaults");
        WelcomeConfig::default()
    });
    WelcomeScreen::with_http(config, caps)
}
