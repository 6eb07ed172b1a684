//! Wiring from configuration to the long-lived services.

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

use crate::capture::MediaHost;
use crate::compositor::DrawingSurface;
use crate::config::Config;
use crate::library::RecordingLibrary;
use crate::poller::StatusPoller;
use crate::recorder::{EncoderFactory, RecorderDeps, RecordingOptions};
use crate::store::{RecordingStore, SqliteRecordingStore};
use crate::upload::{transport_from_config, Transport};

pub struct App {
    config: Config,
    store: Arc<dyn RecordingStore>,
    transport: Arc<dyn Transport>,
}

impl App {
    /// Load the config file and open the default database.
    pub fn load() -> Result<Self> {
        let config = Config::load()?;
        let store = SqliteRecordingStore::open_default().context("Failed to open recordings database")?;
        Self::new(config, Arc::new(store))
    }

    pub fn new(config: Config, store: Arc<dyn RecordingStore>) -> Result<Self> {
        let transport = transport_from_config(&config.upload)
            .context("Cannot talk to the video host")?;
        info!("Using {} upload transport", transport.name());

        Ok(Self {
            config,
            store,
            transport,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn library(&self) -> RecordingLibrary {
        RecordingLibrary::new(
            Arc::clone(&self.store),
            Arc::clone(&self.transport),
            self.config.upload.embed_base_url.clone(),
        )
    }

    pub fn poller(&self) -> StatusPoller {
        StatusPoller::new(Arc::clone(&self.store), Arc::clone(&self.transport))
            .with_interval(self.config.poller.interval())
    }

    /// Default options for a new session, before device selection.
    pub fn recording_options(&self) -> RecordingOptions {
        RecordingOptions::from_config(&self.config.recording)
    }

    /// Bundle host facilities with the configured chunk cadence.
    pub fn recorder_deps(
        &self,
        media: Arc<dyn MediaHost>,
        surface: Arc<dyn DrawingSurface>,
        encoders: Arc<dyn EncoderFactory>,
    ) -> RecorderDeps {
        RecorderDeps {
            media,
            surface,
            encoders,
            chunk_interval: self.config.recording.chunk_interval(),
        }
    }
}
