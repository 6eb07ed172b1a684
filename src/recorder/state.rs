//! Recording status types, session options and the observable state handle.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;

use crate::compositor::PipOptions;
use crate::config::RecordingConfig;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordingStatus {
    #[default]
    Idle,
    Preparing,
    Recording,
    Paused,
    Stopping,
    Error,
}

impl RecordingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Preparing => "preparing",
            Self::Recording => "recording",
            Self::Paused => "paused",
            Self::Stopping => "stopping",
            Self::Error => "error",
        }
    }

    /// A session exists that holds (or is acquiring) media.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            Self::Preparing | Self::Recording | Self::Paused | Self::Stopping
        )
    }
}

impl std::fmt::Display for RecordingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the UI renders. One per recorder.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingState {
    pub status: RecordingStatus,
    pub duration_seconds: u64,
    pub error_message: Option<String>,
}

/// Fixed for the lifetime of one session, set at `prepare` time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RecordingOptions {
    pub video_device_id: Option<String>,
    pub audio_device_id: Option<String>,
    pub frame_rate: u32,
    pub pip_size_ratio: f32,
    pub pip_margin_px: u32,
}

impl Default for RecordingOptions {
    fn default() -> Self {
        Self {
            video_device_id: None,
            audio_device_id: None,
            frame_rate: 30,
            pip_size_ratio: 0.15,
            pip_margin_px: 20,
        }
    }
}

impl RecordingOptions {
    pub fn from_config(config: &RecordingConfig) -> Self {
        Self {
            frame_rate: config.frame_rate,
            pip_size_ratio: config.pip_size_ratio,
            pip_margin_px: config.pip_margin_px,
            ..Self::default()
        }
    }

    pub fn with_camera(mut self, device_id: impl Into<String>) -> Self {
        self.video_device_id = Some(device_id.into());
        self
    }

    pub fn with_microphone(mut self, device_id: impl Into<String>) -> Self {
        self.audio_device_id = Some(device_id.into());
        self
    }

    pub fn pip_options(&self) -> PipOptions {
        PipOptions {
            size_ratio: self.pip_size_ratio,
            margin_px: self.pip_margin_px,
        }
    }
}

/// Wall-clock recording time minus paused spans.
#[derive(Debug, Clone, Copy)]
pub struct DurationClock {
    started_at: Instant,
    paused_total: Duration,
    paused_at: Option<Instant>,
}

impl DurationClock {
    pub fn start(now: Instant) -> Self {
        Self {
            started_at: now,
            paused_total: Duration::ZERO,
            paused_at: None,
        }
    }

    pub fn pause(&mut self, now: Instant) {
        if self.paused_at.is_none() {
            self.paused_at = Some(now);
        }
    }

    pub fn resume(&mut self, now: Instant) {
        if let Some(paused_at) = self.paused_at.take() {
            self.paused_total += now.saturating_duration_since(paused_at);
        }
    }

    pub fn elapsed_seconds(&self, now: Instant) -> u64 {
        let until = self.paused_at.unwrap_or(now);
        until
            .saturating_duration_since(self.started_at)
            .saturating_sub(self.paused_total)
            .as_secs()
    }
}

/// Publish-subscribe handle for the recorder state.
#[derive(Clone)]
pub struct RecordingStateHandle {
    tx: Arc<watch::Sender<RecordingState>>,
}

impl Default for RecordingStateHandle {
    fn default() -> Self {
        let (tx, _rx) = watch::channel(RecordingState::default());
        Self { tx: Arc::new(tx) }
    }
}

impl RecordingStateHandle {
    pub fn get(&self) -> RecordingState {
        self.tx.borrow().clone()
    }

    pub fn status(&self) -> RecordingStatus {
        self.tx.borrow().status
    }

    pub fn subscribe(&self) -> watch::Receiver<RecordingState> {
        self.tx.subscribe()
    }

    pub fn set_status(&self, status: RecordingStatus) {
        self.tx.send_if_modified(|state| {
            if state.status == status {
                return false;
            }
            state.status = status;
            if status != RecordingStatus::Error {
                state.error_message = None;
            }
            true
        });
    }

    pub fn set_duration(&self, duration_seconds: u64) {
        self.tx.send_if_modified(|state| {
            if state.duration_seconds == duration_seconds {
                return false;
            }
            state.duration_seconds = duration_seconds;
            true
        });
    }

    pub fn set_error(&self, message: impl Into<String>) {
        let message = message.into();
        self.tx.send_modify(|state| {
            state.status = RecordingStatus::Error;
            state.error_message = Some(message);
        });
    }

    pub fn reset(&self) {
        self.tx.send_replace(RecordingState::default());
    }
}
