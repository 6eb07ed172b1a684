//! Media handles shared by capture, compositing and recording.
//!
//! The host platform (browser shell, native webview, test harness) implements
//! [`MediaHost`] and hands out [`MediaTrack`]s. Everything above this module
//! only sees these handles.

use async_trait::async_trait;
use image::RgbaImage;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// A single decoded video frame, shared between producer and consumers.
pub type VideoFrame = Arc<RgbaImage>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    VideoInput,
    AudioInput,
}

impl DeviceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceKind::VideoInput => "videoinput",
            DeviceKind::AudioInput => "audioinput",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackKind {
    Video,
    Audio,
}

/// Raw device record as reported by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaDeviceInfo {
    pub device_id: String,
    pub kind: DeviceKind,
    pub label: String,
}

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("No matching device: {0}")]
    NotFound(String),

    #[error("Media host error: {0}")]
    Host(String),

    #[error("Camera access failed, check permissions ({0})")]
    CameraAccess(String),

    #[error("Microphone access failed, check permissions ({0})")]
    MicrophoneAccess(String),

    #[error("Media acquisition was cancelled")]
    Cancelled,
}

/// A live source of media owned by whoever holds the handle.
pub trait MediaTrack: Send + Sync {
    fn kind(&self) -> TrackKind;

    fn label(&self) -> String;

    /// False once the track has been stopped or the device went away.
    fn is_live(&self) -> bool;

    /// Stop producing media. Must be idempotent.
    fn stop(&self);

    /// Most recent frame of a video track, `None` until the first one arrives.
    fn latest_frame(&self) -> Option<VideoFrame> {
        None
    }
}

/// An owned bundle of tracks.
#[derive(Clone, Default)]
pub struct MediaStream {
    tracks: Vec<Arc<dyn MediaTrack>>,
}

impl MediaStream {
    pub fn new(tracks: Vec<Arc<dyn MediaTrack>>) -> Self {
        Self { tracks }
    }

    pub fn add_track(&mut self, track: Arc<dyn MediaTrack>) {
        self.tracks.push(track);
    }

    pub fn tracks(&self) -> &[Arc<dyn MediaTrack>] {
        &self.tracks
    }

    pub fn video_track(&self) -> Option<Arc<dyn MediaTrack>> {
        self.first_of(TrackKind::Video)
    }

    pub fn audio_track(&self) -> Option<Arc<dyn MediaTrack>> {
        self.first_of(TrackKind::Audio)
    }

    pub fn has_audio(&self) -> bool {
        self.tracks.iter().any(|t| t.kind() == TrackKind::Audio)
    }

    pub fn live_track_count(&self) -> usize {
        self.tracks.iter().filter(|t| t.is_live()).count()
    }

    pub fn stop_all(&self) {
        for track in &self.tracks {
            track.stop();
        }
    }

    fn first_of(&self, kind: TrackKind) -> Option<Arc<dyn MediaTrack>> {
        self.tracks.iter().find(|t| t.kind() == kind).cloned()
    }
}

impl std::fmt::Debug for MediaStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let labels: Vec<String> = self.tracks.iter().map(|t| t.label()).collect();
        f.debug_struct("MediaStream").field("tracks", &labels).finish()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VideoConstraints {
    pub device_id: Option<String>,
    pub ideal_width: u32,
    pub ideal_height: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AudioConstraints {
    pub device_id: Option<String>,
    pub echo_cancellation: bool,
    pub noise_suppression: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MediaConstraints {
    pub video: Option<VideoConstraints>,
    pub audio: Option<AudioConstraints>,
}

impl MediaConstraints {
    pub fn camera(device_id: Option<&str>) -> Self {
        Self {
            video: Some(VideoConstraints {
                device_id: device_id.map(str::to_string),
                ideal_width: 640,
                ideal_height: 480,
            }),
            audio: None,
        }
    }

    pub fn microphone(device_id: Option<&str>) -> Self {
        Self {
            video: None,
            audio: Some(AudioConstraints {
                device_id: device_id.map(str::to_string),
                echo_cancellation: true,
                noise_suppression: true,
            }),
        }
    }

    /// Any device of the given kind; used to unlock device labels.
    pub fn probe(kind: DeviceKind) -> Self {
        match kind {
            DeviceKind::VideoInput => Self::camera(None),
            DeviceKind::AudioInput => Self::microphone(None),
        }
    }
}

/// Capture facilities provided by the host platform.
#[async_trait]
pub trait MediaHost: Send + Sync {
    async fn enumerate_devices(&self) -> Result<Vec<MediaDeviceInfo>, MediaError>;

    async fn get_user_media(&self, constraints: &MediaConstraints)
        -> Result<MediaStream, MediaError>;
}
