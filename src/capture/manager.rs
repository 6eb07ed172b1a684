//! Ownership of the camera, microphone and canvas streams of one recorder.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::media::{MediaConstraints, MediaError, MediaHost, MediaStream, MediaTrack};

#[derive(Default)]
pub struct CapturedStreams {
    pub camera: Option<MediaStream>,
    pub microphone: Option<MediaStream>,
    pub canvas: Option<MediaStream>,
}

impl CapturedStreams {
    fn live_track_count(&self) -> usize {
        [&self.camera, &self.microphone, &self.canvas]
            .into_iter()
            .flatten()
            .map(MediaStream::live_track_count)
            .sum()
    }
}

pub struct MediaCaptureManager {
    host: Arc<dyn MediaHost>,
    streams: Mutex<CapturedStreams>,
}

impl MediaCaptureManager {
    pub fn new(host: Arc<dyn MediaHost>) -> Self {
        Self {
            host,
            streams: Mutex::new(CapturedStreams::default()),
        }
    }

    /// Acquire the camera at 640x480 (ideal). No automatic retry.
    ///
    /// If `cancel` fires while the host is still asking for permission the
    /// stream is stopped as soon as it arrives and never stored.
    pub async fn acquire_camera(
        &self,
        device_id: &str,
        cancel: &CancellationToken,
    ) -> Result<(), MediaError> {
        let stream = self
            .host
            .get_user_media(&MediaConstraints::camera(Some(device_id)))
            .await
            .map_err(|e| MediaError::CameraAccess(e.to_string()))?;

        info!("Camera acquired: {:?}", stream);
        self.store(stream, cancel, |streams| &mut streams.camera)
    }

    /// Acquire the microphone with echo cancellation and noise suppression.
    pub async fn acquire_microphone(
        &self,
        device_id: &str,
        cancel: &CancellationToken,
    ) -> Result<(), MediaError> {
        let stream = self
            .host
            .get_user_media(&MediaConstraints::microphone(Some(device_id)))
            .await
            .map_err(|e| MediaError::MicrophoneAccess(e.to_string()))?;

        info!("Microphone acquired: {:?}", stream);
        self.store(stream, cancel, |streams| &mut streams.microphone)
    }

    /// The cancellation check happens under the lock `release_all` takes,
    /// so a stream is either stored before the release or never stored.
    fn store(
        &self,
        stream: MediaStream,
        cancel: &CancellationToken,
        slot: impl FnOnce(&mut CapturedStreams) -> &mut Option<MediaStream>,
    ) -> Result<(), MediaError> {
        let mut streams = self.lock();
        if cancel.is_cancelled() {
            drop(streams);
            debug!("Stream arrived after cancellation, stopping it");
            stream.stop_all();
            return Err(MediaError::Cancelled);
        }
        if let Some(previous) = slot(&mut *streams).replace(stream) {
            previous.stop_all();
        }
        Ok(())
    }

    pub fn attach_canvas(&self, stream: MediaStream) {
        if let Some(previous) = self.lock().canvas.replace(stream) {
            previous.stop_all();
        }
    }

    pub fn camera_track(&self) -> Option<Arc<dyn MediaTrack>> {
        self.lock().camera.as_ref().and_then(MediaStream::video_track)
    }

    pub fn microphone_track(&self) -> Option<Arc<dyn MediaTrack>> {
        self.lock()
            .microphone
            .as_ref()
            .and_then(MediaStream::audio_track)
    }

    pub fn live_track_count(&self) -> usize {
        self.lock().live_track_count()
    }

    /// Stop every track and forget the streams. Safe to call repeatedly.
    pub fn release_all(&self) {
        let streams = std::mem::take(&mut *self.lock());
        let live = streams.live_track_count();

        for stream in [streams.camera, streams.microphone, streams.canvas]
            .into_iter()
            .flatten()
        {
            stream.stop_all();
        }

        if live > 0 {
            info!("Released captured media ({} live tracks stopped)", live);
        }
    }

    fn lock(&self) -> MutexGuard<'_, CapturedStreams> {
        self.streams.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for MediaCaptureManager {
    fn drop(&mut self) {
        self.release_all();
    }
}
