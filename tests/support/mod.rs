//! Stand-ins for the host: camera/microphone, drawing surface and encoder.

#![allow(dead_code)]

use async_trait::async_trait;
use image::{Rgba, RgbaImage};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, Notify};

use talktrack::capture::{
    DeviceKind, MediaConstraints, MediaDeviceInfo, MediaError, MediaHost, MediaStream, MediaTrack,
    TrackKind, VideoFrame,
};
use talktrack::compositor::DrawingSurface;
use talktrack::recorder::{
    EncoderError, EncoderEvent, EncoderFactory, RecorderDeps, StreamEncoder,
};

pub fn solid_frame(width: u32, height: u32, color: [u8; 4]) -> VideoFrame {
    Arc::new(RgbaImage::from_pixel(width, height, Rgba(color)))
}

pub struct FakeTrack {
    kind: TrackKind,
    label: String,
    live: AtomicBool,
    frame: Option<VideoFrame>,
}

impl FakeTrack {
    pub fn new(kind: TrackKind, label: &str, frame: Option<VideoFrame>) -> Arc<Self> {
        Arc::new(Self {
            kind,
            label: label.to_string(),
            live: AtomicBool::new(true),
            frame,
        })
    }
}

impl MediaTrack for FakeTrack {
    fn kind(&self) -> TrackKind {
        self.kind
    }

    fn label(&self) -> String {
        self.label.clone()
    }

    fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }

    fn stop(&self) {
        self.live.store(false, Ordering::SeqCst);
    }

    fn latest_frame(&self) -> Option<VideoFrame> {
        if self.is_live() {
            self.frame.clone()
        } else {
            None
        }
    }
}

/// Camera and microphone that remember every track they handed out.
#[derive(Default)]
pub struct FakeMediaHost {
    pub devices: Vec<MediaDeviceInfo>,
    pub deny: bool,
    pub fail_enumeration: bool,
    /// When set, `get_user_media` waits for a notification before answering.
    pub gate: Option<Arc<Notify>>,
    issued: Mutex<Vec<Arc<FakeTrack>>>,
    pub requests: AtomicUsize,
}

impl FakeMediaHost {
    pub fn with_devices() -> Self {
        Self {
            devices: vec![
                MediaDeviceInfo {
                    device_id: "cam-1".to_string(),
                    kind: DeviceKind::VideoInput,
                    label: "Front Camera".to_string(),
                },
                MediaDeviceInfo {
                    device_id: "mic-1".to_string(),
                    kind: DeviceKind::AudioInput,
                    label: "Built-in Microphone".to_string(),
                },
            ],
            ..Self::default()
        }
    }

    pub fn denying() -> Self {
        Self {
            deny: true,
            ..Self::with_devices()
        }
    }

    pub fn gated(gate: Arc<Notify>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::with_devices()
        }
    }

    pub fn issued_count(&self) -> usize {
        self.issued.lock().unwrap().len()
    }

    pub fn live_tracks(&self) -> usize {
        self.issued
            .lock()
            .unwrap()
            .iter()
            .filter(|track| track.is_live())
            .count()
    }
}

#[async_trait]
impl MediaHost for FakeMediaHost {
    async fn enumerate_devices(&self) -> Result<Vec<MediaDeviceInfo>, MediaError> {
        if self.fail_enumeration {
            return Err(MediaError::Host("device list unavailable".to_string()));
        }
        Ok(self.devices.clone())
    }

    async fn get_user_media(
        &self,
        constraints: &MediaConstraints,
    ) -> Result<MediaStream, MediaError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        if self.deny {
            return Err(MediaError::PermissionDenied("user dismissed the prompt".to_string()));
        }

        let mut stream = MediaStream::default();
        if constraints.video.is_some() {
            let track = FakeTrack::new(
                TrackKind::Video,
                "Front Camera",
                Some(solid_frame(64, 48, [0, 0, 255, 255])),
            );
            self.issued.lock().unwrap().push(Arc::clone(&track));
            stream.add_track(track);
        }
        if constraints.audio.is_some() {
            let track = FakeTrack::new(TrackKind::Audio, "Built-in Microphone", None);
            self.issued.lock().unwrap().push(Arc::clone(&track));
            stream.add_track(track);
        }
        Ok(stream)
    }
}

pub struct FakeSurface {
    pub size: Option<(u32, u32)>,
    pub base: Option<VideoFrame>,
    pub overlay: Option<VideoFrame>,
    reads: AtomicUsize,
}

impl FakeSurface {
    pub fn board(width: u32, height: u32) -> Self {
        Self {
            size: Some((width, height)),
            base: Some(solid_frame(width, height, [255, 255, 255, 255])),
            overlay: None,
            reads: AtomicUsize::new(0),
        }
    }

    pub fn missing() -> Self {
        Self {
            size: None,
            base: None,
            overlay: None,
            reads: AtomicUsize::new(0),
        }
    }

    /// How many frames have been composited from this surface.
    pub fn frames_drawn(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

impl DrawingSurface for FakeSurface {
    fn size(&self) -> Option<(u32, u32)> {
        self.size
    }

    fn base_layer(&self) -> Option<VideoFrame> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.base.clone()
    }

    fn overlay_layer(&self) -> Option<VideoFrame> {
        self.overlay.clone()
    }
}

/// What the test can see of (and do to) the encoder the recorder created.
#[derive(Default)]
pub struct EncoderProbe {
    pub fail_start: bool,
    pub started: AtomicUsize,
    pub paused: AtomicBool,
    pub stream_had_audio: Mutex<Option<bool>>,
    pub timeslice: Mutex<Option<Duration>>,
    events: Mutex<Option<mpsc::UnboundedSender<EncoderEvent>>>,
}

impl EncoderProbe {
    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail_start: true,
            ..Self::default()
        })
    }

    /// Push an event as if the encoder produced it.
    pub fn emit(&self, event: EncoderEvent) {
        if let Some(tx) = self.events.lock().unwrap().as_ref() {
            let _ = tx.send(event);
        }
    }
}

pub struct FakeEncoder {
    probe: Arc<EncoderProbe>,
}

impl StreamEncoder for FakeEncoder {
    fn mime_type(&self) -> String {
        "video/webm;codecs=vp9,opus".to_string()
    }

    fn start(
        &mut self,
        stream: &MediaStream,
        timeslice: Duration,
        events: mpsc::UnboundedSender<EncoderEvent>,
    ) -> Result<(), EncoderError> {
        if self.probe.fail_start {
            return Err(EncoderError::Start("no codec available".to_string()));
        }
        self.probe.started.fetch_add(1, Ordering::SeqCst);
        *self.probe.stream_had_audio.lock().unwrap() = Some(stream.has_audio());
        *self.probe.timeslice.lock().unwrap() = Some(timeslice);
        *self.probe.events.lock().unwrap() = Some(events);
        Ok(())
    }

    fn pause(&mut self) {
        self.probe.paused.store(true, Ordering::SeqCst);
    }

    fn resume(&mut self) {
        self.probe.paused.store(false, Ordering::SeqCst);
    }

    fn stop(&mut self) {
        self.probe.emit(EncoderEvent::Chunk(b"tail".to_vec()));
        self.probe.emit(EncoderEvent::Stopped);
    }
}

pub fn encoder_factory(probe: Arc<EncoderProbe>) -> Arc<dyn EncoderFactory> {
    Arc::new(move || -> Box<dyn StreamEncoder> {
        Box::new(FakeEncoder {
            probe: Arc::clone(&probe),
        })
    })
}

pub fn deps(
    host: Arc<FakeMediaHost>,
    surface: FakeSurface,
    probe: Arc<EncoderProbe>,
) -> RecorderDeps {
    deps_on(host, Arc::new(surface), probe)
}

/// Like [`deps`], but the test keeps a handle on the surface.
pub fn deps_on(
    host: Arc<FakeMediaHost>,
    surface: Arc<FakeSurface>,
    probe: Arc<EncoderProbe>,
) -> RecorderDeps {
    RecorderDeps {
        media: host,
        surface,
        encoders: encoder_factory(probe),
        chunk_interval: Duration::from_secs(1),
    }
}
