//! Recording state machine.
//!
//! Idle -> Preparing -> Recording <-> Paused -> Stopping -> Idle, with Error
//! reachable from every non-terminal state. Three timing sources run while
//! recording: the compositor loop, the 1 Hz duration timer and the encoder's
//! chunk cadence. They are started and stopped together.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::capture::{MediaCaptureManager, MediaError, MediaHost};
use crate::compositor::{CanvasFeed, CompositorLoop, DrawingSurface, FrameCompositor};

use super::encoder::{EncoderError, EncoderEvent, EncoderFactory, StreamEncoder};
use super::slot::SlotLease;
use super::state::{
    DurationClock, RecordingOptions, RecordingState, RecordingStateHandle, RecordingStatus,
};

const TIMER_PERIOD: Duration = Duration::from_secs(1);

#[derive(Debug, Error)]
pub enum RecorderError {
    #[error("Another recording session is already active")]
    SessionActive,

    #[error("Cannot {operation} while {status}")]
    InvalidState {
        operation: &'static str,
        status: RecordingStatus,
    },

    #[error("Recording is not prepared yet")]
    NotPrepared,

    #[error("Drawing surface not found")]
    SurfaceNotFound,

    #[error(transparent)]
    Media(#[from] MediaError),

    #[error(transparent)]
    Encoder(#[from] EncoderError),

    #[error("Encoder error: {0}")]
    EncoderFailed(String),

    #[error("Recording was cancelled")]
    Cancelled,

    #[error("Recorder has been disposed")]
    Disposed,
}

/// Host facilities a recorder is built from.
#[derive(Clone)]
pub struct RecorderDeps {
    pub media: Arc<dyn MediaHost>,
    pub surface: Arc<dyn DrawingSurface>,
    pub encoders: Arc<dyn EncoderFactory>,
    pub chunk_interval: Duration,
}

/// The encoded result of one session.
#[derive(Debug, Clone)]
pub struct FinishedRecording {
    pub data: Vec<u8>,
    pub mime_type: String,
    pub duration_seconds: u64,
}

type StopWaiter = oneshot::Sender<Result<Vec<u8>, String>>;

#[derive(Default)]
struct Session {
    id: Option<Uuid>,
    cancel: CancellationToken,
    options: Option<RecordingOptions>,
    feed: Option<CanvasFeed>,
    render_loop: Option<CompositorLoop>,
    encoder: Option<Box<dyn StreamEncoder>>,
    chunks: Vec<Vec<u8>>,
    clock: Option<DurationClock>,
    timer: Option<(CancellationToken, JoinHandle<()>)>,
    stop_waiter: Option<StopWaiter>,
    disposed: bool,
}

impl Session {
    fn stop_timer(&mut self) {
        if let Some((token, handle)) = self.timer.take() {
            token.cancel();
            handle.abort();
        }
    }

    fn stop_render_loop(&mut self) {
        if let Some(render_loop) = self.render_loop.as_mut() {
            render_loop.stop();
        }
    }

    /// Drop everything the session owns except captured media.
    fn teardown(&mut self) {
        self.stop_timer();
        self.render_loop = None;
        self.feed = None;
        self.encoder = None;
        self.chunks.clear();
        self.clock = None;
        self.stop_waiter = None;
        self.options = None;
        self.id = None;
    }
}

struct Shared {
    state: RecordingStateHandle,
    capture: MediaCaptureManager,
    surface: Arc<dyn DrawingSurface>,
    encoders: Arc<dyn EncoderFactory>,
    chunk_interval: Duration,
    session: Mutex<Session>,
    _lease: SlotLease,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn tick_duration(&self, session_id: Uuid) {
        let session = self.lock();
        if session.id != Some(session_id) || self.state.status() != RecordingStatus::Recording {
            return;
        }
        if let Some(clock) = session.clock.as_ref() {
            self.state.set_duration(clock.elapsed_seconds(Instant::now()));
        }
    }

    /// Encoder failure: stop everything, keep the message for the UI.
    fn fail(&self, session_id: Uuid, message: String) {
        let mut session = self.lock();
        if session.id != Some(session_id) {
            return;
        }
        error!("Session {}: encoder error: {}", session_id, message);
        if let Some(waiter) = session.stop_waiter.take() {
            let _ = waiter.send(Err(message.clone()));
        }
        session.teardown();
        drop(session);

        self.capture.release_all();
        self.state.set_error(message);
    }
}

/// Owned handle to one recorder. Obtain it from [`RecorderSlot::open`];
/// dropping it disposes the recorder and frees the slot.
///
/// [`RecorderSlot::open`]: super::RecorderSlot::open
pub struct Recorder {
    shared: Arc<Shared>,
}

impl Recorder {
    pub(crate) fn new(deps: RecorderDeps, lease: SlotLease) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: RecordingStateHandle::default(),
                capture: MediaCaptureManager::new(deps.media),
                surface: deps.surface,
                encoders: deps.encoders,
                chunk_interval: deps.chunk_interval,
                session: Mutex::new(Session::default()),
                _lease: lease,
            }),
        }
    }

    pub fn state(&self) -> RecordingState {
        self.shared.state.get()
    }

    pub fn subscribe(&self) -> watch::Receiver<RecordingState> {
        self.shared.state.subscribe()
    }

    pub fn session_id(&self) -> Option<Uuid> {
        self.shared.lock().id
    }

    /// Camera, microphone and canvas tracks this recorder still holds open.
    pub fn live_track_count(&self) -> usize {
        self.shared.capture.live_track_count()
    }

    /// Locate the board, size the canvas and acquire the requested devices.
    ///
    /// Acquisition failures move the recorder to `Error` and are returned so
    /// the caller can close its setup dialog.
    pub async fn prepare(&self, options: RecordingOptions) -> Result<(), RecorderError> {
        let (session_id, cancel) = {
            let mut session = self.shared.lock();
            if session.disposed {
                return Err(RecorderError::Disposed);
            }
            let status = self.shared.state.status();
            if !matches!(status, RecordingStatus::Idle | RecordingStatus::Error) {
                return Err(RecorderError::InvalidState {
                    operation: "prepare",
                    status,
                });
            }

            let id = Uuid::new_v4();
            session.teardown();
            session.id = Some(id);
            session.cancel = CancellationToken::new();
            session.options = Some(options.clone());
            self.shared.state.reset();
            self.shared.state.set_status(RecordingStatus::Preparing);
            (id, session.cancel.clone())
        };

        info!(
            "Session {}: preparing (camera: {:?}, microphone: {:?})",
            session_id, options.video_device_id, options.audio_device_id
        );

        let result = self.acquire(&options, &cancel).await;

        let mut session = self.shared.lock();
        let superseded = cancel.is_cancelled() || session.id != Some(session_id);
        match result {
            Ok(size) if !superseded => {
                let feed = CanvasFeed::new();
                let compositor = FrameCompositor::new(
                    Arc::clone(&self.shared.surface),
                    self.shared.capture.camera_track(),
                    options.pip_options(),
                    size,
                    feed.clone(),
                );
                session.render_loop = Some(CompositorLoop::new(compositor, options.frame_rate));
                session.feed = Some(feed);
                info!(
                    "Session {}: prepared {}x{} canvas",
                    session_id, size.0, size.1
                );
                Ok(())
            }
            Ok(_) | Err(RecorderError::Media(MediaError::Cancelled)) => {
                debug!("Session {}: preparation superseded", session_id);
                Err(RecorderError::Cancelled)
            }
            Err(e) => {
                if !superseded {
                    error!("Session {}: preparation failed: {}", session_id, e);
                    session.teardown();
                    drop(session);
                    self.shared.capture.release_all();
                    self.shared.state.set_error(e.to_string());
                }
                Err(e)
            }
        }
    }

    async fn acquire(
        &self,
        options: &RecordingOptions,
        cancel: &CancellationToken,
    ) -> Result<(u32, u32), RecorderError> {
        let size = self
            .shared
            .surface
            .size()
            .filter(|(width, height)| *width > 0 && *height > 0)
            .ok_or(RecorderError::SurfaceNotFound)?;

        if let Some(device_id) = options.video_device_id.as_deref() {
            self.shared.capture.acquire_camera(device_id, cancel).await?;
        }
        if let Some(device_id) = options.audio_device_id.as_deref() {
            self.shared
                .capture
                .acquire_microphone(device_id, cancel)
                .await?;
        }

        Ok(size)
    }

    /// Begin capture. Only a prepared session starts; from any other state
    /// this is a no-op that reports the current status.
    pub fn start(&self) -> Result<RecordingStatus, RecorderError> {
        let mut session = self.shared.lock();
        if session.disposed {
            return Err(RecorderError::Disposed);
        }
        let status = self.shared.state.status();
        if status != RecordingStatus::Preparing {
            warn!("start ignored while {}", status);
            return Ok(status);
        }
        let (Some(session_id), Some(feed)) = (session.id, session.feed.clone()) else {
            return Err(RecorderError::NotPrepared);
        };

        let mut stream = feed.capture_stream();
        self.shared.capture.attach_canvas(stream.clone());
        if let Some(microphone) = self.shared.capture.microphone_track() {
            stream.add_track(microphone);
        }

        let mut encoder = self.shared.encoders.create();
        let (tx, rx) = mpsc::unbounded_channel();
        if let Err(e) = encoder.start(&stream, self.shared.chunk_interval, tx) {
            error!("Session {}: {}", session_id, e);
            session.teardown();
            drop(session);
            self.shared.capture.release_all();
            self.shared.state.set_error(e.to_string());
            return Err(e.into());
        }

        let weak = Arc::downgrade(&self.shared);
        tokio::spawn(collect_encoder_events(weak.clone(), session_id, rx));

        session.encoder = Some(encoder);
        session.chunks.clear();
        session.clock = Some(DurationClock::start(Instant::now()));
        session.timer = Some(spawn_duration_timer(weak, session_id));
        if let Some(render_loop) = session.render_loop.as_mut() {
            render_loop.start();
        }
        self.shared.state.set_status(RecordingStatus::Recording);

        info!(
            "Session {}: recording started (audio: {})",
            session_id,
            stream.has_audio()
        );
        Ok(RecordingStatus::Recording)
    }

    /// Suspend encoder, compositor and timer. No-op unless recording.
    pub fn pause(&self) -> RecordingStatus {
        let mut session = self.shared.lock();
        let status = self.shared.state.status();
        if status != RecordingStatus::Recording {
            debug!("pause ignored while {}", status);
            return status;
        }

        let now = Instant::now();
        session.stop_timer();
        session.stop_render_loop();
        if let Some(encoder) = session.encoder.as_mut() {
            encoder.pause();
        }
        if let Some(clock) = session.clock.as_mut() {
            self.shared.state.set_duration(clock.elapsed_seconds(now));
            clock.pause(now);
        }
        self.shared.state.set_status(RecordingStatus::Paused);
        info!("Session {:?}: paused", session.id);
        RecordingStatus::Paused
    }

    /// Restart encoder, compositor and timer. No-op unless paused.
    pub fn resume(&self) -> RecordingStatus {
        let mut session = self.shared.lock();
        let status = self.shared.state.status();
        if status != RecordingStatus::Paused {
            debug!("resume ignored while {}", status);
            return status;
        }
        let Some(session_id) = session.id else {
            return status;
        };

        if let Some(clock) = session.clock.as_mut() {
            clock.resume(Instant::now());
        }
        if let Some(encoder) = session.encoder.as_mut() {
            encoder.resume();
        }
        if let Some(render_loop) = session.render_loop.as_mut() {
            render_loop.start();
        }
        session.timer = Some(spawn_duration_timer(
            Arc::downgrade(&self.shared),
            session_id,
        ));
        self.shared.state.set_status(RecordingStatus::Recording);
        info!("Session {}: resumed", session_id);
        RecordingStatus::Recording
    }

    /// Finish the recording. Resolves once the encoder has flushed and every
    /// captured track has been stopped.
    pub async fn stop(&self) -> Result<FinishedRecording, RecorderError> {
        let (waiter, mime_type, duration_seconds, session_id) = {
            let mut session = self.shared.lock();
            if session.disposed {
                return Err(RecorderError::Disposed);
            }
            let status = self.shared.state.status();
            if !matches!(status, RecordingStatus::Recording | RecordingStatus::Paused) {
                return Err(RecorderError::InvalidState {
                    operation: "stop",
                    status,
                });
            }
            let Some(session_id) = session.id else {
                return Err(RecorderError::NotPrepared);
            };

            session.stop_timer();
            session.stop_render_loop();
            let duration_seconds = session
                .clock
                .as_ref()
                .map(|clock| clock.elapsed_seconds(Instant::now()))
                .unwrap_or(0);
            self.shared.state.set_duration(duration_seconds);
            self.shared.state.set_status(RecordingStatus::Stopping);

            let (tx, rx) = oneshot::channel();
            session.stop_waiter = Some(tx);
            let mime_type = match session.encoder.as_mut() {
                Some(encoder) => {
                    encoder.stop();
                    encoder.mime_type()
                }
                None => String::new(),
            };
            (rx, mime_type, duration_seconds, session_id)
        };

        info!("Session {}: stopping, waiting for encoder flush", session_id);
        let outcome = waiter.await;

        match outcome {
            Ok(Ok(data)) => {
                self.shared.lock().teardown();
                self.shared.capture.release_all();
                self.shared.state.reset();
                info!(
                    "Session {}: finished, {} bytes over {}s",
                    session_id,
                    data.len(),
                    duration_seconds
                );
                Ok(FinishedRecording {
                    data,
                    mime_type,
                    duration_seconds,
                })
            }
            // encoder failure already cleaned up and published the error
            Ok(Err(message)) => Err(RecorderError::EncoderFailed(message)),
            Err(_) => Err(RecorderError::Cancelled),
        }
    }

    /// Abandon the session: buffered chunks are discarded, every track and
    /// timer stops before this returns, and the recorder is back to Idle.
    pub fn cancel(&self) {
        let mut session = self.shared.lock();
        let session_id = session.id;
        session.cancel.cancel();
        if let Some(encoder) = session.encoder.as_mut() {
            encoder.stop();
        }
        session.teardown();
        drop(session);

        self.shared.capture.release_all();
        self.shared.state.reset();
        if let Some(id) = session_id {
            info!("Session {}: cancelled", id);
        }
    }

    /// Final teardown. Every later operation fails with `Disposed`.
    pub fn dispose(&self) {
        if self.shared.lock().disposed {
            return;
        }
        self.cancel();
        self.shared.lock().disposed = true;
        debug!("Recorder disposed");
    }
}

impl Drop for Recorder {
    fn drop(&mut self) {
        self.dispose();
    }
}

fn spawn_duration_timer(
    shared: Weak<Shared>,
    session_id: Uuid,
) -> (CancellationToken, JoinHandle<()>) {
    let token = CancellationToken::new();
    let cancelled = token.clone();
    let handle = tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + TIMER_PERIOD, TIMER_PERIOD);
        loop {
            tokio::select! {
                _ = cancelled.cancelled() => break,
                _ = ticker.tick() => {
                    let Some(shared) = shared.upgrade() else { break };
                    shared.tick_duration(session_id);
                }
            }
        }
    });
    (token, handle)
}

async fn collect_encoder_events(
    shared: Weak<Shared>,
    session_id: Uuid,
    mut events: mpsc::UnboundedReceiver<EncoderEvent>,
) {
    while let Some(event) = events.recv().await {
        let Some(shared) = shared.upgrade() else {
            return;
        };
        match event {
            EncoderEvent::Chunk(data) => {
                let mut session = shared.lock();
                if session.id != Some(session_id) {
                    return;
                }
                if !data.is_empty() {
                    session.chunks.push(data);
                }
            }
            EncoderEvent::Stopped => {
                finish_stop(&shared, session_id);
                return;
            }
            EncoderEvent::Error(message) => {
                shared.fail(session_id, message);
                return;
            }
        }
    }

    // The encoder went away without saying goodbye: hand over what we have.
    if let Some(shared) = shared.upgrade() {
        finish_stop(&shared, session_id);
    }
}

/// An encoder that stops while nobody asked it to has lost its input
/// (the host ended a track, for one) and fails the session.
fn finish_stop(shared: &Shared, session_id: Uuid) {
    let mut session = shared.lock();
    if session.id != Some(session_id) {
        return;
    }
    let Some(waiter) = session.stop_waiter.take() else {
        drop(session);
        shared.fail(session_id, "Encoder stopped unexpectedly".to_string());
        return;
    };
    let data = std::mem::take(&mut session.chunks).concat();
    debug!("Session {}: encoder flushed {} bytes", session_id, data.len());
    let _ = waiter.send(Ok(data));
}
