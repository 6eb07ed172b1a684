//! Fixed-rate driver for the compositor, the animation-frame equivalent.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::FrameCompositor;

pub struct CompositorLoop {
    compositor: Arc<Mutex<FrameCompositor>>,
    frame_interval: Duration,
    running: Option<(CancellationToken, JoinHandle<()>)>,
}

impl CompositorLoop {
    pub fn new(compositor: FrameCompositor, frame_rate: u32) -> Self {
        let frame_rate = frame_rate.clamp(1, 120);
        Self {
            compositor: Arc::new(Mutex::new(compositor)),
            frame_interval: Duration::from_secs(1) / frame_rate,
            running: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    pub fn frame_interval(&self) -> Duration {
        self.frame_interval
    }

    pub fn frames_rendered(&self) -> u64 {
        self.compositor
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .frames_rendered()
    }

    /// Begin ticking. The first frame is drawn immediately.
    pub fn start(&mut self) {
        if self.running.is_some() {
            return;
        }

        let token = CancellationToken::new();
        let cancelled = token.clone();
        let compositor = Arc::clone(&self.compositor);
        let frame_interval = self.frame_interval;

        let handle = tokio::spawn(async move {
            let mut ticker = interval(frame_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = cancelled.cancelled() => break,
                    _ = ticker.tick() => {
                        compositor
                            .lock()
                            .unwrap_or_else(PoisonError::into_inner)
                            .render_frame();
                    }
                }
            }
        });

        debug!("Compositor loop started ({:?} per frame)", frame_interval);
        self.running = Some((token, handle));
    }

    /// Cancel the scheduled tick. The canvas is kept for a later `start`.
    pub fn stop(&mut self) {
        if let Some((token, handle)) = self.running.take() {
            token.cancel();
            handle.abort();
            debug!(
                "Compositor loop stopped after {} frames",
                self.frames_rendered()
            );
        }
    }
}

impl Drop for CompositorLoop {
    fn drop(&mut self) {
        self.stop();
    }
}
