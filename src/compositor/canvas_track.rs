//! Video track fed by the compositor's off-screen canvas.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

use crate::capture::{MediaStream, MediaTrack, TrackKind, VideoFrame};

/// Publishing side of the canvas. Cheap to clone.
#[derive(Clone)]
pub struct CanvasFeed {
    tx: Arc<watch::Sender<Option<VideoFrame>>>,
}

impl CanvasFeed {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    pub fn publish(&self, frame: VideoFrame) {
        self.tx.send_replace(Some(frame));
    }

    pub fn latest(&self) -> Option<VideoFrame> {
        self.tx.borrow().clone()
    }

    /// A stream with a single live video track mirroring this canvas.
    pub fn capture_stream(&self) -> MediaStream {
        MediaStream::new(vec![Arc::new(CanvasTrack {
            frames: self.tx.subscribe(),
            live: AtomicBool::new(true),
        })])
    }
}

impl Default for CanvasFeed {
    fn default() -> Self {
        Self::new()
    }
}

struct CanvasTrack {
    frames: watch::Receiver<Option<VideoFrame>>,
    live: AtomicBool,
}

impl MediaTrack for CanvasTrack {
    fn kind(&self) -> TrackKind {
        TrackKind::Video
    }

    fn label(&self) -> String {
        "canvas".to_string()
    }

    fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }

    fn stop(&self) {
        self.live.store(false, Ordering::SeqCst);
    }

    fn latest_frame(&self) -> Option<VideoFrame> {
        if !self.is_live() {
            return None;
        }
        self.frames.borrow().clone()
    }
}
