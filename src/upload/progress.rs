//! Byte-level upload progress.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// Size of each piece of the streamed request body.
pub const UPLOAD_CHUNK_SIZE: usize = 64 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadProgress {
    pub loaded_bytes: u64,
    pub total_bytes: u64,
    /// 0..=100, rounded down; 100 only once everything is sent
    pub percentage: u8,
}

impl UploadProgress {
    pub fn new(loaded_bytes: u64, total_bytes: u64) -> Self {
        let loaded_bytes = loaded_bytes.min(total_bytes);
        let percentage = if total_bytes == 0 {
            100
        } else {
            (loaded_bytes * 100 / total_bytes) as u8
        };
        Self {
            loaded_bytes,
            total_bytes,
            percentage,
        }
    }
}

pub type ProgressCallback = Arc<dyn Fn(UploadProgress) + Send + Sync>;

/// Turns sent byte counts into progress reports. Reports never go backwards.
pub struct ProgressTracker {
    total: u64,
    loaded: AtomicU64,
    completed: AtomicBool,
    callback: Option<ProgressCallback>,
}

impl ProgressTracker {
    pub fn new(total: u64, callback: Option<ProgressCallback>) -> Self {
        Self {
            total,
            loaded: AtomicU64::new(0),
            completed: AtomicBool::new(false),
            callback,
        }
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn loaded(&self) -> u64 {
        self.loaded.load(Ordering::SeqCst)
    }

    pub fn advance(&self, bytes: u64) {
        let loaded = (self.loaded.fetch_add(bytes, Ordering::SeqCst) + bytes).min(self.total);
        if loaded == self.total {
            self.completed.store(true, Ordering::SeqCst);
        }
        self.report(loaded);
    }

    /// Emit the final 100% unless the stream already reported it.
    pub fn complete(&self) {
        self.loaded.store(self.total, Ordering::SeqCst);
        if !self.completed.swap(true, Ordering::SeqCst) {
            self.report(self.total);
        }
    }

    fn report(&self, loaded: u64) {
        if let Some(callback) = &self.callback {
            callback(UploadProgress::new(loaded, self.total));
        }
    }
}

/// Request body that reports progress as hyper pulls each piece.
pub fn progress_body(data: Vec<u8>, tracker: Arc<ProgressTracker>) -> reqwest::Body {
    let pieces: Vec<Vec<u8>> = data
        .chunks(UPLOAD_CHUNK_SIZE)
        .map(<[u8]>::to_vec)
        .collect();

    let stream = futures::stream::iter(pieces.into_iter().map(move |piece| {
        tracker.advance(piece.len() as u64);
        Ok::<_, std::io::Error>(piece)
    }));

    reqwest::Body::wrap_stream(stream)
}
