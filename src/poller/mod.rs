//! Background status polling for uploaded recordings.
//!
//! The host transcodes asynchronously. Entries sit in `processing` until a
//! status check reports a terminal state, which is then persisted.

use anyhow::Result;
use futures::future::join_all;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::store::{RecordingEntry, RecordingStore};
use crate::upload::{ProcessingStatus, Transport};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Outcome of one polling pass over a scene.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollReport {
    pub checked: usize,
    pub updated: usize,
    pub failed: usize,
    pub still_pending: usize,
}

pub struct StatusPoller {
    store: Arc<dyn RecordingStore>,
    transport: Arc<dyn Transport>,
    interval: Duration,
}

enum CheckOutcome {
    Pending,
    Updated,
    Failed,
}

impl StatusPoller {
    pub fn new(store: Arc<dyn RecordingStore>, transport: Arc<dyn Transport>) -> Self {
        Self {
            store,
            transport,
            interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Check every pending entry of the scene once. Items are independent:
    /// one failed check is counted and left for the next pass.
    pub async fn poll_once(&self, scene_id: &str) -> Result<PollReport> {
        let pending: Vec<RecordingEntry> = self
            .store
            .list(scene_id)?
            .into_iter()
            .filter(|entry| is_pending(entry.processing_status))
            .collect();

        let mut report = PollReport {
            checked: pending.len(),
            ..PollReport::default()
        };
        if pending.is_empty() {
            return Ok(report);
        }

        debug!(
            "Checking {} pending recording(s) for scene {}",
            pending.len(),
            scene_id
        );

        let outcomes = join_all(pending.iter().map(|entry| self.check(scene_id, entry))).await;
        for outcome in outcomes {
            match outcome {
                CheckOutcome::Pending => report.still_pending += 1,
                CheckOutcome::Updated => report.updated += 1,
                CheckOutcome::Failed => report.failed += 1,
            }
        }

        Ok(report)
    }

    async fn check(&self, scene_id: &str, entry: &RecordingEntry) -> CheckOutcome {
        let status = match self.transport.status(&entry.host_video_id).await {
            Ok(status) => status,
            Err(e) => {
                warn!(
                    "Status check for video {} failed, retrying next pass: {}",
                    entry.host_video_id, e
                );
                return CheckOutcome::Failed;
            }
        };

        if !status.is_terminal() {
            return CheckOutcome::Pending;
        }

        match self.store.update_status(scene_id, entry.id, status) {
            Ok(true) => {
                info!(
                    "Recording {} (video {}) is now {}",
                    entry.id, entry.host_video_id, status
                );
                CheckOutcome::Updated
            }
            // deleted while we were asking
            Ok(false) => CheckOutcome::Pending,
            Err(e) => {
                warn!("Failed to persist status for recording {}: {}", entry.id, e);
                CheckOutcome::Failed
            }
        }
    }

    /// Poll immediately, then once per interval until cancelled.
    pub async fn run(&self, scene_id: &str, cancel: CancellationToken) {
        info!(
            "Status poller started for scene {} (every {}s)",
            scene_id,
            self.interval.as_secs()
        );

        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    match self.poll_once(scene_id).await {
                        Ok(report) if report.checked > 0 => debug!("Poll pass: {:?}", report),
                        Ok(_) => {}
                        Err(e) => warn!("Poll pass for scene {} failed: {}", scene_id, e),
                    }
                }
            }
        }

        info!("Status poller stopped for scene {}", scene_id);
    }
}

/// Whether a status counts as still waiting on the host.
pub fn is_pending(status: ProcessingStatus) -> bool {
    matches!(status, ProcessingStatus::Uploading | ProcessingStatus::Processing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{NewRecording, SqliteRecordingStore};
    use crate::upload::{ProgressCallback, UploadError};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct MapTransport {
        statuses: HashMap<String, Result<ProcessingStatus, u16>>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Transport for MapTransport {
        fn name(&self) -> &'static str {
            "map"
        }

        async fn upload(
            &self,
            _data: Vec<u8>,
            _title: &str,
            _on_progress: Option<ProgressCallback>,
        ) -> Result<String, UploadError> {
            Err(UploadError::MissingVideoId)
        }

        async fn status(&self, video_id: &str) -> Result<ProcessingStatus, UploadError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.statuses.get(video_id) {
                Some(Ok(status)) => Ok(*status),
                Some(Err(code)) => Err(UploadError::Status {
                    status: *code,
                    body: String::new(),
                }),
                None => Ok(ProcessingStatus::Processing),
            }
        }

        async fn delete(&self, _video_id: &str) -> Result<(), UploadError> {
            Ok(())
        }
    }

    fn seed(store: &SqliteRecordingStore, video_id: &str, status: ProcessingStatus) -> i64 {
        store
            .create(
                "scene",
                NewRecording {
                    title: video_id.to_string(),
                    host_video_id: video_id.to_string(),
                    duration_seconds: 5,
                    processing_status: status,
                },
            )
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn test_terminal_entries_are_not_checked() {
        let store = Arc::new(SqliteRecordingStore::open_in_memory().unwrap());
        seed(&store, "done", ProcessingStatus::Ready);
        seed(&store, "broken", ProcessingStatus::Error);

        let transport = Arc::new(MapTransport {
            statuses: HashMap::new(),
            calls: AtomicUsize::new(0),
        });
        let poller = StatusPoller::new(store, transport.clone());

        assert_eq!(poller.poll_once("scene").await.unwrap(), PollReport::default());
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_uploading_entries_are_polled() {
        let store = Arc::new(SqliteRecordingStore::open_in_memory().unwrap());
        let id = seed(&store, "v1", ProcessingStatus::Uploading);

        let transport = Arc::new(MapTransport {
            statuses: HashMap::from([("v1".to_string(), Ok(ProcessingStatus::Error))]),
            calls: AtomicUsize::new(0),
        });
        let poller = StatusPoller::new(store.clone(), transport);

        let report = poller.poll_once("scene").await.unwrap();
        assert_eq!(report.updated, 1);
        assert_eq!(
            store.get("scene", id).unwrap().unwrap().processing_status,
            ProcessingStatus::Error
        );
    }

    #[test]
    fn test_is_pending() {
        assert!(is_pending(ProcessingStatus::Uploading));
        assert!(is_pending(ProcessingStatus::Processing));
        assert!(!is_pending(ProcessingStatus::Ready));
    }
}
