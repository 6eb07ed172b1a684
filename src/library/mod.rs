//! The caller-side flow around uploads: publish a finished recording, keep
//! its entry in the store, and remove it again.

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{info, warn};

use crate::store::{NewRecording, RecordingEntry, RecordingStore};
use crate::upload::{embed_url, ProcessingStatus, ProgressCallback, Transport, Uploader};

pub struct RecordingLibrary {
    store: Arc<dyn RecordingStore>,
    uploader: Uploader,
    embed_base_url: String,
}

impl RecordingLibrary {
    pub fn new(
        store: Arc<dyn RecordingStore>,
        transport: Arc<dyn Transport>,
        embed_base_url: impl Into<String>,
    ) -> Self {
        Self {
            store,
            uploader: Uploader::new(transport),
            embed_base_url: embed_base_url.into(),
        }
    }

    pub fn store(&self) -> Arc<dyn RecordingStore> {
        Arc::clone(&self.store)
    }

    pub fn uploader(&self) -> &Uploader {
        &self.uploader
    }

    /// Upload, then record the entry as processing. Nothing is stored when
    /// the upload fails.
    pub async fn publish(
        &self,
        scene_id: &str,
        data: Vec<u8>,
        title: &str,
        duration_seconds: u64,
        on_progress: Option<ProgressCallback>,
    ) -> Result<RecordingEntry> {
        let host_video_id = self
            .uploader
            .upload(data, title, on_progress)
            .await
            .context("Upload failed, the recording was not saved")?;

        let entry = self.store.create(
            scene_id,
            NewRecording {
                title: title.to_string(),
                host_video_id,
                duration_seconds,
                processing_status: ProcessingStatus::Processing,
            },
        )?;

        info!(
            "Saved recording {} ('{}') for scene {} as video {}",
            entry.id, entry.title, scene_id, entry.host_video_id
        );
        Ok(entry)
    }

    pub fn list(&self, scene_id: &str) -> Result<Vec<RecordingEntry>> {
        self.store.list(scene_id)
    }

    pub fn rename(&self, scene_id: &str, id: i64, title: &str) -> Result<bool> {
        let title = title.trim();
        if title.is_empty() {
            anyhow::bail!("Recording title cannot be empty");
        }
        self.store.rename(scene_id, id, title)
    }

    /// Remote removal is best-effort; the local entry goes regardless.
    /// Returns false when no such entry existed.
    pub async fn delete(&self, scene_id: &str, id: i64) -> Result<bool> {
        let Some(entry) = self.store.get(scene_id, id)? else {
            return Ok(false);
        };

        if let Err(e) = self.uploader.delete_remote(&entry.host_video_id).await {
            warn!(
                "Failed to delete video {} at the host, removing local entry anyway: {}",
                entry.host_video_id, e
            );
        }

        let deleted = self.store.delete(scene_id, id)?;
        info!("Deleted recording {} from scene {}", id, scene_id);
        Ok(deleted)
    }

    pub fn embed_url(&self, video_id: &str) -> String {
        embed_url(&self.embed_base_url, video_id)
    }
}
