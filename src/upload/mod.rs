//! Shipping finished recordings to the video host.
//!
//! Two transports implement [`Transport`]: through the application backend
//! ([`ProxyTransport`], keeps host credentials server-side) or straight to
//! the host with an API key ([`DirectTransport`]). The choice is made once,
//! in [`transport_from_config`].

pub mod direct;
pub mod progress;
pub mod proxy;
pub mod response;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::config::UploadConfig;

pub use direct::DirectTransport;
pub use progress::{ProgressCallback, ProgressTracker, UploadProgress};
pub use proxy::ProxyTransport;

/// The host's transcoding state, tracked apart from local recording state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingStatus {
    Uploading,
    Processing,
    Ready,
    Error,
}

impl ProcessingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uploading => "uploading",
            Self::Processing => "processing",
            Self::Ready => "ready",
            Self::Error => "error",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "uploading" => Some(Self::Uploading),
            "processing" => Some(Self::Processing),
            "ready" => Some(Self::Ready),
            "error" => Some(Self::Error),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Ready | Self::Error)
    }
}

impl std::fmt::Display for ProcessingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Network error talking to the video host: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Video host request failed with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Failed to parse video host response: {0}")]
    InvalidResponse(String),

    #[error("Upload finished but the response carried no video id")]
    MissingVideoId,

    #[error("Upload is not configured: {0}")]
    Config(String),
}

#[async_trait]
pub trait Transport: Send + Sync {
    fn name(&self) -> &'static str;

    /// Send the whole recording, returning the host-assigned video id.
    async fn upload(
        &self,
        data: Vec<u8>,
        title: &str,
        on_progress: Option<ProgressCallback>,
    ) -> Result<String, UploadError>;

    async fn status(&self, video_id: &str) -> Result<ProcessingStatus, UploadError>;

    async fn delete(&self, video_id: &str) -> Result<(), UploadError>;
}

/// Proxy when `storage_base_url` is set, otherwise direct with `api_key`.
pub fn transport_from_config(config: &UploadConfig) -> Result<Arc<dyn Transport>, UploadError> {
    if config.uses_proxy() {
        let base_url = config.storage_base_url.as_deref().unwrap_or_default();
        return Ok(Arc::new(ProxyTransport::new(base_url)));
    }

    match config.api_key.as_deref().map(str::trim) {
        Some(api_key) if !api_key.is_empty() => Ok(Arc::new(DirectTransport::new(
            api_key,
            config.parent_id.clone(),
            &config.upload_endpoint,
            &config.api_base_url,
        ))),
        _ => Err(UploadError::Config(
            "set upload.storage_base_url (proxy) or upload.api_key (direct)".to_string(),
        )),
    }
}

/// Playable embed location for a hosted video.
pub fn embed_url(embed_base_url: &str, video_id: &str) -> String {
    format!("{}/{}", embed_base_url.trim_end_matches('/'), video_id)
}

/// Upload facade used by callers. No automatic retry: a failed upload is
/// reported and the caller decides whether to try again.
#[derive(Clone)]
pub struct Uploader {
    transport: Arc<dyn Transport>,
}

impl Uploader {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    pub fn from_config(config: &UploadConfig) -> Result<Self, UploadError> {
        Ok(Self::new(transport_from_config(config)?))
    }

    pub fn transport(&self) -> Arc<dyn Transport> {
        Arc::clone(&self.transport)
    }

    pub async fn upload(
        &self,
        data: Vec<u8>,
        title: &str,
        on_progress: Option<ProgressCallback>,
    ) -> Result<String, UploadError> {
        info!(
            "Uploading '{}' ({} bytes) via {}",
            title,
            data.len(),
            self.transport.name()
        );

        match self.transport.upload(data, title, on_progress).await {
            Ok(video_id) => {
                info!("Upload complete, video id {}", video_id);
                Ok(video_id)
            }
            Err(e) => {
                error!("Upload of '{}' failed: {}", title, e);
                Err(e)
            }
        }
    }

    /// Best-effort removal at the host. Callers log failures and move on.
    pub async fn delete_remote(&self, video_id: &str) -> Result<(), UploadError> {
        self.transport.delete(video_id).await?;
        info!("Deleted video {} at the host", video_id);
        Ok(())
    }

    pub async fn check_status(&self, video_id: &str) -> Result<ProcessingStatus, UploadError> {
        self.transport.status(video_id).await
    }
}

/// Check the status code and parse the JSON body.
pub(crate) async fn read_json(response: reqwest::Response) -> Result<Value, UploadError> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        error!("Video host request failed with status {}: {}", status, body);
        return Err(UploadError::Status {
            status: status.as_u16(),
            body,
        });
    }

    debug!("Video host response: {}", body);
    serde_json::from_str(&body).map_err(|e| UploadError::InvalidResponse(e.to_string()))
}

/// Check the status code only.
pub(crate) async fn expect_success(response: reqwest::Response) -> Result<(), UploadError> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }
    let body = response.text().await.unwrap_or_default();
    Err(UploadError::Status {
        status: status.as_u16(),
        body,
    })
}
