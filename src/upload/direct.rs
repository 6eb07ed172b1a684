use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

use super::progress::{progress_body, ProgressCallback, ProgressTracker};
use super::response::{direct_status, extract_video_id, header_title, sanitize_file_name};
use super::{expect_success, read_json, ProcessingStatus, Transport, UploadError};

/// Calls the video host with our own API key. Only suitable when the key
/// never leaves a trusted machine.
pub struct DirectTransport {
    client: reqwest::Client,
    api_key: String,
    parent_id: Option<String>,
    upload_endpoint: String,
    api_base_url: String,
}

impl DirectTransport {
    pub fn new(
        api_key: &str,
        parent_id: Option<String>,
        upload_endpoint: &str,
        api_base_url: &str,
    ) -> Self {
        let upload_endpoint = upload_endpoint.trim().to_string();
        let api_base_url = api_base_url.trim().trim_end_matches('/').to_string();
        info!(
            "Initialized direct upload transport: upload {}, api {}",
            upload_endpoint, api_base_url
        );

        Self {
            client: reqwest::Client::new(),
            api_key: api_key.to_string(),
            parent_id: parent_id.filter(|id| !id.trim().is_empty()),
            upload_endpoint,
            api_base_url,
        }
    }

    fn video_url(&self, video_id: &str) -> String {
        format!(
            "{}/videos/{}",
            self.api_base_url,
            urlencoding::encode(video_id)
        )
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.api_key)
    }
}

#[async_trait]
impl Transport for DirectTransport {
    fn name(&self) -> &'static str {
        "direct"
    }

    async fn upload(
        &self,
        data: Vec<u8>,
        title: &str,
        on_progress: Option<ProgressCallback>,
    ) -> Result<String, UploadError> {
        let total = data.len() as u64;
        let tracker = Arc::new(ProgressTracker::new(total, on_progress));

        debug!("POST {} ({} bytes)", self.upload_endpoint, total);
        let mut request = self
            .client
            .post(&self.upload_endpoint)
            .header("Authorization", self.bearer())
            .header("X-Video-Title", header_title(title))
            .header("X-File-Name", sanitize_file_name(title))
            .header("Content-Type", "application/octet-stream")
            .header("Content-Length", total);
        if let Some(parent_id) = &self.parent_id {
            request = request.header("X-Parent-ID", parent_id);
        }

        let response = request
            .body(progress_body(data, Arc::clone(&tracker)))
            .send()
            .await?;

        let body = read_json(response).await?;
        let video_id = extract_video_id(&body, "id").ok_or(UploadError::MissingVideoId)?;
        tracker.complete();
        Ok(video_id)
    }

    async fn status(&self, video_id: &str) -> Result<ProcessingStatus, UploadError> {
        let url = self.video_url(video_id);
        debug!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .header("Authorization", self.bearer())
            .send()
            .await?;
        let body = read_json(response).await?;
        Ok(direct_status(&body))
    }

    async fn delete(&self, video_id: &str) -> Result<(), UploadError> {
        let url = self.video_url(video_id);
        debug!("DELETE {}", url);

        let response = self
            .client
            .delete(&url)
            .header("Authorization", self.bearer())
            .send()
            .await?;
        expect_success(response).await
    }
}
