use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

use super::progress::{progress_body, ProgressCallback, ProgressTracker};
use super::response::{extract_video_id, header_title, proxy_status};
use super::{expect_success, read_json, ProcessingStatus, Transport, UploadError};

/// Talks to the application backend, which holds the host credentials.
pub struct ProxyTransport {
    client: reqwest::Client,
    base_url: String,
}

impl ProxyTransport {
    pub fn new(base_url: &str) -> Self {
        let base_url = base_url.trim().trim_end_matches('/').to_string();
        info!("Initialized proxy upload transport with base URL: {}", base_url);

        Self {
            client: reqwest::Client::new(),
            base_url,
        }
    }

    fn video_url(&self, video_id: &str) -> String {
        format!(
            "{}/talktrack/{}",
            self.base_url,
            urlencoding::encode(video_id)
        )
    }
}

#[async_trait]
impl Transport for ProxyTransport {
    fn name(&self) -> &'static str {
        "proxy"
    }

    async fn upload(
        &self,
        data: Vec<u8>,
        title: &str,
        on_progress: Option<ProgressCallback>,
    ) -> Result<String, UploadError> {
        let url = format!("{}/talktrack/upload", self.base_url);
        let total = data.len() as u64;
        let tracker = Arc::new(ProgressTracker::new(total, on_progress));

        debug!("POST {} ({} bytes)", url, total);
        let response = self
            .client
            .post(&url)
            .header("X-Video-Title", header_title(title))
            .header("Content-Type", "application/octet-stream")
            .header("Content-Length", total)
            .body(progress_body(data, Arc::clone(&tracker)))
            .send()
            .await?;

        let body = read_json(response).await?;
        let video_id = extract_video_id(&body, "videoId").ok_or(UploadError::MissingVideoId)?;
        tracker.complete();
        Ok(video_id)
    }

    async fn status(&self, video_id: &str) -> Result<ProcessingStatus, UploadError> {
        let url = format!("{}/status", self.video_url(video_id));
        debug!("GET {}", url);

        let response = self.client.get(&url).send().await?;
        let body = read_json(response).await?;
        Ok(proxy_status(&body))
    }

    async fn delete(&self, video_id: &str) -> Result<(), UploadError> {
        let url = self.video_url(video_id);
        debug!("DELETE {}", url);

        let response = self.client.delete(&url).send().await?;
        expect_success(response).await
    }
}
