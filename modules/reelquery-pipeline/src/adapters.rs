//! HTTP adapters for the black-box activities: platform video search,
//! download, and speech-to-text all live behind their own services this
//! crate only speaks the wire contract of. Swapping a platform scraper or
//! STT engine means pointing these at a different URL, not touching this
//! crate.

use async_trait::async_trait;
use reelquery_core::{PipelineError, PipelineResult, Transcript, VideoRecord, VideoStatus};
use serde::{Deserialize, Serialize};

pub struct HttpVideoSearcher {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpVideoSearcher {
    pub fn new(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }
}

#[derive(Serialize)]
struct SearchWireRequest<'a> {
    query: &'a str,
    limit: u32,
    max_duration_minutes: u32,
    max_age_days: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    category: Option<&'a str>,
}

#[derive(Deserialize)]
struct SearchWireResponse {
    urls: Vec<String>,
}

#[async_trait]
impl reelquery_core::VideoSearcher for HttpVideoSearcher {
    async fn search(
        &self,
        query: &str,
        max_results: u32,
        max_duration_minutes: u32,
        max_age_days: u32,
        category: Option<&str>,
    ) -> PipelineResult<Vec<String>> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&SearchWireRequest {
                query,
                limit: max_results,
                max_duration_minutes,
                max_age_days,
                category,
            })
            .send()
            .await
            .map_err(|e| PipelineError::transient(format!("search service request: {e}")))?;

        if !response.status().is_success() {
            return Err(PipelineError::external(format!(
                "search service returned {}",
                response.status()
            )));
        }

        let body: SearchWireResponse = response
            .json()
            .await
            .map_err(|e| PipelineError::external(format!("search service response: {e}")))?;

        Ok(body.urls)
    }

    fn name(&self) -> &str {
        "http"
    }
}

pub struct HttpVideoDownloader {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpVideoDownloader {
    pub fn new(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }
}

#[derive(Serialize)]
struct DownloadWireRequest<'a> {
    source_url: &'a str,
}

#[derive(Deserialize)]
struct DownloadWireResponse {
    object_key: String,
    title: Option<String>,
    duration_seconds: Option<f64>,
    is_live: bool,
}

#[async_trait]
impl reelquery_core::VideoDownloader for HttpVideoDownloader {
    async fn download(&self, source_url: &str) -> PipelineResult<VideoRecord> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&DownloadWireRequest { source_url })
            .send()
            .await
            .map_err(|e| PipelineError::transient(format!("download service request: {e}")))?;

        if response.status() == reqwest::StatusCode::UNPROCESSABLE_ENTITY {
            return Err(PipelineError::external(format!(
                "live stream rejected: {source_url}"
            )));
        }
        if !response.status().is_success() {
            return Err(PipelineError::transient(format!(
                "download service returned {}",
                response.status()
            )));
        }

        let body: DownloadWireResponse = response
            .json()
            .await
            .map_err(|e| PipelineError::external(format!("download service response: {e}")))?;

        if body.is_live {
            return Err(PipelineError::external(format!(
                "live stream rejected: {source_url}"
            )));
        }

        Ok(VideoRecord {
            source_url: source_url.to_string(),
            object_key: body.object_key,
            title: body.title,
            duration_seconds: body.duration_seconds,
            status: VideoStatus::Downloaded,
            error: None,
            fetched_at: chrono::Utc::now(),
        })
    }

    fn name(&self) -> &str {
        "http"
    }
}

pub struct HttpTranscriber {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpTranscriber {
    pub fn new(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }
}

#[derive(Serialize)]
struct TranscribeWireRequest<'a> {
    video_object_key: &'a str,
}

#[async_trait]
impl reelquery_core::Transcriber for HttpTranscriber {
    async fn transcribe(&self, video_object_key: &str) -> PipelineResult<Transcript> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&TranscribeWireRequest { video_object_key })
            .send()
            .await
            .map_err(|e| PipelineError::transient(format!("transcribe service request: {e}")))?;

        if !response.status().is_success() {
            return Err(PipelineError::external(format!(
                "transcribe service returned {}",
                response.status()
            )));
        }

        response
            .json::<Transcript>()
            .await
            .map_err(|e| PipelineError::external(format!("transcribe service response: {e}")))
    }

    fn name(&self) -> &str {
        "http"
    }
}
