//! Trait boundaries for the black-box activities: discovering candidate
//! videos, downloading them, and transcribing speech to text. Concrete
//! adapters (a platform scraper, a download client, an STT engine) live
//! outside this workspace; these traits are the seam the pipeline schedules
//! against.

use crate::error::PipelineResult;
use crate::types::{Transcript, VideoRecord};
use async_trait::async_trait;

/// Discovers candidate videos for a free-text query. Implementations talk
/// to whatever video platform search API is configured; this crate only
/// needs the shape of the result.
#[async_trait]
pub trait VideoSearcher: Send + Sync {
    /// `max_duration_minutes` and `max_age_days` narrow the candidate set at
    /// the search provider itself rather than after download; `category` is
    /// an optional platform-specific filter passed through unmodified.
    async fn search(
        &self,
        query: &str,
        max_results: u32,
        max_duration_minutes: u32,
        max_age_days: u32,
        category: Option<&str>,
    ) -> PipelineResult<Vec<String>>;

    fn name(&self) -> &str {
        "unknown"
    }
}

/// Downloads a single video by source URL into the object store, returning
/// the populated record (object key, title, duration) or a failure
/// classified per [`crate::error::PipelineError`].
#[async_trait]
pub trait VideoDownloader: Send + Sync {
    async fn download(&self, source_url: &str) -> PipelineResult<VideoRecord>;

    fn name(&self) -> &str {
        "unknown"
    }
}

/// Transcribes a downloaded video's audio track to text.
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, video_object_key: &str) -> PipelineResult<Transcript>;

    fn name(&self) -> &str {
        "unknown"
    }
}
