//! Core data-model entities shared across the pipeline, store, and server
//! crates. These mirror the JSON shapes written to the object store, so
//! field names and optionality here ARE the wire format — changing them
//! changes what's on disk.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An incoming search request for a free-text query, as received by the
/// query orchestrator's `enqueue` handler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    pub query: String,
    /// Upper bound on candidate videos to fan out over for this request.
    /// Valid range `[1, 50]`.
    #[serde(default)]
    pub max_results: Option<u32>,
    /// Longest video duration, in minutes, eligible for this query. Valid
    /// range `[1, 180]`.
    #[serde(default)]
    pub max_duration_minutes: Option<u32>,
    /// Oldest video age, in days, eligible for this query. `0` or absent
    /// means no age filter.
    #[serde(default)]
    pub max_age_days: Option<u32>,
    /// Per-video fan-out concurrency for this request. Valid range `[1, 4]`.
    #[serde(default)]
    pub parallelism: Option<u32>,
    /// Optional platform category filter passed through to the search
    /// activity unmodified.
    #[serde(default)]
    pub category: Option<String>,
    /// Whether the optional stitched highlight video should be built.
    #[serde(default)]
    pub build_highlight_video: bool,
}

/// One discovered/ingested video and everything derived from it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoRecord {
    pub source_url: String,
    /// Content-addressed key of the downloaded video file in the object
    /// store (empty until download succeeds).
    pub object_key: String,
    pub title: Option<String>,
    pub duration_seconds: Option<f64>,
    pub status: VideoStatus,
    pub error: Option<String>,
    pub fetched_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoStatus {
    Pending,
    Downloaded,
    Transcribed,
    Summarized,
    Failed,
}

/// A single transcript segment as returned by the transcription activity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptSegment {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

/// Full transcript for one video, stored under its own object key. The
/// `keywords`/`summary`/`search_query` fields start empty at transcribe
/// time and are merged in by the summarize stage once it completes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transcript {
    pub video_object_key: String,
    pub language: Option<String>,
    pub text: String,
    pub segments: Vec<TranscriptSegment>,
    #[serde(default)]
    pub keywords: Option<Vec<TranscriptKeyword>>,
    #[serde(default)]
    pub summary: Option<String>,
    /// The free-text query that produced this video, so downstream indexing
    /// can filter transcripts by the search that surfaced them.
    #[serde(default)]
    pub search_query: Option<String>,
}

/// One keyword merged back into a transcript after summarization, with its
/// occurrence count and the segment it was first spoken in, if found.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptKeyword {
    pub word: String,
    pub count: u32,
    pub score: f32,
    pub start_time: Option<f64>,
}

/// A per-video summary produced by the LLM summarize activity.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct VideoSummary {
    pub summary: String,
    pub keywords: Vec<String>,
}

/// Keyword with its relevance score and occurrence count, the unit the
/// keyword engine sorts, merges, and coverage-compensates over.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Keyword {
    pub term: String,
    pub score: f32,
    pub count: u32,
}

/// LLM's raw keyword candidate before occurrence counting/normalization.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct KeywordCandidate {
    pub term: String,
    pub score: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct KeywordExtractionResponse {
    pub keywords: Vec<KeywordCandidate>,
}

/// One video's transcript as folded into the combined output — identity
/// and size, not the text itself (the text lives in `combined_transcription`
/// and the per-video transcript object).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub video_object: String,
    pub transcript_key: String,
    pub text_len: usize,
}

/// One evidence sentence backing a combined keyword, with the video it was
/// drawn from so a reader (or the highlight-video stitcher) can trace it
/// back to source footage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeySentenceItem {
    pub sentence: String,
    pub keyword: String,
    pub source_index: usize,
    pub source_video_object: String,
}

/// The aggregated per-query artifact: combined transcript, ranked
/// keywords, and evidence sentences built from all successfully
/// transcribed videos.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CombinedOutput {
    pub query: String,
    /// Number of videos folded into this combined output.
    pub count: u32,
    pub transcripts: Vec<TranscriptEntry>,
    pub combined_transcription: String,
    pub combined_keywords: Vec<Keyword>,
    pub key_sentences: Vec<KeySentenceItem>,
    pub combined_sentence: String,
    pub replace_count: u32,
    pub built_at: DateTime<Utc>,
}

/// The durable manifest tracked per query slug — the source of truth the
/// orchestrator reads back on every enqueue/continue-as-new cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryManifest {
    pub query: String,
    pub slug: String,
    pub videos: Vec<VideoRecord>,
    pub combined: Option<CombinedOutput>,
    pub highlight_video_object_key: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl QueryManifest {
    pub fn new(query: impl Into<String>, slug: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            slug: slug.into(),
            videos: Vec::new(),
            combined: None,
            highlight_video_object_key: None,
            updated_at: Utc::now(),
        }
    }
}
