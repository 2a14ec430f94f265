//! Typed error taxonomy shared by every pipeline stage.
//!
//! Every activity and store operation returns a [`PipelineError`]. The
//! variant chosen determines whether the durable runtime retries the
//! originating `ctx.run()` step or surfaces the failure to the caller.

use thiserror::Error;

/// Error kinds produced anywhere in the query pipeline.
///
/// Retry behavior is keyed off the variant, not the message: workflow code
/// should match on this enum rather than string-matching `to_string()`.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Retriable: network blips, provider rate limits, timeouts. The caller
    /// should retry with backoff; a `ctx.run()` step surfaces this so Restate
    /// can re-execute it.
    #[error("transient failure: {0}")]
    Transient(String),

    /// The requested resource does not exist (object key, manifest slug,
    /// video id). Never retried.
    #[error("not found: {0}")]
    NotFound(String),

    /// Caller-supplied input failed validation (malformed query, unsupported
    /// language tag, empty URL list). Never retried.
    #[error("invalid input: {0}")]
    Invalid(String),

    /// A downstream black-box dependency (search/download/STT/LLM activity)
    /// returned a failure that isn't classified as transient. Retried up to
    /// that activity's own policy, then surfaces.
    #[error("external dependency failed: {0}")]
    External(String),

    /// A concurrent writer already holds the resource (manifest advisory
    /// lock timed out). Never retried automatically; caller decides whether
    /// to re-enqueue.
    #[error("conflict: resource locked: {0}")]
    Conflict(String),

    /// Unrecoverable: corrupt manifest JSON, programmer error, missing
    /// required configuration. Never retried.
    #[error("fatal: {0}")]
    Fatal(String),
}

impl PipelineError {
    pub fn transient(msg: impl Into<String>) -> Self {
        Self::Transient(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::Invalid(msg.into())
    }

    pub fn external(msg: impl Into<String>) -> Self {
        Self::External(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn fatal(msg: impl Into<String>) -> Self {
        Self::Fatal(msg.into())
    }

    /// Whether the durable runtime should retry the step that produced this
    /// error rather than surfacing it as terminal.
    pub fn is_retriable(&self) -> bool {
        matches!(self, Self::Transient(_) | Self::Conflict(_))
    }
}

impl From<s3::error::S3Error> for PipelineError {
    fn from(e: s3::error::S3Error) -> Self {
        Self::Transient(format!("object store: {e}"))
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(e: serde_json::Error) -> Self {
        Self::Fatal(format!("json: {e}"))
    }
}

/// Result type alias used throughout the pipeline crates.
pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
