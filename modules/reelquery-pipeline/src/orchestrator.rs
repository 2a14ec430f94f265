//! Query orchestrator: the durable entry point a caller signals with a
//! free-text query. A [`QueryObject`] Virtual Object is keyed by the
//! query's slug, so Restate serializes concurrent enqueues for the same
//! query and a duplicate signal while one is already running is absorbed
//! rather than starting a second pipeline run.

use std::sync::Arc;

use restate_sdk::prelude::*;
use serde::{Deserialize, Serialize};

use reelquery_core::{PipelineDeps, PipelineError, PipelineResult};
use reelquery_store::{ManifestStore, ObjectStore};

use crate::runner::{QueryPipelineRequest, QueryPipelineResult, QueryPipelineWorkflowClient};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnqueueRequest {
    pub query: String,
    /// Upper bound on candidate videos to fan out over. Valid range
    /// `[1, 50]`; defaults to [`DEFAULT_MAX_RESULTS`].
    #[serde(default)]
    pub max_results: Option<u32>,
    /// Longest video duration, in minutes, eligible for this query. Valid
    /// range `[1, 180]`; defaults to the upper bound (no effective filter).
    #[serde(default)]
    pub max_duration_minutes: Option<u32>,
    /// Oldest video age, in days, eligible for this query. `0` or absent
    /// means no age filter.
    #[serde(default)]
    pub max_age_days: Option<u32>,
    /// Per-video fan-out concurrency override. Valid range `[1, 4]`;
    /// defaults to the server's configured `pipeline_parallelism`.
    #[serde(default)]
    pub parallelism: Option<u32>,
    /// Optional platform category filter passed through to the search
    /// activity unmodified.
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub build_highlight_video: bool,
}
impl_restate_serde!(EnqueueRequest);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnqueueResult {
    pub slug: String,
    pub deduped: bool,
}
impl_restate_serde!(EnqueueResult);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResult {
    pub slug: String,
    pub processed_count: u32,
    pub last_query: Option<String>,
    pub videos_known: u32,
    pub has_combined_output: bool,
}
impl_restate_serde!(StatusResult);

const DEFAULT_MAX_RESULTS: u32 = 10;
const MIN_LIMIT: u32 = 1;
const MAX_LIMIT: u32 = 50;
const MIN_PARALLELISM: u32 = 1;
const MAX_PARALLELISM: u32 = 4;
const MIN_DURATION_MINUTES: u32 = 1;
const MAX_DURATION_MINUTES: u32 = 180;

/// Range-check the request-supplied overrides. Fields left `None` use their
/// defaults and are never out of range.
fn validate_enqueue(req: &EnqueueRequest) -> PipelineResult<()> {
    if let Some(limit) = req.max_results {
        if !(MIN_LIMIT..=MAX_LIMIT).contains(&limit) {
            return Err(PipelineError::invalid(format!(
                "max_results must be between {MIN_LIMIT} and {MAX_LIMIT}, got {limit}"
            )));
        }
    }
    if let Some(parallelism) = req.parallelism {
        if !(MIN_PARALLELISM..=MAX_PARALLELISM).contains(&parallelism) {
            return Err(PipelineError::invalid(format!(
                "parallelism must be between {MIN_PARALLELISM} and {MAX_PARALLELISM}, got {parallelism}"
            )));
        }
    }
    if let Some(minutes) = req.max_duration_minutes {
        if !(MIN_DURATION_MINUTES..=MAX_DURATION_MINUTES).contains(&minutes) {
            return Err(PipelineError::invalid(format!(
                "max_duration_minutes must be between {MIN_DURATION_MINUTES} and {MAX_DURATION_MINUTES}, got {minutes}"
            )));
        }
    }
    Ok(())
}

/// Once this many query runs have been recorded against a single slug's
/// object state, the counter resets to 0 rather than growing unbounded —
/// the Virtual Object equivalent of a workflow's continue-as-new, since
/// objects have no run-history to truncate but durable K/V state still
/// benefits from a bounded high-water mark.
const PROCESSED_COUNT_RESET: u32 = 100;

#[restate_sdk::object]
#[name = "Query"]
pub trait QueryObject {
    async fn enqueue(req: EnqueueRequest) -> Result<EnqueueResult, HandlerError>;

    #[shared]
    async fn status(req: crate::wire::EmptyRequest) -> Result<StatusResult, HandlerError>;
}

pub struct QueryObjectImpl {
    deps: Arc<PipelineDeps>,
    store: Arc<ObjectStore>,
    manifests: Arc<ManifestStore>,
}

impl QueryObjectImpl {
    pub fn with_deps(
        deps: Arc<PipelineDeps>,
        store: Arc<ObjectStore>,
        manifests: Arc<ManifestStore>,
    ) -> Self {
        Self {
            deps,
            store,
            manifests,
        }
    }
}

impl QueryObject for QueryObjectImpl {
    async fn enqueue(
        &self,
        ctx: ObjectContext<'_>,
        req: EnqueueRequest,
    ) -> Result<EnqueueResult, HandlerError> {
        if req.query.trim().is_empty() {
            return Err(
                TerminalError::new(PipelineError::invalid("query must not be empty").to_string())
                    .into(),
            );
        }
        validate_enqueue(&req).map_err(|e| TerminalError::new(e.to_string()))?;

        let slug = ctx.key().to_string();

        let in_flight = ctx.get::<bool>("in_flight").await?.unwrap_or(false);
        if in_flight {
            tracing::info!(slug, "enqueue deduped: a run is already in flight for this slug");
            return Ok(EnqueueResult {
                slug,
                deduped: true,
            });
        }

        ctx.set("in_flight", true);
        ctx.set("last_query", req.query.clone());

        let pipeline_req = QueryPipelineRequest {
            query: req.query.clone(),
            slug: slug.clone(),
            max_results: req.max_results.unwrap_or(DEFAULT_MAX_RESULTS),
            max_duration_minutes: req.max_duration_minutes.unwrap_or(MAX_DURATION_MINUTES),
            max_age_days: req.max_age_days.unwrap_or(0),
            parallelism: req.parallelism,
            category: req.category.clone(),
            build_highlight_video: req.build_highlight_video,
        };

        let result: Result<QueryPipelineResult, HandlerError> = ctx
            .workflow_client::<QueryPipelineWorkflowClient>(&slug)
            .run(pipeline_req)
            .call()
            .await;

        ctx.set("in_flight", false);

        let processed_count = ctx.get::<u32>("processed_count").await?.unwrap_or(0);
        let next_count = if processed_count + 1 >= PROCESSED_COUNT_RESET {
            0
        } else {
            processed_count + 1
        };
        ctx.set("processed_count", next_count);

        result?;

        Ok(EnqueueResult {
            slug,
            deduped: false,
        })
    }

    async fn status(
        &self,
        ctx: SharedObjectContext<'_>,
        _req: crate::wire::EmptyRequest,
    ) -> Result<StatusResult, HandlerError> {
        let slug = ctx.key().to_string();
        let processed_count = ctx.get::<u32>("processed_count").await?.unwrap_or(0);
        let last_query = ctx.get::<String>("last_query").await?;

        let manifest = self.manifests.read(&slug).await.ok();
        let videos_known = manifest.as_ref().map(|m| m.videos.len()).unwrap_or(0) as u32;
        let has_combined_output = manifest.map(|m| m.combined.is_some()).unwrap_or(false);

        Ok(StatusResult {
            slug,
            processed_count,
            last_query,
            videos_known,
            has_combined_output,
        })
    }
}
