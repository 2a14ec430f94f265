//! Restate workflows implementing the per-query pipeline: discover
//! candidates, fan out over them in bounded-parallelism chunks, then build
//! and persist the combined artifact.

use std::sync::Arc;

use restate_sdk::prelude::*;
use serde::{Deserialize, Serialize};

use reelquery_core::{PipelineDeps, VideoRecord, VideoStatus};
use reelquery_store::{ManifestPatch, ManifestStore, ObjectStore};

use crate::wire::EmptyRequest;

const MIN_PARALLELISM: u32 = 1;
const MAX_PARALLELISM: u32 = 4;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryPipelineRequest {
    pub query: String,
    pub slug: String,
    pub max_results: u32,
    pub max_duration_minutes: u32,
    pub max_age_days: u32,
    pub parallelism: Option<u32>,
    pub category: Option<String>,
    pub build_highlight_video: bool,
}
impl_restate_serde!(QueryPipelineRequest);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryPipelineResult {
    pub slug: String,
    pub videos_processed: u32,
    pub videos_failed: u32,
    pub replace_count: u32,
}
impl_restate_serde!(QueryPipelineResult);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoPipelineRequest {
    pub slug: String,
    pub source_url: String,
    pub query: String,
}
impl_restate_serde!(VideoPipelineRequest);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoPipelineResult {
    pub object_key: String,
    pub status: String,
}
impl_restate_serde!(VideoPipelineResult);

// ─── VideoPipelineWorkflow ──────────────────────────────────────────────────
//
// One instance per discovered video, keyed by a deterministic pipeline id so
// re-running the same query never double-downloads a video it already has.
// Each stage is its own `ctx.run()` so a crash mid-chunk resumes from the
// last completed stage instead of re-downloading everything.

#[restate_sdk::workflow]
#[name = "VideoPipelineWorkflow"]
pub trait VideoPipelineWorkflow {
    async fn run(req: VideoPipelineRequest) -> Result<VideoPipelineResult, HandlerError>;

    #[shared]
    async fn get_status(req: EmptyRequest) -> Result<String, HandlerError>;
}

pub struct VideoPipelineWorkflowImpl {
    deps: Arc<PipelineDeps>,
    store: Arc<ObjectStore>,
    manifests: Arc<ManifestStore>,
}

impl VideoPipelineWorkflowImpl {
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

impl VideoPipelineWorkflow for VideoPipelineWorkflowImpl {
    async fn run(
        &self,
        ctx: WorkflowContext<'_>,
        req: VideoPipelineRequest,
    ) -> Result<VideoPipelineResult, HandlerError> {
        ctx.set("status", "downloading".to_string());

        let deps = self.deps.clone();
        let store = self.store.clone();
        let slug = req.slug.clone();
        let source_url = req.source_url.clone();

        let record_json: String = ctx
            .run(|| async move {
                let record = crate::activities::download(&deps, &store, &slug, &source_url)
                    .await
                    .map_err(|e| TerminalError::new(format!("download failed: {e}")))?;
                serde_json::to_string(&record)
                    .map_err(|e| TerminalError::new(format!("serialize failed: {e}")).into())
            })
            .await?;
        let mut record: VideoRecord = serde_json::from_str(&record_json)
            .map_err(|e| TerminalError::new(format!("deserialize failed: {e}")))?;

        self.manifests
            .upsert(
                &req.slug,
                ManifestPatch {
                    videos: vec![record.clone()],
                    ..Default::default()
                },
            )
            .await
            .map_err(|e| TerminalError::new(format!("manifest upsert failed: {e}")))?;

        if record.status == VideoStatus::Failed {
            return Ok(VideoPipelineResult {
                object_key: record.object_key,
                status: "failed".to_string(),
            });
        }

        ctx.set("status", "transcribing".to_string());

        let deps = self.deps.clone();
        let store = self.store.clone();
        let slug = req.slug.clone();
        let object_key = record.object_key.clone();

        let transcript_text_result: Result<String, HandlerError> = ctx
            .run(|| async move {
                match crate::activities::transcribe(&deps, &store, &slug, &object_key).await {
                    Ok(transcript) => Ok(transcript.text),
                    Err(e) => Err(TerminalError::new(format!("transcribe failed: {e}")).into()),
                }
            })
            .await;

        let transcript_text = match transcript_text_result {
            Ok(text) => text,
            Err(_) => {
                record.status = VideoStatus::Failed;
                record.error = Some("transcription failed".to_string());
                self.manifests
                    .upsert(
                        &req.slug,
                        ManifestPatch {
                            videos: vec![record.clone()],
                            ..Default::default()
                        },
                    )
                    .await
                    .map_err(|e| TerminalError::new(format!("manifest upsert failed: {e}")))?;
                return Ok(VideoPipelineResult {
                    object_key: record.object_key,
                    status: "failed".to_string(),
                });
            }
        };

        record.status = VideoStatus::Transcribed;
        self.manifests
            .upsert(
                &req.slug,
                ManifestPatch {
                    videos: vec![record.clone()],
                    ..Default::default()
                },
            )
            .await
            .map_err(|e| TerminalError::new(format!("manifest upsert failed: {e}")))?;

        ctx.set("status", "summarizing".to_string());

        let deps = self.deps.clone();
        let store = self.store.clone();
        let slug = req.slug.clone();
        let object_key = record.object_key.clone();
        let query = req.query.clone();
        let summary_result: Result<String, HandlerError> = ctx
            .run(|| async move {
                let summary =
                    crate::activities::summarize(&deps, &store, &slug, &object_key, &query, &transcript_text)
                        .await
                        .map_err(|e| TerminalError::new(format!("summarize failed: {e}")))?;
                serde_json::to_string(&summary)
                    .map_err(|e| TerminalError::new(format!("serialize failed: {e}")).into())
            })
            .await;

        record.status = match summary_result {
            Ok(_) => VideoStatus::Summarized,
            Err(_) => VideoStatus::Transcribed,
        };

        self.manifests
            .upsert(
                &req.slug,
                ManifestPatch {
                    videos: vec![record.clone()],
                    ..Default::default()
                },
            )
            .await
            .map_err(|e| TerminalError::new(format!("manifest upsert failed: {e}")))?;

        ctx.set("status", "completed".to_string());

        Ok(VideoPipelineResult {
            object_key: record.object_key,
            status: format!("{:?}", record.status).to_lowercase(),
        })
    }

    async fn get_status(
        &self,
        ctx: SharedWorkflowContext<'_>,
        _req: EmptyRequest,
    ) -> Result<String, HandlerError> {
        Ok(ctx
            .get::<String>("status")
            .await?
            .unwrap_or_else(|| "unknown".to_string()))
    }
}

// ─── QueryPipelineWorkflow ──────────────────────────────────────────────────

#[restate_sdk::workflow]
#[name = "QueryPipelineWorkflow"]
pub trait QueryPipelineWorkflow {
    async fn run(req: QueryPipelineRequest) -> Result<QueryPipelineResult, HandlerError>;

    #[shared]
    async fn get_status(req: EmptyRequest) -> Result<String, HandlerError>;
}

pub struct QueryPipelineWorkflowImpl {
    deps: Arc<PipelineDeps>,
    store: Arc<ObjectStore>,
    manifests: Arc<ManifestStore>,
}

impl QueryPipelineWorkflowImpl {
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

impl QueryPipelineWorkflow for QueryPipelineWorkflowImpl {
    async fn run(
        &self,
        ctx: WorkflowContext<'_>,
        req: QueryPipelineRequest,
    ) -> Result<QueryPipelineResult, HandlerError> {
        ctx.set("status", "searching".to_string());

        let deps = self.deps.clone();
        let query = req.query.clone();
        let max_results = req.max_results;
        let max_duration_minutes = req.max_duration_minutes;
        let max_age_days = req.max_age_days;
        let category = req.category.clone();

        let urls_json: String = ctx
            .run(|| async move {
                let urls = crate::activities::search(
                    &deps,
                    &query,
                    max_results,
                    max_duration_minutes,
                    max_age_days,
                    category.as_deref(),
                )
                .await
                .map_err(|e| TerminalError::new(format!("search failed: {e}")))?;
                serde_json::to_string(&urls)
                    .map_err(|e| TerminalError::new(format!("serialize failed: {e}")).into())
            })
            .await?;
        let urls: Vec<String> = serde_json::from_str(&urls_json)
            .map_err(|e| TerminalError::new(format!("deserialize failed: {e}")))?;

        ctx.set("status", format!("processing {} videos", urls.len()));

        let parallelism = req
            .parallelism
            .unwrap_or(self.deps.config.pipeline_parallelism)
            .clamp(MIN_PARALLELISM, MAX_PARALLELISM) as usize;
        let mut processed = 0u32;
        let mut failed = 0u32;

        for (chunk_idx, chunk) in urls.chunks(parallelism).enumerate() {
            let futures = chunk.iter().enumerate().map(|(idx_in_chunk, source_url)| {
                let video_idx = chunk_idx * parallelism + idx_in_chunk;
                let pipeline_id = format!("video-{}-{}", req.slug, video_idx);
                let video_req = VideoPipelineRequest {
                    slug: req.slug.clone(),
                    source_url: source_url.clone(),
                    query: req.query.clone(),
                };
                ctx.workflow_client::<VideoPipelineWorkflowClient>(&pipeline_id)
                    .run(video_req)
                    .call()
            });

            for result in futures::future::join_all(futures).await {
                match result {
                    Ok(result) if result.status != "failed" => processed += 1,
                    _ => failed += 1,
                }
            }
        }

        ctx.set("status", "building combined output".to_string());

        let deps = self.deps.clone();
        let store = self.store.clone();
        let manifests = self.manifests.clone();
        let slug = req.slug.clone();

        let combined_result: Result<String, HandlerError> = ctx
            .run(|| async move {
                let manifest = manifests
                    .read(&slug)
                    .await
                    .map_err(|e| TerminalError::new(format!("manifest read failed: {e}")))?;
                let combined = crate::combined::build(&deps, &manifest, &store)
                    .await
                    .map_err(|e| TerminalError::new(format!("combined build failed: {e}")))?;
                crate::combined::persist(&slug, &combined, &store)
                    .await
                    .map_err(|e| TerminalError::new(format!("combined persist failed: {e}")))?;
                manifests
                    .upsert(
                        &slug,
                        ManifestPatch {
                            combined: Some(combined.clone()),
                            ..Default::default()
                        },
                    )
                    .await
                    .map_err(|e| TerminalError::new(format!("manifest upsert failed: {e}")))?;
                Ok(combined.replace_count.to_string())
            })
            .await;

        let replace_count = combined_result
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(0);

        if req.build_highlight_video {
            ctx.set("status", "stitching highlight video".to_string());

            let store = self.store.clone();
            let manifests = self.manifests.clone();
            let slug = req.slug.clone();

            let _: Result<String, HandlerError> = ctx
                .run(|| async move {
                    let manifest = manifests
                        .read(&slug)
                        .await
                        .map_err(|e| TerminalError::new(format!("manifest read failed: {e}")))?;
                    let Some(combined) = manifest.combined.clone() else {
                        return Ok("skipped".to_string());
                    };
                    let highlight_key =
                        crate::combined::build_highlight_video(&combined, &manifest, &store).await;
                    if let Some(key) = highlight_key {
                        manifests
                            .upsert(
                                &slug,
                                ManifestPatch {
                                    highlight_video_object_key: Some(key),
                                    ..Default::default()
                                },
                            )
                            .await
                            .map_err(|e| {
                                TerminalError::new(format!("manifest upsert failed: {e}"))
                            })?;
                    }
                    Ok("done".to_string())
                })
                .await;
        }

        let deps = self.deps.clone();
        let slug = req.slug.clone();
        let _ = ctx
            .run(|| async move {
                crate::activities::refresh_index(&deps, &slug).await;
                Ok::<(), HandlerError>(())
            })
            .await;

        ctx.set("status", "completed".to_string());

        Ok(QueryPipelineResult {
            slug: req.slug,
            videos_processed: processed,
            videos_failed: failed,
            replace_count,
        })
    }

    async fn get_status(
        &self,
        ctx: SharedWorkflowContext<'_>,
        _req: EmptyRequest,
    ) -> Result<String, HandlerError> {
        Ok(ctx
            .get::<String>("status")
            .await?
            .unwrap_or_else(|| "unknown".to_string()))
    }
}
