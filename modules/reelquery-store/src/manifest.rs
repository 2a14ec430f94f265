//! Manifest store: the single read-modify-write entry point for a query's
//! durable state, serialized per slug so concurrent upserts never race.

use crate::naming;
use crate::object_store::ObjectStore;
use reelquery_core::{PipelineError, PipelineResult, CombinedOutput, QueryManifest, VideoRecord};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

const LOCK_TIMEOUT: Duration = Duration::from_secs(10);

/// Partial update applied to a manifest by [`ManifestStore::upsert`]. Any
/// field left `None`/empty is left untouched on the stored manifest.
#[derive(Debug, Clone, Default)]
pub struct ManifestPatch {
    pub videos: Vec<VideoRecord>,
    pub combined: Option<CombinedOutput>,
    pub highlight_video_object_key: Option<String>,
}

pub struct ManifestStore {
    store: ObjectStore,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl ManifestStore {
    pub fn new(store: ObjectStore) -> Self {
        Self {
            store,
            locks: Mutex::new(HashMap::new()),
        }
    }

    async fn lock_for(&self, slug: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks
            .entry(slug.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    pub async fn read(&self, slug: &str) -> PipelineResult<QueryManifest> {
        let key = naming::manifest_key(slug);
        match self.store.get_json(&key).await {
            Ok(manifest) => Ok(manifest),
            Err(PipelineError::NotFound(_)) => Ok(QueryManifest::new(slug, slug)),
            Err(e) => Err(e),
        }
    }

    /// Read-modify-write a query's manifest under a bounded-time per-slug
    /// lock. Returns `Conflict` if the lock can't be acquired in time so the
    /// caller can retry with jitter rather than block indefinitely.
    pub async fn upsert(&self, slug: &str, patch: ManifestPatch) -> PipelineResult<()> {
        let lock = self.lock_for(slug).await;
        let _guard = tokio::time::timeout(LOCK_TIMEOUT, lock.lock())
            .await
            .map_err(|_| {
                PipelineError::conflict(format!("manifest lock timed out for slug {slug}"))
            })?;

        let mut manifest = self.read(slug).await?;
        apply_patch(&mut manifest, patch);
        manifest.updated_at = chrono::Utc::now();

        let key = naming::manifest_key(slug);
        self.store.put_json(&key, &manifest).await
    }
}

fn apply_patch(manifest: &mut QueryManifest, patch: ManifestPatch) {
    for incoming in patch.videos {
        if let Some(existing) = manifest
            .videos
            .iter_mut()
            .find(|v| v.object_key == incoming.object_key)
        {
            merge_video_record(existing, incoming);
        } else {
            manifest.videos.push(incoming);
        }
    }

    if let Some(incoming_combined) = patch.combined {
        manifest.combined = Some(match manifest.combined.take() {
            Some(mut existing) => {
                existing.query = incoming_combined.query;
                existing.count = incoming_combined.count;
                existing.transcripts = incoming_combined.transcripts;
                existing.combined_transcription = incoming_combined.combined_transcription;
                existing.combined_keywords = incoming_combined.combined_keywords;
                existing.key_sentences = incoming_combined.key_sentences;
                existing.combined_sentence = incoming_combined.combined_sentence;
                existing.replace_count = incoming_combined.replace_count;
                existing.built_at = incoming_combined.built_at;
                existing
            }
            None => incoming_combined,
        });
    }

    if let Some(key) = patch.highlight_video_object_key {
        manifest.highlight_video_object_key = Some(key);
    }
}

/// Field-wise merge of an incoming video record onto the existing one:
/// fields the incoming record leaves unset keep the existing value, every
/// other field takes the incoming (later) value. `source_url`/`object_key`
/// identify the record and are never expected to change once set.
fn merge_video_record(existing: &mut VideoRecord, incoming: VideoRecord) {
    existing.source_url = incoming.source_url;
    existing.status = incoming.status;
    existing.fetched_at = incoming.fetched_at;
    if incoming.title.is_some() {
        existing.title = incoming.title;
    }
    if incoming.duration_seconds.is_some() {
        existing.duration_seconds = incoming.duration_seconds;
    }
    if incoming.error.is_some() {
        existing.error = incoming.error;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use reelquery_core::VideoStatus;

    fn video(object_key: &str, status: VideoStatus) -> VideoRecord {
        VideoRecord {
            source_url: format!("https://example.test/{object_key}"),
            object_key: object_key.to_string(),
            title: None,
            duration_seconds: None,
            status,
            error: None,
            fetched_at: Utc::now(),
        }
    }

    #[test]
    fn apply_patch_merges_videos_by_object_key() {
        let mut manifest = QueryManifest::new("q", "q");
        apply_patch(
            &mut manifest,
            ManifestPatch {
                videos: vec![video("a.mp4", VideoStatus::Downloaded)],
                ..Default::default()
            },
        );
        apply_patch(
            &mut manifest,
            ManifestPatch {
                videos: vec![video("a.mp4", VideoStatus::Transcribed)],
                ..Default::default()
            },
        );

        assert_eq!(manifest.videos.len(), 1);
        assert_eq!(manifest.videos[0].status, VideoStatus::Transcribed);
    }

    #[test]
    fn apply_patch_video_merge_keeps_fields_the_later_patch_leaves_unset() {
        let mut manifest = QueryManifest::new("q", "q");
        let mut downloaded = video("a.mp4", VideoStatus::Downloaded);
        downloaded.title = Some("Anti-gravity explainer".to_string());
        downloaded.duration_seconds = Some(120.0);
        apply_patch(
            &mut manifest,
            ManifestPatch {
                videos: vec![downloaded],
                ..Default::default()
            },
        );

        // The transcribe stage's patch only carries status + timestamps, not
        // title/duration — those should survive from the download patch.
        apply_patch(
            &mut manifest,
            ManifestPatch {
                videos: vec![video("a.mp4", VideoStatus::Transcribed)],
                ..Default::default()
            },
        );

        assert_eq!(manifest.videos.len(), 1);
        assert_eq!(manifest.videos[0].status, VideoStatus::Transcribed);
        assert_eq!(
            manifest.videos[0].title.as_deref(),
            Some("Anti-gravity explainer")
        );
        assert_eq!(manifest.videos[0].duration_seconds, Some(120.0));
    }

    #[test]
    fn apply_patch_appends_unknown_video_keys() {
        let mut manifest = QueryManifest::new("q", "q");
        apply_patch(
            &mut manifest,
            ManifestPatch {
                videos: vec![video("a.mp4", VideoStatus::Downloaded)],
                ..Default::default()
            },
        );
        apply_patch(
            &mut manifest,
            ManifestPatch {
                videos: vec![video("b.mp4", VideoStatus::Downloaded)],
                ..Default::default()
            },
        );

        assert_eq!(manifest.videos.len(), 2);
    }
}
