//! Combined-artifact builder: folds every successfully transcribed video in
//! a query into one [`CombinedOutput`] — concatenated transcript text, a
//! coverage-compensated top keyword set, and an evidence sentence — then
//! persists each piece under its canonical object key.

use crate::highlight::{self, ClipSpec};
use crate::keyword::{self, TOPK};
use crate::sentence;
use reelquery_core::{
    CombinedOutput, Keyword, PipelineDeps, PipelineResult, QueryManifest, TranscriptEntry,
    VideoStatus,
};
use reelquery_store::{naming, ObjectStore};
use std::collections::HashMap;

const MAX_EVIDENCE_KEYWORDS: usize = TOPK;
const MAX_HIGHLIGHT_CLIPS: usize = 6;

/// One successfully transcribed video folded into the combined output,
/// carrying enough identity to trace every downstream artifact (keyword,
/// evidence sentence, highlight clip) back to its source.
struct TranscribedVideo {
    video_object: String,
    transcript_key: String,
    text: String,
}

/// Build the combined output for a query from its manifest's transcribed
/// videos. Videos that never reached [`VideoStatus::Transcribed`] or
/// [`VideoStatus::Summarized`] are skipped — a failed download or
/// transcription is recorded on the manifest but doesn't block the rest of
/// the query's results.
pub async fn build(
    deps: &PipelineDeps,
    manifest: &QueryManifest,
    store: &ObjectStore,
) -> PipelineResult<CombinedOutput> {
    let mut videos = Vec::new();
    let mut per_video_candidates: Vec<Vec<(String, f32)>> = Vec::new();

    for video in &manifest.videos {
        if !matches!(
            video.status,
            VideoStatus::Transcribed | VideoStatus::Summarized
        ) {
            continue;
        }

        let transcript_key = naming::transcript_key_from_video_key(&manifest.slug, &video.object_key);
        let transcript: reelquery_core::Transcript = match store.get_json(&transcript_key).await {
            Ok(t) => t,
            Err(_) => continue,
        };

        let candidates = crate::activities::extract_keywords(deps, &transcript.text)
            .await
            .unwrap_or_default();
        videos.push(TranscribedVideo {
            video_object: video.object_key.clone(),
            transcript_key,
            text: transcript.text,
        });
        per_video_candidates.push(candidates);
    }

    let texts: Vec<String> = videos.iter().map(|v| v.text.clone()).collect();

    let per_video_keywords: Vec<Vec<Keyword>> = texts
        .iter()
        .zip(per_video_candidates.iter())
        .map(|(text, candidates)| keyword::merge_with_counts(candidates, text))
        .collect();

    let mut combined_candidates: Vec<(String, f32)> = Vec::new();
    for kws in &per_video_keywords {
        for kw in kws {
            combined_candidates.push((kw.term.clone(), kw.score));
        }
    }
    let full_text = texts.join("\n");
    let merged = keyword::merge_with_counts(&combined_candidates, &full_text);

    let (top_keywords, replace_count) =
        keyword::apply_coverage_compensation(&merged, &texts, &per_video_keywords);

    let sentence_sources: Vec<(String, String)> = videos
        .iter()
        .map(|v| (v.video_object.clone(), v.text.clone()))
        .collect();
    let (combined_sentence, key_sentences) =
        sentence::extract_combined_sentence(&top_keywords, &sentence_sources, MAX_EVIDENCE_KEYWORDS);

    let transcripts: Vec<TranscriptEntry> = videos
        .iter()
        .map(|v| TranscriptEntry {
            video_object: v.video_object.clone(),
            transcript_key: v.transcript_key.clone(),
            text_len: v.text.len(),
        })
        .collect();

    Ok(CombinedOutput {
        query: manifest.query.clone(),
        count: transcripts.len() as u32,
        transcripts,
        combined_transcription: texts.join("\n\n---\n\n"),
        combined_keywords: top_keywords,
        key_sentences,
        combined_sentence,
        replace_count,
        built_at: chrono::Utc::now(),
    })
}

/// Persist every combined artifact under its canonical key: the structured
/// JSON output, plus flat text/JSON siblings for callers that only want one
/// piece.
pub async fn persist(slug: &str, output: &CombinedOutput, store: &ObjectStore) -> PipelineResult<()> {
    store
        .put_json(&naming::combined_output_key(slug), output)
        .await?;

    store
        .put(
            &naming::combined_transcription_key(slug),
            output.combined_transcription.as_bytes(),
            "text/plain; charset=utf-8",
        )
        .await?;

    store
        .put_json(&naming::combined_keywords_key(slug), &output.combined_keywords)
        .await?;

    store
        .put(
            &naming::combined_sentence_key(slug),
            output.combined_sentence.as_bytes(),
            "text/plain; charset=utf-8",
        )
        .await?;

    Ok(())
}

/// Best-effort stitched highlight video: for each evidence sentence, locate
/// the video/segment it came from, clip a short window around it, and
/// concatenate the clips. Returns the combined video's object key on
/// success, or `None` if `ffmpeg`/`ffprobe` aren't available, no evidence
/// sentence could be matched to a segment, or stitching otherwise fails —
/// none of which fail the query itself.
pub async fn build_highlight_video(
    output: &CombinedOutput,
    manifest: &QueryManifest,
    store: &ObjectStore,
) -> Option<String> {
    if output.key_sentences.is_empty() {
        return None;
    }

    let transcribed: Vec<_> = manifest
        .videos
        .iter()
        .filter(|v| matches!(v.status, VideoStatus::Transcribed | VideoStatus::Summarized))
        .collect();
    if transcribed.is_empty() {
        return None;
    }

    let mut per_video_transcripts = HashMap::new();
    for video in &transcribed {
        let transcript_key =
            naming::transcript_key_from_video_key(&manifest.slug, &video.object_key);
        if let Ok(transcript) = store.get_json::<reelquery_core::Transcript>(&transcript_key).await {
            per_video_transcripts.insert(video.object_key.clone(), transcript);
        }
    }

    let temp_dir = std::env::temp_dir().join(format!("reelquery-highlight-{}", manifest.slug));
    if tokio::fs::create_dir_all(&temp_dir).await.is_err() {
        return None;
    }

    let mut clips = Vec::new();
    for item in output.key_sentences.iter().take(MAX_HIGHLIGHT_CLIPS) {
        let Some(video) = transcribed
            .iter()
            .find(|v| v.object_key == item.source_video_object)
        else {
            continue;
        };
        let Some(transcript) = per_video_transcripts.get(&item.source_video_object) else {
            continue;
        };
        let Some(segment) = highlight::find_best_segment(&item.sentence, &transcript.segments)
        else {
            continue;
        };

        let local_path = temp_dir.join(
            video
                .object_key
                .rsplit('/')
                .next()
                .unwrap_or(&video.object_key),
        );
        let Ok(bytes) = store.get(&video.object_key).await else {
            continue;
        };
        if tokio::fs::write(&local_path, &bytes).await.is_err() {
            continue;
        }
        let Some(local_path_str) = local_path.to_str() else {
            continue;
        };

        let duration = video
            .duration_seconds
            .or(highlight::probe_duration(local_path_str).await)
            .unwrap_or(0.0);
        let (start, end) = highlight::clip_window(Some(segment), duration);
        clips.push(ClipSpec {
            source_path: local_path_str.to_string(),
            start,
            end,
        });
    }

    if clips.is_empty() {
        let _ = tokio::fs::remove_dir_all(&temp_dir).await;
        return None;
    }

    let output_path = temp_dir.join("combined-video.mp4");
    let output_path_str = output_path.to_str()?;
    if highlight::stitch_clips(&clips, output_path_str).await.is_err() {
        let _ = tokio::fs::remove_dir_all(&temp_dir).await;
        return None;
    }

    let stitched = match tokio::fs::read(&output_path).await {
        Ok(bytes) => bytes,
        Err(_) => {
            let _ = tokio::fs::remove_dir_all(&temp_dir).await;
            return None;
        }
    };

    let key = naming::combined_video_key(&manifest.slug);
    let uploaded = store.put(&key, &stitched, "video/mp4").await;
    let _ = tokio::fs::remove_dir_all(&temp_dir).await;

    match uploaded {
        Ok(()) => Some(key),
        Err(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use reelquery_core::VideoRecord;

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
    fn manifest_filters_to_transcribed_videos() {
        let mut manifest = QueryManifest::new("q", "q");
        manifest.videos.push(video("a.mp4", VideoStatus::Pending));
        manifest
            .videos
            .push(video("b.mp4", VideoStatus::Transcribed));
        manifest.videos.push(video("c.mp4", VideoStatus::Failed));

        let eligible: Vec<_> = manifest
            .videos
            .iter()
            .filter(|v| {
                matches!(
                    v.status,
                    VideoStatus::Transcribed | VideoStatus::Summarized
                )
            })
            .collect();
        assert_eq!(eligible.len(), 1);
        assert_eq!(eligible[0].object_key, "b.mp4");
    }
}
