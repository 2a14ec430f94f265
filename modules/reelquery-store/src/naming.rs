//! Canonical per-query slug and object-key layout, plus read-only fallback
//! onto legacy flat keys left behind by earlier layout generations.

/// Derive the canonical slug for a query. Mirrors what the original batch
/// tooling did for directory names: transliterate non-Latin scripts before
/// slugifying so CJK (and other non-Latin) queries get stable, readable
/// ASCII slugs instead of collapsing to `_`.
pub fn slug(query: &str) -> String {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        return "batch".to_string();
    }

    let transliterated = deunicode::deunicode(trimmed);
    let lowered = transliterated.to_lowercase();

    let mut out = String::with_capacity(lowered.len());
    let mut last_was_sep = false;
    for ch in lowered.chars() {
        if ch.is_ascii_alphanumeric() {
            out.push(ch);
            last_was_sep = false;
        } else if ch.is_whitespace() {
            if !last_was_sep && !out.is_empty() {
                out.push('-');
                last_was_sep = true;
            }
        } else if !last_was_sep && !out.is_empty() {
            out.push('_');
            last_was_sep = true;
        }
    }

    let trimmed_out = out.trim_matches(|c| c == '-' || c == '_');
    if trimmed_out.is_empty() {
        "batch".to_string()
    } else {
        trimmed_out.to_string()
    }
}

/// Object-store category under a query's canonical namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Videos,
    Thumbnails,
    Transcripts,
    Combined,
}

impl Category {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Videos => "videos",
            Self::Thumbnails => "thumbnails",
            Self::Transcripts => "transcripts",
            Self::Combined => "combined",
        }
    }
}

pub fn key_for(slug: &str, category: Category, filename: &str) -> String {
    format!("queries/{}/{}/{}", slug, category.as_str(), filename)
}

/// Corresponding flat legacy key for a canonical key, used as a read-only
/// fallback when the canonical object is missing.
pub fn legacy_key_for(category: Category, filename: &str) -> String {
    format!("{}/{}", category.as_str(), filename)
}

pub fn manifest_key(slug: &str) -> String {
    format!("queries/{}/manifest.json", slug)
}

pub fn combined_output_key(slug: &str) -> String {
    format!("queries/{}/combined/combined-output.json", slug)
}

pub fn legacy_combined_output_key(slug: &str) -> String {
    format!("process/batch-{}/combined-output.json", slug)
}

pub fn combined_transcription_key(slug: &str) -> String {
    format!("queries/{}/combined/combined-transcription.txt", slug)
}

pub fn combined_keywords_key(slug: &str) -> String {
    format!("queries/{}/combined/combined-keywords.json", slug)
}

pub fn combined_sentence_key(slug: &str) -> String {
    format!("queries/{}/combined/combined-sentence.txt", slug)
}

pub fn combined_video_key(slug: &str) -> String {
    format!("queries/{}/combined/combined-video.mp4", slug)
}

/// Derive a video's transcript key from its canonical or legacy video
/// object key, replacing the media extension with `.json` under
/// `transcripts/`.
pub fn transcript_key_from_video_key(slug: &str, video_key: &str) -> String {
    let basename = video_key.rsplit('/').next().unwrap_or(video_key);
    let stem = basename.rsplit_once('.').map(|(s, _)| s).unwrap_or(basename);
    key_for(slug, Category::Transcripts, &format!("{stem}.json"))
}

pub fn legacy_transcript_key_from_video_key(video_key: &str) -> String {
    let basename = video_key.rsplit('/').next().unwrap_or(video_key);
    let stem = basename.rsplit_once('.').map(|(s, _)| s).unwrap_or(basename);
    legacy_key_for(Category::Transcripts, &format!("{stem}.json"))
}

/// Derive the legacy flat-layout key a canonical `queries/<slug>/...` key
/// would have lived at under the previous generation's layout, if any.
/// Returns `None` for keys with no legacy counterpart (the manifest, and
/// any combined artifact besides `combined-output.json`, never lived under
/// the old layout).
pub fn legacy_fallback_for(canonical_key: &str) -> Option<String> {
    let rest = canonical_key.strip_prefix("queries/")?;
    let (slug, tail) = rest.split_once('/')?;

    if tail == "combined/combined-output.json" {
        return Some(legacy_combined_output_key(slug));
    }

    let (category_str, filename) = tail.split_once('/')?;
    let category = match category_str {
        "videos" => Category::Videos,
        "thumbnails" => Category::Thumbnails,
        "transcripts" => Category::Transcripts,
        _ => return None,
    };
    Some(legacy_key_for(category, filename))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_ascii_query() {
        assert_eq!(slug("Anti gravity"), "anti-gravity");
    }

    #[test]
    fn slug_collapses_punctuation() {
        assert_eq!(slug("  hello,,  world!! "), "hello_world");
    }

    #[test]
    fn slug_empty_query_falls_back() {
        assert_eq!(slug(""), "batch");
        assert_eq!(slug("   "), "batch");
    }

    #[test]
    fn slug_cjk_query_is_pinned_to_ascii() {
        let s = slug("反重力");
        assert!(!s.is_empty());
        assert!(s.is_ascii());
        assert_ne!(s, "batch");
    }

    #[test]
    fn key_for_builds_canonical_layout() {
        assert_eq!(
            key_for("anti-gravity", Category::Videos, "abc123.mp4"),
            "queries/anti-gravity/videos/abc123.mp4"
        );
    }

    #[test]
    fn transcript_key_strips_extension() {
        assert_eq!(
            transcript_key_from_video_key("anti-gravity", "queries/anti-gravity/videos/abc123.mp4"),
            "queries/anti-gravity/transcripts/abc123.json"
        );
    }

    #[test]
    fn legacy_fallback_for_maps_each_category() {
        assert_eq!(
            legacy_fallback_for("queries/s/videos/abc123.mp4"),
            Some("videos/abc123.mp4".to_string())
        );
        assert_eq!(
            legacy_fallback_for("queries/s/transcripts/abc123.json"),
            Some("transcripts/abc123.json".to_string())
        );
        assert_eq!(
            legacy_fallback_for("queries/s/combined/combined-output.json"),
            Some("process/batch-s/combined-output.json".to_string())
        );
        assert_eq!(legacy_fallback_for("queries/s/manifest.json"), None);
        assert_eq!(
            legacy_fallback_for("queries/s/combined/combined-video.mp4"),
            None
        );
    }

    #[test]
    fn manifest_and_combined_keys() {
        assert_eq!(manifest_key("s"), "queries/s/manifest.json");
        assert_eq!(
            combined_output_key("s"),
            "queries/s/combined/combined-output.json"
        );
        assert_eq!(
            legacy_combined_output_key("s"),
            "process/batch-s/combined-output.json"
        );
    }
}
