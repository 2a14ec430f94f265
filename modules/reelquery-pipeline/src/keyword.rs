//! Keyword extraction and coverage compensation.
//!
//! The LLM supplies semantic relevance scores; this module derives
//! occurrence counts from the actual transcript text (never trusting the
//! model's claim that a term appears), then runs coverage compensation so
//! the combined top-N keyword set doesn't silently drop any one video's
//! contribution.

use reelquery_core::Keyword;
use std::collections::HashSet;

/// Number of keywords kept in the combined (cross-video) keyword set.
pub const TOPK: usize = 5;
/// Top-ranked combined keywords that coverage compensation may never evict.
pub const CORE_KEEP: usize = 2;
/// Maximum number of compensation replacement iterations.
pub const MAX_REPLACE: usize = 3;

/// Lowercase and strip punctuation, collapsing internal whitespace — the
/// same normalization applied before counting occurrences or deduping
/// candidate terms.
pub fn normalize_term(term: &str) -> String {
    let lowered = term.trim().to_lowercase();
    let mut out = String::with_capacity(lowered.len());
    let mut last_was_space = false;
    for ch in lowered.chars() {
        if ch.is_alphanumeric() || ch == '-' || ch == '_' || ch.is_whitespace() {
            if ch.is_whitespace() {
                if !last_was_space {
                    out.push(' ');
                }
                last_was_space = true;
            } else {
                out.push(ch);
                last_was_space = false;
            }
        }
    }
    out.trim().to_string()
}

/// Count case-insensitive, word-boundary occurrences of `term` in `text`.
pub fn count_occurrences(term: &str, text: &str) -> u32 {
    if term.is_empty() {
        return 0;
    }
    let text_lower = text.to_lowercase();
    let term_lower = term.to_lowercase();
    let term_is_word = term_lower.chars().all(|c| c.is_alphanumeric() || c == ' ');

    if !term_is_word {
        return text_lower.matches(term_lower.as_str()).count() as u32;
    }

    let mut count = 0u32;
    let bytes = text_lower.as_bytes();
    let mut start = 0;
    while let Some(pos) = text_lower[start..].find(term_lower.as_str()) {
        let idx = start + pos;
        let before_ok = idx == 0 || !is_word_byte(bytes[idx - 1]);
        let after_idx = idx + term_lower.len();
        let after_ok = after_idx >= bytes.len() || !is_word_byte(bytes[after_idx]);
        if before_ok && after_ok {
            count += 1;
        }
        start = idx + term_lower.len().max(1);
    }
    count
}

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Merge LLM-proposed candidates with occurrence counts, discarding
/// hallucinated terms (count == 0) and deduplicating by normalized term,
/// keeping the max score on collision. Sorted score DESC, count DESC,
/// term ASC.
pub fn merge_with_counts(candidates: &[(String, f32)], text: &str) -> Vec<Keyword> {
    let mut by_term: std::collections::HashMap<String, Keyword> = std::collections::HashMap::new();

    for (raw_term, score) in candidates {
        let term = normalize_term(raw_term);
        if term.is_empty() {
            continue;
        }
        let count = count_occurrences(&term, text);
        if count == 0 {
            continue;
        }
        by_term
            .entry(term.clone())
            .and_modify(|existing| existing.score = existing.score.max(*score))
            .or_insert(Keyword {
                term,
                score: *score,
                count,
            });
    }

    let mut merged: Vec<Keyword> = by_term.into_values().collect();
    sort_keywords(&mut merged);
    merged
}

fn sort_keywords(keywords: &mut [Keyword]) {
    keywords.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(b.count.cmp(&a.count))
            .then(a.term.cmp(&b.term))
    });
}

/// For each keyword, the set of transcript indices it appears in.
pub fn compute_coverage(keywords: &[Keyword], transcripts: &[String]) -> Vec<HashSet<usize>> {
    keywords
        .iter()
        .map(|kw| {
            transcripts
                .iter()
                .enumerate()
                .filter(|(_, text)| count_occurrences(&kw.term, text) > 0)
                .map(|(idx, _)| idx)
                .collect()
        })
        .collect()
}

/// Ensure every transcript is represented in the combined top-`TOPK`
/// keywords by swapping in the best candidate from an uncovered transcript,
/// protecting the top `CORE_KEEP` from eviction, bounded to `MAX_REPLACE`
/// swaps. Returns the final top-`TOPK` list and how many swaps were made.
pub fn apply_coverage_compensation(
    combined_keywords: &[Keyword],
    transcripts: &[String],
    per_transcript_keywords: &[Vec<Keyword>],
) -> (Vec<Keyword>, u32) {
    if combined_keywords.len() < TOPK {
        return (combined_keywords.to_vec(), 0);
    }

    let mut top: Vec<Keyword> = combined_keywords[..TOPK].to_vec();
    let mut replace_count = 0u32;

    for _ in 0..MAX_REPLACE {
        let coverage = compute_coverage(&top, transcripts);
        let covered: HashSet<usize> = coverage.iter().flatten().copied().collect();

        let uncovered_idx = (0..transcripts.len()).find(|i| !covered.contains(i));
        let Some(uncovered_idx) = uncovered_idx else {
            break;
        };

        let existing_terms: HashSet<&str> = top.iter().map(|k| k.term.as_str()).collect();
        let candidate = per_transcript_keywords
            .get(uncovered_idx)
            .into_iter()
            .flatten()
            .find(|kw| !existing_terms.contains(kw.term.as_str()));

        let Some(candidate) = candidate else {
            break;
        };

        let mut removable: Vec<(usize, usize, f32, u32)> = top
            .iter()
            .enumerate()
            .skip(CORE_KEEP)
            .map(|(idx, kw)| (coverage[idx].len(), idx, kw.score, kw.count))
            .collect();

        if removable.is_empty() {
            break;
        }

        removable.sort_by(|a, b| {
            a.0.cmp(&b.0)
                .then(a.2.partial_cmp(&b.2).unwrap_or(std::cmp::Ordering::Equal))
                .then(a.3.cmp(&b.3))
        });
        let remove_idx = removable[0].1;

        top[remove_idx] = candidate.clone();
        sort_keywords(&mut top);
        replace_count += 1;
    }

    (top, replace_count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_punctuation_and_case() {
        assert_eq!(normalize_term("  Anti-Gravity!!  "), "anti-gravity");
        assert_eq!(normalize_term("Hover, Boards"), "hover boards");
    }

    #[test]
    fn count_occurrences_is_word_boundary_and_case_insensitive() {
        let text = "The CAT sat near the category of cats.";
        assert_eq!(count_occurrences("cat", text), 1);
        assert_eq!(count_occurrences("cats", text), 1);
    }

    #[test]
    fn merge_with_counts_drops_hallucinated_terms() {
        let candidates = vec![
            ("magnet".to_string(), 0.9),
            ("unicorn".to_string(), 0.95),
        ];
        let text = "A strong magnet lifted the magnet again.";
        let merged = merge_with_counts(&candidates, text);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].term, "magnet");
        assert_eq!(merged[0].count, 2);
    }

    #[test]
    fn merge_with_counts_keeps_max_score_on_collision() {
        let candidates = vec![("magnet".to_string(), 0.5), ("Magnet".to_string(), 0.9)];
        let text = "magnet magnet";
        let merged = merge_with_counts(&candidates, text);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].score, 0.9);
    }

    fn kw(term: &str, score: f32, count: u32) -> Keyword {
        Keyword {
            term: term.to_string(),
            score,
            count,
        }
    }

    #[test]
    fn compute_coverage_finds_matching_transcripts() {
        let keywords = vec![kw("magnet", 0.9, 2), kw("rocket", 0.8, 1)];
        let transcripts = vec![
            "a magnet lifted it".to_string(),
            "the rocket launched".to_string(),
        ];
        let coverage = compute_coverage(&keywords, &transcripts);
        assert_eq!(coverage[0], HashSet::from([0]));
        assert_eq!(coverage[1], HashSet::from([1]));
    }

    #[test]
    fn coverage_compensation_swaps_in_uncovered_video_keyword() {
        // Five combined keywords, all of which only ever appear in transcript 0;
        // transcript 1 only has "gyroscope", which must be swapped in.
        let combined = vec![
            kw("alpha", 0.95, 3),
            kw("beta", 0.9, 3),
            kw("gamma", 0.8, 2),
            kw("delta", 0.7, 2),
            kw("epsilon", 0.6, 1),
        ];
        let transcripts = vec![
            "alpha beta gamma delta epsilon all here".to_string(),
            "only gyroscope mentioned here".to_string(),
        ];
        let per_transcript = vec![
            vec![kw("alpha", 0.95, 1)],
            vec![kw("gyroscope", 0.5, 1)],
        ];

        let (top, replacements) =
            apply_coverage_compensation(&combined, &transcripts, &per_transcript);

        assert_eq!(replacements, 1);
        assert!(top.iter().any(|k| k.term == "gyroscope"));
        // core keywords (rank 0, 1) are protected
        assert_eq!(top.iter().filter(|k| k.term == "alpha").count(), 1);
        assert_eq!(top.iter().filter(|k| k.term == "beta").count(), 1);
    }

    #[test]
    fn coverage_compensation_is_noop_below_topk() {
        let combined = vec![kw("alpha", 0.9, 1), kw("beta", 0.8, 1)];
        let (top, replacements) = apply_coverage_compensation(&combined, &[], &[]);
        assert_eq!(replacements, 0);
        assert_eq!(top.len(), 2);
    }
}
