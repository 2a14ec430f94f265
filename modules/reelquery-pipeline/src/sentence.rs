//! Evidence sentence extraction: picks the sentence that best demonstrates
//! each combined keyword, drawn from the transcripts that actually contain
//! it, then stitches those into one combined evidence sentence.

use crate::keyword::count_occurrences;
use reelquery_core::{KeySentenceItem, Keyword};

/// Split transcript text into sentences on `.`, `!`, `?`, or their
/// full-width CJK equivalents, discarding empty fragments.
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();

    for ch in text.chars() {
        current.push(ch);
        if matches!(ch, '.' | '!' | '?' | '。' | '！' | '？') {
            let trimmed = current.trim().to_string();
            if !trimmed.is_empty() {
                sentences.push(trimmed);
            }
            current.clear();
        }
    }
    let trailing = current.trim().to_string();
    if !trailing.is_empty() {
        sentences.push(trailing);
    }

    sentences
}

/// First sentence (in order) that contains `term` as a whole word.
pub fn find_sentence_with_keyword<'a>(sentences: &'a [String], term: &str) -> Option<&'a str> {
    sentences
        .iter()
        .find(|s| count_occurrences(term, s) > 0)
        .map(|s| s.as_str())
}

/// Build the combined evidence sentence: for each of the first
/// `max_keywords` combined keywords, find the first not-yet-used sentence
/// (across all transcripts, in order) that demonstrates it, then join with
/// ". ". `transcripts` pairs each video's object key with its transcript
/// text so every evidence sentence can be traced back to its source video.
pub fn extract_combined_sentence(
    keywords: &[Keyword],
    transcripts: &[(String, String)],
    max_keywords: usize,
) -> (String, Vec<KeySentenceItem>) {
    let per_transcript_sentences: Vec<Vec<String>> = transcripts
        .iter()
        .map(|(_, text)| split_sentences(text))
        .collect();

    let mut seen = std::collections::HashSet::new();
    let mut key_sentences = Vec::new();

    for keyword in keywords.iter().take(max_keywords) {
        let found = per_transcript_sentences
            .iter()
            .enumerate()
            .find_map(|(source_index, sentences)| {
                find_sentence_with_keyword(sentences, &keyword.term)
                    .filter(|s| !seen.contains(*s))
                    .map(|s| (source_index, s.to_string()))
            });
        if let Some((source_index, sentence)) = found {
            seen.insert(sentence.clone());
            key_sentences.push(KeySentenceItem {
                sentence,
                keyword: keyword.term.clone(),
                source_index,
                source_video_object: transcripts[source_index].0.clone(),
            });
        }
    }

    let mut combined = key_sentences
        .iter()
        .map(|item| item.sentence.as_str())
        .collect::<Vec<_>>()
        .join(". ");
    if !combined.is_empty() && !matches!(combined.chars().last(), Some('.' | '!' | '?')) {
        combined.push('.');
    }

    (combined, key_sentences)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kw(term: &str) -> Keyword {
        Keyword {
            term: term.to_string(),
            score: 1.0,
            count: 1,
        }
    }

    #[test]
    fn split_sentences_handles_mixed_punctuation() {
        let text = "Hello world. How are you? Fine! 你好吗？";
        let sentences = split_sentences(text);
        assert_eq!(
            sentences,
            vec!["Hello world.", "How are you?", "Fine!", "你好吗？"]
        );
    }

    #[test]
    fn split_sentences_drops_empty_fragments() {
        let text = "One.   Two.";
        let sentences = split_sentences(text);
        assert_eq!(sentences, vec!["One.", "Two."]);
    }

    #[test]
    fn find_sentence_with_keyword_is_word_boundary() {
        let sentences = vec!["The cat sat.".to_string(), "A category exists.".to_string()];
        assert_eq!(
            find_sentence_with_keyword(&sentences, "cat"),
            Some("The cat sat.")
        );
    }

    #[test]
    fn extract_combined_sentence_deduplicates_across_keywords() {
        let keywords = vec![kw("magnet"), kw("rocket")];
        let transcripts = vec![
            (
                "video-a".to_string(),
                "A magnet and a rocket both appeared here.".to_string(),
            ),
            (
                "video-b".to_string(),
                "Only the rocket launched in this clip.".to_string(),
            ),
        ];
        let (combined, key_sentences) = extract_combined_sentence(&keywords, &transcripts, 5);
        assert_eq!(key_sentences.len(), 2);
        assert!(combined.ends_with('.'));
        assert_ne!(key_sentences[0].sentence, key_sentences[1].sentence);
        assert_eq!(key_sentences[0].source_video_object, "video-a");
        assert_eq!(key_sentences[0].keyword, "magnet");
    }

    #[test]
    fn extract_combined_sentence_respects_max_keywords() {
        let keywords = vec![kw("magnet"), kw("rocket"), kw("gyroscope")];
        let transcripts = vec![(
            "video-a".to_string(),
            "A magnet, a rocket, and a gyroscope.".to_string(),
        )];
        let (_, key_sentences) = extract_combined_sentence(&keywords, &transcripts, 2);
        assert_eq!(key_sentences.len(), 1);
    }

    #[test]
    fn extract_combined_sentence_empty_when_no_matches() {
        let keywords = vec![kw("nonexistent")];
        let transcripts = vec![("video-a".to_string(), "Nothing relevant here.".to_string())];
        let (combined, key_sentences) = extract_combined_sentence(&keywords, &transcripts, 5);
        assert!(combined.is_empty());
        assert!(key_sentences.is_empty());
    }
}
