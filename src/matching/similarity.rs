//! Fuzzy string similarity for speech transcripts
//!
//! All scores are in `[0, 1]`. Transcribed speech is noisy at the word level
//! (dropped articles, near-homophones) so the scoring family combines
//! token-based comparison with a windowed partial match that ignores filler
//! words around the phrase of interest.

use std::collections::BTreeSet;

/// Normalize transcript text: lowercase, trim, collapse internal whitespace
#[must_use]
pub fn normalize(text: &str) -> String {
    text.to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Levenshtein edit distance over characters
#[must_use]
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0usize; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

/// Normalized similarity: `1 - distance / max_len`
///
/// Two empty strings are identical (score 1.0).
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn ratio(a: &str, b: &str) -> f32 {
    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 1.0;
    }
    1.0 - levenshtein(a, b) as f32 / max_len as f32
}

/// Similarity after sorting whitespace tokens, so word order is ignored
#[must_use]
pub fn token_sort_ratio(a: &str, b: &str) -> f32 {
    ratio(&sorted_tokens(a), &sorted_tokens(b))
}

/// Token-set similarity: shared tokens count fully, extras are penalized
/// proportionally
///
/// A transcript that contains every word of the phrase (in any order, with
/// extra words around it) still scores high.
#[must_use]
pub fn token_set_ratio(a: &str, b: &str) -> f32 {
    let ta: BTreeSet<&str> = a.split_whitespace().collect();
    let tb: BTreeSet<&str> = b.split_whitespace().collect();

    if ta.is_empty() && tb.is_empty() {
        return 1.0;
    }
    if ta.is_empty() || tb.is_empty() {
        return 0.0;
    }

    let shared = join(ta.intersection(&tb));
    let only_a = join(ta.difference(&tb));
    let only_b = join(tb.difference(&ta));

    let with_a = concat(&shared, &only_a);
    let with_b = concat(&shared, &only_b);

    ratio(&shared, &with_a)
        .max(ratio(&shared, &with_b))
        .max(ratio(&with_a, &with_b))
}

/// Best similarity of `needle` against any same-length word window of
/// `haystack`
///
/// Leading or trailing filler words in the haystack do not depress the score.
#[must_use]
pub fn partial_ratio(needle: &str, haystack: &str) -> f32 {
    let n: Vec<&str> = needle.split_whitespace().collect();
    let h: Vec<&str> = haystack.split_whitespace().collect();

    if n.is_empty() && h.is_empty() {
        return 1.0;
    }
    if n.is_empty() || h.is_empty() {
        return 0.0;
    }
    if n.len() >= h.len() {
        return ratio(&n.join(" "), &h.join(" "));
    }

    let needle = n.join(" ");
    h.windows(n.len())
        .map(|w| ratio(&needle, &w.join(" ")))
        .fold(0.0f32, f32::max)
}

fn sorted_tokens(text: &str) -> String {
    let mut tokens: Vec<&str> = text.split_whitespace().collect();
    tokens.sort_unstable();
    tokens.join(" ")
}

fn join<'a>(tokens: impl Iterator<Item = &'a &'a str>) -> String {
    tokens.copied().collect::<Vec<_>>().join(" ")
}

fn concat(head: &str, tail: &str) -> String {
    if head.is_empty() {
        tail.to_string()
    } else if tail.is_empty() {
        head.to_string()
    } else {
        format!("{head} {tail}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_collapses_whitespace() {
        assert_eq!(normalize("  What   TIME is\tit  "), "what time is it");
    }

    #[test]
    fn test_levenshtein_basic() {
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("same", "same"), 0);
    }

    #[test]
    fn test_ratio_bounds() {
        assert!((ratio("", "") - 1.0).abs() < f32::EPSILON);
        assert!((ratio("abc", "abc") - 1.0).abs() < f32::EPSILON);
        assert!(ratio("abc", "xyz") < 0.01);
    }

    #[test]
    fn test_token_sort_ignores_order() {
        let a = token_sort_ratio("time what is it", "what time is it");
        assert!((a - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_token_set_tolerates_extras() {
        let score = token_set_ratio("please tell me what time is it now", "what time is it");
        assert!(score > 0.9, "score was {score}");
    }

    #[test]
    fn test_token_set_empty_sides() {
        assert!((token_set_ratio("", "") - 1.0).abs() < f32::EPSILON);
        assert!(token_set_ratio("", "words here").abs() < f32::EPSILON);
    }

    #[test]
    fn test_partial_ratio_ignores_filler() {
        let score = partial_ratio("claudia", "hey claudia please");
        assert!((score - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_partial_ratio_near_miss() {
        // One transcription error in the window
        let score = partial_ratio("claudia", "um cloudia wake up");
        assert!(score > 0.7, "score was {score}");
        assert!(score < 1.0);
    }
}
