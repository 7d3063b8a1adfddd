//! Phrase matching against the configured command set

use std::collections::HashMap;
use std::ops::Range;

use crate::command::CommandSpec;

use super::extract;
use super::similarity::{normalize, partial_ratio, token_set_ratio};

/// One recognition cycle's best match, borrowing the winning spec
#[derive(Debug)]
pub struct MatchResult<'a> {
    /// The configured command the transcript matched
    pub spec: &'a CommandSpec,

    /// Similarity score in `[0, 1]`
    pub score: f32,

    /// Span of the normalized transcript the phrase matched
    pub matched_span: Range<usize>,

    /// Parameters captured from the transcript, possibly empty
    pub params: HashMap<String, String>,
}

/// Find the best-scoring phrase across all specs, threshold-gated
///
/// Returns `None` when no (spec, phrase) pair reaches `threshold`; that is
/// an expected outcome, not an error. Ties resolve to the earliest-configured
/// pair; the strict comparison below keeps the first winner.
#[must_use]
pub fn find_match<'a>(
    transcript: &str,
    specs: &'a [CommandSpec],
    threshold: f32,
) -> Option<MatchResult<'a>> {
    let text = normalize(transcript);
    if text.is_empty() {
        return None;
    }

    let mut best: Option<MatchResult<'a>> = None;

    for spec in specs {
        for phrase in &spec.phrases {
            let (score, params, matched_span) = score_phrase(&text, phrase);
            tracing::trace!(phrase, score, "scored phrase");

            if best.as_ref().is_none_or(|b| score > b.score) {
                best = Some(MatchResult {
                    spec,
                    score,
                    matched_span,
                    params,
                });
            }
        }
    }

    match best {
        Some(m) if m.score >= threshold => Some(m),
        Some(m) => {
            tracing::debug!(
                description = %m.spec.description,
                score = m.score,
                threshold,
                "best candidate below threshold"
            );
            None
        }
        None => None,
    }
}

/// Score one phrase template against a normalized transcript
///
/// A placeholder template whose capture pattern matches is a perfect score
/// with params bound in the same pass; otherwise templates score by fuzzy
/// similarity with placeholders stripped.
fn score_phrase(text: &str, phrase: &str) -> (f32, HashMap<String, String>, Range<usize>) {
    if extract::has_placeholders(phrase) {
        if let Some((params, span)) = extract::extract(phrase, text) {
            return (1.0, params, span);
        }
        let stripped = extract::strip_placeholders(phrase);
        let score = fuzzy_score(text, &stripped);
        return (score, HashMap::new(), 0..text.len());
    }

    let score = fuzzy_score(text, phrase);
    let span = text
        .find(phrase)
        .map_or(0..text.len(), |start| start..start + phrase.len());
    (score, HashMap::new(), span)
}

fn fuzzy_score(text: &str, phrase: &str) -> f32 {
    token_set_ratio(text, phrase).max(partial_ratio(phrase, text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{ActionDescriptor, BuiltinAction};

    fn spec(description: &str, phrases: &[&str]) -> CommandSpec {
        CommandSpec {
            phrases: phrases.iter().map(|p| (*p).to_string()).collect(),
            action: ActionDescriptor::Builtin(BuiltinAction::Exit),
            description: description.to_string(),
        }
    }

    #[test]
    fn test_exact_phrase_scores_perfect() {
        let specs = vec![spec("time", &["what time is it"])];
        let m = find_match("what time is it", &specs, 0.75).unwrap();
        assert!((m.score - 1.0).abs() < f32::EPSILON);
        assert_eq!(m.spec.description, "time");
        assert_eq!(m.matched_span, 0.."what time is it".len());
    }

    #[test]
    fn test_span_skips_leading_filler() {
        let specs = vec![spec("time", &["what time is it"])];
        let m = find_match("hey what time is it", &specs, 0.75).unwrap();
        assert_eq!(&"hey what time is it"[m.matched_span.clone()], "what time is it");
    }

    #[test]
    fn test_no_match_below_threshold() {
        let specs = vec![spec("time", &["what time is it"])];
        assert!(find_match("blah blah nonsense", &specs, 0.75).is_none());
    }

    #[test]
    fn test_filler_words_do_not_depress_score() {
        let specs = vec![spec("time", &["what time is it"])];
        let m = find_match("hey um what time is it please", &specs, 0.75).unwrap();
        assert!(m.score > 0.9, "score was {}", m.score);
    }

    #[test]
    fn test_placeholder_template_binds_params() {
        let specs = vec![spec("echo", &["echo {text}"])];
        let m = find_match("the echo hello world", &specs, 0.75).unwrap();
        assert!((m.score - 1.0).abs() < f32::EPSILON);
        assert_eq!(m.params.get("text").map(String::as_str), Some("hello world"));
    }

    #[test]
    fn test_tie_breaks_to_earliest_configured() {
        let specs = vec![
            spec("first", &["open the door"]),
            spec("second", &["open the door"]),
        ];
        let m = find_match("open the door", &specs, 0.75).unwrap();
        assert_eq!(m.spec.description, "first");
    }

    #[test]
    fn test_best_of_all_phrases_wins() {
        let specs = vec![
            spec("greet", &["say hello"]),
            spec("time", &["tell me the time", "what time is it"]),
        ];
        let m = find_match("what time is it", &specs, 0.75).unwrap();
        assert_eq!(m.spec.description, "time");
    }

    #[test]
    fn test_empty_transcript_never_matches() {
        let specs = vec![spec("time", &["what time is it"])];
        assert!(find_match("   ", &specs, 0.1).is_none());
    }
}
