//! Wake word gating
//!
//! The gate decides whether a finalized transcript event contains a wake
//! phrase. It is a strategy trait so the fuzzy default can be swapped (exact
//! containment, an ML classifier) without touching the daemon; the daemon
//! owns the resulting mode transition.

use crate::matching::similarity::{normalize, partial_ratio, ratio};
use crate::transcript::TranscriptEvent;
use crate::{Error, Result};

/// Wake word detection strategy
pub trait WakeGate: Send {
    /// Whether this finalized event contains a wake phrase
    ///
    /// Partial events must never trigger; implementations return `false` for
    /// them unconditionally.
    fn detect(&self, event: &TranscriptEvent) -> bool;

    /// The configured wake phrases
    fn wake_words(&self) -> &[String];
}

/// Default gate: exact containment short-circuits, otherwise best fuzzy
/// similarity against each wake phrase is compared to the threshold
pub struct FuzzyWakeGate {
    wake_words: Vec<String>,
    threshold: f32,
}

impl FuzzyWakeGate {
    /// Create a gate from configured wake phrases
    ///
    /// # Errors
    ///
    /// Returns error if no wake words are given.
    pub fn new(wake_words: Vec<String>, threshold: f32) -> Result<Self> {
        let normalized: Vec<String> = wake_words
            .iter()
            .map(|w| normalize(w))
            .filter(|w| !w.is_empty())
            .collect();

        if normalized.is_empty() {
            return Err(Error::WakeWord("at least one wake word required".to_string()));
        }

        tracing::debug!(wake_words = ?normalized, threshold, "wake gate initialized");

        Ok(Self {
            wake_words: normalized,
            threshold,
        })
    }

    /// Best similarity of the normalized text against any wake phrase
    fn best_score(&self, text: &str) -> f32 {
        self.wake_words
            .iter()
            .map(|w| {
                if text.contains(w.as_str()) {
                    1.0
                } else {
                    partial_ratio(w, text).max(ratio(w, text))
                }
            })
            .fold(0.0f32, f32::max)
    }
}

impl WakeGate for FuzzyWakeGate {
    fn detect(&self, event: &TranscriptEvent) -> bool {
        if !event.is_final {
            return false;
        }

        let text = normalize(&event.text);
        if text.is_empty() {
            return false;
        }

        let score = self.best_score(&text);
        if score >= self.threshold {
            tracing::debug!(transcript = %text, score, "wake phrase recognized");
            true
        } else {
            tracing::trace!(transcript = %text, score, "no wake phrase");
            false
        }
    }

    fn wake_words(&self) -> &[String] {
        &self.wake_words
    }
}

/// Strict gate: exact (normalized) substring containment only
///
/// Useful where false activations are worse than missed ones.
pub struct ExactWakeGate {
    wake_words: Vec<String>,
}

impl ExactWakeGate {
    /// Create an exact-containment gate
    ///
    /// # Errors
    ///
    /// Returns error if no wake words are given.
    pub fn new(wake_words: Vec<String>) -> Result<Self> {
        let gate = FuzzyWakeGate::new(wake_words, 1.0)?;
        Ok(Self {
            wake_words: gate.wake_words,
        })
    }
}

impl WakeGate for ExactWakeGate {
    fn detect(&self, event: &TranscriptEvent) -> bool {
        if !event.is_final {
            return false;
        }
        let text = normalize(&event.text);
        self.wake_words.iter().any(|w| text.contains(w.as_str()))
    }

    fn wake_words(&self) -> &[String] {
        &self.wake_words
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn final_event(text: &str, confidence: f32) -> TranscriptEvent {
        TranscriptEvent {
            text: text.to_string(),
            is_final: true,
            confidence,
        }
    }

    #[test]
    fn test_requires_wake_words() {
        assert!(FuzzyWakeGate::new(vec![], 0.75).is_err());
        assert!(FuzzyWakeGate::new(vec!["   ".to_string()], 0.75).is_err());
    }

    #[test]
    fn test_exact_containment_triggers() {
        let gate = FuzzyWakeGate::new(vec!["claudia".to_string()], 0.75).unwrap();
        assert!(gate.detect(&final_event("claudia", 0.9)));
        assert!(gate.detect(&final_event("Hey Claudia, wake up", 0.9)));
    }

    #[test]
    fn test_fuzzy_transcription_error_triggers() {
        let gate = FuzzyWakeGate::new(vec!["claudia".to_string()], 0.75).unwrap();
        // STT often renders the vowel wrong
        assert!(gate.detect(&final_event("cloudia", 0.9)));
    }

    #[test]
    fn test_unrelated_text_does_not_trigger() {
        let gate = FuzzyWakeGate::new(vec!["claudia".to_string()], 0.75).unwrap();
        assert!(!gate.detect(&final_event("completely different words", 0.9)));
    }

    #[test]
    fn test_partial_events_never_trigger() {
        let gate = FuzzyWakeGate::new(vec!["claudia".to_string()], 0.75).unwrap();
        let partial = TranscriptEvent {
            text: "claudia".to_string(),
            is_final: false,
            confidence: 0.9,
        };
        assert!(!gate.detect(&partial));
    }

    #[test]
    fn test_threshold_monotonic() {
        // Raising the threshold never turns a miss into a hit
        let text = "cloudia";
        let lenient = FuzzyWakeGate::new(vec!["claudia".to_string()], 0.5).unwrap();
        let strict = FuzzyWakeGate::new(vec!["claudia".to_string()], 0.99).unwrap();
        let event = final_event(text, 0.9);
        assert!(lenient.detect(&event));
        assert!(!strict.detect(&event));
    }

    #[test]
    fn test_exact_gate_rejects_fuzzy() {
        let gate = ExactWakeGate::new(vec!["claudia".to_string()]).unwrap();
        assert!(gate.detect(&final_event("hey claudia", 0.9)));
        assert!(!gate.detect(&final_event("cloudia", 0.9)));
    }
}
