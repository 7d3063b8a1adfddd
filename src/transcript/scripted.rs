//! Scripted transcript source
//!
//! Replays a fixed list of events, then ends the stream. Used by the `test`
//! subcommand and by tests that drive the pipeline without audio hardware.

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::{TranscriptEvent, TranscriptSource};
use crate::Result;

/// Replays a predefined event sequence
pub struct ScriptedSource {
    events: Vec<TranscriptEvent>,
}

impl ScriptedSource {
    /// Create a source replaying `events` in order
    #[must_use]
    pub fn new(events: Vec<TranscriptEvent>) -> Self {
        Self { events }
    }

    /// Convenience: one final event per line of text, confidence 1.0
    #[must_use]
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            lines
                .into_iter()
                .map(|line| TranscriptEvent::final_text(line, 1.0))
                .collect(),
        )
    }
}

#[async_trait]
impl TranscriptSource for ScriptedSource {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn run(self: Box<Self>, tx: mpsc::Sender<TranscriptEvent>) -> Result<()> {
        for event in self.events {
            if tx.send(event).await.is_err() {
                // Receiver gone: consumer shut down first
                break;
            }
        }
        Ok(())
    }
}
