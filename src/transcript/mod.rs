//! Transcript source boundary
//!
//! Audio capture and the speech-to-text engine live outside this crate; what
//! crosses the boundary is a stream of [`TranscriptEvent`]s over a bounded
//! channel. One producer task per source, one consumer (the daemon).
//! Producers await channel capacity rather than dropping events, so
//! finalized utterances are never silently lost and arrive in emission
//! order.

mod scripted;
mod stdin;

pub use scripted::ScriptedSource;
pub use stdin::StdinSource;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::Result;

/// Capacity of the transcript event queue
pub const QUEUE_CAPACITY: usize = 32;

/// Receiving half of the transcript channel
pub type TranscriptRx = mpsc::Receiver<TranscriptEvent>;

/// One recognized-speech event from the external engine
///
/// Immutable once emitted; the pipeline only reads it.
#[derive(Debug, Clone)]
pub struct TranscriptEvent {
    /// Recognized text, possibly partial
    pub text: String,

    /// Whether the engine finalized this utterance
    pub is_final: bool,

    /// The engine's own reliability estimate in `[0, 1]`
    pub confidence: f32,
}

impl TranscriptEvent {
    /// A finalized utterance
    #[must_use]
    pub fn final_text(text: impl Into<String>, confidence: f32) -> Self {
        Self {
            text: text.into(),
            is_final: true,
            confidence,
        }
    }

    /// An in-progress (partial) utterance
    #[must_use]
    pub fn partial(text: impl Into<String>, confidence: f32) -> Self {
        Self {
            text: text.into(),
            is_final: false,
            confidence,
        }
    }
}

/// A producer of transcript events
///
/// Implementations push events into the bounded channel until the input is
/// exhausted or the receiver is dropped. Real STT engines sit behind this
/// same trait; the shipped sources need no audio hardware.
#[async_trait]
pub trait TranscriptSource: Send + 'static {
    /// Source name for status lines
    fn name(&self) -> &'static str;

    /// Produce events into `tx` until done
    ///
    /// A closed channel (receiver dropped) is a normal stop signal, not an
    /// error.
    ///
    /// # Errors
    ///
    /// Returns error if the underlying input fails mid-stream.
    async fn run(self: Box<Self>, tx: mpsc::Sender<TranscriptEvent>) -> Result<()>;
}

/// Spawn a source's producer task and hand back the consuming end
pub fn spawn(source: Box<dyn TranscriptSource>) -> TranscriptRx {
    let (tx, rx) = mpsc::channel(QUEUE_CAPACITY);
    let name = source.name();

    tokio::spawn(async move {
        tracing::debug!(source = name, "transcript source started");
        match source.run(tx).await {
            Ok(()) => tracing::debug!(source = name, "transcript source finished"),
            Err(e) => tracing::error!(source = name, error = %e, "transcript source failed"),
        }
    });

    rx
}
