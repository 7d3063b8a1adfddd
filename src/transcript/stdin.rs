//! Stdin transcript source
//!
//! Each line read from standard input becomes one finalized event with
//! confidence 1.0. This makes the whole pipeline drivable from a terminal or
//! a pipe, and is the default source when no STT engine is wired up.

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use super::{TranscriptEvent, TranscriptSource};
use crate::Result;

/// Reads finalized "transcripts" line by line from stdin
#[derive(Default)]
pub struct StdinSource;

impl StdinSource {
    /// Create a stdin-backed source
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl TranscriptSource for StdinSource {
    fn name(&self) -> &'static str {
        "stdin"
    }

    async fn run(self: Box<Self>, tx: mpsc::Sender<TranscriptEvent>) -> Result<()> {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        while let Some(line) = lines.next_line().await? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if tx
                .send(TranscriptEvent::final_text(line, 1.0))
                .await
                .is_err()
            {
                break;
            }
        }

        Ok(())
    }
}
