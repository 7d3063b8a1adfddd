//! Shared test utilities

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use hark::{Config, TranscriptEvent, TranscriptSource};

/// Parse a config fixture, panicking on invalid test YAML
#[must_use]
pub fn config_from(yaml: &str) -> Config {
    Config::from_yaml(yaml).expect("test config should validate")
}

/// A transcript source that sleeps before each event
///
/// Lets tests exercise dwell deadlines and shutdown while the channel is
/// still open.
pub struct DelayedSource {
    steps: Vec<(Duration, TranscriptEvent)>,
}

impl DelayedSource {
    #[must_use]
    pub fn new(steps: Vec<(Duration, TranscriptEvent)>) -> Self {
        Self { steps }
    }
}

#[async_trait]
impl TranscriptSource for DelayedSource {
    fn name(&self) -> &'static str {
        "delayed"
    }

    async fn run(
        self: Box<Self>,
        tx: mpsc::Sender<TranscriptEvent>,
    ) -> hark::Result<()> {
        for (delay, event) in self.steps {
            tokio::time::sleep(delay).await;
            if tx.send(event).await.is_err() {
                break;
            }
        }
        Ok(())
    }
}
