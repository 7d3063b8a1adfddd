//! The hark daemon
//!
//! Owns the session state machine and the single consumer loop:
//! transcript events come off the bounded channel, pass through the wake
//! gate, the phrase matcher, and the executor, and the loop returns to
//! listening. Voice commands are serial, so at most one execution is in
//! flight at a time: the loop awaits the executor before pulling the next
//! event.
//!
//! ```text
//!             ┌──────────────────────────────────────────┐
//!             ▼                                          │
//!   AwaitingWakeWord ──wake hit──▶ AwaitingCommand       │
//!             ▲                       │      │           │
//!             │◀───dwell expired──────┘      │match hit  │
//!             │                              ▼           │
//!             └────────result───────────  Executing ─────┘
//!
//!   any state ──shutdown signal / exit builtin──▶ ShuttingDown
//! ```

use tokio::sync::watch;
use tokio::time::Instant;

use crate::command::{ActionDescriptor, BuiltinAction, ExecutionResult, SessionMode};
use crate::config::Config;
use crate::executor::{CommandExecutor, FunctionRegistry};
use crate::matching::find_match;
use crate::transcript::{self, TranscriptEvent, TranscriptRx, TranscriptSource};
use crate::wake::{FuzzyWakeGate, WakeGate};
use crate::Result;

/// What the consumer loop woke up to
enum Wakeup {
    Event(TranscriptEvent),
    DwellExpired,
    SourceClosed,
}

/// Orchestrates the gate → match → execute → idle cycle
pub struct Daemon {
    config: Config,
    gate: Box<dyn WakeGate>,
    executor: CommandExecutor,
    shutdown: watch::Receiver<bool>,
    mode: SessionMode,
    dwell_deadline: Option<Instant>,
}

impl Daemon {
    /// Build a daemon from validated configuration
    ///
    /// # Errors
    ///
    /// Returns error if the wake gate cannot be constructed.
    pub fn new(config: Config, shutdown: watch::Receiver<bool>) -> Result<Self> {
        let gate = FuzzyWakeGate::new(config.wake_words.clone(), config.match_threshold)?;
        let executor = CommandExecutor::new(config.execution_timeout);

        Ok(Self {
            config,
            gate: Box::new(gate),
            executor,
            shutdown,
            mode: SessionMode::Idle,
            dwell_deadline: None,
        })
    }

    /// Replace the wake strategy (exact gate, test double)
    #[must_use]
    pub fn with_gate(mut self, gate: Box<dyn WakeGate>) -> Self {
        self.gate = gate;
        self
    }

    /// Replace the function registry backing function actions
    #[must_use]
    pub fn with_registry(mut self, registry: FunctionRegistry) -> Self {
        self.executor = CommandExecutor::with_registry(self.config.execution_timeout, registry);
        self
    }

    /// Current session mode
    #[must_use]
    pub const fn mode(&self) -> SessionMode {
        self.mode
    }

    /// Begin the session: `Idle` → `AwaitingWakeWord`
    ///
    /// `run` calls this itself; tests drive the state machine through
    /// `activate` + [`Self::process_event`].
    pub fn activate(&mut self) {
        if self.mode == SessionMode::Idle {
            self.rearm();
        }
    }

    /// Run against a transcript source until shutdown
    ///
    /// Terminates on the shutdown signal, on the `exit` builtin, or when the
    /// source ends.
    ///
    /// # Errors
    ///
    /// Currently infallible after startup; the signature leaves room for
    /// fatal source errors surfaced through the channel.
    pub async fn run(mut self, source: Box<dyn TranscriptSource>) -> Result<()> {
        let mut rx = transcript::spawn(source);
        self.activate();

        let mut shutdown = self.shutdown.clone();

        while self.mode != SessionMode::ShuttingDown {
            let deadline = if self.mode == SessionMode::AwaitingCommand {
                self.dwell_deadline
            } else {
                None
            };

            let wakeup = tokio::select! {
                // A dropped sender counts as a shutdown request too
                _ = shutdown.changed() => {
                    tracing::info!("shutdown signal received");
                    self.mode = SessionMode::ShuttingDown;
                    break;
                }
                wakeup = next_wakeup(&mut rx, deadline) => wakeup,
            };

            match wakeup {
                Wakeup::Event(event) => self.process_event(event).await,
                Wakeup::DwellExpired => {
                    tracing::info!("no command heard, re-arming wake word");
                    self.rearm();
                }
                Wakeup::SourceClosed => {
                    tracing::info!("transcript source ended");
                    self.mode = SessionMode::ShuttingDown;
                }
            }
        }

        // Dropping rx here refuses any events still queued behind us
        tracing::info!("goodbye");
        Ok(())
    }

    /// Advance the state machine with one transcript event
    ///
    /// Partial events prime nothing on their own and low-confidence events
    /// are discarded, so every transition below starts from a finalized,
    /// trusted transcript.
    pub async fn process_event(&mut self, event: TranscriptEvent) {
        if !event.is_final {
            tracing::trace!(text = %event.text, "partial transcript");
            return;
        }
        if event.confidence < self.config.confidence_threshold {
            tracing::debug!(
                text = %event.text,
                confidence = event.confidence,
                "transcript below confidence threshold"
            );
            return;
        }

        match self.mode {
            SessionMode::AwaitingWakeWord => {
                if self.gate.detect(&event) {
                    tracing::info!(transcript = %event.text, "wake word detected");
                    self.mode = SessionMode::AwaitingCommand;
                    self.dwell_deadline = Some(Instant::now() + self.config.command_dwell);
                }
            }
            SessionMode::AwaitingCommand => self.handle_command(&event.text).await,
            // Not admitted: before activate, after shutdown, or (unreachable
            // given single-flight) mid-execution
            SessionMode::Idle | SessionMode::Executing | SessionMode::ShuttingDown => {
                tracing::trace!(mode = %self.mode, "event ignored");
            }
        }
    }

    /// Match and execute one command-mode transcript
    async fn handle_command(&mut self, transcript: &str) {
        tracing::info!(transcript, "heard command candidate");

        let matched = find_match(transcript, &self.config.commands, self.config.match_threshold)
            .map(|m| {
                (
                    m.spec.action.clone(),
                    m.spec.description.clone(),
                    m.score,
                    m.params,
                )
            });

        let Some((action, description, score, params)) = matched else {
            // Expected outcome: stay in command mode until the dwell expires
            tracing::info!(transcript, "no command matched");
            return;
        };

        tracing::info!(command = %description, score, "command matched");
        self.mode = SessionMode::Executing;

        let result = self.executor.execute(&action, &params).await;
        report(&description, &result);

        if action == ActionDescriptor::Builtin(BuiltinAction::Exit) && result.success {
            self.mode = SessionMode::ShuttingDown;
        } else {
            self.rearm();
        }
    }

    fn rearm(&mut self) {
        self.mode = SessionMode::AwaitingWakeWord;
        self.dwell_deadline = None;
        tracing::info!(wake_words = ?self.gate.wake_words(), "listening for wake word");
    }
}

/// Wait for the next event, bounded by the dwell deadline when set
async fn next_wakeup(rx: &mut TranscriptRx, deadline: Option<Instant>) -> Wakeup {
    match deadline {
        Some(deadline) => match tokio::time::timeout_at(deadline, rx.recv()).await {
            Ok(Some(event)) => Wakeup::Event(event),
            Ok(None) => Wakeup::SourceClosed,
            Err(_) => Wakeup::DwellExpired,
        },
        None => match rx.recv().await {
            Some(event) => Wakeup::Event(event),
            None => Wakeup::SourceClosed,
        },
    }
}

/// Surface one execution result to the operator
fn report(description: &str, result: &ExecutionResult) {
    if result.success {
        tracing::info!(
            command = description,
            duration = ?result.duration,
            "command succeeded"
        );
    } else if let Some(kind) = result.error_kind {
        tracing::error!(
            command = description,
            kind = %kind,
            duration = ?result.duration,
            "command failed"
        );
    }

    if !result.output.is_empty() {
        println!("{}", result.output);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn config() -> Config {
        Config::from_yaml(
            r#"
wake_words: ["claudia"]
match_threshold: 0.75
confidence_threshold: 0.5
execution_timeout: 5
command_dwell_secs: 1
commands:
  - description: "Time"
    phrases: ["what time is it"]
    action: { type: shell, command: "echo 12:00" }
  - description: "Exit"
    phrases: ["goodbye"]
    action: { type: builtin, command: exit }
"#,
        )
        .unwrap()
    }

    fn daemon() -> (Daemon, watch::Sender<bool>) {
        let (tx, rx) = watch::channel(false);
        let mut daemon = Daemon::new(config(), rx).unwrap();
        daemon.activate();
        (daemon, tx)
    }

    #[tokio::test]
    async fn test_wake_word_enters_command_mode() {
        let (mut daemon, _tx) = daemon();
        assert_eq!(daemon.mode(), SessionMode::AwaitingWakeWord);

        daemon
            .process_event(TranscriptEvent::final_text("claudia", 0.9))
            .await;
        assert_eq!(daemon.mode(), SessionMode::AwaitingCommand);
    }

    #[tokio::test]
    async fn test_low_confidence_wake_ignored() {
        let (mut daemon, _tx) = daemon();
        daemon
            .process_event(TranscriptEvent::final_text("claudia", 0.2))
            .await;
        assert_eq!(daemon.mode(), SessionMode::AwaitingWakeWord);
    }

    #[tokio::test]
    async fn test_partial_event_never_transitions() {
        let (mut daemon, _tx) = daemon();
        daemon
            .process_event(TranscriptEvent::partial("claudia", 0.9))
            .await;
        assert_eq!(daemon.mode(), SessionMode::AwaitingWakeWord);
    }

    #[tokio::test]
    async fn test_matched_command_executes_and_rearms() {
        let (mut daemon, _tx) = daemon();
        daemon
            .process_event(TranscriptEvent::final_text("claudia", 0.9))
            .await;
        daemon
            .process_event(TranscriptEvent::final_text("what time is it", 0.9))
            .await;
        assert_eq!(daemon.mode(), SessionMode::AwaitingWakeWord);
    }

    #[tokio::test]
    async fn test_no_match_stays_in_command_mode() {
        let (mut daemon, _tx) = daemon();
        daemon
            .process_event(TranscriptEvent::final_text("claudia", 0.9))
            .await;
        daemon
            .process_event(TranscriptEvent::final_text("blah blah nonsense", 0.9))
            .await;
        assert_eq!(daemon.mode(), SessionMode::AwaitingCommand);
    }

    #[tokio::test]
    async fn test_exit_builtin_shuts_down() {
        let (mut daemon, _tx) = daemon();
        daemon
            .process_event(TranscriptEvent::final_text("claudia", 0.9))
            .await;
        daemon
            .process_event(TranscriptEvent::final_text("goodbye", 0.9))
            .await;
        assert_eq!(daemon.mode(), SessionMode::ShuttingDown);
    }

    #[tokio::test]
    async fn test_exact_gate_substitution() {
        let (tx, rx) = watch::channel(false);
        let gate = crate::wake::ExactWakeGate::new(vec!["claudia".to_string()]).unwrap();
        let mut daemon = Daemon::new(config(), rx)
            .unwrap()
            .with_gate(Box::new(gate));
        daemon.activate();
        let _tx = tx;

        // The fuzzy default would accept this near-miss; the exact gate must not
        daemon
            .process_event(TranscriptEvent::final_text("cloudia", 0.9))
            .await;
        assert_eq!(daemon.mode(), SessionMode::AwaitingWakeWord);

        daemon
            .process_event(TranscriptEvent::final_text("claudia", 0.9))
            .await;
        assert_eq!(daemon.mode(), SessionMode::AwaitingCommand);
    }

    #[tokio::test]
    async fn test_custom_registry_backs_function_actions() {
        let config = Config::from_yaml(
            r#"
wake_words: ["claudia"]
commands:
  - description: "Greet"
    phrases: ["say hello"]
    action: { type: function, module: greetings, function: hello }
"#,
        )
        .unwrap();

        let mut registry = FunctionRegistry::new();
        registry.register("greetings", "hello", |_| Ok(Some("hi".to_string())));

        let (tx, rx) = watch::channel(false);
        let mut daemon = Daemon::new(config, rx).unwrap().with_registry(registry);
        daemon.activate();
        let _tx = tx;

        daemon
            .process_event(TranscriptEvent::final_text("claudia", 0.9))
            .await;
        daemon
            .process_event(TranscriptEvent::final_text("say hello", 0.9))
            .await;
        assert_eq!(daemon.mode(), SessionMode::AwaitingWakeWord);
    }

    #[tokio::test]
    async fn test_command_text_ignored_before_wake() {
        let (mut daemon, _tx) = daemon();
        daemon
            .process_event(TranscriptEvent::final_text("what time is it", 0.9))
            .await;
        assert_eq!(daemon.mode(), SessionMode::AwaitingWakeWord);
    }
}
