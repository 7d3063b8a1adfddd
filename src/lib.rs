//! Hark - voice-command gateway
//!
//! Turns a stream of recognized speech into gated, parameter-bound CLI or
//! function invocations:
//! - Wake word gating over finalized transcript events
//! - Fuzzy phrase matching against a configured command library
//! - `{name}` parameter extraction from matched templates
//! - Deadline-enforced execution with full output capture
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │           TranscriptSource (external STT)           │
//! │        stdin  │  scripted  │  engine adapters       │
//! └────────────────────┬────────────────────────────────┘
//!                      │ bounded channel
//! ┌────────────────────▼────────────────────────────────┐
//! │                    Daemon                           │
//! │  WakeGate  │  PhraseMatcher  │  ParameterExtractor  │
//! └────────────────────┬────────────────────────────────┘
//!                      │ matched action + params
//! ┌────────────────────▼────────────────────────────────┐
//! │               CommandExecutor                       │
//! │    shell (sh -c)  │  function registry  │  builtin  │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! Audio capture and the speech-to-text engine are external collaborators;
//! the crate begins at the transcript boundary.

pub mod command;
pub mod config;
pub mod daemon;
pub mod error;
pub mod executor;
pub mod matching;
pub mod transcript;
pub mod wake;

pub use command::{
    ActionDescriptor, BuiltinAction, CommandSpec, ExecutionErrorKind, ExecutionResult, SessionMode,
};
pub use config::Config;
pub use daemon::Daemon;
pub use error::{Error, Result};
pub use executor::{CommandExecutor, FunctionRegistry};
pub use matching::{MatchResult, find_match};
pub use transcript::{ScriptedSource, StdinSource, TranscriptEvent, TranscriptSource};
pub use wake::{ExactWakeGate, FuzzyWakeGate, WakeGate};
