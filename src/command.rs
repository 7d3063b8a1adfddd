//! Domain types shared across the pipeline
//!
//! `CommandSpec` and `ActionDescriptor` are built once by the config layer
//! and read-only for the process lifetime. `ExecutionResult` and
//! `SessionMode` are the executor's and daemon's halves of one cycle.

use std::time::Duration;

/// A configured voice command: phrase templates bound to one action
#[derive(Debug, Clone)]
pub struct CommandSpec {
    /// Normalized phrase templates, possibly containing `{name}` placeholders
    pub phrases: Vec<String>,

    /// Action executed when one of the phrases matches
    pub action: ActionDescriptor,

    /// Human-readable description, used in status lines and listings
    pub description: String,
}

/// The operation bound to a matched phrase
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionDescriptor {
    /// One or more shell command templates, run sequentially
    Shell(Vec<String>),

    /// A named function inside a named registry module
    Function {
        /// Registry module name
        module: String,
        /// Function name within the module
        function: String,
    },

    /// In-process builtin action
    Builtin(BuiltinAction),
}

/// Closed set of in-process actions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinAction {
    /// Signal the daemon to shut down
    Exit,
}

impl BuiltinAction {
    /// Parse a builtin name from configuration
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "exit" => Some(Self::Exit),
            _ => None,
        }
    }
}

/// What went wrong during one execution cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionErrorKind {
    /// The deadline elapsed; the action was forcibly terminated
    Timeout,

    /// The action ran but reported failure (non-zero exit, handler error)
    Failure,

    /// A function action referenced an unknown module or function
    Resolution,
}

impl std::fmt::Display for ExecutionErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Timeout => write!(f, "timeout"),
            Self::Failure => write!(f, "failure"),
            Self::Resolution => write!(f, "resolution"),
        }
    }
}

/// Outcome of one `CommandExecutor::execute` call
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    /// Overall success
    pub success: bool,

    /// Aggregated captured output (stdout/stderr or function return value)
    pub output: String,

    /// Failure classification, `None` on success
    pub error_kind: Option<ExecutionErrorKind>,

    /// Wall-clock time the execution took
    pub duration: Duration,
}

impl ExecutionResult {
    /// Successful result carrying `output`
    #[must_use]
    pub fn ok(output: String, duration: Duration) -> Self {
        Self {
            success: true,
            output,
            error_kind: None,
            duration,
        }
    }

    /// Failed result with a classification and whatever output was captured
    #[must_use]
    pub fn failed(kind: ExecutionErrorKind, output: String, duration: Duration) -> Self {
        Self {
            success: false,
            output,
            error_kind: Some(kind),
            duration,
        }
    }
}

/// The daemon's single piece of cross-cycle mutable state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionMode {
    /// Constructed but not yet running
    Idle,

    /// Listening for a wake phrase
    AwaitingWakeWord,

    /// Wake phrase heard; listening for a command
    AwaitingCommand,

    /// A matched command is running (single-flight)
    Executing,

    /// Terminal: draining and exiting
    ShuttingDown,
}

impl std::fmt::Display for SessionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::AwaitingWakeWord => write!(f, "awaiting wake word"),
            Self::AwaitingCommand => write!(f, "awaiting command"),
            Self::Executing => write!(f, "executing"),
            Self::ShuttingDown => write!(f, "shutting down"),
        }
    }
}
