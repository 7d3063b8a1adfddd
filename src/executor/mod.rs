//! Command execution with deadline and output-capture discipline
//!
//! The only component that spawns processes. Every action variant runs under
//! a wall-clock deadline: a shell child that overruns is killed (output
//! captured up to that point is preserved), a function call that overruns is
//! abandoned. Multiple shell templates run sequentially and the first
//! failure short-circuits the rest.

mod actions;
mod registry;

pub use actions::{DEFAULT_MODULE, default_registry};
pub use registry::{ActionFn, FunctionRegistry};

use std::collections::HashMap;
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tokio::time::Instant;

use crate::command::{ActionDescriptor, BuiltinAction, ExecutionErrorKind, ExecutionResult};
use crate::matching::substitute;

/// Executes resolved actions with bound parameters
pub struct CommandExecutor {
    timeout: Duration,
    registry: FunctionRegistry,
}

impl CommandExecutor {
    /// Executor with the default function registry
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self::with_registry(timeout, default_registry())
    }

    /// Executor with a caller-supplied function registry
    #[must_use]
    pub fn with_registry(timeout: Duration, registry: FunctionRegistry) -> Self {
        tracing::debug!(?timeout, functions = registry.len(), "executor initialized");
        Self { timeout, registry }
    }

    /// Execute an action under the configured deadline
    pub async fn execute(
        &self,
        action: &ActionDescriptor,
        params: &HashMap<String, String>,
    ) -> ExecutionResult {
        self.execute_with_timeout(action, params, self.timeout).await
    }

    /// Execute an action under an explicit deadline
    pub async fn execute_with_timeout(
        &self,
        action: &ActionDescriptor,
        params: &HashMap<String, String>,
        timeout: Duration,
    ) -> ExecutionResult {
        let started = Instant::now();
        match action {
            ActionDescriptor::Shell(templates) => {
                Self::execute_shell(templates, params, timeout, started).await
            }
            ActionDescriptor::Function { module, function } => {
                self.execute_function(module, function, params, timeout, started)
                    .await
            }
            ActionDescriptor::Builtin(builtin) => Self::execute_builtin(*builtin, started),
        }
    }

    /// Run shell templates sequentially, sharing one deadline
    async fn execute_shell(
        templates: &[String],
        params: &HashMap<String, String>,
        timeout: Duration,
        started: Instant,
    ) -> ExecutionResult {
        let mut outputs: Vec<String> = Vec::new();

        for template in templates {
            let command = substitute(template, params);
            tracing::info!(command = %command, "executing shell command");

            let remaining = timeout.saturating_sub(started.elapsed());
            if remaining.is_zero() {
                return ExecutionResult::failed(
                    ExecutionErrorKind::Timeout,
                    join_outputs(&outputs),
                    started.elapsed(),
                );
            }

            let outcome = match run_shell(&command, remaining).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::error!(command = %command, error = %e, "failed to spawn shell");
                    outputs.push(e.to_string());
                    return ExecutionResult::failed(
                        ExecutionErrorKind::Failure,
                        join_outputs(&outputs),
                        started.elapsed(),
                    );
                }
            };

            if !outcome.stdout.is_empty() {
                outputs.push(outcome.stdout);
            }
            if !outcome.stderr.is_empty() {
                outputs.push(outcome.stderr);
            }

            if outcome.timed_out {
                tracing::warn!(command = %command, ?timeout, "shell command timed out, killed");
                return ExecutionResult::failed(
                    ExecutionErrorKind::Timeout,
                    join_outputs(&outputs),
                    started.elapsed(),
                );
            }

            // First non-zero exit short-circuits the remaining commands
            if let Some(code) = outcome.exit_code.filter(|c| *c != 0) {
                tracing::warn!(command = %command, code, "shell command failed");
                return ExecutionResult::failed(
                    ExecutionErrorKind::Failure,
                    join_outputs(&outputs),
                    started.elapsed(),
                );
            }
        }

        ExecutionResult::ok(join_outputs(&outputs), started.elapsed())
    }

    /// Resolve and invoke a registered function on a blocking task
    async fn execute_function(
        &self,
        module: &str,
        function: &str,
        params: &HashMap<String, String>,
        timeout: Duration,
        started: Instant,
    ) -> ExecutionResult {
        let Some(handler) = self.registry.resolve(module, function) else {
            tracing::error!(module, function, "unknown function action");
            return ExecutionResult::failed(
                ExecutionErrorKind::Resolution,
                format!("function {module}.{function} is not registered"),
                started.elapsed(),
            );
        };

        tracing::info!(module, function, "executing function action");

        let call_params = params.clone();
        let call = tokio::task::spawn_blocking(move || handler(&call_params));

        match tokio::time::timeout(timeout, call).await {
            Ok(Ok(Ok(output))) => ExecutionResult::ok(
                output.unwrap_or_else(|| format!("{module}.{function} completed")),
                started.elapsed(),
            ),
            Ok(Ok(Err(message))) => {
                tracing::error!(module, function, error = %message, "function action failed");
                ExecutionResult::failed(ExecutionErrorKind::Failure, message, started.elapsed())
            }
            Ok(Err(join_error)) => {
                tracing::error!(module, function, error = %join_error, "function action panicked");
                ExecutionResult::failed(
                    ExecutionErrorKind::Failure,
                    join_error.to_string(),
                    started.elapsed(),
                )
            }
            Err(_) => {
                // The blocking call cannot be killed; stop waiting for it
                tracing::warn!(module, function, ?timeout, "function action timed out, abandoned");
                ExecutionResult::failed(
                    ExecutionErrorKind::Timeout,
                    String::new(),
                    started.elapsed(),
                )
            }
        }
    }

    fn execute_builtin(builtin: BuiltinAction, started: Instant) -> ExecutionResult {
        match builtin {
            BuiltinAction::Exit => {
                tracing::info!("exit builtin received");
                ExecutionResult::ok("Goodbye!".to_string(), started.elapsed())
            }
        }
    }
}

/// Outcome of one shell child, including partial output after a kill
struct ShellOutcome {
    exit_code: Option<i32>,
    stdout: String,
    stderr: String,
    timed_out: bool,
}

/// How long to wait for the pipe drains after the child is gone
const DRAIN_GRACE: Duration = Duration::from_millis(500);

/// Run one command line through `sh -c` with a kill-enforced deadline
///
/// stdout/stderr are drained incrementally into shared buffers so that
/// killing the child still yields everything it wrote before the deadline.
/// The drains themselves are bounded too: a killed child's grandchildren can
/// hold the pipes open indefinitely, and a background process surviving a
/// successful parent does the same.
async fn run_shell(command: &str, timeout: Duration) -> std::io::Result<ShellOutcome> {
    let mut child = Command::new("sh")
        .arg("-c")
        .arg(command)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()?;

    let stdout_buf = Arc::new(Mutex::new(Vec::new()));
    let stderr_buf = Arc::new(Mutex::new(Vec::new()));
    let mut stdout_task = tokio::spawn(drain(child.stdout.take(), Arc::clone(&stdout_buf)));
    let mut stderr_task = tokio::spawn(drain(child.stderr.take(), Arc::clone(&stderr_buf)));

    let (exit_code, timed_out) = match tokio::time::timeout(timeout, child.wait()).await {
        Ok(status) => (status?.code(), false),
        Err(_) => {
            if let Err(e) = child.kill().await {
                tracing::warn!(error = %e, "failed to kill timed-out child");
            }
            (None, true)
        }
    };

    let drained = tokio::time::timeout(DRAIN_GRACE, async {
        let _ = (&mut stdout_task).await;
        let _ = (&mut stderr_task).await;
    })
    .await;
    if drained.is_err() {
        stdout_task.abort();
        stderr_task.abort();
    }

    Ok(ShellOutcome {
        exit_code,
        stdout: take_text(&stdout_buf),
        stderr: take_text(&stderr_buf),
        timed_out,
    })
}

/// Read a pipe chunk by chunk into a shared buffer until EOF
async fn drain<R>(reader: Option<R>, buf: Arc<Mutex<Vec<u8>>>)
where
    R: tokio::io::AsyncRead + Unpin + Send,
{
    let Some(mut reader) = reader else {
        return;
    };
    let mut chunk = [0u8; 4096];
    loop {
        match reader.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                if let Ok(mut buf) = buf.lock() {
                    buf.extend_from_slice(&chunk[..n]);
                }
            }
        }
    }
}

fn take_text(buf: &Arc<Mutex<Vec<u8>>>) -> String {
    buf.lock()
        .map(|mut buf| String::from_utf8_lossy(&std::mem::take(&mut *buf)).trim_end().to_string())
        .unwrap_or_default()
}

fn join_outputs(outputs: &[String]) -> String {
    outputs.join("\n").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn executor() -> CommandExecutor {
        CommandExecutor::new(Duration::from_secs(5))
    }

    fn no_params() -> HashMap<String, String> {
        HashMap::new()
    }

    #[tokio::test]
    async fn test_shell_captures_stdout() {
        let action = ActionDescriptor::Shell(vec!["echo hello".to_string()]);
        let result = executor().execute(&action, &no_params()).await;

        assert!(result.success);
        assert_eq!(result.output, "hello");
        assert!(result.error_kind.is_none());
    }

    #[tokio::test]
    async fn test_shell_substitutes_params() {
        let action = ActionDescriptor::Shell(vec!["echo {text}".to_string()]);
        let mut params = HashMap::new();
        params.insert("text".to_string(), "bound value".to_string());

        let result = executor().execute(&action, &params).await;
        assert!(result.success);
        assert_eq!(result.output, "bound value");
    }

    #[tokio::test]
    async fn test_shell_unbound_param_is_empty() {
        let action = ActionDescriptor::Shell(vec!["echo start{text}end".to_string()]);
        let result = executor().execute(&action, &no_params()).await;
        assert!(result.success);
        assert_eq!(result.output, "startend");
    }

    #[tokio::test]
    async fn test_shell_nonzero_exit_fails() {
        let action = ActionDescriptor::Shell(vec!["exit 3".to_string()]);
        let result = executor().execute(&action, &no_params()).await;

        assert!(!result.success);
        assert_eq!(result.error_kind, Some(ExecutionErrorKind::Failure));
    }

    #[tokio::test]
    async fn test_shell_failure_short_circuits() {
        let action = ActionDescriptor::Shell(vec![
            "echo first".to_string(),
            "false".to_string(),
            "echo never".to_string(),
        ]);
        let result = executor().execute(&action, &no_params()).await;

        assert!(!result.success);
        assert!(result.output.contains("first"));
        assert!(!result.output.contains("never"));
    }

    #[tokio::test]
    async fn test_shell_timeout_kills_and_keeps_partial_output() {
        let action = ActionDescriptor::Shell(vec!["echo early; sleep 30".to_string()]);
        let executor = CommandExecutor::new(Duration::from_millis(300));

        let started = std::time::Instant::now();
        let result = executor.execute(&action, &no_params()).await;

        assert!(!result.success);
        assert_eq!(result.error_kind, Some(ExecutionErrorKind::Timeout));
        assert!(result.output.contains("early"));
        // Bounded overshoot, nowhere near the sleep
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_function_resolution_failure() {
        let action = ActionDescriptor::Function {
            module: "actions".to_string(),
            function: "does_not_exist".to_string(),
        };
        let result = executor().execute(&action, &no_params()).await;

        assert!(!result.success);
        assert_eq!(result.error_kind, Some(ExecutionErrorKind::Resolution));
    }

    #[tokio::test]
    async fn test_function_invocation_with_params() {
        let action = ActionDescriptor::Function {
            module: "actions".to_string(),
            function: "echo".to_string(),
        };
        let mut params = HashMap::new();
        params.insert("text".to_string(), "spoken words".to_string());

        let result = executor().execute(&action, &params).await;
        assert!(result.success);
        assert_eq!(result.output, "spoken words");
    }

    #[tokio::test]
    async fn test_function_timeout_abandons_call() {
        let mut registry = FunctionRegistry::new();
        registry.register("actions", "stall", |_| {
            std::thread::sleep(Duration::from_secs(30));
            Ok(None)
        });
        let executor = CommandExecutor::with_registry(Duration::from_millis(200), registry);

        let action = ActionDescriptor::Function {
            module: "actions".to_string(),
            function: "stall".to_string(),
        };
        let started = std::time::Instant::now();
        let result = executor.execute(&action, &no_params()).await;

        assert!(!result.success);
        assert_eq!(result.error_kind, Some(ExecutionErrorKind::Timeout));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_builtin_exit_succeeds() {
        let action = ActionDescriptor::Builtin(BuiltinAction::Exit);
        let result = executor().execute(&action, &no_params()).await;

        assert!(result.success);
        assert_eq!(result.output, "Goodbye!");
    }
}
