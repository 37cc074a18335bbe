//! Command execution module for running suggested commands.
//!
//! The command string is split on whitespace into a program and its
//! arguments; there is no shell involved, so quotes, pipes and redirections
//! are passed through as literal arguments. The child inherits the
//! terminal's stdin, while its stdout and stderr are captured separately and
//! echoed once it exits.

use crate::execution_context::{ErrorSummary, FailureContext};
use crate::style::Theme;
use std::io::{self, Write};
use std::process::{Command, Output, Stdio};
use tracing::{error, info, warn};

/// Outcome of running a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionOutcome {
    Success {
        stdout: String,
        stderr: String,
    },
    Failure {
        stdout: String,
        stderr: String,
        /// Exit status or OS-level launch error.
        reason: String,
    },
}

impl ExecutionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ExecutionOutcome::Success { .. })
    }

    pub fn stdout(&self) -> &str {
        match self {
            ExecutionOutcome::Success { stdout, .. } | ExecutionOutcome::Failure { stdout, .. } => stdout,
        }
    }

    pub fn stderr(&self) -> &str {
        match self {
            ExecutionOutcome::Success { stderr, .. } | ExecutionOutcome::Failure { stderr, .. } => stderr,
        }
    }

    /// Builds the context for the next generation attempt. `None` on success.
    pub fn failure_context(&self, command: &str) -> Option<FailureContext> {
        match self {
            ExecutionOutcome::Success { .. } => None,
            ExecutionOutcome::Failure { stderr, reason, .. } => {
                Some(FailureContext::new(command, ErrorSummary::new(reason.clone(), stderr)))
            }
        }
    }
}

// =============================================================================
// Traits for Dependency Injection
// =============================================================================

/// Trait for running system processes.
///
/// This abstraction enables testing without spawning real processes.
pub trait ProcessRunner: Send + Sync {
    /// Runs a program to completion with inherited stdin and captured
    /// stdout/stderr.
    fn run(&self, program: &str, args: &[&str]) -> io::Result<Output>;

    /// Checks if a program exists in PATH.
    fn program_exists(&self, program: &str) -> bool;
}

/// Default process runner using std::process::Command.
pub struct SystemProcessRunner;

impl ProcessRunner for SystemProcessRunner {
    fn run(&self, program: &str, args: &[&str]) -> io::Result<Output> {
        Command::new(program)
            .args(args)
            .stdin(Stdio::inherit())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
    }

    fn program_exists(&self, program: &str) -> bool {
        which::which(program).is_ok()
    }
}

/// Splits a command into program and arguments on whitespace.
pub fn tokenize(command: &str) -> Vec<&str> {
    command.split_whitespace().collect()
}

// =============================================================================
// Executor Implementation
// =============================================================================

/// Runs suggested commands and reports what happened.
///
/// # Example
///
/// ```no_run
/// use suggest::executor::Executor;
/// use suggest::style::Theme;
///
/// let executor = Executor::new(Theme::plain());
/// let outcome = executor.execute("ls -la");
/// assert!(outcome.is_success());
/// ```
pub struct Executor {
    runner: Box<dyn ProcessRunner>,
    theme: Theme,
}

impl Executor {
    pub fn new(theme: Theme) -> Self {
        Self::with_runner(Box::new(SystemProcessRunner), theme)
    }

    /// Creates an executor with an injected process runner (for testing).
    pub fn with_runner(runner: Box<dyn ProcessRunner>, theme: Theme) -> Self {
        Self { runner, theme }
    }

    /// Executes a command, echoing its output to the terminal.
    pub fn execute(&self, command: &str) -> ExecutionOutcome {
        self.execute_with_io(command, &mut io::stdout(), &mut io::stderr())
    }

    /// Executes a command, echoing captured output to the given writers.
    ///
    /// An empty command is a no-op success. A non-zero exit or a launch
    /// failure is a [`ExecutionOutcome::Failure`]; output is echoed either way.
    pub fn execute_with_io<W1: Write, W2: Write>(
        &self,
        command: &str,
        stdout: &mut W1,
        stderr: &mut W2,
    ) -> ExecutionOutcome {
        let tokens = tokenize(command);
        let Some((program, args)) = tokens.split_first() else {
            info!("Empty command, nothing to run");
            return ExecutionOutcome::Success {
                stdout: String::new(),
                stderr: String::new(),
            };
        };

        info!("Executing command: {} {:?}", program, args);

        let outcome = match self.runner.run(program, args) {
            Ok(output) => Self::classify(&output),
            Err(e) => {
                let reason = if self.runner.program_exists(program) {
                    e.to_string()
                } else {
                    format!("{} (`{}` was not found in PATH)", e, program)
                };
                error!("Failed to launch `{}`: {}", program, reason);
                ExecutionOutcome::Failure {
                    stdout: String::new(),
                    stderr: String::new(),
                    reason,
                }
            }
        };

        if let Err(e) = self.echo_output(&outcome, stdout, stderr) {
            warn!("Failed to echo command output: {}", e);
        }

        outcome
    }

    fn classify(output: &Output) -> ExecutionOutcome {
        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        if output.status.success() {
            ExecutionOutcome::Success { stdout, stderr }
        } else {
            error!("Command failed with status: {}", output.status);
            ExecutionOutcome::Failure {
                stdout,
                stderr,
                reason: output.status.to_string(),
            }
        }
    }

    /// Writes stdout plain and stderr in the stderr style.
    fn echo_output<W1: Write, W2: Write>(
        &self,
        outcome: &ExecutionOutcome,
        stdout: &mut W1,
        stderr: &mut W2,
    ) -> io::Result<()> {
        if !outcome.stdout().is_empty() {
            write!(stdout, "{}", outcome.stdout())?;
            stdout.flush()?;
        }
        if !outcome.stderr().is_empty() {
            write!(stderr, "{}", self.theme.stderr(outcome.stderr()))?;
            stderr.flush()?;
        }
        Ok(())
    }
}
