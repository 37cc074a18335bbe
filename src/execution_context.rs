//! Failure context carried into the next generation attempt.
//!
//! When a suggested command fails, the command text and a summary of why it
//! failed are handed to the next generation request so the backend can
//! propose a different approach. Only the most recent failure is ever kept.

/// Upper bound on captured stderr carried into a prompt, in characters.
pub const MAX_STDERR_CHARS: usize = 2000;

/// Why a command failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorSummary {
    /// Exit status or OS-level launch error (e.g. `exit status: 1`).
    pub reason: String,
    /// Captured standard error, trimmed and truncated.
    pub stderr: String,
}

impl ErrorSummary {
    pub fn new(reason: impl Into<String>, stderr: &str) -> Self {
        Self {
            reason: reason.into(),
            stderr: summarize_stderr(stderr),
        }
    }
}

/// The most recent failed command and its error detail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureContext {
    pub original_command: String,
    pub error: ErrorSummary,
}

impl FailureContext {
    pub fn new(original_command: &str, error: ErrorSummary) -> Self {
        Self {
            original_command: original_command.to_string(),
            error,
        }
    }

    /// Renders the failure as the error-context paragraph of a prompt.
    pub fn describe(&self) -> String {
        let mut text = format!(
            "The previously suggested command `{}` failed: {}.",
            self.original_command, self.error.reason
        );
        if !self.error.stderr.is_empty() {
            text.push_str("\nError output:\n");
            text.push_str(&self.error.stderr);
        }
        text
    }
}

/// Trims surrounding whitespace and keeps only the tail of long output,
/// where the actual error usually is.
fn summarize_stderr(stderr: &str) -> String {
    let trimmed = stderr.trim();
    let count = trimmed.chars().count();
    if count <= MAX_STDERR_CHARS {
        return trimmed.to_string();
    }
    trimmed.chars().skip(count - MAX_STDERR_CHARS).collect()
}
