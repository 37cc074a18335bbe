//! Error types surfaced by the suggestion pipeline.

use thiserror::Error;

/// Errors that end a generation attempt.
///
/// None of these are retried automatically: no command was ever proposed,
/// so there is nothing to feed back into a corrected request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    /// No backend credential is present
    #[error("no API key found. Set GEMINI_API_KEY, OPENAI_API_KEY, or ANTHROPIC_API_KEY")]
    NoProviderConfigured,

    /// Transport failure while talking to the backend
    #[error("network error: {0}")]
    Network(String),

    /// Backend answered with a non-success status
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Backend answered but produced no usable text
    #[error("no suggestions received")]
    EmptyResponse,

    /// Backend response envelope could not be read
    #[error("unexpected response format: {0}")]
    MalformedResponse(String),

    /// The background generation task ended without delivering a result
    #[error("suggestion task ended without a result")]
    TaskAborted,
}

/// Errors from writing to the system clipboard.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClipboardError {
    /// System clipboard is not available (headless session, no display server)
    #[error("clipboard unavailable: {0}")]
    Unavailable(String),

    /// Clipboard was reachable but rejected the text
    #[error("failed to write to clipboard: {0}")]
    Write(String),
}
