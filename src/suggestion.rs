//! Suggestions and the normalizer that produces them from raw backend text.
//!
//! Backends are asked for a single-line JSON object, but they do not always
//! comply: some wrap the object in a fenced code block, some answer with a
//! bare command. [`normalize`] never fails; anything it cannot parse becomes
//! the command itself with an empty description.

use serde::Deserialize;

const FENCE: &str = "```";

/// A command proposed by a backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suggestion {
    pub command: String,
    pub description: String,
}

impl Suggestion {
    pub fn new(command: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            description: description.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawSuggestion {
    command: String,
    description: String,
}

/// Converts raw backend text into a [`Suggestion`].
pub fn normalize(raw: &str) -> Suggestion {
    let cleaned = strip_code_fence(raw.trim());

    match serde_json::from_str::<RawSuggestion>(cleaned) {
        Ok(parsed) => Suggestion {
            command: parsed.command,
            description: parsed.description,
        },
        Err(e) => {
            tracing::debug!("Response is not a JSON suggestion ({}), using it as the command", e);
            Suggestion {
                command: cleaned.to_string(),
                description: String::new(),
            }
        }
    }
}

/// Removes an opening fence (with its language tag line) and everything from
/// the first closing fence onward. Unfenced text is returned unchanged.
fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix(FENCE) else {
        return text;
    };

    // The info string (e.g. `json`) runs to the end of the opening line, but
    // only when there is a line break before the closing fence.
    let body_end = rest.find(FENCE).unwrap_or(rest.len());
    let body_start = match rest[..body_end].find('\n') {
        Some(newline) => newline + 1,
        None => 0,
    };

    rest[body_start..body_end].trim()
}
