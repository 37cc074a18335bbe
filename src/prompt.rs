//! Request text sent to the generation backends.

use crate::execution_context::FailureContext;

const RESPONSE_REQUIREMENTS: &str = "You MUST respond with ONLY valid JSON in this EXACT format:
{\"command\": \"the raw command\", \"description\": \"brief 1-2 line explanation of what this command does\"}

IMPORTANT REQUIREMENTS:
- Return ONLY the JSON object, no other text
- Do not wrap in markdown code blocks
- Do not include backticks, explanations, or any other formatting
- The command field must contain the exact command that can be executed
- The description field must be 1-2 lines maximum
- Ensure the JSON is properly formatted and valid
- Consider the operating system when suggesting commands";

/// Operating system name reported to the backend.
pub fn system_info() -> &'static str {
    std::env::consts::OS
}

/// Builds the request text for a description, optionally steering the
/// backend away from a previous failing command.
pub fn build_prompt(description: &str, context: Option<&FailureContext>) -> String {
    let mut prompt = format!(
        "Given this description: '{}', suggest a single CLI command that would accomplish this task.\n\n\
         SYSTEM CONTEXT:\n- Operating System: {}\n",
        description,
        system_info()
    );

    if let Some(context) = context {
        prompt.push_str(&format!(
            "\nIMPORTANT CONTEXT: {}\n\n\
             Please suggest an alternative command that addresses the error or takes a different approach.\n",
            context.describe()
        ));
    }

    prompt.push('\n');
    prompt.push_str(RESPONSE_REQUIREMENTS);

    if context.is_some() {
        prompt.push_str("\n- Consider the error context and suggest a different approach");
    }

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution_context::ErrorSummary;

    #[test]
    fn test_prompt_contains_description_and_os() {
        let prompt = build_prompt("list files", None);

        assert!(prompt.contains("'list files'"));
        assert!(prompt.contains(&format!("Operating System: {}", std::env::consts::OS)));
        assert!(prompt.contains("{\"command\": \"the raw command\""));
        assert!(!prompt.contains("IMPORTANT CONTEXT"));
        assert!(!prompt.contains("different approach"));
    }

    #[test]
    fn test_prompt_with_context_names_failed_command() {
        let context = FailureContext::new(
            "ls --colour",
            ErrorSummary::new("exit status: 2", "ls: unrecognized option '--colour'"),
        );

        let prompt = build_prompt("list files", Some(&context));

        assert!(prompt.contains("'list files'"));
        assert!(prompt.contains("IMPORTANT CONTEXT"));
        assert!(prompt.contains("`ls --colour`"));
        assert!(prompt.contains("unrecognized option"));
        assert!(prompt.ends_with("- Consider the error context and suggest a different approach"));
    }
}
