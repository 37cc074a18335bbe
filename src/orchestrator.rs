//! The generate → present → act → retry loop.
//!
//! Every pass through the loop is one [`State`]. The user's description is
//! fixed for the whole session; the only thing that distinguishes a retry
//! from the first attempt is the [`FailureContext`] of the most recent
//! failure, which replaces (never accumulates with) the previous one.

use crate::choice_menu::{Action, ChoicePrompt, RETRY_ACTIONS, SUGGESTION_ACTIONS};
use crate::clipboard::ClipboardWriter;
use crate::error::{ClipboardError, GenerationError};
use crate::execution_context::FailureContext;
use crate::executor::{ExecutionOutcome, Executor};
use crate::llm_generator::SuggestionSource;
use crate::spinner::BusyIndicator;
use crate::style::Theme;
use crate::suggestion::Suggestion;
use crate::suggestion_task::generate_with_indicator;
use anyhow::Result;
use std::io::{self, Write};
use std::sync::Arc;
use tracing::{info, warn};

/// One step of the session state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum State {
    Generating { context: Option<FailureContext> },
    Presenting(Suggestion),
    Executing(Suggestion),
    Copying(Suggestion),
    ReportingFailure { suggestion: Suggestion, context: FailureContext },
    PresentingRetryChoice { suggestion: Suggestion, context: FailureContext },
    Finished(SessionOutcome),
}

/// How a session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    /// The command ran and exited successfully
    Succeeded,
    Copied,
    CopyFailed(ClipboardError),
    /// The user chose Exit or quit a menu
    Exited,
    GenerationFailed(GenerationError),
}

impl SessionOutcome {
    pub fn exit_code(&self) -> u8 {
        match self {
            SessionOutcome::Succeeded | SessionOutcome::Copied | SessionOutcome::Exited => 0,
            SessionOutcome::CopyFailed(_) | SessionOutcome::GenerationFailed(_) => 1,
        }
    }
}

pub struct RetryOrchestrator {
    source: Arc<dyn SuggestionSource>,
    menu: Box<dyn ChoicePrompt>,
    executor: Executor,
    clipboard: Box<dyn ClipboardWriter>,
    indicator: Box<dyn BusyIndicator>,
    theme: Theme,
    out: Box<dyn Write>,
    err: Box<dyn Write>,
}

impl RetryOrchestrator {
    pub fn new(
        source: Arc<dyn SuggestionSource>,
        menu: Box<dyn ChoicePrompt>,
        executor: Executor,
        clipboard: Box<dyn ClipboardWriter>,
        indicator: Box<dyn BusyIndicator>,
        theme: Theme,
    ) -> Self {
        Self {
            source,
            menu,
            executor,
            clipboard,
            indicator,
            theme,
            out: Box::new(io::stdout()),
            err: Box::new(io::stderr()),
        }
    }

    /// Redirects messages and echoed command output (for testing).
    pub fn with_output(mut self, out: Box<dyn Write>, err: Box<dyn Write>) -> Self {
        self.out = out;
        self.err = err;
        self
    }

    /// Runs the session for `description` until a terminal state.
    pub async fn run(&mut self, description: &str) -> Result<SessionOutcome> {
        info!("Starting session for: {}", description);
        let mut state = State::Generating { context: None };

        loop {
            if let State::Finished(outcome) = state {
                info!("Session finished: {:?}", outcome);
                return Ok(outcome);
            }
            state = self.step(description, state).await?;
        }
    }

    /// Performs one transition.
    pub async fn step(&mut self, description: &str, state: State) -> Result<State> {
        let next = match state {
            State::Generating { context } => {
                match generate_with_indicator(self.source.clone(), description, context, self.indicator.as_mut()).await {
                    Ok(suggestion) => State::Presenting(suggestion),
                    Err(e) => {
                        writeln!(self.err, "{}", self.theme.error(&format!("Error getting suggestion: {}", e)))?;
                        State::Finished(SessionOutcome::GenerationFailed(e))
                    }
                }
            }

            State::Presenting(suggestion) => {
                self.show_suggestion(&suggestion)?;
                match self.menu.present(&suggestion, &SUGGESTION_ACTIONS)? {
                    Action::Run => State::Executing(suggestion),
                    Action::Copy => State::Copying(suggestion),
                    Action::Exit | Action::Retry => self.exit()?,
                }
            }

            State::Executing(suggestion) => {
                writeln!(
                    self.out,
                    "\n{} {}",
                    self.theme.info("Running:"),
                    self.theme.command(&suggestion.command)
                )?;
                self.out.flush()?;

                let outcome = self
                    .executor
                    .execute_with_io(&suggestion.command, &mut self.out, &mut self.err);

                match outcome {
                    ExecutionOutcome::Success { .. } => State::Finished(SessionOutcome::Succeeded),
                    ExecutionOutcome::Failure { .. } => {
                        let context = outcome.failure_context(&suggestion.command).ok_or_else(|| {
                            anyhow::anyhow!("failed execution produced no failure context")
                        })?;
                        State::ReportingFailure { suggestion, context }
                    }
                }
            }

            State::Copying(suggestion) => match self.clipboard.write_text(&suggestion.command) {
                Ok(()) => {
                    writeln!(self.out, "\n{}", self.theme.success("Command copied to clipboard!"))?;
                    State::Finished(SessionOutcome::Copied)
                }
                Err(e) => {
                    warn!("Clipboard write failed: {}", e);
                    writeln!(self.err, "\n{}", self.theme.error(&format!("Error copying to clipboard: {}", e)))?;
                    State::Finished(SessionOutcome::CopyFailed(e))
                }
            },

            State::ReportingFailure { suggestion, context } => {
                warn!("`{}` failed: {}", context.original_command, context.error.reason);
                writeln!(
                    self.err,
                    "\n{} {}",
                    self.theme.error("Error running command:"),
                    context.error.reason
                )?;
                State::PresentingRetryChoice { suggestion, context }
            }

            State::PresentingRetryChoice { suggestion, context } => {
                match self.menu.present(&suggestion, &RETRY_ACTIONS)? {
                    Action::Retry => {
                        writeln!(self.out, "\n{}", self.theme.info("Looking for a different approach..."))?;
                        State::Generating { context: Some(context) }
                    }
                    Action::Run | Action::Copy | Action::Exit => self.exit()?,
                }
            }

            finished @ State::Finished(_) => finished,
        };

        Ok(next)
    }

    fn show_suggestion(&mut self, suggestion: &Suggestion) -> Result<()> {
        writeln!(
            self.out,
            "\n{} {}",
            self.theme.success("Suggested command:"),
            self.theme.command(&suggestion.command)
        )?;
        if !suggestion.description.is_empty() {
            writeln!(self.out, "{}", self.theme.info(&suggestion.description))?;
        }
        self.out.flush()?;
        Ok(())
    }

    fn exit(&mut self) -> Result<State> {
        writeln!(self.out, "\n{}", self.theme.info("Exiting..."))?;
        Ok(State::Finished(SessionOutcome::Exited))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution_context::ErrorSummary;
    use crate::executor::ProcessRunner;
    use crate::spinner::NoopIndicator;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::os::unix::process::ExitStatusExt;
    use std::process::{ExitStatus, Output};
    use std::sync::Mutex;

    // =========================================================================
    // Test doubles
    // =========================================================================

    type Calls<T> = Arc<Mutex<Vec<T>>>;

    struct ScriptedSource {
        results: Mutex<VecDeque<Result<Suggestion, GenerationError>>>,
        calls: Calls<(String, Option<FailureContext>)>,
    }

    #[async_trait]
    impl SuggestionSource for ScriptedSource {
        async fn suggest(
            &self,
            description: &str,
            context: Option<&FailureContext>,
        ) -> Result<Suggestion, GenerationError> {
            self.calls
                .lock()
                .unwrap()
                .push((description.to_string(), context.cloned()));
            self.results
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(GenerationError::EmptyResponse))
        }
    }

    struct ScriptedMenu {
        choices: VecDeque<Action>,
        shown: Calls<(Suggestion, Vec<Action>)>,
    }

    impl ChoicePrompt for ScriptedMenu {
        fn present(&mut self, suggestion: &Suggestion, options: &[Action]) -> Result<Action> {
            self.shown.lock().unwrap().push((suggestion.clone(), options.to_vec()));
            self.choices
                .pop_front()
                .ok_or_else(|| anyhow::anyhow!("menu script exhausted"))
        }
    }

    struct ScriptedRunner {
        outputs: Mutex<VecDeque<Output>>,
        calls: Calls<String>,
    }

    impl ProcessRunner for ScriptedRunner {
        fn run(&self, program: &str, args: &[&str]) -> io::Result<Output> {
            let mut line = vec![program];
            line.extend_from_slice(args);
            self.calls.lock().unwrap().push(line.join(" "));
            self.outputs
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| io::Error::other("runner script exhausted"))
        }

        fn program_exists(&self, _program: &str) -> bool {
            true
        }
    }

    struct RecordingClipboard {
        fail: bool,
        written: Calls<String>,
    }

    impl ClipboardWriter for RecordingClipboard {
        fn write_text(&mut self, text: &str) -> Result<(), ClipboardError> {
            if self.fail {
                return Err(ClipboardError::Unavailable("no display".to_string()));
            }
            self.written.lock().unwrap().push(text.to_string());
            Ok(())
        }
    }

    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl SharedBuffer {
        fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).to_string()
        }
    }

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn ok(status: i32, stdout: &str, stderr: &str) -> Output {
        Output {
            status: ExitStatus::from_raw(status << 8),
            stdout: stdout.as_bytes().to_vec(),
            stderr: stderr.as_bytes().to_vec(),
        }
    }

    struct Harness {
        orchestrator: RetryOrchestrator,
        source_calls: Calls<(String, Option<FailureContext>)>,
        menus: Calls<(Suggestion, Vec<Action>)>,
        runs: Calls<String>,
        copied: Calls<String>,
        out: SharedBuffer,
        err: SharedBuffer,
    }

    fn harness(
        suggestions: Vec<Result<Suggestion, GenerationError>>,
        choices: Vec<Action>,
        outputs: Vec<Output>,
        clipboard_fails: bool,
    ) -> Harness {
        let source_calls: Calls<_> = Arc::default();
        let menus: Calls<_> = Arc::default();
        let runs: Calls<_> = Arc::default();
        let copied: Calls<_> = Arc::default();
        let out = SharedBuffer::default();
        let err = SharedBuffer::default();

        let source = Arc::new(ScriptedSource {
            results: Mutex::new(suggestions.into()),
            calls: source_calls.clone(),
        });
        let menu = ScriptedMenu {
            choices: choices.into(),
            shown: menus.clone(),
        };
        let runner = ScriptedRunner {
            outputs: Mutex::new(outputs.into()),
            calls: runs.clone(),
        };
        let clipboard = RecordingClipboard {
            fail: clipboard_fails,
            written: copied.clone(),
        };

        let orchestrator = RetryOrchestrator::new(
            source,
            Box::new(menu),
            Executor::with_runner(Box::new(runner), Theme::plain()),
            Box::new(clipboard),
            Box::new(NoopIndicator),
            Theme::plain(),
        )
        .with_output(Box::new(out.clone()), Box::new(err.clone()));

        Harness {
            orchestrator,
            source_calls,
            menus,
            runs,
            copied,
            out,
            err,
        }
    }

    // =========================================================================
    // End-to-end sessions
    // =========================================================================

    #[tokio::test]
    async fn test_run_success_ends_session() {
        let mut h = harness(
            vec![Ok(Suggestion::new("ls -la", "Lists all files"))],
            vec![Action::Run],
            vec![ok(0, "total 0\n", "")],
            false,
        );

        let outcome = h.orchestrator.run("list files").await.unwrap();

        assert_eq!(outcome, SessionOutcome::Succeeded);
        assert_eq!(*h.runs.lock().unwrap(), vec!["ls -la".to_string()]);
        let menus = h.menus.lock().unwrap();
        assert_eq!(menus.len(), 1);
        assert_eq!(menus[0].0, Suggestion::new("ls -la", "Lists all files"));
        assert_eq!(menus[0].1, SUGGESTION_ACTIONS.to_vec());
        assert_eq!(*h.source_calls.lock().unwrap(), vec![("list files".to_string(), None)]);

        let out = h.out.text();
        assert!(out.contains("Suggested command: ls -la"));
        assert!(out.contains("Lists all files"));
        assert!(out.contains("Running: ls -la"));
        assert!(out.contains("total 0"));
    }

    #[tokio::test]
    async fn test_failure_then_exit_makes_no_further_backend_calls() {
        let mut h = harness(
            vec![Ok(Suggestion::new("false", "Exit with failure"))],
            vec![Action::Run, Action::Exit],
            vec![ok(1, "", "")],
            false,
        );

        let outcome = h.orchestrator.run("fail please").await.unwrap();

        assert_eq!(outcome, SessionOutcome::Exited);
        assert_eq!(h.source_calls.lock().unwrap().len(), 1);
        let menus = h.menus.lock().unwrap();
        assert_eq!(menus.len(), 2);
        assert_eq!(menus[1].1, RETRY_ACTIONS.to_vec());
        assert!(h.err.text().contains("Error running command: exit status: 1"));
        assert!(h.out.text().contains("Exiting..."));
    }

    #[tokio::test]
    async fn test_retry_carries_only_the_latest_failure() {
        let mut h = harness(
            vec![
                Ok(Suggestion::new("cmd-one --a", "")),
                Ok(Suggestion::new("cmd-two --b", "")),
                Ok(Suggestion::new("cmd-three", "")),
            ],
            vec![Action::Run, Action::Retry, Action::Run, Action::Retry, Action::Exit],
            vec![ok(2, "", "first error\n"), ok(3, "", "second error\n")],
            false,
        );

        let outcome = h.orchestrator.run("do the thing").await.unwrap();

        assert_eq!(outcome, SessionOutcome::Exited);
        let calls = h.source_calls.lock().unwrap();
        assert_eq!(calls.len(), 3);
        assert!(calls.iter().all(|(description, _)| description == "do the thing"));
        assert_eq!(calls[0].1, None);
        assert_eq!(
            calls[1].1,
            Some(FailureContext::new("cmd-one --a", ErrorSummary::new("exit status: 2", "first error")))
        );
        assert_eq!(
            calls[2].1,
            Some(FailureContext::new("cmd-two --b", ErrorSummary::new("exit status: 3", "second error")))
        );
        assert_eq!(h.runs.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_retry_until_success() {
        let mut h = harness(
            vec![Ok(Suggestion::new("false", "")), Ok(Suggestion::new("true", ""))],
            vec![Action::Run, Action::Retry, Action::Run],
            vec![ok(1, "", "nope\n"), ok(0, "", "")],
            false,
        );

        assert_eq!(h.orchestrator.run("succeed eventually").await.unwrap(), SessionOutcome::Succeeded);
        assert_eq!(*h.runs.lock().unwrap(), vec!["false".to_string(), "true".to_string()]);
    }

    #[tokio::test]
    async fn test_generation_failure_ends_without_menu() {
        let mut h = harness(vec![Err(GenerationError::NoProviderConfigured)], vec![], vec![], false);

        let outcome = h.orchestrator.run("list files").await.unwrap();

        assert_eq!(outcome, SessionOutcome::GenerationFailed(GenerationError::NoProviderConfigured));
        assert_eq!(outcome.exit_code(), 1);
        assert!(h.menus.lock().unwrap().is_empty());
        assert!(h.err.text().contains("Error getting suggestion: no API key found"));
    }

    #[tokio::test]
    async fn test_failed_regeneration_is_not_retried() {
        let mut h = harness(
            vec![Ok(Suggestion::new("false", "")), Err(GenerationError::EmptyResponse)],
            vec![Action::Run, Action::Retry],
            vec![ok(1, "", "")],
            false,
        );

        let outcome = h.orchestrator.run("x").await.unwrap();

        assert_eq!(outcome, SessionOutcome::GenerationFailed(GenerationError::EmptyResponse));
        assert_eq!(h.source_calls.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_copy_writes_command_and_does_not_loop() {
        let mut h = harness(vec![Ok(Suggestion::new("git status", ""))], vec![Action::Copy], vec![], false);

        let outcome = h.orchestrator.run("git state").await.unwrap();

        assert_eq!(outcome, SessionOutcome::Copied);
        assert_eq!(*h.copied.lock().unwrap(), vec!["git status".to_string()]);
        assert!(h.runs.lock().unwrap().is_empty());
        assert!(h.out.text().contains("Command copied to clipboard!"));
    }

    #[tokio::test]
    async fn test_copy_failure_is_reported() {
        let mut h = harness(vec![Ok(Suggestion::new("git status", ""))], vec![Action::Copy], vec![], true);

        let outcome = h.orchestrator.run("git state").await.unwrap();

        assert!(matches!(outcome, SessionOutcome::CopyFailed(ClipboardError::Unavailable(_))));
        assert_eq!(outcome.exit_code(), 1);
        assert!(h.err.text().contains("Error copying to clipboard"));
    }

    #[tokio::test]
    async fn test_exit_at_first_menu_runs_nothing() {
        let mut h = harness(vec![Ok(Suggestion::new("rm -rf build", ""))], vec![Action::Exit], vec![], false);

        let outcome = h.orchestrator.run("clean").await.unwrap();

        assert_eq!(outcome, SessionOutcome::Exited);
        assert_eq!(outcome.exit_code(), 0);
        assert!(h.runs.lock().unwrap().is_empty());
        assert!(h.copied.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_menu_error_propagates() {
        let mut h = harness(vec![Ok(Suggestion::new("ls", ""))], vec![], vec![], false);

        assert!(h.orchestrator.run("list").await.is_err());
    }

    // =========================================================================
    // Single transitions
    // =========================================================================

    #[tokio::test]
    async fn test_execution_failure_builds_failure_context() {
        let mut h = harness(vec![], vec![], vec![ok(1, "", "boom\n")], false);
        let suggestion = Suggestion::new("sh -c exit", "");

        let next = h
            .orchestrator
            .step("anything", State::Executing(suggestion.clone()))
            .await
            .unwrap();

        assert_eq!(
            next,
            State::ReportingFailure {
                suggestion,
                context: FailureContext::new("sh -c exit", ErrorSummary::new("exit status: 1", "boom")),
            }
        );
    }

    #[tokio::test]
    async fn test_reporting_failure_leads_to_retry_choice() {
        let mut h = harness(vec![], vec![], vec![], false);
        let suggestion = Suggestion::new("false", "");
        let context = FailureContext::new("false", ErrorSummary::new("exit status: 1", ""));

        let next = h
            .orchestrator
            .step(
                "anything",
                State::ReportingFailure {
                    suggestion: suggestion.clone(),
                    context: context.clone(),
                },
            )
            .await
            .unwrap();

        assert_eq!(next, State::PresentingRetryChoice { suggestion, context });
    }

    #[tokio::test]
    async fn test_retry_choice_regenerates_with_context() {
        let mut h = harness(vec![], vec![Action::Retry], vec![], false);
        let context = FailureContext::new("false", ErrorSummary::new("exit status: 1", ""));

        let next = h
            .orchestrator
            .step(
                "anything",
                State::PresentingRetryChoice {
                    suggestion: Suggestion::new("false", ""),
                    context: context.clone(),
                },
            )
            .await
            .unwrap();

        assert_eq!(next, State::Generating { context: Some(context) });
    }

    #[tokio::test]
    async fn test_finished_is_terminal() {
        let mut h = harness(vec![], vec![], vec![], false);
        let finished = State::Finished(SessionOutcome::Exited);

        let next = h.orchestrator.step("anything", finished.clone()).await.unwrap();

        assert_eq!(next, finished);
    }
}
