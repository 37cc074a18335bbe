//! Runs a generation request off the interactive flow.
//!
//! The request runs on a spawned tokio task and delivers its result through
//! a oneshot channel. While waiting, the caller keeps redrawing a
//! [`BusyIndicator`]. A task resolves exactly once and cannot be cancelled.

use crate::error::GenerationError;
use crate::execution_context::FailureContext;
use crate::llm_generator::SuggestionSource;
use crate::spinner::BusyIndicator;
use crate::suggestion::Suggestion;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{debug, warn};

type TaskResult = Result<Suggestion, GenerationError>;

/// Lifecycle of one generation request. Only ever moves forward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskPhase {
    Pending,
    Done(Suggestion),
    Failed(GenerationError),
}

pub struct SuggestionTask {
    phase: TaskPhase,
    receiver: Option<oneshot::Receiver<TaskResult>>,
}

impl SuggestionTask {
    /// Spawns the request and returns immediately in the `Pending` phase.
    pub fn start(
        source: Arc<dyn SuggestionSource>,
        description: &str,
        context: Option<FailureContext>,
    ) -> Self {
        let (sender, receiver) = oneshot::channel();
        let description = description.to_string();

        tokio::spawn(async move {
            let result = source.suggest(&description, context.as_ref()).await;
            if sender.send(result).is_err() {
                debug!("Suggestion result dropped: receiver is gone");
            }
        });

        Self {
            phase: TaskPhase::Pending,
            receiver: Some(receiver),
        }
    }

    pub fn phase(&self) -> &TaskPhase {
        &self.phase
    }

    /// Records the result. Returns false, leaving the phase untouched, if
    /// the task had already resolved.
    fn resolve(&mut self, result: TaskResult) -> bool {
        if self.phase != TaskPhase::Pending {
            warn!("Ignoring second result for an already resolved suggestion task");
            return false;
        }
        self.phase = match result {
            Ok(suggestion) => TaskPhase::Done(suggestion),
            Err(e) => TaskPhase::Failed(e),
        };
        true
    }

    /// Waits for the result, ticking `indicator` until it arrives.
    pub async fn wait(&mut self, indicator: &mut dyn BusyIndicator) -> TaskResult {
        if let Some(receiver) = self.receiver.take() {
            let result = Self::receive(receiver, indicator).await;
            self.resolve(result);
        }

        match &self.phase {
            TaskPhase::Done(suggestion) => Ok(suggestion.clone()),
            TaskPhase::Failed(e) => Err(e.clone()),
            TaskPhase::Pending => Err(GenerationError::TaskAborted),
        }
    }

    async fn receive(
        mut receiver: oneshot::Receiver<TaskResult>,
        indicator: &mut dyn BusyIndicator,
    ) -> TaskResult {
        let mut ticker = tokio::time::interval(indicator.frame_duration());
        // The first tick completes immediately
        ticker.tick().await;
        indicator.start();

        let delivered = loop {
            tokio::select! {
                result = &mut receiver => break result,
                _ = ticker.tick() => indicator.tick(),
            }
        };

        indicator.stop();
        delivered.unwrap_or(Err(GenerationError::TaskAborted))
    }
}

/// Starts a task and waits for it.
pub async fn generate_with_indicator(
    source: Arc<dyn SuggestionSource>,
    description: &str,
    context: Option<FailureContext>,
    indicator: &mut dyn BusyIndicator,
) -> TaskResult {
    let mut task = SuggestionTask::start(source, description, context);
    task.wait(indicator).await
}
