//! Generation gateway: selects a backend and turns its answer into a
//! [`Suggestion`].

use crate::backends::{Backend, BackendClient, CommandGenerator};
use crate::config::Config;
use crate::error::GenerationError;
use crate::execution_context::FailureContext;
use crate::http_client::{HttpClient, ReqwestHttpClient};
use crate::suggestion::{normalize, Suggestion};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

/// Anything that can produce a suggestion for a description.
///
/// The orchestrator only sees this trait, which keeps tests free of
/// network access.
#[async_trait]
pub trait SuggestionSource: Send + Sync {
    async fn suggest(
        &self,
        description: &str,
        context: Option<&FailureContext>,
    ) -> Result<Suggestion, GenerationError>;
}

pub struct LlmGenerator {
    config: Config,
    http: Arc<dyn HttpClient>,
}

impl LlmGenerator {
    pub fn new(config: Config) -> Self {
        Self::with_http_client(config, Arc::new(ReqwestHttpClient::new()))
    }

    pub fn with_http_client(config: Config, http: Arc<dyn HttpClient>) -> Self {
        Self { config, http }
    }

    /// The backend the next call would use, if any.
    pub fn selected_backend(&self) -> Option<Backend> {
        Backend::select(&self.config)
    }

    /// Generates one suggestion.
    ///
    /// Backend selection is re-evaluated on every call. With no backend
    /// available this fails with [`GenerationError::NoProviderConfigured`]
    /// before any request is made. Exactly one request is made otherwise;
    /// there is no retry here.
    pub async fn generate(
        &self,
        description: &str,
        context: Option<&FailureContext>,
    ) -> Result<Suggestion, GenerationError> {
        let backend = self
            .selected_backend()
            .ok_or(GenerationError::NoProviderConfigured)?;
        info!("Generating suggestion with {} backend", backend.name());

        let client = BackendClient::new(backend, self.http.clone());
        let raw = match context {
            Some(context) => {
                info!("Including failure of `{}` as context", context.original_command);
                client.generate_command_with_context(description, context).await?
            }
            None => client.generate_command(description).await?,
        };

        let suggestion = normalize(&raw);
        if suggestion.command.trim().is_empty() {
            return Err(GenerationError::EmptyResponse);
        }

        info!("Suggested command: {}", suggestion.command);
        Ok(suggestion)
    }
}

#[async_trait]
impl SuggestionSource for LlmGenerator {
    async fn suggest(
        &self,
        description: &str,
        context: Option<&FailureContext>,
    ) -> Result<Suggestion, GenerationError> {
        self.generate(description, context).await
    }
}
