//! Generation backends.
//!
//! The backends form a closed set: [`Backend`] names which service to call
//! and with which credentials, [`Backend::select`] picks one from the
//! configuration, and [`BackendClient`] performs the actual request through
//! the [`CommandGenerator`] capability.

use crate::config::{Config, ProviderKind};
use crate::error::GenerationError;
use crate::execution_context::FailureContext;
use crate::http_client::{HttpClient, HttpResponse};
use crate::prompt::build_prompt;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const OPENAI_URL: &str = "https://api.openai.com/v1/chat/completions";
const ANTHROPIC_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const ANTHROPIC_MAX_TOKENS: u32 = 100;

/// Capability shared by every backend: produce raw suggestion text.
#[async_trait]
pub trait CommandGenerator: Send + Sync {
    async fn generate_command(&self, description: &str) -> Result<String, GenerationError>;

    async fn generate_command_with_context(
        &self,
        description: &str,
        context: &FailureContext,
    ) -> Result<String, GenerationError>;
}

/// One configured backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Backend {
    Gemini { api_key: String, model: String },
    OpenAi { api_key: String, model: String },
    Anthropic { api_key: String, model: String },
    /// Offline canned responses (`SUGGEST_USE_MOCK`)
    Mock,
}

impl Backend {
    /// Picks the first available backend in priority order: mock (only when
    /// enabled), Gemini, OpenAI, Anthropic.
    pub fn select(config: &Config) -> Option<Backend> {
        if config.is_mock_mode() {
            return Some(Backend::Mock);
        }

        ProviderKind::ALL.into_iter().find_map(|kind| {
            let api_key = config.api_key(kind)?.to_string();
            let model = config.model(kind).to_string();
            Some(match kind {
                ProviderKind::Gemini => Backend::Gemini { api_key, model },
                ProviderKind::OpenAi => Backend::OpenAi { api_key, model },
                ProviderKind::Anthropic => Backend::Anthropic { api_key, model },
            })
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Backend::Gemini { .. } => "gemini",
            Backend::OpenAi { .. } => "openai",
            Backend::Anthropic { .. } => "anthropic",
            Backend::Mock => "mock",
        }
    }

    /// URL, headers and JSON body for a prompt. `None` for the mock backend.
    fn request(&self, prompt: &str) -> Option<(String, Vec<(&'static str, String)>, Value)> {
        match self {
            Backend::Gemini { api_key, model } => Some((
                format!("{}/{}:generateContent", GEMINI_BASE_URL, model),
                vec![
                    ("x-goog-api-key", api_key.clone()),
                    ("content-type", "application/json".to_string()),
                ],
                json!({
                    "contents": [
                        { "parts": [ { "text": prompt } ] }
                    ]
                }),
            )),
            Backend::OpenAi { api_key, model } => Some((
                OPENAI_URL.to_string(),
                vec![
                    ("authorization", format!("Bearer {}", api_key)),
                    ("content-type", "application/json".to_string()),
                ],
                json!({
                    "model": model,
                    "messages": [
                        { "role": "user", "content": prompt }
                    ]
                }),
            )),
            Backend::Anthropic { api_key, model } => Some((
                ANTHROPIC_URL.to_string(),
                vec![
                    ("x-api-key", api_key.clone()),
                    ("anthropic-version", ANTHROPIC_VERSION.to_string()),
                    ("content-type", "application/json".to_string()),
                ],
                json!({
                    "model": model,
                    "max_tokens": ANTHROPIC_MAX_TOKENS,
                    "messages": [
                        { "role": "user", "content": prompt }
                    ]
                }),
            )),
            Backend::Mock => None,
        }
    }

    /// Pulls the generated text out of a provider's response envelope.
    fn extract_text(&self, response: &Value) -> Option<String> {
        let text = match self {
            Backend::Gemini { .. } => response
                .get("candidates")
                .and_then(|c| c.as_array())
                .and_then(|arr| arr.first())
                .and_then(|candidate| candidate.pointer("/content/parts/0/text"))
                .and_then(|text| text.as_str()),
            Backend::OpenAi { .. } => response
                .get("choices")
                .and_then(|c| c.as_array())
                .and_then(|arr| arr.first())
                .and_then(|choice| choice.pointer("/message/content"))
                .and_then(|text| text.as_str()),
            Backend::Anthropic { .. } => response
                .get("content")
                .and_then(|c| c.as_array())
                .and_then(|blocks| {
                    blocks
                        .iter()
                        .find(|block| block.get("type").and_then(|t| t.as_str()) == Some("text"))
                })
                .and_then(|block| block.get("text"))
                .and_then(|text| text.as_str()),
            Backend::Mock => None,
        };

        text.map(|t| t.trim().to_string()).filter(|t| !t.is_empty())
    }
}

/// A selected backend bound to an HTTP client.
pub struct BackendClient {
    backend: Backend,
    http: Arc<dyn HttpClient>,
}

impl BackendClient {
    pub fn new(backend: Backend, http: Arc<dyn HttpClient>) -> Self {
        Self { backend, http }
    }

    pub fn backend(&self) -> &Backend {
        &self.backend
    }

    async fn complete(&self, description: &str, prompt: &str) -> Result<String, GenerationError> {
        let Some((url, headers, body)) = self.backend.request(prompt) else {
            return Ok(mock_response(description, prompt));
        };

        info!("Requesting suggestion from {}", self.backend.name());
        let header_refs: Vec<(&str, &str)> = headers.iter().map(|(k, v)| (*k, v.as_str())).collect();

        let response = self
            .http
            .post_json(&url, &header_refs, &body)
            .await
            .map_err(|e| GenerationError::Network(e.to_string()))?;

        self.read_response(response)
    }

    fn read_response(&self, response: HttpResponse) -> Result<String, GenerationError> {
        let parsed: Option<Value> = serde_json::from_str(&response.body).ok();

        if !response.is_success() {
            let message = parsed
                .as_ref()
                .and_then(|v| v.pointer("/error/message"))
                .and_then(|m| m.as_str())
                .map(str::to_string)
                .unwrap_or_else(|| response.body.trim().to_string());
            warn!("{} returned status {}: {}", self.backend.name(), response.status, message);
            return Err(GenerationError::Api {
                status: response.status,
                message,
            });
        }

        let parsed = parsed.ok_or_else(|| {
            GenerationError::MalformedResponse(format!("{} response is not JSON", self.backend.name()))
        })?;
        debug!("{} response: {}", self.backend.name(), parsed);

        self.backend
            .extract_text(&parsed)
            .ok_or(GenerationError::EmptyResponse)
    }
}

#[async_trait]
impl CommandGenerator for BackendClient {
    async fn generate_command(&self, description: &str) -> Result<String, GenerationError> {
        let prompt = build_prompt(description, None);
        self.complete(description, &prompt).await
    }

    async fn generate_command_with_context(
        &self,
        description: &str,
        context: &FailureContext,
    ) -> Result<String, GenerationError> {
        let prompt = build_prompt(description, Some(context));
        self.complete(description, &prompt).await
    }
}

/// Canned answers keyed on the description, for offline runs and tests.
fn mock_response(description: &str, prompt: &str) -> String {
    let lower = description.to_lowercase();
    let retrying = prompt.contains("IMPORTANT CONTEXT");

    let (command, explanation) = if retrying {
        ("echo retried", "Fallback suggested after the previous command failed")
    } else if lower.contains("fail") {
        ("false", "Always exits with a non-zero status")
    } else if lower.contains("list") && lower.contains("file") {
        ("ls -la", "Lists all files")
    } else if lower.contains("directory") || lower.contains("where") {
        ("pwd", "Print working directory")
    } else if lower.contains("time") || lower.contains("date") {
        ("date", "Show the current date and time")
    } else {
        ("echo hello", "Prints a greeting")
    };

    json!({ "command": command, "description": explanation }).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution_context::ErrorSummary;
    use crate::http_client::tests::MockHttpClient;
    use crate::providers::MapEnvProvider;
    use std::path::Path;

    fn config_with(env: MapEnvProvider) -> Config {
        Config::load_with_env(Path::new("/nonexistent/suggest/config.toml"), &env).unwrap()
    }

    fn anthropic() -> Backend {
        Backend::Anthropic {
            api_key: "sk-ant".to_string(),
            model: "claude-3-5-haiku-latest".to_string(),
        }
    }

    // =========================================================================
    // Selection
    // =========================================================================

    #[test]
    fn test_select_none_without_keys() {
        assert_eq!(Backend::select(&config_with(MapEnvProvider::new())), None);
    }

    #[test]
    fn test_select_follows_priority_order() {
        let all = MapEnvProvider::new()
            .with("GEMINI_API_KEY", "g")
            .with("OPENAI_API_KEY", "o")
            .with("ANTHROPIC_API_KEY", "a");
        assert_eq!(Backend::select(&config_with(all)).unwrap().name(), "gemini");

        let openai_and_anthropic = MapEnvProvider::new()
            .with("OPENAI_API_KEY", "o")
            .with("ANTHROPIC_API_KEY", "a");
        assert_eq!(
            Backend::select(&config_with(openai_and_anthropic)),
            Some(Backend::OpenAi {
                api_key: "o".to_string(),
                model: "gpt-4.1-mini-2025-04-14".to_string(),
            })
        );

        let anthropic_only = MapEnvProvider::new().with("ANTHROPIC_API_KEY", "a");
        assert_eq!(Backend::select(&config_with(anthropic_only)).unwrap().name(), "anthropic");
    }

    #[test]
    fn test_select_mock_takes_precedence() {
        let env = MapEnvProvider::new()
            .with("SUGGEST_USE_MOCK", "1")
            .with("GEMINI_API_KEY", "g");
        assert_eq!(Backend::select(&config_with(env)), Some(Backend::Mock));
    }

    // =========================================================================
    // Request shapes
    // =========================================================================

    #[tokio::test]
    async fn test_gemini_request_shape() {
        let http = Arc::new(MockHttpClient::new(
            r#"{"candidates":[{"content":{"parts":[{"text":"{\"command\":\"ls\",\"description\":\"d\"}"}]}}]}"#,
        ));
        let client = BackendClient::new(
            Backend::Gemini {
                api_key: "AIza-test".to_string(),
                model: "gemini-2.5-flash".to_string(),
            },
            http.clone(),
        );

        let text = client.generate_command("list files").await.unwrap();

        assert_eq!(text, r#"{"command":"ls","description":"d"}"#);
        let request = http.last_request().unwrap();
        assert_eq!(
            request.url,
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash:generateContent"
        );
        assert!(request.headers.contains(&("x-goog-api-key".to_string(), "AIza-test".to_string())));
        let prompt = request.body.pointer("/contents/0/parts/0/text").unwrap().as_str().unwrap();
        assert!(prompt.contains("'list files'"));
    }

    #[tokio::test]
    async fn test_openai_request_shape() {
        let http = Arc::new(MockHttpClient::new(r#"{"choices":[{"message":{"content":"  pwd  "}}]}"#));
        let client = BackendClient::new(
            Backend::OpenAi {
                api_key: "sk-openai".to_string(),
                model: "gpt-4.1-mini-2025-04-14".to_string(),
            },
            http.clone(),
        );

        let text = client.generate_command("where am i").await.unwrap();

        assert_eq!(text, "pwd");
        let request = http.last_request().unwrap();
        assert_eq!(request.url, OPENAI_URL);
        assert!(request.headers.contains(&("authorization".to_string(), "Bearer sk-openai".to_string())));
        assert_eq!(request.body["model"], "gpt-4.1-mini-2025-04-14");
        assert_eq!(request.body["messages"][0]["role"], "user");
    }

    #[tokio::test]
    async fn test_anthropic_request_shape_and_text_block() {
        let http = Arc::new(MockHttpClient::new(
            r#"{"content":[{"type":"thinking","thinking":"..."},{"type":"text","text":"uptime"}]}"#,
        ));
        let client = BackendClient::new(anthropic(), http.clone());

        let text = client.generate_command("how long has this machine been up").await.unwrap();

        assert_eq!(text, "uptime");
        let request = http.last_request().unwrap();
        assert_eq!(request.url, ANTHROPIC_URL);
        assert!(request.headers.contains(&("anthropic-version".to_string(), "2023-06-01".to_string())));
        assert_eq!(request.body["max_tokens"], 100);
    }

    #[tokio::test]
    async fn test_with_context_sends_failure_details() {
        let http = Arc::new(MockHttpClient::new(r#"{"content":[{"type":"text","text":"ls -l"}]}"#));
        let client = BackendClient::new(anthropic(), http.clone());
        let context = FailureContext::new("ls --bogus", ErrorSummary::new("exit status: 2", "ls: bad option"));

        client.generate_command_with_context("list files", &context).await.unwrap();

        let body = http.last_request().unwrap().body;
        let prompt = body["messages"][0]["content"].as_str().unwrap();
        assert!(prompt.contains("'list files'"));
        assert!(prompt.contains("`ls --bogus`"));
        assert!(prompt.contains("ls: bad option"));
    }

    // =========================================================================
    // Error mapping
    // =========================================================================

    #[tokio::test]
    async fn test_api_error_uses_provider_message() {
        let http = Arc::new(MockHttpClient::with_status(
            401,
            r#"{"type":"error","error":{"type":"authentication_error","message":"invalid x-api-key"}}"#,
        ));
        let client = BackendClient::new(anthropic(), http);

        let err = client.generate_command("anything").await.unwrap_err();

        assert_eq!(
            err,
            GenerationError::Api {
                status: 401,
                message: "invalid x-api-key".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_api_error_with_plain_body() {
        let http = Arc::new(MockHttpClient::with_status(502, "Bad Gateway\n"));
        let client = BackendClient::new(anthropic(), http);

        let err = client.generate_command("anything").await.unwrap_err();

        assert_eq!(
            err,
            GenerationError::Api {
                status: 502,
                message: "Bad Gateway".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_transport_failure_is_network_error() {
        let http = Arc::new(MockHttpClient::failing("connection refused"));
        let client = BackendClient::new(anthropic(), http);

        let err = client.generate_command("anything").await.unwrap_err();

        assert!(matches!(err, GenerationError::Network(ref m) if m.contains("connection refused")));
    }

    #[tokio::test]
    async fn test_blank_or_missing_text_is_empty_response() {
        let blank = BackendClient::new(
            anthropic(),
            Arc::new(MockHttpClient::new(r#"{"content":[{"type":"text","text":"   "}]}"#)),
        );
        assert_eq!(blank.generate_command("x").await.unwrap_err(), GenerationError::EmptyResponse);

        let none = BackendClient::new(anthropic(), Arc::new(MockHttpClient::new(r#"{"content":[]}"#)));
        assert_eq!(none.generate_command("x").await.unwrap_err(), GenerationError::EmptyResponse);
    }

    #[tokio::test]
    async fn test_non_json_success_body_is_malformed() {
        let client = BackendClient::new(anthropic(), Arc::new(MockHttpClient::new("<html>")));

        let err = client.generate_command("x").await.unwrap_err();

        assert!(matches!(err, GenerationError::MalformedResponse(_)));
    }

    // =========================================================================
    // Mock backend
    // =========================================================================

    #[tokio::test]
    async fn test_mock_backend_makes_no_http_calls() {
        let http = Arc::new(MockHttpClient::failing("should not be called"));
        let client = BackendClient::new(Backend::Mock, http.clone());

        let text = client.generate_command("list files").await.unwrap();

        assert_eq!(text, r#"{"command":"ls -la","description":"Lists all files"}"#);
        assert_eq!(http.request_count(), 0);
    }

    #[tokio::test]
    async fn test_mock_backend_changes_answer_on_retry() {
        let client = BackendClient::new(Backend::Mock, Arc::new(MockHttpClient::new("")));
        let context = FailureContext::new("false", ErrorSummary::new("exit status: 1", ""));

        let text = client.generate_command_with_context("make it fail", &context).await.unwrap();

        assert!(text.contains("echo retried"));
    }
}
