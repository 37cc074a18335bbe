//! Suggest - turn a plain-language task into a shell command.
//!
//! The library holds everything the `suggest` binary wires together:
//!
//! - **Command generation** via Gemini, OpenAI or Anthropic (or an offline mock)
//! - **Response normalization** into a command plus a short description
//! - **Interactive choice** between running, copying or dropping the command
//! - **Execution** with captured output
//! - **Retry with failure context** when the command fails
//!
//! # Architecture
//!
//! - [`config`] - Configuration management (API keys, models, colour)
//! - [`providers`] - Shared dependency injection traits
//! - [`http_client`] - HTTP client abstraction
//! - [`prompt`] - Prompt text sent to the backends
//! - [`backends`] - The closed set of generation backends
//! - [`llm_generator`] - Generation gateway
//! - [`suggestion`] - Suggestion type and response normalizer
//! - [`suggestion_task`] - Background generation with a busy indicator
//! - [`spinner`] - Busy indicator
//! - [`choice_menu`] - Run / copy / retry / exit menu
//! - [`executor`] - Runs the chosen command
//! - [`execution_context`] - Failure context fed into the next generation
//! - [`clipboard`] - Clipboard access
//! - [`style`] - Terminal colours
//! - [`orchestrator`] - The generate, choose, execute, retry loop
//! - [`error`] - Error types
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use suggest::{
//!     choice_menu::InteractiveMenu, clipboard, config::Config,
//!     executor::Executor, llm_generator::LlmGenerator, orchestrator::RetryOrchestrator,
//!     spinner::Spinner, style::Theme,
//! };
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load()?;
//!     let theme = Theme::new(config.color);
//!     let copy_to = clipboard::from_backend(config.clipboard);
//!
//!     let mut session = RetryOrchestrator::new(
//!         Arc::new(LlmGenerator::new(config)),
//!         Box::new(InteractiveMenu::new(theme.clone())),
//!         Executor::new(theme.clone()),
//!         copy_to,
//!         Box::new(Spinner::new(theme.clone()).with_message("Thinking...")),
//!         theme,
//!     );
//!
//!     let outcome = session.run("list files by size").await?;
//!     std::process::exit(outcome.exit_code().into());
//! }
//! ```
//!
//! # Retrying
//!
//! When a chosen command exits non-zero, its failure reason and captured
//! stderr are sent back with the same description, asking for a different
//! approach:
//!
//! ```bash
//! suggest show disk usage of the current directory
//! # ? Run command -> fails
//! # ? Suggest new command -> a corrected command is proposed
//! ```

pub mod backends;
pub mod choice_menu;
pub mod clipboard;
pub mod config;
pub mod error;
pub mod execution_context;
pub mod executor;
pub mod http_client;
pub mod llm_generator;
pub mod orchestrator;
pub mod prompt;
pub mod providers;
pub mod spinner;
pub mod style;
pub mod suggestion;
pub mod suggestion_task;
