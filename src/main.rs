use anyhow::Result;
use clap::{Arg, ArgAction, Command};
use std::io::{self, IsTerminal};
use std::process::ExitCode;
use std::sync::Arc;
use suggest::{
    choice_menu::{ChoicePrompt, InteractiveMenu, LineMenu},
    clipboard,
    config::{Config, ProviderKind},
    error::GenerationError,
    executor::Executor,
    llm_generator::LlmGenerator,
    orchestrator::RetryOrchestrator,
    spinner::{BusyIndicator, NoopIndicator, Spinner},
    style::Theme,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn cli() -> Command {
    Command::new("suggest")
        .about("Turn a plain-language task into a shell command")
        .long_about(
            "suggest asks an LLM for a shell command that does what you describe, \
             lets you run or copy it, and proposes a corrected command when it fails",
        )
        .arg(
            Arg::new("description")
                .help("What you want to do, in plain language")
                .num_args(1..)
                .required_unless_present_any(["config", "set-api-key"]),
        )
        .arg(
            Arg::new("set-api-key")
                .long("set-api-key")
                .help("Save an API key to the config file")
                .value_name("API_KEY")
                .num_args(1)
                .requires("provider"),
        )
        .arg(
            Arg::new("provider")
                .long("provider")
                .help("Provider the API key belongs to")
                .value_parser(["gemini", "openai", "anthropic"])
                .num_args(1),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .help("Show configuration information")
                .action(ArgAction::SetTrue),
        )
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    match run().await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            error!("Fatal: {:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<u8> {
    let matches = cli().get_matches();

    // Handle configuration commands
    if let Some(api_key) = matches.get_one::<String>("set-api-key") {
        let provider: ProviderKind = matches
            .get_one::<String>("provider")
            .map(String::as_str)
            .unwrap_or_default()
            .parse()?;
        Config::set_api_key(provider, api_key.clone())?;
        println!("API key for {} saved successfully", provider);
        return Ok(0);
    }

    let config = Config::load()?;

    if matches.get_flag("config") {
        config.show_config_info()?;
        return Ok(0);
    }

    let description = matches
        .get_many::<String>("description")
        .unwrap_or_default()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(" ");

    if description.trim().is_empty() {
        eprintln!("No description provided. Use 'suggest --help' for usage information.");
        return Ok(1);
    }

    let theme = Theme::new(config.color && io::stdout().is_terminal());
    let copy_target = clipboard::from_backend(config.clipboard);
    let generator = LlmGenerator::new(config);

    match generator.selected_backend() {
        Some(backend) => info!("Using {} backend", backend.name()),
        None => {
            eprintln!("{}", theme.error(&format!("Error: {}", GenerationError::NoProviderConfigured)));
            return Ok(1);
        }
    }

    let menu: Box<dyn ChoicePrompt> = if io::stdin().is_terminal() {
        Box::new(InteractiveMenu::new(theme.clone()))
    } else {
        Box::new(LineMenu::new(io::stdin().lock(), io::stdout(), theme.clone()))
    };

    let indicator: Box<dyn BusyIndicator> = if io::stderr().is_terminal() {
        Box::new(Spinner::new(theme.clone()).with_message("Thinking..."))
    } else {
        Box::new(NoopIndicator)
    };

    let mut session = RetryOrchestrator::new(
        Arc::new(generator),
        menu,
        Executor::new(theme.clone()),
        copy_target,
        indicator,
        theme,
    );

    // Dropping the session on Ctrl-C restores the terminal (spinner cursor)
    let outcome = tokio::select! {
        biased;
        outcome = session.run(&description) => outcome?,
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted");
            drop(session);
            eprintln!();
            return Ok(130);
        }
    };
    Ok(outcome.exit_code())
}
