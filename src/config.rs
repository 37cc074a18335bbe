use crate::providers::{EnvProvider, SystemEnvProvider};
use anyhow::{anyhow, Context, Result};
use dirs::home_dir;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info, warn};

/// Environment variable that switches generation to the offline mock backend.
pub const MOCK_ENV_VAR: &str = "SUGGEST_USE_MOCK";

/// The interchangeable generation services, in selection priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Gemini,
    #[serde(rename = "openai")]
    OpenAi,
    Anthropic,
}

impl ProviderKind {
    /// Priority order used by backend selection.
    pub const ALL: [ProviderKind; 3] = [ProviderKind::Gemini, ProviderKind::OpenAi, ProviderKind::Anthropic];

    pub fn env_var(self) -> &'static str {
        match self {
            ProviderKind::Gemini => "GEMINI_API_KEY",
            ProviderKind::OpenAi => "OPENAI_API_KEY",
            ProviderKind::Anthropic => "ANTHROPIC_API_KEY",
        }
    }

    pub fn default_model(self) -> &'static str {
        match self {
            ProviderKind::Gemini => "gemini-2.5-flash",
            ProviderKind::OpenAi => "gpt-4.1-mini-2025-04-14",
            ProviderKind::Anthropic => "claude-3-5-haiku-latest",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProviderKind::Gemini => "gemini",
            ProviderKind::OpenAi => "openai",
            ProviderKind::Anthropic => "anthropic",
        };
        f.write_str(name)
    }
}

impl FromStr for ProviderKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gemini" => Ok(ProviderKind::Gemini),
            "openai" => Ok(ProviderKind::OpenAi),
            "anthropic" => Ok(ProviderKind::Anthropic),
            other => Err(anyhow!("Unknown provider '{}'. Expected gemini, openai or anthropic", other)),
        }
    }
}

/// Per-backend model overrides from the `[models]` table.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct ModelOverrides {
    #[serde(default)]
    pub gemini: Option<String>,
    #[serde(default)]
    pub openai: Option<String>,
    #[serde(default)]
    pub anthropic: Option<String>,
}

/// Where Copy puts the command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClipboardBackend {
    /// System clipboard, plus OSC 52 where the system copy would not outlive the process
    #[default]
    Auto,
    System,
    Osc52,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub gemini_api_key: Option<String>,
    #[serde(default)]
    pub openai_api_key: Option<String>,
    #[serde(default)]
    pub anthropic_api_key: Option<String>,
    #[serde(default)]
    pub models: ModelOverrides,
    #[serde(default)]
    pub use_mock: bool,
    #[serde(default = "default_color")]
    pub color: bool,
    #[serde(default)]
    pub clipboard: ClipboardBackend,
}

fn default_color() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            gemini_api_key: None,
            openai_api_key: None,
            anthropic_api_key: None,
            models: ModelOverrides::default(),
            use_mock: false,
            color: true,
            clipboard: ClipboardBackend::Auto,
        }
    }
}

impl Config {
    /// Load configuration from file and environment variables, or create default
    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;
        Self::load_with_env(&config_path, &SystemEnvProvider)
    }

    /// Load from an explicit path with an injected environment.
    ///
    /// A missing or unreadable file falls back to defaults; environment
    /// variables always override whatever the file says.
    pub fn load_with_env(config_path: &Path, env: &dyn EnvProvider) -> Result<Self> {
        let mut config = match Self::read_file(config_path) {
            Ok(Some(config)) => config,
            Ok(None) => {
                debug!("No config file at {}, using defaults", config_path.display());
                Self::default()
            }
            Err(e) => {
                warn!("Ignoring config file {}: {:#}", config_path.display(), e);
                Self::default()
            }
        };

        config.apply_env(env);
        Ok(config)
    }

    fn apply_env(&mut self, env: &dyn EnvProvider) {
        for kind in ProviderKind::ALL {
            if let Some(key) = env.var(kind.env_var()) {
                *self.api_key_slot(kind) = Some(key);
            }
        }

        if env.is_set(MOCK_ENV_VAR) {
            self.use_mock = true;
        }

        // https://no-color.org: any value disables styling
        if env.is_set("NO_COLOR") {
            self.color = false;
        }
    }

    /// Reads the config file. `Ok(None)` when there is no file; an error when
    /// it exists but cannot be read or parsed.
    pub fn read_file(config_path: &Path) -> Result<Option<Self>> {
        if !config_path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(config_path)
            .with_context(|| format!("reading {}", config_path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("parsing {}", config_path.display()))?;
        info!("Loaded config from: {}", config_path.display());
        Ok(Some(config))
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(config_path, content)?;
        info!("Saved config to: {}", config_path.display());
        Ok(())
    }

    pub fn get_config_path() -> Result<PathBuf> {
        Ok(Self::get_config_dir()?.join("config.toml"))
    }

    pub fn get_config_dir() -> Result<PathBuf> {
        let home = home_dir().ok_or_else(|| anyhow!("Could not find home directory"))?;
        Ok(home.join(".suggest"))
    }

    /// Set API key for one provider and save it to the config file.
    ///
    /// Only the file contents are written back; keys that came from the
    /// environment are not persisted.
    pub fn set_api_key(kind: ProviderKind, api_key: String) -> Result<()> {
        let config_path = Self::get_config_path()?;
        Self::set_api_key_at(&config_path, kind, api_key)
    }

    pub fn set_api_key_at(config_path: &Path, kind: ProviderKind, api_key: String) -> Result<()> {
        // A malformed file is reported rather than overwritten
        let mut config = Self::read_file(config_path)?.unwrap_or_default();
        *config.api_key_slot(kind) = Some(api_key);
        config.save_to(config_path)?;
        info!("API key for {} saved to config file", kind);
        Ok(())
    }

    fn api_key_slot(&mut self, kind: ProviderKind) -> &mut Option<String> {
        match kind {
            ProviderKind::Gemini => &mut self.gemini_api_key,
            ProviderKind::OpenAi => &mut self.openai_api_key,
            ProviderKind::Anthropic => &mut self.anthropic_api_key,
        }
    }

    /// Get the API key for a provider, ignoring blank values.
    pub fn api_key(&self, kind: ProviderKind) -> Option<&str> {
        let key = match kind {
            ProviderKind::Gemini => self.gemini_api_key.as_deref(),
            ProviderKind::OpenAi => self.openai_api_key.as_deref(),
            ProviderKind::Anthropic => self.anthropic_api_key.as_deref(),
        };
        key.filter(|k| !k.trim().is_empty())
    }

    pub fn model(&self, kind: ProviderKind) -> &str {
        let model = match kind {
            ProviderKind::Gemini => self.models.gemini.as_deref(),
            ProviderKind::OpenAi => self.models.openai.as_deref(),
            ProviderKind::Anthropic => self.models.anthropic.as_deref(),
        };
        model
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| kind.default_model())
    }

    pub fn is_mock_mode(&self) -> bool {
        self.use_mock
    }

    pub fn show_config_info(&self) -> Result<()> {
        let config_path = Self::get_config_path()?;
        println!("Configuration file: {}", config_path.display());
        println!(
            "Status: {}",
            if config_path.exists() { "Found" } else { "Not found (using defaults)" }
        );

        for kind in ProviderKind::ALL {
            println!(
                "{} API key: {} (model: {})",
                kind,
                if self.api_key(kind).is_some() { "Set" } else { "Not set" },
                self.model(kind)
            );
        }
        println!("Mock mode: {}", self.use_mock);
        println!("Clipboard backend: {:?}", self.clipboard);

        println!("\nTo set an API key:");
        println!("  suggest --set-api-key <your-key> --provider <gemini|openai|anthropic>");
        println!("\nOr set one of the environment variables:");
        println!("  export GEMINI_API_KEY=<your-key>");
        println!("  export OPENAI_API_KEY=<your-key>");
        println!("  export ANTHROPIC_API_KEY=<your-key>");

        Ok(())
    }
}
