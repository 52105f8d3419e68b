use std::env;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use log::{info, warn};
use serde::{Deserialize, Serialize};

/// Maximum characters kept from a fetched page.
pub const DEFAULT_FETCH_MAX_CHARS: usize = 20_000;

/// Maximum characters embedded into the analysis prompt.
pub const DEFAULT_ANALYSIS_MAX_CHARS: usize = 15_000;

/// Environment variable holding the completion service credential.
pub const API_KEY_VAR: &str = "GEMINI_API_KEY";

/// Main configuration structure for disinfo_detector
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Completion service settings
    #[serde(default)]
    pub provider: ProviderConfig,

    /// URL fetching settings
    #[serde(default)]
    pub acquisition: AcquisitionConfig,

    /// Prompt and analysis settings
    #[serde(default)]
    pub analysis: AnalysisConfig,

    /// UI display configuration
    #[serde(default)]
    pub ui: UIConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Model to use
    #[serde(default = "default_model")]
    pub model: String,

    /// Base URL of the OpenAI-compatible endpoint
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Temperature setting
    pub temperature: Option<f32>,

    /// Upper bound on generated tokens
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcquisitionConfig {
    /// Connect + read timeout for the page fetch
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Characters kept from the extracted page text
    #[serde(default = "default_fetch_max_chars")]
    pub max_chars: usize,

    /// User-Agent header sent with the fetch
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Characters of input embedded into the prompt
    #[serde(default = "default_analysis_max_chars")]
    pub max_chars: usize,

    /// Mode used when none is given on the command line
    #[serde(default = "default_mode")]
    pub default_mode: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UIConfig {
    /// Enable colorful output
    #[serde(default = "default_colorful")]
    pub colorful: bool,

    /// Show a spinner while fetching and analyzing
    #[serde(default = "default_progress_bars")]
    pub progress_bars: bool,

    /// File the report is written to
    #[serde(default = "default_report_file")]
    pub report_file: String,
}

// Default value functions
fn default_model() -> String { "gemini-1.5-flash".to_string() }
fn default_base_url() -> String { "https://generativelanguage.googleapis.com/v1beta/openai".to_string() }
fn default_max_output_tokens() -> usize { 8192 }
fn default_timeout_secs() -> u64 { 10 }
fn default_fetch_max_chars() -> usize { DEFAULT_FETCH_MAX_CHARS }
fn default_user_agent() -> String { concat!("disinfo_detector/", env!("CARGO_PKG_VERSION")).to_string() }
fn default_analysis_max_chars() -> usize { DEFAULT_ANALYSIS_MAX_CHARS }
fn default_mode() -> String { "Contextual Analysis".to_string() }
fn default_colorful() -> bool { true }
fn default_progress_bars() -> bool { true }
fn default_report_file() -> String { crate::report::DEFAULT_FILE_NAME.to_string() }

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            base_url: default_base_url(),
            temperature: None,
            max_output_tokens: default_max_output_tokens(),
        }
    }
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            max_chars: default_fetch_max_chars(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            max_chars: default_analysis_max_chars(),
            default_mode: default_mode(),
        }
    }
}

impl Default for UIConfig {
    fn default() -> Self {
        Self {
            colorful: default_colorful(),
            progress_bars: default_progress_bars(),
            report_file: default_report_file(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))
    }

    /// Load configuration from command line argument or default locations
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        if let Some(path) = config_path {
            return Self::from_file(path);
        }

        let default_paths = [
            "disinfo_detector.toml",
            ".disinfo_detector.toml",
            "~/.config/disinfo_detector/config.toml",
        ];

        for path in default_paths {
            let expanded_path = shellexpand::tilde(path);
            if Path::new(expanded_path.as_ref()).exists() {
                match Self::from_file(expanded_path.as_ref()) {
                    Ok(config) => {
                        info!("Loaded configuration from {}", expanded_path);
                        return Ok(config);
                    }
                    Err(e) => warn!("Failed to load config from {}: {:#}", path, e),
                }
            }
        }

        Ok(Self::default())
    }

    /// Merge with command-line arguments (CLI args take precedence)
    pub fn merge_with_args(&mut self, headless: bool) {
        if headless {
            self.ui.colorful = false;
            self.ui.progress_bars = false;
        }
    }
}

/// Credential for the completion service, read once at startup.
#[derive(Clone, Default)]
pub struct Credentials {
    api_key: Option<String>,
}

impl Credentials {
    pub fn new(api_key: Option<String>) -> Self {
        let api_key = api_key
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty());
        Self { api_key }
    }

    /// Read the API key from the process environment. `.env` must already be loaded.
    pub fn from_env() -> Self {
        Self::new(env::var(API_KEY_VAR).ok())
    }

    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}
