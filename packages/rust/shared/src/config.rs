//! Application configuration for changedoc.
//!
//! User config lives at `~/.changedoc/changedoc.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ChangeDocError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "changedoc.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".changedoc";

// ---------------------------------------------------------------------------
// Config structs (matching changedoc.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Advisory provider settings.
    #[serde(default)]
    pub advisor: AdvisorConfig,

    /// Decision engine settings.
    #[serde(default)]
    pub planner: PlannerConfig,

    /// Wiki publishing settings.
    #[serde(default)]
    pub wiki: WikiConfig,
}

/// Supported advisory providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[serde(rename = "openai")]
    OpenAi,
    #[default]
    Anthropic,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Anthropic => "anthropic",
        }
    }
}

impl FromStr for ProviderKind {
    type Err = ChangeDocError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "anthropic" => Ok(Self::Anthropic),
            other => Err(ChangeDocError::config(format!(
                "unsupported AI provider '{other}': expected 'openai' or 'anthropic'"
            ))),
        }
    }
}

/// `[advisor]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvisorConfig {
    /// Which provider to call.
    #[serde(default)]
    pub provider: ProviderKind,

    /// Env vars checked in order for the API key (never store the key itself).
    #[serde(default = "default_api_key_envs")]
    pub api_key_envs: Vec<String>,

    /// Model used with the OpenAI provider.
    #[serde(default = "default_openai_model")]
    pub openai_model: String,

    /// Model used with the Anthropic provider.
    #[serde(default = "default_anthropic_model")]
    pub anthropic_model: String,

    /// Completion token limit per call.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Per-request timeout. The engine itself imposes none.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Override for the provider endpoint URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

impl Default for AdvisorConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::default(),
            api_key_envs: default_api_key_envs(),
            openai_model: default_openai_model(),
            anthropic_model: default_anthropic_model(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            timeout_secs: default_timeout_secs(),
            base_url: None,
        }
    }
}

impl AdvisorConfig {
    /// Model name for the configured provider.
    pub fn model(&self) -> &str {
        match self.provider {
            ProviderKind::OpenAi => &self.openai_model,
            ProviderKind::Anthropic => &self.anthropic_model,
        }
    }
}

fn default_api_key_envs() -> Vec<String> {
    vec!["AI_API_KEY".into(), "ANTHROPIC_API_KEY".into()]
}
fn default_openai_model() -> String {
    "gpt-4".into()
}
fn default_anthropic_model() -> String {
    "claude-3-sonnet-20240229".into()
}
fn default_max_tokens() -> u32 {
    3000
}
fn default_temperature() -> f32 {
    0.2
}
fn default_timeout_secs() -> u64 {
    120
}

/// How the Strategy Planner decides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlannerMode {
    /// Snapshot-aware planning through the advisor.
    #[default]
    Enhanced,
    /// Always create one new page per commit; no planning call.
    Simple,
}

/// `[planner]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannerConfig {
    #[serde(default)]
    pub mode: PlannerMode,

    /// Run the RELEVANT / NOT_RELEVANT pre-filter before planning.
    #[serde(default = "default_true")]
    pub relevance_check: bool,

    /// Characters of page content shown per page in the planning prompt.
    #[serde(default = "default_preview_chars")]
    pub preview_chars: usize,

    /// Characters of diff sent with the planning prompt.
    #[serde(default = "default_diff_budget")]
    pub diff_budget: usize,

    /// Characters of diff sent with the relevance prompt.
    #[serde(default = "default_relevance_diff_budget")]
    pub relevance_diff_budget: usize,

    /// Characters of diff sent with the documentation prompt.
    #[serde(default = "default_body_diff_budget")]
    pub body_diff_budget: usize,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            mode: PlannerMode::default(),
            relevance_check: true,
            preview_chars: default_preview_chars(),
            diff_budget: default_diff_budget(),
            relevance_diff_budget: default_relevance_diff_budget(),
            body_diff_budget: default_body_diff_budget(),
        }
    }
}

fn default_true() -> bool {
    true
}
fn default_preview_chars() -> usize {
    200
}
fn default_diff_budget() -> usize {
    12_000
}
fn default_relevance_diff_budget() -> usize {
    8_000
}
fn default_body_diff_budget() -> usize {
    60_000
}

/// `[wiki]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WikiConfig {
    /// Name of the env var holding the GitHub token.
    #[serde(default = "default_token_env")]
    pub token_env: String,

    /// Branch pushed to after each page write.
    #[serde(default = "default_branch")]
    pub branch: String,

    /// Commit author name for wiki commits.
    #[serde(default = "default_author_name")]
    pub author_name: String,

    /// Commit author email for wiki commits.
    #[serde(default = "default_author_email")]
    pub author_email: String,

    /// Where the wiki is cloned. Defaults to `<tmp>/changedoc-wiki`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clone_dir: Option<String>,
}

impl Default for WikiConfig {
    fn default() -> Self {
        Self {
            token_env: default_token_env(),
            branch: default_branch(),
            author_name: default_author_name(),
            author_email: default_author_email(),
            clone_dir: None,
        }
    }
}

impl WikiConfig {
    /// Resolved clone directory.
    pub fn clone_dir(&self) -> PathBuf {
        match &self.clone_dir {
            Some(dir) => PathBuf::from(dir),
            None => std::env::temp_dir().join("changedoc-wiki"),
        }
    }

    /// The wiki token from the environment, if set and non-empty.
    pub fn token(&self) -> Option<String> {
        std::env::var(&self.token_env)
            .ok()
            .filter(|v| !v.is_empty())
    }
}

fn default_token_env() -> String {
    "GITHUB_TOKEN".into()
}
fn default_branch() -> String {
    "master".into()
}
fn default_author_name() -> String {
    "AI Documentation Bot".into()
}
fn default_author_email() -> String {
    "noreply@github.com".into()
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.changedoc/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| ChangeDocError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.changedoc/changedoc.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| ChangeDocError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| ChangeDocError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| ChangeDocError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| ChangeDocError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| ChangeDocError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Resolve the advisory API key from the first non-empty configured env var.
pub fn resolve_api_key(config: &AdvisorConfig) -> Result<String> {
    config
        .api_key_envs
        .iter()
        .find_map(|name| std::env::var(name).ok().filter(|v| !v.is_empty()))
        .ok_or_else(|| {
            ChangeDocError::config(format!(
                "AI API key not found. Set one of: {}",
                config.api_key_envs.join(", ")
            ))
        })
}

/// Check that an advisory API key is available.
pub fn validate_api_key(config: &AppConfig) -> Result<()> {
    resolve_api_key(&config.advisor).map(|_| ())
}
