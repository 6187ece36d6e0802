use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::decision::Thresholds;

/// Top-level configuration loaded from `~/.prwatch/config.toml`.
///
/// **Security**: This struct NEVER stores API tokens. The GitHub token is
/// read from the environment variable named by `github.token_env`, from the
/// command line, or from the local `gh` CLI at startup.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub github: GitHubConfig,
    #[serde(default)]
    pub poll: PollConfig,
    #[serde(default)]
    pub markers: MarkerConfig,
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub review: ReviewConfig,
}

impl Config {
    /// Load config from `~/.prwatch/config.toml`, falling back to
    /// defaults when the file does not exist.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(path)
        } else {
            let cfg = Config::default();
            cfg.validate()?;
            Ok(cfg)
        }
    }

    /// Load from a specific path.
    pub fn load_from(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let text = std::fs::read_to_string(&path)
            .map_err(|e| ConfigError::Io(format!("{}: {e}", path.display())))?;
        let cfg: Config = toml::from_str(&text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Serialize config to TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        self.validate()?;
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Semantic validation for settings that are not fully expressible via type checks.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.github.validate()?;
        self.markers.validate()?;
        self.agent.validate()?;
        self.review.validate()?;
        Ok(())
    }

    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".prwatch")
            .join("config.toml")
    }
}

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("io: {0}")]
    Io(String),
    #[error("parse: {0}")]
    Parse(String),
    #[error("validation: {0}")]
    Validation(String),
}

// ---------------------------------------------------------------------------
// Section structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".into()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubConfig {
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Name of the env var holding the token (not the token itself).
    #[serde(default = "default_token_env")]
    pub token_env: String,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            token_env: default_token_env(),
            per_page: default_per_page(),
            user_agent: default_user_agent(),
        }
    }
}

impl GitHubConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.api_url.trim().is_empty() {
            return Err(ConfigError::Validation("github.api_url must not be empty".into()));
        }
        if !(1..=100).contains(&self.per_page) {
            return Err(ConfigError::Validation(format!(
                "github.per_page must be within 1..=100, got {}",
                self.per_page
            )));
        }
        Ok(())
    }
}

fn default_api_url() -> String {
    "https://api.github.com".into()
}
fn default_token_env() -> String {
    "GITHUB_TOKEN".into()
}
fn default_per_page() -> u32 {
    100
}
fn default_user_agent() -> String {
    concat!("prwatch/", env!("CARGO_PKG_VERSION")).into()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollConfig {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
        }
    }
}

impl PollConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

fn default_interval_secs() -> u64 {
    30
}

/// Timeline event kinds that bracket a unit of the external worker's task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkerConfig {
    #[serde(default = "default_started")]
    pub started: String,
    #[serde(default = "default_finished")]
    pub finished: String,
    /// How the worker is addressed in fix requests.
    #[serde(default = "default_worker_mention")]
    pub worker_mention: String,
}

impl Default for MarkerConfig {
    fn default() -> Self {
        Self {
            started: default_started(),
            finished: default_finished(),
            worker_mention: default_worker_mention(),
        }
    }
}

impl MarkerConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.started.is_empty() || self.finished.is_empty() {
            return Err(ConfigError::Validation(
                "markers.started and markers.finished must be non-empty".into(),
            ));
        }
        if self.started == self.finished {
            return Err(ConfigError::Validation(
                "markers.started and markers.finished must differ".into(),
            ));
        }
        Ok(())
    }
}

fn default_started() -> String {
    "copilot_work_started".into()
}
fn default_finished() -> String {
    "copilot_work_finished".into()
}
fn default_worker_mention() -> String {
    "@copilot".into()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default = "default_agent_command")]
    pub command: String,
    #[serde(default = "default_prompt_flag")]
    pub prompt_flag: String,
    #[serde(default = "default_auto_approve_flag")]
    pub auto_approve_flag: String,
    /// Pass `auto_approve_flag` to the agent. Off unless asked for.
    #[serde(default)]
    pub auto_approve: bool,
    /// Hard limit for one agent run; `0` disables the limit.
    #[serde(default = "default_agent_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub extra_args: Vec<String>,
    /// Directory the agent runs in, typically a checkout of the repository.
    /// Unset means a fresh scratch directory per run.
    #[serde(default)]
    pub workdir: Option<PathBuf>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            command: default_agent_command(),
            prompt_flag: default_prompt_flag(),
            auto_approve_flag: default_auto_approve_flag(),
            auto_approve: false,
            timeout_secs: default_agent_timeout_secs(),
            extra_args: Vec::new(),
            workdir: None,
        }
    }
}

impl AgentConfig {
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.command.trim().is_empty() {
            return Err(ConfigError::Validation("agent.command must not be empty".into()));
        }
        Ok(())
    }
}

fn default_agent_command() -> String {
    "claude".into()
}
fn default_prompt_flag() -> String {
    "-p".into()
}
fn default_auto_approve_flag() -> String {
    "--dangerously-skip-permissions".into()
}
fn default_agent_timeout_secs() -> u64 {
    1800
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewConfig {
    #[serde(default = "default_continue_threshold")]
    pub continue_threshold: f64,
    #[serde(default = "default_fix_threshold")]
    pub fix_threshold: f64,
    /// How many of the most recent comments/commits go into the prompt.
    #[serde(default = "default_context_tail")]
    pub context_tail: usize,
    /// Diffs longer than this are cut before going into the prompt; `0`
    /// keeps the whole diff.
    #[serde(default = "default_max_diff_bytes")]
    pub max_diff_bytes: usize,
    #[serde(default)]
    pub prompt_template: Option<PathBuf>,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            continue_threshold: default_continue_threshold(),
            fix_threshold: default_fix_threshold(),
            context_tail: default_context_tail(),
            max_diff_bytes: default_max_diff_bytes(),
            prompt_template: None,
        }
    }
}

impl ReviewConfig {
    pub fn thresholds(&self) -> Thresholds {
        Thresholds {
            continue_at: self.continue_threshold,
            fix_at: self.fix_threshold,
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for (name, v) in [
            ("continue_threshold", self.continue_threshold),
            ("fix_threshold", self.fix_threshold),
        ] {
            if !(0.0..=100.0).contains(&v) {
                return Err(ConfigError::Validation(format!(
                    "review.{name} must be within 0..=100, got {v}"
                )));
            }
        }
        if self.fix_threshold > self.continue_threshold {
            return Err(ConfigError::Validation(format!(
                "review.fix_threshold ({}) must not exceed review.continue_threshold ({})",
                self.fix_threshold, self.continue_threshold
            )));
        }
        Ok(())
    }
}

fn default_continue_threshold() -> f64 {
    90.0
}
fn default_fix_threshold() -> f64 {
    70.0
}
fn default_context_tail() -> usize {
    5
}
fn default_max_diff_bytes() -> usize {
    64 * 1024
}
