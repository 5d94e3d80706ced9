//! Configuration loader and validator for the daily briefing job.
use chrono::Weekday;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@,]+@[^\s@,]+$").expect("valid email regex"));

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
}

/// Root configuration struct mirroring the YAML schema.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    pub app: App,
    pub gemini: Gemini,
    pub google: Google,
    pub email: Email,
    #[serde(default)]
    pub archive: Archive,
}

/// App-level settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct App {
    pub data_dir: String,
    #[serde(default = "default_http_timeout")]
    pub http_timeout_seconds: u64,
}

/// Generative-language API settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Gemini {
    pub api_key: String,
    #[serde(default = "default_gemini_base")]
    pub base_url: String,
    /// Tried in order until one answers with a success status.
    pub models: Vec<String>,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

/// Google Workspace settings shared by the Docs, Gmail, Calendar and Drive clients.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Google {
    pub access_token: String,
    #[serde(default = "default_calendar_id")]
    pub calendar_id: String,
    #[serde(default)]
    pub endpoints: Endpoints,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Endpoints {
    pub docs: String,
    pub drive: String,
    pub gmail: String,
    pub calendar: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            docs: "https://docs.googleapis.com/".into(),
            drive: "https://www.googleapis.com/".into(),
            gmail: "https://gmail.googleapis.com/".into(),
            calendar: "https://www.googleapis.com/".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Email {
    pub recipients: Vec<String>,
}

/// Weekly archive sweep settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Archive {
    pub title_prefix: String,
    pub folder_prefix: String,
    pub window_days: u32,
    /// Day of week the job sweeps on, e.g. "Sat" or "saturday".
    pub weekday: String,
}

impl Default for Archive {
    fn default() -> Self {
        Self {
            title_prefix: "AI Strategic Briefing -".into(),
            folder_prefix: "AI Archive -".into(),
            window_days: 7,
            weekday: "Sat".into(),
        }
    }
}

fn default_http_timeout() -> u64 {
    60
}

fn default_gemini_base() -> String {
    "https://generativelanguage.googleapis.com/".into()
}

fn default_temperature() -> f32 {
    0.2
}

fn default_calendar_id() -> String {
    "primary".into()
}

impl Config {
    /// Ensure required directories exist (creates `app.data_dir` if missing).
    pub fn ensure_dirs(&self) -> Result<(), std::io::Error> {
        if self.app.data_dir.trim().is_empty() {
            return Ok(());
        }
        fs::create_dir_all(self.app.resolved_data_dir())
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.app.http_timeout_seconds)
    }
}

impl App {
    /// `data_dir` with a leading `~/` expanded to `$HOME`.
    pub fn resolved_data_dir(&self) -> String {
        match self.data_dir.strip_prefix("~/") {
            Some(rest) => match std::env::var("HOME") {
                Ok(home) => format!("{}/{}", home.trim_end_matches('/'), rest),
                Err(_) => self.data_dir.clone(),
            },
            None => self.data_dir.clone(),
        }
    }
}

impl Archive {
    pub fn archive_weekday(&self) -> Option<Weekday> {
        self.weekday.trim().parse::<Weekday>().ok()
    }

    pub fn window(&self) -> chrono::Duration {
        chrono::Duration::days(i64::from(self.window_days))
    }
}

/// Load configuration from a YAML file and validate it.
/// - If `path` is None, uses `config.yaml` in the current working directory.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or_else(|| Path::new("config.yaml"));
    let content = fs::read_to_string(path)?;
    let cfg: Config = serde_yaml::from_str(&content)?;
    validate(&cfg)?;
    Ok(cfg)
}

/// Validate a configuration instance.
pub fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.app.data_dir.trim().is_empty() {
        return Err(ConfigError::Invalid("app.data_dir must be non-empty"));
    }
    if cfg.app.http_timeout_seconds == 0 {
        return Err(ConfigError::Invalid("app.http_timeout_seconds must be > 0"));
    }

    if cfg.gemini.api_key.trim().is_empty() {
        return Err(ConfigError::Invalid("gemini.api_key must be non-empty"));
    }
    if cfg.gemini.base_url.trim().is_empty() {
        return Err(ConfigError::Invalid("gemini.base_url must be non-empty"));
    }
    if cfg.gemini.models.is_empty() {
        return Err(ConfigError::Invalid("gemini.models must list at least one model"));
    }
    if cfg.gemini.models.iter().any(|m| m.trim().is_empty()) {
        return Err(ConfigError::Invalid("gemini.models entries must be non-empty"));
    }
    if !(cfg.gemini.temperature >= 0.0) {
        return Err(ConfigError::Invalid("gemini.temperature must be >= 0"));
    }

    if cfg.google.access_token.trim().is_empty() {
        return Err(ConfigError::Invalid("google.access_token must be non-empty"));
    }
    if cfg.google.calendar_id.trim().is_empty() {
        return Err(ConfigError::Invalid("google.calendar_id must be non-empty"));
    }

    if cfg.email.recipients.is_empty() {
        return Err(ConfigError::Invalid("email.recipients must list at least one address"));
    }
    if !cfg.email.recipients.iter().all(|r| EMAIL_RE.is_match(r.trim())) {
        return Err(ConfigError::Invalid("email.recipients entries must be email addresses"));
    }

    if cfg.archive.title_prefix.trim().is_empty() {
        return Err(ConfigError::Invalid("archive.title_prefix must be non-empty"));
    }
    if cfg.archive.folder_prefix.trim().is_empty() {
        return Err(ConfigError::Invalid("archive.folder_prefix must be non-empty"));
    }
    if cfg.archive.window_days == 0 {
        return Err(ConfigError::Invalid("archive.window_days must be > 0"));
    }
    if cfg.archive.archive_weekday().is_none() {
        return Err(ConfigError::Invalid("archive.weekday must name a day of the week"));
    }

    Ok(())
}

/// Returns the example YAML content.
pub fn example() -> &'static str {
    r#"app:
  data_dir: "./data"
  http_timeout_seconds: 60

gemini:
  api_key: "YOUR_API_KEY"
  base_url: "https://generativelanguage.googleapis.com/"
  models:
    - "gemini-3-flash-preview"
    - "gemini-2.5-flash"
  temperature: 0.2

google:
  access_token: "YOUR_OAUTH_ACCESS_TOKEN"
  calendar_id: "primary"

email:
  recipients:
    - "first@example.com"
    - "second@example.com"

archive:
  title_prefix: "AI Strategic Briefing -"
  folder_prefix: "AI Archive -"
  window_days: 7
  weekday: "Sat"
"#
}
