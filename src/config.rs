//! Configuration loader and validator for the repository scanner.
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

pub const DEFAULT_API_BASE: &str = "https://api.github.com/";
const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
}

/// Root configuration struct mirroring the YAML schema exactly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    pub github: Github,
    pub scan: Scan,
}

/// API access settings.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Github {
    /// Caller identity, sent as the `User-Agent` header.
    pub username: String,
    pub token: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

/// Search settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Scan {
    pub search_terms: Vec<String>,
    pub report_dir: String,
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

fn default_timeout_seconds() -> u64 {
    DEFAULT_TIMEOUT_SECONDS
}

impl std::fmt::Debug for Github {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Github")
            .field("username", &self.username)
            .field("api_base", &self.api_base)
            .field("timeout_seconds", &self.timeout_seconds)
            .finish_non_exhaustive()
    }
}

impl Config {
    /// Ensure required directories exist (creates `scan.report_dir` if missing).
    pub fn ensure_dirs(&self) -> Result<(), std::io::Error> {
        if self.scan.report_dir.trim().is_empty() {
            return Ok(());
        }
        fs::create_dir_all(&self.scan.report_dir)
    }
}

/// Load configuration from a YAML (or JSON) file and validate it.
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
    if cfg.github.username.trim().is_empty() {
        return Err(ConfigError::Invalid("github.username must be non-empty"));
    }
    if cfg.github.token.trim().is_empty() {
        return Err(ConfigError::Invalid("github.token must be non-empty"));
    }
    match Url::parse(&cfg.github.api_base) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {}
        _ => return Err(ConfigError::Invalid("github.api_base must be an http(s) URL")),
    }
    if cfg.github.timeout_seconds == 0 {
        return Err(ConfigError::Invalid("github.timeout_seconds must be > 0"));
    }

    if cfg.scan.search_terms.is_empty() {
        return Err(ConfigError::Invalid("scan.search_terms must not be empty"));
    }
    if cfg.scan.search_terms.iter().any(|t| t.is_empty()) {
        return Err(ConfigError::Invalid("scan.search_terms must not contain empty terms"));
    }
    if cfg.scan.report_dir.trim().is_empty() {
        return Err(ConfigError::Invalid("scan.report_dir must be non-empty"));
    }

    Ok(())
}

/// Returns the example YAML content.
pub fn example() -> &'static str {
    r#"github:
  username: "your-github-login"
  token: "YOUR_GITHUB_TOKEN"
  api_base: "https://api.github.com/"
  timeout_seconds: 30

scan:
  search_terms:
    - "crypto"
    - "wallet drainer"
  report_dir: "./reports"
"#
}
