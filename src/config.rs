use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::digest::DigestRules;
use crate::model::issue::IssueState;

#[derive(Debug, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub github: GitHubConfig,
    #[serde(default)]
    pub digest: DigestConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct GitHubConfig {
    /// `OWNER/REPO`; the command line wins when both are given.
    pub repo: Option<String>,
    pub token: Option<String>,
    pub api_base: String,
    pub timeout_secs: u64,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            repo: None,
            token: None,
            api_base: "https://api.github.com".into(),
            timeout_secs: 30,
        }
    }
}

impl GitHubConfig {
    /// `GITHUB_TOKEN` takes precedence over the token in the file.
    pub fn resolved_token(&self) -> Option<String> {
        resolve_token(std::env::var("GITHUB_TOKEN").ok(), self.token.as_deref())
    }
}

fn resolve_token(env_value: Option<String>, file_value: Option<&str>) -> Option<String> {
    let non_empty = |t: &String| !t.trim().is_empty();
    env_value
        .filter(non_empty)
        .or_else(|| file_value.map(String::from).filter(non_empty))
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DigestConfig {
    pub label: String,
    pub state: IssueState,
    pub recording_marker: String,
    pub notes_marker: String,
    pub due_soon_hours: i64,
}

impl Default for DigestConfig {
    fn default() -> Self {
        let rules = DigestRules::default();
        Self {
            label: rules.label,
            state: rules.state,
            recording_marker: rules.recording_marker,
            notes_marker: rules.notes_marker,
            due_soon_hours: rules.due_soon_window.num_hours(),
        }
    }
}

impl DigestConfig {
    pub fn to_rules(&self) -> DigestRules {
        DigestRules {
            label: self.label.clone(),
            state: self.state,
            recording_marker: self.recording_marker.clone(),
            notes_marker: self.notes_marker.clone(),
            due_soon_window: chrono::Duration::hours(self.due_soon_hours.max(0)),
        }
    }
}

fn config_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".deepdive")
        .join("config.toml")
}

pub fn load_config() -> Result<AppConfig> {
    load_config_from(&config_path())
}

pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "no config file, using defaults");
        return Ok(AppConfig::default());
    }
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config from {}", path.display()))?;
    let config: AppConfig =
        toml::from_str(&contents).with_context(|| "Failed to parse config.toml")?;
    Ok(config)
}
