//! Settings file loading and first-run scaffolding.

use crate::error::ConfigError;
use crate::types::Visibility;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_SETTINGS_PATH: &str = "settings/settings.toml";
pub const SETTINGS_PATH_ENV: &str = "CLIPTOTUBE_SETTINGS";

/// Posts scoring two or less are skipped by a freshly scaffolded install.
pub const DEFAULT_MIN_SCORE: i64 = 3;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Communities polled each cycle, in order.
    #[serde(default)]
    pub communities: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_score: Option<i64>,
    #[serde(default)]
    pub cleanup_clips: bool,
    #[serde(default = "default_comment_footer")]
    pub comment_footer: String,
    #[serde(default)]
    pub reddit: RedditAccount,
    #[serde(default)]
    pub youtube: YouTubeSettings,
    #[serde(default)]
    pub paths: PathSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditAccount {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YouTubeSettings {
    #[serde(default = "default_client_secret_path")]
    pub client_secret_path: PathBuf,
    #[serde(default = "default_token_path")]
    pub token_path: PathBuf,
    #[serde(default)]
    pub privacy: Visibility,
    #[serde(default = "default_category_id")]
    pub category_id: String,
    #[serde(default = "default_tags")]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathSettings {
    #[serde(default = "default_clips_dir")]
    pub clips_dir: PathBuf,
    #[serde(default = "default_dedup_file")]
    pub dedup_file: PathBuf,
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
}

fn default_comment_footer() -> String {
    "^^I ^^am ^^a ^^bot.".to_string()
}

fn default_user_agent() -> String {
    format!("cliptotube/{}", env!("CARGO_PKG_VERSION"))
}

fn default_client_secret_path() -> PathBuf {
    PathBuf::from("settings/client_secret.json")
}

fn default_token_path() -> PathBuf {
    PathBuf::from("settings/youtube_token.json")
}

fn default_category_id() -> String {
    // Gaming
    "20".to_string()
}

fn default_tags() -> Vec<String> {
    vec!["clip".to_string()]
}

fn default_clips_dir() -> PathBuf {
    PathBuf::from("clips")
}

fn default_dedup_file() -> PathBuf {
    PathBuf::from("settings/checked_posts.json")
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            communities: Vec::new(),
            min_score: Some(DEFAULT_MIN_SCORE),
            cleanup_clips: false,
            comment_footer: default_comment_footer(),
            reddit: RedditAccount::default(),
            youtube: YouTubeSettings::default(),
            paths: PathSettings::default(),
        }
    }
}

impl Default for RedditAccount {
    fn default() -> Self {
        Self {
            username: String::new(),
            password: String::new(),
            client_id: String::new(),
            client_secret: String::new(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for YouTubeSettings {
    fn default() -> Self {
        Self {
            client_secret_path: default_client_secret_path(),
            token_path: default_token_path(),
            privacy: Visibility::default(),
            category_id: default_category_id(),
            tags: default_tags(),
        }
    }
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            clips_dir: default_clips_dir(),
            dedup_file: default_dedup_file(),
            log_dir: default_log_dir(),
        }
    }
}

impl Settings {
    /// Resolves the settings path from the environment, falling back to the default.
    pub fn path_from_env() -> PathBuf {
        std::env::var_os(SETTINGS_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SETTINGS_PATH))
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    /// Loads the settings file, or writes a default one and returns
    /// `ConfigError::Scaffolded` when none exists yet.
    pub fn load_or_scaffold(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            let rendered = toml::to_string_pretty(&Settings::default())?;
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent).map_err(|e| ConfigError::InvalidValue {
                    field: "settings path".to_string(),
                    value: format!("{}: {}", parent.display(), e),
                })?;
            }
            fs::write(path, rendered).map_err(|e| ConfigError::InvalidValue {
                field: "settings path".to_string(),
                value: format!("{}: {}", path.display(), e),
            })?;
            return Err(ConfigError::Scaffolded {
                path: path.display().to_string(),
            });
        }

        let contents = fs::read_to_string(path).map_err(|e| ConfigError::InvalidValue {
            field: "settings path".to_string(),
            value: format!("{}: {}", path.display(), e),
        })?;
        let settings = Self::from_toml_str(&contents)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.communities.is_empty() {
            return Err(ConfigError::ValidationFailed {
                reason: "no communities configured".to_string(),
            });
        }
        if let Some(blank) = self.communities.iter().find(|c| c.trim().is_empty()) {
            return Err(ConfigError::InvalidValue {
                field: "communities".to_string(),
                value: format!("{:?}", blank),
            });
        }

        let required = [
            ("reddit.username", &self.reddit.username),
            ("reddit.password", &self.reddit.password),
            ("reddit.client_id", &self.reddit.client_id),
            ("reddit.user_agent", &self.reddit.user_agent),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigError::MissingField {
                    field: field.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Creates the directories the session writes into.
    pub fn create_asset_dirs(&self) -> std::io::Result<()> {
        fs::create_dir_all(&self.paths.clips_dir)?;
        fs::create_dir_all(self.paths.log_dir.join("errors"))?;
        if let Some(parent) = self
            .paths
            .dedup_file
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
        {
            fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}
