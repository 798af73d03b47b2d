//! Settings for the cache and the upstream client
//!
//! Settings are read from a JSON file with a `CacheSettings` and an
//! `ApiSettings` section. Every field is optional and falls back to its
//! default, so an absent file simply means default settings.

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::cache::EntryPolicy;
use crate::data::hacker_news::DEFAULT_BASE_URL;

/// File name looked up in the XDG config directory
const SETTINGS_FILE: &str = "settings.json";

/// Errors that can occur when loading settings
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The settings file could not be read
    #[error("Failed to read settings file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The settings file is not valid JSON for `Settings`
    #[error("Failed to parse settings file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A setting is out of range
    #[error("Invalid setting: {0}")]
    Invalid(String),
}

/// Expiration settings for cached upstream data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct CacheSettings {
    /// Lifetime of every cache entry, measured from its write
    pub absolute_expiration_minutes: u64,
    /// Idle window of the ranked id list; item details never slide
    pub sliding_expiration_minutes: u64,
    /// Upper bound on the number of cached entries
    pub max_entries: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            absolute_expiration_minutes: 30,
            sliding_expiration_minutes: 15,
            max_entries: 10_000,
        }
    }
}

impl CacheSettings {
    /// Policy for the ranked id list: absolute plus sliding
    pub fn ranked_list_policy(&self) -> EntryPolicy {
        EntryPolicy::sliding(
            minutes(self.absolute_expiration_minutes),
            minutes(self.sliding_expiration_minutes),
        )
    }

    /// Policy for item detail records: absolute only
    pub fn detail_policy(&self) -> EntryPolicy {
        EntryPolicy::absolute(minutes(self.absolute_expiration_minutes))
    }
}

/// Upstream and resolution settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ApiSettings {
    /// Base URL of the listing API
    pub base_url: String,
    /// Most items resolved and returned per request
    pub max_stories: usize,
    /// Most item fetches in flight against the upstream at once
    pub max_concurrent_fetches: usize,
    /// How long a request waits for outstanding item fetches
    pub fetch_timeout_seconds: u64,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            max_stories: 200,
            max_concurrent_fetches: 16,
            fetch_timeout_seconds: 10,
        }
    }
}

impl ApiSettings {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_seconds)
    }
}

/// All settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Settings {
    pub cache_settings: CacheSettings,
    pub api_settings: ApiSettings,
}

impl Settings {
    /// Path of the settings file in the XDG config directory
    ///
    /// Uses `~/.config/topstories/settings.json` on Linux. Returns `None` if
    /// no home directory can be determined.
    pub fn default_path() -> Option<PathBuf> {
        let project_dirs = ProjectDirs::from("", "", "topstories")?;
        Some(project_dirs.config_dir().join(SETTINGS_FILE))
    }

    /// Loads settings
    ///
    /// An explicit `path` must exist and parse. Without one, the XDG settings
    /// file is used if present, otherwise defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None => match Self::default_path() {
                Some(default) if default.exists() => Self::from_file(&default),
                _ => Ok(Self::default()),
            },
        }
    }

    /// Reads and validates a settings file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let settings: Settings =
            serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        settings.validate()?;
        Ok(settings)
    }

    /// Checks that every setting is usable
    pub fn validate(&self) -> Result<(), ConfigError> {
        let cache = &self.cache_settings;
        let api = &self.api_settings;
        if cache.absolute_expiration_minutes == 0 {
            return Err(ConfigError::Invalid("AbsoluteExpirationMinutes must be at least 1".into()));
        }
        if cache.sliding_expiration_minutes == 0 {
            return Err(ConfigError::Invalid("SlidingExpirationMinutes must be at least 1".into()));
        }
        if cache.max_entries == 0 {
            return Err(ConfigError::Invalid("MaxEntries must be at least 1".into()));
        }
        if api.max_stories == 0 {
            return Err(ConfigError::Invalid("MaxStories must be at least 1".into()));
        }
        if api.max_concurrent_fetches == 0 {
            return Err(ConfigError::Invalid("MaxConcurrentFetches must be at least 1".into()));
        }
        if api.fetch_timeout_seconds == 0 {
            return Err(ConfigError::Invalid("FetchTimeoutSeconds must be at least 1".into()));
        }
        if api.base_url.trim().is_empty() {
            return Err(ConfigError::Invalid("BaseUrl must not be empty".into()));
        }
        Ok(())
    }
}

fn minutes(count: u64) -> Duration {
    Duration::from_secs(count.saturating_mul(60))
}
