use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use ferry_util::errors::{FerryError, FerryResult};

/// Global user configuration loaded from `~/.ferry/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GlobalConfig {
    #[serde(default)]
    pub staging: StagingConfig,

    /// Named remote staging endpoints usable from any project.
    #[serde(default)]
    pub repositories: BTreeMap<String, String>,
}

/// Network behaviour of the staging client from `[staging]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StagingConfig {
    /// Upper bound for any single remote call.
    #[serde(default = "default_timeout_secs", rename = "timeout-secs")]
    pub timeout_secs: u64,
    /// Total attempts for retryable calls (upload, close, release).
    #[serde(default = "default_retries")]
    pub retries: u32,
    /// Delay before the first retry; doubles on each further attempt.
    #[serde(default = "default_retry_delay_ms", rename = "retry-delay-ms")]
    pub retry_delay_ms: u64,
}

impl Default for StagingConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            retries: default_retries(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

impl StagingConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_retries() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    500
}

impl GlobalConfig {
    /// Load the global configuration from `~/.ferry/config.toml`, or return defaults if the file doesn't exist.
    pub fn load() -> FerryResult<Self> {
        Self::load_from(&Self::default_path())
    }

    /// Load from an explicit path, or return defaults if it doesn't exist.
    pub fn load_from(path: &Path) -> FerryResult<Self> {
        if path.is_file() {
            let content = std::fs::read_to_string(path).map_err(|e| FerryError::Generic {
                message: format!("Failed to read global config: {e}"),
            })?;
            toml::from_str(&content).map_err(|e| FerryError::Generic {
                message: format!("Failed to parse global config: {e}"),
            })
        } else {
            Ok(Self::default())
        }
    }

    /// Returns the default path to the global config file.
    pub fn default_path() -> PathBuf {
        dirs_path().join("config.toml")
    }
}

/// Returns the path to the Ferry data directory (`$FERRY_HOME` or `~/.ferry/`).
pub fn dirs_path() -> PathBuf {
    match std::env::var("FERRY_HOME") {
        Ok(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => ferry_util::fs::home_dir().join(".ferry"),
    }
}

/// Returns the path to the user-level secrets file.
pub fn credentials_env_path() -> PathBuf {
    dirs_path().join("credentials.env")
}
