//! # Runner Configuration
//!
//! Settings for a run, read from a JSON file and overridden by environment
//! variables. Command-line flags are applied on top by the binary.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::environment::{UnresolvedPolicy, Variable};
use crate::error::{Result, RunnerError};

pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";
pub const DEFAULT_CONFIG_FILE: &str = "apiflow.json";

const ENV_BASE_URL: &str = "APIFLOW_BASE_URL";
const ENV_TIMEOUT_MS: &str = "APIFLOW_TIMEOUT_MS";
const ENV_DB_URL: &str = "APIFLOW_DB_URL";
const ENV_DB_USER: &str = "APIFLOW_DB_USER";
const ENV_DB_PASSWORD: &str = "APIFLOW_DB_PASSWORD";
const ENV_LOG: &str = "APIFLOW_LOG";

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

/// Connection settings for `database` assertions. `user` and `password`
/// are passed through for backends that need them; SQLite ignores both.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogConfig {
    /// `EnvFilter` directive, e.g. `info` or `apiflow=debug`.
    pub level: String,
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// File keys are camelCase (`baseUrl`, `timeoutMs`). Unknown keys are
/// rejected rather than ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct RunnerConfig {
    pub base_url: String,
    pub timeout_ms: Option<u64>,
    pub unresolved: UnresolvedPolicy,
    pub globals: Vec<Variable>,
    pub database: DatabaseConfig,
    pub log: LogConfig,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_ms: None,
            unresolved: UnresolvedPolicy::default(),
            globals: Vec::new(),
            database: DatabaseConfig::default(),
            log: LogConfig::default(),
        }
    }
}

impl RunnerConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|source| RunnerError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| RunnerError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load `path` if given (it must exist), otherwise the default config
    /// file when present, then apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    Self::from_file(default_path)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from a key lookup (the process environment in
    /// production). Empty values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(base_url) = get(ENV_BASE_URL) {
            self.base_url = base_url;
        }
        if let Some(raw) = get(ENV_TIMEOUT_MS) {
            let timeout = raw.trim().parse().map_err(|e| {
                RunnerError::Config(format!("{ENV_TIMEOUT_MS} must be an integer, got `{raw}`: {e}"))
            })?;
            self.timeout_ms = Some(timeout);
        }
        if let Some(url) = get(ENV_DB_URL) {
            self.database.url = Some(url);
        }
        if let Some(user) = get(ENV_DB_USER) {
            self.database.user = Some(user);
        }
        if let Some(password) = get(ENV_DB_PASSWORD) {
            self.database.password = Some(password);
        }
        if let Some(level) = get(ENV_LOG) {
            self.log.level = level;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let base = self.base_url.trim();
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(RunnerError::Config(format!(
                "Base URL must start with http:// or https://, got `{base}`"
            )));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}
