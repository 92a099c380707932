//! Harness configuration
//!
//! Settings are read from a TOML file (default `test-config.toml`, or the path
//! in `PLANTSHOP_CONFIG`), then individual values can be replaced through
//! `PLANTSHOP_*` environment variables. Anything left unset falls back to the
//! defaults of a local Plant Shop instance.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{Error, Result};

/// Default configuration file, relative to the working directory
pub const DEFAULT_CONFIG_PATH: &str = "test-config.toml";

/// Environment variable overriding the configuration file path
pub const CONFIG_PATH_ENV_VAR: &str = "PLANTSHOP_CONFIG";

pub const BASE_URL_ENV_VAR: &str = "PLANTSHOP_BASE_URL";
pub const API_BASE_URL_ENV_VAR: &str = "PLANTSHOP_API_BASE_URL";
pub const ADMIN_USERNAME_ENV_VAR: &str = "PLANTSHOP_ADMIN_USERNAME";
pub const ADMIN_PASSWORD_ENV_VAR: &str = "PLANTSHOP_ADMIN_PASSWORD";
pub const USER_USERNAME_ENV_VAR: &str = "PLANTSHOP_USER_USERNAME";
pub const USER_PASSWORD_ENV_VAR: &str = "PLANTSHOP_USER_PASSWORD";

/// Top-level harness configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuiteConfig {
    /// Root of the web UI (cookies bind to this origin)
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Root of the REST API, e.g. `http://localhost:8080/api`
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Administrator account
    #[serde(default = "AccountConfig::default_admin")]
    pub admin: AccountConfig,

    /// Non-admin account
    #[serde(default = "AccountConfig::default_standard_user")]
    pub standard_user: AccountConfig,

    /// Timeout applied to every HTTP request the harness makes
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

/// Username/password pair as written in the config file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountConfig {
    pub username: String,
    pub password: String,
}

impl AccountConfig {
    fn default_admin() -> Self {
        Self {
            username: "admin".to_string(),
            password: "admin123".to_string(),
        }
    }

    fn default_standard_user() -> Self {
        Self {
            username: "testuser".to_string(),
            password: "password123".to_string(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_api_base_url() -> String {
    "http://localhost:8080/api".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_base_url: default_api_base_url(),
            admin: AccountConfig::default_admin(),
            standard_user: AccountConfig::default_standard_user(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl SuiteConfig {
    /// Load configuration from file, or defaults when the file is absent
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            debug!("Loading harness config from {}", path.display());
            let content = std::fs::read_to_string(path)?;
            toml::from_str::<Self>(&content)?
        } else {
            debug!("No config at {}, using defaults", path.display());
            Self::default()
        };
        config.normalize();
        Ok(config)
    }

    /// Parse configuration from a TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        let mut config: Self = toml::from_str(content)?;
        config.normalize();
        Ok(config)
    }

    /// Load from `config_path()`, apply environment overrides and validate
    pub fn resolve() -> Result<Self> {
        let mut config = Self::load(&config_path())?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Replace values with any `PLANTSHOP_*` variables present in the environment
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Replace values from an arbitrary lookup (env-shaped keys)
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let slots: [(&str, &mut String); 6] = [
            (BASE_URL_ENV_VAR, &mut self.base_url),
            (API_BASE_URL_ENV_VAR, &mut self.api_base_url),
            (ADMIN_USERNAME_ENV_VAR, &mut self.admin.username),
            (ADMIN_PASSWORD_ENV_VAR, &mut self.admin.password),
            (USER_USERNAME_ENV_VAR, &mut self.standard_user.username),
            (USER_PASSWORD_ENV_VAR, &mut self.standard_user.password),
        ];

        for (key, slot) in slots {
            if let Some(value) = lookup(key).filter(|v| !v.is_empty()) {
                debug!("Config override from {}", key);
                *slot = value;
            }
        }
        self.normalize();
    }

    /// Check URLs and account names
    pub fn validate(&self) -> Result<()> {
        for (field, url) in [("base_url", &self.base_url), ("api_base_url", &self.api_base_url)] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(Error::InvalidConfig(format!(
                    "{} must be an http(s) URL, got '{}'",
                    field, url
                )));
            }
        }

        if self.admin.username.is_empty() || self.standard_user.username.is_empty() {
            return Err(Error::InvalidConfig("usernames must not be empty".to_string()));
        }

        Ok(())
    }

    fn normalize(&mut self) {
        trim_trailing_slash(&mut self.base_url);
        trim_trailing_slash(&mut self.api_base_url);
    }
}

fn trim_trailing_slash(url: &mut String) {
    while url.ends_with('/') {
        url.pop();
    }
}

/// Get the config file path, checking the environment variable first
pub fn config_path() -> PathBuf {
    std::env::var_os(CONFIG_PATH_ENV_VAR)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}
