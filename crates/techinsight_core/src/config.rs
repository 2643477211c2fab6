//! Process configuration from environment variables.
//!
//! # Responsibility
//! - Resolve every runtime tunable once at startup.
//! - Reject malformed values instead of silently falling back.
//!
//! # Invariants
//! - Unset or blank variables take their documented default.
//! - `log_dir`, when present, is an absolute path.

use crate::intent::gemini::DEFAULT_MODEL;
use crate::logging::default_log_level;
use crate::service::sync_service::{StoreFailurePolicy, SyncOptions};
use crate::source::arxiv::ArxivConfig;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const ENV_DB_PATH: &str = "TECHINSIGHT_DB_PATH";
pub const ENV_LOG_LEVEL: &str = "TECHINSIGHT_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "TECHINSIGHT_LOG_DIR";
pub const ENV_HOST: &str = "HOST";
pub const ENV_PORT: &str = "PORT";
pub const ENV_ARXIV_BASE_URL: &str = "ARXIV_BASE_URL";
pub const ENV_ARXIV_PAGE_SIZE: &str = "ARXIV_PAGE_SIZE";
pub const ENV_ARXIV_DELAY_SECS: &str = "ARXIV_DELAY_SECS";
pub const ENV_ARXIV_NUM_RETRIES: &str = "ARXIV_NUM_RETRIES";
pub const ENV_GEMINI_API_KEY: &str = "GEMINI_API_KEY";
pub const ENV_GEMINI_MODEL: &str = "GEMINI_MODEL";
pub const ENV_STORE_FAILURE: &str = "TECHINSIGHT_STORE_FAILURE";

const DEFAULT_DB_FILE_NAME: &str = "techinsight.db";
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Variable is set but cannot be parsed.
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Invalid { key, value, reason } => {
                write!(f, "invalid value `{value}` for {key}: {reason}")
            }
        }
    }
}

impl Error for ConfigError {}

/// Fully resolved runtime configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub log_level: String,
    pub log_dir: Option<PathBuf>,
    pub host: String,
    pub port: u16,
    pub arxiv: ArxivConfig,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub sync: SyncOptions,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_FILE_NAME),
            log_level: default_log_level().to_string(),
            log_dir: None,
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            arxiv: ArxivConfig::default(),
            gemini_api_key: None,
            gemini_model: DEFAULT_MODEL.to_string(),
            sync: SyncOptions::default(),
        }
    }
}

impl AppConfig {
    /// Reads configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads configuration through `lookup`, which maps a variable name to
    /// its raw value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let mut config = Self::default();

        if let Some(path) = get(ENV_DB_PATH) {
            config.db_path = PathBuf::from(path);
        }
        if let Some(level) = get(ENV_LOG_LEVEL) {
            config.log_level = level;
        }
        if let Some(dir) = get(ENV_LOG_DIR) {
            let dir = PathBuf::from(&dir);
            if !dir.is_absolute() {
                return Err(ConfigError::Invalid {
                    key: ENV_LOG_DIR,
                    value: dir.display().to_string(),
                    reason: "must be an absolute path".to_string(),
                });
            }
            config.log_dir = Some(dir);
        }
        if let Some(host) = get(ENV_HOST) {
            config.host = host;
        }
        if let Some(port) = get(ENV_PORT) {
            config.port = parse_value(ENV_PORT, &port)?;
        }

        if let Some(base_url) = get(ENV_ARXIV_BASE_URL) {
            config.arxiv.base_url = base_url;
        }
        if let Some(page_size) = get(ENV_ARXIV_PAGE_SIZE) {
            let page_size: usize = parse_value(ENV_ARXIV_PAGE_SIZE, &page_size)?;
            if page_size == 0 {
                return Err(ConfigError::Invalid {
                    key: ENV_ARXIV_PAGE_SIZE,
                    value: page_size.to_string(),
                    reason: "must be greater than zero".to_string(),
                });
            }
            config.arxiv.page_size = page_size;
        }
        if let Some(delay) = get(ENV_ARXIV_DELAY_SECS) {
            let secs: f64 = parse_value(ENV_ARXIV_DELAY_SECS, &delay)?;
            config.arxiv.delay =
                Duration::try_from_secs_f64(secs).map_err(|err| ConfigError::Invalid {
                    key: ENV_ARXIV_DELAY_SECS,
                    value: delay.clone(),
                    reason: err.to_string(),
                })?;
        }
        if let Some(retries) = get(ENV_ARXIV_NUM_RETRIES) {
            config.arxiv.num_retries = parse_value(ENV_ARXIV_NUM_RETRIES, &retries)?;
        }

        config.gemini_api_key = get(ENV_GEMINI_API_KEY);
        if let Some(model) = get(ENV_GEMINI_MODEL) {
            config.gemini_model = model;
        }
        if let Some(policy) = get(ENV_STORE_FAILURE) {
            config.sync.store_failure = policy
                .parse::<StoreFailurePolicy>()
                .map_err(|reason| ConfigError::Invalid {
                    key: ENV_STORE_FAILURE,
                    value: policy.clone(),
                    reason,
                })?;
        }

        Ok(config)
    }

    /// `host:port` string suitable for binding a listener.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_value<T>(key: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    value.parse::<T>().map_err(|err| ConfigError::Invalid {
        key,
        value: value.to_string(),
        reason: err.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::{AppConfig, ConfigError, ENV_ARXIV_PAGE_SIZE, ENV_LOG_DIR, ENV_PORT};
    use crate::service::sync_service::StoreFailurePolicy;
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::time::Duration;

    fn config_from(pairs: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect::<HashMap<_, _>>();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn empty_environment_yields_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.db_path, PathBuf::from("techinsight.db"));
        assert_eq!(config.bind_address(), "0.0.0.0:8000");
        assert_eq!(config.arxiv.page_size, 10);
        assert_eq!(config.arxiv.delay, Duration::from_secs(3));
        assert_eq!(config.arxiv.num_retries, 3);
        assert_eq!(config.gemini_model, "gemini-1.5-flash");
        assert!(config.gemini_api_key.is_none());
        assert!(config.log_dir.is_none());
        assert_eq!(config.sync.default_max_results, 20);
        assert_eq!(config.sync.sync_max_results, 10);
        assert_eq!(config.sync.store_failure, StoreFailurePolicy::Propagate);
    }

    #[test]
    fn overrides_are_applied_and_blank_values_ignored() {
        let config = config_from(&[
            ("TECHINSIGHT_DB_PATH", "/var/lib/techinsight/cache.db"),
            ("PORT", "9090"),
            ("ARXIV_DELAY_SECS", "0.5"),
            ("ARXIV_NUM_RETRIES", "0"),
            ("GEMINI_API_KEY", "   "),
            ("TECHINSIGHT_STORE_FAILURE", "log"),
        ])
        .unwrap();
        assert_eq!(
            config.db_path,
            PathBuf::from("/var/lib/techinsight/cache.db")
        );
        assert_eq!(config.port, 9090);
        assert_eq!(config.arxiv.delay, Duration::from_millis(500));
        assert_eq!(config.arxiv.num_retries, 0);
        assert!(config.gemini_api_key.is_none());
        assert_eq!(config.sync.store_failure, StoreFailurePolicy::LogAndContinue);
    }

    #[test]
    fn malformed_values_are_rejected() {
        let error = config_from(&[("PORT", "eighty")]).unwrap_err();
        assert!(matches!(error, ConfigError::Invalid { key, .. } if key == ENV_PORT));

        let error = config_from(&[("ARXIV_PAGE_SIZE", "0")]).unwrap_err();
        assert!(matches!(error, ConfigError::Invalid { key, .. } if key == ENV_ARXIV_PAGE_SIZE));

        let error = config_from(&[("TECHINSIGHT_LOG_DIR", "logs")]).unwrap_err();
        assert!(matches!(error, ConfigError::Invalid { key, .. } if key == ENV_LOG_DIR));

        assert!(config_from(&[("ARXIV_DELAY_SECS", "-1")]).is_err());
    }
}
