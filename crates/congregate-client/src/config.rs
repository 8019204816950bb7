use std::path::PathBuf;
use std::time::Duration;

pub const ENV_API_BASE_URL: &str = "CONGREGATE_API_BASE_URL";
pub const ENV_API_KEY: &str = "CONGREGATE_API_KEY";
pub const ENV_REFRESH_SKEW_SECS: &str = "CONGREGATE_REFRESH_SKEW_SECS";
pub const ENV_REDIRECT_DELAY_MS: &str = "CONGREGATE_REDIRECT_DELAY_MS";
pub const ENV_DATASET_DIR: &str = "CONGREGATE_DATASET_DIR";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),
    #[error("{var} has invalid value {value:?}")]
    Invalid { var: &'static str, value: String },
}

/// Settings supplied at process start.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_base_url: String,
    pub api_key: String,
    /// Tokens this close to expiry are refreshed before use.
    pub refresh_skew: Duration,
    /// Pause between the registration success notice and the login redirect.
    pub redirect_delay: Duration,
    pub dataset_dir: Option<PathBuf>,
}

impl ClientConfig {
    pub fn new(api_base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            api_base_url: api_base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            refresh_skew: Duration::from_secs(60),
            redirect_delay: Duration::from_millis(1000),
            dataset_dir: None,
        }
    }

    /// Reads the `CONGREGATE_*` variables. Call `dotenvy::dotenv()` first to
    /// pick up a `.env` file.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |var: &'static str| {
            lookup(var)
                .filter(|v| !v.is_empty())
                .ok_or(ConfigError::Missing(var))
        };
        let number = |var: &'static str, default: u64| match lookup(var) {
            None => Ok(default),
            Some(value) => value
                .parse::<u64>()
                .map_err(|_| ConfigError::Invalid { var, value }),
        };

        let mut config = Self::new(required(ENV_API_BASE_URL)?, required(ENV_API_KEY)?);
        config.refresh_skew = Duration::from_secs(number(ENV_REFRESH_SKEW_SECS, 60)?);
        config.redirect_delay = Duration::from_millis(number(ENV_REDIRECT_DELAY_MS, 1000)?);
        config.dataset_dir = lookup(ENV_DATASET_DIR).filter(|v| !v.is_empty()).map(PathBuf::from);
        Ok(config)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_base_url, path)
    }
}
