use std::time::Duration;

use thiserror::Error;
use validator::Validate;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("invalid {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[derive(Clone, Debug, Validate)]
pub struct ClientConfig {
    #[validate(url)]
    pub base_url: String,
    pub token: Option<String>,
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let base_url = lookup("ARML_API_URL")
            .filter(|url| !url.trim().is_empty())
            .ok_or(ConfigError::Missing("ARML_API_URL"))?;
        let mut config = ClientConfig::new(base_url.trim());
        config.token = lookup("ARML_API_TOKEN").filter(|token| !token.is_empty());
        if let Some(secs) = lookup("ARML_REQUEST_TIMEOUT_SECS") {
            let secs = secs
                .trim()
                .parse::<u64>()
                .map_err(|e| ConfigError::Invalid {
                    name: "ARML_REQUEST_TIMEOUT_SECS",
                    reason: e.to_string(),
                })?;
            if secs == 0 {
                return Err(ConfigError::Invalid {
                    name: "ARML_REQUEST_TIMEOUT_SECS",
                    reason: "must be at least one second".to_string(),
                });
            }
            config.timeout = Duration::from_secs(secs);
        }
        config.validate().map_err(|e| ConfigError::Invalid {
            name: "ARML_API_URL",
            reason: e.to_string(),
        })?;
        Ok(config)
    }
}
