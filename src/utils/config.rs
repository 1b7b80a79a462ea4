use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Context};
use url::Url;

pub const DEFAULT_API_URL: &str = "http://localhost:5000/api/";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_SESSION_DIR: &str = ".retailx";
const MAX_RECOMMENDATION_LIMIT: usize = 24;

#[derive(Debug, Clone)]
pub struct Config {
    pub api_url: String,
    pub request_timeout: Duration,
    pub recommendation_limit: usize,
    pub session_dir: PathBuf,
    pub log_level: String,
    pub environment: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            recommendation_limit: crate::services::DEFAULT_RECOMMENDATION_LIMIT,
            session_dir: PathBuf::from(DEFAULT_SESSION_DIR),
            log_level: "info".to_string(),
            environment: "development".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv::dotenv().ok();
        let defaults = Config::default();

        let config = Config {
            api_url: env::var("RETAILX_API_URL").unwrap_or(defaults.api_url),
            request_timeout: match env::var("RETAILX_TIMEOUT_SECS") {
                Ok(raw) => Duration::from_secs(
                    raw.trim()
                        .parse::<u64>()
                        .with_context(|| format!("RETAILX_TIMEOUT_SECS is not a number: '{}'", raw))?,
                ),
                Err(_) => defaults.request_timeout,
            },
            recommendation_limit: match env::var("RETAILX_RECOMMENDATION_LIMIT") {
                Ok(raw) => raw.trim().parse::<usize>().with_context(|| {
                    format!("RETAILX_RECOMMENDATION_LIMIT is not a number: '{}'", raw)
                })?,
                Err(_) => defaults.recommendation_limit,
            },
            session_dir: env::var("RETAILX_SESSION_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.session_dir),
            log_level: env::var("LOG_LEVEL").unwrap_or(defaults.log_level),
            environment: env::var("APP_ENV").unwrap_or(defaults.environment),
        };

        config.validate()?;
        tracing::debug!("Config: loaded for {} environment", config.environment);
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let url = Url::parse(&self.api_url)
            .with_context(|| format!("RETAILX_API_URL is not a valid URL: '{}'", self.api_url))?;

        match url.scheme() {
            "http" | "https" => {}
            other => return Err(anyhow!("RETAILX_API_URL must be http(s), got '{}'", other)),
        }

        if self.is_production() && url.scheme() != "https" {
            return Err(anyhow!("RETAILX_API_URL must use https in production"));
        }

        if self.request_timeout.is_zero() {
            return Err(anyhow!("RETAILX_TIMEOUT_SECS must be greater than zero"));
        }

        if !(1..=MAX_RECOMMENDATION_LIMIT).contains(&self.recommendation_limit) {
            return Err(anyhow!(
                "RETAILX_RECOMMENDATION_LIMIT must be between 1 and {}",
                MAX_RECOMMENDATION_LIMIT
            ));
        }

        Ok(())
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert_eq!(config.recommendation_limit, 4);
    }

    #[test]
    fn test_rejects_bad_values() {
        let mut config = Config {
            api_url: "ftp://example.com/api/".to_string(),
            ..Config::default()
        };
        assert!(config.validate().is_err());

        config.api_url = "not a url".to_string();
        assert!(config.validate().is_err());

        config.api_url = DEFAULT_API_URL.to_string();
        config.recommendation_limit = 0;
        assert!(config.validate().is_err());

        config.recommendation_limit = 4;
        config.request_timeout = Duration::ZERO;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_production_requires_https() {
        let mut config = Config {
            environment: "production".to_string(),
            ..Config::default()
        };
        assert!(config.validate().is_err());

        config.api_url = "https://shop.example.com/api/".to_string();
        assert!(config.validate().is_ok());
    }
}
