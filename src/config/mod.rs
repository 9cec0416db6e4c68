//! Configuration types for the catalog API client.

use crate::errors::{CatalogError, CatalogResult};
use crate::{
    DEFAULT_CACHE_TTL_SECS, DEFAULT_MAX_RETRIES, DEFAULT_RETRY_DELAY_MS, DEFAULT_TIMEOUT_SECS,
};
use secrecy::SecretString;
use std::time::Duration;

/// Configuration for the catalog API client.
#[derive(Clone)]
pub struct CatalogConfig {
    /// Base URL of the catalog instance (without the REST path suffix)
    pub base_url: String,
    /// Username for basic authentication
    pub username: String,
    /// Password for basic authentication
    pub password: SecretString,
    /// Per-request timeout
    pub timeout: Duration,
    /// Maximum number of retry attempts after the initial call
    pub max_retries: u32,
    /// Base delay for exponential backoff between retries
    pub retry_delay: Duration,
    /// Time-to-live for cached lookup metadata
    pub cache_ttl: Duration,
}

impl CatalogConfig {
    /// Creates a new configuration builder
    pub fn builder() -> CatalogConfigBuilder {
        CatalogConfigBuilder::default()
    }

    /// Creates a configuration from environment variables.
    ///
    /// Requires `CATALOG_URL`, `CATALOG_USERNAME` and `CATALOG_PASSWORD`;
    /// `CATALOG_TIMEOUT`, `CATALOG_MAX_RETRIES` and `CATALOG_RETRY_DELAY_MS`
    /// are optional overrides.
    pub fn from_env() -> CatalogResult<Self> {
        let base_url = std::env::var("CATALOG_URL").map_err(|_| CatalogError::Configuration {
            message: "CATALOG_URL environment variable not set".to_string(),
        })?;

        let username =
            std::env::var("CATALOG_USERNAME").map_err(|_| CatalogError::Configuration {
                message: "CATALOG_USERNAME environment variable not set".to_string(),
            })?;

        let password =
            std::env::var("CATALOG_PASSWORD").map_err(|_| CatalogError::Configuration {
                message: "CATALOG_PASSWORD environment variable not set".to_string(),
            })?;

        let timeout_secs = std::env::var("CATALOG_TIMEOUT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let max_retries = std::env::var("CATALOG_MAX_RETRIES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_MAX_RETRIES);

        let retry_delay_ms = std::env::var("CATALOG_RETRY_DELAY_MS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_RETRY_DELAY_MS);

        Ok(Self {
            base_url,
            username,
            password: SecretString::new(password),
            timeout: Duration::from_secs(timeout_secs),
            max_retries,
            retry_delay: Duration::from_millis(retry_delay_ms),
            cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
        })
    }
}

/// Builder for [`CatalogConfig`]
#[derive(Default)]
pub struct CatalogConfigBuilder {
    base_url: Option<String>,
    username: Option<String>,
    password: Option<SecretString>,
    timeout: Option<Duration>,
    max_retries: Option<u32>,
    retry_delay: Option<Duration>,
    cache_ttl: Option<Duration>,
}

impl CatalogConfigBuilder {
    /// Sets the base URL of the catalog instance
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Sets the username for basic authentication
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Sets the password for basic authentication
    pub fn password(mut self, password: SecretString) -> Self {
        self.password = Some(password);
        self
    }

    /// Sets the per-request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the maximum number of retries
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    /// Sets the base backoff delay between retries
    pub fn retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = Some(retry_delay);
        self
    }

    /// Sets the time-to-live for cached lookup metadata
    pub fn cache_ttl(mut self, cache_ttl: Duration) -> Self {
        self.cache_ttl = Some(cache_ttl);
        self
    }

    /// Builds the configuration
    pub fn build(self) -> CatalogResult<CatalogConfig> {
        let base_url = self.base_url.ok_or_else(|| CatalogError::Configuration {
            message: "Base URL is required".to_string(),
        })?;

        let username = self.username.ok_or_else(|| CatalogError::Configuration {
            message: "Username is required".to_string(),
        })?;

        let password = self.password.ok_or_else(|| CatalogError::Configuration {
            message: "Password is required".to_string(),
        })?;

        Ok(CatalogConfig {
            base_url,
            username,
            password,
            timeout: self
                .timeout
                .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
            max_retries: self.max_retries.unwrap_or(DEFAULT_MAX_RETRIES),
            retry_delay: self
                .retry_delay
                .unwrap_or(Duration::from_millis(DEFAULT_RETRY_DELAY_MS)),
            cache_ttl: self
                .cache_ttl
                .unwrap_or(Duration::from_secs(DEFAULT_CACHE_TTL_SECS)),
        })
    }
}
