//! Client configuration
//!
//! Selects the backend strategy (REST API or managed BaaS) and carries the
//! connection parameters. Built either from environment variables or through
//! the builder.

use std::time::Duration;

use thiserror::Error;

/// Default REST API base URL.
const DEFAULT_API_URL: &str = "http://127.0.0.1:5000/api";

/// Primary request timeout.
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Reachability probe timeout. Bounded to a few seconds so a dead backend
/// fails fast instead of hanging loading state.
const DEFAULT_HEALTH_TIMEOUT: Duration = Duration::from_secs(3);

/// Period between session re-verifications.
const DEFAULT_REVERIFY_INTERVAL: Duration = Duration::from_secs(30 * 60);

/// Which backend implementation the gateway dispatches to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendStrategy {
    /// The Skillversity REST API.
    #[default]
    Rest,
    /// The managed backend-as-a-service (Supabase-style HTTP surface).
    Baas,
}

impl std::str::FromStr for BackendStrategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "rest" => Ok(Self::Rest),
            "baas" => Ok(Self::Baas),
            other => Err(ConfigError::UnknownBackend(other.to_string())),
        }
    }
}

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the selected backend.
    pub base_url: String,
    /// Backend strategy, fixed at startup.
    pub backend: BackendStrategy,
    /// Anonymous API key; required for the BaaS strategy.
    pub anon_key: Option<String>,
    /// Timeout for primary requests.
    pub request_timeout: Duration,
    /// Timeout for the reachability probe.
    pub health_timeout: Duration,
    /// Period between background session re-verifications.
    pub reverify_interval: Duration,
}

impl ClientConfig {
    /// Create a new builder.
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// Build a configuration from environment variables:
    /// `SKILLVERSITY_API_URL`, `SKILLVERSITY_BACKEND`, `SKILLVERSITY_ANON_KEY`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut builder = Self::builder();
        if let Ok(url) = std::env::var("SKILLVERSITY_API_URL") {
            builder = builder.base_url(url);
        }
        if let Ok(backend) = std::env::var("SKILLVERSITY_BACKEND") {
            builder = builder.backend(backend.parse()?);
        }
        if let Ok(key) = std::env::var("SKILLVERSITY_ANON_KEY") {
            builder = builder.anon_key(key);
        }
        builder.build()
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            backend: BackendStrategy::Rest,
            anon_key: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            health_timeout: DEFAULT_HEALTH_TIMEOUT,
            reverify_interval: DEFAULT_REVERIFY_INTERVAL,
        }
    }
}

/// Builder for `ClientConfig`.
#[derive(Debug, Default)]
pub struct ClientConfigBuilder {
    base_url: Option<String>,
    backend: Option<BackendStrategy>,
    anon_key: Option<String>,
    request_timeout: Option<Duration>,
    health_timeout: Option<Duration>,
    reverify_interval: Option<Duration>,
}

impl ClientConfigBuilder {
    /// Set the backend base URL.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Select the backend strategy.
    pub fn backend(mut self, backend: BackendStrategy) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Set the BaaS anonymous key.
    pub fn anon_key(mut self, key: impl Into<String>) -> Self {
        self.anon_key = Some(key.into());
        self
    }

    /// Set the primary request timeout.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Set the reachability probe timeout.
    pub fn health_timeout(mut self, timeout: Duration) -> Self {
        self.health_timeout = Some(timeout);
        self
    }

    /// Set the session re-verification period.
    pub fn reverify_interval(mut self, interval: Duration) -> Self {
        self.reverify_interval = Some(interval);
        self
    }

    /// Build and validate the configuration.
    pub fn build(self) -> Result<ClientConfig, ConfigError> {
        let base_url = self
            .base_url
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());
        if base_url.trim().is_empty() {
            return Err(ConfigError::MissingValue("base_url"));
        }
        let backend = self.backend.unwrap_or_default();
        if backend == BackendStrategy::Baas && self.anon_key.is_none() {
            return Err(ConfigError::MissingValue("anon_key"));
        }
        Ok(ClientConfig {
            // Trailing slashes would double up when joining paths.
            base_url: base_url.trim_end_matches('/').to_string(),
            backend,
            anon_key: self.anon_key,
            request_timeout: self.request_timeout.unwrap_or(DEFAULT_REQUEST_TIMEOUT),
            health_timeout: self.health_timeout.unwrap_or(DEFAULT_HEALTH_TIMEOUT),
            reverify_interval: self
                .reverify_interval
                .unwrap_or(DEFAULT_REVERIFY_INTERVAL),
        })
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing value: {0}")]
    MissingValue(&'static str),
    #[error("unknown backend strategy: {0}")]
    UnknownBackend(String),
}
