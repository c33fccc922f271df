//! Error taxonomy and retry classification.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ConfigurationError {
    pub message: String,
}

impl ConfigurationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// A failure reported by the remote provider.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProviderError {
    pub provider: String,
    pub status: Option<u16>,
    pub message: String,
    pub retry_after: Option<Duration>,
}

impl ProviderError {
    pub fn new(
        provider: impl Into<String>,
        status: Option<u16>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            provider: provider.into(),
            status,
            message: message.into(),
            retry_after: None,
        }
    }

    pub fn with_retry_after(mut self, retry_after: Option<Duration>) -> Self {
        self.retry_after = retry_after;
        self
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(f, "{} returned {status}: {}", self.provider, self.message),
            None => write!(f, "{}: {}", self.provider, self.message),
        }
    }
}

impl std::error::Error for ProviderError {}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum SDKError {
    #[error("configuration error: {0}")]
    Configuration(ConfigurationError),
    #[error("authentication failed: {0}")]
    Authentication(ProviderError),
    #[error("invalid request: {0}")]
    InvalidRequest(ProviderError),
    #[error("rate limited: {0}")]
    RateLimit(ProviderError),
    #[error("server error: {0}")]
    Server(ProviderError),
    #[error("network error: {0}")]
    Network(String),
    #[error("response decode failed: {0}")]
    Decode(String),
}

impl SDKError {
    /// Whether the failure is transient and worth retrying after a delay.
    pub fn retryable(&self) -> bool {
        matches!(self, Self::RateLimit(_) | Self::Server(_) | Self::Network(_))
    }

    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimit(error) | Self::Server(error) => error.retry_after,
            _ => None,
        }
    }

    pub fn is_rate_limit(&self) -> bool {
        matches!(self, Self::RateLimit(_))
    }
}

impl From<ConfigurationError> for SDKError {
    fn from(error: ConfigurationError) -> Self {
        Self::Configuration(error)
    }
}
