use textflow_llm::SDKError;
use thiserror::Error;

/// The single failure type surfaced by graph generation.
///
/// Meant for display; the variants exist for logging and tests, not for
/// callers to branch on.
#[derive(Debug, Error)]
pub enum GraphGenerationError {
    #[error("failed to generate a valid graph after {attempts} attempt(s)")]
    AttemptsExhausted {
        attempts: u32,
        last_failure: Option<String>,
    },
    #[error("backend error after {attempts} attempt(s): {source}")]
    Backend {
        attempts: u32,
        #[source]
        source: SDKError,
    },
    #[error("unexpected error on attempt {attempt}: {source}")]
    Fatal {
        attempt: u32,
        #[source]
        source: SDKError,
    },
}

impl GraphGenerationError {
    /// Backend calls made before giving up.
    pub fn attempts(&self) -> u32 {
        match self {
            Self::AttemptsExhausted { attempts, .. } | Self::Backend { attempts, .. } => *attempts,
            Self::Fatal { attempt, .. } => *attempt,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value '{value}' for {key}: {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
}
