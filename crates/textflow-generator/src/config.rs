use crate::{ConfigError, GenerationParams, RetryBackoffConfig};
use std::str::FromStr;
use textflow_graph::SchemaOptions;

pub const DEFAULT_MODEL: &str = "gpt-4-turbo";
pub const DEFAULT_TEMPERATURE: f64 = 0.2;
pub const DEFAULT_MAX_RETRIES: u32 = 2;
pub const DEFAULT_MAX_TOKENS: u32 = 2048;

#[derive(Clone, Debug, PartialEq)]
pub struct GeneratorConfig {
    pub model: String,
    pub temperature: f64,
    pub max_retries: u32,
    pub max_tokens: u32,
    pub top_p: f64,
    pub backoff: RetryBackoffConfig,
    pub schema: SchemaOptions,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_retries: DEFAULT_MAX_RETRIES,
            max_tokens: DEFAULT_MAX_TOKENS,
            top_p: 1.0,
            backoff: RetryBackoffConfig::default(),
            schema: SchemaOptions::default(),
        }
    }
}

impl GeneratorConfig {
    /// Reads `TEXTFLOW_*` overrides from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(model) = get("TEXTFLOW_MODEL") {
            config.model = model.trim().to_string();
        }
        if let Some(raw) = get("TEXTFLOW_TEMPERATURE") {
            config.temperature = parse_value("TEXTFLOW_TEMPERATURE", &raw)?;
            if !(0.0..=2.0).contains(&config.temperature) {
                return Err(ConfigError::InvalidValue {
                    key: "TEXTFLOW_TEMPERATURE",
                    value: raw,
                    reason: "expected a value between 0.0 and 2.0".to_string(),
                });
            }
        }
        if let Some(raw) = get("TEXTFLOW_MAX_RETRIES") {
            config.max_retries = parse_value("TEXTFLOW_MAX_RETRIES", &raw)?;
        }
        if let Some(raw) = get("TEXTFLOW_MAX_TOKENS") {
            config.max_tokens = parse_value("TEXTFLOW_MAX_TOKENS", &raw)?;
        }
        if let Some(raw) = get("TEXTFLOW_BACKOFF_MS") {
            config.backoff.initial_delay_ms = parse_value("TEXTFLOW_BACKOFF_MS", &raw)?;
        }
        Ok(config)
    }

    pub fn params(&self) -> GenerationParams {
        GenerationParams {
            model: self.model.clone(),
            temperature: self.temperature,
            max_retries: self.max_retries,
        }
    }
}

fn parse_value<T>(key: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|error: T::Err| ConfigError::InvalidValue {
            key,
            value: raw.to_string(),
            reason: error.to_string(),
        })
}
