use std::time::Duration;
use textflow_llm::SDKError;

/// Backoff applied between retries of transient backend failures only.
#[derive(Clone, Debug, PartialEq)]
pub struct RetryBackoffConfig {
    pub initial_delay_ms: u64,
    pub backoff_factor: f64,
    pub max_delay_ms: u64,
    pub jitter: bool,
}

impl Default for RetryBackoffConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: 1_000,
            backoff_factor: 2.0,
            max_delay_ms: 60_000,
            jitter: false,
        }
    }
}

/// Delay after the failed 0-indexed `attempt`: `initial * factor^attempt`.
pub fn delay_for_attempt_ms(attempt: u32, config: &RetryBackoffConfig, jitter_seed: u64) -> u64 {
    let exp = attempt.min(i32::MAX as u32) as i32;
    let base = (config.initial_delay_ms as f64) * config.backoff_factor.powi(exp);
    let mut delay = base.min(config.max_delay_ms as f64);
    if config.jitter {
        delay *= jitter_factor(attempt, jitter_seed);
    }
    delay.round().max(0.0) as u64
}

/// Backoff for a retryable backend error, never shorter than the provider's
/// own retry hint.
pub fn backoff_delay(attempt: u32, config: &RetryBackoffConfig, error: &SDKError) -> Duration {
    let computed = Duration::from_millis(delay_for_attempt_ms(attempt, config, u64::from(attempt)));
    match error.retry_after() {
        Some(hint) if hint > computed => hint,
        _ => computed,
    }
}

fn jitter_factor(attempt: u32, jitter_seed: u64) -> f64 {
    let mut x = jitter_seed ^ ((attempt as u64) << 32) ^ 0x9E3779B97F4A7C15;
    x ^= x >> 12;
    x ^= x << 25;
    x ^= x >> 27;
    let r = x.wrapping_mul(0x2545F4914F6CDD1D);
    let unit = (r as f64) / (u64::MAX as f64);
    0.5 + unit
}

#[cfg(test)]
mod tests {
    use super::*;
    use textflow_llm::ProviderError;

    fn no_jitter() -> RetryBackoffConfig {
        RetryBackoffConfig {
            jitter: false,
            ..RetryBackoffConfig::default()
        }
    }

    #[test]
    fn delay_for_attempt_ms_no_jitter_expected_powers_of_two_seconds() {
        let config = no_jitter();
        assert_eq!(delay_for_attempt_ms(0, &config, 0), 1_000);
        assert_eq!(delay_for_attempt_ms(1, &config, 0), 2_000);
        assert_eq!(delay_for_attempt_ms(2, &config, 0), 4_000);
    }

    #[test]
    fn delay_for_attempt_ms_expected_capped_at_max() {
        let config = RetryBackoffConfig {
            max_delay_ms: 5_000,
            ..no_jitter()
        };
        assert_eq!(delay_for_attempt_ms(10, &config, 0), 5_000);
    }

    #[test]
    fn delay_for_attempt_ms_with_jitter_expected_within_bounds() {
        let config = RetryBackoffConfig {
            jitter: true,
            ..RetryBackoffConfig::default()
        };
        let delay = delay_for_attempt_ms(1, &config, 42);
        assert!((1_000..=3_000).contains(&delay));
    }

    #[test]
    fn backoff_delay_retry_after_longer_expected_hint_used() {
        let error = SDKError::RateLimit(
            ProviderError::new("openai", Some(429), "slow down")
                .with_retry_after(Some(Duration::from_secs(7))),
        );
        assert_eq!(backoff_delay(0, &no_jitter(), &error), Duration::from_secs(7));
        assert_eq!(backoff_delay(3, &no_jitter(), &error), Duration::from_secs(8));
    }
}
