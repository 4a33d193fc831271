//! Exponential backoff for waiting on short queue jobs.

use std::time::Duration;

/// Tunable parameters for the exponential-backoff strategy.
#[derive(Debug, Clone, Copy)]
pub struct BackoffConfig {
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Upper bound on the delay between attempts.
    pub max_delay: Duration,
    /// Factor by which the delay grows after each attempt.
    pub multiplier: f64,
    /// Attempts before giving up.
    pub max_attempts: u32,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(5),
            multiplier: 2.0,
            max_attempts: 40,
        }
    }
}

/// Calculate the next backoff delay from the current delay and config.
///
/// The result is clamped to [`BackoffConfig::max_delay`].
pub fn next_delay(current: Duration, config: &BackoffConfig) -> Duration {
    let next_ms = (current.as_millis() as f64 * config.multiplier) as u64;
    Duration::from_millis(next_ms).min(config.max_delay)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_delay_doubles() {
        let config = BackoffConfig::default();
        assert_eq!(
            next_delay(Duration::from_millis(250), &config),
            Duration::from_millis(500)
        );
    }

    #[test]
    fn next_delay_clamps_at_max() {
        let config = BackoffConfig::default();
        assert_eq!(
            next_delay(Duration::from_secs(4), &config),
            Duration::from_secs(5)
        );
    }

    #[test]
    fn full_backoff_sequence() {
        let config = BackoffConfig::default();
        let mut delay = config.initial_delay;
        let expected = [250, 500, 1_000, 2_000, 4_000, 5_000, 5_000];

        for &expected_ms in &expected {
            assert_eq!(delay.as_millis() as u64, expected_ms);
            delay = next_delay(delay, &config);
        }
    }
}
