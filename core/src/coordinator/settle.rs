use std::time::Duration;

use crate::config::ClientConfig;

/// How long to wait for the backend's derived effects before reading the
/// post-image.
///
/// Attempt `n` waits `delay * 2^n`. With `retries == 0` this is the plain
/// fixed settle delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettlePolicy {
    pub delay: Duration,
    pub retries: u32,
}

impl SettlePolicy {
    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            delay: config.settle_delay(),
            retries: config.settle_retries,
        }
    }

    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.delay.saturating_mul(2u32.saturating_pow(attempt))
    }
}

impl Default for SettlePolicy {
    fn default() -> Self {
        Self::from_config(&ClientConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_doubles_per_attempt() {
        let policy = SettlePolicy {
            delay: Duration::from_millis(200),
            retries: 3,
        };
        assert_eq!(policy.delay_for(0), Duration::from_millis(200));
        assert_eq!(policy.delay_for(1), Duration::from_millis(400));
        assert_eq!(policy.delay_for(3), Duration::from_millis(1600));
    }

    #[test]
    fn test_default_is_single_fixed_wait() {
        let policy = SettlePolicy::default();
        assert_eq!(policy.delay, Duration::from_millis(200));
        assert_eq!(policy.retries, 0);
    }
}
