use std::time::Duration;

mod predicate;
pub use predicate::*;

/// Tunables shared by every watch unit of a [`NamespaceSubscriber`](crate::NamespaceSubscriber).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    controller_prefix: String,
    retry_base: Duration,
    retry_max: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            controller_prefix: "sub".to_owned(),
            retry_base: Duration::from_millis(5),
            retry_max: Duration::from_secs(1000),
        }
    }
}

impl Config {
    /// Sets the prefix of controller names, which are `{prefix}{namespace}/{name}`.
    pub fn with_controller_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.controller_prefix = prefix.into();
        self
    }

    /// Sets the exponential backoff applied to failed reconciles.
    pub fn with_retry_backoff(mut self, base: Duration, max: Duration) -> Self {
        self.retry_base = base;
        self.retry_max = max.max(base);
        self
    }

    pub fn controller_prefix(&self) -> &str {
        &self.controller_prefix
    }

    /// The delay before retrying a reconcile that already failed `attempt` times.
    pub fn retry_delay(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.retry_base.saturating_mul(factor).min(self.retry_max)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::Config;

    #[test]
    fn retry_delay_doubles_until_capped() {
        let config =
            Config::default().with_retry_backoff(Duration::from_millis(10), Duration::from_millis(70));

        assert_eq!(config.retry_delay(0), Duration::from_millis(10));
        assert_eq!(config.retry_delay(1), Duration::from_millis(20));
        assert_eq!(config.retry_delay(2), Duration::from_millis(40));
        assert_eq!(config.retry_delay(3), Duration::from_millis(70));
        assert_eq!(config.retry_delay(64), Duration::from_millis(70));
    }
}
