use crate::error::ConfigError;
use std::time::Duration;

/// Default number of retries for the named default strategies.
pub const DEFAULT_CLIENT_RETRY_COUNT: usize = 10;

/// Default delta used by the exponential strategy to compute jittered growth.
pub const DEFAULT_CLIENT_BACKOFF: Duration = Duration::from_secs(10);

/// Default upper bound of an exponential delay.
pub const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Default lower bound of an exponential delay.
pub const DEFAULT_MIN_BACKOFF: Duration = Duration::from_secs(1);

/// Default interval of the fixed strategy and initial interval of the incremental one.
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(1);

/// Default growth step of the incremental strategy.
pub const DEFAULT_RETRY_INCREMENT: Duration = Duration::from_secs(1);

/// Whether the first retry fires without waiting, unless configured otherwise.
pub const DEFAULT_FAST_FIRST_RETRY: bool = true;

/// Randomization applied to the exponential delta: draws lie in `delta * [0.8, 1.2]`.
pub const JITTER_FACTOR: f64 = 0.2;

/// The backoff family of a [`RetryStrategy`] and its parameters.
///
/// Attempt limits count retries, not attempts: a limit of 2 allows 1 initial
/// attempt plus 2 retries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Backoff {
    /// The same delay before every retry.
    Fixed {
        attempt_limit: usize,
        interval: Duration,
    },
    /// A delay growing linearly: `initial_interval + increment * attempt`.
    Incremental {
        attempt_limit: usize,
        initial_interval: Duration,
        increment: Duration,
    },
    /// A jittered delay growing with `2^attempt - 1`, clamped to `[min_backoff, max_backoff]`.
    Exponential {
        attempt_limit: usize,
        min_backoff: Duration,
        max_backoff: Duration,
        delta_backoff: Duration,
    },
}

impl Backoff {
    pub fn attempt_limit(&self) -> usize {
        match self {
            Backoff::Fixed { attempt_limit, .. }
            | Backoff::Incremental { attempt_limit, .. }
            | Backoff::Exponential { attempt_limit, .. } => *attempt_limit,
        }
    }

    /// Whether delays are randomized, i.e. exponential with a non-zero delta.
    pub fn uses_jitter(&self) -> bool {
        matches!(self, Backoff::Exponential { delta_backoff, .. } if !delta_backoff.is_zero())
    }
}

/// Immutable configuration of a retry strategy.
///
/// A strategy has a name (used by [`RetryManager`](crate::RetryManager), may be empty),
/// a fast-first-retry flag and one [`Backoff`] payload. Durations are non-negative by
/// construction; the exponential family additionally requires `min_backoff <= max_backoff`.
///
/// # Examples
/// ```
/// use std::time::Duration;
/// use transient_retry::config::RetryStrategy;
///
/// let strategy = RetryStrategy::fixed(3, Duration::from_millis(200))
///     .with_name("fast")
///     .with_fast_first_retry(false);
/// assert_eq!(strategy.name(), "fast");
/// assert_eq!(strategy.attempt_limit(), 3);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryStrategy {
    name: String,
    fast_first_retry: bool,
    backoff: Backoff,
}

impl Default for RetryStrategy {
    /// Provides the default fixed strategy:
    /// - `attempt_limit`: 10 retries
    /// - `interval`: 1 second between retries
    /// - `fast_first_retry`: `true`
    fn default() -> Self {
        RetryStrategy::default_fixed()
    }
}

impl RetryStrategy {
    fn from_backoff(backoff: Backoff) -> Self {
        RetryStrategy {
            name: String::new(),
            fast_first_retry: DEFAULT_FAST_FIRST_RETRY,
            backoff,
        }
    }

    /// Creates a strategy waiting `interval` before each of at most `attempt_limit` retries.
    ///
    /// An `attempt_limit` of 0 never retries.
    pub fn fixed(attempt_limit: usize, interval: Duration) -> Self {
        Self::from_backoff(Backoff::Fixed {
            attempt_limit,
            interval,
        })
    }

    /// Creates a strategy waiting `initial_interval + increment * attempt` before each retry.
    pub fn incremental(attempt_limit: usize, initial_interval: Duration, increment: Duration) -> Self {
        Self::from_backoff(Backoff::Incremental {
            attempt_limit,
            initial_interval,
            increment,
        })
    }

    /// Creates a jittered exponential strategy.
    ///
    /// # Errors
    /// [`ConfigError::InvalidBackoffRange`] if `min_backoff > max_backoff`.
    ///
    /// # Examples
    /// ```
    /// use std::time::Duration;
    /// use transient_retry::config::RetryStrategy;
    ///
    /// let err = RetryStrategy::exponential(
    ///     3,
    ///     Duration::from_secs(5),
    ///     Duration::from_secs(1),
    ///     Duration::from_secs(1),
    /// );
    /// assert!(err.is_err());
    /// ```
    pub fn exponential(
        attempt_limit: usize,
        min_backoff: Duration,
        max_backoff: Duration,
        delta_backoff: Duration,
    ) -> Result<Self, ConfigError> {
        if min_backoff > max_backoff {
            return Err(ConfigError::InvalidBackoffRange {
                min: min_backoff,
                max: max_backoff,
            });
        }
        Ok(Self::from_backoff(Backoff::Exponential {
            attempt_limit,
            min_backoff,
            max_backoff,
            delta_backoff,
        }))
    }

    /// A fixed strategy with `attempt_limit = 0`.
    pub fn no_retry() -> Self {
        Self::fixed(0, DEFAULT_RETRY_INTERVAL)
    }

    pub fn default_fixed() -> Self {
        Self::fixed(DEFAULT_CLIENT_RETRY_COUNT, DEFAULT_RETRY_INTERVAL)
    }

    pub fn default_incremental() -> Self {
        Self::incremental(
            DEFAULT_CLIENT_RETRY_COUNT,
            DEFAULT_RETRY_INTERVAL,
            DEFAULT_RETRY_INCREMENT,
        )
    }

    pub fn default_exponential() -> Self {
        // The default bounds satisfy min <= max.
        Self::from_backoff(Backoff::Exponential {
            attempt_limit: DEFAULT_CLIENT_RETRY_COUNT,
            min_backoff: DEFAULT_MIN_BACKOFF,
            max_backoff: DEFAULT_MAX_BACKOFF,
            delta_backoff: DEFAULT_CLIENT_BACKOFF,
        })
    }

    /// Sets the name and returns the modified `RetryStrategy`.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets whether the first retry skips its wait and returns the modified `RetryStrategy`.
    pub fn with_fast_first_retry(mut self, fast_first_retry: bool) -> Self {
        self.fast_first_retry = fast_first_retry;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fast_first_retry(&self) -> bool {
        self.fast_first_retry
    }

    pub fn backoff(&self) -> &Backoff {
        &self.backoff
    }

    pub fn attempt_limit(&self) -> usize {
        self.backoff.attempt_limit()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_defaults() {
        assert_eq!(RetryStrategy::no_retry().attempt_limit(), 0);

        let fixed = RetryStrategy::default_fixed();
        assert_eq!(
            fixed.backoff(),
            &Backoff::Fixed {
                attempt_limit: 10,
                interval: Duration::from_secs(1)
            }
        );
        assert!(fixed.fast_first_retry());
        assert_eq!(fixed.name(), "");
        assert_eq!(RetryStrategy::default(), fixed);

        assert_eq!(
            RetryStrategy::default_incremental().backoff(),
            &Backoff::Incremental {
                attempt_limit: 10,
                initial_interval: Duration::from_secs(1),
                increment: Duration::from_secs(1)
            }
        );

        assert_eq!(
            RetryStrategy::default_exponential().backoff(),
            &Backoff::Exponential {
                attempt_limit: 10,
                min_backoff: Duration::from_secs(1),
                max_backoff: Duration::from_secs(30),
                delta_backoff: Duration::from_secs(10)
            }
        );
    }

    #[test]
    fn test_exponential_rejects_inverted_range() {
        let result = RetryStrategy::exponential(
            1,
            Duration::from_secs(2),
            Duration::from_secs(1),
            Duration::ZERO,
        );
        assert_eq!(
            result,
            Err(ConfigError::InvalidBackoffRange {
                min: Duration::from_secs(2),
                max: Duration::from_secs(1)
            })
        );
    }

    #[test]
    fn test_only_jittered_backoff_uses_randomness() {
        assert!(RetryStrategy::default_exponential().backoff().uses_jitter());
        assert!(!RetryStrategy::default_fixed().backoff().uses_jitter());
        assert!(!RetryStrategy::default_incremental().backoff().uses_jitter());

        let no_delta =
            RetryStrategy::exponential(3, Duration::ZERO, Duration::from_secs(1), Duration::ZERO)
                .unwrap();
        assert!(!no_delta.backoff().uses_jitter());
    }

    #[test]
    fn test_exponential_accepts_equal_bounds() {
        let strategy = RetryStrategy::exponential(
            1,
            Duration::from_secs(1),
            Duration::from_secs(1),
            Duration::ZERO,
        )
        .unwrap();
        assert_eq!(strategy.attempt_limit(), 1);
    }

    #[test]
    fn test_builder_setters() {
        let strategy = RetryStrategy::incremental(4, Duration::ZERO, Duration::from_millis(5))
            .with_name("ramp")
            .with_fast_first_retry(false);
        assert_eq!(strategy.name(), "ramp");
        assert!(!strategy.fast_first_retry());
        assert_eq!(strategy.attempt_limit(), 4);
    }
}
