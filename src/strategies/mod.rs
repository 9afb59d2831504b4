use crate::config::{Backoff, JITTER_FACTOR, RetryStrategy};
use crate::error::DelayOverflow;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;

/// The answer a retry predicate gives for one failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryDecision {
    /// Whether another attempt should be made.
    pub should_retry: bool,
    /// How long to wait before that attempt. Zero when `should_retry` is `false`.
    pub delay: Duration,
}

impl RetryDecision {
    pub fn retry(delay: Duration) -> Self {
        RetryDecision {
            should_retry: true,
            delay,
        }
    }

    pub fn stop() -> Self {
        RetryDecision {
            should_retry: false,
            delay: Duration::ZERO,
        }
    }
}

/// A retry predicate: `(attempt index starting at 0, last failure) -> decision`.
///
/// Each execution owns its predicate, so any state it keeps (such as the jitter
/// source) is never shared between concurrent executions.
pub type ShouldRetry<E> = Box<dyn FnMut(usize, &E) -> Result<RetryDecision, DelayOverflow> + Send>;

impl RetryStrategy {
    /// Builds the retry predicate for this strategy.
    ///
    /// The exponential family draws its jitter from a fresh OS-seeded generator.
    ///
    /// # Examples
    /// ```
    /// use std::time::Duration;
    /// use transient_retry::config::RetryStrategy;
    ///
    /// let mut should_retry = RetryStrategy::fixed(1, Duration::from_millis(50)).should_retry::<String>();
    /// let failure = "timeout".to_string();
    /// assert!(should_retry(0, &failure).unwrap().should_retry);
    /// assert!(!should_retry(1, &failure).unwrap().should_retry);
    /// ```
    pub fn should_retry<E: 'static>(&self) -> ShouldRetry<E> {
        if self.backoff().uses_jitter() {
            self.should_retry_with_rng(StdRng::from_os_rng())
        } else {
            // Never drawn from.
            self.should_retry_with_rng(StdRng::seed_from_u64(0))
        }
    }

    /// Builds the retry predicate drawing jitter from `rng`.
    ///
    /// A new sample is drawn on every call; nothing is memoized.
    pub fn should_retry_with_rng<E, R>(&self, mut rng: R) -> ShouldRetry<E>
    where
        E: 'static,
        R: Rng + Send + 'static,
    {
        let backoff = self.backoff().clone();
        Box::new(move |attempt: usize, _last_failure: &E| {
            calculate_delay(&backoff, attempt, &mut rng)
        })
    }
}

/// Calculates the decision for the retry following failed attempt `attempt`.
///
/// - `Fixed`: `interval` while `attempt < attempt_limit`.
/// - `Incremental`: `initial_interval + increment * attempt`; fails with
///   [`DelayOverflow`] if that does not fit in a `Duration`.
/// - `Exponential`: `min(min_backoff + (2^attempt - 1) * jittered(delta_backoff), max_backoff)`,
///   where the jittered delta is drawn uniformly from `delta_backoff * [0.8, 1.2]`.
pub(crate) fn calculate_delay<R: Rng>(
    backoff: &Backoff,
    attempt: usize,
    rng: &mut R,
) -> Result<RetryDecision, DelayOverflow> {
    if attempt >= backoff.attempt_limit() {
        return Ok(RetryDecision::stop());
    }

    match backoff {
        Backoff::Fixed { interval, .. } => Ok(RetryDecision::retry(*interval)),
        Backoff::Incremental {
            initial_interval,
            increment,
            ..
        } => incremental_delay(*initial_interval, *increment, attempt)
            .map(RetryDecision::retry)
            .ok_or(DelayOverflow { attempt }),
        Backoff::Exponential {
            min_backoff,
            max_backoff,
            delta_backoff,
            ..
        } => {
            let delta = exponential_delta(*delta_backoff, attempt, rng);
            Ok(RetryDecision::retry(
                min_backoff.saturating_add(delta).min(*max_backoff),
            ))
        }
    }
}

const NANOS_PER_SEC: u128 = 1_000_000_000;

/// `initial + increment * attempt`, or `None` past `Duration::MAX`.
fn incremental_delay(initial: Duration, increment: Duration, attempt: usize) -> Option<Duration> {
    let total = u128::try_from(attempt)
        .ok()
        .and_then(|steps| increment.as_nanos().checked_mul(steps))
        .and_then(|growth| initial.as_nanos().checked_add(growth))?;
    let secs = u64::try_from(total / NANOS_PER_SEC).ok()?;
    // The remainder is below one billion.
    Some(Duration::new(secs, (total % NANOS_PER_SEC) as u32))
}

fn exponential_delta<R: Rng>(delta_backoff: Duration, attempt: usize, rng: &mut R) -> Duration {
    let base = delta_backoff.as_secs_f64();
    if base == 0.0 || attempt == 0 {
        return Duration::ZERO;
    }
    let jittered = rng.random_range(base * (1.0 - JITTER_FACTOR)..=base * (1.0 + JITTER_FACTOR));
    let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
    let factor = 2f64.powi(exponent) - 1.0;
    // Anything past Duration::MAX is clamped by max_backoff anyway.
    Duration::try_from_secs_f64(factor * jittered).unwrap_or(Duration::MAX)
}
