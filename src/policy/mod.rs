use crate::classifier::{CatchAll, Ignore, TransientClassifier};
use crate::config::RetryStrategy;
use crate::error::{ConfigError, DelayOverflow, RetryError};
use crate::strategies::ShouldRetry;
use log::{error, warn};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// A retry policy: one [`TransientClassifier`] paired with one [`RetryStrategy`].
///
/// The policy is read-only while executing and can be shared by concurrent callers;
/// every execution gets its own attempt counter and retry predicate.
///
/// # Example
/// ```
/// use std::time::Duration;
/// use transient_retry::{AttemptError, CatchAll, Outcome, RetryPolicy, RetryStrategy};
///
/// let policy = RetryPolicy::new(CatchAll, RetryStrategy::fixed(3, Duration::from_millis(1)));
/// let mut calls = 0;
/// let result = policy.execute_action(|| -> Result<&str, AttemptError<&str>> {
///     calls += 1;
///     if calls < 3 { Err(AttemptError::Failure("flaky")) } else { Ok("done") }
/// });
/// assert_eq!(result.unwrap(), Outcome::Completed("done"));
/// assert_eq!(calls, 3);
/// ```
pub struct RetryPolicy<E> {
    classifier: Arc<dyn TransientClassifier<E>>,
    strategy: RetryStrategy,
}

impl<E> Clone for RetryPolicy<E> {
    fn clone(&self) -> Self {
        RetryPolicy {
            classifier: Arc::clone(&self.classifier),
            strategy: self.strategy.clone(),
        }
    }
}

impl<E> fmt::Debug for RetryPolicy<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("strategy", &self.strategy)
            .finish_non_exhaustive()
    }
}

impl<E: 'static> RetryPolicy<E> {
    /// Builds a policy from a classifier and a strategy.
    pub fn new<C>(classifier: C, strategy: RetryStrategy) -> Self
    where
        C: TransientClassifier<E> + 'static,
    {
        Self::with_shared_classifier(Arc::new(classifier), strategy)
    }

    /// Builds a policy around a classifier already shared with other policies.
    pub fn with_shared_classifier(
        classifier: Arc<dyn TransientClassifier<E>>,
        strategy: RetryStrategy,
    ) -> Self {
        RetryPolicy {
            classifier,
            strategy,
        }
    }

    pub fn fixed<C>(classifier: C, attempt_limit: usize, interval: Duration) -> Self
    where
        C: TransientClassifier<E> + 'static,
    {
        Self::new(classifier, RetryStrategy::fixed(attempt_limit, interval))
    }

    pub fn incremental<C>(
        classifier: C,
        attempt_limit: usize,
        initial_interval: Duration,
        increment: Duration,
    ) -> Self
    where
        C: TransientClassifier<E> + 'static,
    {
        Self::new(
            classifier,
            RetryStrategy::incremental(attempt_limit, initial_interval, increment),
        )
    }

    /// # Errors
    /// [`ConfigError::InvalidBackoffRange`] if `min_backoff > max_backoff`.
    pub fn exponential<C>(
        classifier: C,
        attempt_limit: usize,
        min_backoff: Duration,
        max_backoff: Duration,
        delta_backoff: Duration,
    ) -> Result<Self, ConfigError>
    where
        C: TransientClassifier<E> + 'static,
    {
        let strategy =
            RetryStrategy::exponential(attempt_limit, min_backoff, max_backoff, delta_backoff)?;
        Ok(Self::new(classifier, strategy))
    }

    /// Never retries: every failure is treated as permanent.
    pub fn no_retry() -> Self {
        Self::new(Ignore, RetryStrategy::no_retry())
    }

    pub fn default_fixed() -> Self {
        Self::new(CatchAll, RetryStrategy::default_fixed())
    }

    pub fn default_incremental() -> Self {
        Self::new(CatchAll, RetryStrategy::default_incremental())
    }

    pub fn default_exponential() -> Self {
        Self::new(CatchAll, RetryStrategy::default_exponential())
    }

    pub fn strategy(&self) -> &RetryStrategy {
        &self.strategy
    }

    pub fn classifier(&self) -> &Arc<dyn TransientClassifier<E>> {
        &self.classifier
    }

    pub fn set_strategy(&mut self, strategy: RetryStrategy) {
        self.strategy = strategy;
    }

    pub fn set_classifier<C>(&mut self, classifier: C)
    where
        C: TransientClassifier<E> + 'static,
    {
        self.classifier = Arc::new(classifier);
    }

    /// Starts the decision state for one execution.
    pub(crate) fn begin(&self) -> RetryContext<E> {
        RetryContext {
            classifier: Arc::clone(&self.classifier),
            should_retry: self.strategy.should_retry(),
            fast_first_retry: self.strategy.fast_first_retry(),
            state: AttemptState::default(),
        }
    }
}

/// Single slot carrying the delay the retry predicate computed back to the loop.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct DelayHolder(Option<Duration>);

impl DelayHolder {
    pub(crate) fn set(&mut self, delay: Duration) {
        self.0 = Some(delay);
    }

    pub(crate) fn get(&self) -> Option<Duration> {
        self.0
    }
}

/// Per-execution counters. Created when an execution starts and dropped with it.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct AttemptState {
    /// Number of transient failures seen so far.
    pub(crate) attempt_count: usize,
    pub(crate) last_delay: DelayHolder,
}

/// What a loop must do after a failed attempt.
#[derive(Debug)]
pub(crate) enum Step<E> {
    /// Run the next attempt right away (fast first retry).
    RetryNow,
    /// Wait `delay`, then run the next attempt. `failure` is kept so that an
    /// interrupted wait can still surface it.
    RetryAfter { delay: Duration, failure: E },
    Stop(RetryError<E>),
}

/// Classify-then-decide logic shared by the blocking and the scheduled loop.
pub(crate) struct RetryContext<E> {
    classifier: Arc<dyn TransientClassifier<E>>,
    should_retry: ShouldRetry<E>,
    fast_first_retry: bool,
    state: AttemptState,
}

impl<E> RetryContext<E> {
    /// Attempts made so far, counting the one currently running.
    pub(crate) fn attempts(&self) -> usize {
        self.state.attempt_count + 1
    }

    /// Delay chosen before the attempt currently running, if it was a retry.
    pub(crate) fn last_delay(&self) -> Option<Duration> {
        self.state.last_delay.get()
    }

    #[cfg(test)]
    pub(crate) fn state(&self) -> &AttemptState {
        &self.state
    }

    pub(crate) fn on_failure(&mut self, failure: E) -> Step<E> {
        if !self.classifier.is_transient(&failure) {
            warn!(
                "Operation failed (attempt {}), not retryable, giving up.",
                self.attempts()
            );
            return Step::Stop(RetryError::Failed(failure));
        }

        let attempt = self.state.attempt_count;
        self.state.attempt_count += 1;

        let decision = match (self.should_retry)(attempt, &failure) {
            Ok(decision) => decision,
            Err(DelayOverflow { attempt }) => {
                error!("Retry delay for attempt {} overflowed, giving up.", attempt);
                return Step::Stop(RetryError::DelayOverflow {
                    attempt,
                    source: failure,
                });
            }
        };

        if !decision.should_retry {
            warn!("Operation failed after {} attempts, giving up.", attempt + 1);
            return Step::Stop(RetryError::Failed(failure));
        }

        self.state.last_delay.set(decision.delay);

        if attempt == 0 && self.fast_first_retry {
            warn!("Operation failed (attempt 1), retrying immediately...");
            Step::RetryNow
        } else {
            warn!(
                "Operation failed (attempt {}), retrying after {:?}...",
                attempt + 1,
                decision.delay
            );
            Step::RetryAfter {
                delay: decision.delay,
                failure,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn delays<E>(step: &Step<E>) -> Option<Duration> {
        match step {
            Step::RetryNow => Some(Duration::ZERO),
            Step::RetryAfter { delay, .. } => Some(*delay),
            Step::Stop(_) => None,
        }
    }

    #[test]
    fn test_fast_first_retry_skips_only_first_wait() {
        let policy = RetryPolicy::fixed(CatchAll, 3, Duration::from_millis(100));
        let mut context = policy.begin();

        assert!(matches!(context.on_failure("boom"), Step::RetryNow));
        assert_eq!(context.state().last_delay.get(), Some(Duration::from_millis(100)));
        let second = context.on_failure("boom");
        assert_eq!(delays(&second), Some(Duration::from_millis(100)));
        assert!(matches!(second, Step::RetryAfter { failure: "boom", .. }));
        assert_eq!(context.state().attempt_count, 2);
    }

    #[test]
    fn test_without_fast_first_retry_every_retry_waits() {
        let strategy = RetryStrategy::fixed(2, Duration::from_millis(100)).with_fast_first_retry(false);
        let policy = RetryPolicy::new(CatchAll, strategy);
        let mut context = policy.begin();

        assert!(matches!(context.on_failure("boom"), Step::RetryAfter { .. }));
        assert!(matches!(context.on_failure("boom"), Step::RetryAfter { .. }));
        assert!(matches!(
            context.on_failure("boom"),
            Step::Stop(RetryError::Failed("boom"))
        ));
    }

    #[test]
    fn test_non_transient_failure_stops_without_counting() {
        let policy = RetryPolicy::fixed(|e: &&str| e.contains("transient"), 5, Duration::ZERO);
        let mut context = policy.begin();

        assert!(matches!(
            context.on_failure("403"),
            Step::Stop(RetryError::Failed("403"))
        ));
        assert_eq!(context.state().attempt_count, 0);
        assert_eq!(context.state().last_delay.get(), None);
    }

    #[test]
    fn test_overflow_is_surfaced_with_failure() {
        let policy = RetryPolicy::incremental(CatchAll, 5, Duration::MAX, Duration::from_secs(1));
        let mut context = policy.begin();

        assert!(matches!(context.on_failure("boom"), Step::RetryNow));
        match context.on_failure("boom") {
            Step::Stop(RetryError::DelayOverflow { attempt, source }) => {
                assert_eq!(attempt, 1);
                assert_eq!(source, "boom");
            }
            other => panic!("unexpected step: {:?}", other),
        }
    }

    #[test]
    fn test_default_policies() {
        let no_retry = RetryPolicy::<&str>::no_retry();
        assert_eq!(no_retry.strategy().attempt_limit(), 0);
        assert!(!no_retry.classifier().is_transient(&"boom"));

        let exponential = RetryPolicy::<&str>::default_exponential();
        assert!(exponential.classifier().is_transient(&"boom"));
        assert_eq!(exponential.strategy(), &RetryStrategy::default_exponential());
        assert_eq!(
            RetryPolicy::<&str>::default_incremental().strategy(),
            &RetryStrategy::default_incremental()
        );
        assert_eq!(
            RetryPolicy::<&str>::default_fixed().strategy(),
            &RetryStrategy::default_fixed()
        );
    }

    #[test]
    fn test_setters_swap_strategy_and_classifier() {
        let mut policy = RetryPolicy::<&str>::default_fixed();
        policy.set_strategy(RetryStrategy::no_retry());
        policy.set_classifier(Ignore);
        assert_eq!(policy.strategy().attempt_limit(), 0);
        assert!(!policy.classifier().is_transient(&"boom"));
    }

    #[test]
    fn test_exponential_constructor_validates() {
        let result = RetryPolicy::<&str>::exponential(
            CatchAll,
            3,
            Duration::from_secs(10),
            Duration::from_secs(1),
            Duration::from_secs(1),
        );
        assert!(matches!(result, Err(ConfigError::InvalidBackoffRange { .. })));
    }
}
