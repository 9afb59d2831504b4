use crate::error::{AttemptError, Outcome, RetryError};
use crate::policy::{RetryPolicy, Step};
use log::{debug, info, warn};
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};
use thiserror::Error;

/// A wait between attempts was cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("sleep was interrupted")]
pub struct Interrupted;

/// Blocks the calling thread between attempts.
///
/// Implementations must return `Err(Interrupted)` instead of resuming when the wait is
/// cancelled; the retry loop then ends with [`RetryError::Interrupted`].
pub trait Sleeper {
    fn sleep(&self, delay: Duration) -> Result<(), Interrupted>;
}

/// Sleeps with [`std::thread::sleep`]. Never interrupted.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, delay: Duration) -> Result<(), Interrupted> {
        std::thread::sleep(delay);
        Ok(())
    }
}

/// A sleeper whose waits can be cancelled from another thread.
///
/// Clones share the same interrupt flag. Once interrupted, every current and
/// future wait fails until [`reset`](InterruptibleSleeper::reset) is called.
///
/// # Example
/// ```
/// use std::time::Duration;
/// use transient_retry::synchronous::{InterruptibleSleeper, Sleeper};
///
/// let sleeper = InterruptibleSleeper::new();
/// let handle = sleeper.clone();
/// std::thread::spawn(move || handle.interrupt());
/// assert!(sleeper.sleep(Duration::from_secs(60)).is_err());
/// ```
#[derive(Debug, Clone, Default)]
pub struct InterruptibleSleeper {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl InterruptibleSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancels the current wait, if any, and every later one.
    pub fn interrupt(&self) {
        let (flag, signal) = &*self.inner;
        let mut interrupted = flag.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *interrupted = true;
        signal.notify_all();
    }

    pub fn reset(&self) {
        let (flag, _) = &*self.inner;
        *flag.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = false;
    }

    pub fn is_interrupted(&self) -> bool {
        let (flag, _) = &*self.inner;
        *flag.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Sleeper for InterruptibleSleeper {
    fn sleep(&self, delay: Duration) -> Result<(), Interrupted> {
        let (flag, signal) = &*self.inner;
        let deadline = Instant::now().checked_add(delay);
        let mut interrupted = flag.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        loop {
            if *interrupted {
                return Err(Interrupted);
            }
            let remaining = match deadline {
                Some(deadline) => deadline.saturating_duration_since(Instant::now()),
                None => Duration::MAX,
            };
            if remaining.is_zero() {
                return Ok(());
            }
            interrupted = signal
                .wait_timeout(interrupted, remaining)
                .map(|(guard, _)| guard)
                .unwrap_or_else(|poisoned| poisoned.into_inner().0);
        }
    }
}

impl<E: 'static> RetryPolicy<E> {
    /// Runs `work` until it succeeds, raises an early exit, or the policy gives up,
    /// blocking the calling thread between attempts.
    ///
    /// # Returns
    /// * `Ok(Outcome::Completed(T))` if an attempt succeeded.
    /// * `Ok(Outcome::Exited)` if the work raised an early exit without a cause.
    /// * `Err(RetryError::Failed(E))` with the original failure if it was not transient,
    ///   if the strategy refused another retry, or if it was the cause of an early exit.
    ///
    /// # Example
    /// ```
    /// use std::time::Duration;
    /// use transient_retry::{AttemptError, CatchAll, RetryError, RetryPolicy};
    ///
    /// let policy = RetryPolicy::fixed(CatchAll, 2, Duration::from_millis(5));
    /// let result = policy.execute_action(|| -> Result<(), AttemptError<&str>> {
    ///     Err(AttemptError::Failure("Temporary failure"))
    /// });
    /// assert!(matches!(result, Err(RetryError::Failed("Temporary failure"))));
    /// ```
    pub fn execute_action<F, T>(&self, work: F) -> Result<Outcome<T>, RetryError<E>>
    where
        F: FnMut() -> Result<T, AttemptError<E>>,
    {
        self.execute_action_with_sleeper(work, &ThreadSleeper)
    }

    /// Like [`execute_action`](Self::execute_action), waiting between attempts with `sleeper`.
    pub fn execute_action_with_sleeper<F, T, S>(
        &self,
        mut work: F,
        sleeper: &S,
    ) -> Result<Outcome<T>, RetryError<E>>
    where
        F: FnMut() -> Result<T, AttemptError<E>>,
        S: Sleeper + ?Sized,
    {
        let mut context = self.begin();

        loop {
            let failure = match work() {
                Ok(output) => {
                    info!("Operation succeeded after {} attempts", context.attempts());
                    return Ok(Outcome::Completed(output));
                }
                Err(AttemptError::EarlyExit(exit)) => {
                    info!(
                        "Operation requested early exit after {} attempts: {}",
                        context.attempts(),
                        exit.message()
                    );
                    return exit.into_result();
                }
                Err(AttemptError::Failure(failure)) => failure,
            };

            match context.on_failure(failure) {
                Step::Stop(err) => return Err(err),
                Step::RetryNow => {}
                Step::RetryAfter { delay, failure } => {
                    if sleeper.sleep(delay).is_err() {
                        warn!("Retry wait of {:?} was interrupted, giving up.", delay);
                        return Err(RetryError::Interrupted {
                            last_failure: Some(failure),
                        });
                    }
                }
            }
            debug!("Starting attempt {} (delay {:?})", context.attempts(), context.last_delay());
        }
    }
}
