use std::time::Duration;
use thiserror::Error;

/// Message carried by an [`EarlyExit`] created without an explicit one.
pub const DEFAULT_EARLY_EXIT_MESSAGE: &str = "The action has exceeded its defined retry limit.";

/// Errors raised while building retry strategies, policies or a [`RetryManager`](crate::RetryManager).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("min backoff {min:?} is greater than max backoff {max:?}")]
    InvalidBackoffRange { min: Duration, max: Duration },

    #[error("retry strategy '{0}' is registered more than once")]
    DuplicateStrategy(String),

    #[error("retry strategy '{0}' is not registered")]
    UnknownStrategy(String),

    #[error("retry strategy name must not be blank")]
    BlankName,
}

/// Delay arithmetic for the given attempt did not fit in a [`Duration`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("retry delay for attempt {attempt} overflowed")]
pub struct DelayOverflow {
    pub attempt: usize,
}

/// A command raised by a unit of work to stop the retry loop immediately.
///
/// The signal is never classified and never counted against the attempt limit.
/// Without a cause the execution finishes with [`Outcome::Exited`]; with a cause,
/// the cause is surfaced as [`RetryError::Failed`].
#[derive(Debug, Error)]
#[error("{message}")]
pub struct EarlyExit<E> {
    message: String,
    #[source]
    cause: Option<E>,
}

impl<E> EarlyExit<E> {
    /// An early exit that resolves to [`Outcome::Exited`].
    pub fn new() -> Self {
        EarlyExit {
            message: DEFAULT_EARLY_EXIT_MESSAGE.to_string(),
            cause: None,
        }
    }

    /// An early exit that re-surfaces `cause` as the execution's failure.
    pub fn with_cause(cause: E) -> Self {
        EarlyExit {
            message: DEFAULT_EARLY_EXIT_MESSAGE.to_string(),
            cause: Some(cause),
        }
    }

    /// Replaces the message and returns the modified signal.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn cause(&self) -> Option<&E> {
        self.cause.as_ref()
    }

    pub fn into_cause(self) -> Option<E> {
        self.cause
    }

    /// Resolves the signal into the terminal result of an execution.
    pub(crate) fn into_result<T>(self) -> Result<Outcome<T>, RetryError<E>> {
        match self.cause {
            Some(cause) => Err(RetryError::Failed(cause)),
            None => Ok(Outcome::Exited),
        }
    }
}

impl<E> Default for EarlyExit<E> {
    fn default() -> Self {
        Self::new()
    }
}

/// The error side of a single attempt of a unit of work.
///
/// Ordinary failures convert with `?` through the `From<E>` impl; use
/// [`AttemptError::exit`] or [`AttemptError::exit_with`] to stop the loop early.
///
/// # Example
/// ```
/// use transient_retry::{AttemptError, Outcome, RetryPolicy};
///
/// let policy = RetryPolicy::<std::io::Error>::default_fixed();
/// let result = policy.execute_action(|| -> Result<u8, AttemptError<std::io::Error>> {
///     Err(AttemptError::exit())
/// });
/// assert!(matches!(result, Ok(Outcome::Exited)));
/// ```
#[derive(Debug)]
pub enum AttemptError<E> {
    /// A failure handed to the classifier and the retry predicate.
    Failure(E),
    /// Stop retrying now.
    EarlyExit(EarlyExit<E>),
}

impl<E> AttemptError<E> {
    pub fn exit() -> Self {
        AttemptError::EarlyExit(EarlyExit::new())
    }

    pub fn exit_with(cause: E) -> Self {
        AttemptError::EarlyExit(EarlyExit::with_cause(cause))
    }
}

impl<E> From<E> for AttemptError<E> {
    fn from(failure: E) -> Self {
        AttemptError::Failure(failure)
    }
}

/// Successful end of an execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    /// The unit of work returned a value.
    Completed(T),
    /// The unit of work raised an [`EarlyExit`] without a cause.
    Exited,
}

impl<T> Outcome<T> {
    pub fn into_option(self) -> Option<T> {
        match self {
            Outcome::Completed(value) => Some(value),
            Outcome::Exited => None,
        }
    }

    pub fn is_exited(&self) -> bool {
        matches!(self, Outcome::Exited)
    }
}

/// Terminal failure of an execution.
///
/// The failure a unit of work produced is always surfaced as is; no synthetic
/// "limit exceeded" error replaces it.
#[derive(Debug, Error)]
pub enum RetryError<E> {
    /// A non-transient failure, the last transient failure once the strategy stopped,
    /// or the cause carried by an [`EarlyExit`].
    #[error("{0}")]
    Failed(E),

    /// The wait before the next attempt was cancelled.
    #[error("retry wait was interrupted")]
    Interrupted { last_failure: Option<E> },

    /// The strategy could not compute the delay for `attempt`.
    #[error("retry delay for attempt {attempt} overflowed")]
    DelayOverflow {
        attempt: usize,
        #[source]
        source: E,
    },
}

impl<E> RetryError<E> {
    /// The failure that ended the execution, if one was observed.
    pub fn failure(&self) -> Option<&E> {
        match self {
            RetryError::Failed(failure) => Some(failure),
            RetryError::Interrupted { last_failure } => last_failure.as_ref(),
            RetryError::DelayOverflow { source, .. } => Some(source),
        }
    }

    pub fn into_failure(self) -> Option<E> {
        match self {
            RetryError::Failed(failure) => Some(failure),
            RetryError::Interrupted { last_failure } => last_failure,
            RetryError::DelayOverflow { source, .. } => Some(source),
        }
    }

    pub fn is_interrupted(&self) -> bool {
        matches!(self, RetryError::Interrupted { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_early_exit_without_cause_is_exited() {
        let exit: EarlyExit<&str> = EarlyExit::new();
        assert_eq!(exit.message(), DEFAULT_EARLY_EXIT_MESSAGE);
        let result: Result<Outcome<i32>, RetryError<&str>> = exit.into_result();
        assert!(matches!(result, Ok(Outcome::Exited)));
    }

    #[test]
    fn test_early_exit_with_cause_fails_with_cause() {
        let exit = EarlyExit::with_cause("disk full").with_message("abort");
        assert_eq!(exit.message(), "abort");
        assert_eq!(exit.cause(), Some(&"disk full"));
        let result: Result<Outcome<i32>, RetryError<&str>> = exit.into_result();
        match result {
            Err(RetryError::Failed(cause)) => assert_eq!(cause, "disk full"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_attempt_error_from_failure() {
        fn op() -> Result<(), AttemptError<std::fmt::Error>> {
            Err::<(), _>(std::fmt::Error)?;
            Ok(())
        }
        assert!(matches!(op(), Err(AttemptError::Failure(std::fmt::Error))));
    }

    #[test]
    fn test_retry_error_exposes_failure() {
        let err: RetryError<&str> = RetryError::Interrupted {
            last_failure: Some("timeout"),
        };
        assert!(err.is_interrupted());
        assert_eq!(err.failure(), Some(&"timeout"));
        assert_eq!(RetryError::Failed("boom").into_failure(), Some("boom"));
        assert_eq!(RetryError::<&str>::Failed("boom").to_string(), "boom");
    }

    #[test]
    fn test_outcome_into_option() {
        assert_eq!(Outcome::Completed(3).into_option(), Some(3));
        assert_eq!(Outcome::<i32>::Exited.into_option(), None);
        assert!(Outcome::<i32>::Exited.is_exited());
    }
}
