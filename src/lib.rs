/// The `asynchronous` module runs a retry policy as a self-rescheduling task on a
/// caller-supplied [`Scheduler`](asynchronous::Scheduler). No thread is blocked while
/// waiting between attempts; the result is delivered through a [`RetryHandle`](asynchronous::RetryHandle).
pub mod asynchronous;

/// The `classifier` module decides whether a failure is transient and worth retrying.
pub mod classifier;

/// The `config` module holds the immutable retry strategy configuration, the backoff
/// families and the named defaults.
pub mod config;

/// Error and outcome types shared by both execution loops.
pub mod error;

/// The `policy` module pairs a classifier with a retry strategy and holds the decision
/// step both execution loops share.
pub mod policy;

/// A keyed store of named retry strategies.
pub mod registry;

/// The `strategies` module turns a retry strategy configuration into a retry predicate:
/// a function from `(attempt index, last failure)` to a retry decision and delay.
///
/// This module is utilized by both synchronous and asynchronous execution loops.
pub mod strategies;

/// The `synchronous` module provides the blocking retry loop and the sleepers it waits with.
pub mod synchronous;

pub use classifier::{CatchAll, Ignore, TransientClassifier};
pub use config::{Backoff, RetryStrategy};
pub use error::{AttemptError, ConfigError, EarlyExit, Outcome, RetryError};
pub use policy::RetryPolicy;
pub use registry::RetryManager;
pub use strategies::RetryDecision;
