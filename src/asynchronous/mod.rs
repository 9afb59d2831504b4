use crate::error::{AttemptError, Outcome, RetryError};
use crate::policy::{RetryContext, RetryPolicy, Step};
use futures::FutureExt;
use futures::channel::oneshot;
use log::{debug, error, info};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

/// A unit of scheduled work.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Runs tasks now or after a delay, without blocking the caller.
///
/// Implementations must not block a thread while a delayed task is pending.
/// Dropping a task instead of running it (e.g. on shutdown) is allowed: the
/// execution it belongs to then resolves to [`RetryError::Interrupted`].
pub trait Scheduler: Send + Sync + 'static {
    fn execute(&self, task: Task);

    fn schedule(&self, delay: Duration, task: Task);
}

impl<S: Scheduler + ?Sized> Scheduler for Arc<S> {
    fn execute(&self, task: Task) {
        (**self).execute(task)
    }

    fn schedule(&self, delay: Duration, task: Task) {
        (**self).schedule(delay, task)
    }
}

/// Runs attempts on the async-std blocking pool and waits with async-std timers.
#[derive(Debug, Clone, Copy, Default)]
pub struct AsyncStdScheduler;

impl Scheduler for AsyncStdScheduler {
    fn execute(&self, task: Task) {
        async_std::task::spawn_blocking(task);
    }

    fn schedule(&self, delay: Duration, task: Task) {
        async_std::task::spawn(async move {
            async_std::task::sleep(delay).await;
            async_std::task::spawn_blocking(task);
        });
    }
}

/// Runs attempts on a tokio runtime's blocking pool and waits with tokio timers.
#[cfg(feature = "tokio")]
#[derive(Debug, Clone)]
pub struct TokioScheduler {
    handle: tokio::runtime::Handle,
}

#[cfg(feature = "tokio")]
impl TokioScheduler {
    pub fn new(handle: tokio::runtime::Handle) -> Self {
        TokioScheduler { handle }
    }

    /// Uses the runtime the caller is running on.
    ///
    /// # Panics
    /// When called outside of a tokio runtime.
    pub fn current() -> Self {
        Self::new(tokio::runtime::Handle::current())
    }
}

#[cfg(feature = "tokio")]
impl Scheduler for TokioScheduler {
    fn execute(&self, task: Task) {
        self.handle.spawn_blocking(task);
    }

    fn schedule(&self, delay: Duration, task: Task) {
        let handle = self.handle.clone();
        self.handle.spawn(async move {
            tokio::time::sleep(delay).await;
            handle.spawn_blocking(task);
        });
    }
}

type Completion<T, E> = oneshot::Sender<Result<Outcome<T>, RetryError<E>>>;

/// A retry execution that resubmits itself to its scheduler after each failed,
/// retryable attempt.
///
/// The execution owns its attempt state and the only sender of its result, so the
/// result is delivered at most once and every terminal path consumes the execution.
struct AsyncExecution<T, E, F> {
    work: F,
    scheduler: Arc<dyn Scheduler>,
    context: RetryContext<E>,
    completion: Completion<T, E>,
}

impl<T, E, F> AsyncExecution<T, E, F>
where
    F: FnMut() -> Result<T, AttemptError<E>> + Send + 'static,
    T: Send + 'static,
    E: Send + 'static,
{
    fn submit(self) {
        let scheduler = Arc::clone(&self.scheduler);
        scheduler.execute(Box::new(move || self.run()));
    }

    fn submit_after(self, delay: Duration) {
        let scheduler = Arc::clone(&self.scheduler);
        scheduler.schedule(delay, Box::new(move || self.run()));
    }

    fn run(mut self) {
        if self.completion.is_canceled() {
            debug!(
                "Retry handle dropped, abandoning execution before attempt {}",
                self.context.attempts()
            );
            return;
        }

        let failure = match (self.work)() {
            Ok(output) => {
                info!("Operation succeeded after {} attempts", self.context.attempts());
                return self.complete(Ok(Outcome::Completed(output)));
            }
            Err(AttemptError::EarlyExit(exit)) => {
                info!(
                    "Operation requested early exit after {} attempts: {}",
                    self.context.attempts(),
                    exit.message()
                );
                return self.complete(exit.into_result());
            }
            Err(AttemptError::Failure(failure)) => failure,
        };

        match self.context.on_failure(failure) {
            Step::Stop(err) => self.complete(Err(err)),
            Step::RetryNow => self.submit(),
            Step::RetryAfter { delay, .. } => self.submit_after(delay),
        }
    }

    fn complete(self, result: Result<Outcome<T>, RetryError<E>>) {
        if self.completion.send(result).is_err() {
            debug!("Retry handle dropped before the execution completed");
        }
    }
}

/// The pending result of [`RetryPolicy::execute_action_async`].
///
/// Resolves exactly once. Dropping the handle stops the execution before its next
/// attempt.
#[must_use = "dropping a RetryHandle cancels the execution"]
pub struct RetryHandle<T, E> {
    receiver: oneshot::Receiver<Result<Outcome<T>, RetryError<E>>>,
}

impl<T, E> fmt::Debug for RetryHandle<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryHandle").finish_non_exhaustive()
    }
}

impl<T, E> Future for RetryHandle<T, E> {
    type Output = Result<Outcome<T>, RetryError<E>>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.receiver.poll_unpin(cx).map(|received| {
            received.unwrap_or_else(|_canceled| {
                error!("Retry execution was dropped by its scheduler before completing");
                Err(RetryError::Interrupted { last_failure: None })
            })
        })
    }
}

impl<E: Send + 'static> RetryPolicy<E> {
    /// Runs `work` on `scheduler`, rescheduling it after each retryable failure
    /// instead of blocking a thread.
    ///
    /// The policy is snapshotted at submission; later calls to
    /// [`set_strategy`](RetryPolicy::set_strategy) do not affect a running execution.
    ///
    /// # Example
    /// ```
    /// use std::time::Duration;
    /// use async_std::task::block_on;
    /// use transient_retry::asynchronous::AsyncStdScheduler;
    /// use transient_retry::{AttemptError, CatchAll, Outcome, RetryPolicy};
    ///
    /// let policy = RetryPolicy::fixed(CatchAll, 3, Duration::from_millis(10));
    /// let mut calls = 0;
    /// let handle = policy.execute_action_async(
    ///     move || -> Result<u32, AttemptError<&'static str>> {
    ///         calls += 1;
    ///         if calls < 3 { Err(AttemptError::Failure("flaky")) } else { Ok(calls) }
    ///     },
    ///     AsyncStdScheduler,
    /// );
    /// assert_eq!(block_on(handle).unwrap(), Outcome::Completed(3));
    /// ```
    pub fn execute_action_async<F, T, S>(&self, work: F, scheduler: S) -> RetryHandle<T, E>
    where
        F: FnMut() -> Result<T, AttemptError<E>> + Send + 'static,
        T: Send + 'static,
        S: Scheduler,
    {
        let (completion, receiver) = oneshot::channel();
        AsyncExecution {
            work,
            scheduler: Arc::new(scheduler),
            context: self.begin(),
            completion,
        }
        .submit();
        RetryHandle { receiver }
    }
}

impl<E: 'static> RetryPolicy<E> {
    /// Retries an asynchronous operation inside the current task, awaiting an
    /// async-std timer between attempts.
    ///
    /// Same decisions as [`execute_action`](RetryPolicy::execute_action); dropping the
    /// returned future cancels the execution at its current await point.
    ///
    /// # Example
    /// ```
    /// use std::time::Duration;
    /// use async_std::task::block_on;
    /// use transient_retry::{AttemptError, Outcome, RetryPolicy};
    ///
    /// async fn fetch() -> Result<String, AttemptError<std::io::Error>> {
    ///     Ok("payload".to_string())
    /// }
    ///
    /// let policy = RetryPolicy::<std::io::Error>::default_exponential();
    /// let result = block_on(policy.execute_future(fetch));
    /// assert_eq!(result.unwrap(), Outcome::Completed("payload".to_string()));
    /// ```
    pub async fn execute_future<F, Fut, T>(&self, mut operation: F) -> Result<Outcome<T>, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, AttemptError<E>>>,
    {
        let mut context = self.begin();

        loop {
            let failure = match operation().await {
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
                Step::RetryAfter { delay, .. } => async_std::task::sleep(delay).await,
            }
        }
    }
}
