use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_std::task::sleep;
use futures::future::join_all;
use rand::{Rng, rng};

use transient_retry::asynchronous::AsyncStdScheduler;
use transient_retry::{AttemptError, CatchAll, Outcome, RetryPolicy, RetryStrategy};

fn dangerous_call() -> Result<u32, AttemptError<String>> {
    if rng().random_range(0..2) == 0 {
        return Err(AttemptError::Failure("Operation failed".to_string()));
    }
    Ok(rng().random_range(0..100))
}

// Example 1: Run on the async-std pool, rescheduling after each failure
pub async fn example_async_execution() {
    let strategy = RetryStrategy::incremental(5, Duration::from_millis(50), Duration::from_millis(50))
        .with_fast_first_retry(false);
    let policy = RetryPolicy::new(CatchAll, strategy);

    let result = policy.execute_action_async(dangerous_call, AsyncStdScheduler).await;

    match result {
        Ok(Outcome::Completed(value)) => println!("Success: {}", value),
        Ok(Outcome::Exited) => println!("Exited early"),
        Err(error) => println!("Failed: {}", error),
    }
}

// Example 2: One policy shared by several concurrent executions
pub async fn example_concurrent_executions() {
    let policy = RetryPolicy::fixed(CatchAll, 5, Duration::from_millis(20));
    let attempts = Arc::new(AtomicUsize::new(0));

    let handles = (0..4).map(|_| {
        let attempts = attempts.clone();
        policy.execute_action_async(
            move || {
                attempts.fetch_add(1, Ordering::SeqCst);
                dangerous_call()
            },
            AsyncStdScheduler,
        )
    });

    for (n, result) in join_all(handles).await.into_iter().enumerate() {
        match result {
            Ok(outcome) => println!("Call {} succeeded: {:?}", n, outcome.into_option()),
            Err(e) => println!("Call {} failed: {}", n, e),
        }
    }
    println!("Total attempts: {}", attempts.load(Ordering::SeqCst));
}

async fn slow_operation() -> Result<String, AttemptError<String>> {
    sleep(Duration::from_millis(30)).await;
    dangerous_call().map(|value| format!("Slow result {}", value))
}

// Example 3: Retry an async operation inside the current task
pub async fn example_execute_future() {
    let policy = RetryPolicy::<String>::default_exponential();

    match policy.execute_future(slow_operation).await {
        Ok(outcome) => println!("Result: {:?}", outcome.into_option()),
        Err(e) => println!("Error: {}", e),
    }
}
