use std::collections::HashMap;
use std::io::{Error, ErrorKind};
use std::time::Duration;

use transient_retry::{AttemptError, CatchAll, Outcome, RetryManager, RetryPolicy, RetryStrategy};

// Example 1: Fixed interval retry with a flaky operation
pub fn example_simple_retry() {
    let policy = RetryPolicy::fixed(CatchAll, 3, Duration::from_millis(200));

    let mut attempt_count = 0;

    let result = policy.execute_action(|| -> Result<&str, AttemptError<&str>> {
        attempt_count += 1;
        println!("Attempt #{}", attempt_count);

        // Simulate an operation that fails twice before succeeding
        if attempt_count < 3 {
            Err(AttemptError::Failure("Temporary error"))
        } else {
            Ok("Operation completed successfully")
        }
    });

    match result {
        Ok(Outcome::Completed(success_msg)) => println!("Success: {}", success_msg),
        Ok(Outcome::Exited) => println!("Exited early"),
        Err(error) => println!("Failed after retries: {}", error),
    }
}

// Example 2: Jittered exponential backoff, retrying only I/O errors that look transient
pub fn example_exponential_with_classifier() {
    let is_transient = |error: &Error| {
        matches!(
            error.kind(),
            ErrorKind::TimedOut | ErrorKind::ConnectionReset | ErrorKind::WouldBlock
        )
    };

    let policy = match RetryPolicy::exponential(
        is_transient,
        4,
        Duration::from_millis(50),
        Duration::from_secs(1),
        Duration::from_millis(100),
    ) {
        Ok(policy) => policy,
        Err(error) => {
            println!("Invalid configuration: {}", error);
            return;
        }
    };

    let mut counter = 0;

    let result = policy.execute_action(|| -> Result<i32, AttemptError<Error>> {
        counter += 1;
        println!("Attempt #{} with growing delay", counter);

        // Two timeouts are retried, the permission error is not
        match counter {
            1 | 2 => Err(Error::new(ErrorKind::TimedOut, "timed out").into()),
            3 => Err(Error::new(ErrorKind::PermissionDenied, "access denied").into()),
            _ => Ok(counter),
        }
    });

    match result {
        Ok(outcome) => println!("Got value: {:?}", outcome.into_option()),
        Err(error) => println!("Failed with a permanent error: {}", error),
    }
}

// Example 3: Stopping the retry loop from inside the operation
pub fn example_early_exit() {
    let policy = RetryPolicy::<String>::default_fixed();

    let mut counter = 0;

    let result = policy.execute_action(|| -> Result<(), AttemptError<String>> {
        counter += 1;
        if counter == 1 {
            return Err(AttemptError::Failure("busy".to_string()));
        }
        println!("Nothing left to do after attempt #{}, exiting", counter);
        Err(AttemptError::exit())
    });

    match result {
        Ok(Outcome::Exited) => println!("Exited cleanly"),
        Ok(Outcome::Completed(())) => println!("Completed"),
        Err(error) => println!("Failed: {}", error),
    }
}

// Example 4: Selecting strategies by name
pub fn example_registry() {
    let manager = match RetryManager::new(
        vec![
            RetryStrategy::fixed(2, Duration::from_millis(50)).with_name("quick"),
            RetryStrategy::default_exponential().with_name("patient"),
        ],
        Some("quick"),
        HashMap::from([("storage".to_string(), "patient".to_string())]),
    ) {
        Ok(manager) => manager,
        Err(error) => {
            println!("Invalid registry: {}", error);
            return;
        }
    };

    if let Ok(Some(strategy)) = manager.default_strategy_for("storage") {
        println!("storage uses '{}': {:?}", strategy.name(), strategy.backoff());
    }

    let Some(policy) = manager.policy::<&str, _>(CatchAll) else {
        println!("No default strategy");
        return;
    };

    let result = policy.execute_action(|| -> Result<(), AttemptError<&str>> {
        Err(AttemptError::Failure("still down"))
    });

    match result {
        Ok(_) => println!("Recovered"),
        Err(error) => println!("'{}' gave up: {}", policy.strategy().name(), error),
    }
}
