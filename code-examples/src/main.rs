use async_std::task::block_on;

use crate::asynchronous::{example_async_execution, example_concurrent_executions, example_execute_future};
use crate::synchronous::{
    example_early_exit, example_exponential_with_classifier, example_registry, example_simple_retry,
};

mod asynchronous;
mod synchronous;

fn sync_examples() {
    println!("Running simple retry example:");
    example_simple_retry();

    println!("\nRunning exponential backoff with classifier example:");
    example_exponential_with_classifier();

    println!("\nRunning early exit example:");
    example_early_exit();

    println!("\nRunning registry example:");
    example_registry();
}

fn async_examples() {
    println!("\nRunning scheduled async execution example:");
    block_on(example_async_execution());

    println!("\nRunning concurrent executions example:");
    block_on(example_concurrent_executions());

    println!("\nRunning async operation example:");
    block_on(example_execute_future());
}

fn main() {
    sync_examples();
    async_examples();
}
