//! Retry policies and their shared store

mod policy;
mod store;

pub use policy::{AttemptOutcome, BackoffStrategy, RetryPolicy};
pub use store::RetryPolicyStore;
