//! Retry Module
//!
//! Error classification and bounded exponential backoff shared by every
//! network call in the engine.

pub mod classifier;
pub mod executor;

pub use classifier::{classify, classify_failure, Classification};
pub use executor::{PolicyOverrides, RetryExecutor, RetryPolicy, RetryPredicate};
