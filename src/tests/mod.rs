//! Crate-internal scenario tests driving the lifecycle manager against the
//! in-memory ledger and pool doubles.

mod concurrency_tests;
mod confirmation_tests;
mod test_helpers;
