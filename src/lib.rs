//! Curve Trader - bonding-curve trading engine library
//!
//! Quotes, builds, simulates, submits and tracks buy/sell transactions
//! against a constant-product bonding-curve program, retrying every network
//! call under a bounded backoff policy.

pub mod blockhash;
pub mod config;
pub mod data_source;
pub mod errors;
pub mod ledger;
pub mod metrics;
pub mod observability;
pub mod quoter;
pub mod retry;
pub mod signer;
pub mod structured_logging;
pub mod test_utils;
pub mod tx;

#[cfg(test)]
mod tests;

// Re-export commonly used types
pub use blockhash::BlockhashCache;
pub use errors::{ErrorKind, TraderError, TraderResult, ValidationError};
pub use quoter::{PoolState, Quote, TradeSide};
pub use retry::{RetryExecutor, RetryPolicy};
pub use tx::{ExecutionMode, TradeRequest, TransactionLifecycleManager, TransactionOutcome};
