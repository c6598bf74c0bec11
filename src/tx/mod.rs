//! Trade transaction pipeline
//!
//! ## Architecture
//!
//! - **instructions**: program addresses, trade-instruction encoding and
//!   ordered instruction planning
//! - **request**: the unsigned per-call transaction request
//! - **outcome**: caller-facing request and terminal outcome types
//! - **lifecycle**: the buy/sell state machine tying quoting, building,
//!   simulation, submission and finality tracking together
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use curve_trader::data_source::HttpPoolDataSource;
//! use curve_trader::ledger::RpcLedgerClient;
//! use curve_trader::retry::RetryExecutor;
//! use curve_trader::tx::{ExecutionMode, TradeRequest, TransactionLifecycleManager};
//! use solana_sdk::commitment_config::CommitmentConfig;
//! use std::time::Duration;
//!
//! # async fn example(secret: String) -> curve_trader::errors::TraderResult<()> {
//! let executor = RetryExecutor::default();
//! let ledger = RpcLedgerClient::new(
//!     "https://api.mainnet-beta.solana.com",
//!     CommitmentConfig::confirmed(),
//!     Duration::from_secs(30),
//! );
//! let data = HttpPoolDataSource::new(
//!     "https://frontend-api.pump.fun",
//!     Duration::from_secs(10),
//!     executor.clone(),
//! )?;
//! let manager = TransactionLifecycleManager::new(Arc::new(ledger), Arc::new(data), executor);
//!
//! let request = TradeRequest::new(
//!     ExecutionMode::Execute { track_finality: true },
//!     secret,
//!     "So11111111111111111111111111111111111111112",
//!     0.1,
//! )
//! .with_slippage(0.05);
//! let outcome = manager.buy(request).await?;
//! # Ok(())
//! # }
//! ```

pub mod instructions;
pub mod lifecycle;
pub mod outcome;
pub mod request;

pub use instructions::{
    plan_trade_instructions, sanity_check_ix_order, InstructionPlan, ProgramAccounts,
};
pub use lifecycle::{ManagerSettings, TransactionLifecycleManager};
pub use outcome::{ExecutionMode, TradeRequest, TransactionOutcome};
pub use request::TransactionRequest;
