//! Shared fixtures for the scenario tests

use solana_sdk::{
    pubkey::Pubkey,
    signature::{Keypair, Signer},
    transaction::Transaction,
};
use std::sync::Arc;
use std::time::Duration;

use crate::quoter::PoolState;
use crate::retry::{RetryExecutor, RetryPolicy};
use crate::test_utils::{reference_pool, MockLedgerClient, StaticPoolSource};
use crate::tx::{ExecutionMode, TradeRequest, TransactionLifecycleManager};

pub struct Harness {
    pub ledger: Arc<MockLedgerClient>,
    pub source: Arc<StaticPoolSource>,
    pub manager: TransactionLifecycleManager,
    pub signer: Keypair,
    pub mint: Pubkey,
}

/// Three attempts, 10ms doubling backoff, no jitter
pub fn fast_executor() -> RetryExecutor {
    RetryExecutor::new(
        RetryPolicy::new(
            3,
            Duration::from_millis(10),
            Duration::from_millis(100),
            2.0,
            false,
        )
        .expect("valid test policy"),
    )
}

pub fn harness() -> Harness {
    let mint = Pubkey::new_unique();
    harness_with_pool(reference_pool(mint))
}

pub fn harness_with_pool(pool: PoolState) -> Harness {
    let ledger = Arc::new(MockLedgerClient::new());
    ledger.set_block_height(1_000);
    let mint = pool.mint;
    let source = Arc::new(StaticPoolSource::new(pool));
    let manager =
        TransactionLifecycleManager::new(ledger.clone(), source.clone(), fast_executor());
    Harness {
        ledger,
        source,
        manager,
        signer: Keypair::new(),
        mint,
    }
}

impl Harness {
    pub fn request(&self, mode: ExecutionMode, amount: f64) -> TradeRequest {
        TradeRequest::new(
            mode,
            self.signer.to_base58_string(),
            self.mint.to_string(),
            amount,
        )
    }

    pub fn execute(&self, amount: f64) -> TradeRequest {
        self.request(
            ExecutionMode::Execute {
                track_finality: false,
            },
            amount,
        )
    }

    pub fn tracked(&self, amount: f64) -> TradeRequest {
        self.request(
            ExecutionMode::Execute {
                track_finality: true,
            },
            amount,
        )
    }

    pub fn signer_pubkey(&self) -> Pubkey {
        self.signer.pubkey()
    }
}

/// Program ids of a compiled transaction, in instruction order
pub fn program_ids(tx: &Transaction) -> Vec<Pubkey> {
    tx.message
        .instructions
        .iter()
        .map(|ix| tx.message.account_keys[ix.program_id_index as usize])
        .collect()
}

/// `(token_amount, sol_bound)` decoded from the trailing trade instruction
pub fn trade_args(tx: &Transaction) -> (u64, u64) {
    let ix = tx
        .message
        .instructions
        .last()
        .expect("transaction has instructions");
    let amount = u64::from_le_bytes(ix.data[8..16].try_into().expect("amount bytes"));
    let bound = u64::from_le_bytes(ix.data[16..24].try_into().expect("bound bytes"));
    (amount, bound)
}
