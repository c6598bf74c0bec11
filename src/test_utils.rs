//! Test Utilities Module
//!
//! In-memory doubles for the ledger and pool data source, used by the unit
//! and scenario tests. Every call is counted so tests can assert exactly
//! which network operations a trade performed.
//!
//! These utilities are only compiled when running tests or when the
//! `test_utils` feature is enabled.

#![cfg(any(test, feature = "test_utils"))]

use async_trait::async_trait;
use parking_lot::Mutex;
use solana_sdk::{
    hash::Hash,
    pubkey::Pubkey,
    signature::Signature,
    transaction::Transaction,
};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::data_source::PoolDataSource;
use crate::errors::{TraderError, TraderResult};
use crate::ledger::{
    AccountInfo, ConfirmationLevel, LatestBlockhash, LedgerClient, SignatureState,
    SimulationResult, TransactionRecord,
};
use crate::quoter::PoolState;

/// Blocks a fresh hash stays valid when no explicit pair was queued
const DEFAULT_VALIDITY_BLOCKS: u64 = 150;

#[derive(Default)]
struct LedgerState {
    accounts: HashMap<Pubkey, AccountInfo>,
    block_height: u64,
    blockhashes: VecDeque<LatestBlockhash>,
    blockhash_failures: VecDeque<TraderError>,
    simulation: SimulationResult,
    submit_failures: VecDeque<TraderError>,
    statuses: VecDeque<Option<SignatureState>>,
    last_transaction: Option<Transaction>,
}

#[derive(Default)]
struct CallCounts {
    account_lookups: AtomicUsize,
    height_reads: AtomicUsize,
    blockhash_fetches: AtomicUsize,
    simulations: AtomicUsize,
    submissions: AtomicUsize,
    status_polls: AtomicUsize,
    transaction_fetches: AtomicUsize,
}

/// Scriptable [`LedgerClient`] that never touches the network.
///
/// Queued values (blockhashes, statuses) are consumed in order; the last one
/// queued keeps being returned once the queue is down to a single entry.
pub struct MockLedgerClient {
    state: Mutex<LedgerState>,
    calls: CallCounts,
    signature: Signature,
}

impl MockLedgerClient {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(LedgerState::default()),
            calls: CallCounts::default(),
            signature: Signature::from([7u8; 64]),
        }
    }

    /// Signature returned by every successful submission
    pub fn signature(&self) -> Signature {
        self.signature
    }

    pub fn set_block_height(&self, height: u64) {
        self.state.lock().block_height = height;
    }

    pub fn push_blockhash(&self, hash: Hash, last_valid_block_height: u64) {
        self.state.lock().blockhashes.push_back(LatestBlockhash {
            hash,
            last_valid_block_height,
        });
    }

    /// Fail the next `times` blockhash fetches with `err`
    pub fn fail_blockhash_with(&self, err: TraderError, times: usize) {
        let mut state = self.state.lock();
        for _ in 0..times {
            state.blockhash_failures.push_back(err.clone());
        }
    }

    pub fn set_account(&self, address: Pubkey, info: AccountInfo) {
        self.state.lock().accounts.insert(address, info);
    }

    pub fn set_simulation(&self, result: SimulationResult) {
        self.state.lock().simulation = result;
    }

    /// Fail the next `times` submissions with `err`
    pub fn fail_submit_with(&self, err: TraderError, times: usize) {
        let mut state = self.state.lock();
        for _ in 0..times {
            state.submit_failures.push_back(err.clone());
        }
    }

    pub fn push_status(&self, status: Option<SignatureState>) {
        self.state.lock().statuses.push_back(status);
    }

    pub fn last_transaction(&self) -> Option<Transaction> {
        self.state.lock().last_transaction.clone()
    }

    pub fn account_lookups(&self) -> usize {
        self.calls.account_lookups.load(Ordering::SeqCst)
    }

    pub fn height_reads(&self) -> usize {
        self.calls.height_reads.load(Ordering::SeqCst)
    }

    pub fn blockhash_fetches(&self) -> usize {
        self.calls.blockhash_fetches.load(Ordering::SeqCst)
    }

    pub fn simulations(&self) -> usize {
        self.calls.simulations.load(Ordering::SeqCst)
    }

    pub fn submissions(&self) -> usize {
        self.calls.submissions.load(Ordering::SeqCst)
    }

    pub fn status_polls(&self) -> usize {
        self.calls.status_polls.load(Ordering::SeqCst)
    }

    pub fn transaction_fetches(&self) -> usize {
        self.calls.transaction_fetches.load(Ordering::SeqCst)
    }

    /// Every ledger call made so far
    pub fn total_calls(&self) -> usize {
        self.account_lookups()
            + self.height_reads()
            + self.blockhash_fetches()
            + self.simulations()
            + self.submissions()
            + self.status_polls()
            + self.transaction_fetches()
    }
}

impl Default for MockLedgerClient {
    fn default() -> Self {
        Self::new()
    }
}

fn next_or_last<T: Clone>(queue: &mut VecDeque<T>) -> Option<T> {
    if queue.len() > 1 {
        queue.pop_front()
    } else {
        queue.front().cloned()
    }
}

#[async_trait]
impl LedgerClient for MockLedgerClient {
    async fn get_account_info(&self, address: &Pubkey) -> TraderResult<Option<AccountInfo>> {
        self.calls.account_lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self.state.lock().accounts.get(address).cloned())
    }

    async fn get_block_height(&self) -> TraderResult<u64> {
        self.calls.height_reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.state.lock().block_height)
    }

    async fn get_latest_blockhash(&self) -> TraderResult<LatestBlockhash> {
        self.calls.blockhash_fetches.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock();
        if let Some(err) = state.blockhash_failures.pop_front() {
            return Err(err);
        }
        let height = state.block_height;
        Ok(next_or_last(&mut state.blockhashes).unwrap_or_else(|| LatestBlockhash {
            hash: Hash::new_unique(),
            last_valid_block_height: height + DEFAULT_VALIDITY_BLOCKS,
        }))
    }

    async fn simulate(&self, tx: &Transaction) -> TraderResult<SimulationResult> {
        self.calls.simulations.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock();
        state.last_transaction = Some(tx.clone());
        Ok(state.simulation.clone())
    }

    async fn submit_and_confirm(&self, tx: &Transaction) -> TraderResult<Signature> {
        self.calls.submissions.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock();
        state.last_transaction = Some(tx.clone());
        if let Some(err) = state.submit_failures.pop_front() {
            return Err(err);
        }
        Ok(self.signature)
    }

    async fn get_signature_status(
        &self,
        _signature: &Signature,
    ) -> TraderResult<Option<SignatureState>> {
        self.calls.status_polls.fetch_add(1, Ordering::SeqCst);
        Ok(next_or_last(&mut self.state.lock().statuses).flatten())
    }

    async fn get_transaction(
        &self,
        signature: &Signature,
        _level: ConfirmationLevel,
    ) -> TraderResult<TransactionRecord> {
        self.calls.transaction_fetches.fetch_add(1, Ordering::SeqCst);
        Ok(TransactionRecord {
            signature: *signature,
            slot: 42,
            block_time: Some(1_700_000_000),
            fee: Some(5_000),
            err: None,
            logs: vec!["Program log: Instruction: Buy".to_string()],
        })
    }
}

/// [`PoolDataSource`] returning one fixed snapshot (or one fixed error)
pub struct StaticPoolSource {
    pool: Result<PoolState, TraderError>,
    fetches: AtomicUsize,
}

impl StaticPoolSource {
    pub fn new(pool: PoolState) -> Self {
        Self {
            pool: Ok(pool),
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn failing(err: TraderError) -> Self {
        Self {
            pool: Err(err),
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PoolDataSource for StaticPoolSource {
    async fn fetch_pool_state(&self, _mint: &Pubkey) -> TraderResult<PoolState> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.pool.clone()
    }
}

/// Reference pool: 1000 SOL-side reserve, 100_000 token-side reserve,
/// liquidity 500
pub fn reference_pool(mint: Pubkey) -> PoolState {
    PoolState {
        mint,
        bonding_curve: Pubkey::new_unique(),
        associated_bonding_curve: Pubkey::new_unique(),
        virtual_sol_reserves: 1_000,
        virtual_token_reserves: 100_000,
        price_ref: 0.01,
        liquidity: 500.0,
    }
}

/// Status that reached `level` without an error
pub fn status_at(level: ConfirmationLevel) -> Option<SignatureState> {
    Some(SignatureState {
        err: None,
        confirmation: Some(level),
    })
}
