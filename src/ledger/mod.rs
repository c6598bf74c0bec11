//! Ledger Client Module
//!
//! The capability the engine needs from a ledger node, expressed as a trait
//! so the lifecycle manager can run against the RPC adapter or an in-memory
//! double.

use async_trait::async_trait;
use serde::Serialize;
use solana_sdk::{
    commitment_config::CommitmentConfig, hash::Hash, pubkey::Pubkey, signature::Signature,
    transaction::Transaction,
};
use solana_transaction_status::TransactionConfirmationStatus;

use crate::errors::TraderResult;

pub mod rpc_ledger;

pub use rpc_ledger::RpcLedgerClient;

/// Subset of on-chain account data the engine inspects
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountInfo {
    pub lamports: u64,
    pub owner: Pubkey,
    pub data_len: usize,
}

/// Reference hash plus the block height after which it is rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LatestBlockhash {
    pub hash: Hash,
    pub last_valid_block_height: u64,
}

/// Dry-run result. `err` is `None` when the simulated execution succeeded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimulationResult {
    pub err: Option<String>,
    pub logs: Vec<String>,
    pub units_consumed: Option<u64>,
}

/// Confirmation tiers, weakest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfirmationLevel {
    Processed,
    Confirmed,
    Finalized,
}

impl From<TransactionConfirmationStatus> for ConfirmationLevel {
    fn from(status: TransactionConfirmationStatus) -> Self {
        match status {
            TransactionConfirmationStatus::Processed => ConfirmationLevel::Processed,
            TransactionConfirmationStatus::Confirmed => ConfirmationLevel::Confirmed,
            TransactionConfirmationStatus::Finalized => ConfirmationLevel::Finalized,
        }
    }
}

impl From<ConfirmationLevel> for CommitmentConfig {
    fn from(level: ConfirmationLevel) -> Self {
        match level {
            ConfirmationLevel::Processed => CommitmentConfig::processed(),
            ConfirmationLevel::Confirmed => CommitmentConfig::confirmed(),
            ConfirmationLevel::Finalized => CommitmentConfig::finalized(),
        }
    }
}

/// Status of a submitted signature
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureState {
    pub err: Option<String>,
    pub confirmation: Option<ConfirmationLevel>,
}

/// Finalized transaction record returned to the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionRecord {
    #[serde(serialize_with = "serialize_signature")]
    pub signature: Signature,
    pub slot: u64,
    pub block_time: Option<i64>,
    pub fee: Option<u64>,
    pub err: Option<String>,
    pub logs: Vec<String>,
}

pub(crate) fn serialize_signature<S>(sig: &Signature, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(&sig.to_string())
}

/// Ledger node capability
#[async_trait]
pub trait LedgerClient: Send + Sync {
    async fn get_account_info(&self, address: &Pubkey) -> TraderResult<Option<AccountInfo>>;

    /// Current block height, the unit of [`LatestBlockhash::last_valid_block_height`]
    async fn get_block_height(&self) -> TraderResult<u64>;

    async fn get_latest_blockhash(&self) -> TraderResult<LatestBlockhash>;

    async fn simulate(&self, tx: &Transaction) -> TraderResult<SimulationResult>;

    /// Submit a fully signed transaction and wait for the node's confirmation
    async fn submit_and_confirm(&self, tx: &Transaction) -> TraderResult<Signature>;

    async fn get_signature_status(&self, signature: &Signature)
        -> TraderResult<Option<SignatureState>>;

    async fn get_transaction(
        &self,
        signature: &Signature,
        level: ConfirmationLevel,
    ) -> TraderResult<TransactionRecord>;
}
