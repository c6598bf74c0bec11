//! Reference-hash cache
//!
//! Holds one `{hash, last_valid_block_height}` pair. The pair is stored as a
//! single `Copy` value behind a lock, so readers see either the old pair or
//! the new pair, never a mix. Refreshes are serialised; a reader that finds
//! the slot expired while another task is refreshing waits for that refresh
//! and reuses its result instead of fetching again.

use parking_lot::RwLock;
use solana_sdk::hash::Hash;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

use crate::errors::{TraderError, TraderResult};
use crate::ledger::{LatestBlockhash, LedgerClient};
use crate::metrics::Metrics;
use crate::retry::RetryExecutor;

#[derive(Default)]
pub struct BlockhashCache {
    slot: RwLock<Option<LatestBlockhash>>,
    refresh_lock: Mutex<()>,
    metrics: Option<Arc<Metrics>>,
}

impl BlockhashCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Cached pair without any network call
    pub fn peek(&self) -> Option<LatestBlockhash> {
        *self.slot.read()
    }

    /// Drop the cached pair so the next `get` fetches
    pub fn invalidate(&self) {
        *self.slot.write() = None;
    }

    /// Current reference hash, refreshed when absent or expired. Both ledger
    /// reads go through `executor` so they follow the caller's retry policy.
    ///
    /// Never returns a hash whose `last_valid_block_height` has been reached.
    pub async fn get(
        &self,
        ledger: &dyn LedgerClient,
        executor: &RetryExecutor,
    ) -> TraderResult<Hash> {
        let height = executor
            .execute("get_block_height", || ledger.get_block_height())
            .await
            .map_err(as_rpc_error)?;

        if let Some(cached) = self.valid_at(height) {
            return Ok(cached.hash);
        }

        let _guard = self.refresh_lock.lock().await;

        // Another task may have refreshed while we waited for the lock
        if let Some(cached) = self.valid_at(height) {
            return Ok(cached.hash);
        }

        let fresh = executor
            .execute("get_latest_blockhash", || ledger.get_latest_blockhash())
            .await
            .map_err(as_rpc_error)?;

        if fresh.last_valid_block_height <= height {
            return Err(TraderError::rpc(format!(
                "ledger returned blockhash {} already expired at height {} (valid until {})",
                fresh.hash, height, fresh.last_valid_block_height
            )));
        }

        *self.slot.write() = Some(fresh);
        if let Some(metrics) = &self.metrics {
            metrics.blockhash_refreshes.inc();
        }
        debug!(
            hash = %fresh.hash,
            height,
            last_valid_block_height = fresh.last_valid_block_height,
            "Refreshed cached blockhash"
        );

        Ok(fresh.hash)
    }

    fn valid_at(&self, height: u64) -> Option<LatestBlockhash> {
        self.peek()
            .filter(|cached| height < cached.last_valid_block_height)
    }
}

impl std::fmt::Debug for BlockhashCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockhashCache")
            .field("cached", &self.peek())
            .finish()
    }
}

/// Blockhash failures surface as `Rpc`, including retry exhaustion
fn as_rpc_error(err: TraderError) -> TraderError {
    match err {
        TraderError::Retry {
            attempts,
            last_message,
        } => TraderError::rpc(format!(
            "blockhash refresh failed after {attempts} attempts: {last_message}"
        )),
        TraderError::Api { status, message } => TraderError::Rpc { status, message },
        other => other,
    }
}
