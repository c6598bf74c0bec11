use async_trait::async_trait;
use solana_client::{
    client_error::{ClientError, ClientErrorKind},
    nonblocking::rpc_client::RpcClient,
    rpc_config::RpcTransactionConfig,
    rpc_request::{RpcError, RpcResponseErrorData},
};
use solana_sdk::{
    commitment_config::CommitmentConfig, pubkey::Pubkey, signature::Signature,
    transaction::Transaction,
};
use solana_transaction_status::UiTransactionEncoding;
use std::time::Duration;
use tracing::debug;

use super::{
    AccountInfo, ConfirmationLevel, LatestBlockhash, LedgerClient, SignatureState,
    SimulationResult, TransactionRecord,
};
use crate::errors::{TraderError, TraderResult};

/// [`LedgerClient`] over the Solana JSON-RPC nonblocking client
pub struct RpcLedgerClient {
    rpc: RpcClient,
    commitment: CommitmentConfig,
    endpoint: String,
}

impl RpcLedgerClient {
    pub fn new(url: impl Into<String>, commitment: CommitmentConfig, timeout: Duration) -> Self {
        let endpoint = url.into();
        Self {
            rpc: RpcClient::new_with_timeout_and_commitment(endpoint.clone(), timeout, commitment),
            commitment,
            endpoint,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl std::fmt::Debug for RpcLedgerClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcLedgerClient")
            .field("endpoint", &self.endpoint)
            .field("commitment", &self.commitment.commitment)
            .finish()
    }
}

/// Submission failures that carry a transaction-level cause become
/// `Transaction` errors; transport failures stay `Rpc` so they can be retried.
fn map_submit_error(err: ClientError) -> TraderError {
    match err.kind() {
        ClientErrorKind::TransactionError(tx_err) => {
            TraderError::transaction("submit", format!("{tx_err:?}"), Vec::new(), None)
        }
        ClientErrorKind::RpcError(RpcError::RpcResponseError {
            message,
            data: RpcResponseErrorData::SendTransactionPreflightFailure(result),
            ..
        }) => TraderError::transaction(
            "submit",
            message.clone(),
            result.logs.clone().unwrap_or_default(),
            None,
        ),
        _ => TraderError::from_client_error(&err),
    }
}

#[async_trait]
impl LedgerClient for RpcLedgerClient {
    async fn get_account_info(&self, address: &Pubkey) -> TraderResult<Option<AccountInfo>> {
        let response = self
            .rpc
            .get_account_with_commitment(address, self.commitment)
            .await?;
        Ok(response.value.map(|account| AccountInfo {
            lamports: account.lamports,
            owner: account.owner,
            data_len: account.data.len(),
        }))
    }

    async fn get_block_height(&self) -> TraderResult<u64> {
        Ok(self.rpc.get_block_height().await?)
    }

    async fn get_latest_blockhash(&self) -> TraderResult<LatestBlockhash> {
        let (hash, last_valid_block_height) = self
            .rpc
            .get_latest_blockhash_with_commitment(self.commitment)
            .await?;
        Ok(LatestBlockhash {
            hash,
            last_valid_block_height,
        })
    }

    async fn simulate(&self, tx: &Transaction) -> TraderResult<SimulationResult> {
        let response = self.rpc.simulate_transaction(tx).await?;
        let value = response.value;
        Ok(SimulationResult {
            err: value.err.map(|e| format!("{e:?}")),
            logs: value.logs.unwrap_or_default(),
            units_consumed: value.units_consumed,
        })
    }

    async fn submit_and_confirm(&self, tx: &Transaction) -> TraderResult<Signature> {
        let signature = self
            .rpc
            .send_and_confirm_transaction(tx)
            .await
            .map_err(map_submit_error)?;
        debug!(endpoint = %self.endpoint, signature = %signature, "Transaction confirmed by node");
        Ok(signature)
    }

    async fn get_signature_status(
        &self,
        signature: &Signature,
    ) -> TraderResult<Option<SignatureState>> {
        let response = self.rpc.get_signature_statuses(&[*signature]).await?;
        let status = response.value.into_iter().next().flatten();
        Ok(status.map(|s| SignatureState {
            err: s.err.map(|e| format!("{e:?}")),
            confirmation: s.confirmation_status.map(ConfirmationLevel::from),
        }))
    }

    async fn get_transaction(
        &self,
        signature: &Signature,
        level: ConfirmationLevel,
    ) -> TraderResult<TransactionRecord> {
        let config = RpcTransactionConfig {
            encoding: Some(UiTransactionEncoding::Json),
            commitment: Some(level.into()),
            max_supported_transaction_version: Some(0),
        };
        let confirmed = self
            .rpc
            .get_transaction_with_config(signature, config)
            .await?;
        let meta = confirmed.transaction.meta;

        Ok(TransactionRecord {
            signature: *signature,
            slot: confirmed.slot,
            block_time: confirmed.block_time,
            fee: meta.as_ref().map(|m| m.fee),
            err: meta
                .as_ref()
                .and_then(|m| m.err.as_ref().map(|e| format!("{e:?}"))),
            logs: meta
                .and_then(|m| Option::<Vec<String>>::from(m.log_messages))
                .unwrap_or_default(),
        })
    }
}
