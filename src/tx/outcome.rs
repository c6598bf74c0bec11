use serde::Serialize;
use solana_sdk::signature::Signature;
use std::time::Duration;

use crate::errors::{ErrorKind, TraderError};
use crate::ledger::{serialize_signature, TransactionRecord};
use crate::retry::PolicyOverrides;

/// Whether a trade is dry-run or sent to the ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    Simulate,
    Execute {
        /// Poll the submitted signature until it is finalized
        track_finality: bool,
    },
}

/// Caller input for a single buy or sell
#[derive(Clone)]
pub struct TradeRequest {
    pub mode: ExecutionMode,
    pub signer_secret: String,
    /// Mint address of the token being traded
    pub target: String,
    /// SOL in for a buy, tokens in for a sell
    pub amount: f64,
    /// Priority fee in SOL; the manager default applies when `None`
    pub priority_fee: Option<f64>,
    pub slippage: Option<f64>,
    pub policy_overrides: Option<PolicyOverrides>,
    /// Finality-tracking budget; the manager default applies when `None`
    pub confirm_timeout: Option<Duration>,
    /// Overall wall-clock budget for the whole call
    pub deadline: Option<Duration>,
}

impl TradeRequest {
    pub fn new(
        mode: ExecutionMode,
        signer_secret: impl Into<String>,
        target: impl Into<String>,
        amount: f64,
    ) -> Self {
        Self {
            mode,
            signer_secret: signer_secret.into(),
            target: target.into(),
            amount,
            priority_fee: None,
            slippage: None,
            policy_overrides: None,
            confirm_timeout: None,
            deadline: None,
        }
    }

    pub fn with_priority_fee(mut self, fee: f64) -> Self {
        self.priority_fee = Some(fee);
        self
    }

    pub fn with_slippage(mut self, slippage: f64) -> Self {
        self.slippage = Some(slippage);
        self
    }

    pub fn with_policy_overrides(mut self, overrides: PolicyOverrides) -> Self {
        self.policy_overrides = Some(overrides);
        self
    }

    pub fn with_confirm_timeout(mut self, timeout: Duration) -> Self {
        self.confirm_timeout = Some(timeout);
        self
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }
}

// Key material never reaches logs
impl std::fmt::Debug for TradeRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TradeRequest")
            .field("mode", &self.mode)
            .field("signer_secret", &"<redacted>")
            .field("target", &self.target)
            .field("amount", &self.amount)
            .field("priority_fee", &self.priority_fee)
            .field("slippage", &self.slippage)
            .field("policy_overrides", &self.policy_overrides)
            .field("confirm_timeout", &self.confirm_timeout)
            .field("deadline", &self.deadline)
            .finish()
    }
}

/// Terminal result of a buy or sell call
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TransactionOutcome {
    Executed {
        #[serde(serialize_with = "serialize_signature")]
        signature: Signature,
        expected_output: f64,
        /// Present only when finality tracking was requested
        #[serde(skip_serializing_if = "Option::is_none")]
        record: Option<TransactionRecord>,
    },
    Simulated {
        logs: Vec<String>,
        expected_output: f64,
    },
    Failed {
        kind: ErrorKind,
        detail: String,
    },
}

impl TransactionOutcome {
    pub fn signature(&self) -> Option<&Signature> {
        match self {
            Self::Executed { signature, .. } => Some(signature),
            _ => None,
        }
    }

    pub fn expected_output(&self) -> Option<f64> {
        match self {
            Self::Executed {
                expected_output, ..
            }
            | Self::Simulated {
                expected_output, ..
            } => Some(*expected_output),
            Self::Failed { .. } => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

impl From<TraderError> for TransactionOutcome {
    fn from(err: TraderError) -> Self {
        Self::Failed {
            kind: err.kind(),
            detail: err.to_string(),
        }
    }
}
