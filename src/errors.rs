//! Error taxonomy for the trading engine
//!
//! Every fallible operation in the crate returns [`TraderError`]. Callers
//! branch on [`TraderError::kind`] rather than matching on message text:
//!
//! - **Validation**: bad caller input, detected before any network call
//! - **Api**: price/reserve data source failure (carries the HTTP status)
//! - **Rpc**: ledger-node failure not tied to a submitted transaction
//! - **Transaction**: a built transaction failed simulation or execution
//! - **Retry**: the retry executor exhausted its attempt budget

use serde::{Deserialize, Serialize};
use solana_client::client_error::{ClientError, ClientErrorKind};
use solana_sdk::signature::Signature;
use thiserror::Error;

/// Crate-wide result alias
pub type TraderResult<T> = std::result::Result<T, TraderError>;

/// Tag identifying which branch of the taxonomy an error belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Api,
    Rpc,
    Transaction,
    Retry,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ErrorKind::Validation => "validation",
            ErrorKind::Api => "api",
            ErrorKind::Rpc => "rpc",
            ErrorKind::Transaction => "transaction",
            ErrorKind::Retry => "retry",
        };
        f.write_str(label)
    }
}

/// Caller-input failures. Each variant is a distinct rejection reason.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("signer secret is empty")]
    EmptySecret,

    #[error("signer secret could not be decoded: {0}")]
    InvalidSecret(String),

    #[error("target identifier is empty")]
    EmptyTarget,

    #[error("target identifier is not a valid mint address: {0}")]
    InvalidTarget(String),

    #[error("amount must be a positive finite number, got {0}")]
    NonPositiveAmount(f64),

    #[error("slippage must be within [0, 1], got {0}")]
    SlippageOutOfRange(f64),

    #[error("priority fee must be a non-negative finite number, got {0}")]
    InvalidPriorityFee(f64),

    #[error("amount {0} is too small to trade at current reserves")]
    DustAmount(f64),

    #[error("invalid retry policy: {0}")]
    InvalidPolicy(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Comprehensive error type for all engine operations
#[derive(Debug, Clone, Error)]
pub enum TraderError {
    /// Rejected caller input (never retried)
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Data-source fetch failure
    #[error("API error: {message} (status: {status:?})")]
    Api {
        status: Option<u16>,
        message: String,
    },

    /// Ledger node failure not tied to a specific submitted transaction
    #[error("RPC error: {message} (status: {status:?})")]
    Rpc {
        status: Option<u16>,
        message: String,
    },

    /// A specific transaction failed simulation or on-chain execution
    #[error("Transaction error in {operation}: {message}")]
    Transaction {
        operation: String,
        message: String,
        logs: Vec<String>,
        signature: Option<Signature>,
    },

    /// Retry budget exhausted on transient failures
    #[error("Retry exhausted after {attempts} attempts: {last_message}")]
    Retry {
        attempts: u32,
        last_message: String,
    },

    /// Unclassified internal failure. Public entry points re-wrap it as
    /// `Transaction` via [`TraderError::scoped_to`].
    #[error("Internal error: {0}")]
    Internal(String),
}

impl TraderError {
    /// Taxonomy tag. `Internal` reports as `Transaction`, the kind it is
    /// re-wrapped into at the public surface.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::Api { .. } => ErrorKind::Api,
            Self::Rpc { .. } => ErrorKind::Rpc,
            Self::Transaction { .. } | Self::Internal(_) => ErrorKind::Transaction,
            Self::Retry { .. } => ErrorKind::Retry,
        }
    }

    /// Label for metrics and log fields
    pub fn category(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Api { .. } => "api",
            Self::Rpc { .. } => "rpc",
            Self::Transaction { .. } => "transaction",
            Self::Retry { .. } => "retry",
            Self::Internal(_) => "internal",
        }
    }

    /// Status code carried by network-kind failures
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } | Self::Rpc { status, .. } => *status,
            _ => None,
        }
    }

    /// The underlying message without the kind prefix
    pub fn message(&self) -> String {
        match self {
            Self::Validation(v) => v.to_string(),
            Self::Api { message, .. }
            | Self::Rpc { message, .. }
            | Self::Transaction { message, .. } => message.clone(),
            Self::Retry { last_message, .. } => last_message.clone(),
            Self::Internal(message) => message.clone(),
        }
    }

    /// Re-wrap an unclassified failure as a `Transaction` error scoped to
    /// `operation`. Already-classified errors pass through unchanged.
    pub fn scoped_to(self, operation: &str) -> Self {
        match self {
            Self::Internal(message) => Self::Transaction {
                operation: operation.to_string(),
                message,
                logs: Vec::new(),
                signature: None,
            },
            other => other,
        }
    }
}

// Convenience constructors for common error scenarios
impl TraderError {
    pub fn api(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    pub fn rpc(message: impl Into<String>) -> Self {
        Self::Rpc {
            status: None,
            message: message.into(),
        }
    }

    pub fn rpc_with_status(status: u16, message: impl Into<String>) -> Self {
        Self::Rpc {
            status: Some(status),
            message: message.into(),
        }
    }

    pub fn transaction(
        operation: impl Into<String>,
        message: impl Into<String>,
        logs: Vec<String>,
        signature: Option<Signature>,
    ) -> Self {
        Self::Transaction {
            operation: operation.into(),
            message: message.into(),
            logs,
            signature,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Convert a Solana client failure, lifting the HTTP status out of the
    /// transport layer when it exposes one.
    pub fn from_client_error(err: &ClientError) -> Self {
        match err.kind() {
            ClientErrorKind::Reqwest(inner) => Self::Rpc {
                status: inner.status().map(|s| s.as_u16()),
                message: reqwest_message(inner),
            },
            _ => Self::Rpc {
                status: None,
                message: err.to_string(),
            },
        }
    }
}

impl From<ClientError> for TraderError {
    fn from(err: ClientError) -> Self {
        Self::from_client_error(&err)
    }
}

impl From<reqwest::Error> for TraderError {
    fn from(err: reqwest::Error) -> Self {
        Self::Api {
            status: err.status().map(|s| s.as_u16()),
            message: reqwest_message(&err),
        }
    }
}

/// reqwest's top-level message hides the cause ("error sending request");
/// the source chain carries the connection-reset / DNS text classification needs.
fn reqwest_message(err: &reqwest::Error) -> String {
    let mut message = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(inner) = source {
        message.push_str(": ");
        message.push_str(&inner.to_string());
        source = inner.source();
    }
    if err.is_timeout() {
        message.push_str(" (timed out)");
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TraderError::api(Some(404), "coin not found");
        assert_eq!(err.to_string(), "API error: coin not found (status: Some(404))");

        let err = TraderError::Retry {
            attempts: 3,
            last_message: "socket hang up".to_string(),
        };
        assert_eq!(err.to_string(), "Retry exhausted after 3 attempts: socket hang up");
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            TraderError::from(ValidationError::EmptySecret).kind(),
            ErrorKind::Validation
        );
        assert_eq!(TraderError::rpc("down").kind(), ErrorKind::Rpc);
        assert_eq!(TraderError::internal("boom").kind(), ErrorKind::Transaction);
        assert_eq!(TraderError::internal("boom").category(), "internal");
    }

    #[test]
    fn test_scoped_to_wraps_internal_only() {
        let wrapped = TraderError::internal("signing failed").scoped_to("buy");
        match wrapped {
            TraderError::Transaction {
                operation, message, ..
            } => {
                assert_eq!(operation, "buy");
                assert_eq!(message, "signing failed");
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let untouched = TraderError::api(Some(500), "upstream").scoped_to("sell");
        assert_eq!(untouched.kind(), ErrorKind::Api);
        assert_eq!(untouched.status(), Some(500));
    }

    #[test]
    fn test_message_strips_prefix() {
        let err = TraderError::rpc_with_status(503, "service unavailable");
        assert_eq!(err.message(), "service unavailable");
        assert_eq!(
            TraderError::from(ValidationError::SlippageOutOfRange(1.5)).message(),
            "slippage must be within [0, 1], got 1.5"
        );
    }
}
