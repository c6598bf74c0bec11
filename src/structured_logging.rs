//! Structured logging for trade lifecycle events

use crate::errors::TraderError;
use crate::observability::CorrelationId;

/// Structured logger for one trade call
#[derive(Debug, Clone)]
pub struct TradeLogger {
    correlation_id: CorrelationId,
}

impl TradeLogger {
    pub fn new(correlation_id: CorrelationId) -> Self {
        Self { correlation_id }
    }

    pub fn log_attempt(&self, operation: &str, mint: &str, amount: f64, simulate: bool) {
        tracing::info!(
            correlation_id = %self.correlation_id,
            operation = %operation,
            mint = %mint,
            amount = %amount,
            simulate = %simulate,
            "Starting trade"
        );
    }

    pub fn log_quote(&self, operation: &str, expected_output: f64, price_impact: f64, sol_bound: u64) {
        tracing::debug!(
            correlation_id = %self.correlation_id,
            operation = %operation,
            expected_output = %expected_output,
            price_impact = %price_impact,
            sol_bound = %sol_bound,
            "Quote computed"
        );
    }

    pub fn log_simulated(&self, operation: &str, log_lines: usize, latency_ms: u64) {
        tracing::info!(
            correlation_id = %self.correlation_id,
            operation = %operation,
            log_lines = %log_lines,
            latency_ms = %latency_ms,
            "Trade simulation succeeded"
        );
    }

    pub fn log_success(&self, operation: &str, sig: &str, finalized: bool, latency_ms: u64) {
        tracing::info!(
            correlation_id = %self.correlation_id,
            operation = %operation,
            signature = %sig,
            finalized = %finalized,
            latency_ms = %latency_ms,
            "Trade transaction successful"
        );
    }

    pub fn log_failure(&self, operation: &str, error: &TraderError, latency_ms: u64) {
        tracing::warn!(
            correlation_id = %self.correlation_id,
            operation = %operation,
            category = error.category(),
            error = %error,
            latency_ms = %latency_ms,
            "Trade failed"
        );
    }
}
