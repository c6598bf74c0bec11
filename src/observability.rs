//! Observability module for correlation and tracing

use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use uuid::Uuid;

/// Correlation ID tying every log line of one trade call together
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct CorrelationId(String);

impl CorrelationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CorrelationId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Per-call context for a buy or sell
#[derive(Debug, Clone)]
pub struct TradeContext {
    correlation_id: CorrelationId,
    operation: &'static str,
    started_at: Instant,
    /// Unix epoch seconds at creation
    pub timestamp: u64,
}

impl TradeContext {
    pub fn new(operation: &'static str) -> Self {
        let timestamp = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();

        Self {
            correlation_id: CorrelationId::new(),
            operation,
            started_at: Instant::now(),
            timestamp,
        }
    }

    pub fn correlation_id(&self) -> &CorrelationId {
        &self.correlation_id
    }

    pub fn operation(&self) -> &'static str {
        self.operation
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.started_at.elapsed().as_millis() as u64
    }
}
