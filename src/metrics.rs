//! Metrics collection and export module

use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, Opts, Registry, TextEncoder};
use std::time::Instant;

use crate::errors::TraderError;

/// Engine metrics registry
pub struct Metrics {
    registry: Registry,

    // Counters
    pub trades_total: IntCounter,
    pub trades_success: IntCounter,
    pub trades_failed: IntCounter,
    pub trades_simulated: IntCounter,
    pub validation_rejections: IntCounter,
    pub retries_total: IntCounter,
    pub blockhash_refreshes: IntCounter,

    // Histograms
    pub trade_latency: Histogram,
    pub confirmation_latency: Histogram,
}

impl Metrics {
    /// Create new metrics instance
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let trades_total = IntCounter::with_opts(Opts::new(
            "trades_total",
            "Total number of buy/sell calls",
        ))?;

        let trades_success = IntCounter::with_opts(Opts::new(
            "trades_success",
            "Number of trades executed on-chain",
        ))?;

        let trades_failed =
            IntCounter::with_opts(Opts::new("trades_failed", "Number of failed trades"))?;

        let trades_simulated = IntCounter::with_opts(Opts::new(
            "trades_simulated",
            "Number of trades that completed a dry run",
        ))?;

        let validation_rejections = IntCounter::with_opts(Opts::new(
            "validation_rejections",
            "Trades rejected before any network call",
        ))?;

        let retries_total = IntCounter::with_opts(Opts::new(
            "retries_total",
            "Backoff sleeps taken by the retry executor",
        ))?;

        let blockhash_refreshes = IntCounter::with_opts(Opts::new(
            "blockhash_refreshes",
            "Fresh blockhash fetches performed by the cache",
        ))?;

        let trade_latency = Histogram::with_opts(
            HistogramOpts::new("trade_latency_seconds", "End-to-end trade latency")
                .buckets(vec![0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0]),
        )?;

        let confirmation_latency = Histogram::with_opts(
            HistogramOpts::new(
                "confirmation_latency_seconds",
                "Time from submission to finalized status",
            )
            .buckets(vec![1.0, 2.0, 5.0, 10.0, 20.0, 30.0, 60.0]),
        )?;

        registry.register(Box::new(trades_total.clone()))?;
        registry.register(Box::new(trades_success.clone()))?;
        registry.register(Box::new(trades_failed.clone()))?;
        registry.register(Box::new(trades_simulated.clone()))?;
        registry.register(Box::new(validation_rejections.clone()))?;
        registry.register(Box::new(retries_total.clone()))?;
        registry.register(Box::new(blockhash_refreshes.clone()))?;
        registry.register(Box::new(trade_latency.clone()))?;
        registry.register(Box::new(confirmation_latency.clone()))?;

        Ok(Self {
            registry,
            trades_total,
            trades_success,
            trades_failed,
            trades_simulated,
            validation_rejections,
            retries_total,
            blockhash_refreshes,
            trade_latency,
            confirmation_latency,
        })
    }

    /// Get the registry for exporting
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Record a failed trade, counting validation rejections separately
    pub fn record_failure(&self, error: &TraderError) {
        self.trades_failed.inc();
        if matches!(error, TraderError::Validation(_)) {
            self.validation_rejections.inc();
        }
    }

    /// Render all metrics in the Prometheus text format
    pub fn gather_text(&self) -> anyhow::Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics")
            .field("trades_total", &self.trades_total.get())
            .field("retries_total", &self.retries_total.get())
            .finish_non_exhaustive()
    }
}

/// Timer helper for measuring operation duration
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn observe_duration(&self, histogram: &Histogram) {
        histogram.observe(self.start.elapsed().as_secs_f64());
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}
