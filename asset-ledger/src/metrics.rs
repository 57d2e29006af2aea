//! Metrics collection for observability
//!
//! # Metrics
//!
//! - `asset_ledger_listings_total` - Listings created
//! - `asset_ledger_trades_total` - Trades executed
//! - `asset_ledger_cancellations_total` - Listings cancelled
//! - `asset_ledger_rejected_fills_total` - Buys refused on terminal listings
//! - `asset_ledger_transactions_total` - Transactions recorded
//! - `asset_ledger_verifications_total` - Verifications served
//! - `asset_ledger_corrupt_documents_total` - Unreadable documents replaced by empty ones

use prometheus::{Encoder, IntCounter, Registry, TextEncoder};
use std::sync::Arc;

/// Metrics collector
#[derive(Clone)]
pub struct Metrics {
    /// Listings created
    pub listings_total: IntCounter,

    /// Trades executed
    pub trades_total: IntCounter,

    /// Listings cancelled
    pub cancellations_total: IntCounter,

    /// Buys refused on terminal listings
    pub rejected_fills: IntCounter,

    /// Transactions recorded
    pub transactions_total: IntCounter,

    /// Verifications served
    pub verifications_total: IntCounter,

    /// Corrupt documents recovered as empty
    pub corrupt_documents: IntCounter,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics")
            .field("listings_total", &self.listings_total.get())
            .field("trades_total", &self.trades_total.get())
            .field("transactions_total", &self.transactions_total.get())
            .finish_non_exhaustive()
    }
}

impl Metrics {
    /// Create new metrics collector on its own registry
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let counter = |name: &str, help: &str| -> prometheus::Result<IntCounter> {
            let c = IntCounter::new(name, help)?;
            registry.register(Box::new(c.clone()))?;
            Ok(c)
        };

        Ok(Self {
            listings_total: counter("asset_ledger_listings_total", "Listings created")?,
            trades_total: counter("asset_ledger_trades_total", "Trades executed")?,
            cancellations_total: counter(
                "asset_ledger_cancellations_total",
                "Listings cancelled",
            )?,
            rejected_fills: counter(
                "asset_ledger_rejected_fills_total",
                "Buys refused on terminal listings",
            )?,
            transactions_total: counter(
                "asset_ledger_transactions_total",
                "Transactions recorded",
            )?,
            verifications_total: counter(
                "asset_ledger_verifications_total",
                "Verifications served",
            )?,
            corrupt_documents: counter(
                "asset_ledger_corrupt_documents_total",
                "Unreadable documents replaced by empty ones",
            )?,
            registry,
        })
    }

    /// Record listing creation
    pub fn record_listing(&self) {
        self.listings_total.inc();
    }

    /// Record trade execution
    pub fn record_trade(&self) {
        self.trades_total.inc();
    }

    /// Record cancellation
    pub fn record_cancellation(&self) {
        self.cancellations_total.inc();
    }

    /// Record a refused fill
    pub fn record_rejected_fill(&self) {
        self.rejected_fills.inc();
    }

    /// Record transaction
    pub fn record_transaction(&self) {
        self.transactions_total.inc();
    }

    /// Record verification
    pub fn record_verification(&self) {
        self.verifications_total.inc();
    }

    /// Record corrupt document recovery
    pub fn record_corrupt_document(&self) {
        self.corrupt_documents.inc();
    }

    /// Get metrics registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Render in the Prometheus text format
    pub fn render(&self) -> String {
        let mut buf = Vec::new();
        if let Err(e) = TextEncoder::new().encode(&self.registry.gather(), &mut buf) {
            tracing::warn!(error = %e, "Failed to encode metrics");
            return String::new();
        }
        String::from_utf8(buf).unwrap_or_default()
    }
}
