//! Transaction recorder
//!
//! Synthesizes an on-chain-looking receipt for every economic event handed
//! to it and keeps them in an append-only log.
//!
//! # Simulated chain
//!
//! - Hash: 32 random bytes, `0x`-prefixed hex, no binding to the payload
//! - Block number: `floor(timestamp_ms / block_interval_ms)`, so every
//!   transaction in the same interval shares a block
//! - Confirmations: stored as 1; `verify_transaction` recomputes
//!   `min(max, floor(elapsed / interval) + 1)` at read time while plain
//!   queries return the stored value untouched
//! - Gas: uniform in the configured ranges

use crate::{
    clock::{system_clock, SharedClock},
    config::RecorderConfig,
    ids::{AccountId, TxHash},
    metrics::Metrics,
    store::{load_document, save_document, SharedStore},
    types::{BlockchainTransaction, RecordRequest, TxStatus, Verification},
    Error, Result,
};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rand::{rngs::StdRng, Rng, SeedableRng};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

/// Block height for an instant
pub fn block_number_at(timestamp: DateTime<Utc>, block_interval_ms: u64) -> u64 {
    let millis = timestamp.timestamp_millis().max(0) as u64;
    millis / block_interval_ms.max(1)
}

/// Confirmations a transaction recorded at `recorded` has at `now`.
///
/// Never below 1 (even under clock skew) and never above `max`.
pub fn confirmations_at(
    recorded: DateTime<Utc>,
    now: DateTime<Utc>,
    block_interval_ms: u64,
    max: u32,
) -> u32 {
    let elapsed = (now - recorded).num_milliseconds().max(0) as u64;
    let blocks = elapsed / block_interval_ms.max(1);
    u32::try_from(blocks.saturating_add(1))
        .unwrap_or(u32::MAX)
        .min(max)
}

/// Append-only log of simulated transactions
pub struct TransactionRecorder {
    store: SharedStore,
    key: String,
    config: RecorderConfig,
    clock: SharedClock,
    /// Guards the read-modify-write cycle and the random source together
    rng: Mutex<StdRng>,
    metrics: Option<Metrics>,
}

impl std::fmt::Debug for TransactionRecorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionRecorder")
            .field("key", &self.key)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl TransactionRecorder {
    /// Create a recorder over `store`, keeping its log under `key`
    pub fn new(store: SharedStore, key: impl Into<String>, config: RecorderConfig) -> Result<Self> {
        config.validate()?;

        let rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Ok(Self {
            store,
            key: key.into(),
            config,
            clock: system_clock(),
            rng: Mutex::new(rng),
            metrics: None,
        })
    }

    /// Use a different time source
    pub fn with_clock(mut self, clock: SharedClock) -> Self {
        self.clock = clock;
        self
    }

    /// Report into `metrics`
    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Recorder configuration
    pub fn config(&self) -> &RecorderConfig {
        &self.config
    }

    fn load(&self) -> Vec<BlockchainTransaction> {
        load_document(self.store.as_ref(), &self.key, self.metrics.as_ref())
    }

    /// Record an economic event and return its receipt
    pub fn record_transaction(&self, request: RecordRequest) -> Result<BlockchainTransaction> {
        let policy = self.config.coercion;
        let amount = policy.amount("amount", request.amount.as_ref())?;
        let tokens = policy.amount("tokens", request.tokens.as_ref())?;

        let mut rng = self.rng.lock();
        let mut txns = self.load();

        let mut tx_hash = TxHash::random(&mut *rng);
        while txns.iter().any(|t| t.tx_hash == tx_hash) {
            tx_hash = TxHash::random(&mut *rng);
        }

        let timestamp = self.clock.now();
        let gas_used = rng.gen_range(self.config.gas_used_min..self.config.gas_used_max);
        let gas_fee = self.sample_fee(&mut rng);

        let txn = BlockchainTransaction {
            tx_hash,
            kind: request.kind,
            from: request.from,
            to: request.to,
            asset_type: request.asset_type,
            asset_id: request.asset_id,
            amount,
            tokens,
            metadata: request.metadata,
            timestamp,
            block_number: block_number_at(timestamp, self.config.block_interval_ms),
            confirmations: 1,
            status: TxStatus::Confirmed,
            gas_used,
            gas_fee,
        };

        txns.push(txn.clone());
        save_document(self.store.as_ref(), &self.key, &txns)?;

        if let Some(m) = &self.metrics {
            m.record_transaction();
        }

        tracing::info!(
            tx_hash = %txn.tx_hash,
            kind = %txn.kind,
            block_number = txn.block_number,
            "Transaction recorded"
        );

        Ok(txn)
    }

    /// Fee drawn in millionths so the 6-decimal rendering is exact
    fn sample_fee(&self, rng: &mut StdRng) -> String {
        let to_micros = |d: Decimal| {
            (d * Decimal::from(1_000_000))
                .trunc()
                .to_i64()
                .unwrap_or(0)
                .max(0)
        };
        let lo = to_micros(self.config.gas_fee_min);
        let hi = to_micros(self.config.gas_fee_max);
        let micros = if lo < hi { rng.gen_range(lo..hi) } else { lo };

        format!("{} {}", Decimal::new(micros, 6), self.config.fee_symbol)
    }

    /// Every recorded transaction in append order
    pub fn all_transactions(&self) -> Vec<BlockchainTransaction> {
        self.load()
    }

    /// Transactions sent or received by `account`, newest first.
    ///
    /// Confirmations are returned as stored.
    pub fn account_transactions(&self, account: &AccountId) -> Vec<BlockchainTransaction> {
        if account.is_empty() {
            return Vec::new();
        }

        let mut txns: Vec<_> = self
            .load()
            .into_iter()
            .filter(|t| &t.from == account || &t.to == account)
            .collect();
        txns.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

        tracing::debug!(account = %account, count = txns.len(), "Account transactions read");
        txns
    }

    /// Look up a transaction by hash
    pub fn transaction_by_hash(&self, tx_hash: &TxHash) -> Result<BlockchainTransaction> {
        self.load()
            .into_iter()
            .find(|t| &t.tx_hash == tx_hash)
            .ok_or_else(|| Error::TransactionNotFound(tx_hash.to_string()))
    }

    /// Confirm a transaction exists and report its current confirmations
    pub fn verify_transaction(&self, tx_hash: &TxHash) -> Result<Verification> {
        let txn = self.transaction_by_hash(tx_hash)?;
        let confirmations = confirmations_at(
            txn.timestamp,
            self.clock.now(),
            self.config.block_interval_ms,
            self.config.max_confirmations,
        );

        if let Some(m) = &self.metrics {
            m.record_verification();
        }

        Ok(Verification {
            verified: true,
            tx_hash: txn.tx_hash,
            block_number: txn.block_number,
            confirmations,
            status: txn.status,
            timestamp: txn.timestamp,
        })
    }

    /// Block explorer link for a hash
    pub fn explorer_url(&self, tx_hash: &TxHash) -> String {
        format!(
            "{}/tx/{}",
            self.config.explorer_base_url.trim_end_matches('/'),
            tx_hash
        )
    }

    /// Drop the whole transaction log
    pub fn clear_blockchain_data(&self) -> Result<()> {
        let _guard = self.rng.lock();
        self.store.remove(&self.key)?;
        tracing::info!(key = %self.key, "Transaction log cleared");
        Ok(())
    }
}
