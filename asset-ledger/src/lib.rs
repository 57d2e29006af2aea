//! Asset Ledger
//!
//! Listing & trade ledger with a simulated blockchain receipt log.
//!
//! # Architecture
//!
//! - **Marketplace**: listings and an append-only trade log
//! - **Transaction Recorder**: hash-addressed receipts with simulated block
//!   numbers, gas, and time-derived confirmations
//! - **Exchange**: pairs every marketplace change with its receipts
//! - **Single Writer**: an optional actor serializes all mutations
//!
//! # Invariants
//!
//! - A listing leaves `Listed` at most once (default fill policy)
//! - Append-only: trades and transactions are never modified or deleted
//! - Reads never fail: missing or corrupt documents read as empty
//! - Confirmations never decrease and never exceed the configured maximum

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod actor;
pub mod clock;
pub mod config;
pub mod error;
pub mod exchange;
pub mod ids;
pub mod marketplace;
pub mod metrics;
pub mod numeric;
pub mod recorder;
pub mod storage;
pub mod store;
pub mod types;

// Re-exports
pub use config::{Config, FillPolicy};
pub use error::{Error, Result};
pub use exchange::{Exchange, Receipt};
pub use ids::{AccountId, ListingId, TradeId, TxHash};
pub use marketplace::Marketplace;
pub use numeric::{CoercionPolicy, NumericInput};
pub use recorder::TransactionRecorder;
pub use storage::RocksStore;
pub use store::{DurableStore, MemoryStore};
pub use types::{
    BlockchainTransaction, ListAssetRequest, Listing, ListingStatus, RecordRequest, Trade,
    TransactionKind, Verification,
};
