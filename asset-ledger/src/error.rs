//! Error types for the asset ledger

use crate::types::ListingStatus;
use thiserror::Error;

/// Result type for ledger operations
pub type Result<T> = std::result::Result<T, Error>;

/// Ledger errors
#[derive(Error, Debug)]
pub enum Error {
    /// Listing ID does not resolve
    #[error("Listing not found: {0}")]
    ListingNotFound(String),

    /// Listing exists but is already terminal
    #[error("Listing {listing_id} is no longer open (status: {status})")]
    ListingUnavailable {
        /// Listing that was targeted
        listing_id: String,
        /// Its current status
        status: ListingStatus,
    },

    /// Transaction hash does not resolve
    #[error("Transaction not found: {0}")]
    TransactionNotFound(String),

    /// Rejected input (strict coercion only)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Storage error (RocksDB or another durable store)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Concurrency error (actor mailbox closed, etc.)
    #[error("Concurrency error: {0}")]
    Concurrency(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Metrics registry error
    #[error("Metrics error: {0}")]
    Metrics(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// True for the lookup failures a caller can act on
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Error::ListingNotFound(_) | Error::TransactionNotFound(_)
        )
    }
}

impl From<rocksdb::Error> for Error {
    fn from(err: rocksdb::Error) -> Self {
        Error::Storage(err.to_string())
    }
}

impl From<prometheus::Error> for Error {
    fn from(err: prometheus::Error) -> Self {
        Error::Metrics(err.to_string())
    }
}

impl From<String> for Error {
    fn from(msg: String) -> Self {
        Error::Other(msg)
    }
}

impl From<&str> for Error {
    fn from(msg: &str) -> Self {
        Error::Other(msg.to_string())
    }
}
