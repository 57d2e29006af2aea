//! Core types for the ledger
//!
//! Field names serialize in camelCase and timestamps as Unix milliseconds,
//! so persisted documents keep the shape the dashboard has always stored.

use crate::ids::{AccountId, ListingId, TradeId, TxHash};
use crate::numeric::NumericInput;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Listing lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ListingStatus {
    /// Open for purchase
    Listed,
    /// Bought (terminal)
    Filled,
    /// Withdrawn by the seller (terminal)
    Cancelled,
}

impl ListingStatus {
    /// Check if the listing accepts no further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(self, ListingStatus::Filled | ListingStatus::Cancelled)
    }
}

impl fmt::Display for ListingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ListingStatus::Listed => "Listed",
            ListingStatus::Filled => "Filled",
            ListingStatus::Cancelled => "Cancelled",
        };
        f.write_str(s)
    }
}

/// A seller's offer of a share of a tokenized asset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    /// Listing identity
    pub listing_id: ListingId,
    /// Seller account
    #[serde(default)]
    pub seller_id: AccountId,
    /// Asset being sold
    #[serde(default)]
    pub asset_id: String,
    /// Asset class (Gold, RealEstate, ...)
    #[serde(default)]
    pub asset_type: String,
    /// Free-form quantity description ("10g", "2 units")
    #[serde(default)]
    pub quantity: String,
    /// Token count
    #[serde(default, with = "lenient_float")]
    pub tokens: Decimal,
    /// Asking price
    #[serde(default, with = "lenient_float")]
    pub price: Decimal,
    /// Share of the asset on offer, 1..=100
    #[serde(default = "full_share", with = "lenient_float")]
    pub percentage: Decimal,
    /// Lifecycle state
    pub status: ListingStatus,
    /// Creation time
    #[serde(with = "chrono::serde::ts_milliseconds", alias = "timestamp")]
    pub created_at: DateTime<Utc>,
    /// Set when filled
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "chrono::serde::ts_milliseconds_option"
    )]
    pub filled_at: Option<DateTime<Utc>>,
    /// Set when cancelled
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "chrono::serde::ts_milliseconds_option"
    )]
    pub cancelled_at: Option<DateTime<Utc>>,
}

/// Decimal fields written as JSON numbers.
///
/// Older documents may hold the raw form value instead: a numeric string,
/// or `null` where the UI produced `NaN`. Those read as the parsed value or
/// zero rather than failing the whole document.
mod lenient_float {
    use rust_decimal::Decimal;
    use serde::{Deserialize, Deserializer};
    use std::str::FromStr;

    pub use rust_decimal::serde::float::serialize;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Stored {
        Number(#[serde(with = "rust_decimal::serde::float")] Decimal),
        Text(String),
        Null(()),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Decimal, D::Error> {
        Ok(match Stored::deserialize(deserializer)? {
            Stored::Number(d) => d,
            Stored::Text(s) => Decimal::from_str(s.trim()).unwrap_or_default(),
            Stored::Null(()) => Decimal::ZERO,
        })
    }
}

fn full_share() -> Decimal {
    Decimal::ONE_HUNDRED
}

impl Listing {
    /// Check if the listing can still be bought or cancelled
    pub fn is_open(&self) -> bool {
        !self.status.is_terminal()
    }
}

/// Immutable record of a fill against a listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trade {
    /// Trade identity
    pub trade_id: TradeId,
    /// Listing that was filled
    pub listing_id: ListingId,
    /// Asset traded
    #[serde(default)]
    pub asset_id: String,
    /// Asset class
    #[serde(default)]
    pub asset_type: String,
    /// Seller account
    #[serde(default)]
    pub seller_id: AccountId,
    /// Buyer account
    #[serde(default)]
    pub buyer_id: AccountId,
    /// Execution price
    #[serde(default, with = "lenient_float")]
    pub price: Decimal,
    /// Quantity description copied from the listing
    #[serde(default)]
    pub quantity: String,
    /// Token count copied from the listing
    #[serde(default, with = "lenient_float")]
    pub tokens: Decimal,
    /// Execution time
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
}

impl Trade {
    /// Check if the account took either side of this trade
    pub fn involves(&self, account: &AccountId) -> bool {
        &self.buyer_id == account || &self.seller_id == account
    }
}

/// Open tag describing the economic event behind a transaction
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionKind(String);

impl TransactionKind {
    /// A listing was created
    pub const ASSET_LISTING: &'static str = "ASSET_LISTING";
    /// Seller side of a fill
    pub const ASSET_SALE: &'static str = "ASSET_SALE";
    /// Buyer side of a fill
    pub const ASSET_PURCHASE: &'static str = "ASSET_PURCHASE";
    /// A listing was withdrawn
    pub const LISTING_CANCEL: &'static str = "LISTING_CANCEL";
    /// Tokens minted for an asset
    pub const TOKEN_MINT: &'static str = "TOKEN_MINT";
    /// A loan was opened
    pub const LOAN_CREATE: &'static str = "LOAN_CREATE";

    /// Create from any tag
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    /// Get as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TransactionKind {
    fn from(tag: &str) -> Self {
        Self::new(tag)
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Settlement state of a recorded transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxStatus {
    /// Recorded transactions are confirmed immediately
    Confirmed,
}

/// Locally synthesized receipt mimicking an on-chain transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockchainTransaction {
    /// Transaction hash
    pub tx_hash: TxHash,
    /// Event tag
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    /// Sending address
    #[serde(default)]
    pub from: AccountId,
    /// Receiving address
    #[serde(default)]
    pub to: AccountId,
    /// Asset class
    #[serde(default)]
    pub asset_type: String,
    /// Asset reference
    #[serde(default)]
    pub asset_id: String,
    /// Monetary amount
    #[serde(default, with = "lenient_float")]
    pub amount: Decimal,
    /// Token count
    #[serde(default, with = "lenient_float")]
    pub tokens: Decimal,
    /// Correlation data (`listingId`, `tradeId`, ...)
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    /// Recording time
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    /// Simulated block height
    pub block_number: u64,
    /// Confirmations as stored at creation
    pub confirmations: u32,
    /// Always confirmed
    pub status: TxStatus,
    /// Simulated gas consumption
    #[serde(default)]
    pub gas_used: u64,
    /// Simulated fee, e.g. `"0.004512 ETH"`
    #[serde(default)]
    pub gas_fee: String,
}

/// Input to `record_transaction`
#[derive(Debug, Clone)]
pub struct RecordRequest {
    /// Event tag
    pub kind: TransactionKind,
    /// Sending address
    pub from: AccountId,
    /// Receiving address
    pub to: AccountId,
    /// Asset class
    pub asset_type: String,
    /// Asset reference
    pub asset_id: String,
    /// Monetary amount, default 0
    pub amount: Option<NumericInput>,
    /// Token count, default 0
    pub tokens: Option<NumericInput>,
    /// Correlation data
    pub metadata: HashMap<String, String>,
}

impl RecordRequest {
    /// Start a request with no amount, tokens, or metadata
    pub fn new(
        kind: impl Into<TransactionKind>,
        from: impl Into<AccountId>,
        to: impl Into<AccountId>,
    ) -> Self {
        Self {
            kind: kind.into(),
            from: from.into(),
            to: to.into(),
            asset_type: String::new(),
            asset_id: String::new(),
            amount: None,
            tokens: None,
            metadata: HashMap::new(),
        }
    }

    /// Set the asset reference
    pub fn asset(mut self, asset_type: impl Into<String>, asset_id: impl Into<String>) -> Self {
        self.asset_type = asset_type.into();
        self.asset_id = asset_id.into();
        self
    }

    /// Set amount and tokens
    pub fn value(
        mut self,
        amount: impl Into<NumericInput>,
        tokens: impl Into<NumericInput>,
    ) -> Self {
        self.amount = Some(amount.into());
        self.tokens = Some(tokens.into());
        self
    }

    /// Add a metadata entry
    pub fn meta(mut self, key: impl Into<String>, value: impl fmt::Display) -> Self {
        self.metadata.insert(key.into(), value.to_string());
        self
    }
}

/// Input to `list_asset`
#[derive(Debug, Clone, Default)]
pub struct ListAssetRequest {
    /// Seller account
    pub seller_id: AccountId,
    /// Asset being sold
    pub asset_id: String,
    /// Asset class
    pub asset_type: String,
    /// Free-form quantity description
    pub quantity: String,
    /// Token count, default 0
    pub tokens: Option<NumericInput>,
    /// Asking price, default 0
    pub price: Option<NumericInput>,
    /// Share on offer, default 100
    pub percentage: Option<NumericInput>,
}

/// Outcome of `verify_transaction`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Verification {
    /// Always true; unknown hashes are errors
    pub verified: bool,
    /// Verified hash
    pub tx_hash: TxHash,
    /// Block the transaction landed in
    pub block_number: u64,
    /// Confirmations as of the verification time
    pub confirmations: u32,
    /// Settlement state
    pub status: TxStatus,
    /// Recording time
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
}
