//! Exchange orchestration layer
//!
//! Ties the marketplace and the transaction recorder together over one
//! store. Each marketplace operation that changes state is followed by the
//! matching receipts, correlated through `metadata`:
//!
//! | Operation        | Receipts                                   |
//! |------------------|--------------------------------------------|
//! | `list_asset`     | `ASSET_LISTING` seller → venue             |
//! | `buy_asset`      | `ASSET_SALE` seller → buyer, `ASSET_PURCHASE` buyer → seller |
//! | `cancel_listing` | `LISTING_CANCEL` seller → venue            |
//!
//! The two collections are not kept consistent transactionally: if
//! recording fails after a marketplace write, the marketplace change stays.
//!
//! # Example
//!
//! ```no_run
//! use asset_ledger::{Config, Exchange};
//! use asset_ledger::types::ListAssetRequest;
//!
//! fn main() -> asset_ledger::Result<()> {
//!     let exchange = Exchange::open(Config::default())?;
//!     let receipt = exchange.list_asset(ListAssetRequest {
//!         seller_id: "S1".into(),
//!         asset_id: "A1".to_string(),
//!         asset_type: "Gold".to_string(),
//!         quantity: "10g".to_string(),
//!         tokens: Some(10.into()),
//!         price: Some(1000.into()),
//!         percentage: Some(100.into()),
//!     })?;
//!     println!("{}", receipt.value.listing_id);
//!     Ok(())
//! }
//! ```

use crate::{
    clock::{system_clock, SharedClock},
    config::{Backend, Config},
    ids::{AccountId, ListingId},
    marketplace::Marketplace,
    metrics::Metrics,
    numeric::NumericInput,
    recorder::TransactionRecorder,
    storage::RocksStore,
    store::{MemoryStore, SharedStore},
    types::{BlockchainTransaction, ListAssetRequest, Listing, RecordRequest, Trade, TransactionKind},
    Result,
};
use std::sync::Arc;

/// Marketplace result plus the transactions recorded for it
#[derive(Debug, Clone, PartialEq)]
pub struct Receipt<T> {
    /// Marketplace outcome
    pub value: T,
    /// Recorder entries, in recording order
    pub transactions: Vec<BlockchainTransaction>,
}

/// Marketplace and recorder over one store
pub struct Exchange {
    store: SharedStore,
    marketplace: Marketplace,
    recorder: TransactionRecorder,
    metrics: Metrics,
    venue: AccountId,
}

impl std::fmt::Debug for Exchange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Exchange")
            .field("marketplace", &self.marketplace)
            .field("recorder", &self.recorder)
            .field("venue", &self.venue)
            .finish_non_exhaustive()
    }
}

impl Exchange {
    /// Open the configured backend
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;
        let store: SharedStore = match config.backend {
            Backend::Memory => Arc::new(MemoryStore::new()),
            Backend::RocksDb => Arc::new(RocksStore::open(&config)?),
        };
        Self::with_store(store, &config, system_clock())
    }

    /// Build over an existing store and clock
    pub fn with_store(store: SharedStore, config: &Config, clock: SharedClock) -> Result<Self> {
        config.validate()?;
        let metrics = Metrics::new()?;

        let marketplace = Marketplace::new(
            store.clone(),
            config.storage.marketplace_key.clone(),
            config.marketplace.clone(),
        )
        .with_clock(clock.clone())
        .with_metrics(metrics.clone());

        let recorder = TransactionRecorder::new(
            store.clone(),
            config.storage.transactions_key.clone(),
            config.recorder.clone(),
        )?
        .with_clock(clock)
        .with_metrics(metrics.clone());

        tracing::info!(
            service = %config.service_name,
            backend = ?config.backend,
            fill_policy = ?config.marketplace.fill_policy,
            coercion = ?config.marketplace.coercion,
            "Exchange opened"
        );

        Ok(Self {
            store,
            marketplace,
            recorder,
            metrics,
            venue: AccountId::new(config.recorder.venue_address.clone()),
        })
    }

    /// Marketplace component
    pub fn marketplace(&self) -> &Marketplace {
        &self.marketplace
    }

    /// Recorder component
    pub fn recorder(&self) -> &TransactionRecorder {
        &self.recorder
    }

    /// Shared metrics
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// List an asset and record `ASSET_LISTING`
    pub fn list_asset(&self, request: ListAssetRequest) -> Result<Receipt<Listing>> {
        let listing = self.marketplace.list_asset(request)?;

        let txn = self.recorder.record_transaction(
            RecordRequest::new(
                TransactionKind::ASSET_LISTING,
                listing.seller_id.clone(),
                self.venue.clone(),
            )
            .asset(listing.asset_type.clone(), listing.asset_id.clone())
            .value(listing.price, listing.tokens)
            .meta("listingId", &listing.listing_id)
            .meta("percentage", listing.percentage),
        )?;

        Ok(Receipt {
            value: listing,
            transactions: vec![txn],
        })
    }

    /// Buy a listing and record both sides of the fill
    pub fn buy_asset(
        &self,
        buyer: &AccountId,
        listing_id: &ListingId,
        price_override: Option<NumericInput>,
    ) -> Result<Receipt<Trade>> {
        let trade = self.marketplace.buy_asset(buyer, listing_id, price_override)?;

        let leg = |kind: &str, from: &AccountId, to: &AccountId| {
            RecordRequest::new(kind, from.clone(), to.clone())
                .asset(trade.asset_type.clone(), trade.asset_id.clone())
                .value(trade.price, trade.tokens)
                .meta("tradeId", &trade.trade_id)
                .meta("listingId", &trade.listing_id)
        };

        let sale = self.recorder.record_transaction(leg(
            TransactionKind::ASSET_SALE,
            &trade.seller_id,
            &trade.buyer_id,
        ))?;
        let purchase = self.recorder.record_transaction(leg(
            TransactionKind::ASSET_PURCHASE,
            &trade.buyer_id,
            &trade.seller_id,
        ))?;

        Ok(Receipt {
            value: trade,
            transactions: vec![sale, purchase],
        })
    }

    /// Cancel a listing and record `LISTING_CANCEL` when it succeeded
    pub fn cancel_listing(
        &self,
        listing_id: &ListingId,
        account: &AccountId,
    ) -> Result<Option<Receipt<Listing>>> {
        if !self.marketplace.cancel_listing(listing_id, account)? {
            return Ok(None);
        }
        let listing = self.marketplace.listing(listing_id)?;

        let txn = self.recorder.record_transaction(
            RecordRequest::new(
                TransactionKind::LISTING_CANCEL,
                account.clone(),
                self.venue.clone(),
            )
            .asset(listing.asset_type.clone(), listing.asset_id.clone())
            .value(0, listing.tokens)
            .meta("listingId", &listing.listing_id),
        )?;

        Ok(Some(Receipt {
            value: listing,
            transactions: vec![txn],
        }))
    }

    /// Wipe both stores
    pub fn reset(&self) -> Result<()> {
        self.marketplace.clear_all()?;
        self.recorder.clear_blockchain_data()
    }

    /// Flush the store and release it
    pub fn close(self) -> Result<()> {
        self.store.flush()?;
        tracing::info!("Exchange closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::types::ListingStatus;
    use rust_decimal::Decimal;

    fn exchange() -> Exchange {
        let mut config = Config::default();
        config.backend = Backend::Memory;
        config.recorder.rng_seed = Some(3);
        Exchange::with_store(
            Arc::new(MemoryStore::new()),
            &config,
            Arc::new(ManualClock::from_millis(1_700_000_000_000)),
        )
        .unwrap()
    }

    fn gold() -> ListAssetRequest {
        ListAssetRequest {
            seller_id: "S1".into(),
            asset_id: "A1".to_string(),
            asset_type: "Gold".to_string(),
            quantity: "10g".to_string(),
            tokens: Some(10.into()),
            price: Some(1000.into()),
            percentage: Some(100.into()),
        }
    }

    #[test]
    fn test_listing_receipt() {
        let ex = exchange();
        let receipt = ex.list_asset(gold()).unwrap();
        let txn = &receipt.transactions[0];

        assert_eq!(txn.kind.as_str(), TransactionKind::ASSET_LISTING);
        assert_eq!(txn.from.as_str(), "S1");
        assert_eq!(txn.to.as_str(), "marketplace");
        assert_eq!(txn.amount, Decimal::from(1000));
        assert_eq!(txn.metadata["listingId"], receipt.value.listing_id.as_str());
    }

    #[test]
    fn test_buy_records_both_legs() {
        let ex = exchange();
        let listing = ex.list_asset(gold()).unwrap().value;
        let receipt = ex
            .buy_asset(&"B1".into(), &listing.listing_id, None)
            .unwrap();

        let [sale, purchase] = receipt.transactions.as_slice() else {
            panic!("expected two receipts");
        };
        assert_eq!(sale.kind.as_str(), TransactionKind::ASSET_SALE);
        assert_eq!((sale.from.as_str(), sale.to.as_str()), ("S1", "B1"));
        assert_eq!(purchase.kind.as_str(), TransactionKind::ASSET_PURCHASE);
        assert_eq!((purchase.from.as_str(), purchase.to.as_str()), ("B1", "S1"));
        for txn in &receipt.transactions {
            assert_eq!(txn.metadata["tradeId"], receipt.value.trade_id.as_str());
            assert_eq!(txn.metadata["listingId"], listing.listing_id.as_str());
        }

        // Seller sees the listing receipt and both fill legs
        assert_eq!(ex.recorder().account_transactions(&"S1".into()).len(), 3);
        assert_eq!(ex.metrics().trades_total.get(), 1);
        assert_eq!(ex.metrics().transactions_total.get(), 3);
    }

    #[test]
    fn test_system_clock_receipts_match_stored() {
        let mut config = Config::default();
        config.backend = Backend::Memory;
        let ex = Exchange::open(config).unwrap();

        let listed = ex.list_asset(gold()).unwrap();
        assert_eq!(ex.marketplace().listing(&listed.value.listing_id).unwrap(), listed.value);

        let bought = ex
            .buy_asset(&"B1".into(), &listed.value.listing_id, None)
            .unwrap();
        assert_eq!(ex.marketplace().trades(), vec![bought.value]);

        let mut stored = ex.recorder().all_transactions();
        let mut returned = listed.transactions;
        returned.extend(bought.transactions);
        stored.sort_by(|a, b| a.tx_hash.cmp(&b.tx_hash));
        returned.sort_by(|a, b| a.tx_hash.cmp(&b.tx_hash));
        assert_eq!(stored, returned);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = Config::default();
        config.recorder.gas_used_max = config.recorder.gas_used_min;
        let err = Exchange::with_store(
            Arc::new(MemoryStore::new()),
            &config,
            Arc::new(ManualClock::from_millis(1_700_000_000_000)),
        )
        .unwrap_err();
        assert!(matches!(err, crate::Error::Config(_)));
    }

    #[test]
    fn test_close_after_use() {
        let ex = exchange();
        ex.list_asset(gold()).unwrap();
        ex.close().unwrap();
    }

    #[test]
    fn test_failed_buy_records_nothing() {
        let ex = exchange();
        assert!(ex
            .buy_asset(&"B1".into(), &ListingId::new("L_missing"), None)
            .is_err());
        assert!(ex.recorder().all_transactions().is_empty());
    }

    #[test]
    fn test_cancel_receipt_only_on_success() {
        let ex = exchange();
        let listing = ex.list_asset(gold()).unwrap().value;

        assert!(ex
            .cancel_listing(&listing.listing_id, &"S2".into())
            .unwrap()
            .is_none());

        let receipt = ex
            .cancel_listing(&listing.listing_id, &"S1".into())
            .unwrap()
            .unwrap();
        assert_eq!(receipt.value.status, ListingStatus::Cancelled);
        assert_eq!(receipt.transactions[0].kind.as_str(), TransactionKind::LISTING_CANCEL);
        assert_eq!(ex.recorder().all_transactions().len(), 2);
    }

    #[test]
    fn test_reset_clears_both() {
        let ex = exchange();
        let listing = ex.list_asset(gold()).unwrap().value;
        ex.buy_asset(&"B1".into(), &listing.listing_id, None).unwrap();
        ex.reset().unwrap();
        assert!(ex.marketplace().marketplace().is_empty());
        assert!(ex.marketplace().trades().is_empty());
        assert!(ex.recorder().all_transactions().is_empty());
    }
}
