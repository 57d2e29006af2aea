//! Marketplace ledger
//!
//! Owns listings and the append-only trade log, stored together as one
//! document:
//!
//! ```text
//! { "marketplace": [Listing, ...], "trades": [Trade, ...] }
//! ```
//!
//! # Listing lifecycle
//!
//! ```text
//!            buy_asset
//!   Listed ─────────────▶ Filled
//!     │
//!     │ cancel_listing (owner only)
//!     ▼
//!   Cancelled
//! ```
//!
//! Both terminal states are final under [`FillPolicy::RejectTerminal`].
//! [`FillPolicy::Overwrite`] keeps the older dashboard behaviour where a
//! terminal listing can be filled again.

use crate::{
    clock::{system_clock, SharedClock},
    config::{FillPolicy, MarketplaceConfig},
    ids::{AccountId, ListingId, TradeId},
    metrics::Metrics,
    numeric::NumericInput,
    store::{load_document, save_document, SharedStore},
    types::{ListAssetRequest, Listing, ListingStatus, Trade},
    Error, Result,
};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Persisted shape of the marketplace
#[derive(Debug, Default, Serialize, Deserialize)]
struct MarketDocument {
    #[serde(default)]
    marketplace: Vec<Listing>,
    #[serde(default)]
    trades: Vec<Trade>,
}

/// Listings and trades over a durable store
pub struct Marketplace {
    store: SharedStore,
    key: String,
    config: MarketplaceConfig,
    clock: SharedClock,
    /// Serializes read-modify-write cycles
    writer: Mutex<()>,
    metrics: Option<Metrics>,
}

impl std::fmt::Debug for Marketplace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Marketplace")
            .field("key", &self.key)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Marketplace {
    /// Create a marketplace over `store`, keeping its document under `key`
    pub fn new(store: SharedStore, key: impl Into<String>, config: MarketplaceConfig) -> Self {
        Self {
            store,
            key: key.into(),
            config,
            clock: system_clock(),
            writer: Mutex::new(()),
            metrics: None,
        }
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

    /// Marketplace configuration
    pub fn config(&self) -> &MarketplaceConfig {
        &self.config
    }

    fn load(&self) -> MarketDocument {
        load_document(self.store.as_ref(), &self.key, self.metrics.as_ref())
    }

    fn save(&self, doc: &MarketDocument) -> Result<()> {
        save_document(self.store.as_ref(), &self.key, doc)
    }

    /// Put a share of an asset up for sale
    pub fn list_asset(&self, request: ListAssetRequest) -> Result<Listing> {
        let policy = self.config.coercion;
        let price = policy.amount("price", request.price.as_ref())?;
        let percentage = policy.percentage(request.percentage.as_ref())?;
        let tokens = policy.amount("tokens", request.tokens.as_ref())?;

        let _guard = self.writer.lock();
        let mut doc = self.load();

        let listing = Listing {
            listing_id: ListingId::generate(),
            seller_id: request.seller_id,
            asset_id: request.asset_id,
            asset_type: request.asset_type,
            quantity: request.quantity,
            tokens,
            price,
            percentage,
            status: ListingStatus::Listed,
            created_at: self.clock.now(),
            filled_at: None,
            cancelled_at: None,
        };

        doc.marketplace.push(listing.clone());
        self.save(&doc)?;

        if let Some(m) = &self.metrics {
            m.record_listing();
        }

        tracing::info!(
            listing_id = %listing.listing_id,
            seller_id = %listing.seller_id,
            asset_id = %listing.asset_id,
            price = %listing.price,
            "Asset listed"
        );

        Ok(listing)
    }

    /// Fill a listing for `buyer`.
    ///
    /// The trade price is `price_override` when given, otherwise the listing
    /// price.
    pub fn buy_asset(
        &self,
        buyer: &AccountId,
        listing_id: &ListingId,
        price_override: Option<NumericInput>,
    ) -> Result<Trade> {
        let _guard = self.writer.lock();
        let mut doc = self.load();

        let listing = doc
            .marketplace
            .iter_mut()
            .find(|l| &l.listing_id == listing_id)
            .ok_or_else(|| Error::ListingNotFound(listing_id.to_string()))?;

        if listing.status.is_terminal() && self.config.fill_policy == FillPolicy::RejectTerminal {
            tracing::warn!(
                listing_id = %listing_id,
                status = %listing.status,
                buyer_id = %buyer,
                "Buy refused on closed listing"
            );
            if let Some(m) = &self.metrics {
                m.record_rejected_fill();
            }
            return Err(Error::ListingUnavailable {
                listing_id: listing_id.to_string(),
                status: listing.status,
            });
        }

        let price = match price_override.as_ref() {
            Some(ov) => self.config.coercion.amount("price", Some(ov))?,
            None => listing.price.max(Decimal::ZERO),
        };

        let now = self.clock.now();
        let trade = Trade {
            trade_id: TradeId::generate(),
            listing_id: listing.listing_id.clone(),
            asset_id: listing.asset_id.clone(),
            asset_type: listing.asset_type.clone(),
            seller_id: listing.seller_id.clone(),
            buyer_id: buyer.clone(),
            price,
            quantity: listing.quantity.clone(),
            tokens: listing.tokens,
            timestamp: now,
        };

        listing.status = ListingStatus::Filled;
        listing.filled_at = Some(now);

        doc.trades.push(trade.clone());
        self.save(&doc)?;

        if let Some(m) = &self.metrics {
            m.record_trade();
        }

        tracing::info!(
            trade_id = %trade.trade_id,
            listing_id = %trade.listing_id,
            buyer_id = %trade.buyer_id,
            seller_id = %trade.seller_id,
            price = %trade.price,
            "Listing filled"
        );

        Ok(trade)
    }

    /// Withdraw a listing owned by `account`.
    ///
    /// Returns false, without error, when no listing with that ID belongs to
    /// the account.
    pub fn cancel_listing(&self, listing_id: &ListingId, account: &AccountId) -> Result<bool> {
        let _guard = self.writer.lock();
        let mut doc = self.load();

        let Some(listing) = doc
            .marketplace
            .iter_mut()
            .find(|l| &l.listing_id == listing_id && &l.seller_id == account)
        else {
            tracing::debug!(listing_id = %listing_id, account = %account, "No owned listing to cancel");
            return Ok(false);
        };

        if listing.status.is_terminal() && self.config.fill_policy == FillPolicy::RejectTerminal {
            tracing::debug!(listing_id = %listing_id, status = %listing.status, "Listing already closed");
            return Ok(false);
        }

        listing.status = ListingStatus::Cancelled;
        listing.cancelled_at = Some(self.clock.now());
        self.save(&doc)?;

        if let Some(m) = &self.metrics {
            m.record_cancellation();
        }

        tracing::info!(listing_id = %listing_id, seller_id = %account, "Listing cancelled");
        Ok(true)
    }

    /// Every listing in insertion order, whatever its status
    pub fn marketplace(&self) -> Vec<Listing> {
        self.load().marketplace
    }

    /// The full trade log in append order
    pub fn trades(&self) -> Vec<Trade> {
        self.load().trades
    }

    /// Look up one listing
    pub fn listing(&self, listing_id: &ListingId) -> Result<Listing> {
        self.load()
            .marketplace
            .into_iter()
            .find(|l| &l.listing_id == listing_id)
            .ok_or_else(|| Error::ListingNotFound(listing_id.to_string()))
    }

    /// Trades where `account` bought or sold, newest first
    pub fn history_for_account(&self, account: &AccountId) -> Vec<Trade> {
        if account.is_empty() {
            return Vec::new();
        }

        let mut trades: Vec<_> = self
            .load()
            .trades
            .into_iter()
            .filter(|t| t.involves(account))
            .collect();
        trades.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        trades
    }

    /// Wipe listings and trades
    pub fn clear_all(&self) -> Result<()> {
        let _guard = self.writer.lock();
        self.store.remove(&self.key)?;
        tracing::info!(key = %self.key, "Marketplace cleared");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::numeric::CoercionPolicy;
    use crate::store::{DurableStore, MemoryStore};
    use chrono::Duration;
    use std::sync::Arc;

    fn market_with(config: MarketplaceConfig) -> (Marketplace, ManualClock, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let clock = ManualClock::from_millis(1_700_000_000_000);
        let market = Marketplace::new(store.clone(), "market", config)
            .with_clock(Arc::new(clock.clone()));
        (market, clock, store)
    }

    fn market() -> (Marketplace, ManualClock, Arc<MemoryStore>) {
        market_with(MarketplaceConfig::default())
    }

    fn gold(seller: &str) -> ListAssetRequest {
        ListAssetRequest {
            seller_id: AccountId::new(seller),
            asset_id: "A1".to_string(),
            asset_type: "Gold".to_string(),
            quantity: "10g".to_string(),
            tokens: Some(10.into()),
            price: Some(1000.into()),
            percentage: Some(100.into()),
        }
    }

    #[test]
    fn test_list_then_buy() {
        let (market, _clock, _store) = market();
        let listing = market.list_asset(gold("S1")).unwrap();
        assert_eq!(listing.status, ListingStatus::Listed);
        assert_eq!(listing.price, Decimal::from(1000));
        assert_eq!(market.marketplace(), vec![listing.clone()]);
        assert!(market.trades().is_empty());

        let trade = market
            .buy_asset(&AccountId::new("B1"), &listing.listing_id, None)
            .unwrap();
        assert_eq!(trade.price, Decimal::from(1000));
        assert_eq!(trade.tokens, Decimal::from(10));
        assert_eq!(trade.seller_id.as_str(), "S1");
        assert_eq!(trade.quantity, "10g");

        let after = market.listing(&listing.listing_id).unwrap();
        assert_eq!(after.status, ListingStatus::Filled);
        assert_eq!(after.filled_at, Some(trade.timestamp));
    }

    #[test]
    fn test_list_coerces_inputs() {
        let (market, _clock, _store) = market();
        let listing = market
            .list_asset(ListAssetRequest {
                seller_id: AccountId::new("S1"),
                price: Some("cheap".into()),
                percentage: Some("most".into()),
                ..ListAssetRequest::default()
            })
            .unwrap();
        assert_eq!(listing.price, Decimal::ZERO);
        assert_eq!(listing.percentage, Decimal::ONE_HUNDRED);
        assert_eq!(listing.tokens, Decimal::ZERO);
    }

    #[test]
    fn test_strict_listing_rejects_bad_price() {
        let (market, _clock, _store) = market_with(MarketplaceConfig {
            coercion: CoercionPolicy::Strict,
            ..MarketplaceConfig::default()
        });
        let mut req = gold("S1");
        req.price = Some("cheap".into());
        assert!(matches!(market.list_asset(req), Err(Error::InvalidInput(_))));
        assert!(market.marketplace().is_empty());
    }

    #[test]
    fn test_buy_unknown_listing() {
        let (market, _clock, _store) = market();
        let err = market
            .buy_asset(&AccountId::new("B1"), &ListingId::new("L_missing"), None)
            .unwrap_err();
        assert!(matches!(err, Error::ListingNotFound(ref id) if id == "L_missing"));
        assert!(market.trades().is_empty());
    }

    #[test]
    fn test_price_override() {
        let (market, _clock, _store) = market();
        let listing = market.list_asset(gold("S1")).unwrap();
        let trade = market
            .buy_asset(&AccountId::new("B1"), &listing.listing_id, Some(900.into()))
            .unwrap();
        assert_eq!(trade.price, Decimal::from(900));

        let listing = market.list_asset(gold("S1")).unwrap();
        let trade = market
            .buy_asset(&AccountId::new("B1"), &listing.listing_id, Some("n/a".into()))
            .unwrap();
        assert_eq!(trade.price, Decimal::ZERO);
    }

    #[test]
    fn test_second_buy_rejected_by_default() {
        let (market, _clock, _store) = market();
        let listing = market.list_asset(gold("S1")).unwrap();
        market
            .buy_asset(&AccountId::new("B1"), &listing.listing_id, None)
            .unwrap();

        let err = market
            .buy_asset(&AccountId::new("B2"), &listing.listing_id, None)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::ListingUnavailable { status: ListingStatus::Filled, .. }
        ));
        assert_eq!(market.trades().len(), 1);
    }

    #[test]
    fn test_buy_cancelled_rejected_by_default() {
        let (market, _clock, _store) = market();
        let listing = market.list_asset(gold("S1")).unwrap();
        assert!(market
            .cancel_listing(&listing.listing_id, &AccountId::new("S1"))
            .unwrap());
        let err = market
            .buy_asset(&AccountId::new("B1"), &listing.listing_id, None)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::ListingUnavailable { status: ListingStatus::Cancelled, .. }
        ));
    }

    #[test]
    fn test_overwrite_policy_refills() {
        let (market, clock, _store) = market_with(MarketplaceConfig {
            fill_policy: FillPolicy::Overwrite,
            ..MarketplaceConfig::default()
        });
        let listing = market.list_asset(gold("S1")).unwrap();
        let first = market
            .buy_asset(&AccountId::new("B1"), &listing.listing_id, None)
            .unwrap();
        clock.advance(Duration::seconds(5));
        let second = market
            .buy_asset(&AccountId::new("B2"), &listing.listing_id, None)
            .unwrap();

        assert_ne!(first.trade_id, second.trade_id);
        assert_eq!(market.trades().len(), 2);
        let after = market.listing(&listing.listing_id).unwrap();
        assert_eq!(after.status, ListingStatus::Filled);
        assert_eq!(after.filled_at, Some(second.timestamp));
    }

    #[test]
    fn test_cancel_requires_owner() {
        let (market, _clock, _store) = market();
        let listing = market.list_asset(gold("S1")).unwrap();

        assert!(!market
            .cancel_listing(&listing.listing_id, &AccountId::new("S2"))
            .unwrap());
        assert_eq!(
            market.listing(&listing.listing_id).unwrap().status,
            ListingStatus::Listed
        );
        assert!(!market
            .cancel_listing(&ListingId::new("L_nope"), &AccountId::new("S1"))
            .unwrap());

        assert!(market
            .cancel_listing(&listing.listing_id, &AccountId::new("S1"))
            .unwrap());
        let after = market.listing(&listing.listing_id).unwrap();
        assert_eq!(after.status, ListingStatus::Cancelled);
        assert!(after.cancelled_at.is_some());

        // Already terminal
        assert!(!market
            .cancel_listing(&listing.listing_id, &AccountId::new("S1"))
            .unwrap());
    }

    #[test]
    fn test_marketplace_keeps_terminal_listings_in_order() {
        let (market, _clock, _store) = market();
        let a = market.list_asset(gold("S1")).unwrap();
        let b = market.list_asset(gold("S2")).unwrap();
        let c = market.list_asset(gold("S3")).unwrap();
        market.buy_asset(&AccountId::new("B"), &a.listing_id, None).unwrap();
        market.cancel_listing(&b.listing_id, &AccountId::new("S2")).unwrap();

        let ids: Vec<_> = market.marketplace().into_iter().map(|l| l.listing_id).collect();
        assert_eq!(ids, vec![a.listing_id, b.listing_id, c.listing_id]);
    }

    #[test]
    fn test_history_for_account() {
        let (market, clock, _store) = market();
        let l1 = market.list_asset(gold("S1")).unwrap();
        let l2 = market.list_asset(gold("B1")).unwrap();
        let l3 = market.list_asset(gold("S3")).unwrap();

        let t1 = market.buy_asset(&AccountId::new("B1"), &l1.listing_id, None).unwrap();
        clock.advance(Duration::seconds(1));
        let t2 = market.buy_asset(&AccountId::new("X"), &l2.listing_id, None).unwrap();
        clock.advance(Duration::seconds(1));
        market.buy_asset(&AccountId::new("Y"), &l3.listing_id, None).unwrap();

        let history = market.history_for_account(&AccountId::new("B1"));
        let ids: Vec<_> = history.iter().map(|t| t.trade_id.clone()).collect();
        assert_eq!(ids, vec![t2.trade_id, t1.trade_id]);
        assert!(market.history_for_account(&AccountId::default()).is_empty());
    }

    #[test]
    fn test_clear_all() {
        let (market, _clock, store) = market();
        let listing = market.list_asset(gold("S1")).unwrap();
        market.buy_asset(&AccountId::new("B1"), &listing.listing_id, None).unwrap();
        market.clear_all().unwrap();
        assert!(market.marketplace().is_empty());
        assert!(market.trades().is_empty());
        assert!(store.get("market").unwrap().is_none());
    }

    #[test]
    fn test_corrupt_document_reads_empty() {
        let (market, _clock, store) = market();
        store.put("market", "[[[").unwrap();
        assert!(market.marketplace().is_empty());
        assert!(market.list_asset(gold("S1")).is_ok());
        assert_eq!(market.marketplace().len(), 1);
    }

    #[test]
    fn test_reads_legacy_document() {
        let (market, _clock, store) = market();
        store
            .put(
                "market",
                r#"{"marketplace":[{"listingId":"L_old","sellerId":"S","assetId":"A",
                "assetType":"Gold","quantity":"1oz","tokens":5,"price":20,"percentage":100,
                "status":"Listed","timestamp":1700000000000}]}"#,
            )
            .unwrap();

        let trade = market
            .buy_asset(&AccountId::new("B"), &ListingId::new("L_old"), None)
            .unwrap();
        assert_eq!(trade.price, Decimal::from(20));
        assert_eq!(market.trades().len(), 1);
    }

    #[test]
    fn test_legacy_entry_missing_tokens_survives_writes() {
        let (market, _clock, store) = market();
        store
            .put(
                "market",
                r#"{"marketplace":[{"listingId":"L_old","sellerId":"S","assetId":"A",
                "assetType":"Gold","price":20,"percentage":100,
                "status":"Listed","timestamp":1700000000000}],
                "trades":[{"tradeId":"T_old","listingId":"L_gone","assetId":"A",
                "sellerId":"S","buyerId":"B","price":5,"timestamp":1700000000000}]}"#,
            )
            .unwrap();

        let old = market.listing(&ListingId::new("L_old")).unwrap();
        assert_eq!(old.tokens, Decimal::ZERO);
        assert_eq!(market.trades().len(), 1);

        market.list_asset(gold("S2")).unwrap();

        assert_eq!(market.marketplace().len(), 2);
        assert!(market.listing(&ListingId::new("L_old")).is_ok());
        assert_eq!(market.trades()[0].trade_id.as_str(), "T_old");
    }
}
