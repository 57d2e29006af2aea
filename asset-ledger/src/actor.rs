//! Actor-based concurrency for the exchange
//!
//! The marketplace and recorder each rewrite a whole document per mutation.
//! That is safe for one caller at a time but not for several clients racing
//! on the same listing. This module puts the [`Exchange`] behind a single
//! Tokio task so every request is applied strictly in mailbox order:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │              ExchangeHandle (Clone)                   │
//! │         Sends messages to actor mailbox              │
//! └─────────────────────┬────────────────────────────────┘
//!                       │
//!                       │ mpsc::channel (bounded)
//!                       ▼
//! ┌──────────────────────────────────────────────────────┐
//! │             ExchangeActor (Single Task)               │
//! │        Exchange::{list,buy,cancel,record,...}         │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! Two concurrent buys of one listing therefore resolve to one fill and one
//! `ListingUnavailable` under the default fill policy.

use crate::exchange::{Exchange, Receipt};
use crate::ids::{AccountId, ListingId, TxHash};
use crate::numeric::NumericInput;
use crate::types::{
    BlockchainTransaction, ListAssetRequest, Listing, RecordRequest, Trade, Verification,
};
use crate::{Error, Result};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

/// Message sent to the exchange actor
pub enum ExchangeMessage {
    /// List an asset
    ListAsset {
        request: ListAssetRequest,
        response: oneshot::Sender<Result<Receipt<Listing>>>,
    },

    /// Buy a listing
    BuyAsset {
        buyer: AccountId,
        listing_id: ListingId,
        price_override: Option<NumericInput>,
        response: oneshot::Sender<Result<Receipt<Trade>>>,
    },

    /// Cancel a listing
    CancelListing {
        listing_id: ListingId,
        account: AccountId,
        response: oneshot::Sender<Result<Option<Receipt<Listing>>>>,
    },

    /// Record an arbitrary transaction
    RecordTransaction {
        request: RecordRequest,
        response: oneshot::Sender<Result<BlockchainTransaction>>,
    },

    /// Verify a transaction
    VerifyTransaction {
        tx_hash: TxHash,
        response: oneshot::Sender<Result<Verification>>,
    },

    /// Snapshot of all listings
    GetMarketplace {
        response: oneshot::Sender<Vec<Listing>>,
    },

    /// Trade history of an account
    GetHistory {
        account: AccountId,
        response: oneshot::Sender<Vec<Trade>>,
    },

    /// Transactions of an account
    GetAccountTransactions {
        account: AccountId,
        response: oneshot::Sender<Vec<BlockchainTransaction>>,
    },

    /// Shutdown actor
    Shutdown,
}

/// Actor that owns the exchange
pub struct ExchangeActor {
    exchange: Exchange,
    mailbox: mpsc::Receiver<ExchangeMessage>,
}

impl ExchangeActor {
    /// Create new actor
    pub fn new(exchange: Exchange, mailbox: mpsc::Receiver<ExchangeMessage>) -> Self {
        Self { exchange, mailbox }
    }

    /// Run until shutdown or until every handle is dropped, then close the exchange
    pub async fn run(mut self) {
        while let Some(msg) = self.mailbox.recv().await {
            if let ExchangeMessage::Shutdown = msg {
                tracing::info!("Exchange actor shutting down");
                break;
            }
            self.handle_message(msg);
        }

        if let Err(e) = self.exchange.close() {
            tracing::error!(error = %e, "Failed to close exchange");
        }
    }

    /// Handle a single message
    fn handle_message(&self, msg: ExchangeMessage) {
        let ex = &self.exchange;

        // A dropped response channel means the caller gave up; nothing to do.
        match msg {
            ExchangeMessage::ListAsset { request, response } => {
                let _ = response.send(ex.list_asset(request));
            }

            ExchangeMessage::BuyAsset {
                buyer,
                listing_id,
                price_override,
                response,
            } => {
                let _ = response.send(ex.buy_asset(&buyer, &listing_id, price_override));
            }

            ExchangeMessage::CancelListing {
                listing_id,
                account,
                response,
            } => {
                let _ = response.send(ex.cancel_listing(&listing_id, &account));
            }

            ExchangeMessage::RecordTransaction { request, response } => {
                let _ = response.send(ex.recorder().record_transaction(request));
            }

            ExchangeMessage::VerifyTransaction { tx_hash, response } => {
                let _ = response.send(ex.recorder().verify_transaction(&tx_hash));
            }

            ExchangeMessage::GetMarketplace { response } => {
                let _ = response.send(ex.marketplace().marketplace());
            }

            ExchangeMessage::GetHistory { account, response } => {
                let _ = response.send(ex.marketplace().history_for_account(&account));
            }

            ExchangeMessage::GetAccountTransactions { account, response } => {
                let _ = response.send(ex.recorder().account_transactions(&account));
            }

            ExchangeMessage::Shutdown => {
                // Handled in run loop
            }
        }
    }
}

/// Handle for sending messages to the actor
#[derive(Clone, Debug)]
pub struct ExchangeHandle {
    sender: mpsc::Sender<ExchangeMessage>,
}

impl ExchangeHandle {
    /// Create new handle
    pub fn new(sender: mpsc::Sender<ExchangeMessage>) -> Self {
        Self { sender }
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> ExchangeMessage,
    ) -> Result<T> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(build(tx))
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;

        rx.await
            .map_err(|_| Error::Concurrency("Response channel closed".to_string()))
    }

    /// List an asset
    pub async fn list_asset(&self, request: ListAssetRequest) -> Result<Receipt<Listing>> {
        self.request(|response| ExchangeMessage::ListAsset { request, response })
            .await?
    }

    /// Buy a listing
    pub async fn buy_asset(
        &self,
        buyer: AccountId,
        listing_id: ListingId,
        price_override: Option<NumericInput>,
    ) -> Result<Receipt<Trade>> {
        self.request(|response| ExchangeMessage::BuyAsset {
            buyer,
            listing_id,
            price_override,
            response,
        })
        .await?
    }

    /// Cancel a listing
    pub async fn cancel_listing(
        &self,
        listing_id: ListingId,
        account: AccountId,
    ) -> Result<Option<Receipt<Listing>>> {
        self.request(|response| ExchangeMessage::CancelListing {
            listing_id,
            account,
            response,
        })
        .await?
    }

    /// Record an arbitrary transaction
    pub async fn record_transaction(&self, request: RecordRequest) -> Result<BlockchainTransaction> {
        self.request(|response| ExchangeMessage::RecordTransaction { request, response })
            .await?
    }

    /// Verify a transaction
    pub async fn verify_transaction(&self, tx_hash: TxHash) -> Result<Verification> {
        self.request(|response| ExchangeMessage::VerifyTransaction { tx_hash, response })
            .await?
    }

    /// Snapshot of all listings
    pub async fn marketplace(&self) -> Result<Vec<Listing>> {
        self.request(|response| ExchangeMessage::GetMarketplace { response })
            .await
    }

    /// Trade history of an account
    pub async fn history_for_account(&self, account: AccountId) -> Result<Vec<Trade>> {
        self.request(|response| ExchangeMessage::GetHistory { account, response })
            .await
    }

    /// Transactions of an account
    pub async fn account_transactions(
        &self,
        account: AccountId,
    ) -> Result<Vec<BlockchainTransaction>> {
        self.request(|response| ExchangeMessage::GetAccountTransactions { account, response })
            .await
    }

    /// Shutdown actor
    pub async fn shutdown(&self) -> Result<()> {
        self.sender
            .send(ExchangeMessage::Shutdown)
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;
        Ok(())
    }
}

/// Spawn the exchange actor.
///
/// The join handle completes once the actor has stopped and closed the store.
pub fn spawn_exchange_actor(
    exchange: Exchange,
    mailbox_capacity: usize,
) -> (ExchangeHandle, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(mailbox_capacity.max(1)); // Bounded channel for backpressure
    let actor = ExchangeActor::new(exchange, rx);

    let task = tokio::spawn(async move {
        actor.run().await;
    });

    (ExchangeHandle::new(tx), task)
}
