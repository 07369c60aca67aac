//! The ledger collaborator contract.
//!
//! Salewatch does not talk to an RPC node itself. An external module
//! implements [`LedgerClient`] on top of its transport of choice; the
//! decoder, dispatcher and indexer only see these traits.

use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;

use crate::error::LedgerError;
use crate::log::{BlockRange, RawLog};

/// A stream of log batches from one live subscription.
pub type LogBatchStream = Pin<Box<dyn Stream<Item = Result<Vec<RawLog>, LedgerError>> + Send>>;

/// Fetches every log of a transaction.
#[async_trait]
pub trait ReceiptFetcher: Send + Sync {
    async fn transaction_receipt(&self, tx_hash: &str) -> Result<Vec<RawLog>, LedgerError>;
}

/// Releases a live subscription on the provider side.
#[async_trait]
pub trait SubscriptionHandle: Send {
    async fn unsubscribe(&mut self) -> Result<(), LedgerError>;
}

/// A live log subscription: the batch stream plus its release handle.
pub struct LogSubscription {
    pub batches: LogBatchStream,
    pub handle: Box<dyn SubscriptionHandle>,
}

impl LogSubscription {
    pub fn new(batches: LogBatchStream, handle: Box<dyn SubscriptionHandle>) -> Self {
        Self { batches, handle }
    }
}

/// Full ledger access used by the live dispatcher and the backfill indexer.
///
/// `signature` arguments are human-readable event signatures; the
/// implementation derives the topic0 filter from them.
#[async_trait]
pub trait LedgerClient: ReceiptFetcher {
    /// Current chain head.
    async fn block_height(&self) -> Result<u64, LedgerError>;

    /// Logs emitted by `address` matching `signature` inside `range`.
    /// Fails with [`LedgerError::Range`] when the provider rejects the range.
    async fn get_logs(
        &self,
        address: &str,
        signature: &str,
        range: BlockRange,
    ) -> Result<Vec<RawLog>, LedgerError>;

    /// Open a live subscription for new logs of `signature` on `address`.
    async fn subscribe_logs(
        &self,
        address: &str,
        signature: &str,
    ) -> Result<LogSubscription, LedgerError>;
}
