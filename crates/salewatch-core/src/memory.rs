//! In-memory ledger backend.
//!
//! Holds logs in RAM and serves them through the [`LedgerClient`] contract.
//! Useful for tests and for replaying captured logs without a node.
//! Range rejections and receipt failures can be injected to exercise the
//! error paths of the dispatcher and the indexer.

use async_trait::async_trait;
use futures::channel::mpsc;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::error::LedgerError;
use crate::ledger::{LedgerClient, LogSubscription, ReceiptFetcher, SubscriptionHandle};
use crate::log::{BlockRange, RawLog};

type BatchSender = mpsc::UnboundedSender<Result<Vec<RawLog>, LedgerError>>;

struct Subscriber {
    id: u64,
    address: String,
    signature: String,
    sender: BatchSender,
}

#[derive(Default)]
struct Subscribers {
    entries: Mutex<Vec<Subscriber>>,
    unsubscribes: AtomicUsize,
}

/// In-memory ledger.
#[derive(Default)]
pub struct MemoryLedger {
    head: AtomicU64,
    /// (signature, log) in insertion order
    logs: Mutex<Vec<(String, RawLog)>>,
    rejected_ranges: Mutex<HashSet<BlockRange>>,
    failing_receipts: Mutex<HashSet<String>>,
    range_queries: Mutex<Vec<BlockRange>>,
    receipt_queries: AtomicUsize,
    subscribers: Arc<Subscribers>,
    next_subscription: AtomicU64,
}

impl MemoryLedger {
    pub fn new(head: u64) -> Self {
        let ledger = Self::default();
        ledger.set_head(head);
        ledger
    }

    pub fn set_head(&self, head: u64) {
        self.head.store(head, Ordering::SeqCst);
    }

    /// Store a log emitted under `signature`. The log becomes visible to
    /// `get_logs` and to the receipt of its transaction.
    pub fn insert_log(&self, signature: impl Into<String>, log: RawLog) {
        self.logs.lock().unwrap().push((signature.into(), log));
    }

    /// Make every `get_logs` call for exactly `range` fail.
    pub fn reject_range(&self, range: BlockRange) {
        self.rejected_ranges.lock().unwrap().insert(range);
    }

    /// Make receipt lookups for `tx_hash` fail.
    pub fn fail_receipt(&self, tx_hash: impl Into<String>) {
        self.failing_receipts.lock().unwrap().insert(tx_hash.into());
    }

    /// Every range passed to `get_logs`, in call order.
    pub fn range_queries(&self) -> Vec<BlockRange> {
        self.range_queries.lock().unwrap().clone()
    }

    /// Number of receipt lookups served or failed.
    pub fn receipt_queries(&self) -> usize {
        self.receipt_queries.load(Ordering::SeqCst)
    }

    /// Store `batch` and deliver it to every live subscriber of
    /// (`address`, `signature`). Returns the number of subscribers reached.
    pub fn push_batch(&self, address: &str, signature: &str, batch: Vec<RawLog>) -> usize {
        {
            let mut logs = self.logs.lock().unwrap();
            for log in &batch {
                logs.push((signature.to_string(), log.clone()));
            }
        }
        let entries = self.subscribers.entries.lock().unwrap();
        entries
            .iter()
            .filter(|s| s.address.eq_ignore_ascii_case(address) && s.signature == signature)
            .filter(|s| s.sender.unbounded_send(Ok(batch.clone())).is_ok())
            .count()
    }

    /// Send a terminal error to every subscriber and drop them, as a
    /// provider disconnect would.
    pub fn disconnect_all(&self, reason: &str) {
        let mut entries = self.subscribers.entries.lock().unwrap();
        for s in entries.drain(..) {
            let _ = s
                .sender
                .unbounded_send(Err(LedgerError::Subscription(reason.to_string())));
        }
    }

    /// Number of live subscriptions.
    pub fn active_subscriptions(&self) -> usize {
        self.subscribers.entries.lock().unwrap().len()
    }

    /// Number of `unsubscribe()` calls received.
    pub fn unsubscribe_count(&self) -> usize {
        self.subscribers.unsubscribes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReceiptFetcher for MemoryLedger {
    async fn transaction_receipt(&self, tx_hash: &str) -> Result<Vec<RawLog>, LedgerError> {
        self.receipt_queries.fetch_add(1, Ordering::SeqCst);
        if self.failing_receipts.lock().unwrap().contains(tx_hash) {
            return Err(LedgerError::Receipt {
                tx_hash: tx_hash.to_string(),
                reason: "injected failure".into(),
            });
        }
        let mut receipt: Vec<RawLog> = self
            .logs
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, l)| l.transaction_hash.eq_ignore_ascii_case(tx_hash))
            .map(|(_, l)| l.clone())
            .collect();
        if receipt.is_empty() {
            return Err(LedgerError::Receipt {
                tx_hash: tx_hash.to_string(),
                reason: "unknown transaction".into(),
            });
        }
        receipt.sort_by_key(|l| l.log_index);
        Ok(receipt)
    }
}

#[async_trait]
impl LedgerClient for MemoryLedger {
    async fn block_height(&self) -> Result<u64, LedgerError> {
        Ok(self.head.load(Ordering::SeqCst))
    }

    async fn get_logs(
        &self,
        address: &str,
        signature: &str,
        range: BlockRange,
    ) -> Result<Vec<RawLog>, LedgerError> {
        self.range_queries.lock().unwrap().push(range);
        if self.rejected_ranges.lock().unwrap().contains(&range) {
            return Err(LedgerError::Range {
                range,
                reason: "query returned more than 10000 results".into(),
            });
        }
        let mut out: Vec<RawLog> = self
            .logs
            .lock()
            .unwrap()
            .iter()
            .filter(|(sig, l)| {
                sig == signature && l.emitted_by(address) && range.contains(l.block_number)
            })
            .map(|(_, l)| l.clone())
            .collect();
        out.sort_by_key(RawLog::position);
        Ok(out)
    }

    async fn subscribe_logs(
        &self,
        address: &str,
        signature: &str,
    ) -> Result<LogSubscription, LedgerError> {
        let (tx, rx) = mpsc::unbounded();
        let id = self.next_subscription.fetch_add(1, Ordering::SeqCst);
        self.subscribers.entries.lock().unwrap().push(Subscriber {
            id,
            address: address.to_string(),
            signature: signature.to_string(),
            sender: tx,
        });
        let handle = MemorySubscriptionHandle {
            id,
            subscribers: Arc::clone(&self.subscribers),
        };
        Ok(LogSubscription::new(Box::pin(rx), Box::new(handle)))
    }
}

struct MemorySubscriptionHandle {
    id: u64,
    subscribers: Arc<Subscribers>,
}

#[async_trait]
impl SubscriptionHandle for MemorySubscriptionHandle {
    async fn unsubscribe(&mut self) -> Result<(), LedgerError> {
        self.subscribers
            .entries
            .lock()
            .unwrap()
            .retain(|s| s.id != self.id);
        self.subscribers.unsubscribes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
