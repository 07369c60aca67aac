//! `WatchDispatcher`: one live subscription task per marketplace event.

use futures::StreamExt;
use salewatch_core::{
    ledger::{LedgerClient, LogSubscription},
    log::RawLog,
    market::{Market, MarketplaceEventSpec},
    registry::MarketRegistry,
    sale::SaleRecord,
};
use salewatch_evm::SalePipeline;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
};
use tracing::{debug, info, warn};

use crate::config::WatchConfig;

/// Lifecycle of a single watch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchState {
    /// Task spawned, subscription not yet confirmed
    Idle,
    /// Subscription open, no batch received yet
    Subscribed,
    /// At least one batch received
    Receiving,
    /// Subscription released; the task has finished or is finishing
    Unsubscribed,
}

/// Why a watch task ended.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WatchExit {
    /// Shutdown was requested, or the consumer dropped its receiver.
    #[error("watch shut down")]
    Shutdown,

    /// The subscription stream ended or failed; the caller may resubscribe.
    #[error("subscription disconnected: {reason}")]
    Disconnected { reason: String },

    /// The initial subscription was rejected.
    #[error("subscription failed: {reason}")]
    SubscribeFailed { reason: String },
}

/// Metrics snapshot for one watch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WatchMetrics {
    pub batches_received: u64,
    pub sales_emitted: u64,
    /// Incomplete correlations
    pub events_dropped: u64,
    /// Decode, normalize and receipt errors
    pub events_failed: u64,
}

/// Control and output side of a running watch.
///
/// Dropping the handle stops the watch.
pub struct WatchHandle {
    market: Arc<Market>,
    event_name: String,
    sales: Option<mpsc::Receiver<SaleRecord>>,
    shutdown: watch::Sender<bool>,
    state: watch::Receiver<WatchState>,
    metrics: Arc<Mutex<WatchMetrics>>,
    task: JoinHandle<WatchExit>,
}

impl WatchHandle {
    pub fn market(&self) -> &Arc<Market> {
        &self.market
    }

    pub fn event_name(&self) -> &str {
        &self.event_name
    }

    /// Next sale, or `None` once the watch has ended and the channel is
    /// drained. Also `None` after [`take_sales`](Self::take_sales).
    pub async fn recv(&mut self) -> Option<SaleRecord> {
        match self.sales.as_mut() {
            Some(rx) => rx.recv().await,
            None => None,
        }
    }

    /// Move the output channel out of the handle. Dropping the returned
    /// receiver ends the watch with [`WatchExit::Shutdown`].
    pub fn take_sales(&mut self) -> Option<mpsc::Receiver<SaleRecord>> {
        self.sales.take()
    }

    pub fn state(&self) -> WatchState {
        *self.state.borrow()
    }

    /// A receiver that observes every state transition.
    pub fn state_changes(&self) -> watch::Receiver<WatchState> {
        self.state.clone()
    }

    /// Returns a snapshot of current metrics.
    pub fn metrics(&self) -> WatchMetrics {
        self.metrics.lock().unwrap().clone()
    }

    /// Ask the task to stop. The log being processed finishes; nothing is
    /// emitted afterwards.
    pub fn shutdown(&self) {
        self.shutdown.send_replace(true);
    }

    /// Wait for the task to end. A receiver still held by the handle is
    /// dropped first, so call [`take_sales`](Self::take_sales) beforehand
    /// to keep draining.
    pub async fn join(mut self) -> WatchExit {
        drop(self.sales.take());
        match (&mut self.task).await {
            Ok(exit) => exit,
            Err(e) => WatchExit::Disconnected {
                reason: format!("watch task failed: {e}"),
            },
        }
    }
}

/// Spawns one watch task per (market, event). Each [`WatchHandle`]
/// controls its own task.
pub struct WatchDispatcher<C: LedgerClient + ?Sized> {
    client: Arc<C>,
    pipeline: SalePipeline,
    config: WatchConfig,
}

impl<C: LedgerClient + ?Sized + 'static> WatchDispatcher<C> {
    pub fn new(client: Arc<C>, config: WatchConfig) -> Self {
        Self {
            client,
            pipeline: SalePipeline::default(),
            config,
        }
    }

    /// Share a pipeline (and its signature cache) with other components.
    pub fn with_pipeline(mut self, pipeline: SalePipeline) -> Self {
        self.pipeline = pipeline;
        self
    }

    /// Start watching one sale event of `market`.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn watch(&self, market: Arc<Market>, spec: MarketplaceEventSpec) -> WatchHandle {
        info!("Watching event {} on {}", spec.event_name, market.name);

        let (tx, rx) = mpsc::channel(self.config.channel_capacity.max(1));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (state_tx, state_rx) = watch::channel(WatchState::Idle);
        let metrics = Arc::new(Mutex::new(WatchMetrics::default()));

        let task = WatchTask {
            client: Arc::clone(&self.client),
            pipeline: self.pipeline.clone(),
            market: Arc::clone(&market),
            spec: spec.clone(),
            sales: tx,
            shutdown: shutdown_rx,
            state: state_tx,
            metrics: Arc::clone(&metrics),
        };

        WatchHandle {
            market,
            event_name: spec.event_name,
            sales: Some(rx),
            shutdown: shutdown_tx,
            state: state_rx,
            metrics,
            task: tokio::spawn(task.run()),
        }
    }

    /// Watch every (market, event) pair of `registry`, in registry order.
    pub fn watch_all(&self, registry: &dyn MarketRegistry) -> Vec<WatchHandle> {
        registry
            .watch_pairs()
            .into_iter()
            .map(|(market, spec)| self.watch(market, spec))
            .collect()
    }
}

/// Everything a watch task owns.
struct WatchTask<C: LedgerClient + ?Sized> {
    client: Arc<C>,
    pipeline: SalePipeline,
    market: Arc<Market>,
    spec: MarketplaceEventSpec,
    sales: mpsc::Sender<SaleRecord>,
    shutdown: watch::Receiver<bool>,
    state: watch::Sender<WatchState>,
    metrics: Arc<Mutex<WatchMetrics>>,
}

impl<C: LedgerClient + ?Sized> WatchTask<C> {
    async fn run(mut self) -> WatchExit {
        let address = self.market.contract_address.clone();
        let signature = self.spec.watch_signature().to_string();

        let LogSubscription {
            mut batches,
            mut handle,
        } = match self.client.subscribe_logs(&address, &signature).await {
            Ok(sub) => sub,
            Err(e) => {
                warn!(
                    market = %self.market.name,
                    event = %self.spec.event_name,
                    "Subscribe failed: {e}"
                );
                self.state.send_replace(WatchState::Unsubscribed);
                return WatchExit::SubscribeFailed {
                    reason: e.to_string(),
                };
            }
        };
        self.state.send_replace(WatchState::Subscribed);

        let exit = loop {
            let item = tokio::select! {
                biased;
                _ = stop_requested(&mut self.shutdown) => break WatchExit::Shutdown,
                _ = self.sales.closed() => break WatchExit::Shutdown,
                item = batches.next() => item,
            };
            match item {
                None => {
                    break WatchExit::Disconnected {
                        reason: "subscription stream ended".into(),
                    }
                }
                Some(Err(e)) => {
                    break WatchExit::Disconnected {
                        reason: e.to_string(),
                    }
                }
                Some(Ok(batch)) => {
                    self.state.send_if_modified(|s| {
                        let changed = *s != WatchState::Receiving;
                        *s = WatchState::Receiving;
                        changed
                    });
                    self.metrics.lock().unwrap().batches_received += 1;
                    if let Some(exit) = self.handle_batch(batch).await {
                        break exit;
                    }
                }
            }
        };

        if let Err(e) = handle.unsubscribe().await {
            warn!(market = %self.market.name, "Unsubscribe failed: {e}");
        }
        self.state.send_replace(WatchState::Unsubscribed);
        info!(
            market = %self.market.name,
            event = %self.spec.event_name,
            "Watch ended: {exit}"
        );
        exit
    }

    /// Process every log of `batch` in order. Returns `Some` when the watch
    /// must stop.
    async fn handle_batch(&mut self, batch: Vec<RawLog>) -> Option<WatchExit> {
        for log in batch {
            if *self.shutdown.borrow() || self.sales.is_closed() {
                return Some(WatchExit::Shutdown);
            }

            let record = match self
                .pipeline
                .process(&log, &self.market, &self.spec, self.client.as_ref())
                .await
            {
                Ok(Some(record)) => record,
                Ok(None) => {
                    debug!(tx = %log.transaction_hash, "Incomplete sale dropped");
                    self.metrics.lock().unwrap().events_dropped += 1;
                    continue;
                }
                Err(e) => {
                    warn!(
                        market = %self.market.name,
                        event = %self.spec.event_name,
                        tx = %log.transaction_hash,
                        kind = e.kind(),
                        "Dropping event: {e}"
                    );
                    self.metrics.lock().unwrap().events_failed += 1;
                    continue;
                }
            };

            tokio::select! {
                biased;
                _ = stop_requested(&mut self.shutdown) => return Some(WatchExit::Shutdown),
                sent = self.sales.send(record) => {
                    if sent.is_err() {
                        return Some(WatchExit::Shutdown);
                    }
                    self.metrics.lock().unwrap().sales_emitted += 1;
                }
            }
        }
        None
    }
}

/// Resolves once shutdown is requested or the handle is gone.
async fn stop_requested(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stop| *stop).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use salewatch_core::{
        error::LedgerError, ledger::ReceiptFetcher, log::BlockRange, memory::MemoryLedger,
    };
    use salewatch_evm::LogDecoder;
    use salewatch_registry::builtin;

    fn word(n: u128) -> String {
        format!("{n:064x}")
    }

    fn addr_topic(n: u8) -> String {
        format!("0x{:0>64}", format!("{n:02x}").repeat(20))
    }

    /// A PhunkBought log for phunk `id` priced at `wei`.
    fn phunk(id: u8, wei: u128, log_index: u32) -> RawLog {
        let decoder = LogDecoder::new();
        RawLog {
            address: builtin::ETHERPHUNKS_MARKET.to_lowercase(),
            topics: vec![
                decoder.fingerprint(builtin::ETHERPHUNKS_SALE).unwrap(),
                format!("0x{}", format!("{id:02x}").repeat(32)),
                addr_topic(0x11),
                addr_topic(0x22),
            ],
            data: hex::decode(word(wei)).unwrap(),
            transaction_hash: format!("0xtx{log_index}"),
            block_number: 100,
            log_index,
        }
    }

    fn phunks() -> (Arc<Market>, MarketplaceEventSpec) {
        let market = builtin::registry().get("EtherPhunks Market").unwrap();
        let spec = market.events[0].clone();
        (market, spec)
    }

    async fn until_subscribed(handle: &WatchHandle) {
        let mut states = handle.state_changes();
        states
            .wait_for(|s| *s != WatchState::Idle)
            .await
            .unwrap();
    }

    fn push_phunks(ledger: &MemoryLedger, batch: Vec<RawLog>) -> usize {
        ledger.push_batch(builtin::ETHERPHUNKS_MARKET, builtin::ETHERPHUNKS_SALE, batch)
    }

    #[tokio::test]
    async fn emits_each_log_of_a_batch_in_order() {
        let ledger = Arc::new(MemoryLedger::new(0));
        let dispatcher = WatchDispatcher::new(ledger.clone(), WatchConfig::default());
        let (market, spec) = phunks();
        let mut handle = dispatcher.watch(market, spec);
        until_subscribed(&handle).await;
        assert_eq!(handle.state(), WatchState::Subscribed);

        let reached = push_phunks(
            &ledger,
            vec![
                phunk(1, 1_000_000_000_000_000_000, 0),
                phunk(2, 2_000_000_000_000_000_000, 1),
                phunk(3, 3_000_000_000_000_000_000, 2),
            ],
        );
        assert_eq!(reached, 1);

        for (i, value) in ["1", "2", "3"].iter().enumerate() {
            let rec = handle.recv().await.unwrap();
            assert_eq!(rec.value_eth, *value);
            assert_eq!(rec.log_index, i as u32);
            assert_eq!(rec.seller, format!("0x{}", "11".repeat(20)));
        }
        assert_eq!(handle.state(), WatchState::Receiving);
        let m = handle.metrics();
        assert_eq!((m.batches_received, m.sales_emitted), (1, 3));
    }

    #[tokio::test]
    async fn bad_event_does_not_stop_the_loop() {
        let ledger = Arc::new(MemoryLedger::new(0));
        let dispatcher = WatchDispatcher::new(ledger.clone(), WatchConfig::default());
        let (market, spec) = phunks();
        let mut handle = dispatcher.watch(market, spec);
        until_subscribed(&handle).await;

        let mut broken = phunk(1, 1, 0);
        broken.topics.truncate(2);
        push_phunks(&ledger, vec![broken, phunk(2, 500_000_000_000_000_000, 1)]);

        let rec = handle.recv().await.unwrap();
        assert_eq!(rec.value_eth, "0.5");
        assert_eq!(handle.metrics().events_failed, 1);
    }

    #[tokio::test]
    async fn shutdown_unsubscribes_and_closes_channel() {
        let ledger = Arc::new(MemoryLedger::new(0));
        let dispatcher = WatchDispatcher::new(ledger.clone(), WatchConfig::default());
        let (market, spec) = phunks();
        let mut handle = dispatcher.watch(market, spec);
        until_subscribed(&handle).await;
        let mut sales = handle.take_sales().unwrap();
        let mut states = handle.state_changes();

        handle.shutdown();
        assert_eq!(handle.join().await, WatchExit::Shutdown);
        assert!(sales.recv().await.is_none());
        assert_eq!(*states.borrow_and_update(), WatchState::Unsubscribed);
        assert_eq!(ledger.unsubscribe_count(), 1);
        assert_eq!(ledger.active_subscriptions(), 0);
    }

    #[tokio::test]
    async fn dropped_receiver_stops_the_watch() {
        let ledger = Arc::new(MemoryLedger::new(0));
        let dispatcher = WatchDispatcher::new(ledger.clone(), WatchConfig::default());
        let (market, spec) = phunks();
        let mut handle = dispatcher.watch(market, spec);
        until_subscribed(&handle).await;

        drop(handle.take_sales());
        assert_eq!(handle.join().await, WatchExit::Shutdown);
        assert_eq!(ledger.unsubscribe_count(), 1);
    }

    #[tokio::test]
    async fn provider_disconnect_is_reported() {
        let ledger = Arc::new(MemoryLedger::new(0));
        let dispatcher = WatchDispatcher::new(ledger.clone(), WatchConfig::default());
        let (market, spec) = phunks();
        let mut handle = dispatcher.watch(market, spec);
        until_subscribed(&handle).await;
        let mut sales = handle.take_sales().unwrap();

        ledger.disconnect_all("socket closed");
        match handle.join().await {
            WatchExit::Disconnected { reason } => assert!(reason.contains("socket closed")),
            other => panic!("unexpected exit {other:?}"),
        }
        assert!(sales.recv().await.is_none());
        assert_eq!(ledger.unsubscribe_count(), 1);
    }

    /// A Match / InternalItemTransfer pair in `tx`. The Match is stored in
    /// the ledger; the transfer is returned for delivery.
    fn ordex_trade(ledger: &MemoryLedger, tx: &str, id: u128) -> RawLog {
        let decoder = LogDecoder::new();
        ledger.insert_log(
            builtin::ORDEX_MATCH,
            RawLog {
                address: builtin::ORDEX_EXCHANGE.to_lowercase(),
                topics: vec![decoder.fingerprint(builtin::ORDEX_MATCH).unwrap()],
                data: hex::decode(format!(
                    "{}{}{}{}",
                    word(0),
                    word(0),
                    word(id * 1_000_000_000_000_000_000),
                    word(0)
                ))
                .unwrap(),
                transaction_hash: tx.into(),
                block_number: 200,
                log_index: 0,
            },
        );
        RawLog {
            address: builtin::ORDEX.to_lowercase(),
            topics: vec![
                decoder.fingerprint(builtin::ORDEX_INTERNAL_TRANSFER).unwrap(),
                addr_topic(0x11),
                addr_topic(0x22),
                format!("0x{}", word(id)),
            ],
            data: vec![],
            transaction_hash: tx.into(),
            block_number: 200,
            log_index: 1,
        }
    }

    #[tokio::test]
    async fn receipt_failure_drops_only_that_live_sale() {
        let ledger = Arc::new(MemoryLedger::new(0));
        let dispatcher = WatchDispatcher::new(ledger.clone(), WatchConfig::default());
        let market = builtin::registry().get("Ordex").unwrap();
        let spec = market.events[0].clone();
        let mut handle = dispatcher.watch(market, spec);
        until_subscribed(&handle).await;

        let broken = ordex_trade(&ledger, "0xf1", 1);
        let complete = ordex_trade(&ledger, "0xf2", 2);
        ledger.fail_receipt("0xf1");
        let reached = ledger.push_batch(
            builtin::ORDEX,
            builtin::ORDEX_INTERNAL_TRANSFER,
            vec![broken, complete],
        );
        assert_eq!(reached, 1);

        let rec = handle.recv().await.unwrap();
        assert_eq!(rec.tx_hash, "0xf2");
        assert_eq!(rec.value_eth, "2");
        assert_eq!(rec.hash_id, format!("0x{}", word(2)));
        let m = handle.metrics();
        assert_eq!((m.events_failed, m.sales_emitted), (1, 1));
        assert_eq!(handle.state(), WatchState::Receiving);

        handle.shutdown();
        assert_eq!(handle.join().await, WatchExit::Shutdown);
    }

    struct RefusingLedger;

    #[async_trait]
    impl ReceiptFetcher for RefusingLedger {
        async fn transaction_receipt(&self, tx_hash: &str) -> Result<Vec<RawLog>, LedgerError> {
            Err(LedgerError::Receipt {
                tx_hash: tx_hash.into(),
                reason: "offline".into(),
            })
        }
    }

    #[async_trait]
    impl LedgerClient for RefusingLedger {
        async fn block_height(&self) -> Result<u64, LedgerError> {
            Err(LedgerError::Transport("offline".into()))
        }

        async fn get_logs(
            &self,
            _address: &str,
            _signature: &str,
            _range: BlockRange,
        ) -> Result<Vec<RawLog>, LedgerError> {
            Err(LedgerError::Transport("offline".into()))
        }

        async fn subscribe_logs(
            &self,
            _address: &str,
            _signature: &str,
        ) -> Result<LogSubscription, LedgerError> {
            Err(LedgerError::Subscription("rate limited".into()))
        }
    }

    #[tokio::test]
    async fn rejected_subscription_is_reported() {
        let dispatcher = WatchDispatcher::new(Arc::new(RefusingLedger), WatchConfig::default());
        let (market, spec) = phunks();
        let handle = dispatcher.watch(market, spec);
        let mut states = handle.state_changes();

        match handle.join().await {
            WatchExit::SubscribeFailed { reason } => assert!(reason.contains("rate limited")),
            other => panic!("unexpected exit {other:?}"),
        }
        assert_eq!(*states.borrow_and_update(), WatchState::Unsubscribed);
    }

    #[tokio::test]
    async fn watch_all_follows_registry_and_watch_signature() {
        let ledger = Arc::new(MemoryLedger::new(0));
        let dispatcher: WatchDispatcher<dyn LedgerClient> =
            WatchDispatcher::new(ledger.clone() as Arc<dyn LedgerClient>, WatchConfig::default());
        let registry = builtin::registry();
        let handles = dispatcher.watch_all(&registry);

        let names: Vec<_> = handles.iter().map(|h| h.market().name.clone()).collect();
        assert_eq!(
            names,
            vec![
                "Ethscriptions.com",
                "Etch Market",
                "Ordex",
                "EtherPhunks Market",
                "MemeScribe"
            ]
        );
        for handle in &handles {
            until_subscribed(handle).await;
        }
        assert_eq!(ledger.active_subscriptions(), 5);
        // Ordex is watched through its correlated transfer event.
        assert_eq!(
            ledger.push_batch(builtin::ORDEX, builtin::ORDEX_INTERNAL_TRANSFER, vec![]),
            1
        );
        assert_eq!(ledger.push_batch(builtin::ORDEX, builtin::ORDEX_MATCH, vec![]), 0);

        for handle in handles {
            handle.shutdown();
            assert_eq!(handle.join().await, WatchExit::Shutdown);
        }
        assert_eq!(ledger.unsubscribe_count(), 5);
    }
}
